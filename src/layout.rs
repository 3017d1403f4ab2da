//! Gantt layout building.
//!
//! Turns a task list (or a list of project summaries, for the portfolio view)
//! into renderer-ready geometry: axis ticks, one bar per row, indentation and
//! a colour per group. Nothing here draws; the contract ends at the data.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::ident;
use crate::project::ProjectSummary;
use crate::task::Task;
use crate::timeline::{axis_ticks, axis_width, AxisTick, Scale, ScaleConfig};

/// Fallback palette when none is configured.
pub const DEFAULT_PALETTE: [&str; 6] = [
    "#2196F3", "#4CAF50", "#FF9800", "#9C27B0", "#F44336", "#009688",
];

/// Legend label shown for an empty group key.
pub const UNGROUPED_LABEL: &str = "General";

/// Knobs for layout building.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Days of padding before the earliest start.
    pub lead_days: i64,
    /// Days of padding after the latest end.
    pub trail_days: i64,
    /// Narrowest bar drawn, so milestones stay visible.
    pub min_bar_width: f64,
    pub palette: Vec<String>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            lead_days: 2,
            trail_days: 5,
            min_bar_width: 5.0,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Something that occupies one row of the chart.
#[derive(Debug, Clone, Copy)]
pub enum TimelineItem<'a> {
    Task(&'a Task),
    ProjectSummary(&'a ProjectSummary),
}

impl<'a> TimelineItem<'a> {
    pub fn label(&self) -> &'a str {
        match self {
            TimelineItem::Task(t) => &t.name,
            TimelineItem::ProjectSummary(p) => &p.name,
        }
    }

    pub fn identifier(&self) -> Option<&'a str> {
        match self {
            TimelineItem::Task(t) => Some(&t.identifier),
            TimelineItem::ProjectSummary(_) => None,
        }
    }

    /// Both dates, or `None` if either is missing.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let (start, end) = match self {
            TimelineItem::Task(t) => (t.start_date, t.end_date),
            TimelineItem::ProjectSummary(p) => (p.start_date, p.end_date),
        };
        Some((start?, end?))
    }

    pub fn indent_level(&self) -> usize {
        match self {
            TimelineItem::Task(t) => t.depth(),
            TimelineItem::ProjectSummary(_) => 0,
        }
    }

    /// Workstream for tasks, status for projects.
    pub fn group_key(&self) -> String {
        match self {
            TimelineItem::Task(t) => t.workstream.clone(),
            TimelineItem::ProjectSummary(p) => p.status.to_string(),
        }
    }

    pub fn completion(&self) -> u8 {
        match self {
            TimelineItem::Task(t) => t.completion,
            TimelineItem::ProjectSummary(p) => p.completion,
        }
    }

    fn kind(&self) -> RowKind {
        match self {
            TimelineItem::Task(_) => RowKind::Task,
            TimelineItem::ProjectSummary(_) => RowKind::Project,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Task,
    Project,
}

/// Geometry for one chart row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutRow {
    pub kind: RowKind,
    pub identifier: Option<String>,
    pub label: String,
    pub indent_level: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_offset: f64,
    pub bar_width: f64,
    pub group_key: String,
    pub color: String,
    pub completion: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub group_key: String,
    pub label: String,
    pub color: String,
}

/// A laid-out chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub scale: Scale,
    pub origin: NaiveDate,
    pub end: NaiveDate,
    pub axis_ticks: Vec<AxisTick>,
    pub rows: Vec<LayoutRow>,
    pub total_width: f64,
    pub legend: Vec<LegendEntry>,
}

/// Result of a layout request. `Empty` means there was nothing dated to
/// draw; callers show a placeholder rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Layout {
    Empty,
    Chart(LayoutResult),
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        matches!(self, Layout::Empty)
    }

    pub fn chart(&self) -> Option<&LayoutResult> {
        match self {
            Layout::Chart(c) => Some(c),
            Layout::Empty => None,
        }
    }
}

/// Lay out a project's tasks, parents above children in natural identifier order.
pub fn build_task_layout(tasks: &[Task], scale: &ScaleConfig, opts: &LayoutOptions) -> Layout {
    let mut items: Vec<TimelineItem<'_>> = tasks.iter().map(TimelineItem::Task).collect();
    items.sort_by_cached_key(|item| item.identifier().map(ident::sort_key).unwrap_or_default());
    build(items, scale, opts)
}

/// Lay out one row per project, coloured by status, in the order given.
pub fn build_portfolio_layout(
    projects: &[ProjectSummary],
    scale: &ScaleConfig,
    opts: &LayoutOptions,
) -> Layout {
    let items = projects.iter().map(TimelineItem::ProjectSummary).collect();
    build(items, scale, opts)
}

fn build(items: Vec<TimelineItem<'_>>, scale: &ScaleConfig, opts: &LayoutOptions) -> Layout {
    let dated: Vec<(TimelineItem<'_>, NaiveDate, NaiveDate)> = items
        .into_iter()
        .filter_map(|item| match item.span() {
            Some((s, e)) => Some((item, s, e)),
            None => {
                debug!(row = item.label(), "skipping undated row");
                None
            }
        })
        .collect();

    let (Some(min_start), Some(max_end)) = (
        dated.iter().map(|(_, s, _)| *s).min(),
        dated.iter().map(|(_, _, e)| *e).max(),
    ) else {
        return Layout::Empty;
    };
    let origin = min_start - Duration::days(opts.lead_days);
    let end = max_end.max(min_start) + Duration::days(opts.trail_days);

    let mut colors = ColorAssigner::new(&opts.palette);
    let rows: Vec<LayoutRow> = dated
        .into_iter()
        .map(|(item, start, finish)| {
            let bar_offset = scale.offset(start, origin);
            let bar_width = (scale.offset(finish, origin) - bar_offset).max(opts.min_bar_width);
            let group_key = item.group_key();
            LayoutRow {
                kind: item.kind(),
                identifier: item.identifier().map(str::to_string),
                label: item.label().to_string(),
                indent_level: item.indent_level(),
                start_date: start,
                end_date: finish,
                bar_offset,
                bar_width,
                color: colors.color_for(&group_key),
                group_key,
                completion: item.completion(),
            }
        })
        .collect();

    Layout::Chart(LayoutResult {
        scale: scale.scale,
        origin,
        end,
        axis_ticks: axis_ticks(origin, end, scale),
        rows,
        total_width: axis_width(origin, end, scale),
        legend: colors.into_legend(),
    })
}

/// Hands out palette colours to group keys in first-seen order.
struct ColorAssigner<'p> {
    palette: Vec<&'p str>,
    assigned: HashMap<String, String>,
    order: Vec<String>,
}

impl<'p> ColorAssigner<'p> {
    fn new(palette: &'p [String]) -> Self {
        let mut palette: Vec<&str> = palette.iter().map(String::as_str).collect();
        if palette.is_empty() {
            palette = DEFAULT_PALETTE.to_vec();
        }
        ColorAssigner {
            palette,
            assigned: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn color_for(&mut self, key: &str) -> String {
        if let Some(c) = self.assigned.get(key) {
            return c.clone();
        }
        let color = self.palette[self.order.len() % self.palette.len()].to_string();
        self.assigned.insert(key.to_string(), color.clone());
        self.order.push(key.to_string());
        color
    }

    fn into_legend(mut self) -> Vec<LegendEntry> {
        self.order
            .into_iter()
            .map(|key| {
                let color = self.assigned.remove(&key).unwrap_or_default();
                let label = if key.is_empty() {
                    UNGROUPED_LABEL.to_string()
                } else {
                    key.clone()
                };
                LegendEntry {
                    group_key: key,
                    label,
                    color,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ProjectStatus;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn days() -> ScaleConfig {
        ScaleConfig::for_scale(Scale::Days)
    }

    #[test]
    fn test_empty_input_is_explicit() {
        assert_eq!(build_task_layout(&[], &days(), &LayoutOptions::default()), Layout::Empty);
        let undated = vec![Task::new("TASK1", "no dates")];
        assert!(build_task_layout(&undated, &days(), &LayoutOptions::default()).is_empty());
        assert!(build_portfolio_layout(&[], &days(), &LayoutOptions::default()).is_empty());
    }

    #[test]
    fn test_rows_sorted_naturally_with_indent() {
        let tasks = vec![
            Task::new("TASK10", "ten").with_dates(d(2025, 1, 1), d(2025, 1, 2)),
            Task::new("TASK1.10", "one-ten").with_dates(d(2025, 1, 1), d(2025, 1, 2)),
            Task::new("TASK2", "two").with_dates(d(2025, 1, 1), d(2025, 1, 2)),
            Task::new("TASK1.2", "one-two").with_dates(d(2025, 1, 1), d(2025, 1, 2)),
            Task::new("TASK1", "one").with_dates(d(2025, 1, 1), d(2025, 1, 2)),
            Task::new("TASK1.2.1", "deep").with_dates(d(2025, 1, 1), d(2025, 1, 2)),
        ];
        let layout = build_task_layout(&tasks, &days(), &LayoutOptions::default());
        let chart = layout.chart().unwrap();
        let order: Vec<(&str, usize)> = chart
            .rows
            .iter()
            .map(|r| (r.identifier.as_deref().unwrap(), r.indent_level))
            .collect();
        assert_eq!(
            order,
            [
                ("TASK1", 0),
                ("TASK1.2", 1),
                ("TASK1.2.1", 2),
                ("TASK1.10", 1),
                ("TASK2", 0),
                ("TASK10", 0),
            ]
        );
    }

    #[test]
    fn test_bar_geometry_and_padding() {
        let tasks = vec![
            Task::new("TASK1", "a").with_dates(d(2025, 1, 10), d(2025, 1, 20)),
            Task::new("TASK2", "milestone").with_dates(d(2025, 1, 15), d(2025, 1, 15)),
        ];
        let layout = build_task_layout(&tasks, &days(), &LayoutOptions::default());
        let chart = layout.chart().unwrap();
        assert_eq!(chart.origin, d(2025, 1, 8));
        assert_eq!(chart.end, d(2025, 1, 25));
        assert_eq!(chart.rows[0].bar_offset, 60.0);
        assert_eq!(chart.rows[0].bar_width, 300.0);
        assert_eq!(chart.rows[1].bar_width, 5.0);
        assert_eq!(chart.axis_ticks.len(), 18);
        assert_eq!(chart.total_width, 17.0 * 30.0 + 30.0);
    }

    #[test]
    fn test_colors_first_seen_and_cycle() {
        let opts = LayoutOptions {
            palette: vec!["red".into(), "blue".into()],
            ..Default::default()
        };
        let short = |id: &str| Task::new(id, "t").with_dates(d(2025, 1, 1), d(2025, 1, 2));
        let tasks = vec![
            short("TASK1").with_workstream("Build"),
            short("TASK2").with_workstream("Test"),
            short("TASK3").with_workstream("Build"),
            short("TASK4"),
        ];
        let layout = build_task_layout(&tasks, &days(), &opts);
        let chart = layout.chart().unwrap();
        let colors: Vec<&str> = chart.rows.iter().map(|r| r.color.as_str()).collect();
        assert_eq!(colors, ["red", "blue", "red", "red"]);
        let legend: Vec<&str> = chart.legend.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(legend, ["Build", "Test", "General"]);
    }

    #[test]
    fn test_portfolio_groups_by_status() {
        let projects = vec![
            ProjectSummary {
                name: "Alpha".into(),
                status: ProjectStatus::Active,
                start_date: Some(d(2025, 1, 1)),
                end_date: Some(d(2025, 6, 30)),
                completion: 40,
            },
            ProjectSummary {
                name: "Beta".into(),
                status: ProjectStatus::OnHold,
                start_date: None,
                end_date: None,
                completion: 0,
            },
        ];
        let scale = ScaleConfig::for_scale(Scale::Months);
        let layout = build_portfolio_layout(&projects, &scale, &LayoutOptions::default());
        let chart = layout.chart().unwrap();
        assert_eq!(chart.rows.len(), 1);
        let row = &chart.rows[0];
        assert_eq!(row.kind, RowKind::Project);
        assert_eq!(row.group_key, "Active");
        assert_eq!(row.indent_level, 0);
        assert_eq!(row.identifier, None);
    }
}
