//! Command implementations for the CLI interface.
//!
//! Each handler loads what it needs, calls into the planning engine and
//! prints the outcome. Failures are returned to `main`, which reports them
//! and exits non-zero.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::config::PlanConfig;
use crate::dates::{format_date, format_relative, parse_date_input, truncate};
use crate::db::Database;
use crate::error::{PlanError, Result};
use crate::exchange;
use crate::fields::ProjectStatus;
use crate::forest::Forest;
use crate::layout::{build_portfolio_layout, build_task_layout, Layout, LayoutResult, RowKind};
use crate::plan::{self, ParentPolicy};
use crate::project::{self, create_project, discover_projects};
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::timeline::Scale;

/// Parse `--start` / `--end` values ("today", "in 2w", "2025-03-01", ...).
fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date_input(s, Local::now().date_naive()).ok_or_else(|| {
        format!("unrecognised date '{s}'. Use YYYY-MM-DD, DD/MM/YYYY, 'today', 'friday' or 'in Nd'")
    })
}

fn parse_completion_arg(s: &str) -> std::result::Result<u8, String> {
    let value: u8 = s
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| format!("'{s}' is not a percentage"))?;
    if value > 100 {
        return Err(format!("completion must be 0-100, got {value}"));
    }
    Ok(value)
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Task name.
        name: String,
        /// Explicit identifier (TASKX, TASKX.Y, TASKX.Y.Z). Generated when omitted.
        #[arg(long)]
        id: Option<String>,
        /// Parent task identifier; the new task gets the next child number.
        #[arg(long, conflicts_with = "id")]
        parent: Option<String>,
        #[arg(long, default_value = "")]
        resource: String,
        #[arg(long, default_value = "")]
        workstream: String,
        /// Start date: YYYY-MM-DD, "today", "monday", "in 3d".
        #[arg(long, value_parser = parse_date_arg)]
        start: Option<NaiveDate>,
        /// End date, same formats as --start.
        #[arg(long, value_parser = parse_date_arg)]
        end: Option<NaiveDate>,
        /// Completion percentage (0-100).
        #[arg(long, value_parser = parse_completion_arg, default_value = "0")]
        completion: u8,
    },

    /// Update fields on a task. Ancestors are kept consistent.
    Update {
        /// Task identifier to update
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        resource: Option<String>,
        #[arg(long)]
        workstream: Option<String>,
        #[arg(long, value_parser = parse_date_arg)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        end: Option<NaiveDate>,
        #[arg(long, value_parser = parse_completion_arg)]
        completion: Option<u8>,
        /// Clear both dates before applying --start/--end.
        #[arg(long)]
        clear_dates: bool,
    },

    /// Delete a task.
    Delete {
        /// Task identifier to delete
        id: String,
        /// Also delete all descendants.
        #[arg(long)]
        cascade: bool,
    },

    /// List tasks in natural identifier order.
    List {
        /// Indent sub-tasks under their parents.
        #[arg(long)]
        tree: bool,
        /// Filter by workstream.
        #[arg(long)]
        workstream: Option<String>,
        /// Filter by resource.
        #[arg(long)]
        resource: Option<String>,
    },

    /// View a single task.
    View {
        /// Task identifier to view
        id: String,
        /// Show child subtree.
        #[arg(long)]
        children: bool,
        /// Show ancestor chain.
        #[arg(long)]
        parents: bool,
    },

    /// Draw the project's Gantt chart.
    Gantt {
        /// Axis granularity. Defaults to the configured scale.
        #[arg(long, value_enum)]
        scale: Option<Scale>,
        /// Print the layout as JSON instead of drawing it.
        #[arg(long)]
        json: bool,
        /// Terminal width to draw into.
        #[arg(long, default_value_t = 120)]
        width: usize,
    },

    /// Draw one bar per project, coloured by status.
    Portfolio {
        #[arg(long, value_enum)]
        scale: Option<Scale>,
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 120)]
        width: usize,
    },

    /// List projects with their status, dates and completion.
    Projects,

    /// Create a new, empty project.
    NewProject {
        /// Project display name
        name: String,
    },

    /// Set the status of the current project.
    SetStatus {
        #[arg(value_enum)]
        status: ProjectStatus,
    },

    /// Recompute every parent's dates and completion from its children.
    Recompute,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Export tasks to CSV format.
    Export {
        /// Output file path (default: tasks.csv)
        #[arg(long, short)]
        output: Option<String>,
        /// Write only the header row, for filling in by hand.
        #[arg(long)]
        template: bool,
    },

    /// Import tasks from CSV. Existing identifiers are updated, new ones added.
    Import {
        /// Input CSV file path
        input: String,
        /// Skip creating backup before import
        #[arg(long)]
        no_backup: bool,
    },

    /// Create timestamped backup of current project or all projects.
    Backup {
        /// Backup all projects instead of just current
        #[arg(long)]
        all: bool,
    },
}

impl Commands {
    /// Commands that work on the data directory rather than one project.
    pub fn needs_project(&self) -> bool {
        !matches!(
            self,
            Commands::Portfolio { .. }
                | Commands::Projects
                | Commands::NewProject { .. }
                | Commands::Completions { .. }
                | Commands::Backup { all: true }
        )
    }
}

/// Add a new task to the project.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    name: String,
    id: Option<String>,
    parent: Option<String>,
    resource: String,
    workstream: String,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    completion: u8,
) -> Result<()> {
    let draft = TaskDraft {
        identifier: id,
        name,
        resource,
        workstream,
        start_date: start,
        end_date: end,
        completion,
    };
    let outcome = plan::create_task(db, draft, parent.as_deref(), ParentPolicy::Required)?;
    db.save(db_path)?;

    println!("Added {} {}", outcome.task.identifier, outcome.task.name);
    print_propagated(&outcome.propagated);
    Ok(())
}

/// Update an existing task's fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    id: String,
    name: Option<String>,
    resource: Option<String>,
    workstream: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    completion: Option<u8>,
    clear_dates: bool,
) -> Result<()> {
    let extended = end.and_then(|e| plan::extends_parent(db, &id, e).map(|old| (old, e)));
    let patch = TaskPatch {
        name,
        resource,
        workstream,
        start_date: start,
        end_date: end,
        completion,
        clear_dates,
    };
    let outcome = plan::update_task(db, &id, &patch)?;
    db.save(db_path)?;

    println!("Updated task {}", outcome.task.identifier);
    if let (Some((old, new)), Some(parent)) = (extended, outcome.task.parent_identifier()) {
        println!("Note: {parent} end date moved from {old} to {new}");
    }
    print_propagated(&outcome.propagated);
    Ok(())
}

fn print_propagated(ids: &[String]) {
    if !ids.is_empty() {
        println!("Updated ancestors: {}", ids.join(", "));
    }
}

/// Delete a task; descendants require `--cascade`.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: String, cascade: bool) -> Result<()> {
    let forest = Forest::build(db.tasks.clone())?;
    let idx = forest.find(&id).ok_or_else(|| PlanError::TaskNotFound(id.clone()))?;
    let doomed = forest.subtree_identifiers(idx);
    if doomed.len() > 1 && !cascade {
        return Err(PlanError::HasDescendants {
            identifier: id,
            count: doomed.len() - 1,
        });
    }

    let outcome = plan::delete_task(db, &id)?;
    db.save(db_path)?;

    println!("Deleted {}", outcome.removed.join(", "));
    print_propagated(&outcome.propagated);
    Ok(())
}

/// Print tasks in a formatted table with optional tree indentation.
fn print_table(tasks: &[&Task], tree: bool) {
    println!(
        "{:<12} {:<10} {:<10} {:>5} {:<10} {:<14} {:<12} {}",
        "ID", "Start", "End", "Done", "Due", "Workstream", "Resource", "Name"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        let indent = if tree {
            "  ".repeat(t.depth())
        } else {
            String::new()
        };
        println!(
            "{:<12} {:<10} {:<10} {:>4}% {:<10} {:<14} {:<12} {}{}",
            t.identifier,
            format_date(t.start_date),
            format_date(t.end_date),
            t.completion,
            format_relative(t.end_date, today),
            truncate(&t.workstream, 14),
            truncate(&t.resource, 12),
            indent,
            t.name,
        );
    }
}

/// List tasks in natural order, optionally filtered.
pub fn cmd_list(
    db: &Database,
    tree: bool,
    workstream: Option<String>,
    resource: Option<String>,
) -> Result<()> {
    let tasks: Vec<&Task> = if tree {
        let forest = Forest::build(db.tasks.clone())?;
        let order: Vec<&str> = forest
            .preorder()
            .into_iter()
            .map(|i| forest.get(i).identifier.as_str())
            .collect();
        order.into_iter().filter_map(|id| db.get(id)).collect()
    } else {
        db.sorted_tasks()
    };

    let filtered: Vec<&Task> = tasks
        .into_iter()
        .filter(|t| workstream.as_deref().map_or(true, |w| t.workstream.eq_ignore_ascii_case(w)))
        .filter(|t| resource.as_deref().map_or(true, |r| t.resource.eq_ignore_ascii_case(r)))
        .collect();

    if filtered.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    print_table(&filtered, tree);
    Ok(())
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, id: String, children: bool, parents: bool) -> Result<()> {
    let forest = Forest::build(db.tasks.clone())?;
    let idx = forest.find(&id).ok_or_else(|| PlanError::TaskNotFound(id.clone()))?;
    let task = forest.get(idx);
    let today = Local::now().date_naive();
    let timestamp = |secs: i64| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".into())
    };

    println!("ID:           {}", task.identifier);
    println!("Name:         {}", task.name);
    println!("Resource:     {}", if task.resource.is_empty() { "-" } else { &task.resource });
    let workstream = if task.workstream.is_empty() {
        "-"
    } else {
        &task.workstream
    };
    println!("Workstream:   {workstream}");
    println!("Start:        {}", format_date(task.start_date));
    println!(
        "End:          {}",
        match task.end_date {
            Some(d) => format!("{d} ({})", format_relative(Some(d), today)),
            None => "-".into(),
        }
    );
    println!("Completion:   {}%", task.completion);
    println!("Parent:       {}", task.parent_identifier().unwrap_or("-"));
    println!("Created UTC:  {}", timestamp(task.created_at_utc));
    println!("Updated UTC:  {}", timestamp(task.updated_at_utc));

    if parents {
        let chain: Vec<&str> = forest
            .ancestors(idx)?
            .into_iter()
            .map(|a| forest.get(a).identifier.as_str())
            .collect();
        if chain.is_empty() {
            println!("Ancestors: -");
        } else {
            println!("Ancestors (closest first): {}", chain.join(" -> "));
        }
    }

    if children {
        println!("Children:");
        let mut any = false;
        for (_, child) in forest.descendants(idx) {
            any = true;
            let depth = child.depth() - task.depth();
            println!(
                "{}- {} {} [{}%]",
                "  ".repeat(depth),
                child.identifier,
                child.name,
                child.completion
            );
        }
        if !any {
            println!("  -");
        }
    }
    Ok(())
}

/// Draw a chart as text: a label column followed by bars scaled to `width`.
///
/// Completed work is drawn solid, the remainder shaded.
pub fn render_chart(chart: &LayoutResult, width: usize) -> String {
    const LABEL_WIDTH: usize = 32;
    let area = width.saturating_sub(LABEL_WIDTH + 3).max(20);
    let factor = if chart.total_width > 0.0 {
        area as f64 / chart.total_width
    } else {
        0.0
    };
    let column = |x: f64| ((x * factor).floor().max(0.0) as usize).min(area.saturating_sub(1));

    let mut out = String::new();

    let mut axis = vec![' '; area];
    let mut next_free = 0;
    for tick in &chart.axis_ticks {
        let col = column(tick.offset);
        if col < next_free || col + tick.label.chars().count() > area {
            continue;
        }
        for (i, ch) in tick.label.chars().enumerate() {
            axis[col + i] = ch;
        }
        next_free = col + tick.label.chars().count() + 1;
    }
    let title = format!("{} timeline", chart.scale);
    let axis: String = axis.iter().collect();
    out.push_str(&format!("{title:<LABEL_WIDTH$} | {axis}\n"));

    for row in &chart.rows {
        let label = match (&row.kind, &row.identifier) {
            (RowKind::Task, Some(id)) => {
                format!("{}{} {}", "  ".repeat(row.indent_level), id, row.label)
            }
            _ => row.label.clone(),
        };
        let start = column(row.bar_offset);
        let len = ((row.bar_width * factor).round() as usize).clamp(1, area - start);
        let done = len * usize::from(row.completion) / 100;
        out.push_str(&format!(
            "{:<LABEL_WIDTH$} | {}{}{}{}\n",
            truncate(&label, LABEL_WIDTH),
            " ".repeat(start),
            "█".repeat(done),
            "░".repeat(len - done),
            " ".repeat(area - start - len),
        ));
    }

    if !chart.legend.is_empty() {
        let entries: Vec<String> = chart
            .legend
            .iter()
            .map(|e| format!("{} {}", e.color, e.label))
            .collect();
        out.push_str(&format!("Legend: {}\n", entries.join("  ")));
    }
    out
}

fn print_layout(layout: &Layout, json: bool, width: usize, empty_message: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(layout)?);
        return Ok(());
    }
    match layout.chart() {
        Some(chart) => print!("{}", render_chart(chart, width)),
        None => println!("{empty_message}"),
    }
    Ok(())
}

/// Lay out and draw the current project's tasks.
pub fn cmd_gantt(
    db: &Database,
    config: &PlanConfig,
    scale: Option<Scale>,
    json: bool,
    width: usize,
) -> Result<()> {
    let scale = config.scale_config(scale.unwrap_or(config.default_scale));
    let layout = build_task_layout(&db.tasks, &scale, &config.layout_options());
    print_layout(&layout, json, width, "No dated tasks to show.")
}

/// Lay out and draw one row per project.
pub fn cmd_portfolio(
    data_dir: &Path,
    config: &PlanConfig,
    scale: Option<Scale>,
    json: bool,
    width: usize,
) -> Result<()> {
    let summaries = project::portfolio(data_dir)?;
    let scale = config.scale_config(scale.unwrap_or(config.default_scale));
    let layout = build_portfolio_layout(&summaries, &scale, &config.layout_options());
    print_layout(&layout, json, width, "No projects with dated tasks.")
}

/// List all projects in the data directory.
pub fn cmd_projects(data_dir: &Path) -> Result<()> {
    let projects = discover_projects(data_dir)?;
    if projects.is_empty() {
        println!("No projects. Create one with `plan new-project <name>`.");
        return Ok(());
    }
    println!("{:<24} {:<10} {:<10} {:<10} {:>5}", "Project", "Status", "Start", "End", "Done");
    for p in projects {
        let s = p.summary()?;
        println!(
            "{:<24} {:<10} {:<10} {:<10} {:>4}%",
            truncate(&p.display_name, 24),
            s.status,
            format_date(s.start_date),
            format_date(s.end_date),
            s.completion
        );
    }
    Ok(())
}

pub fn cmd_new_project(data_dir: &Path, name: String) -> Result<()> {
    let project = create_project(&name, data_dir)?;
    println!("Created project '{}' at {}", project.display_name, project.file_path.display());
    Ok(())
}

pub fn cmd_set_status(db: &mut Database, db_path: &Path, status: ProjectStatus) -> Result<()> {
    db.status = status;
    db.save(db_path)?;
    println!("Project status set to {status}");
    Ok(())
}

pub fn cmd_recompute(db: &mut Database, db_path: &Path) -> Result<()> {
    let changed = plan::recompute(db)?;
    db.save(db_path)?;
    if changed.is_empty() {
        println!("Plan already consistent.");
    } else {
        println!("Recomputed {} task(s): {}", changed.len(), changed.join(", "));
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Export tasks, or just the header row, to CSV.
pub fn cmd_export(db: &Database, output: Option<String>, template: bool) -> Result<()> {
    let output_path = output.unwrap_or_else(|| "tasks.csv".to_string());
    let content = if template {
        exchange::template_csv()
    } else {
        exchange::export_csv(&db.tasks)
    };
    fs::write(&output_path, content)?;

    if template {
        println!("Wrote import template to {output_path}");
    } else {
        println!("Exported {} task(s) to {}", db.tasks.len(), output_path);
    }
    Ok(())
}

/// Create a timestamped backup of the database file in a `backup/` sibling directory.
pub fn create_backup(db_path: &Path) -> Result<PathBuf> {
    if !db_path.exists() {
        return Err(PlanError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("database file {} does not exist", db_path.display()),
        )));
    }

    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let db_filename = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("tasks.json");
    let backup_path = backup_dir.join(format!("{timestamp}_{db_filename}"));

    fs::copy(db_path, &backup_path)?;
    Ok(backup_path)
}

/// Import tasks from CSV. Nothing is saved unless every row applies cleanly.
pub fn cmd_import(db: &mut Database, db_path: &Path, input: String, no_backup: bool) -> Result<()> {
    let content = fs::read_to_string(&input)?;
    let rows = exchange::parse_csv(&content)?;

    if !no_backup && db_path.exists() {
        let backup = create_backup(db_path)?;
        println!("Created backup: {}", backup.display());
    }

    let mut staged = db.clone();
    let summary = plan::import_rows(&mut staged, rows)?;
    staged.save(db_path)?;
    *db = staged;

    println!(
        "Import completed. {} task(s) added, {} updated.",
        summary.added, summary.updated
    );
    Ok(())
}

pub fn cmd_backup(db_path: &Path) -> Result<()> {
    let backup = create_backup(db_path)?;
    println!("Backup created: {}", backup.display());
    Ok(())
}

/// Backup all projects in the data directory.
pub fn cmd_backup_all(data_dir: &Path) -> Result<()> {
    let projects = discover_projects(data_dir)?;
    if projects.is_empty() {
        println!("No projects found to backup.");
        return Ok(());
    }

    let mut failures = 0;
    for project in &projects {
        match create_backup(&project.file_path) {
            Ok(path) => println!("  {} -> {}", project.display_name, path.display()),
            Err(e) => {
                eprintln!("  Failed to backup {}: {}", project.display_name, e);
                failures += 1;
            }
        }
    }
    println!("Backed up {} of {} project(s).", projects.len() - failures, projects.len());
    Ok(())
}
