//! Upward consistency propagation.
//!
//! Two independent walks keep ancestors in step with an edited task:
//!
//! - **Date expansion** widens every ancestor's range to cover the edited
//!   task's dates. It only ever widens; a shrunk or deleted child leaves its
//!   ancestors' ranges as they were until [`recompute_all`] is run.
//! - **Completion aggregation** sets a parent's completion to the
//!   duration-weighted mean of its direct children and climbs while the value
//!   keeps changing.
//!
//! Both walks are iterative and bounded by the ancestor chain. A malformed
//! record abandons the walk with a warning; it never fails the edit.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::PlanError;
use crate::forest::Forest;

/// Run both propagations after `idx` was created or updated.
pub fn after_edit(forest: &mut Forest, idx: usize) {
    let Some(parent) = forest.parent(idx) else {
        return;
    };
    expand_dates(forest, idx);
    aggregate_completion(forest, parent);
}

/// Widen every ancestor of `edited` so its range covers the edited task's.
///
/// Each ancestor is compared against the edited task's own dates, never
/// against its recomputed children, and the walk always continues to the
/// root. Returns the arena indices of ancestors that changed.
pub fn expand_dates(forest: &mut Forest, edited: usize) -> Vec<usize> {
    let mut changed = Vec::new();
    let (start, end) = match edited_range(forest, edited) {
        Ok(Some(range)) => range,
        Ok(None) => {
            debug!(task = %forest.get(edited).identifier, "undated task, no date expansion");
            return changed;
        }
        Err(e) => {
            warn!(error = %e, "skipping date expansion");
            return changed;
        }
    };

    let ancestors = match forest.ancestors(edited) {
        Ok(chain) => chain,
        Err(e) => {
            warn!(error = %e, "skipping date expansion");
            return changed;
        }
    };

    for anc in ancestors {
        let task = forest.get(anc);
        let (Some(a_start), Some(a_end)) = (task.start_date, task.end_date) else {
            let field = if task.start_date.is_none() {
                "start date"
            } else {
                "end date"
            };
            let e = PlanError::MalformedDate {
                identifier: task.identifier.clone(),
                field,
            };
            warn!(error = %e, "abandoning date expansion for this branch");
            break;
        };

        let mut dirty = false;
        let task = forest.get_mut(anc);
        if end > a_end {
            task.end_date = Some(end);
            dirty = true;
        }
        if start < a_start {
            task.start_date = Some(start);
            dirty = true;
        }
        if dirty {
            debug!(
                task = %task.identifier,
                start = ?task.start_date,
                end = ?task.end_date,
                "expanded ancestor range"
            );
            forest.mark_changed(anc);
            changed.push(anc);
        }
    }
    changed
}

fn edited_range(forest: &Forest, idx: usize) -> Result<Option<(NaiveDate, NaiveDate)>, PlanError> {
    let t = forest.get(idx);
    match (t.start_date, t.end_date) {
        (Some(s), Some(e)) => Ok(Some((s, e))),
        (None, None) => Ok(None),
        (None, Some(_)) => Err(PlanError::MalformedDate {
            identifier: t.identifier.clone(),
            field: "start date",
        }),
        (Some(_), None) => Err(PlanError::MalformedDate {
            identifier: t.identifier.clone(),
            field: "end date",
        }),
    }
}

/// Duration-weighted completion of `idx`'s direct children, rounded.
///
/// `None` when the task has no children.
pub fn weighted_completion(forest: &Forest, idx: usize) -> Option<u8> {
    let children = forest.children(idx);
    if children.is_empty() {
        return None;
    }
    let (mut weighted, mut total) = (0i64, 0i64);
    for &c in children {
        let child = forest.get(c);
        let w = child.weight_days();
        weighted += i64::from(child.completion.min(100)) * w;
        total += w;
    }
    // Round half up; total is at least one per child.
    let value = (2 * weighted + total) / (2 * total);
    Some(value.clamp(0, 100) as u8)
}

/// Recompute `parent`'s completion from its children and climb while it changes.
///
/// A task with no children keeps its own, user-supplied completion. Returns
/// the arena indices whose completion changed.
pub fn aggregate_completion(forest: &mut Forest, parent: usize) -> Vec<usize> {
    let mut changed = Vec::new();
    let mut seen = HashSet::new();
    let mut cur = Some(parent);

    while let Some(idx) = cur {
        if !seen.insert(idx) {
            let e = PlanError::MalformedData(format!(
                "{} revisited during completion aggregation",
                forest.get(idx).identifier
            ));
            warn!(error = %e, "abandoning completion aggregation");
            break;
        }
        let Some(value) = weighted_completion(forest, idx) else {
            break;
        };
        let task = forest.get_mut(idx);
        if task.completion == value {
            break;
        }
        debug!(
            task = %task.identifier,
            from = task.completion,
            to = value,
            "aggregated completion"
        );
        task.completion = value;
        forest.mark_changed(idx);
        changed.push(idx);
        cur = forest.parent(idx);
    }
    changed
}

/// Full bottom-up recompute of every parent's range and completion.
///
/// Unlike [`expand_dates`] this may shrink a range: each parent ends up
/// spanning exactly its dated children. Returns the identifiers that changed.
pub fn recompute_all(forest: &mut Forest) -> Vec<String> {
    let mut order = forest.preorder();
    order.reverse();

    let mut changed = Vec::new();
    for idx in order {
        if forest.children(idx).is_empty() {
            continue;
        }
        let mut min_start: Option<NaiveDate> = None;
        let mut max_end: Option<NaiveDate> = None;
        for &c in forest.children(idx) {
            let child = forest.get(c);
            if let Some(s) = child.start_date {
                min_start = Some(min_start.map_or(s, |m| m.min(s)));
            }
            if let Some(e) = child.end_date {
                max_end = Some(max_end.map_or(e, |m| m.max(e)));
            }
        }
        let completion = weighted_completion(forest, idx);

        let task = forest.get_mut(idx);
        let mut dirty = false;
        if min_start.is_some() && task.start_date != min_start {
            task.start_date = min_start;
            dirty = true;
        }
        if max_end.is_some() && task.end_date != max_end {
            task.end_date = max_end;
            dirty = true;
        }
        if let Some(value) = completion {
            if task.completion != value {
                task.completion = value;
                dirty = true;
            }
        }
        if dirty {
            changed.push(task.identifier.clone());
            forest.mark_changed(idx);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_expansion_reaches_grandparent() {
        let tasks = vec![
            Task::new("TASK1", "root").with_dates(d(2025, 1, 5), d(2025, 1, 8)),
            Task::new("TASK1.1", "parent").with_dates(d(2025, 1, 1), d(2025, 1, 10)),
            Task::new("TASK1.1.1", "child").with_dates(d(2024, 12, 20), d(2025, 1, 10)),
        ];
        let mut f = Forest::build(tasks).unwrap();
        let child = f.find("TASK1.1.1").unwrap();
        let changed = expand_dates(&mut f, child);
        assert_eq!(changed.len(), 2);

        let expected = (Some(d(2024, 12, 20)), Some(d(2025, 1, 10)));
        let parent = f.task("TASK1.1").unwrap();
        assert_eq!((parent.start_date, parent.end_date), expected);
        // Grandparent is checked against the child's dates, not the parent's.
        let root = f.task("TASK1").unwrap();
        assert_eq!((root.start_date, root.end_date), expected);
    }

    #[test]
    fn test_expansion_continues_past_unchanged_level() {
        let tasks = vec![
            Task::new("TASK1", "root").with_dates(d(2025, 1, 1), d(2025, 1, 5)),
            Task::new("TASK1.1", "wide parent").with_dates(d(2025, 1, 1), d(2025, 3, 1)),
            Task::new("TASK1.1.1", "child").with_dates(d(2025, 1, 2), d(2025, 2, 1)),
        ];
        let mut f = Forest::build(tasks).unwrap();
        let child = f.find("TASK1.1.1").unwrap();
        expand_dates(&mut f, child);
        assert_eq!(f.task("TASK1.1").unwrap().end_date, Some(d(2025, 3, 1)));
        assert_eq!(f.task("TASK1").unwrap().end_date, Some(d(2025, 2, 1)));
    }

    #[test]
    fn test_expansion_never_shrinks() {
        let tasks = vec![
            Task::new("TASK1", "p").with_dates(d(2025, 1, 1), d(2025, 1, 31)),
            Task::new("TASK1.1", "c").with_dates(d(2025, 1, 10), d(2025, 1, 12)),
        ];
        let mut f = Forest::build(tasks).unwrap();
        let c = f.find("TASK1.1").unwrap();
        assert!(expand_dates(&mut f, c).is_empty());
        let p = f.task("TASK1").unwrap();
        assert_eq!((p.start_date, p.end_date), (Some(d(2025, 1, 1)), Some(d(2025, 1, 31))));
    }

    #[test]
    fn test_expansion_abandons_on_undated_ancestor() {
        let tasks = vec![
            Task::new("TASK1", "root").with_dates(d(2025, 1, 1), d(2025, 1, 2)),
            Task::new("TASK1.1", "undated"),
            Task::new("TASK1.1.1", "c").with_dates(d(2025, 2, 1), d(2025, 2, 3)),
        ];
        let mut f = Forest::build(tasks).unwrap();
        let c = f.find("TASK1.1.1").unwrap();
        assert!(expand_dates(&mut f, c).is_empty());
        assert_eq!(f.task("TASK1").unwrap().end_date, Some(d(2025, 1, 2)));
    }

    #[test]
    fn test_weighted_completion_scenario() {
        let tasks = vec![
            Task::new("TASK1", "p").with_dates(d(2025, 1, 1), d(2025, 1, 10)),
            Task::new("TASK1.1", "short")
                .with_dates(d(2025, 1, 1), d(2025, 1, 2))
                .with_completion(100),
            Task::new("TASK1.2", "long").with_dates(d(2025, 1, 3), d(2025, 1, 10)),
        ];
        let mut f = Forest::build(tasks).unwrap();
        let p = f.find("TASK1").unwrap();
        assert_eq!(aggregate_completion(&mut f, p), vec![p]);
        assert_eq!(f.get(p).completion, 20);
    }

    #[test]
    fn test_aggregation_idempotent() {
        let tasks = vec![
            Task::new("TASK1", "root"),
            Task::new("TASK1.1", "p"),
            Task::new("TASK1.1.1", "a")
                .with_dates(d(2025, 1, 1), d(2025, 1, 3))
                .with_completion(50),
            Task::new("TASK1.1.2", "b").with_completion(10),
            Task::new("TASK1.2", "q").with_completion(90),
        ];
        let mut f = Forest::build(tasks).unwrap();
        let p = f.find("TASK1.1").unwrap();
        let first = aggregate_completion(&mut f, p);
        assert_eq!(first.len(), 2);
        // (50*3 + 10*1) / 4 = 40; root: (40*1 + 90*1) / 2 = 65
        assert_eq!(f.task("TASK1.1").unwrap().completion, 40);
        assert_eq!(f.task("TASK1").unwrap().completion, 65);

        let snapshot: Vec<u8> = f.preorder().iter().map(|&i| f.get(i).completion).collect();
        assert!(aggregate_completion(&mut f, p).is_empty());
        let again: Vec<u8> = f.preorder().iter().map(|&i| f.get(i).completion).collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn test_leaf_completion_untouched() {
        let mut f = Forest::build(vec![Task::new("TASK1", "leaf").with_completion(33)]).unwrap();
        let idx = f.find("TASK1").unwrap();
        assert!(aggregate_completion(&mut f, idx).is_empty());
        assert_eq!(f.get(idx).completion, 33);
    }

    #[test]
    fn test_after_edit_root_is_noop() {
        let root = Task::new("TASK1", "r").with_dates(d(2025, 1, 1), d(2025, 1, 2));
        let mut f = Forest::build(vec![root]).unwrap();
        after_edit(&mut f, 0);
        assert_eq!(f.changed().count(), 0);
    }

    #[test]
    fn test_recompute_all_shrinks() {
        let tasks = vec![
            Task::new("TASK1", "p").with_dates(d(2024, 1, 1), d(2026, 1, 1)).with_completion(5),
            Task::new("TASK1.1", "a").with_dates(d(2025, 1, 1), d(2025, 1, 4)).with_completion(100),
            Task::new("TASK1.2", "b").with_dates(d(2025, 1, 5), d(2025, 1, 8)),
        ];
        let mut f = Forest::build(tasks).unwrap();
        assert_eq!(recompute_all(&mut f), vec!["TASK1".to_string()]);
        let p = f.task("TASK1").unwrap();
        assert_eq!((p.start_date, p.end_date), (Some(d(2025, 1, 1)), Some(d(2025, 1, 8))));
        assert_eq!(p.completion, 50);
        assert!(recompute_all(&mut f).is_empty());
    }
}
