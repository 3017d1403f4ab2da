//! Edit operations on a project plan.
//!
//! Every operation follows the same shape: read a snapshot from the store,
//! validate, apply the edit to a [`Forest`], propagate to ancestors, then
//! write back every task that changed. Validation happens before anything is
//! mutated, so a rejected edit leaves the store untouched.

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::error::{PlanError, Result};
use crate::forest::Forest;
use crate::ident;
use crate::propagate;
use crate::store::TaskStore;
use crate::task::{Task, TaskDraft, TaskPatch};

/// What to do when a task's derived parent is not in the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentPolicy {
    /// Fail with `ParentNotFound` (manual entry of a sub-task).
    Required,
    /// Treat the task as a root (bulk import).
    Optional,
}

/// Result of a create or update.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub task: Task,
    /// Ancestors rewritten by propagation, nearest first.
    pub propagated: Vec<String>,
}

/// Result of a delete.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    /// The task and its descendants, in natural order.
    pub removed: Vec<String>,
    pub propagated: Vec<String>,
}

/// Create a task.
///
/// With no identifier in the draft one is generated: the next child of
/// `parent` when given, otherwise the next root.
pub fn create_task<S: TaskStore>(
    store: &mut S,
    draft: TaskDraft,
    parent: Option<&str>,
    policy: ParentPolicy,
) -> Result<EditOutcome> {
    let mut forest = Forest::build(store.fetch_tasks())?;
    let identifier = resolve_identifier(&forest, &draft, parent)?;

    if ident::depth(&identifier) > ident::MAX_DEPTH {
        return Err(PlanError::DepthExceeded(identifier));
    }
    if forest.find(&identifier).is_some() {
        return Err(PlanError::DuplicateIdentifier(identifier));
    }
    if let Some(p) = ident::parent_of(&identifier) {
        if forest.find(p).is_none() && policy == ParentPolicy::Required {
            return Err(PlanError::ParentNotFound(p.to_string()));
        }
    }

    let task = draft.into_task(identifier, Utc::now().timestamp());
    task.validate_fields()?;

    let idx = forest.insert(task)?;
    propagate::after_edit(&mut forest, idx);
    let outcome = EditOutcome {
        task: forest.get(idx).clone(),
        propagated: changed_ancestors(&forest, idx),
    };
    persist(store, &forest)?;
    info!(task = %outcome.task.identifier, propagated = outcome.propagated.len(), "created task");
    Ok(outcome)
}

fn resolve_identifier(forest: &Forest, draft: &TaskDraft, parent: Option<&str>) -> Result<String> {
    if let Some(requested) = draft.requested_identifier() {
        if !ident::is_valid(requested) || !ident::within_limits(requested) {
            return Err(PlanError::InvalidIdentifierFormat(requested.to_string()));
        }
        if let Some(p) = parent {
            if ident::parent_of(requested) != Some(p) {
                return Err(PlanError::InvalidIdentifierFormat(requested.to_string()));
            }
        }
        return Ok(requested.to_string());
    }

    let existing: Vec<&str> = forest
        .preorder()
        .into_iter()
        .map(|i| forest.get(i).identifier.as_str())
        .collect();
    match parent {
        Some(p) => {
            if forest.find(p).is_none() {
                return Err(PlanError::ParentNotFound(p.to_string()));
            }
            ident::generate_child_id(existing, p)
                .ok_or_else(|| PlanError::IdentifiersExhausted(p.to_string()))
        }
        None => ident::generate_root_id(existing)
            .ok_or_else(|| PlanError::IdentifiersExhausted(ident::PREFIX.to_string())),
    }
}

/// Apply a patch to an existing task. Identifiers cannot be changed.
pub fn update_task<S: TaskStore>(
    store: &mut S,
    identifier: &str,
    patch: &TaskPatch,
) -> Result<EditOutcome> {
    let mut forest = Forest::build(store.fetch_tasks())?;
    let idx = forest
        .find(identifier)
        .ok_or_else(|| PlanError::TaskNotFound(identifier.to_string()))?;

    let mut candidate = forest.get(idx).clone();
    patch.apply(&mut candidate);
    candidate.validate_fields()?;
    candidate.updated_at_utc = Utc::now().timestamp();

    *forest.get_mut(idx) = candidate;
    forest.mark_changed(idx);
    propagate::after_edit(&mut forest, idx);
    let outcome = EditOutcome {
        task: forest.get(idx).clone(),
        propagated: changed_ancestors(&forest, idx),
    };
    persist(store, &forest)?;
    info!(task = identifier, propagated = outcome.propagated.len(), "updated task");
    Ok(outcome)
}

/// Delete a task and its descendants, then re-aggregate the former parent's
/// completion. Ancestor date ranges are left as they are.
pub fn delete_task<S: TaskStore>(store: &mut S, identifier: &str) -> Result<DeleteOutcome> {
    let forest = Forest::build(store.fetch_tasks())?;
    let idx = forest
        .find(identifier)
        .ok_or_else(|| PlanError::TaskNotFound(identifier.to_string()))?;
    let parent = forest.parent(idx).map(|p| forest.get(p).identifier.clone());

    let removed = store.delete_task(identifier)?;

    let mut propagated = Vec::new();
    if let Some(parent) = parent {
        let mut forest = Forest::build(store.fetch_tasks())?;
        if let Some(p) = forest.find(&parent) {
            let changed = propagate::aggregate_completion(&mut forest, p);
            propagated = changed.iter().map(|&i| forest.get(i).identifier.clone()).collect();
            persist(store, &forest)?;
        }
    }
    info!(task = identifier, removed = removed.len(), "deleted task");
    Ok(DeleteOutcome {
        removed,
        propagated,
    })
}

/// Parent's current end date if `end` would push it later, `None` otherwise.
///
/// Lets callers confirm before an edit widens the parent.
pub fn extends_parent<S: TaskStore>(
    store: &S,
    identifier: &str,
    end: NaiveDate,
) -> Option<NaiveDate> {
    let parent = ident::parent_of(identifier)?;
    let parent_end = store.fetch_task(parent).ok()?.end_date?;
    (end > parent_end).then_some(parent_end)
}

/// Full recompute of every parent from its children. May shrink ranges.
pub fn recompute<S: TaskStore>(store: &mut S) -> Result<Vec<String>> {
    let mut forest = Forest::build(store.fetch_tasks())?;
    let changed = propagate::recompute_all(&mut forest);
    persist(store, &forest)?;
    info!(changed = changed.len(), "recomputed plan");
    Ok(changed)
}

/// One parsed import row.
#[derive(Debug, Clone, Default)]
pub struct ImportRow {
    /// Source line, for error messages.
    pub line: usize,
    pub identifier: Option<String>,
    pub name: String,
    pub resource: String,
    pub workstream: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub completion: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
}

/// Upsert rows through the same create/update path as manual edits.
///
/// Rows are applied in natural identifier order so parents land before their
/// children. The first failing row stops the import; callers that persist
/// only on success get all-or-nothing behaviour.
pub fn import_rows<S: TaskStore>(store: &mut S, mut rows: Vec<ImportRow>) -> Result<ImportSummary> {
    rows.sort_by_cached_key(|r| r.identifier.as_deref().map(ident::sort_key).unwrap_or_default());

    let mut summary = ImportSummary::default();
    for row in rows {
        let line = row.line;
        let id = row
            .identifier
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != ident::PREFIX)
            .map(str::to_string);
        let exists = id.as_deref().is_some_and(|id| store.fetch_task(id).is_ok());

        let result = match id {
            Some(id) if exists => {
                let patch = TaskPatch {
                    name: Some(row.name),
                    resource: Some(row.resource),
                    workstream: Some(row.workstream),
                    start_date: row.start_date,
                    end_date: row.end_date,
                    completion: Some(row.completion),
                    clear_dates: true,
                };
                update_task(store, &id, &patch).map(|_| summary.updated += 1)
            }
            id => {
                let draft = TaskDraft {
                    identifier: id,
                    name: row.name,
                    resource: row.resource,
                    workstream: row.workstream,
                    start_date: row.start_date,
                    end_date: row.end_date,
                    completion: row.completion,
                };
                create_task(store, draft, None, ParentPolicy::Optional).map(|_| summary.added += 1)
            }
        };
        result.map_err(|e| PlanError::InvalidCsv {
            line,
            reason: e.to_string(),
        })?;
    }
    info!(added = summary.added, updated = summary.updated, "imported tasks");
    Ok(summary)
}

fn changed_ancestors(forest: &Forest, idx: usize) -> Vec<String> {
    let changed: Vec<&str> = forest.changed().map(|t| t.identifier.as_str()).collect();
    forest
        .ancestors(idx)
        .unwrap_or_default()
        .into_iter()
        .map(|a| forest.get(a).identifier.as_str())
        .filter(|id| changed.contains(id))
        .map(str::to_string)
        .collect()
}

fn persist<S: TaskStore>(store: &mut S, forest: &Forest) -> Result<()> {
    for task in forest.changed() {
        store.save_task(task.clone())?;
    }
    Ok(())
}
