//! Task data structure and related functionality.
//!
//! This module defines the core `Task` struct that represents a single node in a
//! project plan, along with the draft and patch shapes used by edit operations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::ident;

/// A node in a project's task hierarchy.
///
/// The parent relationship is not stored; it is derived from the identifier
/// (`TASK1.2` is a child of `TASK1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub workstream: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub completion: u8,
    #[serde(default)]
    pub created_at_utc: i64,
    #[serde(default)]
    pub updated_at_utc: i64,
}

impl Task {
    /// Create a task with no dates and zero completion.
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Task {
            identifier: identifier.into(),
            name: name.into(),
            resource: String::new(),
            workstream: String::new(),
            start_date: None,
            end_date: None,
            completion: 0,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    /// Builder-style setter for both dates.
    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Builder-style setter for completion.
    pub fn with_completion(mut self, completion: u8) -> Self {
        self.completion = completion;
        self
    }

    /// Builder-style setter for the workstream.
    pub fn with_workstream(mut self, workstream: impl Into<String>) -> Self {
        self.workstream = workstream.into();
        self
    }

    /// Identifier of the parent task, if this is not a root-level identifier.
    pub fn parent_identifier(&self) -> Option<&str> {
        ident::parent_of(&self.identifier)
    }

    /// Depth of the task derived from its identifier.
    pub fn depth(&self) -> usize {
        ident::depth(&self.identifier)
    }

    /// Duration in days used to weight completion: `end - start + 1`, at least 1.
    ///
    /// A task without both dates weighs as a single day.
    pub fn weight_days(&self) -> i64 {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => ((end - start).num_days() + 1).max(1),
            _ => 1,
        }
    }

    /// Validate the per-task field invariants (name, completion, date order).
    pub fn validate_fields(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PlanError::MissingName);
        }
        if self.completion > 100 {
            return Err(PlanError::InvalidCompletion(self.completion));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(PlanError::InvalidDateRange {
                    identifier: self.identifier.clone(),
                    start,
                    end,
                });
            }
        }
        Ok(())
    }
}

/// Values for a task about to be created.
///
/// An empty identifier (or the bare `TASK` placeholder) asks for one to be
/// generated.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub identifier: Option<String>,
    pub name: String,
    pub resource: String,
    pub workstream: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub completion: u8,
}

impl TaskDraft {
    /// Identifier requested by the caller, with blanks and the placeholder dropped.
    pub fn requested_identifier(&self) -> Option<&str> {
        self.identifier
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != ident::PREFIX)
    }

    /// Turn the draft into a task under the given identifier.
    pub fn into_task(self, identifier: String, now_utc: i64) -> Task {
        Task {
            identifier,
            name: self.name.trim().to_string(),
            resource: self.resource,
            workstream: self.workstream,
            start_date: self.start_date,
            end_date: self.end_date,
            completion: self.completion,
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        }
    }
}

/// Field changes for an existing task. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub resource: Option<String>,
    pub workstream: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub completion: Option<u8>,
    pub clear_dates: bool,
}

impl TaskPatch {
    /// Apply the patch in place.
    pub fn apply(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.trim().to_string();
        }
        if let Some(resource) = &self.resource {
            task.resource = resource.clone();
        }
        if let Some(workstream) = &self.workstream {
            task.workstream = workstream.clone();
        }
        if self.clear_dates {
            task.start_date = None;
            task.end_date = None;
        }
        if let Some(start) = self.start_date {
            task.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            task.end_date = Some(end);
        }
        if let Some(completion) = self.completion {
            task.completion = completion;
        }
    }
}
