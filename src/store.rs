//! Storage collaborator contract.
//!
//! The planning engine never touches storage directly; it reads snapshots and
//! writes changed tasks through this trait. A store is scoped to one project.
//! Callers treat load, mutate, propagate and persist as one logical
//! transaction (for [`crate::db::Database`], nothing reaches disk until
//! `save`).

use crate::error::Result;
use crate::task::Task;

pub trait TaskStore {
    /// Copies of every task in the project.
    fn fetch_tasks(&self) -> Vec<Task>;

    /// One task by identifier, or `TaskNotFound`.
    fn fetch_task(&self, identifier: &str) -> Result<Task>;

    /// Insert or replace the task with this identifier.
    fn save_task(&mut self, task: Task) -> Result<()>;

    /// Remove a task and all of its descendants, returning the identifiers removed.
    fn delete_task(&mut self, identifier: &str) -> Result<Vec<String>>;
}
