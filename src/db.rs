//! File-backed project database.
//!
//! Each project is one JSON file holding its status and a flat task list.
//! `Database` is the in-memory image of that file and implements
//! [`TaskStore`]; edits accumulate in memory and reach disk in a single
//! atomic `save`.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::fields::ProjectStatus;
use crate::ident;
use crate::store::TaskStore;
use crate::task::Task;

/// In-memory database for one project.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Database {
    /// Load a database from JSON, or an empty one if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        let db: Database = serde_json::from_str(&buf)?;
        debug!(path = %path.display(), tasks = db.tasks.len(), "loaded project database");
        Ok(db)
    }

    /// Save to JSON using an atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.identifier == identifier)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.identifier == identifier)
    }

    /// Tasks in natural identifier order.
    pub fn sorted_tasks(&self) -> Vec<&Task> {
        let mut out: Vec<&Task> = self.tasks.iter().collect();
        out.sort_by_cached_key(|t| ident::sort_key(&t.identifier));
        out
    }

    /// Earliest start and latest end over all tasks; computed on every call.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.tasks.iter().filter_map(|t| t.start_date).min()?;
        let end = self.tasks.iter().filter_map(|t| t.end_date).max()?;
        Some((start, end))
    }
}

fn in_subtree(candidate: &str, root: &str) -> bool {
    candidate == root
        || candidate
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('.'))
}

impl TaskStore for Database {
    fn fetch_tasks(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    fn fetch_task(&self, identifier: &str) -> Result<Task> {
        self.get(identifier)
            .cloned()
            .ok_or_else(|| PlanError::TaskNotFound(identifier.to_string()))
    }

    fn save_task(&mut self, task: Task) -> Result<()> {
        match self.get_mut(&task.identifier) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        Ok(())
    }

    fn delete_task(&mut self, identifier: &str) -> Result<Vec<String>> {
        if self.get(identifier).is_none() {
            return Err(PlanError::TaskNotFound(identifier.to_string()));
        }
        let mut removed = Vec::new();
        self.tasks.retain(|t| {
            if in_subtree(&t.identifier, identifier) {
                removed.push(t.identifier.clone());
                false
            } else {
                true
            }
        });
        removed.sort_by_cached_key(|id| ident::sort_key(id));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> Database {
        Database {
            status: ProjectStatus::Active,
            tasks: vec![
                Task::new("TASK1", "a").with_dates(d(2025, 3, 1), d(2025, 3, 9)),
                Task::new("TASK1.1", "b"),
                Task::new("TASK1.1.1", "c"),
                Task::new("TASK10", "d").with_dates(d(2025, 2, 1), d(2025, 2, 5)),
            ],
        }
    }

    #[test]
    fn test_delete_cascades_without_touching_lookalikes() {
        let mut db = sample();
        let removed = db.delete_task("TASK1").unwrap();
        assert_eq!(removed, ["TASK1", "TASK1.1", "TASK1.1.1"]);
        assert_eq!(db.tasks.len(), 1);
        assert_eq!(db.tasks[0].identifier, "TASK10");
        assert!(matches!(db.delete_task("TASK1"), Err(PlanError::TaskNotFound(_))));
    }

    #[test]
    fn test_save_task_upserts() {
        let mut db = sample();
        db.save_task(Task::new("TASK1.1", "renamed")).unwrap();
        db.save_task(Task::new("TASK2", "new")).unwrap();
        assert_eq!(db.tasks.len(), 5);
        assert_eq!(db.fetch_task("TASK1.1").unwrap().name, "renamed");
    }

    #[test]
    fn test_date_range_derived() {
        assert_eq!(sample().date_range(), Some((d(2025, 2, 1), d(2025, 3, 9))));
        assert_eq!(Database::default().date_range(), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo_tasks.json");
        let db = sample();
        db.save(&path).unwrap();
        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.tasks, db.tasks);
        assert!(Database::load(&dir.path().join("missing.json")).unwrap().tasks.is_empty());
    }
}
