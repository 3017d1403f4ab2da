//! Multi-project support.
//!
//! Each project is stored as its own JSON file named `<project_name>_tasks.json`
//! inside the data directory. This module handles naming, discovery and the
//! per-project summary rows used by the portfolio timeline.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::db::Database;
use crate::error::{PlanError, Result};
use crate::fields::ProjectStatus;

/// A project with its name and database file path.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Project {
    /// Create a project handle for the given display name.
    pub fn new(display_name: &str, data_dir: &Path) -> Self {
        let name = sanitize_project_name(display_name);
        let file_path = data_dir.join(format!("{}_tasks.json", name));

        Project {
            name,
            display_name: display_name.to_string(),
            file_path,
        }
    }

    /// Recognise a project from an existing database file.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        let file_name = file_path.file_stem()?.to_str()?;
        let name = file_name.strip_suffix("_tasks")?;
        if name.is_empty() {
            return None;
        }
        let display_name = name.replace('_', " ");

        Some(Project {
            name: name.to_string(),
            display_name,
            file_path,
        })
    }

    /// Create the database file for this project if it doesn't exist.
    pub fn create_if_not_exists(&self) -> Result<()> {
        if !self.file_path.exists() {
            Database::default().save(&self.file_path)?;
        }
        Ok(())
    }

    pub fn load_database(&self) -> Result<Database> {
        Database::load(&self.file_path)
    }

    pub fn summary(&self) -> Result<ProjectSummary> {
        Ok(ProjectSummary::from_database(&self.display_name, &self.load_database()?))
    }
}

/// Convert a display name to a safe file name: lowercase, with runs of
/// anything non-alphanumeric collapsed to a single underscore.
pub fn sanitize_project_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Discover all projects in the data directory, sorted by display name.
pub fn discover_projects(data_dir: &Path) -> Result<Vec<Project>> {
    let mut projects = Vec::new();

    if !data_dir.exists() {
        return Ok(projects);
    }

    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            if let Some(project) = Project::from_file(path) {
                projects.push(project);
            }
        }
    }

    projects.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    debug!(dir = %data_dir.display(), count = projects.len(), "discovered projects");
    Ok(projects)
}

/// Find a project by display name or sanitized name.
pub fn find_project(name: &str, data_dir: &Path) -> Result<Project> {
    let wanted = sanitize_project_name(name);
    discover_projects(data_dir)?
        .into_iter()
        .find(|p| p.name == wanted)
        .ok_or_else(|| PlanError::ProjectNotFound(name.to_string()))
}

/// Create a new, empty project.
pub fn create_project(display_name: &str, data_dir: &Path) -> Result<Project> {
    if sanitize_project_name(display_name).is_empty() {
        return Err(PlanError::EmptyProjectName);
    }

    let project = Project::new(display_name.trim(), data_dir);
    if project.file_path.exists() {
        return Err(PlanError::ProjectExists(display_name.to_string()));
    }

    project.create_if_not_exists()?;
    Ok(project)
}

/// The most recently modified project in the data directory.
pub fn get_most_recent_project(data_dir: &Path) -> Result<Option<Project>> {
    let most_recent = discover_projects(data_dir)?
        .into_iter()
        .filter_map(|p| {
            let modified = fs::metadata(&p.file_path).and_then(|m| m.modified()).ok()?;
            Some((p, modified))
        })
        .max_by_key(|(_, modified)| *modified);

    Ok(most_recent.map(|(project, _)| project))
}

/// One row of the portfolio timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub completion: u8,
}

impl ProjectSummary {
    /// Derive a summary from a project's tasks. Dates are the earliest start
    /// and latest end across all tasks; completion is the duration-weighted
    /// mean over root tasks.
    pub fn from_database(name: &str, db: &Database) -> Self {
        let (start_date, end_date) = match db.date_range() {
            Some((s, e)) => (Some(s), Some(e)),
            None => (None, None),
        };

        let roots = db.tasks.iter().filter(|t| {
            t.parent_identifier()
                .map_or(true, |p| db.get(p).is_none())
        });
        let (weighted, total) = roots.fold((0i64, 0i64), |(w, t), task| {
            let weight = task.weight_days();
            (w + weight * i64::from(task.completion), t + weight)
        });
        let completion = if total == 0 {
            0
        } else {
            ((2 * weighted + total) / (2 * total)).clamp(0, 100) as u8
        };

        ProjectSummary {
            name: name.to_string(),
            status: db.status,
            start_date,
            end_date,
            completion,
        }
    }
}

/// Summaries for every project in the directory, in discovery order.
pub fn portfolio(data_dir: &Path) -> Result<Vec<ProjectSummary>> {
    discover_projects(data_dir)?
        .iter()
        .map(Project::summary)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_sanitize_project_name() {
        assert_eq!(sanitize_project_name("My Project"), "my_project");
        assert_eq!(sanitize_project_name("Test-Project_123"), "test_project_123");
        assert_eq!(sanitize_project_name("Special!@#$%Characters"), "special_characters");
        assert_eq!(sanitize_project_name("  Multiple   Spaces  "), "multiple_spaces");
        assert_eq!(sanitize_project_name(""), "");
    }

    #[test]
    fn test_create_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        create_project("Beta Launch", dir.path()).unwrap();
        create_project("alpha", dir.path()).unwrap();
        assert!(matches!(
            create_project("Beta-Launch", dir.path()),
            Err(PlanError::ProjectExists(_))
        ));
        assert!(matches!(create_project(" !! ", dir.path()), Err(PlanError::EmptyProjectName)));

        let names: Vec<_> = discover_projects(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.display_name)
            .collect();
        assert_eq!(names, ["alpha", "beta launch"]);
        assert_eq!(find_project("Beta Launch", dir.path()).unwrap().name, "beta_launch");
        assert!(find_project("gamma", dir.path()).is_err());
    }

    #[test]
    fn test_summary_weights_roots_by_duration() {
        let db = Database {
            status: ProjectStatus::OnHold,
            tasks: vec![
                Task::new("TASK1", "long").with_dates(d(2025, 1, 1), d(2025, 1, 30)),
                Task::new("TASK1.1", "child")
                    .with_dates(d(2024, 12, 1), d(2025, 1, 2))
                    .with_completion(100),
                Task::new("TASK2", "short")
                    .with_dates(d(2025, 2, 1), d(2025, 2, 10))
                    .with_completion(100),
            ],
        };
        let s = ProjectSummary::from_database("demo", &db);
        assert_eq!(s.status, ProjectStatus::OnHold);
        assert_eq!(s.start_date, Some(d(2024, 12, 1)));
        assert_eq!(s.end_date, Some(d(2025, 2, 10)));
        // 30 days at 0% and 10 days at 100%
        assert_eq!(s.completion, 25);
    }

    #[test]
    fn test_summary_of_empty_project() {
        let s = ProjectSummary::from_database("empty", &Database::default());
        assert_eq!((s.start_date, s.end_date, s.completion), (None, None, 0));
    }
}
