//! # plan - hierarchical project plans
//!
//! A project is a forest of tasks with dotted identifiers (`TASK1`, `TASK1.2`,
//! `TASK1.2.3`). Editing a task keeps its ancestors consistent: parents widen
//! to cover their children's dates, and parent completion is the
//! duration-weighted average of the children. Any set of tasks, or a set of
//! projects, can be laid out as a Gantt chart at day, week, month, quarter or
//! year granularity.
//!
//! ## Module Organization
//!
//! - `ident`: identifier parsing, generation and natural ordering
//! - `task`: the task record plus draft and patch types for edits
//! - `forest`: arena-backed task tree built from a flat list
//! - `propagate`: upward date expansion and completion aggregation
//! - `timeline`: date to axis-coordinate mapping and tick labels
//! - `layout`: chart rows, bar geometry and colour legend
//! - `store`: the storage trait the engine edits through
//! - `db`: JSON file storage for one project
//! - `plan`: create, update, delete, import and recompute
//! - `project`: project discovery and portfolio summaries
//! - `exchange`: CSV export and import parsing
//! - `dates`: human date input and display helpers
//! - `config`: `config.toml` loading
//! - `cli` / `cmd`: the `plan` command line
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use project_planner::db::Database;
//! use project_planner::plan::{create_task, ParentPolicy};
//! use project_planner::store::TaskStore;
//! use project_planner::task::TaskDraft;
//!
//! let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();
//! let mut db = Database::default();
//! let draft = |name: &str, start, end| TaskDraft {
//!     name: name.into(),
//!     start_date: Some(start),
//!     end_date: Some(end),
//!     ..Default::default()
//! };
//!
//! let policy = ParentPolicy::Required;
//! create_task(&mut db, draft("Launch", d(1, 1), d(1, 31)), None, policy).unwrap();
//! create_task(&mut db, draft("Prep", d(2, 1), d(2, 14)), Some("TASK1"), policy).unwrap();
//!
//! assert_eq!(db.fetch_task("TASK1").unwrap().end_date, Some(d(2, 14)));
//! ```

pub mod cli;
pub mod cmd;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod exchange;
pub mod fields;
pub mod forest;
pub mod ident;
pub mod layout;
pub mod plan;
pub mod project;
pub mod propagate;
pub mod store;
pub mod task;
pub mod timeline;
