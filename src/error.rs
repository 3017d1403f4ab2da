//! Error types for the planning engine.
//!
//! Validation errors abort a single edit before anything is mutated.
//! `MalformedDate` and `MalformedData` are also produced during propagation,
//! where they are logged and the affected branch is skipped instead.

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for planner operations.
#[derive(Error, Debug)]
pub enum PlanError {
    // Identifier problems
    #[error("Invalid task ID format '{0}'. Use TASKX, TASKX.Y or TASKX.Y.Z")]
    InvalidIdentifierFormat(String),

    #[error("Task ID already exists in this project: {0}")]
    DuplicateIdentifier(String),

    #[error("Task ID {0} is nested too deeply (at most three levels: TASKX.Y.Z)")]
    DepthExceeded(String),

    #[error("No task ID left under {0}: ID numbers stop at 99999")]
    IdentifiersExhausted(String),

    #[error("Parent task '{0}' does not exist")]
    ParentNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task {identifier} has {count} descendant(s). Use --cascade to delete all.")]
    HasDescendants { identifier: String, count: usize },

    // Field validation
    #[error("Task name is required")]
    MissingName,

    #[error("Start date {start} is after end date {end} for {identifier}")]
    InvalidDateRange {
        identifier: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Completion must be between 0 and 100, got {0}")]
    InvalidCompletion(u8),

    #[error("Task {identifier} has a missing or unparsable {field}")]
    MalformedDate {
        identifier: String,
        field: &'static str,
    },

    #[error("Malformed task hierarchy: {0}")]
    MalformedData(String),

    // Projects
    #[error("Project name cannot be empty")]
    EmptyProjectName,

    #[error("Project '{0}' already exists")]
    ProjectExists(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    // Exchange and configuration
    #[error("Invalid CSV at line {line}: {reason}")]
    InvalidCsv { line: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for planner operations.
pub type Result<T> = std::result::Result<T, PlanError>;

impl PlanError {
    /// True for errors raised while validating a single edit.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PlanError::InvalidIdentifierFormat(_)
                | PlanError::DuplicateIdentifier(_)
                | PlanError::DepthExceeded(_)
                | PlanError::IdentifiersExhausted(_)
                | PlanError::ParentNotFound(_)
                | PlanError::MissingName
                | PlanError::InvalidDateRange { .. }
                | PlanError::InvalidCompletion(_)
        )
    }
}
