//! Enumerations and field types for projects.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a project, used to colour the portfolio view.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    #[serde(alias = "Active")]
    Active,
    #[serde(alias = "On-Hold", alias = "OnHold")]
    OnHold,
    #[serde(alias = "Closed")]
    Closed,
    #[serde(alias = "Cancelled")]
    Cancelled,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProjectStatus::Active => "Active",
            ProjectStatus::OnHold => "On-Hold",
            ProjectStatus::Closed => "Closed",
            ProjectStatus::Cancelled => "Cancelled",
        })
    }
}
