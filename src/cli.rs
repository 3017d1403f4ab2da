use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Hierarchical project plans with Gantt timelines.
/// Projects live in ~/.plan/ unless a database file is passed via --db.
#[derive(Parser)]
#[command(name = "plan", version, about = "Hierarchical project plan CLI")]
pub struct Cli {
    /// Path to a project's JSON database file.
    #[arg(long, global = true, conflicts_with = "project")]
    pub db: Option<PathBuf>,

    /// Project to work on (display or file name). Defaults to the most recently modified.
    #[arg(long, short, global = true)]
    pub project: Option<String>,

    /// Log engine activity to stderr (same as RUST_LOG=project_planner=debug).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
