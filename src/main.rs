//! `plan` command line entry point.
//!
//! Data lives in `~/.plan/` with each project as a separate
//! `<name>_tasks.json` file, plus an optional `config.toml`. Passing `--db`
//! points at one file directly and uses its directory as the data directory.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use project_planner::cli::Cli;
use project_planner::cmd::*;
use project_planner::config::PlanConfig;
use project_planner::db::Database;
use project_planner::error::Result;
use project_planner::project::{find_project, get_most_recent_project, Project};

fn init_tracing(verbose: bool) {
    // Tracing is opt-in via RUST_LOG; ignore invalid or oversized filters.
    let filter = if verbose {
        EnvFilter::new("project_planner=debug")
    } else {
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|raw| {
                let raw = raw.trim();
                if raw.is_empty() || raw.len() > 4096 {
                    return None;
                }
                EnvFilter::try_new(raw).ok()
            })
            .unwrap_or_else(|| EnvFilter::new("off"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn data_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(db_path) = cli.db.as_ref() {
        let parent = db_path.parent().filter(|p| !p.as_os_str().is_empty());
        return Ok(parent.unwrap_or_else(|| Path::new(".")).to_path_buf());
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dir = PathBuf::from(home).join(".plan");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// The project file to operate on: `--db`, then `--project`, then the most
/// recently modified project, then a new "Default" project.
fn resolve_db_path(cli: &Cli, data_dir: &Path) -> Result<PathBuf> {
    if let Some(db_path) = cli.db.clone() {
        return Ok(db_path);
    }
    if let Some(name) = cli.project.as_deref() {
        return Ok(find_project(name, data_dir)?.file_path);
    }
    if let Some(project) = get_most_recent_project(data_dir)? {
        return Ok(project.file_path);
    }
    let default_project = Project::new("Default", data_dir);
    default_project.create_if_not_exists()?;
    Ok(default_project.file_path)
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = data_dir(&cli)?;
    let config = PlanConfig::load_from_dir(&data_dir);

    // Commands that don't need a specific project first
    if !cli.command.needs_project() {
        return match cli.command {
            Commands::Portfolio { scale, json, width } => {
                cmd_portfolio(&data_dir, &config, scale, json, width)
            }
            Commands::Projects => cmd_projects(&data_dir),
            Commands::NewProject { name } => cmd_new_project(&data_dir, name),
            Commands::Completions { shell } => {
                cmd_completions(shell);
                Ok(())
            }
            Commands::Backup { .. } => cmd_backup_all(&data_dir),
            _ => unreachable!("project-scoped commands handled below"),
        };
    }

    let db_path = resolve_db_path(&cli, &data_dir)?;
    let mut db = Database::load(&db_path)?;

    match cli.command {
        Commands::Add {
            name,
            id,
            parent,
            resource,
            workstream,
            start,
            end,
            completion,
        } => cmd_add(
            &mut db,
            &db_path,
            name,
            id,
            parent,
            resource,
            workstream,
            start,
            end,
            completion,
        ),

        Commands::Update {
            id,
            name,
            resource,
            workstream,
            start,
            end,
            completion,
            clear_dates,
        } => cmd_update(
            &mut db,
            &db_path,
            id,
            name,
            resource,
            workstream,
            start,
            end,
            completion,
            clear_dates,
        ),

        Commands::Delete { id, cascade } => cmd_delete(&mut db, &db_path, id, cascade),

        Commands::List { tree, workstream, resource } => cmd_list(&db, tree, workstream, resource),

        Commands::View { id, children, parents } => cmd_view(&db, id, children, parents),

        Commands::Gantt { scale, json, width } => cmd_gantt(&db, &config, scale, json, width),

        Commands::SetStatus { status } => cmd_set_status(&mut db, &db_path, status),

        Commands::Recompute => cmd_recompute(&mut db, &db_path),

        Commands::Export { output, template } => cmd_export(&db, output, template),

        Commands::Import { input, no_backup } => cmd_import(&mut db, &db_path, input, no_backup),

        Commands::Backup { .. } => cmd_backup(&db_path),

        Commands::Portfolio { .. }
        | Commands::Projects
        | Commands::NewProject { .. }
        | Commands::Completions { .. } => unreachable!("handled above"),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
