//! Debias is a daemonless, local-first decision-governance engine. It scores
//! organizational resilience, detects cognitive-bias language, selects
//! de-biasing protocols through an ordered rule table, verifies that
//! generated pre-mortem content is reproducible, and records every decision
//! in a hash-chained audit ledger.

pub mod core;
pub mod plugins;

use crate::core::error::DebiasError;
use crate::core::store::Store;
use crate::core::{config, db};
use crate::plugins::{audit, decide, riskflag, status};

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "debias",
    version = env!("CARGO_PKG_VERSION"),
    about = "Deterministic decision governance: resilience scoring, bias detection, de-biasing protocols, and a hash-chained audit ledger."
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
    /// Reinitialize even if a workspace already exists.
    #[clap(long)]
    force: bool,
}

#[derive(clap::Args, Debug)]
struct StatusCli {
    /// Emit JSON instead of the text summary.
    #[clap(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the .debias workspace, config, and ledger database.
    #[clap(name = "init", visible_alias = "i")]
    Init(InitCli),

    /// Assess resilience and raise risk flags.
    #[clap(name = "riskflag", visible_alias = "r")]
    Riskflag(riskflag::RiskflagCli),

    /// Run de-biased decision analysis.
    #[clap(name = "decide", visible_alias = "d")]
    Decide(decide::DecideCli),

    /// Inspect and verify the audit ledger.
    #[clap(name = "audit", visible_alias = "a")]
    Audit(audit::AuditCli),

    /// Workspace and ledger health overview.
    #[clap(name = "status", visible_alias = "s")]
    Status(StatusCli),

    /// Print machine-readable descriptors for every subsystem.
    #[clap(name = "schema")]
    Schema,

    /// Show version information.
    #[clap(name = "version")]
    Version,
}

fn find_project_root(start_dir: &Path) -> Result<PathBuf, DebiasError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(".debias").exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(DebiasError::NotFound(
                "'.debias' directory not found in current or parent directories. Run `debias init` first.".to_string(),
            ));
        }
    }
}

fn init_workspace(cli: InitCli, current_dir: &Path) -> Result<(), DebiasError> {
    let target_dir = match cli.dir {
        Some(d) => d,
        None => current_dir.to_path_buf(),
    };
    let target_dir = fs::canonicalize(&target_dir).map_err(DebiasError::IoError)?;
    let workspace = target_dir.join(".debias");

    if workspace.exists() && !cli.force {
        println!(
            "{} Workspace already exists at {}. Use --force to reinitialize.",
            "!".yellow().bold(),
            workspace.display()
        );
        return Ok(());
    }

    let data_dir = workspace.join("data");
    fs::create_dir_all(&data_dir).map_err(DebiasError::IoError)?;

    let config_path = workspace.join(config::CONFIG_FILE_NAME);
    if !config_path.exists() || cli.force {
        fs::write(&config_path, config::default_config_toml()).map_err(DebiasError::IoError)?;
    }

    db::initialize_ledger_db(&data_dir)?;

    println!("{} Initialized debias workspace", "✓".green().bold());
    println!("  root:   {}", workspace.display());
    println!("  config: {}", config_path.display());
    println!("  ledger: {}", db::ledger_db_path(&data_dir).display());
    Ok(())
}

pub fn run() -> Result<(), DebiasError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Init(init_cli) => {
            return init_workspace(init_cli, &current_dir);
        }
        Command::Schema => {
            let schemas = serde_json::json!({
                "riskflag": riskflag::schema(),
                "decide": decide::schema(),
                "orchestrator": crate::core::orchestrator::schema(),
                "ledger": crate::core::ledger::schema(),
                "audit": audit::schema(),
                "status": status::schema(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&schemas).unwrap_or_default()
            );
            return Ok(());
        }
        _ => {}
    }

    let project_root = find_project_root(&current_dir)?;
    let store_root = project_root.join(".debias").join("data");
    fs::create_dir_all(&store_root).map_err(DebiasError::IoError)?;
    let store = Store { root: store_root };

    match cli.command {
        Command::Riskflag(riskflag_cli) => riskflag::run_riskflag_cli(&store, riskflag_cli),
        Command::Decide(decide_cli) => decide::run_decide_cli(&store, decide_cli),
        Command::Audit(audit_cli) => audit::run_audit_cli(&store, audit_cli),
        Command::Status(status_cli) => status::run_status_cli(&store, status_cli.json),
        Command::Init(_) | Command::Schema | Command::Version => Ok(()),
    }
}
