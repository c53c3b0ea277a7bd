//! VaultMirror CLI

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vaultmirror::{MirrorApp, Overrides, SyncMode, SyncReport, exit_code, load_config, read_status};

/// Mirror an Obsidian vault into a Notion workspace
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the Obsidian vault directory
    #[arg(short, long, env = "OBSIDIAN_VAULT_PATH")]
    vault: Option<PathBuf>,

    /// Remote page that receives the mirrored tree
    #[arg(long)]
    root_page: Option<String>,

    /// Integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable debug logging
    #[arg(long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync new and changed documents
    Sync,
    /// Archive everything under the root page and mirror the vault again
    Resync {
        /// Confirm the remote wipe
        #[arg(long, action = clap::ArgAction::SetTrue)]
        yes: bool,
    },
    /// Sync, then keep syncing as the vault changes
    Watch,
    /// Show what the state store knows about the vault
    Status {
        /// Print JSON instead of text
        #[arg(long, action = clap::ArgAction::SetTrue)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn print_report(report: &SyncReport) {
    println!("{}", report);
    if report.structural_warnings > 0 {
        println!(
            "{} folder(s) could not be resolved and were placed under the root page",
            report.structural_warnings
        );
    }
    for error in &report.errors {
        println!("  {}: {}", error.path, error.message);
    }
    let unreported = report.counts.failed.saturating_sub(report.errors.len());
    if unreported > 0 {
        println!("  ... and {} more", unreported);
    }
}

async fn run(args: Args) -> Result<u8> {
    let overrides = Overrides {
        vault: args.vault,
        root_page: args.root_page,
        api_token: args.token,
    };
    let config = load_config(args.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;

    let mode = match args.command {
        Command::Status { json } => {
            let summary = read_status(&config)
                .await
                .context("Failed to read state")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary.to_json())?);
            } else {
                println!("{}", summary);
            }
            return Ok(0);
        }
        Command::Watch => {
            let app = MirrorApp::new(config).await?;
            app.watch(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for ctrl-c: {}", e);
                }
            })
            .await?;
            return Ok(0);
        }
        Command::Resync { yes: false } => {
            bail!("resync archives every page under the root page; pass --yes to confirm")
        }
        Command::Resync { yes: true } => SyncMode::FullResync,
        Command::Sync => SyncMode::Incremental,
    };

    let app = MirrorApp::new(config).await?;
    let report = app.run(mode).await;
    print_report(&report);
    Ok(exit_code(&report))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.log_format);

    log::debug!("VaultMirror v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
