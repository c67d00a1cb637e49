mod builtin;
mod cmd;
mod output;
mod root;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmd::action::ActionSubcommand;
use multitool_core::config::Settings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "multitool",
    about = "Run registered developer actions in dependency order under a host-wide lock",
    version,
    propagate_version = true
)]
struct Cli {
    /// Settings file (default: nearest multitool.yaml above the working directory)
    #[arg(long, global = true, env = "MULTI_TOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List, plan and run actions
    Action {
        #[command(subcommand)]
        subcommand: ActionSubcommand,
    },
}

fn load_settings(explicit: Option<&std::path::Path>) -> anyhow::Result<Settings> {
    let Some(path) = root::resolve_config(explicit) else {
        return Ok(Settings::default());
    };
    if explicit.is_some() && !path.is_file() {
        anyhow::bail!("config file not found: {}", path.display());
    }
    tracing::debug!(path = %path.display(), "loading settings");
    Settings::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    let registry = builtin::registry();

    match cli.command {
        Commands::Action { subcommand } => {
            cmd::action::run(&registry, &settings, subcommand, cli.json)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
