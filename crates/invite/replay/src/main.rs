//! invite-replay - play a join script against the invite engine
//!
//! Prints the replay report as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use invite_replay::{run_script, ReplayConfig, Script};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Invite replay CLI
#[derive(Parser)]
#[command(name = "invite-replay")]
#[command(about = "Replay member joins against the invite attribution engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Script to replay
    #[arg(env = "INVITE_SCRIPT")]
    script: PathBuf,

    /// Configuration file path
    #[arg(short, long, env = "INVITE_CONFIG")]
    config: Option<String>,

    /// Referral goal, overrides the configuration
    #[arg(short, long, env = "INVITE_GOAL")]
    goal: Option<u64>,

    /// Log level, overrides the configuration
    #[arg(long, env = "INVITE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "INVITE_LOG_JSON")]
    json: bool,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config =
        ReplayConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Override with CLI args
    if let Some(goal) = cli.goal {
        config.engine.invite_goal = goal;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    config.engine.validate()?;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let script = Script::load(&cli.script)
        .with_context(|| format!("failed to load script {}", cli.script.display()))?;

    tracing::info!(
        guilds = script.guilds.len(),
        steps = script.steps.len(),
        goal = config.engine.invite_goal,
        "Starting replay"
    );

    let report = run_script(&script, config.engine).await?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");

    Ok(())
}
