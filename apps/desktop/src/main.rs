mod backend_bridge;
mod config;
mod controller;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::bounded;
use tracing_subscriber::EnvFilter;

use crate::ui::terminal::TerminalApp;

#[derive(Parser, Debug)]
#[command(about = "Conversational survey experiment")]
struct Args {
    /// TOML settings file; defaults to ./experiment.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for the probe draws and predictions, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
    /// Skip every pacing delay.
    #[arg(long)]
    fast: bool,
    /// Print the final report as JSON once results are shown.
    #[arg(long)]
    report_json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings =
        config::load_settings(args.config.as_deref())?.with_cli_overrides(args.seed, args.fast);
    tracing::info!(?settings, "starting experiment");

    let (cmd_tx, cmd_rx) = bounded(64);
    let (ui_tx, ui_rx) = bounded(256);
    let worker = backend_bridge::runtime::launch(settings, cmd_rx, ui_tx);

    let mut app = TerminalApp::new(cmd_tx, std::io::stdout(), args.report_json);
    let outcome = app.run(ui_rx);
    drop(app);

    if worker.join().is_err() {
        tracing::error!("experiment worker panicked");
    }
    outcome
}
