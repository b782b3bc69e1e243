use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use anyhow::Context;
use clap::Parser;
use counter_core::config::load_settings_from;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::ProgressApp;

#[derive(Parser, Debug)]
#[command(about = "Progress counter window")]
struct Args {
    /// Settings file; defaults to ./counter.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();
    let settings =
        load_settings_from(args.config.as_deref()).context("failed to load counter settings")?;

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(1024);
    // The worker exits once the app drops its command sender.
    backend_bridge::runtime::launch(cmd_rx, ui_tx, settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Progress Demo")
            .with_inner_size([420.0, 200.0])
            .with_min_inner_size([320.0, 160.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Progress Demo",
        options,
        Box::new(|_cc| Ok(Box::new(ProgressApp::new(cmd_tx, ui_rx)))),
    )
    .map_err(|err| anyhow::anyhow!("failed to run window: {err}"))
}
