use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use counter_core::{config::load_settings_from, CounterController};
use shared::domain::{CounterEvent, RunStatus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod command;

use command::{describe_event, describe_snapshot, parse_line, CliCommand, HELP};

#[derive(Parser, Debug)]
#[command(about = "Counts from min to max, one value per tick, driven by stdin commands")]
struct Args {
    /// Settings file; defaults to ./counter.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, allow_hyphen_values = true)]
    min: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    max: Option<i64>,
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Print events as JSON lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings =
        load_settings_from(args.config.as_deref()).context("failed to load counter settings")?;
    settings.apply_overrides(args.tick_ms, args.min, args.max);
    tracing::info!(
        tick_interval_ms = settings.tick_interval_ms,
        min = ?settings.min,
        max = ?settings.max,
        "counter settings loaded"
    );

    let controller = CounterController::from_settings(&settings);
    let json = args.json;
    controller
        .subscribe(move |event: &CounterEvent| print_event(event, json))
        .await;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                None
            }
        };
        let Some(line) = line else {
            tokio::select! {
                () = wait_until_idle(&controller) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
            break;
        };

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        if !execute(&controller, command).await? {
            break;
        }
    }

    if controller.can_stop().await {
        controller.stop().await?;
    }
    Ok(())
}

/// Returns `false` once the session should end.
async fn execute(controller: &CounterController, command: CliCommand) -> Result<bool> {
    match command {
        CliCommand::Start => {
            if !controller.start().await?.is_applied() {
                println!("start is unavailable while running");
            }
        }
        CliCommand::Stop => {
            if !controller.stop().await?.is_applied() {
                println!("stop is only available while running");
            }
        }
        CliCommand::Pause => {
            if !controller.pause().await?.is_applied() {
                println!("pause is only available while running");
            }
        }
        CliCommand::SetMin(min) => {
            controller.set_min(min).await;
        }
        CliCommand::SetMax(max) => {
            controller.set_max(max).await;
        }
        CliCommand::Status => println!("{}", describe_snapshot(&controller.snapshot().await)),
        CliCommand::Help => println!("{HELP}"),
        CliCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Lets a run started from piped input finish once stdin is exhausted.
async fn wait_until_idle(controller: &CounterController) {
    let mut events = controller.subscribe_events();
    if controller.status().await != RunStatus::Running {
        return;
    }
    while let Ok(event) = events.recv().await {
        if matches!(
            event,
            CounterEvent::StatusChanged {
                status: RunStatus::Stopped | RunStatus::Paused
            }
        ) {
            break;
        }
    }
}

fn print_event(event: &CounterEvent, json: bool) {
    if !json {
        println!("{}", describe_event(event));
        return;
    }
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => tracing::warn!(%err, "failed to encode event"),
    }
}
