//! Line commands accepted on stdin.

use shared::{
    domain::{parse_bound, CancelKind, CounterEvent, CounterSnapshot},
    error::{BoundField, BoundInputError},
};
use thiserror::Error;

pub const HELP: &str = "commands: start | stop | pause | min <N|none> | max <N|none> | status | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    Start,
    Stop,
    Pause,
    SetMin(Option<i64>),
    SetMax(Option<i64>),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unknown command '{0}'; type 'help'")]
    Unknown(String),
    #[error("'{0}' expects a value, e.g. '{0} 10' or '{0} none'")]
    MissingValue(&'static str),
    #[error(transparent)]
    Bound(#[from] BoundInputError),
}

/// Returns `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<CliCommand>, CommandParseError> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    let rest = parts.collect::<Vec<_>>().join(" ");

    let command = match word.to_ascii_lowercase().as_str() {
        "start" | "s" => CliCommand::Start,
        "stop" | "x" => CliCommand::Stop,
        "pause" | "p" => CliCommand::Pause,
        "status" => CliCommand::Status,
        "help" | "?" => CliCommand::Help,
        "quit" | "exit" | "q" => CliCommand::Quit,
        "min" => CliCommand::SetMin(parse_bound_arg(BoundField::Min, &rest)?),
        "max" => CliCommand::SetMax(parse_bound_arg(BoundField::Max, &rest)?),
        other => return Err(CommandParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_bound_arg(field: BoundField, rest: &str) -> Result<Option<i64>, CommandParseError> {
    if rest.is_empty() {
        return Err(CommandParseError::MissingValue(field.label()));
    }
    Ok(parse_bound(field, rest)?)
}

pub fn describe_event(event: &CounterEvent) -> String {
    match event {
        CounterEvent::ValueChanged { value } => format!("value {value}"),
        CounterEvent::MinChanged { min } => format!("min set to {}", describe_bound(*min)),
        CounterEvent::MaxChanged { max } => format!("max set to {}", describe_bound(*max)),
        CounterEvent::StatusChanged { status } => format!("status {}", status.label()),
        CounterEvent::RunCancelled {
            kind: CancelKind::Stop,
            value,
        } => format!("stopped at {value}"),
        CounterEvent::RunCancelled {
            kind: CancelKind::Pause,
            value,
        } => format!("paused at {value}"),
        CounterEvent::RunCompleted { value } => format!("completed at {value}"),
    }
}

pub fn describe_snapshot(snapshot: &CounterSnapshot) -> String {
    let (min, max) = snapshot.bounds.resolve();
    format!(
        "{} value={} range={min}..={max} progress={:.0}%",
        snapshot.status.label(),
        snapshot.value,
        snapshot.bounds.fraction(snapshot.value) * 100.0
    )
}

fn describe_bound(bound: Option<i64>) -> String {
    bound.map_or_else(|| "default".to_string(), |v| v.to_string())
}
