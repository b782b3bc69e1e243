//! Bridge between the egui thread and the counter running on a tokio runtime.

pub mod commands;
pub mod runtime;
