//! UI layer for desktop GUI: the progress window and its view state.

pub mod app;

pub use app::ProgressApp;
