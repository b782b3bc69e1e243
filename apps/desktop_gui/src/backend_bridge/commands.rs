//! Backend commands queued from UI to backend worker.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCommand {
    Start,
    Stop,
    Pause,
    SetMin(Option<i64>),
    SetMax(Option<i64>),
    Shutdown,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::SetMin(_) => "set_min",
            Self::SetMax(_) => "set_max",
            Self::Shutdown => "shutdown",
        }
    }
}
