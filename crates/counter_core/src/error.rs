use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("counting task for run {run_id} failed: {source}")]
    TaskFailed {
        run_id: u64,
        #[source]
        source: JoinError,
    },
}
