//! Counter controller: a cancellable, resumable counting loop that emits one
//! value per tick and reports every state change to its observers.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex as StdMutex, PoisonError,
    },
    time::Duration,
};

use shared::domain::{Bounds, CancelKind, CounterEvent, CounterSnapshot, RunStatus};
use tokio::{
    sync::{broadcast, oneshot, Mutex, RwLock},
    task::{AbortHandle, JoinHandle},
};
use tracing::{debug, error, info, warn};

pub mod config;
pub mod error;

pub use config::Settings;
pub use error::CounterError;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Receives every [`CounterEvent`] in emission order.
///
/// Called while the controller's state lock is held: implementations must
/// not block, and must hand work that needs the controller off to a task.
pub trait CounterObserver: Send + Sync {
    fn on_event(&self, event: &CounterEvent);
}

impl<F> CounterObserver for F
where
    F: Fn(&CounterEvent) + Send + Sync,
{
    fn on_event(&self, event: &CounterEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// The availability guard rejected the command.
    Ignored,
}

impl CommandOutcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunExit {
    Completed,
    /// Cancelled before `resume_at` was emitted.
    Cancelled { resume_at: i64 },
}

struct ActiveRun {
    id: u64,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<RunExit>,
}

impl ActiveRun {
    async fn cancel_and_wait(self) -> Result<RunExit, CounterError> {
        let Self { id, cancel, task } = self;
        let _ = cancel.send(());
        task.await
            .map_err(|source| CounterError::TaskFailed { run_id: id, source })
    }
}

struct ControllerState {
    value: i64,
    bounds: Bounds,
    status: RunStatus,
    resume_from: Option<i64>,
    active: Option<ActiveRun>,
    next_run_id: u64,
}

impl ControllerState {
    fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            value: self.value,
            bounds: self.bounds,
            status: self.status,
        }
    }

    fn is_active_run(&self, run_id: u64) -> bool {
        self.active.as_ref().is_some_and(|run| run.id == run_id)
    }
}

struct Shared {
    state: Mutex<ControllerState>,
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn CounterObserver>)>>,
    next_subscription: AtomicU64,
    events: broadcast::Sender<CounterEvent>,
    tick_interval: Duration,
}

impl Shared {
    /// Callers hold the state lock so that observers see events in order.
    async fn notify(&self, event: CounterEvent) {
        let observers = self.observers.read().await;
        for (_, observer) in observers.iter() {
            observer.on_event(&event);
        }
        drop(observers);
        let _ = self.events.send(event);
    }
}

pub struct CounterController {
    shared: Arc<Shared>,
    commands: Mutex<()>,
    /// Outside the state lock so that `Drop` can always reach the loop.
    loop_abort: StdMutex<Option<AbortHandle>>,
}

impl CounterController {
    pub fn new(tick_interval: Duration) -> Self {
        Self::with_bounds(tick_interval, Bounds::default())
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_bounds(
            settings.tick_interval(),
            Bounds::new(settings.min, settings.max),
        )
    }

    pub fn with_bounds(tick_interval: Duration, bounds: Bounds) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ControllerState {
                    value: bounds.resolved_min(),
                    bounds,
                    status: RunStatus::Stopped,
                    resume_from: None,
                    active: None,
                    next_run_id: 0,
                }),
                observers: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                events,
                tick_interval,
            }),
            commands: Mutex::new(()),
            loop_abort: StdMutex::new(None),
        }
    }

    pub async fn subscribe(&self, observer: impl CounterObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(
            self.shared
                .next_subscription
                .fetch_add(1, Ordering::Relaxed),
        );
        let observer: Arc<dyn CounterObserver> = Arc::new(observer);
        self.shared.observers.write().await.push((id, observer));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.shared.observers.write().await;
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CounterEvent> {
        self.shared.events.subscribe()
    }

    pub async fn snapshot(&self) -> CounterSnapshot {
        self.shared.state.lock().await.snapshot()
    }

    pub async fn value(&self) -> i64 {
        self.shared.state.lock().await.value
    }

    pub async fn status(&self) -> RunStatus {
        self.shared.state.lock().await.status
    }

    pub async fn bounds(&self) -> Bounds {
        self.shared.state.lock().await.bounds
    }

    pub async fn can_start(&self) -> bool {
        self.status().await.can_start()
    }

    pub async fn can_stop(&self) -> bool {
        self.status().await.can_stop()
    }

    pub async fn can_pause(&self) -> bool {
        self.status().await.can_pause()
    }

    pub async fn set_min(&self, min: Option<i64>) -> bool {
        let mut state = self.shared.state.lock().await;
        if state.bounds.min == min {
            return false;
        }
        state.bounds.min = min;
        self.shared.notify(CounterEvent::MinChanged { min }).await;
        true
    }

    pub async fn set_max(&self, max: Option<i64>) -> bool {
        let mut state = self.shared.state.lock().await;
        if state.bounds.max == max {
            return false;
        }
        state.bounds.max = max;
        self.shared.notify(CounterEvent::MaxChanged { max }).await;
        true
    }

    /// Starts a run from `min`, or from the resume point when paused.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<CommandOutcome, CounterError> {
        let _command = self.commands.lock().await;
        let mut state = self.shared.state.lock().await;
        if !state.status.can_start() {
            debug!(status = state.status.label(), "start ignored");
            return Ok(CommandOutcome::Ignored);
        }

        let (min, max) = state.bounds.resolve();
        let from = match (state.status, state.resume_from.take()) {
            (RunStatus::Paused, Some(resume_at)) => resume_at.max(min),
            _ => min,
        };
        if min <= max && !(min..=max).contains(&state.value) {
            state.value = state.value.clamp(min, max);
            self.shared
                .notify(CounterEvent::ValueChanged { value: state.value })
                .await;
        }

        if from > max {
            warn!(from, max, "run range is empty; completing without ticks");
            if state.status != RunStatus::Stopped {
                state.status = RunStatus::Stopped;
                self.shared
                    .notify(CounterEvent::StatusChanged {
                        status: RunStatus::Stopped,
                    })
                    .await;
            }
            self.shared
                .notify(CounterEvent::RunCompleted { value: state.value })
                .await;
            return Ok(CommandOutcome::Applied);
        }

        state.next_run_id += 1;
        let run_id = state.next_run_id;
        let (cancel, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            run_id,
            from,
            max,
            cancel_rx,
        ));
        *self
            .loop_abort
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task.abort_handle());
        state.active = Some(ActiveRun {
            id: run_id,
            cancel,
            task,
        });
        state.status = RunStatus::Running;
        info!(run_id, from, max, "run started");
        self.shared
            .notify(CounterEvent::StatusChanged {
                status: RunStatus::Running,
            })
            .await;

        Ok(CommandOutcome::Applied)
    }

    /// Cancels the active run and resets the resume point.
    pub async fn stop(&self) -> Result<CommandOutcome, CounterError> {
        self.cancel_active(CancelKind::Stop).await
    }

    /// Cancels the active run, keeping the value so that `start` resumes it.
    pub async fn pause(&self) -> Result<CommandOutcome, CounterError> {
        self.cancel_active(CancelKind::Pause).await
    }

    async fn cancel_active(&self, kind: CancelKind) -> Result<CommandOutcome, CounterError> {
        let _command = self.commands.lock().await;
        let run = {
            let mut state = self.shared.state.lock().await;
            let allowed = match kind {
                CancelKind::Stop => state.status.can_stop(),
                CancelKind::Pause => state.status.can_pause(),
            };
            if !allowed {
                debug!(status = state.status.label(), ?kind, "cancel ignored");
                return Ok(CommandOutcome::Ignored);
            }
            let Some(run) = state.active.take() else {
                return Ok(CommandOutcome::Ignored);
            };
            run
        };

        // The state lock is released here so the loop can finish its tick.
        let run_id = run.id;
        let exit = run.cancel_and_wait().await;

        let mut state = self.shared.state.lock().await;
        let next_status = match (&exit, kind) {
            (Ok(RunExit::Cancelled { resume_at }), CancelKind::Pause) => {
                state.resume_from = Some(*resume_at);
                RunStatus::Paused
            }
            _ => {
                state.resume_from = None;
                RunStatus::Stopped
            }
        };
        state.status = next_status;
        self.shared
            .notify(CounterEvent::StatusChanged {
                status: next_status,
            })
            .await;

        match exit {
            Ok(RunExit::Cancelled { .. }) => {
                info!(run_id, ?kind, value = state.value, "run cancelled");
                self.shared
                    .notify(CounterEvent::RunCancelled {
                        kind,
                        value: state.value,
                    })
                    .await;
            }
            Ok(RunExit::Completed) => {
                info!(run_id, value = state.value, "run completed before cancellation");
                self.shared
                    .notify(CounterEvent::RunCompleted { value: state.value })
                    .await;
            }
            Err(err) => {
                error!(run_id, %err, "counting task failed");
                return Err(err);
            }
        }

        Ok(CommandOutcome::Applied)
    }
}

impl Drop for CounterController {
    fn drop(&mut self) {
        let abort = self
            .loop_abort
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(abort) = abort {
            abort.abort();
        }
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    run_id: u64,
    from: i64,
    to: i64,
    mut cancel: oneshot::Receiver<()>,
) -> RunExit {
    let mut next = Some(from).filter(|v| *v <= to);
    while let Some(value) = next {
        tokio::select! {
            biased;
            _ = &mut cancel => return RunExit::Cancelled { resume_at: value },
            () = tokio::time::sleep(shared.tick_interval) => {}
        }
        if !matches!(cancel.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
            return RunExit::Cancelled { resume_at: value };
        }

        let mut state = shared.state.lock().await;
        state.value = value;
        debug!(run_id, value, "tick");
        shared.notify(CounterEvent::ValueChanged { value }).await;
        drop(state);

        next = value.checked_add(1).filter(|v| *v <= to);
    }

    let mut state = shared.state.lock().await;
    if state.is_active_run(run_id) {
        state.active = None;
        state.status = RunStatus::Stopped;
        state.resume_from = None;
        info!(run_id, value = state.value, "run completed");
        shared
            .notify(CounterEvent::StatusChanged {
                status: RunStatus::Stopped,
            })
            .await;
        shared
            .notify(CounterEvent::RunCompleted { value: state.value })
            .await;
    }
    RunExit::Completed
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
