//! Runtime bridge between UI command queue and the counter controller.

use std::thread;

use counter_core::{CounterController, Settings};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::CounterEvent;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    settings: Settings,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("counter worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build counter runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let controller = CounterController::from_settings(&settings);
            let events_tx = ui_tx.clone();
            controller
                .subscribe(move |event: &CounterEvent| {
                    if events_tx.try_send(UiEvent::Counter(event.clone())).is_err() {
                        tracing::warn!(?event, "dropped counter event; ui queue unavailable");
                    }
                })
                .await;
            let _ = ui_tx.try_send(UiEvent::Ready(controller.snapshot().await));
            tracing::info!(
                tick_interval_ms = settings.tick_interval_ms,
                "counter worker ready"
            );

            while let Ok(cmd) = cmd_rx.recv() {
                let result = match cmd {
                    BackendCommand::Start => controller.start().await.map(|_| ()),
                    BackendCommand::Stop => controller.stop().await.map(|_| ()),
                    BackendCommand::Pause => controller.pause().await.map(|_| ()),
                    BackendCommand::SetMin(min) => {
                        controller.set_min(min).await;
                        Ok(())
                    }
                    BackendCommand::SetMax(max) => {
                        controller.set_max(max).await;
                        Ok(())
                    }
                    BackendCommand::Shutdown => break,
                };
                if let Err(err) = result {
                    tracing::error!(command = cmd.name(), %err, "counter command failed");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::Command,
                        err.to_string(),
                    )));
                }
            }

            if controller.can_stop().await {
                let _ = controller.stop().await;
            }
            tracing::info!("counter worker stopped");
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use shared::domain::RunStatus;
    use std::time::Duration;

    fn fast_settings(min: i64, max: i64) -> Settings {
        Settings {
            tick_interval_ms: 5,
            min: Some(min),
            max: Some(max),
        }
    }

    #[test]
    fn forwards_counter_events_until_shutdown() {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (ui_tx, ui_rx) = bounded(256);
        let worker = launch(cmd_rx, ui_tx, fast_settings(0, 2));

        let ready = ui_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("ready event");
        assert!(matches!(ready, UiEvent::Ready(snapshot) if snapshot.status == RunStatus::Stopped));

        cmd_tx.send(BackendCommand::Start).expect("send start");
        let mut values = Vec::new();
        loop {
            match ui_rx.recv_timeout(Duration::from_secs(5)).expect("counter event") {
                UiEvent::Counter(CounterEvent::ValueChanged { value }) => values.push(value),
                UiEvent::Counter(CounterEvent::RunCompleted { .. }) => break,
                _ => {}
            }
        }
        assert_eq!(values, vec![0, 1, 2]);

        cmd_tx.send(BackendCommand::Shutdown).expect("send shutdown");
        worker.join().expect("worker thread");
    }
}
