use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::{
    domain::{parse_bound, Bounds, CounterEvent, CounterSnapshot, RunStatus},
    error::BoundField,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

const NOTICE_COLOR: egui::Color32 = egui::Color32::from_rgb(0xe0, 0xa0, 0x30);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(0xe0, 0x50, 0x50);

/// Everything the window shows, mirrored from backend events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub value: i64,
    pub bounds: Bounds,
    pub run_status: RunStatus,
    pub ready: bool,
    pub min_input: String,
    pub max_input: String,
    pub input_error: Option<String>,
    pub notice: Option<String>,
    pub status: String,
}

impl ViewState {
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Ready(snapshot) => self.apply_snapshot(snapshot),
            UiEvent::Counter(event) => self.apply_counter_event(event),
            UiEvent::Error(err) => self.apply_error(&err),
        }
    }

    fn apply_snapshot(&mut self, snapshot: CounterSnapshot) {
        self.ready = true;
        self.value = snapshot.value;
        self.bounds = snapshot.bounds;
        self.run_status = snapshot.status;
        self.min_input = bound_text(snapshot.bounds.min);
        self.max_input = bound_text(snapshot.bounds.max);
        self.status = "Ready".to_string();
    }

    fn apply_counter_event(&mut self, event: CounterEvent) {
        if let CounterEvent::RunCancelled { .. } = event {
            self.notice = event.notice();
        }
        match event {
            CounterEvent::ValueChanged { value } => self.value = value,
            CounterEvent::MinChanged { min } => {
                self.bounds.min = min;
                self.min_input = bound_text(min);
            }
            CounterEvent::MaxChanged { max } => {
                self.bounds.max = max;
                self.max_input = bound_text(max);
            }
            CounterEvent::StatusChanged { status } => {
                self.run_status = status;
                self.status = format!("Status: {}", status.label());
            }
            CounterEvent::RunCancelled { .. } => {}
            CounterEvent::RunCompleted { value } => {
                self.status = format!("Completed at {value}");
            }
        }
    }

    fn apply_error(&mut self, err: &UiError) {
        if err.is_fatal() {
            self.ready = false;
        }
        self.status = format!("Error: {}", err.message());
    }

    /// Parses the bound inputs; `None` when the text did not change the bound.
    pub fn pending_bound(&mut self, field: BoundField) -> Option<BackendCommand> {
        let (input, current) = match field {
            BoundField::Min => (&self.min_input, self.bounds.min),
            BoundField::Max => (&self.max_input, self.bounds.max),
        };
        match parse_bound(field, input) {
            Ok(parsed) => {
                self.input_error = None;
                (parsed != current).then_some(match field {
                    BoundField::Min => BackendCommand::SetMin(parsed),
                    BoundField::Max => BackendCommand::SetMax(parsed),
                })
            }
            Err(err) => {
                let err = UiError::from_message(UiErrorContext::Input, err.to_string());
                self.input_error = Some(err.message().to_string());
                None
            }
        }
    }

    pub fn fraction(&self) -> f32 {
        self.bounds.fraction(self.value)
    }

    pub fn can_start(&self) -> bool {
        self.ready && self.run_status.can_start()
    }

    pub fn can_stop(&self) -> bool {
        self.ready && self.run_status.can_stop()
    }

    pub fn can_pause(&self) -> bool {
        self.ready && self.run_status.can_pause()
    }
}

fn bound_text(bound: Option<i64>) -> String {
    bound.map(|v| v.to_string()).unwrap_or_default()
}

pub struct ProgressApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    view: ViewState,
}

impl ProgressApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            view: ViewState {
                status: "Counter worker starting...".to_string(),
                ..ViewState::default()
            },
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.view.apply(event);
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.view.status);
    }

    fn commit_bound(&mut self, field: BoundField) {
        if let Some(cmd) = self.view.pending_bound(field) {
            self.dispatch(cmd);
        }
    }

    fn show_bounds(&mut self, ui: &mut egui::Ui) {
        let (default_min, default_max) = Bounds::default().resolve();
        ui.horizontal(|ui| {
            ui.label("Min");
            let min = ui.add(
                egui::TextEdit::singleline(&mut self.view.min_input)
                    .hint_text(default_min.to_string())
                    .desired_width(80.0),
            );
            ui.label("Max");
            let max = ui.add(
                egui::TextEdit::singleline(&mut self.view.max_input)
                    .hint_text(default_max.to_string())
                    .desired_width(80.0),
            );
            if min.lost_focus() {
                self.commit_bound(BoundField::Min);
            }
            if max.lost_focus() {
                self.commit_bound(BoundField::Max);
            }
        });
        if let Some(err) = &self.view.input_error {
            ui.colored_label(ERROR_COLOR, err.as_str());
        }
    }

    fn show_progress(&self, ui: &mut egui::Ui) {
        let (min, max) = self.view.bounds.resolve();
        ui.add(
            egui::ProgressBar::new(self.view.fraction())
                .text(format!("{} ({min}..={max})", self.view.value)),
        );
    }

    fn show_commands(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let start_label = if self.view.run_status == RunStatus::Paused {
                "Resume"
            } else {
                "Start"
            };
            if ui
                .add_enabled(self.view.can_start(), egui::Button::new(start_label))
                .clicked()
            {
                self.dispatch(BackendCommand::Start);
            }
            if ui
                .add_enabled(self.view.can_stop(), egui::Button::new("Stop"))
                .clicked()
            {
                self.dispatch(BackendCommand::Stop);
            }
            if ui
                .add_enabled(self.view.can_pause(), egui::Button::new("Pause"))
                .clicked()
            {
                self.dispatch(BackendCommand::Pause);
            }
        });
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.view.notice.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.colored_label(NOTICE_COLOR, notice);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.view.notice = None;
        }
    }
}

impl eframe::App for ProgressApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Progress");
            ui.add_space(8.0);
            self.show_bounds(ui);
            ui.add_space(8.0);
            self.show_progress(ui);
            ui.add_space(8.0);
            self.show_commands(ui);
            ui.separator();
            ui.label(self.view.status.as_str());
        });
        self.show_notice(ctx);

        if self.view.run_status == RunStatus::Running {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }
}

impl Drop for ProgressApp {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(BackendCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::CancelKind;

    fn ready_view() -> ViewState {
        let mut view = ViewState::default();
        view.apply(UiEvent::Ready(CounterSnapshot {
            value: 0,
            bounds: Bounds::new(Some(0), Some(4)),
            status: RunStatus::Stopped,
        }));
        view
    }

    #[test]
    fn commands_are_disabled_until_worker_is_ready() {
        let view = ViewState::default();
        assert!(!view.can_start());

        let view = ready_view();
        assert!(view.can_start());
        assert!(!view.can_stop());
        assert!(!view.can_pause());
        assert_eq!(view.min_input, "0");
    }

    #[test]
    fn mirrors_values_and_status_from_counter_events() {
        let mut view = ready_view();
        view.apply(UiEvent::Counter(CounterEvent::StatusChanged {
            status: RunStatus::Running,
        }));
        view.apply(UiEvent::Counter(CounterEvent::ValueChanged { value: 2 }));

        assert_eq!(view.value, 2);
        assert_eq!(view.fraction(), 0.5);
        assert!(!view.can_start());
        assert!(view.can_stop());
        assert!(view.can_pause());
    }

    #[test]
    fn cancellation_raises_a_notice() {
        let mut view = ready_view();
        view.apply(UiEvent::Counter(CounterEvent::RunCancelled {
            kind: CancelKind::Stop,
            value: 3,
        }));
        assert_eq!(view.notice.as_deref(), Some("Run was cancelled at 3."));

        view.notice = None;
        view.apply(UiEvent::Counter(CounterEvent::RunCompleted { value: 4 }));
        assert!(view.notice.is_none());
        assert_eq!(view.status, "Completed at 4");
    }

    #[test]
    fn bound_inputs_only_dispatch_changes() {
        let mut view = ready_view();
        assert_eq!(view.pending_bound(BoundField::Min), None);

        view.max_input = " 10 ".to_string();
        assert_eq!(
            view.pending_bound(BoundField::Max),
            Some(BackendCommand::SetMax(Some(10)))
        );

        view.min_input = String::new();
        assert_eq!(
            view.pending_bound(BoundField::Min),
            Some(BackendCommand::SetMin(None))
        );
    }

    #[test]
    fn invalid_bound_input_is_reported_and_not_dispatched() {
        let mut view = ready_view();
        view.min_input = "abc".to_string();

        assert_eq!(view.pending_bound(BoundField::Min), None);
        assert_eq!(
            view.input_error.as_deref(),
            Some("min must be an integer or empty, got 'abc'")
        );
    }

    #[test]
    fn startup_failure_disables_commands() {
        let mut view = ready_view();
        view.apply(UiEvent::Error(UiError::from_message(
            UiErrorContext::BackendStartup,
            "runtime unavailable",
        )));

        assert!(!view.can_start());
        assert_eq!(view.status, "Error: runtime unavailable");
    }
}
