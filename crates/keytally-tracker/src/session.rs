//! Tracker state and action dispatch.
//!
//! [`TrackerSession`] is the single owner of everything the keypad can
//! change: the active layer, the time log with its running task, the
//! sleep inhibitor, and the color of the current project. Dispatching a
//! button event updates that state and returns the indicator commands
//! reflecting the change. The same state backs the full indicator replay
//! after a reconnect through [`Resync`].
//!
//! # Indicators
//!
//! | Index | Meaning | Shown as |
//! |-------|---------|----------|
//! | 0 | sleep prevention on | blue |
//! | 1 | a task is running | pulsing green |
//! | 2 | current project | project color |
//! | 7 | shifted layer active | yellow |

use crate::error::Result;
use crate::inhibitor::SleepInhibitor;
use crate::keymap::{Action, Keymap};
use keytally_core::constants::DEFAULT_TASK_LABEL;
use keytally_core::{ButtonEvent, IndicatorIndex, Layer, PressKind, Rgb};
use keytally_hardware::Resync;
use keytally_protocol::IndicatorCommand;
use keytally_storage::{DayReport, TimeLog};
use tracing::{debug, error, info};

/// Result of dispatching one button event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Commands to send to the device, in order.
    pub commands: Vec<IndicatorCommand>,

    /// Report produced by `ShowToday`.
    pub report: Option<DayReport>,

    /// The user asked to shut down.
    pub shutdown: bool,
}

impl DispatchOutcome {
    fn commands(commands: Vec<IndicatorCommand>) -> Self {
        Self {
            commands,
            ..Self::default()
        }
    }

    fn report(report: DayReport) -> Self {
        Self {
            report: Some(report),
            ..Self::default()
        }
    }

    fn shutdown() -> Self {
        Self {
            shutdown: true,
            ..Self::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        self.commands.is_empty() && self.report.is_none() && !self.shutdown
    }
}

/// Tracker state aggregate.
#[derive(Debug)]
pub struct TrackerSession {
    keymap: Keymap,
    layer: Layer,
    log: TimeLog,
    inhibitor: SleepInhibitor,
    project_color: Option<Rgb>,
}

impl TrackerSession {
    /// Wrap a restored log.
    ///
    /// If the log restored a running task, its project color is looked up
    /// in the keymap so the indicators can show it again.
    pub fn new(keymap: Keymap, log: TimeLog, inhibitor: SleepInhibitor) -> Self {
        let project_color = log
            .current_task()
            .and_then(|task| keymap.project_color(task));

        if let Some(task) = log.current_task() {
            info!(task = %task, color = ?project_color, "Resuming task");
        }

        Self {
            keymap,
            layer: Layer::Base,
            log,
            inhibitor,
            project_color,
        }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn log(&self) -> &TimeLog {
        &self.log
    }

    pub fn current_task(&self) -> Option<&str> {
        self.log.current_task()
    }

    pub fn project_color(&self) -> Option<Rgb> {
        self.project_color
    }

    pub fn sleep_inhibited(&self) -> bool {
        self.inhibitor.is_active()
    }

    /// Apply one button event.
    ///
    /// # Errors
    ///
    /// Returns the storage error of a failed log write or read. State that
    /// depends on the write is left unchanged, and a project color never
    /// outlives the task it belongs to.
    pub fn dispatch(&mut self, event: ButtonEvent) -> Result<DispatchOutcome> {
        let Some(action) = self.keymap.action(self.layer, event.button).cloned() else {
            info!(%event, layer = %self.layer, "Button not mapped");
            return Ok(DispatchOutcome::default());
        };

        match event.kind {
            PressKind::Press => {
                debug!(%event, ?action, "Dispatching");
                let outcome = self.execute(action);
                if !self.log.is_tracking() {
                    self.project_color = None;
                }
                outcome
            }
            PressKind::LongPress if matches!(action, Action::ShiftLayer {}) => {
                info!(%event, "Long press on shift, shutting down");
                Ok(DispatchOutcome::shutdown())
            }
            PressKind::LongPress => {
                info!(%event, ?action, "Long press has no action here");
                Ok(DispatchOutcome::default())
            }
        }
    }

    fn execute(&mut self, action: Action) -> Result<DispatchOutcome> {
        match action {
            Action::ToggleTracking {} => {
                if self.log.is_tracking() {
                    self.log.stop_task()?;
                    self.project_color = None;
                    Ok(DispatchOutcome::commands(tracking_off()))
                } else {
                    self.log.start_task(DEFAULT_TASK_LABEL)?;
                    self.project_color = self.keymap.project_color(DEFAULT_TASK_LABEL);
                    Ok(DispatchOutcome::commands(self.tracking_on()))
                }
            }

            Action::StartProject { label, color } => {
                self.log.stop_task()?;
                self.log.start_task(&label)?;
                self.project_color = Some(color);
                Ok(DispatchOutcome::commands(self.tracking_on()))
            }

            Action::ShowToday {} => Ok(DispatchOutcome::report(self.log.show_today()?)),

            Action::ShiftLayer {} => {
                self.layer = self.layer.toggled();
                info!(layer = %self.layer, "Layer switched");
                Ok(DispatchOutcome::commands(vec![self.layer_indicator()]))
            }

            Action::ToggleSleepInhibit {} => {
                let active = self.inhibitor.toggle();
                let color = if active { Rgb::BLUE } else { Rgb::OFF };
                Ok(DispatchOutcome::commands(vec![IndicatorCommand::set(
                    IndicatorIndex::SLEEP,
                    color,
                )]))
            }

            Action::ResetToday {} => {
                self.log.reset_today()?;
                self.project_color = None;
                let mut commands = vec![IndicatorCommand::StopAnimation, IndicatorCommand::CLEAR];
                commands.extend(self.indicator_state());
                Ok(DispatchOutcome::commands(commands))
            }
        }
    }

    /// Stop tracking, release the inhibitor and return the commands that
    /// turn the device dark.
    ///
    /// Never fails: a log error is reported and shutdown continues.
    pub fn shutdown(&mut self) -> Vec<IndicatorCommand> {
        if let Err(e) = self.log.stop_task() {
            error!(error = %e, "Could not record stop on shutdown");
        }
        self.inhibitor.disable();
        self.project_color = None;
        self.layer = Layer::Base;
        vec![IndicatorCommand::StopAnimation, IndicatorCommand::CLEAR]
    }

    fn tracking_on(&self) -> Vec<IndicatorCommand> {
        vec![
            IndicatorCommand::animate(IndicatorIndex::TRACKING, Rgb::GREEN),
            IndicatorCommand::set(
                IndicatorIndex::PROJECT,
                self.project_color.unwrap_or(Rgb::OFF),
            ),
        ]
    }

    fn layer_indicator(&self) -> IndicatorCommand {
        let color = match self.layer {
            Layer::Base => Rgb::OFF,
            Layer::Shifted => Rgb::YELLOW,
        };
        IndicatorCommand::set(IndicatorIndex::LAYER, color)
    }
}

fn tracking_off() -> Vec<IndicatorCommand> {
    vec![
        IndicatorCommand::StopAnimation,
        IndicatorCommand::set(IndicatorIndex::TRACKING, Rgb::OFF),
        IndicatorCommand::set(IndicatorIndex::PROJECT, Rgb::OFF),
    ]
}

impl Resync for TrackerSession {
    fn indicator_state(&self) -> Vec<IndicatorCommand> {
        let mut commands = Vec::new();

        if self.inhibitor.is_active() {
            commands.push(IndicatorCommand::set(IndicatorIndex::SLEEP, Rgb::BLUE));
        }
        if self.log.is_tracking() {
            commands.push(IndicatorCommand::animate(IndicatorIndex::TRACKING, Rgb::GREEN));
            if let Some(color) = self.project_color {
                commands.push(IndicatorCommand::set(IndicatorIndex::PROJECT, color));
            }
        }
        if self.layer == Layer::Shifted {
            commands.push(self.layer_indicator());
        }

        commands
    }
}
