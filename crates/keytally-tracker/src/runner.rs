//! Event loop tying the keypad session to the tracker.

use crate::session::TrackerSession;
use keytally_hardware::{Connector, SessionManager};
use keytally_storage::{ButtonRemap, DayReport};
use std::fmt;
use std::future::Future;
use tracing::{error, info, warn};

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future completed.
    Signal,

    /// The shift button was held.
    LongPress,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Signal => write!(f, "signal"),
            StopReason::LongPress => write!(f, "long press"),
        }
    }
}

/// Dispatch keypad events until `shutdown` completes or the user holds the
/// shift button.
///
/// Events pass through `remap` before dispatch. Reports from `ShowToday`
/// go to `on_report`. A failed action is logged, the device is resynced
/// to whatever state survived, and the loop keeps going.
/// On exit the running task is stopped, sleep prevention released, the
/// device cleared, and the session closed.
pub async fn run<C, F, R>(
    session: &mut SessionManager<C>,
    tracker: &mut TrackerSession,
    remap: Option<&ButtonRemap>,
    shutdown: F,
    mut on_report: R,
) -> StopReason
where
    C: Connector,
    F: Future<Output = ()>,
    R: FnMut(&DayReport),
{
    tokio::pin!(shutdown);

    let reason = loop {
        let event = tokio::select! {
            () = &mut shutdown => break StopReason::Signal,
            event = session.next_event(&*tracker) => event,
        };

        let event = match remap {
            Some(remap) => event.with_button(remap.apply(event.button)),
            None => event,
        };

        let outcome = match tracker.dispatch(event) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%event, error = %e, "Action failed");
                if !session.resync(&*tracker).await {
                    warn!("Indicator resync incomplete");
                }
                continue;
            }
        };

        if let Some(report) = &outcome.report {
            on_report(report);
        }
        session.send_all(&outcome.commands).await;

        if outcome.shutdown {
            break StopReason::LongPress;
        }
    };

    info!(%reason, "Shutting down");
    let commands = tracker.shutdown();
    session.send_all(&commands).await;
    session.close();
    reason
}
