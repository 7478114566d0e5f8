//! Auto-reconnecting session with the keypad.
//!
//! The [`SessionManager`] owns the transport exclusively. It decodes the
//! inbound stream into button events and sends indicator commands on a
//! best-effort basis.
//!
//! # State Machine
//!
//! ```text
//!                  connect ok
//! Disconnected ───────────────► Connected
//!      ▲   │                        │
//!      │   │ backoff                │ read error
//!      │   ▼                        │
//!      └─ Connecting ◄──────────────┘
//!        (connect failed)
//! ```
//!
//! Every transition into `Connected` clears the indicators and replays the
//! state supplied by a [`Resync`] implementation, so a device that was
//! unplugged or power-cycled always ends up showing host state.
//!
//! Read failures never surface to the caller: the link is torn down and
//! the manager retries after a fixed delay for as long as the caller keeps
//! asking for events. Write failures are logged and reported as `false`;
//! they do not tear the link down, the next read does that if the device
//! is really gone.

use crate::error::Result;
use crate::traits::{Connector, Resync, Transport};
use keytally_core::ButtonEvent;
use keytally_core::constants::RECONNECT_DELAY_MS;
use keytally_protocol::{DeviceMessage, IndicatorCommand, LineParser, decode};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Default size of the read buffer.
const READ_BUFFER_SIZE: usize = 256;

/// Connection state of a [`SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport; the next poll waits out the reconnect delay.
    Disconnected,

    /// Discovery and open in progress.
    Connecting,

    /// Transport open.
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Size of the buffer handed to the transport per read.
    pub read_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(RECONNECT_DELAY_MS),
            read_buffer_size: READ_BUFFER_SIZE,
        }
    }
}

/// Owner of the keypad link.
///
/// # Examples
///
/// ```
/// use keytally_hardware::mock::MockConnector;
/// use keytally_hardware::session::{SessionConfig, SessionManager};
/// use keytally_protocol::IndicatorCommand;
///
/// #[tokio::main]
/// async fn main() -> keytally_hardware::Result<()> {
///     let (connector, plug) = MockConnector::new();
///     let device = plug.attach();
///     let state: Vec<IndicatorCommand> = Vec::new();
///
///     let mut session = SessionManager::new(connector, SessionConfig::default());
///     session.connect(&state).await?;
///
///     device.send_line("BTN:4");
///     let event = session.next_event(&state).await;
///     assert_eq!(event.button.as_u8(), 4);
///     Ok(())
/// }
/// ```
pub struct SessionManager<C: Connector> {
    connector: C,
    transport: Option<C::Transport>,
    parser: LineParser,
    read_buf: Vec<u8>,
    state: SessionState,
    config: SessionConfig,
    reconnects: u64,
}

impl<C: Connector> std::fmt::Debug for SessionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("endpoint", &self.endpoint())
            .field("state", &self.state)
            .field("reconnects", &self.reconnects)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> SessionManager<C> {
    pub fn new(connector: C, config: SessionConfig) -> Self {
        let read_buf = vec![0u8; config.read_buffer_size.max(1)];
        Self {
            connector,
            transport: None,
            parser: LineParser::new(),
            read_buf,
            state: SessionState::Disconnected,
            config,
            reconnects: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Number of successful reconnects after the initial connect.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Name of the open endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.transport.as_ref().map(|t| t.name())
    }

    /// Connect immediately and resynchronize the indicators.
    ///
    /// # Errors
    ///
    /// Returns the connector's error; the manager stays `Disconnected`.
    pub async fn connect<R: Resync + ?Sized>(&mut self, resync: &R) -> Result<()> {
        self.state = SessionState::Connecting;
        match self.connector.connect().await {
            Ok(transport) => {
                info!(port = %transport.name(), "Session connected");
                self.attach(transport, resync).await;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Wait for the next button event.
    ///
    /// Never fails: lost links are replaced behind the scenes. Only
    /// returns once an event arrives, so callers race it against their
    /// shutdown signal.
    pub async fn next_event<R: Resync + ?Sized>(&mut self, resync: &R) -> ButtonEvent {
        loop {
            if let Some(event) = self.poll_event(resync).await {
                return event;
            }
        }
    }

    /// Make one step of progress and return an event if one is ready.
    ///
    /// A step is one transport read (bounded by the poll interval) or, when
    /// disconnected, one delayed reconnect attempt.
    pub async fn poll_event<R: Resync + ?Sized>(&mut self, resync: &R) -> Option<ButtonEvent> {
        if let Some(event) = self.next_decoded() {
            return Some(event);
        }

        let Some(transport) = self.transport.as_mut() else {
            self.reconnect(resync).await;
            return None;
        };

        match transport.read_available(&mut self.read_buf).await {
            Ok(0) => None,
            Ok(n) => {
                self.parser.feed(&self.read_buf[..n]);
                self.next_decoded()
            }
            Err(e) => {
                warn!(port = %transport.name(), error = %e, "Read failed, dropping connection");
                self.teardown();
                None
            }
        }
    }

    /// Send one indicator command.
    ///
    /// Returns `false` if there is no link or the write failed.
    pub async fn send(&mut self, command: &IndicatorCommand) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            debug!(%command, "Not connected, command dropped");
            return false;
        };

        match transport.write(command.encode().as_bytes()).await {
            Ok(()) => {
                trace!(%command, "Sent");
                true
            }
            Err(e) => {
                warn!(port = %transport.name(), %command, error = %e, "Write failed");
                false
            }
        }
    }

    /// Send commands in order; `true` only if all of them went out.
    ///
    /// A failed command does not stop the remaining ones.
    pub async fn send_all(&mut self, commands: &[IndicatorCommand]) -> bool {
        let mut all_sent = true;
        for command in commands {
            all_sent &= self.send(command).await;
        }
        all_sent
    }

    /// Clear the lights and replay the current host state.
    pub async fn resync<R: Resync + ?Sized>(&mut self, resync: &R) -> bool {
        let mut commands = vec![IndicatorCommand::CLEAR];
        commands.extend(resync.indicator_state());
        self.send_all(&commands).await
    }

    /// Drop the transport.
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            info!(port = %transport.name(), "Session closed");
        }
        self.parser.clear();
        self.state = SessionState::Disconnected;
    }

    async fn attach<R: Resync + ?Sized>(&mut self, transport: C::Transport, resync: &R) {
        self.transport = Some(transport);
        self.parser.clear();
        self.state = SessionState::Connected;
        if !self.resync(resync).await {
            warn!("Indicator resync incomplete");
        }
    }

    async fn reconnect<R: Resync + ?Sized>(&mut self, resync: &R) {
        tokio::time::sleep(self.config.reconnect_delay).await;

        self.state = SessionState::Connecting;
        match self.connector.connect().await {
            Ok(transport) => {
                self.reconnects += 1;
                info!(
                    port = %transport.name(),
                    reconnects = self.reconnects,
                    "Session reconnected"
                );
                self.attach(transport, resync).await;
            }
            Err(e) => {
                debug!(error = %e, "Reconnect attempt failed");
                self.state = SessionState::Disconnected;
            }
        }
    }

    fn teardown(&mut self) {
        self.transport = None;
        self.parser.clear();
        self.state = SessionState::Disconnected;
    }

    fn next_decoded(&mut self) -> Option<ButtonEvent> {
        while let Some(line) = self.parser.next_line() {
            match decode(&line) {
                Ok(Some(DeviceMessage::Button(event))) => {
                    debug!(%event, "Button event");
                    return Some(event);
                }
                Ok(Some(DeviceMessage::Identity(id))) => debug!(%id, "Identity reply"),
                Ok(None) => trace!(%line, "Device output"),
                Err(e) => warn!(error = %e, "Dropping malformed line"),
            }
        }
        None
    }
}
