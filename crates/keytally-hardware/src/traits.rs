//! Seams between the session manager and the physical link.
//!
//! The session manager never talks to `serialport` directly. It asks a
//! [`Connector`] for a fresh [`Transport`] whenever it needs one, and asks
//! its owner for the indicator state to restore through [`Resync`]. The
//! serial implementation lives in [`serial`](crate::serial); the
//! channel-backed one used by tests lives in [`mock`](crate::mock).
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT). They are therefore used through generic parameters, not trait
//! objects.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use keytally_protocol::IndicatorCommand;

/// An open, exclusively owned link to the keypad.
pub trait Transport: Send {
    /// Human-readable endpoint name used in diagnostics.
    fn name(&self) -> &str;

    /// Read whatever bytes are available.
    ///
    /// Waits at most one short poll interval. `Ok(0)` means nothing arrived
    /// in that interval; it is not an end-of-stream marker.
    ///
    /// # Errors
    ///
    /// Any error means the link is unusable and must be replaced.
    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `data` and flush it.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes could not be handed to the driver.
    async fn write(&mut self, data: &[u8]) -> Result<()>;
}

/// Produces transports: discovery followed by open.
pub trait Connector: Send {
    type Transport: Transport;

    /// Find the keypad and open a link to it.
    ///
    /// # Errors
    ///
    /// Returns a discovery error (`NoDeviceFound`, `AllPortsBusy`) or the
    /// error raised while opening the selected endpoint.
    async fn connect(&mut self) -> Result<Self::Transport>;
}

/// Source of truth for the indicator state shown on the device.
///
/// After every (re)connect the session manager clears the lights and
/// replays these commands, so the device always converges to host state.
pub trait Resync {
    /// Commands re-asserting the current indicator state on a cleared device.
    fn indicator_state(&self) -> Vec<IndicatorCommand>;
}

impl Resync for [IndicatorCommand] {
    fn indicator_state(&self) -> Vec<IndicatorCommand> {
        self.to_vec()
    }
}

impl Resync for Vec<IndicatorCommand> {
    fn indicator_state(&self) -> Vec<IndicatorCommand> {
        self.clone()
    }
}
