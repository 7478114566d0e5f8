//! Keypad link layer for keytally.
//!
//! This crate finds the keypad among the host's serial ports and keeps a
//! session with it alive for as long as the tracker runs.
//!
//! # Layers
//!
//! - [`discovery`]: enumerate serial endpoints, narrow them down to the
//!   keypad's channel pair, optionally verify the device identity with a
//!   `PING`/`PONG` handshake.
//! - [`traits`]: the [`Transport`] and [`Connector`] seams plus the
//!   [`Resync`] hook the session uses to restore indicator state.
//! - [`serial`]: `serialport`-backed transport and connector.
//! - [`mock`]: channel-backed transport and connector for tests.
//! - [`session`]: the auto-reconnecting [`SessionManager`].
//!
//! # Example
//!
//! ```no_run
//! use keytally_hardware::discovery::DiscoveryConfig;
//! use keytally_hardware::serial::{SerialConfig, SerialConnector};
//! use keytally_hardware::session::{SessionConfig, SessionManager};
//! use keytally_protocol::IndicatorCommand;
//!
//! #[tokio::main]
//! async fn main() -> keytally_hardware::Result<()> {
//!     let connector = SerialConnector::new(DiscoveryConfig::default(), SerialConfig::default());
//!     let mut session = SessionManager::new(connector, SessionConfig::default());
//!     let state: Vec<IndicatorCommand> = Vec::new();
//!
//!     session.connect(&state).await?;
//!     loop {
//!         let event = session.next_event(&state).await;
//!         println!("{event}");
//!     }
//! }
//! ```
//!
//! [`Transport`]: traits::Transport
//! [`Connector`]: traits::Connector
//! [`Resync`]: traits::Resync
//! [`SessionManager`]: session::SessionManager

pub mod discovery;
pub mod error;
pub mod mock;
pub mod serial;
pub mod session;
pub mod traits;

pub use discovery::{Discovery, DiscoveryConfig, Endpoint, PortSystem, SystemPorts};
pub use error::{HardwareError, Result};
pub use serial::{SerialConfig, SerialConnector, SerialTransport};
pub use session::{SessionConfig, SessionManager, SessionState};
pub use traits::{Connector, Resync, Transport};
