//! Channel-backed transport and connector for tests and dry runs.
//!
//! A [`MockTransport`] is fed through its [`MockTransportHandle`]: tests
//! push device lines, inject read failures, and inspect the indicator
//! commands the host wrote. A [`MockConnector`] hands out queued
//! transports and can be told to fail a number of attempts, which is how
//! reconnect behavior is exercised without hardware.

pub mod connector;
pub mod transport;

pub use connector::{MockConnector, MockConnectorHandle};
pub use transport::{MockTransport, MockTransportHandle};
