//! Serial transport for the physical keypad.
//!
//! `serialport` is a blocking API. Reads are made non-blocking by polling
//! `bytes_to_read()` and sleeping on the tokio timer between polls, so a
//! quiet keypad never parks a runtime worker inside the driver. Discovery
//! and the open call (which includes a settle delay) run on the blocking
//! pool.

use crate::discovery::{Discovery, DiscoveryConfig, SystemPorts};
use crate::error::{HardwareError, Result};
use crate::traits::{Connector, Transport};
use keytally_core::constants::{BAUD_RATE, POLL_INTERVAL_MS, READ_TIMEOUT_MS, SETTLE_DELAY_MS};
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Serial link parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud rate; the USB CDC link ignores it but the driver requires one.
    pub baud_rate: u32,

    /// Driver-level read timeout.
    pub read_timeout: Duration,

    /// Sleep between polls when no bytes are waiting.
    pub poll_interval: Duration,

    /// Wait after opening before the buffers are cleared.
    pub settle_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
        }
    }
}

/// Open serial link to the keypad.
pub struct SerialTransport {
    path: String,
    port: Box<dyn SerialPort>,
    poll_interval: Duration,
}

impl SerialTransport {
    /// Open `path`, wait for the device to settle, and drop stale bytes.
    ///
    /// Blocks for `config.settle_delay`; call from a blocking context.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened or its buffers cannot
    /// be cleared.
    pub fn open(path: &str, config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(path, config.baud_rate)
            .timeout(config.read_timeout)
            .open()?;

        std::thread::sleep(config.settle_delay);
        port.clear(ClearBuffer::All)?;

        debug!(port = %path, "Serial port open");
        Ok(Self {
            path: path.to_string(),
            port,
            poll_interval: config.poll_interval,
        })
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.path
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.port.bytes_to_read()? as usize;
        if available == 0 {
            tokio::time::sleep(self.poll_interval).await;
            return Ok(0);
        }

        let len = available.min(buf.len());
        match self.port.read(&mut buf[..len]) {
            Ok(0) => Err(HardwareError::disconnected(&self.path)),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }
}

/// Connector running discovery and opening the selected endpoint.
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    discovery: DiscoveryConfig,
    serial: SerialConfig,
}

impl SerialConnector {
    pub fn new(discovery: DiscoveryConfig, serial: SerialConfig) -> Self {
        Self { discovery, serial }
    }

    pub fn discovery_config(&self) -> &DiscoveryConfig {
        &self.discovery
    }
}

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    async fn connect(&mut self) -> Result<SerialTransport> {
        let discovery = self.discovery.clone();
        let serial = self.serial.clone();

        tokio::task::spawn_blocking(move || {
            let ports = SystemPorts {
                baud_rate: serial.baud_rate,
                poll_interval: serial.poll_interval,
            };
            let endpoint = Discovery::new(ports, discovery).discover()?;
            let transport = SerialTransport::open(&endpoint.path, &serial)?;
            info!(port = %endpoint.path, "Connected to keypad");
            Ok(transport)
        })
        .await
        .map_err(|e| HardwareError::other(format!("Connect task failed: {e}")))?
    }
}
