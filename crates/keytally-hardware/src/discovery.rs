//! Serial endpoint discovery.
//!
//! The keypad shows up as two CDC channels (console and data) whose names
//! share a numeric prefix, e.g. `/dev/tty.usbmodem142101` and
//! `/dev/tty.usbmodem142103`. Other USB serial adapters may be plugged in
//! at the same time, so discovery narrows the candidates down before it
//! tries to open anything:
//!
//! ```text
//! available ports
//!   └─ keep names matching PORT_NAME_PATTERNS
//!       └─ keep names containing the operator filter (if any)
//!           └─ group by the first 5 digits after the pattern
//!               └─ if some groups have exactly 2 members, keep only those
//!                   └─ try reverse-sorted, then sorted
//! ```
//!
//! The higher-numbered channel of a pair is normally the data channel,
//! which is why the reverse pass comes first.
//!
//! Trying an endpoint means opening and closing it, or, when identity
//! verification is enabled, sending `PING` and waiting for
//! `PONG:<device id>`. A wrong reply, a timeout or an I/O error only
//! disqualifies that endpoint.

use crate::error::{HardwareError, Result};
use keytally_core::constants::{
    BAUD_RATE, DEVICE_ID, GROUP_PREFIX_DIGITS, HANDSHAKE_TIMEOUT_MS, PING_COMMAND,
    POLL_INTERVAL_MS, PORT_NAME_PATTERNS, PROBE_SETTLE_MS, READ_TIMEOUT_MS, UNGROUPED_KEY,
};
use keytally_protocol::{DeviceMessage, LineParser, decode};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A candidate serial endpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Endpoint {
    /// OS path of the port.
    pub path: String,

    /// Key shared by the sibling channels of one device.
    pub group: String,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let group = group_key(&path);
        Self { path, group }
    }
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Substring an endpoint name must contain.
    pub filter: Option<String>,

    /// Require the `PING`/`PONG` handshake instead of a plain open test.
    pub verify_identity: bool,

    /// Identity expected in the `PONG` reply.
    pub expected_identity: String,

    /// Time allowed for the `PONG` reply.
    pub handshake_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            filter: None,
            verify_identity: false,
            expected_identity: DEVICE_ID.to_string(),
            handshake_timeout: Duration::from_millis(HANDSHAKE_TIMEOUT_MS),
        }
    }
}

impl DiscoveryConfig {
    /// Restrict discovery to endpoints whose name contains `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// Require the identity handshake.
    #[must_use]
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_identity = verify;
        self
    }
}

/// Access to the OS serial ports.
///
/// Implemented by [`SystemPorts`] for real hardware and by test doubles.
pub trait PortSystem {
    /// Names of all serial ports visible to the OS.
    fn list_ports(&self) -> Result<Vec<String>>;

    /// Open and immediately close `path`.
    fn try_open(&self, path: &str) -> Result<()>;

    /// Run the identity handshake on `path`.
    ///
    /// Returns `Ok(false)` for a wrong reply or no reply within `timeout`.
    fn identify(&self, path: &str, expected: &str, timeout: Duration) -> Result<bool>;
}

/// Group key of a port name.
///
/// The key is the first [`GROUP_PREFIX_DIGITS`] digits following the
/// naming pattern. Names without such a digit run are all keyed
/// [`UNGROUPED_KEY`].
///
/// ```
/// use keytally_hardware::discovery::group_key;
///
/// assert_eq!(group_key("/dev/tty.usbmodem142101"), "14210");
/// assert_eq!(group_key("/dev/ttyACM0"), "other");
/// ```
pub fn group_key(path: &str) -> String {
    PORT_NAME_PATTERNS
        .iter()
        .find_map(|pattern| path.find(pattern).map(|pos| &path[pos + pattern.len()..]))
        .map(|rest| {
            rest.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .filter(|digits| digits.len() >= GROUP_PREFIX_DIGITS)
        .map(|digits| digits[..GROUP_PREFIX_DIGITS].to_string())
        .unwrap_or_else(|| UNGROUPED_KEY.to_string())
}

/// Whether `path` looks like a keypad endpoint at all.
pub fn matches_known_pattern(path: &str) -> bool {
    PORT_NAME_PATTERNS.iter().any(|pattern| path.contains(pattern))
}

/// Narrow the OS port list down to candidate endpoints, sorted by path.
pub fn select_candidates(ports: &[String], filter: Option<&str>) -> Vec<Endpoint> {
    let mut candidates: Vec<Endpoint> = ports
        .iter()
        .filter(|path| matches_known_pattern(path))
        .filter(|path| filter.is_none_or(|f| path.contains(f)))
        .map(|path| Endpoint::new(path.as_str()))
        .collect();
    candidates.sort();
    candidates.dedup();

    let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
    for endpoint in &candidates {
        *groups.entry(endpoint.group.as_str()).or_default() += 1;
    }
    let paired: Vec<String> = groups
        .into_iter()
        .filter(|(group, members)| *group != UNGROUPED_KEY && *members == 2)
        .map(|(group, _)| group.to_string())
        .collect();

    if paired.is_empty() {
        return candidates;
    }

    candidates
        .into_iter()
        .filter(|endpoint| paired.contains(&endpoint.group))
        .collect()
}

/// Order in which sorted candidates are tried: reversed, then forward.
pub fn attempt_order(candidates: &[Endpoint]) -> impl Iterator<Item = &Endpoint> {
    candidates.iter().rev().chain(candidates.iter())
}

/// Whether `line` is the identity reply of the expected device.
pub fn is_identity_reply(line: &str, expected: &str) -> bool {
    matches!(decode(line), Ok(Some(DeviceMessage::Identity(id))) if id == expected)
}

/// Endpoint discovery over a [`PortSystem`].
///
/// # Example
///
/// ```no_run
/// use keytally_hardware::discovery::{Discovery, DiscoveryConfig, SystemPorts};
///
/// # fn example() -> keytally_hardware::Result<()> {
/// let config = DiscoveryConfig::default().with_filter(Some("usbmodem".to_string()));
/// let endpoint = Discovery::new(SystemPorts::default(), config).discover()?;
/// println!("keypad on {}", endpoint.path);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Discovery<P> {
    ports: P,
    config: DiscoveryConfig,
}

impl<P: PortSystem> Discovery<P> {
    pub fn new(ports: P, config: DiscoveryConfig) -> Self {
        Self { ports, config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Candidate endpoints in sorted order.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS port list cannot be read.
    pub fn candidates(&self) -> Result<Vec<Endpoint>> {
        let ports = self.ports.list_ports()?;
        Ok(select_candidates(&ports, self.config.filter.as_deref()))
    }

    /// Find the keypad endpoint.
    ///
    /// # Errors
    ///
    /// - `NoDeviceFound` if no endpoint matches, or if identity verification
    ///   is enabled and no endpoint answered with the expected identity.
    /// - `AllPortsBusy` if every candidate failed to open.
    pub fn discover(&self) -> Result<Endpoint> {
        let candidates = self.candidates()?;
        if candidates.is_empty() {
            return Err(HardwareError::no_device(self.config.filter.as_deref()));
        }

        let names: Vec<&str> = candidates.iter().map(|e| e.path.as_str()).collect();
        info!(candidates = ?names, "Found candidate ports");

        let mut answered: Vec<&str> = Vec::new();
        for endpoint in attempt_order(&candidates) {
            if answered.contains(&endpoint.path.as_str()) {
                continue;
            }

            if self.config.verify_identity {
                match self.ports.identify(
                    &endpoint.path,
                    &self.config.expected_identity,
                    self.config.handshake_timeout,
                ) {
                    Ok(true) => {
                        info!(port = %endpoint.path, "Keypad identified");
                        return Ok(endpoint.clone());
                    }
                    Ok(false) => {
                        debug!(port = %endpoint.path, "Port is not the keypad");
                        answered.push(&endpoint.path);
                    }
                    Err(e) => warn!(port = %endpoint.path, error = %e, "Port not usable"),
                }
            } else {
                match self.ports.try_open(&endpoint.path) {
                    Ok(()) => {
                        info!(port = %endpoint.path, "Using port");
                        return Ok(endpoint.clone());
                    }
                    Err(e) => warn!(port = %endpoint.path, error = %e, "Port not usable"),
                }
            }
        }

        if self.config.verify_identity && !answered.is_empty() {
            return Err(HardwareError::no_device(self.config.filter.as_deref()));
        }
        Err(HardwareError::all_busy(candidates.len()))
    }
}

/// The OS serial ports, through `serialport`.
#[derive(Debug, Clone)]
pub struct SystemPorts {
    pub baud_rate: u32,
    pub poll_interval: Duration,
}

impl Default for SystemPorts {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

impl PortSystem for SystemPorts {
    fn list_ports(&self) -> Result<Vec<String>> {
        Ok(serialport::available_ports()?
            .into_iter()
            .map(|info| info.port_name)
            .collect())
    }

    fn try_open(&self, path: &str) -> Result<()> {
        let port = serialport::new(path, self.baud_rate)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()?;
        drop(port);
        Ok(())
    }

    fn identify(&self, path: &str, expected: &str, timeout: Duration) -> Result<bool> {
        let mut port = serialport::new(path, self.baud_rate)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()?;

        std::thread::sleep(Duration::from_millis(PROBE_SETTLE_MS));
        port.clear(serialport::ClearBuffer::Input)?;
        port.write_all(format!("{PING_COMMAND}\n").as_bytes())?;
        port.flush()?;

        let deadline = Instant::now() + timeout;
        let mut parser = LineParser::new();
        let mut buf = [0u8; 256];

        while Instant::now() < deadline {
            let available = port.bytes_to_read()? as usize;
            if available == 0 {
                std::thread::sleep(self.poll_interval);
                continue;
            }

            let len = available.min(buf.len());
            let n = port.read(&mut buf[..len])?;
            parser.feed(&buf[..n]);
            if let Some(line) = parser.next_line() {
                debug!(port = %path, reply = %line, "Handshake reply");
                return Ok(is_identity_reply(&line, expected));
            }
        }

        debug!(port = %path, "No handshake reply");
        Ok(false)
    }
}
