//! Error types for device discovery and the serial link.
//!
//! Two families live here. Discovery failures ([`NoDeviceFound`] and
//! [`AllPortsBusy`]) end startup. Link failures ([`Disconnected`], [`Io`],
//! [`Serial`]) are handled inside the session manager, which tears the link
//! down and reconnects.
//!
//! [`NoDeviceFound`]: HardwareError::NoDeviceFound
//! [`AllPortsBusy`]: HardwareError::AllPortsBusy
//! [`Disconnected`]: HardwareError::Disconnected
//! [`Io`]: HardwareError::Io
//! [`Serial`]: HardwareError::Serial

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while finding or talking to the keypad.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No endpoint matched the naming patterns and filter.
    #[error("No keypad found{}", filter_suffix(.filter))]
    NoDeviceFound { filter: Option<String> },

    /// Every candidate endpoint failed to open.
    #[error("All {attempted} candidate ports are busy")]
    AllPortsBusy { attempted: usize },

    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Serial driver error.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new no-device error.
    pub fn no_device(filter: Option<&str>) -> Self {
        Self::NoDeviceFound {
            filter: filter.map(str::to_string),
        }
    }

    /// Create a new all-ports-busy error.
    pub fn all_busy(attempted: usize) -> Self {
        Self::AllPortsBusy { attempted }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether this error comes from discovery rather than an open link.
    pub fn is_discovery_failure(&self) -> bool {
        matches!(
            self,
            Self::NoDeviceFound { .. } | Self::AllPortsBusy { .. }
        )
    }
}

fn filter_suffix(filter: &Option<String>) -> String {
    filter
        .as_deref()
        .map(|f| format!(" matching {f:?}"))
        .unwrap_or_default()
}
