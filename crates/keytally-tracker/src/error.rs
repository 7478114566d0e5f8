//! Error types for the tracker.

use keytally_hardware::HardwareError;
use keytally_storage::StorageError;
use std::path::PathBuf;

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors raised while dispatching keypad actions or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The time log could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The keypad link could not be established.
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// A keymap failed validation.
    #[error("Invalid keymap: {0}")]
    InvalidKeymap(String),

    /// A keymap file is not valid JSON for the keymap schema.
    #[error("Keymap format error: {0}")]
    KeymapFormat(#[from] serde_json::Error),

    /// A keymap file could not be read.
    #[error("Cannot read keymap {}: {source}", path.display())]
    KeymapFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrackerError {
    /// Create a new keymap validation error.
    pub fn invalid_keymap(message: impl Into<String>) -> Self {
        Self::InvalidKeymap(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_keymap_error() {
        let error = TrackerError::invalid_keymap("shift missing in shifted layer");
        assert_eq!(
            error.to_string(),
            "Invalid keymap: shift missing in shifted layer"
        );
    }

    #[test]
    fn test_storage_error_conversion() {
        let error: TrackerError = StorageError::Validation("empty label".to_string()).into();
        assert!(matches!(error, TrackerError::Storage(_)));
    }

    #[test]
    fn test_hardware_error_conversion() {
        let error: TrackerError = HardwareError::no_device(None).into();
        assert_eq!(error.to_string(), "Hardware error: No keypad found");
    }
}
