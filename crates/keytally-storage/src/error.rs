use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage-specific error types for the time log and button map files.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// A line of a persisted file could not be parsed
    #[error("Parse error in {file} line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    /// Date/time parsing or formatting error
    #[error("DateTime error: {0}")]
    DateTime(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a parse error for `line` (1-based) of `file`.
    pub fn parse(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl From<keytally_core::Error> for StorageError {
    fn from(err: keytally_core::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<chrono::ParseError> for StorageError {
    fn from(err: chrono::ParseError) -> Self {
        Self::DateTime(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = StorageError::io(
            "/tmp/times-2026-10-16.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("times-2026-10-16.csv"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = StorageError::parse(".key_map", 3, "missing ':'");
        assert_eq!(err.to_string(), "Parse error in .key_map line 3: missing ':'");
    }

    #[test]
    fn test_from_core_error() {
        let err: StorageError = keytally_core::Error::InvalidLabel("STOP".to_string()).into();
        assert!(matches!(err, StorageError::Validation(_)));
    }
}
