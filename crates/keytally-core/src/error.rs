use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid button: {0} (expected 1-9)")]
    InvalidButton(u32),

    #[error("Invalid layer: {0} (expected 0 or 1)")]
    InvalidLayer(u8),

    #[error("Invalid indicator index: {0}")]
    InvalidIndicator(u32),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Not a number: {0}")]
    NotANumber(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(String),
}

pub type Result<T> = std::result::Result<T, Error>;
