use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EchoError {
    #[error("Invalid input shape: {0}")]
    InvalidInputShape(String),

    #[error("Ambiguous real input: {0}")]
    AmbiguousRealInput(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Unknown cable type: {0}")]
    UnknownCableType(String),

    #[error("No echo found above threshold")]
    NoEchoFound,
}

pub type Result<T> = std::result::Result<T, EchoError>;
