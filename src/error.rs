use log::SetLoggerError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MissionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mission error: {0}")]
    Mission(String),

    #[error("State handler error: {0}")]
    Handler(String),

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Movement error: {0}")]
    Movement(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Logging error: {0}")]
    Logging(#[from] SetLoggerError),
}

pub type Result<T> = std::result::Result<T, MissionError>;
