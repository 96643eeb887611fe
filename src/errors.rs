use std::io;

use thiserror::Error;

use crate::entities::{Endpoint, FailureStage};

pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        source: io::Error,
    },
    #[error("Failed to open source {reference}: {source}")]
    SourceOpen {
        reference: String,
        source: io::Error,
    },
    #[error("Failed to read from source: {0}")]
    SourceRead(#[source] io::Error),
    #[error("Failed to write to connection: {0}")]
    Write(#[source] io::Error),
    #[error("Invalid port: {0}")]
    InvalidPort(String),
    #[error("Chunk size must be at least one byte")]
    InvalidChunkSize,
    #[error("No async runtime is available to run transfers")]
    NoRuntime,
}

impl TransferError {
    /// Stage of a transfer task the error belongs to.
    ///
    /// Configuration errors never happen inside a running task and map to
    /// [`FailureStage::Connect`], the first stage a task would have reached.
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::SourceOpen { .. } => FailureStage::Open,
            Self::SourceRead(_) => FailureStage::Read,
            Self::Write(_) => FailureStage::Write,
            Self::Connect { .. }
            | Self::InvalidPort(_)
            | Self::InvalidChunkSize
            | Self::NoRuntime => FailureStage::Connect,
        }
    }
}
