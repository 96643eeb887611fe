use std::fmt;

/// Lifecycle of a single transfer task.
///
/// `Created → Connecting → Streaming → Closed`, with `Connecting → Closed`
/// when the connection cannot be established. `Closed` is terminal: a task
/// is never reused or retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferState {
    Created,
    Connecting,
    Streaming,
    Closed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_advance_to(&self, next: TransferState) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Connecting)
                | (Self::Connecting, Self::Streaming)
                | (Self::Connecting, Self::Closed)
                | (Self::Streaming, Self::Closed)
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Connecting => "CONNECTING",
            Self::Streaming => "STREAMING",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Where a failed transfer gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureStage {
    Connect,
    Open,
    Read,
    Write,
}

/// Final result of a transfer, reported to subscribers only.
///
/// `bytes` counts what was handed to the connection before the task ended.
/// For a failure after streaming started, the receiver may already hold that
/// many bytes and cannot tell them apart from a short, complete photo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed {
        bytes: u64,
    },
    Failed {
        stage: FailureStage,
        reason: String,
        bytes: u64,
    },
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn bytes(&self) -> u64 {
        match self {
            Self::Completed { bytes } | Self::Failed { bytes, .. } => *bytes,
        }
    }
}
