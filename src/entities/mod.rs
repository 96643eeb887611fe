//! Minimal models shared by the sender, the receiver, and the CLI.
//!
//! This module provides:
//! - `Endpoint`: the `(host, port)` destination of a transfer.
//! - `ByteSource` / `SourceProvider`: the pluggable byte source a transfer
//!   reads from, and the store that opens one from an opaque reference.
//! - `TransferState` / `TransferOutcome`: lifecycle of a single transfer task
//!   as seen by diagnostic subscribers.

mod data;
mod endpoint;
mod state;

pub use data::{ByteSource, SourceProvider};
pub use endpoint::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use state::{FailureStage, TransferOutcome, TransferState};
