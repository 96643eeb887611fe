//! camdrop library
//!
//! Streams captured photos to a configured host over a plain TCP connection.
//!
//! The wire protocol is as small as it gets: one connection per photo, the
//! image bytes written as they are read, then the connection is closed. There
//! is no handshake, no framing, and no acknowledgment.
//!
//! This crate provides:
//! - `PhotoSender`: starts detached transfer tasks, one per photo.
//! - `CapturePipeline`: turns "photo saved" signals into transfers, using the
//!   endpoint committed at that moment.
//! - `EndpointEditor` / `AppConfig`: the live and the persisted endpoint.
//! - `FileProvider` / `MemoryProvider`: byte sources for saved images.
//! - `PhotoReceiver`: the other end of the wire, for development and tests.
//!
//! Example:
//! ```no_run
//! use std::sync::Arc;
//! use camdrop::{
//!     CapturePipeline, Endpoint, EndpointEditor, FileProvider, PhotoSender,
//!     SenderConfig,
//! };
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let sender = PhotoSender::new(Arc::new(FileProvider), SenderConfig::default())?;
//! let editor = EndpointEditor::new(Endpoint::new("192.168.1.20", 49000));
//! let pipeline = CapturePipeline::new(sender, editor);
//!
//! // Returns immediately; the photo is sent in the background.
//! let _ = pipeline.on_capture_saved("/sdcard/DCIM/2024-03-09-14-05-07-042.jpg");
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod cli;
pub mod config;
pub mod entities;
pub mod errors;
pub mod receiver;
pub mod sender;
pub mod source;

pub use capture::CapturePipeline;
pub use cli::run_cli;
pub use config::{AppConfig, EndpointEditor};
pub use entities::{
    ByteSource, Endpoint, FailureStage, SourceProvider, TransferOutcome,
    TransferState,
};
pub use errors::{Result, TransferError};
pub use receiver::{PhotoReceiver, ReceivedPhoto};
pub use sender::{
    PhotoSender, SenderConfig, TransferFinishedEvent, TransferHandle,
    TransferSendingEvent, TransferStateEvent, TransferSubscriber,
    DEFAULT_CHUNK_SIZE,
};
pub use source::{FileProvider, FileSource, MemoryProvider, MemorySource};
