use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use super::subscriber::{
    Subscribers, TransferFinishedEvent, TransferSendingEvent,
    TransferStateEvent,
};
use crate::{
    entities::{
        ByteSource, Endpoint, SourceProvider, TransferOutcome, TransferState,
    },
    errors::{Result, TransferError},
};

/// Runs one transfer task from `CREATED` to `CLOSED`.
///
/// The carrier owns its endpoint snapshot, and once opened, its connection
/// and source. Nothing in it is shared with another task.
pub(crate) struct Carrier {
    pub(crate) id: String,
    pub(crate) reference: String,
    pub(crate) endpoint: Endpoint,
    pub(crate) chunk_size: usize,
    pub(crate) provider: Arc<dyn SourceProvider>,
    pub(crate) subscribers: Subscribers,
    pub(crate) state: TransferState,
    pub(crate) sent: u64,
}

impl Carrier {
    /// Drives the task to completion. Failures end here: they are logged,
    /// reported to subscribers, and dropped.
    pub(crate) async fn run(mut self) {
        log::debug!("[{}] sending photo {}", self.id, self.reference);

        let outcome = match self.transfer().await {
            Ok(bytes) => {
                log::debug!("[{}] sent photo ({bytes} bytes)", self.id);
                TransferOutcome::Completed { bytes }
            }
            Err(e) => {
                log::error!(
                    "[{}] transfer of {} to {} failed after {} bytes: {e}",
                    self.id,
                    self.reference,
                    self.endpoint,
                    self.sent
                );
                TransferOutcome::Failed {
                    stage: e.stage(),
                    reason: e.to_string(),
                    bytes: self.sent,
                }
            }
        };

        self.advance(TransferState::Closed);
        self.subscribers.for_each(|s| {
            s.notify_finished(TransferFinishedEvent {
                id: self.id.clone(),
                outcome: outcome.clone(),
            })
        });
    }

    /// Connects, then opens the source and streams it.
    ///
    /// `connection` and `source` are dropped in reverse order of acquisition
    /// on every return path, which closes both exactly once.
    async fn transfer(&mut self) -> Result<u64> {
        self.advance(TransferState::Connecting);
        let mut connection =
            TcpStream::connect((self.endpoint.host.as_str(), self.endpoint.port))
                .await
                .map_err(|source| TransferError::Connect {
                    endpoint: self.endpoint.clone(),
                    source,
                })?;
        // One write per chunk, no coalescing on our side.
        if let Err(e) = connection.set_nodelay(true) {
            log::warn!("[{}] failed to disable Nagle: {e}", self.id);
        }
        self.log(format!("transfer: Connected to {}", self.endpoint));

        self.advance(TransferState::Streaming);
        let mut source = SourceGuard::new(
            self.provider.open(&self.reference).map_err(|source| {
                TransferError::SourceOpen {
                    reference: self.reference.clone(),
                    source,
                }
            })?,
        );

        let id = self.id.clone();
        let subscribers = self.subscribers.clone();
        let chunk_size = self.chunk_size;
        let sent = &mut self.sent;
        let total = stream_chunks(
            source.source(),
            &mut connection,
            chunk_size,
            |progress| {
                *sent = progress;
                subscribers.for_each(|s| {
                    s.notify_sending(TransferSendingEvent {
                        id: id.clone(),
                        sent: progress,
                    })
                });
            },
        )
        .await?;

        finish(&mut connection).await?;
        Ok(total)
    }

    fn advance(&mut self, next: TransferState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        log::trace!("[{}] {} -> {next}", self.id, self.state);
        self.state = next;
        self.subscribers.for_each(|s| {
            s.notify_state(TransferStateEvent {
                id: self.id.clone(),
                state: next,
            })
        });
    }

    fn log(&self, message: String) {
        log::trace!("[{}] {message}", self.id);
        self.subscribers.log(message);
    }
}

/// Copies `source` into `sink` one chunk at a time until the source reports
/// end of stream. Returns the number of bytes written.
///
/// Each chunk read is written in full before the next read, in read order.
pub(crate) async fn stream_chunks<W>(
    source: &mut dyn ByteSource,
    sink: &mut W,
    chunk_size: usize,
    mut on_chunk: impl FnMut(u64),
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut sent = 0u64;
    loop {
        let n = source
            .read_chunk(&mut buffer)
            .map_err(TransferError::SourceRead)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buffer[..n])
            .await
            .map_err(TransferError::Write)?;
        sent += n as u64;
        on_chunk(sent);
    }
    sink.flush().await.map_err(TransferError::Write)?;
    Ok(sent)
}

/// Sends end of message by shutting down the write side.
///
/// A failed shutdown fails the task even when every byte was flushed: the
/// receiver may never have seen the end of the photo.
pub(crate) async fn finish<W>(sink: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.shutdown().await.map_err(TransferError::Write)
}

/// Closes the wrapped source when dropped.
pub(crate) struct SourceGuard(Box<dyn ByteSource>);

impl SourceGuard {
    pub(crate) fn new(source: Box<dyn ByteSource>) -> Self {
        Self(source)
    }

    pub(crate) fn source(&mut self) -> &mut dyn ByteSource {
        self.0.as_mut()
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            log::warn!("failed to close source: {e}");
        }
    }
}
