//! Byte source abstraction for already-captured image data.
//!
//! A transfer never sees where its bytes live. It asks a [`SourceProvider`]
//! to open an opaque reference (a file path, a media-store key, an in-memory
//! slot) and then drains the returned [`ByteSource`] chunk by chunk.

use std::io;

/// A sequential, finite source of bytes owned by exactly one transfer.
///
/// Contract:
/// - `read_chunk(buf)` fills as much of `buf` as it can and returns the
///   number of bytes written. Sources should only return fewer than
///   `buf.len()` bytes when fewer remain, so chunk boundaries stay fixed.
///   A return value of `0` marks the end of the stream.
/// - `close()` releases the underlying handle. The transfer calls it exactly
///   once, on every exit path, through a guard.
pub trait ByteSource: Send {
    /// Reads up to `buf.len()` bytes from the current position.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Releases the source. The default implementation has nothing to do.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Opens byte sources from opaque references.
///
/// Implementors must be `Send + Sync` so a single provider can be shared by
/// every concurrently running transfer.
pub trait SourceProvider: Send + Sync {
    fn open(&self, reference: &str) -> io::Result<Box<dyn ByteSource>>;
}
