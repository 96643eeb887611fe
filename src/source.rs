//! Concrete byte sources.
//!
//! - [`FileProvider`] opens a path on disk, which is how the CLI hands a
//!   captured photo to a transfer.
//! - [`MemoryProvider`] keeps captured images in memory under string keys,
//!   for embedders whose capture pipeline never touches the filesystem.

use std::{
    collections::HashMap,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use crate::entities::{ByteSource, SourceProvider};

/// A file opened for reading.
pub struct FileSource {
    path: PathBuf,
    file: Option<fs::File>,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        log::trace!("opened source {}", path.display());
        Ok(Self {
            path,
            file: Some(file),
        })
    }
}

impl ByteSource for FileSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => fill(file, buf),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("source {} is already closed", self.path.display()),
            )),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if self.file.take().is_some() {
            log::trace!("closed source {}", self.path.display());
        }
        Ok(())
    }
}

/// Reads until `buf` is full or the reader is exhausted.
///
/// A plain `Read::read` may return short counts in the middle of a file,
/// which would make chunk boundaries depend on the OS.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Treats every reference as a filesystem path.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileProvider;

impl SourceProvider for FileProvider {
    fn open(&self, reference: &str) -> io::Result<Box<dyn ByteSource>> {
        Ok(Box::new(FileSource::open(reference)?))
    }
}

/// A cursor over shared, immutable bytes.
pub struct MemorySource {
    data: Arc<Vec<u8>>,
    position: usize,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self::shared(Arc::new(data.into()))
    }

    fn shared(data: Arc<Vec<u8>>) -> Self {
        Self { data, position: 0 }
    }
}

impl ByteSource for MemorySource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

/// In-memory image store keyed by opaque references.
///
/// Every `open` gets its own cursor, so the same image can be sent by several
/// transfers at once.
#[derive(Default)]
pub struct MemoryProvider {
    images: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reference: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.images
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.into(), Arc::new(data.into()));
    }

    pub fn remove(&self, reference: &str) -> bool {
        self.images
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(reference)
            .is_some()
    }
}

impl SourceProvider for MemoryProvider {
    fn open(&self, reference: &str) -> io::Result<Box<dyn ByteSource>> {
        let images = self.images.read().unwrap_or_else(PoisonError::into_inner);
        match images.get(reference) {
            Some(data) => Ok(Box::new(MemorySource::shared(data.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no image stored under {reference}"),
            )),
        }
    }
}
