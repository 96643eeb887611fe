//! Reference receiver for raw photo transfers.
//!
//! Every accepted connection carries exactly one photo. There is no header
//! and no length: the photo ends when the sender closes the connection. A
//! transfer that died half way therefore lands on disk as a shorter file,
//! indistinguishable from a complete one.

use std::{
    io,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tokio::{
    fs,
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream, ToSocketAddrs},
};

/// Timestamp layout of received photo names, to the millisecond.
pub const FILENAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

/// Builds the file name a photo received at `at` is stored under.
pub fn photo_file_name(at: DateTime<Local>) -> String {
    format!("{}.jpg", at.format(FILENAME_FORMAT))
}

#[derive(Clone, Debug)]
pub struct ReceivedPhoto {
    pub path: PathBuf,
    pub bytes: u64,
    pub peer: SocketAddr,
}

pub struct PhotoReceiver {
    listener: TcpListener,
    output_dir: PathBuf,
}

impl PhotoReceiver {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        output_dir: impl Into<PathBuf>,
    ) -> io::Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).await?;
        let listener = TcpListener::bind(addr).await?;
        log::info!(
            "receiving photos on {} into {}",
            listener.local_addr()?,
            output_dir.display()
        );
        Ok(Self {
            listener,
            output_dir,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Accepts one connection and stores everything it carries.
    pub async fn accept_one(&self) -> io::Result<ReceivedPhoto> {
        let (stream, peer) = self.listener.accept().await?;
        store(stream, peer, &self.output_dir).await
    }

    /// Accepts connections until the listener itself fails, storing each one
    /// on its own task. Errors that only concern one connection are logged
    /// and skipped.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) if is_connection_error(&e) => {
                    log::warn!("dropped incoming connection: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let output_dir = self.output_dir.clone();
            tokio::spawn(async move {
                match store(stream, peer, &output_dir).await {
                    Ok(photo) => log::info!(
                        "received {} bytes from {} into {}",
                        photo.bytes,
                        photo.peer,
                        photo.path.display()
                    ),
                    Err(e) => {
                        log::error!("failed to receive photo from {peer}: {e}")
                    }
                }
            });
        }
    }
}

/// Whether an accept error concerns a single connection rather than the
/// listener.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    )
}

async fn store(
    mut stream: TcpStream,
    peer: SocketAddr,
    output_dir: &Path,
) -> io::Result<ReceivedPhoto> {
    log::debug!("accepted connection from {peer}");
    let (mut file, path) = create_unique(output_dir).await?;
    let bytes = tokio::io::copy(&mut stream, &mut file).await?;
    file.flush().await?;
    Ok(ReceivedPhoto { path, bytes, peer })
}

/// Creates a new file named after the current time, adding a counter when
/// two photos arrive within the same millisecond.
async fn create_unique(output_dir: &Path) -> io::Result<(fs::File, PathBuf)> {
    let name = photo_file_name(Local::now());
    let stem = name.trim_end_matches(".jpg").to_string();
    let mut path = output_dir.join(&name);
    let mut attempt = 1;
    loop {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                path = output_dir.join(format!("{stem}-{attempt}.jpg"));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn names_follow_capture_format() {
        let at = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(photo_file_name(at), "2024-03-09-14-05-07-042.jpg");
    }

    #[tokio::test]
    async fn same_millisecond_names_do_not_clash() {
        let dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for _ in 0..5 {
            let (_file, path) = create_unique(dir.path()).await.unwrap();
            paths.push(path);
        }
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 5);
    }

    #[tokio::test]
    async fn stores_bytes_until_the_sender_closes() {
        let dir = TempDir::new().unwrap();
        let receiver = PhotoReceiver::bind("127.0.0.1:0", dir.path())
            .await
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        assert_eq!(receiver.output_dir(), dir.path());

        let sender = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"\xff\xd8jpeg-body\xff\xd9").await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let photo = receiver.accept_one().await.unwrap();
        sender.await.unwrap();

        assert_eq!(photo.bytes, 13);
        assert_eq!(
            std::fs::read(&photo.path).unwrap(),
            b"\xff\xd8jpeg-body\xff\xd9"
        );
        assert!(photo.path.starts_with(dir.path()));
    }

    #[rstest]
    #[case(io::ErrorKind::ConnectionAborted, true)]
    #[case(io::ErrorKind::ConnectionReset, true)]
    #[case(io::ErrorKind::Interrupted, true)]
    #[case(io::ErrorKind::PermissionDenied, false)]
    #[case(io::ErrorKind::InvalidInput, false)]
    fn only_per_connection_errors_are_skipped(
        #[case] kind: io::ErrorKind,
        #[case] skipped: bool,
    ) {
        assert_eq!(is_connection_error(&io::Error::from(kind)), skipped);
    }

    #[tokio::test]
    async fn keeps_serving_after_an_abandoned_connection() {
        let dir = TempDir::new().unwrap();
        let receiver = PhotoReceiver::bind("127.0.0.1:0", dir.path())
            .await
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        let server = tokio::spawn(receiver.run());

        drop(TcpStream::connect(addr).await.unwrap());

        for body in [&b"first"[..], &b"second"[..]] {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(body).await.unwrap();
            stream.shutdown().await.unwrap();
        }

        let expected = vec![b"first".to_vec(), b"second".to_vec()];
        let mut stored = Vec::new();
        for _ in 0..100 {
            stored = std::fs::read_dir(dir.path())
                .unwrap()
                .map(|entry| std::fs::read(entry.unwrap().path()).unwrap())
                .filter(|bytes| !bytes.is_empty())
                .collect::<Vec<_>>();
            stored.sort();
            if stored == expected {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        assert!(!server.is_finished());
        assert_eq!(stored, expected);
        server.abort();
    }
}
