//! Unix socket transport to the companion app.
//!
//! One [`Connection`] is opened per hook or command and closed explicitly
//! afterwards. Connections are never pooled.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::{debug, trace, warn};

use crate::error::{CloseError, ConnectionError, ProtocolError};
use crate::frame::{self, Frame};

/// Environment variable naming the runtime temp directory.
pub const TMPDIR_VAR: &str = "TMPDIR";

/// File name of the companion's socket inside `$TMPDIR`.
pub const SOCKET_FILE_NAME: &str = "fig.socket";

/// Resolve the companion socket: `$TMPDIR/fig.socket`.
pub fn socket_path() -> Result<PathBuf, ConnectionError> {
    socket_path_from(std::env::var_os(TMPDIR_VAR).map(PathBuf::from))
}

fn socket_path_from(tmpdir: Option<PathBuf>) -> Result<PathBuf, ConnectionError> {
    match tmpdir {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.join(SOCKET_FILE_NAME)),
        _ => Err(ConnectionError::TmpDirUnset),
    }
}

/// An open connection to the companion socket.
#[derive(Debug)]
pub struct Connection {
    stream: Option<UnixStream>,
    path: PathBuf,
}

impl Connection {
    /// Dial `path`, giving up after `timeout`.
    pub async fn connect(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, ConnectionError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(ConnectionError::SocketNotFound(path));
        }

        let stream = match tokio::time::timeout(timeout, UnixStream::connect(&path)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                warn!(path = %path.display(), error = %source, "failed to connect");
                return Err(ConnectionError::Dial { path, source });
            }
            Err(_) => {
                warn!(path = %path.display(), ?timeout, "timed out connecting");
                return Err(ConnectionError::DialTimeout { path, timeout });
            }
        };

        debug!(path = %path.display(), "connected");
        Ok(Self {
            stream: Some(stream),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Write one frame.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<(), ProtocolError> {
        let stream = self.stream_mut()?;
        frame::write_frame(stream, frame).await
    }

    /// Read one frame, waiting as long as it takes.
    pub async fn recv_frame(&mut self) -> Result<Frame, ProtocolError> {
        let stream = self.stream_mut()?;
        frame::read_frame(stream).await
    }

    /// Shut down and release the socket.
    ///
    /// A second call fails with [`CloseError::AlreadyClosed`].
    pub async fn close(&mut self) -> Result<(), CloseError> {
        let mut stream = self.stream.take().ok_or(CloseError::AlreadyClosed)?;

        match stream.shutdown().await {
            Ok(()) => {}
            // Peer hung up first, the socket is released either way.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => {}
            Err(e) => return Err(e.into()),
        }

        trace!(path = %self.path.display(), "closed");
        Ok(())
    }

    fn stream_mut(&mut self) -> Result<&mut UnixStream, ProtocolError> {
        self.stream.as_mut().ok_or(ProtocolError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockCompanion;
    use std::time::Instant;

    #[test]
    fn test_socket_path_from_tmpdir() {
        let path = socket_path_from(Some(PathBuf::from("/var/folders/xy/T"))).unwrap();
        assert_eq!(path, PathBuf::from("/var/folders/xy/T/fig.socket"));
    }

    #[test]
    fn test_socket_path_requires_tmpdir() {
        assert!(matches!(socket_path_from(None), Err(ConnectionError::TmpDirUnset)));
        assert!(matches!(
            socket_path_from(Some(PathBuf::new())),
            Err(ConnectionError::TmpDirUnset)
        ));
    }

    #[tokio::test]
    async fn test_connect_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SOCKET_FILE_NAME);

        let start = Instant::now();
        let err = Connection::connect(&path, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::SocketNotFound(p) if p == path));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_connect_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SOCKET_FILE_NAME);
        std::fs::write(&path, b"").unwrap();

        let err = Connection::connect(&path, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Dial { .. }));
    }

    #[tokio::test]
    async fn test_close_twice_fails() {
        let companion = MockCompanion::silent().await;
        let mut conn = Connection::connect(companion.path(), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(!conn.is_closed());
        conn.close().await.unwrap();
        assert!(conn.is_closed());
        assert!(matches!(conn.close().await, Err(CloseError::AlreadyClosed)));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let companion = MockCompanion::silent().await;
        let mut conn = Connection::connect(companion.path(), Duration::from_secs(1))
            .await
            .unwrap();
        conn.close().await.unwrap();

        let frame = Frame::new(crate::frame::Encoding::Json, &b"{}"[..]);
        assert!(matches!(conn.send_frame(&frame).await, Err(ProtocolError::Closed)));
        assert!(matches!(conn.recv_frame().await, Err(ProtocolError::Closed)));
    }
}
