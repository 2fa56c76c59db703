//! Error types for the local IPC client.
//!
//! Each failure mode gets its own enum so callers can tell "the app is not
//! running" apart from "the app answered with an error".

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The socket could not be reached. Usually means the companion app is not
/// running.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("TMPDIR is not set, cannot locate the Fig socket")]
    TmpDirUnset,

    #[error("Socket not found: {}", .0.display())]
    SocketNotFound(PathBuf),

    #[error("Timed out after {timeout:?} connecting to {}", .path.display())]
    DialTimeout { path: PathBuf, timeout: Duration },

    #[error("Failed to connect to {}: {source}", .path.display())]
    Dial {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The bytes on the wire did not form a valid frame or message.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame header: {0:02x?}")]
    InvalidHeader([u8; 2]),

    #[error("Unknown frame encoding: {:?}", String::from_utf8_lossy(.0))]
    UnknownEncoding([u8; 8]),

    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: u64, max: u64 },

    #[error("Connection closed while reading frame {section}")]
    Truncated { section: &'static str },

    #[error("Frame I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown or missing {0} variant")]
    UnknownVariant(&'static str),

    #[error("Response id {actual} does not match request id {expected}")]
    MismatchedId { expected: i64, actual: i64 },

    #[error("Connection is closed")]
    Closed,
}

/// Closing a connection failed.
#[derive(Error, Debug)]
pub enum CloseError {
    #[error("Connection already closed")]
    AlreadyClosed,

    #[error("Failed to shut down connection: {0}")]
    Io(#[from] io::Error),
}

/// A shell context snapshot could not be captured.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("Failed to read current directory: {0}")]
    CurrentDir(#[source] io::Error),
}

/// Every error the IPC core can return.
#[derive(Error, Debug)]
pub enum IpcError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Timeout after {0:?} waiting for response")]
    Timeout(Duration),

    /// The companion answered with an `Error` response. The round trip
    /// itself succeeded.
    #[error("{message}")]
    Application {
        message: String,
        exit_code: Option<i32>,
    },

    #[error(transparent)]
    Close(#[from] CloseError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

impl IpcError {
    /// True when the companion app could not be reached at all.
    pub fn is_not_running(&self) -> bool {
        matches!(self, IpcError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_error_displays_message() {
        let err = IpcError::Application {
            message: "not installed".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(err.to_string(), "not installed");
        assert!(!err.is_not_running());
    }

    #[test]
    fn test_connection_error_is_not_running() {
        let err = IpcError::from(ConnectionError::SocketNotFound(PathBuf::from("/tmp/fig.socket")));
        assert!(err.is_not_running());
        assert_eq!(err.to_string(), "Socket not found: /tmp/fig.socket");
    }

    #[test]
    fn test_unknown_encoding_display() {
        let err = ProtocolError::UnknownEncoding(*b"fig-mpak");
        assert_eq!(err.to_string(), "Unknown frame encoding: \"fig-mpak\"");
    }
}
