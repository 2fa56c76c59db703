//! Command/response client for the companion socket.
//!
//! Each call opens its own connection, writes one frame and, for commands
//! that expect an answer, waits a bounded time for one response frame.
//! Nothing is retried here; callers that want retries call again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{IpcError, ProtocolError};
use crate::frame::{Encoding, Frame};
use crate::proto::{command_response, Command, CommandResponse, Hook, LocalMessage, ResponseKind};
use crate::socket::{self, Connection};

/// Bound on both dialing the socket and waiting for a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Optional override of [`DEFAULT_TIMEOUT`], in milliseconds.
pub const TIMEOUT_ENV_VAR: &str = "FIG_IPC_TIMEOUT_MS";

/// Where and how to reach the companion.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub socket_path: PathBuf,
    pub timeout: Duration,
    /// Encoding used for outgoing frames. Responses are decoded using
    /// whatever encoding their preamble names.
    pub encoding: Encoding,
}

impl ClientConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: DEFAULT_TIMEOUT,
            encoding: Encoding::Binary,
        }
    }

    /// `$TMPDIR/fig.socket` with the timeout from `FIG_IPC_TIMEOUT_MS`, if set.
    pub fn from_env() -> Result<Self, IpcError> {
        let mut config = Self::new(socket::socket_path()?);
        if let Some(timeout) = timeout_from_env(std::env::var(TIMEOUT_ENV_VAR).ok().as_deref()) {
            config.timeout = timeout;
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

fn timeout_from_env(value: Option<&str>) -> Option<Duration> {
    let value = value?;
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            warn!(value, "ignoring invalid {}", TIMEOUT_ENV_VAR);
            None
        }
    }
}

/// Client for the companion socket. Holds only configuration, so one value
/// can be reused for any number of calls.
#[derive(Debug, Clone)]
pub struct IpcClient {
    config: ClientConfig,
}

impl IpcClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self, IpcError> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    async fn connect(&self) -> Result<Connection, IpcError> {
        debug!(path = %self.config.socket_path.display(), "connecting");
        let conn = Connection::connect(&self.config.socket_path, self.config.timeout)
            .await
            .inspect_err(|e| debug!(error = %e, "connection failed"))?;
        Ok(conn)
    }

    /// Open a connection, write one message, close.
    async fn send_one_way(&self, message: &LocalMessage) -> Result<(), IpcError> {
        let frame = Frame::encode(message, self.config.encoding)?;
        let mut conn = self.connect().await?;

        let sent = conn.send_frame(&frame).await;
        let closed = conn.close().await;
        sent?;
        closed?;
        Ok(())
    }

    /// Send a hook. Fire-and-forget: only the write itself can fail.
    pub async fn send_hook(&self, hook: Hook) -> Result<(), IpcError> {
        self.send_one_way(&LocalMessage::from(hook)).await
    }

    /// Send a command without waiting for an answer.
    pub async fn send_command(&self, mut command: Command) -> Result<(), IpcError> {
        command.no_response = Some(true);
        debug!(kind = command.kind(), "sending command");
        self.send_one_way(&LocalMessage::from(command)).await
    }

    /// Send a command and wait up to the configured timeout for its response.
    pub async fn send_recv_command(&self, command: Command) -> Result<CommandResponse, IpcError> {
        self.send_recv_command_timeout(command, self.config.timeout)
            .await
    }

    /// Send a command and wait up to `timeout` for its response.
    ///
    /// A response carrying the `Error` variant is returned as
    /// [`IpcError::Application`].
    pub async fn send_recv_command_timeout(
        &self,
        mut command: Command,
        timeout: Duration,
    ) -> Result<CommandResponse, IpcError> {
        let id = *command.id.get_or_insert_with(new_correlation_id);
        command.no_response = Some(false);
        let kind = command.kind();

        let frame = Frame::encode(&LocalMessage::from(command), self.config.encoding)?;
        let mut conn = self.connect().await?;

        if let Err(e) = conn.send_frame(&frame).await {
            close_logged(&mut conn).await;
            return Err(e.into());
        }
        debug!(kind, id, ?timeout, "awaiting response");

        // Dropping the read future on timeout cancels it, and closing the
        // connection releases the socket.
        let received = tokio::time::timeout(timeout, conn.recv_frame()).await;
        close_logged(&mut conn).await;

        let frame = match received {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                warn!(kind, id, error = %e, "protocol failure");
                return Err(e.into());
            }
            Err(_) => {
                warn!(kind, id, ?timeout, "timed out waiting for response");
                return Err(IpcError::Timeout(timeout));
            }
        };

        let response: CommandResponse = frame.decode()?;
        if let Some(actual) = response.id {
            if actual != id {
                return Err(ProtocolError::MismatchedId {
                    expected: id,
                    actual,
                }
                .into());
            }
        }
        debug!(kind, id, "decoded response");

        if let Some(command_response::Response::Error(error)) = &response.response {
            return Err(IpcError::Application {
                message: error.message.clone().unwrap_or_default(),
                exit_code: error.exit_code,
            });
        }
        Ok(response)
    }

    /// Send a command and return the message of its `Success` response.
    pub async fn send_recv_message(&self, command: Command) -> Result<String, IpcError> {
        let response = self.send_recv_command(command).await?;
        match response.into_result()? {
            ResponseKind::Success(message) => Ok(message.unwrap_or_default()),
            _ => Err(ProtocolError::UnknownVariant("Success").into()),
        }
    }
}

/// Close after a request/response exchange. The exchange's own result is
/// what the caller sees, so a close failure is only logged.
async fn close_logged(conn: &mut Connection) {
    if let Err(e) = conn.close().await {
        debug!(path = %conn.path().display(), error = %e, "close after exchange failed");
    }
}

/// Positive id derived from a v4 UUID.
fn new_correlation_id() -> i64 {
    let (high, _) = uuid::Uuid::new_v4().as_u64_pair();
    (high >> 1) as i64
}

// =============================================================================
// ENVIRONMENT-RESOLVED ENTRY POINTS
// =============================================================================

/// Send a hook to the companion at `$TMPDIR/fig.socket`.
pub async fn send_hook(hook: Hook) -> Result<(), IpcError> {
    IpcClient::from_env()?.send_hook(hook).await
}

/// Send a command without waiting for a response.
pub async fn send_command(command: Command) -> Result<(), IpcError> {
    IpcClient::from_env()?.send_command(command).await
}

/// Send a command and wait up to `timeout` for its response.
pub async fn send_recv_command(
    command: Command,
    timeout: Duration,
) -> Result<CommandResponse, IpcError> {
    IpcClient::from_env()?
        .send_recv_command_timeout(command, timeout)
        .await
}
