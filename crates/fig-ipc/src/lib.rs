//! Local IPC client for the Fig companion app.
//!
//! The CLI talks to the companion over a Unix socket at `$TMPDIR/fig.socket`
//! using length-prefixed frames that carry either protobuf or JSON. Hooks
//! are one-way notifications; commands may wait for a response.

pub mod client;
pub mod commands;
pub mod error;
pub mod frame;
pub mod hooks;
pub mod integrations;
pub mod proto;
pub mod socket;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use client::{send_command, send_hook, send_recv_command, ClientConfig, IpcClient, DEFAULT_TIMEOUT};
pub use error::{CloseError, ConnectionError, HookError, IpcError, ProtocolError};
pub use frame::{Encoding, Frame};
pub use proto::{Command, CommandResponse, Hook, ShellContext, TerminalIntegration};
pub use socket::Connection;
