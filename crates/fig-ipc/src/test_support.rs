//! In-process stand-in for the companion app, bound in a temp directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::frame::{read_frame, write_frame, Frame};
use crate::proto::{local_message, Command, CommandResponse, LocalMessage};
use crate::socket::SOCKET_FILE_NAME;

type Responder = dyn Fn(&Command) -> CommandResponse + Send + Sync;

/// How the mock answers a connection.
enum Reply {
    /// Read one frame, then hold the connection open without answering.
    Silent,
    /// Capture every byte until the client closes.
    Record,
    /// Answer commands that expect a response, echoing their id unless the
    /// responder sets one.
    Respond(Box<Responder>),
    /// Read one frame, then write these bytes verbatim.
    Raw(Bytes),
}

pub struct MockCompanion {
    _dir: TempDir,
    path: PathBuf,
    received: mpsc::UnboundedReceiver<Bytes>,
    handle: JoinHandle<()>,
}

impl MockCompanion {
    async fn start(reply: Reply) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SOCKET_FILE_NAME);
        let listener = UnixListener::bind(&path).unwrap();
        let (tx, received) = mpsc::unbounded_channel();
        let reply = Arc::new(reply);

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                let reply = Arc::clone(&reply);
                tokio::spawn(async move { serve(stream, &reply, tx).await });
            }
        });

        Self {
            _dir: dir,
            path,
            received,
            handle,
        }
    }

    pub async fn silent() -> Self {
        Self::start(Reply::Silent).await
    }

    pub async fn recording() -> Self {
        Self::start(Reply::Record).await
    }

    pub async fn responding<F>(responder: F) -> Self
    where
        F: Fn(&Command) -> CommandResponse + Send + Sync + 'static,
    {
        Self::start(Reply::Respond(Box::new(responder))).await
    }

    pub async fn raw(bytes: impl Into<Bytes>) -> Self {
        Self::start(Reply::Raw(bytes.into())).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes the mock received on the next connection.
    pub async fn next_received(&mut self) -> Bytes {
        tokio::time::timeout(Duration::from_secs(2), self.received.recv())
            .await
            .expect("mock companion received nothing")
            .expect("mock companion stopped")
    }

    /// The command carried by the next received frame.
    pub async fn next_command(&mut self) -> Command {
        let bytes = self.next_received().await;
        let frame = read_frame(&mut &bytes[..]).await.unwrap();
        let message: LocalMessage = frame.decode().unwrap();
        match message.r#type {
            Some(local_message::Type::Command(command)) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }
}

impl Drop for MockCompanion {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: UnixStream, reply: &Reply, tx: mpsc::UnboundedSender<Bytes>) {
    if let Reply::Record = reply {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf).await;
        let _ = tx.send(Bytes::from(buf));
        return;
    }

    let Ok(frame) = read_frame(&mut stream).await else {
        return;
    };
    let _ = tx.send(frame.to_bytes());

    match reply {
        Reply::Record => unreachable!(),
        Reply::Silent => {
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink).await;
        }
        Reply::Raw(bytes) => {
            let _ = stream.write_all(bytes).await;
        }
        Reply::Respond(responder) => {
            let Ok(message) = frame.decode::<LocalMessage>() else {
                return;
            };
            let Some(local_message::Type::Command(command)) = message.r#type else {
                return;
            };
            if command.no_response == Some(true) {
                return;
            }

            let mut response = responder(&command);
            if response.id.is_none() {
                response.id = command.id;
            }
            let out = Frame::encode(&response, frame.encoding).unwrap();
            let _ = write_frame(&mut stream, &out).await;
        }
    }
}
