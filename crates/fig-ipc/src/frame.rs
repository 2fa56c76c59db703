//! Wire framing for the Fig socket.
//!
//! Every message is one frame:
//!
//! ```text
//! [preamble: 10 bytes] [length: u64 BE] [payload: length bytes]
//! ```
//!
//! The preamble is `\x1b@` followed by an 8-byte encoding tag:
//! - `fig-json`: JSON object
//! - `fig-pbuf`: protobuf
//!
//! There is no version field and no checksum.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::ProtocolError;
use crate::proto::WireMessage;

/// Preamble for JSON frames.
pub const JSON_PREAMBLE: &[u8; 10] = b"\x1b@fig-json";
/// Preamble for protobuf frames.
pub const BINARY_PREAMBLE: &[u8; 10] = b"\x1b@fig-pbuf";

const HEADER: &[u8; 2] = b"\x1b@";
const PREAMBLE_LEN: usize = 10;
const LENGTH_LEN: usize = 8;

/// Largest payload accepted from the companion (16 MiB).
pub const MAX_FRAME_LEN: u64 = 16 * 1024 * 1024;

/// Payload encoding, selected by the preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Binary,
}

impl Encoding {
    pub fn preamble(self) -> &'static [u8; 10] {
        match self {
            Encoding::Json => JSON_PREAMBLE,
            Encoding::Binary => BINARY_PREAMBLE,
        }
    }

    /// Classify a preamble. Anything but the two known tags is an error.
    pub fn from_preamble(preamble: &[u8; PREAMBLE_LEN]) -> Result<Self, ProtocolError> {
        if &preamble[..2] != HEADER {
            return Err(ProtocolError::InvalidHeader([preamble[0], preamble[1]]));
        }

        let mut tag = [0u8; 8];
        tag.copy_from_slice(&preamble[2..]);
        match &tag {
            b"fig-json" => Ok(Encoding::Json),
            b"fig-pbuf" => Ok(Encoding::Binary),
            _ => Err(ProtocolError::UnknownEncoding(tag)),
        }
    }
}

/// One decoded frame. The length on the wire is always `payload.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub encoding: Encoding,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(encoding: Encoding, payload: impl Into<Bytes>) -> Self {
        Self {
            encoding,
            payload: payload.into(),
        }
    }

    /// Encode `message` into a frame.
    pub fn encode<M: WireMessage>(message: &M, encoding: Encoding) -> Result<Self, ProtocolError> {
        Ok(Self::new(encoding, message.encode_payload(encoding)?))
    }

    /// Decode the payload as `M` using the frame's own encoding.
    pub fn decode<M: WireMessage>(&self) -> Result<M, ProtocolError> {
        M::decode_payload(self.encoding, &self.payload)
    }

    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Exact bytes written to the socket for this frame.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PREAMBLE_LEN + LENGTH_LEN + self.payload.len());
        buf.put_slice(self.encoding.preamble());
        buf.put_u64(self.len());
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Write exactly one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.to_bytes()).await?;
    writer.flush().await?;
    trace!(encoding = ?frame.encoding, len = frame.len(), "wrote frame");
    Ok(())
}

/// Read exactly one frame.
///
/// Short reads are retried until the whole frame has arrived. EOF before
/// that is reported as [`ProtocolError::Truncated`], never as a partial
/// frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut preamble = [0u8; PREAMBLE_LEN];
    read_section(reader, &mut preamble, "preamble").await?;
    let encoding = Encoding::from_preamble(&preamble)?;

    let mut length = [0u8; LENGTH_LEN];
    read_section(reader, &mut length, "length").await?;
    let len = u64::from_be_bytes(length);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len as usize];
    read_section(reader, &mut payload, "payload").await?;

    trace!(?encoding, len, "read frame");
    Ok(Frame::new(encoding, payload))
}

async fn read_section<R>(
    reader: &mut R,
    buf: &mut [u8],
    section: &'static str,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::Truncated { section })
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{CommandResponse, Hook};
    use crate::hooks;

    #[test]
    fn test_to_bytes_layout() {
        let frame = Frame::new(Encoding::Binary, &b"abc"[..]);
        let bytes = frame.to_bytes();
        assert_eq!(&bytes[..10], b"\x1b@fig-pbuf");
        assert_eq!(&bytes[10..18], &3u64.to_be_bytes());
        assert_eq!(&bytes[18..], b"abc");
    }

    #[test]
    fn test_from_preamble() {
        assert_eq!(Encoding::from_preamble(JSON_PREAMBLE).unwrap(), Encoding::Json);
        assert_eq!(Encoding::from_preamble(BINARY_PREAMBLE).unwrap(), Encoding::Binary);
        assert!(matches!(
            Encoding::from_preamble(b"\x1b@fig-mpak"),
            Err(ProtocolError::UnknownEncoding(tag)) if &tag == b"fig-mpak"
        ));
        assert!(matches!(
            Encoding::from_preamble(b"XXfig-json"),
            Err(ProtocolError::InvalidHeader([b'X', b'X']))
        ));
    }

    #[tokio::test]
    async fn test_read_write_frame() {
        let frame = Frame::encode(&CommandResponse::success("installed!"), Encoding::Json).unwrap();
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();

        let mut reader = &buf[..];
        let read = read_frame(&mut reader).await.unwrap();
        assert_eq!(read, frame);
        let resp: CommandResponse = read.decode().unwrap();
        assert_eq!(resp, CommandResponse::success("installed!"));
    }

    #[tokio::test]
    async fn test_read_frame_across_short_reads() {
        let hook = hooks::new_event_hook("opened_settings");
        let frame = Frame::encode(&hook, Encoding::Binary).unwrap();
        let bytes = frame.to_bytes();

        let (mut client, mut server) = tokio::io::duplex(4);
        let writer = tokio::spawn(async move {
            for chunk in bytes.chunks(3) {
                client.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        let read = read_frame(&mut server).await.unwrap();
        writer.await.unwrap();
        let decoded: Hook = read.decode().unwrap();
        assert_eq!(decoded, hook);
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let mut bytes = Frame::new(Encoding::Binary, &b"hello world"[..]).to_bytes().to_vec();
        bytes.truncate(bytes.len() - 4);
        let mut reader = &bytes[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::Truncated { section: "payload" })
        ));
    }

    #[tokio::test]
    async fn test_truncated_length() {
        let mut reader = &b"\x1b@fig-json\x00\x00"[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::Truncated { section: "length" })
        ));
    }

    #[tokio::test]
    async fn test_empty_stream_is_truncated_preamble() {
        let mut reader = &b""[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::Truncated { section: "preamble" })
        ));
    }

    #[tokio::test]
    async fn test_oversized_length_rejected() {
        let mut bytes = BINARY_PREAMBLE.to_vec();
        bytes.extend_from_slice(&u64::MAX.to_be_bytes());
        let mut reader = &bytes[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::FrameTooLarge { len: u64::MAX, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_preamble_rejected() {
        let mut bytes = b"\x1b@fig-mpak".to_vec();
        bytes.extend_from_slice(&0u64.to_be_bytes());
        let mut reader = &bytes[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::UnknownEncoding(_))
        ));
    }
}
