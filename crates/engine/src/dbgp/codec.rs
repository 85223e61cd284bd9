// PDL - PHP Debug Log
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! DBGp frame codec
//!
//! Outbound frames are plain command text followed by a transaction id and a
//! NUL byte: `breakpoint_set -t line -f index.php -n 3 -i 0\0`.
//!
//! Inbound frames carry a decimal length prefix:
//! `<length>\0<length bytes of XML>\0`.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use super::error::{DbgpError, DbgpResult};

/// Size of the first read of every inbound frame. Wide enough for the longest
/// length prefix plus its separator.
pub const LENGTH_CHUNK: usize = 16;

const PAYLOAD_CHUNK: usize = 4096;

/// Encode a command for the wire, appending its transaction id
pub fn encode_command(command: &str, transaction_id: u64) -> Vec<u8> {
    let mut frame = format!("{command} -i {transaction_id}").into_bytes();
    frame.push(0);
    frame
}

/// Encode a payload the way a debug engine frames its responses
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = payload.len().to_string().into_bytes();
    frame.push(0);
    frame.extend_from_slice(payload);
    frame.push(0);
    frame
}

/// Reads and writes DBGp frames over a byte stream
#[derive(Debug)]
pub struct FrameCodec<S> {
    stream: S,
    /// Bytes already read from the stream but not yet consumed by a frame
    pending: VecDeque<u8>,
}

impl<S> FrameCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream
    pub fn new(stream: S) -> Self {
        Self { stream, pending: VecDeque::new() }
    }

    /// Write one outbound frame. The whole buffer is written before returning.
    pub async fn write_message(&mut self, frame: &[u8]) -> DbgpResult<()> {
        trace!(bytes = frame.len(), frame = %String::from_utf8_lossy(frame), "-> frame");
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read one inbound frame.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly before a new frame
    /// starts, which is how a debuggee signals it has gone away.
    pub async fn read_message(&mut self) -> DbgpResult<Option<Vec<u8>>> {
        let separator = loop {
            if let Some(position) = self.pending.iter().position(|&byte| byte == 0) {
                break position;
            }
            if self.pending.len() > LENGTH_CHUNK {
                return Err(DbgpError::MalformedLength(self.pending_text()));
            }

            let mut chunk = [0u8; LENGTH_CHUNK];
            let read = self.stream.read(&mut chunk).await?;
            if read == 0 {
                if self.pending.is_empty() {
                    debug!("Stream closed by debuggee");
                    return Ok(None);
                }
                return Err(DbgpError::UnexpectedEof);
            }
            self.pending.extend(&chunk[..read]);
        };

        let prefix: Vec<u8> = self.pending.drain(..separator).collect();
        self.pending.pop_front();
        let length = parse_length(&prefix)?;

        // Stop at the terminator, or once length + 1 bytes are in without one
        // The prefix is untrusted; grow past the first chunk only as bytes arrive
        let mut payload = Vec::with_capacity(length.min(PAYLOAD_CHUNK));
        let mut consumed = 0;
        loop {
            if consumed > length {
                return Err(DbgpError::MissingTerminator(length));
            }
            let byte = match self.pending.pop_front() {
                Some(byte) => byte,
                None => self.next_byte().await?,
            };
            consumed += 1;
            if byte == 0 {
                break;
            }
            payload.push(byte);
        }

        if payload.len() != length {
            debug!(declared = length, actual = payload.len(), "Frame shorter than its length prefix");
        }
        trace!(bytes = payload.len(), frame = %String::from_utf8_lossy(&payload), "<- frame");
        Ok(Some(payload))
    }

    /// Refill `pending` from the stream and take its first byte
    async fn next_byte(&mut self) -> DbgpResult<u8> {
        let mut chunk = [0u8; PAYLOAD_CHUNK];
        let read = self.stream.read(&mut chunk).await?;
        self.pending.extend(&chunk[..read]);
        self.pending.pop_front().ok_or(DbgpError::UnexpectedEof)
    }

    fn pending_text(&self) -> String {
        let bytes: Vec<u8> = self.pending.iter().copied().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn parse_length(prefix: &[u8]) -> DbgpResult<usize> {
    let text = String::from_utf8_lossy(prefix);
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(DbgpError::MalformedLength(text.into_owned()));
    }
    text.parse().map_err(|_| DbgpError::MalformedLength(text.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    /// A codec whose peer end is handed back for the test to drive
    fn pair(capacity: usize) -> (FrameCodec<tokio::io::DuplexStream>, tokio::io::DuplexStream) {
        let (ours, theirs) = duplex(capacity);
        (FrameCodec::new(ours), theirs)
    }

    #[tokio::test]
    async fn test_round_trip_payloads() {
        let long = "<response>".to_string() + &"x".repeat(10_000) + "</response>";
        for payload in ["", "a", "<init/>", long.as_str()] {
            let (mut codec, mut peer) = pair(64 * 1024);
            peer.write_all(&encode_frame(payload.as_bytes())).await.unwrap();

            let read = codec.read_message().await.unwrap().unwrap();
            assert_eq!(read, payload.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_frame_split_across_small_writes() {
        let (mut codec, mut peer) = pair(4);
        let payload = b"<response status=\"break\"/>".to_vec();

        let writer = tokio::spawn(async move {
            for piece in encode_frame(&payload).chunks(3) {
                peer.write_all(piece).await.unwrap();
            }
            peer
        });

        let read = codec.read_message().await.unwrap().unwrap();
        assert_eq!(read, b"<response status=\"break\"/>");
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_back_to_back_short_frames() {
        let (mut codec, mut peer) = pair(1024);
        let mut bytes = encode_frame(b"ab");
        bytes.extend(encode_frame(b""));
        bytes.extend(encode_frame(b"cde"));
        peer.write_all(&bytes).await.unwrap();
        drop(peer);

        assert_eq!(codec.read_message().await.unwrap().unwrap(), b"ab");
        assert_eq!(codec.read_message().await.unwrap().unwrap(), b"");
        assert_eq!(codec.read_message().await.unwrap().unwrap(), b"cde");
        assert!(codec.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clean_end_of_stream() {
        let (mut codec, peer) = pair(16);
        drop(peer);
        assert!(codec.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_mid_frame_is_an_error() {
        let (mut codec, mut peer) = pair(64);
        peer.write_all(b"10\0<resp").await.unwrap();
        drop(peer);
        assert!(matches!(codec.read_message().await, Err(DbgpError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_malformed_length_prefix() {
        let (mut codec, mut peer) = pair(64);
        peer.write_all(b"1x\0<a/>\0").await.unwrap();
        assert!(matches!(codec.read_message().await, Err(DbgpError::MalformedLength(_))));

        let (mut codec, mut peer) = pair(64);
        peer.write_all(&[b'9'; 40]).await.unwrap();
        assert!(matches!(codec.read_message().await, Err(DbgpError::MalformedLength(_))));
    }

    #[tokio::test]
    async fn test_huge_length_prefix_does_not_preallocate() {
        let (mut codec, mut peer) = pair(64);
        peer.write_all(format!("{}\0<a/>\0", usize::MAX).as_bytes()).await.unwrap();
        assert_eq!(codec.read_message().await.unwrap().unwrap(), b"<a/>");

        let (mut codec, mut peer) = pair(64);
        peer.write_all(b"99999999999999999999999\0<a/>\0").await.unwrap();
        assert!(matches!(codec.read_message().await, Err(DbgpError::MalformedLength(_))));
    }

    #[tokio::test]
    async fn test_missing_terminator() {
        let (mut codec, mut peer) = pair(64);
        peer.write_all(b"3\0abcdef").await.unwrap();
        assert!(matches!(codec.read_message().await, Err(DbgpError::MissingTerminator(3))));
    }

    #[tokio::test]
    async fn test_write_message_sends_whole_frame() {
        let (mut codec, mut peer) = pair(8);
        let frame = encode_command("property_get -n $averyveryverylongname", 41);

        let expected = frame.clone();
        let reader = tokio::spawn(async move {
            let mut received = vec![0u8; expected.len()];
            peer.read_exact(&mut received).await.unwrap();
            received
        });

        codec.write_message(&frame).await.unwrap();
        assert_eq!(reader.await.unwrap(), b"property_get -n $averyveryverylongname -i 41\0");
    }
}
