// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Length-prefixed framing over any `AsyncRead`/`AsyncWrite`, in the same
//! shape `ah-command-trace-server` uses for its Unix-socket protocol: a
//! 4-byte little-endian length followed by the encoded payload.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::messages::Frame;

/// Frames larger than this are rejected outright rather than allocating an
/// attacker- or bug-controlled buffer size.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    TooLarge(u32),

    #[error("malformed frame: {0}")]
    Decode(#[from] bincode::Error),

    #[error("connection closed")]
    Eof,
}

/// Read one length-prefixed `Frame`. Returns `Err(FramingError::Eof)` if the
/// peer closed the connection cleanly before any bytes of the next frame
/// arrived (a mid-frame close is `FramingError::Io`).
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, FramingError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(FramingError::Eof),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(FramingError::TooLarge(len));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;

    let frame = bincode::deserialize(&body)?;
    Ok(frame)
}

/// Encode and write one `Frame`, flushing afterward so writers sharing the
/// same transport never observe a half-written length prefix.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), FramingError> {
    let body = bincode::serialize(frame)?;
    if body.len() as u64 > MAX_FRAME_LEN as u64 {
        return Err(FramingError::TooLarge(body.len() as u32));
    }

    writer.write_all(&(body.len() as u32).to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Message;
    use std::io::Cursor;

    #[tokio::test]
    async fn round_trips_a_frame() {
        let frame = Frame::new(7, Message::Heartbeat);
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = read_frame(&mut cursor).await.unwrap();
        assert_eq!(decoded, frame);
    }

    #[tokio::test]
    async fn rejects_oversized_length_prefix() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_le_bytes());
        let mut cursor = Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, FramingError::TooLarge(_)));
    }

    #[tokio::test]
    async fn clean_eof_before_next_frame() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, FramingError::Eof));
    }
}
