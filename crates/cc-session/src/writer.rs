// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The writer actor: the session's single-writer output stream. Every other
//! actor reaches the transport only by sending a `Message` on the shared
//! outbound channel this task drains.

use std::sync::atomic::{AtomicU64, Ordering};

use cc_proto::{write_frame, Frame, Message};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

/// Drain `outbound` and write each message as a framed record until the
/// channel closes or a write fails.
pub async fn run<W: AsyncWrite + Unpin>(mut transport: W, mut outbound: mpsc::Receiver<Message>) {
    let record_id = AtomicU64::new(1);
    while let Some(message) = outbound.recv().await {
        let frame = Frame::new(record_id.fetch_add(1, Ordering::Relaxed), message);
        if let Err(error) = write_frame(&mut transport, &frame).await {
            tracing::warn!(%error, "session writer failed, closing");
            break;
        }
    }
}
