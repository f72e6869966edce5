// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Wire protocol between an in-guest agent and its host's CC server: a
//! length-prefixed stream of self-describing `Frame`s.

pub mod framing;
pub mod messages;

pub use framing::{read_frame, write_frame, FramingError, MAX_FRAME_LEN};
pub use messages::{Frame, Message, StreamId};
