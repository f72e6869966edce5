// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The session state machine: `Handshake -> Active -> Draining -> Closed`.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the single `ClientAnnounce` frame; any other frame is
    /// rejected.
    Handshake,
    /// Normal operation: command dispatch, tunnels, UFS, heartbeats.
    Active,
    /// Tearing down: pending tunnels close before the session reaches
    /// `Closed`.
    Draining,
    Closed,
}

impl SessionState {
    fn to_u8(self) -> u8 {
        match self {
            SessionState::Handshake => 0,
            SessionState::Active => 1,
            SessionState::Draining => 2,
            SessionState::Closed => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionState::Handshake,
            1 => SessionState::Active,
            2 => SessionState::Draining,
            _ => SessionState::Closed,
        }
    }
}

/// An atomic cell holding the current state, shared read-only by every
/// session actor (reader, writer, evaluator) without a lock.
pub struct SessionStateCell(AtomicU8);

impl SessionStateCell {
    pub fn new(initial: SessionState) -> Self {
        Self(AtomicU8::new(initial.to_u8()))
    }

    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: SessionState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.get() == SessionState::Active
    }
}

impl Default for SessionStateCell {
    fn default() -> Self {
        Self::new(SessionState::Handshake)
    }
}
