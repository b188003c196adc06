// Copyright (C) 2026 The serlink authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Error types for the serlink data-link layer.

use thiserror::Error;

/// Errors produced by the link layer and its collaborators.
///
/// `IncompleteFrame`, `HeaderChecksumInvalid` and `PayloadChecksumInvalid`
/// are recoverable and consumed inside the retry loops; the session only
/// surfaces them wrapped in a call-level failure (`ConnectTimeout`,
/// `SendFailed`, `ReceiveFailed`). Transport errors are fatal per call.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The serial device could not be opened or configured.
    #[error("serial line unavailable: {0}")]
    TransportUnavailable(String),

    /// A write to the serial line failed part-way.
    #[error("serial write failed: {0}")]
    TransportWriteError(#[from] std::io::Error),

    /// The line went idle (or the retransmission budget ran out) before a
    /// complete frame was received.
    #[error("incomplete frame: read timed out mid-frame")]
    IncompleteFrame,

    /// bcc1 did not match `address ^ control`.
    #[error("header checksum (bcc1) invalid")]
    HeaderChecksumInvalid,

    /// bcc2 did not match the XOR of the payload bytes.
    #[error("payload checksum (bcc2) invalid")]
    PayloadChecksumInvalid,

    /// A structurally valid frame carried a control byte that has no place
    /// in the current handshake step.
    #[error("unexpected control byte 0x{0:02X} in handshake")]
    UnexpectedControl(u8),

    /// The connect handshake exhausted its attempt budget.
    #[error("connect handshake failed after {0} attempts")]
    ConnectTimeout(u32),

    /// The disconnect handshake exhausted its attempt budget.
    #[error("disconnect handshake failed after {0} attempts")]
    DisconnectTimeout(u32),

    /// A data frame was never acknowledged within the retry budget.
    #[error("send failed: no acknowledgment after {0} attempts")]
    SendFailed(u32),

    /// No acceptable data frame arrived within the attempt budget.
    #[error("receive failed: no valid data frame after {0} attempts")]
    ReceiveFailed(u32),

    /// A payload exceeded the configured maximum frame size.
    #[error("frame too large: {got} bytes exceeds maximum of {max}")]
    FrameTooLarge { got: usize, max: usize },

    /// `RetransmitTimer::arm` was called while a frame was already armed.
    /// Stop-and-wait permits a single frame in flight; this is a bug in the
    /// caller, not a line condition.
    #[error("retransmission timer armed twice")]
    TimerAlreadyArmed,
}

pub type Result<T> = std::result::Result<T, LinkError>;
