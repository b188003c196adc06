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

//! Wire-level frame model and protocol constants.
//!
//! A command frame is exactly 5 bytes on the wire:
//!
//! ```plain
//! | FLAG | address | control | bcc1 | FLAG |
//! ```
//!
//! A data frame carries a byte-stuffed payload and payload checksum:
//!
//! ```plain
//! | FLAG | address | control | bcc1 | stuffed payload | stuffed bcc2 | FLAG |
//! ```
//!
//! `bcc1 = address ^ control`; `bcc2` is the XOR of all unstuffed payload
//! bytes (0 for an empty payload). These values must match bit-for-bit
//! across implementations to interoperate.

// ============================================================================
// Wire Constants
// ============================================================================

/// Frame delimiter.
pub const FLAG: u8 = 0x7E;

/// Escape byte for byte stuffing.
pub const ESC: u8 = 0x7D;

/// XOR mask applied to an escaped byte.
pub const ESC_XOR: u8 = 0x20;

/// Address byte of the connection initiator.
pub const ADDR_INITIATOR: u8 = 0x03;

/// Address byte of the connection responder.
pub const ADDR_RESPONDER: u8 = 0x01;

const CTRL_SET: u8 = 0x03;
const CTRL_UA: u8 = 0x07;
const CTRL_DISC: u8 = 0x0B;
const CTRL_RR: u8 = 0x05;
const CTRL_REJ: u8 = 0x01;

// ============================================================================
// Role
// ============================================================================

/// Which end of the link a session plays. Fixed at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// The address byte this role stamps on frames it originates.
    pub fn address(self) -> u8 {
        match self {
            Role::Initiator => ADDR_INITIATOR,
            Role::Responder => ADDR_RESPONDER,
        }
    }

    pub fn from_address(byte: u8) -> Option<Role> {
        match byte {
            ADDR_INITIATOR => Some(Role::Initiator),
            ADDR_RESPONDER => Some(Role::Responder),
            _ => None,
        }
    }
}

// ============================================================================
// Control Field
// ============================================================================

/// The control byte of a frame. `Rr`, `Rej` and `Data` carry the single-bit
/// alternating sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Connect request.
    Set,
    /// Connect/disconnect acknowledge.
    Ua,
    /// Disconnect request.
    Disc,
    /// Receiver ready, expecting sequence bit `n`.
    Rr(u8),
    /// Reject, expecting sequence bit `n`.
    Rej(u8),
    /// Payload frame carrying sequence bit `n`.
    Data(u8),
}

impl Control {
    pub fn byte(self) -> u8 {
        match self {
            Control::Set => CTRL_SET,
            Control::Ua => CTRL_UA,
            Control::Disc => CTRL_DISC,
            Control::Rr(n) => CTRL_RR | (n << 7),
            Control::Rej(n) => CTRL_REJ | (n << 7),
            Control::Data(n) => n << 5,
        }
    }

    /// Decode a control byte. Returns `None` for bytes that encode no
    /// recognized control value; the receive state machine restarts on those.
    pub fn from_byte(byte: u8) -> Option<Control> {
        match byte {
            CTRL_SET => Some(Control::Set),
            CTRL_UA => Some(Control::Ua),
            CTRL_DISC => Some(Control::Disc),
            b if b == CTRL_RR => Some(Control::Rr(0)),
            b if b == CTRL_RR | 0x80 => Some(Control::Rr(1)),
            b if b == CTRL_REJ => Some(Control::Rej(0)),
            b if b == CTRL_REJ | 0x80 => Some(Control::Rej(1)),
            0x00 => Some(Control::Data(0)),
            0x20 => Some(Control::Data(1)),
            _ => None,
        }
    }

    /// Whether frames with this control byte carry a payload.
    pub fn is_data(self) -> bool {
        matches!(self, Control::Data(_))
    }
}

// ============================================================================
// Frame
// ============================================================================

/// Frame classification derived from the control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Command,
    Data,
}

/// A decoded wire frame. `payload` and `bcc2` are only meaningful for data
/// frames; command frames leave them empty/zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: u8,
    pub control: Control,
    pub bcc1: u8,
    pub payload: Vec<u8>,
    pub bcc2: u8,
}

impl Frame {
    /// Build a command frame originated by `role`.
    pub fn command(role: Role, control: Control) -> Frame {
        let address = role.address();
        Frame {
            address,
            control,
            bcc1: address ^ control.byte(),
            payload: Vec::new(),
            bcc2: 0,
        }
    }

    /// Build a data frame carrying `payload` at sequence bit `sequence_bit`.
    pub fn data(role: Role, sequence_bit: u8, payload: Vec<u8>) -> Frame {
        let address = role.address();
        let control = Control::Data(sequence_bit);
        let bcc2 = xor_checksum(&payload);
        Frame {
            address,
            control,
            bcc1: address ^ control.byte(),
            payload,
            bcc2,
        }
    }

    pub fn kind(&self) -> FrameKind {
        if self.control.is_data() {
            FrameKind::Data
        } else {
            FrameKind::Command
        }
    }
}

/// XOR of all bytes; 0 for an empty slice. Used for both bcc1 and bcc2.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

// ============================================================================
// Tests
// ============================================================================
