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

//! Structural sanity checks applied to every received frame before the
//! session logic trusts it.

use crate::frame::Frame;

/// Whether a received frame is structurally sound.
///
/// Command frames are valid iff `bcc1 == address ^ control`. Data frames
/// only need the same header integrity here; payload correctness is
/// established by the bcc2 comparison in the session's receive loop, not
/// by the validator.
pub fn validate(frame: &Frame) -> bool {
    frame.bcc1 == frame.address ^ frame.control.byte()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Control, Role};

    const COMMANDS: [Control; 7] = [
        Control::Set,
        Control::Ua,
        Control::Disc,
        Control::Rr(0),
        Control::Rr(1),
        Control::Rej(0),
        Control::Rej(1),
    ];

    #[test]
    fn test_all_command_frames_validate() {
        for role in [Role::Initiator, Role::Responder] {
            for ctrl in COMMANDS {
                let frame = Frame::command(role, ctrl);
                assert!(validate(&frame), "{:?}/{:?}", role, ctrl);
            }
        }
    }

    #[test]
    fn test_every_single_bit_flip_of_bcc1_is_invalid() {
        for role in [Role::Initiator, Role::Responder] {
            for ctrl in COMMANDS {
                for bit in 0..8 {
                    let mut frame = Frame::command(role, ctrl);
                    frame.bcc1 ^= 1 << bit;
                    assert!(!validate(&frame), "{:?}/{:?} bit {}", role, ctrl, bit);
                }
            }
        }
    }

    #[test]
    fn test_data_frame_header_integrity() {
        let mut frame = Frame::data(Role::Initiator, 0, vec![1, 2, 3]);
        assert!(validate(&frame));
        frame.bcc1 ^= 0x10;
        assert!(!validate(&frame));
    }

    #[test]
    fn test_data_frame_ignores_payload_content() {
        // A data frame with a wrong bcc2 still passes structural validation;
        // the receive loop is responsible for the payload checksum.
        let mut frame = Frame::data(Role::Initiator, 1, vec![1, 2, 3]);
        frame.bcc2 ^= 0xFF;
        assert!(validate(&frame));
    }
}
