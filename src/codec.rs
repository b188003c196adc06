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

//! Frame codec: serialization to the wire and the byte-driven receive
//! state machine.
//!
//! The receive side consumes one byte at a time, resynchronizing on the FLAG
//! delimiter. It only establishes frame *structure*; bcc1 is stored
//! unconditionally and validated afterwards by the frame validator, and bcc2
//! is checked by the session's receive loop.

use std::time::Duration;

use log::trace;

use crate::error::{LinkError, Result};
use crate::frame::{Control, Frame, FrameKind, Role, FLAG};
use crate::retransmit::{RetransmitTimer, TimerEvent};
use crate::serial::SerialPort;
use crate::stuffing::{destuff, stuff};

// ============================================================================
// Send Side
// ============================================================================

/// Serialize a frame to its on-wire byte sequence.
///
/// Command frames are exactly 5 bytes. Data frames append the byte-stuffed
/// payload, the byte-stuffed bcc2 (computed over the unstuffed payload) and
/// a closing FLAG.
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let mut bytes = vec![FLAG, frame.address, frame.control.byte(), frame.bcc1];

    match frame.kind() {
        FrameKind::Command => {
            bytes.push(FLAG);
        }
        FrameKind::Data => {
            bytes.extend_from_slice(&stuff(&frame.payload));
            bytes.extend_from_slice(&stuff(&[frame.bcc2]));
            bytes.push(FLAG);
        }
    }

    bytes
}

// ============================================================================
// Receive Side
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    AwaitStart,
    GotFlag,
    GotAddress,
    GotControl(Control),
    GotBcc1(Control),
}

/// Read one complete frame from the line.
///
/// Blocks byte-by-byte with the given inter-byte `timeout`, handing every
/// idle tick to `timer` so a pending retransmission can fire while we wait.
/// Aborts with [`LinkError::IncompleteFrame`] when the line stays idle with
/// no countdown armed, or when the countdown exhausts its retries. The two
/// cases are indistinguishable to the caller, mirroring a cancelled
/// blocking read. A data frame whose destuffed payload exceeds
/// `max_payload_size` is rejected with [`LinkError::FrameTooLarge`].
pub fn read_frame(
    port: &mut dyn SerialPort,
    timer: &mut RetransmitTimer,
    timeout: Duration,
    max_payload_size: usize,
) -> Result<Frame> {
    let mut state = ReadState::AwaitStart;
    let mut address = 0u8;
    let mut bcc1 = 0u8;
    // Raw (still stuffed) payload bytes of a data frame.
    let mut raw = Vec::new();

    // Worst case every payload byte and the bcc2 are escaped.
    let raw_limit = 2 * (max_payload_size + 1);

    loop {
        let byte = next_byte(port, timer, timeout)?;
        trace!("[codec] state {:?}, byte 0x{:02X}", state, byte);

        match state {
            ReadState::AwaitStart => {
                if byte == FLAG {
                    state = ReadState::GotFlag;
                }
            }
            ReadState::GotFlag => {
                if Role::from_address(byte).is_some() {
                    address = byte;
                    state = ReadState::GotAddress;
                } else if byte != FLAG {
                    state = ReadState::AwaitStart;
                }
            }
            ReadState::GotAddress => {
                if byte == FLAG {
                    state = ReadState::GotFlag;
                } else if let Some(ctrl) = Control::from_byte(byte) {
                    state = ReadState::GotControl(ctrl);
                } else {
                    state = ReadState::AwaitStart;
                }
            }
            ReadState::GotControl(control) => {
                // Stored unconditionally; the validator judges it later.
                bcc1 = byte;
                state = ReadState::GotBcc1(control);
            }
            ReadState::GotBcc1(control) => {
                if control.is_data() {
                    if byte == FLAG {
                        // Closing delimiter: split destuffed bytes into
                        // payload and trailing bcc2.
                        let mut payload = destuff(&raw);
                        match payload.pop() {
                            Some(bcc2) => {
                                if payload.len() > max_payload_size {
                                    return Err(LinkError::FrameTooLarge {
                                        got: payload.len(),
                                        max: max_payload_size,
                                    });
                                }
                                return Ok(Frame {
                                    address,
                                    control,
                                    bcc1,
                                    payload,
                                    bcc2,
                                });
                            }
                            None => {
                                // Data frame with no body at all; the FLAG we
                                // just saw may open the next frame.
                                raw.clear();
                                state = ReadState::GotFlag;
                            }
                        }
                    } else {
                        raw.push(byte);
                        if raw.len() > raw_limit {
                            return Err(LinkError::FrameTooLarge {
                                got: destuff(&raw).len(),
                                max: max_payload_size,
                            });
                        }
                    }
                } else if byte == FLAG {
                    return Ok(Frame {
                        address,
                        control,
                        bcc1,
                        payload: Vec::new(),
                        bcc2: 0,
                    });
                } else {
                    // A command frame must close immediately after bcc1.
                    state = ReadState::AwaitStart;
                }
            }
        }
    }
}

/// Read a single byte, running the retransmission countdown on idle ticks.
fn next_byte(
    port: &mut dyn SerialPort,
    timer: &mut RetransmitTimer,
    timeout: Duration,
) -> Result<u8> {
    loop {
        if let Some(byte) = port.read_byte(timeout)? {
            return Ok(byte);
        }

        if !timer.is_armed() {
            return Err(LinkError::IncompleteFrame);
        }

        if timer.poll(port)? == TimerEvent::Exhausted {
            return Err(LinkError::IncompleteFrame);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
