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

//! Link session: the stop-and-wait ARQ core.
//!
//! A session is created open (the constructor runs the connect handshake for
//! its role) and consumed by [`close`](LinkSession::close), which runs the
//! disconnect handshake. Ownership encodes the lifecycle: there is no way to
//! write or read on a session that is not open, and no two operations can
//! run concurrently on the same session.

use std::time::Duration;

use log::{debug, warn};

use crate::codec::{encode_frame, read_frame};
use crate::error::{LinkError, Result};
use crate::frame::{xor_checksum, Control, Frame, FrameKind, Role};
use crate::retransmit::RetransmitTimer;
use crate::serial::{RealSerialPort, SerialPort};
use crate::validator::validate;

// ============================================================================
// Configuration
// ============================================================================

/// Link-layer tuning, fixed at session creation.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Largest payload accepted per data frame.
    pub max_payload_size: usize,
    /// Inter-byte read timeout; also the granularity at which the
    /// retransmission countdown is polled.
    pub read_timeout: Duration,
    /// Delay before an unacknowledged frame is resent.
    pub retransmit_interval: Duration,
    /// Total transmissions of a frame before giving up (first send
    /// included). Also scales the receive-side attempt loops. Values of 0
    /// are treated as 1 when the session is opened.
    pub max_retransmissions: u32,
}

impl LinkConfig {
    /// Idle-tick budget for the receive loops.
    ///
    /// One attempt is consumed per `read_timeout` tick with nothing on the
    /// line, so the budget must span the peer's whole retransmission
    /// schedule: `max_retransmissions` intervals, each worth
    /// `ceil(retransmit_interval / read_timeout)` ticks. A receiver is
    /// otherwise liable to give up before the sender's first resend.
    fn receive_attempts(&self) -> u32 {
        let timeout = self.read_timeout.as_millis().max(1);
        let ticks_per_interval = self.retransmit_interval.as_millis().div_ceil(timeout).max(1);
        let ticks = u32::try_from(ticks_per_interval).unwrap_or(u32::MAX);
        self.max_retransmissions.saturating_mul(ticks)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            max_payload_size: 1024,
            read_timeout: Duration::from_millis(500),
            retransmit_interval: Duration::from_secs(3),
            max_retransmissions: 3,
        }
    }
}

// ============================================================================
// Link Session
// ============================================================================

/// One open connection over a serial line. Created by [`open`](Self::open)
/// (which performs the connect handshake), torn down by
/// [`close`](Self::close).
pub struct LinkSession {
    role: Role,
    port: Box<dyn SerialPort>,
    config: LinkConfig,
    timer: RetransmitTimer,
    sequence_bit: u8,
}

impl LinkSession {
    /// Establish a connection over an already-open transport.
    ///
    /// The initiator sends SET under the retransmission timer and waits for
    /// UA; the responder waits (bounded attempts) for a valid SET and
    /// replies UA once, relying on the initiator's timer for recovery.
    pub fn open(
        port: Box<dyn SerialPort>,
        role: Role,
        mut config: LinkConfig,
    ) -> Result<LinkSession> {
        // Every frame is transmitted at least once.
        config.max_retransmissions = config.max_retransmissions.max(1);

        let mut session = LinkSession {
            role,
            port,
            config,
            timer: RetransmitTimer::new(),
            sequence_bit: 0,
        };

        match role {
            Role::Initiator => session.connect_initiator()?,
            Role::Responder => session.connect_responder()?,
        }

        debug!("[link] {:?} connected", role);
        Ok(session)
    }

    /// Open the serial device at `path` and establish a connection over it.
    pub fn open_device(
        path: &str,
        baud_rate: u32,
        role: Role,
        config: LinkConfig,
    ) -> Result<LinkSession> {
        let port = RealSerialPort::open(path, baud_rate, config.read_timeout)?;
        Self::open(Box::new(port), role, config)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Send one frame's worth of payload and wait for its acknowledgment.
    ///
    /// Callers chunk larger payloads themselves; this layer carries one
    /// frame per call. Returns [`LinkError::SendFailed`] once the
    /// retransmission budget is spent without a matching RR.
    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(LinkError::FrameTooLarge {
                got: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        let frame = Frame::data(self.role, self.sequence_bit, payload.to_vec());
        self.send_armed(&frame)?;

        // Acknowledgment of *this* frame names the next expected bit.
        let expected = Control::Rr(self.sequence_bit ^ 1);

        loop {
            let answer = match self.receive_checked() {
                Ok(frame) => frame,
                Err(LinkError::HeaderChecksumInvalid) => {
                    warn!("[link] discarding malformed answer while awaiting ack");
                    continue;
                }
                Err(LinkError::IncompleteFrame) => {
                    self.timer.acknowledge();
                    return Err(LinkError::SendFailed(self.config.max_retransmissions));
                }
                Err(e) => {
                    self.timer.acknowledge();
                    return Err(e);
                }
            };

            if answer.kind() != FrameKind::Command {
                debug!("[link] ignoring data frame while awaiting ack");
                continue;
            }
            if answer.control != expected {
                debug!(
                    "[link] ignoring {:?} while awaiting {:?}",
                    answer.control, expected
                );
                continue;
            }

            self.timer.acknowledge();
            self.sequence_bit ^= 1;
            debug!("[link] frame acknowledged, sequence bit now {}", self.sequence_bit);
            return Ok(());
        }
    }

    /// Receive one frame's worth of payload into `out`, replacing its
    /// contents. Returns the payload length.
    ///
    /// Duplicates of the last acknowledged frame are re-acknowledged and
    /// suppressed; corrupted fresh frames are rejected with REJ so the
    /// sender retransmits promptly.
    pub fn read(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let budget = self.config.receive_attempts();
        let mut attempts = budget;

        while attempts > 0 {
            attempts -= 1;

            let frame = match self.receive_checked() {
                Ok(frame) => frame,
                Err(LinkError::IncompleteFrame) => continue,
                Err(LinkError::HeaderChecksumInvalid) => {
                    warn!("[link] discarding frame with bad header checksum");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let Control::Data(bit) = frame.control else {
                debug!("[link] ignoring {:?} while awaiting data", frame.control);
                continue;
            };

            if let Err(e) = payload_intact(&frame) {
                if bit == self.sequence_bit {
                    // Fresh frame corrupted in transit: ask for a resend.
                    warn!("[link] {}, sending REJ{}", e, bit);
                    self.send_command(Control::Rej(self.sequence_bit))?;
                } else {
                    // Duplicate of a frame we already acknowledged; the ack
                    // must have been lost. Acknowledge it again.
                    debug!("[link] corrupt duplicate, re-acknowledging RR{}", self.sequence_bit);
                    self.send_command(Control::Rr(self.sequence_bit))?;
                }
                continue;
            }

            if bit != self.sequence_bit {
                debug!("[link] duplicate frame (bit {}), re-acknowledging", bit);
                self.send_command(Control::Rr(self.sequence_bit))?;
                continue;
            }

            self.sequence_bit ^= 1;
            self.send_command(Control::Rr(self.sequence_bit))?;
            out.clear();
            out.extend_from_slice(&frame.payload);
            debug!("[link] accepted {} byte frame, sequence bit now {}", frame.payload.len(), self.sequence_bit);
            return Ok(frame.payload.len());
        }

        Err(LinkError::ReceiveFailed(budget))
    }

    /// Tear the connection down and release the transport.
    ///
    /// The initiator sends DISC under the timer, waits for the echoed DISC
    /// and answers with a final UA; the responder waits for DISC and echoes
    /// it without a timer of its own.
    pub fn close(mut self) -> Result<()> {
        match self.role {
            Role::Initiator => self.disconnect_initiator()?,
            Role::Responder => self.disconnect_responder()?,
        }

        debug!("[link] {:?} disconnected", self.role);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Handshakes
    // ------------------------------------------------------------------------

    fn connect_initiator(&mut self) -> Result<()> {
        let set = Frame::command(self.role, Control::Set);
        self.send_armed(&set)?;

        loop {
            let answer = match self.receive_checked() {
                Ok(frame) => frame,
                Err(LinkError::HeaderChecksumInvalid) => {
                    warn!("[link] discarding malformed frame while awaiting UA");
                    continue;
                }
                Err(LinkError::IncompleteFrame) => {
                    self.timer.acknowledge();
                    return Err(LinkError::ConnectTimeout(self.config.max_retransmissions));
                }
                Err(e) => {
                    self.timer.acknowledge();
                    return Err(e);
                }
            };

            self.timer.acknowledge();
            return match answer.control {
                Control::Ua => Ok(()),
                other => Err(LinkError::UnexpectedControl(other.byte())),
            };
        }
    }

    fn connect_responder(&mut self) -> Result<()> {
        let budget = self.config.receive_attempts();
        let mut attempts = budget;

        while attempts > 0 {
            attempts -= 1;

            match self.receive_checked() {
                Ok(frame) if frame.control == Control::Set => {
                    self.send_command(Control::Ua)?;
                    return Ok(());
                }
                Ok(frame) => {
                    warn!("[link] ignoring {:?} while awaiting SET", frame.control);
                }
                Err(LinkError::IncompleteFrame | LinkError::HeaderChecksumInvalid) => {}
                Err(e) => return Err(e),
            }
        }

        Err(LinkError::ConnectTimeout(budget))
    }

    fn disconnect_initiator(&mut self) -> Result<()> {
        let disc = Frame::command(self.role, Control::Disc);
        self.send_armed(&disc)?;

        loop {
            let answer = match self.receive_checked() {
                Ok(frame) => frame,
                Err(LinkError::HeaderChecksumInvalid) => {
                    warn!("[link] discarding malformed frame while awaiting DISC");
                    continue;
                }
                Err(LinkError::IncompleteFrame) => {
                    self.timer.acknowledge();
                    return Err(LinkError::DisconnectTimeout(self.config.max_retransmissions));
                }
                Err(e) => {
                    self.timer.acknowledge();
                    return Err(e);
                }
            };

            self.timer.acknowledge();
            return match answer.control {
                Control::Disc => {
                    self.send_command(Control::Ua)?;
                    Ok(())
                }
                other => Err(LinkError::UnexpectedControl(other.byte())),
            };
        }
    }

    fn disconnect_responder(&mut self) -> Result<()> {
        let budget = self.config.receive_attempts();
        let mut attempts = budget;

        while attempts > 0 {
            attempts -= 1;

            match self.receive_checked() {
                Ok(frame) if frame.control == Control::Disc => {
                    // The teardown echoes DISC rather than answering UA; the
                    // initiator's final UA is not awaited.
                    self.send_command(Control::Disc)?;
                    return Ok(());
                }
                Ok(frame) => {
                    warn!("[link] ignoring {:?} while awaiting DISC", frame.control);
                }
                Err(LinkError::IncompleteFrame | LinkError::HeaderChecksumInvalid) => {}
                Err(e) => return Err(e),
            }
        }

        Err(LinkError::DisconnectTimeout(budget))
    }

    // ------------------------------------------------------------------------
    // Frame plumbing
    // ------------------------------------------------------------------------

    /// Write a frame and arm its retransmission countdown. The frame counts
    /// as the first of `max_retransmissions` transmissions.
    fn send_armed(&mut self, frame: &Frame) -> Result<()> {
        let bytes = encode_frame(frame);
        self.port.write_all(&bytes)?;
        let retries = self.config.max_retransmissions.saturating_sub(1);
        self.timer
            .arm(bytes, retries, self.config.retransmit_interval)
    }

    /// Write a command frame with no retransmission countdown.
    fn send_command(&mut self, control: Control) -> Result<()> {
        let frame = Frame::command(self.role, control);
        self.port.write_all(&encode_frame(&frame))
    }

    fn receive(&mut self) -> Result<Frame> {
        read_frame(
            self.port.as_mut(),
            &mut self.timer,
            self.config.read_timeout,
            self.config.max_payload_size,
        )
    }

    /// Read one frame and reject it if the header checksum does not hold.
    fn receive_checked(&mut self) -> Result<Frame> {
        let frame = self.receive()?;
        if !validate(&frame) {
            return Err(LinkError::HeaderChecksumInvalid);
        }
        Ok(frame)
    }
}

/// Check a data frame's payload against its bcc2.
fn payload_intact(frame: &Frame) -> Result<()> {
    if frame.bcc2 != xor_checksum(&frame.payload) {
        return Err(LinkError::PayloadChecksumInvalid);
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
