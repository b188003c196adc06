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

//! Retransmission timer for the single in-flight frame.
//!
//! Stop-and-wait keeps exactly one unacknowledged frame outstanding, so one
//! timer per session suffices. The timer is not a separate thread: the
//! blocking byte read runs with the inter-byte timeout and calls [`poll`]
//! on every idle tick, so retransmission happens from inside the read loop.
//! When the retry budget runs out the timer reports [`TimerEvent::Exhausted`]
//! and the in-progress read aborts as if the line had gone idle.
//!
//! [`poll`]: RetransmitTimer::poll

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{LinkError, Result};
use crate::serial::SerialPort;

/// What the countdown did on an idle tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Nothing due; keep reading.
    Idle,
    /// The interval expired and the pending frame went out again.
    Resent,
    /// The retry budget is spent; the pending operation has failed and any
    /// blocked read must return promptly.
    Exhausted,
}

/// Countdown for the last unacknowledged frame.
///
/// Owned by the session; exists in the armed state only between "frame sent,
/// awaiting ack" and "ack received or retries exhausted".
pub struct RetransmitTimer {
    pending: Option<Vec<u8>>,
    retries_left: u32,
    interval: Duration,
    deadline: Instant,
    exhausted: bool,
}

impl RetransmitTimer {
    pub fn new() -> Self {
        RetransmitTimer {
            pending: None,
            retries_left: 0,
            interval: Duration::ZERO,
            deadline: Instant::now(),
            exhausted: false,
        }
    }

    /// Store `frame_bytes` as the one frame pending acknowledgment and start
    /// the countdown. The frame itself must already have been written once by
    /// the caller. Arming while armed is a programming error: it would mean
    /// two frames in flight.
    pub fn arm(&mut self, frame_bytes: Vec<u8>, retries: u32, interval: Duration) -> Result<()> {
        if self.pending.is_some() {
            return Err(LinkError::TimerAlreadyArmed);
        }

        self.pending = Some(frame_bytes);
        self.retries_left = retries;
        self.interval = interval;
        self.deadline = Instant::now() + interval;
        self.exhausted = false;
        Ok(())
    }

    /// Clear the pending frame and cancel the countdown. Call exactly once
    /// per confirmed frame, before arming the next one.
    pub fn acknowledge(&mut self) {
        self.pending = None;
        self.retries_left = 0;
        self.exhausted = false;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Run the countdown. Called whenever the blocking read observes an idle
    /// timeout. On expiry the pending frame is resent if retries remain;
    /// otherwise the operation is marked failed so the read can unblock.
    pub fn poll(&mut self, port: &mut dyn SerialPort) -> Result<TimerEvent> {
        let Some(frame_bytes) = &self.pending else {
            return Ok(TimerEvent::Idle);
        };

        if self.exhausted {
            return Ok(TimerEvent::Exhausted);
        }

        if Instant::now() < self.deadline {
            return Ok(TimerEvent::Idle);
        }

        if self.retries_left == 0 {
            warn!("[timer] retry budget spent, giving up on pending frame");
            self.exhausted = true;
            return Ok(TimerEvent::Exhausted);
        }

        self.retries_left -= 1;
        debug!(
            "[timer] interval expired, resending frame ({} retries left)",
            self.retries_left
        );
        port.write_all(frame_bytes)?;
        self.deadline = Instant::now() + self.interval;
        Ok(TimerEvent::Resent)
    }
}

impl Default for RetransmitTimer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::MockSerialPort;

    #[test]
    fn test_unarmed_poll_is_idle() {
        let mut port = MockSerialPort::new(vec![], vec![]);
        let mut timer = RetransmitTimer::new();
        assert_eq!(timer.poll(&mut port).unwrap(), TimerEvent::Idle);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_arm_twice_is_an_error() {
        let mut timer = RetransmitTimer::new();
        timer.arm(vec![0x7E], 3, Duration::from_secs(1)).unwrap();
        match timer.arm(vec![0x7E], 3, Duration::from_secs(1)) {
            Err(LinkError::TimerAlreadyArmed) => {}
            other => panic!("expected TimerAlreadyArmed, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_poll_before_deadline_is_idle() {
        let mut port = MockSerialPort::new(vec![], vec![]);
        let mut timer = RetransmitTimer::new();
        timer.arm(vec![0x01], 3, Duration::from_secs(60)).unwrap();
        assert_eq!(timer.poll(&mut port).unwrap(), TimerEvent::Idle);
    }

    #[test]
    fn test_expiry_resends_pending_frame() {
        let frame = vec![0x7E, 0x03, 0x03, 0x00, 0x7E];
        let mut port = MockSerialPort::new(vec![], [frame.clone(), frame.clone()].concat());
        let mut timer = RetransmitTimer::new();

        // Zero interval: every poll is past the deadline.
        timer.arm(frame, 2, Duration::ZERO).unwrap();
        assert_eq!(timer.poll(&mut port).unwrap(), TimerEvent::Resent);
        assert_eq!(timer.poll(&mut port).unwrap(), TimerEvent::Resent);
        assert_eq!(timer.poll(&mut port).unwrap(), TimerEvent::Exhausted);
        assert!(timer.is_exhausted());

        // Exhaustion is sticky until acknowledged.
        assert_eq!(timer.poll(&mut port).unwrap(), TimerEvent::Exhausted);
    }

    #[test]
    fn test_acknowledge_cancels_countdown() {
        let mut port = MockSerialPort::new(vec![], vec![]);
        let mut timer = RetransmitTimer::new();
        timer.arm(vec![0x01], 1, Duration::ZERO).unwrap();
        timer.acknowledge();

        assert!(!timer.is_armed());
        assert_eq!(timer.poll(&mut port).unwrap(), TimerEvent::Idle);

        // Re-arming after acknowledge is allowed.
        timer.arm(vec![0x02], 1, Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn test_zero_retries_exhausts_on_first_expiry() {
        let mut port = MockSerialPort::new(vec![], vec![]);
        let mut timer = RetransmitTimer::new();
        timer.arm(vec![0x01], 0, Duration::ZERO).unwrap();
        assert_eq!(timer.poll(&mut port).unwrap(), TimerEvent::Exhausted);
    }
}
