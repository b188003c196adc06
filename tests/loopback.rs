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

//! End-to-end tests: two sessions joined by an in-memory duplex serial
//! pair, each driven from its own thread.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use serlink::{LinkConfig, LinkSession, Role, SerialPort};

// ============================================================================
// Channel-Backed Serial Pair
// ============================================================================

/// One end of a simulated full-duplex serial line.
struct ChannelSerialPort {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

/// Two connected serial endpoints; bytes written to one can be read from
/// the other.
fn serial_pair() -> (ChannelSerialPort, ChannelSerialPort) {
    let (tx0, rx0) = channel();
    let (tx1, rx1) = channel();
    (
        ChannelSerialPort { tx: tx0, rx: rx1 },
        ChannelSerialPort { tx: tx1, rx: rx0 },
    )
}

impl SerialPort for ChannelSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> serlink::Result<()> {
        // A serial line accepts writes even when nobody is listening.
        for &byte in buf {
            let _ = self.tx.send(byte);
        }
        Ok(())
    }

    fn read_byte(&mut self, timeout: Duration) -> serlink::Result<Option<u8>> {
        match self.rx.recv_timeout(timeout) {
            Ok(byte) => Ok(Some(byte)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            // A dropped peer looks like an idle line, not a broken one.
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

/// Wrapper that swallows selected `write_all` calls, simulating frames lost
/// on the line.
struct LossyPort {
    inner: ChannelSerialPort,
    drop_calls: Vec<usize>,
    call_count: usize,
}

impl SerialPort for LossyPort {
    fn write_all(&mut self, buf: &[u8]) -> serlink::Result<()> {
        self.call_count += 1;
        if self.drop_calls.contains(&self.call_count) {
            return Ok(());
        }
        self.inner.write_all(buf)
    }

    fn read_byte(&mut self, timeout: Duration) -> serlink::Result<Option<u8>> {
        self.inner.read_byte(timeout)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn test_config() -> LinkConfig {
    LinkConfig {
        max_payload_size: 512,
        read_timeout: Duration::from_millis(200),
        retransmit_interval: Duration::from_millis(500),
        max_retransmissions: 8,
    }
}

/// Run a responder on its own thread: open, read `frames` payloads, close.
fn spawn_responder(
    port: Box<dyn SerialPort>,
    frames: usize,
) -> thread::JoinHandle<Vec<Vec<u8>>> {
    thread::spawn(move || {
        let mut session =
            LinkSession::open(port, Role::Responder, test_config()).expect("responder open");
        let mut received = Vec::new();
        let mut buf = Vec::new();
        for _ in 0..frames {
            session.read(&mut buf).expect("responder read");
            received.push(buf.clone());
        }
        session.close().expect("responder close");
        received
    })
}

fn send_all(port: Box<dyn SerialPort>, payloads: &[&[u8]]) {
    let mut session =
        LinkSession::open(port, Role::Initiator, test_config()).expect("initiator open");
    for payload in payloads {
        session.write(payload).expect("initiator write");
    }
    session.close().expect("initiator close");
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_hello_end_to_end() {
    let (a, b) = serial_pair();
    let responder = spawn_responder(Box::new(b), 1);

    let payloads: [&[u8]; 1] = [b"HELLO"];
    send_all(Box::new(a), &payloads);

    let received = responder.join().unwrap();
    assert_eq!(received, vec![b"HELLO".to_vec()]);
}

#[test]
fn test_reserved_bytes_transmit_verbatim() {
    // Raw delimiter and escape values inside the payload.
    let payload = [0x7E, 0x7D, 0x41];

    let (a, b) = serial_pair();
    let responder = spawn_responder(Box::new(b), 1);

    let payloads: [&[u8]; 1] = [&payload];
    send_all(Box::new(a), &payloads);

    let received = responder.join().unwrap();
    assert_eq!(received, vec![payload.to_vec()]);
}

#[test]
fn test_liveness_across_payload_sizes() {
    // Empty, single-byte and maximum-size payloads all arrive intact.
    let max = test_config().max_payload_size;
    let big: Vec<u8> = (0..max).map(|i| (i % 256) as u8).collect();
    let payloads: [&[u8]; 3] = [b"", b"x", &big];

    let (a, b) = serial_pair();
    let responder = spawn_responder(Box::new(b), payloads.len());

    send_all(Box::new(a), &payloads);

    let received = responder.join().unwrap();
    assert_eq!(received.len(), 3);
    assert_eq!(received[0], b"");
    assert_eq!(received[1], b"x");
    assert_eq!(received[2], big);
}

#[test]
fn test_sequence_bits_alternate_across_frames() {
    let (a, b) = serial_pair();
    let responder = spawn_responder(Box::new(b), 3);

    let payloads: [&[u8]; 3] = [b"one", b"two", b"three"];
    send_all(Box::new(a), &payloads);

    let received = responder.join().unwrap();
    assert_eq!(
        received,
        vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
    );
}

#[test]
fn test_lost_data_frame_is_retransmitted() {
    let (a, b) = serial_pair();

    // Drop the initiator's second write: SET is call 1, the first data
    // frame is call 2. The retransmission timer must resend it and the
    // receiver must still be waiting when the resend arrives.
    let lossy = LossyPort {
        inner: a,
        drop_calls: vec![2],
        call_count: 0,
    };
    let responder = spawn_responder(Box::new(b), 1);

    let payloads: [&[u8]; 1] = [b"RESEND"];
    send_all(Box::new(lossy), &payloads);

    let received = responder.join().unwrap();
    assert_eq!(received, vec![b"RESEND".to_vec()]);
}

#[test]
fn test_lost_ack_does_not_duplicate_payload() {
    let (a, b) = serial_pair();

    // Drop the responder's second write: UA is call 1, the RR that
    // acknowledges the first data frame is call 2. The sender must
    // retransmit and the receiver must suppress the duplicate.
    let lossy = LossyPort {
        inner: b,
        drop_calls: vec![2],
        call_count: 0,
    };
    let responder = spawn_responder(Box::new(lossy), 2);

    let payloads: [&[u8]; 2] = [b"A", b"B"];
    send_all(Box::new(a), &payloads);

    let received = responder.join().unwrap();
    assert_eq!(received, vec![b"A".to_vec(), b"B".to_vec()]);
}
