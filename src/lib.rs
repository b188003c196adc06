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

//! serlink: a reliable byte-stream data-link layer over an asynchronous
//! serial line.
//!
//! Stop-and-wait ARQ framing modeled on HDLC: connection establishment,
//! sequenced data transfer with byte-stuffed framing and dual XOR checksums,
//! timeout-driven retransmission, graceful teardown. One frame in flight;
//! recovery from bit errors, lost frames, duplicates and truncated reads is
//! deterministic and driven by a single session-owned retransmission timer.
//!
//! The public surface is the [`LinkSession`]: open it on a serial line in
//! either role, exchange single-frame payloads with
//! [`write`](LinkSession::write) / [`read`](LinkSession::read), and
//! [`close`](LinkSession::close) it. Application-level concerns (file
//! metadata, chunking of large payloads) belong to the caller.

pub mod codec;
pub mod error;
pub mod frame;
pub mod link;
pub mod retransmit;
pub mod serial;
pub mod stuffing;
pub mod validator;

pub use error::{LinkError, Result};
pub use frame::{Control, Frame, FrameKind, Role};
pub use link::{LinkConfig, LinkSession};
pub use serial::{RealSerialPort, SerialPort};
