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

//! Serial line adapter: the physical transport underneath the link layer.

use std::time::Duration;

use serialport::SerialPort as SerialPortTrait;

use crate::error::{LinkError, Result};

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Byte-level transport operations needed by the link layer.
///
/// An idle line is not an error: `read_byte` distinguishes "no byte arrived
/// within the timeout" (`Ok(None)`) from a broken transport (`Err`). The
/// retransmission timer relies on those idle ticks to run its countdown.
pub trait SerialPort: Send {
    /// Block until `buf` is fully written.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    /// Block until one byte arrives or the line has been idle for `timeout`.
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Real serial port backed by the serialport crate.
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialPort {
    pub fn open(port_name: &str, baud_rate: u32, inter_byte_timeout: Duration) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(inter_byte_timeout)
            .open()
            .map_err(|e| LinkError::TransportUnavailable(e.to_string()))?;

        Ok(RealSerialPort { port })
    }
}

impl SerialPort for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| LinkError::TransportUnavailable(e.to_string()))?;

        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(LinkError::TransportUnavailable(e.to_string())),
        }
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

#[cfg(test)]
pub struct MockSerialPort {
    // Data to return on reads (None = idle timeout)
    read_buffer: Vec<Option<u8>>,
    read_pos: usize,
    // Track what was written
    write_log: Vec<u8>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(responses: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_buffer: responses,
            read_pos: 0,
            write_log: Vec::new(),
            expected_writes,
        }
    }

    /// Script a sequence of raw bytes to be read back-to-back.
    pub fn script(bytes: &[u8]) -> Vec<Option<u8>> {
        bytes.iter().map(|&b| Some(b)).collect()
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.write_log.extend_from_slice(buf);
        Ok(())
    }

    fn read_byte(&mut self, _timeout: Duration) -> Result<Option<u8>> {
        // Out of responses = idle line
        if self.read_pos >= self.read_buffer.len() {
            return Ok(None);
        }

        let response = self.read_buffer[self.read_pos];
        self.read_pos += 1;
        Ok(response)
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_buffer.len(),
            "MockSerialPort dropped with {} unconsumed responses (read {} of {})",
            self.read_buffer.len() - self.read_pos,
            self.read_pos,
            self.read_buffer.len()
        );

        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "MockSerialPort write log mismatch!\nExpected {} bytes:\n{:02X?}\nGot {} bytes:\n{:02X?}",
            self.expected_writes.len(),
            self.expected_writes,
            self.write_log.len(),
            self.write_log
        );
    }
}
