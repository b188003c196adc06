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

//! Byte stuffing and destuffing.
//!
//! The two reserved bytes ([`FLAG`] and [`ESC`]) must never appear literally
//! inside frame contents, or the receiver would mistake them for a frame
//! boundary. Each occurrence is replaced by `ESC, byte ^ ESC_XOR`.

use crate::frame::{ESC, ESC_XOR, FLAG};

/// Escape every reserved byte in `src`. Output length is between `len` and
/// `2 * len`, equal to `len` iff `src` contains no reserved bytes.
pub fn stuff(src: &[u8]) -> Vec<u8> {
    let mut dst = Vec::with_capacity(src.len());
    for &byte in src {
        if byte == FLAG || byte == ESC {
            dst.push(ESC);
            dst.push(byte ^ ESC_XOR);
        } else {
            dst.push(byte);
        }
    }
    dst
}

/// Inverse of [`stuff`]: on ESC, consume the following byte and XOR the mask
/// back; any other byte passes through unchanged. A trailing ESC with no
/// following byte is dropped (the frame it came from is already truncated).
pub fn destuff(src: &[u8]) -> Vec<u8> {
    let mut dst = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if src[i] == ESC {
            if i + 1 < src.len() {
                dst.push(src[i + 1] ^ ESC_XOR);
            }
            i += 2;
        } else {
            dst.push(src[i]);
            i += 1;
        }
    }
    dst
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_plain() {
        let data = b"the quick brown fox".to_vec();
        assert_eq!(destuff(&stuff(&data)), data);
    }

    #[test]
    fn test_roundtrip_empty() {
        assert_eq!(stuff(&[]), Vec::<u8>::new());
        assert_eq!(destuff(&[]), Vec::<u8>::new());
    }

    #[test]
    fn test_roundtrip_reserved_only() {
        let data = vec![FLAG, ESC, FLAG, FLAG, ESC, ESC];
        let stuffed = stuff(&data);
        assert_eq!(stuffed.len(), 2 * data.len());
        assert_eq!(destuff(&stuffed), data);
    }

    #[test]
    fn test_roundtrip_all_byte_values() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(destuff(&stuff(&data)), data);
    }

    #[test]
    fn test_stuffed_output_contains_no_flag() {
        let data: Vec<u8> = (0..=255).collect();
        assert!(!stuff(&data).iter().any(|&b| b == FLAG));
    }

    #[test]
    fn test_length_bounds() {
        for data in [
            Vec::new(),
            vec![0x41, 0x42],
            vec![FLAG; 7],
            vec![0x00, ESC, 0xFF, FLAG],
        ] {
            let stuffed = stuff(&data);
            assert!(stuffed.len() >= data.len());
            assert!(stuffed.len() <= 2 * data.len());
            let reserved = data.iter().filter(|&&b| b == FLAG || b == ESC).count();
            assert_eq!(stuffed.len() == data.len(), reserved == 0);
        }
    }

    #[test]
    fn test_escape_encoding() {
        assert_eq!(stuff(&[FLAG]), vec![ESC, FLAG ^ ESC_XOR]);
        assert_eq!(stuff(&[ESC]), vec![ESC, ESC ^ ESC_XOR]);
    }

    #[test]
    fn test_destuff_truncated_escape() {
        // Truncated input ending in a lone ESC; the dangling escape is dropped.
        assert_eq!(destuff(&[0x41, ESC]), vec![0x41]);
    }
}
