//! # Bit Packing Helpers
//!
//! Little-endian field access and the 12-bit touch axis packing.
//!
//! A touch point stores two 12-bit axes in three bytes:
//!
//! ```text
//! Byte N:   X[0:7]
//! Byte N+1: Y[0:3] << 4 | X[8:11]
//! Byte N+2: Y[4:11]
//! ```
//!
//! X starts at bit 0 of byte N, Y starts at bit 4 of byte N+1. Writes use
//! read-modify-write so the nibble belonging to the other axis survives.

/// Largest value a 12-bit axis can hold
pub const U12_MAX: u16 = 0x0FFF;

/// Bit alignment of a 12-bit field inside its first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nibble {
    /// Field starts at bit 0: low 12 bits of the LE pair (N, N+1)
    Low,
    /// Field starts at bit 4: high nibble of N plus all of N+1
    High,
}

/// Read a 12-bit field at `offset`
///
/// Caller guarantees `offset + 1 < buf.len()`.
pub fn read_u12(buf: &[u8], offset: usize, nibble: Nibble) -> u16 {
    let lo = buf[offset] as u16;
    let hi = buf[offset + 1] as u16;
    match nibble {
        Nibble::Low => (lo | (hi << 8)) & U12_MAX,
        Nibble::High => ((lo >> 4) | (hi << 4)) & U12_MAX,
    }
}

/// Write a 12-bit field at `offset`, preserving the neighbouring nibble
///
/// Values above [`U12_MAX`] are truncated to 12 bits.
pub fn write_u12(buf: &mut [u8], offset: usize, nibble: Nibble, value: u16) {
    let value = value & U12_MAX;
    match nibble {
        Nibble::Low => {
            buf[offset] = (value & 0xFF) as u8;
            buf[offset + 1] = (buf[offset + 1] & 0xF0) | ((value >> 8) as u8 & 0x0F);
        }
        Nibble::High => {
            buf[offset] = (buf[offset] & 0x0F) | (((value & 0x0F) as u8) << 4);
            buf[offset + 1] = (value >> 4) as u8;
        }
    }
}

pub fn read_i16_le(buf: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub fn write_i16_le(buf: &mut [u8], offset: usize, value: i16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

pub fn write_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Read an unsigned little-endian integer of 1 to 4 bytes
pub fn read_uint_le(buf: &[u8], offset: usize, width: usize) -> u32 {
    buf[offset..offset + width]
        .iter()
        .rev()
        .fold(0u32, |acc, &byte| (acc << 8) | byte as u32)
}

/// Write the low `width` bytes of `value` little-endian
pub fn write_uint_le(buf: &mut [u8], offset: usize, width: usize, value: u32) {
    let bytes = value.to_le_bytes();
    buf[offset..offset + width].copy_from_slice(&bytes[..width]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u12_zero_and_max() {
        let mut buf = [0u8; 3];
        write_u12(&mut buf, 0, Nibble::Low, 0);
        write_u12(&mut buf, 1, Nibble::High, 0);
        assert_eq!(read_u12(&buf, 0, Nibble::Low), 0);
        assert_eq!(read_u12(&buf, 1, Nibble::High), 0);

        write_u12(&mut buf, 0, Nibble::Low, U12_MAX);
        write_u12(&mut buf, 1, Nibble::High, U12_MAX);
        assert_eq!(buf, [0xFF, 0xFF, 0xFF]);
        assert_eq!(read_u12(&buf, 0, Nibble::Low), U12_MAX);
        assert_eq!(read_u12(&buf, 1, Nibble::High), U12_MAX);
    }

    #[test]
    fn test_u12_writes_preserve_other_axis() {
        let mut buf = [0u8; 3];
        write_u12(&mut buf, 0, Nibble::Low, 0xABC);
        write_u12(&mut buf, 1, Nibble::High, 0x123);
        assert_eq!(buf, [0xBC, 0x3A, 0x12]);

        // Rewriting X must not disturb Y's low nibble and vice versa
        write_u12(&mut buf, 0, Nibble::Low, 0x456);
        assert_eq!(read_u12(&buf, 1, Nibble::High), 0x123);
        write_u12(&mut buf, 1, Nibble::High, 0xFED);
        assert_eq!(read_u12(&buf, 0, Nibble::Low), 0x456);
    }

    #[test]
    fn test_u12_truncates_wide_values() {
        let mut buf = [0u8; 2];
        write_u12(&mut buf, 0, Nibble::Low, 0xF123);
        assert_eq!(read_u12(&buf, 0, Nibble::Low), 0x123);
        assert_eq!(buf[1] & 0xF0, 0);
    }

    #[test]
    fn test_uint_le_widths() {
        let mut buf = [0u8; 6];
        write_uint_le(&mut buf, 1, 3, 0x0007_A5C3);
        assert_eq!(&buf[1..4], &[0xC3, 0xA5, 0x07]);
        assert_eq!(read_uint_le(&buf, 1, 3), 0x0007_A5C3);
        assert_eq!(buf[4], 0);
    }

    #[test]
    fn test_signed_and_u32_le() {
        let mut buf = [0u8; 8];
        write_i16_le(&mut buf, 0, -2);
        write_u32_le(&mut buf, 2, 0xDEAD_BEEF);
        assert_eq!(read_i16_le(&buf, 0), -2);
        assert_eq!(read_u32_le(&buf, 2), 0xDEAD_BEEF);
        assert_eq!(&buf[2..6], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }
}
