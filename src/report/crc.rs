//! # Bluetooth Report CRC
//!
//! Bluetooth DualSense reports end with a CRC-32 (IEEE, via `crc32fast`)
//! computed over a one-byte HID transaction header followed by the report.
//!
//! **Input seed**: 0xA1 (DATA | INPUT)
//! **Output seed**: 0xA2 (DATA | OUTPUT)

use crc32fast::Hasher;

/// Transaction header byte hashed ahead of input reports
pub const INPUT_CRC_SEED: u8 = 0xA1;

/// Transaction header byte hashed ahead of output reports
pub const OUTPUT_CRC_SEED: u8 = 0xA2;

/// Trailing CRC length in bytes
pub const CRC_LEN: usize = 4;

/// Calculate the report CRC
///
/// # Arguments
///
/// * `seed` - Transaction header byte
/// * `data` - Report bytes, without the trailing CRC
pub fn report_crc(seed: u8, data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[seed]);
    hasher.update(data);
    hasher.finalize()
}

/// Append the little-endian CRC to an output report
pub fn seal_output(report: &mut Vec<u8>) {
    let crc = report_crc(OUTPUT_CRC_SEED, report);
    report.extend_from_slice(&crc.to_le_bytes());
}

/// Check the trailing CRC of a Bluetooth input report
///
/// Returns `false` for buffers too short to carry a CRC.
pub fn verify_input(report: &[u8]) -> bool {
    if report.len() <= CRC_LEN {
        return false;
    }
    let (data, tail) = report.split_at(report.len() - CRC_LEN);
    let expected = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    report_crc(INPUT_CRC_SEED, data) == expected
}
