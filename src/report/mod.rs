//! # Report Codec Module
//!
//! Bit-level decoding of input reports and encoding of output reports.
//!
//! This module handles:
//! - Report data types (`InputReport`, `OutputState`, `TriggerEffect`)
//! - Offset tables for USB, Bluetooth and packed report formats
//! - 12-bit touch axis packing
//! - Bluetooth CRC-32 sealing and checking

pub mod bits;
pub mod crc;
mod decoder;
mod encoder;
pub mod layout;
pub mod protocol;

use crate::error::{DecodeError, LayoutError};
use layout::{InputLayout, OutputLayout};
use protocol::{InputReport, OutputState};

/// Decoder/encoder pair bound to one validated pair of layouts
///
/// # Examples
///
/// ```
/// use dualsense_link::report::ReportCodec;
/// use dualsense_link::report::layout::{InputLayout, OutputLayout};
/// use dualsense_link::report::protocol::{Color, OutputState};
///
/// let codec = ReportCodec::new(InputLayout::usb(), OutputLayout::usb())?;
/// let state = OutputState { lightbar: Color::new(0, 0, 255), ..Default::default() };
/// let bytes = codec.encode(&state);
/// assert_eq!(bytes.len(), 48);
/// # Ok::<(), dualsense_link::error::LayoutError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReportCodec {
    input: InputLayout,
    output: OutputLayout,
}

impl ReportCodec {
    /// Build a codec after validating both layouts
    ///
    /// # Errors
    ///
    /// Returns the first `LayoutError` found in either table.
    pub fn new(input: InputLayout, output: OutputLayout) -> Result<Self, LayoutError> {
        input.validate()?;
        output.validate()?;
        Ok(Self { input, output })
    }

    pub fn input_layout(&self) -> &InputLayout {
        &self.input
    }

    pub fn output_layout(&self) -> &OutputLayout {
        &self.output
    }

    /// Format identifier a device must report to use this codec
    pub fn format_id(&self) -> &str {
        &self.input.format_id
    }

    /// Decode an input report
    pub fn decode(&self, bytes: &[u8]) -> Result<InputReport, DecodeError> {
        decoder::decode_input(&self.input, bytes)
    }

    /// Encode the full output state
    pub fn encode(&self, state: &OutputState) -> Vec<u8> {
        encoder::encode_output(&self.output, state)
    }

    /// Decode an output report produced by [`ReportCodec::encode`]
    pub fn decode_output(&self, bytes: &[u8]) -> Result<OutputState, DecodeError> {
        decoder::decode_output(&self.output, bytes)
    }

    /// Encode an input snapshot into a raw report
    pub fn encode_input(&self, report: &InputReport) -> Vec<u8> {
        encoder::encode_input(&self.input, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_rejects_invalid_layout() {
        let mut input = InputLayout::usb();
        input.report_size = 16;
        assert!(ReportCodec::new(input, OutputLayout::usb()).is_err());
    }

    #[test]
    fn test_codec_rejects_output_field_past_end() {
        let mut output = OutputLayout::usb();
        output.lightbar = output.report_size;
        assert!(matches!(
            ReportCodec::new(InputLayout::usb(), output),
            Err(LayoutError::FieldOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_codec_short_buffer_is_an_error() {
        let codec = ReportCodec::new(InputLayout::usb(), OutputLayout::usb()).unwrap();
        let size = codec.input_layout().report_size;
        assert_eq!(
            codec.decode(&[0u8; 8]),
            Err(DecodeError::WrongSize { expected: size, actual: 8 })
        );
        assert!(codec.decode_output(&[]).is_err());
    }

    #[test]
    fn test_codec_format_id() {
        let codec = ReportCodec::new(InputLayout::bluetooth(), OutputLayout::bluetooth()).unwrap();
        assert_eq!(codec.format_id(), "DS5B");
        assert_eq!(codec.output_layout().report_size, 74);
    }
}
