//! # Report Layouts
//!
//! Byte offset tables for input and output reports.
//!
//! Published descriptions of the DualSense reports disagree with each other,
//! so offsets are data rather than code. A layout is loaded from a preset or
//! from configuration, validated once, and then drives the decoder and the
//! encoder. Captured hardware reports (see [`crate::capture`]) are the way to
//! check a table against a real device.
//!
//! Validation rejects tables where a field runs past the report or where two
//! fields claim the same byte.

use serde::{Deserialize, Serialize};

use super::protocol::{
    BT_INPUT_REPORT_ID, BT_OUTPUT_REPORT_ID, TRIGGER_EFFECT_BYTES, USB_INPUT_REPORT_ID,
    USB_OUTPUT_REPORT_ID, VALID_FLAG0, VALID_FLAG1,
};
use crate::error::LayoutError;

/// Largest report any layout may describe
pub const MAX_REPORT_SIZE: usize = 1024;

/// Touch point without the pressure/id byte
pub const TOUCH_POINT_BYTES: usize = 4;

/// Touch point with the pressure/id byte
pub const TOUCH_POINT_BYTES_AUX: usize = 5;

/// A byte with a constant value (report ID, flags, tags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedByte {
    pub offset: usize,
    pub value: u8,
}

/// How stick axes are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickEncoding {
    /// Two's complement, centre 0
    Signed,
    /// Unsigned, centre 128
    Offset,
}

/// How the d-pad is stored in the low nibble of the button field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DpadEncoding {
    /// Hat switch value, 0 = up clockwise to 7, 8 = neutral
    Hat,
    /// Four independent direction bits
    Bits,
}

/// Byte offsets of every field in an input report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLayout {
    /// Format identifier the transport must report for this layout
    pub format_id: String,
    pub report_size: usize,
    #[serde(default)]
    pub fixed: Vec<FixedByte>,
    pub left_stick: usize,
    pub right_stick: usize,
    pub stick_encoding: StickEncoding,
    pub left_trigger: usize,
    pub right_trigger: usize,
    pub buttons: usize,
    pub button_bytes: usize,
    pub dpad: DpadEncoding,
    pub gyroscope: usize,
    pub accelerometer: usize,
    pub timestamp: usize,
    /// Absent when the device sends no delta; the session derives it
    #[serde(default)]
    pub delta_time: Option<usize>,
    pub touch: [usize; 2],
    pub touch_point_bytes: usize,
    /// Status byte: low nibble level, bit 4 charging, bit 5 full
    pub battery: usize,
    /// Optional 0-100 level byte superseding the status nibble
    #[serde(default)]
    pub battery_level: Option<usize>,
    pub headphone: usize,
    pub left_trigger_feedback: usize,
    pub right_trigger_feedback: usize,
}

/// Byte offsets of every field in an output report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    pub report_size: usize,
    #[serde(default)]
    pub fixed: Vec<FixedByte>,
    pub right_rumble: usize,
    pub left_rumble: usize,
    pub rumble_strength: usize,
    pub mic_led: usize,
    pub disable_leds: usize,
    pub player_led_fade: usize,
    pub player_led_brightness: usize,
    pub player_leds: usize,
    /// Three bytes: red, green, blue
    pub lightbar: usize,
    /// Discriminant plus ten parameter bytes
    pub right_trigger: usize,
    pub left_trigger: usize,
}

/// A named byte range used during validation
struct Span {
    name: &'static str,
    start: usize,
    len: usize,
}

fn span(name: &'static str, start: usize, len: usize) -> Span {
    Span { name, start, len }
}

/// Check that every span fits in `size` bytes and that no two spans share a byte
fn check_spans(size: usize, spans: &[Span]) -> Result<(), LayoutError> {
    if size == 0 || size > MAX_REPORT_SIZE {
        return Err(LayoutError::InvalidSize(size));
    }

    for s in spans {
        let end = s.start + s.len;
        if end > size {
            return Err(LayoutError::FieldOutOfBounds {
                field: s.name,
                end,
                size,
            });
        }
    }

    for (i, a) in spans.iter().enumerate() {
        for b in &spans[i + 1..] {
            if a.start < b.start + b.len && b.start < a.start + a.len {
                return Err(LayoutError::Overlap {
                    first: a.name,
                    second: b.name,
                });
            }
        }
    }

    Ok(())
}

impl InputLayout {
    /// Validate field widths, bounds and overlaps
    ///
    /// # Errors
    ///
    /// Returns the first [`LayoutError`] found.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !(1..=4).contains(&self.button_bytes) {
            return Err(LayoutError::InvalidWidth {
                field: "buttons",
                width: self.button_bytes,
            });
        }
        if self.touch_point_bytes != TOUCH_POINT_BYTES
            && self.touch_point_bytes != TOUCH_POINT_BYTES_AUX
        {
            return Err(LayoutError::InvalidWidth {
                field: "touch",
                width: self.touch_point_bytes,
            });
        }

        let mut spans: Vec<Span> = self
            .fixed
            .iter()
            .map(|b| span("fixed", b.offset, 1))
            .collect();
        spans.extend([
            span("left_stick", self.left_stick, 2),
            span("right_stick", self.right_stick, 2),
            span("left_trigger", self.left_trigger, 1),
            span("right_trigger", self.right_trigger, 1),
            span("buttons", self.buttons, self.button_bytes),
            span("gyroscope", self.gyroscope, 6),
            span("accelerometer", self.accelerometer, 6),
            span("timestamp", self.timestamp, 4),
            span("touch0", self.touch[0], self.touch_point_bytes),
            span("touch1", self.touch[1], self.touch_point_bytes),
            span("battery", self.battery, 1),
            span("headphone", self.headphone, 1),
            span("left_trigger_feedback", self.left_trigger_feedback, 1),
            span("right_trigger_feedback", self.right_trigger_feedback, 1),
        ]);
        if let Some(offset) = self.delta_time {
            spans.push(span("delta_time", offset, 4));
        }
        if let Some(offset) = self.battery_level {
            spans.push(span("battery_level", offset, 1));
        }

        check_spans(self.report_size, &spans)
    }

    /// USB input report (`DS5U`, 64 bytes)
    pub fn usb() -> Self {
        Self {
            format_id: "DS5U".to_string(),
            report_size: 64,
            fixed: vec![FixedByte {
                offset: 0,
                value: USB_INPUT_REPORT_ID,
            }],
            left_stick: 1,
            right_stick: 3,
            stick_encoding: StickEncoding::Offset,
            left_trigger: 5,
            right_trigger: 6,
            buttons: 8,
            button_bytes: 3,
            dpad: DpadEncoding::Hat,
            gyroscope: 16,
            accelerometer: 22,
            timestamp: 28,
            delta_time: None,
            touch: [33, 37],
            touch_point_bytes: TOUCH_POINT_BYTES,
            right_trigger_feedback: 42,
            left_trigger_feedback: 43,
            battery: 53,
            battery_level: None,
            headphone: 54,
        }
    }

    /// Bluetooth full input report (`DS5B`, 78 bytes)
    ///
    /// Same fields as USB shifted by one byte; the last four bytes carry the CRC.
    pub fn bluetooth() -> Self {
        let usb = Self::usb();
        Self {
            format_id: "DS5B".to_string(),
            report_size: 78,
            fixed: vec![FixedByte {
                offset: 0,
                value: BT_INPUT_REPORT_ID,
            }],
            left_stick: usb.left_stick + 1,
            right_stick: usb.right_stick + 1,
            left_trigger: usb.left_trigger + 1,
            right_trigger: usb.right_trigger + 1,
            buttons: usb.buttons + 1,
            gyroscope: usb.gyroscope + 1,
            accelerometer: usb.accelerometer + 1,
            timestamp: usb.timestamp + 1,
            touch: [usb.touch[0] + 1, usb.touch[1] + 1],
            right_trigger_feedback: usb.right_trigger_feedback + 1,
            left_trigger_feedback: usb.left_trigger_feedback + 1,
            battery: usb.battery + 1,
            headphone: usb.headphone + 1,
            ..usb
        }
    }

    /// Packed driver-side snapshot (`DS5W`, 64 bytes)
    ///
    /// Signed sticks, a 32-bit button word with d-pad bits, touch points
    /// with the pressure/id byte and an explicit delta time.
    pub fn packed() -> Self {
        Self {
            format_id: "DS5W".to_string(),
            report_size: 64,
            fixed: Vec::new(),
            left_stick: 0,
            right_stick: 2,
            stick_encoding: StickEncoding::Signed,
            buttons: 4,
            button_bytes: 4,
            dpad: DpadEncoding::Bits,
            left_trigger: 8,
            right_trigger: 9,
            accelerometer: 10,
            gyroscope: 16,
            touch: [22, 27],
            touch_point_bytes: TOUCH_POINT_BYTES_AUX,
            timestamp: 32,
            delta_time: Some(36),
            battery: 40,
            battery_level: None,
            headphone: 41,
            left_trigger_feedback: 42,
            right_trigger_feedback: 43,
        }
    }
}

impl OutputLayout {
    /// Validate bounds and overlaps
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut spans: Vec<Span> = self
            .fixed
            .iter()
            .map(|b| span("fixed", b.offset, 1))
            .collect();
        spans.extend([
            span("right_rumble", self.right_rumble, 1),
            span("left_rumble", self.left_rumble, 1),
            span("rumble_strength", self.rumble_strength, 1),
            span("mic_led", self.mic_led, 1),
            span("disable_leds", self.disable_leds, 1),
            span("player_led_fade", self.player_led_fade, 1),
            span("player_led_brightness", self.player_led_brightness, 1),
            span("player_leds", self.player_leds, 1),
            span("lightbar", self.lightbar, 3),
            span("right_trigger", self.right_trigger, TRIGGER_EFFECT_BYTES),
            span("left_trigger", self.left_trigger, TRIGGER_EFFECT_BYTES),
        ]);
        check_spans(self.report_size, &spans)
    }

    /// USB output report (48 bytes)
    pub fn usb() -> Self {
        Self {
            report_size: 48,
            fixed: vec![
                FixedByte { offset: 0, value: USB_OUTPUT_REPORT_ID },
                FixedByte { offset: 1, value: VALID_FLAG0 },
                FixedByte { offset: 2, value: VALID_FLAG1 },
            ],
            right_rumble: 3,
            left_rumble: 4,
            mic_led: 9,
            right_trigger: 11,
            left_trigger: 22,
            rumble_strength: 37,
            disable_leds: 39,
            player_led_fade: 42,
            player_led_brightness: 43,
            player_leds: 44,
            lightbar: 45,
        }
    }

    /// Bluetooth output report (74 bytes before the channel appends its CRC)
    pub fn bluetooth() -> Self {
        let usb = Self::usb();
        Self {
            report_size: 74,
            fixed: vec![
                FixedByte { offset: 0, value: BT_OUTPUT_REPORT_ID },
                FixedByte { offset: 1, value: USB_OUTPUT_REPORT_ID },
                FixedByte { offset: 2, value: VALID_FLAG0 },
                FixedByte { offset: 3, value: VALID_FLAG1 },
            ],
            right_rumble: usb.right_rumble + 1,
            left_rumble: usb.left_rumble + 1,
            mic_led: usb.mic_led + 1,
            right_trigger: usb.right_trigger + 1,
            left_trigger: usb.left_trigger + 1,
            rumble_strength: usb.rumble_strength + 1,
            disable_leds: usb.disable_leds + 1,
            player_led_fade: usb.player_led_fade + 1,
            player_led_brightness: usb.player_led_brightness + 1,
            player_leds: usb.player_leds + 1,
            lightbar: usb.lightbar + 1,
        }
    }
}

/// Named pair of input and output tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPreset {
    Usb,
    Bluetooth,
    Packed,
}

impl LayoutPreset {
    pub fn input(self) -> InputLayout {
        match self {
            LayoutPreset::Usb => InputLayout::usb(),
            LayoutPreset::Bluetooth => InputLayout::bluetooth(),
            LayoutPreset::Packed => InputLayout::packed(),
        }
    }

    /// The packed snapshot shares the USB output report
    pub fn output(self) -> OutputLayout {
        match self {
            LayoutPreset::Usb | LayoutPreset::Packed => OutputLayout::usb(),
            LayoutPreset::Bluetooth => OutputLayout::bluetooth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for preset in [LayoutPreset::Usb, LayoutPreset::Bluetooth, LayoutPreset::Packed] {
            assert!(preset.input().validate().is_ok(), "{:?} input should validate", preset);
            assert!(preset.output().validate().is_ok(), "{:?} output should validate", preset);
        }
    }

    #[test]
    fn test_bluetooth_shifts_usb_by_one() {
        let usb = InputLayout::usb();
        let bt = InputLayout::bluetooth();
        assert_eq!(bt.buttons, usb.buttons + 1);
        assert_eq!(bt.touch, [usb.touch[0] + 1, usb.touch[1] + 1]);
        assert_eq!(bt.fixed[0].value, BT_INPUT_REPORT_ID);
        assert_eq!(bt.format_id, "DS5B");
    }

    #[test]
    fn test_field_out_of_bounds() {
        let mut layout = InputLayout::usb();
        layout.timestamp = 62;
        assert_eq!(
            layout.validate(),
            Err(LayoutError::FieldOutOfBounds {
                field: "timestamp",
                end: 66,
                size: 64
            })
        );
    }

    #[test]
    fn test_overlapping_fields() {
        let mut layout = OutputLayout::usb();
        layout.left_trigger = 20;
        assert_eq!(
            layout.validate(),
            Err(LayoutError::Overlap {
                first: "right_trigger",
                second: "left_trigger"
            })
        );
    }

    #[test]
    fn test_fixed_byte_overlap() {
        let mut layout = InputLayout::usb();
        layout.left_stick = 0;
        assert!(matches!(layout.validate(), Err(LayoutError::Overlap { .. })));
    }

    #[test]
    fn test_invalid_widths_and_sizes() {
        let mut layout = InputLayout::packed();
        layout.button_bytes = 5;
        assert!(matches!(layout.validate(), Err(LayoutError::InvalidWidth { field: "buttons", .. })));

        let mut layout = InputLayout::packed();
        layout.touch_point_bytes = 3;
        assert!(matches!(layout.validate(), Err(LayoutError::InvalidWidth { field: "touch", .. })));

        let mut layout = OutputLayout::usb();
        layout.report_size = 0;
        assert_eq!(layout.validate(), Err(LayoutError::InvalidSize(0)));
    }

    #[test]
    fn test_layout_deserializes_from_toml() {
        let toml_str = r#"
            format_id = "TEST"
            report_size = 32
            left_stick = 0
            right_stick = 2
            stick_encoding = "signed"
            left_trigger = 4
            right_trigger = 5
            buttons = 6
            button_bytes = 2
            dpad = "bits"
            gyroscope = 8
            accelerometer = 14
            timestamp = 20
            touch = [24, 28]
            touch_point_bytes = 4
            battery = 8
            headphone = 9
            left_trigger_feedback = 10
            right_trigger_feedback = 11
        "#;
        let layout: InputLayout = toml::from_str(toml_str).unwrap();
        assert_eq!(layout.delta_time, None);
        assert!(layout.fixed.is_empty());
        // battery shares bytes with the gyroscope
        assert!(matches!(layout.validate(), Err(LayoutError::Overlap { .. })));
    }
}
