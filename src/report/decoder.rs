//! # Report Decoder
//!
//! Decodes raw input reports into [`InputReport`] snapshots.
//!
//! Decoding is total over any buffer of at least the layout's report size:
//! every field is a plain mask/shift at a fixed offset, reserved bits are
//! passed through untouched and no value is rejected. The only failure is a
//! buffer that is too short.

use super::bits::{read_i16_le, read_u12, read_u32_le, read_uint_le, Nibble};
use super::layout::{DpadEncoding, InputLayout, OutputLayout, StickEncoding, TOUCH_POINT_BYTES_AUX};
use super::protocol::*;
use crate::error::DecodeError;

/// D-pad bits for hat values 0 (up) through 7 (up-left)
pub(crate) const HAT_TO_DPAD: [u32; 8] = [
    Button::DpadUp.mask(),
    Button::DpadUp.mask() | Button::DpadRight.mask(),
    Button::DpadRight.mask(),
    Button::DpadDown.mask() | Button::DpadRight.mask(),
    Button::DpadDown.mask(),
    Button::DpadDown.mask() | Button::DpadLeft.mask(),
    Button::DpadLeft.mask(),
    Button::DpadUp.mask() | Button::DpadLeft.mask(),
];

/// Bit 7 of a touch point's first byte is set while no finger is down
const TOUCH_INACTIVE: u8 = 0x80;
const TOUCH_INDEX_MASK: u8 = 0x7F;

const BATTERY_LEVEL_MASK: u8 = 0x0F;
const BATTERY_CHARGING: u8 = 0x10;
const BATTERY_FULL: u8 = 0x20;
const HEADPHONE_CONNECTED: u8 = 0x01;

/// Check that a buffer holds at least `expected` bytes
pub(crate) fn check_size(buf: &[u8], expected: usize) -> Result<(), DecodeError> {
    if buf.len() < expected {
        return Err(DecodeError::WrongSize {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Decode an input report
///
/// # Arguments
///
/// * `layout` - Validated offset table for the negotiated report format
/// * `buf` - Raw report; bytes past the report size are ignored
///
/// # Returns
///
/// * `Result<InputReport, DecodeError>` - Decoded snapshot
///
/// # Errors
///
/// Returns `DecodeError::WrongSize` if `buf` is shorter than the report size.
/// The report ID byte is not checked.
pub(crate) fn decode_input(layout: &InputLayout, buf: &[u8]) -> Result<InputReport, DecodeError> {
    check_size(buf, layout.report_size)?;

    let byte = |offset: usize| buf[offset];

    Ok(InputReport {
        left_stick: read_stick(buf, layout.left_stick, layout.stick_encoding),
        right_stick: read_stick(buf, layout.right_stick, layout.stick_encoding),
        buttons: read_buttons(buf, layout),
        left_trigger: byte(layout.left_trigger),
        right_trigger: byte(layout.right_trigger),
        accelerometer: read_vec3(buf, layout.accelerometer),
        gyroscope: read_vec3(buf, layout.gyroscope),
        touch: [
            read_touch(buf, layout.touch[0], layout.touch_point_bytes),
            read_touch(buf, layout.touch[1], layout.touch_point_bytes),
        ],
        timestamp: read_u32_le(buf, layout.timestamp),
        delta_time: layout
            .delta_time
            .map(|offset| read_u32_le(buf, offset))
            .unwrap_or(0),
        battery: read_battery(buf, layout),
        headphone_connected: byte(layout.headphone) & HEADPHONE_CONNECTED != 0,
        left_trigger_feedback: byte(layout.left_trigger_feedback),
        right_trigger_feedback: byte(layout.right_trigger_feedback),
    })
}

fn read_stick(buf: &[u8], offset: usize, encoding: StickEncoding) -> Stick {
    let axis = |raw: u8| match encoding {
        StickEncoding::Signed => raw as i8,
        StickEncoding::Offset => (raw as i16 - 128) as i8,
    };
    Stick {
        x: axis(buf[offset]),
        y: axis(buf[offset + 1]),
    }
}

fn read_vec3(buf: &[u8], offset: usize) -> Vec3 {
    Vec3 {
        x: read_i16_le(buf, offset),
        y: read_i16_le(buf, offset + 2),
        z: read_i16_le(buf, offset + 4),
    }
}

fn read_buttons(buf: &[u8], layout: &InputLayout) -> u32 {
    let raw = read_uint_le(buf, layout.buttons, layout.button_bytes);
    let dpad = match layout.dpad {
        DpadEncoding::Bits => raw & DPAD_MASK,
        DpadEncoding::Hat => HAT_TO_DPAD
            .get((raw & DPAD_MASK) as usize)
            .copied()
            .unwrap_or(0),
    };
    (raw & !DPAD_MASK) | dpad
}

fn read_touch(buf: &[u8], offset: usize, size: usize) -> TouchPoint {
    let head = buf[offset];
    TouchPoint {
        active: head & TOUCH_INACTIVE == 0,
        index: head & TOUCH_INDEX_MASK,
        x: read_u12(buf, offset + 1, Nibble::Low),
        y: read_u12(buf, offset + 2, Nibble::High),
        aux: if size == TOUCH_POINT_BYTES_AUX {
            buf[offset + 4]
        } else {
            0
        },
    }
}

fn read_battery(buf: &[u8], layout: &InputLayout) -> Battery {
    let status = buf[layout.battery];
    let (level, raw_level) = match layout.battery_level {
        Some(offset) => (buf[offset].min(100), buf[offset]),
        None => {
            let raw = status & BATTERY_LEVEL_MASK;
            ((raw as u16 * 100 / 15) as u8, raw)
        }
    };
    Battery {
        charging: status & BATTERY_CHARGING != 0,
        fully_charged: status & BATTERY_FULL != 0,
        level,
        raw_level,
    }
}

/// Decode an output report back into an [`OutputState`]
///
/// Used to inspect what was sent to a device and to verify the encoder.
///
/// # Errors
///
/// `WrongSize` for a short buffer; `InvalidField` or `UnknownTriggerEffect`
/// when a byte holds a value the output model cannot represent.
pub(crate) fn decode_output(layout: &OutputLayout, buf: &[u8]) -> Result<OutputState, DecodeError> {
    check_size(buf, layout.report_size)?;

    Ok(OutputState {
        left_rumble: buf[layout.left_rumble],
        right_rumble: buf[layout.right_rumble],
        rumble_strength: buf[layout.rumble_strength],
        mic_led: MicLed::from_wire(buf[layout.mic_led])?,
        disable_leds: buf[layout.disable_leds] != 0,
        player_leds: PlayerLeds {
            bitmask: buf[layout.player_leds],
            fade: buf[layout.player_led_fade] != 0,
            brightness: LedBrightness::from_wire(buf[layout.player_led_brightness])?,
        },
        lightbar: Color::new(
            buf[layout.lightbar],
            buf[layout.lightbar + 1],
            buf[layout.lightbar + 2],
        ),
        left_trigger: read_trigger(buf, layout.left_trigger)?,
        right_trigger: read_trigger(buf, layout.right_trigger)?,
    })
}

fn read_trigger(buf: &[u8], offset: usize) -> Result<TriggerEffect, DecodeError> {
    let mut params = [0u8; TRIGGER_PARAM_BYTES];
    params.copy_from_slice(&buf[offset + 1..offset + TRIGGER_EFFECT_BYTES]);
    TriggerEffect::from_wire(buf[offset], &params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb_report() -> Vec<u8> {
        let mut buf = vec![0u8; 64];
        buf[0] = USB_INPUT_REPORT_ID;
        buf[1] = 128; // left stick centred
        buf[2] = 128;
        buf[3] = 128;
        buf[4] = 128;
        buf[8] = 0x08; // hat neutral
        buf
    }

    #[test]
    fn test_decode_too_short() {
        let layout = InputLayout::usb();
        let result = decode_input(&layout, &[0u8; 10]);
        assert_eq!(
            result,
            Err(DecodeError::WrongSize {
                expected: 64,
                actual: 10
            })
        );
    }

    #[test]
    fn test_decode_accepts_longer_buffer() {
        let layout = InputLayout::usb();
        let mut buf = usb_report();
        buf.extend_from_slice(&[0xFF; 8]);
        assert!(decode_input(&layout, &buf).is_ok());
    }

    #[test]
    fn test_decode_neutral_usb_report() {
        let report = decode_input(&InputLayout::usb(), &usb_report()).unwrap();
        assert_eq!(report.left_stick, Stick { x: 0, y: 0 });
        assert_eq!(report.right_stick, Stick { x: 0, y: 0 });
        assert_eq!(report.buttons, 0, "neutral hat should decode to no buttons");
    }

    #[test]
    fn test_decode_any_bytes_never_fails() {
        let layout = InputLayout::usb();
        for fill in [0x00u8, 0x7F, 0x80, 0xFF] {
            let buf = vec![fill; 64];
            assert!(decode_input(&layout, &buf).is_ok(), "fill 0x{:02X} should decode", fill);
        }
    }

    #[test]
    fn test_decode_stick_extremes() {
        let mut buf = usb_report();
        buf[1] = 0;
        buf[2] = 255;
        let report = decode_input(&InputLayout::usb(), &buf).unwrap();
        assert_eq!(report.left_stick, Stick { x: -128, y: 127 });
    }

    #[test]
    fn test_decode_hat_directions() {
        let layout = InputLayout::usb();
        let cases = [
            (0u8, vec![Button::DpadUp]),
            (2, vec![Button::DpadRight]),
            (3, vec![Button::DpadDown, Button::DpadRight]),
            (6, vec![Button::DpadLeft]),
            (7, vec![Button::DpadUp, Button::DpadLeft]),
        ];
        for (hat, expected) in cases {
            let mut buf = usb_report();
            buf[8] = hat;
            let report = decode_input(&layout, &buf).unwrap();
            let mut pressed: Vec<Button> = report.pressed().collect();
            let mut expected = expected.clone();
            pressed.sort_by_key(|b| b.mask());
            expected.sort_by_key(|b| b.mask());
            assert_eq!(pressed, expected, "hat {}", hat);
        }
    }

    #[test]
    fn test_decode_single_face_button() {
        let mut buf = usb_report();
        buf[8] = 0x08 | 0x20; // neutral hat + cross
        let report = decode_input(&InputLayout::usb(), &buf).unwrap();
        assert!(report.is_pressed(Button::Cross));
        assert_eq!(report.pressed().count(), 1);
    }

    #[test]
    fn test_decode_system_buttons() {
        let mut buf = usb_report();
        buf[9] = 0x81; // L1 + R3
        buf[10] = 0x07; // PS + touchpad + mic
        let report = decode_input(&InputLayout::usb(), &buf).unwrap();
        for button in [Button::L1, Button::R3, Button::Ps, Button::Touchpad, Button::Mic] {
            assert!(report.is_pressed(button), "{:?} should be pressed", button);
        }
        assert_eq!(report.pressed().count(), 5);
    }

    #[test]
    fn test_decode_touch_point() {
        let mut buf = usb_report();
        // finger down, index 5, x = 0x123, y = 0x456
        buf[33] = 0x05;
        buf[34] = 0x23;
        buf[35] = 0x61;
        buf[36] = 0x45;
        // second point lifted
        buf[37] = 0x80 | 0x06;
        let report = decode_input(&InputLayout::usb(), &buf).unwrap();
        assert_eq!(
            report.touch[0],
            TouchPoint { active: true, index: 5, x: 0x123, y: 0x456, aux: 0 }
        );
        assert!(!report.touch[1].active);
        assert_eq!(report.touch[1].index, 6);
    }

    #[test]
    fn test_touch_detection_bit_leaves_coordinates() {
        let layout = InputLayout::usb();
        let mut buf = usb_report();
        buf[34] = 0xFF;
        buf[35] = 0xFF;
        buf[36] = 0xFF;
        let down = decode_input(&layout, &buf).unwrap().touch[0];
        buf[33] ^= 0x80;
        let up = decode_input(&layout, &buf).unwrap().touch[0];
        assert_ne!(down.active, up.active);
        assert_eq!((down.x, down.y), (4095, 4095));
        assert_eq!((up.x, up.y), (4095, 4095));
    }

    #[test]
    fn test_decode_motion_and_timestamp() {
        let mut buf = usb_report();
        buf[16..18].copy_from_slice(&(-300i16).to_le_bytes());
        buf[26..28].copy_from_slice(&8192i16.to_le_bytes());
        buf[28..32].copy_from_slice(&123_456u32.to_le_bytes());
        let report = decode_input(&InputLayout::usb(), &buf).unwrap();
        assert_eq!(report.gyroscope.x, -300);
        assert_eq!(report.accelerometer.z, 8192);
        assert_eq!(report.timestamp, 123_456);
        assert_eq!(report.delta_time, 0);
    }

    #[test]
    fn test_decode_battery_nibble() {
        let mut buf = usb_report();
        buf[53] = 0x10 | 0x0F;
        let report = decode_input(&InputLayout::usb(), &buf).unwrap();
        assert!(report.battery.charging);
        assert!(!report.battery.fully_charged);
        assert_eq!(report.battery.raw_level, 15);
        assert_eq!(report.battery.level, 100);

        buf[53] = 0x20 | 0x07;
        let report = decode_input(&InputLayout::usb(), &buf).unwrap();
        assert!(report.battery.fully_charged);
        assert_eq!(report.battery.level, 46);
    }

    #[test]
    fn test_decode_battery_level_byte() {
        let mut layout = InputLayout::usb();
        layout.battery_level = Some(55);
        let mut buf = usb_report();
        buf[55] = 250;
        let report = decode_input(&layout, &buf).unwrap();
        assert_eq!(report.battery.level, 100);
        assert_eq!(report.battery.raw_level, 250);
    }

    #[test]
    fn test_decode_packed_layout() {
        let layout = InputLayout::packed();
        let mut buf = vec![0u8; 64];
        buf[0] = (-5i8) as u8;
        buf[4..8].copy_from_slice(&(Button::DpadUp.mask() | Button::Mic.mask()).to_le_bytes());
        buf[26] = 0x9C; // touch 0 aux
        buf[36..40].copy_from_slice(&250u32.to_le_bytes());
        buf[41] = 0x01;
        let report = decode_input(&layout, &buf).unwrap();
        assert_eq!(report.left_stick.x, -5);
        assert!(report.is_pressed(Button::DpadUp));
        assert!(report.is_pressed(Button::Mic));
        assert_eq!(report.touch[0].aux, 0x9C);
        assert_eq!(report.delta_time, 250);
        assert!(report.headphone_connected);
    }

    #[test]
    fn test_decode_output_rejects_bad_trigger() {
        let layout = OutputLayout::usb();
        let mut buf = vec![0u8; 48];
        buf[layout.left_trigger] = 0x42;
        assert_eq!(
            decode_output(&layout, &buf),
            Err(DecodeError::UnknownTriggerEffect(0x42))
        );
    }
}
