//! # Report Encoder
//!
//! Encodes [`OutputState`] into output reports. Also encodes
//! [`InputReport`] back into raw input reports, which is how test fixtures
//! and capture replays produce byte-exact device data.

use super::bits::{write_i16_le, write_u12, write_u32_le, write_uint_le, Nibble};
use super::decoder::HAT_TO_DPAD;
use super::layout::{DpadEncoding, FixedByte, InputLayout, OutputLayout, StickEncoding, TOUCH_POINT_BYTES_AUX};
use super::protocol::*;

/// Hat value meaning "no direction"
const HAT_NEUTRAL: u32 = 0x08;

fn write_fixed(buf: &mut [u8], fixed: &[FixedByte]) {
    for byte in fixed {
        buf[byte.offset] = byte.value;
    }
}

/// Encode the full output state into a fresh report
///
/// Every byte not owned by a field is zero. Each trigger block gets its
/// discriminant followed by a parameter block in which only the bytes owned
/// by the active variant are non-zero.
///
/// # Arguments
///
/// * `layout` - Validated output offset table
/// * `state` - Desired device state
///
/// # Returns
///
/// * `Vec<u8>` - Report of exactly `layout.report_size` bytes
pub(crate) fn encode_output(layout: &OutputLayout, state: &OutputState) -> Vec<u8> {
    let mut buf = vec![0u8; layout.report_size];
    write_fixed(&mut buf, &layout.fixed);

    buf[layout.right_rumble] = state.right_rumble;
    buf[layout.left_rumble] = state.left_rumble;
    buf[layout.rumble_strength] = state.rumble_strength;
    buf[layout.mic_led] = state.mic_led.to_wire();
    buf[layout.disable_leds] = u8::from(state.disable_leds);
    buf[layout.player_led_fade] = u8::from(state.player_leds.fade);
    buf[layout.player_led_brightness] = state.player_leds.brightness.to_wire();
    buf[layout.player_leds] = state.player_leds.bitmask;
    buf[layout.lightbar] = state.lightbar.r;
    buf[layout.lightbar + 1] = state.lightbar.g;
    buf[layout.lightbar + 2] = state.lightbar.b;

    write_trigger(&mut buf, layout.right_trigger, &state.right_trigger);
    write_trigger(&mut buf, layout.left_trigger, &state.left_trigger);

    buf
}

fn write_trigger(buf: &mut [u8], offset: usize, effect: &TriggerEffect) {
    buf[offset] = effect.discriminant();
    buf[offset + 1..offset + TRIGGER_EFFECT_BYTES].copy_from_slice(&effect.params());
}

/// Encode an input snapshot into a raw report
///
/// D-pad combinations a hat switch cannot express (opposite directions)
/// encode as neutral under [`DpadEncoding::Hat`].
pub(crate) fn encode_input(layout: &InputLayout, report: &InputReport) -> Vec<u8> {
    let mut buf = vec![0u8; layout.report_size];
    write_fixed(&mut buf, &layout.fixed);

    write_stick(&mut buf, layout.left_stick, layout.stick_encoding, report.left_stick);
    write_stick(&mut buf, layout.right_stick, layout.stick_encoding, report.right_stick);
    buf[layout.left_trigger] = report.left_trigger;
    buf[layout.right_trigger] = report.right_trigger;

    let dpad = match layout.dpad {
        DpadEncoding::Bits => report.buttons & DPAD_MASK,
        DpadEncoding::Hat => dpad_to_hat(report.buttons & DPAD_MASK),
    };
    write_uint_le(
        &mut buf,
        layout.buttons,
        layout.button_bytes,
        (report.buttons & !DPAD_MASK) | dpad,
    );

    write_vec3(&mut buf, layout.accelerometer, report.accelerometer);
    write_vec3(&mut buf, layout.gyroscope, report.gyroscope);
    for (point, &offset) in report.touch.iter().zip(layout.touch.iter()) {
        write_touch(&mut buf, offset, layout.touch_point_bytes, point);
    }

    write_u32_le(&mut buf, layout.timestamp, report.timestamp);
    if let Some(offset) = layout.delta_time {
        write_u32_le(&mut buf, offset, report.delta_time);
    }

    let battery = &report.battery;
    let mut status = (u8::from(battery.charging) << 4) | (u8::from(battery.fully_charged) << 5);
    match layout.battery_level {
        Some(offset) => buf[offset] = battery.raw_level,
        None => status |= battery.raw_level & 0x0F,
    }
    buf[layout.battery] = status;

    buf[layout.headphone] = u8::from(report.headphone_connected);
    buf[layout.left_trigger_feedback] = report.left_trigger_feedback;
    buf[layout.right_trigger_feedback] = report.right_trigger_feedback;

    buf
}

fn dpad_to_hat(bits: u32) -> u32 {
    HAT_TO_DPAD
        .iter()
        .position(|&pattern| pattern == bits)
        .map(|hat| hat as u32)
        .unwrap_or(HAT_NEUTRAL)
}

fn write_stick(buf: &mut [u8], offset: usize, encoding: StickEncoding, stick: Stick) {
    let axis = |value: i8| match encoding {
        StickEncoding::Signed => value as u8,
        StickEncoding::Offset => (value as i16 + 128) as u8,
    };
    buf[offset] = axis(stick.x);
    buf[offset + 1] = axis(stick.y);
}

fn write_vec3(buf: &mut [u8], offset: usize, v: Vec3) {
    write_i16_le(buf, offset, v.x);
    write_i16_le(buf, offset + 2, v.y);
    write_i16_le(buf, offset + 4, v.z);
}

fn write_touch(buf: &mut [u8], offset: usize, size: usize, point: &TouchPoint) {
    let inactive = if point.active { 0 } else { 0x80 };
    buf[offset] = inactive | (point.index & 0x7F);
    write_u12(buf, offset + 1, Nibble::Low, point.x);
    write_u12(buf, offset + 2, Nibble::High, point.y);
    if size == TOUCH_POINT_BYTES_AUX {
        buf[offset + 4] = point.aux;
    }
}
