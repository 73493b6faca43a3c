//! # DualSense Report Types and Constants
//!
//! Core data model shared by the decoder, the encoder and everything above
//! them: the decoded [`InputReport`], the desired [`OutputState`] and the
//! tagged [`TriggerEffect`] union.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// USB input report ID
pub const USB_INPUT_REPORT_ID: u8 = 0x01;

/// Bluetooth (full mode) input report ID
pub const BT_INPUT_REPORT_ID: u8 = 0x31;

/// USB output report ID
pub const USB_OUTPUT_REPORT_ID: u8 = 0x02;

/// Bluetooth output report ID
pub const BT_OUTPUT_REPORT_ID: u8 = 0x31;

/// Output valid flags: every motor, LED and trigger field is applied
pub const VALID_FLAG0: u8 = 0xFF;
pub const VALID_FLAG1: u8 = 0xF7;

/// Number of parameter bytes following a trigger effect discriminant
pub const TRIGGER_PARAM_BYTES: usize = 10;

/// Discriminant byte plus parameter block
pub const TRIGGER_EFFECT_BYTES: usize = 1 + TRIGGER_PARAM_BYTES;

/// Player LED bits (left to right)
pub const PLAYER_LED_LEFT: u8 = 0x01;
pub const PLAYER_LED_MIDDLE_LEFT: u8 = 0x02;
pub const PLAYER_LED_MIDDLE: u8 = 0x04;
pub const PLAYER_LED_MIDDLE_RIGHT: u8 = 0x08;
pub const PLAYER_LED_RIGHT: u8 = 0x10;

/// Mask of the four d-pad bits in the button bitmask
pub const DPAD_MASK: u32 = 0x0F;

/// Logical buttons and their fixed bit in [`InputReport::buttons`]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    DpadLeft = 0x0000_0001,
    DpadDown = 0x0000_0002,
    DpadRight = 0x0000_0004,
    DpadUp = 0x0000_0008,
    Square = 0x0000_0010,
    Cross = 0x0000_0020,
    Circle = 0x0000_0040,
    Triangle = 0x0000_0080,
    L1 = 0x0000_0100,
    R1 = 0x0000_0200,
    L2 = 0x0000_0400,
    R2 = 0x0000_0800,
    Create = 0x0000_1000,
    Options = 0x0000_2000,
    L3 = 0x0000_4000,
    R3 = 0x0000_8000,
    Ps = 0x0001_0000,
    Touchpad = 0x0002_0000,
    Mic = 0x0004_0000,
}

impl Button {
    /// Every button, in bit order
    pub const ALL: [Button; 19] = [
        Button::DpadLeft,
        Button::DpadDown,
        Button::DpadRight,
        Button::DpadUp,
        Button::Square,
        Button::Cross,
        Button::Circle,
        Button::Triangle,
        Button::L1,
        Button::R1,
        Button::L2,
        Button::R2,
        Button::Create,
        Button::Options,
        Button::L3,
        Button::R3,
        Button::Ps,
        Button::Touchpad,
        Button::Mic,
    ];

    /// Bit mask of this button
    pub const fn mask(self) -> u32 {
        self as u32
    }
}

/// Check whether `button` is pressed in a raw button bitmask
///
/// # Examples
///
/// ```
/// use dualsense_link::report::protocol::{bit_set, Button};
///
/// assert!(bit_set(0x20, Button::Cross));
/// assert!(!bit_set(0x20, Button::Circle));
/// ```
pub const fn bit_set(mask: u32, button: Button) -> bool {
    mask & button.mask() != 0
}

/// Analog stick position, centred at 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stick {
    pub x: i8,
    pub y: i8,
}

/// Three-axis motion sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// One touchpad contact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Finger is on the pad
    pub active: bool,
    /// 7-bit contact counter
    pub index: u8,
    /// 12-bit horizontal position
    pub x: u16,
    /// 12-bit vertical position
    pub y: u16,
    /// Pressure/id byte, zero when the layout has none
    pub aux: u8,
}

/// Battery status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battery {
    pub charging: bool,
    pub fully_charged: bool,
    /// Charge level in percent (0-100)
    pub level: u8,
    /// Level as it appeared on the wire (0-15 nibble or 0-100 byte)
    pub raw_level: u8,
}

/// Immutable snapshot decoded from one input report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReport {
    pub left_stick: Stick,
    pub right_stick: Stick,
    /// Button bitmask, see [`Button`]
    pub buttons: u32,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub accelerometer: Vec3,
    pub gyroscope: Vec3,
    pub touch: [TouchPoint; 2],
    /// Device timestamp
    pub timestamp: u32,
    /// Time since the previous report, in device timestamp units
    pub delta_time: u32,
    pub battery: Battery,
    pub headphone_connected: bool,
    /// Force currently applied by the left trigger motor
    pub left_trigger_feedback: u8,
    /// Force currently applied by the right trigger motor
    pub right_trigger_feedback: u8,
}

impl InputReport {
    /// Check whether a button is pressed
    pub fn is_pressed(&self, button: Button) -> bool {
        bit_set(self.buttons, button)
    }

    /// All buttons currently pressed
    pub fn pressed(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL
            .iter()
            .copied()
            .filter(move |button| self.is_pressed(*button))
    }
}

/// RGB colour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Microphone LED mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MicLed {
    #[default]
    Off,
    On,
    Pulse,
}

impl MicLed {
    pub fn to_wire(self) -> u8 {
        match self {
            MicLed::Off => 0,
            MicLed::On => 1,
            MicLed::Pulse => 2,
        }
    }

    pub fn from_wire(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(MicLed::Off),
            1 => Ok(MicLed::On),
            2 => Ok(MicLed::Pulse),
            _ => Err(DecodeError::InvalidField {
                field: "mic_led",
                value,
            }),
        }
    }
}

/// Player LED brightness (wire value 0 is the brightest)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedBrightness {
    #[default]
    High,
    Medium,
    Low,
}

impl LedBrightness {
    pub fn to_wire(self) -> u8 {
        match self {
            LedBrightness::High => 0,
            LedBrightness::Medium => 1,
            LedBrightness::Low => 2,
        }
    }

    pub fn from_wire(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(LedBrightness::High),
            1 => Ok(LedBrightness::Medium),
            2 => Ok(LedBrightness::Low),
            _ => Err(DecodeError::InvalidField {
                field: "player_led_brightness",
                value,
            }),
        }
    }
}

/// Player indicator LEDs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerLeds {
    /// Combination of `PLAYER_LED_*` bits
    pub bitmask: u8,
    pub fade: bool,
    pub brightness: LedBrightness,
}

impl PlayerLeds {
    /// LED pattern lighting the single LED for a player slot (0-4)
    pub fn for_player(player_id: u8) -> Self {
        Self {
            bitmask: 1u8 << player_id.min(4),
            ..Self::default()
        }
    }
}

/// Which adaptive trigger an effect applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSide {
    Left,
    Right,
}

/// Trigger effect discriminants
pub mod trigger_mode {
    pub const NO_RESISTANCE: u8 = 0x00;
    pub const CONTINUOUS_RESISTANCE: u8 = 0x01;
    pub const SECTION_RESISTANCE: u8 = 0x02;
    pub const RELEASE_ALL: u8 = 0x05;
    pub const EFFECT_EX: u8 = 0x26;
    pub const CALIBRATE: u8 = 0xFC;
}

/// Constant resistance from a start position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousResistance {
    start_position: u8,
    force: u8,
}

/// Resistance between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionResistance {
    start_position: u8,
    end_position: u8,
}

/// Vibrating resistance profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectEx {
    start_position: u8,
    keep_effect: bool,
    begin_force: u8,
    middle_force: u8,
    end_force: u8,
    frequency: u8,
}

/// Adaptive trigger force-feedback program
///
/// Exactly one variant is active per trigger. Variant payloads have private
/// fields, so parameters can only be set through the factories below and
/// read back through accessors that return zero for parameters the active
/// variant does not own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriggerEffect {
    #[default]
    NoResistance,
    ContinuousResistance(ContinuousResistance),
    SectionResistance(SectionResistance),
    EffectEx(EffectEx),
    ReleaseAll,
    Calibrate,
}

impl TriggerEffect {
    pub fn no_resistance() -> Self {
        TriggerEffect::NoResistance
    }

    pub fn release_all() -> Self {
        TriggerEffect::ReleaseAll
    }

    pub fn calibrate() -> Self {
        TriggerEffect::Calibrate
    }

    /// Constant resistance starting at `start_position`
    pub fn continuous(start_position: u8, force: u8) -> Self {
        TriggerEffect::ContinuousResistance(ContinuousResistance {
            start_position,
            force,
        })
    }

    /// Resistance between two positions
    ///
    /// An end position before the start is raised to the start.
    pub fn section(start_position: u8, end_position: u8) -> Self {
        TriggerEffect::SectionResistance(SectionResistance {
            start_position,
            end_position: end_position.max(start_position),
        })
    }

    /// Vibrating resistance profile
    ///
    /// # Arguments
    ///
    /// * `start_position` - Trigger travel at which the effect begins
    /// * `keep_effect` - Keep vibrating once the trigger is fully pressed
    /// * `begin_force` / `middle_force` / `end_force` - Force along the travel
    /// * `frequency` - Vibration frequency
    pub fn effect_ex(
        start_position: u8,
        keep_effect: bool,
        begin_force: u8,
        middle_force: u8,
        end_force: u8,
        frequency: u8,
    ) -> Self {
        TriggerEffect::EffectEx(EffectEx {
            start_position,
            keep_effect,
            begin_force,
            middle_force,
            end_force,
            frequency,
        })
    }

    /// Discriminant byte written ahead of the parameter block
    pub fn discriminant(&self) -> u8 {
        match self {
            TriggerEffect::NoResistance => trigger_mode::NO_RESISTANCE,
            TriggerEffect::ContinuousResistance(_) => trigger_mode::CONTINUOUS_RESISTANCE,
            TriggerEffect::SectionResistance(_) => trigger_mode::SECTION_RESISTANCE,
            TriggerEffect::EffectEx(_) => trigger_mode::EFFECT_EX,
            TriggerEffect::ReleaseAll => trigger_mode::RELEASE_ALL,
            TriggerEffect::Calibrate => trigger_mode::CALIBRATE,
        }
    }

    /// Parameter block with only the bytes owned by the variant populated
    pub fn params(&self) -> [u8; TRIGGER_PARAM_BYTES] {
        let mut block = [0u8; TRIGGER_PARAM_BYTES];
        match self {
            TriggerEffect::ContinuousResistance(p) => {
                block[0] = p.start_position;
                block[1] = p.force;
            }
            TriggerEffect::SectionResistance(p) => {
                block[0] = p.start_position;
                block[1] = p.end_position;
            }
            TriggerEffect::EffectEx(p) => {
                block[0] = p.start_position;
                block[1] = u8::from(p.keep_effect);
                block[2] = p.begin_force;
                block[3] = p.middle_force;
                block[4] = p.end_force;
                block[5] = p.frequency;
            }
            TriggerEffect::NoResistance | TriggerEffect::ReleaseAll | TriggerEffect::Calibrate => {}
        }
        block
    }

    /// Rebuild an effect from its wire form
    ///
    /// Bytes the variant does not own are ignored.
    pub fn from_wire(
        discriminant: u8,
        params: &[u8; TRIGGER_PARAM_BYTES],
    ) -> Result<Self, DecodeError> {
        let effect = match discriminant {
            trigger_mode::NO_RESISTANCE => TriggerEffect::NoResistance,
            trigger_mode::CONTINUOUS_RESISTANCE => TriggerEffect::continuous(params[0], params[1]),
            trigger_mode::SECTION_RESISTANCE => TriggerEffect::section(params[0], params[1]),
            trigger_mode::EFFECT_EX => TriggerEffect::effect_ex(
                params[0],
                params[1] != 0,
                params[2],
                params[3],
                params[4],
                params[5],
            ),
            trigger_mode::RELEASE_ALL => TriggerEffect::ReleaseAll,
            trigger_mode::CALIBRATE => TriggerEffect::Calibrate,
            other => return Err(DecodeError::UnknownTriggerEffect(other)),
        };
        Ok(effect)
    }

    pub fn start_position(&self) -> u8 {
        match self {
            TriggerEffect::ContinuousResistance(p) => p.start_position,
            TriggerEffect::SectionResistance(p) => p.start_position,
            TriggerEffect::EffectEx(p) => p.start_position,
            _ => 0,
        }
    }

    pub fn force(&self) -> u8 {
        match self {
            TriggerEffect::ContinuousResistance(p) => p.force,
            _ => 0,
        }
    }

    pub fn end_position(&self) -> u8 {
        match self {
            TriggerEffect::SectionResistance(p) => p.end_position,
            _ => 0,
        }
    }

    pub fn keep_effect(&self) -> bool {
        match self {
            TriggerEffect::EffectEx(p) => p.keep_effect,
            _ => false,
        }
    }

    pub fn begin_force(&self) -> u8 {
        match self {
            TriggerEffect::EffectEx(p) => p.begin_force,
            _ => 0,
        }
    }

    pub fn middle_force(&self) -> u8 {
        match self {
            TriggerEffect::EffectEx(p) => p.middle_force,
            _ => 0,
        }
    }

    pub fn end_force(&self) -> u8 {
        match self {
            TriggerEffect::EffectEx(p) => p.end_force,
            _ => 0,
        }
    }

    pub fn frequency(&self) -> u8 {
        match self {
            TriggerEffect::EffectEx(p) => p.frequency,
            _ => 0,
        }
    }
}

/// Desired device output state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputState {
    /// Low-frequency (heavy) motor
    pub left_rumble: u8,
    /// High-frequency (light) motor
    pub right_rumble: u8,
    /// Overall rumble strength scalar
    pub rumble_strength: u8,
    pub mic_led: MicLed,
    pub disable_leds: bool,
    pub player_leds: PlayerLeds,
    pub lightbar: Color,
    pub left_trigger: TriggerEffect,
    pub right_trigger: TriggerEffect,
}

impl OutputState {
    /// Effect on one trigger
    pub fn trigger(&self, side: TriggerSide) -> &TriggerEffect {
        match side {
            TriggerSide::Left => &self.left_trigger,
            TriggerSide::Right => &self.right_trigger,
        }
    }

    /// Replace the effect on one trigger
    pub fn set_trigger(&mut self, side: TriggerSide, effect: TriggerEffect) {
        match side {
            TriggerSide::Left => self.left_trigger = effect,
            TriggerSide::Right => self.right_trigger = effect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_masks_are_distinct_single_bits() {
        let mut seen = 0u32;
        for button in Button::ALL {
            assert_eq!(button.mask().count_ones(), 1, "{:?} should be a single bit", button);
            assert_eq!(seen & button.mask(), 0, "{:?} overlaps another button", button);
            seen |= button.mask();
        }
        assert_eq!(seen, 0x0007_FFFF);
    }

    #[test]
    fn test_single_button_reports_only_itself() {
        let report = InputReport {
            buttons: Button::Cross.mask(),
            ..Default::default()
        };
        let pressed: Vec<Button> = report.pressed().collect();
        assert_eq!(pressed, vec![Button::Cross]);
    }

    #[test]
    fn test_continuous_hides_effect_ex_fields() {
        let effect = TriggerEffect::continuous(40, 200);
        assert_eq!(effect.start_position(), 40);
        assert_eq!(effect.force(), 200);
        assert_eq!(effect.begin_force(), 0);
        assert_eq!(effect.middle_force(), 0);
        assert_eq!(effect.end_force(), 0);
        assert_eq!(effect.frequency(), 0);
        assert!(!effect.keep_effect());
        assert_eq!(effect.end_position(), 0);
    }

    #[test]
    fn test_params_only_populate_owned_bytes() {
        let effect = TriggerEffect::continuous(10, 20);
        assert_eq!(effect.params(), [10, 20, 0, 0, 0, 0, 0, 0, 0, 0]);

        let effect = TriggerEffect::effect_ex(1, true, 2, 3, 4, 5);
        assert_eq!(effect.params(), [1, 1, 2, 3, 4, 5, 0, 0, 0, 0]);

        assert_eq!(TriggerEffect::calibrate().params(), [0; TRIGGER_PARAM_BYTES]);
    }

    #[test]
    fn test_section_end_never_before_start() {
        let effect = TriggerEffect::section(100, 20);
        assert_eq!(effect.start_position(), 100);
        assert_eq!(effect.end_position(), 100);
    }

    #[test]
    fn test_discriminants() {
        assert_eq!(TriggerEffect::no_resistance().discriminant(), 0x00);
        assert_eq!(TriggerEffect::continuous(0, 0).discriminant(), 0x01);
        assert_eq!(TriggerEffect::section(0, 0).discriminant(), 0x02);
        assert_eq!(TriggerEffect::release_all().discriminant(), 0x05);
        assert_eq!(TriggerEffect::effect_ex(0, false, 0, 0, 0, 0).discriminant(), 0x26);
        assert_eq!(TriggerEffect::calibrate().discriminant(), 0xFC);
    }

    #[test]
    fn test_from_wire_ignores_foreign_bytes() {
        let params = [7, 9, 0xAA, 0xBB, 0xCC, 0xDD, 1, 2, 3, 4];
        let effect = TriggerEffect::from_wire(trigger_mode::CONTINUOUS_RESISTANCE, &params).unwrap();
        assert_eq!(effect, TriggerEffect::continuous(7, 9));
        assert_eq!(effect.params(), [7, 9, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_from_wire_unknown_discriminant() {
        let result = TriggerEffect::from_wire(0x42, &[0; TRIGGER_PARAM_BYTES]);
        assert_eq!(result, Err(DecodeError::UnknownTriggerEffect(0x42)));
    }

    #[test]
    fn test_player_leds_for_player() {
        assert_eq!(PlayerLeds::for_player(0).bitmask, PLAYER_LED_LEFT);
        assert_eq!(PlayerLeds::for_player(2).bitmask, PLAYER_LED_MIDDLE);
        assert_eq!(PlayerLeds::for_player(9).bitmask, PLAYER_LED_RIGHT);
    }

    #[test]
    fn test_wire_enums() {
        assert_eq!(MicLed::from_wire(MicLed::Pulse.to_wire()), Ok(MicLed::Pulse));
        assert!(MicLed::from_wire(3).is_err());
        assert_eq!(LedBrightness::Low.to_wire(), 2);
        assert_eq!(LedBrightness::from_wire(0), Ok(LedBrightness::High));
    }

    #[test]
    fn test_output_state_trigger_sides() {
        let mut state = OutputState::default();
        state.set_trigger(TriggerSide::Right, TriggerEffect::release_all());
        assert_eq!(*state.trigger(TriggerSide::Right), TriggerEffect::ReleaseAll);
        assert_eq!(*state.trigger(TriggerSide::Left), TriggerEffect::NoResistance);
    }
}
