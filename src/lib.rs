//! # DualSense Link Library
//!
//! Talk to a PS5 DualSense controller over USB or Bluetooth HID.
//!
//! This library provides the report codec (input decoding and output
//! encoding against configurable offset tables), a device session with
//! connection management, and a scheduler for timed output effects such as
//! rumble bursts and lightbar flashes.

pub mod capture;
pub mod channel;
pub mod config;
pub mod controller;
pub mod effects;
pub mod error;
pub mod logging;
pub mod report;
pub mod session;
