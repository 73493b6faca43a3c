//! # DualSense Link
//!
//! Drive a PS5 DualSense controller over USB or Bluetooth HID.
//!
//! This application connects to the first controller found, polls its input
//! at the configured tick rate and runs output effects. Pressing Cross plays
//! a short rumble, which makes a quick end-to-end check of both directions.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use dualsense_link::capture::{CaptureRecord, CaptureWriter};
use dualsense_link::channel::hid::HidChannel;
use dualsense_link::config::Config;
use dualsense_link::controller::Controller;
use dualsense_link::effects::RumbleEffect;
use dualsense_link::report::protocol::{Button, InputReport};
use dualsense_link::session::Notification;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Ticks between status log messages
const LOG_INTERVAL_TICKS: u64 = 1000;

/// Rumble played when Cross is pressed
const CROSS_RUMBLE: (u8, u8) = (128, 200);
const CROSS_RUMBLE_DURATION: Duration = Duration::from_millis(500);

/// Main entry point
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml` if present)
///    - Set up logging
///    - Open hidapi and connect to the first DualSense
///
/// 2. **Main Loop**
///    - Tick the controller at `tick_rate_hz`: poll input, retry lost
///      connections, advance effects
///    - Rumble on a Cross press
///    - Write captures when enabled
///
/// 3. **Graceful Shutdown**
///    - On Ctrl+C end all effects and release the device
///
/// # Examples
///
/// ```bash
/// cargo run --release --features hid -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = dualsense_link::logging::init(&config.logging);

    info!("DualSense Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let channel = HidChannel::new().context("failed to initialise hidapi")?;
    let mut controller = Controller::new(channel, &config)?;

    let mut capture = if config.capture.enabled {
        Some(CaptureWriter::new(&config.capture)?)
    } else {
        None
    };

    if let Err(e) = controller.connect_first() {
        warn!("No controller yet ({}), waiting for one", e);
    }

    let period = config.effects.tick_period();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Polling at {}Hz", config.effects.tick_rate_hz);
    info!("Press Ctrl+C to exit");

    let mut tick_count: u64 = 0;
    let mut report_count: u64 = 0;
    let mut previous_buttons: u32 = 0;
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick);
                last_tick = now;
                tick_count += 1;

                if !controller.is_connected() && controller.session().device().is_none() {
                    // Nothing remembered to reconnect to; keep looking
                    if tick_count % LOG_INTERVAL_TICKS == 0 {
                        if let Err(e) = controller.connect_first() {
                            debug!("Still no controller: {}", e);
                        }
                    }
                }

                if let Some(report) = controller.tick(elapsed) {
                    report_count += 1;

                    if cross_pressed(previous_buttons, &report) {
                        let (low, high) = CROSS_RUMBLE;
                        let effect = RumbleEffect::new(low, high, CROSS_RUMBLE_DURATION, false);
                        if let Err(e) = controller.add_effect(Box::new(effect)) {
                            debug!("Cannot queue rumble: {}", e);
                        }
                    }
                    previous_buttons = report.buttons;

                    if let (Some(writer), Some(raw)) = (capture.as_mut(), controller.session().last_raw()) {
                        let format = controller.session().codec().format_id();
                        if let Err(e) = writer.write(&CaptureRecord::new(format, raw, report)) {
                            warn!("Capture write failed: {}", e);
                        }
                    }
                }

                for notification in controller.drain_notifications() {
                    log_notification(&notification);
                }

                if tick_count % LOG_INTERVAL_TICKS == 0 {
                    info!("{} ticks, {} reports, state {}", tick_count, report_count, controller.state());
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    controller.close();
    if let Some(writer) = capture.as_mut() {
        writer.flush()?;
    }
    info!("Total reports received: {}", report_count);

    Ok(())
}

fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("failed to load {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::load(DEFAULT_CONFIG_PATH).context("failed to load default configuration")
        }
        None => Ok(Config::default()),
    }
}

/// Cross went from released to pressed
fn cross_pressed(previous_buttons: u32, report: &InputReport) -> bool {
    previous_buttons & Button::Cross.mask() == 0 && report.is_pressed(Button::Cross)
}

fn log_notification(notification: &Notification) {
    match notification {
        Notification::Connected { unique_id, connection } => {
            info!("Controller {:08X} connected via {}", unique_id, connection)
        }
        Notification::Disconnected { unique_id } => {
            warn!("Controller {:08X} disconnected", unique_id)
        }
        Notification::ConnectFailed(e) => debug!("Connect attempt failed: {}", e),
        Notification::IoFailed(e) => debug!("I/O failure: {}", e),
    }
}
