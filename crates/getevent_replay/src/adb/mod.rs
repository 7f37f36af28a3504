//! ADB (Android Debug Bridge) module for capture and replay
//!
//! This module provides:
//! - `connection`: adb command plumbing (devices, shell, push, pull, scripts)
//! - `capture`: Streaming raw events from an input node
//! - `input_devices`: Listing input nodes via `getevent -p`

mod capture;
mod connection;
mod input_devices;

pub use capture::{capture_args, start_capture, StopCondition};
pub use connection::{list_devices, parse_device_list, AdbConnection, DeviceInfo};
pub use input_devices::{list_input_devices, parse_getevent_devices, InputDevice};
