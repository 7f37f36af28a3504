//! getevent_replay: record and replay Android input events over adb
//!
//! This library provides:
//! - ADB plumbing to stream raw `input_event` records from a rooted device
//! - A fixed-width record decoder driven by an explicit layout
//! - Grouping of records into clusters that control replay granularity
//! - Synthesis of a shell script that writes the events back to the device
//!
//! # Example
//!
//! ```no_run
//! use getevent_replay::{GeteventRecorder, RecorderConfig, StopCondition};
//!
//! #[tokio::main]
//! async fn main() -> getevent_replay::Result<()> {
//!     let config = RecorderConfig::new()
//!         .with_device("/dev/input/event3")
//!         .with_clusterevents(16);
//!
//!     let recorder = GeteventRecorder::new(config)?;
//!     let result = recorder.start_recording(StopCondition::Enter).await?;
//!     println!("{}", result.adb_command);
//!     recorder.replay(&result).await?;
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;

// Configuration module
pub mod config;

// Device plumbing
pub mod adb;

// Core functionality
pub mod capture_store;
pub mod events;
pub mod recorder;

// Re-export commonly used types and functions
pub use error::{ReplayError, Result};

// Config re-exports
pub use config::{
    describe_event, event_type_name, ByteOrder, FieldKind, FieldSpec, RecordLayout,
    RecorderConfig, TimingConfig, TIMING_CONFIG,
};

// ADB re-exports
pub use adb::{
    capture_args, list_devices, list_input_devices, start_capture, AdbConnection, DeviceInfo,
    InputDevice, StopCondition,
};

// Event re-exports
pub use events::{
    decode, group, normalize_crlf, split_reports, synthesize, ClusterSize, Decoder, EventCluster,
    EventRecord, LineKind, ReplayCommand, ReplayLine, ReplayMode, ReplayOptions, ReplayScript,
};

// Recorder re-exports
pub use capture_store::{load_capture, CaptureStore};
pub use recorder::{
    prepare_live_capture, process_capture, GeteventRecorder, ProcessedCapture, RecordingResult,
};
