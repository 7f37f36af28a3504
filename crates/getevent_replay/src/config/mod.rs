//! Configuration module for getevent_replay
//!
//! This module contains:
//! - `layout`: Binary record layouts for `input_event`
//! - `recorder`: Recording and replay settings
//! - `timing`: Timeouts for adb operations
//! - `event_codes`: Input event type and code names

mod event_codes;
mod layout;
mod recorder;
mod timing;

pub use event_codes::{
    describe_event, event_type_name, EVENT_TYPE_NAMES, EV_ABS, EV_KEY, EV_SYN, SYN_CODE_NAMES,
    SYN_MT_REPORT, SYN_REPORT,
};
pub use layout::{ByteOrder, FieldKind, FieldSpec, RecordLayout};
pub use recorder::RecorderConfig;
pub use timing::{CaptureTimingConfig, CommandTimingConfig, TimingConfig, TIMING_CONFIG};
