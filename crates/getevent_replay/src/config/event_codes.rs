//! Linux input event type and sync code names

use phf::phf_map;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;

pub const SYN_REPORT: u16 = 0;
pub const SYN_MT_REPORT: u16 = 2;

/// Event type names from `linux/input-event-codes.h`
pub static EVENT_TYPE_NAMES: phf::Map<u16, &'static str> = phf_map! {
    0x00u16 => "EV_SYN",
    0x01u16 => "EV_KEY",
    0x02u16 => "EV_REL",
    0x03u16 => "EV_ABS",
    0x04u16 => "EV_MSC",
    0x05u16 => "EV_SW",
    0x11u16 => "EV_LED",
    0x12u16 => "EV_SND",
    0x14u16 => "EV_REP",
    0x15u16 => "EV_FF",
    0x16u16 => "EV_PWR",
    0x17u16 => "EV_FF_STATUS",
};

/// Code names for `EV_SYN` events
pub static SYN_CODE_NAMES: phf::Map<u16, &'static str> = phf_map! {
    0u16 => "SYN_REPORT",
    1u16 => "SYN_CONFIG",
    2u16 => "SYN_MT_REPORT",
    3u16 => "SYN_DROPPED",
};

/// Get the symbolic name of an event type, if known
pub fn event_type_name(event_type: u16) -> Option<&'static str> {
    EVENT_TYPE_NAMES.get(&event_type).copied()
}

/// Format an event type and code the way `getevent -l` labels them
///
/// Unknown values fall back to four-digit hex.
pub fn describe_event(event_type: u16, event_code: u16) -> (String, String) {
    let type_label = match event_type_name(event_type) {
        Some(name) => name.to_string(),
        None => format!("{:04x}", event_type),
    };
    let code_label = match (event_type, SYN_CODE_NAMES.get(&event_code)) {
        (EV_SYN, Some(name)) => name.to_string(),
        _ => format!("{:04x}", event_code),
    };
    (type_label, code_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_name() {
        assert_eq!(event_type_name(EV_KEY), Some("EV_KEY"));
        assert_eq!(event_type_name(EV_ABS), Some("EV_ABS"));
        assert_eq!(event_type_name(0x1f), None);
    }

    #[test]
    fn test_describe_event() {
        assert_eq!(
            describe_event(EV_SYN, SYN_MT_REPORT),
            ("EV_SYN".to_string(), "SYN_MT_REPORT".to_string())
        );
        assert_eq!(
            describe_event(EV_ABS, 0x35),
            ("EV_ABS".to_string(), "0035".to_string())
        );
        assert_eq!(
            describe_event(0x1f, 2),
            ("001f".to_string(), "0002".to_string())
        );
    }
}
