//! Discovery of input event nodes via `getevent -p`

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::adb::AdbConnection;
use crate::error::Result;

const ABS_MT_POSITION_X: u16 = 0x35;

lazy_static! {
    static ref DEVICE_RE: Regex = Regex::new(r"^add device (\d+): (\S+)").unwrap();
    static ref NAME_RE: Regex = Regex::new(r#"^\s+name:\s+"(.*)""#).unwrap();
    static ref EVENT_TYPE_RE: Regex =
        Regex::new(r"^\s+([A-Z_]+)\s+\(([0-9a-fA-F]{4})\):\s*(.*)$").unwrap();
    static ref CODE_RE: Regex = Regex::new(r"\b([0-9a-fA-F]{4})\b").unwrap();
}

/// One `/dev/input/eventN` node as reported by `getevent -p`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputDevice {
    pub index: u32,
    pub path: String,
    pub name: String,
    /// Supported event types, e.g. `KEY`, `ABS`
    pub event_types: Vec<String>,
    /// Supported absolute axis codes
    pub abs_codes: Vec<u16>,
}

impl InputDevice {
    /// Multi-touch screens report `ABS_MT_POSITION_X`
    pub fn is_touchscreen(&self) -> bool {
        self.abs_codes.contains(&ABS_MT_POSITION_X)
    }
}

/// Parse `getevent -p` output into devices
pub fn parse_getevent_devices(output: &str) -> Vec<InputDevice> {
    let mut devices: Vec<InputDevice> = Vec::new();
    let mut section: Option<String> = None;

    for line in output.lines() {
        if let Some(caps) = DEVICE_RE.captures(line) {
            devices.push(InputDevice {
                index: caps[1].parse().unwrap_or(0),
                path: caps[2].to_string(),
                name: String::new(),
                event_types: Vec::new(),
                abs_codes: Vec::new(),
            });
            section = None;
            continue;
        }

        let Some(device) = devices.last_mut() else {
            continue;
        };

        if let Some(caps) = NAME_RE.captures(line) {
            device.name = caps[1].to_string();
            continue;
        }

        let codes_part = if let Some(caps) = EVENT_TYPE_RE.captures(line) {
            let event_type = caps[1].to_string();
            device.event_types.push(event_type.clone());
            section = Some(event_type);
            caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default()
        } else if line.trim_end().ends_with(':') && !line.starts_with("        ") {
            // `input props:` and similar headers close the events block
            section = None;
            continue;
        } else {
            line.to_string()
        };

        if section.as_deref() == Some("ABS") {
            // ABS lines are `<code>  : value ..., min ..., max ...`
            if let Some(code) = codes_part
                .split(':')
                .next()
                .and_then(|head| CODE_RE.captures(head))
                .and_then(|caps| u16::from_str_radix(&caps[1], 16).ok())
            {
                device.abs_codes.push(code);
            }
        }
    }

    devices
}

/// List the input event nodes on the device
pub async fn list_input_devices(conn: &AdbConnection) -> Result<Vec<InputDevice>> {
    let output = conn.shell(&["getevent", "-p"]).await?;
    Ok(parse_getevent_devices(&output))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"add device 1: /dev/input/event4
  bus:      0000
  vendor    0000
  product   0000
  version   0000
  name:     "sec_touchscreen"
  location: "sec_touchscreen/input1"
  id:       ""
  version:  1.0.1
  events:
    KEY (0001): 0145  014a
    ABS (0003): 0035  : value 0, min 0, max 1079, fuzz 0, flat 0, resolution 0
                0036  : value 0, min 0, max 2399, fuzz 0, flat 0, resolution 0
                0039  : value 0, min 0, max 65535, fuzz 0, flat 0, resolution 0
  input props:
    INPUT_PROP_DIRECT
add device 2: /dev/input/event0
  bus:      0000
  name:     "qpnp_pon"
  events:
    KEY (0001): 0072  0074
  input props:
    <none>
"#;

    #[test]
    fn test_parse_getevent_devices() {
        let devices = parse_getevent_devices(SAMPLE);
        assert_eq!(devices.len(), 2);

        let touch = &devices[0];
        assert_eq!(touch.index, 1);
        assert_eq!(touch.path, "/dev/input/event4");
        assert_eq!(touch.name, "sec_touchscreen");
        assert_eq!(touch.event_types, vec!["KEY".to_string(), "ABS".to_string()]);
        assert_eq!(touch.abs_codes, vec![0x35, 0x36, 0x39]);
        assert!(touch.is_touchscreen());

        let power = &devices[1];
        assert_eq!(power.path, "/dev/input/event0");
        assert_eq!(power.name, "qpnp_pon");
        assert!(power.abs_codes.is_empty());
        assert!(!power.is_touchscreen());
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_getevent_devices("").is_empty());
        assert!(parse_getevent_devices("could not open /dev/input\n").is_empty());
    }
}
