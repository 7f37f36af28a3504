//! Replay script synthesis
//!
//! Turns clusters into shell text for the device: one line per cluster, a sync
//! marker between clusters, and an optional closing sync sequence. Nothing in
//! here touches the device; the caller decides whether to send the script.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::{RecorderConfig, EV_SYN, SYN_MT_REPORT, SYN_REPORT};
use crate::error::{ReplayError, Result};
use crate::events::EventCluster;

/// How clusters are written back to the event node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ReplayMode {
    /// One `sendevent` per record
    #[default]
    Sendevent,
    /// One `dd` per cluster from a file staged on the device
    BlockWrite,
}

impl FromStr for ReplayMode {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sendevent" => Ok(Self::Sendevent),
            "block-write" | "blockwrite" | "dd" => Ok(Self::BlockWrite),
            other => Err(ReplayError::InvalidConfiguration(format!(
                "unknown replay mode: {}",
                other
            ))),
        }
    }
}

impl ReplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sendevent => "sendevent",
            Self::BlockWrite => "block-write",
        }
    }
}

/// A single shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReplayCommand {
    Send {
        device: String,
        event_type: u16,
        event_code: u16,
        event_value: i32,
    },
    BlockWrite {
        device: String,
        source: String,
        byte_count: usize,
    },
}

impl ReplayCommand {
    fn send(device: &str, event_type: u16, event_code: u16, event_value: i32) -> Self {
        Self::Send {
            device: device.to_string(),
            event_type,
            event_code,
            event_value,
        }
    }
}

impl fmt::Display for ReplayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send {
                device,
                event_type,
                event_code,
                event_value,
            } => write!(
                f,
                "sendevent {} {} {} {}",
                device, event_type, event_code, event_value
            ),
            Self::BlockWrite {
                device,
                source,
                byte_count,
            } => write!(f, "dd bs={} if={} of={}", byte_count, source, device),
        }
    }
}

/// Role of a logical line in the script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineKind {
    Data,
    Sync,
    Closing,
}

/// One logical script line; its commands run back to back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayLine {
    pub kind: LineKind,
    pub commands: Vec<ReplayCommand>,
}

impl ReplayLine {
    pub fn is_sync(&self) -> bool {
        matches!(self.kind, LineKind::Sync | LineKind::Closing)
    }
}

impl fmt::Display for ReplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", command)?;
        }
        Ok(())
    }
}

/// Inputs to the synthesizer
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub device: String,
    pub add_closing_command: bool,
    pub mode: ReplayMode,
    /// Device-side folder holding `<index>.bin` files for block writes
    pub staging_dir: String,
    /// Run the script inside a root shell
    pub su_wrap: bool,
}

impl ReplayOptions {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            add_closing_command: true,
            mode: ReplayMode::Sendevent,
            staging_dir: String::new(),
            su_wrap: true,
        }
    }

    pub fn from_config(config: &RecorderConfig) -> Self {
        Self {
            device: config.device.clone(),
            add_closing_command: config.add_closing_command,
            mode: config.replay_mode,
            staging_dir: config.tmpfolder_device.clone(),
            su_wrap: true,
        }
    }

    pub fn with_add_closing_command(mut self, add: bool) -> Self {
        self.add_closing_command = add;
        self
    }

    pub fn with_mode(mut self, mode: ReplayMode, staging_dir: impl Into<String>) -> Self {
        self.mode = mode;
        self.staging_dir = staging_dir.into();
        self
    }

    pub fn with_su_wrap(mut self, su_wrap: bool) -> Self {
        self.su_wrap = su_wrap;
        self
    }
}

/// Device-side path of the staged file for one cluster
pub fn staged_cluster_path(staging_dir: &str, index: usize) -> String {
    format!("{}/{}.bin", staging_dir.trim_end_matches('/'), index)
}

/// Synthesized replay script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayScript {
    pub lines: Vec<ReplayLine>,
    pub su_wrap: bool,
}

impl ReplayScript {
    /// The command lines only, newline-joined
    pub fn body(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full text to pipe into `adb shell`
    pub fn render(&self) -> String {
        if self.su_wrap {
            format!("su\n{}\nexit\n", self.body())
        } else {
            format!("{}\n", self.body())
        }
    }

    pub fn ends_with_sync(&self) -> bool {
        self.lines.last().map(ReplayLine::is_sync).unwrap_or(false)
    }
}

fn sync_line(device: &str) -> ReplayLine {
    ReplayLine {
        kind: LineKind::Sync,
        commands: vec![ReplayCommand::send(device, EV_SYN, SYN_REPORT, 0)],
    }
}

fn closing_line(device: &str) -> ReplayLine {
    ReplayLine {
        kind: LineKind::Closing,
        commands: vec![
            ReplayCommand::send(device, EV_SYN, SYN_REPORT, 0),
            ReplayCommand::send(device, EV_SYN, SYN_MT_REPORT, 0),
            ReplayCommand::send(device, EV_SYN, SYN_REPORT, 0),
        ],
    }
}

fn data_line(cluster: &EventCluster, options: &ReplayOptions) -> ReplayLine {
    let commands = match options.mode {
        ReplayMode::Sendevent => cluster
            .records
            .iter()
            .map(|r| ReplayCommand::send(&options.device, r.event_type, r.event_code, r.event_value))
            .collect(),
        ReplayMode::BlockWrite => vec![ReplayCommand::BlockWrite {
            device: options.device.clone(),
            source: staged_cluster_path(&options.staging_dir, cluster.index),
            byte_count: cluster.records.iter().map(|r| r.raw.len()).sum(),
        }],
    };

    ReplayLine {
        kind: LineKind::Data,
        commands,
    }
}

/// Build the replay script for a sequence of clusters
pub fn synthesize(clusters: &[EventCluster], options: &ReplayOptions) -> ReplayScript {
    let mut lines = Vec::with_capacity(clusters.len() * 2 + 1);

    for (i, cluster) in clusters.iter().enumerate() {
        if i > 0 {
            lines.push(sync_line(&options.device));
        }
        lines.push(data_line(cluster, options));
    }

    if options.add_closing_command {
        lines.push(closing_line(&options.device));
    }

    ReplayScript {
        lines,
        su_wrap: options.su_wrap,
    }
}
