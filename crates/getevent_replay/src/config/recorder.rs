//! Recorder configuration

use std::path::PathBuf;

use crate::config::RecordLayout;
use crate::error::Result;
use crate::events::{staged_cluster_path, ClusterSize, ReplayMode};

/// Configuration for a recording session and the replay script built from it
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Path to the adb binary
    pub adb_path: String,
    /// Device-side event node to record and replay into
    pub device: String,
    /// Serial of the target device; adb picks the only device when unset
    pub device_serial: Option<String>,
    /// Echo raw capture chunks to the console while recording
    pub print_output: bool,
    /// Device-side staging folder for block-write cluster files
    pub tmpfolder_device: String,
    /// Host-side staging folder for captures and cluster files
    pub tempfolder_hdd: PathBuf,
    /// Append a final sync sequence so replay ends in a released state
    pub add_closing_command: bool,
    /// Records per replay line; must be positive
    pub clusterevents: i64,
    pub layout: RecordLayout,
    pub replay_mode: ReplayMode,
    /// Capture through a pty (`adb shell -t`) and collapse its `\r\n` back to
    /// `\n`; off means the raw `exec-out` channel with no translation
    pub capture_pty: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            adb_path: "adb".to_string(),
            device: "/dev/input/event3".to_string(),
            device_serial: None,
            print_output: false,
            tmpfolder_device: "/sdcard/getevent_replay/".to_string(),
            tempfolder_hdd: std::env::temp_dir().join("getevent_replay"),
            add_closing_command: true,
            clusterevents: 16,
            layout: RecordLayout::default(),
            replay_mode: ReplayMode::default(),
            capture_pty: false,
        }
    }
}

impl RecorderConfig {
    /// Create a new RecorderConfig
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adb_path(mut self, adb_path: impl Into<String>) -> Self {
        self.adb_path = adb_path.into();
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_device_serial(mut self, serial: impl Into<String>) -> Self {
        self.device_serial = Some(serial.into());
        self
    }

    pub fn with_print_output(mut self, print_output: bool) -> Self {
        self.print_output = print_output;
        self
    }

    pub fn with_tmpfolder_device(mut self, folder: impl Into<String>) -> Self {
        self.tmpfolder_device = folder.into();
        self
    }

    pub fn with_tempfolder_hdd(mut self, folder: impl Into<PathBuf>) -> Self {
        self.tempfolder_hdd = folder.into();
        self
    }

    pub fn with_add_closing_command(mut self, add: bool) -> Self {
        self.add_closing_command = add;
        self
    }

    pub fn with_clusterevents(mut self, clusterevents: i64) -> Self {
        self.clusterevents = clusterevents;
        self
    }

    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_replay_mode(mut self, mode: ReplayMode) -> Self {
        self.replay_mode = mode;
        self
    }

    pub fn with_capture_pty(mut self, pty: bool) -> Self {
        self.capture_pty = pty;
        self
    }

    /// Validate the settings that would otherwise fail halfway through a run
    pub fn validate(&self) -> Result<ClusterSize> {
        let cluster_size = ClusterSize::new(self.clusterevents)?;
        self.layout.validate()?;
        Ok(cluster_size)
    }

    /// Device-side path of the staged file for one cluster
    pub fn device_cluster_path(&self, index: usize) -> String {
        staged_cluster_path(&self.tmpfolder_device, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplayError;

    #[test]
    fn test_recorder_config_default() {
        let config = RecorderConfig::default();
        assert_eq!(config.adb_path, "adb");
        assert_eq!(config.clusterevents, 16);
        assert!(config.add_closing_command);
        assert_eq!(config.replay_mode, ReplayMode::Sendevent);
        assert!(config.device_serial.is_none());
        assert!(!config.capture_pty);
    }

    #[test]
    fn test_recorder_config_builder() {
        let config = RecorderConfig::new()
            .with_device("/dev/input/event5")
            .with_device_serial("emulator-5554")
            .with_clusterevents(4)
            .with_add_closing_command(false)
            .with_layout(RecordLayout::ILP32);

        assert_eq!(config.device, "/dev/input/event5");
        assert_eq!(config.device_serial, Some("emulator-5554".to_string()));
        assert_eq!(config.clusterevents, 4);
        assert!(!config.add_closing_command);
        assert_eq!(config.layout, RecordLayout::ILP32);
    }

    #[test]
    fn test_validate_rejects_non_positive_cluster_size() {
        for bad in [0, -1] {
            let config = RecorderConfig::new().with_clusterevents(bad);
            assert!(matches!(
                config.validate(),
                Err(ReplayError::InvalidConfiguration(_))
            ));
        }
        assert_eq!(
            RecorderConfig::new().with_clusterevents(3).validate().unwrap().get(),
            3
        );
    }

    #[test]
    fn test_device_cluster_path() {
        let config = RecorderConfig::new().with_tmpfolder_device("/data/local/tmp/ev/");
        assert_eq!(config.device_cluster_path(2), "/data/local/tmp/ev/2.bin");
        let config = RecorderConfig::new().with_tmpfolder_device("/data/local/tmp/ev");
        assert_eq!(config.device_cluster_path(0), "/data/local/tmp/ev/0.bin");
    }
}
