//! ADB command plumbing for a single target device

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::{RecorderConfig, TIMING_CONFIG};
use crate::error::{ReplayError, Result};

/// Information about a connected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub status: String,
    pub model: Option<String>,
}

impl DeviceInfo {
    /// Whether adb reports the device as ready for commands
    pub fn is_ready(&self) -> bool {
        self.status == "device"
    }
}

/// Parse the output of `adb devices -l`
pub fn parse_device_list(stdout: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    // Skip header line
    for line in stdout.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('*') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let model = parts[2..]
            .iter()
            .find_map(|part| part.strip_prefix("model:"))
            .map(|s| s.to_string());

        devices.push(DeviceInfo {
            device_id: parts[0].to_string(),
            status: parts[1].to_string(),
            model,
        });
    }

    devices
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}{}", stdout, stderr).trim().to_string()
}

/// Builds and runs adb commands against one device
#[derive(Debug, Clone)]
pub struct AdbConnection {
    adb_path: String,
    serial: Option<String>,
}

impl AdbConnection {
    /// Create a connection using `adb` from PATH and no explicit serial
    pub fn new() -> Self {
        Self {
            adb_path: "adb".to_string(),
            serial: None,
        }
    }

    /// Create a connection with a custom adb binary
    pub fn with_path(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
            serial: None,
        }
    }

    /// Target a specific device serial
    pub fn with_serial(mut self, serial: Option<String>) -> Self {
        self.serial = serial;
        self
    }

    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::with_path(config.adb_path.clone()).with_serial(config.device_serial.clone())
    }

    pub fn adb_path(&self) -> &str {
        &self.adb_path
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// `adb [-s serial]` with nothing else attached
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd
    }

    /// Run a command to completion, failing on timeout or non-zero exit
    async fn run(&self, mut cmd: Command, timeout: f64, what: &str) -> Result<Output> {
        cmd.stdin(Stdio::null());
        debug!("Running adb {}", what);

        let output = tokio::time::timeout(Duration::from_secs_f64(timeout), cmd.output())
            .await
            .map_err(|_| ReplayError::Timeout(format!("{} timeout after {}s", what, timeout)))?
            .map_err(ReplayError::Io)?;

        if !output.status.success() {
            return Err(ReplayError::CommandFailed(format!(
                "{} exited with {}: {}",
                what,
                output.status,
                combined_output(&output)
            )));
        }

        Ok(output)
    }

    /// List all devices known to the adb server
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut cmd = Command::new(&self.adb_path);
        cmd.arg("devices").arg("-l");

        let output = self
            .run(cmd, TIMING_CONFIG.command.list_timeout, "devices")
            .await?;
        Ok(parse_device_list(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Check that the targeted device (or any device, without a serial) is ready
    pub async fn ensure_connected(&self) -> Result<()> {
        let devices = self.list_devices().await?;
        let ready = match &self.serial {
            Some(serial) => devices.iter().any(|d| &d.device_id == serial && d.is_ready()),
            None => devices.iter().any(DeviceInfo::is_ready),
        };

        if ready {
            Ok(())
        } else {
            Err(ReplayError::DeviceNotFound(
                self.serial.clone().unwrap_or_else(|| "no device attached".to_string()),
            ))
        }
    }

    /// Run a shell command on the device and return its stdout
    pub async fn shell(&self, args: &[&str]) -> Result<String> {
        let mut cmd = self.command();
        cmd.arg("shell").args(args);

        let output = self
            .run(cmd, TIMING_CONFIG.command.shell_timeout, &format!("shell {}", args.join(" ")))
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Create a directory on the device, parents included
    pub async fn make_device_dir(&self, path: &str) -> Result<()> {
        self.shell(&["mkdir", "-p", path]).await.map(|_| ())
    }

    /// Copy a device-side file to the host
    pub async fn pull_file(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("pull").arg(remote_path).arg(local_path);

        let output = self
            .run(cmd, TIMING_CONFIG.command.transfer_timeout, "pull")
            .await?;
        debug!("adb pull output: {}", combined_output(&output));

        if !local_path.exists() {
            return Err(ReplayError::CommandFailed(format!(
                "pull reported success but {} does not exist",
                local_path.display()
            )));
        }
        Ok(())
    }

    /// Copy a host file to the device
    pub async fn push_file(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("push").arg(local_path).arg(remote_path);

        let output = self
            .run(cmd, TIMING_CONFIG.command.transfer_timeout, "push")
            .await?;
        debug!("adb push output: {}", combined_output(&output));
        Ok(())
    }

    /// Feed a script to an `adb shell` session on stdin and wait for it to finish
    pub async fn run_script(&self, script: &str) -> Result<String> {
        let mut child = self
            .command()
            .arg("shell")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ReplayError::Io)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReplayError::CommandFailed("adb shell has no stdin".to_string()))?;
        stdin.write_all(script.as_bytes()).await?;
        stdin.shutdown().await?;
        drop(stdin);

        let timeout = TIMING_CONFIG.command.replay_timeout;
        let output = tokio::time::timeout(Duration::from_secs_f64(timeout), child.wait_with_output())
            .await
            .map_err(|_| ReplayError::Timeout(format!("replay timeout after {}s", timeout)))?
            .map_err(ReplayError::Io)?;

        let combined = combined_output(&output);
        if !output.status.success() {
            return Err(ReplayError::CommandFailed(format!(
                "replay shell exited with {}: {}",
                output.status, combined
            )));
        }
        Ok(combined)
    }
}

impl Default for AdbConnection {
    fn default() -> Self {
        Self::new()
    }
}

/// Quick helper to list connected devices with the default adb binary
pub async fn list_devices() -> Result<Vec<DeviceInfo>> {
    AdbConnection::new().list_devices().await
}
