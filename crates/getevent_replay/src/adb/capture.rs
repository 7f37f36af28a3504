//! Live capture of an input event node over `adb shell`

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::adb::AdbConnection;
use crate::config::TIMING_CONFIG;
use crate::error::{ReplayError, Result};

const READ_CHUNK: usize = 4096;

/// When to stop a running capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// A line on stdin (the user presses ENTER)
    Enter,
    /// A fixed recording length
    After(Duration),
    /// SIGINT / Ctrl-C
    CtrlC,
}

impl StopCondition {
    /// Resolve once the condition is met
    pub async fn wait(self) {
        match self {
            Self::Enter => {
                let mut line = String::new();
                let mut stdin = BufReader::new(tokio::io::stdin());
                if let Err(e) = stdin.read_line(&mut line).await {
                    warn!("Failed to read stdin, stopping capture: {}", e);
                }
            }
            Self::After(duration) => tokio::time::sleep(duration).await,
            Self::CtrlC => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C, stopping capture: {}", e);
                }
            }
        }
    }

    /// Prompt shown to the user while recording
    pub fn prompt(&self) -> String {
        match self {
            Self::Enter => "Press ENTER to stop".to_string(),
            Self::After(duration) => format!("Recording for {:.1}s", duration.as_secs_f64()),
            Self::CtrlC => "Press Ctrl-C to stop".to_string(),
        }
    }
}

/// Arguments after `adb [-s serial]` for a capture of `device`
///
/// `exec-out` is a raw channel. A pty (`shell -t`) translates `\n` to `\r\n`
/// and the caller has to undo that.
pub fn capture_args(device: &str, pty: bool) -> Vec<&str> {
    let mut args = if pty {
        vec!["shell", "-t"]
    } else {
        vec!["exec-out"]
    };
    args.extend(["su", "--", "cat", device]);
    args
}

/// Stream raw bytes from `device` until `stop` resolves or the stream ends
///
/// Runs `su -- cat <device>` on the device, so it must be rooted. The
/// capture process is killed once recording stops.
pub async fn start_capture<F>(
    conn: &AdbConnection,
    device: &str,
    pty: bool,
    print_output: bool,
    stop: F,
) -> Result<Vec<u8>>
where
    F: Future<Output = ()>,
{
    let mut child = conn
        .command()
        .args(capture_args(device, pty))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(ReplayError::Io)?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ReplayError::CommandFailed("capture process has no stdout".to_string()))?;

    info!("Capturing events from {}", device);
    tokio::time::sleep(Duration::from_secs_f64(
        TIMING_CONFIG.capture.startup_delay,
    ))
    .await;

    let mut data = Vec::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut stream_ended = false;
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => {
                debug!("Stop condition reached");
                break;
            }
            read = stdout.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    stream_ended = true;
                    break;
                }
                if print_output {
                    println!("{:02x?}", &buf[..n]);
                }
                data.extend_from_slice(&buf[..n]);
            }
        }
    }

    if !stream_ended {
        if let Err(e) = child.start_kill() {
            warn!("Failed to kill capture process: {}", e);
        }
    }

    let grace = TIMING_CONFIG.capture.shutdown_grace;
    match tokio::time::timeout(Duration::from_secs_f64(grace), child.wait()).await {
        Ok(Ok(status)) if stream_ended && !status.success() && data.is_empty() => {
            return Err(ReplayError::CommandFailed(format!(
                "capture of {} exited with {} before producing data (is the device rooted?)",
                device, status
            )));
        }
        Ok(Ok(status)) => debug!("Capture process exited with {}", status),
        Ok(Err(e)) => warn!("Failed to reap capture process: {}", e),
        Err(_) => warn!("Capture process still running after {}s", grace),
    }

    info!("Captured {} bytes from {}", data.len(), device);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_condition_prompt() {
        assert_eq!(StopCondition::Enter.prompt(), "Press ENTER to stop");
        assert_eq!(
            StopCondition::After(Duration::from_millis(2500)).prompt(),
            "Recording for 2.5s"
        );
    }

    #[test]
    fn test_capture_args() {
        assert_eq!(
            capture_args("/dev/input/event2", false),
            vec!["exec-out", "su", "--", "cat", "/dev/input/event2"]
        );
        assert_eq!(
            capture_args("/dev/input/event2", true),
            vec!["shell", "-t", "su", "--", "cat", "/dev/input/event2"]
        );
    }

    #[tokio::test]
    async fn test_stop_after_resolves() {
        tokio::time::timeout(
            Duration::from_secs(2),
            StopCondition::After(Duration::from_millis(10)).wait(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_capture_with_missing_adb_fails() {
        let conn = AdbConnection::with_path("/nonexistent/adb-binary");
        let result = start_capture(&conn, "/dev/input/event0", false, false, async {}).await;
        assert!(matches!(result, Err(ReplayError::Io(_))));
    }
}
