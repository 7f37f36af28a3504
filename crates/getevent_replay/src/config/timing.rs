//! Timing configuration for adb operations

use lazy_static::lazy_static;
use std::env;
use std::time::Duration;
use tracing::warn;

/// Seconds from `key`, falling back to `default` unless the value is a
/// usable duration
fn env_secs(key: &str, default: f64) -> f64 {
    match env::var(key) {
        Ok(v) => parse_secs(&v).unwrap_or_else(|| {
            warn!("Ignoring {}={:?}, using {}s", key, v, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_secs(value: &str) -> Option<f64> {
    let secs: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok().map(|_| secs)
}

/// Timeouts for one-shot adb commands
#[derive(Debug, Clone)]
pub struct CommandTimingConfig {
    pub list_timeout: f64,
    pub transfer_timeout: f64,
    pub shell_timeout: f64,
    pub replay_timeout: f64,
}

impl Default for CommandTimingConfig {
    fn default() -> Self {
        Self {
            list_timeout: env_secs("GETEVENT_LIST_TIMEOUT", 5.0),
            transfer_timeout: env_secs("GETEVENT_TRANSFER_TIMEOUT", 30.0),
            shell_timeout: env_secs("GETEVENT_SHELL_TIMEOUT", 10.0),
            replay_timeout: env_secs("GETEVENT_REPLAY_TIMEOUT", 600.0),
        }
    }
}

/// Timing for the long-running capture process
#[derive(Debug, Clone)]
pub struct CaptureTimingConfig {
    /// How long to wait for the capture process to exit after it was killed
    pub shutdown_grace: f64,
    /// Delay after spawning before the user is told recording has started
    pub startup_delay: f64,
}

impl Default for CaptureTimingConfig {
    fn default() -> Self {
        Self {
            shutdown_grace: env_secs("GETEVENT_SHUTDOWN_GRACE", 2.0),
            startup_delay: env_secs("GETEVENT_STARTUP_DELAY", 0.3),
        }
    }
}

/// Master timing configuration
#[derive(Debug, Clone, Default)]
pub struct TimingConfig {
    pub command: CommandTimingConfig,
    pub capture: CaptureTimingConfig,
}

lazy_static! {
    /// Global timing configuration instance
    pub static ref TIMING_CONFIG: TimingConfig = TimingConfig::default();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_secs_fallback() {
        assert_eq!(env_secs("GETEVENT_TEST_UNSET_TIMEOUT", 4.5), 4.5);
    }

    #[test]
    fn test_parse_secs_rejects_unusable_values() {
        assert_eq!(parse_secs("2.5"), Some(2.5));
        assert_eq!(parse_secs(" 0 "), Some(0.0));
        for bad in ["-1", "inf", "NaN", "1e300", "soon"] {
            assert_eq!(parse_secs(bad), None, "{}", bad);
        }
    }

    #[test]
    fn test_timing_defaults_positive() {
        let config = TimingConfig::default();
        assert!(config.command.transfer_timeout > 0.0);
        assert!(config.capture.shutdown_grace > 0.0);
    }
}
