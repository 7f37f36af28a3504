//! getevent-replay CLI - record Android input events and replay them
//!
//! Usage:
//!     getevent-replay [OPTIONS]
//!
//! Environment Variables:
//!     GETEVENT_ADB_PATH: Path to the adb binary (default: adb)
//!     GETEVENT_DEVICE_SERIAL: ADB serial for multi-device setups
//!     GETEVENT_DEVICE: Input event node to record (default: /dev/input/event3)
//!     GETEVENT_CLUSTER_EVENTS: Records per replay line (default: 16)
//!     RUST_LOG: Log filter, overrides -v

use anyhow::{anyhow, Result};
use clap::Parser;
use getevent_replay::{
    list_input_devices, AdbConnection, GeteventRecorder, RecordLayout, RecorderConfig,
    RecordingResult, ReplayError, ReplayMode, StopCondition,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Record raw input events from a rooted Android device and build a replay script
#[derive(Parser, Debug)]
#[command(name = "getevent-replay")]
#[command(about = "Record raw input events from a rooted Android device and replay them")]
#[command(after_help = r#"Examples:
    # Record from the default touch node until ENTER, print the replay script
    getevent-replay

    # Record a specific node on a specific device for 5 seconds and replay it
    getevent-replay -s emulator-5554 -d /dev/input/event2 --duration 5 --replay

    # Faster, coarser playback: 64 records per replay line
    getevent-replay --cluster-events 64 --replay

    # Replay with dd block writes staged on the device (32-bit kernel layout)
    getevent-replay --mode block-write --layout 32

    # Rebuild a script from a stored capture
    getevent-replay --input /tmp/getevent_replay/2026-01-01_10-00-00-000/capture.bin

    # List devices and their input nodes
    getevent-replay --list-devices
    getevent-replay --list-input-devices
"#)]
struct Cli {
    // Device options
    /// Path to the adb binary
    #[arg(long, env = "GETEVENT_ADB_PATH", default_value = "adb")]
    adb_path: String,

    /// ADB device serial
    #[arg(short = 's', long, env = "GETEVENT_DEVICE_SERIAL")]
    serial: Option<String>,

    /// Input event node to record and replay into
    #[arg(short = 'd', long, env = "GETEVENT_DEVICE", default_value = "/dev/input/event3")]
    device: String,

    /// List connected devices and exit
    #[arg(long)]
    list_devices: bool,

    /// List input event nodes on the device and exit
    #[arg(long)]
    list_input_devices: bool,

    // Capture options
    /// Stop recording after this many seconds instead of waiting for ENTER
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    duration: Option<f64>,

    /// Stop recording on Ctrl-C instead of ENTER
    #[arg(long, conflicts_with = "duration")]
    ctrl_c: bool,

    /// Echo raw capture bytes while recording
    #[arg(long)]
    print_output: bool,

    /// Capture through a pty (`adb shell -t`) and undo its `\r\n` translation
    #[arg(long)]
    pty: bool,

    /// Decode a stored capture file instead of recording
    #[arg(long, value_name = "FILE", conflicts_with = "pull")]
    input: Option<PathBuf>,

    /// Pull a capture file from the device and decode it instead of recording
    #[arg(long, value_name = "REMOTE_PATH")]
    pull: Option<String>,

    // Decode and replay options
    /// Kernel input_event layout: 64 (LP64) or 32 (ILP32)
    #[arg(long, default_value = "64", value_parser = ["64", "32", "lp64", "ilp32"])]
    layout: String,

    /// Records per replay line; 1 replays every record on its own line
    #[arg(
        short = 'c',
        long,
        env = "GETEVENT_CLUSTER_EVENTS",
        default_value = "16",
        allow_negative_numbers = true
    )]
    cluster_events: i64,

    /// Do not append the closing sync sequence
    #[arg(long)]
    no_closing_command: bool,

    /// Replay mode
    #[arg(long, default_value = "sendevent", value_parser = ["sendevent", "block-write"])]
    mode: String,

    /// Device-side staging folder for block-write cluster files
    #[arg(long, env = "GETEVENT_DEVICE_TMP", default_value = "/sdcard/getevent_replay/")]
    device_tmp: String,

    /// Host-side folder for captures and cluster files
    #[arg(long, env = "GETEVENT_HOST_TMP")]
    host_tmp: Option<PathBuf>,

    /// Send the generated script to the device
    #[arg(long)]
    replay: bool,

    /// Write the generated script to a file
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    // Output options
    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Print every decoded event
    #[arg(long)]
    print_events: bool,

    /// Suppress the summary and script output
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn stop_condition(&self) -> Result<StopCondition> {
        match (self.duration, self.ctrl_c) {
            (Some(secs), _) => Duration::try_from_secs_f64(secs)
                .map(StopCondition::After)
                .map_err(|_| {
                    anyhow::Error::from(ReplayError::InvalidConfiguration(format!(
                        "--duration must be a finite, non-negative number of seconds, got {}",
                        secs
                    )))
                }),
            (None, true) => Ok(StopCondition::CtrlC),
            (None, false) => Ok(StopCondition::Enter),
        }
    }

    /// Whether this run needs a device at all
    fn needs_device(&self) -> bool {
        self.input.is_none() || self.replay
    }

    fn recorder_config(&self) -> Result<RecorderConfig> {
        let mut config = RecorderConfig::new()
            .with_adb_path(&self.adb_path)
            .with_device(&self.device)
            .with_print_output(self.print_output)
            .with_tmpfolder_device(&self.device_tmp)
            .with_add_closing_command(!self.no_closing_command)
            .with_clusterevents(self.cluster_events)
            .with_layout(RecordLayout::from_name(&self.layout)?)
            .with_replay_mode(self.mode.parse::<ReplayMode>()?)
            .with_capture_pty(self.pty);

        if let Some(serial) = &self.serial {
            config = config.with_device_serial(serial);
        }
        if let Some(host_tmp) = &self.host_tmp {
            config = config.with_tempfolder_hdd(host_tmp);
        }

        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "getevent_replay={level},getevent_cli={level},warn"
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Check that adb is installed and the device is reachable
async fn check_system_requirements(conn: &AdbConnection) -> bool {
    println!("\u{1F50D} Checking system requirements...");
    println!("{}", "-".repeat(50));

    // Check 1: adb installed
    print!("1. Checking ADB installation... ");
    io::stdout().flush().ok();

    if which::which(conn.adb_path()).is_err() {
        println!("\u{274C} FAILED");
        println!("   Error: {} is not installed or not in PATH.", conn.adb_path());
        println!("   Solution: Install ADB:");
        println!("     - macOS: brew install android-platform-tools");
        println!("     - Linux: sudo apt install android-tools-adb");
        println!(
            "     - Windows: Download from https://developer.android.com/studio/releases/platform-tools"
        );
        println!("{}", "-".repeat(50));
        return false;
    }

    let version_result = tokio::time::timeout(
        Duration::from_secs(10),
        Command::new(conn.adb_path()).arg("version").output(),
    )
    .await;

    match version_result {
        Ok(Ok(output)) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version_line = stdout.lines().next().unwrap_or("installed");
            println!("\u{2705} OK ({})", version_line);
        }
        Ok(Ok(_)) => {
            println!("\u{274C} FAILED");
            println!("   Error: ADB command failed to run.");
            return false;
        }
        Ok(Err(_)) => {
            println!("\u{274C} FAILED");
            println!("   Error: ADB command not found.");
            return false;
        }
        Err(_) => {
            println!("\u{274C} FAILED");
            println!("   Error: ADB command timed out.");
            return false;
        }
    }

    // Check 2: device connected
    print!("2. Checking connected devices... ");
    io::stdout().flush().ok();

    match conn.ensure_connected().await {
        Ok(()) => {
            println!(
                "\u{2705} OK ({})",
                conn.serial().unwrap_or("default device")
            );
        }
        Err(e) => {
            println!("\u{274C} FAILED");
            println!("   Error: {}", e);
            println!("   Solution:");
            println!("     1. Enable USB debugging on your Android device");
            println!("     2. Connect via USB and authorize the connection");
            println!("     3. Pass --serial when more than one device is attached");
            println!("{}", "-".repeat(50));
            return false;
        }
    }

    println!("{}", "-".repeat(50));
    println!("\u{2705} All system checks passed!\n");
    true
}

/// Handle listing commands; returns true when the program should exit
async fn handle_device_commands(args: &Cli, conn: &AdbConnection) -> Result<bool> {
    if args.list_devices {
        let devices = conn.list_devices().await?;
        if devices.is_empty() {
            println!("No devices connected.");
        } else {
            println!("Connected devices:");
            println!("{}", "-".repeat(60));
            for device in devices {
                let status_icon = if device.is_ready() {
                    "\u{2713}"
                } else {
                    "\u{2717}"
                };
                let model_info = device
                    .model
                    .map(|m| format!(" ({})", m))
                    .unwrap_or_default();
                println!(
                    "  {} {:<30} [{}]{}",
                    status_icon, device.device_id, device.status, model_info
                );
            }
        }
        return Ok(true);
    }

    if args.list_input_devices {
        let devices = list_input_devices(conn).await?;
        if devices.is_empty() {
            println!("No input devices reported by getevent.");
        } else {
            println!("Input devices:");
            println!("{}", "-".repeat(60));
            for device in devices {
                let touch = if device.is_touchscreen() { " [touch]" } else { "" };
                println!(
                    "  {:<22} {:<30} {}{}",
                    device.path,
                    format!("\"{}\"", device.name),
                    device.event_types.join(","),
                    touch
                );
            }
        }
        return Ok(true);
    }

    Ok(false)
}

/// Print run header
fn print_header(args: &Cli, config: &RecorderConfig) {
    println!("{}", "=".repeat(50));
    println!("getevent-replay - Android input event record & replay");
    println!("{}", "=".repeat(50));
    println!("Event node: {}", config.device);
    if let Some(serial) = &config.device_serial {
        println!("Device: {}", serial);
    }
    println!("Layout: {} ({} bytes/record)", config.layout.name, config.layout.record_size);
    println!("Cluster events: {}", config.clusterevents);
    println!("Replay mode: {}", config.replay_mode.as_str());
    println!("Closing command: {}", config.add_closing_command);
    if let Some(input) = &args.input {
        println!("Input: {}", input.display());
    }
    if let Some(remote) = &args.pull {
        println!("Pull: {}", remote);
    }
    println!("Host staging: {}", config.tempfolder_hdd.display());
    println!("{}", "=".repeat(50));
}

/// Print a short summary of a processed recording
fn print_summary(result: &RecordingResult) {
    println!("\nRecording summary:");
    println!("{}", "-".repeat(50));
    if let Some(path) = &result.capture_path {
        println!("  Capture: {}", path.display());
    }
    println!("  Records: {}", result.records.len());
    println!("  Clusters: {}", result.clusters.len());
    println!("  Script lines: {}", result.script.lines.len());
    if result.dropped_bytes > 0 {
        println!("  Partial record bytes ignored: {}", result.dropped_bytes);
    }
    for file in &result.files_on_pc {
        println!("  Staged: {}", file.display());
    }
    println!("{}", "-".repeat(50));
}

async fn obtain_result(
    args: &Cli,
    recorder: &GeteventRecorder,
    stop: StopCondition,
) -> Result<RecordingResult> {
    if let Some(input) = &args.input {
        return Ok(recorder.from_stored_capture(input).await?);
    }
    if let Some(remote) = &args.pull {
        return Ok(recorder.from_device_file(remote).await?);
    }

    println!("\u{23FA} Recording {} ... {}", recorder.config().device, stop.prompt());
    Ok(recorder.start_recording(stop).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    // Invalid configuration fails here, before adb is touched
    let config = args.recorder_config()?;
    let recorder = GeteventRecorder::new(config)?;
    let stop = args.stop_condition()?;
    let conn = recorder.connection().clone();

    if handle_device_commands(&args, &conn).await? {
        return Ok(());
    }

    if args.needs_device() && !check_system_requirements(&conn).await {
        std::process::exit(1);
    }

    if !args.quiet && !args.json {
        print_header(&args, recorder.config());
    }

    let result = obtain_result(&args, &recorder, stop).await?;
    debug!("Recording produced {} payload bytes", result.payload_bytes);

    if result.records.is_empty() {
        return Err(anyhow!(
            "no complete events were captured from {}",
            recorder.config().device
        ));
    }

    if args.print_events {
        for record in &result.records {
            println!("{}", record.describe());
        }
    }

    if let Some(output) = &args.output {
        tokio::fs::write(output, &result.adb_command).await?;
        info!("Replay script written to {}", output.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !args.quiet {
        print_summary(&result);
        println!("\nReplay script:\n{}", result.adb_command);
    }

    if args.replay {
        println!("\u{25B6} Replaying on device...");
        let output = recorder.replay(&result).await?;
        if !output.is_empty() {
            println!("{}", output);
        }
        println!("\u{2713} Replay finished");
    }

    Ok(())
}
