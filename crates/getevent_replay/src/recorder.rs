//! Recording sessions: capture, decode, cluster and build the replay script

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::adb::{start_capture, AdbConnection, StopCondition};
use crate::capture_store::{load_capture, CaptureStore, CAPTURE_FILE_NAME};
use crate::config::RecorderConfig;
use crate::error::Result;
use crate::events::{
    decode, group, normalize_crlf, split_reports, synthesize, ClusterSize, EventCluster,
    EventRecord, ReplayMode, ReplayOptions, ReplayScript,
};

/// Decoded capture and the script built from it, before anything is staged
#[derive(Debug, Clone)]
pub struct ProcessedCapture {
    pub records: Vec<EventRecord>,
    pub clusters: Vec<EventCluster>,
    pub script: ReplayScript,
    /// Bytes of a trailing partial record that were ignored
    pub dropped_bytes: usize,
}

/// Undo pty line-ending translation; raw `exec-out` captures pass through
pub fn prepare_live_capture(raw: Vec<u8>, config: &RecorderConfig) -> Vec<u8> {
    if config.capture_pty {
        normalize_crlf(&raw)
    } else {
        raw
    }
}

/// Decode a capture and synthesize its replay script
///
/// Configuration is validated before a single byte is decoded.
pub fn process_capture(data: &[u8], config: &RecorderConfig) -> Result<ProcessedCapture> {
    let cluster_size = config.validate()?;
    Ok(process_validated(data, config, cluster_size))
}

fn process_validated(
    data: &[u8],
    config: &RecorderConfig,
    cluster_size: ClusterSize,
) -> ProcessedCapture {
    let decoder = decode(data, &config.layout);
    let dropped_bytes = decoder.remainder_len();
    if dropped_bytes > 0 {
        debug!("Ignoring {} trailing bytes of a partial record", dropped_bytes);
    }

    let records: Vec<EventRecord> = decoder.collect();
    let clusters = group(records.iter().cloned(), cluster_size);
    let script = synthesize(&clusters, &ReplayOptions::from_config(config));

    debug!(
        "Decoded {} records into {} clusters ({} script lines)",
        records.len(),
        clusters.len(),
        script.lines.len()
    );

    ProcessedCapture {
        records,
        clusters,
        script,
        dropped_bytes,
    }
}

/// Everything a recording produced
#[derive(Debug, Clone, Serialize)]
pub struct RecordingResult {
    #[serde(rename = "parseddata")]
    pub records: Vec<EventRecord>,
    /// Records split into input reports, each ending at a `SYN_REPORT`
    #[serde(rename = "singleevents")]
    pub reports: Vec<Vec<EventRecord>>,
    #[serde(rename = "clusteredevents")]
    pub clusters: Vec<EventCluster>,
    /// Host-side cluster files staged for block writes
    #[serde(rename = "filesnames_pc")]
    pub files_on_pc: Vec<PathBuf>,
    /// Script text to pipe into `adb shell`
    #[serde(rename = "adbcommand")]
    pub adb_command: String,
    /// Raw bytes of all clusters, in replay order
    pub payload: Vec<u8>,
    pub payload_bytes: usize,
    pub capture_path: Option<PathBuf>,
    pub dropped_bytes: usize,
    #[serde(skip)]
    pub script: ReplayScript,
}

/// Records input events from a device and prepares them for replay
pub struct GeteventRecorder {
    config: RecorderConfig,
    cluster_size: ClusterSize,
    conn: AdbConnection,
}

impl GeteventRecorder {
    /// Create a recorder; fails on invalid configuration before touching adb
    pub fn new(config: RecorderConfig) -> Result<Self> {
        let cluster_size = config.validate()?;
        let conn = AdbConnection::from_config(&config);
        Ok(Self {
            config,
            cluster_size,
            conn,
        })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn connection(&self) -> &AdbConnection {
        &self.conn
    }

    /// Capture from the device until `stop`, then decode and build the script
    pub async fn start_recording(&self, stop: StopCondition) -> Result<RecordingResult> {
        self.conn.ensure_connected().await?;

        let raw = start_capture(
            &self.conn,
            &self.config.device,
            self.config.capture_pty,
            self.config.print_output,
            stop.wait(),
        )
        .await?;
        let data = prepare_live_capture(raw, &self.config);

        let store = CaptureStore::new(&self.config.tempfolder_hdd).await?;
        let capture_path = store.save_capture(&data).await?;
        self.finish(&data, store, Some(capture_path)).await
    }

    /// Decode a capture already held in memory
    pub async fn process(&self, data: &[u8]) -> Result<RecordingResult> {
        let store = CaptureStore::new(&self.config.tempfolder_hdd).await?;
        self.finish(data, store, None).await
    }

    /// Decode a capture previously written to disk
    pub async fn from_stored_capture(&self, path: impl AsRef<Path>) -> Result<RecordingResult> {
        let path = path.as_ref();
        let data = load_capture(path).await?;
        let store = CaptureStore::new(&self.config.tempfolder_hdd).await?;
        self.finish(&data, store, Some(path.to_path_buf())).await
    }

    /// Pull a capture file from the device, then decode it
    pub async fn from_device_file(&self, remote_path: &str) -> Result<RecordingResult> {
        let store = CaptureStore::new(&self.config.tempfolder_hdd).await?;
        let local_path = store.session_dir().join(CAPTURE_FILE_NAME);
        self.conn.pull_file(remote_path, &local_path).await?;

        let data = load_capture(&local_path).await?;
        self.finish(&data, store, Some(local_path)).await
    }

    /// Send the generated script to the device
    ///
    /// In block-write mode the staged cluster files are pushed first.
    pub async fn replay(&self, result: &RecordingResult) -> Result<String> {
        if self.config.replay_mode == ReplayMode::BlockWrite {
            self.push_clusters(result).await?;
        }

        info!(
            "Replaying {} records to {}",
            result.records.len(),
            self.config.device
        );
        self.conn.run_script(&result.adb_command).await
    }

    async fn finish(
        &self,
        data: &[u8],
        store: CaptureStore,
        capture_path: Option<PathBuf>,
    ) -> Result<RecordingResult> {
        let processed = process_validated(data, &self.config, self.cluster_size);

        let files_on_pc = match self.config.replay_mode {
            ReplayMode::BlockWrite => self.stage_clusters(&processed.clusters, &store).await?,
            ReplayMode::Sendevent => Vec::new(),
        };

        let payload: Vec<u8> = processed
            .clusters
            .iter()
            .flat_map(EventCluster::raw_bytes)
            .collect();

        Ok(RecordingResult {
            reports: split_reports(&processed.records),
            adb_command: processed.script.render(),
            payload_bytes: payload.len(),
            payload,
            records: processed.records,
            clusters: processed.clusters,
            files_on_pc,
            capture_path,
            dropped_bytes: processed.dropped_bytes,
            script: processed.script,
        })
    }

    /// Write each cluster to `<index>.bin` in the session directory
    async fn stage_clusters(
        &self,
        clusters: &[EventCluster],
        store: &CaptureStore,
    ) -> Result<Vec<PathBuf>> {
        let mut files = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            files.push(store.save_cluster(cluster.index, &cluster.raw_bytes()).await?);
        }

        debug!("Staged {} cluster files on the host", files.len());
        Ok(files)
    }

    /// Push staged cluster files to the device folder the script reads from
    async fn push_clusters(&self, result: &RecordingResult) -> Result<()> {
        if result.files_on_pc.is_empty() {
            return Ok(());
        }

        self.conn
            .make_device_dir(&self.config.tmpfolder_device)
            .await?;

        for (cluster, path) in result.clusters.iter().zip(&result.files_on_pc) {
            self.conn
                .push_file(path, &self.config.device_cluster_path(cluster.index))
                .await?;
        }

        info!("Pushed {} cluster files to the device", result.files_on_pc.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordLayout;
    use crate::error::ReplayError;
    use crate::events::LineKind;
    use tempfile::tempdir;

    fn scenario_capture() -> Vec<u8> {
        let layout = RecordLayout::LP64;
        [
            EventRecord::new(&layout, 0, 0, 1, 1, 1),
            EventRecord::new(&layout, 0, 100_000, 1, 1, 0),
            EventRecord::new(&layout, 0, 200_000, 0, 0, 0),
        ]
        .iter()
        .flat_map(|r| r.raw.clone())
        .collect()
    }

    #[test]
    fn test_process_capture_scenario() {
        let config = RecorderConfig::new().with_clusterevents(2);
        let processed = process_capture(&scenario_capture(), &config).unwrap();

        assert_eq!(processed.records.len(), 3);
        assert!((processed.records[1].timestamp - 0.1).abs() < 1e-9);
        assert_eq!(processed.clusters.len(), 2);
        assert_eq!(processed.clusters[0].len(), 2);
        assert_eq!(processed.clusters[1].len(), 1);
        assert_eq!(processed.script.lines.len(), 4);
        assert_eq!(processed.script.lines[3].kind, LineKind::Closing);
        assert_eq!(processed.dropped_bytes, 0);
    }

    #[test]
    fn test_process_capture_rejects_bad_cluster_size_first() {
        // Not even a whole record: decoding would yield nothing
        let data = [0u8; 5];
        for bad in [0, -1] {
            let config = RecorderConfig::new().with_clusterevents(bad);
            assert!(matches!(
                process_capture(&data, &config),
                Err(ReplayError::InvalidConfiguration(_))
            ));
            assert!(matches!(
                GeteventRecorder::new(config),
                Err(ReplayError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_process_capture_reports_dropped_bytes() {
        let mut data = scenario_capture();
        data.extend_from_slice(&[0xaa; 10]);
        let processed = process_capture(&data, &RecorderConfig::new()).unwrap();
        assert_eq!(processed.records.len(), 3);
        assert_eq!(processed.dropped_bytes, 10);
    }

    #[test]
    fn test_live_capture_keeps_crlf_bytes() {
        let layout = RecordLayout::LP64;
        // tv_usec 0x0a0d encodes as `0d 0a`
        let input = vec![
            EventRecord::new(&layout, 100, 0x0a0d, 3, 0x35, 540),
            EventRecord::new(&layout, 100, 0x0a0d, 3, 0x0d0a, 0x0a0d),
            EventRecord::new(&layout, 100, 9000, 0, 0, 0),
        ];
        let raw: Vec<u8> = input.iter().flat_map(|r| r.raw.clone()).collect();

        let config = RecorderConfig::new();
        let data = prepare_live_capture(raw.clone(), &config);
        assert_eq!(data, raw);

        let processed = process_capture(&data, &config).unwrap();
        assert_eq!(processed.records, input);
        assert_eq!(processed.dropped_bytes, 0);
    }

    #[test]
    fn test_pty_capture_is_normalized() {
        let layout = RecordLayout::LP64;
        let input = vec![
            EventRecord::new(&layout, 100, 0x0a0d, 3, 0x35, 540),
            EventRecord::new(&layout, 100, 10, 1, 0x0a, 1),
        ];
        let raw: Vec<u8> = input.iter().flat_map(|r| r.raw.clone()).collect();
        let translated: Vec<u8> = raw
            .iter()
            .flat_map(|&b| if b == b'\n' { vec![b'\r', b'\n'] } else { vec![b] })
            .collect();
        assert!(translated.len() > raw.len());

        let config = RecorderConfig::new().with_capture_pty(true);
        let data = prepare_live_capture(translated, &config);
        assert_eq!(data, raw);
        assert_eq!(process_capture(&data, &config).unwrap().records, input);
    }

    #[tokio::test]
    async fn test_block_write_decodes_without_device() {
        let temp_dir = tempdir().unwrap();
        let capture_path = temp_dir.path().join("session.bin");
        std::fs::write(&capture_path, scenario_capture()).unwrap();

        let config = RecorderConfig::new()
            .with_adb_path("/nonexistent/adb-binary")
            .with_clusterevents(2)
            .with_replay_mode(ReplayMode::BlockWrite)
            .with_tempfolder_hdd(temp_dir.path().join("staging"));
        let recorder = GeteventRecorder::new(config).unwrap();
        let result = recorder.from_stored_capture(&capture_path).await.unwrap();

        assert_eq!(result.files_on_pc.len(), 2);
        assert_eq!(result.files_on_pc[0].file_name().unwrap(), "0.bin");
        assert_eq!(std::fs::read(&result.files_on_pc[1]).unwrap().len(), 24);
        assert!(result.adb_command.contains("dd bs=48 "));

        // The push happens at replay time, which does need adb
        assert!(matches!(
            recorder.replay(&result).await,
            Err(ReplayError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_recorder_from_stored_capture() {
        let temp_dir = tempdir().unwrap();
        let capture_path = temp_dir.path().join("session.bin");
        std::fs::write(&capture_path, scenario_capture()).unwrap();

        let config = RecorderConfig::new()
            .with_clusterevents(2)
            .with_add_closing_command(false)
            .with_tempfolder_hdd(temp_dir.path().join("staging"));
        let recorder = GeteventRecorder::new(config).unwrap();
        let result = recorder.from_stored_capture(&capture_path).await.unwrap();

        assert_eq!(result.records.len(), 3);
        assert_eq!(result.clusters.len(), 2);
        assert!(result.files_on_pc.is_empty());
        assert_eq!(result.payload, scenario_capture());
        assert_eq!(result.capture_path.as_deref(), Some(capture_path.as_path()));
        assert!(result.adb_command.starts_with("su\n"));
        assert!(!result.script.ends_with_sync());
    }

    #[tokio::test]
    async fn test_recording_result_json_keys() {
        let temp_dir = tempdir().unwrap();
        let config = RecorderConfig::new().with_tempfolder_hdd(temp_dir.path());
        let recorder = GeteventRecorder::new(config).unwrap();
        let result = recorder.process(&scenario_capture()).await.unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("adbcommand").is_some());
        assert!(json.get("parseddata").is_some());
        assert!(json.get("clusteredevents").is_some());
        assert!(json.get("filesnames_pc").is_some());
        assert_eq!(json["payload_bytes"], 72);
        assert_eq!(json["payload"].as_array().unwrap().len(), 72);
        // Only the last record is a SYN_REPORT
        assert_eq!(json["singleevents"].as_array().unwrap().len(), 1);
        assert_eq!(json["singleevents"][0].as_array().unwrap().len(), 3);
    }
}
