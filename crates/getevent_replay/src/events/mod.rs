//! Event decoding and replay synthesis
//!
//! This module provides:
//! - `decoder`: Fixed-width `input_event` decoding
//! - `cluster`: Grouping records into replay clusters
//! - `replay`: Building the replay shell script

mod cluster;
mod decoder;
mod replay;

pub use cluster::{group, split_reports, ClusterSize, EventCluster};
pub use decoder::{decode, normalize_crlf, Decoder, EventRecord};
pub use replay::{
    staged_cluster_path, synthesize, LineKind, ReplayCommand, ReplayLine, ReplayMode,
    ReplayOptions, ReplayScript,
};
