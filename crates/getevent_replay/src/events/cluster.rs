//! Grouping of decoded records into replay clusters

use serde::Serialize;
use std::num::NonZeroUsize;

use crate::config::{EV_SYN, SYN_REPORT};
use crate::error::{ReplayError, Result};
use crate::events::EventRecord;

/// Validated number of records per cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSize(NonZeroUsize);

impl ClusterSize {
    /// Accepts any positive count; zero and negatives are configuration errors
    pub fn new(clusterevents: i64) -> Result<Self> {
        usize::try_from(clusterevents)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or_else(|| {
                ReplayError::InvalidConfiguration(format!(
                    "clusterevents must be a positive integer, got {}",
                    clusterevents
                ))
            })
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Consecutive records replayed together as one command line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCluster {
    /// Position of this cluster in the recording
    pub index: usize,
    pub records: Vec<EventRecord>,
}

impl EventCluster {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw bytes of every record in order, as written by a block replay
    pub fn raw_bytes(&self) -> Vec<u8> {
        self.records
            .iter()
            .flat_map(|r| r.raw.iter().copied())
            .collect()
    }
}

/// Split records into clusters of `size`, the last one holding the remainder
pub fn group<I>(records: I, size: ClusterSize) -> Vec<EventCluster>
where
    I: IntoIterator<Item = EventRecord>,
{
    let size = size.get();
    let mut clusters: Vec<EventCluster> = Vec::new();

    for record in records {
        match clusters.last_mut() {
            Some(cluster) if cluster.len() < size => cluster.records.push(record),
            _ => {
                let index = clusters.len();
                let mut records = Vec::with_capacity(size);
                records.push(record);
                clusters.push(EventCluster { index, records });
            }
        }
    }

    clusters
}

/// Split records into input reports, each closed by its `SYN_REPORT`
///
/// Records after the last `SYN_REPORT` form a final, unterminated report.
pub fn split_reports(records: &[EventRecord]) -> Vec<Vec<EventRecord>> {
    records
        .split_inclusive(|r| r.event_type == EV_SYN && r.event_code == SYN_REPORT)
        .map(<[EventRecord]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordLayout;

    fn records(count: usize) -> Vec<EventRecord> {
        (0..count)
            .map(|i| EventRecord::new(&RecordLayout::LP64, 100, i as i64, 3, 0x35, i as i32))
            .collect()
    }

    #[test]
    fn test_cluster_size_rejects_zero_and_negative() {
        assert!(matches!(
            ClusterSize::new(0),
            Err(ReplayError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ClusterSize::new(-1),
            Err(ReplayError::InvalidConfiguration(_))
        ));
        assert_eq!(ClusterSize::new(1).unwrap().get(), 1);
    }

    #[test]
    fn test_cluster_counts() {
        for (m, c) in [(10usize, 3i64), (9, 3), (1, 16), (16, 16), (17, 16), (5, 1)] {
            let clusters = group(records(m), ClusterSize::new(c).unwrap());
            let c = c as usize;
            assert_eq!(clusters.len(), (m + c - 1) / c, "m={} c={}", m, c);

            let expected_last = if m % c == 0 { c } else { m % c };
            assert_eq!(clusters.last().unwrap().len(), expected_last);
            assert!(clusters[..clusters.len() - 1].iter().all(|cl| cl.len() == c));
        }
    }

    #[test]
    fn test_clusters_preserve_order_and_indices() {
        let input = records(7);
        let clusters = group(input.clone(), ClusterSize::new(3).unwrap());

        let flattened: Vec<EventRecord> = clusters
            .iter()
            .flat_map(|c| c.records.iter().cloned())
            .collect();
        assert_eq!(flattened, input);

        let indices: Vec<usize> = clusters.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_input_has_no_clusters() {
        assert!(group(Vec::new(), ClusterSize::new(4).unwrap()).is_empty());
    }

    #[test]
    fn test_split_reports_at_syn_report() {
        let layout = RecordLayout::LP64;
        let input = vec![
            EventRecord::new(&layout, 0, 0, 3, 0x35, 100),
            EventRecord::new(&layout, 0, 0, 3, 0x36, 200),
            EventRecord::new(&layout, 0, 0, 0, 0, 0),
            EventRecord::new(&layout, 0, 10, 1, 0x14a, 0),
            EventRecord::new(&layout, 0, 10, 0, 0, 0),
            EventRecord::new(&layout, 0, 20, 3, 0x39, -1),
        ];

        let reports = split_reports(&input);
        let sizes: Vec<usize> = reports.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 2, 1]);
        assert_eq!(reports.concat(), input);
        assert!(split_reports(&[]).is_empty());
    }

    #[test]
    fn test_raw_bytes_concatenates_records() {
        let input = records(2);
        let clusters = group(input.clone(), ClusterSize::new(2).unwrap());
        let mut expected = input[0].raw.clone();
        expected.extend_from_slice(&input[1].raw);
        assert_eq!(clusters[0].raw_bytes(), expected);
    }
}
