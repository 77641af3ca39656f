//! Durable, append-only snapshot records.

use crate::error::{Result, SysmonError};
use crate::metrics::data::Snapshot;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Separator written after every record.
pub const RECORD_SEPARATOR: &[u8] = b"\n\n";

const RECORD_INDENT: &[u8] = b"    ";

/// Writes one indented JSON block per snapshot, each followed by a blank
/// line.
///
/// A record is fully encoded in memory and handed to the sink in a single
/// write, so a crash can at worst truncate the record in flight.
pub struct SnapshotRecorder {
    sink: Box<dyn Write + Send>,
    records: u64,
}

impl SnapshotRecorder {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            records: 0,
        }
    }

    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::new(file))
    }

    /// Append one snapshot record.
    ///
    /// Any failure here is fatal for the process.
    pub fn record(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut record = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(
            &mut record,
            PrettyFormatter::with_indent(RECORD_INDENT),
        );
        snapshot.serialize(&mut serializer)?;
        record.extend_from_slice(RECORD_SEPARATOR);

        self.sink
            .write_all(&record)
            .and_then(|()| self.sink.flush())
            .map_err(SysmonError::RecorderWrite)?;

        self.records += 1;
        tracing::debug!(bytes = record.len(), records = self.records, "snapshot recorded");
        Ok(())
    }

    /// Number of records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(SysmonError::RecorderWrite)
    }
}

/// Split recorder output back into its JSON blocks.
pub fn split_records(log: &str) -> impl Iterator<Item = &str> {
    log.split("\n\n").map(str::trim).filter(|block| !block.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::{DomainReading, NetworkReading};
    use std::collections::BTreeMap;
    use std::io;

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("No space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert(DomainReading::Network(NetworkReading::from_interfaces(
            BTreeMap::new(),
        )));
        snapshot
    }

    #[test]
    fn test_records_append_with_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sysmon.log");

        let mut recorder = SnapshotRecorder::open(&path).unwrap();
        recorder.record(&snapshot()).unwrap();
        recorder.record(&snapshot()).unwrap();
        assert_eq!(recorder.records(), 2);
        drop(recorder);

        // Reopening appends rather than truncating.
        let mut recorder = SnapshotRecorder::open(&path).unwrap();
        recorder.record(&snapshot()).unwrap();

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.ends_with("}\n\n"));
        let blocks: Vec<&str> = split_records(&log).collect();
        assert_eq!(blocks.len(), 3);
        for block in blocks {
            let value: serde_json::Value = serde_json::from_str(block).unwrap();
            assert!(value.get("timestamp").is_some());
            assert!(value.get("network").is_some());
            assert!(block.contains("\n    \"timestamp\""));
        }
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let mut recorder = SnapshotRecorder::new(FullDisk);
        let err = recorder.record(&snapshot()).unwrap_err();
        assert!(matches!(err, SysmonError::RecorderWrite(_)));
        assert!(err.is_fatal());
        assert_eq!(recorder.records(), 0);
    }
}
