use super::{format_bytes, StatsSnapshot};
use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One CSV line per ambient tick. Deltas are relative to the previous row.
#[derive(Debug, Serialize)]
struct HistoryRow {
    elapsed_s: f64,
    packets: u64,
    packets_delta: u64,
    bytes: u64,
    bytes_delta: u64,
    transfer: String,
    encryption_pct: f64,
    latency_ms: f64,
    messages_sent: u64,
}

/// Streams the stats history as CSV into any writer.
pub struct HistoryCsv<W: Write> {
    writer: Writer<W>,
    previous: Option<(u64, u64)>,
    rows: usize,
}

impl HistoryCsv<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("creating stats export {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> HistoryCsv<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: WriterBuilder::new().has_headers(true).from_writer(inner),
            previous: None,
            rows: 0,
        }
    }

    pub fn append(&mut self, snapshot: &StatsSnapshot) -> Result<()> {
        let (last_packets, last_bytes) = self.previous.unwrap_or((0, 0));
        self.writer.serialize(HistoryRow {
            elapsed_s: snapshot.timestamp,
            packets: snapshot.packets_transmitted,
            packets_delta: snapshot.packets_transmitted.saturating_sub(last_packets),
            bytes: snapshot.bytes_transferred,
            bytes_delta: snapshot.bytes_transferred.saturating_sub(last_bytes),
            transfer: format_bytes(snapshot.bytes_transferred),
            encryption_pct: snapshot.encryption_rate,
            latency_ms: snapshot.latency_ms,
            messages_sent: snapshot.messages_sent,
        })?;
        self.previous = Some((snapshot.packets_transmitted, snapshot.bytes_transferred));
        self.rows += 1;
        Ok(())
    }

    /// Flushes and returns the writer along with the number of rows written.
    pub fn finish(self) -> Result<(W, usize)> {
        let rows = self.rows;
        let inner = self
            .writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing stats export: {}", e.error()))?;
        Ok((inner, rows))
    }
}

/// Writes the whole history to `path`, returning the row count.
pub fn write_history(path: &Path, history: &[StatsSnapshot]) -> Result<usize> {
    let mut csv = HistoryCsv::create(path)?;
    for snapshot in history {
        csv.append(snapshot)?;
    }
    let (_, rows) = csv.finish()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timestamp: f64, packets: u64, bytes: u64, messages_sent: u64) -> StatsSnapshot {
        StatsSnapshot {
            timestamp,
            packets_transmitted: packets,
            bytes_transferred: bytes,
            encryption_rate: 97.5,
            latency_ms: 14.0,
            messages_sent,
        }
    }

    #[test]
    fn header_and_deltas() {
        let mut csv = HistoryCsv::new(Vec::new());
        csv.append(&row(1.0, 4, 900, 0)).unwrap();
        csv.append(&row(2.0, 9, 2100, 1)).unwrap();
        let (buf, rows) = csv.finish().unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "elapsed_s,packets,packets_delta,bytes,bytes_delta,transfer,encryption_pct,latency_ms,messages_sent"
        );
        assert_eq!(lines[1], "1.0,4,4,900,900,900 B,97.5,14.0,0");
        assert_eq!(lines[2], "2.0,9,5,2100,1200,2.1 KB,97.5,14.0,1");
    }

    #[test]
    fn empty_history_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        assert_eq!(write_history(&path, &[]).unwrap(), 0);
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
    }

    #[test]
    fn history_lands_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let history = vec![row(1.0, 1, 10, 0), row(2.0, 3, 40, 0), row(3.0, 3, 40, 0)];
        assert_eq!(write_history(&path, &history).unwrap(), 3);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("stats.csv");
        let err = write_history(&path, &[row(1.0, 1, 1, 0)]).unwrap_err();
        assert!(err.to_string().contains("creating stats export"));
    }
}
