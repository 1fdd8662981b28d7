use crate::{
    error::{Result, TelemetryError},
    sample::{PublishedAggregate, RawSample, CHANNEL_COUNT},
    storage::SampleLog,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const RAW_LOG_FILE: &str = "raw_data.csv";
pub const AGGREGATE_LOG_FILE: &str = "processed_data.csv";

pub const RAW_LOG_HEADER: [&str; CHANNEL_COUNT + 1] = [
    "timestamp", "sensor_0", "sensor_1", "sensor_2", "sensor_3", "sensor_4", "sensor_5",
    "sensor_6", "sensor_7",
];
pub const AGGREGATE_LOG_HEADER: [&str; 2] = ["timestamp", "combined_average"];

#[derive(Debug, Serialize, Deserialize)]
struct RawRow {
    timestamp: f64,
    sensor_0: i64,
    sensor_1: i64,
    sensor_2: i64,
    sensor_3: i64,
    sensor_4: i64,
    sensor_5: i64,
    sensor_6: i64,
    sensor_7: i64,
}

impl RawRow {
    fn from_sample(sample: &RawSample) -> Option<Self> {
        match sample.raw_data.as_slice() {
            &[s0, s1, s2, s3, s4, s5, s6, s7] => Some(Self {
                timestamp: sample.timestamp,
                sensor_0: s0,
                sensor_1: s1,
                sensor_2: s2,
                sensor_3: s3,
                sensor_4: s4,
                sensor_5: s5,
                sensor_6: s6,
                sensor_7: s7,
            }),
            _ => None,
        }
    }

    fn into_sample(self) -> RawSample {
        RawSample::new(
            vec![
                self.sensor_0,
                self.sensor_1,
                self.sensor_2,
                self.sensor_3,
                self.sensor_4,
                self.sensor_5,
                self.sensor_6,
                self.sensor_7,
            ],
            self.timestamp,
            None,
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AggregateRow {
    timestamp: f64,
    combined_average: f64,
}

/// One append-only CSV file. The mutex serializes appends so rows never interleave.
struct LogFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogFile {
    async fn open(path: PathBuf, header: &[&str]) -> Result<Self> {
        let needs_header = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        if needs_header {
            info!("Creating log {}", path.display());
            let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
            writer.write_record(header)?;
            file.write_all(&into_bytes(writer)?).await?;
            file.flush().await?;
            file.sync_all().await?;
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    async fn append<T: Serialize>(&self, row: &T) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.serialize(row)?;
        let line = into_bytes(writer)?;

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    /// Length of the file up to the last complete row. Appends finish under
    /// the same lock, so the prefix never ends mid-row.
    async fn committed_len(&self) -> Result<u64> {
        let file = self.file.lock().await;
        Ok(file.metadata().await?.len())
    }

    async fn read_prefix<T: DeserializeOwned>(&self, len: u64) -> Result<Vec<T>> {
        let mut bytes = Vec::with_capacity(len as usize);
        File::open(&self.path)
            .await?
            .take(len)
            .read_to_end(&mut bytes)
            .await?;

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<T>, csv::Error>>()?;
        Ok(rows)
    }

    /// Every row committed when the call started. The append lock is only
    /// held while the length is taken, not for the read itself.
    async fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let len = self.committed_len().await?;
        self.read_prefix(len).await
    }
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| TelemetryError::Storage(e.into_error()))
}

/// CSV-backed [`SampleLog`]: one file for raw samples, one for aggregates.
pub struct CsvSampleLog {
    raw: LogFile,
    aggregate: LogFile,
}

impl CsvSampleLog {
    /// Open (creating if needed) both logs under `dir` with the default file names.
    pub async fn open_in(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir, RAW_LOG_FILE, AGGREGATE_LOG_FILE).await
    }

    pub async fn open(
        dir: impl AsRef<Path>,
        raw_file: &str,
        aggregate_file: &str,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        Ok(Self {
            raw: LogFile::open(dir.join(raw_file), &RAW_LOG_HEADER).await?,
            aggregate: LogFile::open(dir.join(aggregate_file), &AGGREGATE_LOG_HEADER).await?,
        })
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw.path
    }

    pub fn aggregate_path(&self) -> &Path {
        &self.aggregate.path
    }
}

#[async_trait]
impl SampleLog for CsvSampleLog {
    async fn append_raw(&self, sample: &RawSample) -> Result<bool> {
        let Some(row) = RawRow::from_sample(sample) else {
            debug!(
                "Dropping raw sample with {} channels from log",
                sample.raw_data.len()
            );
            return Ok(false);
        };

        self.raw.append(&row).await?;
        Ok(true)
    }

    async fn append_aggregate(&self, aggregate: &PublishedAggregate) -> Result<()> {
        self.aggregate
            .append(&AggregateRow {
                timestamp: aggregate.timestamp,
                combined_average: aggregate.combined_average,
            })
            .await
    }

    async fn read_all_raw(&self) -> Result<Vec<RawSample>> {
        let rows: Vec<RawRow> = self.raw.read_all().await?;
        Ok(rows.into_iter().map(RawRow::into_sample).collect())
    }

    async fn read_all_aggregate(&self) -> Result<Vec<PublishedAggregate>> {
        let rows: Vec<AggregateRow> = self.aggregate.read_all().await?;
        Ok(rows
            .into_iter()
            .map(|row| PublishedAggregate {
                combined_average: row.combined_average,
                timestamp: row.timestamp,
                sample_count: 0,
            })
            .collect())
    }

    fn backend_type(&self) -> &'static str {
        "CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn full_sample(ts: f64) -> RawSample {
        RawSample::new(vec![101, 202, 303, 404, 505, 606, 707, 808], ts, None)
    }

    #[tokio::test]
    async fn test_bootstrap_writes_header_once() {
        let dir = TempDir::new().unwrap();

        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();
        drop(log);
        let _log = CsvSampleLog::open_in(dir.path()).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(RAW_LOG_FILE)).unwrap();
        assert_eq!(
            raw,
            "timestamp,sensor_0,sensor_1,sensor_2,sensor_3,sensor_4,sensor_5,sensor_6,sensor_7\n"
        );
        let aggregate = std::fs::read_to_string(dir.path().join(AGGREGATE_LOG_FILE)).unwrap();
        assert_eq!(aggregate, "timestamp,combined_average\n");
    }

    #[tokio::test]
    async fn test_raw_round_trip() {
        let dir = TempDir::new().unwrap();
        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();

        let sample = full_sample(1_700_000_000.123456);
        assert!(log.append_raw(&sample).await.unwrap());

        let history = log.read_all_raw().await.unwrap();
        assert_eq!(history, vec![sample]);
    }

    #[tokio::test]
    async fn test_short_raw_sample_is_dropped() {
        let dir = TempDir::new().unwrap();
        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();

        log.append_raw(&full_sample(1.0)).await.unwrap();
        let short = RawSample::new(vec![1, 2, 3, 4, 5, 6, 7], 2.0, None);
        assert!(!log.append_raw(&short).await.unwrap());

        assert_eq!(log.read_all_raw().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_aggregates_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let log = CsvSampleLog::open_in(dir.path()).await.unwrap();
            for i in 0..3 {
                log.append_aggregate(&PublishedAggregate {
                    combined_average: 10.5 * i as f64,
                    timestamp: 100.0 + i as f64,
                    sample_count: 2,
                })
                .await
                .unwrap();
            }
        }

        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();
        let history = log.read_all_aggregate().await.unwrap();
        let values: Vec<(f64, f64)> = history
            .iter()
            .map(|a| (a.timestamp, a.combined_average))
            .collect();
        assert_eq!(values, vec![(100.0, 0.0), (101.0, 10.5), (102.0, 21.0)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_rows_whole() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(CsvSampleLog::open_in(dir.path()).await.unwrap());

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move { log.append_raw(&full_sample(i as f64)).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().unwrap());
        }

        let history = log.read_all_raw().await.unwrap();
        assert_eq!(history.len(), 50);
        assert!(history
            .iter()
            .all(|s| s.raw_data == vec![101, 202, 303, 404, 505, 606, 707, 808]));
    }

    #[tokio::test]
    async fn test_read_stops_at_committed_length() {
        let dir = TempDir::new().unwrap();
        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();

        log.append_raw(&full_sample(1.0)).await.unwrap();
        let len = log.raw.committed_len().await.unwrap();
        log.append_raw(&full_sample(2.0)).await.unwrap();

        let rows: Vec<RawRow> = log.raw.read_prefix(len).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 1.0);
        assert_eq!(log.read_all_raw().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_interleaved_with_appends_see_whole_rows() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(CsvSampleLog::open_in(dir.path()).await.unwrap());

        let writer = {
            let log = log.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    log.append_raw(&full_sample(i as f64)).await.unwrap();
                }
            })
        };

        let mut last_len = 0;
        while !writer.is_finished() {
            let history = log.read_all_raw().await.unwrap();
            assert!(history.len() >= last_len);
            assert!(history
                .iter()
                .enumerate()
                .all(|(i, s)| s.timestamp == i as f64 && s.raw_data.len() == 8));
            last_len = history.len();
        }
        writer.await.unwrap();

        assert_eq!(log.read_all_raw().await.unwrap().len(), 100);
    }
}
