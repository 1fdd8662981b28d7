use crate::{
    aggregator::{AggregationWindow, WindowedAggregator, DEFAULT_FLUSH_INTERVAL},
    clock::{DynClock, SystemClock},
    error::{Result, TelemetryError},
    forwarder::{http::DEFAULT_FORWARD_TIMEOUT, DynForwarder, ForwardRecord},
    publisher::LatestValuePublisher,
    sample::{ProcessedUpload, PublishedAggregate, RawSample, RawUpload},
    stats::{IngestStats, StatsSnapshot},
    storage::DynSampleLog,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

pub const DEFAULT_SESSION_ID: &str = "local-dev-session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReceipt {
    pub status: String,
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedReceipt {
    pub status: String,
    pub published: Option<PublishedAggregate>,
}

/// Entry point for uploads from the transport layer.
///
/// Raw frames go to the latest-value slot and, when complete, to the raw log
/// and the forwarder. Processed values go through the windowed aggregator;
/// a closed window is published, logged and forwarded.
pub struct IngestionGateway {
    aggregator: WindowedAggregator,
    publisher: LatestValuePublisher,
    log: DynSampleLog,
    forwarder: Option<DynForwarder>,
    clock: DynClock,
    stats: Arc<IngestStats>,
    default_session_id: String,
    forward_timeout: Duration,
}

impl IngestionGateway {
    pub fn builder(log: DynSampleLog) -> GatewayBuilder {
        GatewayBuilder::new(log)
    }

    pub async fn ingest_raw(&self, upload: RawUpload) -> Result<RawReceipt> {
        self.stats.record_raw_received();

        let sample = RawSample::new(upload.raw_data, self.clock.now(), upload.session_id);
        self.publisher.publish_raw(sample.clone()).await;

        if let Err(e) = sample.check_shape() {
            warn!("Raw sample not persisted: {}", e);
            self.stats.record_raw_shape_rejected();
            return Ok(raw_receipt(false));
        }

        let persisted = self
            .log
            .append_raw(&sample)
            .await
            .map_err(|e| self.storage_failure(e))?;

        if persisted {
            self.stats.record_raw_persisted();
            self.dispatch(ForwardRecord::from_raw(&sample, &self.default_session_id));
        }

        Ok(raw_receipt(persisted))
    }

    pub async fn ingest_processed(&self, upload: ProcessedUpload) -> Result<ProcessedReceipt> {
        self.stats.record_processed_received();

        let metric = upload.into_metric(self.clock.now()).map_err(|e| {
            warn!("Rejected processed upload: {}", e);
            self.stats.record_processed_rejected();
            e
        })?;

        let Some(aggregate) = self.aggregator.submit(&metric).await else {
            return Ok(processed_receipt(None));
        };

        self.stats.record_aggregate_published();
        self.publisher.publish_aggregate(aggregate.clone()).await;

        self.log
            .append_aggregate(&aggregate)
            .await
            .map_err(|e| self.storage_failure(e))?;

        self.dispatch(ForwardRecord::from_aggregate(
            &aggregate,
            &metric,
            &self.default_session_id,
        ));

        Ok(processed_receipt(Some(aggregate)))
    }

    pub async fn latest_raw(&self) -> Option<RawSample> {
        self.publisher.read_latest_raw().await
    }

    pub async fn latest_aggregate(&self) -> PublishedAggregate {
        self.publisher.read_latest_aggregate().await
    }

    pub async fn raw_history(&self) -> Result<Vec<RawSample>> {
        self.log.read_all_raw().await
    }

    pub async fn aggregate_history(&self) -> Result<Vec<PublishedAggregate>> {
        self.log.read_all_aggregate().await
    }

    pub async fn open_window(&self) -> AggregationWindow {
        self.aggregator.snapshot().await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn flush_interval(&self) -> Duration {
        self.aggregator.flush_interval()
    }

    pub fn storage_backend(&self) -> &'static str {
        self.log.backend_type()
    }

    pub fn forwarding_enabled(&self) -> bool {
        self.forwarder.is_some()
    }

    fn storage_failure(&self, e: TelemetryError) -> TelemetryError {
        error!("Durable log append failed: {}", e);
        self.stats.record_storage_failure();
        e
    }

    /// Fire-and-forget delivery. Runs on its own task so no gateway lock is
    /// held while the request is in flight; the outcome is only logged.
    fn dispatch(&self, record: ForwardRecord) {
        let Some(forwarder) = self.forwarder.clone() else {
            return;
        };

        self.stats.record_forward_attempted();
        let stats = self.stats.clone();
        let timeout = self.forward_timeout;

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, forwarder.forward(&record)).await {
                Ok(result) => result,
                Err(_) => Err(TelemetryError::Forwarding(format!(
                    "timed out after {:?}",
                    timeout
                ))),
            };

            if let Err(e) = outcome {
                stats.record_forward_failed();
                warn!(
                    "Forwarding to '{}' for session {} dropped: {}",
                    forwarder.name(),
                    record.session_id,
                    e
                );
            }
        });
    }
}

fn raw_receipt(persisted: bool) -> RawReceipt {
    RawReceipt {
        status: "raw received".to_string(),
        persisted,
    }
}

fn processed_receipt(published: Option<PublishedAggregate>) -> ProcessedReceipt {
    ProcessedReceipt {
        status: "processed received".to_string(),
        published,
    }
}

pub struct GatewayBuilder {
    log: DynSampleLog,
    clock: Option<DynClock>,
    forwarder: Option<DynForwarder>,
    stats: Option<Arc<IngestStats>>,
    flush_interval: Option<Duration>,
    forward_timeout: Option<Duration>,
    default_session_id: Option<String>,
}

impl GatewayBuilder {
    pub fn new(log: DynSampleLog) -> Self {
        Self {
            log,
            clock: None,
            forwarder: None,
            stats: None,
            flush_interval: None,
            forward_timeout: None,
            default_session_id: None,
        }
    }

    pub fn clock(mut self, clock: DynClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn forwarder(mut self, forwarder: DynForwarder) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub fn stats(mut self, stats: Arc<IngestStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = Some(flush_interval);
        self
    }

    pub fn forward_timeout(mut self, forward_timeout: Duration) -> Self {
        self.forward_timeout = Some(forward_timeout);
        self
    }

    pub fn default_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.default_session_id = Some(session_id.into());
        self
    }

    pub fn build(self) -> IngestionGateway {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let flush_interval = self.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL);

        IngestionGateway {
            aggregator: WindowedAggregator::new(flush_interval, clock.clone()),
            publisher: LatestValuePublisher::new(),
            log: self.log,
            forwarder: self.forwarder,
            clock,
            stats: self.stats.unwrap_or_default(),
            default_session_id: self
                .default_session_id
                .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
            forward_timeout: self.forward_timeout.unwrap_or(DEFAULT_FORWARD_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::forwarder::Forwarder;
    use crate::storage::{CsvSampleLog, MockSampleLog};
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct ChannelForwarder {
        tx: mpsc::UnboundedSender<ForwardRecord>,
    }

    #[async_trait]
    impl Forwarder for ChannelForwarder {
        async fn forward(&self, record: &ForwardRecord) -> Result<()> {
            let _ = self.tx.send(record.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "channel"
        }
    }

    struct FailingForwarder;

    #[async_trait]
    impl Forwarder for FailingForwarder {
        async fn forward(&self, _record: &ForwardRecord) -> Result<()> {
            Err(TelemetryError::Forwarding("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct StalledForwarder;

    #[async_trait]
    impl Forwarder for StalledForwarder {
        async fn forward(&self, _record: &ForwardRecord) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    async fn csv_gateway(dir: &TempDir, clock: Arc<ManualClock>) -> IngestionGateway {
        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();
        IngestionGateway::builder(Arc::new(log)).clock(clock).build()
    }

    fn processed(value: f64) -> ProcessedUpload {
        ProcessedUpload {
            combined_average: Some(value),
            ..Default::default()
        }
    }

    fn raw(values: Vec<i64>) -> RawUpload {
        RawUpload {
            raw_data: values,
            session_id: None,
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_end_to_end_window() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(1000.0));
        let gateway = csv_gateway(&dir, clock.clone()).await;

        for value in [10.0, 20.0, 30.0] {
            clock.advance(0.1);
            let receipt = gateway.ingest_processed(processed(value)).await.unwrap();
            assert!(receipt.published.is_none());
        }

        let latest = gateway.latest_aggregate().await;
        assert_eq!(latest.combined_average, 0.0);
        assert_eq!(latest.timestamp, 0.0);
        assert!(gateway.aggregate_history().await.unwrap().is_empty());

        clock.set(1000.75);
        let receipt = gateway.ingest_processed(processed(40.0)).await.unwrap();
        assert_eq!(receipt.status, "processed received");
        assert_eq!(receipt.published.unwrap().combined_average, 25.0);

        let latest = gateway.latest_aggregate().await;
        assert_eq!(latest.combined_average, 25.0);
        assert_eq!(latest.timestamp, 1000.75);

        let history = gateway.aggregate_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].combined_average, 25.0);
        assert_eq!(history[0].timestamp, 1000.75);

        assert_eq!(gateway.open_window().await.count(), 0);
        assert_eq!(gateway.stats().aggregates_published, 1);
    }

    #[tokio::test]
    async fn test_raw_upload_persistence_depends_on_shape() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(50.0));
        let gateway = csv_gateway(&dir, clock.clone()).await;

        let full = vec![100, 200, 300, 400, 500, 600, 700, 800];
        let receipt = gateway.ingest_raw(raw(full.clone())).await.unwrap();
        assert!(receipt.persisted);
        assert_eq!(gateway.latest_raw().await.unwrap().raw_data, full);

        let history = gateway.raw_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].raw_data, full);
        assert_eq!(history[0].timestamp, 50.0);

        clock.advance(1.0);
        let receipt = gateway.ingest_raw(raw(vec![1, 2, 3])).await.unwrap();
        assert!(!receipt.persisted);
        assert_eq!(gateway.latest_raw().await.unwrap().raw_data, vec![1, 2, 3]);
        assert_eq!(gateway.raw_history().await.unwrap().len(), 1);

        let stats = gateway.stats();
        assert_eq!(stats.raw_received, 2);
        assert_eq!(stats.raw_persisted, 1);
        assert_eq!(stats.raw_shape_rejected, 1);
    }

    #[tokio::test]
    async fn test_missing_value_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0.0));
        let gateway = csv_gateway(&dir, clock.clone()).await;

        clock.set(10.0);
        let result = gateway.ingest_processed(ProcessedUpload::default()).await;
        assert!(matches!(result, Err(TelemetryError::Validation(_))));

        let window = gateway.open_window().await;
        assert_eq!(window.count(), 0);
        assert_eq!(window.window_start_time(), 0.0);
        assert_eq!(gateway.latest_aggregate().await, PublishedAggregate::placeholder());
        assert!(gateway.aggregate_history().await.unwrap().is_empty());
        assert_eq!(gateway.stats().processed_rejected, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_fails_request() {
        let mut log = MockSampleLog::new();
        log.expect_append_aggregate().times(1).returning(|_| {
            Err(TelemetryError::Storage(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        });

        let clock = Arc::new(ManualClock::new(0.0));
        let gateway = IngestionGateway::builder(Arc::new(log))
            .clock(clock.clone())
            .build();

        clock.set(1.0);
        let err = gateway.ingest_processed(processed(7.0)).await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(gateway.stats().storage_failures, 1);
    }

    #[tokio::test]
    async fn test_raw_storage_failure_fails_request() {
        let mut log = MockSampleLog::new();
        log.expect_append_raw().times(1).returning(|_| {
            Err(TelemetryError::Storage(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only filesystem",
            )))
        });

        let gateway = IngestionGateway::builder(Arc::new(log))
            .clock(Arc::new(ManualClock::new(0.0)))
            .build();

        let result = gateway.ingest_raw(raw(vec![0; 8])).await;
        assert!(matches!(result, Err(TelemetryError::Storage(_))));
        // The snapshot is updated before the append is attempted.
        assert!(gateway.latest_raw().await.is_some());
    }

    #[tokio::test]
    async fn test_complete_samples_and_aggregates_are_forwarded() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0.0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();
        let gateway = IngestionGateway::builder(Arc::new(log))
            .clock(clock.clone())
            .forwarder(Arc::new(ChannelForwarder { tx }))
            .default_session_id("bench-session")
            .build();

        gateway.ingest_raw(raw(vec![1, 2, 3])).await.unwrap();
        gateway
            .ingest_raw(RawUpload {
                raw_data: vec![1, 2, 3, 4, 5, 6, 7, 8],
                session_id: Some("device-7".to_string()),
            })
            .await
            .unwrap();

        let record = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.session_id, "device-7");
        assert_eq!(record.values["sensor_7"], 8.0);

        clock.set(2.0);
        gateway
            .ingest_processed(ProcessedUpload {
                combined_average: Some(1.0),
                timestamp: Some(123.456),
                session_id: None,
            })
            .await
            .unwrap();
        let record = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.session_id, "bench-session");
        assert_eq!(record.device_timestamp_ms, 123456);
        assert_eq!(record.values["combined_average"], 1.0);

        // Without a device timestamp the receive time is used.
        clock.set(3.0);
        gateway.ingest_processed(processed(3.5)).await.unwrap();
        let record = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.device_timestamp_ms, 3000);
        assert_eq!(record.values["combined_average"], 3.5);

        // The short frame was never forwarded.
        assert!(rx.try_recv().is_err());
        assert_eq!(gateway.stats().forwards_attempted, 3);
    }

    #[tokio::test]
    async fn test_forwarding_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();
        let gateway = IngestionGateway::builder(Arc::new(log))
            .clock(Arc::new(ManualClock::new(0.0)))
            .forwarder(Arc::new(FailingForwarder))
            .build();

        let receipt = gateway.ingest_raw(raw(vec![9; 8])).await.unwrap();
        assert!(receipt.persisted);
        assert!(wait_for(|| gateway.stats().forwards_failed == 1).await);
    }

    #[tokio::test]
    async fn test_stalled_forwarder_does_not_block_ingest() {
        let dir = TempDir::new().unwrap();
        let log = CsvSampleLog::open_in(dir.path()).await.unwrap();
        let gateway = IngestionGateway::builder(Arc::new(log))
            .clock(Arc::new(ManualClock::new(0.0)))
            .forwarder(Arc::new(StalledForwarder))
            .forward_timeout(Duration::from_millis(50))
            .build();

        let started = std::time::Instant::now();
        gateway.ingest_raw(raw(vec![9; 8])).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        assert!(wait_for(|| gateway.stats().forwards_failed == 1).await);
    }
}
