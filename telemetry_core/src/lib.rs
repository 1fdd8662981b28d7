pub mod aggregator;
pub mod clock;
pub mod error;
pub mod forwarder;
pub mod gateway;
pub mod publisher;
pub mod sample;
pub mod stats;
pub mod storage;

pub use aggregator::{AggregationWindow, WindowedAggregator, DEFAULT_FLUSH_INTERVAL};
pub use clock::{Clock, DynClock, ManualClock, SystemClock};
pub use error::{Result, TelemetryError};
pub use forwarder::{DynForwarder, ForwardRecord, Forwarder, HttpForwarder, HttpForwarderConfig};
pub use gateway::{GatewayBuilder, IngestionGateway, ProcessedReceipt, RawReceipt, DEFAULT_SESSION_ID};
pub use publisher::{LatestState, LatestValuePublisher};
pub use sample::{
    ProcessedMetric, ProcessedUpload, PublishedAggregate, RawSample, RawUpload, CHANNEL_COUNT,
};
pub use stats::{IngestStats, StatsSnapshot};
pub use storage::{CsvSampleLog, DynSampleLog, SampleLog};

// Re-export commonly used types
pub use async_trait::async_trait;
