pub mod csv_log;

use crate::{
    error::Result,
    sample::{PublishedAggregate, RawSample},
};
use async_trait::async_trait;
use std::sync::Arc;

pub use csv_log::{CsvSampleLog, AGGREGATE_LOG_FILE, AGGREGATE_LOG_HEADER, RAW_LOG_FILE, RAW_LOG_HEADER};

/// Append-only persistence for raw samples and published aggregates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SampleLog: Send + Sync {
    /// Durably append a raw sample. Samples without exactly eight channels
    /// are dropped and `Ok(false)` is returned.
    async fn append_raw(&self, sample: &RawSample) -> Result<bool>;

    /// Durably append a published aggregate.
    async fn append_aggregate(&self, aggregate: &PublishedAggregate) -> Result<()>;

    /// Every persisted raw sample, in append order.
    async fn read_all_raw(&self) -> Result<Vec<RawSample>>;

    /// Every persisted aggregate, in append order.
    async fn read_all_aggregate(&self) -> Result<Vec<PublishedAggregate>>;

    fn backend_type(&self) -> &'static str;
}

pub type DynSampleLog = Arc<dyn SampleLog>;
