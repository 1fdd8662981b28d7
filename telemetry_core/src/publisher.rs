use crate::sample::{PublishedAggregate, RawSample};
use tokio::sync::RwLock;

/// Point-in-time view of the newest values.
#[derive(Debug, Clone, Default)]
pub struct LatestState {
    pub aggregate: PublishedAggregate,
    pub raw: Option<RawSample>,
}

/// Holds the most recent aggregate and raw sample.
///
/// Each slot is replaced wholesale under a write lock, so readers see either
/// the previous value or the new one, never a mix of the two.
pub struct LatestValuePublisher {
    aggregate: RwLock<PublishedAggregate>,
    raw: RwLock<Option<RawSample>>,
}

impl LatestValuePublisher {
    pub fn new() -> Self {
        Self {
            aggregate: RwLock::new(PublishedAggregate::placeholder()),
            raw: RwLock::new(None),
        }
    }

    pub async fn publish_raw(&self, sample: RawSample) {
        *self.raw.write().await = Some(sample);
    }

    pub async fn publish_aggregate(&self, aggregate: PublishedAggregate) {
        *self.aggregate.write().await = aggregate;
    }

    pub async fn read_latest_raw(&self) -> Option<RawSample> {
        self.raw.read().await.clone()
    }

    pub async fn read_latest_aggregate(&self) -> PublishedAggregate {
        self.aggregate.read().await.clone()
    }

    pub async fn snapshot(&self) -> LatestState {
        LatestState {
            aggregate: self.read_latest_aggregate().await,
            raw: self.read_latest_raw().await,
        }
    }
}

impl Default for LatestValuePublisher {
    fn default() -> Self {
        Self::new()
    }
}
