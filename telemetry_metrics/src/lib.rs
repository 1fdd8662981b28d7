pub mod exporters;
pub mod summary;

pub use exporters::{JsonExporter, MarkdownExporter, PrometheusExporter};
pub use summary::{ChannelSummary, HistorySummary};
