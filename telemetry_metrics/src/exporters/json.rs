use crate::summary::HistorySummary;
use anyhow::Result;
use std::path::Path;

pub struct JsonExporter;

impl JsonExporter {
    pub async fn export(summary: &HistorySummary, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(summary)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn to_string(summary: &HistorySummary) -> Result<String> {
        Ok(serde_json::to_string_pretty(summary)?)
    }
}
