//! Stand-in for the acquisition device: produces raw frames and the matching
//! processed metric, and posts them to a running service.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use telemetry_core::{Clock, ProcessedUpload, RawUpload, SystemClock, CHANNEL_COUNT};
use tracing::{debug, warn};

/// Readings are drawn uniformly from this range.
pub const READING_RANGE: std::ops::Range<i64> = 100..500;
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct DeviceFrame {
    pub raw: RawUpload,
    pub processed: ProcessedUpload,
}

pub struct DeviceSimulator {
    rng: StdRng,
    session_id: Option<String>,
}

impl DeviceSimulator {
    pub fn new(seed: Option<u64>, session_id: Option<String>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, session_id }
    }

    pub fn next_frame(&mut self) -> DeviceFrame {
        let raw_data: Vec<i64> = (0..CHANNEL_COUNT)
            .map(|_| self.rng.gen_range(READING_RANGE))
            .collect();
        let combined_average = combined_average(&raw_data);

        DeviceFrame {
            raw: RawUpload {
                raw_data,
                session_id: self.session_id.clone(),
            },
            processed: ProcessedUpload {
                combined_average: Some(combined_average),
                timestamp: Some(SystemClock.now()),
                session_id: self.session_id.clone(),
            },
        }
    }
}

/// Mean of the two four-channel integer averages.
pub fn combined_average(raw: &[i64]) -> f64 {
    let half = raw.len() / 2;
    let (front, back) = raw.split_at(half);
    let p1 = front.iter().sum::<i64>() / half.max(1) as i64;
    let p2 = back.iter().sum::<i64>() / (raw.len() - half).max(1) as i64;
    (p1 + p2) as f64 / 2.0
}

/// Outcome of a [`MockDevice::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockRunReport {
    pub sent: u64,
    pub failed: u64,
}

impl MockRunReport {
    pub fn total(&self) -> u64 {
        self.sent + self.failed
    }
}

/// Posts simulated frames to a service.
pub struct MockDevice {
    simulator: DeviceSimulator,
    client: reqwest::Client,
    base_url: String,
}

impl MockDevice {
    pub fn new(base_url: impl Into<String>, simulator: DeviceSimulator) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            simulator,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Send one raw frame followed by its processed metric.
    pub async fn send_frame(&mut self) -> anyhow::Result<DeviceFrame> {
        let frame = self.simulator.next_frame();

        self.client
            .post(format!("{}/upload_raw", self.base_url))
            .json(&frame.raw)
            .send()
            .await?
            .error_for_status()?;

        self.client
            .post(format!("{}/upload_processed", self.base_url))
            .json(&frame.processed)
            .send()
            .await?
            .error_for_status()?;

        debug!("Sent frame {:?}", frame.raw.raw_data);
        Ok(frame)
    }

    /// Send frames at a fixed interval. Failed uploads are logged and the run
    /// continues; `frames = None` runs until the task is dropped.
    pub async fn run<F>(
        &mut self,
        frames: Option<u64>,
        interval: Duration,
        mut on_frame: F,
    ) -> MockRunReport
    where
        F: FnMut(&anyhow::Result<DeviceFrame>),
    {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        let mut report = MockRunReport::default();

        while frames.map_or(true, |limit| report.total() < limit) {
            ticker.tick().await;
            let result = self.send_frame().await;
            match &result {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Frame upload failed: {}", e);
                }
            }
            on_frame(&result);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_average_truncates_halves() {
        // p1 = 1000 / 4 = 250, p2 = 1003 / 4 = 250
        let raw = [100, 200, 300, 400, 250, 250, 250, 253];
        assert_eq!(combined_average(&raw), 250.0);

        // p1 = 101, p2 = 102
        let raw = [101, 101, 101, 101, 102, 102, 102, 102];
        assert_eq!(combined_average(&raw), 101.5);
    }

    #[test]
    fn test_frames_are_deterministic_with_seed() {
        let mut a = DeviceSimulator::new(Some(42), None);
        let mut b = DeviceSimulator::new(Some(42), None);

        for _ in 0..10 {
            let fa = a.next_frame();
            let fb = b.next_frame();
            assert_eq!(fa.raw.raw_data, fb.raw.raw_data);
            assert_eq!(fa.processed.combined_average, fb.processed.combined_average);
        }
    }

    #[tokio::test]
    async fn test_run_continues_after_failures() {
        let simulator = DeviceSimulator::new(Some(3), None);
        let mut device = MockDevice::new("http://127.0.0.1:9", simulator).unwrap();

        let mut seen = 0;
        let report = device
            .run(Some(2), Duration::from_millis(1), |result| {
                assert!(result.is_err());
                seen += 1;
            })
            .await;

        assert_eq!(report, MockRunReport { sent: 0, failed: 2 });
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_frame_shape_and_range() {
        let mut simulator = DeviceSimulator::new(Some(7), Some("mock".to_string()));
        let frame = simulator.next_frame();

        assert_eq!(frame.raw.raw_data.len(), CHANNEL_COUNT);
        assert!(frame.raw.raw_data.iter().all(|v| READING_RANGE.contains(v)));
        assert_eq!(
            frame.processed.combined_average,
            Some(combined_average(&frame.raw.raw_data))
        );
        assert_eq!(frame.raw.session_id.as_deref(), Some("mock"));
    }
}
