//! Mock detection source: fixed or seeded-random timecodes.

use std::path::Path;

use async_trait::async_trait;
use benthos_core::detection::RawFinding;
use benthos_core::CoreResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Detector, ProgressObserver};

/// The historical demo timecodes: the original mock model "detected" an
/// organism at 1.5, 3.0, and 4.5 seconds.
pub const DEFAULT_TIMECODES: &[f64] = &[1.5, 3.0, 4.5];

/// How the mock produces its timecodes.
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Always return these times, in order.
    Fixed(Vec<f64>),
    /// `count` times drawn uniformly from `0..max_time`, sorted. A seed
    /// makes the draw reproducible.
    Random {
        count: usize,
        max_time: f64,
        seed: Option<u64>,
    },
}

/// Deterministic/mock detection source.
///
/// Emits bare timestamps only — no labels, confidences, or image patches —
/// matching what the stub model produced before a real engine existed.
#[derive(Debug, Clone)]
pub struct MockDetector {
    mode: MockMode,
}

impl MockDetector {
    pub fn new(mode: MockMode) -> Self {
        Self { mode }
    }

    /// The fixed-timecode mock used by demos.
    pub fn fixed_default() -> Self {
        Self::new(MockMode::Fixed(DEFAULT_TIMECODES.to_vec()))
    }

    fn timecodes(&self) -> Vec<f64> {
        match &self.mode {
            MockMode::Fixed(times) => times.clone(),
            MockMode::Random {
                count,
                max_time,
                seed,
            } => {
                let mut rng: StdRng = match seed {
                    Some(s) => StdRng::seed_from_u64(*s),
                    None => StdRng::from_os_rng(),
                };
                let mut times: Vec<f64> =
                    (0..*count).map(|_| rng.random_range(0.0..*max_time)).collect();
                times.sort_by(|a, b| a.total_cmp(b));
                times
            }
        }
    }
}

#[async_trait]
impl Detector for MockDetector {
    async fn detect(
        &self,
        video_path: &Path,
        progress: Option<ProgressObserver>,
    ) -> CoreResult<Vec<RawFinding>> {
        tracing::debug!(video = %video_path.display(), "Mock detection run");

        let times = self.timecodes();
        let findings: Vec<RawFinding> = times.iter().map(|t| RawFinding::at(*t)).collect();

        if let Some(observe) = progress {
            observe(0);
            for (i, _) in findings.iter().enumerate() {
                let pct = ((i + 1) * 100 / findings.len().max(1)) as u8;
                observe(pct);
            }
            observe(100);
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn fixed_mode_returns_the_historical_timecodes() {
        let detector = MockDetector::fixed_default();
        let findings = detector.detect(Path::new("dive.mp4"), None).await.unwrap();
        let times: Vec<f64> = findings.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![1.5, 3.0, 4.5]);
        assert!(findings.iter().all(|f| f.label.is_none()));
        assert!(findings.iter().all(|f| f.confidence.is_none()));
    }

    #[tokio::test]
    async fn seeded_random_is_reproducible_and_bounded() {
        let mode = MockMode::Random {
            count: 5,
            max_time: 30.0,
            seed: Some(7),
        };
        let a = MockDetector::new(mode.clone())
            .detect(Path::new("a.mp4"), None)
            .await
            .unwrap();
        let b = MockDetector::new(mode)
            .detect(Path::new("b.mp4"), None)
            .await
            .unwrap();

        let times_a: Vec<f64> = a.iter().map(|f| f.time).collect();
        let times_b: Vec<f64> = b.iter().map(|f| f.time).collect();
        assert_eq!(times_a, times_b);
        assert_eq!(times_a.len(), 5);
        assert!(times_a.iter().all(|t| (0.0..30.0).contains(t)));
        assert!(times_a.windows(2).all(|w| w[0] <= w[1]), "sorted: {times_a:?}");
    }

    #[tokio::test]
    async fn progress_is_monotone_and_ends_at_100() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: ProgressObserver = Arc::new(move |v| sink.lock().unwrap().push(v));

        MockDetector::fixed_default()
            .detect(Path::new("dive.mp4"), Some(observer))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen.first().unwrap(), 0);
        assert_eq!(*seen.last().unwrap(), 100);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "monotone: {seen:?}");
        assert!(seen.iter().all(|v| *v <= 100));
    }
}
