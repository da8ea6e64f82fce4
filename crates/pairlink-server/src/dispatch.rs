//! Send simulation: outcome and latency draws for dispatch tasks.

use std::time::Duration;

use pairlink_core::DispatchFailure;
use pairlink_settings::DispatchSettings;
use rand::Rng;

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Probability that a task fails.
    pub failure_rate: f64,
    pub min_latency: Duration,
    pub max_latency: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from(&DispatchSettings::default())
    }
}

impl From<&DispatchSettings> for DispatchConfig {
    fn from(s: &DispatchSettings) -> Self {
        Self {
            failure_rate: s.failure_rate.clamp(0.0, 1.0),
            min_latency: Duration::from_millis(s.min_latency_ms),
            max_latency: Duration::from_millis(s.max_latency_ms.max(s.min_latency_ms)),
        }
    }
}

impl DispatchConfig {
    /// No latency, default failure rate.
    pub fn immediate() -> Self {
        Self {
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Uniform draw in `[min_latency, max_latency]`.
    pub fn sample_latency<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_latency <= self.min_latency {
            return self.min_latency;
        }
        let min = self.min_latency.as_millis() as u64;
        let max = self.max_latency.as_millis() as u64;
        Duration::from_millis(rng.gen_range(min..=max))
    }
}

/// Fail with probability `failure_rate`, picking the reason uniformly.
pub fn draw_outcome<R: Rng + ?Sized>(rng: &mut R, failure_rate: f64) -> Result<(), DispatchFailure> {
    if rng.gen::<f64>() < failure_rate {
        let reasons = DispatchFailure::ALL;
        Err(reasons[rng.gen_range(0..reasons.len())])
    } else {
        Ok(())
    }
}
