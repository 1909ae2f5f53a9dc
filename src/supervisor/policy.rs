use std::time::Duration;

use crate::config::RestartConfig;

/// Delay inserted between an engine exit and the next start.
///
/// The delay for attempt `n` is `first × factor^n`, clamped to `max`. The
/// attempt counter belongs to the supervisor, which resets it to zero after
/// any run that lasted at least `stable_after`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestartPolicy {
    pub first: Duration,
    pub max: Duration,
    pub factor: f64,
    pub stable_after: Duration,
}

impl RestartPolicy {
    /// Restart immediately, every time.
    pub fn immediate() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
            stable_after: Duration::ZERO,
        }
    }

    /// Delay before restart attempt `attempt` (0-indexed).
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Whether a run of this length counts as healthy.
    pub fn is_stable(&self, ran_for: Duration) -> bool {
        ran_for >= self.stable_after
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::from(&RestartConfig::default())
    }
}

impl From<&RestartConfig> for RestartPolicy {
    fn from(config: &RestartConfig) -> Self {
        Self {
            first: config.first_delay(),
            max: config.max_delay(),
            factor: config.factor,
            stable_after: config.stable_after(),
        }
    }
}
