//! Randomized pacing between outbound actions.
//!
//! Delays are drawn uniformly from configured intervals per profile.
//! Pacing exists to serialize outbound requests and avoid bursty
//! traffic patterns; it never affects correctness and is disabled
//! wholesale in deterministic tests.

use std::time::Duration;

use rand::{thread_rng, Rng};
use tokio::time::sleep;
use tracing::debug;

use crate::config::{DelayRange, PacingConfig};

/// The suspension point a delay applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingProfile {
    /// Between listing pages of one category.
    InterPage,

    /// Between categories.
    InterCategory,

    /// Between individual elements on a page.
    PerElement,

    /// After a recoverable error; the longest interval.
    ErrorBackoff,
}

/// Produces randomized delays for navigation, element processing, and
/// error backoff.
#[derive(Debug, Clone)]
pub struct PacingPolicy {
    config: PacingConfig,
}

impl PacingPolicy {
    /// Create a policy from config.
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// A policy that never sleeps, for deterministic tests.
    pub fn disabled() -> Self {
        Self::new(PacingConfig::disabled())
    }

    fn range(&self, profile: PacingProfile) -> DelayRange {
        match profile {
            PacingProfile::InterPage => self.config.inter_page,
            PacingProfile::InterCategory => self.config.inter_category,
            PacingProfile::PerElement => self.config.per_element,
            PacingProfile::ErrorBackoff => self.config.error_backoff,
        }
    }

    /// Sample a delay for the profile without sleeping.
    pub fn sample(&self, profile: PacingProfile) -> Duration {
        if !self.config.enabled {
            return Duration::ZERO;
        }
        let range = self.range(profile);
        if range.max_ms <= range.min_ms {
            return Duration::from_millis(range.min_ms);
        }
        let ms = thread_rng().gen_range(range.min_ms..=range.max_ms);
        Duration::from_millis(ms)
    }

    /// Sleep for a sampled delay.
    pub async fn pause(&self, profile: PacingProfile) {
        let delay = self.sample(profile);
        if delay.is_zero() {
            return;
        }
        debug!(?profile, delay_ms = delay.as_millis() as u64, "pacing pause");
        sleep(delay).await;
    }
}

/// Sample a one-off delay from a range, honoring no policy switch.
///
/// Used by the lazy-load scroll loop, which keeps its own delay range.
pub fn sample_range(range: DelayRange) -> Duration {
    if range.max_ms <= range.min_ms {
        return Duration::from_millis(range.min_ms);
    }
    Duration::from_millis(thread_rng().gen_range(range.min_ms..=range.max_ms))
}
