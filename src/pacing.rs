//! Pacing scheduler: randomized waits, idle browsing, batch pauses.
//!
//! Every interactive step goes through this module so the observable
//! automation rhythm carries jitter instead of a fixed cadence.

use std::time::Duration;

use chromiumoxide::Page;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// An inclusive delay range in seconds, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// Sample a duration from this range.
    pub fn sample(&self) -> Duration {
        let (lo, hi) = if self.min_secs <= self.max_secs {
            (self.min_secs, self.max_secs)
        } else {
            (self.max_secs, self.min_secs)
        };
        let secs = if lo < hi {
            rand::rng().random_range(lo..hi)
        } else {
            lo
        };
        Duration::from_secs_f64(secs)
    }
}

/// Pacing configuration. All bounds are externally supplied; the defaults
/// mirror observed safe values for the target site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingSettings {
    /// Delay applied between retry attempts and after a session rebuild.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: DelayRange,

    /// Delay between processed products.
    #[serde(default = "default_step_delay")]
    pub step_delay: DelayRange,

    /// Medium pause taken after every 5th processed item.
    #[serde(default = "default_medium_pause")]
    pub medium_pause: DelayRange,

    /// Long pause taken after every 15th processed item.
    #[serde(default = "default_long_pause")]
    pub long_pause: DelayRange,

    /// Probability of an idle-browsing interlude after a product.
    #[serde(default = "default_idle_probability")]
    pub idle_probability: f64,
}

fn default_retry_delay() -> DelayRange {
    DelayRange::new(2.0, 5.0)
}

fn default_step_delay() -> DelayRange {
    DelayRange::new(4.0, 10.0)
}

fn default_medium_pause() -> DelayRange {
    DelayRange::new(120.0, 300.0)
}

fn default_long_pause() -> DelayRange {
    DelayRange::new(300.0, 600.0)
}

fn default_idle_probability() -> f64 {
    0.3
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            retry_delay: default_retry_delay(),
            step_delay: default_step_delay(),
            medium_pause: default_medium_pause(),
            long_pause: default_long_pause(),
            idle_probability: default_idle_probability(),
        }
    }
}

/// Which coarse rate-limiting gate applies after a given item index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPause {
    Medium,
    Long,
}

/// Decide the batch gate for a 1-based item index. Every 15th item takes the
/// long pause, every other 5th the medium one.
pub fn batch_pause_kind(index: usize) -> Option<BatchPause> {
    if index == 0 {
        return None;
    }
    if index % 15 == 0 {
        Some(BatchPause::Long)
    } else if index % 5 == 0 {
        Some(BatchPause::Medium)
    } else {
        None
    }
}

/// Produces humanized waits and idle interludes. Cheap to clone; holds only
/// configuration.
#[derive(Debug, Clone)]
pub struct PacingScheduler {
    settings: PacingSettings,
}

impl PacingScheduler {
    pub fn new(settings: PacingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PacingSettings {
        &self.settings
    }

    /// Sleep for a uniformly-sampled duration in `[min_secs, max_secs]`.
    pub async fn delay(&self, min_secs: f64, max_secs: f64) {
        let dur = DelayRange::new(min_secs, max_secs).sample();
        tokio::time::sleep(dur).await;
    }

    /// Sleep within a configured range.
    pub async fn delay_in(&self, range: DelayRange) {
        tokio::time::sleep(range.sample()).await;
    }

    /// The delay applied between retries and after a rebuild.
    pub async fn retry_delay(&self) {
        self.delay_in(self.settings.retry_delay).await;
    }

    /// With the configured probability, scroll down and partially back with
    /// interleaved delays, to break monotonic click-wait-click signatures.
    pub async fn idle(&self, page: &Page) {
        let (roll, distance, direction, back) = {
            let mut rng = rand::rng();
            (
                rng.random_bool(self.settings.idle_probability.clamp(0.0, 1.0)),
                rng.random_range(200..=800i64),
                if rng.random_bool(0.5) { 1i64 } else { -1 },
                rng.random_range(100..=400i64),
            )
        };
        if !roll {
            return;
        }
        debug!("idle browsing interlude");
        let _ = page
            .evaluate(format!("window.scrollBy(0, {});", distance * direction))
            .await;
        self.delay(1.0, 3.0).await;
        let _ = page
            .evaluate(format!("window.scrollBy(0, {});", back * -direction))
            .await;
        self.delay(0.5, 2.0).await;
    }

    /// Coarse rate-limiting gate after every 5th / 15th processed item,
    /// independent of per-step delays.
    pub async fn batch_pause(&self, index: usize) {
        let range = match batch_pause_kind(index) {
            Some(BatchPause::Long) => self.settings.long_pause,
            Some(BatchPause::Medium) => self.settings.medium_pause,
            None => return,
        };
        let dur = range.sample();
        info!("batch pause after {} items: {:.0}s", index, dur.as_secs_f64());
        tokio::time::sleep(dur).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stays_in_bounds() {
        let range = DelayRange::new(0.5, 2.0);
        for _ in 0..200 {
            let d = range.sample();
            assert!(d >= Duration::from_secs_f64(0.5));
            assert!(d < Duration::from_secs_f64(2.0));
        }
    }

    #[test]
    fn degenerate_range_is_constant() {
        let range = DelayRange::new(1.0, 1.0);
        assert_eq!(range.sample(), Duration::from_secs_f64(1.0));
    }

    #[test]
    fn inverted_range_is_normalized() {
        let range = DelayRange::new(3.0, 1.0);
        let d = range.sample();
        assert!(d >= Duration::from_secs_f64(1.0));
        assert!(d <= Duration::from_secs_f64(3.0));
    }

    #[test]
    fn batch_gates_fire_on_multiples() {
        assert_eq!(batch_pause_kind(1), None);
        assert_eq!(batch_pause_kind(4), None);
        assert_eq!(batch_pause_kind(5), Some(BatchPause::Medium));
        assert_eq!(batch_pause_kind(10), Some(BatchPause::Medium));
        assert_eq!(batch_pause_kind(15), Some(BatchPause::Long));
        assert_eq!(batch_pause_kind(30), Some(BatchPause::Long));
        assert_eq!(batch_pause_kind(0), None);
    }
}
