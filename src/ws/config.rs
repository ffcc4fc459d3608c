#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

const DEFAULT_OPEN_TIMEOUT_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_INITIAL_BACKOFF_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Configuration for WebSocket client behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum time a connection attempt may take to reach the open state
    pub open_timeout: Duration,
    /// Reconnection strategy configuration
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            open_timeout: DEFAULT_OPEN_TIMEOUT_DURATION,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_open_timeout(mut self, open_timeout: Duration) -> Self {
        self.open_timeout = open_timeout;
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// Configuration for automatic reconnection behavior.
///
/// The delay before the `n`th consecutive retry is
/// `min(initial_backoff * backoff_multiplier^(n - 1), max_backoff)`, with no jitter.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts before giving up.
    /// `None` means infinite retries.
    pub max_attempts: Option<u32>,
    /// Initial backoff duration for first reconnection attempt
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_RECONNECT_ATTEMPTS),
            initial_backoff: DEFAULT_INITIAL_BACKOFF_DURATION,
            max_backoff: DEFAULT_MAX_BACKOFF_DURATION,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl ReconnectConfig {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }
}

impl From<ReconnectConfig> for ExponentialBackoff {
    fn from(config: ReconnectConfig) -> Self {
        ExponentialBackoffBuilder::default()
            .with_initial_interval(config.initial_backoff)
            .with_max_interval(config.max_backoff)
            .with_multiplier(config.backoff_multiplier)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None) // We handle max attempts separately
            .build()
    }
}

#[cfg(test)]
mod tests {
    use backoff::backoff::Backoff as _;

    use super::*;

    #[test]
    fn backoff_sequence_doubles_until_cap() {
        let mut backoff: ExponentialBackoff = ReconnectConfig::default().into();

        let delays: Vec<u128> = (0..7)
            .map(|_| backoff.next_backoff().unwrap().as_millis())
            .collect();

        assert_eq!(delays, [1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn backoff_reset_starts_over() {
        let mut backoff: ExponentialBackoff = ReconnectConfig::default().into();
        for _ in 0..4 {
            let _next = backoff.next_backoff();
        }

        backoff.reset();

        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn backoff_respects_max() {
        let config = ReconnectConfig::default()
            .with_initial_backoff(Duration::from_secs(1))
            .with_max_backoff(Duration::from_secs(2));
        let mut backoff: ExponentialBackoff = config.into();

        for _ in 0..10 {
            let _next = backoff.next_backoff();
        }

        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn defaults_match_chat_service() {
        let config = Config::default();

        assert_eq!(config.open_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect.max_attempts, Some(5));
        assert_eq!(config.reconnect.max_backoff, Duration::from_secs(30));
    }
}
