//! Reconnection policy with exponential backoff and jitter.

use std::time::{Duration, Instant};

use rand::Rng;

use super::types::WebSocketConfig;

/// Reconnection policy with exponential backoff and full jitter.
///
/// Implements the "Full Jitter" algorithm recommended by AWS:
/// <https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/>
#[derive(Debug)]
pub struct ReconnectPolicy {
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    max_attempts: u32,
    current_attempt: u32,
    last_attempt: Option<Instant>,
}

impl ReconnectPolicy {
    /// Create a new reconnect policy from configuration.
    #[must_use]
    pub fn new(config: &WebSocketConfig) -> Self {
        Self {
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.backoff_multiplier,
            max_attempts: config.max_reconnect_attempts,
            current_attempt: 0,
            last_attempt: None,
        }
    }

    /// Calculate the next backoff duration with jitter.
    ///
    /// Returns `None` if max attempts have been exceeded.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }

        let base_ms = self.initial_backoff.as_millis() as f64;
        let exponential = base_ms
            * self
                .multiplier
                .powi(i32::try_from(self.current_attempt).unwrap_or(i32::MAX));
        let capped = exponential.min(self.max_backoff.as_millis() as f64);

        let jitter = rand::rng().random_range(0.0..capped);

        self.current_attempt += 1;
        self.last_attempt = Some(Instant::now());

        Some(Duration::from_millis(jitter as u64))
    }

    /// Reset the policy after a successful connection.
    pub fn reset(&mut self) {
        self.current_attempt = 0;
        self.last_attempt = None;
    }

    /// Get the current attempt count.
    #[must_use]
    pub const fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Check if reconnection should be attempted.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        self.current_attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebSocketConfig {
        let mut config = WebSocketConfig::new("wss://public", "wss://private", "usd", "key", "secret");
        config.initial_backoff = Duration::from_millis(100);
        config.max_backoff = Duration::from_secs(10);
        config.max_reconnect_attempts = 5;
        config
    }

    #[test]
    fn reconnect_policy_next_backoff() {
        let mut policy = ReconnectPolicy::new(&config());

        let first = policy.next_backoff().unwrap();
        assert!(first <= Duration::from_millis(100));

        let second = policy.next_backoff().unwrap();
        assert!(second <= Duration::from_millis(200));

        assert_eq!(policy.current_attempt(), 2);
    }

    #[test]
    fn reconnect_policy_exhausted() {
        let mut config = config();
        config.max_reconnect_attempts = 3;
        let mut policy = ReconnectPolicy::new(&config);

        assert!(policy.next_backoff().is_some());
        assert!(policy.next_backoff().is_some());
        assert!(policy.next_backoff().is_some());
        assert!(policy.next_backoff().is_none());
        assert!(!policy.should_reconnect());
    }

    #[test]
    fn reconnect_policy_reset() {
        let mut policy = ReconnectPolicy::new(&config());
        let _ = policy.next_backoff();
        let _ = policy.next_backoff();
        assert_eq!(policy.current_attempt(), 2);

        policy.reset();
        assert_eq!(policy.current_attempt(), 0);
        assert!(policy.should_reconnect());
    }
}
