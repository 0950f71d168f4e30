use crate::app::ports::PacerPort;
use async_trait::async_trait;
use std::time::Duration;

/// Sleeps a fixed delay between rows to stay under the API's rate limit.
pub struct FixedDelayPacer(pub Duration);

#[async_trait]
impl PacerPort for FixedDelayPacer {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn waits_at_least_the_configured_delay() {
        let start = Instant::now();
        FixedDelayPacer(Duration::from_millis(20)).pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        FixedDelayPacer(Duration::ZERO).pause().await;
    }
}
