//! Clock abstraction so choreography timing is testable without real sleeps.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Source of waits for hover/click choreography.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by `tokio::time::sleep`.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that records requested sleeps and returns immediately.
///
/// Lets tests assert on the exact wait choreography (poll checkpoints,
/// dismiss delays) without slowing the suite down.
#[derive(Default)]
pub struct FakeClock {
    slept: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sleeps requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    /// Total time that would have been slept.
    pub fn total_slept(&self) -> Duration {
        self.slept.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_records() {
        tokio_test::block_on(async {
            let clock = FakeClock::new();
            clock.sleep(Duration::from_millis(120)).await;
            clock.sleep(Duration::from_millis(140)).await;
            assert_eq!(
                clock.sleeps(),
                vec![Duration::from_millis(120), Duration::from_millis(140)]
            );
            assert_eq!(clock.total_slept(), Duration::from_millis(260));
        });
    }
}
