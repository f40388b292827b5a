//! Bounded exponential backoff with jitter for directions retries.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    retries_left: u32,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, max_retries: u32) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            current: base,
            max: max.max(base),
            retries_left: max_retries,
            jitter_ratio: 0.2,
        }
    }

    /// Delay before the next retry, or `None` once retries are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries_left == 0 {
            return None;
        }
        self.retries_left -= 1;
        let delay = add_jitter(self.current, self.jitter_ratio);
        self.current = self.current.saturating_mul(2).min(self.max);
        Some(delay)
    }
}

fn add_jitter(delay: Duration, ratio: f64) -> Duration {
    let delay_ms = delay.as_millis();
    let jitter_ms_max = ((delay_ms as f64) * ratio.clamp(0.0, 1.0)) as u128;
    if jitter_ms_max == 0 {
        return delay;
    }

    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u128)
        .unwrap_or(0);
    delay + Duration::from_millis((now_nanos % (jitter_ms_max + 1)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_exactly_max_retries_delays() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1), 3);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn delays_double_and_saturate() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(250), 4);

        let first = backoff.next_delay().unwrap();
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(120));

        let second = backoff.next_delay().unwrap();
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(240));

        let third = backoff.next_delay().unwrap();
        assert!(third >= Duration::from_millis(250) && third <= Duration::from_millis(300));
    }

    #[test]
    fn zero_retries_never_waits() {
        let mut backoff = Backoff::new(Duration::ZERO, Duration::ZERO, 0);
        assert!(backoff.next_delay().is_none());
    }
}
