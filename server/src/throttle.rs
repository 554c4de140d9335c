//! Per-session token bucket for change requests.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Throttle {
    capacity: u32,
    interval: Duration,
    tokens: u32,
    last_refill: Instant,
}

impl Throttle {
    /// A bucket holding up to `capacity` tokens, gaining one every `interval`.
    /// It starts full. A zero interval never throttles.
    pub fn new(capacity: u32, interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            interval,
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Takes a token if one is available.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&mut self, now: Instant) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = elapsed.as_nanos() / self.interval.as_nanos();
        if earned > 0 {
            let tokens = (self.tokens as u128 + earned).min(self.capacity as u128) as u32;
            if tokens == self.capacity {
                self.last_refill = now;
            } else {
                // earned < capacity here, so the cast cannot truncate
                self.last_refill += self.interval * earned as u32;
            }
            self.tokens = tokens;
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}
