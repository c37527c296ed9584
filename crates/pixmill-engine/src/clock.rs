//! Time source for slice budgets and completion timing.
//!
//! The engine never reads the system clock directly. Timestamps go
//! through a [`Clock`] so hosts can substitute their own source (and
//! tests can make slicing deterministic). [`SystemClock`] uses the
//! `web-time` crate, which maps to `performance.now()` on WASM and
//! `std::time::Instant` on native targets.

use std::time::Duration;

/// A monotonic time source.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant: Copy;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Serde support for `Duration` as integer milliseconds.
pub(crate) mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let start = clock.now();
        let first = clock.elapsed(&start);
        let second = clock.elapsed(&start);
        assert!(second >= first);
    }
}
