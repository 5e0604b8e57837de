//! Wall-clock bracketing around traced calls.

use std::fmt;
use std::time::{Duration, Instant};

/// Monotonic stopwatch started right before a traced call.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Elapsed {
        Elapsed(self.started.elapsed())
    }
}

/// Elapsed wall time of a traced call. Displays as milliseconds with two
/// decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Elapsed(Duration);

impl Elapsed {
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub const fn duration(&self) -> Duration {
        self.0
    }

    pub fn as_millis_f64(&self) -> f64 {
        self.0.as_secs_f64() * 1000.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ms", self.as_millis_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_display() {
        assert_eq!(Elapsed::new(Duration::from_micros(1234)).to_string(), "1.23 ms");
        assert_eq!(Elapsed::new(Duration::ZERO).to_string(), "0.00 ms");
        assert_eq!(Elapsed::new(Duration::from_secs(2)).to_string(), "2000.00 ms");
    }

    #[test]
    fn test_stopwatch_is_monotonic() {
        let stopwatch = Stopwatch::start();
        let first = stopwatch.elapsed();
        let second = stopwatch.elapsed();
        assert!(second >= first);
    }
}
