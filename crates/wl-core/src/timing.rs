//! Wall-clock measurement and budgets.

use std::time::{Duration, Instant};

/// Measures elapsed time from its creation.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Optional wall-clock limit. `Budget::unlimited()` never expires.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    watch: Stopwatch,
    limit: Option<Duration>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self {
            watch: Stopwatch::start(),
            limit: None,
        }
    }

    /// Budget of `seconds` starting now. Non-positive or non-finite
    /// values expire immediately.
    pub fn seconds(seconds: f64) -> Self {
        let limit = if seconds.is_finite() && seconds > 0.0 {
            Duration::from_secs_f64(seconds)
        } else {
            Duration::ZERO
        };
        Self {
            watch: Stopwatch::start(),
            limit: Some(limit),
        }
    }

    pub fn from_option(seconds: Option<f64>) -> Self {
        match seconds {
            Some(s) => Self::seconds(s),
            None => Self::unlimited(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        match self.limit {
            Some(limit) => self.watch.start.elapsed() >= limit,
            None => false,
        }
    }

    pub fn elapsed_s(&self) -> f64 {
        self.watch.elapsed_s()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_expires() {
        assert!(!Budget::unlimited().is_exhausted());
        assert!(!Budget::from_option(None).is_exhausted());
    }

    #[test]
    fn zero_budget_is_exhausted() {
        assert!(Budget::seconds(0.0).is_exhausted());
        assert!(Budget::seconds(f64::NAN).is_exhausted());
    }

    #[test]
    fn generous_budget_is_not_exhausted() {
        assert!(!Budget::seconds(3600.0).is_exhausted());
    }
}
