// ============================================
// TIMING UTILITY - Phase durations
// ============================================
// Usage:
//   1. Scoped: let _timer = Timer::start("base query");  // logs on drop
//   2. Manual: let timer = Timer::silent("export"); ...; timer.elapsed_ms()
//   3. Wrapper: let out = timed("derive columns", || process(rows));
// ============================================

use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Anything slower than this is logged at warn level
pub const SLOW_PHASE_MS: u128 = 5_000;

pub struct Timer {
    name: String,
    start: Instant,
    silent: bool,
}

impl Timer {
    /// Start a timer that logs its duration when dropped
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            silent: false,
        }
    }

    /// Start a timer that never logs on its own
    pub fn silent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            silent: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn log_duration(&self, duration: Duration) {
        let ms = duration.as_millis();
        if ms >= SLOW_PHASE_MS {
            warn!(phase = %self.name, elapsed_ms = ms as u64, "slow phase");
        } else {
            info!(phase = %self.name, elapsed_ms = ms as u64, "phase complete");
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.silent {
            self.log_duration(self.start.elapsed());
        }
    }
}

/// Time a synchronous closure (shorthand)
pub fn timed<F, R>(name: impl Into<String>, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _timer = Timer::start(name);
    f()
}
