//! Real-time frame pacing.
//!
//! The deadline advances by one frame period per frame. If the host falls
//! more than a second behind (suspended, stopped in a debugger), the
//! deadline jumps to now instead of racing to catch up.

use std::time::{Duration, Instant};

use log::debug;

use crate::config::RefreshRate;

const MAX_LAG: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct FrameTimer {
    period: Duration,
    turbo: bool,
    deadline: Option<Instant>,
}

impl FrameTimer {
    #[must_use]
    pub fn new(refresh: RefreshRate, turbo: bool) -> Self {
        Self { period: refresh.frame_period(), turbo, deadline: None }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// How long to wait before starting the next frame.
    pub fn schedule(&mut self, now: Instant) -> Duration {
        if self.turbo {
            return Duration::ZERO;
        }
        let mut deadline = self.deadline.unwrap_or(now) + self.period;
        if now.saturating_duration_since(deadline) > MAX_LAG {
            debug!("frame timer {:?} behind, resynchronising", now - deadline);
            deadline = now;
        }
        self.deadline = Some(deadline);
        deadline.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paces_at_refresh_rate() {
        let start = Instant::now();
        let mut timer = FrameTimer::new(RefreshRate::Hz50, false);
        assert_eq!(timer.schedule(start), Duration::from_millis(20));
        assert_eq!(timer.schedule(start + Duration::from_millis(5)), Duration::from_millis(35));
        assert_eq!(timer.schedule(start + Duration::from_millis(60)), Duration::ZERO);
    }

    #[test]
    fn sixty_hz_period() {
        let timer = FrameTimer::new(RefreshRate::Hz60, false);
        assert_eq!(timer.period(), Duration::from_micros(16_667));
    }

    #[test]
    fn turbo_never_waits() {
        let mut timer = FrameTimer::new(RefreshRate::Hz50, true);
        assert_eq!(timer.schedule(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn long_stall_resyncs() {
        let start = Instant::now();
        let mut timer = FrameTimer::new(RefreshRate::Hz50, false);
        timer.schedule(start);
        let later = start + Duration::from_secs(5);
        assert_eq!(timer.schedule(later), Duration::ZERO);
        assert_eq!(timer.schedule(later), Duration::from_millis(20));
    }
}
