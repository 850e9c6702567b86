use std::thread;
use std::time::{Duration, Instant};

/// Blocking fixed-rate scheduler for headless hosts.
///
/// `wait` sleeps until the next deadline. A tick that overruns pushes the
/// schedule back instead of queueing catch-up ticks.
pub struct TickScheduler {
    period: Duration,
    next: Instant,
}

impl TickScheduler {
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            period: period_for(ticks_per_second),
            next: Instant::now(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        }
        self.next = advance(self.next, self.period, Instant::now());
    }
}

/// Tick period for a rate; zero is treated as one tick per second.
pub fn period_for(ticks_per_second: u32) -> Duration {
    Duration::from_secs(1) / ticks_per_second.max(1)
}

fn advance(deadline: Instant, period: Duration, now: Instant) -> Instant {
    (deadline + period).max(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(30, 33_333_333)]
    #[case(1, 1_000_000_000)]
    #[case(0, 1_000_000_000)]
    fn test_period_for(#[case] rate: u32, #[case] nanos: u64) {
        assert_eq!(period_for(rate), Duration::from_nanos(nanos));
    }

    #[test]
    fn test_advance_on_schedule() {
        let start = Instant::now();
        let period = Duration::from_millis(33);
        let next = advance(start, period, start + Duration::from_millis(5));
        assert_eq!(next, start + period);
    }

    #[test]
    fn test_advance_after_overrun_does_not_catch_up() {
        let start = Instant::now();
        let period = Duration::from_millis(33);
        let late = start + Duration::from_millis(200);
        assert_eq!(advance(start, period, late), late);
    }

    #[test]
    fn test_wait_paces_ticks() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::new(100);
        for _ in 0..4 {
            scheduler.wait();
        }
        // first wait is immediate, three more periods follow
        assert!(start.elapsed() >= scheduler.period() * 3);
    }
}
