use std::time::{Duration, Instant};

/// One-shot deadline timer.
///
/// `arm` schedules expiry `delay` after `now`; `poll` reports the expiry
/// exactly once and disarms. Re-arming replaces the pending deadline.
#[derive(Debug, Clone)]
pub struct Timer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Timer {
    pub const fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` once when the deadline has passed, then disarms.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn unarmed_timer_never_fires() {
        let mut t = Timer::new(120 * MS);
        assert!(!t.poll(Instant::now()));
    }

    #[test]
    fn fires_once_after_delay() {
        let start = Instant::now();
        let mut t = Timer::new(120 * MS);
        t.arm(start);

        assert!(!t.poll(start + 119 * MS));
        assert!(t.poll(start + 120 * MS));
        assert!(!t.poll(start + 500 * MS));
        assert!(!t.is_armed());
    }

    #[test]
    fn rearm_pushes_deadline() {
        let start = Instant::now();
        let mut t = Timer::new(120 * MS);
        t.arm(start);
        t.arm(start + 100 * MS);

        assert!(!t.poll(start + 150 * MS));
        assert!(t.poll(start + 220 * MS));
    }

    #[test]
    fn cancel_disarms() {
        let start = Instant::now();
        let mut t = Timer::new(120 * MS);
        t.arm(start);
        t.cancel();
        assert!(!t.poll(start + 1000 * MS));
    }
}
