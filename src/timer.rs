//! Performance measurement tools.

use std::{
    fmt,
    time::{Duration, Instant},
};

use itertools::Itertools;

/// A timer that can measure and average the time an operation takes.
///
/// Collected timings are averaged when the timer is displayed using `{}`
/// ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    total: Duration,
    count: u32,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            total: Duration::ZERO,
            count: 0,
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&mut self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&mut self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Returns the number of recorded measurements since the timer was last displayed.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns the average recorded time, or `None` if nothing was recorded.
    pub fn average(&self) -> Option<Duration> {
        self.total.checked_div(self.count)
    }

    fn reset(&mut self) {
        self.total = Duration::ZERO;
        self.count = 0;
    }
}

/// Displays the average recorded time.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.average() {
            Some(avg) => write!(
                f,
                "{}: {}x{:.01}ms",
                self.name,
                self.count,
                avg.as_secs_f32() * 1000.0
            ),
            None => write!(f, "{}: -", self.name),
        }
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a mut Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.total += self.start.elapsed();
        self.timer.count += 1;
    }
}

/// A set of stage timers whose results are logged together.
pub(crate) struct Timers<const N: usize>(pub(crate) [Timer; N]);

impl<const N: usize> Timers<N> {
    /// Logs all timers at debug level and resets them.
    pub(crate) fn log_and_reset(&mut self) {
        log::debug!("{}", self.0.iter().join(", "));
        for timer in &mut self.0 {
            timer.reset();
        }
    }
}
