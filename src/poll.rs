use std::time::{Duration, Instant};

use log::debug;

/// Time source for the polling loops.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock time and real `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounds for a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Give up once this much time has passed since the loop started.
    pub timeout: Duration,
    /// Pause between probes.
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// Run `probe` until it returns `true` or `policy.timeout` elapses.
///
/// Each round sleeps `policy.interval` and then probes. Returns whether the
/// probe succeeded; running out of time is a normal outcome.
pub fn poll_until<C, F>(clock: &mut C, policy: PollPolicy, probe: F) -> bool
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    let start = clock.now();
    poll_until_since(clock, start, policy, probe)
}

/// Like [`poll_until`], but measures the timeout from `start`.
pub fn poll_until_since<C, F>(clock: &mut C, start: Instant, policy: PollPolicy, mut probe: F) -> bool
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    let mut attempts = 0u32;
    while clock.now().saturating_duration_since(start) < policy.timeout {
        clock.sleep(policy.interval);
        attempts += 1;
        if probe() {
            debug!("poll satisfied after {attempts} attempt(s)");
            return true;
        }
    }
    debug!(
        "poll gave up after {attempts} attempt(s) ({:?})",
        policy.timeout
    );
    false
}

/// A clock that only moves when slept on.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    origin: Instant,
    elapsed: Duration,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed
    }

    fn sleep(&mut self, duration: Duration) {
        self.elapsed += duration;
    }
}
