//! Time sources and scoped timing spans.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use crate::logger::Logger;

/// A monotonic clock reading seconds.
///
/// Any `FnMut() -> f64 + Send` closure is a time source, which lets tests
/// drive the logger with a synthetic clock.
pub trait TimeSource: Send {
    /// Current time in seconds.
    fn now(&mut self) -> f64;
}

impl<F> TimeSource for F
where
    F: FnMut() -> f64 + Send,
{
    fn now(&mut self) -> f64 {
        self()
    }
}

/// Wall-clock seconds elapsed since construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// A clock reading zero now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Unit a [`TimedSpan`] records its duration in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    /// Milliseconds.
    Millis,
    /// Microseconds.
    Micros,
}

impl TimeUnit {
    /// `elapsed` expressed in this unit.
    pub fn convert(self, elapsed: Duration) -> f64 {
        match self {
            Self::Millis => elapsed.as_secs_f64() * 1e3,
            Self::Micros => elapsed.as_secs_f64() * 1e6,
        }
    }
}

/// Records the wall time of a scope as an output when dropped.
///
/// Returned by [`Logger::time_ms`] and [`Logger::time_us`]. The span
/// dereferences to the logger, so the timed code keeps full access to it:
///
/// ```
/// use looplog_engine::{Logger, LoggerConfig};
///
/// let mut logger = Logger::new(LoggerConfig::default()).unwrap();
/// logger.start().unwrap();
/// {
///     let mut span = logger.time_ms("Timing/Planner");
///     span.record_output("Planner/Steps", 12i64);
/// }
/// assert!(logger.entry().contains("RealOutputs/Timing/Planner"));
/// logger.end();
/// ```
///
/// A span opened while the logger is stopped records nothing.
pub struct TimedSpan<'a> {
    logger: &'a mut Logger,
    key: Option<String>,
    unit: TimeUnit,
    started: Instant,
}

impl<'a> TimedSpan<'a> {
    pub(crate) fn new(logger: &'a mut Logger, key: &str, unit: TimeUnit) -> Self {
        let key = logger.is_running().then(|| key.to_owned());
        Self {
            logger,
            key,
            unit,
            started: Instant::now(),
        }
    }
}

impl Deref for TimedSpan<'_> {
    type Target = Logger;

    fn deref(&self) -> &Logger {
        self.logger
    }
}

impl DerefMut for TimedSpan<'_> {
    fn deref_mut(&mut self) -> &mut Logger {
        self.logger
    }
}

impl Drop for TimedSpan<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let elapsed = self.unit.convert(self.started.elapsed());
            self.logger.record_output(&key, elapsed);
        }
    }
}
