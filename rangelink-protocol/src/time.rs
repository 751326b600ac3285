//! Wall-clock time for sample timestamps
//!
//! Samples carry the sender's wall clock, not a monotonic instant, because the
//! far end compares it against its own wall clock. The two clocks are never
//! synchronized; the calibrator estimates the constant difference.

use std::cell::Cell;
use std::fmt;
use std::ops::{Add, Sub};
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MICROS_PER_SEC: i128 = 1_000_000;

/// Wall-clock timestamp with microsecond resolution
///
/// Stored as whole seconds since the Unix epoch plus a microsecond part that
/// is always normalized to `0..1_000_000`, matching the wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallTime {
    secs: i64,
    micros: u32,
}

impl WallTime {
    /// The Unix epoch
    pub const EPOCH: WallTime = WallTime { secs: 0, micros: 0 };

    /// Create a timestamp from its wire parts
    ///
    /// A microsecond part of one second or more is carried into `secs`.
    pub fn new(secs: i64, micros: u32) -> Self {
        WallTime {
            secs: secs.saturating_add(i64::from(micros / 1_000_000)),
            micros: micros % 1_000_000,
        }
    }

    /// Read the system wall clock
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => WallTime::from_micros(since.as_micros() as i128),
            // Clock set before 1970
            Err(e) => WallTime::from_micros(-(e.duration().as_micros() as i128)),
        }
    }

    /// Create a timestamp from signed microseconds since the epoch
    pub fn from_micros(micros: i128) -> Self {
        let secs = micros.div_euclid(MICROS_PER_SEC);
        let rem = micros.rem_euclid(MICROS_PER_SEC);
        WallTime {
            secs: secs.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            micros: rem as u32,
        }
    }

    /// Signed microseconds since the epoch
    #[inline]
    pub fn as_micros(&self) -> i128 {
        self.secs as i128 * MICROS_PER_SEC + self.micros as i128
    }

    /// Whole seconds since the epoch
    #[inline]
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Sub-second part in microseconds
    #[inline]
    pub fn subsec_micros(&self) -> u32 {
        self.micros
    }

    /// Signed milliseconds from `earlier` to `self`
    ///
    /// Negative when `earlier` is actually later, which happens routinely
    /// when the two timestamps come from unsynchronized clocks.
    pub fn millis_since(&self, earlier: WallTime) -> f64 {
        (self.as_micros() - earlier.as_micros()) as f64 / 1_000.0
    }

    /// Shift the timestamp by a signed number of microseconds
    pub fn offset_micros(self, delta: i64) -> Self {
        WallTime::from_micros(self.as_micros() + delta as i128)
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

impl Add<Duration> for WallTime {
    type Output = WallTime;

    fn add(self, duration: Duration) -> WallTime {
        WallTime::from_micros(self.as_micros() + duration.as_micros() as i128)
    }
}

impl Sub<Duration> for WallTime {
    type Output = WallTime;

    fn sub(self, duration: Duration) -> WallTime {
        WallTime::from_micros(self.as_micros() - duration.as_micros() as i128)
    }
}

/// Source of wall-clock readings
///
/// Roles read time through this trait so tests can drive them with a
/// controlled, optionally skewed, clock.
pub trait Clock {
    fn now(&self) -> WallTime;
}

/// The host's real-time clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> WallTime {
        WallTime::now()
    }
}

/// Manually advanced clock for deterministic tests
///
/// Clones share the same underlying time. [`ManualClock::skewed`] returns a
/// view of the same time shifted by a fixed amount, which models a second
/// host whose clock is off by a constant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Rc<Cell<WallTime>>,
    skew_micros: i64,
}

impl ManualClock {
    /// Create a clock reading `start`
    pub fn new(start: WallTime) -> Self {
        ManualClock {
            base: Rc::new(Cell::new(start)),
            skew_micros: 0,
        }
    }

    /// A clock sharing this one's time but reading `skew_micros` ahead
    pub fn skewed(&self, skew_micros: i64) -> Self {
        ManualClock {
            base: Rc::clone(&self.base),
            skew_micros: self.skew_micros + skew_micros,
        }
    }

    /// Move shared time forward
    pub fn advance(&self, by: Duration) {
        self.base.set(self.base.get() + by);
    }

    /// Set shared time
    pub fn set(&self, to: WallTime) {
        self.base.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> WallTime {
        self.base.get().offset_micros(self.skew_micros)
    }
}
