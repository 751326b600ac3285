//! Sequence Number Tracking
//!
//! Data samples carry a 32-bit sequence number that increments by one per
//! sample and wraps at 2^32. The tracker compares each observation against the
//! previous one using wrapping subtraction, so the step from `u32::MAX` to `0`
//! is an ordinary in-order step.
//!
//! A forward jump of more than one is loss. A jump of more than half the
//! sequence space is read as a step backwards instead: the sample arrived
//! after a newer one (reordering) rather than 2^31 samples going missing.

use std::fmt;

/// Half the 32-bit sequence space; forward distances above this are backwards
const HALF_SPACE: u32 = 1 << 31;

/// Result of observing one sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapReport {
    /// First observation; seeds the tracker
    First,
    /// Exactly one ahead of the previous observation
    InOrder,
    /// Jumped forward; `missing` samples between `from` and `to` never arrived
    Loss { from: u32, to: u32, missing: u32 },
    /// Stepped backwards by `behind`; arrived after a newer sample
    Reordered { from: u32, to: u32, behind: u32 },
    /// Same sequence number as the previous observation
    Duplicate { sequence: u32 },
}

impl GapReport {
    /// Check if this observation broke the +1 progression
    pub fn is_gap(&self) -> bool {
        !matches!(self, GapReport::First | GapReport::InOrder)
    }
}

impl fmt::Display for GapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapReport::First => write!(f, "first"),
            GapReport::InOrder => write!(f, "in order"),
            GapReport::Loss { from, to, missing } => {
                write!(f, "loss {} -> {} ({} missing)", from, to, missing)
            }
            GapReport::Reordered { from, to, behind } => {
                write!(f, "reordered {} -> {} ({} behind)", from, to, behind)
            }
            GapReport::Duplicate { sequence } => write!(f, "duplicate {}", sequence),
        }
    }
}

/// Running counters kept by the tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Sequence numbers observed
    pub observed: u64,
    /// Samples inferred lost from forward jumps
    pub lost: u64,
    /// Backwards steps
    pub reordered: u64,
    /// Repeated sequence numbers
    pub duplicates: u64,
}

/// Wraparound-aware gap detector
///
/// The tracker always advances to the newest observation; it never waits for
/// a missing sample to turn up.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    last: Option<u32>,
    stats: TrackerStats,
}

impl SequenceTracker {
    /// Create a tracker that has seen nothing yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a data sample's sequence number
    pub fn observe(&mut self, sequence: u32) -> GapReport {
        let report = match self.last {
            None => GapReport::First,
            Some(last) => {
                let diff = sequence.wrapping_sub(last);
                match diff {
                    1 => GapReport::InOrder,
                    0 => GapReport::Duplicate { sequence },
                    d if d <= HALF_SPACE => GapReport::Loss {
                        from: last,
                        to: sequence,
                        missing: d - 1,
                    },
                    d => GapReport::Reordered {
                        from: last,
                        to: sequence,
                        behind: d.wrapping_neg(),
                    },
                }
            }
        };

        self.stats.observed += 1;
        match report {
            GapReport::Loss { missing, .. } => self.stats.lost += u64::from(missing),
            GapReport::Reordered { .. } => self.stats.reordered += 1,
            GapReport::Duplicate { .. } => self.stats.duplicates += 1,
            GapReport::First | GapReport::InOrder => {}
        }

        self.last = Some(sequence);
        report
    }

    /// Most recent sequence number observed
    pub fn last_sequence(&self) -> Option<u32> {
        self.last
    }

    /// Counters since creation
    pub fn stats(&self) -> TrackerStats {
        self.stats
    }
}
