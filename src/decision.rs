//! Turns current and desired counts into a scale direction and magnitude.
//!
//! The magnitudes are deliberately asymmetric. Scaling out passes the
//! absolute desired total, because the remote resize call sets total
//! capacity. Scaling in passes the number of instances to remove, because
//! removal names specific instances.

use std::fmt;

/// Which way an invocation moves the group's capacity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Capacity already matches the desired count.
    None,
    /// Remove instances.
    In,
    /// Raise total capacity.
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::In => f.write_str("in"),
            Self::Out => f.write_str("out"),
        }
    }
}

/// Result of comparing current and desired counts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScaleDecision {
    /// Instances to remove when scaling in; the absolute target total when
    /// scaling out; zero otherwise.
    pub magnitude: i64,
    /// Direction of the change.
    pub direction: Direction,
}

/// Computes the scale decision for `current` and `desired` counts.
///
/// Total over all `i64` pairs: the scale-in delta saturates at `i64::MAX`.
#[must_use]
pub const fn decide(current: i64, desired: i64) -> ScaleDecision {
    if desired < current {
        ScaleDecision {
            magnitude: current.saturating_sub(desired),
            direction: Direction::In,
        }
    } else if desired > current {
        ScaleDecision {
            magnitude: desired,
            direction: Direction::Out,
        }
    } else {
        ScaleDecision {
            magnitude: 0,
            direction: Direction::None,
        }
    }
}
