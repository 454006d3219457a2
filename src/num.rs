//! Ordering for floating-point event keys.

use std::hash::Hash;

/// A wrapper for `f64` that implements `Ord`.
///
/// Unlike more principled wrappers, this makes no attempt to handle NaN
/// consistently: NaN compares equal to everything. Every value we order is
/// checked for finiteness before it gets here (input coordinates are
/// validated, and non-finite circle events are never scheduled), so this is
/// only a cheap way to put `f64`s into sorted containers.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct CheapOrderedFloat(f64);

impl Hash for CheapOrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // -0.0 and 0.0 compare equal, so they need to hash equal too.
        if self.0 == 0.0 {
            0.0f64.to_bits().hash(state)
        } else {
            self.0.to_bits().hash(state)
        }
    }
}

impl CheapOrderedFloat {
    /// Retrieve the inner `f64`.
    pub fn into_inner(self) -> f64 {
        self.0
    }
}

impl Eq for CheapOrderedFloat {}

impl PartialOrd for CheapOrderedFloat {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CheapOrderedFloat {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.0 < other.0 {
            std::cmp::Ordering::Less
        } else if self.0 > other.0 {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    }
}

impl From<f64> for CheapOrderedFloat {
    fn from(value: f64) -> Self {
        CheapOrderedFloat(value)
    }
}
