//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};

/// One in-game business day. Day 1 is the first day of a run.
pub type Day = u32;

/// The canonical run identifier.
pub type RunId = String;

/// Stable identifier of a customer visit. Allocated sequentially per run.
pub type CustomerId = u64;

/// Stable identifier of a table. Matches its index in the facility.
pub type TableId = u32;

/// Stable identifier of a litter item on the floor.
pub type LitterId = u64;

/// Staff ids come from the staff catalog (e.g. "staff_mika").
pub type StaffId = String;

/// Gold is always whole coins. Fractional amounts are floored on entry.
pub type Gold = i64;

/// A position on the café floor, in layout units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(self, dx: f64, dy: f64) -> Vec2 {
        Vec2::new(self.x + dx, self.y + dy)
    }

    /// Move `self` toward `target` by at most `step`.
    ///
    /// Returns the new position and whether the target was reached.
    /// A remaining distance of one unit or less counts as arrival, and
    /// so does a step that would overshoot.
    pub fn step_toward(self, target: Vec2, step: f64) -> (Vec2, bool) {
        let dist = self.distance(target);
        if dist > 1.0 && step < dist {
            let k = step / dist;
            (
                Vec2::new(self.x + (target.x - self.x) * k, self.y + (target.y - self.y) * k),
                false,
            )
        } else {
            (target, true)
        }
    }
}
