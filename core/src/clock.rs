//! Simulation clock: owns the business-day timer, run status, and the
//! frame-to-tick conversion used by drivers.

use crate::types::Day;
use serde::{Deserialize, Serialize};

/// A scaled frame longer than this is treated as a stall.
pub const MAX_FRAME_STEP: f64 = 0.5;

/// Step substituted for a stalled frame, before scaling.
pub const STALL_FRAME_STEP: f64 = 0.016;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub day:           Day,
    pub status:        RunStatus,
    /// Seconds of business time left in the current day.
    pub time_remaining: f64,
    pub day_duration:  f64,
    pub speed:         SimSpeed,
}

impl SimClock {
    pub fn new(day_duration: f64) -> Self {
        Self {
            day: 1,
            status: RunStatus::Ready,
            time_remaining: day_duration,
            day_duration,
            speed: SimSpeed::Normal,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.status, RunStatus::Ended(_))
    }

    /// Start the business day: full timer, status Running.
    pub fn open_day(&mut self) {
        self.time_remaining = self.day_duration;
        self.status = RunStatus::Running;
    }

    /// Consume `dt` seconds of business time.
    /// Returns true once the timer has run out (clamped at zero).
    pub fn advance(&mut self, dt: f64) -> bool {
        self.time_remaining -= dt;
        if self.time_remaining <= 0.0 {
            self.time_remaining = 0.0;
            true
        } else {
            false
        }
    }

    /// Pause or resume. Ignored outside business hours and after the run ended.
    /// Returns true if the status actually changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        let next = match (self.status, paused) {
            (RunStatus::Running, true) => RunStatus::Paused,
            (RunStatus::Paused, false) => RunStatus::Running,
            _ => return false,
        };
        self.status = next;
        true
    }

    pub fn set_speed(&mut self, speed: SimSpeed) {
        self.speed = speed;
    }

    /// Convert a raw wall-clock frame into simulated seconds.
    ///
    /// The frame is scaled by the speed factor; a scaled step above
    /// [`MAX_FRAME_STEP`] (e.g. after the host was suspended) is replaced
    /// by a nominal frame so the simulation never jumps ahead.
    pub fn frame_delta(&self, raw_seconds: f64) -> f64 {
        let scale = self.speed.scale();
        let dt = raw_seconds * scale;
        if dt > MAX_FRAME_STEP {
            STALL_FRAME_STEP * scale
        } else {
            dt.max(0.0)
        }
    }

    /// Rent falls due on the last day of each week.
    pub fn next_rent_day(&self) -> Day {
        self.day.div_ceil(7) * 7
    }
}

/// Coarse run status. Business time only advances while `Running`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    /// Between days (or before the first day): waiting for the operator.
    Ready,
    Running,
    Paused,
    /// A decision event must be resolved before the day can open.
    AwaitingDecision,
    /// Weekly settlement is waiting for a rent negotiation.
    RentDue,
    Ended(RunEnd),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEnd {
    Bankruptcy,
    GoalNotReached,
    Victory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimSpeed {
    Normal,  // 1x
    Fast,    // 2x
    Faster,  // 4x
}

impl SimSpeed {
    pub fn scale(&self) -> f64 {
        match self {
            SimSpeed::Normal => 1.0,
            SimSpeed::Fast   => 2.0,
            SimSpeed::Faster => 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stalled_frame_is_clamped() {
        let mut clock = SimClock::new(60.0);
        clock.set_speed(SimSpeed::Fast);
        assert!((clock.frame_delta(0.1) - 0.2).abs() < 1e-12);
        // 0.3s raw at 2x = 0.6s > 0.5s → nominal frame
        assert!((clock.frame_delta(0.3) - 0.032).abs() < 1e-12);
    }

    #[test]
    fn pause_only_toggles_during_business_hours() {
        let mut clock = SimClock::new(60.0);
        assert!(!clock.set_paused(true));
        clock.open_day();
        assert!(clock.set_paused(true));
        assert_eq!(clock.status, RunStatus::Paused);
        assert!(clock.set_paused(false));
        assert!(clock.is_running());
    }

    #[test]
    fn advance_clamps_at_zero() {
        let mut clock = SimClock::new(1.0);
        clock.open_day();
        assert!(!clock.advance(0.6));
        assert!(clock.advance(0.6));
        assert_eq!(clock.time_remaining, 0.0);
    }

    #[test]
    fn rent_day_is_end_of_week() {
        let mut clock = SimClock::new(60.0);
        clock.day = 1;
        assert_eq!(clock.next_rent_day(), 7);
        clock.day = 7;
        assert_eq!(clock.next_rent_day(), 7);
        clock.day = 8;
        assert_eq!(clock.next_rent_day(), 14);
    }
}
