//! The notification feed: everything a presentation layer may observe.
//!
//! RULE: The core never calls out to a renderer. Components push
//! notifications onto the coordinator's queue; drivers drain it.
//! Variants are only ever appended.

use crate::{
    clock::{RunEnd, RunStatus},
    config::EventKind,
    customer::CustomerState,
    economy::{Settlement, SocialPost},
    facility::TableState,
    staff::{Employment, WorkState},
    types::{CustomerId, Day, Gold, LitterId, RunId, StaffId, TableId, Vec2},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    // ── HUD ────────────────────────────────────────
    HudUpdate {
        day: Day,
        gold: Gold,
        reputation: i64,
        time_remaining: f64,
        queue_len: usize,
    },
    EntitiesUpdate(EntitySnapshot),
    FloatingText {
        text: String,
        position: Vec2,
    },
    GoldGain {
        amount: Gold,
        position: Vec2,
        perfect: bool,
    },

    // ── Day boundary ───────────────────────────────
    DayEnd(DayReport),
    EventTriggered {
        day: Day,
        id: String,
        title: String,
        kind: EventKind,
    },
    StateChange {
        status: RunStatus,
    },

    // ── Terminal ───────────────────────────────────
    GameOver {
        reason: RunEnd,
    },
    Victory {
        gold: Gold,
    },
}

impl Notification {
    /// Stable name used as the log's `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::HudUpdate { .. } => "hud_update",
            Notification::EntitiesUpdate(_) => "entities_update",
            Notification::FloatingText { .. } => "floating_text",
            Notification::GoldGain { .. } => "gold_gain",
            Notification::DayEnd(_) => "day_end",
            Notification::EventTriggered { .. } => "event_triggered",
            Notification::StateChange { .. } => "state_change",
            Notification::GameOver { .. } => "game_over",
            Notification::Victory { .. } => "victory",
        }
    }

    /// Worth keeping in the persistent log. Per-tick chatter is not.
    pub fn is_milestone(&self) -> bool {
        !matches!(
            self,
            Notification::HudUpdate { .. }
                | Notification::EntitiesUpdate(_)
                | Notification::FloatingText { .. }
                | Notification::GoldGain { .. }
        )
    }
}

/// End-of-day summary shown between days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub day: Day,
    pub settlement: Settlement,
    pub social: Vec<SocialPost>,
    /// Weekly rent must be negotiated before the next day.
    pub rent_due: bool,
    /// Upgrade ids on offer; empty when rent is due.
    pub offer: Vec<String>,
}

// ── Entity views ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub customers: Vec<CustomerView>,
    pub staff: Vec<StaffView>,
    pub tables: Vec<TableView>,
    pub litter: Vec<LitterView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerView {
    pub id: CustomerId,
    pub state: CustomerState,
    pub position: Vec2,
    pub patience: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffView {
    pub id: StaffId,
    pub name: String,
    pub state: WorkState,
    pub position: Vec2,
    pub stamina: f64,
    pub max_stamina: f64,
    pub employment: Employment,
    pub skill_cooldown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    pub id: TableId,
    pub position: Vec2,
    pub unlocked: bool,
    pub state: TableState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitterView {
    pub id: LitterId,
    pub position: Vec2,
}

/// A notification as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub day: Day,
    pub kind: String,
    pub payload: String, // JSON-serialized Notification
}

impl NotificationLogEntry {
    pub fn new(run_id: &str, day: Day, notification: &Notification) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            run_id: run_id.to_string(),
            day,
            kind: notification.kind().to_string(),
            payload: serde_json::to_string(notification)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_serialize_with_type_tag() {
        let n = Notification::GameOver { reason: RunEnd::Bankruptcy };
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, r#"{"type":"game_over","reason":"BANKRUPTCY"}"#);
    }

    #[test]
    fn per_tick_notifications_are_not_milestones() {
        let hud = Notification::HudUpdate {
            day: 1,
            gold: 0,
            reputation: 0,
            time_remaining: 10.0,
            queue_len: 0,
        };
        assert!(!hud.is_milestone());
        assert!(Notification::Victory { gold: 1 }.is_milestone());
    }

    #[test]
    fn status_change_round_trips() {
        let n = Notification::StateChange { status: RunStatus::Ended(RunEnd::Victory) };
        let back: Notification = serde_json::from_str(&serde_json::to_string(&n).unwrap()).unwrap();
        assert_eq!(back, n);
    }
}
