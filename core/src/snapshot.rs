//! Save state: the flat record persisted between sessions.
//!
//! A save is only taken between business days. It holds ids and
//! counters, never catalog data; hydrate re-joins it against the loaded
//! catalogs and skips entries whose ids no longer resolve.

use crate::{
    staff::Employment,
    types::{Day, Gold, StaffId, TableId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bumped whenever a field changes meaning.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    #[serde(default = "current_version")]
    pub version: u32,
    pub gold: Gold,
    pub day: Day,
    pub reputation: i64,
    pub week: u32,
    pub current_rent: Gold,
    pub rent_shields: u32,
    /// Applied upgrade ids in pick order, repeats included.
    pub applied_upgrades: Vec<String>,
    pub purchased_items: BTreeMap<String, u32>,
    pub banished_upgrades: Vec<String>,
    pub victory_gold_goal: Gold,
    pub max_days: Day,
    pub auto_clean: bool,
    pub staff: Vec<SavedStaff>,
    pub tables: Vec<SavedTable>,
    #[serde(default)]
    pub weekly_ratings: Vec<f64>,
    #[serde(default)]
    pub recent_events: Vec<String>,
}

fn current_version() -> u32 {
    SAVE_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStaff {
    pub id: StaffId,
    pub stamina: f64,
    pub employment: Employment,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedTable {
    pub id: TableId,
    pub unlocked: bool,
}

impl SaveState {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn table_flags(&self) -> Vec<(TableId, bool)> {
        self.tables.iter().map(|t| (t.id, t.unlocked)).collect()
    }
}
