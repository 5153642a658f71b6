//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The simulation never touches SQL; it hands over a SaveState or a
//! notification and gets one back.

use rusqlite::{params, Connection, OptionalExtension};
use crate::{
    error::{SimError, SimResult},
    event::NotificationLogEntry,
    snapshot::SaveState,
    types::{Day, Gold},
};

pub struct SimStore {
    conn: Connection,
}

/// One row of the save-slot listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSummary {
    pub slot: String,
    pub run_id: String,
    pub day: Day,
    pub gold: Gold,
    pub saved_at: String,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl SimStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, now()],
        )?;
        Ok(())
    }

    // ── Save slots ─────────────────────────────────────────────

    /// Write `state` to `slot`, replacing whatever was there.
    pub fn save(&self, slot: &str, run_id: &str, state: &SaveState) -> SimResult<()> {
        let json = state.to_json()?;
        self.conn.execute(
            "INSERT INTO save_slot (slot, run_id, day, gold, state_json, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(slot) DO UPDATE SET
                run_id = excluded.run_id,
                day = excluded.day,
                gold = excluded.gold,
                state_json = excluded.state_json,
                saved_at = excluded.saved_at",
            params![slot, run_id, state.day, state.gold, json, now()],
        )?;
        log::info!("slot={slot} saved at day {}", state.day);
        Ok(())
    }

    pub fn load(&self, slot: &str) -> SimResult<SaveState> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM save_slot WHERE slot = ?1",
                params![slot],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or_else(|| SimError::SaveNotFound { slot: slot.to_string() })?;
        Ok(SaveState::from_json(&json)?)
    }

    pub fn has_save(&self, slot: &str) -> SimResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM save_slot WHERE slot = ?1",
            params![slot],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn delete(&self, slot: &str) -> SimResult<()> {
        self.conn.execute("DELETE FROM save_slot WHERE slot = ?1", params![slot])?;
        Ok(())
    }

    pub fn list_slots(&self) -> SimResult<Vec<SlotSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT slot, run_id, day, gold, saved_at FROM save_slot ORDER BY slot ASC"
        )?;
        let slots = stmt.query_map([], |row| {
            Ok(SlotSummary {
                slot:     row.get(0)?,
                run_id:   row.get(1)?,
                day:      row.get(2)?,
                gold:     row.get(3)?,
                saved_at: row.get(4)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(slots)
    }

    // ── Notification log ───────────────────────────────────────

    pub fn append_notification(&self, entry: &NotificationLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO notification_log (run_id, day, kind, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.run_id, entry.day, entry.kind, entry.payload, now()],
        )?;
        Ok(())
    }

    pub fn notifications_for_day(&self, run_id: &str, day: Day) -> SimResult<Vec<NotificationLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, day, kind, payload
             FROM notification_log WHERE run_id = ?1 AND day = ?2
             ORDER BY id ASC"
        )?;
        let entries = stmt.query_map(params![run_id, day], |row| {
            Ok(NotificationLogEntry {
                id:      Some(row.get(0)?),
                run_id:  row.get(1)?,
                day:     row.get(2)?,
                kind:    row.get(3)?,
                payload: row.get(4)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
