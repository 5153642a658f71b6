//! Tables, the waiting queue, and litter on the floor.
//!
//! RULE: Only the registry flips table occupancy and queue membership.
//! It stores customer ids, never customers; the coordinator applies the
//! matching customer transitions.

use crate::{
    config::LayoutConfig,
    types::{CustomerId, LitterId, TableId, Vec2},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Queue slots per row in the two-row waiting layout.
const QUEUE_COLUMNS: usize = 5;
const QUEUE_ROW_GAP: f64 = 40.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableState {
    Empty,
    Occupied,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    pub id: TableId,
    pub position: Vec2,
    pub unlocked: bool,
    pub state: TableState,
    pub customer: Option<CustomerId>,
}

impl Table {
    pub fn is_available(&self) -> bool {
        self.unlocked && self.state == TableState::Empty
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Litter {
    pub id: LitterId,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Seated(TableId),
    Queued { index: usize },
    /// Queue at capacity; nothing changed.
    Dropped,
}

pub struct FacilityRegistry {
    layout: LayoutConfig,
    queue_spacing: f64,
    tables: Vec<Table>,
    queue: VecDeque<CustomerId>,
    litter: Vec<Litter>,
    next_litter_id: LitterId,
}

impl FacilityRegistry {
    /// Lay out `max_tables` tables on the grid; the first `initial` unlocked.
    pub fn new(layout: LayoutConfig, queue_spacing: f64, max_tables: u32, initial: u32) -> Self {
        let mut registry = Self {
            layout,
            queue_spacing,
            tables: Vec::with_capacity(max_tables as usize),
            queue: VecDeque::new(),
            litter: Vec::new(),
            next_litter_id: 1,
        };
        for i in 0..max_tables {
            registry.push_table(i < initial);
        }
        registry
    }

    fn push_table(&mut self, unlocked: bool) -> TableId {
        let id = self.tables.len() as TableId;
        let columns = self.layout.table_columns.max(1);
        let col = id % columns;
        let row = id / columns;
        let position = self.layout.table_origin.offset(
            col as f64 * self.layout.table_spacing.x,
            row as f64 * self.layout.table_spacing.y,
        );
        self.tables.push(Table {
            id,
            position,
            unlocked,
            state: TableState::Empty,
            customer: None,
        });
        id
    }

    // ── Tables ─────────────────────────────────────────────────

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id as usize)
    }

    /// Where a customer sits at this table.
    pub fn seat_position(&self, id: TableId) -> Option<Vec2> {
        let offset = self.layout.seat_offset;
        self.table(id).map(|t| t.position.offset(offset, offset))
    }

    pub fn available_tables(&self) -> usize {
        self.tables.iter().filter(|t| t.is_available()).count()
    }

    fn occupy_first_available(&mut self, customer: CustomerId) -> Option<TableId> {
        let table = self.tables.iter_mut().find(|t| t.is_available())?;
        table.state = TableState::Occupied;
        table.customer = Some(customer);
        Some(table.id)
    }

    /// Free the table if this customer still holds it.
    pub fn release_table(&mut self, id: TableId, customer: CustomerId) -> bool {
        match self.tables.get_mut(id as usize) {
            Some(t) if t.customer == Some(customer) => {
                t.state = TableState::Empty;
                t.customer = None;
                true
            }
            _ => false,
        }
    }

    /// Unlock the lowest-id locked table.
    pub fn unlock_next_table(&mut self) -> Option<TableId> {
        let table = self.tables.iter_mut().find(|t| !t.unlocked)?;
        table.unlocked = true;
        Some(table.id)
    }

    /// Append a table beyond the initial layout, unlocked.
    pub fn add_extra_table(&mut self) -> TableId {
        self.push_table(true)
    }

    /// Apply saved unlock flags. Returns how many entries were skipped
    /// because their table no longer exists.
    pub fn hydrate_tables(&mut self, saved: &[(TableId, bool)]) -> usize {
        let mut skipped = 0;
        for (id, unlocked) in saved {
            match self.tables.get_mut(*id as usize) {
                Some(t) => t.unlocked = *unlocked,
                None => skipped += 1,
            }
        }
        skipped
    }

    // ── Queue ──────────────────────────────────────────────────

    /// Seat a new arrival, enqueue it, or turn it away.
    pub fn admit(&mut self, customer: CustomerId, capacity: usize) -> SpawnOutcome {
        if self.queue.is_empty() {
            if let Some(table) = self.occupy_first_available(customer) {
                return SpawnOutcome::Seated(table);
            }
        }
        if self.queue.len() >= capacity {
            return SpawnOutcome::Dropped;
        }
        self.queue.push_back(customer);
        SpawnOutcome::Queued { index: self.queue.len() - 1 }
    }

    /// Seat queued customers in FIFO order, one per available table.
    /// Returns the (customer, table) pairs seated this pass.
    pub fn check_queue(&mut self) -> Vec<(CustomerId, TableId)> {
        let mut seated = Vec::new();
        while let Some(&front) = self.queue.front() {
            let Some(table) = self.occupy_first_available(front) else {
                break;
            };
            self.queue.pop_front();
            seated.push((front, table));
        }
        seated
    }

    pub fn remove_from_queue(&mut self, customer: CustomerId) -> bool {
        match self.queue.iter().position(|c| *c == customer) {
            Some(i) => {
                self.queue.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn queue(&self) -> impl Iterator<Item = CustomerId> + '_ {
        self.queue.iter().copied()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_index(&self, customer: CustomerId) -> Option<usize> {
        self.queue.iter().position(|c| *c == customer)
    }

    /// Display position of queue slot `index`: two rows of five around the door.
    pub fn queue_slot(&self, index: usize) -> Vec2 {
        let row = index / QUEUE_COLUMNS;
        let col = (index % QUEUE_COLUMNS) as f64;
        Vec2::new(
            self.layout.door.x + (col - 2.0) * self.queue_spacing,
            self.layout.queue_start.y + row as f64 * QUEUE_ROW_GAP,
        )
    }

    // ── Litter ─────────────────────────────────────────────────

    pub fn spawn_litter(&mut self, position: Vec2) -> LitterId {
        let id = self.next_litter_id;
        self.next_litter_id += 1;
        self.litter.push(Litter { id, position });
        id
    }

    pub fn remove_litter(&mut self, id: LitterId) -> bool {
        let before = self.litter.len();
        self.litter.retain(|l| l.id != id);
        self.litter.len() != before
    }

    pub fn pop_oldest_litter(&mut self) -> Option<Litter> {
        if self.litter.is_empty() {
            None
        } else {
            Some(self.litter.remove(0))
        }
    }

    pub fn litter(&self) -> &[Litter] {
        &self.litter
    }

    pub fn litter_count(&self) -> usize {
        self.litter.len()
    }

    // ── Day boundary ───────────────────────────────────────────

    /// Empty the queue and every table. Litter stays on the floor.
    pub fn reset_for_new_day(&mut self) {
        self.queue.clear();
        for t in &mut self.tables {
            t.state = TableState::Empty;
            t.customer = None;
        }
    }
}
