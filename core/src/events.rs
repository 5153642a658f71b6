//! Daily random events and decision resolution.
//!
//! RULE: At most one event is active per day. The roll clears the
//! previous event first; its modifiers are applied once at day open and
//! vanish at the next roll.
//!
//! RULE: A decision resolves exactly once. Resolving may push gold below
//! zero; the coordinator reports that through the bankruptcy path.

use crate::{
    config::{EventDef, EventKind, Resolution},
    economy::EconomyLedger,
    error::{Outcome, Rejected},
    rng::SubsystemRng,
    staff::StaffScheduler,
    types::Day,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Recently triggered ids excluded from the next roll.
pub const COOLDOWN_WINDOW: usize = 3;

const TONIC_FULL_HEAL: f64 = 0.4;
const TONIC_WORK_BOOST: f64 = 0.7;
const TONIC_WORK_BONUS: f64 = 0.5;
const TONIC_SICKNESS: f64 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub id: String,
    pub day: Day,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventDirector {
    active: Option<EventDef>,
    decision_open: bool,
    history: Vec<EventRecord>,
    recent: VecDeque<String>,
}

impl EventDirector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the cooldown window from a save.
    pub fn with_recent(recent: Vec<String>) -> Self {
        let mut director = Self::new();
        let skip = recent.len().saturating_sub(COOLDOWN_WINDOW);
        director.recent = recent.into_iter().skip(skip).collect();
        director
    }

    pub fn active(&self) -> Option<&EventDef> {
        self.active.as_ref()
    }

    pub fn history(&self) -> &[EventRecord] {
        &self.history
    }

    pub fn recent_ids(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    pub fn decision_pending(&self) -> bool {
        self.decision_open
    }

    /// Pick today's event, if any.
    pub fn roll_daily_event(
        &mut self,
        day: Day,
        start_day: Day,
        pool: &[EventDef],
        rng: &mut SubsystemRng,
    ) -> Option<&EventDef> {
        self.active = None;
        self.decision_open = false;
        if day < start_day {
            log::debug!("day={day} events start on day {start_day}");
            return None;
        }

        let mut candidates: Vec<&EventDef> = pool.iter().filter(|e| e.min_day <= day).collect();
        if candidates.len() > COOLDOWN_WINDOW {
            candidates.retain(|e| !self.recent.contains(&e.id));
        }
        let total: f64 = candidates.iter().map(|e| e.weight).sum();
        let mut r = rng.next_f64() * total;
        let mut selected = None;
        for e in candidates {
            r -= e.weight;
            if r <= 0.0 {
                selected = Some(e.clone());
                break;
            }
        }

        let event = selected?;
        log::info!("day={day} event={} triggered", event.id);
        self.history.push(EventRecord { id: event.id.clone(), day });
        self.recent.push_back(event.id.clone());
        if self.recent.len() > COOLDOWN_WINDOW {
            self.recent.pop_front();
        }
        self.decision_open = event.kind == EventKind::Decision;
        self.active = Some(event);
        self.active.as_ref()
    }

    /// Apply choice `index` of the pending decision.
    pub fn resolve_decision(
        &mut self,
        index: usize,
        ledger: &mut EconomyLedger,
        staff: &mut StaffScheduler,
        rng: &mut SubsystemRng,
    ) -> Outcome<DecisionResult> {
        if !self.decision_open {
            return Err(Rejected::WrongPhase);
        }
        let choice = self
            .active
            .as_ref()
            .and_then(|e| e.choices.get(index))
            .ok_or(Rejected::NotFound)?;
        let result = apply_resolution(&choice.resolution, ledger, staff, rng)?;
        self.decision_open = false;
        log::info!("decision choice={index} success={} gold={}", result.success, ledger.gold);
        Ok(result)
    }
}

fn apply_resolution(
    resolution: &Resolution,
    ledger: &mut EconomyLedger,
    staff: &mut StaffScheduler,
    rng: &mut SubsystemRng,
) -> Outcome<DecisionResult> {
    let result = match resolution {
        Resolution::Purchase { cost } => {
            if ledger.gold < *cost {
                return Err(Rejected::InsufficientGold);
            }
            ledger.gold -= cost;
            let roll = rng.next_f64();
            let message = if roll < TONIC_FULL_HEAL {
                for w in staff.workers_mut() {
                    w.stamina = w.max_stamina;
                }
                "The staff drank the tonic and are fully rested."
            } else if roll < TONIC_WORK_BOOST {
                for w in staff.workers_mut() {
                    w.shift_bonus += TONIC_WORK_BONUS;
                }
                "Strong stuff! Everyone works faster today."
            } else {
                for w in staff.workers_mut() {
                    w.recover_stamina(-TONIC_SICKNESS);
                }
                "The tonic was past its date. Everyone has a stomach ache."
            };
            DecisionResult { success: true, message: message.to_string() }
        }
        Resolution::Decline => DecisionResult {
            success: true,
            message: "You turned them away. A quiet day.".to_string(),
        },
        Resolution::CallPolice { success_rate, reputation_gain, gold_loss, reputation_loss } => {
            if rng.chance(*success_rate) {
                ledger.reputation += reputation_gain;
                DecisionResult {
                    success: true,
                    message: format!("The police arrived in time. Reputation +{reputation_gain}."),
                }
            } else {
                ledger.gold -= gold_loss;
                ledger.reputation -= reputation_loss;
                DecisionResult {
                    success: false,
                    message: format!("The police were too late. Lost {gold_loss} gold."),
                }
            }
        }
        Resolution::FightBack {
            base_win_rate,
            champion_bonus,
            champions,
            win_gold,
            win_reputation,
            loss_stamina,
            loss_reputation,
        } => {
            let hired = champions.iter().filter(|id| staff.is_hired(id)).count();
            let win_rate = base_win_rate + champion_bonus * hired as f64;
            if rng.chance(win_rate) {
                ledger.gold += win_gold;
                ledger.reputation += win_reputation;
                DecisionResult {
                    success: true,
                    message: format!("The staff drove them off! +{win_gold} gold."),
                }
            } else {
                for w in staff.workers_mut() {
                    w.recover_stamina(-loss_stamina);
                }
                ledger.reputation -= loss_reputation;
                DecisionResult {
                    success: false,
                    message: "The fight went badly. The staff are exhausted.".to_string(),
                }
            }
        }
        Resolution::PayOff { cost } => {
            ledger.gold -= cost;
            DecisionResult { success: true, message: format!("Paid {cost} gold to make it go away.") }
        }
    };
    Ok(result)
}
