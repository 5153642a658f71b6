//! Rate modifiers.
//!
//! RULE: Upgrade contributions persist for the run and are rebuilt from
//! the applied-upgrade multiset on hydrate. Daily contributions are reset
//! at every day start before the active event is applied.
//! Nothing caches a derived rate across ticks.

use crate::config::{EventEffects, RareStat, SpecialGoal, UpgradeStat};

/// How repeated contributions to one stat combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Additive,
    Multiplicative,
    Subtractive,
}

impl UpgradeStat {
    /// Fixed per stat. Changing a rule changes every save's replayed state.
    pub fn aggregation(self) -> Aggregation {
        match self {
            UpgradeStat::PatienceDecay | UpgradeStat::QueuePatience | UpgradeStat::Income => {
                Aggregation::Multiplicative
            }
            _ => Aggregation::Additive,
        }
    }
}

impl RareStat {
    pub fn aggregation(self) -> Aggregation {
        match self {
            RareStat::Income | RareStat::ReputationIncome => Aggregation::Additive,
            RareStat::QueuePatience => Aggregation::Subtractive,
        }
    }
}

fn combine(slot: &mut f64, rule: Aggregation, value: f64) {
    match rule {
        Aggregation::Additive => *slot += value,
        Aggregation::Multiplicative => *slot *= value,
        Aggregation::Subtractive => *slot -= value,
    }
}

/// Persistent contributions from applied upgrades.
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeModifiers {
    pub spawn_rate: f64,
    pub patience_decay: f64,
    pub seating_relief: f64,
    /// Unset until an upgrade touches it; reads as 1.0 while unset.
    pub pay_stress: Option<f64>,
    pub stamina_loss: f64,
    pub litter_bonus: f64,
    pub litter_speed_boost: f64,
    pub checkout_speed: f64,
    pub auto_serve: f64,
    pub auto_clean: f64,
    pub max_queue_size: f64,
    pub stand_eat_policy: f64,
    pub low_stamina_buff: f64,
    pub perfect_tip_bonus: f64,
    pub queue_income: f64,
    pub queue_reputation: f64,
    pub eat_time_reduction: f64,
    pub queue_patience: f64,
    pub income: f64,
    pub interest_rate: f64,
    pub reputation_interest_rate: f64,
    pub reputation_income: f64,
}

impl Default for UpgradeModifiers {
    fn default() -> Self {
        Self {
            spawn_rate: 0.0,
            patience_decay: 1.0,
            seating_relief: 0.0,
            pay_stress: None,
            stamina_loss: 0.0,
            litter_bonus: 0.0,
            litter_speed_boost: 0.0,
            checkout_speed: 0.0,
            auto_serve: 0.0,
            auto_clean: 0.0,
            max_queue_size: 0.0,
            stand_eat_policy: 0.0,
            low_stamina_buff: 0.0,
            perfect_tip_bonus: 0.0,
            queue_income: 0.0,
            queue_reputation: 0.0,
            eat_time_reduction: 0.0,
            queue_patience: 1.0,
            income: 1.0,
            interest_rate: 0.0,
            reputation_interest_rate: 0.0,
            reputation_income: 0.0,
        }
    }
}

impl UpgradeModifiers {
    pub fn apply(&mut self, stat: UpgradeStat, value: f64) {
        if stat == UpgradeStat::PayStress {
            self.pay_stress = Some(self.pay_stress.unwrap_or(0.0) + value);
            return;
        }
        // Spawn boosts are always speed-ups, whatever sign the catalog uses.
        let value = if stat == UpgradeStat::SpawnRate { value.abs() } else { value };
        let rule = stat.aggregation();
        combine(self.slot_mut(stat), rule, value);
    }

    pub fn apply_rare(&mut self, stat: RareStat, value: f64) {
        let slot = match stat {
            RareStat::Income => &mut self.income,
            RareStat::QueuePatience => &mut self.queue_patience,
            RareStat::ReputationIncome => &mut self.reputation_income,
        };
        combine(slot, stat.aggregation(), value);
    }

    pub fn pay_stress(&self) -> f64 {
        self.pay_stress.unwrap_or(1.0)
    }

    pub fn auto_serve_active(&self) -> bool {
        self.auto_serve > 0.0
    }

    pub fn auto_clean_installed(&self) -> bool {
        self.auto_clean > 0.0
    }

    pub fn stand_eat(&self) -> bool {
        self.stand_eat_policy > 0.0
    }

    fn slot_mut(&mut self, stat: UpgradeStat) -> &mut f64 {
        match stat {
            UpgradeStat::SpawnRate => &mut self.spawn_rate,
            UpgradeStat::PatienceDecay => &mut self.patience_decay,
            UpgradeStat::SeatingRelief => &mut self.seating_relief,
            // Handled in apply(); kept addressable so the match stays total.
            UpgradeStat::PayStress => self.pay_stress.get_or_insert(0.0),
            UpgradeStat::StaminaLoss => &mut self.stamina_loss,
            UpgradeStat::LitterBonus => &mut self.litter_bonus,
            UpgradeStat::LitterSpeedBoost => &mut self.litter_speed_boost,
            UpgradeStat::CheckoutSpeed => &mut self.checkout_speed,
            UpgradeStat::AutoServe => &mut self.auto_serve,
            UpgradeStat::AutoClean => &mut self.auto_clean,
            UpgradeStat::MaxQueueSize => &mut self.max_queue_size,
            UpgradeStat::StandEatPolicy => &mut self.stand_eat_policy,
            UpgradeStat::LowStaminaBuff => &mut self.low_stamina_buff,
            UpgradeStat::PerfectTipBonus => &mut self.perfect_tip_bonus,
            UpgradeStat::QueueIncome => &mut self.queue_income,
            UpgradeStat::QueueReputation => &mut self.queue_reputation,
            UpgradeStat::EatTimeReduction => &mut self.eat_time_reduction,
            UpgradeStat::QueuePatience => &mut self.queue_patience,
            UpgradeStat::Income => &mut self.income,
            UpgradeStat::InterestRate => &mut self.interest_rate,
            UpgradeStat::ReputationInterestRate => &mut self.reputation_interest_rate,
        }
    }
}

/// Contributions from today's event. Reset at every day start.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyModifiers {
    pub spawn_rate: f64,
    pub patience_decay: f64,
    pub income: f64,
    pub tip: f64,
    pub eat_time: f64,
    pub staff_speed: f64,
    pub litter_prob: f64,
    pub disable_automation: bool,
    pub hygiene_check: bool,
    pub special_goal: Option<SpecialGoal>,
}

impl Default for DailyModifiers {
    fn default() -> Self {
        Self {
            spawn_rate: 0.0,
            patience_decay: 1.0,
            income: 1.0,
            tip: 1.0,
            eat_time: 1.0,
            staff_speed: 1.0,
            litter_prob: 1.0,
            disable_automation: false,
            hygiene_check: false,
            special_goal: None,
        }
    }
}

impl DailyModifiers {
    pub fn apply(&mut self, effects: &EventEffects) {
        if let Some(v) = effects.spawn_rate_mod {
            self.spawn_rate += v;
        }
        let multiplicative = [
            (effects.patience_decay_mod, &mut self.patience_decay),
            (effects.income_mod, &mut self.income),
            (effects.tip_mod, &mut self.tip),
            (effects.eat_time_mod, &mut self.eat_time),
            (effects.staff_speed_mod, &mut self.staff_speed),
            (effects.litter_prob_mod, &mut self.litter_prob),
        ];
        for (value, slot) in multiplicative {
            if let Some(v) = value {
                *slot *= v;
            }
        }
        self.disable_automation |= effects.disable_automation;
        self.hygiene_check |= effects.hygiene_check;
        if effects.special_goal.is_some() {
            self.special_goal = effects.special_goal;
        }
    }
}

/// Everything a rate computation needs to read, minus per-tick factors
/// (litter count, stamina, buffs) which callers pass in.
#[derive(Debug, Clone, Default)]
pub struct ModifierSet {
    pub upgrades: UpgradeModifiers,
    pub daily: DailyModifiers,
}

impl ModifierSet {
    /// Clear upgrade contributions ahead of a replay.
    pub fn reset_upgrades(&mut self) {
        self.upgrades = UpgradeModifiers::default();
    }

    /// Day start: drop yesterday's event and apply today's, if any.
    pub fn start_day(&mut self, effects: Option<&EventEffects>) {
        self.daily = DailyModifiers::default();
        if let Some(effects) = effects {
            self.daily.apply(effects);
        }
    }

    pub fn patience_decay(&self) -> f64 {
        self.upgrades.patience_decay * self.daily.patience_decay
    }

    pub fn income(&self) -> f64 {
        self.upgrades.income * self.daily.income
    }

    pub fn automation_enabled(&self) -> bool {
        !self.daily.disable_automation
    }

    pub fn auto_serve_running(&self) -> bool {
        self.upgrades.auto_serve_active() && self.automation_enabled()
    }

    pub fn auto_clean_running(&self) -> bool {
        self.upgrades.auto_clean_installed() && self.automation_enabled()
    }

    /// Seconds between spawns. More reputation and spawn boosts shorten it.
    pub fn spawn_interval(&self, base: f64, reputation: i64) -> f64 {
        let reputation_factor = 1.0 + reputation.max(0) as f64 / 100.0;
        let boost = (1.0 + self.upgrades.spawn_rate + self.daily.spawn_rate).max(0.1);
        base / reputation_factor / boost
    }

    pub fn litter_chance(&self, base: f64) -> f64 {
        base * self.daily.litter_prob
    }

    pub fn queue_capacity(&self, base: usize) -> usize {
        base + self.upgrades.max_queue_size.max(0.0) as usize
    }

    /// Eat duration for a freshly served customer.
    pub fn eat_time(&self, base: f64) -> f64 {
        let mut t = base * (1.0 - self.upgrades.eat_time_reduction);
        if self.daily.eat_time > 0.0 {
            t /= self.daily.eat_time;
        }
        if self.upgrades.stand_eat() {
            t /= 2.0;
        }
        t.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_stat_accumulates_additively() {
        let mut m = UpgradeModifiers::default();
        m.apply(UpgradeStat::SeatingRelief, 10.0);
        m.apply(UpgradeStat::SeatingRelief, 10.0);
        assert_eq!(m.seating_relief, 20.0);
    }

    #[test]
    fn income_upgrade_compounds() {
        let mut m = UpgradeModifiers::default();
        m.apply(UpgradeStat::Income, 1.1);
        m.apply(UpgradeStat::Income, 1.1);
        assert!((m.income - 1.21).abs() < 1e-12, "expected 1.21, got {}", m.income);
    }

    #[test]
    fn rare_income_adds_onto_multiplier() {
        let mut m = UpgradeModifiers::default();
        m.apply_rare(RareStat::Income, 0.1);
        m.apply_rare(RareStat::Income, 0.1);
        assert!((m.income - 1.2).abs() < 1e-12);
        m.apply_rare(RareStat::QueuePatience, 0.2);
        assert!((m.queue_patience - 0.8).abs() < 1e-12);
    }

    #[test]
    fn pay_stress_defaults_to_one_and_sums_from_zero() {
        let mut m = UpgradeModifiers::default();
        assert_eq!(m.pay_stress(), 1.0);
        m.apply(UpgradeStat::PayStress, 0.5);
        assert_eq!(m.pay_stress(), 0.5);
        m.apply(UpgradeStat::PayStress, 0.5);
        assert_eq!(m.pay_stress(), 1.0);
    }

    #[test]
    fn spawn_rate_uses_absolute_value() {
        let mut m = UpgradeModifiers::default();
        m.apply(UpgradeStat::SpawnRate, -0.2);
        assert_eq!(m.spawn_rate, 0.2);
    }

    #[test]
    fn day_start_resets_event_but_keeps_upgrades() {
        let mut set = ModifierSet::default();
        set.upgrades.apply(UpgradeStat::Income, 1.5);
        set.start_day(Some(&EventEffects { income_mod: Some(2.0), ..Default::default() }));
        assert_eq!(set.income(), 3.0);
        set.start_day(None);
        assert_eq!(set.income(), 1.5);
    }

    #[test]
    fn spawn_interval_shrinks_with_reputation_and_boosts() {
        let mut set = ModifierSet::default();
        assert_eq!(set.spawn_interval(5.0, 0), 5.0);
        assert_eq!(set.spawn_interval(5.0, 100), 2.5);
        set.upgrades.apply(UpgradeStat::SpawnRate, 1.0);
        assert_eq!(set.spawn_interval(5.0, 100), 1.25);
    }
}
