//! Gold and reputation accounting.
//!
//! RULE: Gold is whole coins. Every amount is floored before it touches
//! the balance. Settlement steps run in the documented order and never
//! reorder, because later steps read the balance earlier ones produced.

use crate::{
    config::{EconomyBalance, RentBalance, SettlementBalance, SocialConfig, SpecialGoal},
    customer::Payment,
    error::{Outcome, Rejected},
    modifiers::{ModifierSet, UpgradeModifiers},
    rng::SubsystemRng,
    types::{Day, Gold},
};
use serde::{Deserialize, Serialize};

const SOCIAL_POSTS_PER_DAY: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentStrategy {
    /// Appeal to mercy: easier, small discount.
    Mercy,
    /// Show results: pays off only with good weekly ratings.
    Results,
    /// Threaten to move out: risky, big discount.
    Threat,
}

impl RentStrategy {
    fn terms(self, weekly_avg: f64) -> (f64, f64) {
        match self {
            RentStrategy::Mercy => (0.1, 0.95),
            RentStrategy::Results => (if weekly_avg >= 4.0 { 0.2 } else { -0.2 }, 0.8),
            RentStrategy::Threat => (-0.2, 0.6),
        }
    }
}

/// Pricing inputs for one checkout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sale {
    pub rating: u8,
    pub patience: f64,
    pub served_by_automation: bool,
    pub tip_bonus: f64,
    pub value_multiplier: f64,
}

impl From<&Payment> for Sale {
    fn from(p: &Payment) -> Self {
        Self {
            rating: p.rating,
            patience: p.patience,
            served_by_automation: p.served_by_automation,
            tip_bonus: p.tip_bonus,
            value_multiplier: p.value_multiplier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub amount: Gold,
    /// The perfect-service bonus applied.
    pub perfect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassiveGain {
    pub gold: Gold,
    pub reputation: i64,
}

/// Inputs settlement reads from outside the ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementInputs {
    pub litter_count: usize,
    pub maintenance_fee: Gold,
    pub hygiene_check: bool,
    pub special_goal: Option<SpecialGoal>,
    /// Flat reputation from staff presence (fame skill).
    pub staff_reputation: i64,
    pub salaries: Gold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub average_rating: f64,
    pub income: Gold,
    pub litter_income: Gold,
    pub maintenance: Gold,
    pub fine: Gold,
    pub goal_met: Option<bool>,
    pub reputation_change: i64,
    pub reputation_interest: i64,
    pub salaries: Gold,
    pub interest: Gold,
    pub net_profit: Gold,
    pub bankrupt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentResult {
    pub success: bool,
    pub multiplier: f64,
    pub rent_paid: Gold,
    pub sponsorship: Gold,
    pub shield_used: bool,
    pub message: String,
    pub bankrupt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub author: String,
    pub comment: String,
    pub hours_ago: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EconomyLedger {
    pub gold: Gold,
    pub reputation: i64,
    pub daily_income: Gold,
    pub daily_ratings: Vec<u8>,
    pub weekly_ratings: Vec<f64>,
    pub angry_departures: u32,
    pub week: u32,
    pub current_rent: Gold,
    pub rent_shields: u32,
    reputation_buffer: f64,
    queue_timer: f64,
}

impl EconomyLedger {
    pub fn new(gold: Gold, reputation: i64, rent: Gold) -> Self {
        Self {
            gold,
            reputation,
            daily_income: 0,
            daily_ratings: Vec::new(),
            weekly_ratings: Vec::new(),
            angry_departures: 0,
            week: 1,
            current_rent: rent,
            rent_shields: 0,
            reputation_buffer: 0.0,
            queue_timer: 0.0,
        }
    }

    pub fn is_bankrupt(&self) -> bool {
        self.gold < 0
    }

    /// Price a checkout and bank it.
    pub fn add_gold(&mut self, base: Gold, sale: &Sale, mods: &ModifierSet, balance: &EconomyBalance) -> Receipt {
        let up = &mods.upgrades;
        let mut amount = base as f64 * sale.value_multiplier;
        if !sale.served_by_automation {
            if let Some(tip) = balance.tip_ratings.get(&sale.rating) {
                amount *= tip;
            }
        }
        if sale.tip_bonus > 0.0 {
            amount *= 1.0 + sale.tip_bonus;
        }
        amount *= mods.income();
        amount *= mods.daily.tip;
        if up.reputation_income > 0.0 {
            amount *= 1.0 + self.reputation as f64 * up.reputation_income;
        }
        if up.stand_eat() {
            amount *= 0.5;
        }
        let perfect = up.perfect_tip_bonus > 0.0
            && sale.rating >= 5
            && sale.patience >= balance.perfect_tip_patience;
        if perfect {
            amount *= up.perfect_tip_bonus;
        }
        let amount = amount.floor() as Gold;
        self.gold += amount;
        self.daily_income += amount;
        Receipt { amount, perfect }
    }

    /// Queue-driven income and reputation, paid every `interval` seconds
    /// of business time while anyone is waiting.
    pub fn passive_income(&mut self, dt: f64, queue_len: usize, up: &UpgradeModifiers, interval: f64) -> Option<PassiveGain> {
        if queue_len == 0 || (up.queue_income <= 0.0 && up.queue_reputation <= 0.0) {
            return None;
        }
        self.queue_timer += dt;
        if self.queue_timer < interval {
            return None;
        }
        self.queue_timer = 0.0;

        let mut gain = PassiveGain::default();
        if up.queue_income > 0.0 {
            gain.gold = (queue_len as f64 * up.queue_income).floor() as Gold;
            self.gold += gain.gold;
            self.daily_income += gain.gold;
        }
        if up.queue_reputation > 0.0 {
            self.reputation_buffer += queue_len as f64 * up.queue_reputation;
            if self.reputation_buffer >= 1.0 {
                gain.reputation = self.reputation_buffer.floor() as i64;
                self.reputation += gain.reputation;
                self.reputation_buffer -= gain.reputation as f64;
            }
        }
        Some(gain)
    }

    pub fn record_rating(&mut self, rating: u8) {
        self.daily_ratings.push(rating);
        if rating <= 1 {
            self.angry_departures += 1;
        }
    }

    /// Mean of today's ratings to one decimal; 0 with no ratings.
    pub fn daily_average(&self) -> f64 {
        if self.daily_ratings.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.daily_ratings.iter().map(|r| *r as u32).sum();
        let avg = sum as f64 / self.daily_ratings.len() as f64;
        (avg * 10.0).round() / 10.0
    }

    pub fn weekly_average(&self) -> f64 {
        if self.weekly_ratings.is_empty() {
            0.0
        } else {
            self.weekly_ratings.iter().sum::<f64>() / self.weekly_ratings.len() as f64
        }
    }

    /// Settlement steps up to and including the bankruptcy check.
    pub fn settle(
        &mut self,
        inputs: &SettlementInputs,
        up: &UpgradeModifiers,
        rent: &RentBalance,
        balance: &SettlementBalance,
    ) -> Settlement {
        // 1. daily average
        let avg = self.daily_average();
        self.weekly_ratings.push(avg);

        // 2. litter bonus
        let mut litter_income = 0;
        if up.litter_bonus > 0.0 && inputs.litter_count > 0 {
            litter_income = (up.litter_bonus * inputs.litter_count as f64).floor() as Gold;
            self.gold += litter_income;
        }

        // 3. maintenance
        let maintenance = inputs.maintenance_fee.max(0);
        self.gold -= maintenance;

        // 4. hygiene inspection
        let mut fine = 0;
        if inputs.hygiene_check && inputs.litter_count > balance.hygiene_litter_threshold {
            fine = balance.hygiene_fine;
            self.gold -= fine;
        }

        // 5. special goal
        let goal_met = inputs.special_goal.map(|goal| match goal {
            SpecialGoal::NoAngryLeave => self.angry_departures == 0,
        });
        if goal_met == Some(true) {
            self.reputation += balance.special_goal_reputation;
        }

        // 6. reputation from ratings
        let mut reputation_change = if avg >= rent.high_rating_threshold {
            10
        } else if avg >= 3.5 {
            5
        } else if avg > 0.0 && avg < 2.5 {
            -5
        } else {
            0
        };
        reputation_change += inputs.staff_reputation;
        self.reputation += reputation_change;

        // 7. reputation interest
        let mut reputation_interest = 0;
        if up.reputation_interest_rate > 0.0 && self.reputation > 0 {
            reputation_interest = (self.reputation as f64 * up.reputation_interest_rate).floor() as i64;
            self.reputation += reputation_interest;
        }

        // 8. social feed is generated by the caller; no balance effect.

        // 9. salaries
        self.gold -= inputs.salaries;

        // 10. gold interest
        let mut interest = 0;
        if up.interest_rate > 0.0 && self.gold > 0 {
            interest = (self.gold as f64 * up.interest_rate).floor() as Gold;
            self.gold += interest;
        }

        // 11. bankruptcy
        let bankrupt = self.is_bankrupt();
        let net_profit =
            self.daily_income + litter_income + interest - inputs.salaries - fine - maintenance;
        log::debug!(
            "settle: avg={avg} net={net_profit} gold={} rep={} bankrupt={bankrupt}",
            self.gold,
            self.reputation
        );

        Settlement {
            average_rating: avg,
            income: self.daily_income,
            litter_income,
            maintenance,
            fine,
            goal_met,
            reputation_change,
            reputation_interest,
            salaries: inputs.salaries,
            interest,
            net_profit,
            bankrupt,
        }
    }

    /// Weekly rent negotiation. `negotiator` is (success bonus,
    /// sponsorship per day) when such a worker is on staff.
    pub fn negotiate_rent(
        &mut self,
        strategy: RentStrategy,
        negotiator: Option<(f64, Gold)>,
        day: Day,
        rent: &RentBalance,
        rng: &mut SubsystemRng,
    ) -> Outcome<RentResult> {
        if self.is_bankrupt() {
            return Err(Rejected::Bankruptcy);
        }
        let weekly_avg = self.weekly_average();
        let mut success_prob = rent.base_success;
        if weekly_avg >= rent.high_rating_threshold {
            success_prob += 0.3;
        }
        if weekly_avg < 3.0 {
            success_prob -= 0.3;
        }
        if let Some((bonus, _)) = negotiator {
            success_prob += bonus;
        }
        let (strategy_bonus, mut multiplier) = strategy.terms(weekly_avg);
        success_prob += strategy_bonus;

        let success = rng.chance(success_prob);
        let mut sponsorship = 0;
        let mut shield_used = false;
        let message;
        if success {
            if let Some((_, per_day)) = negotiator {
                multiplier = 0.0;
                sponsorship = day as Gold * per_day;
                self.gold += sponsorship;
                message = format!("Landlord waived the rent and sponsored {sponsorship} gold.");
            } else {
                message = "Negotiation succeeded; rent reduced.".to_string();
            }
        } else {
            multiplier = if weekly_avg < 3.0 { rent.low_rating_penalty } else { rent.failure_multiplier };
            let mut text = if success_prob < 0.3 {
                "Negotiation collapsed; rent raised sharply.".to_string()
            } else {
                "Negotiation failed; rent raised.".to_string()
            };
            if self.rent_shields > 0 {
                self.rent_shields -= 1;
                multiplier = 1.0;
                shield_used = true;
                text.push_str(" A rent shield kept it unchanged.");
            }
            message = text;
        }

        let rent_paid = (self.current_rent as f64 * multiplier).floor() as Gold;
        self.gold -= rent_paid;
        log::info!(
            "rent: strategy={strategy:?} success={success} paid={rent_paid} gold={}",
            self.gold
        );
        Ok(RentResult {
            success,
            multiplier,
            rent_paid,
            sponsorship,
            shield_used,
            message,
            bankrupt: self.is_bankrupt(),
        })
    }

    /// After rent is paid: new week, higher base rent.
    pub fn start_new_week(&mut self, increase_rate: f64) {
        self.weekly_ratings.clear();
        self.week += 1;
        self.current_rent = (self.current_rent as f64 * increase_rate).floor() as Gold;
    }

    pub fn start_new_day(&mut self) {
        self.daily_ratings.clear();
        self.daily_income = 0;
        self.angry_departures = 0;
        self.queue_timer = 0.0;
    }
}

/// Gold for passing on an upgrade pick.
pub fn skip_reward(day: Day, per_day: Gold) -> Gold {
    per_day * day.saturating_sub(1).max(1) as Gold
}

/// Three posts matching the day's average stars. Display only.
pub fn social_feed(avg: f64, social: &SocialConfig, rng: &mut SubsystemRng) -> Vec<SocialPost> {
    let stars = match avg.floor() as i64 {
        0 => 3,
        s => s,
    };
    let Some(pool) = social
        .comments
        .get(&stars.to_string())
        .or_else(|| social.comments.get("3"))
    else {
        return Vec::new();
    };
    let mut comments: Vec<&String> = pool.iter().collect();
    rng.shuffle(&mut comments);
    comments
        .into_iter()
        .take(SOCIAL_POSTS_PER_DAY)
        .map(|comment| SocialPost {
            author: rng.pick(&social.authors).cloned().unwrap_or_else(|| "Anonymous".to_string()),
            comment: comment.clone(),
            hours_ago: rng.next_index(23) as u32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpgradeStat;
    use crate::rng::{RngBank, SubsystemSlot};

    fn sale(rating: u8, patience: f64) -> Sale {
        Sale { rating, patience, served_by_automation: false, tip_bonus: 0.0, value_multiplier: 1.0 }
    }

    #[test]
    fn tip_table_scales_sale() {
        let mut ledger = EconomyLedger::new(0, 0, 2500);
        let r = ledger.add_gold(120, &sale(5, 85.0), &ModifierSet::default(), &EconomyBalance::default());
        assert_eq!(r.amount, 180);
        assert_eq!(ledger.gold, 180);
        assert_eq!(ledger.daily_income, 180);
    }

    #[test]
    fn automation_skips_tip_table() {
        let mut ledger = EconomyLedger::new(0, 0, 2500);
        let s = Sale { served_by_automation: true, ..sale(5, 85.0) };
        let r = ledger.add_gold(120, &s, &ModifierSet::default(), &EconomyBalance::default());
        assert_eq!(r.amount, 120);
    }

    #[test]
    fn perfect_tip_needs_both_rating_and_patience() {
        let mut mods = ModifierSet::default();
        mods.upgrades.apply(UpgradeStat::PerfectTipBonus, 2.0);
        let balance = EconomyBalance::default();
        let mut ledger = EconomyLedger::new(0, 0, 2500);
        assert!(!ledger.add_gold(120, &sale(5, 85.0), &mods, &balance).perfect);
        let r = ledger.add_gold(120, &sale(5, 95.0), &mods, &balance);
        assert!(r.perfect);
        assert_eq!(r.amount, 360);
    }

    #[test]
    fn daily_average_rounds_to_one_decimal() {
        let mut ledger = EconomyLedger::new(0, 0, 2500);
        for r in [5, 4, 4] {
            ledger.record_rating(r);
        }
        assert_eq!(ledger.daily_average(), 4.3);
        ledger.record_rating(1);
        assert_eq!(ledger.angry_departures, 1);
    }

    #[test]
    fn settlement_goes_bankrupt_when_costs_exceed_gold() {
        let mut ledger = EconomyLedger::new(100, 0, 2500);
        ledger.daily_income = 50;
        ledger.gold += 50;
        let inputs = SettlementInputs { salaries: 300, ..Default::default() };
        let s = ledger.settle(&inputs, &UpgradeModifiers::default(), &RentBalance::default(), &SettlementBalance::default());
        assert!(s.bankrupt);
        assert_eq!(ledger.gold, -150);
    }

    #[test]
    fn hygiene_fine_only_above_threshold() {
        let mut ledger = EconomyLedger::new(5000, 0, 2500);
        let up = UpgradeModifiers::default();
        let inputs = SettlementInputs { hygiene_check: true, litter_count: 3, ..Default::default() };
        let s = ledger.settle(&inputs, &up, &RentBalance::default(), &SettlementBalance::default());
        assert_eq!(s.fine, 0);
        let inputs = SettlementInputs { litter_count: 4, ..inputs };
        let s = ledger.settle(&inputs, &up, &RentBalance::default(), &SettlementBalance::default());
        assert_eq!(s.fine, 1000);
    }

    #[test]
    fn reputation_thresholds() {
        let up = UpgradeModifiers::default();
        let cases: [(&[u8], i64); 4] = [(&[5, 5], 10), (&[4, 3], 5), (&[2, 2], -5), (&[], 0)];
        for (ratings, expected) in cases {
            let mut ledger = EconomyLedger::new(1000, 0, 2500);
            for r in ratings {
                ledger.record_rating(*r);
            }
            let s = ledger.settle(&SettlementInputs::default(), &up, &RentBalance::default(), &SettlementBalance::default());
            assert_eq!(s.reputation_change, expected, "ratings {ratings:?}");
        }
    }

    #[test]
    fn rent_shield_absorbs_failed_negotiation() {
        let mut rng = RngBank::new(3).for_subsystem(SubsystemSlot::Economy);
        let mut ledger = EconomyLedger::new(10_000, 0, 2500);
        ledger.rent_shields = 1;
        // Weekly average below 3.0 and a threat: success chance 0.5 − 0.3 − 0.2 = 0.
        ledger.weekly_ratings = vec![2.0];
        let r = ledger.negotiate_rent(RentStrategy::Threat, None, 7, &RentBalance::default(), &mut rng).unwrap();
        assert!(!r.success);
        assert!(r.shield_used);
        assert_eq!(r.rent_paid, 2500);
        assert_eq!(ledger.rent_shields, 0);
    }

    #[test]
    fn negotiation_refused_when_bankrupt() {
        let mut rng = RngBank::new(3).for_subsystem(SubsystemSlot::Economy);
        let mut ledger = EconomyLedger::new(-1, 0, 2500);
        let r = ledger.negotiate_rent(RentStrategy::Mercy, None, 7, &RentBalance::default(), &mut rng);
        assert_eq!(r, Err(Rejected::Bankruptcy));
    }

    #[test]
    fn skip_reward_scales_with_day() {
        assert_eq!(skip_reward(1, 50), 50);
        assert_eq!(skip_reward(2, 50), 50);
        assert_eq!(skip_reward(5, 50), 200);
    }

    #[test]
    fn queue_reputation_buffers_fractions() {
        let mut ledger = EconomyLedger::new(0, 0, 2500);
        let mut up = UpgradeModifiers::default();
        up.apply(UpgradeStat::QueueReputation, 0.1);
        assert_eq!(ledger.passive_income(5.0, 4, &up, 5.0), Some(PassiveGain::default()));
        let gain = ledger.passive_income(5.0, 6, &up, 5.0).unwrap();
        assert_eq!(gain.reputation, 1);
        assert_eq!(ledger.reputation, 1);
    }
}
