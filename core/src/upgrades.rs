//! Upgrade offers, stacking, and the between-days store.
//!
//! RULE: The applied-upgrade list is the source of truth for every
//! persistent upgrade effect. Replay rebuilds modifiers and staff stats
//! from it; one-shot resources (rent shields, hires) are persisted on
//! their own and never granted twice.
//!
//! Offer composition, in order:
//!   1. one Augment
//!   2. one Recruitment, or a RareUtility if no recruit is eligible
//!   3. uniform fill from whatever is left
//! No id appears twice in one offer.

use crate::{
    config::{SimConfig, StoreEffect, UpgradeCategory, UpgradeDef, UpgradeEffect},
    economy::EconomyLedger,
    error::{Outcome, Rejected},
    facility::FacilityRegistry,
    modifiers::UpgradeModifiers,
    rng::SubsystemRng,
    staff::{StaffScheduler, Worker},
    types::{Gold, StaffId, TableId, Vec2},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// A new pick: recorded in the applied list, every effect runs.
    Fresh,
    /// Rebuilding from a save: nothing recorded, one-shots skipped.
    Replay,
}

/// Everything an upgrade or store item may touch.
pub struct UpgradeTargets<'a> {
    pub config: &'a SimConfig,
    pub modifiers: &'a mut UpgradeModifiers,
    pub staff: &'a mut StaffScheduler,
    pub facility: &'a mut FacilityRegistry,
    pub ledger: &'a mut EconomyLedger,
    /// Where new hires appear.
    pub staff_start: Vec2,
}

/// Visible side effects of applying an upgrade or store item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Applied {
    pub hired: Option<StaffId>,
    pub table: Option<TableId>,
    pub staff_changed: bool,
}

#[derive(Debug, Default)]
pub struct UpgradeCatalog {
    applied: Vec<String>,
    banished: Vec<String>,
    purchases: BTreeMap<String, u32>,
    offer: Vec<String>,
    reroll_limit: u32,
    rerolls_left: u32,
    banishes_left: u32,
    banish_limit: u32,
}

impl UpgradeCatalog {
    pub fn new(reroll_limit: u32, banish_limit: u32) -> Self {
        Self {
            reroll_limit,
            rerolls_left: reroll_limit,
            banish_limit,
            banishes_left: banish_limit,
            ..Default::default()
        }
    }

    /// Rebuild bookkeeping from a save. Unknown ids are dropped; the
    /// re-roll limit regains any bonus bought in the store.
    pub fn restore(
        config: &SimConfig,
        applied: Vec<String>,
        banished: Vec<String>,
        purchases: BTreeMap<String, u32>,
    ) -> Self {
        let mut catalog = Self::new(config.game.reroll_limit, config.game.banish_limit);
        catalog.applied = applied.into_iter().filter(|id| config.upgrade(id).is_some()).collect();
        catalog.banished = banished.into_iter().filter(|id| config.upgrade(id).is_some()).collect();
        catalog.purchases = purchases
            .into_iter()
            .filter(|(id, _)| config.store_item(id).is_some())
            .collect();
        for (id, count) in &catalog.purchases {
            if let Some(StoreEffect::AddReroll { value }) = config.store_item(id).map(|i| &i.effect) {
                catalog.reroll_limit += value * count;
            }
        }
        catalog.rerolls_left = catalog.reroll_limit;
        catalog
    }

    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    pub fn banished(&self) -> &[String] {
        &self.banished
    }

    pub fn purchases(&self) -> &BTreeMap<String, u32> {
        &self.purchases
    }

    pub fn offer(&self) -> &[String] {
        &self.offer
    }

    pub fn rerolls_left(&self) -> u32 {
        self.rerolls_left
    }

    pub fn banishes_left(&self) -> u32 {
        self.banishes_left
    }

    pub fn stack_count(&self, id: &str) -> u32 {
        self.applied.iter().filter(|a| *a == id).count() as u32
    }

    pub fn clear_offer(&mut self) {
        self.offer.clear();
    }

    /// Day end: budgets back to their limits.
    pub fn restore_budgets(&mut self) {
        self.rerolls_left = self.reroll_limit;
        self.banishes_left = self.banish_limit;
    }

    fn is_eligible(&self, def: &UpgradeDef, staff: &StaffScheduler) -> bool {
        if self.banished.contains(&def.id) {
            return false;
        }
        if def.recruits().is_some_and(|target| staff.is_hired(target)) {
            return false;
        }
        match def.stack_cap() {
            Some(cap) => self.stack_count(&def.id) < cap,
            None => true,
        }
    }

    /// Draw a fresh offer of up to `count` upgrades.
    pub fn draw_offer(
        &mut self,
        count: usize,
        config: &SimConfig,
        staff: &StaffScheduler,
        rng: &mut SubsystemRng,
    ) -> &[String] {
        let mut pool: Vec<&UpgradeDef> =
            config.upgrades.iter().filter(|u| self.is_eligible(u, staff)).collect();
        rng.shuffle(&mut pool);

        let mut selected: Vec<&UpgradeDef> = Vec::with_capacity(count);
        if selected.len() < count {
            let augments = unselected(&pool, &selected, Some(UpgradeCategory::Augment));
            if let Some(u) = rng.pick(&augments).copied() {
                selected.push(u);
            }
        }
        if selected.len() < count {
            let mut expansion = unselected(&pool, &selected, Some(UpgradeCategory::Recruitment));
            if expansion.is_empty() {
                expansion = unselected(&pool, &selected, Some(UpgradeCategory::RareUtility));
            }
            if let Some(u) = rng.pick(&expansion).copied() {
                selected.push(u);
            }
        }
        while selected.len() < count {
            let remaining = unselected(&pool, &selected, None);
            match rng.pick(&remaining).copied() {
                Some(u) => selected.push(u),
                None => break,
            }
        }

        self.offer = selected.into_iter().map(|u| u.id.clone()).collect();
        log::debug!("upgrade offer: {:?}", self.offer);
        &self.offer
    }

    /// Spend a re-roll on a new offer.
    pub fn reroll(
        &mut self,
        count: usize,
        config: &SimConfig,
        staff: &StaffScheduler,
        rng: &mut SubsystemRng,
    ) -> Outcome<&[String]> {
        if self.rerolls_left == 0 {
            return Err(Rejected::LimitReached);
        }
        self.rerolls_left -= 1;
        Ok(self.draw_offer(count, config, staff, rng))
    }

    /// Remove an upgrade from all future offers.
    pub fn banish(&mut self, id: &str, config: &SimConfig) -> Outcome<()> {
        if config.upgrade(id).is_none() {
            return Err(Rejected::NotFound);
        }
        if self.banishes_left == 0 {
            return Err(Rejected::LimitReached);
        }
        self.banishes_left -= 1;
        if !self.banished.iter().any(|b| b == id) {
            self.banished.push(id.to_string());
        }
        self.offer.retain(|o| o != id);
        log::info!("upgrade={id} banished");
        Ok(())
    }

    /// Apply an upgrade by id.
    pub fn apply_upgrade(&mut self, id: &str, mode: ApplyMode, targets: &mut UpgradeTargets<'_>) -> Outcome<Applied> {
        let config = targets.config;
        let def = config.upgrade(id).ok_or(Rejected::NotFound)?;
        if mode == ApplyMode::Fresh {
            self.applied.push(id.to_string());
            log::info!("upgrade={id} applied (stack {})", self.stack_count(id));
        }
        let mut applied = Applied::default();
        match &def.effect {
            UpgradeEffect::StatBoost { stat, value } => {
                targets.staff.apply_stat(*stat, *value);
                applied.staff_changed = true;
            }
            UpgradeEffect::UnlockStaff { staff_id } => {
                // On replay the roster comes from the save itself.
                if mode == ApplyMode::Fresh && !targets.staff.is_hired(staff_id) {
                    if let Some(worker) = recruit(config, staff_id, targets.staff_start) {
                        targets.staff.hire(worker);
                        applied.hired = Some(staff_id.clone());
                        applied.staff_changed = true;
                    }
                }
            }
            UpgradeEffect::RentShield { count } => {
                if mode == ApplyMode::Fresh {
                    targets.ledger.rent_shields += count;
                }
            }
            UpgradeEffect::ExtraTable => {
                applied.table = Some(targets.facility.add_extra_table());
            }
            UpgradeEffect::GlobalConfig { stat, value } => targets.modifiers.apply(*stat, *value),
            UpgradeEffect::RareUtility { stat, value } => targets.modifiers.apply_rare(*stat, *value),
        }
        Ok(applied)
    }

    /// Rebuild upgrade modifiers and staff stats from the applied list.
    ///
    /// Saved recruits in `roster` rejoin when their recruitment upgrade
    /// comes up, so a stat boost only reaches workers hired before it.
    pub fn reapply_upgrades(&mut self, roster: &[StaffId], targets: &mut UpgradeTargets<'_>) {
        *targets.modifiers = UpgradeModifiers::default();
        let config = targets.config;
        let applied = self.applied.clone();
        for id in &applied {
            let rejoining = config
                .upgrade(id)
                .and_then(|u| u.recruits())
                .filter(|staff_id| roster.iter().any(|r| r == staff_id) && !targets.staff.is_hired(staff_id));
            if let Some(staff_id) = rejoining {
                if let Some(worker) = recruit(config, staff_id, targets.staff_start) {
                    targets.staff.hire(worker);
                }
                continue;
            }
            // Ids were filtered against the catalog on restore.
            if let Err(reason) = self.apply_upgrade(id, ApplyMode::Replay, targets) {
                log::warn!("upgrade={id} replay skipped: {reason}");
            }
        }
    }

    /// Remove one stack of `upgrade_id`, e.g. when a recruit is dismissed.
    pub fn forget_one(&mut self, upgrade_id: &str) -> bool {
        match self.applied.iter().position(|a| a == upgrade_id) {
            Some(i) => {
                self.applied.remove(i);
                true
            }
            None => false,
        }
    }

    /// Price of the next unit of a store item.
    pub fn store_price(&self, id: &str, config: &SimConfig) -> Option<Gold> {
        let item = config.store_item(id)?;
        Some(item.price_after(self.purchases.get(id).copied().unwrap_or(0)))
    }

    pub fn buy_from_store(&mut self, id: &str, targets: &mut UpgradeTargets<'_>) -> Outcome<Applied> {
        let config = targets.config;
        let item = config.store_item(id).ok_or(Rejected::ItemNotFound)?;
        let bought = self.purchases.get(id).copied().unwrap_or(0);
        if item.limit.is_some_and(|limit| limit > 0 && bought >= limit) {
            return Err(Rejected::LimitReached);
        }
        let price = item.price_after(bought);
        if targets.ledger.gold < price {
            return Err(Rejected::InsufficientGold);
        }
        targets.ledger.gold -= price;
        *self.purchases.entry(id.to_string()).or_insert(0) += 1;
        log::info!("store item={id} bought for {price} gold");

        let mut applied = Applied::default();
        match &item.effect {
            StoreEffect::UnlockTable => applied.table = targets.facility.unlock_next_table(),
            StoreEffect::RecoverStamina { value } => {
                for w in targets.staff.workers_mut() {
                    w.recover_stamina(*value);
                }
                applied.staff_changed = true;
            }
            StoreEffect::AddReroll { value } => {
                self.reroll_limit += value;
                self.rerolls_left += value;
            }
            StoreEffect::AddBanish { value } => self.banishes_left += value,
            StoreEffect::StaffTraining { stat, value } => {
                targets.staff.apply_stat(*stat, *value);
                applied.staff_changed = true;
            }
        }
        Ok(applied)
    }
}

fn unselected<'c>(
    pool: &[&'c UpgradeDef],
    selected: &[&UpgradeDef],
    category: Option<UpgradeCategory>,
) -> Vec<&'c UpgradeDef> {
    pool.iter()
        .copied()
        .filter(|u| category.map_or(true, |c| u.category == c))
        .filter(|u| !selected.iter().any(|s| s.id == u.id))
        .collect()
}

/// Build a worker for `staff_id` from the catalogs.
pub fn recruit(config: &SimConfig, staff_id: &str, start: Vec2) -> Option<Worker> {
    let def = config.staff_def(staff_id)?;
    let skill = def.skill_id.as_deref().and_then(|s| config.skill(s)).cloned();
    Some(Worker::hire(def, skill, config.game.base_staff_speed, start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, SubsystemSlot};
    use std::collections::HashMap;

    struct World {
        config: SimConfig,
        modifiers: UpgradeModifiers,
        staff: StaffScheduler,
        facility: FacilityRegistry,
        ledger: EconomyLedger,
    }

    impl World {
        fn new() -> Self {
            let config = SimConfig::default_test();
            let mut staff = StaffScheduler::new();
            staff.hire(recruit(&config, "staff_mika", Vec2::default()).unwrap());
            let facility = FacilityRegistry::new(config.game.layout.clone(), 45.0, 10, 3);
            Self {
                config,
                modifiers: UpgradeModifiers::default(),
                staff,
                facility,
                ledger: EconomyLedger::new(5000, 0, 2500),
            }
        }

        fn targets(&mut self) -> UpgradeTargets<'_> {
            UpgradeTargets {
                config: &self.config,
                modifiers: &mut self.modifiers,
                staff: &mut self.staff,
                facility: &mut self.facility,
                ledger: &mut self.ledger,
                staff_start: Vec2::default(),
            }
        }
    }

    fn rng() -> SubsystemRng {
        RngBank::new(5).for_subsystem(SubsystemSlot::Upgrades)
    }

    #[test]
    fn offer_has_augment_and_expansion_without_duplicates() {
        let w = World::new();
        let mut catalog = UpgradeCatalog::new(2, 1);
        let mut r = rng();
        for _ in 0..50 {
            let offer = catalog.draw_offer(3, &w.config, &w.staff, &mut r).to_vec();
            assert_eq!(offer.len(), 3);
            assert!(offer[0].starts_with("AUG_"), "first slot {offer:?}");
            assert!(offer[1].starts_with("REC_"), "second slot {offer:?}");
            let mut dedup = offer.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), 3);
        }
    }

    #[test]
    fn offer_excludes_banished_capped_and_hired() {
        let mut w = World::new();
        let mut catalog = UpgradeCatalog::new(2, 5);
        catalog.banish("GC_FLYERS", &w.config).unwrap();
        catalog.apply_upgrade("UT_GOLDEN_PLATE", ApplyMode::Fresh, &mut w.targets()).unwrap();
        catalog.apply_upgrade("REC_REI", ApplyMode::Fresh, &mut w.targets()).unwrap();
        let mut r = rng();
        for _ in 0..100 {
            let offer = catalog.draw_offer(5, &w.config, &w.staff, &mut r);
            for excluded in ["GC_FLYERS", "UT_GOLDEN_PLATE", "REC_REI"] {
                assert!(!offer.iter().any(|o| o == excluded), "{excluded} offered");
            }
        }
    }

    #[test]
    fn rare_utility_fills_expansion_when_no_recruits_left() {
        let mut w = World::new();
        let mut catalog = UpgradeCatalog::new(2, 1);
        for id in ["REC_REI", "REC_HILL", "REC_LISA"] {
            catalog.apply_upgrade(id, ApplyMode::Fresh, &mut w.targets()).unwrap();
        }
        let offer = catalog.draw_offer(3, &w.config, &w.staff, &mut rng()).to_vec();
        assert!(offer[1].starts_with("UT_"), "second slot {offer:?}");
    }

    #[test]
    fn fill_slots_are_roughly_uniform() {
        let w = World::new();
        let mut catalog = UpgradeCatalog::new(0, 0);
        let mut r = rng();
        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..3000 {
            let offer = catalog.draw_offer(3, &w.config, &w.staff, &mut r);
            *counts.entry(offer[2].clone()).or_default() += 1;
        }
        let max = counts.values().max().copied().unwrap_or(0);
        let min = counts.values().min().copied().unwrap_or(0);
        assert!(counts.len() > 5, "fill slot drew only {counts:?}");
        assert!(max < min * 4, "fill slot skewed: {counts:?}");
    }

    #[test]
    fn reroll_and_banish_budgets() {
        let w = World::new();
        let mut catalog = UpgradeCatalog::new(1, 1);
        let mut r = rng();
        assert!(catalog.reroll(3, &w.config, &w.staff, &mut r).is_ok());
        assert_eq!(catalog.reroll(3, &w.config, &w.staff, &mut r).err(), Some(Rejected::LimitReached));
        catalog.banish("GC_BGM", &w.config).unwrap();
        assert_eq!(catalog.banish("GC_ROOMBA", &w.config), Err(Rejected::LimitReached));
        assert_eq!(catalog.banish("NOPE", &w.config), Err(Rejected::NotFound));
        catalog.restore_budgets();
        assert_eq!((catalog.rerolls_left(), catalog.banishes_left()), (1, 1));
    }

    #[test]
    fn unknown_upgrade_is_not_found() {
        let mut w = World::new();
        let mut catalog = UpgradeCatalog::new(2, 1);
        let res = catalog.apply_upgrade("NOPE", ApplyMode::Fresh, &mut w.targets());
        assert_eq!(res, Err(Rejected::NotFound));
        assert!(catalog.applied().is_empty());
    }

    #[test]
    fn replay_rebuilds_modifiers_without_regranting_shields() {
        let mut w = World::new();
        let mut catalog = UpgradeCatalog::new(2, 1);
        for id in ["GC_MENU_DESIGN", "GC_MENU_DESIGN", "OT_RENT_SHIELD"] {
            catalog.apply_upgrade(id, ApplyMode::Fresh, &mut w.targets()).unwrap();
        }
        assert_eq!(w.ledger.rent_shields, 1);
        catalog.reapply_upgrades(&[], &mut w.targets());
        assert!((w.modifiers.income - 1.21).abs() < 1e-9, "income {}", w.modifiers.income);
        assert_eq!(w.ledger.rent_shields, 1);
    }

    #[test]
    fn speed_boost_raises_current_staff() {
        let mut w = World::new();
        let mut catalog = UpgradeCatalog::new(2, 1);
        catalog.apply_upgrade("AUG_SWIFT_FEET", ApplyMode::Fresh, &mut w.targets()).unwrap();
        let mika = w.staff.get("staff_mika").unwrap();
        assert!((mika.base_speed - 220.0).abs() < 1e-9);
        assert!((mika.speed - 220.0).abs() < 1e-9);
    }

    #[test]
    fn store_prices_compound_and_limits_hold() {
        let mut w = World::new();
        let mut catalog = UpgradeCatalog::new(2, 1);
        catalog.buy_from_store("ITEM_TABLE", &mut w.targets()).unwrap();
        assert_eq!(w.ledger.gold, 4000);
        assert_eq!(catalog.store_price("ITEM_TABLE", &w.config), Some(1500));
        assert_eq!(w.facility.available_tables(), 4);

        catalog.buy_from_store("ITEM_DICE", &mut w.targets()).unwrap();
        catalog.buy_from_store("ITEM_DICE", &mut w.targets()).unwrap();
        assert_eq!(catalog.rerolls_left(), 4);
        assert_eq!(catalog.buy_from_store("ITEM_DICE", &mut w.targets()), Err(Rejected::LimitReached));
        assert_eq!(catalog.buy_from_store("ITEM_NOPE", &mut w.targets()), Err(Rejected::ItemNotFound));

        w.ledger.gold = 10;
        assert_eq!(catalog.buy_from_store("ITEM_COFFEE", &mut w.targets()), Err(Rejected::InsufficientGold));
    }

    #[test]
    fn restore_recovers_bought_rerolls() {
        let config = SimConfig::default_test();
        let purchases = BTreeMap::from([("ITEM_DICE".to_string(), 2), ("ITEM_GONE".to_string(), 1)]);
        let catalog = UpgradeCatalog::restore(
            &config,
            vec!["GC_BGM".into(), "REMOVED".into()],
            vec![],
            purchases,
        );
        assert_eq!(catalog.rerolls_left(), config.game.reroll_limit + 2);
        assert_eq!(catalog.applied(), ["GC_BGM".to_string()]);
        assert!(!catalog.purchases().contains_key("ITEM_GONE"));
    }
}
