//! The simulation coordinator.
//!
//! EXECUTION ORDER per tick (fixed, documented, never reordered):
//!   1. Clock:         business timer, spawn timer, spawning
//!   2. Customers:     movement, patience, departures, exits
//!   3. Staff:         task discovery, movement, work, completions
//!   4. Automation:    automated cleaner and automated serving
//!   5. Queue:         seat queued customers on freed tables
//!   6. PassiveIncome: queue-driven gold and reputation
//!   7. DayEnd:        settlement once the timer has run out
//!
//! RULES:
//!   - Only the coordinator moves data between components.
//!   - Components reference each other by id, never by pointer.
//!   - All randomness flows through per-component RNG streams.
//!   - Operator actions outside their phase return WRONG_PHASE and
//!     change nothing.

use crate::{
    clock::{RunEnd, RunStatus, SimClock, SimSpeed},
    config::{SimConfig, SkillEffect},
    customer::{Customer, CustomerAction, CustomerContext, CustomerState, Departure, InteractionOutcome, ServiceContext},
    economy::{self, EconomyLedger, RentResult, RentStrategy, Sale, SettlementInputs},
    error::{Outcome, Rejected},
    event::{CustomerView, DayReport, EntitySnapshot, LitterView, Notification, StaffView, TableView},
    events::{DecisionResult, EventDirector},
    facility::{FacilityRegistry, SpawnOutcome},
    modifiers::ModifierSet,
    rng::{RngBank, SubsystemRng, SubsystemSlot},
    snapshot::{SaveState, SavedStaff, SavedTable, SAVE_VERSION},
    staff::{AutomationDevices, Completion, Employment, SkillActivation, StaffScheduler, TaskBoard, TaskKind, TaskTarget, WorkContext},
    types::{CustomerId, Day, Gold, Vec2},
    upgrades::{self, Applied, ApplyMode, UpgradeCatalog, UpgradeTargets},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStage {
    Clock,
    Customers,
    Staff,
    Automation,
    Queue,
    PassiveIncome,
    DayEnd,
}

pub const TICK_STAGES: [TickStage; 7] = [
    TickStage::Clock,
    TickStage::Customers,
    TickStage::Staff,
    TickStage::Automation,
    TickStage::Queue,
    TickStage::PassiveIncome,
    TickStage::DayEnd,
];

/// One RNG stream per component.
struct Streams {
    customers: SubsystemRng,
    staff: SubsystemRng,
    economy: SubsystemRng,
    events: SubsystemRng,
    upgrades: SubsystemRng,
    social: SubsystemRng,
}

impl Streams {
    fn new(bank: &RngBank) -> Self {
        Self {
            customers: bank.for_subsystem(SubsystemSlot::Customers),
            staff: bank.for_subsystem(SubsystemSlot::Staff),
            economy: bank.for_subsystem(SubsystemSlot::Economy),
            events: bank.for_subsystem(SubsystemSlot::Events),
            upgrades: bank.for_subsystem(SubsystemSlot::Upgrades),
            social: bank.for_subsystem(SubsystemSlot::Social),
        }
    }
}

pub struct Cafe {
    config: SimConfig,
    pub clock: SimClock,
    seed: u64,
    rng: Streams,
    modifiers: ModifierSet,
    facility: FacilityRegistry,
    customers: Vec<Customer>,
    next_customer_id: CustomerId,
    spawn_timer: f64,
    staff: StaffScheduler,
    devices: AutomationDevices,
    ledger: EconomyLedger,
    events: EventDirector,
    upgrades: UpgradeCatalog,
    /// Staff pick up litter only while this is on.
    auto_clean: bool,
    victory_gold_goal: Gold,
    max_days: Day,
    last_report: Option<DayReport>,
    notifications: Vec<Notification>,
    entities_dirty: bool,
}

impl Cafe {
    /// A fresh run on day 1 with the first catalog staff member hired.
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let mut cafe = Self::assemble(config, seed);
        let start = cafe.config.game.layout.kitchen;
        if let Some(first) = cafe.config.staff.first() {
            if let Some(worker) = upgrades::recruit(&cafe.config, &first.id, start) {
                cafe.staff.hire(worker);
            }
        }
        log::info!("run started seed={seed} staff={}", cafe.staff.len());
        cafe
    }

    fn assemble(config: SimConfig, seed: u64) -> Self {
        let game = &config.game;
        let bank = RngBank::new(seed);
        let facility = FacilityRegistry::new(
            game.layout.clone(),
            config.balance.queue.spacing,
            game.max_tables,
            game.initial_tables,
        );
        Self {
            clock: SimClock::new(game.day_duration),
            seed,
            rng: Streams::new(&bank),
            modifiers: ModifierSet::default(),
            facility,
            customers: Vec::new(),
            next_customer_id: 1,
            spawn_timer: 0.0,
            staff: StaffScheduler::new(),
            devices: AutomationDevices::default(),
            ledger: EconomyLedger::new(game.initial_gold, game.initial_reputation, game.rent_base),
            events: EventDirector::new(),
            upgrades: UpgradeCatalog::new(game.reroll_limit, game.banish_limit),
            auto_clean: true,
            victory_gold_goal: game.victory_gold_goal,
            max_days: game.max_days,
            last_report: None,
            notifications: Vec::new(),
            entities_dirty: true,
            config,
        }
    }

    // ── Read access ────────────────────────────────────────────

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn status(&self) -> RunStatus {
        self.clock.status
    }

    pub fn day(&self) -> Day {
        self.clock.day
    }

    pub fn ledger(&self) -> &EconomyLedger {
        &self.ledger
    }

    pub fn staff(&self) -> &StaffScheduler {
        &self.staff
    }

    pub fn facility(&self) -> &FacilityRegistry {
        &self.facility
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn modifiers(&self) -> &ModifierSet {
        &self.modifiers
    }

    pub fn upgrades(&self) -> &UpgradeCatalog {
        &self.upgrades
    }

    pub fn events(&self) -> &EventDirector {
        &self.events
    }

    pub fn offer(&self) -> &[String] {
        self.upgrades.offer()
    }

    pub fn auto_clean(&self) -> bool {
        self.auto_clean
    }

    pub fn last_report(&self) -> Option<&DayReport> {
        self.last_report.as_ref()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn entities(&self) -> EntitySnapshot {
        EntitySnapshot {
            customers: self
                .customers
                .iter()
                .map(|c| CustomerView { id: c.id, state: c.state, position: c.position, patience: c.patience })
                .collect(),
            staff: self
                .staff
                .workers()
                .iter()
                .map(|w| StaffView {
                    id: w.id.clone(),
                    name: w.name.clone(),
                    state: w.state,
                    position: w.position,
                    stamina: w.stamina,
                    max_stamina: w.max_stamina,
                    employment: w.employment,
                    skill_cooldown: w.cooldown,
                })
                .collect(),
            tables: self
                .facility
                .tables()
                .iter()
                .map(|t| TableView { id: t.id, position: t.position, unlocked: t.unlocked, state: t.state })
                .collect(),
            litter: self
                .facility
                .litter()
                .iter()
                .map(|l| LitterView { id: l.id, position: l.position })
                .collect(),
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn set_status(&mut self, status: RunStatus) {
        if self.clock.status != status {
            self.clock.status = status;
            self.notify(Notification::StateChange { status });
        }
    }

    fn require(&self, status: RunStatus) -> Outcome<()> {
        if self.clock.status == status {
            Ok(())
        } else {
            Err(Rejected::WrongPhase)
        }
    }

    fn staff_start(&self) -> Vec2 {
        self.config.game.layout.kitchen
    }

    fn exit_point(&self) -> Vec2 {
        let layout = &self.config.game.layout;
        layout.door.offset(0.0, layout.exit_offset)
    }

    // ── Day flow ───────────────────────────────────────────────

    /// Roll today's event and open the café, unless the event is a
    /// decision that must be resolved first.
    pub fn begin_day(&mut self) -> Outcome<RunStatus> {
        self.require(RunStatus::Ready)?;
        self.upgrades.clear_offer();
        let day = self.clock.day;
        let rolled = self
            .events
            .roll_daily_event(day, self.config.game.event_start_day, &self.config.events, &mut self.rng.events)
            .map(|e| (e.id.clone(), e.title.clone(), e.kind));
        if let Some((id, title, kind)) = rolled {
            self.notify(Notification::EventTriggered { day, id, title, kind });
        }
        if self.events.decision_pending() {
            self.set_status(RunStatus::AwaitingDecision);
        } else {
            self.open_day();
        }
        Ok(self.clock.status)
    }

    /// Resolve the pending decision and open the café.
    pub fn resolve_decision(&mut self, index: usize) -> Outcome<DecisionResult> {
        self.require(RunStatus::AwaitingDecision)?;
        let result = self
            .events
            .resolve_decision(index, &mut self.ledger, &mut self.staff, &mut self.rng.events)?;
        self.entities_dirty = true;
        if self.ledger.is_bankrupt() {
            self.end_run(RunEnd::Bankruptcy);
        } else {
            self.open_day();
        }
        Ok(result)
    }

    fn open_day(&mut self) {
        self.modifiers.start_day(self.events.active().map(|e| &e.effects));
        self.ledger.start_new_day();
        self.facility.reset_for_new_day();
        self.customers.clear();
        self.spawn_timer = 0.0;
        self.devices.reset();
        self.clock.open_day();
        self.entities_dirty = true;
        log::info!("day={} open gold={} rep={}", self.clock.day, self.ledger.gold, self.ledger.reputation);
        self.notify(Notification::StateChange { status: self.clock.status });
        self.push_hud();
    }

    pub fn set_paused(&mut self, paused: bool) -> bool {
        let changed = self.clock.set_paused(paused);
        if changed {
            self.notify(Notification::StateChange { status: self.clock.status });
        }
        changed
    }

    pub fn set_speed(&mut self, speed: SimSpeed) {
        self.clock.set_speed(speed);
    }

    /// Advance by a raw wall-clock frame, scaled and clamped.
    pub fn frame(&mut self, raw_seconds: f64) {
        let dt = self.clock.frame_delta(raw_seconds);
        self.tick(dt);
    }

    /// Advance by `dt` seconds of business time. Ignored unless running.
    pub fn tick(&mut self, dt: f64) {
        if !self.clock.is_running() || dt <= 0.0 {
            return;
        }
        let mut day_over = false;
        for stage in TICK_STAGES {
            match stage {
                TickStage::Clock => {
                    day_over = self.clock.advance(dt);
                    self.tick_spawn(dt);
                }
                TickStage::Customers => self.tick_customers(dt),
                TickStage::Staff => self.tick_staff(dt),
                TickStage::Automation => self.tick_automation(dt),
                TickStage::Queue => self.tick_queue(),
                TickStage::PassiveIncome => self.tick_passive_income(dt),
                TickStage::DayEnd => {
                    if day_over {
                        self.settle_day();
                    }
                }
            }
        }
        if self.entities_dirty {
            self.entities_dirty = false;
            let snapshot = self.entities();
            self.notify(Notification::EntitiesUpdate(snapshot));
        }
        if self.clock.is_running() {
            self.push_hud();
        }
    }

    /// Tick at a fixed step until the business day is over.
    pub fn run_day(&mut self, dt: f64) -> usize {
        let mut ticks = 0;
        while self.clock.is_running() && dt > 0.0 {
            self.tick(dt);
            ticks += 1;
        }
        ticks
    }

    fn push_hud(&mut self) {
        let hud = Notification::HudUpdate {
            day: self.clock.day,
            gold: self.ledger.gold,
            reputation: self.ledger.reputation,
            time_remaining: self.clock.time_remaining,
            queue_len: self.facility.queue_len(),
        };
        self.notify(hud);
    }

    // ── Stage: clock ───────────────────────────────────────────

    fn tick_spawn(&mut self, dt: f64) {
        self.spawn_timer += dt;
        let interval = self
            .modifiers
            .spawn_interval(self.config.balance.queue.base_spawn_interval, self.ledger.reputation);
        if self.spawn_timer >= interval {
            self.spawn_timer = 0.0;
            self.spawn_customer();
        }
    }

    /// Admit one new customer. Returns where they ended up.
    pub fn spawn_customer(&mut self) -> SpawnOutcome {
        let id = self.next_customer_id;
        let capacity = self.modifiers.queue_capacity(self.config.balance.queue.max_size);
        let outcome = self.facility.admit(id, capacity);
        if outcome == SpawnOutcome::Dropped {
            log::debug!("day={} queue full, customer turned away", self.clock.day);
            return outcome;
        }
        self.next_customer_id += 1;

        let game = &self.config.game;
        let mut customer = Customer::arrive(
            id,
            game.layout.door,
            self.exit_point(),
            game.base_customer_speed,
            self.config.balance.customer.max_patience,
            game.customer_order_time,
        );
        match outcome {
            SpawnOutcome::Seated(table) => {
                let seat = self.facility.seat_position(table).unwrap_or(game.layout.door);
                customer.assign_table(table, seat, self.seating_relief());
            }
            SpawnOutcome::Queued { index } => customer.enqueue(index, self.facility.queue_slot(index)),
            SpawnOutcome::Dropped => {}
        }
        log::debug!("day={} customer={id} {outcome:?}", self.clock.day);
        self.customers.push(customer);
        self.entities_dirty = true;
        outcome
    }

    fn seating_relief(&self) -> f64 {
        self.config.balance.customer.seating_relief + self.modifiers.upgrades.seating_relief
    }

    // ── Stage: customers ───────────────────────────────────────

    fn customer_context(&self) -> CustomerContext {
        let balance = &self.config.balance.customer;
        let skill_factor = self
            .staff
            .workers()
            .iter()
            .find_map(|w| match w.skill_effect() {
                Some(SkillEffect::QueuePatience { factor }) => Some(*factor),
                _ => None,
            })
            .unwrap_or(1.0);
        CustomerContext {
            patience_decay: self.modifiers.patience_decay(),
            litter_penalty: balance.litter_decay_penalty,
            litter_count: self.facility.litter_count(),
            queue_patience: self.modifiers.upgrades.queue_patience * skill_factor,
            pay_decay: balance.pay_decay_rate * self.modifiers.upgrades.pay_stress(),
        }
    }

    fn tick_customers(&mut self, dt: f64) {
        let ctx = self.customer_context();
        let departures: Vec<Departure> = self
            .customers
            .iter_mut()
            .filter_map(|c| c.update(dt, &ctx))
            .collect();
        for departure in departures {
            self.on_departure(departure);
        }
        let before = self.customers.len();
        self.customers.retain(|c| !c.has_exited());
        if self.customers.len() != before {
            self.entities_dirty = true;
        }
    }

    /// Book-keeping for a customer who just turned to leave.
    fn on_departure(&mut self, departure: Departure) {
        let id = departure.customer;
        if let Some(rating) = self.customers.iter_mut().find(|c| c.id == id).and_then(|c| c.take_rating()) {
            self.ledger.record_rating(rating);
        }
        if self.facility.remove_from_queue(id) {
            self.reindex_queue();
        }
        if let Some(table) = departure.table {
            self.facility.release_table(table, id);
        }
        if !self.modifiers.upgrades.auto_clean_installed() {
            let chance = self.modifiers.litter_chance(self.config.game.litter_spawn_chance);
            if self.rng.customers.chance(chance) {
                self.facility.spawn_litter(departure.position);
            }
        }
        if !departure.happy {
            log::debug!("day={} customer={id} left angry", self.clock.day);
            self.notify(Notification::FloatingText {
                text: "Left in a huff!".to_string(),
                position: departure.position,
            });
        }
        self.entities_dirty = true;
    }

    fn reindex_queue(&mut self) {
        let queue: Vec<CustomerId> = self.facility.queue().collect();
        for (index, id) in queue.into_iter().enumerate() {
            let slot = self.facility.queue_slot(index);
            if let Some(c) = self.customers.iter_mut().find(|c| c.id == id) {
                c.move_in_queue(index, slot);
            }
        }
    }

    // ── Stage: staff ───────────────────────────────────────────

    fn automation_efficiency(&self) -> f64 {
        let mut efficiency = 1.0;
        if self.staff.has_skill(false, |s| matches!(s, SkillEffect::AutomationEfficiency)) {
            efficiency += self.config.balance.automation.pot_efficiency_bonus;
        }
        efficiency
    }

    fn work_context(&self) -> WorkContext {
        let game = &self.config.game;
        let up = &self.modifiers.upgrades;
        WorkContext {
            kitchen: game.layout.kitchen,
            litter_count: self.facility.litter_count(),
            reputation: self.ledger.reputation,
            litter_speed_boost: up.litter_speed_boost,
            staff_speed: self.modifiers.daily.staff_speed,
            low_stamina_buff: up.low_stamina_buff,
            idle_regen: game.staff_idle_regen_rate,
            order_time: game.staff_work_time_order,
            prep_time: game.staff_work_time_prep,
            litter_time: game.staff_work_time_litter,
            checkout_mod: up.checkout_speed * self.automation_efficiency(),
        }
    }

    fn tick_staff(&mut self, dt: f64) {
        let ctx = self.work_context();
        let board = TaskBoard {
            customers: self.customers.iter().map(|c| (c.id, c.state, c.position)).collect(),
            litter: self.facility.litter(),
            auto_serve: self.modifiers.auto_serve_running(),
            auto_clean_enabled: self.auto_clean,
        };
        let mut completions = Vec::new();
        for index in 0..self.staff.len() {
            if let Some(done) = self.staff.advance(index, dt, &board, &ctx) {
                completions.push(done);
            }
        }
        for done in completions {
            self.apply_completion(done);
        }
    }

    fn apply_completion(&mut self, done: Completion) {
        let customer_id = match done.task.target {
            TaskTarget::Litter(litter) => {
                if self.facility.remove_litter(litter) {
                    self.entities_dirty = true;
                }
                return;
            }
            TaskTarget::Customer(id) => id,
        };
        let Some(worker) = self.staff.get(&done.staff) else {
            return;
        };
        let (action, service) = match done.task.kind {
            TaskKind::TakeOrder => (CustomerAction::TakeOrder, ServiceContext::default()),
            TaskKind::ServeFoodDeliver => (
                CustomerAction::ServeFood,
                ServiceContext {
                    eat_time: self.modifiers.eat_time(self.config.game.customer_eat_time),
                    golden_food: worker.golden_food(),
                    tip_bonus: 0.0,
                },
            ),
            TaskKind::Checkout => (
                CustomerAction::Checkout,
                ServiceContext { tip_bonus: worker.tip_bonus(), ..Default::default() },
            ),
            // Prep hands over to delivery inside the scheduler.
            TaskKind::ServeFoodPrep | TaskKind::CleanLitter => return,
        };
        let Some(customer) = self.customers.iter_mut().find(|c| c.id == customer_id) else {
            return;
        };
        let position = customer.position;
        match customer.interact(action, &service, &mut self.rng.staff) {
            Some(InteractionOutcome::FoodServed { value_multiplier }) if value_multiplier > 1.0 => {
                self.notify(Notification::FloatingText {
                    text: format!("Golden dish x{value_multiplier}!"),
                    position,
                });
            }
            Some(InteractionOutcome::Paid(payment)) => {
                let receipt = self.ledger.add_gold(
                    self.config.balance.economy.base_price,
                    &Sale::from(&payment),
                    &self.modifiers,
                    &self.config.balance.economy,
                );
                self.notify(Notification::GoldGain {
                    amount: receipt.amount,
                    position: payment.position,
                    perfect: receipt.perfect,
                });
                self.on_departure(payment.departure);
            }
            _ => {}
        }
    }

    // ── Stage: automation ──────────────────────────────────────

    fn tick_automation(&mut self, dt: f64) {
        let automation = &self.config.balance.automation;
        let efficiency = self.automation_efficiency();

        if self.modifiers.auto_clean_running() {
            let interval = (automation.cleaner_interval / efficiency).max(automation.auto_clean_floor);
            if self.devices.tick_cleaner(dt, interval) && self.facility.pop_oldest_litter().is_some() {
                self.entities_dirty = true;
            }
        }

        if self.modifiers.auto_serve_running() {
            let cook_time = (self.config.game.staff_work_time_prep / efficiency).max(automation.cook_time_floor);
            let eat_time = self.modifiers.eat_time(self.config.game.customer_eat_time);
            for customer in &mut self.customers {
                if customer.state != CustomerState::WaitingFood || self.staff.is_targeted(customer.id) {
                    continue;
                }
                customer.automation_timer += dt;
                if customer.automation_timer >= cook_time {
                    customer.serve_by_automation(eat_time, &mut self.rng.customers);
                }
            }
        }
    }

    // ── Stage: queue ───────────────────────────────────────────

    fn tick_queue(&mut self) {
        let seated = self.facility.check_queue();
        if seated.is_empty() {
            return;
        }
        let relief = self.seating_relief();
        let vip = self.modifiers.upgrades.queue_patience < 1.0;
        for (id, table) in seated {
            let Some(seat) = self.facility.seat_position(table) else {
                continue;
            };
            let Some(customer) = self.customers.iter_mut().find(|c| c.id == id) else {
                continue;
            };
            customer.assign_table(table, seat, relief);
            if vip {
                self.ledger.reputation += 1;
                let position = customer.position;
                self.notify(Notification::FloatingText { text: "VIP seated! +1 reputation".to_string(), position });
            }
        }
        self.reindex_queue();
        self.entities_dirty = true;
    }

    // ── Stage: passive income ──────────────────────────────────

    fn tick_passive_income(&mut self, dt: f64) {
        let gain = self.ledger.passive_income(
            dt,
            self.facility.queue_len(),
            &self.modifiers.upgrades,
            self.config.balance.queue.passive_interval,
        );
        if let Some(gain) = gain {
            let position = self.config.game.layout.queue_start;
            if gain.gold > 0 {
                self.notify(Notification::GoldGain { amount: gain.gold, position, perfect: false });
            }
            if gain.reputation > 0 {
                self.notify(Notification::FloatingText {
                    text: format!("Queue buzz +{} reputation", gain.reputation),
                    position,
                });
            }
        }
    }

    // ── Stage: day end ─────────────────────────────────────────

    fn settle_day(&mut self) {
        let day = self.clock.day;
        let balance = &self.config.balance;
        let up = &self.modifiers.upgrades;

        let staff_reputation = self
            .staff
            .workers()
            .iter()
            .filter(|w| w.is_active())
            .find_map(|w| match w.skill_effect() {
                Some(SkillEffect::Fame { daily_reputation, .. }) => Some(*daily_reputation),
                _ => None,
            })
            .unwrap_or(0);
        let inputs = SettlementInputs {
            litter_count: self.facility.litter_count(),
            maintenance_fee: if up.auto_serve_active() { balance.automation.auto_serve_maintenance_fee } else { 0 },
            hygiene_check: self.modifiers.daily.hygiene_check,
            special_goal: self.modifiers.daily.special_goal,
            staff_reputation,
            salaries: self.staff.active_salaries(),
        };
        let settlement = self.ledger.settle(&inputs, up, &balance.rent, &balance.settlement);
        let social = economy::social_feed(settlement.average_rating, &self.config.social, &mut self.rng.social);
        log::info!(
            "day={day} settled avg={} net={} gold={}",
            settlement.average_rating,
            settlement.net_profit,
            self.ledger.gold
        );

        self.customers.clear();
        self.facility.reset_for_new_day();
        self.entities_dirty = true;

        if settlement.bankrupt {
            self.publish_report(DayReport { day, settlement, social, rent_due: false, offer: Vec::new() });
            self.end_run(RunEnd::Bankruptcy);
            return;
        }

        let saver = self
            .staff
            .workers()
            .iter()
            .filter(|w| w.is_active())
            .find_map(|w| match w.skill_effect() {
                Some(SkillEffect::StaminaSaver { reduction }) => Some(*reduction),
                _ => None,
            })
            .unwrap_or(0.0);
        let loss = (balance.settlement.staff_stamina_loss - (up.stamina_loss + saver)).max(0.0);
        let start = self.staff_start();
        self.staff.end_of_day(loss, start);
        self.upgrades.restore_budgets();
        self.devices.reset();

        let rent_due = day == self.clock.next_rent_day();
        if rent_due {
            self.set_status(RunStatus::RentDue);
        } else if day >= self.max_days {
            self.finish_run();
        } else {
            self.advance_day();
        }

        let offer = self.upgrades.offer().to_vec();
        self.publish_report(DayReport { day, settlement, social, rent_due, offer });
    }

    fn publish_report(&mut self, report: DayReport) {
        self.last_report = Some(report.clone());
        self.notify(Notification::DayEnd(report));
    }

    fn advance_day(&mut self) {
        self.clock.day += 1;
        self.clock.time_remaining = self.clock.day_duration;
        self.upgrades.draw_offer(
            self.config.game.upgrade_option_count,
            &self.config,
            &self.staff,
            &mut self.rng.upgrades,
        );
        self.set_status(RunStatus::Ready);
    }

    fn finish_run(&mut self) {
        if self.ledger.gold >= self.victory_gold_goal {
            self.end_run(RunEnd::Victory);
        } else {
            self.end_run(RunEnd::GoalNotReached);
        }
    }

    /// Enter a terminal status. Reported once; later calls do nothing.
    fn end_run(&mut self, reason: RunEnd) {
        if self.clock.is_ended() {
            return;
        }
        log::info!("day={} run ended: {reason:?} gold={}", self.clock.day, self.ledger.gold);
        self.set_status(RunStatus::Ended(reason));
        match reason {
            RunEnd::Victory => self.notify(Notification::Victory { gold: self.ledger.gold }),
            _ => self.notify(Notification::GameOver { reason }),
        }
    }

    /// Weekly rent. Only valid while rent is due.
    pub fn negotiate_rent(&mut self, strategy: RentStrategy) -> Outcome<RentResult> {
        if self.ledger.is_bankrupt() {
            return Err(Rejected::Bankruptcy);
        }
        self.require(RunStatus::RentDue)?;
        let negotiator = self.staff.workers().iter().find_map(|w| match w.skill_effect() {
            Some(SkillEffect::Negotiator { success_bonus, sponsorship_per_day }) => {
                Some((*success_bonus, *sponsorship_per_day))
            }
            _ => None,
        });
        let result = self.ledger.negotiate_rent(
            strategy,
            negotiator,
            self.clock.day,
            &self.config.balance.rent,
            &mut self.rng.economy,
        )?;
        if result.bankrupt {
            self.end_run(RunEnd::Bankruptcy);
        } else if self.clock.day >= self.max_days {
            self.finish_run();
        } else {
            self.ledger.start_new_week(self.config.game.rent_increase_rate);
            self.advance_day();
        }
        Ok(result)
    }

    // ── Between days: upgrades and store ───────────────────────

    /// Take one upgrade from the current offer.
    pub fn choose_upgrade(&mut self, id: &str) -> Outcome<Applied> {
        self.require(RunStatus::Ready)?;
        if !self.upgrades.offer().iter().any(|o| o == id) {
            return Err(Rejected::NotFound);
        }
        let applied = self.apply_upgrade(id, ApplyMode::Fresh)?;
        self.upgrades.clear_offer();
        Ok(applied)
    }

    fn apply_upgrade(&mut self, id: &str, mode: ApplyMode) -> Outcome<Applied> {
        let staff_start = self.staff_start();
        let mut targets = UpgradeTargets {
            config: &self.config,
            modifiers: &mut self.modifiers.upgrades,
            staff: &mut self.staff,
            facility: &mut self.facility,
            ledger: &mut self.ledger,
            staff_start,
        };
        let applied = self.upgrades.apply_upgrade(id, mode, &mut targets)?;
        self.entities_dirty = true;
        Ok(applied)
    }

    pub fn reroll(&mut self) -> Outcome<Vec<String>> {
        self.require(RunStatus::Ready)?;
        let offer = self.upgrades.reroll(
            self.config.game.upgrade_option_count,
            &self.config,
            &self.staff,
            &mut self.rng.upgrades,
        )?;
        Ok(offer.to_vec())
    }

    pub fn banish(&mut self, id: &str) -> Outcome<()> {
        self.require(RunStatus::Ready)?;
        self.upgrades.banish(id, &self.config)
    }

    /// Pass on today's offer for a little gold.
    pub fn skip_reward(&mut self) -> Outcome<Gold> {
        self.require(RunStatus::Ready)?;
        if self.upgrades.offer().is_empty() {
            return Err(Rejected::WrongPhase);
        }
        let reward = economy::skip_reward(self.clock.day, self.config.balance.economy.skip_reward_per_day);
        self.ledger.gold += reward;
        self.upgrades.clear_offer();
        log::info!("day={} upgrade skipped for {reward} gold", self.clock.day);
        self.notify(Notification::GoldGain {
            amount: reward,
            position: self.config.game.layout.door,
            perfect: false,
        });
        Ok(reward)
    }

    pub fn buy_from_store(&mut self, id: &str) -> Outcome<Applied> {
        self.require(RunStatus::Ready)?;
        let staff_start = self.staff_start();
        let mut targets = UpgradeTargets {
            config: &self.config,
            modifiers: &mut self.modifiers.upgrades,
            staff: &mut self.staff,
            facility: &mut self.facility,
            ledger: &mut self.ledger,
            staff_start,
        };
        let applied = self.upgrades.buy_from_store(id, &mut targets)?;
        self.entities_dirty = true;
        Ok(applied)
    }

    // ── Staff operations ───────────────────────────────────────

    /// Dismiss a worker. Their recruitment upgrade is forgotten so it can
    /// be offered again.
    pub fn fire_staff(&mut self, id: &str) -> Outcome<()> {
        self.staff.fire(id)?;
        let recruit_upgrade = self
            .config
            .upgrades
            .iter()
            .find(|u| u.recruits() == Some(id))
            .map(|u| u.id.clone());
        if let Some(upgrade_id) = recruit_upgrade {
            self.upgrades.forget_one(&upgrade_id);
        }
        self.entities_dirty = true;
        Ok(())
    }

    pub fn set_employment(&mut self, id: &str, employment: Employment) -> Outcome<()> {
        self.staff.set_employment(id, employment)?;
        self.entities_dirty = true;
        Ok(())
    }

    /// Fire a worker's active skill. Ok(false) if it could not fire.
    pub fn trigger_skill(&mut self, id: &str) -> Outcome<bool> {
        self.require(RunStatus::Running)?;
        let worker = self.staff.get_mut(id).ok_or(Rejected::NotFound)?;
        let Some(activation) = worker.activate_skill() else {
            return Ok(false);
        };
        if let SkillActivation::HealAll(amount) = activation {
            let amount = amount.unwrap_or(self.config.balance.queue.patience_heal);
            for c in &mut self.customers {
                c.heal(amount);
            }
        }
        self.entities_dirty = true;
        Ok(true)
    }

    /// Flip whether staff clean litter. Returns the new setting.
    pub fn toggle_auto_clean(&mut self) -> bool {
        self.auto_clean = !self.auto_clean;
        self.auto_clean
    }

    // ── Persistence ────────────────────────────────────────────

    pub fn serialize(&self) -> SaveState {
        SaveState {
            version: SAVE_VERSION,
            gold: self.ledger.gold,
            day: self.clock.day,
            reputation: self.ledger.reputation,
            week: self.ledger.week,
            current_rent: self.ledger.current_rent,
            rent_shields: self.ledger.rent_shields,
            applied_upgrades: self.upgrades.applied().to_vec(),
            purchased_items: self.upgrades.purchases().clone(),
            banished_upgrades: self.upgrades.banished().to_vec(),
            victory_gold_goal: self.victory_gold_goal,
            max_days: self.max_days,
            auto_clean: self.auto_clean,
            staff: self
                .staff
                .workers()
                .iter()
                .map(|w| SavedStaff { id: w.id.clone(), stamina: w.stamina, employment: w.employment })
                .collect(),
            tables: self
                .facility
                .tables()
                .iter()
                .map(|t| SavedTable { id: t.id, unlocked: t.unlocked })
                .collect(),
            weekly_ratings: self.ledger.weekly_ratings.clone(),
            recent_events: self.events.recent_ids(),
        }
    }

    /// Rebuild a run from a save. Entries whose ids no longer resolve
    /// against `config` are skipped.
    pub fn hydrate(config: SimConfig, save: SaveState, seed: u64) -> Self {
        let mut cafe = Self::assemble(config, seed);
        let table_flags = save.table_flags();
        cafe.clock.day = save.day.max(1);
        cafe.ledger.gold = save.gold;
        cafe.ledger.reputation = save.reputation;
        cafe.ledger.week = save.week.max(1);
        cafe.ledger.current_rent = save.current_rent;
        cafe.ledger.rent_shields = save.rent_shields;
        cafe.ledger.weekly_ratings = save.weekly_ratings;
        cafe.victory_gold_goal = save.victory_gold_goal;
        cafe.max_days = save.max_days;
        cafe.auto_clean = save.auto_clean;
        cafe.events = EventDirector::with_recent(save.recent_events);

        cafe.upgrades = UpgradeCatalog::restore(
            &cafe.config,
            save.applied_upgrades,
            save.banished_upgrades,
            save.purchased_items,
        );

        // Workers nobody recruited started the run; recruits rejoin during
        // replay in the order they were picked.
        let start = cafe.staff_start();
        let recruited: Vec<&str> = cafe
            .upgrades
            .applied()
            .iter()
            .filter_map(|id| cafe.config.upgrade(id).and_then(|u| u.recruits()))
            .collect();
        let roster: Vec<String> = save.staff.iter().map(|s| s.id.clone()).collect();
        let mut starters = Vec::new();
        for saved in &save.staff {
            if recruited.contains(&saved.id.as_str()) {
                continue;
            }
            match upgrades::recruit(&cafe.config, &saved.id, start) {
                Some(worker) => starters.push(worker),
                None => log::warn!("save: unknown staff '{}' skipped", saved.id),
            }
        }
        if starters.is_empty() && !roster.iter().any(|id| recruited.contains(&id.as_str())) {
            if let Some(worker) = cafe.config.staff.first().and_then(|s| upgrades::recruit(&cafe.config, &s.id, start)) {
                starters.push(worker);
            }
        }
        for worker in starters {
            cafe.staff.hire(worker);
        }

        {
            let mut targets = UpgradeTargets {
                config: &cafe.config,
                modifiers: &mut cafe.modifiers.upgrades,
                staff: &mut cafe.staff,
                facility: &mut cafe.facility,
                ledger: &mut cafe.ledger,
                staff_start: start,
            };
            cafe.upgrades.reapply_upgrades(&roster, &mut targets);
        }
        if cafe.staff.is_empty() {
            if let Some(worker) = cafe.config.staff.first().and_then(|s| upgrades::recruit(&cafe.config, &s.id, start)) {
                cafe.staff.hire(worker);
            }
        }

        for saved in &save.staff {
            if let Some(w) = cafe.staff.get_mut(&saved.id) {
                w.stamina = saved.stamina.clamp(0.0, w.max_stamina);
                w.employment = saved.employment;
            }
        }
        if cafe.staff.active_count() == 0 {
            if let Some(w) = cafe.staff.workers_mut().first_mut() {
                w.employment = Employment::Active;
            }
        }

        let skipped = cafe.facility.hydrate_tables(&table_flags);
        if skipped > 0 {
            log::warn!("save: {skipped} unknown table(s) skipped");
        }
        log::info!("run hydrated at day={} gold={}", cafe.clock.day, cafe.ledger.gold);
        cafe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cafe() -> Cafe {
        Cafe::new(SimConfig::default_test(), 42)
    }

    #[test]
    fn stage_order_is_fixed() {
        assert_eq!(TICK_STAGES.first(), Some(&TickStage::Clock));
        assert_eq!(TICK_STAGES.last(), Some(&TickStage::DayEnd));
    }

    #[test]
    fn tick_is_ignored_unless_running() {
        let mut c = cafe();
        c.tick(1.0);
        assert_eq!(c.clock.time_remaining, c.config().game.day_duration);
        assert!(c.customers().is_empty());
    }

    #[test]
    fn first_day_opens_without_event() {
        let mut c = cafe();
        assert_eq!(c.begin_day(), Ok(RunStatus::Running));
        assert!(c.events().active().is_none());
        assert_eq!(c.begin_day(), Err(Rejected::WrongPhase));
    }

    #[test]
    fn operations_outside_their_phase_are_refused() {
        let mut c = cafe();
        assert_eq!(c.negotiate_rent(RentStrategy::Mercy).err(), Some(Rejected::WrongPhase));
        assert_eq!(c.resolve_decision(0).err(), Some(Rejected::WrongPhase));
        assert_eq!(c.trigger_skill("staff_mika"), Err(Rejected::WrongPhase));
        c.begin_day().unwrap();
        assert_eq!(c.buy_from_store("ITEM_COFFEE").err(), Some(Rejected::WrongPhase));
    }

    #[test]
    fn active_skill_respects_cooldown() {
        let mut c = cafe();
        c.begin_day().unwrap();
        c.spawn_customer();
        c.customers[0].patience = 10.0;
        assert_eq!(c.trigger_skill("staff_mika"), Ok(true));
        // A speed boost leaves customers alone.
        assert_eq!(c.customers[0].patience, 10.0);
        assert_eq!(c.trigger_skill("staff_mika"), Ok(false), "second press is on cooldown");
        assert_eq!(c.trigger_skill("staff_ghost"), Err(Rejected::NotFound));
    }

    #[test]
    fn heal_skill_restores_patience() {
        let mut c = cafe();
        c.staff.hire(upgrades::recruit(&c.config, "staff_lulu", Vec2::default()).unwrap());
        c.begin_day().unwrap();
        c.spawn_customer();
        c.customers[0].patience = 10.0;
        assert_eq!(c.trigger_skill("staff_lulu"), Ok(true));
        assert_eq!(c.customers[0].patience, 40.0);
    }

    #[test]
    fn fire_forgets_recruitment_upgrade() {
        let mut c = cafe();
        c.apply_upgrade("REC_REI", ApplyMode::Fresh).unwrap();
        assert!(c.staff().is_hired("staff_rei"));
        c.fire_staff("staff_rei").unwrap();
        assert_eq!(c.upgrades().stack_count("REC_REI"), 0);
        assert_eq!(c.fire_staff("staff_mika"), Err(Rejected::LastStaff));
    }

    #[test]
    fn auto_clean_toggles() {
        let mut c = cafe();
        assert!(c.auto_clean());
        assert!(!c.toggle_auto_clean());
        assert!(c.toggle_auto_clean());
    }
}
