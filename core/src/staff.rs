//! Staff scheduling and automation devices.
//!
//! RULE: Only the scheduler mutates a worker's task fields.
//! Workers hold target ids, never entities; every tick the target is
//! resolved again through the task board, and a target that vanished
//! sends the worker back to Idle without side effects.
//!
//! Task priority for an idle worker:
//!   1. Checkout      (Paying customer)
//!   2. TakeOrder     (Ordering customer)
//!   3. ServeFood     (WaitingFood customer, only without automated serving)
//!   4. CleanLitter   (only while auto-clean is enabled)

use crate::{
    config::{SkillDef, SkillEffect, SkillKind, StaffDef, StaffStat},
    customer::CustomerState,
    error::{Outcome, Rejected},
    facility::Litter,
    types::{CustomerId, Gold, LitterId, StaffId, Vec2},
};
use serde::{Deserialize, Serialize};

/// Where resting workers are parked, off the playfield.
pub const OFF_FLOOR: Vec2 = Vec2::new(-1000.0, -1000.0);

/// Stamina below this (but above zero) triggers the low-stamina buff.
const LOW_STAMINA: f64 = 20.0;

const MIN_WORK_TIME: f64 = 0.1;
const MAX_CHECKOUT_REDUCTION: f64 = 0.9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkState {
    Idle,
    Moving,
    Working,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Employment {
    Active,
    Resting,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    TakeOrder,
    /// First half of serving: cook at the kitchen.
    ServeFoodPrep,
    /// Second half of serving: carry the plate to the customer.
    ServeFoodDeliver,
    Checkout,
    CleanLitter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TaskTarget {
    Customer(CustomerId),
    Litter(LitterId),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub kind: TaskKind,
    pub target: TaskTarget,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuffEffect {
    Speed { multiplier: f64 },
    WorkSpeed { bonus: f64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ActiveBuff {
    pub effect: BuffEffect,
    pub remaining: f64,
}

/// What a successful skill activation asks the coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkillActivation {
    /// Applied to the worker itself.
    Buff,
    /// Heal every customer; None means the configured default.
    HealAll(Option<f64>),
}

/// A finished task the coordinator must apply to the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub staff: StaffId,
    pub task: Task,
}

/// Read-only view of everything a worker may target this tick.
#[derive(Debug, Default)]
pub struct TaskBoard<'a> {
    pub customers: Vec<(CustomerId, CustomerState, Vec2)>,
    pub litter: &'a [Litter],
    pub auto_serve: bool,
    pub auto_clean_enabled: bool,
}

impl TaskBoard<'_> {
    fn position_of(&self, target: TaskTarget) -> Option<Vec2> {
        match target {
            TaskTarget::Customer(id) => self
                .customers
                .iter()
                .find(|(cid, state, _)| *cid == id && *state != CustomerState::Leaving)
                .map(|(_, _, pos)| *pos),
            TaskTarget::Litter(id) => self.litter.iter().find(|l| l.id == id).map(|l| l.position),
        }
    }
}

/// Rates shared by every worker this tick.
#[derive(Debug, Clone, Copy)]
pub struct WorkContext {
    pub kitchen: Vec2,
    pub litter_count: usize,
    pub reputation: i64,
    pub litter_speed_boost: f64,
    pub staff_speed: f64,
    pub low_stamina_buff: f64,
    pub idle_regen: f64,
    pub order_time: f64,
    pub prep_time: f64,
    pub litter_time: f64,
    /// Checkout-speed upgrade × automation efficiency, uncapped.
    pub checkout_mod: f64,
}

impl Default for WorkContext {
    fn default() -> Self {
        Self {
            kitchen: Vec2::new(480.0, 30.0),
            litter_count: 0,
            reputation: 0,
            litter_speed_boost: 0.0,
            staff_speed: 1.0,
            low_stamina_buff: 0.0,
            idle_regen: 5.0,
            order_time: 2.0,
            prep_time: 1.0,
            litter_time: 0.5,
            checkout_mod: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub id: StaffId,
    pub name: String,
    pub base_speed: f64,
    /// Base speed with any speed buff applied.
    pub speed: f64,
    pub work_speed_bonus: f64,
    /// Today-only bonus (e.g. a tonic). Cleared at day end.
    pub shift_bonus: f64,
    pub state: WorkState,
    pub task: Option<Task>,
    pub position: Vec2,
    pub target: Vec2,
    pub stamina: f64,
    pub max_stamina: f64,
    pub salary: Gold,
    pub skill: Option<SkillDef>,
    pub cooldown: f64,
    pub buff: Option<ActiveBuff>,
    pub employment: Employment,
    pub working_timer: f64,
}

impl Worker {
    pub fn hire(def: &StaffDef, skill: Option<SkillDef>, global_speed: f64, start: Vec2) -> Self {
        let base_speed = global_speed + def.speed;
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            base_speed,
            speed: base_speed,
            work_speed_bonus: 0.0,
            shift_bonus: 0.0,
            state: WorkState::Idle,
            task: None,
            position: start,
            target: start,
            stamina: def.max_stamina,
            max_stamina: def.max_stamina,
            salary: def.salary,
            skill,
            cooldown: 0.0,
            buff: None,
            employment: Employment::Active,
            working_timer: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.employment == Employment::Active
    }

    pub fn skill_effect(&self) -> Option<&SkillEffect> {
        self.skill.as_ref().map(|s| &s.effect)
    }

    /// (chance, multiplier) if this worker can cook golden food.
    pub fn golden_food(&self) -> Option<(f64, f64)> {
        match self.skill_effect() {
            Some(SkillEffect::GoldenFood { chance, multiplier }) => Some((*chance, *multiplier)),
            _ => None,
        }
    }

    pub fn tip_bonus(&self) -> f64 {
        match self.skill_effect() {
            Some(SkillEffect::TipBonus { bonus }) => *bonus,
            _ => 0.0,
        }
    }

    pub fn effective_speed(&self, ctx: &WorkContext) -> f64 {
        let mut speed = self.speed;
        match self.skill_effect() {
            Some(SkillEffect::LitterFocus { speed_per_litter, .. }) => {
                speed *= 1.0 + ctx.litter_count as f64 * speed_per_litter;
            }
            Some(SkillEffect::Fame { speed_per_reputation, .. }) => {
                speed *= 1.0 + ctx.reputation as f64 * speed_per_reputation;
            }
            _ => {}
        }
        if ctx.litter_speed_boost > 0.0 && ctx.litter_count > 0 {
            speed *= 1.0 + ctx.litter_speed_boost;
        }
        (speed * ctx.staff_speed).max(0.0)
    }

    pub fn effective_work_bonus(&self, ctx: &WorkContext) -> f64 {
        let mut bonus = self.work_speed_bonus + self.shift_bonus;
        match self.skill_effect() {
            Some(SkillEffect::LitterFocus { work_per_litter, .. }) => {
                bonus += ctx.litter_count as f64 * work_per_litter;
            }
            Some(SkillEffect::Fame { work_per_reputation, .. }) => {
                bonus += ctx.reputation as f64 * work_per_reputation;
            }
            _ => {}
        }
        if self.stamina > 0.0 && self.stamina < LOW_STAMINA {
            bonus += ctx.low_stamina_buff;
        }
        bonus
    }

    /// Seconds of work for `kind`, doubled when out of stamina.
    pub fn task_duration(&self, kind: TaskKind, ctx: &WorkContext) -> f64 {
        let base = match kind {
            TaskKind::TakeOrder | TaskKind::ServeFoodDeliver => ctx.order_time,
            TaskKind::Checkout => {
                ctx.order_time * (1.0 - ctx.checkout_mod.clamp(0.0, MAX_CHECKOUT_REDUCTION))
            }
            TaskKind::ServeFoodPrep => ctx.prep_time,
            TaskKind::CleanLitter => ctx.litter_time,
        };
        let mut duration = (base - self.effective_work_bonus(ctx)).max(MIN_WORK_TIME);
        if self.stamina <= 0.0 {
            duration *= 2.0;
        }
        duration
    }

    /// Fire the active skill. False if passive, cooling down, or exhausted.
    pub fn activate_skill(&mut self) -> Option<SkillActivation> {
        let skill = self.skill.as_ref()?;
        if skill.kind == SkillKind::Passive || self.cooldown > 0.0 || self.stamina <= 0.0 {
            return None;
        }
        let (cooldown, duration, cost) = (skill.cooldown, skill.duration, skill.stamina_cost);
        let effect = skill.effect.clone();
        let activation = match effect {
            SkillEffect::SpeedBoost { multiplier } => {
                self.start_buff(BuffEffect::Speed { multiplier }, duration);
                SkillActivation::Buff
            }
            SkillEffect::WorkSpeedBoost { bonus } => {
                self.start_buff(BuffEffect::WorkSpeed { bonus }, duration);
                SkillActivation::Buff
            }
            SkillEffect::HealPatience { amount } => SkillActivation::HealAll(amount),
            // Passive payloads on an active skill do nothing when fired.
            _ => return None,
        };
        self.cooldown = cooldown;
        self.stamina = (self.stamina - cost).max(0.0);
        log::debug!("staff={} skill activated", self.id);
        Some(activation)
    }

    fn start_buff(&mut self, effect: BuffEffect, duration: f64) {
        // A second activation replaces the first, never stacks.
        self.expire_buff();
        match effect {
            BuffEffect::Speed { multiplier } => self.speed = self.base_speed * multiplier,
            BuffEffect::WorkSpeed { bonus } => self.work_speed_bonus += bonus,
        }
        self.buff = Some(ActiveBuff { effect, remaining: duration });
    }

    /// Revert the running buff, if any, to baseline.
    pub fn expire_buff(&mut self) {
        let Some(buff) = self.buff.take() else {
            return;
        };
        match buff.effect {
            BuffEffect::Speed { .. } => self.speed = self.base_speed,
            BuffEffect::WorkSpeed { bonus } => {
                self.work_speed_bonus = (self.work_speed_bonus - bonus).max(0.0);
            }
        }
    }

    pub fn apply_stat(&mut self, stat: StaffStat, value: f64) {
        match stat {
            StaffStat::Speed => {
                self.base_speed += self.base_speed * value / 100.0;
                self.speed = match self.buff {
                    Some(ActiveBuff { effect: BuffEffect::Speed { multiplier }, .. }) => {
                        self.base_speed * multiplier
                    }
                    _ => self.base_speed,
                };
            }
            StaffStat::WorkSpeed => self.work_speed_bonus += value,
            StaffStat::MaxStamina => {
                self.max_stamina += value;
                self.stamina += value;
            }
        }
    }

    pub fn recover_stamina(&mut self, amount: f64) {
        self.stamina = (self.stamina + amount).clamp(0.0, self.max_stamina);
    }

    fn go_idle(&mut self) {
        self.state = WorkState::Idle;
        self.task = None;
        self.working_timer = 0.0;
    }

    /// Day end: resting workers recover fully, active ones lose `loss`.
    pub fn end_of_day(&mut self, loss: f64) {
        match self.employment {
            Employment::Resting => self.stamina = self.max_stamina,
            Employment::Active => self.stamina = (self.stamina - loss.max(0.0)).max(0.0),
        }
        self.cooldown = 0.0;
        self.expire_buff();
        self.shift_bonus = 0.0;
        self.go_idle();
    }
}

pub struct StaffScheduler {
    workers: Vec<Worker>,
}

impl StaffScheduler {
    pub fn new() -> Self {
        Self { workers: Vec::new() }
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn workers_mut(&mut self) -> &mut [Worker] {
        &mut self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Worker> {
        self.workers.iter_mut().find(|w| w.id == id)
    }

    pub fn is_hired(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn active_count(&self) -> usize {
        self.workers.iter().filter(|w| w.is_active()).count()
    }

    /// Add a worker. Returns false if already on staff.
    pub fn hire(&mut self, worker: Worker) -> bool {
        if self.is_hired(&worker.id) {
            return false;
        }
        log::info!("staff={} hired", worker.id);
        self.workers.push(worker);
        true
    }

    /// Dismiss a worker, never leaving the café without an active one.
    pub fn fire(&mut self, id: &str) -> Outcome<Worker> {
        let index = self
            .workers
            .iter()
            .position(|w| w.id == id)
            .ok_or(Rejected::NotFound)?;
        if self.workers.len() <= 1 || (self.workers[index].is_active() && self.active_count() <= 1) {
            return Err(Rejected::LastStaff);
        }
        let worker = self.workers.remove(index);
        log::info!("staff={id} dismissed");
        Ok(worker)
    }

    pub fn set_employment(&mut self, id: &str, employment: Employment) -> Outcome<()> {
        let active = self.active_count();
        let worker = self.get_mut(id).ok_or(Rejected::NotFound)?;
        if employment == Employment::Resting && worker.is_active() && active <= 1 {
            return Err(Rejected::LastStaff);
        }
        if worker.employment != employment {
            worker.employment = employment;
            worker.go_idle();
        }
        Ok(())
    }

    /// Whether any (optionally only active) worker has a skill matching `pred`.
    pub fn has_skill(&self, active_only: bool, pred: impl Fn(&SkillEffect) -> bool) -> bool {
        self.workers
            .iter()
            .filter(|w| !active_only || w.is_active())
            .any(|w| w.skill_effect().is_some_and(&pred))
    }

    pub fn apply_stat(&mut self, stat: StaffStat, value: f64) {
        for w in &mut self.workers {
            w.apply_stat(stat, value);
        }
    }

    pub fn active_salaries(&self) -> Gold {
        self.workers.iter().filter(|w| w.is_active()).map(|w| w.salary).sum()
    }

    fn is_claimed(&self, target: TaskTarget, except: usize) -> bool {
        self.workers
            .iter()
            .enumerate()
            .any(|(i, w)| i != except && w.task.is_some_and(|t| t.target == target))
    }

    /// True if a worker is already heading for this customer.
    pub fn is_targeted(&self, customer: CustomerId) -> bool {
        self.workers
            .iter()
            .any(|w| w.task.is_some_and(|t| t.target == TaskTarget::Customer(customer)))
    }

    /// Advance worker `index` by `dt`. Returns a completion for the
    /// coordinator to apply, if the worker just finished a task.
    pub fn advance(
        &mut self,
        index: usize,
        dt: f64,
        board: &TaskBoard<'_>,
        ctx: &WorkContext,
    ) -> Option<Completion> {
        let worker = self.workers.get_mut(index)?;
        if !worker.is_active() {
            worker.position = OFF_FLOOR;
            worker.target = OFF_FLOOR;
            return None;
        }

        if worker.cooldown > 0.0 {
            worker.cooldown = (worker.cooldown - dt).max(0.0);
        }
        if let Some(buff) = worker.buff.as_mut() {
            buff.remaining -= dt;
            if buff.remaining <= 0.0 {
                worker.expire_buff();
            }
        }
        if worker.state == WorkState::Idle && worker.stamina < worker.max_stamina {
            worker.recover_stamina(dt * ctx.idle_regen);
        }

        match worker.state {
            WorkState::Idle => {
                self.find_task(index, board, ctx);
                None
            }
            WorkState::Moving => {
                self.step_move(index, dt, board, ctx);
                None
            }
            WorkState::Working => {
                worker.working_timer -= dt;
                if worker.working_timer <= 0.0 {
                    self.complete(index, board)
                } else {
                    None
                }
            }
        }
    }

    fn find_task(&mut self, index: usize, board: &TaskBoard<'_>, ctx: &WorkContext) {
        let free = |state: CustomerState| {
            board
                .customers
                .iter()
                .find(|(id, s, _)| *s == state && !self.is_claimed(TaskTarget::Customer(*id), index))
                .map(|(id, _, _)| TaskTarget::Customer(*id))
        };

        let task = free(CustomerState::Paying)
            .map(|target| Task { kind: TaskKind::Checkout, target })
            .or_else(|| {
                free(CustomerState::Ordering).map(|target| Task { kind: TaskKind::TakeOrder, target })
            })
            .or_else(|| {
                (!board.auto_serve)
                    .then(|| free(CustomerState::WaitingFood))
                    .flatten()
                    .map(|target| Task { kind: TaskKind::ServeFoodPrep, target })
            })
            .or_else(|| {
                board
                    .auto_clean_enabled
                    .then(|| {
                        board
                            .litter
                            .iter()
                            .map(|l| TaskTarget::Litter(l.id))
                            .find(|t| !self.is_claimed(*t, index))
                    })
                    .flatten()
                    .map(|target| Task { kind: TaskKind::CleanLitter, target })
            });

        let Some(task) = task else {
            return;
        };
        let target = if task.kind == TaskKind::ServeFoodPrep {
            Some(ctx.kitchen)
        } else {
            board.position_of(task.target)
        };
        let Some(target) = target else {
            return;
        };
        let worker = &mut self.workers[index];
        worker.state = WorkState::Moving;
        worker.task = Some(task);
        worker.target = target;
    }

    fn step_move(&mut self, index: usize, dt: f64, board: &TaskBoard<'_>, ctx: &WorkContext) {
        let worker = &mut self.workers[index];
        let Some(task) = worker.task else {
            worker.go_idle();
            return;
        };
        if task.kind != TaskKind::ServeFoodPrep {
            match board.position_of(task.target) {
                Some(pos) => worker.target = pos,
                None => {
                    log::debug!("staff={} target gone, back to idle", worker.id);
                    worker.go_idle();
                    return;
                }
            }
        }
        let step = worker.effective_speed(ctx) * dt;
        let (pos, arrived) = worker.position.step_toward(worker.target, step);
        worker.position = pos;
        if arrived {
            worker.state = WorkState::Working;
            worker.working_timer = worker.task_duration(task.kind, ctx);
        }
    }

    fn complete(&mut self, index: usize, board: &TaskBoard<'_>) -> Option<Completion> {
        let worker = &mut self.workers[index];
        let task = worker.task?;
        if task.kind == TaskKind::ServeFoodPrep {
            // Plate is ready; carry it over.
            match board.position_of(task.target) {
                Some(pos) => {
                    worker.task = Some(Task { kind: TaskKind::ServeFoodDeliver, ..task });
                    worker.state = WorkState::Moving;
                    worker.target = pos;
                }
                None => worker.go_idle(),
            }
            return None;
        }
        worker.go_idle();
        Some(Completion { staff: worker.id.clone(), task })
    }

    /// Settlement: stamina loss, cooldown and buff reset for everyone.
    pub fn end_of_day(&mut self, loss: f64, start: Vec2) {
        for w in &mut self.workers {
            w.end_of_day(loss);
            if w.is_active() {
                w.position = start;
                w.target = start;
            }
        }
    }
}

impl Default for StaffScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Automated cleaner and serving timers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutomationDevices {
    pub cleaner_timer: f64,
}

impl AutomationDevices {
    /// Advance the cleaner; true when it should pick up a litter item.
    pub fn tick_cleaner(&mut self, dt: f64, interval: f64) -> bool {
        self.cleaner_timer += dt;
        if self.cleaner_timer >= interval {
            self.cleaner_timer = 0.0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.cleaner_timer = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn worker(id: &str) -> Worker {
        let config = SimConfig::default_test();
        let def = config.staff_def(id).unwrap();
        let skill = def.skill_id.as_deref().and_then(|s| config.skill(s)).cloned();
        Worker::hire(def, skill, 200.0, Vec2::new(480.0, 30.0))
    }

    fn scheduler(ids: &[&str]) -> StaffScheduler {
        let mut s = StaffScheduler::new();
        for id in ids {
            s.hire(worker(id));
        }
        s
    }

    #[test]
    fn workers_compare_by_value_including_skill() {
        let mika = worker("staff_mika");
        assert_eq!(mika, worker("staff_mika"));
        assert_ne!(mika, worker("staff_rei"));

        let mut other_skill = mika.clone();
        if let Some(skill) = other_skill.skill.as_mut() {
            skill.cooldown += 1.0;
        }
        assert_ne!(mika, other_skill, "a different skill makes a different worker");
    }

    #[test]
    fn exhausted_worker_takes_twice_as_long() {
        let ctx = WorkContext::default();
        let mut w = worker("staff_mika");
        let rested = w.task_duration(TaskKind::Checkout, &ctx);
        w.stamina = 0.0;
        assert_eq!(w.task_duration(TaskKind::Checkout, &ctx), rested * 2.0);
    }

    #[test]
    fn checkout_reduction_is_capped() {
        let ctx = WorkContext { checkout_mod: 5.0, ..Default::default() };
        let w = worker("staff_mika");
        let d = w.task_duration(TaskKind::Checkout, &ctx);
        assert!((d - 0.2).abs() < 1e-9, "2.0 × (1 − 0.9) = 0.2, got {d}");
    }

    #[test]
    fn duration_never_below_floor() {
        let mut w = worker("staff_mika");
        w.work_speed_bonus = 10.0;
        assert_eq!(w.task_duration(TaskKind::TakeOrder, &WorkContext::default()), 0.1);
    }

    #[test]
    fn priority_prefers_checkout_then_order() {
        let mut s = scheduler(&["staff_mika", "staff_rei"]);
        let board = TaskBoard {
            customers: vec![
                (1, CustomerState::Ordering, Vec2::new(100.0, 100.0)),
                (2, CustomerState::Paying, Vec2::new(200.0, 100.0)),
            ],
            ..Default::default()
        };
        let ctx = WorkContext::default();
        s.advance(0, 0.016, &board, &ctx);
        s.advance(1, 0.016, &board, &ctx);
        assert_eq!(
            s.workers()[0].task,
            Some(Task { kind: TaskKind::Checkout, target: TaskTarget::Customer(2) })
        );
        assert_eq!(
            s.workers()[1].task,
            Some(Task { kind: TaskKind::TakeOrder, target: TaskTarget::Customer(1) })
        );
    }

    #[test]
    fn no_food_tasks_with_automated_serving() {
        let mut s = scheduler(&["staff_mika"]);
        let board = TaskBoard {
            customers: vec![(1, CustomerState::WaitingFood, Vec2::new(100.0, 100.0))],
            auto_serve: true,
            ..Default::default()
        };
        s.advance(0, 0.016, &board, &WorkContext::default());
        assert!(s.workers()[0].task.is_none());
    }

    #[test]
    fn litter_only_with_auto_clean_enabled() {
        let litter = [Litter { id: 9, position: Vec2::new(10.0, 10.0) }];
        let mut s = scheduler(&["staff_mika"]);
        let mut board = TaskBoard { litter: &litter, ..Default::default() };
        s.advance(0, 0.016, &board, &WorkContext::default());
        assert!(s.workers()[0].task.is_none());
        board.auto_clean_enabled = true;
        s.advance(0, 0.016, &board, &WorkContext::default());
        assert_eq!(s.workers()[0].task.map(|t| t.kind), Some(TaskKind::CleanLitter));
    }

    #[test]
    fn stale_target_returns_worker_to_idle() {
        let mut s = scheduler(&["staff_mika"]);
        let ctx = WorkContext::default();
        let board = TaskBoard {
            customers: vec![(1, CustomerState::Ordering, Vec2::new(0.0, 500.0))],
            ..Default::default()
        };
        s.advance(0, 0.016, &board, &ctx);
        assert_eq!(s.workers()[0].state, WorkState::Moving);
        let empty = TaskBoard::default();
        assert!(s.advance(0, 0.016, &empty, &ctx).is_none());
        assert_eq!(s.workers()[0].state, WorkState::Idle);
        assert!(s.workers()[0].task.is_none());
    }

    #[test]
    fn serving_goes_through_the_kitchen() {
        let mut s = scheduler(&["staff_mika"]);
        let ctx = WorkContext::default();
        let board = TaskBoard {
            customers: vec![(1, CustomerState::WaitingFood, Vec2::new(480.0, 60.0))],
            ..Default::default()
        };
        let mut completion = None;
        let mut saw_deliver = false;
        for _ in 0..1000 {
            completion = s.advance(0, 0.05, &board, &ctx);
            saw_deliver |= s.workers()[0].task.map(|t| t.kind) == Some(TaskKind::ServeFoodDeliver);
            if completion.is_some() {
                break;
            }
        }
        assert!(saw_deliver);
        let completion = completion.expect("serving finishes");
        assert_eq!(completion.task.kind, TaskKind::ServeFoodDeliver);
        assert_eq!(s.workers()[0].state, WorkState::Idle);
    }

    #[test]
    fn cannot_fire_or_rest_the_last_active_worker() {
        let mut s = scheduler(&["staff_mika", "staff_rei"]);
        s.set_employment("staff_rei", Employment::Resting).unwrap();
        assert_eq!(s.set_employment("staff_mika", Employment::Resting), Err(Rejected::LastStaff));
        assert_eq!(s.fire("staff_mika").map(|_| ()), Err(Rejected::LastStaff));
        assert_eq!(s.fire("staff_nobody").map(|_| ()), Err(Rejected::NotFound));
        assert!(s.fire("staff_rei").is_ok());
    }

    #[test]
    fn speed_buff_is_reverted_on_expiry() {
        let mut s = scheduler(&["staff_mika"]);
        let base = s.workers()[0].base_speed;
        assert_eq!(s.workers_mut()[0].activate_skill(), Some(SkillActivation::Buff));
        assert_eq!(s.workers()[0].speed, base * 1.5);
        assert_eq!(s.workers_mut()[0].activate_skill(), None, "on cooldown");
        for _ in 0..60 {
            s.advance(0, 0.1, &TaskBoard::default(), &WorkContext::default());
        }
        assert!(s.workers()[0].buff.is_none());
        assert_eq!(s.workers()[0].speed, base);
    }

    #[test]
    fn passive_skill_cannot_be_triggered() {
        let mut w = worker("staff_rei");
        assert_eq!(w.activate_skill(), None);
        let mut tired = worker("staff_mika");
        tired.stamina = 0.0;
        assert_eq!(tired.activate_skill(), None);
    }

    #[test]
    fn day_end_stamina_rules() {
        let mut s = scheduler(&["staff_mika", "staff_rei"]);
        s.set_employment("staff_rei", Employment::Resting).unwrap();
        s.workers_mut()[1].stamina = 10.0;
        s.end_of_day(25.0, Vec2::new(480.0, 30.0));
        assert_eq!(s.workers()[0].stamina, 75.0);
        assert_eq!(s.workers()[1].stamina, 100.0);
    }
}
