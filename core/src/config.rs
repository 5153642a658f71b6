//! Reference data loaded once before a run starts.
//!
//! RULE: Config is immutable for the lifetime of a run. The core
//! assumes every id referenced here resolves; `SimConfig::validate`
//! is the only place that checks.

use crate::types::{Day, Gold, StaffId, Vec2};
use anyhow::{bail, Context};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

// ── config.json ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seconds of business time per day.
    pub day_duration: f64,
    pub initial_gold: Gold,
    pub initial_reputation: i64,
    pub rent_base: Gold,
    pub rent_increase_rate: f64,
    pub base_staff_speed: f64,
    pub base_customer_speed: f64,
    pub customer_order_time: f64,
    pub customer_eat_time: f64,
    pub staff_work_time_order: f64,
    pub staff_work_time_prep: f64,
    pub staff_work_time_litter: f64,
    pub staff_idle_regen_rate: f64,
    pub upgrade_option_count: usize,
    pub reroll_limit: u32,
    pub banish_limit: u32,
    pub litter_spawn_chance: f64,
    pub victory_gold_goal: Gold,
    pub max_days: Day,
    pub max_tables: u32,
    pub initial_tables: u32,
    pub event_start_day: Day,
    pub layout: LayoutConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            day_duration: 60.0,
            initial_gold: 0,
            initial_reputation: 0,
            rent_base: 2500,
            rent_increase_rate: 1.2,
            base_staff_speed: 200.0,
            base_customer_speed: 100.0,
            customer_order_time: 3.0,
            customer_eat_time: 5.0,
            staff_work_time_order: 2.0,
            staff_work_time_prep: 1.0,
            staff_work_time_litter: 0.5,
            staff_idle_regen_rate: 5.0,
            upgrade_option_count: 3,
            reroll_limit: 2,
            banish_limit: 1,
            litter_spawn_chance: 0.3,
            victory_gold_goal: 300_000,
            max_days: 30,
            max_tables: 10,
            initial_tables: 3,
            event_start_day: 3,
            layout: LayoutConfig::default(),
        }
    }
}

/// Fixed anchor points of the floor plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub door: Vec2,
    pub queue_start: Vec2,
    pub kitchen: Vec2,
    /// Customers spawn and despawn this far below the door.
    pub exit_offset: f64,
    pub table_origin: Vec2,
    pub table_spacing: Vec2,
    pub table_columns: u32,
    /// Where seated customers sit relative to a table's corner.
    pub seat_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            door: Vec2::new(300.0, 400.0),
            queue_start: Vec2::new(300.0, 295.0),
            kitchen: Vec2::new(480.0, 30.0),
            exit_offset: 120.0,
            table_origin: Vec2::new(80.0, 60.0),
            table_spacing: Vec2::new(110.0, 100.0),
            table_columns: 5,
            seat_offset: 25.0,
        }
    }
}

// ── balance.json ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub queue: QueueBalance,
    pub economy: EconomyBalance,
    pub automation: AutomationBalance,
    pub rent: RentBalance,
    pub customer: CustomerBalance,
    pub settlement: SettlementBalance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueBalance {
    pub base_spawn_interval: f64,
    pub max_size: usize,
    pub spacing: f64,
    /// Default heal amount when a skill does not declare its own.
    pub patience_heal: f64,
    /// Passive queue income/reputation cadence in seconds.
    pub passive_interval: f64,
}

impl Default for QueueBalance {
    fn default() -> Self {
        Self {
            base_spawn_interval: 5.0,
            max_size: 10,
            spacing: 45.0,
            patience_heal: 20.0,
            passive_interval: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyBalance {
    /// Price of one meal before any multiplier.
    pub base_price: Gold,
    /// Tip multiplier keyed by rating (1–5). Missing ratings get no tip.
    pub tip_ratings: BTreeMap<u8, f64>,
    /// Minimum patience for the perfect-service bonus.
    pub perfect_tip_patience: f64,
    /// Reward for skipping an upgrade pick, per elapsed day.
    pub skip_reward_per_day: Gold,
}

impl Default for EconomyBalance {
    fn default() -> Self {
        Self {
            base_price: 120,
            tip_ratings: [(1, 0.5), (2, 0.8), (3, 1.0), (4, 1.2), (5, 1.5)].into(),
            perfect_tip_patience: 90.0,
            skip_reward_per_day: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationBalance {
    pub auto_clean_floor: f64,
    pub cleaner_interval: f64,
    pub cook_time_floor: f64,
    pub pot_efficiency_bonus: f64,
    pub auto_serve_maintenance_fee: Gold,
}

impl Default for AutomationBalance {
    fn default() -> Self {
        Self {
            auto_clean_floor: 0.5,
            cleaner_interval: 10.0,
            cook_time_floor: 0.1,
            pot_efficiency_bonus: 0.5,
            auto_serve_maintenance_fee: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RentBalance {
    pub high_rating_threshold: f64,
    pub low_rating_penalty: f64,
    pub base_success: f64,
    pub failure_multiplier: f64,
}

impl Default for RentBalance {
    fn default() -> Self {
        Self {
            high_rating_threshold: 4.5,
            low_rating_penalty: 1.5,
            base_success: 0.5,
            failure_multiplier: 1.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerBalance {
    pub max_patience: f64,
    pub seating_relief: f64,
    pub pay_decay_rate: f64,
    /// Extra patience decay per litter item on the floor.
    pub litter_decay_penalty: f64,
}

impl Default for CustomerBalance {
    fn default() -> Self {
        Self {
            max_patience: 100.0,
            seating_relief: 30.0,
            pay_decay_rate: 5.0,
            litter_decay_penalty: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementBalance {
    pub hygiene_fine: Gold,
    pub hygiene_litter_threshold: usize,
    pub special_goal_reputation: i64,
    pub staff_stamina_loss: f64,
}

impl Default for SettlementBalance {
    fn default() -> Self {
        Self {
            hygiene_fine: 1000,
            hygiene_litter_threshold: 3,
            special_goal_reputation: 50,
            staff_stamina_loss: 25.0,
        }
    }
}

// ── staff.json / skills.json ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffDef {
    pub id: StaffId,
    pub name: String,
    /// Added on top of the global base staff speed.
    #[serde(default)]
    pub speed: f64,
    #[serde(default = "default_max_stamina")]
    pub max_stamina: f64,
    #[serde(default)]
    pub salary: Gold,
    #[serde(default)]
    pub skill_id: Option<String>,
}

fn default_max_stamina() -> f64 {
    100.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillKind {
    Passive,
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: String,
    pub name: String,
    pub kind: SkillKind,
    #[serde(default = "default_cooldown")]
    pub cooldown: f64,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_stamina_cost")]
    pub stamina_cost: f64,
    pub effect: SkillEffect,
}

fn default_cooldown() -> f64 { 15.0 }
fn default_duration() -> f64 { 5.0 }
fn default_stamina_cost() -> f64 { 10.0 }

/// What a staff skill does. Active skills carry a buff or a one-shot;
/// passive skills are read by the rate computations that care about them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillEffect {
    /// Active buff: movement speed becomes base × multiplier.
    SpeedBoost { multiplier: f64 },
    /// Active buff: flat work-speed bonus for the duration.
    WorkSpeedBoost { bonus: f64 },
    /// Active one-shot: every customer regains patience.
    HealPatience { amount: Option<f64> },
    /// Passive: queue patience decay is multiplied by `factor`.
    QueuePatience { factor: f64 },
    /// Passive: served meals may be worth `multiplier` times more.
    GoldenFood { chance: f64, multiplier: f64 },
    /// Passive: checkouts by this worker earn `bonus` extra tip.
    TipBonus { bonus: f64 },
    /// Passive: faster while litter is on the floor.
    LitterFocus { speed_per_litter: f64, work_per_litter: f64 },
    /// Passive: faster with reputation; daily reputation while on shift.
    Fame { speed_per_reputation: f64, work_per_reputation: f64, daily_reputation: i64 },
    /// Passive: automation devices run faster.
    AutomationEfficiency,
    /// Passive: reduces everyone's end-of-day stamina loss.
    StaminaSaver { reduction: f64 },
    /// Passive: better rent negotiations.
    Negotiator { success_bonus: f64, sponsorship_per_day: Gold },
}

// ── upgrades.json ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpgradeCategory {
    Augment,
    Recruitment,
    RareUtility,
    GlobalConfig,
    OneTimeBuff,
    StatBoost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    pub category: UpgradeCategory,
    /// None (or 0) means unlimited stacks.
    #[serde(default)]
    pub max_stack: Option<u32>,
    pub effect: UpgradeEffect,
}

impl UpgradeDef {
    pub fn stack_cap(&self) -> Option<u32> {
        self.max_stack.filter(|cap| *cap > 0)
    }

    /// Staff member hired by this upgrade, if it is a recruitment.
    pub fn recruits(&self) -> Option<&str> {
        match &self.effect {
            UpgradeEffect::UnlockStaff { staff_id } => Some(staff_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpgradeEffect {
    /// Applies to every hired staff member.
    StatBoost { stat: StaffStat, value: f64 },
    UnlockStaff { staff_id: StaffId },
    RentShield { count: u32 },
    ExtraTable,
    GlobalConfig { stat: UpgradeStat, value: f64 },
    RareUtility { stat: RareStat, value: f64 },
}

/// Staff attributes that upgrades and training can raise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaffStat {
    /// Percent of base speed.
    Speed,
    WorkSpeed,
    MaxStamina,
}

/// Run-wide stats written by global-config upgrades. Each stat has a
/// fixed aggregation rule, see `modifiers::UpgradeStat::aggregation`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStat {
    SpawnRate,
    PatienceDecay,
    SeatingRelief,
    PayStress,
    StaminaLoss,
    LitterBonus,
    LitterSpeedBoost,
    CheckoutSpeed,
    AutoServe,
    AutoClean,
    MaxQueueSize,
    StandEatPolicy,
    LowStaminaBuff,
    PerfectTipBonus,
    QueueIncome,
    QueueReputation,
    EatTimeReduction,
    QueuePatience,
    Income,
    InterestRate,
    ReputationInterestRate,
}

/// Stats written by rare-utility upgrades.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RareStat {
    /// Added onto the income multiplier.
    Income,
    /// Subtracted from the queue patience multiplier.
    QueuePatience,
    /// Income grows by this fraction per reputation point.
    ReputationIncome,
}

// ── store.json ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreItemDef {
    pub id: String,
    pub name: String,
    pub price: Gold,
    #[serde(default)]
    pub price_multiplier: Option<f64>,
    #[serde(default)]
    pub limit: Option<u32>,
    pub effect: StoreEffect,
}

impl StoreItemDef {
    /// Price of the next unit after `bought` previous purchases.
    pub fn price_after(&self, bought: u32) -> Gold {
        match self.price_multiplier {
            Some(m) => (self.price as f64 * m.powi(bought as i32)).floor() as Gold,
            None => self.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEffect {
    UnlockTable,
    RecoverStamina { value: f64 },
    AddReroll { value: u32 },
    AddBanish { value: u32 },
    StaffTraining { stat: StaffStat, value: f64 },
}

// ── events.json ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Environment,
    Market,
    Crisis,
    Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    pub weight: f64,
    #[serde(default)]
    pub min_day: Day,
    pub kind: EventKind,
    #[serde(default)]
    pub effects: EventEffects,
    #[serde(default)]
    pub choices: Vec<DecisionChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventEffects {
    pub spawn_rate_mod: Option<f64>,
    pub patience_decay_mod: Option<f64>,
    pub income_mod: Option<f64>,
    pub tip_mod: Option<f64>,
    pub eat_time_mod: Option<f64>,
    pub staff_speed_mod: Option<f64>,
    pub litter_prob_mod: Option<f64>,
    pub disable_automation: bool,
    /// Settlement fines the café if too much litter is left.
    pub hygiene_check: bool,
    pub special_goal: Option<SpecialGoal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialGoal {
    /// Nobody leaves angry today.
    NoAngryLeave,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionChoice {
    pub label: String,
    pub resolution: Resolution,
}

/// How a decision choice plays out. Probabilities are rolled on the
/// events RNG stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// Buy a mystery tonic: 40% full stamina, 30% work-speed boost,
    /// 30% stomach ache.
    Purchase { cost: Gold },
    Decline,
    CallPolice {
        success_rate: f64,
        reputation_gain: i64,
        gold_loss: Gold,
        reputation_loss: i64,
    },
    FightBack {
        base_win_rate: f64,
        champion_bonus: f64,
        champions: Vec<StaffId>,
        win_gold: Gold,
        win_reputation: i64,
        loss_stamina: f64,
        loss_reputation: i64,
    },
    PayOff { cost: Gold },
}

// ── social_comments.json ───────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Comment pool keyed by star rating ("1".."5").
    pub comments: BTreeMap<String, Vec<String>>,
    pub authors: Vec<String>,
}

// ── Aggregate ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub game: GameConfig,
    pub balance: BalanceConfig,
    /// Ordered; the first entry is the café's starting staff member.
    pub staff: Vec<StaffDef>,
    pub skills: BTreeMap<String, SkillDef>,
    pub upgrades: Vec<UpgradeDef>,
    pub store_items: Vec<StoreItemDef>,
    pub events: Vec<EventDef>,
    pub social: SocialConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct StaffFile {
    staff: Vec<StaffDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct SkillsFile {
    skills: Vec<SkillDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct UpgradesFile {
    upgrades: Vec<UpgradeDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct StoreFile {
    items: Vec<StoreItemDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct EventsFile {
    events: Vec<EventDef>,
}

fn read_json<T: DeserializeOwned>(data_dir: &str, file: &str) -> anyhow::Result<T> {
    let path = format!("{data_dir}/{file}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))
}

impl SimConfig {
    /// Load from the data/ directory.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let game: GameConfig = read_json(data_dir, "config.json")?;
        let balance: BalanceConfig = read_json(data_dir, "balance.json")?;
        let staff: StaffFile = read_json(data_dir, "staff.json")?;
        let skills: SkillsFile = read_json(data_dir, "skills.json")?;
        let upgrades: UpgradesFile = read_json(data_dir, "upgrades.json")?;
        let store: StoreFile = read_json(data_dir, "store.json")?;
        let events: EventsFile = read_json(data_dir, "events.json")?;
        let social: SocialConfig = read_json(data_dir, "social_comments.json")?;

        let config = Self {
            game,
            balance,
            staff: staff.staff,
            skills: skills.skills.into_iter().map(|s| (s.id.clone(), s)).collect(),
            upgrades: upgrades.upgrades,
            store_items: store.items,
            events: events.events,
            social,
        };
        config.validate()?;
        log::info!(
            "config loaded from {data_dir}: {} staff, {} upgrades, {} events",
            config.staff.len(),
            config.upgrades.len(),
            config.events.len()
        );
        Ok(config)
    }

    /// Cross-reference checks. The core never re-validates ids after this.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.staff.is_empty() {
            bail!("staff catalog is empty; a run needs a starting staff member");
        }
        for s in &self.staff {
            if let Some(skill) = &s.skill_id {
                if !self.skills.contains_key(skill) {
                    bail!("staff '{}' references unknown skill '{skill}'", s.id);
                }
            }
        }
        for u in &self.upgrades {
            if let Some(target) = u.recruits() {
                if self.staff_def(target).is_none() {
                    bail!("upgrade '{}' recruits unknown staff '{target}'", u.id);
                }
            }
        }
        for e in &self.events {
            if e.weight < 0.0 {
                bail!("event '{}' has a negative weight", e.id);
            }
            if e.kind == EventKind::Decision && e.choices.is_empty() {
                bail!("decision event '{}' has no choices", e.id);
            }
        }
        if self.game.initial_tables > self.game.max_tables {
            bail!("initial_tables exceeds max_tables");
        }
        Ok(())
    }

    pub fn staff_def(&self, id: &str) -> Option<&StaffDef> {
        self.staff.iter().find(|s| s.id == id)
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDef> {
        self.skills.get(id)
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|u| u.id == id)
    }

    pub fn store_item(&self, id: &str) -> Option<&StoreItemDef> {
        self.store_items.iter().find(|i| i.id == id)
    }

    pub fn event(&self, id: &str) -> Option<&EventDef> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Config with hardcoded catalogs for use in unit tests.
    pub fn default_test() -> Self {
        let staff = vec![
            staff("staff_mika", "Mika", 0.0, 0, Some("skill_dash")),
            staff("staff_rei", "Rei", 10.0, 300, Some("skill_calm_queue")),
            staff("staff_hill", "Hill", 0.0, 350, Some("skill_golden_food")),
            staff("staff_lisa", "Lisa", 20.0, 300, Some("skill_tip_bonus")),
            staff("staff_lulu", "Lulu", 0.0, 250, Some("skill_heal")),
            staff("staff_alice", "Alice", 0.0, 400, Some("skill_negotiator")),
            staff("staff_nora", "Nora", -10.0, 250, Some("skill_stamina_saver")),
            staff("staff_pot", "Pot", 0.0, 200, Some("skill_automation")),
            staff("staff_kuro", "Kuro", 0.0, 300, Some("skill_litter_focus")),
            staff("staff_jean", "Jean", 0.0, 450, Some("skill_fame")),
        ];

        let skills = [
            skill("skill_dash", SkillKind::Active, SkillEffect::SpeedBoost { multiplier: 1.5 }),
            skill("skill_calm_queue", SkillKind::Passive, SkillEffect::QueuePatience { factor: 0.3 }),
            skill(
                "skill_golden_food",
                SkillKind::Passive,
                SkillEffect::GoldenFood { chance: 0.2, multiplier: 5.0 },
            ),
            skill("skill_tip_bonus", SkillKind::Passive, SkillEffect::TipBonus { bonus: 0.2 }),
            skill("skill_heal", SkillKind::Active, SkillEffect::HealPatience { amount: Some(30.0) }),
            skill(
                "skill_negotiator",
                SkillKind::Passive,
                SkillEffect::Negotiator { success_bonus: 0.15, sponsorship_per_day: 500 },
            ),
            skill(
                "skill_stamina_saver",
                SkillKind::Passive,
                SkillEffect::StaminaSaver { reduction: 7.5 },
            ),
            skill("skill_automation", SkillKind::Passive, SkillEffect::AutomationEfficiency),
            skill(
                "skill_litter_focus",
                SkillKind::Passive,
                SkillEffect::LitterFocus { speed_per_litter: 0.05, work_per_litter: 0.1 },
            ),
            skill(
                "skill_fame",
                SkillKind::Passive,
                SkillEffect::Fame {
                    speed_per_reputation: 0.01,
                    work_per_reputation: 0.02,
                    daily_reputation: 5,
                },
            ),
        ]
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

        let upgrades = vec![
            upgrade(
                "AUG_SWIFT_FEET",
                UpgradeCategory::Augment,
                Some(5),
                UpgradeEffect::StatBoost { stat: StaffStat::Speed, value: 10.0 },
            ),
            upgrade(
                "AUG_NIMBLE_HANDS",
                UpgradeCategory::Augment,
                Some(3),
                UpgradeEffect::StatBoost { stat: StaffStat::WorkSpeed, value: 0.2 },
            ),
            upgrade(
                "AUG_ENDURANCE",
                UpgradeCategory::Augment,
                Some(3),
                UpgradeEffect::StatBoost { stat: StaffStat::MaxStamina, value: 20.0 },
            ),
            upgrade(
                "REC_REI",
                UpgradeCategory::Recruitment,
                Some(1),
                UpgradeEffect::UnlockStaff { staff_id: "staff_rei".into() },
            ),
            upgrade(
                "REC_HILL",
                UpgradeCategory::Recruitment,
                Some(1),
                UpgradeEffect::UnlockStaff { staff_id: "staff_hill".into() },
            ),
            upgrade(
                "REC_LISA",
                UpgradeCategory::Recruitment,
                Some(1),
                UpgradeEffect::UnlockStaff { staff_id: "staff_lisa".into() },
            ),
            upgrade(
                "UT_LUCKY_CAT",
                UpgradeCategory::RareUtility,
                Some(3),
                UpgradeEffect::RareUtility { stat: RareStat::Income, value: 0.1 },
            ),
            upgrade(
                "UT_VIP_COUCH",
                UpgradeCategory::RareUtility,
                Some(2),
                UpgradeEffect::RareUtility { stat: RareStat::QueuePatience, value: 0.2 },
            ),
            upgrade(
                "UT_GOLDEN_PLATE",
                UpgradeCategory::RareUtility,
                Some(1),
                UpgradeEffect::RareUtility { stat: RareStat::ReputationIncome, value: 0.005 },
            ),
            upgrade(
                "GC_FLYERS",
                UpgradeCategory::GlobalConfig,
                None,
                UpgradeEffect::GlobalConfig { stat: UpgradeStat::SpawnRate, value: 0.2 },
            ),
            upgrade(
                "GC_MENU_DESIGN",
                UpgradeCategory::GlobalConfig,
                Some(3),
                UpgradeEffect::GlobalConfig { stat: UpgradeStat::Income, value: 1.1 },
            ),
            upgrade(
                "GC_BGM",
                UpgradeCategory::GlobalConfig,
                Some(3),
                UpgradeEffect::GlobalConfig { stat: UpgradeStat::PatienceDecay, value: 0.9 },
            ),
            upgrade(
                "GC_CONVEYOR",
                UpgradeCategory::GlobalConfig,
                Some(1),
                UpgradeEffect::GlobalConfig { stat: UpgradeStat::AutoServe, value: 1.0 },
            ),
            upgrade(
                "GC_ROOMBA",
                UpgradeCategory::GlobalConfig,
                Some(1),
                UpgradeEffect::GlobalConfig { stat: UpgradeStat::AutoClean, value: 1.0 },
            ),
            upgrade(
                "GC_MOE_FUND",
                UpgradeCategory::GlobalConfig,
                Some(3),
                UpgradeEffect::GlobalConfig { stat: UpgradeStat::InterestRate, value: 0.05 },
            ),
            upgrade(
                "OT_RENT_SHIELD",
                UpgradeCategory::OneTimeBuff,
                None,
                UpgradeEffect::RentShield { count: 1 },
            ),
            upgrade(
                "OT_EXTRA_TABLE",
                UpgradeCategory::OneTimeBuff,
                Some(2),
                UpgradeEffect::ExtraTable,
            ),
        ];

        let store_items = vec![
            StoreItemDef {
                id: "ITEM_TABLE".into(),
                name: "New Table".into(),
                price: 1000,
                price_multiplier: Some(1.5),
                limit: Some(7),
                effect: StoreEffect::UnlockTable,
            },
            StoreItemDef {
                id: "ITEM_COFFEE".into(),
                name: "Staff Coffee".into(),
                price: 150,
                price_multiplier: None,
                limit: None,
                effect: StoreEffect::RecoverStamina { value: 30.0 },
            },
            StoreItemDef {
                id: "ITEM_DICE".into(),
                name: "Lucky Dice".into(),
                price: 300,
                price_multiplier: None,
                limit: Some(2),
                effect: StoreEffect::AddReroll { value: 1 },
            },
        ];

        let events = vec![
            EventDef {
                id: "EVT_SUNNY".into(),
                title: "Sunny Day".into(),
                desc: String::new(),
                weight: 30.0,
                min_day: 1,
                kind: EventKind::Environment,
                effects: EventEffects { spawn_rate_mod: Some(0.3), ..Default::default() },
                choices: vec![],
            },
            EventDef {
                id: "EVT_FESTIVAL".into(),
                title: "Street Festival".into(),
                desc: String::new(),
                weight: 20.0,
                min_day: 3,
                kind: EventKind::Market,
                effects: EventEffects {
                    tip_mod: Some(1.5),
                    eat_time_mod: Some(1.25),
                    ..Default::default()
                },
                choices: vec![],
            },
            EventDef {
                id: "EVT_INSPECTION".into(),
                title: "Health Inspection".into(),
                desc: String::new(),
                weight: 10.0,
                min_day: 5,
                kind: EventKind::Crisis,
                effects: EventEffects { hygiene_check: true, ..Default::default() },
                choices: vec![],
            },
            EventDef {
                id: "EVT_SALESMAN".into(),
                title: "Traveling Salesman".into(),
                desc: String::new(),
                weight: 10.0,
                min_day: 4,
                kind: EventKind::Decision,
                effects: EventEffects::default(),
                choices: vec![
                    DecisionChoice {
                        label: "Buy the tonic".into(),
                        resolution: Resolution::Purchase { cost: 500 },
                    },
                    DecisionChoice { label: "Send him away".into(), resolution: Resolution::Decline },
                ],
            },
        ];

        let social = SocialConfig {
            comments: [
                ("1".to_string(), vec!["Never again.".to_string(), "Waited forever.".to_string()]),
                ("3".to_string(), vec!["It was fine.".to_string(), "Okay coffee.".to_string()]),
                ("5".to_string(), vec!["Best café in town!".to_string()]),
            ]
            .into(),
            authors: vec!["Regular".into(), "Food Blogger".into(), "Passer-by".into()],
        };

        Self {
            game: GameConfig::default(),
            balance: BalanceConfig::default(),
            staff,
            skills,
            upgrades,
            store_items,
            events,
            social,
        }
    }
}

fn staff(id: &str, name: &str, speed: f64, salary: Gold, skill_id: Option<&str>) -> StaffDef {
    StaffDef {
        id: id.into(),
        name: name.into(),
        speed,
        max_stamina: 100.0,
        salary,
        skill_id: skill_id.map(Into::into),
    }
}

fn skill(id: &str, kind: SkillKind, effect: SkillEffect) -> SkillDef {
    SkillDef {
        id: id.into(),
        name: id.trim_start_matches("skill_").replace('_', " "),
        kind,
        cooldown: default_cooldown(),
        duration: default_duration(),
        stamina_cost: default_stamina_cost(),
        effect,
    }
}

fn upgrade(id: &str, category: UpgradeCategory, max_stack: Option<u32>, effect: UpgradeEffect) -> UpgradeDef {
    UpgradeDef {
        id: id.into(),
        name: id.into(),
        category,
        max_stack,
        effect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_valid() {
        SimConfig::default_test().validate().expect("test config validates");
    }

    #[test]
    fn validate_rejects_unknown_recruit() {
        let mut config = SimConfig::default_test();
        config.upgrades.push(upgrade(
            "REC_GHOST",
            UpgradeCategory::Recruitment,
            Some(1),
            UpgradeEffect::UnlockStaff { staff_id: "staff_ghost".into() },
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn store_price_compounds_per_purchase() {
        let config = SimConfig::default_test();
        let table = config.store_item("ITEM_TABLE").unwrap();
        assert_eq!(table.price_after(0), 1000);
        assert_eq!(table.price_after(1), 1500);
        assert_eq!(table.price_after(2), 2250);
    }

    #[test]
    fn effects_deserialize_from_tagged_json() {
        let json = r#"{"type":"global_config","stat":"patience_decay","value":0.9}"#;
        let effect: UpgradeEffect = serde_json::from_str(json).unwrap();
        assert_eq!(
            effect,
            UpgradeEffect::GlobalConfig { stat: UpgradeStat::PatienceDecay, value: 0.9 }
        );
    }
}
