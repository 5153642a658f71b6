use cafe_core::{
    clock::{RunEnd, RunStatus},
    config::SimConfig,
    economy::RentStrategy,
    engine::Cafe,
    error::Rejected,
    event::Notification,
    facility::SpawnOutcome,
    snapshot::SaveState,
};

// ── Test helpers ────────────────────────────────────────────────────────────

const STEP: f64 = 0.1;

/// Open the day, declining any decision that comes up.
fn open_day(cafe: &mut Cafe) {
    let status = cafe.begin_day().expect("begin day");
    if status == RunStatus::AwaitingDecision {
        let choices = cafe.events().active().map(|e| e.choices.len()).unwrap_or(0);
        cafe.resolve_decision(choices.saturating_sub(1)).expect("decline");
    }
    assert_eq!(cafe.status(), RunStatus::Running);
}

fn resume(save: SaveState) -> Cafe {
    Cafe::hydrate(SimConfig::default_test(), save, 11)
}

fn save_at(day: u32, gold: i64) -> SaveState {
    let mut save = Cafe::new(SimConfig::default_test(), 11).serialize();
    save.day = day;
    save.gold = gold;
    save
}

fn count(notifications: &[Notification], kind: &str) -> usize {
    notifications.iter().filter(|n| n.kind() == kind).count()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// A full business day serves customers, settles, and offers upgrades.
#[test]
fn first_day_runs_to_settlement() {
    let mut cafe = Cafe::new(SimConfig::default_test(), 3);
    open_day(&mut cafe);

    let ticks = cafe.run_day(STEP);
    assert!(ticks >= 590, "a 60 s day at 0.1 s steps; got {ticks} ticks");

    assert_eq!(cafe.status(), RunStatus::Ready);
    assert_eq!(cafe.day(), 2);
    assert_eq!(cafe.offer().len(), 3);
    assert!(cafe.customers().is_empty(), "floor is cleared at settlement");

    let report = cafe.last_report().expect("day report");
    assert_eq!(report.day, 1);
    assert!(!report.rent_due);
    assert!(cafe.ledger().gold > 0, "at least one customer paid on day 1");

    let feed = cafe.drain_notifications();
    assert_eq!(count(&feed, "day_end"), 1);
    assert!(count(&feed, "gold_gain") > 0);
    assert!(count(&feed, "hud_update") >= ticks);
}

/// Spawning is bounded: one seated, a full queue, then turned away.
#[test]
fn eleven_arrivals_at_one_table() {
    let mut config = SimConfig::default_test();
    config.game.initial_tables = 1;
    let mut cafe = Cafe::new(config, 1);

    let outcomes: Vec<SpawnOutcome> = (0..11).map(|_| cafe.spawn_customer()).collect();
    let seated = outcomes.iter().filter(|o| matches!(o, SpawnOutcome::Seated(_))).count();
    let queued = outcomes.iter().filter(|o| matches!(o, SpawnOutcome::Queued { .. })).count();

    assert_eq!(seated, 1);
    assert_eq!(queued, 10);
    assert_eq!(cafe.spawn_customer(), SpawnOutcome::Dropped);
    assert_eq!(cafe.facility().queue_len(), 10);
    assert_eq!(cafe.customers().len(), 11, "a dropped arrival leaves no trace");
}

#[test]
fn eleven_arrivals_with_queue_of_nine() {
    let mut config = SimConfig::default_test();
    config.game.initial_tables = 1;
    config.balance.queue.max_size = 9;
    let mut cafe = Cafe::new(config, 1);

    let outcomes: Vec<SpawnOutcome> = (0..11).map(|_| cafe.spawn_customer()).collect();
    assert!(matches!(outcomes[0], SpawnOutcome::Seated(0)));
    assert_eq!(outcomes.iter().filter(|o| matches!(o, SpawnOutcome::Queued { .. })).count(), 9);
    assert_eq!(outcomes[10], SpawnOutcome::Dropped);
}

#[test]
fn pause_freezes_business_time() {
    let mut cafe = Cafe::new(SimConfig::default_test(), 5);
    open_day(&mut cafe);
    cafe.tick(1.0);
    let remaining = cafe.clock.time_remaining;

    assert!(cafe.set_paused(true));
    cafe.tick(1.0);
    assert_eq!(cafe.clock.time_remaining, remaining);

    assert!(cafe.set_paused(false));
    cafe.tick(1.0);
    assert!(cafe.clock.time_remaining < remaining);
}

/// Negative gold at settlement ends the run once and never advances the day.
#[test]
fn bankruptcy_is_terminal() {
    let mut cafe = resume(save_at(2, -10_000));
    open_day(&mut cafe);
    cafe.run_day(STEP);

    assert_eq!(cafe.status(), RunStatus::Ended(RunEnd::Bankruptcy));
    assert_eq!(cafe.day(), 2, "no day advancement after bankruptcy");

    let feed = cafe.drain_notifications();
    assert_eq!(count(&feed, "game_over"), 1);
    assert_eq!(count(&feed, "day_end"), 1, "the fatal day is still reported");
    let report_at = feed.iter().position(|n| matches!(n, Notification::DayEnd(_))).expect("day_end");
    let over_at = feed.iter().position(|n| matches!(n, Notification::GameOver { .. })).expect("game_over");
    assert!(report_at < over_at);

    let report = cafe.last_report().expect("final report");
    assert_eq!(report.day, 2);
    assert!(report.settlement.bankrupt);
    assert!(report.offer.is_empty());

    assert_eq!(cafe.begin_day(), Err(Rejected::WrongPhase));
    assert_eq!(cafe.negotiate_rent(RentStrategy::Mercy).err(), Some(Rejected::Bankruptcy));
    cafe.tick(1.0);
    assert!(cafe.drain_notifications().is_empty(), "an ended run is inert");
}

/// Day 7 settles into a rent negotiation before the next day can start.
#[test]
fn weekly_rent_gates_the_next_day() {
    let mut cafe = resume(save_at(7, 100_000));
    open_day(&mut cafe);
    cafe.run_day(STEP);

    assert_eq!(cafe.status(), RunStatus::RentDue);
    let report = cafe.last_report().expect("report");
    assert!(report.rent_due);
    assert!(report.offer.is_empty());
    assert_eq!(cafe.begin_day(), Err(Rejected::WrongPhase));
    assert_eq!(cafe.choose_upgrade("GC_BGM").err(), Some(Rejected::WrongPhase));

    let before = cafe.ledger().gold;
    let result = cafe.negotiate_rent(RentStrategy::Mercy).expect("negotiate");
    assert_eq!(cafe.ledger().gold, before - result.rent_paid + result.sponsorship);

    assert_eq!(cafe.status(), RunStatus::Ready);
    assert_eq!(cafe.day(), 8);
    assert_eq!(cafe.ledger().week, 2);
    assert_eq!(cafe.ledger().current_rent, 3000);
    assert!(cafe.ledger().weekly_ratings.is_empty());
    assert_eq!(cafe.offer().len(), 3);
}

#[test]
fn final_day_reaching_goal_is_victory() {
    let mut save = save_at(30, 50_000);
    save.victory_gold_goal = 1_000;
    let mut cafe = resume(save);
    open_day(&mut cafe);
    cafe.run_day(STEP);

    assert_eq!(cafe.status(), RunStatus::Ended(RunEnd::Victory));
    let feed = cafe.drain_notifications();
    assert_eq!(count(&feed, "victory"), 1);
    assert_eq!(count(&feed, "game_over"), 0);
}

#[test]
fn final_day_short_of_goal_is_game_over() {
    let mut cafe = resume(save_at(30, 50_000));
    open_day(&mut cafe);
    cafe.run_day(STEP);

    assert_eq!(cafe.status(), RunStatus::Ended(RunEnd::GoalNotReached));
    assert_eq!(count(&cafe.drain_notifications(), "game_over"), 1);
}

/// A decision event holds the day closed until a choice is made.
#[test]
fn decision_event_blocks_until_resolved() {
    let mut config = SimConfig::default_test();
    config.game.event_start_day = 1;
    config.events.retain(|e| e.id == "EVT_SALESMAN");
    config.events[0].min_day = 1;
    let mut cafe = Cafe::new(config, 9);

    assert_eq!(cafe.begin_day(), Ok(RunStatus::AwaitingDecision));
    cafe.tick(1.0);
    assert_eq!(cafe.clock.time_remaining, cafe.config().game.day_duration);
    assert_eq!(cafe.choose_upgrade("GC_BGM").err(), Some(Rejected::WrongPhase));
    assert_eq!(cafe.resolve_decision(7).err(), Some(Rejected::NotFound));

    // Buying the tonic costs more than an empty till holds.
    assert_eq!(cafe.resolve_decision(0).err(), Some(Rejected::InsufficientGold));
    assert_eq!(cafe.status(), RunStatus::AwaitingDecision);

    let result = cafe.resolve_decision(1).expect("decline");
    assert!(result.success);
    assert_eq!(cafe.status(), RunStatus::Running);
    assert!(count(&cafe.drain_notifications(), "event_triggered") == 1);
}

#[test]
fn skipping_the_offer_pays_out() {
    let mut cafe = Cafe::new(SimConfig::default_test(), 4);
    open_day(&mut cafe);
    cafe.run_day(STEP);
    let before = cafe.ledger().gold;

    assert_eq!(cafe.skip_reward(), Ok(50));
    assert_eq!(cafe.ledger().gold, before + 50);
    assert!(cafe.offer().is_empty());
    assert_eq!(cafe.skip_reward(), Err(Rejected::WrongPhase), "nothing left to skip");
}

#[test]
fn chosen_upgrade_must_be_on_offer() {
    let mut cafe = Cafe::new(SimConfig::default_test(), 8);
    open_day(&mut cafe);
    cafe.run_day(STEP);

    let pick = cafe.offer()[0].clone();
    let not_offered = cafe
        .config()
        .upgrades
        .iter()
        .map(|u| u.id.clone())
        .find(|id| !cafe.offer().contains(id))
        .expect("catalog is larger than one offer");

    assert_eq!(cafe.choose_upgrade(&not_offered).err(), Some(Rejected::NotFound));
    cafe.choose_upgrade(&pick).expect("pick from offer");
    assert_eq!(cafe.upgrades().stack_count(&pick), 1);
    assert!(cafe.offer().is_empty());
}
