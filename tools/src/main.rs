//! sim-runner: headless driver for the café simulation.
//!
//! Usage:
//!   sim-runner --seed 12345 --days 30 --db run.db
//!   sim-runner --seed 12345 --db run.db --resume autosave
//!   sim-runner --seed 12345 --ipc-mode

use anyhow::{bail, Result};
use cafe_core::{
    clock::{RunStatus, SimSpeed},
    config::SimConfig,
    economy::RentStrategy,
    engine::Cafe,
    error::Outcome,
    event::NotificationLogEntry,
    staff::Employment,
    store::SimStore,
    types::Day,
};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};

/// Wall-clock frame the autopilot feeds the engine.
const FRAME: f64 = 1.0 / 60.0;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Frames { count: u32 },
    BeginDay,
    ResolveDecision { choice: usize },
    ChooseUpgrade { id: String },
    Reroll,
    Banish { id: String },
    SkipReward,
    BuyItem { id: String },
    NegotiateRent { strategy: RentStrategy },
    FireStaff { id: String },
    SetEmployment { id: String, employment: Employment },
    TriggerSkill { id: String },
    ToggleAutoClean,
    SetPaused { paused: bool },
    SetSpeed { speed: SimSpeed },
    Save { slot: String },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    day: Day,
    status: RunStatus,
    gold: i64,
    reputation: i64,
    week: u32,
    current_rent: i64,
    time_remaining: f64,
    offer: &'a [String],
    rerolls_left: u32,
    banishes_left: u32,
    /// Next-unit price of every store item.
    store_prices: BTreeMap<String, i64>,
    entities: cafe_core::event::EntitySnapshot,
    notifications: Vec<cafe_core::event::Notification>,
}

struct Options {
    seed: u64,
    days: u32,
    speed: SimSpeed,
    db: String,
    data_dir: String,
    slot: String,
    resume: Option<String>,
    ipc_mode: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let opts = Options {
        seed: parse_arg(&args, "--seed", 42u64),
        days: parse_arg(&args, "--days", 30u32),
        speed: match str_arg(&args, "--speed").unwrap_or("normal") {
            "fast" => SimSpeed::Fast,
            "faster" => SimSpeed::Faster,
            _ => SimSpeed::Normal,
        },
        db: str_arg(&args, "--db").unwrap_or(":memory:").to_string(),
        data_dir: str_arg(&args, "--data-dir").unwrap_or("./data").to_string(),
        slot: str_arg(&args, "--slot").unwrap_or("autosave").to_string(),
        resume: str_arg(&args, "--resume").map(str::to_string),
        ipc_mode: args.iter().any(|a| a == "--ipc-mode"),
    };

    if !opts.ipc_mode {
        println!("Café sim-runner");
        println!("  seed:      {}", opts.seed);
        println!("  days:      {}", opts.days);
        println!("  speed:     {:?}", opts.speed);
        println!("  db:        {}", opts.db);
        println!("  data_dir:  {}", opts.data_dir);
        println!();
    }

    let store = if opts.db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(&opts.db)?
    };
    store.migrate()?;

    let run_id = uuid::Uuid::new_v4().to_string();
    store.insert_run(&run_id, opts.seed, env!("CARGO_PKG_VERSION"))?;

    let config = SimConfig::load(&opts.data_dir)?;
    let mut cafe = match &opts.resume {
        Some(slot) => {
            let save = store.load(slot)?;
            log::info!("resuming slot={slot} at day {}", save.day);
            Cafe::hydrate(config, save, opts.seed)
        }
        None => Cafe::new(config, opts.seed),
    };
    cafe.set_speed(opts.speed);

    if opts.ipc_mode {
        run_ipc_loop(&mut cafe, &store, &run_id)?;
    } else {
        run_autopilot(&mut cafe, &store, &run_id, &opts)?;
        print_summary(&cafe, &store, &run_id)?;
    }
    Ok(())
}

// ── Autopilot ──────────────────────────────────────────────────────

/// Plays whole days: open, decline risky decisions, serve until close,
/// take the first upgrade on offer, plead for mercy at rent time.
fn run_autopilot(cafe: &mut Cafe, store: &SimStore, run_id: &str, opts: &Options) -> Result<()> {
    let mut played = 0;
    while played < opts.days {
        match cafe.status() {
            RunStatus::Ready => {
                if let Some(pick) = cafe.offer().first().cloned() {
                    report(cafe.choose_upgrade(&pick), "choose upgrade");
                }
                cafe.begin_day().map_err(|r| anyhow::anyhow!("begin day: {r}"))?;
            }
            RunStatus::RentDue => {
                if let Ok(rent) = cafe.negotiate_rent(RentStrategy::Mercy) {
                    println!("  day {:>2}  rent paid {:>6}  {}", cafe.day(), rent.rent_paid, rent.message);
                }
                continue;
            }
            RunStatus::Ended(reason) => {
                log::info!("run over: {reason:?}");
                break;
            }
            status => bail!("autopilot cannot continue from {status:?}"),
        }

        if cafe.status() == RunStatus::AwaitingDecision {
            let declined = cafe
                .events()
                .active()
                .map(|e| e.choices.len().saturating_sub(1))
                .unwrap_or(0);
            if let Ok(result) = cafe.resolve_decision(declined) {
                println!("  decision: {}", result.message);
            }
        }

        while cafe.clock.is_running() {
            cafe.frame(FRAME);
        }
        played += 1;
        flush_notifications(cafe, store, run_id)?;

        if let Some(r) = cafe.last_report() {
            println!(
                "  day {:>2}  avg {:.1}  net {:>6}  gold {:>7}  rep {:>4}",
                r.day,
                r.settlement.average_rating,
                r.settlement.net_profit,
                cafe.ledger().gold,
                cafe.ledger().reputation
            );
        }
        if !cafe.clock.is_ended() {
            store.save(&opts.slot, run_id, &cafe.serialize())?;
        }
    }
    Ok(())
}

fn report<T>(outcome: Outcome<T>, what: &str) {
    if let Err(reason) = outcome {
        log::warn!("{what} refused: {reason}");
    }
}

/// Persist milestones; everything else is per-frame chatter.
fn flush_notifications(cafe: &mut Cafe, store: &SimStore, run_id: &str) -> Result<()> {
    let day = cafe.day();
    for n in cafe.drain_notifications().iter().filter(|n| n.is_milestone()) {
        store.append_notification(&NotificationLogEntry::new(run_id, day, n)?)?;
    }
    Ok(())
}

// ── IPC mode ───────────────────────────────────────────────────────

fn run_ipc_loop(cafe: &mut Cafe, store: &SimStore, run_id: &str) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let rejected = handle_command(cafe, store, run_id, cmd)?;
        let reply = match rejected {
            Some(reason) => serde_json::json!({ "rejected": reason }),
            None => serde_json::to_value(build_ui_state(cafe))?,
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Apply one command. Returns the reason code if the core refused it.
fn handle_command(
    cafe: &mut Cafe,
    store: &SimStore,
    run_id: &str,
    cmd: IpcCommand,
) -> Result<Option<cafe_core::error::Rejected>> {
    fn refused<T>(outcome: Outcome<T>) -> Option<cafe_core::error::Rejected> {
        outcome.err()
    }

    let rejected = match cmd {
        IpcCommand::GetState | IpcCommand::Quit => None,
        IpcCommand::Frames { count } => {
            for _ in 0..count {
                cafe.frame(FRAME);
            }
            None
        }
        IpcCommand::BeginDay => refused(cafe.begin_day()),
        IpcCommand::ResolveDecision { choice } => refused(cafe.resolve_decision(choice)),
        IpcCommand::ChooseUpgrade { id } => refused(cafe.choose_upgrade(&id)),
        IpcCommand::Reroll => refused(cafe.reroll()),
        IpcCommand::Banish { id } => refused(cafe.banish(&id)),
        IpcCommand::SkipReward => refused(cafe.skip_reward()),
        IpcCommand::BuyItem { id } => refused(cafe.buy_from_store(&id)),
        IpcCommand::NegotiateRent { strategy } => refused(cafe.negotiate_rent(strategy)),
        IpcCommand::FireStaff { id } => refused(cafe.fire_staff(&id)),
        IpcCommand::SetEmployment { id, employment } => refused(cafe.set_employment(&id, employment)),
        IpcCommand::TriggerSkill { id } => refused(cafe.trigger_skill(&id)),
        IpcCommand::ToggleAutoClean => {
            cafe.toggle_auto_clean();
            None
        }
        IpcCommand::SetPaused { paused } => {
            cafe.set_paused(paused);
            None
        }
        IpcCommand::SetSpeed { speed } => {
            cafe.set_speed(speed);
            None
        }
        IpcCommand::Save { slot } => {
            // Saves are only taken between days.
            if cafe.status() == RunStatus::Ready {
                store.save(&slot, run_id, &cafe.serialize())?;
                None
            } else {
                Some(cafe_core::error::Rejected::WrongPhase)
            }
        }
    };
    Ok(rejected)
}

fn build_ui_state(cafe: &mut Cafe) -> UiState<'_> {
    let notifications = cafe.drain_notifications();
    let entities = cafe.entities();
    let store_prices = cafe
        .config()
        .store_items
        .iter()
        .filter_map(|item| cafe.upgrades().store_price(&item.id, cafe.config()).map(|p| (item.id.clone(), p)))
        .collect();
    let ledger = cafe.ledger();
    UiState {
        day: cafe.day(),
        status: cafe.status(),
        gold: ledger.gold,
        reputation: ledger.reputation,
        week: ledger.week,
        current_rent: ledger.current_rent,
        time_remaining: cafe.clock.time_remaining,
        offer: cafe.offer(),
        rerolls_left: cafe.upgrades().rerolls_left(),
        banishes_left: cafe.upgrades().banishes_left(),
        store_prices,
        entities,
        notifications,
    }
}

// ── Summary ────────────────────────────────────────────────────────

fn print_summary(cafe: &Cafe, store: &SimStore, run_id: &str) -> Result<()> {
    let ledger = cafe.ledger();
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:      {run_id}");
    println!("  status:      {:?}", cafe.status());
    println!("  day:         {}", cafe.day());
    println!("  gold:        {}", ledger.gold);
    println!("  reputation:  {}", ledger.reputation);
    println!("  staff:       {}", cafe.staff().len());
    println!("  upgrades:    {}", cafe.upgrades().applied().len());

    println!();
    println!("=== SAVE SLOTS ===");
    let slots = store.list_slots()?;
    if slots.is_empty() {
        println!("  (none)");
    }
    for s in slots {
        println!("  {:<10} day {:>2}  gold {:>7}  {}", s.slot, s.day, s.gold, s.saved_at);
    }
    Ok(())
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
