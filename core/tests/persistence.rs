use cafe_core::{
    clock::RunStatus,
    config::SimConfig,
    engine::Cafe,
    snapshot::{SavedStaff, SavedTable},
    staff::Employment,
    store::SimStore,
};

fn store() -> SimStore {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.insert_run("persist-test", 21, "0.1.0-test").expect("insert run");
    store
}

/// Saving between days and loading into a fresh café restores the same run.
#[test]
fn save_slot_round_trip_restores_run() {
    let mut cafe = Cafe::new(SimConfig::default_test(), 21);
    cafe.begin_day().unwrap();
    cafe.run_day(0.1);
    let pick = cafe.offer()[0].clone();
    cafe.choose_upgrade(&pick).unwrap();
    cafe.buy_from_store("ITEM_DICE").ok();

    let s = store();
    s.save("slot-1", "persist-test", &cafe.serialize()).unwrap();
    let loaded = s.load("slot-1").unwrap();
    let restored = Cafe::hydrate(SimConfig::default_test(), loaded, 21);

    assert_eq!(restored.status(), RunStatus::Ready);
    assert_eq!(restored.serialize(), cafe.serialize());
    assert_eq!(restored.modifiers().upgrades, cafe.modifiers().upgrades);
    assert_eq!(restored.upgrades().rerolls_left(), cafe.upgrades().rerolls_left());
}

/// Catalog entries that disappeared since the save was taken are skipped.
#[test]
fn hydrate_skips_unknown_ids() {
    let mut save = Cafe::new(SimConfig::default_test(), 5).serialize();
    save.staff.push(SavedStaff { id: "staff_ghost".into(), stamina: 50.0, employment: Employment::Active });
    save.applied_upgrades = vec!["GC_BGM".into(), "UT_GONE".into(), "OT_RENT_SHIELD".into()];
    save.rent_shields = 0;
    save.tables[3].unlocked = true;
    save.tables.push(SavedTable { id: 99, unlocked: true });
    save.purchased_items.insert("ITEM_DICE".into(), 1);
    save.purchased_items.insert("ITEM_GONE".into(), 2);
    save.banished_upgrades = vec!["UT_GONE".into(), "GC_FLYERS".into()];

    let cafe = Cafe::hydrate(SimConfig::default_test(), save, 5);

    assert_eq!(cafe.staff().len(), 1);
    assert!(cafe.staff().is_hired("staff_mika"));
    assert_eq!(cafe.upgrades().applied(), ["GC_BGM".to_string(), "OT_RENT_SHIELD".to_string()]);
    assert_eq!(cafe.upgrades().banished(), ["GC_FLYERS".to_string()]);
    assert!((cafe.modifiers().upgrades.patience_decay - 0.9).abs() < 1e-9);
    assert_eq!(cafe.ledger().rent_shields, 0, "replay never re-grants shields");
    assert_eq!(cafe.facility().tables().iter().filter(|t| t.unlocked).count(), 4);
    assert!(!cafe.upgrades().purchases().contains_key("ITEM_GONE"));
    assert_eq!(cafe.upgrades().rerolls_left(), 3, "bought re-roll survives the reload");
}

/// A save naming no known staff still yields a playable café.
#[test]
fn hydrate_without_known_staff_falls_back_to_starter() {
    let mut save = Cafe::new(SimConfig::default_test(), 5).serialize();
    save.staff = vec![SavedStaff { id: "staff_ghost".into(), stamina: 10.0, employment: Employment::Resting }];

    let cafe = Cafe::hydrate(SimConfig::default_test(), save, 5);
    assert_eq!(cafe.staff().len(), 1);
    assert_eq!(cafe.staff().active_count(), 1);
}

#[test]
fn resting_staff_and_stamina_survive_reload() {
    let mut cafe = Cafe::new(SimConfig::default_test(), 5);
    cafe.buy_from_store("ITEM_COFFEE").ok();
    let mut save = cafe.serialize();
    save.staff.push(SavedStaff { id: "staff_rei".into(), stamina: 42.0, employment: Employment::Resting });
    save.applied_upgrades.push("REC_REI".into());

    let restored = Cafe::hydrate(SimConfig::default_test(), save, 5);
    let rei = restored.staff().get("staff_rei").expect("rei restored");
    assert_eq!(rei.stamina, 42.0);
    assert_eq!(rei.employment, Employment::Resting);
    assert_eq!(restored.staff().active_count(), 1);
    assert!(restored.auto_clean());
}

/// A boost picked before a recruit joined stays with the workers who
/// were already on the roster.
#[test]
fn reload_applies_boosts_only_to_workers_hired_before_them() {
    let mut save = Cafe::new(SimConfig::default_test(), 5).serialize();
    save.applied_upgrades = vec!["AUG_NIMBLE_HANDS".into(), "REC_REI".into()];
    save.staff.push(SavedStaff { id: "staff_rei".into(), stamina: 100.0, employment: Employment::Active });

    let restored = Cafe::hydrate(SimConfig::default_test(), save, 5);
    let mika = restored.staff().get("staff_mika").expect("mika restored");
    let rei = restored.staff().get("staff_rei").expect("rei restored");
    assert!(mika.work_speed_bonus > 0.0);
    assert_eq!(rei.work_speed_bonus, 0.0);
    let order: Vec<&str> = restored.staff().workers().iter().map(|w| w.id.as_str()).collect();
    assert_eq!(order, ["staff_mika", "staff_rei"]);
}

/// Saving a reloaded run and loading it again changes nothing.
#[test]
fn reload_is_stable_across_repeated_saves() {
    let config = SimConfig::default_test();
    let mut save = Cafe::new(config.clone(), 8).serialize();
    save.applied_upgrades = vec!["AUG_SWIFT_FEET".into(), "REC_REI".into(), "AUG_NIMBLE_HANDS".into()];
    save.staff.push(SavedStaff { id: "staff_rei".into(), stamina: 100.0, employment: Employment::Active });
    let first = Cafe::hydrate(config.clone(), save, 8);

    let again = Cafe::hydrate(config, first.serialize(), 8);
    assert_eq!(first.staff().len(), again.staff().len());
    for (a, b) in first.staff().workers().iter().zip(again.staff().workers()) {
        assert_eq!(a, b);
    }
    let rei = again.staff().get("staff_rei").expect("rei");
    let mika = again.staff().get("staff_mika").expect("mika");
    assert!(rei.base_speed < mika.base_speed, "rei joined after the speed boost");
}
