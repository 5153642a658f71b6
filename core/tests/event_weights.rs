use cafe_core::{
    config::SimConfig,
    events::EventDirector,
    rng::{RngBank, SubsystemSlot},
};

/// Over many draws each event's share converges to weight / total.
#[test]
fn weighted_draws_converge_to_weight_share() {
    const TRIALS: usize = 20_000;
    let mut pool = SimConfig::default_test().events;
    pool.truncate(3);
    let weights = [10.0, 30.0, 60.0];
    for (event, w) in pool.iter_mut().zip(weights) {
        event.weight = w;
        event.min_day = 1;
    }

    let mut rng = RngBank::new(77).for_subsystem(SubsystemSlot::Events);
    let mut director = EventDirector::new();
    let mut hits = [0usize; 3];
    for _ in 0..TRIALS {
        let id = director
            .roll_daily_event(10, 1, &pool, &mut rng)
            .map(|e| e.id.clone())
            .expect("a non-empty pool always yields an event");
        let i = pool.iter().position(|e| e.id == id).expect("drawn from pool");
        hits[i] += 1;
    }

    for (i, w) in weights.iter().enumerate() {
        let share = hits[i] as f64 / TRIALS as f64;
        let expected = w / 100.0;
        assert!(
            (share - expected).abs() < 0.02,
            "event {i}: share {share:.3}, expected {expected:.3}"
        );
    }
}

/// With more than three candidates the last three drawn sit out.
#[test]
fn recent_events_sit_out_a_larger_pool() {
    let mut pool = SimConfig::default_test().events;
    for e in &mut pool {
        e.min_day = 1;
    }
    let mut rng = RngBank::new(3).for_subsystem(SubsystemSlot::Events);
    let mut director = EventDirector::new();

    for _ in 0..200 {
        let recent = director.recent_ids();
        let drawn = director.roll_daily_event(20, 1, &pool, &mut rng).map(|e| e.id.clone()).expect("event");
        assert!(!recent.contains(&drawn), "{drawn} was drawn while cooling down: {recent:?}");
    }
    assert_eq!(director.history().len(), 200);
}
