//! Integration tests for location changes and doom-world transitions.
//!
//! Events are recorded through bus subscriptions so the tests check both the
//! resulting state and what subscribers observed, in order.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use caravan_core::{
    ClockConfig, CoreError, GameClock, GameEvent, ManualFrameClock, SimulationConfig,
    SimulationContext, Topic, UpdateScheduler, WorldStateError, config::SchedulerConfig,
};
use caravan_types::{Attributes, ChangeReason, WorldMode};
use caravan_world::{DOOM_START, NORMAL_START, create_starting_world};

fn build_context() -> SimulationContext {
    let mut ctx = SimulationContext::builder(SimulationConfig::default())
        .world_graph(Box::new(create_starting_world().unwrap()))
        .time_source(Box::new(GameClock::new(ClockConfig::default()).unwrap()))
        .build();
    ctx.new_game(Attributes::default()).unwrap();
    ctx
}

fn record_all(ctx: &mut SimulationContext) -> Arc<Mutex<Vec<GameEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for topic in [Topic::LocationChanged, Topic::WorldChanged, Topic::Death] {
        let sink = Arc::clone(&log);
        ctx.subscribe(topic, move |event| sink.lock().unwrap().push(event.clone()));
    }
    log
}

#[test]
fn doom_round_trip_returns_to_exact_location() {
    let mut ctx = build_context();
    ctx.travel_to("riverbank", ChangeReason::Travel);
    let log = record_all(&mut ctx);

    let entry = ctx.enter_doom(None).unwrap();
    assert_eq!(entry.id.as_str(), DOOM_START);
    assert_eq!(ctx.current_world(), WorldMode::Doom);

    ctx.travel_to("bone_fields", ChangeReason::Travel);
    let back = ctx.exit_doom().unwrap();
    assert_eq!(back.id.as_str(), "riverbank");
    assert_eq!(ctx.current_world(), WorldMode::Normal);

    let topics: Vec<Topic> = log.lock().unwrap().iter().map(GameEvent::topic).collect();
    assert_eq!(
        topics,
        vec![
            Topic::WorldChanged,
            Topic::LocationChanged,
            Topic::LocationChanged,
            Topic::WorldChanged,
            Topic::LocationChanged,
        ]
    );
}

#[test]
fn invalid_transitions_change_nothing() {
    let mut ctx = build_context();
    let log = record_all(&mut ctx);

    assert!(matches!(
        ctx.exit_doom(),
        Err(CoreError::WorldState {
            source: WorldStateError::AlreadyInMode { .. }
        })
    ));
    ctx.enter_doom(None).unwrap();
    let published = log.lock().unwrap().len();
    assert!(ctx.enter_doom(None).is_err());

    assert_eq!(log.lock().unwrap().len(), published);
    assert_eq!(ctx.current_location().unwrap().id.as_str(), DOOM_START);
}

#[test]
fn unknown_locations_are_opaque_but_tracked() {
    let mut ctx = build_context();
    let record = ctx.travel_to("hidden_grove", ChangeReason::Scripted("quest".to_owned()));
    assert!(record.is_opaque());
    assert!(
        ctx.world_state()
            .has_visited(WorldMode::Normal, &record.id)
    );

    let back = ctx.go_back().unwrap();
    assert_eq!(back.id.as_str(), NORMAL_START);
}

#[test]
fn queued_requests_apply_in_order_during_polling() {
    let mut ctx = build_context();
    let log = record_all(&mut ctx);
    let clock = ManualFrameClock::new();
    let mut scheduler = UpdateScheduler::new(clock.clone(), SchedulerConfig::default());

    ctx.request_location("riverbank", ChangeReason::Travel);
    ctx.request_location("greenwood", ChangeReason::Travel);
    assert!(log.lock().unwrap().is_empty());

    let report = scheduler.frame(&mut ctx);
    assert_eq!(report.location_changes, 2);
    assert_eq!(ctx.current_location().unwrap().id.as_str(), "greenwood");
    assert_eq!(
        ctx.world_state().previous_location().unwrap().id.as_str(),
        "riverbank"
    );
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn every_step_reads_the_same_minute() {
    let mut ctx = build_context();
    let clock = ManualFrameClock::new();
    let mut scheduler = UpdateScheduler::new(clock.clone(), SchedulerConfig::default());
    scheduler.frame(&mut ctx);

    for _ in 0..1_000 {
        clock.advance(100);
        let report = scheduler.frame(&mut ctx);
        assert_eq!(report.total_minutes, ctx.time().total_minutes());
        assert!(ctx.survival().last_processed_minutes() <= report.total_minutes);
        assert!(ctx.market().last_processed_minutes() <= report.total_minutes);
    }
}
