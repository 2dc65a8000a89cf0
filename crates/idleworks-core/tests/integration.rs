//! Integration tests for the Idleworks simulation engine.
//!
//! These tests exercise end-to-end behavior across the full step pipeline:
//! spawning, processing, agent hauling, staged construction, carrier
//! interaction, event delivery, and determinism.

use std::cell::RefCell;
use std::rc::Rc;

use idleworks_core::agent::{AgentConfig, AgentState};
use idleworks_core::carrier::CarrierConfig;
use idleworks_core::construction::{ProjectConfig, ReceiveRejection};
use idleworks_core::dispatch::{DispatcherConfig, ZoneCategory, ZoneRef};
use idleworks_core::engine::Engine;
use idleworks_core::item::{Container, LockMode};
use idleworks_core::event::{DestroyCause, Event, EventKind, SubscriberPriority};
use idleworks_core::id::*;
use idleworks_core::movement::Position;
use idleworks_core::sim::SimulationStrategy;
use idleworks_core::source::SourceConfig;
use idleworks_core::station::{StallReason, StationConfig, StationState};
use idleworks_core::test_utils::*;

// ===========================================================================
// Helpers
// ===========================================================================

/// Collect every event of `kind` delivered from now on.
fn record(engine: &mut Engine, kind: EventKind) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    engine.on_passive(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    log
}

/// A source that only fills through `spawn_product`, pre-stocked with `n`.
fn stocked_source(engine: &mut Engine, item_type: ItemTypeId, capacity: u32, n: u32) -> SourceId {
    let mut config = SourceConfig::new(item_type, capacity, 1);
    config.auto_spawn = false;
    let source = engine.add_source(config).unwrap();
    for _ in 0..n {
        engine.spawn_product(source);
    }
    source
}

fn stockpile_len(engine: &Engine, source: SourceId) -> u32 {
    engine.snapshot_source(source).unwrap().count
}

fn inventory_len(engine: &Engine, agent: AgentId) -> u32 {
    engine.snapshot_agent(agent).unwrap().inventory_count
}

/// A carrier with its own dispatcher subscribed to every category.
fn add_carrier(engine: &mut Engine, capacity: u32) -> (CarrierId, DispatcherId) {
    let carrier = engine.add_carrier(CarrierConfig { capacity }).unwrap();
    let dispatcher = engine
        .add_dispatcher(DispatcherConfig {
            broadcast_interval: 1,
        })
        .unwrap();
    for category in ZoneCategory::ALL {
        engine.subscribe(dispatcher, category, carrier).unwrap();
    }
    engine.activate_dispatcher(dispatcher).unwrap();
    (carrier, dispatcher)
}

fn carried(engine: &Engine, carrier: CarrierId) -> Vec<ItemTypeId> {
    let inventory = engine.carrier(carrier).unwrap().inventory();
    engine.snapshot_container(inventory).unwrap().contents
}

// ===========================================================================
// Sources
// ===========================================================================

#[test]
fn source_fills_to_capacity_then_blocks() {
    let mut engine = make_engine();
    let source = engine.add_source(SourceConfig::new(ore(), 5, 1)).unwrap();
    let blocked = record(&mut engine, EventKind::SpawnBlocked);

    engine.run_steps(5);
    let snap = engine.snapshot_source(source).unwrap();
    assert_eq!(snap.count, 5);
    assert!(snap.is_full);
    assert!(blocked.borrow().is_empty());

    let before = engine.snapshot_container(engine.source(source).unwrap().container());
    engine.step();
    let after = engine.snapshot_container(engine.source(source).unwrap().container());
    assert_eq!(before, after);
    assert_eq!(blocked.borrow().len(), 1);
}

#[test]
fn inactive_source_fills_only_on_demand() {
    let mut engine = make_engine();
    let source = stocked_source(&mut engine, ore(), 3, 0);
    engine.run_steps(10);
    assert_eq!(stockpile_len(&engine, source), 0);

    engine.spawn_product(source);
    assert_eq!(stockpile_len(&engine, source), 1);

    engine.activate_source(source).unwrap();
    engine.run_steps(2);
    assert_eq!(stockpile_len(&engine, source), 3);
}

// ===========================================================================
// Stations
// ===========================================================================

#[test]
fn station_waits_for_output_room() {
    let mut engine = make_engine();
    let (station, input, plates) = add_station(&mut engine, ore(), 5, plate(), 1, 2);
    engine.spawn_product(plates);
    let ore_item = engine.mint_item(ore());
    engine.insert_item(input, ore_item).unwrap();

    engine.run_steps(5);
    assert_eq!(
        engine.station(station).unwrap().state(),
        StationState::Stalled {
            reason: StallReason::OutputFull
        }
    );
    assert_eq!(engine.container(input).unwrap().len(), 1);

    let started = record(&mut engine, EventKind::ProcessingStarted);
    let pile = engine.source(plates).unwrap().container();
    engine.take_item(pile).unwrap();
    engine.step();
    assert!(engine.station(station).unwrap().is_busy());
    assert!(engine.container(input).unwrap().is_empty());
    assert_eq!(started.borrow().len(), 1);
}

#[test]
fn station_turns_input_into_product() {
    let mut engine = make_engine();
    let (station, input, plates) = add_station(&mut engine, ore(), 5, plate(), 5, 3);
    let finished = record(&mut engine, EventKind::ProcessingFinished);
    for _ in 0..2 {
        let item = engine.mint_item(ore());
        engine.insert_item(input, item).unwrap();
    }

    // Claim on tick 0, finish on tick 3, claim again on tick 4, finish on 7.
    engine.run_steps(4);
    assert_eq!(stockpile_len(&engine, plates), 1);
    assert_eq!(engine.container(input).unwrap().len(), 1);

    engine.run_steps(4);
    assert_eq!(stockpile_len(&engine, plates), 2);
    assert!(engine.container(input).unwrap().is_empty());

    let log = finished.borrow();
    assert_eq!(log.len(), 2);
    assert!(matches!(
        &log[0],
        Event::ProcessingFinished {
            consumed,
            product: Some(product),
            ..
        } if *consumed == ore() && *product == plate()
    ));
    drop(log);

    engine.run_steps(2);
    assert_eq!(
        engine.station(station).unwrap().state(),
        StationState::Stalled {
            reason: StallReason::MissingInputs
        }
    );
}

#[test]
fn station_progress_is_reported() {
    let mut engine = make_engine();
    let (station, input, _) = add_station(&mut engine, ore(), 5, plate(), 5, 4);
    let item = engine.mint_item(ore());
    engine.insert_item(input, item).unwrap();

    engine.run_steps(3);
    let snap = engine.snapshot_station(station).unwrap();
    assert_eq!(snap.processing, Some(ore()));
    assert_eq!(snap.progress, fixed(0.5));
}

// ===========================================================================
// Agents
// ===========================================================================

#[test]
fn agent_empties_source_then_decides() {
    let mut engine = make_engine();
    let source = stocked_source(&mut engine, ore(), 5, 3);
    let agent = add_agent(&mut engine, 20, 1, &[source], &[]);

    // Decide, arrive, then three collections.
    engine.run_steps(5);
    assert_eq!(inventory_len(&engine, agent), 3);
    assert_eq!(stockpile_len(&engine, source), 0);

    engine.step();
    assert_eq!(engine.agent(agent).unwrap().state(), AgentState::Deciding);
    assert_eq!(
        engine.snapshot_agent(agent).unwrap().held_type,
        Some(ore())
    );
}

#[test]
fn agent_interaction_interval_paces_collection() {
    let mut engine = make_engine();
    let source = stocked_source(&mut engine, ore(), 10, 10);
    let agent = add_agent(&mut engine, 20, 3, &[source], &[]);

    // First collection is immediate after arrival, then one every 3 steps.
    engine.run_steps(3);
    assert_eq!(inventory_len(&engine, agent), 1);
    engine.run_steps(3);
    assert_eq!(inventory_len(&engine, agent), 2);
    engine.run_steps(2);
    assert_eq!(inventory_len(&engine, agent), 2);
    engine.step();
    assert_eq!(inventory_len(&engine, agent), 3);
}

#[test]
fn agent_with_no_sink_parks_at_idle_point() {
    let mut engine = make_engine();
    let (station, _, _) = add_station(&mut engine, plate(), 5, gear(), 5, 1);
    let mut config = AgentConfig::new(20, 1, 4);
    config.sinks = vec![station];
    config.idle_point = Some(Position::from_f64(3.0, 0.0, 1.0));
    let agent = engine.add_agent(config).unwrap();
    engine.activate_agent(agent).unwrap();

    let inventory = engine.agent(agent).unwrap().inventory();
    let item = engine.mint_item(ore());
    engine.insert_item(inventory, item).unwrap();

    engine.step();
    assert_eq!(engine.agent(agent).unwrap().state(), AgentState::MovingToIdle);
    engine.step();
    assert_eq!(engine.agent(agent).unwrap().state(), AgentState::Idle);

    for _ in 0..3 {
        engine.step();
        assert_eq!(engine.agent(agent).unwrap().state(), AgentState::Idle);
    }
    engine.step();
    assert_eq!(engine.agent(agent).unwrap().state(), AgentState::Deciding);
}

#[test]
fn agent_waits_for_delayed_movement() {
    let mut engine = make_engine();
    engine.set_movement(Box::new(DelayedMovement::new(2)));
    let source = stocked_source(&mut engine, ore(), 5, 1);
    let agent = add_agent(&mut engine, 20, 1, &[source], &[]);

    engine.run_steps(3);
    assert_eq!(engine.agent(agent).unwrap().state(), AgentState::MovingToSource);
    engine.step();
    assert_eq!(engine.agent(agent).unwrap().state(), AgentState::Collecting);
}

#[test]
fn agent_prefers_first_registered_source() {
    let mut engine = make_engine();
    let first = stocked_source(&mut engine, ore(), 5, 2);
    let second = stocked_source(&mut engine, ore(), 5, 2);
    let agent = add_agent(&mut engine, 20, 1, &[first, second], &[]);

    engine.run_steps(3);
    assert_eq!(inventory_len(&engine, agent), 1);
    assert_eq!(stockpile_len(&engine, first), 1);
    assert_eq!(stockpile_len(&engine, second), 2);
}

#[test]
fn agent_skips_sources_of_another_type_while_holding() {
    let mut engine = make_engine();
    let woods = stocked_source(&mut engine, wood(), 5, 2);
    let ores = stocked_source(&mut engine, ore(), 5, 2);
    let agent = add_agent(&mut engine, 20, 1, &[woods, ores], &[]);

    // Clears the wood source, then only looks for sinks while holding wood.
    engine.run_steps(20);
    assert_eq!(inventory_len(&engine, agent), 2);
    assert_eq!(stockpile_len(&engine, woods), 0);
    assert_eq!(stockpile_len(&engine, ores), 2);
    assert!(matches!(
        engine.agent(agent).unwrap().state(),
        AgentState::Idle | AgentState::Deciding
    ));
}

#[test]
fn registering_an_unknown_sink_fails() {
    let mut engine = make_engine();
    let mut other = make_engine();
    let (foreign, _, _) = add_station(&mut other, ore(), 1, plate(), 1, 1);
    let agent = engine.add_agent(AgentConfig::new(5, 1, 1)).unwrap();
    assert!(engine.register_agent_sink(agent, foreign).is_err());
    assert!(engine.agent(agent).unwrap().sinks().is_empty());
}

#[test]
fn mismatched_drop_into_locked_input_destroys_the_item() {
    let mut engine = make_engine();
    let input = engine.add_container(Container::with_mode(5, LockMode::FirstItem));
    let mut output = SourceConfig::new(gear(), 5, 1);
    output.auto_spawn = false;
    let output = engine.add_source(output).unwrap();
    let station = engine.add_station(StationConfig::new(input, output, 50));
    engine.activate_station(station).unwrap();

    let ores = stocked_source(&mut engine, ore(), 5, 1);
    let plates = stocked_source(&mut engine, plate(), 5, 1);
    let first = add_agent(&mut engine, 5, 1, &[ores], &[station]);
    let second = add_agent(&mut engine, 5, 1, &[plates], &[station]);
    let destroyed = record(&mut engine, EventKind::ItemDestroyed);

    // Both agents see an empty input and head for it. The first drop locks
    // it to ore, so the plate cannot go in.
    engine.run_steps(10);

    let log = destroyed.borrow();
    assert_eq!(log.len(), 1);
    assert!(matches!(
        &log[0],
        Event::ItemDestroyed { item_type, cause, .. }
            if *item_type == plate() && *cause == DestroyCause::TypeMismatch
    ));
    drop(log);

    // Two items minted: one ore at the station, one plate destroyed.
    assert_eq!(stockpile_len(&engine, ores), 0);
    assert_eq!(stockpile_len(&engine, plates), 0);
    assert_eq!(inventory_len(&engine, first), 0);
    assert_eq!(inventory_len(&engine, second), 0);
    let snap = engine.snapshot_station(station).unwrap();
    let at_station = snap.input_count + u32::from(snap.processing == Some(ore()));
    assert_eq!(at_station, 1);
}

// ===========================================================================
// Full chain
// ===========================================================================

#[test]
fn chain_fills_output_then_stalls() {
    let chain = small_chain();
    let mut engine = chain.engine;
    let finished = record(&mut engine, EventKind::ProcessingFinished);

    engine.run_steps(200);

    assert_eq!(stockpile_len(&engine, chain.plate_pile), 5);
    assert_eq!(finished.borrow().len(), 5);
    assert_eq!(
        engine.station(chain.smelter).unwrap().state(),
        StationState::Stalled {
            reason: StallReason::OutputFull
        }
    );
    let input = engine.container(chain.smelter_input).unwrap();
    assert!(input.iter().all(|i| i.item_type() == ore()));
}

#[test]
fn chain_moves_items_without_duplicating() {
    let chain = small_chain();
    let mut engine = chain.engine;
    let spawned = record(&mut engine, EventKind::ItemSpawned);

    engine.run_steps(60);

    let ore_spawned = spawned
        .borrow()
        .iter()
        .filter(|e| matches!(e, Event::ItemSpawned { source, .. } if *source == chain.ore_source))
        .count() as u32;
    let plates = stockpile_len(&engine, chain.plate_pile);
    let in_flight = u32::from(engine.station(chain.smelter).unwrap().is_busy());
    let ore_left = stockpile_len(&engine, chain.ore_source)
        + inventory_len(&engine, chain.agent)
        + engine.container(chain.smelter_input).unwrap().len()
        + in_flight;
    assert_eq!(ore_spawned, ore_left + plates);
}

// ===========================================================================
// Construction
// ===========================================================================

#[test]
fn out_of_order_builds_flush_together() {
    let mut engine = make_engine();
    engine.set_build_animation(Box::new(ScriptedBuild::new(&[(0, 5), (1, 2)])));
    let project = engine
        .add_project(ProjectConfig::new(vec![ore(), plate(), ore()], 3))
        .unwrap();
    let parts = record(&mut engine, EventKind::PartCompleted);

    let a = engine.mint_item(ore());
    assert_eq!(engine.receive_item(project, a), Ok(0));
    let b = engine.mint_item(plate());
    assert_eq!(engine.receive_item(project, b), Ok(1));
    assert_eq!(engine.project(project).unwrap().in_flight(), 2);

    // Slot 1 finishes on tick 2 but waits on slot 0.
    engine.run_steps(3);
    let snap = engine.snapshot_project(project).unwrap();
    assert_eq!(snap.finished, vec![1]);
    assert_eq!(snap.next_index, 0);
    assert!(parts.borrow().is_empty());

    // Slot 0 finishes on tick 5 and flushes both.
    engine.run_steps(2);
    assert!(parts.borrow().is_empty());
    engine.step();
    let snap = engine.snapshot_project(project).unwrap();
    assert_eq!(snap.next_index, 2);
    assert!(snap.finished.is_empty());
    let slots: Vec<usize> = parts
        .borrow()
        .iter()
        .map(|e| match e {
            Event::PartCompleted { slot, .. } => *slot,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(slots, vec![0, 1]);
    assert!(parts.borrow().iter().all(|e| e.tick() == 5));
}

#[test]
fn project_completes_once() {
    let mut engine = make_engine();
    let project = engine.add_project(ProjectConfig::new(vec![ore()], 1)).unwrap();
    let completed = record(&mut engine, EventKind::ProjectCompleted);
    let destroyed = record(&mut engine, EventKind::ItemDestroyed);

    let item = engine.mint_item(ore());
    engine.receive_item(project, item).unwrap();
    engine.run_steps(2);
    assert!(engine.project(project).unwrap().is_complete());
    assert_eq!(engine.snapshot_project(project).unwrap().progress, fixed(1.0));

    let late = engine.mint_item(ore());
    assert_eq!(
        engine.receive_item(project, late),
        Err(ReceiveRejection::Complete)
    );
    engine.run_steps(3);
    assert_eq!(completed.borrow().len(), 1);
    assert!(matches!(
        destroyed.borrow()[0],
        Event::ItemDestroyed {
            cause: DestroyCause::ProjectComplete,
            ..
        }
    ));
}

#[test]
fn deactivated_project_loses_pending_items() {
    let mut engine = make_engine();
    let project = engine
        .add_project(ProjectConfig::new(vec![ore(), ore(), ore()], 10))
        .unwrap();
    let destroyed = record(&mut engine, EventKind::ItemDestroyed);
    for _ in 0..2 {
        let item = engine.mint_item(ore());
        engine.receive_item(project, item).unwrap();
    }

    engine.deactivate_project(project).unwrap();
    engine.run_steps(20);

    let snap = engine.snapshot_project(project).unwrap();
    assert_eq!(snap.next_index, 0);
    assert_eq!(snap.in_flight, 0);
    assert!(!snap.active);
    let causes: Vec<DestroyCause> = destroyed
        .borrow()
        .iter()
        .map(|e| match e {
            Event::ItemDestroyed { cause, .. } => *cause,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(causes, vec![DestroyCause::Cancelled; 2]);

    engine.activate_project(project).unwrap();
    let item = engine.mint_item(ore());
    assert_eq!(engine.receive_item(project, item), Ok(0));
}

#[test]
fn long_project_reports_every_part_from_one_flush() {
    let mut engine = make_engine();
    let slots = 1500;
    let project = engine
        .add_project(ProjectConfig::new(vec![ore(); slots], 1))
        .unwrap();
    let parts = record(&mut engine, EventKind::PartCompleted);
    let completed = record(&mut engine, EventKind::ProjectCompleted);

    for _ in 0..slots {
        let item = engine.mint_item(ore());
        engine.receive_item(project, item).unwrap();
    }
    engine.run_steps(3);

    assert!(engine.project(project).unwrap().is_complete());
    assert_eq!(completed.borrow().len(), 1);
    let seen: Vec<usize> = parts
        .borrow()
        .iter()
        .map(|e| match e {
            Event::PartCompleted { slot, .. } => *slot,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(seen, (0..slots).collect::<Vec<_>>());
}

// ===========================================================================
// Carriers and dispatch
// ===========================================================================

#[test]
fn carrier_collects_builds_and_trashes() {
    let mut engine = make_engine();
    let source = stocked_source(&mut engine, ore(), 5, 3);
    let project = engine
        .add_project(ProjectConfig::new(vec![ore(), ore()], 2))
        .unwrap();
    let disposal = engine.add_disposal(Position::default());
    let (carrier, dispatcher) = add_carrier(&mut engine, 5);

    assert!(engine.overlap_enter(dispatcher, ZoneCategory::Source, ZoneRef::Source(source)));
    engine.run_steps(4);
    assert_eq!(carried(&engine, carrier), vec![ore(); 3]);
    assert_eq!(stockpile_len(&engine, source), 0);

    assert!(engine.overlap_exit(dispatcher, ZoneCategory::Source, ZoneRef::Source(source)));
    engine.overlap_enter(
        dispatcher,
        ZoneCategory::Construction,
        ZoneRef::Construction(project),
    );
    engine.run_steps(5);
    assert!(engine.project(project).unwrap().is_complete());
    assert_eq!(carried(&engine, carrier), vec![ore()]);

    engine.overlap_exit(
        dispatcher,
        ZoneCategory::Construction,
        ZoneRef::Construction(project),
    );
    engine.overlap_enter(dispatcher, ZoneCategory::Disposal, ZoneRef::Disposal(disposal));
    engine.step();
    assert!(carried(&engine, carrier).is_empty());
    assert_eq!(engine.disposal(disposal).unwrap().trashed(), 1);
}

#[test]
fn carrier_delivers_only_the_accepted_type() {
    let mut engine = make_engine();
    let (station, input, _) = add_station(&mut engine, plate(), 5, gear(), 5, 50);
    let (carrier, dispatcher) = add_carrier(&mut engine, 5);
    let inventory = engine.carrier(carrier).unwrap().inventory();
    for ty in [plate(), ore(), plate()] {
        let item = engine.mint_item(ty);
        engine.insert_item(inventory, item).unwrap();
    }

    engine.overlap_enter(dispatcher, ZoneCategory::Sink, ZoneRef::Sink(station));
    engine.run_steps(5);
    assert_eq!(carried(&engine, carrier), vec![ore()]);
    // One plate was claimed by the station, the other waits in the input.
    assert_eq!(engine.container(input).unwrap().len(), 1);
    assert!(engine.station(station).unwrap().is_busy());
}

#[test]
fn unsubscribed_carrier_stops_collecting() {
    let mut engine = make_engine();
    let source = stocked_source(&mut engine, ore(), 5, 3);
    let (carrier, dispatcher) = add_carrier(&mut engine, 5);
    engine.overlap_enter(dispatcher, ZoneCategory::Source, ZoneRef::Source(source));
    engine.step();
    assert_eq!(carried(&engine, carrier), vec![ore()]);

    engine.unsubscribe(dispatcher, ZoneCategory::Source, carrier).unwrap();
    assert!(engine.dispatcher(dispatcher).unwrap().subscribers(ZoneCategory::Source).is_empty());
    engine.run_steps(3);
    assert_eq!(carried(&engine, carrier), vec![ore()]);
    assert_eq!(stockpile_len(&engine, source), 2);
}

#[test]
fn mismatched_category_is_ignored() {
    let mut engine = make_engine();
    let source = stocked_source(&mut engine, ore(), 5, 1);
    let (_, dispatcher) = add_carrier(&mut engine, 5);
    assert!(!engine.overlap_enter(dispatcher, ZoneCategory::Disposal, ZoneRef::Source(source)));
    assert_eq!(engine.dispatcher(dispatcher).unwrap().current(ZoneCategory::Disposal), None);
}

#[test]
fn exit_of_stale_zone_keeps_current() {
    let mut engine = make_engine();
    let a = stocked_source(&mut engine, ore(), 5, 1);
    let b = stocked_source(&mut engine, ore(), 5, 1);
    let (_, dispatcher) = add_carrier(&mut engine, 5);
    engine.overlap_enter(dispatcher, ZoneCategory::Source, ZoneRef::Source(a));
    engine.overlap_enter(dispatcher, ZoneCategory::Source, ZoneRef::Source(b));
    assert!(!engine.overlap_exit(dispatcher, ZoneCategory::Source, ZoneRef::Source(a)));
    assert_eq!(
        engine.dispatcher(dispatcher).unwrap().current(ZoneCategory::Source),
        Some(ZoneRef::Source(b))
    );
}

#[test]
fn dispatcher_broadcast_interval() {
    let mut engine = make_engine();
    let source = stocked_source(&mut engine, ore(), 5, 1);
    let carrier = engine.add_carrier(CarrierConfig { capacity: 1 }).unwrap();
    let dispatcher = engine
        .add_dispatcher(DispatcherConfig {
            broadcast_interval: 3,
        })
        .unwrap();
    engine.subscribe(dispatcher, ZoneCategory::Source, carrier).unwrap();
    engine.overlap_enter(dispatcher, ZoneCategory::Source, ZoneRef::Source(source));
    let announced = record(&mut engine, EventKind::ZoneAnnounced);

    engine.run_steps(2);
    assert!(announced.borrow().is_empty());

    engine.activate_dispatcher(dispatcher).unwrap();
    engine.run_steps(7);
    let ticks: Vec<u64> = announced.borrow().iter().map(Event::tick).collect();
    assert_eq!(ticks, vec![2, 5, 8]);
}

// ===========================================================================
// Events
// ===========================================================================

#[test]
fn listeners_run_in_priority_then_registration_order() {
    let mut engine = make_engine();
    engine.add_source(SourceConfig::new(ore(), 5, 1)).unwrap();
    let order = Rc::new(RefCell::new(Vec::new()));
    for (label, priority) in [
        ("post", SubscriberPriority::Post),
        ("normal-1", SubscriberPriority::Normal),
        ("pre", SubscriberPriority::Pre),
        ("normal-2", SubscriberPriority::Normal),
    ] {
        let order = Rc::clone(&order);
        engine.event_bus.on_passive_filtered(
            EventKind::ItemSpawned,
            priority,
            None,
            Box::new(move |_| order.borrow_mut().push(label)),
        );
    }

    engine.step();
    assert_eq!(*order.borrow(), vec!["pre", "normal-1", "normal-2", "post"]);
}

#[test]
fn suppressed_kinds_are_not_delivered() {
    let mut engine = make_engine();
    engine.add_source(SourceConfig::new(ore(), 5, 1)).unwrap();
    let spawned = record(&mut engine, EventKind::ItemSpawned);
    engine.suppress_event(EventKind::ItemSpawned);
    let result = engine.run_steps(3);
    assert!(spawned.borrow().is_empty());
    assert_eq!(result.events_delivered, 0);
}

#[test]
fn agent_transitions_are_published() {
    let mut engine = make_engine();
    let source = stocked_source(&mut engine, ore(), 5, 1);
    add_agent(&mut engine, 20, 1, &[source], &[]);
    let changes = record(&mut engine, EventKind::AgentStateChanged);

    engine.run_steps(5);
    let path: Vec<(AgentState, AgentState)> = changes
        .borrow()
        .iter()
        .map(|e| match e {
            Event::AgentStateChanged { from, to, .. } => (*from, *to),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(
        path,
        vec![
            (AgentState::Deciding, AgentState::MovingToSource),
            (AgentState::MovingToSource, AgentState::Collecting),
            (AgentState::Collecting, AgentState::Deciding),
            (AgentState::Deciding, AgentState::Idle),
        ]
    );
}

// ===========================================================================
// Determinism and time
// ===========================================================================

#[test]
fn identical_scenes_stay_in_lockstep() {
    let mut a = small_chain().engine;
    let mut b = small_chain().engine;
    for _ in 0..100 {
        a.step();
        b.step();
        assert_eq!(a.state_hash(), b.state_hash());
    }
}

#[test]
fn diverging_scenes_hash_differently() {
    let mut a = small_chain().engine;
    let chain = small_chain();
    let mut b = chain.engine;
    b.spawn_product(chain.ore_source);
    a.step();
    b.step();
    assert_ne!(a.state_hash(), b.state_hash());
}

#[test]
fn delta_strategy_runs_whole_steps() {
    let mut engine = Engine::new(SimulationStrategy::Delta { fixed_timestep: 4 });
    let source = engine.add_source(SourceConfig::new(ore(), 10, 1)).unwrap();

    assert_eq!(engine.advance(10).steps_run, 2);
    assert_eq!(engine.sim_state.accumulator, 2);
    assert_eq!(engine.advance(2).steps_run, 1);
    assert_eq!(engine.tick(), 3);
    assert_eq!(stockpile_len(&engine, source), 3);
}

#[test]
fn pause_freezes_state() {
    let chain = small_chain();
    let mut engine = chain.engine;
    engine.run_steps(10);
    let hash = engine.state_hash();
    engine.pause();
    engine.run_steps(10);
    engine.advance(5);
    assert_eq!(engine.tick(), 10);
    assert_eq!(engine.state_hash(), hash);
    engine.resume();
    engine.step();
    assert_eq!(engine.tick(), 11);
}
