//! Isarfleet Headless Simulation Harness
//!
//! Runs the store, engine and scheduler in-process and checks the fleet
//! invariants on every published snapshot. No map, no browser.
//!
//! Usage:
//!   cargo run -p isarfleet-simtest
//!   cargo run -p isarfleet-simtest -- --verbose --ticks 5000 --seed 7
//!   cargo run -p isarfleet-simtest -- --config tuning.json --json
//!   RUST_LOG=isarfleet_core=debug cargo run -p isarfleet-simtest -- --realtime-ms 2000

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use isarfleet_core::prelude::*;
use isarfleet_logic::robot::{BATTERY_CEILING, BATTERY_FLOOR};
use isarfleet_logic::rules::FleetClock;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Headless harness for the Isarfleet simulation
#[derive(Parser, Debug)]
#[command(name = "isarfleet-simtest", version)]
struct Args {
    /// Ticks to run in the long-run check
    #[arg(long, default_value_t = 2_000)]
    ticks: u64,

    /// Seed for the trash rolls
    #[arg(long, default_value_t = 2024)]
    seed: u64,

    /// JSON file overriding simulation config fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also drive the real scheduler for this many milliseconds
    #[arg(long)]
    realtime_ms: Option<u64>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Print passing checks and the final fleet
    #[arg(short, long)]
    verbose: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    seed: u64,
    ticks: u64,
    config: SimulationConfig,
    clock: FleetClock,
    fleet: FleetSummary,
    passed: usize,
    failed: usize,
    results: Vec<TestResult>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };
    log::info!("harness config: {:?}", config);

    if !args.json {
        println!("=== Isarfleet Simulation Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Config and waypoint table validation
    results.extend(validate_setup(&config, args.json));

    // 2. Hand-built tick scenarios
    results.extend(validate_scenarios(&config, args.seed, args.json)?);

    // 3. Long run with invariant checks on every notification
    let (long_run, clock, fleet) = validate_long_run(&config, args.seed, args.ticks, args.json)?;
    results.extend(long_run);

    // 4. Observer and scheduler lifecycle
    results.extend(validate_lifecycle(&config, args.seed, args.realtime_ms, args.json)?);

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    if args.json {
        let report = Report {
            seed: args.seed,
            ticks: args.ticks,
            config,
            clock,
            fleet,
            passed,
            failed,
            results,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        for r in &results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || args.verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
        if args.verbose {
            println!(
                "\n  Fleet after {} ticks: {} moving, {} collecting, {} charging, {:.2} kg collected",
                clock.tick, fleet.moving, fleet.collecting, fleet.charging, fleet.total_trash
            );
        }
        println!(
            "\n=== RESULT: {}/{} passed, {} failed ===",
            passed,
            passed + failed,
            failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: SimulationConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn engine_for(
    roster: Vec<Robot>,
    config: &SimulationConfig,
    seed: u64,
) -> Result<(SimulationEngine, Arc<RobotStore>)> {
    let waypoints = isar_hotspots();
    let store = RobotStore::new(roster, waypoints.len())?
        .with_charging_threshold(config.charging_threshold);
    let store = Arc::new(store);
    let engine = SimulationEngine::seeded(Arc::clone(&store), waypoints, config.clone(), seed)?;
    Ok((engine, store))
}

fn check_invariants(
    robots: &[Robot],
    config: &SimulationConfig,
    waypoints: usize,
) -> Option<String> {
    robots.iter().find_map(|r| {
        if !(BATTERY_FLOOR..=BATTERY_CEILING).contains(&r.battery) {
            Some(format!("{} battery {} out of range", r.name, r.battery))
        } else if r.battery < config.charging_threshold && r.status != RobotStatus::Charging {
            Some(format!("{} at {:.1}% is {}", r.name, r.battery, r.status))
        } else if r.target_waypoint_index >= waypoints {
            Some(format!("{} targets index {}", r.name, r.target_waypoint_index))
        } else {
            None
        }
    })
}

// ── 1. Setup ────────────────────────────────────────────────────────────

fn validate_setup(config: &SimulationConfig, quiet: bool) -> Vec<TestResult> {
    if !quiet {
        println!("--- Config & Waypoints ---");
    }
    let mut results = Vec::new();

    results.push(TestResult::new(
        "config_valid",
        config.validate().is_ok(),
        format!("{} ms interval, step {}°", config.tick_interval_ms, config.step_distance),
    ));

    let broken = SimulationConfig {
        transit_cost: 1.0,
        arrival_cost: 0.5,
        ..config.clone()
    };
    results.push(TestResult::new(
        "config_rejects_cost_order",
        broken.validate().is_err(),
        "arrival cost must exceed transit cost",
    ));

    let table = isar_hotspots();
    results.push(TestResult::new(
        "hotspots_loaded",
        table.len() == 5,
        format!("{} hotspots", table.len()),
    ));

    results.push(TestResult::new(
        "empty_table_rejected",
        WaypointTable::new(Vec::new()).is_err(),
        "no waypoints, no simulation",
    ));

    let dup = WaypointTable::new(vec![
        Waypoint::new(1, 48.12, 11.58, 10.0),
        Waypoint::new(1, 48.13, 11.59, 10.0),
    ]);
    results.push(TestResult::new(
        "duplicate_waypoint_rejected",
        dup.is_err(),
        "waypoint ids are unique",
    ));

    let roster = isar_roster();
    let fresh = check_invariants(&roster, config, table.len());
    results.push(TestResult::new(
        "roster_valid",
        fresh.is_none(),
        fresh.unwrap_or_else(|| format!("{} robots", roster.len())),
    ));

    results
}

// ── 2. Scenarios ────────────────────────────────────────────────────────

fn validate_scenarios(
    config: &SimulationConfig,
    seed: u64,
    quiet: bool,
) -> Result<Vec<TestResult>> {
    if !quiet {
        println!("--- Tick Scenarios ---");
    }
    let mut results = Vec::new();
    let table = isar_hotspots();

    // A robot within one step of its hotspot reaches and arrives in one tick.
    let first = table.wrapped(0).position;
    let near = GeoPoint::new(first.lat + config.step_distance * 0.5, first.lng);
    let (mut engine, store) = engine_for(vec![Robot::new(1, "Near", near)], config, seed)?;
    let report = engine.tick();
    let robot = store.get(1).context("robot 1 vanished")?;
    results.push(TestResult::new(
        "reach_and_arrive_same_tick",
        report.arrivals == 1 && robot.position == first && robot.target_waypoint_index == 1,
        format!(
            "arrivals={} target={} battery={:.1}",
            report.arrivals, robot.target_waypoint_index, robot.battery
        ),
    ));

    // Forced low battery ends the next tick in charging.
    let (mut engine, store) = engine_for(isar_roster(), config, seed)?;
    store.update_one(1, RobotPatch::new().battery(config.charging_threshold - 2.0));
    engine.tick();
    let robot = store.get(1).context("robot 1 vanished")?;
    results.push(TestResult::new(
        "low_battery_forces_charging",
        robot.status == RobotStatus::Charging,
        format!("{:.1}% -> {}", robot.battery, robot.status),
    ));

    // Arriving at the last hotspot wraps to the first.
    let last = table.len() - 1;
    let at_last = Robot::new(1, "Last", table.wrapped(last).position).with_target(last);
    let (mut engine, store) = engine_for(vec![at_last], config, seed)?;
    engine.tick();
    let robot = store.get(1).context("robot 1 vanished")?;
    results.push(TestResult::new(
        "last_index_wraps",
        robot.target_waypoint_index == 0,
        format!("target {} -> {}", last, robot.target_waypoint_index),
    ));

    // Out-of-range overrides are clamped, not stored verbatim.
    let (_engine, store) = engine_for(isar_roster(), config, seed)?;
    store.update_one(
        2,
        RobotPatch::new().battery(500.0).target_waypoint_index(99),
    );
    let robot = store.get(2).context("robot 2 vanished")?;
    results.push(TestResult::new(
        "override_clamped",
        robot.battery == BATTERY_CEILING && robot.target_waypoint_index == last,
        format!(
            "battery={} target={}",
            robot.battery, robot.target_waypoint_index
        ),
    ));

    // Unknown ids are ignored and publish nothing.
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&calls);
    let _sub = store.subscribe(move |_: &[Robot]| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    let applied = store.update_one(404, RobotPatch::new().battery(50.0));
    results.push(TestResult::new(
        "unknown_id_ignored",
        !applied && calls.load(Ordering::SeqCst) == 0,
        "no record, no notification",
    ));

    Ok(results)
}

// ── 3. Long run ─────────────────────────────────────────────────────────

fn validate_long_run(
    config: &SimulationConfig,
    seed: u64,
    ticks: u64,
    quiet: bool,
) -> Result<(Vec<TestResult>, FleetClock, FleetSummary)> {
    if !quiet {
        println!("--- Long Run ({} ticks, seed {}) ---", ticks, seed);
    }
    let mut results = Vec::new();
    let (mut engine, store) = engine_for(isar_roster(), config, seed)?;
    let waypoints = store.waypoint_count();

    let violations = Arc::new(Mutex::new(Vec::new()));
    let notifications = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&violations);
    let counter = Arc::clone(&notifications);
    let listener_config = config.clone();
    let mut last_trash: HashMap<u32, f64> = HashMap::new();

    let mut subscription = store.subscribe(move |robots: &[Robot]| {
        counter.fetch_add(1, Ordering::SeqCst);
        let mut found = Vec::new();
        if let Some(problem) = check_invariants(robots, &listener_config, waypoints) {
            found.push(problem);
        }
        for r in robots {
            let before = last_trash.insert(r.id, r.trash_collected).unwrap_or(0.0);
            if r.trash_collected < before {
                found.push(format!("{} trash fell {} -> {}", r.name, before, r.trash_collected));
            }
        }
        if !found.is_empty() {
            if let Ok(mut sink) = sink.lock() {
                sink.extend(found);
            }
        }
    });

    let mut arrivals = 0;
    for _ in 0..ticks {
        arrivals += engine.tick().arrivals;
    }
    subscription.unsubscribe();

    let violations = violations
        .lock()
        .map(|v| v.clone())
        .unwrap_or_default();
    results.push(TestResult::new(
        "invariants_every_snapshot",
        violations.is_empty(),
        match violations.first() {
            Some(first) => format!("{} violations, first: {}", violations.len(), first),
            None => "battery range, charging rule and target index held".into(),
        },
    ));

    let seen = notifications.load(Ordering::SeqCst) as u64;
    results.push(TestResult::new(
        "one_notification_per_tick",
        seen == ticks,
        format!("{} notifications for {} ticks", seen, ticks),
    ));

    let clock = engine.clock();
    results.push(TestResult::new(
        "arrival_counter_consistent",
        clock.arrivals == arrivals as u64,
        format!("{} arrivals", clock.arrivals),
    ));

    let fleet = FleetSummary::from_snapshot(&store.get_all());
    results.push(TestResult::new(
        "fleet_summary",
        fleet.robots == store.len(),
        format!(
            "mean battery {:.1}%, {:.2} kg collected",
            fleet.mean_battery.unwrap_or_default(),
            fleet.total_trash
        ),
    ));

    Ok((results, clock, fleet))
}

// ── 4. Lifecycle ────────────────────────────────────────────────────────

fn validate_lifecycle(
    config: &SimulationConfig,
    seed: u64,
    realtime_ms: Option<u64>,
    quiet: bool,
) -> Result<Vec<TestResult>> {
    if !quiet {
        println!("--- Observer & Scheduler ---");
    }
    let mut results = Vec::new();

    let (engine, store) = engine_for(isar_roster(), config, seed)?;
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&calls);
    let mut subscription = store.subscribe(move |_: &[Robot]| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    let mut scheduler = Scheduler::new(engine);
    scheduler.tick_now();
    let first = subscription.unsubscribe();
    let second = subscription.unsubscribe();
    scheduler.tick_now();
    results.push(TestResult::new(
        "unsubscribe_idempotent",
        first && !second && calls.load(Ordering::SeqCst) == 1,
        format!("{} listener calls", calls.load(Ordering::SeqCst)),
    ));

    results.push(TestResult::new(
        "stop_without_start",
        !scheduler.stop() && !scheduler.is_running(),
        "no-op",
    ));

    let started = scheduler.start()?;
    let again = scheduler.start()?;
    let stopped = scheduler.stop();
    results.push(TestResult::new(
        "start_is_idempotent",
        started && !again && stopped,
        "second start while running spawns nothing",
    ));

    if let Some(ms) = realtime_ms {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&calls);
        let _sub = store.subscribe(move |_: &[Robot]| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.start()?;
        std::thread::sleep(Duration::from_millis(ms));
        scheduler.stop();
        let at_stop = calls.load(Ordering::SeqCst);
        std::thread::sleep(scheduler.interval() * 2);
        let after = calls.load(Ordering::SeqCst);

        let expected = ms / scheduler.interval().as_millis().max(1) as u64;
        results.push(TestResult::new(
            "realtime_ticks",
            at_stop > 0 || expected == 0,
            format!("{} ticks in {} ms (~{} expected)", at_stop, ms, expected),
        ));
        results.push(TestResult::new(
            "no_tick_after_stop",
            after == at_stop,
            format!("{} -> {}", at_stop, after),
        ));
    }

    Ok(results)
}
