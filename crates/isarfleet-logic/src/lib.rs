//! Pure fleet simulation logic for Isarfleet.
//!
//! Everything here is deterministic and free of storage, threads, or
//! randomness: functions take plain data and return results, so the rules
//! can be unit-tested in isolation and reused by the stateful engine in
//! `isarfleet-core`.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Tuning knobs (step size, arrival radius, costs, cadences) |
//! | [`error`] | Configuration errors detected before the first tick |
//! | [`geometry`] | Planar distance and clamped stepping on lat/lng degrees |
//! | [`robot`] | Robot records, partial updates, clamping rules |
//! | [`roster`] | The fixed starting roster |
//! | [`rules`] | Priority-ordered status rule table and per-robot step |
//! | [`summary`] | Fleet-wide figures derived from a snapshot |
//! | [`waypoints`] | Non-empty, ordered waypoint table |
//!
//! # Usage
//!
//! ```
//! use isarfleet_logic::config::SimulationConfig;
//! use isarfleet_logic::roster::isar_roster;
//! use isarfleet_logic::rules::{step_robot, FleetClock};
//! use isarfleet_logic::waypoints::isar_hotspots;
//!
//! let table = isar_hotspots();
//! let config = SimulationConfig::default();
//! let mut clock = FleetClock::new();
//! clock.begin_tick();
//!
//! let robot = &isar_roster()[0];
//! let step = step_robot(robot, &table, &config, &mut clock);
//! assert!(step.patch.position.is_some());
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod robot;
pub mod roster;
pub mod rules;
pub mod summary;
pub mod waypoints;
