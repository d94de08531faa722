//! Isarfleet Core - Fleet Simulation Engine
//!
//! Drives the trash-collecting robots shown on the Isar map. A renderer
//! never touches simulation internals: it reads snapshots from the
//! [`store::RobotStore`] and subscribes to change notifications.
//!
//! # Architecture
//!
//! - **Store**: owns every robot record (as `hecs` entities), hands out
//!   consistent snapshots, commits batched updates atomically, and then
//!   notifies listeners
//! - **Engine**: one tick reads a snapshot, runs the navigation system,
//!   and writes one batch back
//! - **Scheduler**: cancellable periodic task that ticks the engine on a
//!   worker thread
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use isarfleet_core::prelude::*;
//!
//! let waypoints = isar_hotspots();
//! let store = Arc::new(RobotStore::new(isar_roster(), waypoints.len())?);
//!
//! let mut subscription = store.subscribe(|robots: &[Robot]| {
//!     for robot in robots {
//!         println!("{} {} {:.1}%", robot.name, robot.status, robot.battery);
//!     }
//! });
//!
//! let engine = SimulationEngine::new(Arc::clone(&store), waypoints, SimulationConfig::default())?;
//! let mut scheduler = Scheduler::new(engine);
//! scheduler.start()?;
//! std::thread::sleep(std::time::Duration::from_secs(3));
//! scheduler.stop();
//! subscription.unsubscribe();
//! # Ok::<(), isarfleet_core::error::SimError>(())
//! ```

pub mod components;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::{SimulationEngine, TickReport};
    pub use crate::error::SimError;
    pub use crate::scheduler::Scheduler;
    pub use crate::store::{RobotStore, Subscription};
    pub use isarfleet_logic::config::SimulationConfig;
    pub use isarfleet_logic::geometry::GeoPoint;
    pub use isarfleet_logic::robot::{Robot, RobotPatch, RobotStatus, RobotUpdate};
    pub use isarfleet_logic::roster::isar_roster;
    pub use isarfleet_logic::summary::FleetSummary;
    pub use isarfleet_logic::waypoints::{isar_hotspots, Waypoint, WaypointTable};
}
