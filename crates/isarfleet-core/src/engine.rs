//! Simulation engine - one tick reads the store, plans every robot, and
//! writes the batch back, all as a single store writer.

use std::sync::Arc;

use isarfleet_logic::config::SimulationConfig;
use isarfleet_logic::rules::FleetClock;
use isarfleet_logic::waypoints::WaypointTable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::store::RobotStore;
use crate::systems::navigation_system;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Robots written back to the store.
    pub updated: usize,
    /// Robots that reached their hotspot this tick.
    pub arrivals: usize,
    /// Robots in `charging` after this tick.
    pub charging: usize,
}

/// Main simulation engine.
///
/// Holds no robot state of its own: every tick starts from a fresh store
/// snapshot. The randomness source is a type parameter so tests can
/// replay a run from a seed.
pub struct SimulationEngine<R = StdRng> {
    store: Arc<RobotStore>,
    waypoints: WaypointTable,
    config: SimulationConfig,
    clock: FleetClock,
    rng: R,
}

impl SimulationEngine<StdRng> {
    /// Engine with an entropy-seeded random source.
    pub fn new(
        store: Arc<RobotStore>,
        waypoints: WaypointTable,
        config: SimulationConfig,
    ) -> Result<Self, SimError> {
        Self::with_rng(store, waypoints, config, StdRng::from_entropy())
    }

    /// Engine whose trash rolls are reproducible from `seed`.
    pub fn seeded(
        store: Arc<RobotStore>,
        waypoints: WaypointTable,
        config: SimulationConfig,
        seed: u64,
    ) -> Result<Self, SimError> {
        Self::with_rng(store, waypoints, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SimulationEngine<R> {
    /// Validate the setup and build the engine.
    ///
    /// This is where a misconfigured simulation is refused: nothing can
    /// tick until the config is valid and the store agrees with the
    /// waypoint table and charging threshold.
    pub fn with_rng(
        store: Arc<RobotStore>,
        waypoints: WaypointTable,
        config: SimulationConfig,
        rng: R,
    ) -> Result<Self, SimError> {
        config.validate()?;
        if store.waypoint_count() != waypoints.len() {
            return Err(SimError::WaypointCountMismatch {
                store: store.waypoint_count(),
                table: waypoints.len(),
            });
        }
        if store.charging_threshold() != config.charging_threshold {
            return Err(SimError::ThresholdMismatch {
                store: store.charging_threshold(),
                config: config.charging_threshold,
            });
        }

        Ok(Self {
            store,
            waypoints,
            config,
            clock: FleetClock::new(),
            rng,
        })
    }

    /// Run one tick to completion.
    ///
    /// Listeners get exactly one notification per tick, even for an empty
    /// fleet. Writes from other threads wait for the tick to commit.
    pub fn tick(&mut self) -> TickReport {
        let tick = self.clock.begin_tick();
        let (waypoints, config) = (&self.waypoints, &self.config);
        let (clock, rng) = (&mut self.clock, &mut self.rng);
        let (mut arrivals, mut charging) = (0, 0);

        let updated = self.store.update_with(|snapshot| {
            let plan = navigation_system(snapshot, waypoints, config, clock, rng);
            arrivals = plan.arrivals;
            charging = plan.charging;
            plan.updates
        });

        log::debug!(
            "tick {}: {} robots updated, {} arrivals, {} charging",
            tick,
            updated,
            arrivals,
            charging
        );

        TickReport {
            tick,
            updated,
            arrivals,
            charging,
        }
    }

    pub fn store(&self) -> &Arc<RobotStore> {
        &self.store
    }

    pub fn waypoints(&self) -> &WaypointTable {
        &self.waypoints
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn clock(&self) -> FleetClock {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isarfleet_logic::geometry::GeoPoint;
    use isarfleet_logic::robot::{Robot, RobotPatch, RobotStatus};
    use isarfleet_logic::roster::isar_roster;
    use isarfleet_logic::waypoints::{isar_hotspots, Waypoint};
    use rand::RngCore;
    use std::sync::Mutex;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    /// Random source that, on first use, starts a manual override on
    /// another thread while the tick is still planning.
    struct OverrideMidTick {
        inner: StdRng,
        store: Arc<RobotStore>,
        writer: Arc<Mutex<Option<JoinHandle<bool>>>>,
    }

    impl OverrideMidTick {
        fn fire(&mut self) {
            let mut writer = self.writer.lock().unwrap();
            if writer.is_none() {
                let store = Arc::clone(&self.store);
                *writer = Some(thread::spawn(move || {
                    store.update_one(2, RobotPatch::new().battery(18.0))
                }));
                thread::sleep(Duration::from_millis(20));
            }
        }
    }

    impl RngCore for OverrideMidTick {
        fn next_u32(&mut self) -> u32 {
            self.fire();
            self.inner.next_u32()
        }

        fn next_u64(&mut self) -> u64 {
            self.fire();
            self.inner.next_u64()
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            self.fire();
            self.inner.fill_bytes(dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fire();
            self.inner.try_fill_bytes(dest)
        }
    }

    fn isar_engine(seed: u64) -> SimulationEngine {
        let table = isar_hotspots();
        let store = Arc::new(RobotStore::new(isar_roster(), table.len()).unwrap());
        SimulationEngine::seeded(store, table, SimulationConfig::default(), seed).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = isar_engine(1);
        assert_eq!(engine.clock().tick, 0);
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn invalid_config_is_refused() {
        let table = isar_hotspots();
        let store = Arc::new(RobotStore::new(isar_roster(), table.len()).unwrap());
        let config = SimulationConfig {
            toggle_period: 0,
            ..Default::default()
        };
        assert!(matches!(
            SimulationEngine::seeded(store, table, config, 0),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn mismatched_table_is_refused() {
        let store = Arc::new(RobotStore::new(isar_roster(), 5).unwrap());
        let table = WaypointTable::new(vec![Waypoint::new(1, 48.1, 11.5, 10.0)]).unwrap();
        assert!(matches!(
            SimulationEngine::seeded(store, table, SimulationConfig::default(), 0),
            Err(SimError::WaypointCountMismatch { store: 5, table: 1 })
        ));
    }

    #[test]
    fn test_engine_tick() {
        let mut engine = isar_engine(1);
        let before = engine.store().get_all();

        let report = engine.tick();

        assert_eq!(report.tick, 1);
        assert_eq!(report.updated, 2);
        let after = engine.store().get_all();
        for (b, a) in before.iter().zip(&after) {
            assert_ne!(a.position, b.position);
            assert!(a.battery < b.battery);
        }
    }

    #[test]
    fn one_notification_per_tick() {
        let mut engine = isar_engine(3);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let _sub = engine.store().subscribe(move |robots: &[Robot]| {
            sink.lock().unwrap().push(robots.len());
        });

        for _ in 0..10 {
            engine.tick();
        }
        assert_eq!(*calls.lock().unwrap(), vec![2; 10]);
    }

    #[test]
    fn forced_low_battery_charges_after_tick() {
        let mut engine = isar_engine(5);
        engine.store().update_one(1, RobotPatch::new().battery(18.0));

        engine.tick();

        let robot = engine.store().get(1).unwrap();
        assert_eq!(robot.status, RobotStatus::Charging);
        assert!(robot.battery >= 10.0);
    }

    #[test]
    fn wraps_to_first_waypoint() {
        let table = WaypointTable::new(vec![
            Waypoint::new(1, 0.0, 0.0, 5.0),
            Waypoint::new(2, 0.0, 0.01, 5.0),
            Waypoint::new(3, 0.01, 0.01, 5.0),
        ])
        .unwrap();
        let robot = Robot::new(1, "Alpha", GeoPoint::new(0.01, 0.01)).with_target(2);
        let store = Arc::new(RobotStore::new(vec![robot], table.len()).unwrap());
        let mut engine =
            SimulationEngine::seeded(Arc::clone(&store), table, SimulationConfig::default(), 0)
                .unwrap();

        let report = engine.tick();

        assert_eq!(report.arrivals, 1);
        assert_eq!(store.get(1).unwrap().target_waypoint_index, 0);
    }

    #[test]
    fn override_during_tick_is_not_lost() {
        let table = isar_hotspots();
        // Alpha sits on its hotspot so the first tick rolls trash.
        let alpha = Robot::new(1, "Alpha", table.wrapped(0).position).with_battery(95.0);
        let beta = isar_roster().remove(1);
        let store = Arc::new(RobotStore::new(vec![alpha, beta], table.len()).unwrap());
        let writer = Arc::new(Mutex::new(None));
        let rng = OverrideMidTick {
            inner: StdRng::seed_from_u64(9),
            store: Arc::clone(&store),
            writer: Arc::clone(&writer),
        };
        let mut engine =
            SimulationEngine::with_rng(Arc::clone(&store), table, SimulationConfig::default(), rng)
                .unwrap();

        let report = engine.tick();
        let handle = writer.lock().unwrap().take().unwrap();
        assert!(handle.join().unwrap());

        assert_eq!(report.arrivals, 1);
        let beta = store.get(2).unwrap();
        assert_eq!(beta.battery, 18.0);
        assert_eq!(beta.status, RobotStatus::Charging);
    }

    #[test]
    fn empty_fleet_still_notifies_every_tick() {
        let table = isar_hotspots();
        let store = Arc::new(RobotStore::new(Vec::new(), table.len()).unwrap());
        let mut engine =
            SimulationEngine::seeded(Arc::clone(&store), table, SimulationConfig::default(), 0)
                .unwrap();
        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        let _sub = store.subscribe(move |robots: &[Robot]| {
            assert!(robots.is_empty());
            *sink.lock().unwrap() += 1;
        });

        for _ in 0..3 {
            assert_eq!(engine.tick().updated, 0);
        }
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[test]
    fn arrival_counter_is_shared_across_robots() {
        // Two hotspots, and a step long enough that both robots arrive on
        // every tick: the fleet's 20th arrival is Beta's 10th.
        let table = WaypointTable::new(vec![
            Waypoint::new(1, 0.0, 0.0, 5.0),
            Waypoint::new(2, 0.0, 0.001, 5.0),
        ])
        .unwrap();
        let roster = vec![
            Robot::new(1, "Alpha", GeoPoint::new(0.0, 0.0))
                .with_battery(90.0)
                .with_target(1),
            Robot::new(2, "Beta", GeoPoint::new(0.0, 0.001))
                .with_battery(90.0)
                .with_target(0),
        ];
        let store = Arc::new(RobotStore::new(roster, table.len()).unwrap());
        let config = SimulationConfig {
            step_distance: 1.0,
            ..Default::default()
        };
        let mut engine = SimulationEngine::seeded(Arc::clone(&store), table, config, 2).unwrap();

        for _ in 0..9 {
            assert_eq!(engine.tick().arrivals, 2);
            assert!(store
                .get_all()
                .iter()
                .all(|r| r.status == RobotStatus::Moving));
        }

        engine.tick();
        assert_eq!(engine.clock().arrivals, 20);
        assert_eq!(store.get(1).unwrap().status, RobotStatus::Moving);
        assert_eq!(store.get(2).unwrap().status, RobotStatus::Collecting);

        // The next collect slot is the fleet's 40th arrival, Beta's 20th.
        for _ in 0..10 {
            engine.tick();
        }
        assert_eq!(engine.clock().arrivals, 40);
        assert_eq!(store.get(2).unwrap().status, RobotStatus::Collecting);
        assert_eq!(store.get(1).unwrap().status, RobotStatus::Moving);
    }

    #[test]
    fn threshold_mismatch_is_refused() {
        let table = isar_hotspots();
        let store = Arc::new(RobotStore::new(isar_roster(), table.len()).unwrap());
        let config = SimulationConfig {
            charging_threshold: 30.0,
            ..Default::default()
        };
        assert!(matches!(
            SimulationEngine::seeded(store, table, config, 0),
            Err(SimError::ThresholdMismatch { .. })
        ));
    }

    #[test]
    fn seeded_runs_replay_exactly() {
        let mut a = isar_engine(42);
        let mut b = isar_engine(42);
        for _ in 0..300 {
            assert_eq!(a.tick(), b.tick());
        }
        assert_eq!(a.store().get_all(), b.store().get_all());
        assert!(a.clock().arrivals > 0);
    }
}
