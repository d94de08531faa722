//! The robot store - single owner of every robot record.
//!
//! Records live in a `hecs` world, one entity per robot, spawned once from
//! the roster and never despawned. Readers get owned snapshots; writers go
//! through [`RobotStore::update_one`] or [`RobotStore::update_many`], which
//! commit the whole batch and only then notify listeners, so no listener
//! ever sees a half-applied batch. [`RobotStore::update_with`] runs a
//! read-plan-write cycle as one writer, which is how the engine ticks.
//!
//! # Locking
//!
//! Writers hold the listener lock for the entire commit + notify sequence,
//! which serializes writers and keeps notifications in commit order. The
//! record lock is released before listeners run, so a listener may call
//! [`RobotStore::get_all`] or [`RobotStore::get`]. A listener must not
//! write to the store or (un)subscribe from inside its callback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use hecs::{Entity, World};
use isarfleet_logic::config::SimulationConfig;
use isarfleet_logic::error::ConfigError;
use isarfleet_logic::robot::{clamp_battery, Robot, RobotId, RobotPatch, RobotUpdate};

use crate::components::{read_robot, spawn_robot, write_robot};
use crate::error::SimError;

/// Callback invoked with the full robot list after every committed write.
pub type Listener = Box<dyn FnMut(&[Robot]) + Send>;

struct Records {
    world: World,
    /// Roster order; snapshots are returned in this order.
    order: Vec<Entity>,
    by_id: HashMap<RobotId, Entity>,
}

impl Records {
    fn snapshot(&self) -> Vec<Robot> {
        self.order
            .iter()
            .filter_map(|&entity| read_robot(&self.world, entity))
            .collect()
    }

    fn apply(&mut self, id: RobotId, patch: &RobotPatch, limits: Limits) -> bool {
        let Some(&entity) = self.by_id.get(&id) else {
            return false;
        };
        let Some(mut robot) = read_robot(&self.world, entity) else {
            return false;
        };
        robot.apply(patch, limits.waypoint_count);
        robot.enforce_charging(limits.charging_threshold);
        write_robot(&mut self.world, entity, &robot)
    }
}

/// Bounds every merged record is held to.
#[derive(Debug, Clone, Copy)]
struct Limits {
    waypoint_count: usize,
    charging_threshold: f64,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Single source of truth for robot state, with change notification.
///
/// Share it as `Arc<RobotStore>` between the engine and any renderer.
pub struct RobotStore {
    records: RwLock<Records>,
    listeners: Arc<Mutex<Listeners>>,
    limits: Limits,
}

impl RobotStore {
    /// Build the store from the starting roster.
    ///
    /// `waypoint_count` bounds every robot's target index. Fails on an
    /// empty waypoint table, a duplicate robot id, or a robot whose target
    /// index is out of range.
    ///
    /// Records are held to the default charging threshold; use
    /// [`RobotStore::with_charging_threshold`] for a tuned config.
    pub fn new(roster: Vec<Robot>, waypoint_count: usize) -> Result<Self, SimError> {
        if waypoint_count == 0 {
            return Err(ConfigError::EmptyWaypointTable.into());
        }

        let charging_threshold = SimulationConfig::default().charging_threshold;
        let mut world = World::new();
        let mut order = Vec::with_capacity(roster.len());
        let mut by_id = HashMap::with_capacity(roster.len());

        for mut robot in roster {
            if by_id.contains_key(&robot.id) {
                return Err(SimError::DuplicateRobot(robot.id));
            }
            if robot.target_waypoint_index >= waypoint_count {
                return Err(SimError::TargetOutOfRange {
                    robot: robot.id,
                    index: robot.target_waypoint_index,
                    count: waypoint_count,
                });
            }
            robot.battery = clamp_battery(robot.battery);
            robot.trash_collected = robot.trash_collected.max(0.0);
            robot.enforce_charging(charging_threshold);

            let entity = spawn_robot(&mut world, &robot);
            order.push(entity);
            by_id.insert(robot.id, entity);
        }

        log::debug!(
            "robot store ready: {} robots, {} waypoints",
            order.len(),
            waypoint_count
        );

        Ok(Self {
            records: RwLock::new(Records {
                world,
                order,
                by_id,
            }),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            limits: Limits {
                waypoint_count,
                charging_threshold,
            },
        })
    }

    /// Hold records to `threshold` instead of the default. Robots already
    /// below it are switched to `charging`.
    pub fn with_charging_threshold(mut self, threshold: f64) -> Self {
        self.limits.charging_threshold = threshold;
        let records = self
            .records
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for &entity in &records.order {
            if let Some(mut robot) = read_robot(&records.world, entity) {
                if robot.enforce_charging(threshold) {
                    write_robot(&mut records.world, entity, &robot);
                }
            }
        }
        self
    }

    /// Consistent snapshot of all robots in roster order.
    pub fn get_all(&self) -> Vec<Robot> {
        self.read().snapshot()
    }

    pub fn get(&self, id: RobotId) -> Option<Robot> {
        let records = self.read();
        let entity = *records.by_id.get(&id)?;
        read_robot(&records.world, entity)
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn waypoint_count(&self) -> usize {
        self.limits.waypoint_count
    }

    pub fn charging_threshold(&self) -> f64 {
        self.limits.charging_threshold
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }

    /// Register a listener. It is called after every committed write, in
    /// subscription order, until the returned handle is unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&[Robot]) + Send + 'static,
    {
        let mut listeners = lock(&self.listeners);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Box::new(listener)));

        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            id: Some(id),
        }
    }

    /// Drop every listener. Used on teardown.
    pub fn clear_subscribers(&self) {
        lock(&self.listeners).entries.clear();
    }

    /// Merge `patch` into robot `id` and notify once.
    ///
    /// Unknown ids are ignored (no notification). Returns whether a robot
    /// was updated.
    pub fn update_one(&self, id: RobotId, patch: RobotPatch) -> bool {
        self.commit(std::iter::once(RobotUpdate::new(id, patch))) > 0
    }

    /// Apply every update in the batch, then notify once.
    ///
    /// Unknown ids are skipped individually. Listeners are not called when
    /// nothing matched. Returns the number of robots updated.
    pub fn update_many<I>(&self, updates: I) -> usize
    where
        I: IntoIterator<Item = RobotUpdate>,
    {
        self.commit(updates)
    }

    /// Read a snapshot, let `plan` turn it into a batch, and commit that
    /// batch, all as one writer.
    ///
    /// No other write can land between the read and the commit, so the
    /// batch never overwrites an update it did not see. Listeners are
    /// notified exactly once, even when the batch changes nothing. `plan`
    /// must not write to the store. Returns the number of robots updated.
    pub fn update_with<F>(&self, plan: F) -> usize
    where
        F: FnOnce(&[Robot]) -> Vec<RobotUpdate>,
    {
        let mut listeners = lock(&self.listeners);
        let snapshot = self.get_all();
        let updates = plan(&snapshot);
        self.commit_locked(&mut listeners, updates, true)
    }

    fn commit<I>(&self, updates: I) -> usize
    where
        I: IntoIterator<Item = RobotUpdate>,
    {
        let mut listeners = lock(&self.listeners);
        self.commit_locked(&mut listeners, updates, false)
    }

    /// Apply `updates` with the writer lock already held, then notify.
    /// Without `always_notify`, a batch that matched nothing stays silent.
    fn commit_locked<I>(
        &self,
        listeners: &mut Listeners,
        updates: I,
        always_notify: bool,
    ) -> usize
    where
        I: IntoIterator<Item = RobotUpdate>,
    {
        let (applied, snapshot) = {
            let mut records = self
                .records
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let mut applied = 0;
            for update in updates {
                if records.apply(update.id, &update.patch, self.limits) {
                    applied += 1;
                } else {
                    log::trace!("ignoring update for unknown robot {}", update.id);
                }
            }
            let snapshot = (applied > 0 || always_notify).then(|| records.snapshot());
            (applied, snapshot)
        };

        if let Some(snapshot) = snapshot {
            for (_, listener) in listeners.entries.iter_mut() {
                listener(&snapshot);
            }
        }
        applied
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RobotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotStore")
            .field("robots", &self.len())
            .field("waypoint_count", &self.limits.waypoint_count)
            .field("charging_threshold", &self.limits.charging_threshold)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`RobotStore::subscribe`].
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    listeners: Weak<Mutex<Listeners>>,
    id: Option<u64>,
}

impl Subscription {
    /// Remove the listener. Safe to call more than once, and after the
    /// store is gone. Returns whether a listener was actually removed.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut listeners = lock(&listeners);
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry_id, _)| *entry_id != id);
        listeners.entries.len() != before
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        match (self.id, self.listeners.upgrade()) {
            (Some(id), Some(listeners)) => lock(&listeners)
                .entries
                .iter()
                .any(|(entry_id, _)| *entry_id == id),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
