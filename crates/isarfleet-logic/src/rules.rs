//! Per-robot tick rules.
//!
//! Each tick a robot first moves (one step toward its target waypoint,
//! clamped so it never overshoots), then its new status is picked by the
//! first matching entry of [`STATUS_RULES`]:
//!
//! | Priority | Rule | Fires when | Status |
//! |----------|------|------------|--------|
//! | 1 | [`StatusRule::ChargingOverride`] | battery after the step < charging threshold | `charging` |
//! | 2 | [`StatusRule::Arrival`] | robot is within the arrival threshold of its target | `collecting` on every Nth fleet arrival, else `moving` |
//! | 3 | [`StatusRule::TransitToggle`] | always | toggled by the shared tick counter |
//!
//! Because movement happens before the arrival test, a robot that is
//! within one step of its waypoint reaches it and advances to the next
//! one in the same tick.

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::geometry::move_toward;
use crate::robot::{clamp_battery, Robot, RobotPatch, RobotStatus};
use crate::waypoints::WaypointTable;

/// Counters shared by the whole fleet across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetClock {
    /// Ticks started so far. The first tick is tick 1.
    pub tick: u64,
    /// Arrivals so far, across all robots.
    pub arrivals: u64,
}

impl FleetClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next tick and return its number.
    pub fn begin_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Count one arrival and return its fleet-wide ordinal.
    pub fn record_arrival(&mut self) -> u64 {
        self.arrivals += 1;
        self.arrivals
    }
}

/// One row of the status rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusRule {
    ChargingOverride,
    Arrival,
    TransitToggle,
}

/// Status rules in priority order. The first rule that yields a status wins.
pub const STATUS_RULES: [StatusRule; 3] = [
    StatusRule::ChargingOverride,
    StatusRule::Arrival,
    StatusRule::TransitToggle,
];

/// What the status rules see about a robot after it has moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleInput {
    pub previous: RobotStatus,
    /// Battery after this tick's cost.
    pub battery: f64,
    /// Fleet-wide arrival ordinal if the robot arrived this tick.
    pub arrival: Option<u64>,
    pub tick: u64,
}

impl StatusRule {
    pub fn evaluate(self, input: &RuleInput, config: &SimulationConfig) -> Option<RobotStatus> {
        match self {
            StatusRule::ChargingOverride => {
                (input.battery < config.charging_threshold).then_some(RobotStatus::Charging)
            }
            StatusRule::Arrival => input.arrival.map(|ordinal| {
                if ordinal % config.collect_every_n_arrivals == 0 {
                    RobotStatus::Collecting
                } else {
                    RobotStatus::Moving
                }
            }),
            StatusRule::TransitToggle => Some(transit_status(input.previous, input.tick, config)),
        }
    }
}

/// Status while travelling: brief collection pauses on a fixed tick cadence.
fn transit_status(previous: RobotStatus, tick: u64, config: &SimulationConfig) -> RobotStatus {
    let phase = tick % config.toggle_period;
    match previous {
        RobotStatus::Moving if phase == config.toggle_collect_phase => RobotStatus::Collecting,
        RobotStatus::Collecting if phase == config.toggle_resume_phase => RobotStatus::Moving,
        // Only reached with a battery at or above the threshold.
        RobotStatus::Charging => RobotStatus::Moving,
        other => other,
    }
}

/// Run the rule table and report which rule decided.
pub fn resolve_status(input: &RuleInput, config: &SimulationConfig) -> (StatusRule, RobotStatus) {
    STATUS_RULES
        .iter()
        .find_map(|rule| rule.evaluate(input, config).map(|status| (*rule, status)))
        .unwrap_or((StatusRule::TransitToggle, input.previous))
}

/// Result of stepping one robot.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotStep {
    /// Fields to write back: position, battery, status, and on arrival
    /// the next target index. Trash is left to the caller, which owns the
    /// randomness source.
    pub patch: RobotPatch,
    pub arrived: bool,
    pub rule: StatusRule,
}

/// Compute one tick for `robot`.
///
/// `clock` must already be on the current tick; arrivals are counted on it.
pub fn step_robot(
    robot: &Robot,
    waypoints: &WaypointTable,
    config: &SimulationConfig,
    clock: &mut FleetClock,
) -> RobotStep {
    let index = robot.target_waypoint_index % waypoints.len();
    let target = waypoints.wrapped(index).position;

    let position = move_toward(robot.position, target, config.step_distance);
    let arrived = position.planar_distance(&target) < config.arrival_threshold;

    let (battery, arrival) = if arrived {
        (
            clamp_battery(robot.battery - config.arrival_cost),
            Some(clock.record_arrival()),
        )
    } else {
        (clamp_battery(robot.battery - config.transit_cost), None)
    };

    let input = RuleInput {
        previous: robot.status,
        battery,
        arrival,
        tick: clock.tick,
    };
    let (rule, status) = resolve_status(&input, config);

    let mut patch = RobotPatch::new()
        .position(position)
        .battery(battery)
        .status(status);
    if arrived {
        patch = patch.target_waypoint_index(waypoints.next_index(index));
    }

    RobotStep {
        patch,
        arrived,
        rule,
    }
}
