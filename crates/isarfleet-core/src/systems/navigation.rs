//! Navigation system - steps every robot toward its hotspot and rolls the
//! trash picked up on arrival.

use isarfleet_logic::config::SimulationConfig;
use isarfleet_logic::robot::{Robot, RobotStatus, RobotUpdate};
use isarfleet_logic::rules::{step_robot, FleetClock};
use isarfleet_logic::waypoints::WaypointTable;
use rand::Rng;

/// Everything one tick wants to write, plus counts for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickPlan {
    pub updates: Vec<RobotUpdate>,
    pub arrivals: usize,
    pub charging: usize,
}

/// Compute the next state of every robot in `robots`.
///
/// Nothing is written here; the caller commits `updates` as one batch.
pub fn navigation_system<R: Rng>(
    robots: &[Robot],
    waypoints: &WaypointTable,
    config: &SimulationConfig,
    clock: &mut FleetClock,
    rng: &mut R,
) -> TickPlan {
    let mut plan = TickPlan {
        updates: Vec::with_capacity(robots.len()),
        ..Default::default()
    };

    for robot in robots {
        let mut step = step_robot(robot, waypoints, config, clock);

        if step.arrived {
            let gathered = rng.gen_range(0.0..=config.max_trash_per_arrival);
            step.patch.trash_collected = Some(robot.trash_collected + gathered);
            plan.arrivals += 1;

            let reached = waypoints.wrapped(robot.target_waypoint_index);
            log::info!(
                "{} reached hotspot {} and collected {:.2} kg",
                robot.name,
                reached.id,
                gathered
            );
        }

        if step.patch.status == Some(RobotStatus::Charging) {
            plan.charging += 1;
            if robot.status != RobotStatus::Charging {
                log::warn!(
                    "{} battery low ({:.1}%), switching to charging",
                    robot.name,
                    step.patch.battery.unwrap_or(robot.battery)
                );
            }
        }

        plan.updates.push(RobotUpdate::new(robot.id, step.patch));
    }

    plan
}
