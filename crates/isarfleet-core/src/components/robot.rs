//! Robot-specific components and conversion to and from [`Robot`] records.

use hecs::{Entity, World};
use isarfleet_logic::robot::{Robot, RobotId, RobotStatus};
use serde::{Deserialize, Serialize};

use super::common::{Name, Position};

/// Marks an entity as a robot and carries its stable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RobotTag(pub RobotId);

/// Battery level in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Battery(pub f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status(pub RobotStatus);

/// Index into the waypoint table of the hotspot the robot is heading to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWaypoint(pub usize);

/// Kilograms of trash collected so far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrashCollected(pub f64);

/// Spawn a robot entity from a record.
pub fn spawn_robot(world: &mut World, robot: &Robot) -> Entity {
    world.spawn((
        RobotTag(robot.id),
        Name::new(robot.name.clone()),
        Position(robot.position),
        Battery(robot.battery),
        Status(robot.status),
        TargetWaypoint(robot.target_waypoint_index),
        TrashCollected(robot.trash_collected),
    ))
}

/// Assemble the record for a robot entity. `None` if the entity is gone or
/// is not a robot.
pub fn read_robot(world: &World, entity: Entity) -> Option<Robot> {
    let mut query = world
        .query_one::<(
            &RobotTag,
            &Name,
            &Position,
            &Battery,
            &Status,
            &TargetWaypoint,
            &TrashCollected,
        )>(entity)
        .ok()?;
    let (tag, name, position, battery, status, target, trash) = query.get()?;

    let robot = Robot {
        id: tag.0,
        name: name.0.clone(),
        position: position.0,
        battery: battery.0,
        status: status.0,
        target_waypoint_index: target.0,
        trash_collected: trash.0,
    };
    Some(robot)
}

/// Overwrite every mutable component of a robot entity from `robot`.
/// Returns `false` if the entity is not a robot.
pub fn write_robot(world: &mut World, entity: Entity, robot: &Robot) -> bool {
    let components = world.query_one_mut::<(
        &mut Name,
        &mut Position,
        &mut Battery,
        &mut Status,
        &mut TargetWaypoint,
        &mut TrashCollected,
    )>(entity);

    match components {
        Ok((name, position, battery, status, target, trash)) => {
            name.0.clone_from(&robot.name);
            position.0 = robot.position;
            battery.0 = robot.battery;
            status.0 = robot.status;
            target.0 = robot.target_waypoint_index;
            trash.0 = robot.trash_collected;
            true
        }
        Err(_) => false,
    }
}
