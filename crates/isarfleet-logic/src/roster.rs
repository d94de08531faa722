//! The fixed starting roster.

use crate::geometry::GeoPoint;
use crate::robot::{Robot, RobotStatus};

/// The two boats patrolling the Isar hotspots at startup.
pub fn isar_roster() -> Vec<Robot> {
    vec![
        Robot::new(1, "CleanBot Alpha", GeoPoint::new(48.12552, 11.58397))
            .with_battery(95.0)
            .with_status(RobotStatus::Moving)
            .with_target(0),
        Robot::new(2, "CleanBot Beta", GeoPoint::new(48.12612, 11.58457))
            .with_battery(87.0)
            .with_status(RobotStatus::Moving)
            .with_target(1),
    ]
}
