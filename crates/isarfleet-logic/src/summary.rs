//! Fleet-wide figures derived from a snapshot, for map popups and
//! dashboards.

use serde::{Deserialize, Serialize};

use crate::robot::{Robot, RobotStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub robots: usize,
    pub moving: usize,
    pub collecting: usize,
    pub charging: usize,
    /// `None` for an empty fleet.
    pub mean_battery: Option<f64>,
    pub min_battery: Option<f64>,
    pub total_trash: f64,
}

impl FleetSummary {
    pub fn from_snapshot(robots: &[Robot]) -> Self {
        let mut summary = Self {
            robots: robots.len(),
            ..Default::default()
        };
        if robots.is_empty() {
            return summary;
        }

        let mut battery_sum = 0.0;
        let mut min_battery = f64::INFINITY;
        for robot in robots {
            match robot.status {
                RobotStatus::Moving => summary.moving += 1,
                RobotStatus::Collecting => summary.collecting += 1,
                RobotStatus::Charging => summary.charging += 1,
            }
            battery_sum += robot.battery;
            min_battery = min_battery.min(robot.battery);
            summary.total_trash += robot.trash_collected;
        }

        summary.mean_battery = Some(battery_sum / robots.len() as f64);
        summary.min_battery = Some(min_battery);
        summary
    }

    pub fn count(&self, status: RobotStatus) -> usize {
        match status {
            RobotStatus::Moving => self.moving,
            RobotStatus::Collecting => self.collecting,
            RobotStatus::Charging => self.charging,
        }
    }
}
