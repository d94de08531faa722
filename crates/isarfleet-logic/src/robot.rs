//! Robot records, partial updates and the clamping rules that keep every
//! record valid no matter what a caller writes into it.

use serde::{Deserialize, Serialize};

use crate::geometry::GeoPoint;

/// Robots never report less than this; batteries are not simulated down
/// to empty.
pub const BATTERY_FLOOR: f64 = 10.0;
pub const BATTERY_CEILING: f64 = 100.0;

/// Stable robot identifier.
pub type RobotId = u32;

/// What a robot is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotStatus {
    Moving,
    Collecting,
    Charging,
}

impl RobotStatus {
    pub const ALL: [RobotStatus; 3] = [
        RobotStatus::Moving,
        RobotStatus::Collecting,
        RobotStatus::Charging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RobotStatus::Moving => "moving",
            RobotStatus::Collecting => "collecting",
            RobotStatus::Charging => "charging",
        }
    }
}

impl std::fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full state of one robot as seen by observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Robot {
    pub id: RobotId,
    pub name: String,
    pub position: GeoPoint,
    /// Percent, kept within [`BATTERY_FLOOR`]..=[`BATTERY_CEILING`].
    pub battery: f64,
    pub status: RobotStatus,
    pub target_waypoint_index: usize,
    /// Kilograms collected since start. Never decreases.
    pub trash_collected: f64,
}

impl Robot {
    pub fn new(id: RobotId, name: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            battery: BATTERY_CEILING,
            status: RobotStatus::Moving,
            target_waypoint_index: 0,
            trash_collected: 0.0,
        }
    }

    pub fn with_battery(mut self, battery: f64) -> Self {
        self.battery = clamp_battery(battery);
        self
    }

    pub fn with_status(mut self, status: RobotStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_target(mut self, index: usize) -> Self {
        self.target_waypoint_index = index;
        self
    }

    /// Merge `patch` into this record.
    ///
    /// Every written field is clamped into its valid range:
    /// - battery into `[BATTERY_FLOOR, BATTERY_CEILING]`
    /// - target index into `[0, waypoint_count)`
    /// - trash never below the current total
    ///
    /// Non-finite numbers are dropped. `waypoint_count` must be non-zero.
    pub fn apply(&mut self, patch: &RobotPatch, waypoint_count: usize) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(position) = patch.position {
            if position.is_finite() {
                self.position = position;
            }
        }
        if let Some(battery) = patch.battery {
            if !battery.is_nan() {
                self.battery = clamp_battery(battery);
            }
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(index) = patch.target_waypoint_index {
            self.target_waypoint_index = index.min(waypoint_count.saturating_sub(1));
        }
        if let Some(trash) = patch.trash_collected {
            if trash.is_finite() && trash > self.trash_collected {
                self.trash_collected = trash;
            }
        }
    }

    /// Force `charging` when the battery sits below `threshold`.
    ///
    /// Returns whether the status changed. The store runs this after every
    /// merge so a low-battery override is never published as `moving`.
    pub fn enforce_charging(&mut self, threshold: f64) -> bool {
        if self.battery < threshold && self.status != RobotStatus::Charging {
            self.status = RobotStatus::Charging;
            true
        } else {
            false
        }
    }
}

/// Clamp a battery reading into the valid range.
pub fn clamp_battery(value: f64) -> f64 {
    value.clamp(BATTERY_FLOOR, BATTERY_CEILING)
}

/// A partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RobotStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_waypoint_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trash_collected: Option<f64>,
}

impl RobotPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    pub fn battery(mut self, battery: f64) -> Self {
        self.battery = Some(battery);
        self
    }

    pub fn status(mut self, status: RobotStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn target_waypoint_index(mut self, index: usize) -> Self {
        self.target_waypoint_index = Some(index);
        self
    }

    pub fn trash_collected(mut self, trash: f64) -> Self {
        self.trash_collected = Some(trash);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One entry of a batched update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotUpdate {
    pub id: RobotId,
    pub patch: RobotPatch,
}

impl RobotUpdate {
    pub fn new(id: RobotId, patch: RobotPatch) -> Self {
        Self { id, patch }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot() -> Robot {
        Robot::new(1, "CleanBot Alpha", GeoPoint::new(48.12552, 11.58397)).with_battery(95.0)
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut r = robot();
        r.apply(&RobotPatch::new().status(RobotStatus::Collecting), 5);
        assert_eq!(r.status, RobotStatus::Collecting);
        assert_eq!(r.battery, 95.0);
        assert_eq!(r.name, "CleanBot Alpha");
    }

    #[test]
    fn battery_is_clamped() {
        let mut r = robot();
        r.apply(&RobotPatch::new().battery(-1.0e9), 5);
        assert_eq!(r.battery, BATTERY_FLOOR);
        r.apply(&RobotPatch::new().battery(250.0), 5);
        assert_eq!(r.battery, BATTERY_CEILING);
        r.apply(&RobotPatch::new().battery(f64::NAN), 5);
        assert_eq!(r.battery, BATTERY_CEILING);
    }

    #[test]
    fn target_index_is_clamped_to_table() {
        let mut r = robot();
        r.apply(&RobotPatch::new().target_waypoint_index(17), 3);
        assert_eq!(r.target_waypoint_index, 2);
    }

    #[test]
    fn trash_never_decreases() {
        let mut r = robot();
        r.apply(&RobotPatch::new().trash_collected(4.5), 5);
        r.apply(&RobotPatch::new().trash_collected(1.0), 5);
        assert_eq!(r.trash_collected, 4.5);
        r.apply(&RobotPatch::new().trash_collected(f64::INFINITY), 5);
        assert_eq!(r.trash_collected, 4.5);
    }

    #[test]
    fn low_battery_override_forces_charging() {
        let mut r = robot();
        r.apply(&RobotPatch::new().battery(15.0), 5);
        assert!(r.enforce_charging(20.0));
        assert_eq!(r.status, RobotStatus::Charging);
        assert!(!r.enforce_charging(20.0));

        let mut healthy = robot();
        assert!(!healthy.enforce_charging(20.0));
        assert_eq!(healthy.status, RobotStatus::Moving);
    }

    #[test]
    fn non_finite_position_is_ignored() {
        let mut r = robot();
        let before = r.position;
        r.apply(&RobotPatch::new().position(GeoPoint::new(f64::NAN, 1.0)), 5);
        assert_eq!(r.position, before);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&RobotStatus::Charging).unwrap();
        assert_eq!(json, "\"charging\"");
        let r = robot();
        let value = serde_json::to_value(&r).unwrap();
        assert!(value.get("targetWaypointIndex").is_some());
        assert!(value.get("trashCollected").is_some());
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(RobotPatch::new().is_empty());
        assert!(!RobotPatch::new().battery(50.0).is_empty());
    }
}
