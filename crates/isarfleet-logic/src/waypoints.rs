//! The fixed, ordered table of trash hotspots robots cycle through.
//!
//! A [`WaypointTable`] can only be built non-empty, so index arithmetic
//! on it (`next_index`, modulo wrap) never divides by zero.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::GeoPoint;

/// A target location on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: u32,
    pub position: GeoPoint,
    /// Hotspot radius in metres. Only used for drawing; arrival is
    /// decided by the engine's arrival threshold.
    pub radius: f64,
}

impl Waypoint {
    pub const fn new(id: u32, lat: f64, lng: f64, radius: f64) -> Self {
        Self {
            id,
            position: GeoPoint::new(lat, lng),
            radius,
        }
    }
}

/// Ordered, non-empty sequence of waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Waypoint>", into = "Vec<Waypoint>")]
pub struct WaypointTable {
    waypoints: Vec<Waypoint>,
}

impl WaypointTable {
    /// Build a table, rejecting an empty list and duplicate ids.
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self, ConfigError> {
        if waypoints.is_empty() {
            return Err(ConfigError::EmptyWaypointTable);
        }
        for (i, w) in waypoints.iter().enumerate() {
            if waypoints[..i].iter().any(|other| other.id == w.id) {
                return Err(ConfigError::DuplicateWaypoint(w.id));
            }
        }
        Ok(Self { waypoints })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    /// Waypoint at `index`, wrapping out-of-range indices.
    pub fn wrapped(&self, index: usize) -> &Waypoint {
        &self.waypoints[index % self.waypoints.len()]
    }

    /// Index of the waypoint after `index`, wrapping back to 0.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.waypoints.len()
    }

    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.waypoints.iter().position(|w| w.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }
}

impl TryFrom<Vec<Waypoint>> for WaypointTable {
    type Error = ConfigError;

    fn try_from(waypoints: Vec<Waypoint>) -> Result<Self, Self::Error> {
        Self::new(waypoints)
    }
}

impl From<WaypointTable> for Vec<Waypoint> {
    fn from(table: WaypointTable) -> Self {
        table.waypoints
    }
}

/// Trash hotspots along the Isar in Munich.
pub fn isar_hotspots() -> WaypointTable {
    WaypointTable {
        waypoints: vec![
            Waypoint::new(1, 48.12520, 11.58350, 30.0),
            Waypoint::new(2, 48.12590, 11.58420, 25.0),
            Waypoint::new(3, 48.12480, 11.58450, 35.0),
            Waypoint::new(4, 48.12610, 11.58320, 28.0),
            Waypoint::new(5, 48.12550, 11.58480, 32.0),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_rejected() {
        assert_eq!(
            WaypointTable::new(Vec::new()),
            Err(ConfigError::EmptyWaypointTable)
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = WaypointTable::new(vec![
            Waypoint::new(7, 0.0, 0.0, 1.0),
            Waypoint::new(7, 1.0, 1.0, 1.0),
        ]);
        assert_eq!(result, Err(ConfigError::DuplicateWaypoint(7)));
    }

    #[test]
    fn next_index_wraps() {
        let table = WaypointTable::new(vec![
            Waypoint::new(1, 0.0, 0.0, 1.0),
            Waypoint::new(2, 0.0, 1.0, 1.0),
            Waypoint::new(3, 1.0, 1.0, 1.0),
        ])
        .unwrap();
        assert_eq!(table.next_index(0), 1);
        assert_eq!(table.next_index(1), 2);
        assert_eq!(table.next_index(2), 0);
        assert_eq!(table.wrapped(4).id, 2);
    }

    #[test]
    fn isar_hotspots_has_five_entries() {
        let table = isar_hotspots();
        assert_eq!(table.len(), 5);
        assert_eq!(table.position_of(3), Some(2));
        assert!(table.iter().all(|w| w.radius > 0.0));
    }

    #[test]
    fn deserializing_empty_table_fails() {
        let parsed: Result<WaypointTable, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());

        let parsed: WaypointTable = serde_json::from_str(
            r#"[{"id":1,"position":{"lat":48.1,"lng":11.5},"radius":10.0}]"#,
        )
        .unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
