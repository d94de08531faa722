//! Components shared by anything placed on the map.

use isarfleet_logic::geometry::GeoPoint;
use serde::{Deserialize, Serialize};

/// Where an entity is on the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub GeoPoint);

/// Display name shown in map popups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
