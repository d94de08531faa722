//! Configuration errors for the fleet simulation.

use thiserror::Error;

/// A simulation setup that cannot be run.
///
/// All of these are detected before the first tick; nothing in the tick
/// path itself can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("waypoint table is empty")]
    EmptyWaypointTable,

    #[error("duplicate waypoint id {0}")]
    DuplicateWaypoint(u32),

    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be a non-negative finite number, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("transit cost ({transit}) must be smaller than arrival cost ({arrival})")]
    CostOrder { transit: f64, arrival: f64 },

    #[error("charging threshold {0} must lie between the battery floor and ceiling")]
    ChargingThreshold(f64),

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("toggle phase {phase} is outside the toggle period {period}")]
    TogglePhase { phase: u64, period: u64 },
}
