//! Errors raised while wiring up or starting a simulation.

use isarfleet_logic::error::ConfigError;
use isarfleet_logic::robot::RobotId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid simulation config: {0}")]
    Config(#[from] ConfigError),

    #[error("duplicate robot id {0} in roster")]
    DuplicateRobot(RobotId),

    #[error("robot {robot} targets waypoint {index} but the table has {count} entries")]
    TargetOutOfRange {
        robot: RobotId,
        index: usize,
        count: usize,
    },

    #[error("store was built for {store} waypoints but the table has {table}")]
    WaypointCountMismatch { store: usize, table: usize },

    #[error("store holds robots to a {store}% charging threshold but the config says {config}%")]
    ThresholdMismatch { store: f64, config: f64 },

    #[error("failed to spawn tick worker: {0}")]
    Spawn(#[source] std::io::Error),
}
