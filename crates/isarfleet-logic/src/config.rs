//! Simulation tuning knobs.
//!
//! Defaults reproduce the map front end's original behaviour: a 300 ms
//! tick, 0.00015° steps, and a 0.0001° arrival radius. All fields are
//! optional when deserializing, so a JSON file only needs the values it
//! overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::robot::{BATTERY_CEILING, BATTERY_FLOOR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Distance (degrees) under which a robot counts as arrived.
    pub arrival_threshold: f64,
    /// Distance (degrees) a robot travels per tick.
    pub step_distance: f64,
    /// Battery percent spent per tick in transit.
    pub transit_cost: f64,
    /// Battery percent spent on arriving at a waypoint.
    pub arrival_cost: f64,
    /// Below this battery level a robot is forced into `charging`.
    pub charging_threshold: f64,
    /// Tick counter period for the in-transit collect/resume toggle.
    pub toggle_period: u64,
    /// Phase at which a moving robot pauses to collect.
    pub toggle_collect_phase: u64,
    /// Phase at which a collecting robot resumes moving.
    pub toggle_resume_phase: u64,
    /// Every Nth arrival across the fleet starts in `collecting`.
    pub collect_every_n_arrivals: u64,
    /// Upper bound (kg) of the random trash picked up per arrival.
    pub max_trash_per_arrival: f64,
    pub tick_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            arrival_threshold: 0.0001,
            step_distance: 0.00015,
            transit_cost: 0.1,
            arrival_cost: 0.3,
            charging_threshold: 20.0,
            toggle_period: 15,
            toggle_collect_phase: 0,
            toggle_resume_phase: 5,
            collect_every_n_arrivals: 20,
            max_trash_per_arrival: 2.5,
            tick_interval_ms: 300,
        }
    }
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Reject settings the tick loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("arrival_threshold", self.arrival_threshold)?;
        positive("step_distance", self.step_distance)?;
        non_negative("transit_cost", self.transit_cost)?;
        non_negative("arrival_cost", self.arrival_cost)?;
        non_negative("max_trash_per_arrival", self.max_trash_per_arrival)?;

        if self.transit_cost >= self.arrival_cost {
            return Err(ConfigError::CostOrder {
                transit: self.transit_cost,
                arrival: self.arrival_cost,
            });
        }
        if !(BATTERY_FLOOR..=BATTERY_CEILING).contains(&self.charging_threshold) {
            return Err(ConfigError::ChargingThreshold(self.charging_threshold));
        }

        if self.toggle_period == 0 {
            return Err(ConfigError::ZeroCount {
                field: "toggle_period",
            });
        }
        for phase in [self.toggle_collect_phase, self.toggle_resume_phase] {
            if phase >= self.toggle_period {
                return Err(ConfigError::TogglePhase {
                    phase,
                    period: self.toggle_period,
                });
            }
        }
        if self.collect_every_n_arrivals == 0 {
            return Err(ConfigError::ZeroCount {
                field: "collect_every_n_arrivals",
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroCount {
                field: "tick_interval_ms",
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.tick_interval(), Duration::from_millis(300));
    }

    #[test]
    fn rejects_zero_step() {
        let config = SimulationConfig {
            step_distance: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "step_distance",
                ..
            })
        ));
    }

    #[test]
    fn transit_must_be_cheaper_than_arrival() {
        let config = SimulationConfig {
            transit_cost: 0.5,
            arrival_cost: 0.3,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CostOrder { .. })
        ));
    }

    #[test]
    fn toggle_phase_must_fit_period() {
        let config = SimulationConfig {
            toggle_period: 4,
            toggle_resume_phase: 5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TogglePhase {
                phase: 5,
                period: 4
            })
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "tick_interval_ms": 50, "step_distance": 0.0002 }"#)
                .unwrap();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.step_distance, 0.0002);
        assert_eq!(config.arrival_threshold, 0.0001);
        assert_eq!(config.collect_every_n_arrivals, 20);
    }
}
