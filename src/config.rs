use std::path::Path;

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use crate::error::{JunctionError, Result};
use crate::field::DepletionField;

/// Configuration for the junction simulation
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JunctionConfig {
    /// Carrier capacity per kind
    pub capacity: usize,
    /// Carriers spawned per kind at start (defaults to `capacity`)
    pub initial_carriers: Option<usize>,
    /// Full extents of the junction box (world units)
    pub box_size: Vec3,
    pub voltage_min: f32,
    pub voltage_max: f32,
    pub initial_voltage: f32,
    pub field: DepletionField,
    /// Frame delta (seconds) is divided by this before scaling the field
    pub time_divisor: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Range of the per-carrier `speed` drawn at creation
    pub initial_speed_range: (f32, f32),
    /// Mean seconds between scatter events
    pub scatter_mean: f32,
    /// Span of the noise jitter added to the scatter interval (seconds)
    pub scatter_jitter: f32,
    /// Battery transit step (units/frame)
    pub battery_step: f32,
    /// Distance past the outer edge over which extracted carriers fade out
    pub fade_distance: f32,
    /// Extracted carriers spawn this far inside the outer edge
    pub extraction_inset: f32,
    /// Injected carriers spawn this far outside the outer edge
    pub injection_offset: f32,
    /// Injected carriers re-enter once this far inside the outer edge
    pub injection_margin: f32,
    pub recombination_threshold: f32,
    pub generation_interval_ms: f64,
    pub generation_hold_ms: f64,
    pub recombination_cooldown_ms: f64,
    pub seed: Option<u64>,
}

impl Default for JunctionConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            initial_carriers: None,
            box_size: Vec3::new(150.0, 75.0, 75.0),
            voltage_min: -1.4,
            voltage_max: 0.4,
            initial_voltage: 0.0,
            field: DepletionField::default(),
            time_divisor: 15.0,
            min_speed: 1e-6,
            max_speed: 30.0,
            initial_speed_range: (0.22, 0.88),
            scatter_mean: 2.0,
            scatter_jitter: 0.3,
            battery_step: 0.2,
            fade_distance: 50.0,
            extraction_inset: 5.0,
            injection_offset: 50.0,
            injection_margin: 1.0,
            recombination_threshold: 30.0,
            generation_interval_ms: 2000.0,
            generation_hold_ms: 1000.0,
            recombination_cooldown_ms: 2000.0,
            seed: None,
        }
    }
}

impl JunctionConfig {
    /// Loads a (possibly partial) JSON override of the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(JunctionError::invalid_config("capacity", "must be at least 1"));
        }
        if !(self.box_size.cmpgt(Vec3::splat(2.0)).all()) {
            return Err(JunctionError::invalid_config(
                "box_size",
                format!("every extent must exceed 2, got {}", self.box_size),
            ));
        }
        // initial batches sit in (min, -2) and (2, max), one unit inside the box
        if self.box_size.x <= 6.0 {
            return Err(JunctionError::invalid_config(
                "box_size",
                format!("x extent must exceed 6 to hold both initial batches, got {}", self.box_size.x),
            ));
        }
        if !(self.min_speed > 0.0 && self.min_speed <= self.max_speed) {
            return Err(JunctionError::invalid_config(
                "min_speed",
                format!("need 0 < min_speed <= max_speed, got {} / {}", self.min_speed, self.max_speed),
            ));
        }
        if self.voltage_min > self.voltage_max {
            return Err(JunctionError::invalid_config("voltage_min", "exceeds voltage_max"));
        }
        if self.voltage_max > self.field.max_voltage() {
            return Err(JunctionError::invalid_config(
                "voltage_max",
                format!(
                    "{} V leaves the depletion width undefined (limit {:.4} V)",
                    self.voltage_max,
                    self.field.max_voltage()
                ),
            ));
        }
        if self.time_divisor <= 0.0 {
            return Err(JunctionError::invalid_config("time_divisor", "must be positive"));
        }
        if self.battery_step <= 0.0 {
            return Err(JunctionError::invalid_config("battery_step", "must be positive"));
        }
        if self.fade_distance <= 0.0 {
            return Err(JunctionError::invalid_config("fade_distance", "must be positive"));
        }
        Ok(())
    }

    pub fn clamp_voltage(&self, voltage: f32) -> f32 {
        voltage.clamp(self.voltage_min, self.voltage_max)
    }

    /// Position of the outer x boundary on the positive side.
    pub fn outer_edge(&self) -> f32 {
        self.box_size.x / 2.0
    }

    /// Inner x limits used by the boundary rules: `(min, max)`.
    pub fn x_bounds(&self) -> (f32, f32) {
        let edge = self.outer_edge();
        (-edge + 1.0, edge - 1.0)
    }

    pub fn initial_count(&self) -> usize {
        self.initial_carriers.unwrap_or(self.capacity)
    }
}
