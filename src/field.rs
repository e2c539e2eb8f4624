//! Depletion field: bias-dependent field width and the drift acceleration
//! it exerts on carriers inside the field region.

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use crate::components::{Carrier, Membership, Velocity, Position};
use crate::config::JunctionConfig;
use crate::error::{JunctionError, Result};
use crate::time::SimulationTime;

/// Constants of the width law `scale * sqrt(built_in - voltage * slope)`
/// and the linear restoring strength inside the field region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepletionField {
    pub scale: f32,
    pub built_in: f32,
    pub slope: f32,
    pub strength: f32,
}

impl Default for DepletionField {
    fn default() -> Self {
        Self {
            scale: 24.2 * 0.58,
            built_in: 9.2,
            slope: 1.13 / 0.05,
            strength: 1.53,
        }
    }
}

impl DepletionField {
    /// Largest bias for which the width law stays real.
    pub fn max_voltage(&self) -> f32 {
        self.built_in / self.slope
    }

    /// Field width for `voltage`. The square-root argument is floored at
    /// zero so the result is always finite and non-negative; callers are
    /// expected to have clamped the bias into the configured range.
    pub fn half_width(&self, voltage: f32) -> f32 {
        self.scale * (self.built_in - voltage * self.slope).max(0.0).sqrt()
    }

    /// Strict variant of [`half_width`](Self::half_width) that rejects
    /// biases outside the square-root domain.
    pub fn try_half_width(&self, voltage: f32) -> Result<f32> {
        let radicand = self.built_in - voltage * self.slope;
        if !voltage.is_finite() || radicand < 0.0 {
            return Err(JunctionError::BiasOutOfDomain { voltage });
        }
        Ok(self.scale * radicand.sqrt())
    }

    /// Acceleration (x only) at local coordinate `x` relative to the
    /// junction center. Zero outside `(-half_width/2, half_width/2)` and at
    /// exactly zero.
    pub fn acceleration_at(&self, x: f32, half_width: f32) -> Vec3 {
        let edge = half_width / 2.0;
        let ax = if -edge < x && x < 0.0 {
            -self.strength * (edge + x)
        } else if 0.0 < x && x < edge {
            -self.strength * (edge - x)
        } else {
            0.0
        };
        Vec3::new(ax, 0.0, 0.0)
    }
}

/// Snapshot of the bias for the current frame. Written once at frame start
/// and read by every later stage.
#[derive(Resource, Debug, Clone, Copy)]
pub struct JunctionState {
    pub voltage: f32,
    pub half_width: f32,
}

impl JunctionState {
    pub fn new(field: &DepletionField, voltage: f32) -> Self {
        Self {
            voltage,
            half_width: field.half_width(voltage),
        }
    }

    /// Distance from the center to the field edge.
    pub fn edge(&self) -> f32 {
        self.half_width / 2.0
    }
}

/// Applies the depletion field to every live carrier's velocity.
pub fn acceleration_system(
    time: Res<SimulationTime>,
    config: Res<JunctionConfig>,
    junction: Res<JunctionState>,
    mut carriers: Query<(&Carrier, &Position, &mut Velocity, &Membership)>,
) {
    let step = time.delta_seconds / config.time_divisor;

    for (carrier, position, mut velocity, membership) in carriers.iter_mut() {
        if !membership.is_live() {
            continue;
        }
        let accel = config.field.acceleration_at(position.0.x, junction.half_width);
        velocity.0 += accel * step * carrier.kind.charge_sign();
    }
}
