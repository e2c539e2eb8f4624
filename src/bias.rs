//! Bias input and the once-per-frame voltage snapshot.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bevy_ecs::prelude::*;
use crate::config::JunctionConfig;
use crate::field::JunctionState;

/// Read-only view of the externally controlled bias.
pub trait BiasSource: Send + Sync {
    fn voltage(&self) -> f32;
}

/// Constant bias.
#[derive(Debug, Clone, Copy)]
pub struct FixedBias(pub f32);

impl BiasSource for FixedBias {
    fn voltage(&self) -> f32 {
        self.0
    }
}

/// Shared bias cell a control surface can write between frames. Clones
/// share the same value.
#[derive(Debug, Clone, Default)]
pub struct BiasControl(Arc<AtomicU32>);

impl BiasControl {
    pub fn new(voltage: f32) -> Self {
        Self(Arc::new(AtomicU32::new(voltage.to_bits())))
    }

    pub fn set(&self, voltage: f32) {
        self.0.store(voltage.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl BiasSource for BiasControl {
    fn voltage(&self) -> f32 {
        self.get()
    }
}

#[derive(Resource)]
pub struct BiasInput(pub Box<dyn BiasSource>);

/// Reads the bias exactly once per frame, clamps it into the configured
/// range and recomputes the field width. Non-finite readings keep the
/// previous snapshot.
pub fn bias_snapshot_system(
    input: Res<BiasInput>,
    config: Res<JunctionConfig>,
    mut junction: ResMut<JunctionState>,
) {
    let raw = input.0.voltage();
    if !raw.is_finite() {
        log::warn!("ignoring non-finite bias reading {raw}, keeping {:.3} V", junction.voltage);
        return;
    }

    let voltage = config.clamp_voltage(raw);
    if voltage != raw {
        log::debug!("bias {raw:.3} V clamped to {voltage:.3} V");
    }
    *junction = JunctionState::new(&config.field, voltage);
}
