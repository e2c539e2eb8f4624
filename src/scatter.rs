//! Per-carrier stochastic collision timer.

use bevy_ecs::prelude::*;
use crate::components::{Carrier, Membership, Velocity};
use crate::noise::ImprovedNoise;
use crate::store::SimRng;
use crate::time::SimulationTime;
use crate::velocity::VelocitySampler;

/// Scheduling state for a carrier's next velocity reset.
#[derive(Component, Debug, Clone, Copy)]
pub struct ScatterClock {
    /// Simulation time of the last reset (ms)
    pub started_ms: f64,
    /// Seconds until the next reset
    pub interval: f32,
}

impl ScatterClock {
    pub fn is_due(&self, now_ms: f64) -> bool {
        (now_ms - self.started_ms) / 1000.0 >= self.interval as f64
    }
}

#[derive(Resource, Debug, Clone)]
pub struct ScatterSettings {
    pub mean: f32,
    pub jitter: f32,
    pub noise: ImprovedNoise,
}

impl ScatterSettings {
    /// Next interval for carrier `serial` at time `now_ms`.
    pub fn interval(&self, serial: u32, now_ms: f64) -> f32 {
        let key = serial as f64;
        let n = self.noise.noise(key * 100.0, key * 200.0, now_ms * 0.001);
        self.mean + ((n - 0.5) as f32) * self.jitter
    }

    pub fn fresh_clock(&self, serial: u32, now_ms: f64) -> ScatterClock {
        ScatterClock {
            started_ms: now_ms,
            interval: self.interval(serial, now_ms),
        }
    }
}

/// One linear pass over live carriers; each carrier's own clock gates its
/// own reset.
pub fn scatter_system(
    time: Res<SimulationTime>,
    settings: Res<ScatterSettings>,
    sampler: Res<VelocitySampler>,
    mut rng: ResMut<SimRng>,
    mut carriers: Query<(&Carrier, &Membership, &mut Velocity, &mut ScatterClock)>,
) {
    for (carrier, membership, mut velocity, mut clock) in carriers.iter_mut() {
        if !membership.is_live() || !clock.is_due(time.now_ms) {
            continue;
        }
        velocity.0 = sampler.sample(&mut rng.0);
        *clock = settings.fresh_clock(carrier.serial, time.now_ms);
        log::trace!(
            "{:?} #{} scattered, next in {:.3}s",
            carrier.kind,
            carrier.serial,
            clock.interval
        );
    }
}
