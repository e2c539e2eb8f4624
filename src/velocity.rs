//! Maxwellian speed pool and randomly directed velocity draws.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;
use rand_distr::{Distribution, UnitSphere};
use crate::error::{JunctionError, Result};

/// (normalized speed, relative frequency) buckets approximating a
/// Maxwell-Boltzmann speed distribution. Bucket order is irrelevant.
pub const MAXWELL_TABLE: [(f32, u32); 27] = [
    (0.1, 3), (0.2, 10), (0.3, 21), (0.4, 35),
    (0.5, 49), (0.6, 63), (0.7, 74), (0.8, 82),
    (0.9, 86), (1.0, 86), (1.1, 83), (1.2, 77),
    (1.3, 69), (1.4, 59), (1.5, 50), (1.6, 40),
    (1.7, 32), (1.8, 24), (1.9, 18), (3.0, 13),
    (2.1, 9), (2.2, 6), (2.3, 4), (3.5, 3),
    (4.0, 2), (5.0, 1), (6.0, 1),
];

/// Flat weighted pool of speeds; every speed appears `frequency` times.
#[derive(Resource, Debug, Clone)]
pub struct VelocitySampler {
    pool: Vec<f32>,
}

impl Default for VelocitySampler {
    fn default() -> Self {
        Self {
            pool: expand(&MAXWELL_TABLE),
        }
    }
}

fn expand(table: &[(f32, u32)]) -> Vec<f32> {
    table
        .iter()
        .flat_map(|&(speed, frequency)| std::iter::repeat(speed).take(frequency as usize))
        .collect()
}

impl VelocitySampler {
    /// Builds a pool from a custom table. The pool must end up non-empty
    /// and every speed in it must be finite and positive.
    pub fn from_table(table: &[(f32, u32)]) -> Result<Self> {
        let pool = expand(table);
        if pool.is_empty() {
            return Err(JunctionError::invalid_config(
                "speed_table",
                "needs at least one bucket with a non-zero frequency",
            ));
        }
        if let Some(speed) = pool.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(JunctionError::invalid_config(
                "speed_table",
                format!("speeds must be finite and positive, got {speed}"),
            ));
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &[f32] {
        &self.pool
    }

    /// Draws a speed from the pool.
    pub fn sample_speed(&self, rng: &mut impl Rng) -> f32 {
        self.pool[rng.gen_range(0..self.pool.len())]
    }

    /// Uniformly directed velocity whose magnitude comes from the pool.
    pub fn sample(&self, rng: &mut impl Rng) -> Vec3 {
        let [x, y, z]: [f32; 3] = UnitSphere.sample(rng);
        Vec3::new(x, y, z) * self.sample_speed(rng)
    }
}
