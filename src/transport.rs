//! Velocity integration and boundary handling for live carriers.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;
use crate::components::*;
use crate::config::JunctionConfig;
use crate::store::SimRng;

/// Clamps the magnitude of `velocity` into `[min, max]`. A zero vector has
/// no direction, so it is given the minimum magnitude along +x.
pub fn clamp_speed(velocity: Vec3, min: f32, max: f32) -> Vec3 {
    let length = velocity.length();
    if !length.is_finite() || length == 0.0 {
        return Vec3::X * min;
    }
    velocity * (length.clamp(min, max) / length)
}

/// Clamps and persists every live carrier's velocity, then moves the
/// carriers that are allowed to move.
pub fn integrate_system(
    config: Res<JunctionConfig>,
    mut carriers: Query<(&Carrier, &Membership, &mut Position, &mut Velocity)>,
) {
    for (carrier, membership, mut position, mut velocity) in carriers.iter_mut() {
        if !membership.is_live() {
            continue;
        }
        velocity.0 = clamp_speed(velocity.0, config.min_speed, config.max_speed);
        if carrier.can_move {
            position.0 += velocity.0;
        }
    }
}

/// Directional injection along x, elastic reflection in y and z.
pub fn bounds_system(
    config: Res<JunctionConfig>,
    mut rng: ResMut<SimRng>,
    mut carriers: Query<(&Carrier, &Membership, &mut Position, &mut Velocity)>,
) {
    let (min, max) = config.x_bounds();
    let half = config.box_size / 2.0;

    for (carrier, membership, mut position, mut velocity) in carriers.iter_mut() {
        if !membership.is_live() || !carrier.can_move {
            continue;
        }
        let p = &mut position.0;

        match carrier.kind {
            CarrierKind::Hole => {
                if p.x >= max {
                    p.x = min + 1.0;
                } else if p.x <= min {
                    p.x = rng.0.gen_range(min + 1.0..min + 20.0);
                }
            }
            CarrierKind::Electron => {
                if p.x >= max {
                    p.x = rng.0.gen_range(max - 15.0..max - 1.0);
                } else if p.x <= min {
                    p.x = max - 1.0;
                }
            }
        }

        reflect(&mut p.y, &mut velocity.0.y, half.y);
        reflect(&mut p.z, &mut velocity.0.z, half.z);
    }
}

fn reflect(coordinate: &mut f32, component: &mut f32, edge: f32) {
    if *coordinate > edge {
        *coordinate = edge - 1.0;
        *component = -*component;
    } else if *coordinate < -edge {
        *coordinate = -edge + 1.0;
        *component = -*component;
    }
}
