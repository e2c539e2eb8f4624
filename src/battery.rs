//! External circuit: carriers leaving through the extraction queue and
//! returning through the injection queue.

use bevy_ecs::prelude::*;
use glam::Vec3;
use crate::components::*;
use crate::scene::RenderLink;
use crate::stats::JunctionStatistics;
use crate::store::CarrierStore;

/// Set once a recombination produced a battery pair; cleared by the first
/// frame without a recombination event.
#[derive(Resource, Debug, Default)]
pub struct BatteryLatch {
    pub added: bool,
}

/// Opacity of a carrier `overshoot` units past the outer edge.
pub fn fade_opacity(overshoot: f32, fade_distance: f32) -> f32 {
    (1.0 - overshoot / fade_distance).clamp(0.0, 1.0)
}

/// Moves extracted carriers away from the junction and fades them out once
/// they pass the outer edge. Fully faded carriers are despawned.
pub fn extraction_system(
    mut store: CarrierStore,
    mut stats: ResMut<JunctionStatistics>,
    mut queue: Query<(Entity, &Carrier, &Membership, &mut Position, &mut Opacity, &RenderLink)>,
) {
    let edge = store.config.outer_edge();
    let step = store.config.battery_step;
    let fade_distance = store.config.fade_distance;

    for (entity, carrier, membership, mut position, mut opacity, link) in queue.iter_mut() {
        if *membership != Membership::Extraction {
            continue;
        }
        let sign = carrier.kind.terminal_sign();
        let outside = sign * position.0.x > edge;
        position.0.x += sign * step;
        if !outside {
            continue;
        }

        let overshoot = (position.0.x - sign * edge).abs();
        opacity.0 = fade_opacity(overshoot, fade_distance);
        store.scene.0.set_opacity(link.0, opacity.0);

        if opacity.0 <= 0.0 {
            store.retire(entity);
            stats.extracted += 1;
            log::debug!("{:?} #{} left through the circuit", carrier.kind, carrier.serial);
        }
    }
}

/// Moves injected carriers toward the junction and hands them back to their
/// live population once they are a margin inside the outer edge.
pub fn injection_system(
    mut store: CarrierStore,
    mut stats: ResMut<JunctionStatistics>,
    mut queue: Query<(Entity, &Carrier, &Membership, &mut Position)>,
) {
    let entry = store.config.outer_edge() - store.config.injection_margin;
    let step = store.config.battery_step;

    for (entity, carrier, membership, mut position) in queue.iter_mut() {
        if *membership != Membership::Injection {
            continue;
        }
        let sign = carrier.kind.terminal_sign();
        if sign * position.0.x < entry {
            store.rejoin(entity, carrier);
            stats.injected += 1;
            log::debug!("{:?} #{} re-entered the junction", carrier.kind, carrier.serial);
        } else {
            position.0.x -= sign * step;
        }
    }
}

/// Spawns one electron past the positive terminal and one hole past the
/// negative terminal into the injection queue.
pub fn inject_battery_pair(store: &mut CarrierStore) {
    let offset = store.config.outer_edge() + store.config.injection_offset;
    for kind in CarrierKind::ALL {
        let start = Vec3::new(kind.terminal_sign() * offset, 0.0, 0.0);
        store.spawn_transit(kind, start, Membership::Injection);
    }
}
