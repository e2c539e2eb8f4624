//! Carrier store: creation, re-entry and removal of carrier entities.
//!
//! The two live populations are the `Membership::Junction` entities of each
//! kind; the battery queues are the `Extraction` and `Injection` entities.
//! All structural changes go through [`CarrierStore`] so every carrier gets
//! a render handle, a serial and a fresh scatter clock the same way.

use bevy_ecs::prelude::*;
use bevy_ecs::system::{SystemParam, SystemState};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use crate::components::*;
use crate::config::JunctionConfig;
use crate::scatter::ScatterSettings;
use crate::scene::{RenderLink, Scene};
use crate::time::SimulationTime;
use crate::velocity::VelocitySampler;

#[derive(Resource, Debug)]
pub struct SimRng(pub StdRng);

/// Hands out per-carrier serials.
#[derive(Resource, Debug, Default)]
pub struct CarrierSerials(u32);

impl CarrierSerials {
    pub fn next(&mut self) -> u32 {
        let serial = self.0;
        self.0 = self.0.wrapping_add(1);
        serial
    }
}

/// Position-only view of a carrier offered to collaborators.
#[derive(Debug, Clone, Copy)]
pub struct CarrierView {
    pub entity: Entity,
    pub position: Vec3,
}

#[derive(SystemParam)]
pub struct CarrierStore<'w, 's> {
    pub commands: Commands<'w, 's>,
    pub scene: ResMut<'w, Scene>,
    pub rng: ResMut<'w, SimRng>,
    pub sampler: Res<'w, VelocitySampler>,
    pub scatter: Res<'w, ScatterSettings>,
    pub serials: ResMut<'w, CarrierSerials>,
    pub time: Res<'w, SimulationTime>,
    pub config: Res<'w, JunctionConfig>,
}

impl CarrierStore<'_, '_> {
    fn draw_speed(&mut self) -> f32 {
        let (min, max) = self.config.initial_speed_range;
        self.rng.0.gen::<f32>() * (max - min + 1.0) + min
    }

    fn identity(&mut self, kind: CarrierKind, lifecycle: Lifecycle, can_move: bool) -> Carrier {
        Carrier {
            kind,
            serial: self.serials.next(),
            speed: self.draw_speed(),
            lifecycle,
            can_move,
            crossed: false,
        }
    }

    /// Spawns a live carrier with a sampled velocity.
    pub fn spawn_live(
        &mut self,
        kind: CarrierKind,
        position: Vec3,
        lifecycle: Lifecycle,
        can_move: bool,
    ) -> Entity {
        let velocity = self.sampler.sample(&mut self.rng.0);
        self.spawn_live_with(kind, position, velocity, lifecycle, can_move)
    }

    pub fn spawn_live_with(
        &mut self,
        kind: CarrierKind,
        position: Vec3,
        velocity: Vec3,
        lifecycle: Lifecycle,
        can_move: bool,
    ) -> Entity {
        let carrier = self.identity(kind, lifecycle, can_move);
        let clock = self.scatter.fresh_clock(carrier.serial, self.time.now_ms);
        let handle = self.scene.0.add_carrier(kind, position);

        self.commands
            .spawn((
                carrier,
                Position(position),
                Velocity(velocity),
                clock,
                Membership::Junction,
                RenderLink(handle),
            ))
            .id()
    }

    /// Spawns a carrier directly into a battery queue.
    pub fn spawn_transit(&mut self, kind: CarrierKind, position: Vec3, queue: Membership) -> Entity {
        let carrier = self.identity(kind, Lifecycle::Generated, false);
        let handle = self.scene.0.add_carrier(kind, position);

        self.commands
            .spawn((
                carrier,
                Position(position),
                queue,
                Opacity(1.0),
                RenderLink(handle),
            ))
            .id()
    }

    /// Moves a transit carrier back into its live population with fresh
    /// velocity, scatter clock and default flags.
    pub fn rejoin(&mut self, entity: Entity, carrier: &Carrier) {
        let rejoined = Carrier {
            speed: self.draw_speed(),
            lifecycle: Lifecycle::Generated,
            can_move: true,
            crossed: false,
            ..*carrier
        };
        let velocity = self.sampler.sample(&mut self.rng.0);
        let clock = self.scatter.fresh_clock(rejoined.serial, self.time.now_ms);

        self.commands
            .entity(entity)
            .insert((rejoined, Velocity(velocity), clock, Membership::Junction))
            .remove::<Opacity>();
    }

    /// Removes a uniformly random member of `population`. No-op when empty.
    pub fn evict_random(&mut self, population: &mut Vec<Entity>) -> Option<Entity> {
        let victim = pick_random(population, &mut self.rng.0)?;
        self.retire(victim);
        Some(victim)
    }

    /// Despawns a carrier; its render handle is released by the `RenderLink` hook.
    pub fn retire(&mut self, entity: Entity) {
        self.commands.entity(entity).despawn();
    }

    /// Start position for the initial batches: holes on the negative side,
    /// electrons on the positive side, anywhere in y/z.
    pub fn initial_position(&mut self, kind: CarrierKind) -> Vec3 {
        let (min, max) = self.config.x_bounds();
        let (lo, hi) = match kind {
            CarrierKind::Hole => (min, -2.0),
            CarrierKind::Electron => (2.0, max),
        };
        let half = self.config.box_size / 2.0 - Vec3::ONE;
        let rng = &mut self.rng.0;
        Vec3::new(
            rng.gen_range(lo..hi),
            rng.gen_range(-half.y..half.y),
            rng.gen_range(-half.z..half.z),
        )
    }
}

/// Swap-removes a random element.
pub fn pick_random<T>(items: &mut Vec<T>, rng: &mut impl Rng) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..items.len());
    Some(items.swap_remove(index))
}

/// Spawns the two initial batches.
pub fn populate(world: &mut World) {
    let mut state: SystemState<CarrierStore> = SystemState::new(world);
    {
        let mut store = state.get_mut(world);
        let count = store.config.initial_count();
        for kind in CarrierKind::ALL {
            for _ in 0..count {
                let position = store.initial_position(kind);
                store.spawn_live(kind, position, Lifecycle::Normal, true);
            }
        }
    }
    state.apply(world);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_pick_random_empty_is_noop() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut empty: Vec<u32> = Vec::new();
        assert_eq!(pick_random(&mut empty, &mut rng), None);
    }

    #[test]
    fn test_pick_random_removes_one_member() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut items = vec![1, 2, 3, 4];
        let picked = pick_random(&mut items, &mut rng).unwrap();
        assert_eq!(items.len(), 3);
        assert!(!items.contains(&picked));
    }

    #[test]
    fn test_serials_are_unique() {
        let mut serials = CarrierSerials::default();
        assert_eq!(serials.next(), 0);
        assert_eq!(serials.next(), 1);
    }
}
