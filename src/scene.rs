//! Boundary with the render/scene collaborator.
//!
//! The core only creates, fades and releases visual handles. Release is tied
//! to the [`RenderLink`] component: whenever a carrier entity loses it
//! (despawn included) the `on_remove` hook hands the handle back to the
//! scene, so no removal path can leak one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bevy_ecs::component::ComponentId;
use bevy_ecs::prelude::*;
use bevy_ecs::world::DeferredWorld;
use glam::Vec3;
use crate::components::CarrierKind;

/// Opaque reference to a carrier's visual representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

pub trait SceneSink: Send + Sync {
    fn add_carrier(&mut self, kind: CarrierKind, position: Vec3) -> RenderHandle;
    /// Must tolerate handles that were already released.
    fn remove_carrier(&mut self, handle: RenderHandle);
    fn set_opacity(&mut self, handle: RenderHandle, value: f32);
}

#[derive(Resource)]
pub struct Scene(pub Box<dyn SceneSink>);

#[derive(Component, Debug, Clone, Copy)]
#[component(on_remove = release_render_handle)]
pub struct RenderLink(pub RenderHandle);

fn release_render_handle(mut world: DeferredWorld, entity: Entity, _component: ComponentId) {
    let Some(handle) = world.get::<RenderLink>(entity).map(|link| link.0) else {
        return;
    };
    if let Some(mut scene) = world.get_resource_mut::<Scene>() {
        scene.0.remove_carrier(handle);
    }
}

#[derive(Debug, Default)]
pub struct SceneLedger {
    next_handle: u64,
    live: HashMap<RenderHandle, (CarrierKind, f32)>,
    pub created: u64,
    pub released: u64,
    pub double_releases: u64,
}

/// Scene without any rendering: keeps a ledger of live handles. Clones
/// share the ledger, so a host can keep one to inspect after handing the
/// other to the simulation.
#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    ledger: Arc<Mutex<SceneLedger>>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self) -> MutexGuard<'_, SceneLedger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn live_count(&self) -> usize {
        self.ledger().live.len()
    }

    pub fn live_of(&self, kind: CarrierKind) -> usize {
        self.ledger().live.values().filter(|(k, _)| *k == kind).count()
    }

    pub fn opacity(&self, handle: RenderHandle) -> Option<f32> {
        self.ledger().live.get(&handle).map(|(_, opacity)| *opacity)
    }

    pub fn is_live(&self, handle: RenderHandle) -> bool {
        self.ledger().live.contains_key(&handle)
    }

    pub fn double_releases(&self) -> u64 {
        self.ledger().double_releases
    }

    pub fn released(&self) -> u64 {
        self.ledger().released
    }
}

impl SceneSink for HeadlessScene {
    fn add_carrier(&mut self, kind: CarrierKind, _position: Vec3) -> RenderHandle {
        let mut ledger = self.ledger();
        let handle = RenderHandle(ledger.next_handle);
        ledger.next_handle += 1;
        ledger.created += 1;
        ledger.live.insert(handle, (kind, 1.0));
        handle
    }

    fn remove_carrier(&mut self, handle: RenderHandle) {
        let mut ledger = self.ledger();
        if ledger.live.remove(&handle).is_some() {
            ledger.released += 1;
        } else {
            ledger.double_releases += 1;
            log::trace!("render handle {:?} already released", handle);
        }
    }

    fn set_opacity(&mut self, handle: RenderHandle, value: f32) {
        if let Some((_, opacity)) = self.ledger().live.get_mut(&handle) {
            *opacity = value;
        }
    }
}
