//! Pair generation and recombination gateway.
//!
//! Generation and recombination detection belong to a collaborator behind
//! [`PairExchange`]. The core applies what it reports: generated pairs are
//! added held in place, recombined pairs are consumed, and under forward
//! bias each recombination event feeds one battery pair into the injection
//! queue, gated by [`BatteryLatch`].

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::battery::{inject_battery_pair, BatteryLatch};
use crate::components::*;
use crate::field::JunctionState;
use crate::stats::JunctionStatistics;
use crate::store::{CarrierStore, CarrierView};

#[derive(Debug, Clone, Copy)]
pub struct GeneratedPair {
    pub electron: Vec3,
    pub hole: Vec3,
    /// How long the pair stays in place before it may move (ms)
    pub hold_ms: f64,
}

/// A recombination event together with the pair it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecombinedPair {
    pub electron: Entity,
    pub hole: Entity,
}

pub trait PairExchange: Send + Sync {
    fn poll_generated_pair(&mut self, now_ms: f64) -> Option<GeneratedPair>;

    /// `Some` when a recombination event fired this frame.
    fn poll_recombination_event(
        &mut self,
        now_ms: f64,
        electrons: &[CarrierView],
        holes: &[CarrierView],
        threshold: f32,
    ) -> Option<RecombinedPair>;
}

#[derive(Resource)]
pub struct Exchange(pub Box<dyn PairExchange>);

/// Never generates or recombines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExchange;

impl PairExchange for NoExchange {
    fn poll_generated_pair(&mut self, _now_ms: f64) -> Option<GeneratedPair> {
        None
    }

    fn poll_recombination_event(
        &mut self,
        _now_ms: f64,
        _electrons: &[CarrierView],
        _holes: &[CarrierView],
        _threshold: f32,
    ) -> Option<RecombinedPair> {
        None
    }
}

/// Periodic generation at a random point inside the junction box and
/// nearest-first proximity recombination with a cooldown.
#[derive(Debug)]
pub struct IntervalExchange {
    pub interval_ms: f64,
    pub hold_ms: f64,
    pub cooldown_ms: f64,
    pub box_size: Vec3,
    last_generation_ms: f64,
    last_recombination_ms: Option<f64>,
    rng: StdRng,
}

impl IntervalExchange {
    pub fn new(interval_ms: f64, hold_ms: f64, cooldown_ms: f64, box_size: Vec3, seed: Option<u64>) -> Self {
        Self {
            interval_ms,
            hold_ms,
            cooldown_ms,
            box_size,
            last_generation_ms: 0.0,
            last_recombination_ms: None,
            rng: seed.map(StdRng::seed_from_u64).unwrap_or_else(StdRng::from_entropy),
        }
    }

    pub fn from_config(config: &crate::config::JunctionConfig) -> Self {
        Self::new(
            config.generation_interval_ms,
            config.generation_hold_ms,
            config.recombination_cooldown_ms,
            config.box_size,
            config.seed.map(|seed| seed.wrapping_add(1)),
        )
    }
}

impl PairExchange for IntervalExchange {
    fn poll_generated_pair(&mut self, now_ms: f64) -> Option<GeneratedPair> {
        if now_ms - self.last_generation_ms < self.interval_ms {
            return None;
        }
        self.last_generation_ms = now_ms;

        let half = self.box_size / 2.0 - Vec3::ONE;
        let site = Vec3::new(
            self.rng.gen_range(-half.x..half.x),
            self.rng.gen_range(-half.y..half.y),
            self.rng.gen_range(-half.z..half.z),
        );
        Some(GeneratedPair {
            electron: site,
            hole: site,
            hold_ms: self.hold_ms,
        })
    }

    fn poll_recombination_event(
        &mut self,
        now_ms: f64,
        electrons: &[CarrierView],
        holes: &[CarrierView],
        threshold: f32,
    ) -> Option<RecombinedPair> {
        if let Some(last) = self.last_recombination_ms {
            if now_ms - last < self.cooldown_ms {
                return None;
            }
        }

        let (electron, hole, distance) = electrons
            .iter()
            .flat_map(|e| holes.iter().map(move |h| (e, h, e.position.distance(h.position))))
            .min_by(|a, b| a.2.total_cmp(&b.2))?;
        if distance >= threshold {
            return None;
        }

        self.last_recombination_ms = Some(now_ms);
        Some(RecombinedPair {
            electron: electron.entity,
            hole: hole.entity,
        })
    }
}

/// Releases held carriers whose hold has expired.
pub fn release_system(
    mut commands: Commands,
    time: Res<crate::time::SimulationTime>,
    mut held: Query<(Entity, &mut Carrier, &Hold)>,
) {
    for (entity, mut carrier, hold) in held.iter_mut() {
        if time.now_ms >= hold.release_ms {
            carrier.can_move = true;
            commands.entity(entity).remove::<Hold>();
        }
    }
}

/// Adds the collaborator's generated pair, held in place.
pub fn generation_system(
    mut store: CarrierStore,
    mut exchange: ResMut<Exchange>,
    mut stats: ResMut<JunctionStatistics>,
) {
    let now_ms = store.time.now_ms;
    let Some(pair) = exchange.0.poll_generated_pair(now_ms) else {
        return;
    };

    let hold = Hold {
        release_ms: now_ms + pair.hold_ms,
    };
    for (kind, position) in [(CarrierKind::Electron, pair.electron), (CarrierKind::Hole, pair.hole)] {
        let entity = store.spawn_live(kind, position, Lifecycle::Generated, false);
        store.commands.entity(entity).insert(hold);
    }
    stats.generated_pairs += 1;
    log::debug!("generated pair at {}", pair.electron);
}

/// Consumes recombined pairs and, under forward bias, turns the event into a
/// battery pair. Once latched, further events add nothing until a frame
/// passes without one.
pub fn recombination_system(
    mut store: CarrierStore,
    junction: Res<JunctionState>,
    mut exchange: ResMut<Exchange>,
    mut latch: ResMut<BatteryLatch>,
    mut stats: ResMut<JunctionStatistics>,
    carriers: Query<(Entity, &Carrier, &Position, &Membership)>,
) {
    let mut electrons = Vec::new();
    let mut holes = Vec::new();
    for (entity, carrier, position, membership) in carriers.iter() {
        if !membership.is_live() || !carrier.can_move {
            continue;
        }
        let view = CarrierView {
            entity,
            position: position.0,
        };
        match carrier.kind {
            CarrierKind::Electron => electrons.push(view),
            CarrierKind::Hole => holes.push(view),
        }
    }

    let event = exchange.0.poll_recombination_event(
        store.time.now_ms,
        &electrons,
        &holes,
        store.config.recombination_threshold,
    );

    if let Some(pair) = event {
        for entity in [pair.electron, pair.hole] {
            if carriers.get(entity).is_ok() {
                store.retire(entity);
            }
        }
        stats.recombinations += 1;
    }

    if junction.voltage > 0.0 {
        match (event.is_some(), latch.added) {
            (true, false) => {
                inject_battery_pair(&mut store);
                latch.added = true;
                log::debug!("recombination fed a battery pair");
            }
            (true, true) => {}
            (false, _) => latch.added = false,
        }
    }
}
