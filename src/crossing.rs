//! Reverse/zero bias crossing policy: keeps each live population near its
//! capacity and, under reverse bias, routes the excess into the extraction
//! queue.

use std::collections::HashSet;

use bevy_ecs::prelude::*;
use glam::Vec3;
use crate::components::*;
use crate::field::JunctionState;
use crate::stats::JunctionStatistics;
use crate::store::CarrierStore;

pub fn crossing_system(
    junction: Res<JunctionState>,
    mut store: CarrierStore,
    mut stats: ResMut<JunctionStatistics>,
    mut carriers: Query<(Entity, &mut Carrier, &Position, &Membership)>,
) {
    if junction.voltage > 0.0 {
        return;
    }
    let edge = junction.edge();
    let capacity = store.config.capacity;
    let exit_x = store.config.outer_edge() - store.config.extraction_inset;

    for kind in CarrierKind::ALL {
        let mut population: Vec<Entity> = carriers
            .iter()
            .filter(|(_, carrier, _, membership)| carrier.kind == kind && membership.is_live())
            .map(|(entity, ..)| entity)
            .collect();
        let snapshot = population.clone();
        let mut evicted = HashSet::new();
        let mut crossings = 0usize;

        for entity in snapshot {
            if evicted.contains(&entity) {
                continue;
            }
            let Ok((_, mut carrier, position, _)) = carriers.get_mut(entity) else {
                continue;
            };
            if !kind.has_crossed(position.0.x, edge) {
                continue;
            }

            crossings += 1;
            if crossings <= capacity {
                continue;
            }
            crossings -= 1;

            if junction.voltage < 0.0 {
                carrier.crossed = true;
                let start = Vec3::new(kind.terminal_sign() * exit_x, 0.0, 0.0);
                store.spawn_transit(kind, start, Membership::Extraction);
                log::debug!("{:?} #{} crossed, queued for extraction", kind, carrier.serial);
            }

            if let Some(victim) = store.evict_random(&mut population) {
                evicted.insert(victim);
                stats.evictions += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::FixedBias;
    use crate::config::JunctionConfig;
    use crate::exchange::{GeneratedPair, PairExchange, RecombinedPair};
    use crate::scene::HeadlessScene;
    use crate::simulation::Simulation;
    use crate::store::CarrierView;

    /// Emits one pair per frame for the first `frames` polls, parked at
    /// the given positions and held forever.
    struct BurstGenerator {
        frames: usize,
        electron: Vec3,
        hole: Vec3,
    }

    impl PairExchange for BurstGenerator {
        fn poll_generated_pair(&mut self, _now_ms: f64) -> Option<GeneratedPair> {
            if self.frames == 0 {
                return None;
            }
            self.frames -= 1;
            Some(GeneratedPair {
                electron: self.electron,
                hole: self.hole,
                hold_ms: f64::INFINITY,
            })
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

    fn config(capacity: usize) -> JunctionConfig {
        JunctionConfig {
            capacity,
            initial_carriers: Some(0),
            seed: Some(17),
            ..Default::default()
        }
    }

    #[test]
    fn test_reverse_bias_bounds_population_and_extracts() {
        let generator = BurstGenerator {
            frames: 4,
            electron: Vec3::new(60.0, 0.0, 0.0),
            hole: Vec3::new(-60.0, 0.0, 0.0),
        };
        let mut sim = Simulation::new(
            config(2),
            HeadlessScene::new(),
            generator,
            FixedBias(-1.0),
        )
        .unwrap();

        for _ in 0..8 {
            sim.step(1.0 / 60.0);
        }

        assert!(sim.population(CarrierKind::Electron) <= 2);
        assert!(sim.population(CarrierKind::Hole) <= 2);
        assert_eq!(sim.queue_len(Membership::Extraction), 4);
        assert_eq!(sim.statistics().evictions, 4);
    }

    #[test]
    fn test_zero_bias_evicts_without_extraction() {
        let generator = BurstGenerator {
            frames: 5,
            electron: Vec3::new(60.0, 0.0, 0.0),
            hole: Vec3::new(-60.0, 0.0, 0.0),
        };
        let mut sim =
            Simulation::new(config(3), HeadlessScene::new(), generator, FixedBias(0.0)).unwrap();

        for _ in 0..8 {
            sim.step(1.0 / 60.0);
        }

        assert_eq!(sim.population(CarrierKind::Electron), 3);
        assert_eq!(sim.population(CarrierKind::Hole), 3);
        assert_eq!(sim.queue_len(Membership::Extraction), 0);
    }

    #[test]
    fn test_forward_bias_skips_crossing() {
        let generator = BurstGenerator {
            frames: 5,
            electron: Vec3::new(60.0, 0.0, 0.0),
            hole: Vec3::new(-60.0, 0.0, 0.0),
        };
        let mut sim =
            Simulation::new(config(2), HeadlessScene::new(), generator, FixedBias(0.2)).unwrap();

        for _ in 0..8 {
            sim.step(1.0 / 60.0);
        }

        assert_eq!(sim.population(CarrierKind::Electron), 5);
        assert_eq!(sim.statistics().evictions, 0);
    }

    #[test]
    fn test_single_crossing_electron_is_extracted() {
        let generator = BurstGenerator {
            frames: 1,
            electron: Vec3::new(60.0, 0.0, 0.0),
            hole: Vec3::new(-10.0, 0.0, 0.0),
        };
        let scene = HeadlessScene::new();
        let mut sim =
            Simulation::new(config(1), scene.clone(), generator, FixedBias(-1.0)).unwrap();
        let edge = sim.half_width() / 2.0;
        sim.insert_carrier(
            CarrierKind::Electron,
            Vec3::new(edge + 0.01, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
            true,
        );

        // frame 1 adds the generated electron, frame 2 sees two crossed
        // electrons against a capacity of one
        sim.step(1.0 / 60.0);
        assert_eq!(sim.population(CarrierKind::Electron), 2);
        sim.step(1.0 / 60.0);

        assert_eq!(sim.population(CarrierKind::Electron), 1);
        assert_eq!(sim.queue_len(Membership::Extraction), 1);
        assert_eq!(scene.live_of(CarrierKind::Electron), 2);
    }

    #[test]
    fn test_reverse_bias_marks_crossing_carrier() {
        let mut marked_survivors = 0;
        for seed in 0..32 {
            let generator = BurstGenerator {
                frames: 1,
                electron: Vec3::new(60.0, 0.0, 0.0),
                hole: Vec3::new(-10.0, 0.0, 0.0),
            };
            let config = JunctionConfig {
                seed: Some(seed),
                ..config(1)
            };
            let mut sim =
                Simulation::new(config, HeadlessScene::new(), generator, FixedBias(-1.0)).unwrap();
            let edge = sim.half_width() / 2.0;
            sim.insert_carrier(
                CarrierKind::Electron,
                Vec3::new(edge + 0.01, 0.0, 0.0),
                Vec3::new(0.5, 0.0, 0.0),
                true,
            );
            sim.step(1.0 / 60.0);
            assert!(sim.carriers().iter().all(|c| !c.crossed));

            sim.step(1.0 / 60.0);
            let electrons: Vec<_> = sim
                .carriers()
                .into_iter()
                .filter(|c| c.kind == CarrierKind::Electron && c.membership.is_live())
                .collect();
            assert_eq!(electrons.len(), 1);
            let survivor = electrons[0];
            assert!(survivor.position.x > edge);
            if survivor.crossed {
                marked_survivors += 1;
            }
            // the extraction carrier is a fresh entity, never the marked one
            assert!(sim
                .carriers()
                .iter()
                .filter(|c| c.membership == Membership::Extraction)
                .all(|c| !c.crossed));
        }
        // the survivor is the marked carrier whenever eviction spares it
        assert!(marked_survivors > 0 && marked_survivors < 32);
    }
}
