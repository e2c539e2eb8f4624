//! The simulation state and its per-frame schedule.

use bevy_ecs::prelude::*;
use bevy_ecs::system::SystemState;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::battery::*;
use crate::bias::*;
use crate::components::*;
use crate::config::JunctionConfig;
use crate::crossing::crossing_system;
use crate::error::Result;
use crate::exchange::*;
use crate::field::*;
use crate::noise::ImprovedNoise;
use crate::scatter::*;
use crate::scene::{Scene, SceneSink};
use crate::stats::*;
use crate::store::*;
use crate::time::SimulationTime;
use crate::transport::*;
use crate::velocity::VelocitySampler;

/// Read-only copy of one carrier's state.
#[derive(Debug, Clone, Copy)]
pub struct CarrierSnapshot {
    pub entity: Entity,
    pub kind: CarrierKind,
    pub serial: u32,
    pub lifecycle: Lifecycle,
    pub membership: Membership,
    pub position: Vec3,
    pub velocity: Option<Vec3>,
    pub can_move: bool,
    pub crossed: bool,
}

/// Owns the world (carriers plus resources) and the frame schedule. One
/// `step` is one frame; nothing runs between steps.
pub struct Simulation {
    world: World,
    schedule: Schedule,
}

impl Simulation {
    pub fn new(
        config: JunctionConfig,
        scene: impl SceneSink + 'static,
        exchange: impl PairExchange + 'static,
        bias: impl BiasSource + 'static,
    ) -> Result<Self> {
        config.validate()?;

        let mut rng = config
            .seed
            .map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy);
        let noise = ImprovedNoise::new(&mut rng);

        let reading = bias.voltage();
        let voltage = config.clamp_voltage(if reading.is_finite() {
            reading
        } else {
            config.initial_voltage
        });

        let mut world = World::new();
        world.insert_resource(SimulationTime::default());
        world.insert_resource(JunctionState::new(&config.field, voltage));
        world.insert_resource(ScatterSettings {
            mean: config.scatter_mean,
            jitter: config.scatter_jitter,
            noise,
        });
        world.insert_resource(VelocitySampler::default());
        world.insert_resource(SimRng(rng));
        world.insert_resource(CarrierSerials::default());
        world.insert_resource(BatteryLatch::default());
        world.insert_resource(JunctionStatistics::default());
        world.insert_resource(Scene(Box::new(scene)));
        world.insert_resource(BiasInput(Box::new(bias)));
        world.insert_resource(Exchange(Box::new(exchange)));
        world.insert_resource(config);

        populate(&mut world);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                bias_snapshot_system,
                acceleration_system,
                scatter_system,
                integrate_system,
                bounds_system,
                crossing_system,
                extraction_system,
                injection_system,
                release_system,
                generation_system,
                recombination_system,
                statistics_system,
            )
                .chain(),
        );

        log::info!(
            "junction ready: {} carriers per kind, bias {:.2} V",
            world.resource::<JunctionConfig>().initial_count(),
            voltage
        );
        Ok(Self { world, schedule })
    }

    /// Advances one frame of `delta_seconds`.
    pub fn step(&mut self, delta_seconds: f32) {
        self.world.resource_mut::<SimulationTime>().tick(delta_seconds);
        self.schedule.run(&mut self.world);
    }

    /// Adds a live carrier with an explicit velocity.
    pub fn insert_carrier(
        &mut self,
        kind: CarrierKind,
        position: Vec3,
        velocity: Vec3,
        can_move: bool,
    ) -> Entity {
        let mut state: SystemState<CarrierStore> = SystemState::new(&mut self.world);
        let entity = state.get_mut(&mut self.world).spawn_live_with(
            kind,
            position,
            velocity,
            Lifecycle::Normal,
            can_move,
        );
        state.apply(&mut self.world);
        entity
    }

    fn count(&self, filter: impl Fn(&Carrier, &Membership) -> bool) -> usize {
        self.world
            .iter_entities()
            .filter(|entity| match (entity.get::<Carrier>(), entity.get::<Membership>()) {
                (Some(carrier), Some(membership)) => filter(carrier, membership),
                _ => false,
            })
            .count()
    }

    /// Size of the live population of `kind`.
    pub fn population(&self, kind: CarrierKind) -> usize {
        self.count(|carrier, membership| carrier.kind == kind && membership.is_live())
    }

    pub fn queue_len(&self, queue: Membership) -> usize {
        self.count(|_, membership| *membership == queue)
    }

    pub fn queue_len_of(&self, queue: Membership, kind: CarrierKind) -> usize {
        self.count(|carrier, membership| carrier.kind == kind && *membership == queue)
    }

    pub fn carriers(&self) -> Vec<CarrierSnapshot> {
        self.world
            .iter_entities()
            .filter_map(|entity| {
                let carrier = entity.get::<Carrier>()?;
                Some(CarrierSnapshot {
                    entity: entity.id(),
                    kind: carrier.kind,
                    serial: carrier.serial,
                    lifecycle: carrier.lifecycle,
                    membership: *entity.get::<Membership>()?,
                    position: entity.get::<Position>()?.0,
                    velocity: entity.get::<Velocity>().map(|v| v.0),
                    can_move: carrier.can_move,
                    crossed: carrier.crossed,
                })
            })
            .collect()
    }

    pub fn statistics(&self) -> &JunctionStatistics {
        self.world.resource::<JunctionStatistics>()
    }

    pub fn time(&self) -> &SimulationTime {
        self.world.resource::<SimulationTime>()
    }

    /// Bias used by the most recent frame.
    pub fn voltage(&self) -> f32 {
        self.world.resource::<JunctionState>().voltage
    }

    pub fn half_width(&self) -> f32 {
        self.world.resource::<JunctionState>().half_width
    }

    pub fn battery_latched(&self) -> bool {
        self.world.resource::<BatteryLatch>().added
    }

    pub fn config(&self) -> &JunctionConfig {
        self.world.resource::<JunctionConfig>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::HeadlessScene;

    fn seeded(seed: u64) -> JunctionConfig {
        JunctionConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_batches() {
        let scene = HeadlessScene::new();
        let sim = Simulation::new(seeded(1), scene.clone(), NoExchange, FixedBias(0.0)).unwrap();

        assert_eq!(sim.population(CarrierKind::Electron), 50);
        assert_eq!(sim.population(CarrierKind::Hole), 50);
        assert_eq!(scene.live_count(), 100);
        for carrier in sim.carriers() {
            match carrier.kind {
                CarrierKind::Electron => assert!(carrier.position.x >= 2.0),
                CarrierKind::Hole => assert!(carrier.position.x <= -2.0),
            }
            assert_eq!(carrier.lifecycle, Lifecycle::Normal);
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = JunctionConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(Simulation::new(config, HeadlessScene::new(), NoExchange, FixedBias(0.0)).is_err());
    }

    #[test]
    fn test_narrow_box_rejected_before_populating() {
        let narrow = JunctionConfig {
            box_size: Vec3::new(5.0, 10.0, 10.0),
            ..seeded(2)
        };
        assert!(Simulation::new(narrow, HeadlessScene::new(), NoExchange, FixedBias(0.0)).is_err());

        let tight = JunctionConfig {
            box_size: Vec3::new(6.5, 10.0, 10.0),
            ..seeded(2)
        };
        let sim = Simulation::new(tight, HeadlessScene::new(), NoExchange, FixedBias(0.0)).unwrap();
        assert_eq!(sim.config().box_size.x, 6.5);
        assert_eq!(sim.population(CarrierKind::Hole), 50);
    }

    #[test]
    fn test_held_carrier_never_moves() {
        let config = JunctionConfig {
            initial_carriers: Some(0),
            ..seeded(3)
        };
        let mut sim = Simulation::new(config, HeadlessScene::new(), NoExchange, FixedBias(-1.0)).unwrap();
        let start = Vec3::new(60.0, 10.0, -5.0);
        let held = sim.insert_carrier(CarrierKind::Electron, start, Vec3::new(3.0, 0.0, 0.0), false);

        for _ in 0..500 {
            sim.step(1.0 / 60.0);
            assert_eq!(sim.world().get::<Position>(held).unwrap().0, start);
        }
    }

    #[test]
    fn test_speed_stays_clamped() {
        let config = JunctionConfig {
            initial_carriers: Some(5),
            ..seeded(4)
        };
        let mut sim = Simulation::new(config, HeadlessScene::new(), NoExchange, FixedBias(-1.4)).unwrap();
        sim.insert_carrier(CarrierKind::Hole, Vec3::new(-10.0, 0.0, 0.0), Vec3::ZERO, true);
        sim.insert_carrier(CarrierKind::Electron, Vec3::new(10.0, 0.0, 0.0), Vec3::splat(100.0), true);

        for _ in 0..300 {
            sim.step(1.0 / 60.0);
            for carrier in sim.carriers().iter().filter(|c| c.membership.is_live()) {
                let speed = carrier.velocity.unwrap().length();
                assert!(speed >= 1e-6 * 0.999 && speed <= 30.0 * 1.001, "speed {speed}");
            }
        }
    }

    #[test]
    fn test_bias_read_once_per_frame() {
        let control = BiasControl::new(0.0);
        let mut sim = Simulation::new(seeded(5), HeadlessScene::new(), NoExchange, control.clone()).unwrap();
        let zero_bias_width = sim.half_width();

        control.set(-1.0);
        assert_eq!(sim.voltage(), 0.0);
        sim.step(1.0 / 60.0);
        assert_eq!(sim.voltage(), -1.0);
        assert!(sim.half_width() > zero_bias_width);

        control.set(9.0);
        sim.step(1.0 / 60.0);
        assert_eq!(sim.voltage(), 0.4);
        assert!(sim.half_width().is_finite());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = || {
            let config = seeded(99);
            let exchange = IntervalExchange::from_config(&config);
            let mut sim = Simulation::new(config, HeadlessScene::new(), exchange, FixedBias(-0.6)).unwrap();
            for _ in 0..240 {
                sim.step(1.0 / 60.0);
            }
            let mut carriers: Vec<(u32, Vec3)> =
                sim.carriers().iter().map(|c| (c.serial, c.position)).collect();
            carriers.sort_by_key(|(serial, _)| *serial);
            carriers
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_render_handles_track_carriers() {
        let scene = HeadlessScene::new();
        let config = seeded(6);
        let exchange = IntervalExchange::from_config(&config);
        let control = BiasControl::new(-1.2);
        let mut sim = Simulation::new(config, scene.clone(), exchange, control.clone()).unwrap();

        for frame in 0..1200 {
            if frame == 600 {
                control.set(0.3);
            }
            sim.step(1.0 / 60.0);
            assert_eq!(scene.live_count(), sim.carriers().len());
        }
        assert_eq!(scene.double_releases(), 0);
        let stats = sim.statistics();
        assert!(stats.generated_pairs >= 8);
        for kind in CarrierKind::ALL {
            assert_eq!(stats.live(kind), sim.population(kind));
        }
        assert_eq!(
            stats.live_electrons + stats.live_holes + stats.extraction_queue + stats.injection_queue,
            sim.carriers().len()
        );
    }
}
