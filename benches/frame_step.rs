use criterion::{black_box, criterion_group, criterion_main, Criterion};
use junction_sim::{FixedBias, HeadlessScene, IntervalExchange, JunctionConfig, Simulation};

fn frame_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_step");

    for voltage in [-1.0_f32, 0.0, 0.3] {
        let config = JunctionConfig {
            seed: Some(42),
            ..Default::default()
        };
        let exchange = IntervalExchange::from_config(&config);
        let mut sim = match Simulation::new(config, HeadlessScene::new(), exchange, FixedBias(voltage)) {
            Ok(sim) => sim,
            Err(err) => panic!("default config rejected: {err}"),
        };

        group.bench_function(format!("bias_{voltage:+.1}"), |b| {
            b.iter(|| sim.step(black_box(1.0 / 60.0)))
        });
    }

    group.finish();
}

criterion_group!(benches, frame_step);
criterion_main!(benches);
