use bevy_ecs::prelude::*;

/// Simulation clock. Advanced by the host once per frame; the core never
/// reads a wall clock.
#[derive(Resource, Debug, Default)]
pub struct SimulationTime {
    /// Elapsed time (milliseconds)
    pub now_ms: f64,
    /// Delta time for this frame (seconds)
    pub delta_seconds: f32,
    pub frame: u64,
}

impl SimulationTime {
    pub fn tick(&mut self, delta: f32) {
        self.delta_seconds = delta;
        self.now_ms += delta as f64 * 1000.0;
        self.frame += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_accumulates_milliseconds() {
        let mut time = SimulationTime::default();
        time.tick(0.5);
        time.tick(0.25);
        assert_eq!(time.now_ms, 750.0);
        assert_eq!(time.delta_seconds, 0.25);
        assert_eq!(time.frame, 2);
    }
}
