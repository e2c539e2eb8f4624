use bevy_ecs::prelude::*;
use crate::components::{Carrier, CarrierKind, Membership};

#[derive(Resource, Default, Debug, Clone)]
pub struct JunctionStatistics {
    pub live_electrons: usize,
    pub live_holes: usize,
    pub extraction_queue: usize,
    pub injection_queue: usize,
    pub evictions: u64,
    /// Extracted carriers that finished fading out
    pub extracted: u64,
    /// Injected carriers that re-entered the junction
    pub injected: u64,
    pub generated_pairs: u64,
    pub recombinations: u64,
}

impl JunctionStatistics {
    pub fn live(&self, kind: CarrierKind) -> usize {
        match kind {
            CarrierKind::Electron => self.live_electrons,
            CarrierKind::Hole => self.live_holes,
        }
    }
}

pub fn statistics_system(
    carriers: Query<(&Carrier, &Membership)>,
    mut stats: ResMut<JunctionStatistics>,
) {
    stats.live_electrons = 0;
    stats.live_holes = 0;
    stats.extraction_queue = 0;
    stats.injection_queue = 0;

    for (carrier, membership) in carriers.iter() {
        match (membership, carrier.kind) {
            (Membership::Junction, CarrierKind::Electron) => stats.live_electrons += 1,
            (Membership::Junction, CarrierKind::Hole) => stats.live_holes += 1,
            (Membership::Extraction, _) => stats.extraction_queue += 1,
            (Membership::Injection, _) => stats.injection_queue += 1,
        }
    }
}
