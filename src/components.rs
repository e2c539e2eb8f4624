use bevy_ecs::prelude::*;
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierKind {
    Electron,
    Hole,
}

impl CarrierKind {
    pub const ALL: [CarrierKind; 2] = [CarrierKind::Electron, CarrierKind::Hole];

    /// Sign applied to the depletion field acceleration.
    pub fn charge_sign(self) -> f32 {
        match self {
            CarrierKind::Electron => -1.0,
            CarrierKind::Hole => 1.0,
        }
    }

    /// Side of the junction holding this kind's battery terminal: electrons
    /// live and exit on +x, holes on -x.
    pub fn terminal_sign(self) -> f32 {
        match self {
            CarrierKind::Electron => 1.0,
            CarrierKind::Hole => -1.0,
        }
    }

    /// Whether a carrier at `x` sits past the field edge on its downstream side.
    pub fn has_crossed(self, x: f32, edge: f32) -> bool {
        match self {
            CarrierKind::Electron => x > edge,
            CarrierKind::Hole => x < -edge,
        }
    }
}

/// Informational tag; no transport rule branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Present since initialization
    Normal,
    /// Created mid-simulation (pair generation or battery re-entry)
    Generated,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Carrier {
    pub kind: CarrierKind,
    /// Stable per-carrier key, used to seed scatter noise
    pub serial: u32,
    /// Drawn once at creation
    pub speed: f32,
    pub lifecycle: Lifecycle,
    /// When false the integrator leaves the position untouched
    pub can_move: bool,
    pub crossed: bool,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Position(pub Vec3);

#[derive(Component, Debug, Clone, Copy)]
pub struct Velocity(pub Vec3);

impl Velocity {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }
    pub fn zero() -> Self {
        Self(Vec3::ZERO)
    }
    pub fn speed(&self) -> f32 {
        self.0.length()
    }
}

/// Where a carrier currently lives. A single component so a carrier is
/// never both in the junction and in a battery queue.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Live in the junction population
    Junction,
    /// Leaving through the external circuit under reverse bias
    Extraction,
    /// Travelling back toward the junction under forward bias
    Injection,
}

impl Membership {
    pub fn is_live(&self) -> bool {
        matches!(self, Membership::Junction)
    }
}

/// Opacity of a transit carrier while it fades out.
#[derive(Component, Debug, Clone, Copy)]
pub struct Opacity(pub f32);

/// Keeps a freshly generated carrier in place until `release_ms`.
#[derive(Component, Debug, Clone, Copy)]
pub struct Hold {
    pub release_ms: f64,
}
