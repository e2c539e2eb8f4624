//! PN-junction carrier transport core.
//!
//! Architecture:
//! - ECS-based (bevy_ecs): carriers are entities, queues are a membership component
//! - One chained schedule per frame, bias sampled once at the start
//! - Collaborators behind traits: scene sink, bias source, pair exchange
//! - Seeded randomness so headless runs are reproducible

pub mod battery;
pub mod bias;
pub mod components;
pub mod config;
pub mod crossing;
pub mod error;
pub mod exchange;
pub mod field;
pub mod noise;
pub mod scatter;
pub mod scene;
pub mod simulation;
pub mod stats;
pub mod store;
pub mod time;
pub mod transport;
pub mod velocity;

pub use bias::{BiasControl, BiasSource, FixedBias};
pub use components::{CarrierKind, Lifecycle, Membership};
pub use config::JunctionConfig;
pub use error::{JunctionError, Result};
pub use exchange::{IntervalExchange, NoExchange, PairExchange};
pub use scene::{HeadlessScene, RenderHandle, SceneSink};
pub use simulation::{CarrierSnapshot, Simulation};
pub use stats::JunctionStatistics;
