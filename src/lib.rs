//! tilebonk: 2D platformer simulation core (entities, tile collision, pair dispatch)

pub mod types;
pub mod error;
pub mod api;
pub mod narrowphase;
pub mod grid;
pub mod entity;
pub mod variants;
pub mod resolver;
pub mod physics;
pub mod pool;
pub mod factory;
pub mod manager;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::{ConfigError, GridError, LifecycleError, StateError};
pub use crate::grid::TileGrid;
pub use crate::entity::{Body, Entity, EntityState, Flags, Variant, VariantState};
pub use crate::variants::{bounce_actor_off, Actor, Animation, Obstacle, Particle, Projectile, Wanderer};
pub use crate::resolver::{clamp_to_world, resolve_tiles};
pub use crate::physics::{CollisionCallback, PhysicsSystem};
pub use crate::pool::ParticlePool;
pub use crate::factory::{Burst, EntityFactory, Overrides, Template};
pub use crate::manager::EntityManager;
