//! Built-in entity variants.

pub mod actor;
pub mod obstacle;
pub mod particle;
pub mod projectile;
pub mod wanderer;

pub use actor::{Actor, Animation};
pub use obstacle::{bounce_actor_off, Obstacle};
pub use particle::Particle;
pub use projectile::Projectile;
pub use wanderer::Wanderer;

use glam::Vec2;

use crate::api::{RenderSink, Rgba};
use crate::entity::Body;

/// Draw the body's box in screen space.
pub(crate) fn fill_body(body: &Body, camera: Vec2, color: Rgba, sink: &mut dyn RenderSink) {
    sink.fill_rect(body.bounds().offset(camera), color);
}
