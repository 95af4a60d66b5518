use glam::Vec2;

use super::fill_body;
use crate::api::{Behavior, RenderSink, Rgba, TickContext};
use crate::entity::{Body, Entity, VariantState};
use crate::types::{Bounds, CollisionData};

pub const DEFAULT_COLOR: Rgba = [0x8B, 0x45, 0x13, 0xFF];
const DETAIL_COLOR: Rgba = [0x65, 0x43, 0x21, 0xFF];

/// Closer than this the obstacle keeps its current facing.
const FACE_DISTANCE: f32 = 50.0;
/// Upward speed given to an actor landing on top.
pub const BOUNCE_SPEED: f32 = 160.0;

/// Stationary creature that turns to watch the actor.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub color: Rgba,
    chasing: bool,
}

impl Obstacle {
    pub fn new(color: Rgba) -> Self {
        Self { color, chasing: false }
    }

    pub fn is_chasing(&self) -> bool {
        self.chasing
    }

    /// Actor is above the obstacle's upper quarter and moving down.
    pub fn can_bounce(obstacle: &Body, actor: &Body) -> bool {
        actor.pos.y < obstacle.pos.y - obstacle.half_extents.y * 0.5 && actor.vel.y > 0.0
    }

    pub(crate) fn state(&self) -> VariantState {
        VariantState::Obstacle { chasing: self.chasing }
    }

    pub(crate) fn restore(&mut self, state: &VariantState) {
        if let VariantState::Obstacle { chasing } = state {
            self.chasing = *chasing;
        }
    }
}

impl Default for Obstacle {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR)
    }
}

/// Type-pair callback for (actor, obstacle): an actor coming down on top is
/// placed on the obstacle and launched upward.
pub fn bounce_actor_off(actor: &mut Entity, obstacle: &mut Entity, _data: &CollisionData) {
    if !Obstacle::can_bounce(obstacle.body(), actor.body()) {
        return;
    }
    let top = obstacle.body().pos.y - obstacle.body().half_extents.y;
    let body = actor.body_mut();
    body.vel.y = -BOUNCE_SPEED;
    body.pos.y = top - body.half_extents.y;
}

impl Behavior for Obstacle {
    fn update(&mut self, body: &mut Body, ctx: &mut TickContext<'_>) {
        if let Some(actor) = ctx.actor_pos {
            let dx = actor.x - body.pos.x;
            if dx.abs() > FACE_DISTANCE {
                body.facing = dx.signum();
            }
        }
    }

    fn render(&self, body: &Body, camera: Vec2, sink: &mut dyn RenderSink) {
        fill_body(body, camera, self.color, sink);
        let b = body.bounds().offset(camera);
        let head_x = b.center_x + body.facing * 12.5;
        sink.fill_rect(Bounds::from_center(Vec2::new(head_x, b.top + 2.5), Vec2::splat(7.5)), DETAIL_COLOR);
        let tail_x = if body.facing > 0.0 { b.left } else { b.right };
        sink.fill_rect(Bounds::from_center(Vec2::new(tail_x, b.top + 6.5), Vec2::new(3.0, 1.5)), DETAIL_COLOR);
    }
}
