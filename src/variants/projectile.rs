use glam::Vec2;

use super::fill_body;
use crate::api::{Behavior, RenderSink, Rgba, TickContext};
use crate::entity::{Body, VariantState};

pub const DEFAULT_COLOR: Rgba = [0xFF, 0x00, 0x00, 0xFF];

/// Bouncing projectile with its own light gravity.
#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub color: Rgba,
    bounces: u32,
}

impl Projectile {
    pub fn new(color: Rgba) -> Self {
        Self { color, bounces: 0 }
    }

    /// Tile bounces since spawn.
    pub fn bounces(&self) -> u32 {
        self.bounces
    }

    pub(crate) fn state(&self) -> VariantState {
        VariantState::Projectile { bounces: self.bounces }
    }

    pub(crate) fn restore(&mut self, state: &VariantState) {
        if let VariantState::Projectile { bounces } = state {
            self.bounces = *bounces;
        }
    }
}

impl Default for Projectile {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR)
    }
}

impl Behavior for Projectile {
    fn update(&mut self, body: &mut Body, ctx: &mut TickContext<'_>) {
        if !body.is_live() {
            return;
        }
        let dt = ctx.dt_secs();
        body.pos += body.vel * dt;
        body.vel.y += ctx.physics.projectile_gravity * dt;

        // Any solid tile under the center sends it back up
        let (col, row) = ctx.grid.cell_of(body.pos);
        if ctx.grid.is_solid(col, row) {
            body.vel.y = -body.vel.y.abs() * ctx.physics.projectile_bounce;
            body.vel.x *= ctx.physics.projectile_friction;
            self.bounces += 1;
        }

        if body.pos.x < ctx.world.x || body.pos.x > ctx.world.right() {
            body.vel.x = -body.vel.x;
        }
    }

    fn render(&self, body: &Body, camera: Vec2, sink: &mut dyn RenderSink) {
        fill_body(body, camera, self.color, sink);
    }

    fn on_spawn(&mut self, _body: &mut Body) {
        self.bounces = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileGrid;
    use crate::types::*;

    fn step(p: &mut Projectile, body: &mut Body, grid: &TileGrid, dt_ms: f32) {
        let physics = PhysicsConfig::default();
        let mut events = Vec::new();
        let mut ctx = TickContext {
            dt_ms,
            grid,
            world: Rect::default(),
            physics: &physics,
            actor_pos: None,
            events: &mut events,
        };
        p.update(body, &mut ctx);
    }

    fn body(pos: Vec2, vel: Vec2) -> Body {
        let mut b = Body::new(EntityId(3), EntityKind::Projectile, pos, Vec2::splat(6.0));
        b.vel = vel;
        b
    }

    #[test]
    fn test_flight_applies_own_gravity() {
        let grid = TileGrid::empty(16.0);
        let mut p = Projectile::default();
        let mut b = body(Vec2::new(100.0, 100.0), Vec2::new(50.0, 0.0));
        step(&mut p, &mut b, &grid, 100.0);
        assert!((b.pos.x - 105.0).abs() < 1e-4);
        assert_eq!(b.pos.y, 100.0);
        assert!((b.vel.y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_bounces_off_tile_under_center() {
        let mut grid = TileGrid::new(20, 20, 16.0).unwrap();
        grid.set(6, 7, 1);
        let mut p = Projectile::default();
        // Moves from y=110 into the tile spanning y 112..128
        let mut b = body(Vec2::new(100.0, 110.0), Vec2::new(40.0, 100.0));
        step(&mut p, &mut b, &grid, 50.0);
        assert_eq!(p.bounces(), 1);
        assert!((b.vel.y - -(110.0 * 0.8)).abs() < 1e-3);
        assert!((b.vel.x - 36.0).abs() < 1e-4);
    }

    #[test]
    fn test_reverses_past_world_edge() {
        let grid = TileGrid::empty(16.0);
        let mut p = Projectile::default();
        let mut b = body(Vec2::new(798.0, 50.0), Vec2::new(100.0, 0.0));
        step(&mut p, &mut b, &grid, 50.0);
        assert_eq!(b.vel.x, -100.0);
        let mut b = body(Vec2::new(2.0, 50.0), Vec2::new(-100.0, 0.0));
        step(&mut p, &mut b, &grid, 50.0);
        assert_eq!(b.vel.x, 100.0);
    }

    #[test]
    fn test_destroyed_projectile_does_not_move() {
        let grid = TileGrid::empty(16.0);
        let mut p = Projectile::default();
        let mut b = body(Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0));
        b.destroy();
        step(&mut p, &mut b, &grid, 100.0);
        assert_eq!(b.pos, Vec2::new(10.0, 10.0));
    }
}
