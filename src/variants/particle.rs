use glam::Vec2;

use super::fill_body;
use crate::api::{Behavior, RenderSink, Rgba, TickContext};
use crate::entity::{Body, VariantState};

pub const DEFAULT_COLOR: Rgba = [0xFF, 0x6B, 0x35, 0xFF];
pub const DEFAULT_LIFE_MS: f32 = 500.0;

/// Short-lived visual debris. Not collidable; destroyed the tick its life runs out.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub color: Rgba,
    pub fade_out: bool,
    pub shrink: bool,
    life: f32,
    max_life: f32,
    alpha: f32,
    base_half: Vec2,
}

impl Particle {
    pub fn new(life_ms: f32, color: Rgba, base_half: Vec2) -> Self {
        Self {
            color,
            fade_out: true,
            shrink: false,
            life: life_ms,
            max_life: life_ms,
            alpha: 1.0,
            base_half,
        }
    }

    /// Remaining life in milliseconds.
    pub fn life(&self) -> f32 {
        self.life
    }

    pub fn max_life(&self) -> f32 {
        self.max_life
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn life_ratio(&self) -> f32 {
        if self.max_life > 0.0 { self.life / self.max_life } else { 0.0 }
    }

    /// Refill for reuse from the pool.
    pub fn reset(&mut self, life_ms: f32, color: Rgba, base_half: Vec2) {
        self.life = life_ms;
        self.max_life = life_ms;
        self.color = color;
        self.alpha = 1.0;
        self.base_half = base_half;
    }

    pub(crate) fn state(&self) -> VariantState {
        VariantState::Particle { life: self.life, max_life: self.max_life, alpha: self.alpha }
    }

    pub(crate) fn restore(&mut self, state: &VariantState) {
        if let VariantState::Particle { life, max_life, alpha } = state {
            self.life = *life;
            self.max_life = *max_life;
            self.alpha = *alpha;
        }
    }
}

impl Behavior for Particle {
    fn update(&mut self, body: &mut Body, ctx: &mut TickContext<'_>) {
        if !body.is_live() {
            return;
        }
        let dt = ctx.dt_secs();
        body.pos += body.vel * dt;
        body.vel.y += ctx.physics.particle_gravity * dt;

        self.life -= ctx.dt_ms;
        if self.life <= 0.0 {
            body.destroy();
            return;
        }

        let ratio = self.life_ratio();
        if self.fade_out {
            self.alpha = ratio;
        }
        if self.shrink {
            body.half_extents = self.base_half * ratio;
        }
    }

    fn render(&self, body: &Body, camera: Vec2, sink: &mut dyn RenderSink) {
        let mut color = self.color;
        if self.fade_out {
            color[3] = (f32::from(color[3]) * self.alpha.clamp(0.0, 1.0)) as u8;
        }
        fill_body(body, camera, color, sink);
    }

    fn on_spawn(&mut self, body: &mut Body) {
        body.half_extents = self.base_half;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileGrid;
    use crate::types::*;

    fn step(p: &mut Particle, body: &mut Body, dt_ms: f32) {
        let grid = TileGrid::empty(16.0);
        let physics = PhysicsConfig::default();
        let mut events = Vec::new();
        let mut ctx = TickContext {
            dt_ms,
            grid: &grid,
            world: Rect::default(),
            physics: &physics,
            actor_pos: None,
            events: &mut events,
        };
        p.update(body, &mut ctx);
    }

    fn particle(life: f32) -> (Particle, Body) {
        let body = Body::new(EntityId(5), EntityKind::Particle, Vec2::new(10.0, 10.0), Vec2::splat(2.0));
        (Particle::new(life, DEFAULT_COLOR, Vec2::splat(2.0)), body)
    }

    #[test]
    fn test_life_decreases_until_destroyed_at_zero() {
        let (mut p, mut body) = particle(100.0);
        let mut last = p.life();
        for _ in 0..4 {
            step(&mut p, &mut body, 25.0);
            assert!(p.life() < last);
            last = p.life();
            if p.life() > 0.0 {
                assert!(!body.is_destroyed());
            }
        }
        assert_eq!(p.life(), 0.0);
        assert!(body.is_destroyed());

        // Frozen once destroyed
        let pos = body.pos;
        step(&mut p, &mut body, 25.0);
        assert_eq!(p.life(), 0.0);
        assert_eq!(body.pos, pos);
    }

    #[test]
    fn test_falls_under_particle_gravity() {
        let (mut p, mut body) = particle(500.0);
        body.vel = Vec2::new(10.0, -50.0);
        step(&mut p, &mut body, 100.0);
        assert!((body.pos.x - 11.0).abs() < 1e-4);
        assert!((body.pos.y - 5.0).abs() < 1e-4);
        assert!((body.vel.y - -20.0).abs() < 1e-4);
    }

    #[test]
    fn test_fade_and_shrink_follow_life_ratio() {
        let (mut p, mut body) = particle(200.0);
        p.shrink = true;
        step(&mut p, &mut body, 50.0);
        assert!((p.alpha() - 0.75).abs() < 1e-5);
        assert!((body.half_extents.x - 1.5).abs() < 1e-5);

        let mut sink = crate::api::RecordingSink::default();
        p.render(&body, Vec2::ZERO, &mut sink);
        assert_eq!(sink.commands[0].1[3], 191);

        p.on_spawn(&mut body);
        assert_eq!(body.half_extents, Vec2::splat(2.0));
    }
}
