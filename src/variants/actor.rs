use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::fill_body;
use crate::api::{Behavior, RenderSink, Rgba, TickContext};
use crate::entity::{Body, VariantState};
use crate::grid::TileGrid;
use crate::types::*;

const COLOR: Rgba = [0xFF, 0x6B, 0x35, 0xFF];
const COLOR_INVULNERABLE: Rgba = [0xFF, 0x8C, 0x00, 0xFF];
const COLOR_FLASH: Rgba = [0xFF, 0xAA, 0xAA, 0xFF];

const ANIM_FRAME_MS: f32 = 200.0;
const ANIM_FRAMES: u8 = 4;
/// Horizontal speed above which a grounded actor counts as running.
const RUN_THRESHOLD: f32 = 10.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    Idle,
    Run,
    Jump,
    Fall,
}

/// The controllable actor: intent-driven walking and jumping, health,
/// invulnerability after a hit and delayed respawn at its spawn point.
#[derive(Clone, Debug, PartialEq)]
pub struct Actor {
    pub tuning: ActorTuning,
    /// Latest input intent. Written by the manager between ticks.
    pub intent: Intent,
    health: i32,
    grounded: bool,
    dead: bool,
    /// Remaining invulnerability; zero when vulnerable.
    invulnerable_ms: f32,
    respawn_in_ms: Option<f32>,
    spawn_point: Vec2,
    animation: Animation,
    anim_frame: u8,
    anim_timer: f32,
}

impl Actor {
    pub fn new(spawn_point: Vec2, tuning: ActorTuning) -> Self {
        Self {
            tuning,
            intent: Intent::default(),
            health: tuning.max_health,
            grounded: false,
            dead: false,
            invulnerable_ms: 0.0,
            respawn_in_ms: None,
            spawn_point,
            animation: Animation::Idle,
            anim_frame: 0,
            anim_timer: 0.0,
        }
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_ms > 0.0
    }

    pub fn respawn_in_ms(&self) -> Option<f32> {
        self.respawn_in_ms
    }

    pub fn spawn_point(&self) -> Vec2 {
        self.spawn_point
    }

    pub fn set_spawn_point(&mut self, p: Vec2) {
        self.spawn_point = p;
    }

    pub fn animation(&self) -> Animation {
        self.animation
    }

    pub fn anim_frame(&self) -> u8 {
        self.anim_frame
    }

    /// Solid tile one unit below the feet under the left edge, center or right edge.
    pub fn probe_grounded(body: &Body, grid: &TileGrid) -> bool {
        let b = body.bounds();
        let row = grid.row_of(b.bottom + 1.0);
        [body.pos.x, b.left, b.right]
            .into_iter()
            .any(|x| grid.is_solid(grid.col_of(x), row))
    }

    /// Take one point of damage unless dead or invulnerable. Returns whether it landed.
    pub fn hurt(&mut self, body: &Body, events: &mut Vec<SimEvent>) -> bool {
        if self.dead || self.is_invulnerable() {
            return false;
        }
        self.health -= 1;
        self.invulnerable_ms = self.tuning.invulnerability_ms;
        events.push(SimEvent::ActorHurt { id: body.id(), health: self.health });
        if self.health <= 0 {
            self.die(body, events);
        }
        true
    }

    /// Start the respawn countdown. No-op while already dead.
    pub fn die(&mut self, body: &Body, events: &mut Vec<SimEvent>) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.respawn_in_ms = Some(self.tuning.respawn_delay_ms);
        events.push(SimEvent::ActorDied { id: body.id() });
        log::debug!("actor {} died, respawn in {}ms", body.id(), self.tuning.respawn_delay_ms);
    }

    /// Back at the spawn point with full health, zero velocity and a fresh
    /// invulnerability window.
    pub fn respawn(&mut self, body: &mut Body, events: &mut Vec<SimEvent>) {
        body.pos = self.spawn_point;
        body.vel = Vec2::ZERO;
        self.dead = false;
        self.respawn_in_ms = None;
        self.grounded = false;
        self.health = self.tuning.max_health;
        self.invulnerable_ms = self.tuning.invulnerability_ms;
        events.push(SimEvent::ActorRespawned { id: body.id() });
    }

    fn apply_intent(&mut self, body: &mut Body, dt_ms: f32) {
        let t = self.tuning;
        let dt = dt_ms / 1000.0;
        if self.intent.left {
            body.vel.x = (body.vel.x - t.acceleration * dt).max(-t.walk_speed);
            body.facing = -1.0;
        } else if self.intent.right {
            body.vel.x = (body.vel.x + t.acceleration * dt).min(t.walk_speed);
            body.facing = 1.0;
        } else {
            body.vel.x *= t.friction.powf(dt_ms / 16.0);
        }

        if self.grounded && (self.intent.jump || self.intent.jump_buffered) {
            body.vel.y = -t.jump_power;
            self.grounded = false;
            self.intent.jump_buffered = false;
        }
        // Releasing jump while rising cuts the jump short
        if !self.intent.jump && body.vel.y < 0.0 {
            body.vel.y *= 0.5;
        }
    }

    fn animate(&mut self, vel: Vec2, dt_ms: f32) {
        self.anim_timer += dt_ms;
        if self.anim_timer > ANIM_FRAME_MS {
            self.anim_frame = (self.anim_frame + 1) % ANIM_FRAMES;
            self.anim_timer = 0.0;
        }
        self.animation = if !self.grounded {
            if vel.y < 0.0 { Animation::Jump } else { Animation::Fall }
        } else if vel.x.abs() > RUN_THRESHOLD {
            Animation::Run
        } else {
            Animation::Idle
        };
    }

    pub(crate) fn state(&self) -> VariantState {
        VariantState::Actor {
            health: self.health,
            grounded: self.grounded,
            dead: self.dead,
            respawn_in_ms: self.respawn_in_ms,
            invulnerable_ms: self.invulnerable_ms,
            spawn_point: self.spawn_point,
        }
    }

    pub(crate) fn restore(&mut self, state: &VariantState) {
        if let VariantState::Actor { health, grounded, dead, respawn_in_ms, invulnerable_ms, spawn_point } = state {
            self.health = *health;
            self.grounded = *grounded;
            self.dead = *dead;
            self.respawn_in_ms = *respawn_in_ms;
            self.invulnerable_ms = *invulnerable_ms;
            self.spawn_point = *spawn_point;
        }
    }
}

impl Behavior for Actor {
    fn update(&mut self, body: &mut Body, ctx: &mut TickContext<'_>) {
        if self.dead {
            if let Some(left) = self.respawn_in_ms {
                let left = left - ctx.dt_ms;
                if left <= 0.0 {
                    self.respawn(body, ctx.events);
                } else {
                    self.respawn_in_ms = Some(left);
                }
            }
            return;
        }

        self.grounded = Self::probe_grounded(body, ctx.grid);
        self.apply_intent(body, ctx.dt_ms);

        let dt = ctx.dt_secs();
        if !self.grounded {
            body.vel.y = (body.vel.y + ctx.physics.gravity * dt).min(ctx.physics.max_fall_speed);
        }
        body.pos += body.vel * dt;

        if self.invulnerable_ms > 0.0 {
            self.invulnerable_ms = (self.invulnerable_ms - ctx.dt_ms).max(0.0);
        }
        self.animate(body.vel, ctx.dt_ms);
    }

    fn render(&self, body: &Body, camera: Vec2, sink: &mut dyn RenderSink) {
        let color = if !self.is_invulnerable() {
            COLOR
        } else if (self.invulnerable_ms / 100.0) as u32 % 2 == 1 {
            COLOR_FLASH
        } else {
            COLOR_INVULNERABLE
        };
        fill_body(body, camera, color, sink);
    }

    fn on_collision(&mut self, body: &mut Body, other: &Body, _data: &CollisionData, events: &mut Vec<SimEvent>) {
        if matches!(other.kind(), EntityKind::Projectile | EntityKind::Obstacle) {
            self.hurt(body, events);
        }
    }

    fn on_spawn(&mut self, _body: &mut Body) {
        self.dead = false;
        self.respawn_in_ms = None;
        self.health = self.tuning.max_health;
    }

    fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
    }

    fn on_fatal_boundary(&mut self, body: &mut Body, events: &mut Vec<SimEvent>) {
        self.die(body, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_at(x: f32, y: f32) -> Body {
        Body::new(EntityId(1), EntityKind::Actor, Vec2::new(x, y), Vec2::splat(15.0))
    }

    /// 10x30 grid with a solid floor on row 25 (y = 400).
    fn floor() -> TileGrid {
        let mut g = TileGrid::new(10, 30, 16.0).unwrap();
        for col in 0..10 {
            g.set(col, 25, 1);
        }
        g
    }

    fn step(actor: &mut Actor, body: &mut Body, grid: &TileGrid, dt_ms: f32) -> Vec<SimEvent> {
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
        actor.update(body, &mut ctx);
        events
    }

    #[test]
    fn test_walk_accelerates_and_clamps() {
        let grid = floor();
        let mut body = body_at(40.0, 385.0);
        let mut actor = Actor::new(body.pos, ActorTuning::default());
        actor.intent.right = true;
        step(&mut actor, &mut body, &grid, 16.0);
        assert!((body.vel.x - 12.8).abs() < 1e-4);
        for _ in 0..40 {
            step(&mut actor, &mut body, &grid, 16.0);
        }
        assert_eq!(body.vel.x, 200.0);
        assert_eq!(body.facing, 1.0);
        assert_eq!(actor.animation(), Animation::Run);

        actor.intent = Intent { left: true, ..Intent::default() };
        step(&mut actor, &mut body, &grid, 16.0);
        assert_eq!(body.facing, -1.0);
    }

    #[test]
    fn test_friction_without_intent() {
        let grid = floor();
        let mut body = body_at(40.0, 385.0);
        body.vel.x = 100.0;
        let mut actor = Actor::new(body.pos, ActorTuning::default());
        step(&mut actor, &mut body, &grid, 16.0);
        assert!((body.vel.x - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_jump_only_when_grounded() {
        let grid = floor();
        let mut body = body_at(40.0, 385.0);
        let mut actor = Actor::new(body.pos, ActorTuning::default());
        actor.intent.jump = true;
        step(&mut actor, &mut body, &grid, 16.0);
        assert!(body.vel.y < -300.0);
        assert!(body.pos.y < 385.0);
        assert_eq!(actor.animation(), Animation::Jump);

        // Mid-air: holding jump does not jump again
        let vy = body.vel.y;
        step(&mut actor, &mut body, &grid, 16.0);
        assert!(body.vel.y > vy);
    }

    #[test]
    fn test_buffered_jump_is_consumed_and_cut() {
        let grid = floor();
        let mut body = body_at(40.0, 385.0);
        let mut actor = Actor::new(body.pos, ActorTuning::default());
        actor.intent.jump_buffered = true;
        step(&mut actor, &mut body, &grid, 16.0);
        assert!(!actor.intent.jump_buffered);
        // -350 halved (jump not held), then gravity
        assert!((body.vel.y - (-175.0 + 700.0 * 0.016)).abs() < 1e-3);
    }

    #[test]
    fn test_hurt_invulnerability_and_death() {
        let grid = floor();
        let mut body = body_at(40.0, 385.0);
        let mut actor = Actor::new(Vec2::new(60.0, 300.0), ActorTuning::default());
        let mut events = Vec::new();

        assert!(actor.hurt(&body, &mut events));
        assert_eq!(actor.health(), 2);
        assert!(!actor.hurt(&body, &mut events));
        assert_eq!(actor.health(), 2);

        actor.invulnerable_ms = 0.0;
        actor.hurt(&body, &mut events);
        actor.invulnerable_ms = 0.0;
        actor.hurt(&body, &mut events);
        assert!(actor.is_dead());
        assert_eq!(actor.respawn_in_ms(), Some(1000.0));
        assert_eq!(
            events,
            vec![
                SimEvent::ActorHurt { id: EntityId(1), health: 2 },
                SimEvent::ActorHurt { id: EntityId(1), health: 1 },
                SimEvent::ActorHurt { id: EntityId(1), health: 0 },
                SimEvent::ActorDied { id: EntityId(1) },
            ]
        );

        // Dead actors neither move nor take damage
        body.vel = Vec2::new(50.0, 0.0);
        assert!(step(&mut actor, &mut body, &grid, 600.0).is_empty());
        assert_eq!(body.pos, Vec2::new(40.0, 385.0));
        assert!(!actor.hurt(&body, &mut events));

        let respawned = step(&mut actor, &mut body, &grid, 500.0);
        assert_eq!(respawned, vec![SimEvent::ActorRespawned { id: EntityId(1) }]);
        assert!(!actor.is_dead());
        assert_eq!(actor.health(), 3);
        assert_eq!(body.pos, Vec2::new(60.0, 300.0));
        assert_eq!(body.vel, Vec2::ZERO);
        assert!(actor.is_invulnerable());
    }

    #[test]
    fn test_die_is_guarded_while_dead() {
        let mut body = body_at(40.0, 385.0);
        let mut actor = Actor::new(body.pos, ActorTuning::default());
        let mut events = Vec::new();
        actor.on_fatal_boundary(&mut body, &mut events);
        actor.on_fatal_boundary(&mut body, &mut events);
        assert_eq!(events, vec![SimEvent::ActorDied { id: EntityId(1) }]);
    }

    #[test]
    fn test_animation_frames_advance() {
        let grid = floor();
        let mut body = body_at(40.0, 385.0);
        let mut actor = Actor::new(body.pos, ActorTuning::default());
        for _ in 0..13 {
            step(&mut actor, &mut body, &grid, 16.0);
        }
        assert_eq!(actor.anim_frame(), 1);
        assert_eq!(actor.animation(), Animation::Idle);
    }

    #[test]
    fn test_render_colors_follow_invulnerability() {
        let body = body_at(40.0, 385.0);
        let mut actor = Actor::new(body.pos, ActorTuning::default());
        let mut sink = crate::api::RecordingSink::default();
        actor.render(&body, Vec2::ZERO, &mut sink);
        actor.invulnerable_ms = 1950.0;
        actor.render(&body, Vec2::ZERO, &mut sink);
        actor.invulnerable_ms = 1850.0;
        actor.render(&body, Vec2::ZERO, &mut sink);
        let colors: Vec<Rgba> = sink.commands.iter().map(|(_, c)| *c).collect();
        assert_eq!(colors, vec![COLOR, COLOR_FLASH, COLOR_INVULNERABLE]);
    }
}
