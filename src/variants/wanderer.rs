use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::fill_body;
use crate::api::{Behavior, RenderSink, Rgba, TickContext};
use crate::entity::{Body, VariantState};
use crate::types::*;

pub const DEFAULT_COLOR: Rgba = [0x80, 0x80, 0x80, 0xFF];
const DETAIL_COLOR: Rgba = [0x66, 0x66, 0x66, 0xFF];

const SPEED_MIN: f32 = 30.0;
const SPEED_MAX: f32 = 70.0;
const START_SPEED: f32 = 50.0;
const TURN_MIN_MS: f32 = 2000.0;
const TURN_MAX_MS: f32 = 5000.0;
/// Wanderers never sink below this line.
pub const GROUND_Y: f32 = 350.0;
const CATCH_DISTANCE: f32 = 25.0;
const CATCH_MIN_SPEED: f32 = 50.0;
const BUMP_DISTANCE: f32 = 30.0;
const BUMP_MAX_SPEED: f32 = 10.0;

/// Small ground creature on a seeded random walk. A fast actor catches it;
/// a nearly still one only makes it turn around.
#[derive(Clone, Debug)]
pub struct Wanderer {
    pub color: Rgba,
    rng: StdRng,
    /// 1.0 right, -1.0 left.
    direction: f32,
    move_timer: f32,
    next_turn_ms: f32,
    caught: bool,
}

impl Wanderer {
    pub fn new(seed: u64, color: Rgba) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let next_turn_ms = rng.gen_range(TURN_MIN_MS..TURN_MAX_MS);
        Self { color, rng, direction: 1.0, move_timer: 0.0, next_turn_ms, caught: false }
    }

    pub fn is_caught(&self) -> bool {
        self.caught
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    /// Pick a starting direction at walking speed.
    pub fn launch(&mut self, body: &mut Body) {
        self.direction = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        body.vel = Vec2::new(self.direction * START_SPEED, 0.0);
        body.facing = self.direction;
        self.move_timer = 0.0;
    }

    fn turn(&mut self, body: &mut Body) {
        self.direction = -self.direction;
        body.vel.x = self.direction * self.rng.gen_range(SPEED_MIN..SPEED_MAX);
        body.facing = self.direction;
        self.move_timer = 0.0;
        self.next_turn_ms = self.rng.gen_range(TURN_MIN_MS..TURN_MAX_MS);
    }

    fn hide(&mut self, body: &mut Body) {
        self.caught = true;
        body.vel = Vec2::ZERO;
        body.flags.visible = false;
        body.flags.collidable = false;
    }

    pub(crate) fn state(&self) -> VariantState {
        VariantState::Wanderer {
            caught: self.caught,
            direction: self.direction,
            move_timer: self.move_timer,
            next_turn_ms: self.next_turn_ms,
        }
    }

    pub(crate) fn restore(&mut self, state: &VariantState) {
        if let VariantState::Wanderer { caught, direction, move_timer, next_turn_ms } = state {
            self.caught = *caught;
            self.direction = *direction;
            self.move_timer = *move_timer;
            self.next_turn_ms = *next_turn_ms;
        }
    }
}

impl Behavior for Wanderer {
    fn update(&mut self, body: &mut Body, ctx: &mut TickContext<'_>) {
        if !body.is_live() || self.caught {
            return;
        }
        self.move_timer += ctx.dt_ms;
        if self.move_timer > self.next_turn_ms {
            self.turn(body);
        }

        body.pos += body.vel * ctx.dt_secs();
        if body.pos.y > GROUND_Y {
            body.pos.y = GROUND_Y;
            body.vel.y = 0.0;
        }

        let world = ctx.world;
        if body.pos.x < world.x {
            body.pos.x = world.x;
            self.direction = 1.0;
            body.vel.x = body.vel.x.abs();
        } else if body.pos.x > world.right() {
            body.pos.x = world.right();
            self.direction = -1.0;
            body.vel.x = -body.vel.x.abs();
        }
        body.facing = self.direction;
    }

    fn render(&self, body: &Body, camera: Vec2, sink: &mut dyn RenderSink) {
        if self.caught {
            return;
        }
        fill_body(body, camera, self.color, sink);
        let b = body.bounds().offset(camera);
        // Ears, then a tail trailing behind
        for ear_x in [b.left + 3.5, b.right - 3.5] {
            sink.fill_rect(Bounds::from_center(Vec2::new(ear_x, b.top - 0.5), Vec2::splat(1.5)), DETAIL_COLOR);
        }
        let tail_x = if self.direction > 0.0 { b.left - 2.0 } else { b.right + 2.0 };
        sink.fill_rect(Bounds::from_center(Vec2::new(tail_x, b.top + 5.0), Vec2::new(2.0, 1.0)), DETAIL_COLOR);
    }

    fn on_collision(&mut self, body: &mut Body, other: &Body, _data: &CollisionData, events: &mut Vec<SimEvent>) {
        if self.caught || other.kind() != EntityKind::Actor {
            return;
        }
        let d = (body.pos - other.pos).abs();
        let speed = other.vel.x.abs();
        if d.x < CATCH_DISTANCE && d.y < CATCH_DISTANCE && speed > CATCH_MIN_SPEED {
            self.hide(body);
            events.push(SimEvent::WandererCaught { id: body.id(), by: other.id() });
        } else if d.x < BUMP_DISTANCE && d.y < BUMP_DISTANCE && speed < BUMP_MAX_SPEED {
            self.direction = -self.direction;
            body.vel.x = -body.vel.x;
            body.facing = self.direction;
            events.push(SimEvent::WandererBumped { id: body.id(), by: other.id() });
        }
    }

    fn on_spawn(&mut self, body: &mut Body) {
        self.caught = false;
        body.flags.visible = true;
        body.flags.collidable = true;
        self.launch(body);
    }
}
