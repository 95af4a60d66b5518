//! Entity state shared by every variant, and the variant sum type.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::{Behavior, RenderSink, TickContext};
use crate::error::StateError;
use crate::types::*;
use crate::variants::{Actor, Obstacle, Particle, Projectile, Wanderer};

/// Participation flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    /// Takes part in update and collision.
    pub active: bool,
    /// Pending removal at the start of the next tick.
    pub destroyed: bool,
    /// Takes part in the render query.
    pub visible: bool,
    /// Resolved against the tile grid.
    pub solid: bool,
    /// Takes part in entity-pair detection.
    pub collidable: bool,
    /// Generic gravity in `Body::integrate`.
    pub gravity: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self { active: true, destroyed: false, visible: true, solid: true, collidable: true, gravity: true }
    }
}

/// Kinematic and lifecycle state common to all entities.
///
/// Position is the box center; the bounding box is always recomputed from
/// `pos` and `half_extents`, never cached.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    id: EntityId,
    kind: EntityKind,
    pub pos: Vec2,
    /// Units per second.
    pub vel: Vec2,
    pub half_extents: Vec2,
    pub flags: Flags,
    /// Milliseconds since spawn.
    pub age: f32,
    /// Self-destruct once `age` exceeds this. `None` is unbounded.
    pub max_age: Option<f32>,
    /// 1.0 facing right, -1.0 facing left.
    pub facing: f32,
}

impl Body {
    pub fn new(id: EntityId, kind: EntityKind, pos: Vec2, half_extents: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            half_extents,
            flags: Flags::default(),
            age: 0.0,
            max_age: None,
            facing: 1.0,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_center(self.pos, self.half_extents)
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.pos = Vec2::new(x, y);
    }

    pub fn set_velocity(&mut self, vx: f32, vy: f32) {
        self.vel = Vec2::new(vx, vy);
    }

    /// Active and not pending removal.
    pub fn is_live(&self) -> bool {
        self.flags.active && !self.flags.destroyed
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags.destroyed
    }

    /// Both collidable, neither destroyed, and boxes strictly overlap on both axes.
    pub fn collides_with(&self, other: &Body) -> bool {
        if !self.flags.collidable || !other.flags.collidable || self.flags.destroyed || other.flags.destroyed {
            return false;
        }
        let a = self.bounds();
        let b = other.bounds();
        a.left < b.right && a.right > b.left && a.top < b.bottom && a.bottom > b.top
    }

    pub fn distance_to(&self, other: &Body) -> f32 {
        self.pos.distance(other.pos)
    }

    /// Camera-relative culling test with `margin` extra units on every side.
    pub fn is_on_screen(&self, viewport: &Rect, margin: f32) -> bool {
        let b = self.bounds();
        b.right > viewport.x - margin
            && b.left < viewport.right() + margin
            && b.bottom > viewport.y - margin
            && b.top < viewport.bottom() + margin
    }

    /// Mark for removal. Returns true on the Active -> Destroyed transition only.
    pub fn destroy(&mut self) -> bool {
        if self.flags.destroyed {
            return false;
        }
        self.flags.destroyed = true;
        self.flags.active = false;
        true
    }

    /// Generic motion step: gravity (when enabled), then position.
    pub fn integrate(&mut self, dt_ms: f32, physics: &PhysicsConfig) {
        if !self.is_live() { return; }
        let dt = dt_ms / 1000.0;
        if self.flags.gravity {
            self.vel.y = (self.vel.y + physics.gravity * dt).min(physics.max_fall_speed);
        }
        self.pos += self.vel * dt;
    }

    /// Give this body a new handle. Used when a pooled entity is reissued.
    pub(crate) fn reassign(&mut self, id: EntityId) {
        self.id = id;
    }

    /// Accumulate age; destroys the body once it is older than `max_age`.
    pub fn advance_age(&mut self, dt_ms: f32) -> bool {
        self.age += dt_ms;
        match self.max_age {
            Some(max) if self.age > max => self.destroy(),
            _ => false,
        }
    }
}

/// Variant payloads. Each implements `Behavior`.
pub enum Variant {
    Actor(Actor),
    Projectile(Projectile),
    Wanderer(Wanderer),
    Obstacle(Obstacle),
    Particle(Particle),
    Custom(Box<dyn Behavior>),
}

impl Variant {
    pub fn kind(&self) -> EntityKind {
        match self {
            Variant::Actor(_) => EntityKind::Actor,
            Variant::Projectile(_) => EntityKind::Projectile,
            Variant::Wanderer(_) => EntityKind::Wanderer,
            Variant::Obstacle(_) => EntityKind::Obstacle,
            Variant::Particle(_) => EntityKind::Particle,
            Variant::Custom(_) => EntityKind::Custom,
        }
    }

    pub fn behavior(&self) -> &dyn Behavior {
        match self {
            Variant::Actor(v) => v,
            Variant::Projectile(v) => v,
            Variant::Wanderer(v) => v,
            Variant::Obstacle(v) => v,
            Variant::Particle(v) => v,
            Variant::Custom(v) => v.as_ref(),
        }
    }

    pub fn behavior_mut(&mut self) -> &mut dyn Behavior {
        match self {
            Variant::Actor(v) => v,
            Variant::Projectile(v) => v,
            Variant::Wanderer(v) => v,
            Variant::Obstacle(v) => v,
            Variant::Particle(v) => v,
            Variant::Custom(v) => v.as_mut(),
        }
    }
}

impl std::fmt::Debug for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Actor(v) => f.debug_tuple("Actor").field(v).finish(),
            Variant::Projectile(v) => f.debug_tuple("Projectile").field(v).finish(),
            Variant::Wanderer(v) => f.debug_tuple("Wanderer").field(v).finish(),
            Variant::Obstacle(v) => f.debug_tuple("Obstacle").field(v).finish(),
            Variant::Particle(v) => f.debug_tuple("Particle").field(v).finish(),
            Variant::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One simulated actor or particle.
#[derive(Debug)]
pub struct Entity {
    body: Body,
    variant: Variant,
    destroy_hook_fired: bool,
}

impl Entity {
    /// Pair a body with its payload. The body's kind always follows the payload.
    pub fn new(mut body: Body, variant: Variant) -> Self {
        body.kind = variant.kind();
        Self { body, variant, destroy_hook_fired: false }
    }

    pub fn id(&self) -> EntityId {
        self.body.id
    }

    pub fn kind(&self) -> EntityKind {
        self.body.kind
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn variant_mut(&mut self) -> &mut Variant {
        &mut self.variant
    }

    pub fn bounds(&self) -> Bounds {
        self.body.bounds()
    }

    pub fn collides_with(&self, other: &Entity) -> bool {
        self.body.collides_with(&other.body)
    }

    pub fn is_destroyed(&self) -> bool {
        self.body.flags.destroyed
    }

    pub fn is_live(&self) -> bool {
        self.body.is_live()
    }

    pub fn as_actor(&self) -> Option<&Actor> {
        match &self.variant { Variant::Actor(a) => Some(a), _ => None }
    }

    pub fn as_actor_mut(&mut self) -> Option<&mut Actor> {
        match &mut self.variant { Variant::Actor(a) => Some(a), _ => None }
    }

    pub fn as_projectile(&self) -> Option<&Projectile> {
        match &self.variant { Variant::Projectile(p) => Some(p), _ => None }
    }

    pub fn as_wanderer(&self) -> Option<&Wanderer> {
        match &self.variant { Variant::Wanderer(w) => Some(w), _ => None }
    }

    pub fn as_obstacle(&self) -> Option<&Obstacle> {
        match &self.variant { Variant::Obstacle(o) => Some(o), _ => None }
    }

    pub fn as_particle(&self) -> Option<&Particle> {
        match &self.variant { Variant::Particle(p) => Some(p), _ => None }
    }

    pub fn as_particle_mut(&mut self) -> Option<&mut Particle> {
        match &mut self.variant { Variant::Particle(p) => Some(p), _ => None }
    }

    // --- Lifecycle ---------------------------------------------------------

    /// Mark destroyed and fire `on_destroy`. Idempotent.
    pub fn destroy(&mut self) {
        self.body.destroy();
        self.fire_destroy_hook();
    }

    /// Fire `on_destroy` if the entity is destroyed and the hook has not run yet.
    /// Covers bodies that destroyed themselves during `update`.
    pub(crate) fn fire_destroy_hook(&mut self) {
        if self.body.flags.destroyed && !self.destroy_hook_fired {
            self.destroy_hook_fired = true;
            self.variant.behavior_mut().on_destroy(&self.body);
        }
    }

    /// Destroyed -> Active: age and flags reset, `on_spawn` fired.
    pub fn spawn(&mut self) {
        self.body.flags.destroyed = false;
        self.body.flags.active = true;
        self.body.age = 0.0;
        self.destroy_hook_fired = false;
        self.variant.behavior_mut().on_spawn(&mut self.body);
    }

    // --- Behavior dispatch -------------------------------------------------

    pub fn update(&mut self, ctx: &mut TickContext<'_>) {
        self.variant.behavior_mut().update(&mut self.body, ctx);
    }

    pub fn render(&self, camera: Vec2, sink: &mut dyn RenderSink) {
        self.variant.behavior().render(&self.body, camera, sink);
    }

    pub fn on_collision(&mut self, other: &Body, data: &CollisionData, events: &mut Vec<SimEvent>) {
        self.variant.behavior_mut().on_collision(&mut self.body, other, data, events);
    }

    pub(crate) fn set_grounded(&mut self, grounded: bool) {
        self.variant.behavior_mut().set_grounded(grounded);
    }

    pub(crate) fn on_fatal_boundary(&mut self, events: &mut Vec<SimEvent>) {
        self.variant.behavior_mut().on_fatal_boundary(&mut self.body, events);
    }

    // --- Snapshots ---------------------------------------------------------

    pub fn state(&self) -> EntityState {
        let variant = match &self.variant {
            Variant::Actor(a) => a.state(),
            Variant::Projectile(p) => p.state(),
            Variant::Wanderer(w) => w.state(),
            Variant::Obstacle(o) => o.state(),
            Variant::Particle(p) => p.state(),
            Variant::Custom(_) => VariantState::Custom,
        };
        EntityState {
            id: self.body.id,
            kind: self.body.kind,
            position: self.body.pos,
            velocity: self.body.vel,
            half_extents: self.body.half_extents,
            flags: self.body.flags,
            age: self.body.age,
            max_age: self.body.max_age,
            facing: self.body.facing,
            variant,
        }
    }

    /// Restore position, velocity, flags, age and variant fields. Id and kind stay.
    pub fn restore(&mut self, state: &EntityState) -> Result<(), StateError> {
        let expected = self.kind();
        for found in [state.kind, state.variant.kind()] {
            if found != expected {
                return Err(StateError::KindMismatch { expected, found });
            }
        }
        self.body.pos = state.position;
        self.body.vel = state.velocity;
        self.body.half_extents = state.half_extents;
        self.body.flags = state.flags;
        self.body.age = state.age;
        self.body.max_age = state.max_age;
        self.body.facing = state.facing;
        match &mut self.variant {
            Variant::Actor(a) => a.restore(&state.variant),
            Variant::Projectile(p) => p.restore(&state.variant),
            Variant::Wanderer(w) => w.restore(&state.variant),
            Variant::Obstacle(o) => o.restore(&state.variant),
            Variant::Particle(p) => p.restore(&state.variant),
            Variant::Custom(_) => {}
        }
        Ok(())
    }
}

/// Serializable snapshot of one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub half_extents: Vec2,
    pub flags: Flags,
    pub age: f32,
    pub max_age: Option<f32>,
    pub facing: f32,
    pub variant: VariantState,
}

/// Variant-specific snapshot fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum VariantState {
    Actor {
        health: i32,
        grounded: bool,
        dead: bool,
        respawn_in_ms: Option<f32>,
        invulnerable_ms: f32,
        spawn_point: Vec2,
    },
    Projectile {
        bounces: u32,
    },
    Wanderer {
        caught: bool,
        direction: f32,
        move_timer: f32,
        next_turn_ms: f32,
    },
    Obstacle {
        chasing: bool,
    },
    Particle {
        life: f32,
        max_life: f32,
        alpha: f32,
    },
    Custom,
}

impl VariantState {
    pub fn kind(&self) -> EntityKind {
        match self {
            VariantState::Actor { .. } => EntityKind::Actor,
            VariantState::Projectile { .. } => EntityKind::Projectile,
            VariantState::Wanderer { .. } => EntityKind::Wanderer,
            VariantState::Obstacle { .. } => EntityKind::Obstacle,
            VariantState::Particle { .. } => EntityKind::Particle,
            VariantState::Custom => EntityKind::Custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RecordingSink;
    use crate::grid::TileGrid;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counting {
        destroyed: Rc<Cell<u32>>,
        spawned: Rc<Cell<u32>>,
    }

    impl Behavior for Counting {
        fn update(&mut self, body: &mut Body, ctx: &mut TickContext<'_>) {
            body.integrate(ctx.dt_ms, ctx.physics);
        }

        fn render(&self, body: &Body, camera: Vec2, sink: &mut dyn RenderSink) {
            sink.fill_rect(body.bounds().offset(camera), [255, 255, 255, 255]);
        }

        fn on_destroy(&mut self, _body: &Body) {
            self.destroyed.set(self.destroyed.get() + 1);
        }

        fn on_spawn(&mut self, _body: &mut Body) {
            self.spawned.set(self.spawned.get() + 1);
        }
    }

    fn custom(id: u64, pos: Vec2, half: Vec2) -> (Entity, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let destroyed = Rc::new(Cell::new(0));
        let spawned = Rc::new(Cell::new(0));
        let behavior = Counting { destroyed: destroyed.clone(), spawned: spawned.clone() };
        let body = Body::new(EntityId(id), EntityKind::Custom, pos, half);
        (Entity::new(body, Variant::Custom(Box::new(behavior))), destroyed, spawned)
    }

    #[test]
    fn test_bounds_are_pure() {
        let mut b = Body::new(EntityId(1), EntityKind::Custom, Vec2::new(10.0, 20.0), Vec2::new(4.0, 6.0));
        let first = b.bounds();
        assert_eq!(first, b.bounds());
        assert_eq!((first.left, first.right, first.top, first.bottom), (6.0, 14.0, 14.0, 26.0));
        assert_eq!((first.center_x, first.center_y), (10.0, 20.0));
        b.pos.x += 1.0;
        assert_eq!(b.bounds().left, 7.0);
    }

    #[test]
    fn test_collides_with_is_symmetric_and_strict() {
        let half = Vec2::splat(5.0);
        let a = Body::new(EntityId(1), EntityKind::Custom, Vec2::new(0.0, 0.0), half);
        let cases = [
            (Vec2::new(9.0, 0.0), true),
            (Vec2::new(10.0, 0.0), false), // edges touch
            (Vec2::new(0.0, -9.99), true),
            (Vec2::new(3.0, 10.0), false),
            (Vec2::new(-4.0, 4.0), true),
        ];
        for (pos, expected) in cases {
            let b = Body::new(EntityId(2), EntityKind::Custom, pos, half);
            assert_eq!(a.collides_with(&b), expected, "at {pos:?}");
            assert_eq!(a.collides_with(&b), b.collides_with(&a));
        }

        let mut c = Body::new(EntityId(3), EntityKind::Custom, Vec2::ZERO, half);
        c.flags.collidable = false;
        assert!(!a.collides_with(&c) && !c.collides_with(&a));
        let mut d = Body::new(EntityId(4), EntityKind::Custom, Vec2::ZERO, half);
        d.destroy();
        assert!(!a.collides_with(&d) && !d.collides_with(&a));
    }

    #[test]
    fn test_destroy_is_idempotent_and_hook_fires_once() {
        let (mut e, destroyed, spawned) = custom(1, Vec2::ZERO, Vec2::splat(8.0));
        e.destroy();
        e.destroy();
        e.fire_destroy_hook();
        assert!(e.is_destroyed());
        assert!(!e.body().flags.active);
        assert_eq!(destroyed.get(), 1);

        e.body_mut().age = 300.0;
        e.spawn();
        assert!(e.is_live());
        assert_eq!(e.body().age, 0.0);
        assert_eq!(spawned.get(), 1);

        // A body that destroys itself gets its hook on the deferred call
        e.body_mut().destroy();
        assert_eq!(destroyed.get(), 1);
        e.fire_destroy_hook();
        assert_eq!(destroyed.get(), 2);
    }

    #[test]
    fn test_integrate_clamps_fall_speed() {
        let physics = PhysicsConfig::default();
        let mut b = Body::new(EntityId(1), EntityKind::Custom, Vec2::ZERO, Vec2::splat(2.0));
        b.vel.y = 495.0;
        b.integrate(100.0, &physics);
        assert_eq!(b.vel.y, physics.max_fall_speed);
        assert!((b.pos.y - 50.0).abs() < 1e-4);

        b.flags.gravity = false;
        b.vel = Vec2::new(10.0, 0.0);
        b.integrate(100.0, &physics);
        assert_eq!(b.vel.y, 0.0);
        assert!((b.pos.x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_advance_age_respects_max_age() {
        let mut b = Body::new(EntityId(1), EntityKind::Custom, Vec2::ZERO, Vec2::splat(2.0));
        b.max_age = Some(1000.0);
        for _ in 0..10 {
            assert!(!b.advance_age(100.0));
        }
        // age == max_age is not past it
        assert!(!b.is_destroyed());
        assert!(b.advance_age(1.0));
        assert!(b.is_destroyed());
    }

    #[test]
    fn test_is_on_screen_uses_margin() {
        let view = Rect::new(0.0, 0.0, 320.0, 240.0);
        let near = Body::new(EntityId(1), EntityKind::Custom, Vec2::new(-40.0, 100.0), Vec2::splat(5.0));
        let far = Body::new(EntityId(2), EntityKind::Custom, Vec2::new(-60.0, 100.0), Vec2::splat(5.0));
        assert!(near.is_on_screen(&view, 50.0));
        assert!(!far.is_on_screen(&view, 50.0));
    }

    #[test]
    fn test_custom_entity_update_and_render() {
        let (mut e, _, _) = custom(7, Vec2::new(50.0, 50.0), Vec2::splat(8.0));
        let grid = TileGrid::empty(16.0);
        let physics = PhysicsConfig::default();
        let mut events = Vec::new();
        let mut ctx = TickContext {
            dt_ms: 100.0,
            grid: &grid,
            world: Rect::default(),
            physics: &physics,
            actor_pos: None,
            events: &mut events,
        };
        e.update(&mut ctx);
        assert!((e.body().vel.y - 70.0).abs() < 1e-4);

        let mut sink = RecordingSink::default();
        e.render(Vec2::new(10.0, 0.0), &mut sink);
        assert_eq!(sink.commands.len(), 1);
        assert_eq!(sink.commands[0].0.center_x, 40.0);
    }

    #[test]
    fn test_restore_rejects_other_kind() {
        let (mut e, _, _) = custom(1, Vec2::ZERO, Vec2::splat(1.0));
        let mut state = e.state();
        state.position = Vec2::new(3.0, 4.0);
        state.age = 12.0;
        e.restore(&state).unwrap();
        assert_eq!(e.body().pos, Vec2::new(3.0, 4.0));
        assert_eq!(e.body().age, 12.0);

        state.kind = EntityKind::Actor;
        assert_eq!(
            e.restore(&state),
            Err(StateError::KindMismatch { expected: EntityKind::Custom, found: EntityKind::Actor })
        );
    }
}
