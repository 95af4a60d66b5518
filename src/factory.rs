//! Typed construction: per-kind defaults merged with caller overrides, ids
//! handed out in increasing order, seeded variation.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::api::{Behavior, Rgba};
use crate::entity::{Body, Entity, Flags, Variant};
use crate::types::*;
use crate::variants::{self, Actor, Obstacle, Particle, Projectile, Wanderer};

/// Construction defaults for one kind.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Full width and height.
    pub size: Vec2,
    pub solid: bool,
    pub collidable: bool,
    pub gravity: bool,
    pub visible: bool,
    /// Base color. The actor picks its own colors from its state.
    pub color: Rgba,
    /// Particle lifetime in milliseconds.
    pub life: f32,
    pub fade_out: bool,
    pub shrink: bool,
}

impl Template {
    pub fn for_kind(kind: EntityKind) -> Self {
        let base = Template {
            size: Vec2::splat(16.0),
            solid: false,
            collidable: true,
            gravity: false,
            visible: true,
            color: [0xFF; 4],
            life: variants::particle::DEFAULT_LIFE_MS,
            fade_out: true,
            shrink: false,
        };
        match kind {
            EntityKind::Actor => Template { size: Vec2::new(30.0, 30.0), solid: true, ..base },
            EntityKind::Projectile => {
                Template { size: Vec2::new(12.0, 12.0), color: variants::projectile::DEFAULT_COLOR, ..base }
            }
            EntityKind::Wanderer => {
                Template { size: Vec2::new(16.0, 12.0), color: variants::wanderer::DEFAULT_COLOR, ..base }
            }
            EntityKind::Obstacle => {
                Template { size: Vec2::new(40.0, 30.0), color: variants::obstacle::DEFAULT_COLOR, ..base }
            }
            EntityKind::Particle => Template {
                size: Vec2::new(4.0, 4.0),
                collidable: false,
                gravity: true,
                color: variants::particle::DEFAULT_COLOR,
                ..base
            },
            EntityKind::Custom => Template { solid: true, gravity: true, ..base },
        }
    }

    fn flags(&self) -> Flags {
        Flags {
            visible: self.visible,
            solid: self.solid,
            collidable: self.collidable,
            gravity: self.gravity,
            ..Flags::default()
        }
    }
}

/// Caller-supplied values that win over the kind's template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub size: Option<Vec2>,
    pub solid: Option<bool>,
    pub collidable: Option<bool>,
    pub gravity: Option<bool>,
    pub visible: Option<bool>,
    pub color: Option<Rgba>,
    pub life: Option<f32>,
    pub fade_out: Option<bool>,
    pub shrink: Option<bool>,
    pub max_age: Option<f32>,
    /// Actor only.
    pub max_health: Option<i32>,
}

impl Overrides {
    pub fn apply(&self, base: &Template) -> Template {
        Template {
            size: self.size.unwrap_or(base.size),
            solid: self.solid.unwrap_or(base.solid),
            collidable: self.collidable.unwrap_or(base.collidable),
            gravity: self.gravity.unwrap_or(base.gravity),
            visible: self.visible.unwrap_or(base.visible),
            color: self.color.unwrap_or(base.color),
            life: self.life.unwrap_or(base.life),
            fade_out: self.fade_out.unwrap_or(base.fade_out),
            shrink: self.shrink.unwrap_or(base.shrink),
        }
    }
}

/// Shape of a particle burst.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Burst {
    pub speed: f32,
    /// Up to this much extra speed per particle.
    pub speed_variation: f32,
    pub life: f32,
    pub life_variation: f32,
    /// Cone width for sprays, in radians.
    pub spread: f32,
    pub color: Option<Rgba>,
    pub fade_out: bool,
    pub shrink: bool,
}

impl Default for Burst {
    fn default() -> Self {
        Self {
            speed: 100.0,
            speed_variation: 50.0,
            life: 500.0,
            life_variation: 200.0,
            spread: PI / 3.0,
            color: None,
            fade_out: true,
            shrink: false,
        }
    }
}

/// Spawn positions used by `EntityFactory::wanderers`.
const WANDERER_SPOTS: [(f32, f32); 8] = [
    (200.0, 350.0),
    (350.0, 350.0),
    (500.0, 350.0),
    (180.0, 300.0),
    (320.0, 280.0),
    (450.0, 250.0),
    (600.0, 350.0),
    (700.0, 350.0),
];

#[derive(Debug)]
pub struct EntityFactory {
    next_id: u64,
    seed: u64,
    rng: StdRng,
    templates: [Template; EntityKind::COUNT],
    tuning: ActorTuning,
    built: [usize; EntityKind::COUNT],
}

impl EntityFactory {
    pub fn new(seed: u64, tuning: ActorTuning) -> Self {
        Self {
            next_id: 1,
            seed,
            rng: StdRng::seed_from_u64(seed),
            templates: EntityKind::ALL.map(Template::for_kind),
            tuning,
            built: [0; EntityKind::COUNT],
        }
    }

    pub fn from_config(cfg: &SimConfig) -> Self {
        Self::new(cfg.seed, cfg.actor)
    }

    /// Hand out the next id. Ids only ever increase until `reset_ids`.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn peek_next_id(&self) -> EntityId {
        EntityId(self.next_id)
    }

    pub fn reset_ids(&mut self) {
        self.next_id = 1;
    }

    /// Restart the random stream.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn template(&self, kind: EntityKind) -> &Template {
        &self.templates[kind.index()]
    }

    /// Fold `overrides` into the kind's defaults for every later build.
    pub fn set_defaults(&mut self, kind: EntityKind, overrides: &Overrides) {
        let t = &mut self.templates[kind.index()];
        *t = overrides.apply(t);
    }

    pub fn actor_tuning(&self) -> &ActorTuning {
        &self.tuning
    }

    pub fn stats(&self) -> FactoryStats {
        FactoryStats { next_id: self.next_id, built: self.built }
    }

    fn body(&mut self, kind: EntityKind, pos: Vec2, t: &Template, o: &Overrides) -> Body {
        let mut body = Body::new(self.next_id(), kind, pos, t.size * 0.5);
        body.flags = t.flags();
        body.max_age = o.max_age;
        body
    }

    fn finish(&mut self, body: Body, variant: Variant) -> Entity {
        self.built[variant.kind().index()] += 1;
        Entity::new(body, variant)
    }

    /// The actor, with its spawn point at `pos`.
    pub fn actor(&mut self, pos: Vec2, o: &Overrides) -> Entity {
        let t = o.apply(self.template(EntityKind::Actor));
        let mut tuning = self.tuning;
        if let Some(h) = o.max_health {
            tuning.max_health = h;
        }
        let body = self.body(EntityKind::Actor, pos, &t, o);
        self.finish(body, Variant::Actor(Actor::new(pos, tuning)))
    }

    pub fn projectile(&mut self, pos: Vec2, vel: Vec2, o: &Overrides) -> Entity {
        let t = o.apply(self.template(EntityKind::Projectile));
        let mut body = self.body(EntityKind::Projectile, pos, &t, o);
        body.vel = vel;
        self.finish(body, Variant::Projectile(Projectile::new(t.color)))
    }

    /// A row of projectiles across the top of the level with random drift.
    pub fn projectiles(&mut self, count: usize, o: &Overrides) -> Vec<Entity> {
        (0..count)
            .map(|i| {
                let pos = Vec2::new(200.0 + i as f32 * 200.0, 100.0);
                let vx = (self.rng.r#gen::<f32>() - 0.5) * 100.0;
                self.projectile(pos, Vec2::new(vx, 0.0), o)
            })
            .collect()
    }

    pub fn wanderer(&mut self, pos: Vec2, o: &Overrides) -> Entity {
        let t = o.apply(self.template(EntityKind::Wanderer));
        let mut body = self.body(EntityKind::Wanderer, pos, &t, o);
        let mut wanderer = Wanderer::new(self.seed ^ body.id().0, t.color);
        wanderer.launch(&mut body);
        self.finish(body, Variant::Wanderer(wanderer))
    }

    /// The standard set of eight wanderers.
    pub fn wanderers(&mut self, o: &Overrides) -> Vec<Entity> {
        WANDERER_SPOTS.iter().map(|&(x, y)| self.wanderer(Vec2::new(x, y), o)).collect()
    }

    pub fn obstacle(&mut self, pos: Vec2, o: &Overrides) -> Entity {
        let t = o.apply(self.template(EntityKind::Obstacle));
        let body = self.body(EntityKind::Obstacle, pos, &t, o);
        self.finish(body, Variant::Obstacle(Obstacle::new(t.color)))
    }

    /// A particle. Without `vel` it gets a random upward toss.
    pub fn particle(&mut self, pos: Vec2, vel: Option<Vec2>, o: &Overrides) -> Entity {
        let t = o.apply(self.template(EntityKind::Particle));
        let vel = vel.unwrap_or_else(|| self.toss());
        let mut body = self.body(EntityKind::Particle, pos, &t, o);
        body.vel = vel;
        let mut particle = Particle::new(t.life, t.color, t.size * 0.5);
        particle.fade_out = t.fade_out;
        particle.shrink = t.shrink;
        self.finish(body, Variant::Particle(particle))
    }

    /// Reissue a pooled particle exactly as `particle` would build it, under a fresh id.
    /// Returns false for anything that is not a particle.
    pub fn reset_particle(&mut self, entity: &mut Entity, pos: Vec2, vel: Option<Vec2>, o: &Overrides) -> bool {
        if entity.kind() != EntityKind::Particle {
            return false;
        }
        let t = o.apply(self.template(EntityKind::Particle));
        let vel = vel.unwrap_or_else(|| self.toss());
        let id = self.next_id();
        if let Variant::Particle(p) = entity.variant_mut() {
            p.reset(t.life, t.color, t.size * 0.5);
            p.fade_out = t.fade_out;
            p.shrink = t.shrink;
        }
        let body = entity.body_mut();
        body.reassign(id);
        body.pos = pos;
        body.vel = vel;
        body.half_extents = t.size * 0.5;
        body.flags = t.flags();
        body.max_age = o.max_age;
        body.facing = 1.0;
        entity.spawn();
        self.built[EntityKind::Particle.index()] += 1;
        true
    }

    /// Caller-supplied behavior under the `Custom` kind.
    pub fn custom(&mut self, pos: Vec2, half_extents: Vec2, behavior: Box<dyn Behavior>) -> Entity {
        let t = *self.template(EntityKind::Custom);
        let mut body = self.body(EntityKind::Custom, pos, &t, &Overrides::default());
        body.half_extents = half_extents;
        self.finish(body, Variant::Custom(behavior))
    }

    /// Build any built-in kind with its defaults. `Custom` needs a behavior and yields `None`.
    pub fn build(&mut self, kind: EntityKind, pos: Vec2, o: &Overrides) -> Option<Entity> {
        match kind {
            EntityKind::Actor => Some(self.actor(pos, o)),
            EntityKind::Projectile => Some(self.projectile(pos, Vec2::ZERO, o)),
            EntityKind::Wanderer => Some(self.wanderer(pos, o)),
            EntityKind::Obstacle => Some(self.obstacle(pos, o)),
            EntityKind::Particle => Some(self.particle(pos, None, o)),
            EntityKind::Custom => {
                log::warn!("custom entities need a behavior; use EntityFactory::custom");
                None
            }
        }
    }

    /// Velocities and per-particle overrides for `count` particles spread evenly around a circle.
    pub fn explosion_plan(&mut self, count: usize, burst: &Burst) -> Vec<(Vec2, Overrides)> {
        (0..count)
            .map(|i| {
                let angle = TAU / count as f32 * i as f32;
                self.burst_particle(angle, burst)
            })
            .collect()
    }

    /// Like `explosion_plan`, but fanned across `burst.spread` around `direction` (radians).
    pub fn spray_plan(&mut self, direction: f32, count: usize, burst: &Burst) -> Vec<(Vec2, Overrides)> {
        let base = direction - burst.spread / 2.0;
        (0..count)
            .map(|i| {
                let jitter = (self.rng.r#gen::<f32>() - 0.5) * 0.2;
                let angle = base + burst.spread / count as f32 * i as f32 + jitter;
                self.burst_particle(angle, burst)
            })
            .collect()
    }

    pub fn explosion(&mut self, pos: Vec2, count: usize, burst: &Burst) -> Vec<Entity> {
        self.explosion_plan(count, burst)
            .into_iter()
            .map(|(vel, o)| self.particle(pos, Some(vel), &o))
            .collect()
    }

    pub fn spray(&mut self, pos: Vec2, direction: f32, count: usize, burst: &Burst) -> Vec<Entity> {
        self.spray_plan(direction, count, burst)
            .into_iter()
            .map(|(vel, o)| self.particle(pos, Some(vel), &o))
            .collect()
    }

    fn burst_particle(&mut self, angle: f32, burst: &Burst) -> (Vec2, Overrides) {
        let speed = burst.speed + self.rng.r#gen::<f32>() * burst.speed_variation;
        let life = burst.life + self.rng.r#gen::<f32>() * burst.life_variation;
        let o = Overrides {
            life: Some(life),
            color: burst.color,
            fade_out: Some(burst.fade_out),
            shrink: Some(burst.shrink),
            ..Overrides::default()
        };
        (Vec2::from_angle(angle) * speed, o)
    }

    /// Default particle velocity: sideways jitter and an upward kick.
    fn toss(&mut self) -> Vec2 {
        let vx = (self.rng.r#gen::<f32>() - 0.5) * 200.0;
        let vy = -self.rng.r#gen::<f32>() * 100.0 - 50.0;
        Vec2::new(vx, vy)
    }
}
