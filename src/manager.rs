//! Entity lifecycle manager: owns every entity and sequences each tick as
//! cleanup, ordered update, then physics.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use glam::Vec2;

use crate::api::{Behavior, NarrowphaseApi, RenderSink, TickContext};
use crate::entity::{Entity, EntityState};
use crate::error::{ConfigError, LifecycleError, StateError};
use crate::factory::{Burst, EntityFactory, Overrides};
use crate::grid::TileGrid;
use crate::narrowphase::Narrowphase;
use crate::physics::PhysicsSystem;
use crate::pool::ParticlePool;
use crate::types::*;

pub struct EntityManager {
    config: SimConfig,
    entities: BTreeMap<EntityId, Entity>,
    by_kind: [BTreeSet<EntityId>; EntityKind::COUNT],
    physics: PhysicsSystem,
    factory: EntityFactory,
    pool: ParticlePool,
    update_order: PriorityTable,
    render_order: PriorityTable,
    events: Vec<SimEvent>,
    tick: u64,
    stats: ManagerStats,
}

impl EntityManager {
    /// Validate `config` and build an empty world with no level loaded.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let physics = PhysicsSystem::new(TileGrid::empty(config.tile_size), config.world);
        let factory = EntityFactory::from_config(&config);
        Ok(Self::from_parts(config, physics, factory))
    }

    pub fn from_parts(config: SimConfig, mut physics: PhysicsSystem, factory: EntityFactory) -> Self {
        physics.set_debug(config.debug_collisions);
        Self {
            pool: ParticlePool::new(config.pool_capacity),
            config,
            entities: BTreeMap::new(),
            by_kind: Default::default(),
            physics,
            factory,
            update_order: PriorityTable::update_default(),
            render_order: PriorityTable::render_default(),
            events: Vec::new(),
            tick: 0,
            stats: ManagerStats::default(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsSystem {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsSystem {
        &mut self.physics
    }

    pub fn factory(&self) -> &EntityFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut EntityFactory {
        &mut self.factory
    }

    pub fn grid(&self) -> &TileGrid {
        self.physics.grid()
    }

    /// Level change. Only between ticks.
    pub fn set_grid(&mut self, grid: TileGrid) {
        self.physics.set_grid(grid);
    }

    pub fn set_world(&mut self, world: Rect) {
        self.config.world = world;
        self.physics.set_world(world);
    }

    pub fn set_debug_collisions(&mut self, enabled: bool) {
        self.config.debug_collisions = enabled;
        self.physics.set_debug(enabled);
    }

    pub fn register_callback<F>(&mut self, a: EntityKind, b: EntityKind, callback: F)
    where
        F: FnMut(&mut Entity, &mut Entity, &CollisionData) + 'static,
    {
        self.physics.register_callback(a, b, callback);
    }

    pub fn update_order(&self) -> PriorityTable {
        self.update_order
    }

    pub fn set_update_order(&mut self, table: PriorityTable) {
        self.update_order = table;
    }

    pub fn render_order(&self) -> PriorityTable {
        self.render_order
    }

    pub fn set_render_order(&mut self, table: PriorityTable) {
        self.render_order = table;
    }

    // --- Lifecycle ---------------------------------------------------------

    pub fn add(&mut self, entity: Entity) -> Result<EntityId, LifecycleError> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            log::warn!("entity {id} already exists");
            return Err(LifecycleError::DuplicateId(id));
        }
        self.by_kind[entity.kind().index()].insert(id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Mark for removal at the start of the next tick. False for unknown ids.
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => {
                entity.destroy();
                true
            }
            None => {
                log::debug!("remove: no entity {id}");
                false
            }
        }
    }

    pub fn remove_all(&mut self) {
        for entity in self.entities.values_mut() {
            entity.destroy();
        }
    }

    /// Drop every entity, restart ids and the random stream, clear counters.
    pub fn reset(&mut self) {
        self.remove_all();
        self.cleanup();
        self.events.clear();
        self.factory.reset_ids();
        self.factory.reseed(self.config.seed);
        self.tick = 0;
        self.stats = ManagerStats::default();
    }

    /// Physically remove everything marked destroyed, firing any destroy hook
    /// not yet fired and returning particles to the pool.
    fn cleanup(&mut self) -> usize {
        let doomed: Vec<EntityId> =
            self.entities.iter().filter(|(_, e)| e.is_destroyed()).map(|(&id, _)| id).collect();
        for &id in &doomed {
            let Some(mut entity) = self.entities.remove(&id) else { continue };
            let kind = entity.kind();
            self.by_kind[kind.index()].remove(&id);
            entity.fire_destroy_hook();
            self.events.push(SimEvent::EntityRemoved { id, kind });
            if kind == EntityKind::Particle {
                self.pool.release(entity);
            }
        }
        if !doomed.is_empty() {
            log::debug!("cleanup removed {} entities", doomed.len());
        }
        doomed.len()
    }

    /// Live entities matching `keep`, stable-sorted by `table` (id order within a bucket).
    fn ordered(&self, table: PriorityTable, keep: impl Fn(&Entity) -> bool) -> Vec<EntityId> {
        let mut ids: Vec<(u8, EntityId)> = self
            .entities
            .values()
            .filter(|e| e.is_live() && keep(e))
            .map(|e| (table.get(e.kind()), e.id()))
            .collect();
        ids.sort_by_key(|&(priority, _)| priority);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Ids in the order the next tick will update them.
    pub fn update_sequence(&self) -> Vec<EntityId> {
        self.ordered(self.update_order, |_| true)
    }

    /// Advance the simulation by `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f32) {
        let timing = self.config.enable_timing;
        let t_update = if timing { Some(Instant::now()) } else { None };
        self.tick += 1;
        self.cleanup();

        let order = self.update_sequence();
        let actor_pos = self.actor().map(|a| a.body().pos);
        let mut updated = 0;
        for id in &order {
            let Some(entity) = self.entities.get_mut(id) else { continue };
            if !entity.is_live() {
                continue;
            }
            let mut ctx = TickContext {
                dt_ms,
                grid: self.physics.grid(),
                world: self.config.world,
                physics: &self.config.physics,
                actor_pos,
                events: &mut self.events,
            };
            entity.update(&mut ctx);
            entity.body_mut().advance_age(dt_ms);
            updated += 1;
        }
        let update_ms = t_update.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        let t_physics = if timing { Some(Instant::now()) } else { None };
        self.physics.process(&order, &mut self.entities, dt_ms, &mut self.events);
        let physics_ms = t_physics.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        self.stats.tick = self.tick;
        self.stats.entities_updated = updated;
        self.stats.last_update_ms = update_ms;
        self.stats.last_physics_ms = physics_ms;
        log::trace!(
            "tick {}: {} updated, {} contacts, {} events pending",
            self.tick,
            updated,
            self.physics.stats().contacts,
            self.events.len()
        );
    }

    // --- Rendering ---------------------------------------------------------

    /// Live, visible entities near `camera`, back to front.
    pub fn visible_entities(&self, camera: &Rect) -> Vec<EntityId> {
        let margin = self.config.render_margin;
        self.ordered(self.render_order, |e| e.body().flags.visible && e.body().is_on_screen(camera, margin))
    }

    /// Draw everything visible through `sink`. Returns the number of entities drawn.
    pub fn render(&mut self, camera: &Rect, sink: &mut dyn RenderSink) -> usize {
        let t = if self.config.enable_timing { Some(Instant::now()) } else { None };
        let ids = self.visible_entities(camera);
        let origin = Vec2::new(camera.x, camera.y);
        for id in &ids {
            if let Some(entity) = self.entities.get(id) {
                entity.render(origin, sink);
            }
        }
        self.stats.entities_rendered = ids.len();
        self.stats.last_render_ms = t.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);
        ids.len()
    }

    // --- Queries -----------------------------------------------------------

    /// Entity by id, `None` once it is marked destroyed.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).filter(|e| !e.is_destroyed())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id).filter(|e| !e.is_destroyed())
    }

    pub fn by_kind(&self, kind: EntityKind) -> Vec<&Entity> {
        let bucket = &self.by_kind[kind.index()];
        if bucket.is_empty() {
            log::trace!("no {kind:?} entities");
        }
        bucket.iter().filter_map(|id| self.entities.get(id)).filter(|e| e.is_live()).collect()
    }

    pub fn all_active(&self) -> Vec<&Entity> {
        self.entities.values().filter(|e| e.is_live()).collect()
    }

    /// Live entities whose box strictly overlaps `area`.
    pub fn find_in_area(&self, area: &Rect) -> Vec<&Entity> {
        self.entities.values().filter(|e| e.is_live() && area.overlaps(&e.bounds())).collect()
    }

    /// Live entities whose box contains `p`, edges included.
    pub fn find_at_point(&self, p: Vec2) -> Vec<&Entity> {
        self.entities.values().filter(|e| e.is_live() && Narrowphase::overlap_point_aabb(p, &e.bounds())).collect()
    }

    pub fn find_of_kind(&self, kind: EntityKind, predicate: impl Fn(&Entity) -> bool) -> Vec<&Entity> {
        self.by_kind(kind).into_iter().filter(|e| predicate(e)).collect()
    }

    /// Live entities, of one kind or in total.
    pub fn count(&self, kind: Option<EntityKind>) -> usize {
        match kind {
            Some(kind) => self.by_kind(kind).len(),
            None => self.entities.values().filter(|e| e.is_live()).count(),
        }
    }

    /// First live actor.
    pub fn actor(&self) -> Option<&Entity> {
        self.by_kind(EntityKind::Actor).into_iter().next()
    }

    pub fn actor_mut(&mut self) -> Option<&mut Entity> {
        let id = self.actor()?.id();
        self.entities.get_mut(&id)
    }

    pub fn stats(&self) -> ManagerStats {
        let mut stats = self.stats;
        stats.total_entities = self.entities.len();
        stats.active_entities = 0;
        stats.pending_destroy = 0;
        stats.by_kind = [0; EntityKind::COUNT];
        for e in self.entities.values() {
            if e.is_destroyed() {
                stats.pending_destroy += 1;
            } else if e.is_live() {
                stats.active_entities += 1;
                stats.by_kind[e.kind().index()] += 1;
            }
        }
        stats.collisions = self.physics.stats();
        stats.pool = self.pool.stats();
        stats
    }

    /// Events gathered since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Input and state ---------------------------------------------------

    /// Hand `intent` to every live actor. Returns how many took it.
    pub fn set_actor_intent(&mut self, intent: Intent) -> usize {
        let mut n = 0;
        for id in &self.by_kind[EntityKind::Actor.index()] {
            let Some(entity) = self.entities.get_mut(id) else { continue };
            if let (true, Some(actor)) = (entity.is_live(), entity.as_actor_mut()) {
                actor.intent = intent;
                n += 1;
            }
        }
        n
    }

    /// State of every entity not pending removal, in id order.
    pub fn snapshot(&self) -> Vec<EntityState> {
        self.entities.values().filter(|e| !e.is_destroyed()).map(Entity::state).collect()
    }

    /// Write `states` back onto the entities with matching ids. Ids with no
    /// entity are skipped. Returns how many were restored.
    pub fn restore(&mut self, states: &[EntityState]) -> Result<usize, StateError> {
        let mut restored = 0;
        for state in states {
            match self.entities.get_mut(&state.id) {
                Some(entity) if !entity.is_destroyed() => {
                    entity.restore(state)?;
                    restored += 1;
                }
                _ => log::warn!("restore: no entity {}", state.id),
            }
        }
        Ok(restored)
    }

    // --- Construction ------------------------------------------------------

    pub fn create_actor(&mut self, pos: Vec2, o: &Overrides) -> Result<EntityId, LifecycleError> {
        let entity = self.factory.actor(pos, o);
        self.add(entity)
    }

    pub fn create_projectile(&mut self, pos: Vec2, vel: Vec2, o: &Overrides) -> Result<EntityId, LifecycleError> {
        let entity = self.factory.projectile(pos, vel, o);
        self.add(entity)
    }

    pub fn create_projectiles(&mut self, count: usize, o: &Overrides) -> Result<Vec<EntityId>, LifecycleError> {
        let built = self.factory.projectiles(count, o);
        built.into_iter().map(|e| self.add(e)).collect()
    }

    pub fn create_wanderer(&mut self, pos: Vec2, o: &Overrides) -> Result<EntityId, LifecycleError> {
        let entity = self.factory.wanderer(pos, o);
        self.add(entity)
    }

    pub fn create_wanderers(&mut self, o: &Overrides) -> Result<Vec<EntityId>, LifecycleError> {
        let built = self.factory.wanderers(o);
        built.into_iter().map(|e| self.add(e)).collect()
    }

    pub fn create_obstacle(&mut self, pos: Vec2, o: &Overrides) -> Result<EntityId, LifecycleError> {
        let entity = self.factory.obstacle(pos, o);
        self.add(entity)
    }

    pub fn create_custom(
        &mut self,
        pos: Vec2,
        half_extents: Vec2,
        behavior: Box<dyn Behavior>,
    ) -> Result<EntityId, LifecycleError> {
        let entity = self.factory.custom(pos, half_extents, behavior);
        self.add(entity)
    }

    /// A particle, recycled from the pool when one is free.
    pub fn spawn_particle(&mut self, pos: Vec2, vel: Option<Vec2>, o: &Overrides) -> Result<EntityId, LifecycleError> {
        let entity = match self.pool.acquire() {
            Some(mut entity) => {
                self.factory.reset_particle(&mut entity, pos, vel, o);
                entity
            }
            None => {
                self.pool.note_created();
                self.factory.particle(pos, vel, o)
            }
        };
        self.add(entity)
    }

    pub fn spawn_explosion(&mut self, pos: Vec2, count: usize, burst: &Burst) -> Result<Vec<EntityId>, LifecycleError> {
        let plan = self.factory.explosion_plan(count, burst);
        plan.into_iter().map(|(vel, o)| self.spawn_particle(pos, Some(vel), &o)).collect()
    }

    pub fn spawn_spray(
        &mut self,
        pos: Vec2,
        direction: f32,
        count: usize,
        burst: &Burst,
    ) -> Result<Vec<EntityId>, LifecycleError> {
        let plan = self.factory.spray_plan(direction, count, burst);
        plan.into_iter().map(|(vel, o)| self.spawn_particle(pos, Some(vel), &o)).collect()
    }
}
