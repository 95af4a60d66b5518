//! Per-tick physics pass: tile/world resolution, then all-pairs detection and
//! dispatch through the kind-pair callback table.

use std::collections::BTreeMap;

use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::entity::Entity;
use crate::grid::TileGrid;
use crate::narrowphase::Narrowphase;
use crate::resolver::{clamp_to_world, resolve_tiles};
use crate::types::*;
use crate::variants::Actor;

/// Type-pair collision response. Arguments arrive in registration order.
pub type CollisionCallback = Box<dyn FnMut(&mut Entity, &mut Entity, &CollisionData)>;

#[derive(Copy, Clone, Debug)]
struct Slot {
    index: usize,
    /// Registered as (b, a): call with the arguments swapped.
    swapped: bool,
}

/// Collision engine for one level: the tile grid, the world boundary and the
/// callback table. Owned by the manager.
pub struct PhysicsSystem {
    grid: TileGrid,
    world: Rect,
    callbacks: Vec<CollisionCallback>,
    table: [[Option<Slot>; EntityKind::COUNT]; EntityKind::COUNT],
    debug: bool,
    debug_contacts: Vec<CollisionData>,
    stats: CollisionStats,
}

impl PhysicsSystem {
    pub fn new(grid: TileGrid, world: Rect) -> Self {
        let stats = CollisionStats { grid_cells: grid.cell_count(), ..Default::default() };
        Self {
            grid,
            world,
            callbacks: Vec::new(),
            table: [[None; EntityKind::COUNT]; EntityKind::COUNT],
            debug: false,
            debug_contacts: Vec::new(),
            stats,
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Swap in a new level. Only call between ticks.
    pub fn set_grid(&mut self, grid: TileGrid) {
        log::debug!("tile grid replaced: {}x{} cells of {}", grid.width(), grid.height(), grid.tile_size());
        self.stats.grid_cells = grid.cell_count();
        self.grid = grid;
    }

    pub fn world(&self) -> Rect {
        self.world
    }

    pub fn set_world(&mut self, world: Rect) {
        self.world = world;
    }

    /// Keep every contact of the last pass for inspection.
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
        if !enabled {
            self.debug_contacts.clear();
            self.stats.debug_contacts = 0;
        }
    }

    pub fn debug_contacts(&self) -> &[CollisionData] {
        &self.debug_contacts
    }

    pub fn stats(&self) -> CollisionStats {
        self.stats
    }

    /// Install `callback` for (a, b) and its mirror (b, a). Replaces any
    /// callback already installed for the pair.
    pub fn register_callback<F>(&mut self, a: EntityKind, b: EntityKind, callback: F)
    where
        F: FnMut(&mut Entity, &mut Entity, &CollisionData) + 'static,
    {
        let (ai, bi) = (a.index(), b.index());
        let index = match self.table[ai][bi].or(self.table[bi][ai]) {
            Some(slot) => {
                self.callbacks[slot.index] = Box::new(callback);
                slot.index
            }
            None => {
                self.callbacks.push(Box::new(callback));
                self.callbacks.len() - 1
            }
        };
        self.table[bi][ai] = Some(Slot { index, swapped: true });
        self.table[ai][bi] = Some(Slot { index, swapped: false });
        self.stats.callbacks_registered = self.table.iter().flatten().filter(|s| s.is_some()).count();
    }

    pub fn has_callback(&self, a: EntityKind, b: EntityKind) -> bool {
        self.table[a.index()][b.index()].is_some()
    }

    /// Overlap test for one pair: both live and collidable, boxes strictly overlapping.
    pub fn check_pair(a: &Entity, b: &Entity) -> Option<CollisionData> {
        if a.id() == b.id() || !a.is_live() || !b.is_live() || !a.collides_with(b) {
            return None;
        }
        let (overlap, contact) = Narrowphase::overlap_aabb_aabb(&a.bounds(), &b.bounds())?;
        Some(CollisionData { a: a.id(), b: b.id(), a_kind: a.kind(), b_kind: b.kind(), overlap, contact })
    }

    /// Callback for the kind pair first, then `a`'s hook, then `b`'s hook.
    pub fn dispatch(&mut self, a: &mut Entity, b: &mut Entity, data: &CollisionData, events: &mut Vec<SimEvent>) {
        if let Some(slot) = self.table[a.kind().index()][b.kind().index()] {
            let callback = &mut self.callbacks[slot.index];
            if slot.swapped {
                callback(&mut *b, &mut *a, &data.swapped());
            } else {
                callback(&mut *a, &mut *b, data);
            }
        }
        a.on_collision(b.body(), data, events);
        b.on_collision(a.body(), &data.swapped(), events);
    }

    /// Resolve every entity in `order` against the grid and the world, then
    /// test each pair once (i < j) and dispatch the overlapping ones.
    pub fn process(
        &mut self,
        order: &[EntityId],
        entities: &mut BTreeMap<EntityId, Entity>,
        dt_ms: f32,
        events: &mut Vec<SimEvent>,
    ) {
        self.debug_contacts.clear();
        self.stats.pairs_tested = 0;
        self.stats.contacts = 0;
        self.stats.tile_contacts = 0;
        self.stats.fatal_hits = 0;

        for id in order {
            let Some(entity) = entities.get_mut(id) else { continue };
            if !entity.is_live() {
                continue;
            }
            if entity.body().flags.solid {
                let contacts = resolve_tiles(entity.body_mut(), &self.grid, dt_ms);
                if contacts.ground.is_some() {
                    entity.set_grounded(true);
                }
                self.stats.tile_contacts += [contacts.ground, contacts.ceiling, contacts.left_wall, contacts.right_wall]
                    .iter()
                    .filter(|c| c.is_some())
                    .count();
            }
            let fatal = clamp_to_world(entity.body_mut(), &self.world).fatal;
            // A dead actor waiting below the world was already routed when it fell
            if fatal && !entity.as_actor().is_some_and(Actor::is_dead) {
                self.stats.fatal_hits += 1;
                log::trace!("{:?} {} crossed the bottom boundary", entity.kind(), entity.id());
                events.push(SimEvent::FatalBoundary { id: entity.id(), kind: entity.kind() });
                entity.on_fatal_boundary(events);
            }
        }

        let candidates: Vec<EntityId> = order
            .iter()
            .copied()
            .filter(|id| entities.get(id).is_some_and(|e| e.is_live() && e.body().flags.collidable))
            .collect();
        for (i, &a) in candidates.iter().enumerate() {
            for &b in &candidates[i + 1..] {
                let Some((ea, eb)) = pair_mut(entities, a, b) else { continue };
                self.stats.pairs_tested += 1;
                let Some(data) = Self::check_pair(ea, eb) else { continue };
                self.stats.contacts += 1;
                if self.debug {
                    self.debug_contacts.push(data);
                }
                self.dispatch(ea, eb, &data, events);
            }
        }
        self.stats.debug_contacts = self.debug_contacts.len();
    }

    /// First solid tile on the segment `start -> end`.
    pub fn raycast(&self, start: Vec2, end: Vec2) -> Option<TileRayHit> {
        self.grid.raycast(start, end)
    }
}

/// Two distinct entries of the map borrowed mutably at once, in argument order.
pub(crate) fn pair_mut(
    entities: &mut BTreeMap<EntityId, Entity>,
    a: EntityId,
    b: EntityId,
) -> Option<(&mut Entity, &mut Entity)> {
    if a == b {
        return None;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let mut range = entities.range_mut(lo..=hi);
    let (first_id, first) = range.next()?;
    let (last_id, last) = range.next_back()?;
    if *first_id != lo || *last_id != hi {
        return None;
    }
    Some(if a < b { (first, last) } else { (last, first) })
}
