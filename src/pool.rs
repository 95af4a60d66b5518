use crate::entity::Entity;
use crate::types::{EntityKind, PoolStats};

/// Bounded free list of expired particles.
///
/// A particle leaves the pool on `acquire`, lives in the manager until its
/// removal, and comes back through `release`. Anything over capacity is dropped.
#[derive(Debug)]
pub struct ParticlePool {
    free: Vec<Entity>,
    capacity: usize,
    stats: PoolStats,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self { free: Vec::with_capacity(capacity), capacity, stats: PoolStats::default() }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Take a recycled particle, if any. The caller resets it before use.
    pub fn acquire(&mut self) -> Option<Entity> {
        let entity = self.free.pop()?;
        self.stats.reused += 1;
        Some(entity)
    }

    /// Count a particle built fresh because the pool was empty.
    pub fn note_created(&mut self) {
        self.stats.created += 1;
    }

    /// Return an expired particle. Returns false when it was dropped instead.
    pub fn release(&mut self, entity: Entity) -> bool {
        if entity.kind() != EntityKind::Particle {
            log::warn!("refusing to pool {:?} {}", entity.kind(), entity.id());
            return false;
        }
        if self.free.len() >= self.capacity {
            self.stats.dropped += 1;
            return false;
        }
        self.free.push(entity);
        self.stats.released += 1;
        true
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats { free: self.free.len(), ..self.stats }
    }
}
