use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Stable entity handle. Assigned once by the factory, monotonically increasing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of entity variants. `Custom` is the bucket for caller-supplied behaviors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Actor,
    Projectile,
    Wanderer,
    Obstacle,
    Particle,
    Custom,
}

impl EntityKind {
    pub const COUNT: usize = 6;

    pub const ALL: [EntityKind; Self::COUNT] = [
        EntityKind::Actor,
        EntityKind::Projectile,
        EntityKind::Wanderer,
        EntityKind::Obstacle,
        EntityKind::Particle,
        EntityKind::Custom,
    ];

    /// Dense index for kind-keyed tables.
    pub const fn index(self) -> usize {
        match self {
            EntityKind::Actor => 0,
            EntityKind::Projectile => 1,
            EntityKind::Wanderer => 2,
            EntityKind::Obstacle => 3,
            EntityKind::Particle => 4,
            EntityKind::Custom => 5,
        }
    }
}

/// Per-kind ordering table. Lower values run (or draw) first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTable(pub [u8; EntityKind::COUNT]);

impl PriorityTable {
    /// Update order: actor, particle, projectile, wanderer, obstacle, then everything else.
    pub const fn update_default() -> Self {
        // indexed by EntityKind::index()
        Self([0, 2, 3, 4, 1, 5])
    }

    /// Render order: particles and projectiles at the back, the actor on top.
    pub const fn render_default() -> Self {
        Self([4, 1, 2, 3, 0, 2])
    }

    pub fn get(&self, kind: EntityKind) -> u8 {
        self.0[kind.index()]
    }

    pub fn set(&mut self, kind: EntityKind, priority: u8) {
        self.0[kind.index()] = priority;
    }
}

/// Axis-aligned rectangle given by origin (top-left) and size. Used for the
/// world boundary, area queries and the camera viewport.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict overlap with a bounding box (shared edges do not count).
    pub fn overlaps(&self, b: &Bounds) -> bool {
        b.left < self.right() && b.right > self.x && b.top < self.bottom() && b.bottom > self.y
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::new(0.0, 0.0, 800.0, 480.0)
    }
}

/// Entity bounding box, always derived from center + half extents.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl Bounds {
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            left: center.x - half_extents.x,
            right: center.x + half_extents.x,
            top: center.y - half_extents.y,
            bottom: center.y + half_extents.y,
            center_x: center.x,
            center_y: center.y,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.center_x, self.center_y)
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.right, self.bottom)
    }

    /// Same box shifted by `-offset` (world to screen space).
    pub fn offset(&self, offset: Vec2) -> Self {
        Self::from_center(self.center() - offset, Vec2::new(self.width(), self.height()) * 0.5)
    }
}

/// Directional and jump intent supplied by the input collaborator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    /// A jump pressed shortly before landing; consumed on the next grounded tick.
    pub jump_buffered: bool,
}

/// Pair overlap result handed to callbacks and `on_collision` hooks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionData {
    pub a: EntityId,
    pub b: EntityId,
    pub a_kind: EntityKind,
    pub b_kind: EntityKind,
    /// Penetration along each axis (both > 0).
    pub overlap: Vec2,
    /// Center of the overlap rectangle.
    pub contact: Vec2,
}

impl CollisionData {
    /// Same contact seen from the other entity.
    pub fn swapped(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
            a_kind: self.b_kind,
            b_kind: self.a_kind,
            overlap: self.overlap,
            contact: self.contact,
        }
    }
}

/// One tile face an entity was resolved against.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileContact {
    pub col: i32,
    pub row: i32,
    pub code: u8,
    /// World coordinate of the tile edge the entity was snapped to.
    pub edge: f32,
}

/// Result of one tile-grid resolution pass for a single entity.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TileContacts {
    pub ground: Option<TileContact>,
    pub ceiling: Option<TileContact>,
    pub left_wall: Option<TileContact>,
    pub right_wall: Option<TileContact>,
}

impl TileContacts {
    pub fn any(&self) -> bool {
        self.ground.is_some() || self.ceiling.is_some() || self.left_wall.is_some() || self.right_wall.is_some()
    }
}

/// World-boundary clamp result.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundaryHit {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    /// Crossed the bottom edge.
    pub fatal: bool,
}

impl BoundaryHit {
    pub fn any(&self) -> bool {
        self.left || self.right || self.top || self.fatal
    }
}

/// First solid tile along a segment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileRayHit {
    pub col: i32,
    pub row: i32,
    pub code: u8,
    /// Where the segment enters the tile.
    pub point: Vec2,
    /// Fraction in [0,1] along the segment.
    pub toi: f32,
}

/// Notable outcomes accumulated during a tick; drained by the caller.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    EntityRemoved { id: EntityId, kind: EntityKind },
    ActorHurt { id: EntityId, health: i32 },
    ActorDied { id: EntityId },
    ActorRespawned { id: EntityId },
    WandererCaught { id: EntityId, by: EntityId },
    WandererBumped { id: EntityId, by: EntityId },
    FatalBoundary { id: EntityId, kind: EntityKind },
}

/// Shared physics constants. Values match the tuned platformer feel.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration for actors and generic bodies (units/s²).
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub projectile_gravity: f32,
    pub particle_gravity: f32,
    /// Vertical speed kept when a projectile bounces off a tile.
    pub projectile_bounce: f32,
    /// Horizontal speed kept when a projectile bounces off a tile.
    pub projectile_friction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 700.0,
            max_fall_speed: 500.0,
            projectile_gravity: 200.0,
            particle_gravity: 300.0,
            projectile_bounce: 0.8,
            projectile_friction: 0.9,
        }
    }
}

/// Movement and survival tuning for the controllable actor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorTuning {
    pub walk_speed: f32,
    pub acceleration: f32,
    pub jump_power: f32,
    /// Velocity multiplier per 16ms with no directional intent.
    pub friction: f32,
    pub invulnerability_ms: f32,
    pub respawn_delay_ms: f32,
    pub max_health: i32,
}

impl Default for ActorTuning {
    fn default() -> Self {
        Self {
            walk_speed: 200.0,
            acceleration: 800.0,
            jump_power: 350.0,
            friction: 0.8,
            invulnerability_ms: 2000.0,
            respawn_delay_ms: 1000.0,
            max_health: 3,
        }
    }
}

/// Simulation-wide configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side length of one grid cell in world units.
    pub tile_size: f32,
    /// World boundary; crossing its bottom edge is fatal.
    pub world: Rect,
    pub physics: PhysicsConfig,
    pub actor: ActorTuning,
    /// Extra margin around the viewport for render culling.
    pub render_margin: f32,
    /// Maximum number of recycled particles kept on the free list.
    pub pool_capacity: usize,
    /// Seed for default particle velocities and wanderer behavior.
    pub seed: u64,
    /// Enable internal timing instrumentation (adds small overhead when true).
    pub enable_timing: bool,
    /// Keep each tick's pair contacts for inspection.
    pub debug_collisions: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tile_size: 16.0,
            world: Rect::default(),
            physics: PhysicsConfig::default(),
            actor: ActorTuning::default(),
            render_margin: 50.0,
            pool_capacity: 100,
            seed: 0x5eed,
            enable_timing: false,
            debug_collisions: false,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: SimConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_size > 0.0) {
            return Err(ConfigError::Validation(format!("tile_size must be positive, got {}", self.tile_size)));
        }
        if !(self.world.width > 0.0 && self.world.height > 0.0) {
            return Err(ConfigError::Validation("world dimensions must be positive".to_string()));
        }
        if self.physics.max_fall_speed < 0.0 {
            return Err(ConfigError::Validation("max_fall_speed must not be negative".to_string()));
        }
        if self.actor.max_health <= 0 {
            return Err(ConfigError::Validation("actor max_health must be at least 1".to_string()));
        }
        if self.render_margin < 0.0 {
            return Err(ConfigError::Validation("render_margin must not be negative".to_string()));
        }
        Ok(())
    }
}

/// Pair-dispatch and tile-resolution counters for the last tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CollisionStats {
    pub pairs_tested: usize,
    pub contacts: usize,
    pub tile_contacts: usize,
    pub fatal_hits: usize,
    pub callbacks_registered: usize,
    pub debug_contacts: usize,
    pub grid_cells: usize,
}

/// Free-list counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub created: usize,
    pub reused: usize,
    pub released: usize,
    pub dropped: usize,
    pub free: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FactoryStats {
    pub next_id: u64,
    pub built: [usize; EntityKind::COUNT],
}

/// Aggregate manager statistics for an observability collaborator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct ManagerStats {
    pub tick: u64,
    pub total_entities: usize,
    pub active_entities: usize,
    pub pending_destroy: usize,
    pub by_kind: [usize; EntityKind::COUNT],
    pub entities_updated: usize,
    pub entities_rendered: usize,
    pub last_update_ms: f64,
    pub last_physics_ms: f64,
    pub last_render_ms: f64,
    pub collisions: CollisionStats,
    pub pool: PoolStats,
}

impl ManagerStats {
    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.by_kind[kind.index()]
    }
}
