use glam::Vec2;

use crate::entity::Body;
use crate::grid::TileGrid;
use crate::types::*;

/// Per-tick inputs handed to `Behavior::update`.
pub struct TickContext<'a> {
    /// Elapsed time for this tick in milliseconds.
    pub dt_ms: f32,
    pub grid: &'a TileGrid,
    pub world: Rect,
    pub physics: &'a PhysicsConfig,
    /// Position of the first live actor, for variants that react to it.
    pub actor_pos: Option<Vec2>,
    pub events: &'a mut Vec<SimEvent>,
}

impl TickContext<'_> {
    /// `dt_ms` expressed in seconds, the unit velocities are given in.
    pub fn dt_secs(&self) -> f32 {
        self.dt_ms / 1000.0
    }
}

/// Behavior contract every entity variant implements.
///
/// `update` and `render` have no default: a variant without them does not
/// build. Everything else is an optional hook.
pub trait Behavior {
    /// Advance behavior and motion by one tick.
    fn update(&mut self, body: &mut Body, ctx: &mut TickContext<'_>);

    /// Emit draw commands in screen space (`camera` is the viewport origin).
    fn render(&self, body: &Body, camera: Vec2, sink: &mut dyn RenderSink);

    // --- Optional hooks ----------------------------------------------------

    /// Called by the pair dispatcher after any type-pair callback.
    fn on_collision(&mut self, _body: &mut Body, _other: &Body, _data: &CollisionData, _events: &mut Vec<SimEvent>) {}

    /// Fired exactly once per destruction.
    fn on_destroy(&mut self, _body: &Body) {}

    /// Fired when a destroyed entity is brought back (spawn or pool reuse).
    fn on_spawn(&mut self, _body: &mut Body) {}

    /// Grounded indicator written by the tile resolver. Variants without one ignore it.
    fn set_grounded(&mut self, _grounded: bool) {}

    /// Crossing the world's bottom edge. Default: destroy immediately.
    fn on_fatal_boundary(&mut self, body: &mut Body, _events: &mut Vec<SimEvent>) {
        body.destroy();
    }
}

/// Rendering collaborator. Receives screen-space filled rectangles.
pub trait RenderSink {
    fn fill_rect(&mut self, rect: Bounds, color: Rgba);
}

/// RGBA color, 0-255 per channel.
pub type Rgba = [u8; 4];

/// Test/debug sink that records every command.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub commands: Vec<(Bounds, Rgba)>,
}

impl RenderSink for RecordingSink {
    fn fill_rect(&mut self, rect: Bounds, color: Rgba) {
        self.commands.push((rect, color));
    }
}

/// Narrowphase primitives used by the dispatcher and the tile raycast.
pub trait NarrowphaseApi {
    /// Strict AABB overlap; touching edges do not count.
    fn overlap_aabb_aabb(a: &Bounds, b: &Bounds) -> Option<(Vec2, Vec2)>;
    fn overlap_point_aabb(p: Vec2, b: &Bounds) -> bool;
    /// Segment `a -> b` against a box; returns (toi in [0,1], entry point).
    fn line_segment_aabb(a: Vec2, b: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<(f32, Vec2)>;
}
