//! Tile-grid and world-boundary resolution for a single body.
//!
//! Every check reads the velocity and bounds the body had on entry, so one
//! pass never snaps a body against two opposing faces.

use crate::entity::Body;
use crate::grid::TileGrid;
use crate::types::*;

/// Snap `body` against the solid tiles it is about to enter during `dt_ms`.
pub fn resolve_tiles(body: &mut Body, grid: &TileGrid, dt_ms: f32) -> TileContacts {
    let mut contacts = TileContacts::default();
    if !body.is_live() || grid.cell_count() == 0 {
        return contacts;
    }
    let ts = grid.tile_size();
    let dt = dt_ms / 1000.0;
    let vel = body.vel;
    let b = body.bounds();
    let half = body.half_extents;
    let columns = [body.pos.x, b.left, b.right];

    // First solid cell among `cols` on `row`
    let probe_row = |row: i32| {
        columns.iter().find_map(|&x| {
            let col = grid.col_of(x);
            grid.get(col, row).filter(|&code| code > 0).map(|code| (col, code))
        })
    };
    let probe_col = |col: i32, row: i32| grid.get(col, row).filter(|&code| code > 0);

    if vel.y >= 0.0 {
        let row = grid.row_of(b.bottom + vel.y * dt);
        if let Some((col, code)) = probe_row(row) {
            let edge = row as f32 * ts;
            body.pos.y = edge - half.y;
            body.vel.y = 0.0;
            contacts.ground = Some(TileContact { col, row, code, edge });
        }
    } else {
        let row = grid.row_of(b.top + vel.y * dt);
        if let Some((col, code)) = probe_row(row) {
            let edge = (row + 1) as f32 * ts;
            body.pos.y = edge + half.y;
            body.vel.y = 0.0;
            contacts.ceiling = Some(TileContact { col, row, code, edge });
        }
    }

    let row = grid.row_of(b.center_y);
    if vel.x < 0.0 {
        let col = grid.col_of(b.left + vel.x * dt);
        if let Some(code) = probe_col(col, row) {
            let edge = (col + 1) as f32 * ts;
            body.pos.x = edge + half.x;
            body.vel.x = 0.0;
            contacts.left_wall = Some(TileContact { col, row, code, edge });
        }
    } else if vel.x > 0.0 {
        let col = grid.col_of(b.right + vel.x * dt);
        if let Some(code) = probe_col(col, row) {
            let edge = col as f32 * ts;
            body.pos.x = edge - half.x;
            body.vel.x = 0.0;
            contacts.right_wall = Some(TileContact { col, row, code, edge });
        }
    }
    contacts
}

/// Clamp against the left, right and top edges of `world`. Crossing the
/// bottom edge is reported as fatal and left to the caller.
pub fn clamp_to_world(body: &mut Body, world: &Rect) -> BoundaryHit {
    let mut hit = BoundaryHit::default();
    if !body.is_live() {
        return hit;
    }
    let b = body.bounds();
    let half = body.half_extents;

    if b.left < world.x {
        body.pos.x = world.x + half.x;
        body.vel.x = body.vel.x.max(0.0);
        hit.left = true;
    }
    if b.right > world.right() {
        body.pos.x = world.right() - half.x;
        body.vel.x = body.vel.x.min(0.0);
        hit.right = true;
    }
    if b.top < world.y {
        body.pos.y = world.y + half.y;
        body.vel.y = body.vel.y.max(0.0);
        hit.top = true;
    }
    if b.bottom > world.bottom() {
        hit.fatal = true;
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn body(pos: Vec2, vel: Vec2, half: Vec2) -> Body {
        let mut b = Body::new(EntityId(1), EntityKind::Actor, pos, half);
        b.vel = vel;
        b
    }

    /// 20x30 grid: floor on row 25, a wall at column 10 on rows 20..25,
    /// a ceiling block at (3, 18).
    fn level() -> TileGrid {
        let mut g = TileGrid::new(20, 30, 16.0).unwrap();
        for col in 0..20 {
            g.set(col, 25, 1);
        }
        for row in 20..25 {
            g.set(10, row, 3);
        }
        g.set(3, 18, 2);
        g
    }

    #[test]
    fn test_ground_snaps_feet_to_tile_top() {
        let grid = level();
        let mut b = body(Vec2::new(40.0, 382.0), Vec2::new(0.0, 300.0), Vec2::splat(15.0));
        let contacts = resolve_tiles(&mut b, &grid, 16.67);
        assert_eq!(b.pos.y, 385.0);
        assert_eq!(b.vel.y, 0.0);
        let ground = contacts.ground.unwrap();
        assert_eq!((ground.row, ground.code, ground.edge), (25, 1, 400.0));
        assert!(contacts.ceiling.is_none());
    }

    #[test]
    fn test_ground_found_under_an_edge_column() {
        let mut grid = TileGrid::new(20, 30, 16.0).unwrap();
        grid.set(4, 25, 7);
        // Only the left edge is over the solid column
        let mut b = body(Vec2::new(82.0, 384.5), Vec2::new(0.0, 60.0), Vec2::splat(15.0));
        let contacts = resolve_tiles(&mut b, &grid, 16.0);
        let ground = contacts.ground.unwrap();
        assert_eq!((ground.col, ground.code), (4, 7));
        assert_eq!(b.pos.y, 385.0);
    }

    #[test]
    fn test_ceiling_snaps_below_tile() {
        let grid = level();
        // Head at y=305, moving up into row 18 (288..304)
        let mut b = body(Vec2::new(56.0, 320.0), Vec2::new(0.0, -120.0), Vec2::splat(15.0));
        let contacts = resolve_tiles(&mut b, &grid, 16.0);
        let ceiling = contacts.ceiling.unwrap();
        assert_eq!((ceiling.col, ceiling.row, ceiling.code), (3, 18, 2));
        assert_eq!(b.pos.y, 304.0 + 15.0);
        assert_eq!(b.vel.y, 0.0);
    }

    #[test]
    fn test_walls_snap_and_stop() {
        let grid = level();
        // Right edge at 158, wall starts at 160
        let mut b = body(Vec2::new(143.0, 370.0), Vec2::new(200.0, 0.0), Vec2::splat(15.0));
        let contacts = resolve_tiles(&mut b, &grid, 16.0);
        assert_eq!(contacts.right_wall.unwrap().edge, 160.0);
        assert_eq!(b.pos.x, 145.0);
        assert_eq!(b.vel.x, 0.0);

        let mut b = body(Vec2::new(193.0, 370.0), Vec2::new(-200.0, 0.0), Vec2::splat(15.0));
        let contacts = resolve_tiles(&mut b, &grid, 16.0);
        assert_eq!(contacts.left_wall.unwrap().edge, 176.0);
        assert_eq!(b.pos.x, 191.0);
        assert_eq!(b.vel.x, 0.0);
    }

    #[test]
    fn test_out_of_grid_is_no_collision() {
        let grid = level();
        let mut b = body(Vec2::new(-200.0, -200.0), Vec2::new(-50.0, 80.0), Vec2::splat(5.0));
        let before = b.clone();
        assert!(!resolve_tiles(&mut b, &grid, 16.0).any());
        assert_eq!(b, before);

        let empty = TileGrid::empty(16.0);
        let mut b = body(Vec2::new(40.0, 382.0), Vec2::new(0.0, 300.0), Vec2::splat(15.0));
        assert!(!resolve_tiles(&mut b, &empty, 16.0).any());
    }

    #[test]
    fn test_world_clamp_and_fatal_bottom() {
        let world = Rect::default();
        let mut b = body(Vec2::new(-3.0, -2.0), Vec2::new(-40.0, -10.0), Vec2::splat(5.0));
        let hit = clamp_to_world(&mut b, &world);
        assert!(hit.left && hit.top && !hit.fatal);
        assert_eq!(b.pos, Vec2::new(5.0, 5.0));
        assert_eq!(b.vel, Vec2::ZERO);

        let mut b = body(Vec2::new(798.0, 300.0), Vec2::new(40.0, 0.0), Vec2::splat(5.0));
        let hit = clamp_to_world(&mut b, &world);
        assert!(hit.right);
        assert_eq!(b.pos.x, 795.0);
        assert_eq!(b.vel.x, 0.0);

        let mut b = body(Vec2::new(400.0, 478.0), Vec2::new(0.0, 100.0), Vec2::splat(5.0));
        let hit = clamp_to_world(&mut b, &world);
        assert!(hit.fatal);
        // Fatal crossing is not clamped
        assert_eq!(b.pos.y, 478.0);
    }
}
