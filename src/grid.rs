use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::error::GridError;
use crate::narrowphase::Narrowphase;
use crate::types::{Bounds, TileRayHit};

/// Row-major grid of tile codes. 0 is empty; any positive code is solid.
///
/// Lookups outside the grid are never errors: they read as empty, since
/// entities legitimately leave the grid before the world clamp catches them.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tile_size: f32,
    cells: Vec<u8>,
}

impl TileGrid {
    /// Grid with no cells (no level loaded).
    pub fn empty(tile_size: f32) -> Self {
        Self { width: 0, height: 0, tile_size, cells: Vec::new() }
    }

    /// All-empty grid of the given dimensions.
    pub fn new(width: usize, height: usize, tile_size: f32) -> Result<Self, GridError> {
        if !(tile_size > 0.0) {
            return Err(GridError::InvalidTileSize(tile_size));
        }
        Ok(Self { width, height, tile_size, cells: vec![0; width * height] })
    }

    /// Build from level rows. Every row must have the same length.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R], tile_size: f32) -> Result<Self, GridError> {
        if !(tile_size > 0.0) {
            return Err(GridError::InvalidTileSize(tile_size));
        }
        let first = rows.first().ok_or(GridError::Empty)?;
        let width = first.as_ref().len();
        let mut cells = Vec::with_capacity(width * rows.len());
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != width {
                return Err(GridError::RaggedRow { row, expected: width, found: r.len() });
            }
            cells.extend_from_slice(r);
        }
        Ok(Self { width, height: rows.len(), tile_size, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Tile code at (col, row), `None` outside the grid.
    pub fn get(&self, col: i32, row: i32) -> Option<u8> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        Some(self.cells[row as usize * self.width + col as usize])
    }

    pub fn is_solid(&self, col: i32, row: i32) -> bool {
        matches!(self.get(col, row), Some(code) if code > 0)
    }

    /// Overwrite one cell. Returns false outside the grid.
    pub fn set(&mut self, col: i32, row: i32, code: u8) -> bool {
        if self.get(col, row).is_none() {
            return false;
        }
        self.cells[row as usize * self.width + col as usize] = code;
        true
    }

    /// Grid column of a world x coordinate.
    pub fn col_of(&self, x: f32) -> i32 {
        (x / self.tile_size).floor() as i32
    }

    /// Grid row of a world y coordinate.
    pub fn row_of(&self, y: f32) -> i32 {
        (y / self.tile_size).floor() as i32
    }

    pub fn cell_of(&self, p: Vec2) -> (i32, i32) {
        (self.col_of(p.x), self.row_of(p.y))
    }

    /// World-space box covered by one cell.
    pub fn tile_bounds(&self, col: i32, row: i32) -> Bounds {
        let half = Vec2::splat(self.tile_size * 0.5);
        let center = Vec2::new(col as f32 * self.tile_size, row as f32 * self.tile_size) + half;
        Bounds::from_center(center, half)
    }

    /// First solid tile along the segment `start -> end`, stepping cell by cell (DDA).
    pub fn raycast(&self, start: Vec2, end: Vec2) -> Option<TileRayHit> {
        let cs = self.tile_size.max(1e-5);
        let dir = end - start;
        let mut cell = self.cell_of(start);

        let step_x = if dir.x > 0.0 { 1 } else if dir.x < 0.0 { -1 } else { 0 };
        let step_y = if dir.y > 0.0 { 1 } else if dir.y < 0.0 { -1 } else { 0 };
        let next_boundary = |c: i32, step: i32| -> f32 {
            if step > 0 { (c as f32 + 1.0) * cs } else { c as f32 * cs }
        };
        let mut t_max_x = if step_x != 0 { (next_boundary(cell.0, step_x) - start.x) / dir.x } else { f32::INFINITY };
        let mut t_max_y = if step_y != 0 { (next_boundary(cell.1, step_y) - start.y) / dir.y } else { f32::INFINITY };
        let t_delta_x = if step_x != 0 { cs / dir.x.abs() } else { f32::INFINITY };
        let t_delta_y = if step_y != 0 { cs / dir.y.abs() } else { f32::INFINITY };

        // Cells crossed is bounded by the Manhattan length in tiles
        let max_steps = ((dir.x.abs() + dir.y.abs()) / cs).ceil() as usize + 2;
        let mut t_curr = 0.0f32;
        for _ in 0..max_steps {
            if t_curr > 1.0 { break; }
            if let Some(code) = self.get(cell.0, cell.1) {
                if code > 0 {
                    let tile = self.tile_bounds(cell.0, cell.1);
                    let (toi, point) = Narrowphase::line_segment_aabb(start, end, tile.min(), tile.max())
                        .unwrap_or((t_curr, start + dir * t_curr));
                    return Some(TileRayHit { col: cell.0, row: cell.1, code, point, toi });
                }
            }
            if step_x == 0 && step_y == 0 { break; }

            // Step to next cell
            if t_max_x < t_max_y {
                cell.0 += step_x;
                t_curr = t_max_x;
                t_max_x += t_delta_x;
            } else {
                cell.1 += step_y;
                t_curr = t_max_y;
                t_max_y += t_delta_y;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_grid() -> TileGrid {
        // 10x10, solid floor on row 8, a pillar at column 6
        let mut rows = vec![vec![0u8; 10]; 10];
        rows[8] = vec![1u8; 10];
        for r in rows.iter_mut().take(8).skip(4) {
            r[6] = 2;
        }
        TileGrid::from_rows(&rows, 16.0).unwrap()
    }

    #[test]
    fn test_from_rows_rejects_ragged_and_empty() {
        let rows = vec![vec![0u8; 4], vec![0u8; 3]];
        assert_eq!(
            TileGrid::from_rows(&rows, 16.0),
            Err(GridError::RaggedRow { row: 1, expected: 4, found: 3 })
        );
        let none: Vec<Vec<u8>> = Vec::new();
        assert_eq!(TileGrid::from_rows(&none, 16.0), Err(GridError::Empty));
        assert_eq!(TileGrid::from_rows(&[vec![0u8]], 0.0), Err(GridError::InvalidTileSize(0.0)));
    }

    #[test]
    fn test_out_of_range_reads_empty() {
        let g = floor_grid();
        assert_eq!(g.get(-1, 8), None);
        assert_eq!(g.get(0, 10), None);
        assert!(!g.is_solid(100, 8));
        assert!(g.is_solid(3, 8));
        assert_eq!(g.get(6, 5), Some(2));
    }

    #[test]
    fn test_set_and_cell_math() {
        let mut g = TileGrid::new(4, 4, 16.0).unwrap();
        assert!(g.set(1, 2, 5));
        assert!(!g.set(4, 0, 5));
        assert_eq!(g.cell_of(Vec2::new(17.0, 40.0)), (1, 2));
        assert!(g.is_solid(1, 2));
        let b = g.tile_bounds(1, 2);
        assert_eq!((b.left, b.top, b.right, b.bottom), (16.0, 32.0, 32.0, 48.0));
    }

    #[test]
    fn test_raycast_down_hits_floor() {
        let g = floor_grid();
        let hit = g.raycast(Vec2::new(40.0, 8.0), Vec2::new(40.0, 150.0)).unwrap();
        assert_eq!((hit.col, hit.row, hit.code), (2, 8, 1));
        assert!((hit.point.y - 128.0).abs() < 1e-3);
        assert!(hit.toi > 0.0 && hit.toi < 1.0);
    }

    #[test]
    fn test_raycast_horizontal_hits_pillar_first() {
        let g = floor_grid();
        let hit = g.raycast(Vec2::new(8.0, 90.0), Vec2::new(150.0, 90.0)).unwrap();
        assert_eq!((hit.col, hit.row, hit.code), (6, 5, 2));
        assert!((hit.point.x - 96.0).abs() < 1e-3);
    }

    #[test]
    fn test_raycast_miss_and_short_segment() {
        let g = floor_grid();
        // Above the floor, left of the pillar
        assert!(g.raycast(Vec2::new(8.0, 8.0), Vec2::new(80.0, 40.0)).is_none());
        // Segment ends just before the floor
        assert!(g.raycast(Vec2::new(40.0, 8.0), Vec2::new(40.0, 120.0)).is_none());
        // Entirely outside the grid
        assert!(g.raycast(Vec2::new(-100.0, -100.0), Vec2::new(-10.0, -50.0)).is_none());
    }

    #[test]
    fn test_raycast_starting_in_solid_hits_immediately() {
        let g = floor_grid();
        let hit = g.raycast(Vec2::new(40.0, 130.0), Vec2::new(40.0, 130.0)).unwrap();
        assert_eq!(hit.row, 8);
        assert_eq!(hit.toi, 0.0);
    }
}
