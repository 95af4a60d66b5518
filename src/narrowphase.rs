use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::types::Bounds;

/// Narrowphase primitive tests.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn overlap_aabb_aabb(a: &Bounds, b: &Bounds) -> Option<(Vec2, Vec2)> {
        if !(a.left < b.right && a.right > b.left && a.top < b.bottom && a.bottom > b.top) {
            return None;
        }
        // Penetration per axis
        let ox = (a.right - b.left).min(b.right - a.left);
        let oy = (a.bottom - b.top).min(b.bottom - a.top);

        // Contact: center of the overlap rectangle
        let min = a.min().max(b.min());
        let max = a.max().min(b.max());
        Some((Vec2::new(ox, oy), (min + max) * 0.5))
    }

    fn overlap_point_aabb(p: Vec2, b: &Bounds) -> bool {
        p.x >= b.left && p.x <= b.right && p.y >= b.top && p.y <= b.bottom
    }

    fn line_segment_aabb(a: Vec2, b: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<(f32, Vec2)> {
        let d = b - a;
        // Slab method clamped to the segment [0,1]
        let mut tmin = 0.0f32;
        let mut tmax = 1.0f32;

        // X axis
        if d.x.abs() < f32::EPSILON {
            if a.x < aabb_min.x || a.x > aabb_max.x {
                return None;
            }
        } else {
            let inv = 1.0 / d.x;
            let mut t1 = (aabb_min.x - a.x) * inv;
            let mut t2 = (aabb_max.x - a.x) * inv;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
            }
            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return None;
            }
        }

        // Y axis
        if d.y.abs() < f32::EPSILON {
            if a.y < aabb_min.y || a.y > aabb_max.y {
                return None;
            }
        } else {
            let inv = 1.0 / d.y;
            let mut t1 = (aabb_min.y - a.y) * inv;
            let mut t2 = (aabb_max.y - a.y) * inv;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
            }
            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return None;
            }
        }

        Some((tmin, a + d * tmin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(cx: f32, cy: f32, h: f32) -> Bounds {
        Bounds::from_center(Vec2::new(cx, cy), Vec2::splat(h))
    }

    #[test]
    fn test_overlap_aabb_aabb_basic() {
        let (overlap, contact) = Narrowphase::overlap_aabb_aabb(&bx(0.0, 0.0, 1.0), &bx(1.5, 0.0, 1.0)).unwrap();
        assert!((overlap.x - 0.5).abs() < 1e-5);
        assert!((overlap.y - 2.0).abs() < 1e-5);
        assert!((contact.x - 0.75).abs() < 1e-5);
        assert!(contact.y.abs() < 1e-5);
    }

    #[test]
    fn test_overlap_aabb_aabb_touching_is_not_overlap() {
        assert!(Narrowphase::overlap_aabb_aabb(&bx(0.0, 0.0, 1.0), &bx(2.0, 0.0, 1.0)).is_none());
        assert!(Narrowphase::overlap_aabb_aabb(&bx(0.0, 0.0, 1.0), &bx(0.0, 2.0, 1.0)).is_none());
    }

    #[test]
    fn test_overlap_point_aabb() {
        let b = bx(0.0, 0.0, 1.0);
        assert!(Narrowphase::overlap_point_aabb(Vec2::new(0.5, -0.5), &b));
        assert!(!Narrowphase::overlap_point_aabb(Vec2::new(1.5, 0.0), &b));
    }

    #[test]
    fn test_segment_aabb_hit_and_miss() {
        let min = Vec2::new(-1.0, -1.0);
        let max = Vec2::new(1.0, 1.0);
        let (toi, point) = Narrowphase::line_segment_aabb(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0), min, max).unwrap();
        assert!((toi - 0.25).abs() < 1e-5);
        assert!((point.x + 1.0).abs() < 1e-5);
        assert!(Narrowphase::line_segment_aabb(Vec2::new(-2.0, 2.0), Vec2::new(2.0, 2.0), min, max).is_none());
        // Segment ending before the box
        assert!(Narrowphase::line_segment_aabb(Vec2::new(-4.0, 0.0), Vec2::new(-2.0, 0.0), min, max).is_none());
    }

    #[test]
    fn test_segment_starting_inside_hits_at_zero() {
        let (toi, point) =
            Narrowphase::line_segment_aabb(Vec2::ZERO, Vec2::new(3.0, 0.0), Vec2::splat(-1.0), Vec2::splat(1.0)).unwrap();
        assert_eq!(toi, 0.0);
        assert_eq!(point, Vec2::ZERO);
    }
}
