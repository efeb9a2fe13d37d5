//! Segment vs axis-aligned box hit detection.
//!
//! The slab test intersects, axis by axis, the parameter interval over which
//! the segment lies between the two box planes. The segment is parametrized
//! over `[0, 1]` so a shot never connects past its range.

use crate::math::Vec3;

/// Axis-aligned bounding box defined by a center and half-extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Aabb {
    pub const fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Builds a box from its minimum and maximum corners.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            half_extents: (max - min) * 0.5,
        }
    }
}

/// Where a segment first meets a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Segment parameter in `[0, 1]` of the entry point.
    pub t: f32,
    pub point: Vec3,
    /// Distance from the segment start to `point`.
    pub distance: f32,
}

/// Returns the `(t_entry, t_exit)` interval of the segment inside the box, or
/// `None` when some axis excludes it entirely.
fn slab_interval(start: Vec3, end: Vec3, aabb: &Aabb) -> Option<(f32, f32)> {
    let delta = end - start;
    let mut t_entry = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;

    for i in 0..3 {
        let d = delta.axis(i);
        let s = start.axis(i);
        let c = aabb.center.axis(i);
        let h = aabb.half_extents.axis(i);

        let (lo, hi) = if d == 0.0 {
            // Parallel to this slab: either always inside or never.
            if (s - c).abs() <= h {
                (f32::NEG_INFINITY, f32::INFINITY)
            } else {
                return None;
            }
        } else {
            let t1 = (c - h - s) / d;
            let t2 = (c + h - s) / d;
            (t1.min(t2), t1.max(t2))
        };

        t_entry = t_entry.max(lo);
        t_exit = t_exit.min(hi);
    }

    Some((t_entry, t_exit))
}

/// True if the segment `start..end` touches the box at `center` with `half_extents`.
pub fn intersects(start: Vec3, end: Vec3, center: Vec3, half_extents: Vec3) -> bool {
    segment_intersects(start, end, &Aabb::new(center, half_extents))
}

/// True if the segment `start..end` touches `aabb`.
pub fn segment_intersects(start: Vec3, end: Vec3, aabb: &Aabb) -> bool {
    match slab_interval(start, end, aabb) {
        Some((t_entry, t_exit)) => t_exit >= t_entry && t_exit >= 0.0 && t_entry <= 1.0,
        None => false,
    }
}

/// Entry point of the segment into `aabb`, for placing impact effects.
///
/// A segment starting inside the box enters at `t = 0`.
pub fn segment_entry(start: Vec3, end: Vec3, aabb: &Aabb) -> Option<SegmentHit> {
    let (t_entry, t_exit) = slab_interval(start, end, aabb)?;
    if !(t_exit >= t_entry && t_exit >= 0.0 && t_entry <= 1.0) {
        return None;
    }
    let t = t_entry.max(0.0);
    let point = start + (end - start) * t;
    Some(SegmentHit {
        t,
        point,
        distance: (point - start).len(),
    })
}
