//! World collision queries.
//!
//! The world geometry lives outside the simulation; the core only asks it
//! segment casts through [`CollisionOracle`]. [`BoxWorld`] is a small static
//! implementation made of axis-aligned boxes, used by the headless peer and
//! by tests.

use crate::{
    hit::{segment_entry, Aabb},
    math::Vec3,
};

/// Opaque reference to a piece of world geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub u32);

/// A valid segment cast result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub distance: Option<f32>,
    pub object: Option<ObjectRef>,
}

/// Segment cast against world geometry. `None` means no valid hit.
pub trait CollisionOracle {
    fn cast(&self, start: Vec3, end: Vec3) -> Option<RayHit>;
}

/// A world with no geometry at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyWorld;

impl CollisionOracle for EmptyWorld {
    fn cast(&self, _start: Vec3, _end: Vec3) -> Option<RayHit> {
        None
    }
}

/// Static world made of axis-aligned boxes.
#[derive(Debug, Default, Clone)]
pub struct BoxWorld {
    solids: Vec<Aabb>,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a solid and returns its object reference.
    pub fn add(&mut self, solid: Aabb) -> ObjectRef {
        self.solids.push(solid);
        ObjectRef((self.solids.len() - 1) as u32)
    }

    pub fn with(mut self, solid: Aabb) -> Self {
        self.add(solid);
        self
    }

    /// A flat floor whose top surface sits at `floor_y`.
    pub fn flat_floor(floor_y: f32, half_size: f32) -> Self {
        Self::new().with(Aabb::from_min_max(
            Vec3::new(-half_size, floor_y - 1.0, -half_size),
            Vec3::new(half_size, floor_y, half_size),
        ))
    }

    /// Warehouse layout: one long floor under both spawn points, enclosing
    /// walls and two crates in the middle aisle.
    pub fn warehouse() -> Self {
        let floor_top = 2.5;
        Self::new()
            // Floor.
            .with(Aabb::from_min_max(
                Vec3::new(-60.0, floor_top - 1.0, -20.0),
                Vec3::new(60.0, floor_top, 20.0),
            ))
            // Walls.
            .with(Aabb::from_min_max(
                Vec3::new(-61.0, floor_top, -20.0),
                Vec3::new(-60.0, 20.0, 20.0),
            ))
            .with(Aabb::from_min_max(
                Vec3::new(60.0, floor_top, -20.0),
                Vec3::new(61.0, 20.0, 20.0),
            ))
            .with(Aabb::from_min_max(
                Vec3::new(-60.0, floor_top, -21.0),
                Vec3::new(60.0, 20.0, -20.0),
            ))
            .with(Aabb::from_min_max(
                Vec3::new(-60.0, floor_top, 20.0),
                Vec3::new(60.0, 20.0, 21.0),
            ))
            // Crates in the middle aisle.
            .with(Aabb::from_min_max(
                Vec3::new(-2.0, floor_top, -6.0),
                Vec3::new(2.0, floor_top + 3.0, -2.0),
            ))
            .with(Aabb::from_min_max(
                Vec3::new(-2.0, floor_top, 2.0),
                Vec3::new(2.0, floor_top + 3.0, 6.0),
            ))
    }
}

impl CollisionOracle for BoxWorld {
    fn cast(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        self.solids
            .iter()
            .enumerate()
            .filter_map(|(i, solid)| segment_entry(start, end, solid).map(|hit| (i, hit)))
            .min_by(|(_, a), (_, b)| a.t.total_cmp(&b.t))
            .map(|(i, hit)| RayHit {
                point: hit.point,
                distance: Some(hit.distance),
                object: Some(ObjectRef(i as u32)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_world_never_hits() {
        assert_eq!(EmptyWorld.cast(Vec3::ZERO, Vec3::new(0.0, -10.0, 0.0)), None);
    }

    #[test]
    fn nearest_solid_wins() {
        let world = BoxWorld::new()
            .with(Aabb::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(1.0, 1.0, 1.0)))
            .with(Aabb::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 1.0, 1.0)));
        let hit = world.cast(Vec3::ZERO, Vec3::new(0.0, 0.0, 20.0)).unwrap();
        assert_eq!(hit.object, Some(ObjectRef(1)));
        assert!((hit.point.z - 4.0).abs() < 1e-5);
        assert!((hit.distance.unwrap() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn floor_probe_finds_top_surface() {
        let world = BoxWorld::flat_floor(2.5, 50.0);
        let hit = world
            .cast(Vec3::new(3.0, 2.6, 1.0), Vec3::new(3.0, 2.0, 1.0))
            .unwrap();
        assert!((hit.point.y - 2.5).abs() < 1e-5);
    }

    #[test]
    fn warehouse_floor_under_spawns() {
        let world = BoxWorld::warehouse();
        for x in [55.0, -55.0] {
            let hit = world.cast(Vec3::new(x, 3.0, 0.0), Vec3::new(x, 0.0, 0.0));
            assert!(hit.is_some(), "no floor under x={x}");
        }
    }
}
