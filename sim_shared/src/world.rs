//! World queries.
//!
//! The only query gameplay needs is a raycast: "first blocking object
//! along this segment, if any". The trait keeps callers decoupled from
//! how collision is represented; [`SphereWorld`] is the concrete
//! implementation built from the live object registry each query.

use crate::math::Vec3;
use crate::object::ObjectId;

/// Result of a successful raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub object: ObjectId,
    /// Distance from the ray origin to the closest approach.
    pub distance: f32,
    pub point: Vec3,
}

/// Single-nearest-blocking-hit query.
pub trait WorldQuery {
    fn raycast(&self, origin: Vec3, end: Vec3, ignore: Option<ObjectId>) -> Option<RayHit>;
}

/// Sphere collider per object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereCollider {
    pub object: ObjectId,
    pub center: Vec3,
    pub radius: f32,
}

/// A transient collision world of sphere colliders.
#[derive(Debug, Clone, Default)]
pub struct SphereWorld {
    colliders: Vec<SphereCollider>,
}

impl SphereWorld {
    pub fn new(colliders: Vec<SphereCollider>) -> Self {
        Self { colliders }
    }

    pub fn add(&mut self, object: ObjectId, center: Vec3, radius: f32) {
        self.colliders.push(SphereCollider {
            object,
            center,
            radius,
        });
    }
}

impl WorldQuery for SphereWorld {
    fn raycast(&self, origin: Vec3, end: Vec3, ignore: Option<ObjectId>) -> Option<RayHit> {
        let dir = end - origin;
        let len_sq = dir.len_sq();
        if len_sq <= f32::EPSILON {
            return None;
        }

        let mut best: Option<RayHit> = None;
        for c in &self.colliders {
            if ignore == Some(c.object) {
                continue;
            }

            // Closest point on the segment to the sphere center.
            let t = ((c.center - origin).dot(dir) / len_sq).clamp(0.0, 1.0);
            let closest = origin + dir * t;
            if (closest - c.center).len_sq() > c.radius * c.radius {
                continue;
            }

            let distance = (closest - origin).length();
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(RayHit {
                    object: c.object,
                    distance,
                    point: closest,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raycast_hits_sphere_on_segment() {
        let mut world = SphereWorld::default();
        world.add(ObjectId(1), Vec3::new(5.0, 0.0, 0.0), 1.0);

        let hit = world
            .raycast(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), None)
            .unwrap();
        assert_eq!(hit.object, ObjectId(1));
        assert!((hit.distance - 5.0).abs() < 1e-5);
    }

    #[test]
    fn raycast_misses_off_axis_sphere() {
        let mut world = SphereWorld::default();
        world.add(ObjectId(1), Vec3::new(5.0, 3.0, 0.0), 1.0);

        assert!(world
            .raycast(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), None)
            .is_none());
    }

    #[test]
    fn raycast_returns_nearest_and_honors_ignore() {
        let mut world = SphereWorld::default();
        world.add(ObjectId(1), Vec3::new(3.0, 0.0, 0.0), 0.5);
        world.add(ObjectId(2), Vec3::new(6.0, 0.0, 0.0), 0.5);

        let hit = world
            .raycast(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), None)
            .unwrap();
        assert_eq!(hit.object, ObjectId(1));

        let hit = world
            .raycast(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Some(ObjectId(1)))
            .unwrap();
        assert_eq!(hit.object, ObjectId(2));
    }

    #[test]
    fn raycast_stops_at_segment_end() {
        let mut world = SphereWorld::default();
        world.add(ObjectId(1), Vec3::new(20.0, 0.0, 0.0), 1.0);

        assert!(world
            .raycast(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), None)
            .is_none());
    }
}
