use shared::Vec3;

///Represents a ray with a unit-length direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    ///Returns the point at `distance` along the ray.
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin.add(&self.direction.scale(distance))
    }
}

///Represents an axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Upright box of the given footprint width and height standing on `feet`.
    pub fn standing(feet: Vec3, width: f32, height: f32) -> Self {
        let half = width / 2.0;
        Self {
            min: Vec3::new(feet.x - half, feet.y, feet.z - half),
            max: Vec3::new(feet.x + half, feet.y + height, feet.z + half),
        }
    }

    pub fn contains(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Distance along `ray` to the first surface crossing, if any.
    ///
    /// Slab test. A ray starting inside the box reports distance 0.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let origin = [ray.origin.x, ray.origin.y, ray.origin.z];
        let dir = [ray.direction.x, ray.direction.y, ray.direction.z];
        let min = [self.min.x, self.min.y, self.min.z];
        let max = [self.max.x, self.max.y, self.max.z];

        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            if dir[axis].abs() < 1e-8 {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir[axis];
            let mut t0 = (min[axis] - origin[axis]) * inv;
            let mut t1 = (max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

/// Result of a hitscan query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub target: u32,
    pub distance: f32,
    pub point: Vec3,
}

/// Casts `ray` against `targets` and returns the nearest hit within range.
///
/// `ignore` is skipped so a shooter cannot hit its own hitbox. Boxes that
/// contain the ray origin are never reported.
pub fn hitscan<I>(ray: &Ray, max_distance: f32, targets: I, ignore: u32) -> Option<RayHit>
where
    I: IntoIterator<Item = (u32, Aabb)>,
{
    let mut best: Option<RayHit> = None;

    for (id, hitbox) in targets {
        if id == ignore || hitbox.contains(&ray.origin) {
            continue;
        }
        let Some(distance) = hitbox.intersect(ray) else {
            continue;
        };
        if distance > max_distance {
            continue;
        }
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(RayHit {
                target: id,
                distance,
                point: ray.at(distance),
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn body(x: f32, z: f32) -> Aabb {
        Aabb::standing(Vec3::new(x, 0.0, z), 0.8, 1.8)
    }

    #[test]
    fn test_standing_box() {
        let b = body(1.0, 2.0);
        assert_approx_eq!(b.min.x, 0.6, 1e-6);
        assert_approx_eq!(b.min.z, 1.6, 1e-6);
        assert_eq!(b.min.y, 0.0);
        assert_approx_eq!(b.max.x, 1.4, 1e-6);
        assert_approx_eq!(b.max.y, 1.8, 1e-6);
        assert_approx_eq!(b.max.z, 2.4, 1e-6);
        assert!(b.contains(&Vec3::new(1.0, 1.0, 2.0)));
        assert!(!b.contains(&Vec3::new(1.0, 2.0, 2.0)));
    }

    #[test]
    fn test_ray_hits_box_in_front() {
        let ray = Ray::new(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let distance = body(0.0, 5.0).intersect(&ray).unwrap();
        assert_approx_eq!(distance, 4.6, 1e-5);
    }

    #[test]
    fn test_ray_misses_box_behind_or_aside() {
        let ray = Ray::new(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(body(0.0, -5.0).intersect(&ray).is_none());
        assert!(body(3.0, 5.0).intersect(&ray).is_none());
    }

    #[test]
    fn test_ray_over_head_misses() {
        let ray = Ray::new(Vec3::new(0.0, 2.5, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(body(0.0, 5.0).intersect(&ray).is_none());
    }

    #[test]
    fn test_ray_from_inside() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(body(0.0, 0.0).intersect(&ray), Some(0.0));
    }

    #[test]
    fn test_hitscan_nearest_wins() {
        let ray = Ray::new(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let targets = vec![(2, body(0.0, 20.0)), (3, body(0.0, 8.0)), (1, body(0.0, 0.0))];

        let hit = hitscan(&ray, 100.0, targets, 1).unwrap();
        assert_eq!(hit.target, 3);
        assert_approx_eq!(hit.point.z, 7.6, 1e-4);
    }

    #[test]
    fn test_hitscan_skips_box_around_origin() {
        let ray = Ray::new(
            Vec3::new(0.0, 1.6, 0.0),
            Vec3::look_direction(0.0, -89.0),
        );
        let targets = vec![(1, body(0.0, 0.0)), (2, body(0.0, 0.0))];
        assert!(hitscan(&ray, 100.0, targets, 1).is_none());

        let forward = Ray::new(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let targets = vec![(2, body(0.0, 0.0)), (3, body(0.0, 6.0))];
        assert_eq!(hitscan(&forward, 100.0, targets, 1).unwrap().target, 3);
    }

    #[test]
    fn test_hitscan_respects_range() {
        let ray = Ray::new(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let targets = vec![(2, body(0.0, 50.0))];
        assert!(hitscan(&ray, 10.0, targets.clone(), 1).is_none());
        assert!(hitscan(&ray, 100.0, targets, 1).is_some());
    }

    #[test]
    fn test_hitscan_downward_shot() {
        // Looking down at someone's feet from close range.
        let ray = Ray::new(
            Vec3::new(0.0, 1.6, 0.0),
            Vec3::look_direction(0.0, 45.0),
        );
        let hit = hitscan(&ray, 100.0, vec![(2, body(0.0, 1.2))], 1).unwrap();
        assert_eq!(hit.target, 2);
    }
}
