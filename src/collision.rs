//! Ray queries against primitive collision shapes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

const EPSILON: f32 = 1e-6;

/// Collision shape of a primitive, centred on its owner's translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    /// Axis-aligned box.
    Box { half_extents: Vec3 },
}

impl Shape {
    /// Shape after applying an actor's scale.  Spheres take the largest axis.
    pub fn scaled(self, scale: Vec3) -> Self {
        let scale = scale.abs();
        match self {
            Shape::Sphere { radius } => Shape::Sphere {
                radius: radius * scale.max_element(),
            },
            Shape::Box { half_extents } => Shape::Box {
                half_extents: half_extents * scale,
            },
        }
    }
}

/// Where a ray first touches a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    /// Distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    /// Non-zero only when the origin starts inside the shape.
    pub penetration_depth: f32,
}

/// Test the segment `start → end` against `shape` centred at `center`.
///
/// Zero-length segments never hit.
pub fn segment_hit(start: Vec3, end: Vec3, shape: Shape, center: Vec3) -> Option<ShapeHit> {
    let delta = end - start;
    let length = delta.length();
    if length <= EPSILON {
        return None;
    }
    let dir = delta / length;

    match shape {
        Shape::Sphere { radius } => ray_sphere(start, dir, length, center, radius),
        Shape::Box { half_extents } => ray_box(start, dir, length, center, half_extents),
    }
}

fn ray_sphere(origin: Vec3, dir: Vec3, max_t: f32, center: Vec3, radius: f32) -> Option<ShapeHit> {
    let oc = origin - center;
    let c = oc.length_squared() - radius * radius;

    if c <= 0.0 {
        let normal = non_zero_or(oc.normalize_or_zero(), -dir);
        return Some(ShapeHit {
            distance: 0.0,
            point: origin,
            normal,
            penetration_depth: radius - oc.length(),
        });
    }

    let b = oc.dot(dir);
    // Outside and pointing away.
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    if t > max_t {
        return None;
    }
    let point = origin + dir * t;
    Some(ShapeHit {
        distance: t,
        point,
        normal: (point - center) / radius,
        penetration_depth: 0.0,
    })
}

fn ray_box(origin: Vec3, dir: Vec3, max_t: f32, center: Vec3, half: Vec3) -> Option<ShapeHit> {
    let local = origin - center;

    if local.abs().cmple(half).all() {
        // Depenetrate through the nearest face.
        let gaps = half - local.abs();
        let axis = min_axis(gaps);
        let mut normal = Vec3::ZERO;
        normal[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        return Some(ShapeHit {
            distance: 0.0,
            point: origin,
            normal,
            penetration_depth: gaps[axis],
        });
    }

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_axis = 0;

    for axis in 0..3 {
        if dir[axis].abs() <= EPSILON {
            if local[axis].abs() > half[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir[axis];
        let mut t0 = (-half[axis] - local[axis]) * inv;
        let mut t1 = (half[axis] - local[axis]) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_enter {
            t_enter = t0;
            enter_axis = axis;
        }
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }

    if t_enter < 0.0 || t_enter > max_t {
        return None;
    }

    let mut normal = Vec3::ZERO;
    normal[enter_axis] = -dir[enter_axis].signum();
    Some(ShapeHit {
        distance: t_enter,
        point: origin + dir * t_enter,
        normal,
        penetration_depth: 0.0,
    })
}

fn min_axis(v: Vec3) -> usize {
    if v.x <= v.y && v.x <= v.z {
        0
    } else if v.y <= v.z {
        1
    } else {
        2
    }
}

fn non_zero_or(v: Vec3, fallback: Vec3) -> Vec3 {
    if v == Vec3::ZERO {
        fallback
    } else {
        v
    }
}
