use serde::{Deserialize, Serialize};

/// Represents a point or direction in 3D world space.
///
/// The y-axis points up. Yaw rotates around it, with yaw 0 facing +z.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        self.sub(other).length()
    }

    /// Linear interpolation, `t = 0` yields `self` and `t = 1` yields `other`.
    pub fn lerp(&self, other: &Vec3, t: f32) -> Vec3 {
        self.add(&other.sub(self).scale(t))
    }
}

/// Rigid placement of an object: a world origin plus a rotation about the up axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub origin: Vec3,
    /// Rotation around +y in radians.
    pub yaw: f32,
}

impl Pose {
    pub fn new(origin: Vec3, yaw: f32) -> Self {
        Self { origin, yaw }
    }

    /// Maps a point given relative to this pose into world space.
    pub fn transform_point(&self, local: &Vec3) -> Vec3 {
        let (sin, cos) = self.yaw.sin_cos();
        let rotated = Vec3::new(
            local.x * cos + local.z * sin,
            local.y,
            -local.x * sin + local.z * cos,
        );
        self.origin.add(&rotated)
    }

    /// Unit vector this pose is facing.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }
}

/// Squared distance between segment `[a, b]` and point `p`, plus the clamped
/// parameter of the closest point on the segment.
pub fn segment_point_distance_sq(a: &Vec3, b: &Vec3, p: &Vec3) -> (f32, f32) {
    let ab = b.sub(a);
    let len_sq = ab.dot(&ab);
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (p.sub(a).dot(&ab) / len_sq).clamp(0.0, 1.0)
    };
    let closest = a.add(&ab.scale(t));
    let d = p.sub(&closest);
    (d.dot(&d), t)
}

/// Squared distance between segments `[p1, q1]` and `[p2, q2]`.
pub fn segment_segment_distance_sq(p1: &Vec3, q1: &Vec3, p2: &Vec3, q2: &Vec3) -> f32 {
    segment_segment_closest(p1, q1, p2, q2).0
}

/// Squared distance between segments `[p1, q1]` and `[p2, q2]`, plus the parameter
/// of the closest point on the first segment.
pub fn segment_segment_closest(p1: &Vec3, q1: &Vec3, p2: &Vec3, q2: &Vec3) -> (f32, f32) {
    let d1 = q1.sub(p1);
    let d2 = q2.sub(p2);
    let r = p1.sub(p2);
    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);

    let (s, t) = if a <= f32::EPSILON && e <= f32::EPSILON {
        (0.0, 0.0)
    } else if a <= f32::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= f32::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom.abs() > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let c1 = p1.add(&d1.scale(s));
    let c2 = p2.add(&d2.scale(t));
    let d = c1.sub(&c2);
    (d.dot(&d), s)
}
