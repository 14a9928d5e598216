use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Transform, Vector2, Vector3};

use crate::sgraph::Material;

/// Local faces of the box are matched against the hit point with this
/// tolerance to pick the normal
const FACE_BIAS: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Builds a ray with a unit direction
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Moves the ray into another frame. The direction keeps its length so
    /// that `t` measures the same point in both frames.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Self {
        Self {
            origin: matrix.transform_point(self.origin),
            direction: matrix.transform_vector(self.direction),
        }
    }
}

/// Closest intersection found so far. The material is borrowed from the
/// leaf that was hit.
#[derive(Debug, Clone, Copy)]
pub struct HitRecord<'a> {
    pub t: f32,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub material: &'a Material,
    pub tex_coords: Vector2<f32>,
}

/// Intersection in the primitive's own frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalHit {
    pub t: f32,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub tex_coords: Vector2<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Unit sphere at the origin
    Sphere,
    /// Axis aligned box spanning `[-0.5, 0.5]`
    Box,
}

impl Primitive {
    /// Picks the primitive from a mesh instance name. `box` is checked
    /// before `sphere`; anything else is never hit.
    pub fn from_instance(name: &str) -> Option<Self> {
        if name.contains("box") {
            Some(Primitive::Box)
        } else if name.contains("sphere") {
            Some(Primitive::Sphere)
        } else {
            None
        }
    }

    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<LocalHit> {
        match self {
            Primitive::Sphere => intersect_sphere(ray, t_min, t_max),
            Primitive::Box => intersect_box(ray, t_min, t_max),
        }
    }
}

/// Smallest root of the unit sphere equation inside `(t_min, t_max)`
pub fn intersect_sphere(ray: &Ray, t_min: f32, t_max: f32) -> Option<LocalHit> {
    let origin = ray.origin.to_vec();
    let a = ray.direction.magnitude2();
    let b = 2.0 * origin.dot(ray.direction);
    let c = origin.magnitude2() - 1.0;
    let disc = b * b - 4.0 * a * c;
    if a == 0.0 || disc < 0.0 {
        return None;
    }

    let sqrt_disc = disc.sqrt();
    let near = (-b - sqrt_disc) / (2.0 * a);
    let far = (-b + sqrt_disc) / (2.0 * a);
    let t = [near, far].into_iter().find(|&t| t > t_min && t < t_max)?;

    let point = ray.at(t);
    let normal = point.to_vec().normalize();
    let tex_coords = Vector2::new(
        0.5 + normal.z.atan2(normal.x) / (2.0 * PI),
        0.5 - normal.y.asin() / PI,
    );
    Some(LocalHit {
        t,
        point,
        normal,
        tex_coords,
    })
}

/// Slab test against `[-0.5, 0.5]` on every axis. A ray starting inside
/// the box hits the far side.
pub fn intersect_box(ray: &Ray, t_min: f32, t_max: f32) -> Option<LocalHit> {
    let mut near = f32::NEG_INFINITY;
    let mut far = f32::INFINITY;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        if direction.abs() < 1e-6 {
            if !(-0.5..=0.5).contains(&origin) {
                return None;
            }
            continue;
        }
        let inv = 1.0 / direction;
        let mut t1 = (-0.5 - origin) * inv;
        let mut t2 = (0.5 - origin) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        near = near.max(t1);
        far = far.min(t2);
        if far < near {
            return None;
        }
    }

    let t = if near > t_min { near } else { far };
    if t <= t_min || t >= t_max {
        return None;
    }

    let point = ray.at(t);
    let normal = box_normal(point);
    Some(LocalHit {
        t,
        point,
        normal,
        tex_coords: box_tex_coords(point, normal),
    })
}

fn box_normal(point: Point3<f32>) -> Vector3<f32> {
    for axis in 0..3 {
        if (point[axis].abs() - 0.5).abs() < FACE_BIAS {
            let mut normal = Vector3::new(0.0, 0.0, 0.0);
            normal[axis] = point[axis].signum();
            return normal;
        }
    }
    // Precision loss on heavily scaled boxes; take the dominant axis
    let p = point.to_vec();
    let axis = if p.x.abs() >= p.y.abs() && p.x.abs() >= p.z.abs() {
        0
    } else if p.y.abs() >= p.z.abs() {
        1
    } else {
        2
    };
    let mut normal = Vector3::new(0.0, 0.0, 0.0);
    normal[axis] = p[axis].signum();
    normal
}

fn box_tex_coords(point: Point3<f32>, normal: Vector3<f32>) -> Vector2<f32> {
    let (u, v) = if normal.x != 0.0 {
        (point.z, point.y)
    } else if normal.y != 0.0 {
        (point.x, point.z)
    } else {
        (point.x, point.y)
    };
    Vector2::new(u + 0.5, 0.5 - v)
}
