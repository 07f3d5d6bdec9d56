use core::mem;
use core::ops::{Add, AddAssign};

use glam::{vec3, Vec3};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::Triangle;

/// Axis-aligned bounding box.
///
/// Box is considered empty when `max < min` on any of the axes; the default
/// box spans from `+inf` to `-inf`, which makes it the neutral element of
/// enlargement - enlarging it by anything yields exactly that thing's box.
///
/// All operations are total: degenerate boxes produce infinities or NaNs as
/// dictated by IEEE-754 instead of being rejected.
#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
}

impl BoundingBox {
    /// Creates a box out of given corners, without reordering them.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self::new(Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY))
    }

    pub fn from_triangle(triangle: Triangle) -> Self {
        let mut this = Self::empty();

        this.enlarge_triangle(triangle);
        this
    }

    /// Creates the smallest box containing all given triangles.
    pub fn from_triangles(
        triangles: impl IntoIterator<Item = Triangle>,
    ) -> Self {
        triangles.into_iter().collect()
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn enlarge_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn enlarge_triangle(&mut self, triangle: Triangle) {
        self.enlarge_point(triangle.a());
        self.enlarge_point(triangle.b());
        self.enlarge_point(triangle.c());
    }

    pub fn enlarge_box(&mut self, other: Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Moves both corners away from the center by `amount`.
    pub fn inflate(&mut self, amount: f32) {
        self.min -= Vec3::splat(amount);
        self.max += Vec3::splat(amount);
    }

    pub fn diag(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn extent(&self) -> Vec3 {
        self.diag()
    }

    pub fn center(&self) -> Vec3 {
        0.5 * (self.max + self.min)
    }

    /// Maps `point` from `self.min() ..= self.max()` to `0.0 ..= 1.0`.
    ///
    /// Axes with zero extent produce infinities / NaNs - it's up to the caller
    /// to make sure the box is not degenerate.
    pub fn relative_pos(&self, point: Vec3) -> Vec3 {
        (point - self.min) / self.diag()
    }

    /// Returns half of the surface area, used as the SAH cost metric.
    pub fn half_area(&self) -> f32 {
        if self.is_empty() {
            return f32::MAX;
        }

        let extent = self.extent();

        extent.x * extent.y + extent.y * extent.z + extent.z * extent.x
    }

    pub fn intersection(&self, other: Self) -> Self {
        Self::new(self.min.max(other.min), self.max.min(other.max))
    }

    pub fn intersects(&self, other: Self) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        (self.max.x < self.min.x)
            | (self.max.y < self.min.y)
            | (self.max.z < self.min.z)
    }

    /// Checks whether `min <= max` on all axes; NaN corners make the box
    /// invalid.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn contains(&self, point: Vec3) -> bool {
        (point.x >= self.min.x)
            & (point.y >= self.min.y)
            & (point.z >= self.min.z)
            & (point.x <= self.max.x)
            & (point.y <= self.max.y)
            & (point.z <= self.max.z)
    }

    pub fn distance(&self, point: Vec3) -> f32 {
        self.distance_sq(point).sqrt()
    }

    pub fn distance_sq(&self, point: Vec3) -> f32 {
        (point - point.max(self.min).min(self.max)).length_squared()
    }

    /// Returns signed distance from `point` to this box's surface - negative
    /// inside, positive outside.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        let q = (point - self.center()).abs() - 0.5 * self.diag();
        let outside = q.max(Vec3::ZERO).length();
        let inside = q.max_element().min(0.0);

        outside + inside
    }

    /// Checks whether given triangle overlaps this box, using the separating
    /// axis theorem.
    ///
    /// Thirteen axes get tested: three box normals, the triangle's normal and
    /// nine cross products between the triangle's edges and box normals; the
    /// cheap ones go first.
    pub fn intersects_triangle(&self, triangle: Triangle) -> bool {
        let triangle_vertices = triangle.vertices();

        // Box normals, i.e. plain per-axis overlap
        for (axis, min, max) in [
            (Vec3::X, self.min.x, self.max.x),
            (Vec3::Y, self.min.y, self.max.y),
            (Vec3::Z, self.min.z, self.max.z),
        ] {
            let (triangle_min, triangle_max) =
                project(&triangle_vertices, axis);

            if (triangle_max < min) | (triangle_min > max) {
                return false;
            }
        }

        // ---

        let box_vertices = self.vertices();
        let triangle_normal = triangle.normal();
        let triangle_offset = triangle_normal.dot(triangle.a());
        let (box_min, box_max) = project(&box_vertices, triangle_normal);

        if (box_max < triangle_offset) | (box_min > triangle_offset) {
            return false;
        }

        // ---

        let edges = [
            triangle.a() - triangle.b(),
            triangle.a() - triangle.c(),
            triangle.b() - triangle.c(),
        ];

        for edge in edges {
            for normal in [Vec3::X, Vec3::Y, Vec3::Z] {
                let axis = edge.cross(normal);
                let (box_min, box_max) = project(&box_vertices, axis);

                let (triangle_min, triangle_max) =
                    project(&triangle_vertices, axis);

                if (box_max < triangle_min) | (box_min > triangle_max) {
                    return false;
                }
            }
        }

        true
    }

    /// Intersects this box with a ray using the slab method, returning the
    /// `(entry, exit)` distances along the ray.
    ///
    /// When the ray misses, returns `(f32::MAX, f32::MAX)`. When the box lies
    /// behind the ray, the returned `exit` is negative - this is not filtered
    /// out here.
    ///
    /// Direction components equal to zero are not special-cased: they produce
    /// infinities that get handled by the comparisons, except when the origin
    /// lies exactly on that axis' slab plane, which yields NaN.
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3) -> (f32, f32) {
        let mut tmin = (self.min.x - origin.x) / direction.x;
        let mut tmax = (self.max.x - origin.x) / direction.x;

        if tmin > tmax {
            mem::swap(&mut tmin, &mut tmax);
        }

        let mut tymin = (self.min.y - origin.y) / direction.y;
        let mut tymax = (self.max.y - origin.y) / direction.y;

        if tymin > tymax {
            mem::swap(&mut tymin, &mut tymax);
        }

        if (tmin > tymax) | (tymin > tmax) {
            return (f32::MAX, f32::MAX);
        }

        if tymin > tmin {
            tmin = tymin;
        }

        if tymax < tmax {
            tmax = tymax;
        }

        let mut tzmin = (self.min.z - origin.z) / direction.z;
        let mut tzmax = (self.max.z - origin.z) / direction.z;

        if tzmin > tzmax {
            mem::swap(&mut tzmin, &mut tzmax);
        }

        if (tmin > tzmax) | (tzmin > tmax) {
            return (f32::MAX, f32::MAX);
        }

        if tzmin > tmin {
            tmin = tzmin;
        }

        if tzmax < tmax {
            tmax = tzmax;
        }

        (tmin, tmax)
    }

    /// Returns all eight corners; corner `i` takes `max` on the x axis if bit
    /// #2 of `i` is set, on the y axis if bit #1 is set and on the z axis if
    /// bit #0 is set.
    pub fn vertices(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);

        [
            vec3(min.x, min.y, min.z),
            vec3(min.x, min.y, max.z),
            vec3(min.x, max.y, min.z),
            vec3(min.x, max.y, max.z),
            vec3(max.x, min.y, min.z),
            vec3(max.x, min.y, max.z),
            vec3(max.x, max.y, min.z),
            vec3(max.x, max.y, max.z),
        ]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Projects given points onto `axis`, returning the `(min, max)` of the
/// resulting 1D interval.
pub fn project<const N: usize>(points: &[Vec3; N], axis: Vec3) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;

    for point in points {
        let value = axis.dot(*point);

        min = min.min(value);
        max = max.max(value);
    }

    (min, max)
}

impl Add<Vec3> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Vec3) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Vec3> for BoundingBox {
    fn add_assign(&mut self, rhs: Vec3) {
        self.enlarge_point(rhs);
    }
}

impl Add<Triangle> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Triangle) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Triangle> for BoundingBox {
    fn add_assign(&mut self, rhs: Triangle) {
        self.enlarge_triangle(rhs);
    }
}

impl Add<Self> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Self> for BoundingBox {
    fn add_assign(&mut self, rhs: Self) {
        self.enlarge_box(rhs);
    }
}

impl FromIterator<Vec3> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Vec3>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

impl FromIterator<Triangle> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Triangle>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

impl FromIterator<Self> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Self>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}
