use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4, Vec4Swizzles};

use crate::{Ray, TriangleHit};

/// Triangle, as seen by both the builder and the shaders.
///
/// Vertices are packed into `Vec4`s so that an array of triangles can be
/// uploaded into a storage buffer as-is; the `w` components are unused.
#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct Triangle {
    pub d0: Vec4,
    pub d1: Vec4,
    pub d2: Vec4,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            d0: a.extend(0.0),
            d1: b.extend(0.0),
            d2: c.extend(0.0),
        }
    }

    pub fn a(&self) -> Vec3 {
        self.d0.xyz()
    }

    pub fn b(&self) -> Vec3 {
        self.d1.xyz()
    }

    pub fn c(&self) -> Vec3 {
        self.d2.xyz()
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a(), self.b(), self.c()]
    }

    /// Returns the unit normal, following the `a -> b -> c` winding.
    ///
    /// Zero-area triangles yield a zero vector.
    pub fn normal(&self) -> Vec3 {
        (self.b() - self.a())
            .cross(self.c() - self.a())
            .normalize_or_zero()
    }

    pub fn center(&self) -> Vec3 {
        (self.a() + self.b() + self.c()) / 3.0
    }

    pub fn surface_area(&self) -> f32 {
        0.5 * (self.b() - self.a()).cross(self.c() - self.a()).length()
    }

    /// Intersects this triangle with given ray using Möller-Trumbore; when the
    /// intersection is closer than `hit.distance`, updates `hit` and returns
    /// `true`.
    ///
    /// Doesn't touch `hit.triangle_id` - that's up to the caller.
    pub fn hit(&self, ray: Ray, hit: &mut TriangleHit) -> bool {
        let v0v1 = self.b() - self.a();
        let v0v2 = self.c() - self.a();

        // ---

        let pvec = ray.direction().cross(v0v2);
        let det = v0v1.dot(pvec);

        // `det` scales with the triangle's area, so only an exactly parallel
        // ray can be told apart here; near-parallel ones fail on `u` / `v`
        if det == 0.0 {
            return false;
        }

        // ---

        let inv_det = 1.0 / det;
        let tvec = ray.origin() - self.a();
        let u = tvec.dot(pvec) * inv_det;
        let qvec = tvec.cross(v0v1);
        let v = ray.direction().dot(qvec) * inv_det;
        let distance = v0v2.dot(qvec) * inv_det;

        if (u < 0.0)
            | (u > 1.0)
            | (v < 0.0)
            | (u + v > 1.0)
            | (distance <= 0.0)
            | (distance >= hit.distance)
        {
            return false;
        }

        hit.distance = distance;
        hit.point = ray.at(distance);
        hit.normal = self.normal();

        true
    }

    /// Returns the point on this triangle that's closest to `p`.
    ///
    /// See: Real-Time Collision Detection, 5.1.5.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        let a = self.a();
        let b = self.b();
        let c = self.c();

        let ab = b - a;
        let ac = c - a;
        let ap = p - a;

        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);

        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = p - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);

        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;

        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            return a + ab * (d1 / (d1 - d3));
        }

        let cp = p - c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);

        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;

        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            return a + ac * (d2 / (d2 - d6));
        }

        let va = d3 * d6 - d5 * d4;

        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
        }

        let denom = 1.0 / (va + vb + vc);

        a + ab * (vb * denom) + ac * (vc * denom)
    }

    pub fn distance_sq(&self, p: Vec3) -> f32 {
        (p - self.closest_point(p)).length_squared()
    }
}

#[derive(Copy, Clone, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq, Eq, Hash))]
pub struct TriangleId(u32);

impl TriangleId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}
