use glam::{Vec3, Vec4, Vec4Swizzles};

use crate::{
    traverse, BoundingBox, BvhStack, BvhView, BvhVisitor, Triangle,
    TriangleHit, TriangleId, TrianglesView,
};

#[derive(Copy, Clone, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn pack(self) -> [Vec4; 2] {
        [self.origin.extend(0.0), self.direction.extend(0.0)]
    }

    pub fn unpack([d0, d1]: [Vec4; 2]) -> Self {
        Self::new(d0.xyz(), d1.xyz())
    }

    /// Returns the range along this ray that lies inside given box, with the
    /// near end clamped to `min_near` (so that samples never start behind the
    /// camera's near plane).
    ///
    /// When the ray misses the box, returns `(f32::MAX, f32::MAX)`.
    pub fn near_far(self, bb: BoundingBox, min_near: f32) -> (f32, f32) {
        let (near, far) = bb.intersect_ray(self.origin, self.direction);

        if near == f32::MAX {
            return (near, far);
        }

        (near.max(min_near), far)
    }

    /// Traces this ray and returns its nearest hit, together with the amount
    /// of BVH memory touched along the way.
    pub fn trace_nearest(
        self,
        local_idx: u32,
        triangles: TrianglesView,
        bvh: BvhView,
        stack: BvhStack,
    ) -> (TriangleHit, u32) {
        let mut visitor = RayVisitor {
            ray: self,
            hit: TriangleHit::none(),
            mode: TracingMode::Nearest,
        };

        let used_memory =
            traverse(&mut visitor, local_idx, triangles, bvh, stack);

        (visitor.hit, used_memory)
    }

    /// Traces this ray and returns whether it hits anything up to the given
    /// distance.
    pub fn trace_any(
        self,
        local_idx: u32,
        triangles: TrianglesView,
        bvh: BvhView,
        stack: BvhStack,
        max_distance: f32,
    ) -> bool {
        let mut visitor = RayVisitor {
            ray: self,
            hit: TriangleHit {
                distance: max_distance,
                ..TriangleHit::none()
            },
            mode: TracingMode::Any,
        };

        traverse(&mut visitor, local_idx, triangles, bvh, stack);

        visitor.hit.distance < max_distance
    }

    /// Returns distance at which this ray enters given node, or `f32::MAX` if
    /// the node is missed or lies behind the ray.
    ///
    /// Nodes for which the slab test yields NaN (ray running exactly along one
    /// of the node's faces) are treated as missed.
    pub fn distance_to_node(self, bb: BoundingBox) -> f32 {
        let (tmin, tmax) = bb.intersect_ray(self.origin, self.direction);

        if tmax >= tmin && tmax >= 0.0 {
            tmin
        } else {
            f32::MAX
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TracingMode {
    Nearest,
    Any,
}

struct RayVisitor {
    ray: Ray,
    hit: TriangleHit,
    mode: TracingMode,
}

impl BvhVisitor for RayVisitor {
    fn node_distance(&self, bb: BoundingBox) -> f32 {
        self.ray.distance_to_node(bb)
    }

    fn best_distance(&self) -> f32 {
        self.hit.distance
    }

    fn visit(&mut self, triangle_id: TriangleId, triangle: Triangle) -> bool {
        if !triangle.hit(self.ray, &mut self.hit) {
            return false;
        }

        self.hit.triangle_id = triangle_id;
        self.mode == TracingMode::Any
    }
}
