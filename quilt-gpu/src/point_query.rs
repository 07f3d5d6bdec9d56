use glam::{vec4, Vec3, Vec4, Vec4Swizzles};

use crate::{
    traverse, BoundingBox, BvhStack, BvhView, BvhVisitor, Triangle, TriangleId,
    TrianglesView,
};

#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct ClosestHit {
    pub point: Vec3,
    pub distance_sq: f32,
    pub triangle_id: TriangleId,
}

impl ClosestHit {
    pub fn none() -> Self {
        Self {
            point: Default::default(),
            distance_sq: f32::MAX,
            triangle_id: TriangleId::new(0),
        }
    }

    pub fn unpack([d0, d1]: [Vec4; 2]) -> Self {
        Self {
            point: d0.xyz(),
            distance_sq: d0.w,
            triangle_id: TriangleId::new(d1.x.to_bits()),
        }
    }

    pub fn pack(self) -> [Vec4; 2] {
        [
            self.point.extend(self.distance_sq),
            vec4(f32::from_bits(self.triangle_id.get()), 0.0, 0.0, 0.0),
        ]
    }

    pub fn is_some(self) -> bool {
        self.distance_sq < f32::MAX
    }
}

impl Default for ClosestHit {
    fn default() -> Self {
        Self::none()
    }
}

/// Looks for the triangle closest to a point.
///
/// Goes through the same [`traverse()`] as [`crate::Ray::trace_nearest()`],
/// except that nodes get ordered and pruned by their squared distance to the
/// point.
#[derive(Clone, Copy)]
pub struct PointQuery {
    point: Vec3,
    max_distance_sq: f32,
}

impl PointQuery {
    pub fn new(point: Vec3) -> Self {
        Self {
            point,
            max_distance_sq: f32::MAX,
        }
    }

    /// Ignores triangles farther than `max_distance`.
    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance_sq = max_distance * max_distance;
        self
    }

    pub fn point(&self) -> Vec3 {
        self.point
    }

    pub fn find_closest(
        self,
        local_idx: u32,
        triangles: TrianglesView,
        bvh: BvhView,
        stack: BvhStack,
    ) -> ClosestHit {
        let mut visitor = PointVisitor {
            point: self.point,
            hit: ClosestHit {
                distance_sq: self.max_distance_sq,
                ..ClosestHit::none()
            },
            found: false,
        };

        traverse(&mut visitor, local_idx, triangles, bvh, stack);

        if visitor.found {
            visitor.hit
        } else {
            ClosestHit::none()
        }
    }
}

struct PointVisitor {
    point: Vec3,
    hit: ClosestHit,
    found: bool,
}

impl BvhVisitor for PointVisitor {
    fn node_distance(&self, bb: BoundingBox) -> f32 {
        bb.distance_sq(self.point)
    }

    fn best_distance(&self) -> f32 {
        self.hit.distance_sq
    }

    fn visit(&mut self, triangle_id: TriangleId, triangle: Triangle) -> bool {
        let point = triangle.closest_point(self.point);
        let distance_sq = (point - self.point).length_squared();

        if distance_sq < self.hit.distance_sq {
            self.hit.point = point;
            self.hit.distance_sq = distance_sq;
            self.hit.triangle_id = triangle_id;
            self.found = true;
        }

        false
    }
}
