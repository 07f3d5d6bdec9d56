use glam::Vec3;

use crate::gpu;

#[derive(Clone, Copy, Debug)]
pub struct BvhTriangle {
    pub bb: gpu::BoundingBox,
    pub center: Vec3,
    pub triangle_id: gpu::TriangleId,
}

impl BvhTriangle {
    pub fn new(triangle_id: gpu::TriangleId, triangle: gpu::Triangle) -> Self {
        Self {
            bb: gpu::BoundingBox::from_triangle(triangle),
            center: triangle.center(),
            triangle_id,
        }
    }
}
