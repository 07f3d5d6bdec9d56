use bytemuck::{Pod, Zeroable};
use glam::{Vec4, Vec4Swizzles};

use crate::BoundingBox;

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct TracingPassParams {
    /// Number of rays in the buffer; lanes past it do nothing.
    pub count: u32,

    /// For any-hit queries, hits farther than this are ignored.
    pub max_distance: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ClosestPointPassParams {
    pub count: u32,
    pub max_distance: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct NearFarPassParams {
    /// Box to clip rays against, with `min_near` stashed in `bb_min.w` and
    /// the number of rays (as bits) in `bb_max.w`.
    pub bb_min: Vec4,
    pub bb_max: Vec4,
}

impl NearFarPassParams {
    pub fn new(bb: BoundingBox, min_near: f32, count: u32) -> Self {
        Self {
            bb_min: bb.min().extend(min_near),
            bb_max: bb.max().extend(f32::from_bits(count)),
        }
    }

    pub fn bb(&self) -> BoundingBox {
        BoundingBox::new(self.bb_min.xyz(), self.bb_max.xyz())
    }

    pub fn min_near(&self) -> f32 {
        self.bb_min.w
    }

    pub fn count(&self) -> u32 {
        self.bb_max.w.to_bits()
    }
}
