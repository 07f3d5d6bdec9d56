use glam::{Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;

use crate::{BoundingBox, TriangleId};

/// Read-only view over a flattened BVH, as produced by the host-side
/// serializer.
///
/// Layout:
///
/// - internal node takes four entries: `[left.min, left.max, right.min,
///   right.max]`, with `left.max.w` holding (as bits) pointer to the right
///   child; the left child always begins right after its parent,
///
/// - leaf node takes one entry per triangle, with `w` set to `1` (as bits),
///   `x` set to `1` (as bits) if the next entry belongs to the same leaf and
///   `y` holding the triangle id.
#[derive(Clone, Copy)]
pub struct BvhView<'a> {
    buffer: &'a [Vec4],
}

impl<'a> BvhView<'a> {
    pub const OP_INTERNAL: u32 = 0;
    pub const OP_LEAF: u32 = 1;

    pub fn new(buffer: &'a [Vec4]) -> Self {
        Self { buffer }
    }

    pub fn get(&self, ptr: u32) -> Vec4 {
        unsafe { *self.buffer.index_unchecked(ptr as usize) }
    }

    pub fn get_node(&self, ptr: u32) -> BvhViewNode {
        let d0 = self.get(ptr);

        if d0.w.to_bits() == Self::OP_INTERNAL {
            let d1 = self.get(ptr + 1);
            let d2 = self.get(ptr + 2);
            let d3 = self.get(ptr + 3);

            BvhViewNode::Internal {
                left_bb: BoundingBox::new(d0.xyz(), d1.xyz()),
                left_ptr: ptr + 4,
                right_bb: BoundingBox::new(d2.xyz(), d3.xyz()),
                right_ptr: d1.w.to_bits(),
            }
        } else {
            BvhViewNode::Leaf {
                triangle_id: TriangleId::new(d0.y.to_bits()),
                has_more: d0.x.to_bits() & 1 == 1,
            }
        }
    }
}

#[derive(Clone, Copy)]
pub enum BvhViewNode {
    Internal {
        left_bb: BoundingBox,
        left_ptr: u32,
        right_bb: BoundingBox,
        right_ptr: u32,
    },

    Leaf {
        triangle_id: TriangleId,
        has_more: bool,
    },
}
