use glam::{vec4, Vec4};

use super::BvhNode;
use crate::gpu;

/// Flattens the tree into the layout understood by [`gpu::BvhView`].
pub struct BvhSerializer;

impl BvhSerializer {
    pub fn serialize(root: &BvhNode) -> Vec<Vec4> {
        let mut out = Vec::new();

        Self::process(&mut out, root);
        out
    }

    fn process(out: &mut Vec<Vec4>, node: &BvhNode) {
        match node {
            BvhNode::Internal { left, right, .. } => {
                let ptr = out.len();

                out.extend([Vec4::ZERO; 4]);

                Self::process(out, left);

                let right_ptr = out.len() as u32;

                Self::process(out, right);

                let left_bb = left.bb();
                let right_bb = right.bb();

                out[ptr] = left_bb
                    .min()
                    .extend(f32::from_bits(gpu::BvhView::OP_INTERNAL));

                out[ptr + 1] = left_bb.max().extend(f32::from_bits(right_ptr));
                out[ptr + 2] = right_bb.min().extend(0.0);
                out[ptr + 3] = right_bb.max().extend(0.0);
            }

            BvhNode::Leaf { triangles, .. } => {
                for (idx, triangle_id) in triangles.iter().enumerate() {
                    let has_more = idx + 1 < triangles.len();

                    out.push(vec4(
                        f32::from_bits(has_more as u32),
                        f32::from_bits(triangle_id.get()),
                        0.0,
                        f32::from_bits(gpu::BvhView::OP_LEAF),
                    ));
                }
            }
        }
    }
}
