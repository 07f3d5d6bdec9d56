use core::mem;

use glam::Vec4;

use crate::{
    BoundingBox, BvhStack, BvhView, BvhViewNode, Triangle, TriangleId,
    TrianglesView, BVH_STACK_SIZE,
};

/// Query that can be driven through [`traverse()`].
pub trait BvhVisitor {
    /// Returns the distance at which given node becomes relevant, or
    /// `f32::MAX` if it's not relevant at all.
    fn node_distance(&self, bb: BoundingBox) -> f32;

    /// Returns the distance of the best candidate found so far; nodes that
    /// begin at or past it get skipped.
    fn best_distance(&self) -> f32;

    /// Tests given triangle; returning `true` stops the traversal.
    fn visit(&mut self, triangle_id: TriangleId, triangle: Triangle) -> bool;
}

/// Walks the BVH nearest-node-first, feeding leaf triangles into `visitor`.
///
/// Returns an estimation of the memory read along the way, useful for
/// debugging.
pub fn traverse<V>(
    visitor: &mut V,
    local_idx: u32,
    triangles: TrianglesView,
    bvh: BvhView,
    stack: BvhStack,
) -> u32
where
    V: BvhVisitor,
{
    let mut used_memory = 0;

    // Index into the `bvh` array; points at the currently processed node
    let mut bvh_ptr = 0;

    // Where this particular thread's stack starts at; see `BvhStack`
    let stack_begins_at = (local_idx as usize) * BVH_STACK_SIZE;

    // Index into the `stack` array; our stack spans from here up to +
    // BVH_STACK_SIZE items
    let mut stack_ptr = stack_begins_at;

    loop {
        match bvh.get_node(bvh_ptr) {
            BvhViewNode::Internal {
                left_bb,
                left_ptr,
                right_bb,
                right_ptr,
            } => {
                used_memory += 4 * mem::size_of::<Vec4>() as u32;

                let mut near_ptr = left_ptr;
                let mut far_ptr = right_ptr;
                let mut near_distance = visitor.node_distance(left_bb);
                let mut far_distance = visitor.node_distance(right_bb);

                if far_distance < near_distance {
                    mem::swap(&mut near_ptr, &mut far_ptr);
                    mem::swap(&mut near_distance, &mut far_distance);
                }

                // If the nearest child is closer than our current best shot,
                // let's check that child first; use stack to save the other
                // node for later.
                //
                // The reasoning here goes that the closer child is more likely
                // to contain the best candidate; but if it doesn't, we still
                // have to check the other node.
                if far_distance < visitor.best_distance() {
                    unsafe {
                        *stack.get_unchecked_mut(stack_ptr) = far_ptr;
                        stack_ptr += 1;
                    }
                }

                if near_distance < visitor.best_distance() {
                    bvh_ptr = near_ptr;
                    continue;
                }
            }

            BvhViewNode::Leaf {
                triangle_id,
                has_more,
            } => {
                used_memory += (mem::size_of::<Vec4>()
                    + mem::size_of::<Triangle>())
                    as u32;

                if visitor.visit(triangle_id, triangles.get(triangle_id)) {
                    break;
                }

                if has_more {
                    bvh_ptr += 1;
                    continue;
                }
            }
        }

        // If the control flow got here, then it means we either tested a
        // leaf-node or tested an internal-node and got a miss.
        //
        // In any case, now it's the time to pop the next node from the stack
        // and investigate it; if the stack is empty, then we've tested all
        // nodes and we can safely bail out.
        if stack_ptr > stack_begins_at {
            unsafe {
                stack_ptr -= 1;
                bvh_ptr = *stack.get_unchecked(stack_ptr);
            }
        } else {
            break;
        }
    }

    used_memory
}
