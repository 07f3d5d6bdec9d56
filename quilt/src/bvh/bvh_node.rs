use crate::gpu;

#[derive(Clone, Debug)]
pub enum BvhNode {
    Internal {
        bb: gpu::BoundingBox,
        left: Box<Self>,
        right: Box<Self>,
    },

    Leaf {
        bb: gpu::BoundingBox,
        triangles: Vec<gpu::TriangleId>,
    },
}

impl BvhNode {
    pub fn bb(&self) -> gpu::BoundingBox {
        match self {
            BvhNode::Internal { bb, .. } => *bb,
            BvhNode::Leaf { bb, .. } => *bb,
        }
    }

    /// Returns the number of internal nodes on the longest path from this node
    /// down to a leaf, i.e. the traversal stack size this subtree requires.
    pub fn depth(&self) -> usize {
        match self {
            BvhNode::Internal { left, right, .. } => {
                1 + left.depth().max(right.depth())
            }
            BvhNode::Leaf { .. } => 0,
        }
    }

    pub fn stats(&self) -> BvhStats {
        match self {
            BvhNode::Internal { left, right, .. } => {
                let left = left.stats();
                let right = right.stats();

                BvhStats {
                    nodes: 1 + left.nodes + right.nodes,
                    leaves: left.leaves + right.leaves,
                    depth: 1 + left.depth.max(right.depth),
                    triangles: left.triangles + right.triangles,
                }
            }

            BvhNode::Leaf { triangles, .. } => BvhStats {
                nodes: 1,
                leaves: 1,
                depth: 0,
                triangles: triangles.len(),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
    pub triangles: usize,
}
