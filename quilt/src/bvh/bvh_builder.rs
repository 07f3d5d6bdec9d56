use std::mem;

use super::{Axis, BvhConfig, BvhNode, BvhTriangle};
use crate::gpu::BoundingBox;

const BINS: usize = 32;

/// Builds BVH using binned SAH, falling back to median splits for subtrees
/// that would otherwise grow deeper than `config.max_depth`.
///
/// Special thanks to:
/// - https://jacco.ompf2.com/2022/04/13/how-to-build-a-bvh-part-1-basics/,
/// - https://github.com/svenstaro/bvh.
pub fn build(
    triangles: impl IntoIterator<Item = BvhTriangle>,
    config: &BvhConfig,
) -> BvhNode {
    let mut root = SahBvhNode::default();

    for triangle in triangles {
        root.add(triangle);
    }

    root.balance(config, 0);
    root.map(config)
}

#[derive(Default)]
struct SahBvhNode {
    bb: BoundingBox,
    tris: Vec<BvhTriangle>,
    children: Option<[Box<Self>; 2]>,
}

impl SahBvhNode {
    fn add(&mut self, triangle: BvhTriangle) {
        self.bb += triangle.bb;
        self.tris.push(triangle);
    }

    /// Splits this node, knowing that it lies `depth` internal nodes below the
    /// root.
    fn balance(&mut self, config: &BvhConfig, depth: usize) {
        // Once SAH could push the tree past `max_depth`, switch to splitting by
        // count - it halves the node on each level, so it needs exactly
        // `median_depth()` more levels
        let needed_depth =
            median_depth(self.tris.len(), config.max_leaf_triangles);

        if depth + needed_depth >= config.max_depth {
            if self.tris.len() > config.max_leaf_triangles {
                self.split_by_median(config, depth);
            }

            return;
        }

        let Some(plane) = self.find_splitting_plane() else {
            return;
        };

        let current_cost = (self.tris.len() as f32) * self.bb.half_area();

        if plane.cost < current_cost
            || self.tris.len() > config.max_leaf_triangles
        {
            self.split_by_plane(config, depth, plane);
        }
    }

    fn find_splitting_plane(&self) -> Option<SplittingPlane> {
        #[derive(Clone, Copy, Default)]
        struct SahBin {
            bb: BoundingBox,
            count: usize,
        }

        if self.tris.len() <= 1 {
            return None;
        }

        let mut best: Option<SplittingPlane> = None;

        let centroid_bb: BoundingBox =
            self.tris.iter().map(|triangle| triangle.center).collect();

        for axis in Axis::all() {
            let extent = centroid_bb.extent()[axis];

            // All centroids lie on the same plane, so there's nothing to split
            // along this axis
            if extent <= 0.0 || !extent.is_finite() {
                continue;
            }

            let min = centroid_bb.min()[axis];
            let scale = (BINS as f32) / extent;
            let mut bins = [SahBin::default(); BINS];

            for triangle in &self.tris {
                let bin = &mut bins[bin_of(triangle.center[axis], min, scale)];

                bin.bb += triangle.bb;
                bin.count += 1;
            }

            // ---

            let mut left_areas = [0.0; BINS - 1];
            let mut right_areas = [0.0; BINS - 1];
            let mut left_counts = [0; BINS - 1];
            let mut right_counts = [0; BINS - 1];
            let mut left_bb = BoundingBox::default();
            let mut right_bb = BoundingBox::default();
            let mut left_count = 0;
            let mut right_count = 0;

            for i in 0..(BINS - 1) {
                left_count += bins[i].count;
                left_counts[i] = left_count;

                left_bb += bins[i].bb;
                left_areas[i] = left_bb.half_area();

                right_count += bins[BINS - 1 - i].count;
                right_counts[BINS - 2 - i] = right_count;

                right_bb += bins[BINS - 1 - i].bb;
                right_areas[BINS - 2 - i] = right_bb.half_area();
            }

            // ---

            for bin in 0..(BINS - 1) {
                if left_counts[bin] == 0 || right_counts[bin] == 0 {
                    continue;
                }

                let cost = (left_counts[bin] as f32) * left_areas[bin]
                    + (right_counts[bin] as f32) * right_areas[bin];

                let is_current_bin_better =
                    best.as_ref().map_or(true, |best| cost < best.cost);

                if is_current_bin_better {
                    best = Some(SplittingPlane {
                        axis,
                        bin,
                        min,
                        scale,
                        cost,
                    });
                }
            }
        }

        best
    }

    fn split_by_plane(
        &mut self,
        config: &BvhConfig,
        depth: usize,
        plane: SplittingPlane,
    ) {
        let mut left = Self::default();
        let mut right = Self::default();

        for triangle in mem::take(&mut self.tris) {
            let side = if plane.is_left(&triangle) {
                &mut left
            } else {
                &mut right
            };

            side.add(triangle);
        }

        self.attach(config, depth, left, right);
    }

    /// Sorts triangles along the widest axis and splits them in half by
    /// count.
    fn split_by_median(&mut self, config: &BvhConfig, depth: usize) {
        let extent = self
            .tris
            .iter()
            .map(|triangle| triangle.center)
            .collect::<BoundingBox>()
            .extent();

        let axis = Axis::all().fold(Axis::X, |widest, axis| {
            if extent[axis] > extent[widest] {
                axis
            } else {
                widest
            }
        });

        let mut tris = mem::take(&mut self.tris);

        tris.sort_unstable_by(|lhs, rhs| {
            lhs.center[axis].total_cmp(&rhs.center[axis])
        });

        let right_tris = tris.split_off(tris.len() / 2);
        let mut left = Self::default();
        let mut right = Self::default();

        for triangle in tris {
            left.add(triangle);
        }

        for triangle in right_tris {
            right.add(triangle);
        }

        self.attach(config, depth, left, right);
    }

    fn attach(
        &mut self,
        config: &BvhConfig,
        depth: usize,
        mut left: Self,
        mut right: Self,
    ) {
        // Both halves are disjoint, so they can be balanced independently
        if left.tris.len() + right.tris.len() >= config.parallel_threshold {
            rayon::join(
                || left.balance(config, depth + 1),
                || right.balance(config, depth + 1),
            );
        } else {
            left.balance(config, depth + 1);
            right.balance(config, depth + 1);
        }

        self.children = Some([Box::new(left), Box::new(right)]);
    }

    fn map(self, config: &BvhConfig) -> BvhNode {
        let mut bb = self.bb;

        bb.inflate(config.padding);

        if let Some([left, right]) = self.children {
            BvhNode::Internal {
                bb,
                left: Box::new(left.map(config)),
                right: Box::new(right.map(config)),
            }
        } else {
            BvhNode::Leaf {
                bb,
                triangles: self
                    .tris
                    .into_iter()
                    .map(|triangle| triangle.triangle_id)
                    .collect(),
            }
        }
    }
}

struct SplittingPlane {
    axis: Axis,
    bin: usize,
    min: f32,
    scale: f32,
    cost: f32,
}

impl SplittingPlane {
    /// Checks whether given triangle lands on the left side of this plane.
    ///
    /// Goes through the same binning as the cost estimation, so that the
    /// actual split always matches the estimated one.
    fn is_left(&self, triangle: &BvhTriangle) -> bool {
        bin_of(triangle.center[self.axis], self.min, self.scale) <= self.bin
    }
}

fn bin_of(value: f32, min: f32, scale: f32) -> usize {
    (((value - min) * scale) as usize).min(BINS - 1)
}

/// Returns how many levels of halving it takes to bring `count` triangles down
/// to leaves of at most `max_leaf_triangles`.
fn median_depth(count: usize, max_leaf_triangles: usize) -> usize {
    let mut depth = 0;
    let mut capacity = max_leaf_triangles.max(1);

    while capacity < count {
        capacity = capacity.saturating_mul(2);
        depth += 1;
    }

    depth
}

#[cfg(test)]
mod tests {
    use glam::{vec3, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::gpu;

    fn triangle(offset: Vec3) -> gpu::Triangle {
        gpu::Triangle::new(
            offset,
            offset + vec3(1.0, 0.0, 0.0),
            offset + vec3(0.0, 1.0, 0.0),
        )
    }

    fn bvh_triangles(
        triangles: &[gpu::Triangle],
    ) -> impl Iterator<Item = BvhTriangle> + '_ {
        triangles.iter().enumerate().map(|(id, triangle)| {
            BvhTriangle::new(gpu::TriangleId::new(id as u32), *triangle)
        })
    }

    fn random_triangles(seed: u64, count: usize) -> Vec<gpu::Triangle> {
        let mut rng = StdRng::seed_from_u64(seed);

        (0..count)
            .map(|_| {
                let offset = vec3(
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                );

                gpu::Triangle::new(
                    offset,
                    offset + vec3(rng.gen_range(0.1..2.0), 0.0, 0.0),
                    offset + vec3(0.0, rng.gen_range(0.1..2.0), 0.5),
                )
            })
            .collect()
    }

    fn collect_ids(node: &BvhNode, out: &mut Vec<u32>) {
        match node {
            BvhNode::Internal { left, right, .. } => {
                collect_ids(left, out);
                collect_ids(right, out);
            }
            BvhNode::Leaf { triangles, .. } => {
                out.extend(triangles.iter().map(|id| id.get()));
            }
        }
    }

    fn contains_box(outer: BoundingBox, inner: BoundingBox) -> bool {
        outer.contains(inner.min()) && outer.contains(inner.max())
    }

    fn assert_node_contains_children(
        node: &BvhNode,
        triangles: &[gpu::Triangle],
    ) {
        match node {
            BvhNode::Internal { bb, left, right } => {
                assert!(contains_box(*bb, left.bb()));
                assert!(contains_box(*bb, right.bb()));

                assert_node_contains_children(left, triangles);
                assert_node_contains_children(right, triangles);
            }

            BvhNode::Leaf { bb, triangles: ids } => {
                assert!(!ids.is_empty());

                for id in ids {
                    let triangle = triangles[id.get() as usize];

                    assert!(contains_box(
                        *bb,
                        BoundingBox::from_triangle(triangle)
                    ));
                }
            }
        }
    }

    #[test]
    fn single_triangle() {
        let triangles = [triangle(Vec3::ZERO)];
        let root = build(bvh_triangles(&triangles), &BvhConfig::default());

        let BvhNode::Leaf { bb, triangles: ids } = root else {
            panic!("expected a leaf");
        };

        assert_eq!(BoundingBox::from_triangle(triangles[0]), bb);
        assert_eq!(vec![gpu::TriangleId::new(0)], ids);
    }

    #[test]
    fn distant_triangles_get_separated() {
        let triangles = [
            triangle(vec3(-100.0, 0.0, 0.0)),
            triangle(vec3(100.0, 0.0, 0.0)),
        ];

        let root = build(bvh_triangles(&triangles), &BvhConfig::default());

        let BvhNode::Internal { bb, left, right } = root else {
            panic!("expected an internal node");
        };

        assert_eq!(BoundingBox::from_triangles(triangles), bb);

        let mut ids = Vec::new();

        collect_ids(&left, &mut ids);
        assert_eq!(vec![0], ids);

        ids.clear();
        collect_ids(&right, &mut ids);
        assert_eq!(vec![1], ids);
    }

    #[test]
    fn coincident_triangles_stay_in_one_leaf() {
        let triangles = vec![triangle(Vec3::ONE); 20];

        let root = build(
            bvh_triangles(&triangles),
            &BvhConfig::default().with_max_leaf_triangles(1),
        );

        let BvhNode::Leaf { triangles: ids, .. } = root else {
            panic!("expected a leaf");
        };

        assert_eq!(20, ids.len());
    }

    #[test]
    fn nodes_contain_their_children() {
        let triangles = random_triangles(1, 1000);
        let root = build(bvh_triangles(&triangles), &BvhConfig::default());

        assert_node_contains_children(&root, &triangles);

        let mut ids = Vec::new();

        collect_ids(&root, &mut ids);
        ids.sort_unstable();

        assert_eq!((0..1000).collect::<Vec<u32>>(), ids);
    }

    #[test]
    fn max_leaf_triangles_forces_splits() {
        let triangles = random_triangles(2, 300);

        let root = build(
            bvh_triangles(&triangles),
            &BvhConfig::default().with_max_leaf_triangles(1),
        );

        fn assert_leaves(node: &BvhNode) {
            match node {
                BvhNode::Internal { left, right, .. } => {
                    assert_leaves(left);
                    assert_leaves(right);
                }
                BvhNode::Leaf { triangles, .. } => {
                    assert_eq!(1, triangles.len());
                }
            }
        }

        assert_leaves(&root);
        assert_eq!(300, root.stats().leaves);
        assert_eq!(599, root.stats().nodes);
    }

    #[test]
    fn skewed_triangles_stay_within_max_depth() {
        // Each triangle lies so far away from the previous ones that SAH
        // peels off just one of them per level
        let triangles: Vec<_> = (0..26)
            .map(|i| triangle(vec3(32.0f32.powi(i), 0.0, 0.0)))
            .collect();

        let root = build(bvh_triangles(&triangles), &BvhConfig::default());

        assert_eq!(26, root.stats().triangles);
        assert!(root.stats().depth <= gpu::BVH_STACK_SIZE);
        assert_node_contains_children(&root, &triangles);
    }

    #[test]
    fn max_depth_falls_back_to_median_splits() {
        let triangles = random_triangles(5, 500);

        for max_depth in [0, 3, 9, 12] {
            let config = BvhConfig::default()
                .with_max_leaf_triangles(1)
                .with_max_depth(max_depth);

            let root = build(bvh_triangles(&triangles), &config);
            let stats = root.stats();

            // 500 triangles can't be halved into single-triangle leaves in
            // fewer than 9 levels
            if max_depth <= 9 {
                assert_eq!(9, stats.depth);
            } else {
                assert!(stats.depth <= max_depth);
            }

            assert_eq!(500, stats.triangles);
            assert_eq!(500, stats.leaves);
            assert_node_contains_children(&root, &triangles);
        }
    }

    #[test]
    fn median_depth_counts_halvings() {
        assert_eq!(0, median_depth(0, 8));
        assert_eq!(0, median_depth(8, 8));
        assert_eq!(1, median_depth(9, 8));
        assert_eq!(2, median_depth(32, 8));
        assert_eq!(3, median_depth(33, 8));
        assert_eq!(9, median_depth(500, 1));
    }

    #[test]
    fn padding() {
        let triangles = random_triangles(3, 64);
        let config = BvhConfig::default().with_padding(0.25);
        let root = build(bvh_triangles(&triangles), &config);

        let mut expected = BoundingBox::from_triangles(triangles.clone());

        expected.inflate(0.25);

        assert_eq!(expected, root.bb());
        assert_node_contains_children(&root, &triangles);
    }

    #[test]
    fn parallel_build_matches_sequential_one() {
        let triangles = random_triangles(4, 2000);

        let sequential = build(
            bvh_triangles(&triangles),
            &BvhConfig::default().with_parallel_threshold(usize::MAX),
        );

        let parallel = build(
            bvh_triangles(&triangles),
            &BvhConfig::default().with_parallel_threshold(1),
        );

        assert_eq!(sequential.stats(), parallel.stats());

        let mut sequential_ids = Vec::new();
        let mut parallel_ids = Vec::new();

        collect_ids(&sequential, &mut sequential_ids);
        collect_ids(&parallel, &mut parallel_ids);

        assert_eq!(sequential_ids, parallel_ids);
    }
}
