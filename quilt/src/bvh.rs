mod axis;
mod bvh_builder;
mod bvh_config;
mod bvh_node;
mod bvh_serializer;
mod bvh_triangle;

use std::time::{Duration, Instant};

use glam::{Vec3, Vec4};
use rayon::prelude::*;

pub use self::axis::*;
pub use self::bvh_config::*;
pub use self::bvh_node::*;
pub use self::bvh_serializer::*;
pub use self::bvh_triangle::*;
use crate::{gpu, BuildError};

/// Bounding volume hierarchy over a triangle soup.
///
/// Once built, the tree is immutable - it can be queried from many threads at
/// once, or its [`Self::buffer()`] can be uploaded and traversed on the GPU
/// through [`gpu::BvhView`].
#[derive(Clone, Debug)]
pub struct Bvh {
    triangles: Vec<gpu::Triangle>,
    root: BvhNode,
    buffer: Vec<Vec4>,
    stats: BvhStats,
}

impl Bvh {
    pub fn build(triangles: &[gpu::Triangle]) -> Result<Self, BuildError> {
        Self::build_with(triangles, &BvhConfig::default())
    }

    pub fn build_with(
        triangles: &[gpu::Triangle],
        config: &BvhConfig,
    ) -> Result<Self, BuildError> {
        config.validate()?;

        if triangles.is_empty() {
            log::warn!("Refusing to build BVH out of zero triangles");

            return Err(BuildError::EmptyGeometry);
        }

        if triangles.len() > u32::MAX as usize {
            return Err(BuildError::TooManyTriangles {
                count: triangles.len(),
            });
        }

        log::info!("Building BVH; triangles = {}", triangles.len());

        let bvh_triangles =
            triangles.iter().enumerate().map(|(triangle_id, triangle)| {
                BvhTriangle::new(
                    gpu::TriangleId::new(triangle_id as u32),
                    *triangle,
                )
            });

        let (root, tt_build) =
            Self::measure(|| bvh_builder::build(bvh_triangles, config));

        let stats = root.stats();

        // Builder keeps the tree within `max_depth` unless there are so many
        // triangles that even halving them on each level doesn't fit
        if stats.depth > config.max_depth {
            return Err(BuildError::TooDeep {
                depth: stats.depth,
                max: config.max_depth,
            });
        }

        let (buffer, tt_serialize) =
            Self::measure(|| BvhSerializer::serialize(&root));

        log::info!(
            "BVH built; tt-build = {:?}, tt-serialize = {:?}, buffer-size = {}",
            tt_build,
            tt_serialize,
            buffer.len(),
        );

        log::debug!(
            "BVH stats; nodes = {}, leaves = {}, depth = {}",
            stats.nodes,
            stats.leaves,
            stats.depth,
        );

        Ok(Self {
            triangles: triangles.to_vec(),
            root,
            buffer,
            stats,
        })
    }

    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    pub fn bounds(&self) -> gpu::BoundingBox {
        self.root.bb()
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    pub fn triangles(&self) -> &[gpu::Triangle] {
        &self.triangles
    }

    /// Returns the flattened tree, ready to be uploaded into a storage buffer.
    pub fn buffer(&self) -> &[Vec4] {
        &self.buffer
    }

    pub fn buffer_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.buffer)
    }

    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    pub fn view(&self) -> gpu::BvhView<'_> {
        gpu::BvhView::new(&self.buffer)
    }

    pub fn triangles_view(&self) -> gpu::TrianglesView<'_> {
        gpu::TrianglesView::new(&self.triangles)
    }

    /// Returns the nearest triangle hit by given ray, if any.
    pub fn trace_nearest(&self, ray: gpu::Ray) -> gpu::TriangleHit {
        let mut stack = Self::stack();

        ray.trace_nearest(0, self.triangles_view(), self.view(), &mut stack)
            .0
    }

    /// Returns whether given ray hits anything closer than `max_distance`.
    pub fn trace_any(&self, ray: gpu::Ray, max_distance: f32) -> bool {
        let mut stack = Self::stack();

        ray.trace_any(
            0,
            self.triangles_view(),
            self.view(),
            &mut stack,
            max_distance,
        )
    }

    /// Traces many rays at once, spreading them across threads.
    pub fn trace_nearest_many(
        &self,
        rays: &[gpu::Ray],
    ) -> Vec<gpu::TriangleHit> {
        rays.par_iter().map(|ray| self.trace_nearest(*ray)).collect()
    }

    pub fn closest_point(&self, point: Vec3) -> gpu::ClosestHit {
        let mut stack = Self::stack();

        gpu::PointQuery::new(point).find_closest(
            0,
            self.triangles_view(),
            self.view(),
            &mut stack,
        )
    }

    /// Returns the unsigned distance from `point` to the closest triangle.
    pub fn distance(&self, point: Vec3) -> f32 {
        self.closest_point(point).distance_sq.sqrt()
    }

    /// Returns the distance from `point` to the closest triangle, negative if
    /// the point lies behind that triangle (as seen through its normal).
    ///
    /// Only meaningful for closed, consistently-wound meshes; near edges and
    /// vertices shared by differently-facing triangles the sign follows
    /// whichever of them got picked.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        let hit = self.closest_point(point);
        let distance = hit.distance_sq.sqrt();
        let normal = self.triangles[hit.triangle_id.get() as usize].normal();

        if (point - hit.point).dot(normal) < 0.0 {
            -distance
        } else {
            distance
        }
    }

    fn stack() -> [u32; gpu::BVH_STACK_SIZE * 8 * 8] {
        [0; gpu::BVH_STACK_SIZE * 8 * 8]
    }

    fn measure<T>(f: impl FnOnce() -> T) -> (T, Duration) {
        let tt = Instant::now();
        let val = f();

        (val, tt.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::ConfigError;

    /// Unit cube, with triangles facing outwards.
    fn cube() -> Vec<gpu::Triangle> {
        let faces = [
            // +x
            [
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(1.0, 1.0, 1.0),
                vec3(1.0, 0.0, 1.0),
            ],
            // -x
            [
                vec3(0.0, 0.0, 0.0),
                vec3(0.0, 0.0, 1.0),
                vec3(0.0, 1.0, 1.0),
                vec3(0.0, 1.0, 0.0),
            ],
            // +y
            [
                vec3(0.0, 1.0, 0.0),
                vec3(0.0, 1.0, 1.0),
                vec3(1.0, 1.0, 1.0),
                vec3(1.0, 1.0, 0.0),
            ],
            // -y
            [
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 0.0, 1.0),
                vec3(0.0, 0.0, 1.0),
            ],
            // +z
            [
                vec3(0.0, 0.0, 1.0),
                vec3(1.0, 0.0, 1.0),
                vec3(1.0, 1.0, 1.0),
                vec3(0.0, 1.0, 1.0),
            ],
            // -z
            [
                vec3(0.0, 0.0, 0.0),
                vec3(0.0, 1.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(1.0, 0.0, 0.0),
            ],
        ];

        faces
            .into_iter()
            .flat_map(|[v0, v1, v2, v3]| {
                [
                    gpu::Triangle::new(v0, v1, v2),
                    gpu::Triangle::new(v0, v2, v3),
                ]
            })
            .collect()
    }

    fn random_point(rng: &mut StdRng, range: f32) -> Vec3 {
        vec3(
            rng.gen_range(-range..range),
            rng.gen_range(-range..range),
            rng.gen_range(-range..range),
        )
    }

    fn random_triangles(rng: &mut StdRng, count: usize) -> Vec<gpu::Triangle> {
        (0..count)
            .map(|_| {
                let a = random_point(rng, 20.0);

                gpu::Triangle::new(
                    a,
                    a + random_point(rng, 1.5),
                    a + random_point(rng, 1.5),
                )
            })
            .collect()
    }

    fn trace_brute_force(
        triangles: &[gpu::Triangle],
        ray: gpu::Ray,
    ) -> gpu::TriangleHit {
        let mut hit = gpu::TriangleHit::none();

        for (triangle_id, triangle) in triangles.iter().enumerate() {
            if triangle.hit(ray, &mut hit) {
                hit.triangle_id = gpu::TriangleId::new(triangle_id as u32);
            }
        }

        hit
    }

    fn random_rays(
        rng: &mut StdRng,
        triangles: &[gpu::Triangle],
        count: usize,
    ) -> Vec<gpu::Ray> {
        (0..count)
            .map(|idx| {
                let origin = random_point(rng, 30.0);

                // Half of the rays aim at some triangle, so that there's
                // plenty of hits to compare
                let direction = if idx % 2 == 0 {
                    let target = triangles[rng.gen_range(0..triangles.len())];

                    (target.center() - origin).normalize()
                } else {
                    random_point(rng, 1.0).normalize()
                };

                gpu::Ray::new(origin, direction)
            })
            .collect()
    }

    #[test]
    fn build_empty() {
        assert_eq!(BuildError::EmptyGeometry, Bvh::build(&[]).unwrap_err());
    }

    #[test]
    fn build_with_invalid_config() {
        let config = BvhConfig::default().with_max_leaf_triangles(0);

        assert_eq!(
            BuildError::InvalidConfig(ConfigError::ZeroLeafSize),
            Bvh::build_with(&cube(), &config).unwrap_err()
        );

        let config = BvhConfig::default().with_max_depth(100);

        assert!(matches!(
            Bvh::build_with(&cube(), &config),
            Err(BuildError::InvalidConfig(ConfigError::MaxDepthTooLarge {
                max_depth: 100,
                ..
            }))
        ));
    }

    #[test]
    fn build_skewed() {
        // Each triangle lies so far away from the previous ones that SAH
        // peels off just one of them per level
        let triangles: Vec<_> = (0..26)
            .map(|i| {
                let offset = vec3(32.0f32.powi(i), 0.0, 0.0);

                gpu::Triangle::new(
                    offset,
                    offset + vec3(1.0, 0.0, 0.0),
                    offset + vec3(0.0, 1.0, 0.5),
                )
            })
            .collect();

        let target = Bvh::build(&triangles).unwrap();

        assert_eq!(26, target.stats().triangles);
        assert!(target.stats().depth <= gpu::BVH_STACK_SIZE);

        // Farther triangles are too large for their unit-sized legs to survive
        // rounding, so only the nearby ones get traced
        for (triangle_id, triangle) in triangles.iter().enumerate().take(5) {
            let ray = gpu::Ray::new(
                triangle.a() + vec3(0.25, 0.25, 5.0),
                vec3(0.0, 0.0, -1.0),
            );

            let expected = trace_brute_force(&triangles, ray);
            let actual = target.trace_nearest(ray);

            assert!(actual.is_some());
            assert_eq!(triangle_id as u32, actual.triangle_id.get());
            assert_eq!(expected, actual);
        }
    }

    #[test]
    fn build_too_deep() {
        let mut rng = StdRng::seed_from_u64(5);
        let triangles = random_triangles(&mut rng, 100);

        // Halving 100 triangles into leaves of 8 takes 4 levels
        let config = BvhConfig::default().with_max_depth(2);

        assert_eq!(
            BuildError::TooDeep { depth: 4, max: 2 },
            Bvh::build_with(&triangles, &config).unwrap_err()
        );

        let config = BvhConfig::default().with_max_depth(4);

        let target = Bvh::build_with(&triangles, &config).unwrap();

        assert_eq!(4, target.stats().depth);
    }

    #[test]
    fn build_cube() {
        let target = Bvh::build(&cube()).unwrap();

        assert_eq!(
            gpu::BoundingBox::new(Vec3::ZERO, Vec3::ONE),
            target.bounds()
        );

        assert_eq!(12, target.stats().triangles);
        assert_eq!(12, target.triangles().len());
        assert_eq!(16 * target.buffer().len(), target.buffer_bytes().len());
        assert_eq!(48 * 12, target.triangles_bytes().len());
    }

    #[test]
    fn trace_cube() {
        let target = Bvh::build(&cube()).unwrap();

        // Case 1: From the outside
        let ray = gpu::Ray::new(vec3(-1.0, 0.3, 0.6), vec3(1.0, 0.0, 0.0));
        let hit = target.trace_nearest(ray);

        assert!(hit.is_some());
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.point.x, 0.0, epsilon = 1e-5);
        assert_eq!(vec3(-1.0, 0.0, 0.0), hit.normal);

        assert!(target.trace_any(ray, 2.0));
        assert!(!target.trace_any(ray, 0.5));

        // Case 2: From the inside
        let ray = gpu::Ray::new(vec3(0.3, 0.6, 0.2), vec3(0.0, 0.0, 1.0));
        let hit = target.trace_nearest(ray);

        assert!(hit.is_some());
        assert_relative_eq!(hit.distance, 0.8, epsilon = 1e-5);
        assert_eq!(vec3(0.0, 0.0, 1.0), hit.normal);

        // Case 3: Miss
        let ray = gpu::Ray::new(vec3(-1.0, 3.0, 0.6), vec3(1.0, 0.0, 0.0));

        assert!(target.trace_nearest(ray).is_none());
        assert!(!target.trace_any(ray, f32::MAX));

        // Case 4: Cube behind the ray
        let ray = gpu::Ray::new(vec3(-1.0, 0.3, 0.6), vec3(-1.0, 0.0, 0.0));

        assert!(target.trace_nearest(ray).is_none());
    }

    #[test]
    fn trace_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(1);
        let triangles = random_triangles(&mut rng, 2000);
        let target = Bvh::build(&triangles).unwrap();

        for ray in random_rays(&mut rng, &triangles, 500) {
            let expected = trace_brute_force(&triangles, ray);
            let actual = target.trace_nearest(ray);

            assert_eq!(expected.is_some(), actual.is_some());

            if expected.is_some() {
                assert_relative_eq!(expected.distance, actual.distance);
                assert_eq!(expected.triangle_id, actual.triangle_id);
            }

            assert_eq!(expected.is_some(), target.trace_any(ray, f32::MAX));
        }
    }

    #[test]
    fn trace_with_small_leaves_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(2);
        let triangles = random_triangles(&mut rng, 500);

        let target = Bvh::build_with(
            &triangles,
            &BvhConfig::default()
                .with_max_leaf_triangles(1)
                .with_padding(0.001),
        )
        .unwrap();

        for ray in random_rays(&mut rng, &triangles, 300) {
            let expected = trace_brute_force(&triangles, ray);
            let actual = target.trace_nearest(ray);

            assert_eq!(expected.is_some(), actual.is_some());

            if expected.is_some() {
                assert_relative_eq!(expected.distance, actual.distance);
            }
        }
    }

    #[test]
    fn trace_with_depth_limit_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(6);
        let triangles = random_triangles(&mut rng, 1000);

        let target = Bvh::build_with(
            &triangles,
            &BvhConfig::default()
                .with_max_leaf_triangles(4)
                .with_max_depth(8),
        )
        .unwrap();

        assert_eq!(8, target.stats().depth);

        for ray in random_rays(&mut rng, &triangles, 300) {
            let expected = trace_brute_force(&triangles, ray);
            let actual = target.trace_nearest(ray);

            assert_eq!(expected.is_some(), actual.is_some());

            if expected.is_some() {
                assert_relative_eq!(expected.distance, actual.distance);
            }
        }
    }

    #[test]
    fn trace_tiny_triangles() {
        let legs = 1e-4;

        let triangles: Vec<_> = (0..100)
            .map(|idx| {
                let a = vec3(
                    (idx % 10) as f32 * 1e-3,
                    (idx / 10) as f32 * 1e-3,
                    0.0,
                );

                gpu::Triangle::new(
                    a,
                    a + vec3(legs, 0.0, 0.0),
                    a + vec3(0.0, legs, 0.0),
                )
            })
            .collect();

        let target = Bvh::build(&triangles).unwrap();

        for (triangle_id, triangle) in triangles.iter().enumerate() {
            let ray = gpu::Ray::new(
                triangle.a() + vec3(0.25 * legs, 0.25 * legs, 1.0),
                vec3(0.0, 0.0, -1.0),
            );

            let hit = target.trace_nearest(ray);

            assert!(hit.is_some(), "triangle #{triangle_id} got missed");
            assert_eq!(triangle_id as u32, hit.triangle_id.get());
            assert_relative_eq!(hit.distance, 1.0);
            assert!(target.trace_any(ray, 2.0));
        }
    }

    #[test]
    fn trace_nearest_many() {
        let mut rng = StdRng::seed_from_u64(3);
        let triangles = random_triangles(&mut rng, 1000);
        let target = Bvh::build(&triangles).unwrap();
        let rays = random_rays(&mut rng, &triangles, 256);
        let hits = target.trace_nearest_many(&rays);

        assert_eq!(rays.len(), hits.len());

        for (ray, hit) in rays.iter().zip(hits) {
            assert_eq!(target.trace_nearest(*ray), hit);
        }
    }

    #[test]
    fn closest_point_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(4);
        let triangles = random_triangles(&mut rng, 1000);
        let target = Bvh::build(&triangles).unwrap();

        for _ in 0..300 {
            let point = random_point(&mut rng, 30.0);

            let expected = triangles
                .iter()
                .map(|triangle| triangle.distance_sq(point))
                .fold(f32::MAX, f32::min);

            let actual = target.closest_point(point);

            assert!(actual.is_some());
            assert_relative_eq!(expected, actual.distance_sq);

            assert_relative_eq!(
                triangles[actual.triangle_id.get() as usize]
                    .distance_sq(point),
                expected
            );
        }
    }

    #[test]
    fn distance_to_cube() {
        let target = Bvh::build(&cube()).unwrap();

        // Inside
        assert_relative_eq!(
            target.distance(Vec3::splat(0.5)),
            0.5,
            epsilon = 1e-5
        );

        assert_relative_eq!(
            target.signed_distance(Vec3::splat(0.5)),
            -0.5,
            epsilon = 1e-5
        );

        assert_relative_eq!(
            target.signed_distance(vec3(0.9, 0.5, 0.4)),
            -0.1,
            epsilon = 1e-5
        );

        // Outside
        assert_relative_eq!(
            target.distance(vec3(2.0, 0.5, 0.5)),
            1.0,
            epsilon = 1e-5
        );

        assert_relative_eq!(
            target.signed_distance(vec3(2.0, 0.5, 0.5)),
            1.0,
            epsilon = 1e-5
        );

        assert_relative_eq!(
            target.signed_distance(vec3(0.5, -0.25, 0.5)),
            0.25,
            epsilon = 1e-5
        );
    }
}
