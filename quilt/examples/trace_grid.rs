//! Builds a BVH over a procedural heightfield, shoots a grid of rays at it
//! and reports what got hit.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p quilt --example trace_grid
//! ```

use glam::{vec3, Vec3};
use quilt::{gpu, Bvh, BvhConfig};

const TERRAIN_SIZE: usize = 128;
const IMAGE_SIZE: usize = 256;

fn main() -> Result<(), quilt::BuildError> {
    env_logger::init();

    let triangles = terrain();
    let bvh = Bvh::build_with(&triangles, &BvhConfig::default())?;
    let bounds = bvh.bounds();

    log::info!(
        "Scene ready; triangles = {}, bounds = {:?}..{:?}",
        triangles.len(),
        bounds.min(),
        bounds.max(),
    );

    // Orthographic camera hovering above the terrain, looking down at an angle
    let direction = vec3(0.2, -1.0, 0.3).normalize();

    let rays: Vec<_> = (0..IMAGE_SIZE * IMAGE_SIZE)
        .map(|idx| {
            let x = (idx % IMAGE_SIZE) as f32 / (IMAGE_SIZE as f32);
            let z = (idx / IMAGE_SIZE) as f32 / (IMAGE_SIZE as f32);

            gpu::Ray::new(vec3(x * 2.0 - 1.0, 2.0, z * 2.0 - 1.0), direction)
        })
        .collect();

    let clipped = rays
        .iter()
        .filter(|ray| ray.near_far(bounds, 0.0).0 < f32::MAX)
        .count();

    let hits = bvh.trace_nearest_many(&rays);
    let hits: Vec<_> = hits.into_iter().filter(|hit| hit.is_some()).collect();

    let avg_distance = hits.iter().map(|hit| hit.distance).sum::<f32>()
        / (hits.len().max(1) as f32);

    log::info!(
        "Traced {} rays; entering bounds = {}, hits = {}, avg-distance = {:.3}",
        rays.len(),
        clipped,
        hits.len(),
        avg_distance,
    );

    for point in [
        vec3(0.0, 1.0, 0.0),
        vec3(0.25, 0.0, -0.5),
        vec3(0.5, -1.0, 0.5),
    ] {
        log::info!(
            "Signed distance from {} = {:.4}",
            point,
            bvh.signed_distance(point),
        );
    }

    Ok(())
}

fn height(x: f32, z: f32) -> f32 {
    0.2 * (x * 6.0).sin() * (z * 4.0).cos() + 0.05 * (x * 23.0 + z * 17.0).sin()
}

fn terrain() -> Vec<gpu::Triangle> {
    let vertex = |x: usize, z: usize| {
        let x = (x as f32) / (TERRAIN_SIZE as f32) * 2.0 - 1.0;
        let z = (z as f32) / (TERRAIN_SIZE as f32) * 2.0 - 1.0;

        Vec3::new(x, height(x, z), z)
    };

    let mut triangles = Vec::with_capacity(2 * TERRAIN_SIZE * TERRAIN_SIZE);

    for z in 0..TERRAIN_SIZE {
        for x in 0..TERRAIN_SIZE {
            let v00 = vertex(x, z);
            let v10 = vertex(x + 1, z);
            let v01 = vertex(x, z + 1);
            let v11 = vertex(x + 1, z + 1);

            // Wound so that normals point upwards
            triangles.push(gpu::Triangle::new(v00, v01, v10));
            triangles.push(gpu::Triangle::new(v10, v01, v11));
        }
    }

    triangles
}
