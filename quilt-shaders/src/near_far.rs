use quilt_gpu::prelude::*;

/// Clips each ray against the scene's box, yielding the range that should be
/// sampled along it; rays missing the box get `(f32::MAX, f32::MAX)`.
#[spirv(compute(threads(64)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &NearFarPassParams,
    #[spirv(descriptor_set = 0, binding = 0, storage_buffer)] rays: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    near_far: &mut [Vec2],
) {
    if global_id.x >= params.count() {
        return;
    }

    let ray_idx = global_id.x as usize;

    let ray = unsafe {
        Ray::unpack([
            *rays.index_unchecked(2 * ray_idx),
            *rays.index_unchecked(2 * ray_idx + 1),
        ])
    };

    let (near, far) = ray.near_far(params.bb(), params.min_near());

    unsafe {
        *near_far.index_unchecked_mut(ray_idx) = vec2(near, far);
    }
}
