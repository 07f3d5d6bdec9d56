use quilt_gpu::prelude::*;

#[spirv(compute(threads(64)))]
#[allow(clippy::too_many_arguments)]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(local_invocation_index)] local_idx: u32,
    #[spirv(push_constant)] params: &TracingPassParams,
    #[spirv(workgroup)] stack: BvhStack,
    #[spirv(descriptor_set = 0, binding = 0, storage_buffer)]
    triangles: &[Triangle],
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] bvh: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 0, storage_buffer)] rays: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 1, storage_buffer)]
    hits: &mut [Vec4],
) {
    if global_id.x >= params.count {
        return;
    }

    let ray_idx = global_id.x as usize;
    let triangles = TrianglesView::new(triangles);
    let bvh = BvhView::new(bvh);

    let ray = unsafe {
        Ray::unpack([
            *rays.index_unchecked(2 * ray_idx),
            *rays.index_unchecked(2 * ray_idx + 1),
        ])
    };

    let (hit, _) = ray.trace_nearest(local_idx, triangles, bvh, stack);
    let [hit_d0, hit_d1] = hit.pack();

    unsafe {
        *hits.index_unchecked_mut(2 * ray_idx) = hit_d0;
        *hits.index_unchecked_mut(2 * ray_idx + 1) = hit_d1;
    }
}
