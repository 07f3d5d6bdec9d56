use quilt_gpu::prelude::*;

#[spirv(compute(threads(64)))]
#[allow(clippy::too_many_arguments)]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(local_invocation_index)] local_idx: u32,
    #[spirv(push_constant)] params: &ClosestPointPassParams,
    #[spirv(workgroup)] stack: BvhStack,
    #[spirv(descriptor_set = 0, binding = 0, storage_buffer)]
    triangles: &[Triangle],
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] bvh: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 0, storage_buffer)] points: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 1, storage_buffer)]
    closest: &mut [Vec4],
) {
    if global_id.x >= params.count {
        return;
    }

    let point_idx = global_id.x as usize;
    let triangles = TrianglesView::new(triangles);
    let bvh = BvhView::new(bvh);
    let point = unsafe { points.index_unchecked(point_idx).xyz() };

    let hit = PointQuery::new(point)
        .with_max_distance(params.max_distance)
        .find_closest(local_idx, triangles, bvh, stack);

    let [hit_d0, hit_d1] = hit.pack();

    unsafe {
        *closest.index_unchecked_mut(2 * point_idx) = hit_d0;
        *closest.index_unchecked_mut(2 * point_idx + 1) = hit_d1;
    }
}
