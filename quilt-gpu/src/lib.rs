//! Geometric primitives, bounding boxes and BVH traversal shared by the host
//! and by the compute shaders.
//!
//! Nothing in here allocates or dispatches dynamically, so the very same code
//! compiles both for the CPU and for `target_arch = "spirv"`.

#![cfg_attr(target_arch = "spirv", no_std)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod bounding_box;
mod bvh_view;
mod hit;
mod passes;
mod point_query;
mod ray;
mod traversal;
mod triangle;
mod triangles;

pub use self::bounding_box::*;
pub use self::bvh_view::*;
pub use self::hit::*;
pub use self::passes::*;
pub use self::point_query::*;
pub use self::ray::*;
pub use self::traversal::*;
pub use self::triangle::*;
pub use self::triangles::*;

pub mod prelude {
    pub use spirv_std::arch::IndexUnchecked;
    pub use spirv_std::glam::*;
    #[cfg(target_arch = "spirv")]
    pub use spirv_std::num_traits::Float;
    pub use spirv_std::spirv;

    pub use crate::*;
}

/// Stack for nodes yet-to-be-visited when traversing the BVH.
///
/// For performance reasons, we use a per-workgroup shared-memory array where
/// each workgroup-thread simply indexes into a different slice of this memory.
pub type BvhStack<'a> = &'a mut [u32; BVH_STACK_SIZE * 8 * 8];

/// Maximum stack size per each workgroup-thread when traversing the BVH.
///
/// Affects the maximum depth of the BVH tree - the builder refuses to produce
/// trees deeper than this.
pub const BVH_STACK_SIZE: usize = 24;
