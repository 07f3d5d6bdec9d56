//! Bounding volume hierarchy over triangle soup, built on the host and
//! traversed either here or inside compute shaders (see `quilt-gpu`).
//!
//! ```ignore
//! use quilt::{gpu, Bvh};
//!
//! let bvh = Bvh::build(&triangles)?;
//! let hit = bvh.trace_nearest(gpu::Ray::new(origin, direction));
//!
//! if hit.is_some() {
//!     println!("hit triangle #{} at {}", hit.triangle_id.get(), hit.distance);
//! }
//! ```

mod bvh;
mod error;

pub use quilt_gpu as gpu;

pub use self::bvh::*;
pub use self::error::*;
