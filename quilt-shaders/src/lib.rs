#![cfg_attr(target_arch = "spirv", no_std)]

pub mod closest_point;
pub mod near_far;
pub mod trace_any;
pub mod trace_nearest;
