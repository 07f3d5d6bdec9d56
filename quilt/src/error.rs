use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("cannot build BVH out of zero triangles")]
    EmptyGeometry,

    #[error("too many triangles: {count} (at most {} are supported)", u32::MAX)]
    TooManyTriangles { count: usize },

    #[error("BVH is too deep: {depth} levels, traversal supports up to {max}")]
    TooDeep { depth: usize, max: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_leaf_triangles must be at least 1")]
    ZeroLeafSize,

    #[error("padding must be finite and non-negative, got {0}")]
    InvalidPadding(f32),

    #[error("max_depth is {max_depth}, but traversal supports up to {limit}")]
    MaxDepthTooLarge { max_depth: usize, limit: usize },
}
