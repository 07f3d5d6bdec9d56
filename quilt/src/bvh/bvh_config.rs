use crate::{gpu, ConfigError};

/// Knobs for [`crate::Bvh::build_with()`].
#[derive(Clone, Debug, PartialEq)]
pub struct BvhConfig {
    /// Nodes holding more triangles than this get split even if SAH considers
    /// splitting them not worth it.
    pub max_leaf_triangles: usize,

    /// Subtrees holding at least this many triangles are built on separate
    /// threads.
    pub parallel_threshold: usize,

    /// How much each node's bounding box gets inflated, to leave some slack
    /// for numerical errors during traversal.
    pub padding: f32,

    /// Maximum number of internal nodes on any root-to-leaf path; subtrees
    /// that would exceed it get split by count instead of by SAH.
    ///
    /// Cannot be larger than [`gpu::BVH_STACK_SIZE`].
    pub max_depth: usize,
}

impl BvhConfig {
    pub fn with_max_leaf_triangles(
        mut self,
        max_leaf_triangles: usize,
    ) -> Self {
        self.max_leaf_triangles = max_leaf_triangles;
        self
    }

    pub fn with_parallel_threshold(
        mut self,
        parallel_threshold: usize,
    ) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }

    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_leaf_triangles == 0 {
            return Err(ConfigError::ZeroLeafSize);
        }

        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ConfigError::InvalidPadding(self.padding));
        }

        if self.max_depth > gpu::BVH_STACK_SIZE {
            return Err(ConfigError::MaxDepthTooLarge {
                max_depth: self.max_depth,
                limit: gpu::BVH_STACK_SIZE,
            });
        }

        Ok(())
    }
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            max_leaf_triangles: 8,
            parallel_threshold: 4096,
            padding: 0.0,
            max_depth: gpu::BVH_STACK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate() {
        assert_eq!(Ok(()), BvhConfig::default().validate());

        assert_eq!(
            Err(ConfigError::ZeroLeafSize),
            BvhConfig::default().with_max_leaf_triangles(0).validate()
        );

        assert_eq!(
            Err(ConfigError::InvalidPadding(-1.0)),
            BvhConfig::default().with_padding(-1.0).validate()
        );

        assert!(BvhConfig::default()
            .with_padding(f32::INFINITY)
            .validate()
            .is_err());

        assert_eq!(
            Ok(()),
            BvhConfig::default().with_max_depth(0).validate()
        );

        assert_eq!(
            Err(ConfigError::MaxDepthTooLarge {
                max_depth: gpu::BVH_STACK_SIZE + 1,
                limit: gpu::BVH_STACK_SIZE,
            }),
            BvhConfig::default()
                .with_max_depth(gpu::BVH_STACK_SIZE + 1)
                .validate()
        );
    }
}
