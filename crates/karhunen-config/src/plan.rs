//! Derived stream geometry.

use karhunen_core::EngineConfig;

/// Clamped engine configuration plus the strides the stream controller needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamPlan {
    /// Validated engine configuration.
    pub engine: EngineConfig,
    /// New samples consumed per block, in `[1, window_length]`.
    pub consumption_stride: usize,
    /// Spacing of basis output records, in `[1, order]`.
    pub output_stride: usize,
}

impl StreamPlan {
    /// Samples carried over from one block to the next.
    pub fn overlap_len(&self) -> usize {
        self.engine.window_length() - self.consumption_stride
    }

    /// Blocks produced for a stream of `samples` samples.
    ///
    /// A block is started at every stride offset that still has at least one
    /// unread sample; a zero-length stream produces none.
    pub fn blocks_for(&self, samples: usize) -> usize {
        samples.div_ceil(self.consumption_stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(len: usize, stride: usize) -> StreamPlan {
        StreamPlan {
            engine: EngineConfig::new(len, 2, 1).unwrap(),
            consumption_stride: stride,
            output_stride: 2,
        }
    }

    #[test]
    fn overlap_is_window_minus_stride() {
        assert_eq!(plan(8, 4).overlap_len(), 4);
        assert_eq!(plan(8, 8).overlap_len(), 0);
    }

    #[test]
    fn block_count_covers_tail() {
        assert_eq!(plan(8, 4).blocks_for(10), 3);
        assert_eq!(plan(8, 8).blocks_for(16), 2);
        assert_eq!(plan(8, 8).blocks_for(0), 0);
    }
}
