use crate::dtype::DType;

/// Defaults and tuning knobs for array construction and element-wise kernels.
///
/// There is no process-wide default dtype: functions that need one either
/// take an `ArrayConfig` explicitly (the `*_with` variants) or use
/// `ArrayConfig::default()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayConfig {
    /// DType for `zeros`/`ones`/`full` without an explicit dtype, for nested
    /// input containing any real number, and for empty nested input.
    pub float_dtype: DType,
    /// DType for nested input and `arange` arguments that are all integers.
    pub int_dtype: DType,
    /// Element count at or above which kernels run on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            float_dtype: DType::F64,
            int_dtype: DType::I64,
            parallel_threshold: 1 << 15,
        }
    }
}

impl ArrayConfig {
    pub fn float_dtype(mut self, d: DType) -> Self {
        self.float_dtype = d;
        self
    }

    pub fn int_dtype(mut self, d: DType) -> Self {
        self.int_dtype = d;
        self
    }

    pub fn parallel_threshold(mut self, n: usize) -> Self {
        self.parallel_threshold = n;
        self
    }

    /// Never use the rayon pool.
    pub fn sequential(self) -> Self {
        self.parallel_threshold(usize::MAX)
    }

    pub(crate) fn use_parallel(&self, elem_count: usize) -> bool {
        elem_count >= self.parallel_threshold
    }
}
