use std::fmt;

use crate::error::{Error, Result};

// Shape: N-dimensional shape representation
//
// A Shape lists the size of each dimension of an array:
//   - Scalar: Shape([])         : 0 dimensions, 1 element
//   - Vector: Shape([5])        : 1 dimension, 5 elements
//   - Matrix: Shape([3, 4])     : 2 dimensions, 12 elements
//   - Empty:  Shape([0, 3])     : 2 dimensions, 0 elements
//
// Arrays are always stored contiguously in row-major order, so the shape alone
// determines where every element lives: the last dimension varies fastest and
// the offset of index [i, j, k] is i*stride[0] + j*stride[1] + k*stride[2].

/// N-dimensional shape of an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions (0 for scalar, 1 for vector, 2 for matrix, etc.).
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of all dimensions).
    /// A scalar shape [] has 1 element; any zero-sized dimension gives 0.
    /// Saturates at `usize::MAX` when the product overflows; see
    /// [`Shape::checked_elem_count`].
    pub fn elem_count(&self) -> usize {
        self.checked_elem_count().unwrap_or(usize::MAX)
    }

    /// Total number of elements, or `None` if the product overflows `usize`.
    pub fn checked_elem_count(&self) -> Option<usize> {
        if self.0.contains(&0) {
            return Some(0);
        }
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Compute the contiguous (row-major / C-order) strides for this shape,
    /// in elements.
    ///
    /// For shape [2, 3, 4], strides are [12, 4, 1]:
    ///   - Moving 1 step in dim 0 jumps 12 elements (3*4)
    ///   - Moving 1 step in dim 1 jumps 4 elements
    ///   - Moving 1 step in dim 2 jumps 1 element
    pub fn stride_contiguous(&self) -> Vec<usize> {
        let mut strides = vec![0usize; self.rank()];
        if self.rank() > 0 {
            strides[self.rank() - 1] = 1;
            for i in (0..self.rank() - 1).rev() {
                strides[i] = strides[i + 1].saturating_mul(self.0[i + 1]);
            }
        }
        strides
    }

    /// Flat element offset of a multi-dimensional index.
    pub fn flat_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.rank() {
            return Err(Error::IndexRankMismatch {
                expected: self.rank(),
                got: index.len(),
            });
        }
        let strides = self.stride_contiguous();
        let mut flat = 0usize;
        for (dim, (&idx, &size)) in index.iter().zip(self.0.iter()).enumerate() {
            if idx >= size {
                return Err(Error::IndexOutOfBounds {
                    dim,
                    index: idx,
                    size,
                });
            }
            flat = idx
                .checked_mul(strides[dim])
                .and_then(|offset| flat.checked_add(offset))
                .ok_or_else(|| self.too_large())?;
        }
        Ok(flat)
    }

    /// Byte length of a buffer holding this shape with `itemsize`-byte
    /// elements. Errors when the size does not fit the address space.
    pub(crate) fn byte_len(&self, itemsize: usize) -> Result<usize> {
        self.checked_elem_count()
            .and_then(|n| n.checked_mul(itemsize))
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| self.too_large())
    }

    /// Check that this shape can be used to allocate a fresh array of
    /// `itemsize`-byte elements: at least one dimension is required and the
    /// buffer size must be addressable. Returns that size in bytes.
    pub(crate) fn check_allocatable(&self, itemsize: usize) -> Result<usize> {
        if self.0.is_empty() {
            return Err(Error::InvalidShape {
                shape: self.clone(),
                reason: "shape must have at least one dimension",
            });
        }
        self.byte_len(itemsize)
    }

    pub(crate) fn too_large(&self) -> Error {
        Error::InvalidShape {
            shape: self.clone(),
            reason: "element count overflows the address space",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

// These let you write: Shape::from((3, 4)) instead of Shape::new(vec![3, 4])

impl From<()> for Shape {
    /// Scalar shape (0 dimensions).
    fn from(_: ()) -> Self {
        Shape(vec![])
    }
}

impl From<usize> for Shape {
    /// 1-D shape.
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize,)> for Shape {
    fn from((d0,): (usize,)) -> Self {
        Shape(vec![d0])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((d0, d1): (usize, usize)) -> Self {
        Shape(vec![d0, d1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<(usize, usize, usize, usize)> for Shape {
    fn from((d0, d1, d2, d3): (usize, usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2, d3])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(a: [usize; N]) -> Self {
        Shape(a.to_vec())
    }
}

impl From<&Shape> for Shape {
    fn from(s: &Shape) -> Self {
        s.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::from(());
        assert_eq!(s.rank(), 0);
        assert_eq!(s.elem_count(), 1);
        assert_eq!(s.stride_contiguous(), Vec::<usize>::new());
        assert!(s.check_allocatable(8).is_err());
    }

    #[test]
    fn test_zero_sized_dim() {
        let s = Shape::from((0, 3));
        assert_eq!(s.rank(), 2);
        assert_eq!(s.elem_count(), 0);
        assert_eq!(s.check_allocatable(8).unwrap(), 0);
    }

    #[test]
    fn test_matrix_shape() {
        let s = Shape::from((3, 4));
        assert_eq!(s.rank(), 2);
        assert_eq!(s.elem_count(), 12);
        // Row-major: stride for dim0 = 4, stride for dim1 = 1
        assert_eq!(s.stride_contiguous(), vec![4, 1]);
    }

    #[test]
    fn test_3d_strides() {
        let s = Shape::from((2, 3, 4));
        assert_eq!(s.stride_contiguous(), vec![12, 4, 1]);
        assert_eq!(s.elem_count(), 24);
    }

    #[test]
    fn test_flat_index() {
        let s = Shape::from((2, 3, 4));
        // Element at [1, 2, 3]: 1*12 + 2*4 + 3*1 = 23
        assert_eq!(s.flat_index(&[1, 2, 3]).unwrap(), 23);
        assert_eq!(s.flat_index(&[0, 0, 0]).unwrap(), 0);
        assert!(s.flat_index(&[2, 0, 0]).is_err());
        assert!(s.flat_index(&[0, 0]).is_err());
    }

    #[test]
    fn test_overflowing_shape() {
        let s = Shape::from((1usize << 40, 1usize << 40));
        assert_eq!(s.checked_elem_count(), None);
        assert_eq!(s.elem_count(), usize::MAX);
        assert!(matches!(
            s.check_allocatable(1).unwrap_err(),
            Error::InvalidShape { .. }
        ));
        // A zero dimension anywhere makes the product 0, even after an overflow.
        let s = Shape::from((1usize << 40, 1usize << 40, 0));
        assert_eq!(s.checked_elem_count(), Some(0));
        assert_eq!(s.byte_len(8).unwrap(), 0);
    }

    #[test]
    fn test_byte_len_overflow() {
        let s = Shape::from((1usize << 31, 1usize << 30));
        assert_eq!(s.checked_elem_count(), Some(1usize << 61));
        assert!(s.byte_len(8).is_err());
        assert_eq!(Shape::from((2, 3)).byte_len(4).unwrap(), 24);
    }

    #[test]
    fn test_flat_index_on_huge_shape() {
        let s = Shape::from((usize::MAX, usize::MAX));
        assert!(s.flat_index(&[usize::MAX - 1, 1]).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Shape::from((3, 4))), "[3, 4]");
        assert_eq!(format!("{}", Shape::from(())), "[]");
    }
}
