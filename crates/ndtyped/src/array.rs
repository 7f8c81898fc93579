use std::borrow::Cow;
use std::fmt;

use crate::config::ArrayConfig;
use crate::dtype::{dispatch_numeric, result_dtype, DType, Element};
use crate::error::{Error, Result};
use crate::ops::{self, BinaryOp, ScalarSide};
use crate::scalar::{self, Nested, Scalar};
use crate::shape::Shape;
use crate::storage;

// TypedArray: the fundamental data structure
//
// A TypedArray is a homogeneous n-dimensional array:
//
//   1. `shape` : size of each dimension, fixed at construction
//   2. `dtype` : the one element type shared by every element
//   3. `buffer`: elem_count * dtype.size_in_bytes() bytes, row-major
//
// MEMORY MODEL:
//
//   Each array exclusively owns its buffer. There are no views: every
//   operation (cast, reshape, arithmetic) allocates a fresh buffer and returns
//   a new array, leaving its operands untouched. Clone is a deep copy.
//
// DTYPE RULES:
//
//   Nested input infers I64 for all-integer leaves and F64 as soon as one leaf
//   is real. Binary operations compute in the promoted dtype of their operands;
//   division always produces a float. A scalar operand counts as a
//   zero-dimensional array of its natural dtype (integer → I64, real → F64).

/// A homogeneous, typed, n-dimensional array stored contiguously in row-major order.
///
/// # Example
/// ```
/// use ndtyped::{nested, DType, TypedArray};
///
/// let arr = TypedArray::from_nested(&nested![[1, 2, 3], [4, 5, 6]])?;
/// assert_eq!(arr.dims(), &[2, 3]);
/// assert_eq!(arr.dtype(), DType::I64);
///
/// let halves = arr.div_scalar(2)?;
/// assert_eq!(halves.dtype(), DType::F64);
/// assert_eq!(halves.to_f64_vec()?, vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
/// # Ok::<(), ndtyped::Error>(())
/// ```
#[derive(Clone, PartialEq)]
pub struct TypedArray {
    shape: Shape,
    dtype: DType,
    buffer: Vec<u8>,
}

impl fmt::Debug for TypedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TypedArray(shape={}, dtype={}, nbytes={})",
            self.shape,
            self.dtype,
            self.buffer.len()
        )
    }
}

impl TypedArray {
    // Internal constructor

    /// Wrap a buffer that is already known to match shape and dtype.
    fn from_parts(shape: Shape, dtype: DType, buffer: Vec<u8>) -> Self {
        debug_assert_eq!(buffer.len(), shape.elem_count() * dtype.size_in_bytes());
        log::trace!("allocated {} array of shape {} ({} bytes)", dtype, shape, buffer.len());
        TypedArray {
            shape,
            dtype,
            buffer,
        }
    }

    // Construction from data

    /// Build an array from a scalar or a (nested) sequence, inferring the dtype.
    pub fn from_nested(input: &Nested) -> Result<Self> {
        Self::from_nested_with(input, None, &ArrayConfig::default())
    }

    /// Build an array from nested input, converting every leaf to `dtype`.
    pub fn from_nested_as(input: &Nested, dtype: DType) -> Result<Self> {
        Self::from_nested_with(input, Some(dtype), &ArrayConfig::default())
    }

    /// Build an array from nested input with an explicit configuration.
    ///
    /// With `dtype = None` the dtype is inferred from the leaves; otherwise
    /// every leaf is converted to `dtype` and any leaf that cannot be
    /// represented fails the whole construction.
    pub fn from_nested_with(
        input: &Nested,
        dtype: Option<DType>,
        config: &ArrayConfig,
    ) -> Result<Self> {
        let flat = scalar::flatten(input)?;
        let dtype = match dtype {
            Some(dtype) => dtype,
            None => scalar::infer_dtype(&flat.leaves, config)?,
        };
        let buffer = storage::encode_leaves(&flat.leaves, dtype).map_err(|e| {
            log::debug!("from_nested: cannot build {} array: {}", dtype, e);
            e
        })?;
        Ok(Self::from_parts(flat.shape, dtype, buffer))
    }

    /// Create an array from a flat vector of elements and a shape.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        shape.byte_len(T::DTYPE.size_in_bytes())?;
        if data.len() != shape.elem_count() {
            return Err(Error::ElementCountMismatch {
                expected: shape.elem_count(),
                got: data.len(),
                shape,
            });
        }
        Ok(Self::from_parts(shape, T::DTYPE, storage::encode(&data)))
    }

    /// Create an array from raw native-endian bytes.
    pub fn from_bytes(dtype: DType, shape: impl Into<Shape>, bytes: Vec<u8>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.byte_len(dtype.size_in_bytes())?;
        if bytes.len() != expected {
            return Err(Error::BufferSizeMismatch {
                dtype,
                shape,
                expected,
                got: bytes.len(),
            });
        }
        Ok(Self::from_parts(shape, dtype, bytes))
    }

    // Filled arrays

    /// Create an array filled with zeros. `dtype` defaults to F64.
    pub fn zeros(shape: impl Into<Shape>, dtype: Option<DType>) -> Result<Self> {
        Self::zeros_with(shape, dtype, &ArrayConfig::default())
    }

    /// Create an array filled with ones. `dtype` defaults to F64.
    pub fn ones(shape: impl Into<Shape>, dtype: Option<DType>) -> Result<Self> {
        Self::ones_with(shape, dtype, &ArrayConfig::default())
    }

    pub fn zeros_with(
        shape: impl Into<Shape>,
        dtype: Option<DType>,
        config: &ArrayConfig,
    ) -> Result<Self> {
        let shape = shape.into();
        let dtype = dtype.unwrap_or(config.float_dtype);
        shape.check_allocatable(dtype.size_in_bytes())?;
        let buffer = filled_buffer(&shape, &identity_unit(dtype, false)?)?;
        Ok(Self::from_parts(shape, dtype, buffer))
    }

    pub fn ones_with(
        shape: impl Into<Shape>,
        dtype: Option<DType>,
        config: &ArrayConfig,
    ) -> Result<Self> {
        let shape = shape.into();
        let dtype = dtype.unwrap_or(config.float_dtype);
        shape.check_allocatable(dtype.size_in_bytes())?;
        let buffer = filled_buffer(&shape, &identity_unit(dtype, true)?)?;
        Ok(Self::from_parts(shape, dtype, buffer))
    }

    /// Create an array with every element set to `value`.
    ///
    /// Without an explicit dtype the value's own type decides (integer → I64,
    /// real → F64, text → string as wide as the value).
    pub fn full(
        shape: impl Into<Shape>,
        value: impl Into<Scalar>,
        dtype: Option<DType>,
    ) -> Result<Self> {
        let shape = shape.into();
        let value = value.into();
        let dtype = match dtype {
            Some(dtype) => dtype,
            None => value.natural_dtype()?,
        };
        shape.check_allocatable(dtype.size_in_bytes())?;
        let unit = storage::encode_leaves(&[&value], dtype)?;
        let buffer = filled_buffer(&shape, &unit)?;
        Ok(Self::from_parts(shape, dtype, buffer))
    }

    /// Zeros with the same shape and dtype as `other`.
    pub fn zeros_like(other: &Self) -> Self {
        // Zero is the all-zero bit pattern in every dtype.
        let buffer = vec![0u8; other.nbytes()];
        Self::from_parts(other.shape.clone(), other.dtype, buffer)
    }

    /// Ones with the same shape and dtype as `other`. Fails only for a
    /// zero-width string dtype, which cannot hold "1".
    pub fn ones_like(other: &Self) -> Result<Self> {
        let buffer = filled_buffer(&other.shape, &identity_unit(other.dtype, true)?)?;
        Ok(Self::from_parts(other.shape.clone(), other.dtype, buffer))
    }

    // Arange: generate a sequence

    /// Create a 1-D array with values `start, start+step, ...` strictly before
    /// `stop` (below it for a positive step, above it for a negative one).
    ///
    /// Without an explicit dtype, integer arguments give an I64 array and any
    /// real argument gives F64.
    pub fn arange(
        start: impl Into<Scalar>,
        stop: impl Into<Scalar>,
        step: impl Into<Scalar>,
        dtype: Option<DType>,
    ) -> Result<Self> {
        Self::arange_with(start, stop, step, dtype, &ArrayConfig::default())
    }

    pub fn arange_with(
        start: impl Into<Scalar>,
        stop: impl Into<Scalar>,
        step: impl Into<Scalar>,
        dtype: Option<DType>,
        config: &ArrayConfig,
    ) -> Result<Self> {
        let (start, stop, step) = (start.into(), stop.into(), step.into());
        for arg in [&start, &stop, &step] {
            if !arg.is_numeric() {
                return Err(Error::UnsupportedLeaf {
                    kind: arg.kind_name(),
                });
            }
        }
        let array = match (&start, &stop, &step) {
            (Scalar::Int(start), Scalar::Int(stop), Scalar::Int(step)) => {
                let values = arange_int(*start, *stop, *step)?;
                let len = values.len();
                Self::from_vec(values, len)?
            }
            _ => {
                let values = arange_float(as_f64(&start), as_f64(&stop), as_f64(&step))?;
                let len = values.len();
                Self::from_vec(values, len)?
            }
        };
        let natural = if array.dtype == DType::I64 {
            config.int_dtype
        } else {
            config.float_dtype
        };
        let target = dtype.unwrap_or(natural);
        if target == array.dtype {
            return Ok(array);
        }
        array.astype_with(target, config)
    }

    // Accessors

    /// The shape of this array.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The dimensions as a slice (shortcut for shape().dims()).
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.rank()
    }

    /// Data type of the elements.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Total number of elements.
    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }

    /// Size of one element in bytes.
    pub fn itemsize(&self) -> usize {
        self.dtype.size_in_bytes()
    }

    /// Size of the whole buffer in bytes.
    pub fn nbytes(&self) -> usize {
        self.buffer.len()
    }

    /// Row-major strides, in bytes.
    pub fn strides(&self) -> Vec<usize> {
        let item = self.itemsize();
        self.shape
            .stride_contiguous()
            .into_iter()
            .map(|s| s * item)
            .collect()
    }

    /// The raw buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the array and return its raw buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    // Reshape

    /// Copy the elements into a new array of a different shape with the same
    /// element count.
    pub fn reshape(&self, new_shape: impl Into<Shape>) -> Result<Self> {
        let new_shape = new_shape.into();
        let current_count = self.elem_count();
        let new_count = new_shape
            .checked_elem_count()
            .ok_or_else(|| new_shape.too_large())?;
        if current_count != new_count {
            return Err(Error::ReshapeElementMismatch {
                src: current_count,
                dst: new_count,
                dst_shape: new_shape,
            });
        }
        Ok(Self::from_parts(new_shape, self.dtype, self.buffer.clone()))
    }

    // Casting

    /// Convert every element to `dtype`, returning a new array of the same shape.
    ///
    /// Float → int truncates toward zero. Values that cannot be represented
    /// (NaN, out of range, unparseable text, text too long for a string
    /// width) fail the whole cast. Casting to the current dtype returns a copy.
    pub fn astype(&self, dtype: DType) -> Result<Self> {
        self.astype_with(dtype, &ArrayConfig::default())
    }

    pub fn astype_with(&self, dtype: DType, config: &ArrayConfig) -> Result<Self> {
        self.shape.byte_len(dtype.size_in_bytes())?;
        let n = self.elem_count();
        let buffer =
            storage::cast_buffer(&self.buffer, self.dtype, dtype, n, config.use_parallel(n))
                .map_err(|e| {
                    log::debug!("astype {} -> {} failed: {}", self.dtype, dtype, e);
                    e
                })?;
        Ok(Self::from_parts(self.shape.clone(), dtype, buffer))
    }

    /// This array's buffer converted to `dtype`, borrowed when no conversion
    /// is needed.
    fn buffer_as(&self, dtype: DType, parallel: bool) -> Result<Cow<'_, [u8]>> {
        if self.dtype == dtype {
            return Ok(Cow::Borrowed(&self.buffer));
        }
        storage::cast_buffer(&self.buffer, self.dtype, dtype, self.elem_count(), parallel)
            .map(Cow::Owned)
    }

    // Data extraction

    /// Copy the elements out as a typed vector. `T` must match the dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype {
            return Err(Error::DTypeMismatch {
                actual: self.dtype,
                requested: T::DTYPE,
            });
        }
        Ok(storage::decode(&self.buffer))
    }

    /// Copy the elements of a numeric array out as f64 values.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        dispatch_numeric!(self.dtype, T => {
            let values: Vec<T> = storage::decode(&self.buffer);
            Ok(values.into_iter().map(Element::as_f64).collect())
        }, str => Err(Error::UnsupportedDType { dtype: self.dtype, op: "to_f64_vec" }))
    }

    /// Copy the elements of a string array out.
    pub fn to_string_vec(&self) -> Result<Vec<String>> {
        match self.dtype {
            DType::Str(width) => Ok(storage::decode_str(&self.buffer, width, self.elem_count())),
            dtype => Err(Error::UnsupportedDType {
                dtype,
                op: "to_string_vec",
            }),
        }
    }

    /// The element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Result<Scalar> {
        let flat = self.shape.flat_index(index)?;
        dispatch_numeric!(self.dtype, T => {
            Ok(storage::read_element::<T>(&self.buffer, flat).to_scalar())
        }, str => {
            let width = self.itemsize();
            let slot = &self.buffer[flat * width..(flat + 1) * width];
            let text = storage::decode_str(slot, width, 1).pop().unwrap_or_default();
            Ok(Scalar::Str(text))
        })
    }

    /// The single element of a scalar or one-element array.
    pub fn item(&self) -> Result<Scalar> {
        if self.elem_count() != 1 {
            return Err(Error::ElementCountMismatch {
                shape: self.shape.clone(),
                expected: 1,
                got: self.elem_count(),
            });
        }
        self.get(&vec![0; self.ndim()])
    }

    // Arithmetic operations

    /// Element-wise addition: self + rhs.
    pub fn add(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Add)
    }

    /// Element-wise subtraction: self - rhs.
    pub fn sub(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Sub)
    }

    /// Element-wise multiplication: self * rhs.
    pub fn mul(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Mul)
    }

    /// Element-wise true division: self / rhs. Always produces a float array.
    pub fn div(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Div)
    }

    fn binary_op(&self, rhs: &Self, op: BinaryOp) -> Result<Self> {
        self.binary_op_with(rhs, op, &ArrayConfig::default())
    }

    /// Apply `op` element-wise between two arrays of identical shape.
    pub fn binary_op_with(&self, rhs: &Self, op: BinaryOp, config: &ArrayConfig) -> Result<Self> {
        if self.shape != rhs.shape {
            log::debug!("{}: shape mismatch {} vs {}", op.name(), self.shape, rhs.shape);
            return Err(Error::ShapeMismatch {
                expected: self.shape.clone(),
                got: rhs.shape.clone(),
            });
        }
        let out = result_dtype(op, self.dtype, rhs.dtype)?;
        let parallel = config.use_parallel(self.elem_count());
        let lhs_bytes = self.buffer_as(out, parallel)?;
        let rhs_bytes = rhs.buffer_as(out, parallel)?;
        let buffer = dispatch_numeric!(out, T => {
            let a: Vec<T> = storage::decode(&lhs_bytes);
            let b: Vec<T> = storage::decode(&rhs_bytes);
            storage::encode(&ops::binary_kernel(op, &a, &b, parallel))
        }, str => return Err(Error::UnsupportedDType { dtype: out, op: op.name() }));
        Ok(Self::from_parts(self.shape.clone(), out, buffer))
    }

    /// self + scalar
    pub fn add_scalar(&self, value: impl Into<Scalar>) -> Result<Self> {
        self.scalar_op(value.into(), BinaryOp::Add, ScalarSide::Rhs)
    }

    /// self - scalar
    pub fn sub_scalar(&self, value: impl Into<Scalar>) -> Result<Self> {
        self.scalar_op(value.into(), BinaryOp::Sub, ScalarSide::Rhs)
    }

    /// self * scalar
    pub fn mul_scalar(&self, value: impl Into<Scalar>) -> Result<Self> {
        self.scalar_op(value.into(), BinaryOp::Mul, ScalarSide::Rhs)
    }

    /// self / scalar
    pub fn div_scalar(&self, value: impl Into<Scalar>) -> Result<Self> {
        self.scalar_op(value.into(), BinaryOp::Div, ScalarSide::Rhs)
    }

    /// scalar - self
    pub fn rsub_scalar(&self, value: impl Into<Scalar>) -> Result<Self> {
        self.scalar_op(value.into(), BinaryOp::Sub, ScalarSide::Lhs)
    }

    /// scalar / self, e.g. the element-wise reciprocal for `1`.
    pub fn rdiv_scalar(&self, value: impl Into<Scalar>) -> Result<Self> {
        self.scalar_op(value.into(), BinaryOp::Div, ScalarSide::Lhs)
    }

    fn scalar_op(&self, value: Scalar, op: BinaryOp, side: ScalarSide) -> Result<Self> {
        self.scalar_op_with(&value, op, side, &ArrayConfig::default())
    }

    /// Apply `op` between every element and one scalar. `side` says whether
    /// the scalar is the left or the right operand.
    pub fn scalar_op_with(
        &self,
        value: &Scalar,
        op: BinaryOp,
        side: ScalarSide,
        config: &ArrayConfig,
    ) -> Result<Self> {
        let scalar_dtype = value.natural_dtype()?;
        let out = match side {
            ScalarSide::Rhs => result_dtype(op, self.dtype, scalar_dtype)?,
            ScalarSide::Lhs => result_dtype(op, scalar_dtype, self.dtype)?,
        };
        let parallel = config.use_parallel(self.elem_count());
        let bytes = self.buffer_as(out, parallel)?;
        let buffer = dispatch_numeric!(out, T => {
            let scalar = storage::encode_leaves(&[value], out)
                .map(|b| storage::read_element::<T>(&b, 0))?;
            let values: Vec<T> = storage::decode(&bytes);
            storage::encode(&ops::scalar_kernel(op, &values, scalar, side, parallel))
        }, str => return Err(Error::UnsupportedDType { dtype: out, op: op.name() }));
        Ok(Self::from_parts(self.shape.clone(), out, buffer))
    }
}

// Filled buffers
//
// Sizes come from caller-supplied shapes, so the buffer is reserved up front
// and a refused allocation is reported as an error instead of aborting.

/// One encoded element: zero (empty string) or one ("1").
fn identity_unit(dtype: DType, one: bool) -> Result<Vec<u8>> {
    dispatch_numeric!(dtype, T => {
        Ok(storage::encode(&[if one { T::one() } else { T::zero() }]))
    }, str => storage::encode_str(&[if one { "1" } else { "" }], dtype.size_in_bytes(), "literal"))
}

/// A buffer for `shape` with every element equal to the encoded `unit`.
fn filled_buffer(shape: &Shape, unit: &[u8]) -> Result<Vec<u8>> {
    let nbytes = shape.byte_len(unit.len())?;
    let mut buffer = storage::try_with_capacity(nbytes).ok_or_else(|| {
        log::debug!("cannot allocate {} bytes for shape {}", nbytes, shape);
        Error::InvalidShape {
            shape: shape.clone(),
            reason: "buffer cannot be allocated",
        }
    })?;
    if unit.iter().all(|&b| b == 0) {
        buffer.resize(nbytes, 0);
    } else {
        while buffer.len() < nbytes {
            buffer.extend_from_slice(unit);
        }
    }
    Ok(buffer)
}

fn as_f64(s: &Scalar) -> f64 {
    match s {
        Scalar::Int(v) => *v as f64,
        Scalar::Float(v) => *v,
        _ => f64::NAN,
    }
}

fn arange_int(start: i64, stop: i64, step: i64) -> Result<Vec<i64>> {
    if step == 0 {
        return Err(Error::ZeroStep);
    }
    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    let span = if step > 0 { stop - start } else { start - stop };
    let len = if span <= 0 {
        0
    } else {
        (span + step.abs() - 1) / step.abs()
    };
    let mut values = alloc_sequence(len as u128)?;
    values.extend((0..len).map(|i| (start + i * step) as i64));
    Ok(values)
}

fn arange_float(start: f64, stop: f64, step: f64) -> Result<Vec<f64>> {
    if step == 0.0 {
        return Err(Error::ZeroStep);
    }
    for (arg, v) in [("start", start), ("stop", stop), ("step", step)] {
        if !v.is_finite() {
            return Err(Error::InvalidArgument {
                arg,
                reason: format!("{} is not finite", v),
            });
        }
    }
    let len = ((stop - start) / step).ceil();
    let len = if len > 0.0 { len } else { 0.0 };
    if len >= u128::MAX as f64 {
        return Err(Error::InvalidArgument {
            arg: "step",
            reason: "sequence length overflows".into(),
        });
    }
    let len = len as u128;
    let mut values = alloc_sequence(len)?;
    // Computed from the index rather than accumulated, so rounding error
    // does not build up along the sequence.
    values.extend((0..len).map(|i| start + i as f64 * step));
    Ok(values)
}

fn alloc_sequence<T>(len: u128) -> Result<Vec<T>> {
    let too_long = || Error::InvalidArgument {
        arg: "step",
        reason: format!("sequence of {} elements cannot be allocated", len),
    };
    let len = usize::try_from(len).map_err(|_| too_long())?;
    storage::try_with_capacity(len).ok_or_else(too_long)
}

// Operator overloading
//
// Operators work on references and return Result, so `(&a + &b)?` reads like
// the method form and shape or dtype errors still surface.

macro_rules! array_binary_ops {
    ($($trait:ident, $method:ident, $op:ident);* $(;)?) => {
        $(
            impl std::ops::$trait<&TypedArray> for &TypedArray {
                type Output = Result<TypedArray>;

                fn $method(self, rhs: &TypedArray) -> Result<TypedArray> {
                    self.binary_op(rhs, BinaryOp::$op)
                }
            }

            impl std::ops::$trait<i64> for &TypedArray {
                type Output = Result<TypedArray>;

                fn $method(self, rhs: i64) -> Result<TypedArray> {
                    self.scalar_op(Scalar::Int(rhs), BinaryOp::$op, ScalarSide::Rhs)
                }
            }

            impl std::ops::$trait<f64> for &TypedArray {
                type Output = Result<TypedArray>;

                fn $method(self, rhs: f64) -> Result<TypedArray> {
                    self.scalar_op(Scalar::Float(rhs), BinaryOp::$op, ScalarSide::Rhs)
                }
            }

            impl std::ops::$trait<&TypedArray> for i64 {
                type Output = Result<TypedArray>;

                fn $method(self, rhs: &TypedArray) -> Result<TypedArray> {
                    rhs.scalar_op(Scalar::Int(self), BinaryOp::$op, ScalarSide::Lhs)
                }
            }

            impl std::ops::$trait<&TypedArray> for f64 {
                type Output = Result<TypedArray>;

                fn $method(self, rhs: &TypedArray) -> Result<TypedArray> {
                    rhs.scalar_op(Scalar::Float(self), BinaryOp::$op, ScalarSide::Lhs)
                }
            }
        )*
    };
}

array_binary_ops!(
    Add, add, Add;
    Sub, sub, Sub;
    Mul, mul, Mul;
    Div, div, Div;
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nested;

    #[test]
    fn test_from_nested_2d() {
        let arr = TypedArray::from_nested(&nested![[1, 2, 3, 4], [5, 6, 7, 8]]).unwrap();
        assert_eq!(arr.dims(), &[2, 4]);
        assert_eq!(arr.ndim(), 2);
        assert_eq!(arr.dtype(), DType::I64);
        assert_eq!(arr.nbytes(), 8 * 8);
        assert_eq!(arr.strides(), vec![32, 8]);
        assert_eq!(arr.get(&[1, 2]).unwrap(), Scalar::Int(7));
    }

    #[test]
    fn test_scalar_input() {
        let arr = TypedArray::from_nested(&Nested::from(2.5)).unwrap();
        assert_eq!(arr.ndim(), 0);
        assert_eq!(arr.elem_count(), 1);
        assert_eq!(arr.item().unwrap(), Scalar::Float(2.5));
    }

    #[test]
    fn test_from_vec_count_mismatch() {
        let err = TypedArray::from_vec(vec![1.0f64, 2.0, 3.0], (2, 2)).unwrap_err();
        assert!(matches!(err, Error::ElementCountMismatch { expected: 4, got: 3, .. }));
    }

    #[test]
    fn test_from_bytes_size_checked() {
        assert!(TypedArray::from_bytes(DType::F32, 3, vec![0u8; 12]).is_ok());
        assert!(TypedArray::from_bytes(DType::F32, 3, vec![0u8; 11]).is_err());
    }

    #[test]
    fn test_zeros_ones_full() {
        let z = TypedArray::zeros((2, 3), None).unwrap();
        assert_eq!(z.dtype(), DType::F64);
        assert_eq!(z.to_f64_vec().unwrap(), vec![0.0; 6]);

        let o = TypedArray::ones(4, Some(DType::I32)).unwrap();
        assert_eq!(o.to_vec::<i32>().unwrap(), vec![1; 4]);

        let f = TypedArray::full((2, 2), 7, None).unwrap();
        assert_eq!(f.dtype(), DType::I64);
        assert_eq!(f.to_vec::<i64>().unwrap(), vec![7; 4]);

        let e = TypedArray::zeros((0, 3), None).unwrap();
        assert_eq!(e.elem_count(), 0);
        assert_eq!(e.nbytes(), 0);
    }

    #[test]
    fn test_zeros_rejects_empty_shape() {
        let err = TypedArray::zeros(Vec::<usize>::new(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidShape { .. }));
    }

    #[test]
    fn test_arange() {
        let a = TypedArray::arange(0, 10, 3, None).unwrap();
        assert_eq!(a.dtype(), DType::I64);
        assert_eq!(a.to_vec::<i64>().unwrap(), vec![0, 3, 6, 9]);

        let b = TypedArray::arange(5, 0, -2, None).unwrap();
        assert_eq!(b.to_vec::<i64>().unwrap(), vec![5, 3, 1]);

        let c = TypedArray::arange(0.0, 1.0, 0.25, None).unwrap();
        assert_eq!(c.dtype(), DType::F64);
        assert_eq!(c.to_vec::<f64>().unwrap(), vec![0.0, 0.25, 0.5, 0.75]);

        let d = TypedArray::arange(3, 3, 1, None).unwrap();
        assert_eq!(d.dims(), &[0]);

        assert!(matches!(
            TypedArray::arange(0, 5, 0, None).unwrap_err(),
            Error::ZeroStep
        ));
    }

    #[test]
    fn test_reshape() {
        let a = TypedArray::arange(0, 6, 1, None).unwrap();
        let r = a.reshape((2, 3)).unwrap();
        assert_eq!(r.dims(), &[2, 3]);
        assert_eq!(r.get(&[1, 0]).unwrap(), Scalar::Int(3));
        assert!(a.reshape((4, 2)).is_err());
    }

    #[test]
    fn test_binary_promotion() {
        let i = TypedArray::from_vec(vec![1i64, 2, 3], 3).unwrap();
        let f = TypedArray::from_vec(vec![0.5f64, 0.5, 0.5], 3).unwrap();
        assert_eq!(i.add(&i).unwrap().dtype(), DType::I64);
        let mixed = i.add(&f).unwrap();
        assert_eq!(mixed.dtype(), DType::F64);
        assert_eq!(mixed.to_f64_vec().unwrap(), vec![1.5, 2.5, 3.5]);
        let q = i.div(&i).unwrap();
        assert_eq!(q.dtype(), DType::F64);
        assert_eq!(q.to_f64_vec().unwrap(), vec![1.0; 3]);
    }

    #[test]
    fn test_string_arithmetic_rejected() {
        let s = TypedArray::from_nested(&nested!["1", "2"]).unwrap();
        assert!(matches!(
            s.add(&s).unwrap_err(),
            Error::UnsupportedDType { .. }
        ));
        assert!(s.mul_scalar(2).is_err());
    }

    #[test]
    fn test_parallel_path_matches() {
        let data: Vec<f64> = (0..5000).map(|i| i as f64 * 1.1).collect();
        let a = TypedArray::from_vec(data, (50, 100)).unwrap();
        let par = ArrayConfig::default().parallel_threshold(1);
        let seq = ArrayConfig::default().sequential();
        assert_eq!(
            a.binary_op_with(&a, BinaryOp::Mul, &par).unwrap(),
            a.binary_op_with(&a, BinaryOp::Mul, &seq).unwrap()
        );
        let one = Scalar::Int(1);
        assert_eq!(
            a.scalar_op_with(&one, BinaryOp::Div, ScalarSide::Lhs, &par).unwrap(),
            a.scalar_op_with(&one, BinaryOp::Div, ScalarSide::Lhs, &seq).unwrap()
        );
    }
}
