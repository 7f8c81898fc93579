use crate::dtype::DType;
use crate::shape::Shape;

/// The four failure signals an array operation can report.
///
/// Every [`Error`] variant belongs to exactly one kind, so callers that only
/// care about the category can match on [`Error::kind`] instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Ragged input, mismatched operand shapes, invalid shape arguments.
    Shape,
    /// Leaf values or dtypes an operation cannot work with.
    Type,
    /// A value that cannot be represented in the requested dtype.
    Cast,
    /// Degenerate scalar arguments (zero step, out-of-bounds index).
    Value,
}

/// All errors that can occur within ndtyped.
///
/// Errors are detected at the operation boundary before any buffer is
/// written, so a failed call never leaves a half-built array behind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shape mismatch between two arrays (e.g. adding [2, 3] to [3, 2]).
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Sibling sequences at the same nesting level have different lengths.
    #[error("ragged nested sequence at depth {depth}: expected length {expected}, got {got}")]
    RaggedSequence {
        depth: usize,
        expected: usize,
        got: usize,
    },

    /// A scalar and a sequence appear as siblings at the same nesting level.
    #[error("inconsistent nesting at depth {depth}: mixes scalars and sequences")]
    InconsistentNesting { depth: usize },

    /// A shape argument that cannot describe an array.
    #[error("invalid shape {shape}: {reason}")]
    InvalidShape { shape: Shape, reason: &'static str },

    /// Element count mismatch when creating an array from flat data.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Byte length of raw data does not match shape and dtype.
    #[error("buffer size mismatch: {dtype} array of shape {shape} needs {expected} bytes, got {got}")]
    BufferSizeMismatch {
        dtype: DType,
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Cannot reshape because element counts differ.
    #[error("cannot reshape: source has {src} elements, target shape {dst_shape} has {dst} elements")]
    ReshapeElementMismatch {
        src: usize,
        dst: usize,
        dst_shape: Shape,
    },

    /// Multi-index has the wrong number of coordinates.
    #[error("index rank mismatch: array has {expected} dimensions, index has {got}")]
    IndexRankMismatch { expected: usize, got: usize },

    /// A leaf value that has no array dtype.
    #[error("unsupported leaf value of kind {kind}")]
    UnsupportedLeaf { kind: &'static str },

    /// Nested input mixes string and numeric leaves.
    #[error("cannot infer a dtype from mixed {first} and {second} leaves")]
    MixedLeaves {
        first: &'static str,
        second: &'static str,
    },

    /// The operation is not defined for this dtype.
    #[error("unsupported dtype {dtype} for operation '{op}'")]
    UnsupportedDType { dtype: DType, op: &'static str },

    /// Typed extraction asked for a different element type.
    #[error("dtype mismatch: array holds {actual}, requested {requested}")]
    DTypeMismatch { actual: DType, requested: DType },

    /// A value cannot be represented in the target dtype.
    #[error("cannot cast {value} from {from} to {to}")]
    Cast {
        value: String,
        from: String,
        to: DType,
    },

    /// `arange` was called with a zero step.
    #[error("arange: step cannot be zero")]
    ZeroStep,

    /// A non-finite or otherwise unusable numeric argument.
    #[error("invalid argument '{arg}': {reason}")]
    InvalidArgument { arg: &'static str, reason: String },

    /// Multi-index coordinate past the end of its dimension.
    #[error("index {index} out of bounds for dimension {dim} of size {size}")]
    IndexOutOfBounds {
        dim: usize,
        index: usize,
        size: usize,
    },
}

impl Error {
    /// The failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShapeMismatch { .. }
            | Error::RaggedSequence { .. }
            | Error::InconsistentNesting { .. }
            | Error::InvalidShape { .. }
            | Error::ElementCountMismatch { .. }
            | Error::BufferSizeMismatch { .. }
            | Error::ReshapeElementMismatch { .. }
            | Error::IndexRankMismatch { .. } => ErrorKind::Shape,
            Error::UnsupportedLeaf { .. }
            | Error::MixedLeaves { .. }
            | Error::UnsupportedDType { .. }
            | Error::DTypeMismatch { .. } => ErrorKind::Type,
            Error::Cast { .. } => ErrorKind::Cast,
            Error::ZeroStep | Error::InvalidArgument { .. } | Error::IndexOutOfBounds { .. } => {
                ErrorKind::Value
            }
        }
    }

    pub(crate) fn cast(value: impl ToString, from: impl ToString, to: DType) -> Self {
        Error::Cast {
            value: value.to_string(),
            from: from.to_string(),
            to,
        }
    }
}

/// Convenience Result type used throughout ndtyped.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_disjoint() {
        let shape = Error::ShapeMismatch {
            expected: Shape::from((2, 3)),
            got: Shape::from((3, 2)),
        };
        assert_eq!(shape.kind(), ErrorKind::Shape);
        assert_eq!(
            Error::UnsupportedLeaf { kind: "bool" }.kind(),
            ErrorKind::Type
        );
        assert_eq!(Error::cast("abc", "str", DType::I64).kind(), ErrorKind::Cast);
        assert_eq!(Error::ZeroStep.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_display() {
        let e = Error::ShapeMismatch {
            expected: Shape::from((2, 3)),
            got: Shape::from((3, 2)),
        };
        assert_eq!(e.to_string(), "shape mismatch: expected [2, 3], got [3, 2]");
        let e = Error::cast("'abc'", "S3", DType::F64);
        assert_eq!(e.to_string(), "cannot cast 'abc' from S3 to f64");
    }
}
