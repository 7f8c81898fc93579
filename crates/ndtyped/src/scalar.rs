use std::fmt;

use crate::config::ArrayConfig;
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::shape::Shape;

// Scalar / Nested: dynamically typed input literals
//
// Arrays are built from already-materialized data whose element types are only
// known at runtime: a list of numbers may hold integers and reals side by side,
// or numeric text. `Scalar` is one such leaf value, `Nested` is an arbitrarily
// deep sequence of them. Building an array walks the nesting level by level to
// measure the shape, then picks one dtype for all leaves.

/// A single dynamically typed literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Scalar {
    /// Short name of the literal kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
            Scalar::Bool(_) => "bool",
            Scalar::Null => "null",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    /// The dtype of this literal taken on its own: integers are I64, reals
    /// are F64 and text is a string just wide enough to hold it.
    pub fn natural_dtype(&self) -> Result<DType> {
        match self {
            Scalar::Int(_) => Ok(DType::I64),
            Scalar::Float(_) => Ok(DType::F64),
            Scalar::Str(s) => Ok(DType::Str(s.len().max(1))),
            Scalar::Bool(_) | Scalar::Null => Err(Error::UnsupportedLeaf {
                kind: self.kind_name(),
            }),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{:?}", v),
            Scalar::Str(s) => write!(f, "'{}'", s),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => write!(f, "null"),
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident: $($t:ty),*) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::$variant(v.into())
                }
            }
        )*
    };
}

scalar_from!(Int: i64, i32, i16, i8, u32, u16, u8);
scalar_from!(Float: f64, f32);
scalar_from!(Str: String, &str);
scalar_from!(Bool: bool);

impl From<()> for Scalar {
    fn from(_: ()) -> Self {
        Scalar::Null
    }
}

/// A scalar or an ordered, possibly nested, sequence of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested {
    Scalar(Scalar),
    Seq(Vec<Nested>),
}

impl From<Scalar> for Nested {
    fn from(s: Scalar) -> Self {
        Nested::Scalar(s)
    }
}

macro_rules! nested_from_leaf {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Nested {
                fn from(v: $t) -> Self {
                    Nested::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

nested_from_leaf!(i64, i32, i16, i8, u32, u16, u8, f64, f32, String, &str, bool, ());

impl<T: Into<Nested>> From<Vec<T>> for Nested {
    fn from(v: Vec<T>) -> Self {
        Nested::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Nested>, const N: usize> From<[T; N]> for Nested {
    fn from(a: [T; N]) -> Self {
        Nested::Seq(a.into_iter().map(Into::into).collect())
    }
}

/// Build a [`Nested`] sequence from literal syntax. Leaves may mix types.
///
/// Each bracket level expands in one step, so rows may be arbitrarily long.
/// A level that mixes rows and leaves takes its rows as Rust arrays, which
/// then need a single element type.
///
/// ```
/// use ndtyped::{nested, Nested};
///
/// let data = nested![[1, 2.5], [-3, 4]];
/// assert!(matches!(data, Nested::Seq(ref rows) if rows.len() == 2));
/// ```
#[macro_export]
macro_rules! nested {
    ($([$($inner:tt)*]),+ $(,)?) => {
        $crate::Nested::Seq(::std::vec![$($crate::nested!($($inner)*)),+])
    };
    ($($leaf:expr),* $(,)?) => {
        $crate::Nested::Seq(::std::vec![$($crate::Nested::from($leaf)),*])
    };
}

/// Shape and row-major leaves of a nested input.
#[derive(Debug)]
pub(crate) struct Flattened<'a> {
    pub shape: Shape,
    pub leaves: Vec<&'a Scalar>,
}

/// Measure the shape of `input` and collect its leaves in row-major order.
///
/// Every level must consist either entirely of scalars or entirely of
/// sequences of one common length; anything else is ragged.
pub(crate) fn flatten(input: &Nested) -> Result<Flattened<'_>> {
    let mut dims = Vec::new();
    let mut level: Vec<&Nested> = vec![input];
    let mut depth = 0;
    loop {
        let mut seqs = Vec::with_capacity(level.len());
        let mut leaves = Vec::with_capacity(level.len());
        for &node in &level {
            match node {
                Nested::Scalar(s) => leaves.push(s),
                Nested::Seq(children) => seqs.push(children),
            }
        }
        if !leaves.is_empty() && !seqs.is_empty() {
            log::debug!("rejecting nested input: scalars and sequences at depth {}", depth);
            return Err(Error::InconsistentNesting { depth });
        }
        if seqs.is_empty() {
            return Ok(Flattened {
                shape: Shape::new(dims),
                leaves,
            });
        }
        let expected = seqs[0].len();
        if let Some(bad) = seqs.iter().find(|children| children.len() != expected) {
            log::debug!(
                "rejecting ragged nested input at depth {}: {} vs {}",
                depth,
                expected,
                bad.len()
            );
            return Err(Error::RaggedSequence {
                depth,
                expected,
                got: bad.len(),
            });
        }
        dims.push(expected);
        level = seqs.into_iter().flat_map(|children| children.iter()).collect();
        depth += 1;
    }
}

/// Pick one dtype for a set of leaves.
///
/// Only integers → the configured integer dtype. Any real → the configured
/// float dtype. Only text → a string dtype as wide as the longest leaf. No
/// leaves at all → the configured float dtype.
pub(crate) fn infer_dtype(leaves: &[&Scalar], config: &ArrayConfig) -> Result<DType> {
    let mut has_int = false;
    let mut has_float = false;
    let mut str_width: Option<usize> = None;
    for leaf in leaves {
        match leaf {
            Scalar::Int(_) => has_int = true,
            Scalar::Float(_) => has_float = true,
            Scalar::Str(s) => {
                str_width = Some(str_width.unwrap_or(1).max(s.len()));
            }
            Scalar::Bool(_) | Scalar::Null => {
                log::debug!("rejecting {} leaf during dtype inference", leaf.kind_name());
                return Err(Error::UnsupportedLeaf {
                    kind: leaf.kind_name(),
                });
            }
        }
        if str_width.is_some() && (has_int || has_float) {
            return Err(Error::MixedLeaves {
                first: "string",
                second: "numeric",
            });
        }
    }
    let dtype = match str_width {
        Some(width) => DType::Str(width),
        None if has_float => config.float_dtype,
        None if has_int => config.int_dtype,
        None => config.float_dtype,
    };
    Ok(dtype)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(input: &Nested) -> Result<DType> {
        let flat = flatten(input)?;
        infer_dtype(&flat.leaves, &ArrayConfig::default())
    }

    #[test]
    fn test_flatten_2d() {
        let input = nested![[1, 2, 3, 4], [5, 6, 7, 8]];
        let flat = flatten(&input).unwrap();
        assert_eq!(flat.shape.dims(), &[2, 4]);
        assert_eq!(flat.leaves.len(), 8);
        assert_eq!(flat.leaves[4], &Scalar::Int(5));
    }

    #[test]
    fn test_flatten_scalar_and_empty() {
        let n = Nested::from(7);
        let flat = flatten(&n).unwrap();
        assert_eq!(flat.shape.rank(), 0);
        assert_eq!(flat.leaves.len(), 1);

        let n = nested![];
        let flat = flatten(&n).unwrap();
        assert_eq!(flat.shape.dims(), &[0]);
        assert!(flat.leaves.is_empty());

        let n = nested![[], []];
        let flat = flatten(&n).unwrap();
        assert_eq!(flat.shape.dims(), &[2, 0]);
    }

    #[test]
    fn test_ragged_rejected() {
        let err = flatten(&nested![[1, 2], [3, 4, 5]]).unwrap_err();
        assert!(matches!(
            err,
            Error::RaggedSequence {
                depth: 1,
                expected: 2,
                got: 3
            }
        ));
        let err = flatten(&nested![1, [2]]).unwrap_err();
        assert!(matches!(err, Error::InconsistentNesting { depth: 1 }));
    }

    #[test]
    fn test_infer() {
        assert_eq!(infer(&nested![1, 2, 3]).unwrap(), DType::I64);
        assert_eq!(infer(&nested![6, 7.5, 8, 0, 1]).unwrap(), DType::F64);
        assert_eq!(infer(&nested!["1.5", "22"]).unwrap(), DType::Str(3));
        assert_eq!(infer(&nested![]).unwrap(), DType::F64);
        assert!(matches!(
            infer(&nested![1, "2"]).unwrap_err(),
            Error::MixedLeaves { .. }
        ));
        assert!(matches!(
            infer(&nested![true, false]).unwrap_err(),
            Error::UnsupportedLeaf { kind: "bool" }
        ));
    }

    #[test]
    fn test_from_arrays() {
        let a = Nested::from([[1, 2], [3, 4]]);
        assert_eq!(a, nested![[1, 2], [3, 4]]);
        let v = Nested::from(vec![1.5, -2.0]);
        assert_eq!(v, nested![1.5, -2.0]);
    }

    #[test]
    fn test_long_literal_row() {
        let row = nested![
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22,
            23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43,
            44, 45, 46, 47, 48, 49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63, 64,
            65, 66, 67, 68, 69, 70, 71, 72, 73, 74, 75, 76, 77, 78, 79, 80, 81, 82, 83, 84, 85,
            86, 87, 88, 89, 90, 91, 92, 93, 94, 95, 96, 97, 98, 99, 100, 101, 102, 103, 104,
            105, 106, 107, 108, 109, 110, 111, 112, 113, 114, 115, 116, 117, 118, 119, 120, 121,
            122, 123, 124, 125, 126, 127, 128, 129, 130, 131, 132, 133, 134, 135, 136, 137, 138,
            139, 140, 141, 142, 143, 144, 145, 146, 147, 148, 149, 150, 151, 152, 153, 154, 155,
            156, 157, 158, 159, 160, 161, 162, 163, 164, 165, 166, 167, 168, 169, 170, 171, 172,
            173, 174, 175, 176, 177, 178, 179, 180, 181, 182, 183, 184, 185, 186, 187, 188, 189,
            190, 191, 192, 193, 194, 195, 196, 197, 198, 199
        ];
        let flat = flatten(&row).unwrap();
        assert_eq!(flat.shape.dims(), &[200]);
        assert_eq!(flat.leaves[199], &Scalar::Int(199));

        let mixed = nested![[0.5, 1, -2], [3, 4.25, 5],];
        assert_eq!(flatten(&mixed).unwrap().shape.dims(), &[2, 3]);
        assert_eq!(infer(&mixed).unwrap(), DType::F64);
    }
}
