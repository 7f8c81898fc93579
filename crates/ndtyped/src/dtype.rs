use std::fmt;
use std::str::FromStr;

use half::{bf16, f16};

use crate::error::{Error, Result};
use crate::ops::BinaryOp;
use crate::scalar::Scalar;

// DType: Supported element types
//
// Every array carries exactly one DType, which fixes both how its bytes are
// interpreted and how wide each element is in the buffer:
//
//   U8, U32     : unsigned integers
//   I32, I64    : signed integers (I64 is what integer literals infer to)
//   F16, BF16   : 16-bit floats, storage formats from the `half` crate
//   F32, F64    : IEEE floats (F64 is what real literals infer to)
//   Str(n)      : fixed-width UTF-8 text, n bytes per element, NUL padded
//
// Str exists so that arrays of numeric text can be built and then cast to a
// numeric type with `astype`. It takes no part in arithmetic.

/// Enum of all supported element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    U8,
    U32,
    I32,
    I64,
    F16,
    BF16,
    F32,
    F64,
    /// Fixed-width byte string holding up to `n` bytes of UTF-8.
    Str(usize),
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::U8 => 1,
            DType::F16 | DType::BF16 => 2,
            DType::U32 | DType::I32 | DType::F32 => 4,
            DType::I64 | DType::F64 => 8,
            DType::Str(n) => *n,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::BF16 | DType::F32 | DType::F64)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, DType::U8 | DType::U32 | DType::I32 | DType::I64)
    }

    pub fn is_signed_int(&self) -> bool {
        matches!(self, DType::I32 | DType::I64)
    }

    pub fn is_unsigned_int(&self) -> bool {
        matches!(self, DType::U8 | DType::U32)
    }

    pub fn is_numeric(&self) -> bool {
        !self.is_str()
    }

    pub fn is_str(&self) -> bool {
        matches!(self, DType::Str(_))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::U8 => "u8",
            DType::U32 => "u32",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::Str(n) => return write!(f, "S{}", n),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DType {
    type Err = Error;

    /// Parse a dtype name. Accepts the short names printed by `Display`
    /// as well as the long numpy-style spellings (`int64`, `float32`, ...).
    fn from_str(s: &str) -> Result<Self> {
        let dtype = match s.trim() {
            "u8" | "uint8" => DType::U8,
            "u32" | "uint32" => DType::U32,
            "i32" | "int32" => DType::I32,
            "i64" | "int64" | "int" => DType::I64,
            "f16" | "float16" | "half" => DType::F16,
            "bf16" | "bfloat16" => DType::BF16,
            "f32" | "float32" => DType::F32,
            "f64" | "float64" | "float" => DType::F64,
            other => {
                let width = other
                    .strip_prefix('S')
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|&n| n > 0);
                match width {
                    Some(n) => DType::Str(n),
                    None => {
                        return Err(Error::InvalidArgument {
                            arg: "dtype",
                            reason: format!("unknown dtype name '{}'", other),
                        })
                    }
                }
            }
        };
        Ok(dtype)
    }
}

// Promotion: which dtype a binary operation computes in
//
// Floats beat integers, wider floats beat narrower ones, and a signed/unsigned
// integer pair widens to a signed type that holds both ranges. F16 mixed with
// BF16 goes to F32 since neither half format contains the other.

/// Promote two numeric dtypes to the common dtype for a binary operation.
pub fn promote(lhs: DType, rhs: DType) -> DType {
    use DType::*;

    if lhs == rhs {
        return lhs;
    }

    if matches!((lhs, rhs), (F16, BF16) | (BF16, F16)) {
        return F32;
    }

    if lhs.is_signed_int() && rhs.is_unsigned_int() {
        return match (lhs, rhs) {
            (I32, U8) => I32,
            _ => I64,
        };
    }
    if rhs.is_signed_int() && lhs.is_unsigned_int() {
        return promote(rhs, lhs);
    }

    let priority = |dt: DType| -> u8 {
        match dt {
            F64 => 100,
            F32 => 90,
            BF16 => 85,
            F16 => 80,
            I64 => 65,
            I32 => 55,
            U32 => 50,
            U8 => 30,
            Str(_) => 0,
        }
    };
    if priority(lhs) >= priority(rhs) {
        lhs
    } else {
        rhs
    }
}

/// The dtype an element-wise `op` produces for the given operand dtypes.
///
/// Division always yields a float: two integer operands divide as F64.
pub fn result_dtype(op: BinaryOp, lhs: DType, rhs: DType) -> Result<DType> {
    for dtype in [lhs, rhs] {
        if dtype.is_str() {
            return Err(Error::UnsupportedDType {
                dtype,
                op: op.name(),
            });
        }
    }
    let promoted = promote(lhs, rhs);
    if op == BinaryOp::Div && !promoted.is_float() {
        return Ok(DType::F64);
    }
    Ok(promoted)
}

// Element: Trait that connects Rust types to numeric DType variants
//
// Kernels are written once, generic over `T: Element`, and dispatched from the
// runtime DType with `dispatch_numeric!`. `Pod` lets the byte buffer be viewed
// as a typed slice; `NumCast` supplies range-checked conversions for casting.

pub(crate) mod sealed {
    use crate::ops::BinaryOp;

    /// Element-wise arithmetic, reachable only from inside the crate.
    pub trait Sealed: Sized {
        /// Apply `op` to one pair of elements.
        fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self;
    }
}

/// Trait implemented by Rust types that can be stored in a numeric array.
///
/// The set of element types is closed: the trait is sealed and its
/// arithmetic is not callable from outside the crate.
///
/// ```compile_fail
/// use ndtyped::{BinaryOp, Element};
///
/// let _ = <i64 as Element>::binary(BinaryOp::Div, 1, 0);
/// ```
pub trait Element:
    sealed::Sealed
    + Copy
    + Send
    + Sync
    + PartialEq
    + fmt::Debug
    + bytemuck::Pod
    + num_traits::NumCast
    + 'static
{
    /// The corresponding DType enum variant.
    const DTYPE: DType;

    fn zero() -> Self;

    fn one() -> Self;

    fn as_f64(self) -> f64;

    /// The element as a dynamic scalar literal.
    fn to_scalar(self) -> Scalar;

    /// Text form used when casting to a `Str` dtype.
    fn to_text(self) -> String;

    /// Parse a numeric literal, `None` if it is not valid for this type.
    fn parse_text(text: &str) -> Option<Self>;
}

macro_rules! int_element {
    ($t:ty, $dtype:ident) => {
        impl sealed::Sealed for $t {
            fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
                match op {
                    BinaryOp::Add => lhs.wrapping_add(rhs),
                    BinaryOp::Sub => lhs.wrapping_sub(rhs),
                    BinaryOp::Mul => lhs.wrapping_mul(rhs),
                    // Unreachable through the public API: `result_dtype`
                    // sends integer division to F64.
                    BinaryOp::Div => lhs.checked_div(rhs).unwrap_or(0),
                }
            }
        }

        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            fn zero() -> Self {
                0
            }

            fn one() -> Self {
                1
            }

            fn as_f64(self) -> f64 {
                self as f64
            }

            fn to_scalar(self) -> Scalar {
                Scalar::Int(self as i64)
            }

            fn to_text(self) -> String {
                self.to_string()
            }

            fn parse_text(text: &str) -> Option<Self> {
                text.trim().parse().ok()
            }
        }
    };
}

macro_rules! float_element {
    ($t:ty, $dtype:ident) => {
        impl sealed::Sealed for $t {
            fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
                match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => lhs / rhs,
                }
            }
        }

        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            fn zero() -> Self {
                0.0
            }

            fn one() -> Self {
                1.0
            }

            fn as_f64(self) -> f64 {
                self as f64
            }

            fn to_scalar(self) -> Scalar {
                Scalar::Float(self as f64)
            }

            fn to_text(self) -> String {
                // Debug keeps the trailing ".0" on integral values.
                format!("{:?}", self)
            }

            fn parse_text(text: &str) -> Option<Self> {
                let v: $t = text.trim().parse().ok()?;
                finite_or_named(v.is_infinite(), text).then_some(v)
            }
        }
    };
}

macro_rules! half_element {
    ($t:ty, $dtype:ident) => {
        impl sealed::Sealed for $t {
            fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
                let (l, r) = (lhs.to_f32(), rhs.to_f32());
                let v = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                };
                <$t>::from_f32(v)
            }
        }

        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            fn zero() -> Self {
                <$t>::ZERO
            }

            fn one() -> Self {
                <$t>::ONE
            }

            fn as_f64(self) -> f64 {
                <$t>::to_f64(self)
            }

            fn to_scalar(self) -> Scalar {
                Scalar::Float(<$t>::to_f64(self))
            }

            fn to_text(self) -> String {
                format!("{:?}", self.to_f32())
            }

            fn parse_text(text: &str) -> Option<Self> {
                let v = <$t>::from_f32(text.trim().parse::<f32>().ok()?);
                finite_or_named(v.is_infinite(), text).then_some(v)
            }
        }
    };
}

/// A parsed float may be infinite only if the literal spells out infinity;
/// finite literals that overflow the target type are rejected.
fn finite_or_named(is_infinite: bool, text: &str) -> bool {
    if !is_infinite {
        return true;
    }
    let name = text.trim().trim_start_matches(['+', '-']);
    name.eq_ignore_ascii_case("inf") || name.eq_ignore_ascii_case("infinity")
}

int_element!(u8, U8);
int_element!(u32, U32);
int_element!(i32, I32);
int_element!(i64, I64);
half_element!(f16, F16);
half_element!(bf16, BF16);
float_element!(f32, F32);
float_element!(f64, F64);

/// Run `$body` with `$T` bound to the Rust type of a numeric `$dtype`.
/// `Str` dtypes take the `str =>` branch instead.
macro_rules! dispatch_numeric {
    ($dtype:expr, $T:ident => $body:block, str => $str_body:expr) => {
        match $dtype {
            $crate::dtype::DType::U8 => {
                type $T = u8;
                $body
            }
            $crate::dtype::DType::U32 => {
                type $T = u32;
                $body
            }
            $crate::dtype::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::dtype::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::dtype::DType::F16 => {
                type $T = half::f16;
                $body
            }
            $crate::dtype::DType::BF16 => {
                type $T = half::bf16;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::Str(_) => $str_body,
        }
    };
}

pub(crate) use dispatch_numeric;
