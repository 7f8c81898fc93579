use std::fmt;

use rayon::prelude::*;

use crate::dtype::{dispatch_numeric, DType, Element};
use crate::error::{Error, Result};
use crate::scalar::Scalar;

// Storage: the owned byte buffer behind every array
//
// An array's elements live in one contiguous Vec<u8> of exactly
// `elem_count * dtype.size_in_bytes()` bytes, in native byte order, row-major.
// The buffer carries no alignment guarantee, so typed access goes through
// bytemuck's copying helpers instead of reinterpreting the slice in place:
//
//   encode   &[T]   -> Vec<u8>   (always safe: u8 has alignment 1)
//   decode   &[u8]  -> Vec<T>    (pod_collect_to_vec copies into aligned memory)
//
// String elements are fixed-width: each occupies `n` bytes of UTF-8 followed by
// NUL padding, and trailing NULs are stripped when read back.
//
// Casting is atomic. The whole converted buffer is built first and only
// returned if every element converted; the first failure aborts the cast.

pub(crate) fn encode<T: Element>(values: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

pub(crate) fn decode<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytemuck::pod_collect_to_vec(bytes)
}

/// An empty vector with room for `len` values, `None` if the allocator
/// refuses.
pub(crate) fn try_with_capacity<T>(len: usize) -> Option<Vec<T>> {
    let mut values = Vec::new();
    values.try_reserve_exact(len).ok()?;
    Some(values)
}

/// Read element `index` of a numeric buffer. `index` must be in range.
pub(crate) fn read_element<T: Element>(bytes: &[u8], index: usize) -> T {
    let size = std::mem::size_of::<T>();
    bytemuck::pod_read_unaligned(&bytes[index * size..(index + 1) * size])
}

/// Pack strings into `width`-byte NUL-padded slots.
pub(crate) fn encode_str<S: AsRef<str>>(
    texts: &[S],
    width: usize,
    from: impl fmt::Display,
) -> Result<Vec<u8>> {
    let len = texts.len().checked_mul(width).unwrap_or(usize::MAX);
    let mut out = try_with_capacity(len).ok_or_else(|| Error::InvalidArgument {
        arg: "dtype",
        reason: format!("{} elements of S{} cannot be allocated", texts.len(), width),
    })?;
    out.resize(len, 0);
    for (i, text) in texts.iter().enumerate() {
        let bytes = text.as_ref().as_bytes();
        if bytes.len() > width {
            log::debug!(
                "string '{}' ({} bytes) does not fit in S{}",
                text.as_ref(),
                bytes.len(),
                width
            );
            return Err(Error::cast(
                format!("'{}'", text.as_ref()),
                from,
                DType::Str(width),
            ));
        }
        let start = i * width;
        out[start..start + bytes.len()].copy_from_slice(bytes);
    }
    Ok(out)
}

/// Unpack `count` fixed-width string slots.
pub(crate) fn decode_str(bytes: &[u8], width: usize, count: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new(); count];
    }
    bytes
        .chunks_exact(width)
        .map(|slot| {
            let end = slot.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
            String::from_utf8_lossy(&slot[..end]).into_owned()
        })
        .collect()
}

/// Convert a buffer of `count` elements from one dtype to another.
pub(crate) fn cast_buffer(
    bytes: &[u8],
    from: DType,
    to: DType,
    count: usize,
    parallel: bool,
) -> Result<Vec<u8>> {
    log::trace!("cast {} elements {} -> {} (parallel={})", count, from, to, parallel);
    if from == to {
        return Ok(bytes.to_vec());
    }
    if let DType::Str(width) = from {
        let texts = decode_str(bytes, width, count);
        return dispatch_numeric!(to, T => {
            parse_texts::<T>(&texts, from, parallel)
        }, str => encode_str(&texts, to.size_in_bytes(), from));
    }
    dispatch_numeric!(from, S => {
        let values: Vec<S> = decode(bytes);
        dispatch_numeric!(to, T => {
            convert_values::<S, T>(&values, parallel)
        }, str => {
            let texts: Vec<String> = values.iter().map(|v| v.to_text()).collect();
            encode_str(&texts, to.size_in_bytes(), from)
        })
    }, str => Err(Error::UnsupportedDType { dtype: from, op: "astype" }))
}

/// Convert one value, `None` if `T` cannot represent it.
///
/// Integer targets rely on `num_traits::cast` (truncation toward zero, `None`
/// for NaN, infinities and out-of-range values). Float targets additionally
/// reject a finite value that only fits as infinity; NaN and infinite
/// sources carry over unchanged.
fn cast_element<S: Element, T: Element>(v: S) -> Option<T> {
    let out = num_traits::cast::<S, T>(v)?;
    if out.as_f64().is_infinite() && v.as_f64().is_finite() {
        return None;
    }
    Some(out)
}

/// Numeric-to-numeric conversion. Floats truncate toward zero when going to
/// an integer type; values outside the target's range are errors.
fn convert_values<S: Element, T: Element>(values: &[S], parallel: bool) -> Result<Vec<u8>> {
    let convert = |v: S| -> Result<T> {
        cast_element::<S, T>(v).ok_or_else(|| Error::cast(v.to_text(), S::DTYPE, T::DTYPE))
    };
    let out: Vec<T> = if parallel {
        values.par_iter().map(|&v| convert(v)).collect::<Result<_>>()?
    } else {
        values.iter().map(|&v| convert(v)).collect::<Result<_>>()?
    };
    Ok(encode(&out))
}

fn parse_texts<T: Element>(texts: &[String], from: DType, parallel: bool) -> Result<Vec<u8>> {
    let parse = |s: &String| -> Result<T> {
        T::parse_text(s).ok_or_else(|| Error::cast(format!("'{}'", s), from, T::DTYPE))
    };
    let out: Vec<T> = if parallel {
        texts.par_iter().map(parse).collect::<Result<_>>()?
    } else {
        texts.iter().map(parse).collect::<Result<_>>()?
    };
    Ok(encode(&out))
}

/// Encode literal leaves directly into a buffer of `dtype`.
pub(crate) fn encode_leaves(leaves: &[&Scalar], dtype: DType) -> Result<Vec<u8>> {
    dispatch_numeric!(dtype, T => {
        let values = leaves
            .iter()
            .map(|leaf| leaf_to::<T>(leaf))
            .collect::<Result<Vec<T>>>()?;
        Ok(encode(&values))
    }, str => {
        let texts = leaves
            .iter()
            .map(|leaf| leaf_text(leaf, dtype))
            .collect::<Result<Vec<String>>>()?;
        encode_str(&texts, dtype.size_in_bytes(), "literal")
    })
}

fn leaf_to<T: Element>(leaf: &Scalar) -> Result<T> {
    let converted = match leaf {
        Scalar::Int(v) => cast_element::<i64, T>(*v),
        Scalar::Float(v) => cast_element::<f64, T>(*v),
        Scalar::Str(s) => T::parse_text(s),
        Scalar::Bool(b) => Some(if *b { T::one() } else { T::zero() }),
        Scalar::Null => None,
    };
    converted.ok_or_else(|| Error::cast(leaf, leaf.kind_name(), T::DTYPE))
}

fn leaf_text(leaf: &Scalar, to: DType) -> Result<String> {
    match leaf {
        Scalar::Int(v) => Ok(v.to_string()),
        Scalar::Float(v) => Ok(v.to_text()),
        Scalar::Str(s) => Ok(s.clone()),
        Scalar::Bool(b) => Ok(b.to_string()),
        Scalar::Null => Err(Error::cast(leaf, leaf.kind_name(), to)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let bytes = encode(&[1.5f64, -2.0]);
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode::<f64>(&bytes), vec![1.5, -2.0]);
        assert_eq!(read_element::<f64>(&bytes, 1), -2.0);
    }

    #[test]
    fn test_unaligned_decode() {
        let bytes = encode(&[7i64, 8, 9]);
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&bytes);
        assert_eq!(decode::<i64>(&shifted[1..]), vec![7, 8, 9]);
    }

    #[test]
    fn test_str_slots() {
        let bytes = encode_str(&["ab", "", "xyz"], 3, "literal").unwrap();
        assert_eq!(bytes, b"ab\0\0\0\0xyz".to_vec());
        assert_eq!(decode_str(&bytes, 3, 3), vec!["ab", "", "xyz"]);
        assert!(encode_str(&["abcd"], 3, "literal").is_err());
        // Widths the allocator cannot satisfy are errors, not aborts.
        assert!(encode_str(&["a", "b"], usize::MAX, "literal").is_err());
        assert!(encode_str(&["a"], 1 << 60, "literal").is_err());
    }

    #[test]
    fn test_cast_float_to_int_truncates() {
        let bytes = encode(&[1.9f64, -1.9, 0.5]);
        let out = cast_buffer(&bytes, DType::F64, DType::I64, 3, false).unwrap();
        assert_eq!(decode::<i64>(&out), vec![1, -1, 0]);
    }

    #[test]
    fn test_cast_rejects_nan_and_overflow() {
        let bytes = encode(&[1.0f64, f64::NAN]);
        assert!(cast_buffer(&bytes, DType::F64, DType::I64, 2, false).is_err());
        let bytes = encode(&[300i64]);
        assert!(cast_buffer(&bytes, DType::I64, DType::U8, 1, false).is_err());
    }

    #[test]
    fn test_float_narrowing_overflow_rejected() {
        let bytes = encode(&[1.0f64, 1e300]);
        let err = cast_buffer(&bytes, DType::F64, DType::F32, 2, false).unwrap_err();
        assert!(matches!(err, Error::Cast { to: DType::F32, .. }));

        let bytes = encode(&[100_000i64]);
        assert!(cast_buffer(&bytes, DType::I64, DType::F16, 1, false).is_err());
        assert!(cast_buffer(&bytes, DType::I64, DType::BF16, 1, false).is_ok());

        // Infinities and NaN are representable in every float type.
        let bytes = encode(&[f64::INFINITY, f64::NEG_INFINITY, f64::NAN]);
        let out = cast_buffer(&bytes, DType::F64, DType::F32, 3, false).unwrap();
        let out = decode::<f32>(&out);
        assert_eq!(out[0], f32::INFINITY);
        assert_eq!(out[1], f32::NEG_INFINITY);
        assert!(out[2].is_nan());
    }

    #[test]
    fn test_leaf_overflow_rejected() {
        let leaves = [Scalar::Float(1e40)];
        let refs: Vec<&Scalar> = leaves.iter().collect();
        assert!(encode_leaves(&refs, DType::F32).is_err());
        assert!(encode_leaves(&refs, DType::F64).is_ok());
    }

    #[test]
    fn test_cast_text() {
        let bytes = encode_str(&["1.25", " -3 "], 4, "literal").unwrap();
        let out = cast_buffer(&bytes, DType::Str(4), DType::F64, 2, false).unwrap();
        assert_eq!(decode::<f64>(&out), vec![1.25, -3.0]);
        // "1.25" is not an integer literal
        assert!(cast_buffer(&bytes, DType::Str(4), DType::I64, 2, false).is_err());

        let bytes = encode(&[3.0f64, 0.5]);
        let out = cast_buffer(&bytes, DType::F64, DType::Str(4), 2, false).unwrap();
        assert_eq!(decode_str(&out, 4, 2), vec!["3.0", "0.5"]);
    }

    #[test]
    fn test_encode_leaves() {
        let leaves = [Scalar::Int(6), Scalar::Float(7.5), Scalar::Str("8".into())];
        let refs: Vec<&Scalar> = leaves.iter().collect();
        let out = encode_leaves(&refs, DType::F64).unwrap();
        assert_eq!(decode::<f64>(&out), vec![6.0, 7.5, 8.0]);
        let out = encode_leaves(&refs, DType::I64).unwrap();
        assert_eq!(decode::<i64>(&out), vec![6, 7, 8]);
        let bad = [Scalar::Str("eight".into())];
        let refs: Vec<&Scalar> = bad.iter().collect();
        assert!(encode_leaves(&refs, DType::I64).is_err());
    }
}
