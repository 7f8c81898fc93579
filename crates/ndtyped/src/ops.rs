use rayon::prelude::*;

use crate::dtype::Element;

// Element-wise kernels
//
// Every kernel reads its inputs, allocates a fresh output and never touches
// the operands in place. Each output element depends only on the matching
// input elements, so the rayon path produces exactly the same bits as the
// sequential one; `parallel` is purely a throughput switch.

/// Element-wise binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Operation name used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
        }
    }
}

/// Which operand position a scalar occupies in an array-scalar operation.
///
/// `arr / 2` puts the scalar on the right, `1 / arr` on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarSide {
    Lhs,
    Rhs,
}

/// result[i] = op(lhs[i], rhs[i]). Both slices must have the same length.
pub(crate) fn binary_kernel<T: Element>(
    op: BinaryOp,
    lhs: &[T],
    rhs: &[T],
    parallel: bool,
) -> Vec<T> {
    debug_assert_eq!(lhs.len(), rhs.len());
    log::trace!(
        "binary kernel {} over {} elements of {} (parallel={})",
        op.name(),
        lhs.len(),
        T::DTYPE,
        parallel
    );
    if parallel {
        lhs.par_iter()
            .zip(rhs.par_iter())
            .map(|(&a, &b)| T::binary(op, a, b))
            .collect()
    } else {
        lhs.iter()
            .zip(rhs.iter())
            .map(|(&a, &b)| T::binary(op, a, b))
            .collect()
    }
}

/// Apply `op` between every element and one scalar, without expanding the
/// scalar to the array's shape.
pub(crate) fn scalar_kernel<T: Element>(
    op: BinaryOp,
    values: &[T],
    scalar: T,
    side: ScalarSide,
    parallel: bool,
) -> Vec<T> {
    log::trace!(
        "scalar kernel {} ({:?}) over {} elements of {} (parallel={})",
        op.name(),
        side,
        values.len(),
        T::DTYPE,
        parallel
    );
    let apply = move |v: T| match side {
        ScalarSide::Rhs => T::binary(op, v, scalar),
        ScalarSide::Lhs => T::binary(op, scalar, v),
    };
    if parallel {
        values.par_iter().map(|&v| apply(v)).collect()
    } else {
        values.iter().map(|&v| apply(v)).collect()
    }
}
