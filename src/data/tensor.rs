//! Small-tensor algebra on `D`-dimensional vectors and second-order tensors.

use nalgebra::{SMatrix, SVector};

/// Point or displacement in `D` dimensions.
pub type Vector<const D: usize> = SVector<f64, D>;
/// Second-order tensor in `D` dimensions.
pub type Tensor<const D: usize> = SMatrix<f64, D, D>;

/// Condition number above which a shape tensor is treated as singular.
pub const MAX_CONDITION: f64 = 1.0e12;

/// `a ⊗ b`.
#[inline]
pub fn outer<const D: usize>(a: &Vector<D>, b: &Vector<D>) -> Tensor<D> {
    a * b.transpose()
}

/// Inverse of `t`, or `None` when `t` is singular or numerically so.
///
/// Uses the Frobenius condition estimate `‖T‖ ‖T⁻¹‖`; an exactly rank-deficient
/// neighborhood (colinear bonds in 2-D, say) rarely produces an exact zero pivot in
/// floating point.
pub fn checked_inverse<const D: usize>(t: &Tensor<D>) -> Option<Tensor<D>> {
    let norm = t.norm();
    if !norm.is_finite() || norm == 0.0 {
        return None;
    }
    let inv = t.try_inverse()?;
    let cond = norm * inv.norm();
    (cond.is_finite() && cond <= MAX_CONDITION).then_some(inv)
}

/// Green–Lagrange strain `½(FᵀF − I)`.
pub fn green_lagrange<const D: usize>(f: &Tensor<D>) -> Tensor<D> {
    (f.transpose() * f - Tensor::<D>::identity()) * 0.5
}
