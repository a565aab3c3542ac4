//! Tile kernels.
//!
//! The scheduler never computes anything itself.  Every tile task is handed
//! to an implementation of [`TileKernels`], which receives strided views of
//! the task's operand tiles.  Read operands arrive as [`TileRef`] and written
//! operands as [`TileMut`]; the scheduler guarantees that no other task
//! touches a written tile while the kernel runs.
//!
//! QR kernels store Householder vectors below the diagonal of the factored
//! tile (or in the whole of the lower tile for the triangle-on-top-of-square
//! kernels) and the reflector scalars in a `1 x n` row tile.

use super::{FloatT, KernelError, TileMut, TileRef};

mod native;
pub use native::*;

#[cfg(feature = "blas")]
mod blas;
#[cfg(feature = "blas")]
pub use blas::*;

/// Numerical tile kernels invoked by the scheduler.
///
/// Implementations must be shareable across worker threads.  A kernel reports
/// failure through its return value; a panicking kernel is also reported as a
/// failure of the task that invoked it.
pub trait TileKernels<T: FloatT>: Send + Sync {
    /// Lower Cholesky factorization in place: `A = L*L'`.
    /// The strict upper triangle is not referenced.
    fn potrf(&self, a: &mut TileMut<'_, T>) -> Result<(), KernelError>;

    /// Triangular solve from the right: `B <- B * inv(L')`.
    fn trsm(&self, l: &TileRef<'_, T>, b: &mut TileMut<'_, T>) -> Result<(), KernelError>;

    /// Symmetric rank-k downdate of the lower triangle: `C <- C - A*A'`.
    fn syrk(&self, a: &TileRef<'_, T>, c: &mut TileMut<'_, T>) -> Result<(), KernelError>;

    /// General downdate: `C <- C - A*B'`.
    fn gemm(
        &self,
        a: &TileRef<'_, T>,
        b: &TileRef<'_, T>,
        c: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError>;

    /// Householder QR of a tile.  `R` overwrites the upper triangle, the
    /// reflectors overwrite the strict lower triangle and their scalars are
    /// written to `tau`.
    fn geqrt(&self, a: &mut TileMut<'_, T>, tau: &mut TileMut<'_, T>) -> Result<(), KernelError>;

    /// Apply `Q'` from a [`geqrt`](TileKernels::geqrt) factorization: `C <- Q'*C`.
    fn unmqr(
        &self,
        v: &TileRef<'_, T>,
        tau: &TileRef<'_, T>,
        c: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError>;

    /// QR of an upper triangular tile stacked on a square tile, `[R; A]`.
    /// `R` is updated in place and the reflectors overwrite `A`.
    fn tsqrt(
        &self,
        r: &mut TileMut<'_, T>,
        a: &mut TileMut<'_, T>,
        tau: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError>;

    /// Apply `Q'` from a [`tsqrt`](TileKernels::tsqrt) factorization to the
    /// stacked pair `[C1; C2]`.
    fn tsmqr(
        &self,
        c1: &mut TileMut<'_, T>,
        c2: &mut TileMut<'_, T>,
        v: &TileRef<'_, T>,
        tau: &TileRef<'_, T>,
    ) -> Result<(), KernelError>;

    /// `Y <- alpha*X + Y`
    fn axpy(&self, alpha: T, x: &TileRef<'_, T>, y: &mut TileMut<'_, T>)
        -> Result<(), KernelError>;

    /// `Y <- X`
    fn copy(&self, x: &TileRef<'_, T>, y: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        if x.size() != y.size() {
            return Err(KernelError::IncompatibleDimension);
        }
        y.copy_from(x);
        Ok(())
    }
}

// Householder reflector annihilating x in [alpha; x], following the LAPACK
// convention H = I - tau*v*v' with v = [1; x*scale].
// returns (beta, tau, scale)
#[inline]
pub(crate) fn householder<T: FloatT>(alpha: T, xnorm: T) -> (T, T, T) {
    if xnorm == T::zero() {
        return (alpha, T::zero(), T::zero());
    }
    let h = T::hypot(alpha, xnorm);
    let beta = if alpha >= T::zero() { -h } else { h };
    let tau = (beta - alpha) / beta;
    let scale = T::recip(alpha - beta);
    (beta, tau, scale)
}
