#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(clippy::too_many_arguments)]

use super::{NativeKernels, TileKernels};
use crate::algebra::{FloatT, KernelError, TileMut, TileRef};

// standard imports via blas-lapack-rs crates
extern crate blas_src;
extern crate lapack_src;
use blas::*;
use lapack::*;

pub trait BlasFloatT:
    private::BlasFloatSealed
    + XpotrfScalar
    + XtrsmScalar
    + XsyrkScalar
    + XgemmScalar
{}

impl BlasFloatT for f32 {}
impl BlasFloatT for f64 {}

mod private {
    pub trait BlasFloatSealed {}
    impl BlasFloatSealed for f32 {}
    impl BlasFloatSealed for f64 {}
}

// --------------------------------------
// ?potrf : Cholesky decomposition
// --------------------------------------

pub trait XpotrfScalar: Sized {
    fn xpotrf(uplo: u8, n: i32, a: &mut [Self], lda: i32, info: &mut i32);
}

macro_rules! impl_blas_xpotrf {
    ($T:ty, $XPOTRF:path) => {
        impl XpotrfScalar for $T {
            fn xpotrf(uplo: u8, n: i32, a: &mut [Self], lda: i32, info: &mut i32) {
                unsafe {
                    $XPOTRF(uplo, n, a, lda, info);
                }
            }
        }
    };
}
impl_blas_xpotrf!(f32, spotrf);
impl_blas_xpotrf!(f64, dpotrf);

// --------------------------------------
// ?trsm : triangular solve
// --------------------------------------

pub trait XtrsmScalar: Sized {
    fn xtrsm(
        side: u8, uplo: u8, transa: u8, diag: u8, m: i32, n: i32, alpha: Self,
        a: &[Self], lda: i32, b: &mut [Self], ldb: i32,
    );
}

macro_rules! impl_blas_xtrsm {
    ($T:ty, $XTRSM:path) => {
        impl XtrsmScalar for $T {
            fn xtrsm(
                side: u8, uplo: u8, transa: u8, diag: u8, m: i32, n: i32, alpha: Self,
                a: &[Self], lda: i32, b: &mut [Self], ldb: i32,
            ) {
                unsafe {
                    $XTRSM(side, uplo, transa, diag, m, n, alpha, a, lda, b, ldb);
                }
            }
        }
    };
}
impl_blas_xtrsm!(f32, strsm);
impl_blas_xtrsm!(f64, dtrsm);

// --------------------------------------
// ?syrk : symmetric rank k update
// --------------------------------------

pub trait XsyrkScalar: Sized {
    fn xsyrk(
        uplo: u8, trans: u8, n: i32, k: i32, alpha: Self, a: &[Self], lda: i32,
        beta: Self, c: &mut [Self], ldc: i32,
    );
}

macro_rules! impl_blas_xsyrk {
    ($T:ty, $XSYRK:path) => {
        impl XsyrkScalar for $T {
            fn xsyrk(
                uplo: u8, trans: u8, n: i32, k: i32, alpha: Self, a: &[Self], lda: i32,
                beta: Self, c: &mut [Self], ldc: i32,
            ) {
                unsafe {
                    $XSYRK(uplo, trans, n, k, alpha, a, lda, beta, c, ldc);
                }
            }
        }
    };
}
impl_blas_xsyrk!(f32, ssyrk);
impl_blas_xsyrk!(f64, dsyrk);

// --------------------------------------
// ?gemm : general matrix multiply
// --------------------------------------

pub trait XgemmScalar: Sized {
    fn xgemm(
        transa: u8, transb: u8, m: i32, n: i32, k: i32, alpha: Self, a: &[Self], lda: i32,
        b: &[Self], ldb: i32, beta: Self, c: &mut [Self], ldc: i32,
    );
}

macro_rules! impl_blas_xgemm {
    ($T:ty, $XGEMM:path) => {
        impl XgemmScalar for $T {
            fn xgemm(
                transa: u8, transb: u8, m: i32, n: i32, k: i32, alpha: Self, a: &[Self], lda: i32,
                b: &[Self], ldb: i32, beta: Self, c: &mut [Self], ldc: i32,
            ) {
                unsafe {
                    $XGEMM(transa, transb, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc);
                }
            }
        }
    };
}
impl_blas_xgemm!(f32, sgemm);
impl_blas_xgemm!(f64, dgemm);

// --------------------------------------
// tile kernels
// --------------------------------------

/// Tile kernels backed by BLAS/LAPACK.
///
/// The Cholesky kernels are forwarded to `?potrf`, `?trsm`, `?syrk` and
/// `?gemm` when every operand is column major.  Transposed operands and
/// the QR and AXPY kernels use [`NativeKernels`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BlasKernels;

impl BlasKernels {
    pub fn new() -> Self {
        Self
    }
}

fn dim(v: usize) -> i32 {
    v as i32
}

// leading dimension of a column major view
fn ld(stride: usize, nrows: usize) -> i32 {
    stride.max(nrows).max(1) as i32
}

impl<T> TileKernels<T> for BlasKernels
where
    T: FloatT,
{
    fn potrf(&self, a: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        if !a.is_col_major() {
            return NativeKernels.potrf(a);
        }
        if a.nrows() != a.ncols() {
            return Err(KernelError::IncompatibleDimension);
        }
        let (n, lda) = (dim(a.nrows()), ld(a.col_stride(), a.nrows()));
        let mut info = 0_i32;
        T::xpotrf(b'L', n, a.as_storage_slice_mut(), lda, &mut info);
        match info {
            0 => Ok(()),
            i if i > 0 => Err(KernelError::NotPositiveDefinite { pivot: (i - 1) as usize }),
            i => Err(KernelError::Backend(i)),
        }
    }

    fn trsm(&self, l: &TileRef<'_, T>, b: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        if !(l.is_col_major() && b.is_col_major()) {
            return NativeKernels.trsm(l, b);
        }
        if l.nrows() != l.ncols() || b.ncols() != l.nrows() {
            return Err(KernelError::IncompatibleDimension);
        }
        let (m, n) = (dim(b.nrows()), dim(b.ncols()));
        let (lda, ldb) = (ld(l.col_stride(), l.nrows()), ld(b.col_stride(), b.nrows()));
        T::xtrsm(
            b'R', b'L', b'T', b'N', m, n, T::one(),
            l.as_storage_slice(), lda, b.as_storage_slice_mut(), ldb,
        );
        Ok(())
    }

    fn syrk(&self, a: &TileRef<'_, T>, c: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        if !(a.is_col_major() && c.is_col_major()) {
            return NativeKernels.syrk(a, c);
        }
        if c.nrows() != c.ncols() || a.nrows() != c.nrows() {
            return Err(KernelError::IncompatibleDimension);
        }
        let (n, k) = (dim(c.nrows()), dim(a.ncols()));
        let (lda, ldc) = (ld(a.col_stride(), a.nrows()), ld(c.col_stride(), c.nrows()));
        T::xsyrk(
            b'L', b'N', n, k, -T::one(),
            a.as_storage_slice(), lda, T::one(), c.as_storage_slice_mut(), ldc,
        );
        Ok(())
    }

    fn gemm(
        &self,
        a: &TileRef<'_, T>,
        b: &TileRef<'_, T>,
        c: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError> {
        if !(a.is_col_major() && b.is_col_major() && c.is_col_major()) {
            return NativeKernels.gemm(a, b, c);
        }
        if a.nrows() != c.nrows() || b.nrows() != c.ncols() || a.ncols() != b.ncols() {
            return Err(KernelError::IncompatibleDimension);
        }
        let (m, n, k) = (dim(c.nrows()), dim(c.ncols()), dim(a.ncols()));
        let lda = ld(a.col_stride(), a.nrows());
        let ldb = ld(b.col_stride(), b.nrows());
        let ldc = ld(c.col_stride(), c.nrows());
        T::xgemm(
            b'N', b'T', m, n, k, -T::one(),
            a.as_storage_slice(), lda, b.as_storage_slice(), ldb,
            T::one(), c.as_storage_slice_mut(), ldc,
        );
        Ok(())
    }

    fn geqrt(&self, a: &mut TileMut<'_, T>, tau: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        NativeKernels.geqrt(a, tau)
    }

    fn unmqr(
        &self,
        v: &TileRef<'_, T>,
        tau: &TileRef<'_, T>,
        c: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError> {
        NativeKernels.unmqr(v, tau, c)
    }

    fn tsqrt(
        &self,
        r: &mut TileMut<'_, T>,
        a: &mut TileMut<'_, T>,
        tau: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError> {
        NativeKernels.tsqrt(r, a, tau)
    }

    fn tsmqr(
        &self,
        c1: &mut TileMut<'_, T>,
        c2: &mut TileMut<'_, T>,
        v: &TileRef<'_, T>,
        tau: &TileRef<'_, T>,
    ) -> Result<(), KernelError> {
        NativeKernels.tsmqr(c1, c2, v, tau)
    }

    fn axpy(&self, alpha: T, x: &TileRef<'_, T>, y: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        NativeKernels.axpy(alpha, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::FlatMatrix;

    #[test]
    fn test_blas_matches_native() {
        let vals = (0..64).map(|k| ((k * 5 + 1) % 13) as f64 / 13.0);
        let a = FlatMatrix::<f64>::spd_from(8, vals).unwrap();

        let mut l1 = a.try_clone().unwrap();
        let mut l2 = a.try_clone().unwrap();
        NativeKernels.potrf(&mut l1.view_mut().unwrap()).unwrap();
        BlasKernels.potrf(&mut l2.view_mut().unwrap()).unwrap();
        assert!(l1.norm_one_lower_diff(&l2).unwrap() < 1e-12);

        let mut c1 = a.try_clone().unwrap();
        let mut c2 = a.try_clone().unwrap();
        NativeKernels.syrk(&l1.view().unwrap(), &mut c1.view_mut().unwrap()).unwrap();
        BlasKernels.syrk(&l1.view().unwrap(), &mut c2.view_mut().unwrap()).unwrap();
        assert!(c1.norm_one_lower_diff(&c2).unwrap() < 1e-12);
    }
}
