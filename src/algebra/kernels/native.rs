use super::{householder, TileKernels};
use crate::algebra::{FloatT, KernelError, TileMut, TileRef};

/// Pure Rust implementation of the tile kernels.
///
/// Works for any strided view, including transposed storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeKernels;

impl NativeKernels {
    pub fn new() -> Self {
        Self
    }
}

fn check(ok: bool) -> Result<(), KernelError> {
    if ok {
        Ok(())
    } else {
        Err(KernelError::IncompatibleDimension)
    }
}

impl<T> TileKernels<T> for NativeKernels
where
    T: FloatT,
{
    fn potrf(&self, a: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        let n = a.nrows();
        check(a.ncols() == n)?;

        for j in 0..n {
            let mut d = a[(j, j)];
            for k in 0..j {
                d -= a[(j, k)] * a[(j, k)];
            }
            if !(d > T::zero()) || !d.is_finite() {
                return Err(KernelError::NotPositiveDefinite { pivot: j });
            }
            let ljj = d.sqrt();
            a[(j, j)] = ljj;

            for i in (j + 1)..n {
                let mut s = a[(i, j)];
                for k in 0..j {
                    s -= a[(i, k)] * a[(j, k)];
                }
                a[(i, j)] = s / ljj;
            }
        }
        Ok(())
    }

    fn trsm(&self, l: &TileRef<'_, T>, b: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        let n = l.nrows();
        check(l.ncols() == n && b.ncols() == n)?;
        let m = b.nrows();

        // X*L' = B, solved one column of X at a time
        for j in 0..n {
            for k in 0..j {
                let ljk = l[(j, k)];
                if ljk != T::zero() {
                    for i in 0..m {
                        let bik = b[(i, k)];
                        b[(i, j)] -= ljk * bik;
                    }
                }
            }
            let ljj = l[(j, j)];
            if ljj == T::zero() {
                return Err(KernelError::Singular { pivot: j });
            }
            for i in 0..m {
                b[(i, j)] /= ljj;
            }
        }
        Ok(())
    }

    fn syrk(&self, a: &TileRef<'_, T>, c: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        let n = c.nrows();
        check(c.ncols() == n && a.nrows() == n)?;

        for j in 0..n {
            for i in j..n {
                let mut s = T::zero();
                for k in 0..a.ncols() {
                    s += a[(i, k)] * a[(j, k)];
                }
                c[(i, j)] -= s;
            }
        }
        Ok(())
    }

    fn gemm(
        &self,
        a: &TileRef<'_, T>,
        b: &TileRef<'_, T>,
        c: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError> {
        check(a.nrows() == c.nrows() && b.nrows() == c.ncols() && a.ncols() == b.ncols())?;

        for j in 0..c.ncols() {
            for k in 0..a.ncols() {
                let bjk = b[(j, k)];
                if bjk != T::zero() {
                    for i in 0..c.nrows() {
                        c[(i, j)] -= a[(i, k)] * bjk;
                    }
                }
            }
        }
        Ok(())
    }

    fn geqrt(&self, a: &mut TileMut<'_, T>, tau: &mut TileMut<'_, T>) -> Result<(), KernelError> {
        let (m, n) = a.size();
        let kk = m.min(n);
        check(tau.nrows() == 1 && tau.ncols() >= kk)?;

        for j in 0..kk {
            let mut xnorm = T::zero();
            for i in (j + 1)..m {
                xnorm = T::hypot(xnorm, a[(i, j)]);
            }
            let (beta, t, scale) = householder(a[(j, j)], xnorm);
            for i in (j + 1)..m {
                a[(i, j)] *= scale;
            }
            a[(j, j)] = beta;
            tau[(0, j)] = t;

            if t == T::zero() {
                continue;
            }
            for c in (j + 1)..n {
                let mut w = a[(j, c)];
                for i in (j + 1)..m {
                    w += a[(i, j)] * a[(i, c)];
                }
                w *= t;
                a[(j, c)] -= w;
                for i in (j + 1)..m {
                    let vij = a[(i, j)];
                    a[(i, c)] -= w * vij;
                }
            }
        }
        for j in kk..tau.ncols() {
            tau[(0, j)] = T::zero();
        }
        Ok(())
    }

    fn unmqr(
        &self,
        v: &TileRef<'_, T>,
        tau: &TileRef<'_, T>,
        c: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError> {
        let (m, n) = v.size();
        let kk = m.min(n);
        check(c.nrows() == m && tau.nrows() == 1 && tau.ncols() >= kk)?;

        for j in 0..kk {
            let t = tau[(0, j)];
            if t == T::zero() {
                continue;
            }
            for col in 0..c.ncols() {
                let mut w = c[(j, col)];
                for i in (j + 1)..m {
                    w += v[(i, j)] * c[(i, col)];
                }
                w *= t;
                c[(j, col)] -= w;
                for i in (j + 1)..m {
                    c[(i, col)] -= w * v[(i, j)];
                }
            }
        }
        Ok(())
    }

    fn tsqrt(
        &self,
        r: &mut TileMut<'_, T>,
        a: &mut TileMut<'_, T>,
        tau: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError> {
        let n = r.ncols();
        let kk = r.nrows().min(n);
        check(a.ncols() == n && tau.nrows() == 1 && tau.ncols() >= kk)?;
        let m = a.nrows();

        for j in 0..kk {
            let mut xnorm = T::zero();
            for i in 0..m {
                xnorm = T::hypot(xnorm, a[(i, j)]);
            }
            let (beta, t, scale) = householder(r[(j, j)], xnorm);
            for i in 0..m {
                a[(i, j)] *= scale;
            }
            r[(j, j)] = beta;
            tau[(0, j)] = t;

            if t == T::zero() {
                continue;
            }
            for c in (j + 1)..n {
                let mut w = r[(j, c)];
                for i in 0..m {
                    w += a[(i, j)] * a[(i, c)];
                }
                w *= t;
                r[(j, c)] -= w;
                for i in 0..m {
                    let vij = a[(i, j)];
                    a[(i, c)] -= w * vij;
                }
            }
        }
        for j in kk..tau.ncols() {
            tau[(0, j)] = T::zero();
        }
        Ok(())
    }

    fn tsmqr(
        &self,
        c1: &mut TileMut<'_, T>,
        c2: &mut TileMut<'_, T>,
        v: &TileRef<'_, T>,
        tau: &TileRef<'_, T>,
    ) -> Result<(), KernelError> {
        let kk = c1.nrows().min(v.ncols());
        check(
            c2.nrows() == v.nrows()
                && c1.ncols() == c2.ncols()
                && tau.nrows() == 1
                && tau.ncols() >= kk,
        )?;
        let m = v.nrows();

        for j in 0..kk {
            let t = tau[(0, j)];
            if t == T::zero() {
                continue;
            }
            for col in 0..c1.ncols() {
                let mut w = c1[(j, col)];
                for i in 0..m {
                    w += v[(i, j)] * c2[(i, col)];
                }
                w *= t;
                c1[(j, col)] -= w;
                for i in 0..m {
                    c2[(i, col)] -= w * v[(i, j)];
                }
            }
        }
        Ok(())
    }

    fn axpy(
        &self,
        alpha: T,
        x: &TileRef<'_, T>,
        y: &mut TileMut<'_, T>,
    ) -> Result<(), KernelError> {
        check(x.size() == y.size())?;
        for j in 0..y.ncols() {
            for i in 0..y.nrows() {
                y[(i, j)] += alpha * x[(i, j)];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::FlatMatrix;

    fn spd(n: usize) -> FlatMatrix<f64> {
        let vals = (0..n * n).map(|k| ((k * 7 + 3) % 11) as f64 / 11.0 - 0.5);
        FlatMatrix::spd_from(n, vals).unwrap()
    }

    #[test]
    fn test_potrf() {
        let a = spd(6);
        let mut l = a.try_clone().unwrap();
        NativeKernels.potrf(&mut l.view_mut().unwrap()).unwrap();

        // L*L' reproduces the lower triangle of A
        for i in 0..6 {
            for j in 0..=i {
                let s: f64 = (0..=j).map(|k| l[(i, k)] * l[(j, k)]).sum();
                assert!((s - a[(i, j)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_potrf_not_pd() {
        let mut a = FlatMatrix::from_rows(&[[1., 2.], [2., 1.]]).unwrap();
        let res = NativeKernels.potrf(&mut a.view_mut().unwrap());
        assert_eq!(res, Err(KernelError::NotPositiveDefinite { pivot: 1 }));
    }

    #[test]
    fn test_trsm_syrk_gemm() {
        let l = FlatMatrix::from_rows(&[[2., 0.], [1., 3.]]).unwrap();
        let x = FlatMatrix::from_rows(&[[1., 2.], [3., 4.], [5., 6.]]).unwrap();

        // B = X*L', then B*inv(L') recovers X
        let mut b = FlatMatrix::<f64>::create(3, 2).unwrap();
        for i in 0..3 {
            for j in 0..2 {
                b[(i, j)] = (0..2).map(|k| x[(i, k)] * l[(j, k)]).sum();
            }
        }
        NativeKernels
            .trsm(&l.view().unwrap(), &mut b.view_mut().unwrap())
            .unwrap();
        assert!(b.norm_one_lower_diff(&x).unwrap() < 1e-14);
        assert!(b.norm_one_upper_diff(&x).unwrap() < 1e-14);

        let mut c = FlatMatrix::<f64>::create(3, 3).unwrap();
        NativeKernels
            .syrk(&x.view().unwrap(), &mut c.view_mut().unwrap())
            .unwrap();
        assert_eq!(c[(2, 1)], -(5. * 3. + 6. * 4.));
        assert_eq!(c[(1, 2)], 0.0);

        let mut d = FlatMatrix::<f64>::create(3, 2).unwrap();
        NativeKernels
            .gemm(&x.view().unwrap(), &l.view().unwrap(), &mut d.view_mut().unwrap())
            .unwrap();
        assert_eq!(d[(2, 1)], -(5. * 1. + 6. * 3.));

        assert_eq!(
            NativeKernels.gemm(&x.view().unwrap(), &x.view().unwrap(), &mut d.view_mut().unwrap()),
            Err(KernelError::IncompatibleDimension)
        );
    }

    #[test]
    fn test_geqrt_unmqr() {
        let a = FlatMatrix::from_rows(&[[4., 1., 2.], [2., 3., 0.], [1., 1., 5.], [0., 2., 1.]])
            .unwrap();
        let mut f = a.try_clone().unwrap();
        let mut tau = FlatMatrix::<f64>::create(1, 3).unwrap();
        NativeKernels
            .geqrt(&mut f.view_mut().unwrap(), &mut tau.view_mut().unwrap())
            .unwrap();

        // Q'*A = R
        let mut qa = a.try_clone().unwrap();
        NativeKernels
            .unmqr(&f.view().unwrap(), &tau.view().unwrap(), &mut qa.view_mut().unwrap())
            .unwrap();
        for j in 0..3 {
            for i in 0..4 {
                let r = if i <= j { f[(i, j)] } else { 0.0 };
                assert!((qa[(i, j)] - r).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_tsqrt_tsmqr() {
        // factor [R; A] where R is upper triangular, compare against geqrt
        // of the stacked matrix
        let r0 = FlatMatrix::from_rows(&[[3., 1.], [0., 2.]]).unwrap();
        let a0 = FlatMatrix::from_rows(&[[1., 4.], [2., 1.]]).unwrap();

        let mut r = r0.try_clone().unwrap();
        let mut a = a0.try_clone().unwrap();
        let mut tau = FlatMatrix::<f64>::create(1, 2).unwrap();
        NativeKernels
            .tsqrt(
                &mut r.view_mut().unwrap(),
                &mut a.view_mut().unwrap(),
                &mut tau.view_mut().unwrap(),
            )
            .unwrap();

        // applying Q' to the original stack gives [R; 0]
        let mut c1 = r0.try_clone().unwrap();
        let mut c2 = a0.try_clone().unwrap();
        NativeKernels
            .tsmqr(
                &mut c1.view_mut().unwrap(),
                &mut c2.view_mut().unwrap(),
                &a.view().unwrap(),
                &tau.view().unwrap(),
            )
            .unwrap();
        assert!(c1.norm_one_upper_diff(&r).unwrap() < 1e-12);
        assert!(c2.norm_one().unwrap() < 1e-12);

        // R'R = A'A for the stacked matrix
        for i in 0..2 {
            for j in 0..2 {
                let ata: f64 = (0..2)
                    .map(|k| r0[(k, i)] * r0[(k, j)] + a0[(k, i)] * a0[(k, j)])
                    .sum();
                let rtr: f64 = (0..=i.min(j)).map(|k| r[(k, i)] * r[(k, j)]).sum();
                assert!((ata - rtr).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_axpy_copy() {
        let x = FlatMatrix::from_rows(&[[1., 2.], [3., 4.]]).unwrap();
        let mut y = FlatMatrix::<f64>::identity(2).unwrap();
        NativeKernels
            .axpy(2.0, &x.view().unwrap(), &mut y.view_mut().unwrap())
            .unwrap();
        assert_eq!(y[(0, 0)], 3.0);
        assert_eq!(y[(1, 0)], 6.0);

        NativeKernels
            .copy(&x.view().unwrap(), &mut y.view_mut().unwrap())
            .unwrap();
        assert_eq!(y.norm_one_lower_diff(&x).unwrap(), 0.0);
    }
}
