use crate::algebra::{Element, FlatMatrix, FloatT, MatrixError};
use crate::scheduler::*;

/// Storage for the reflector scalars of a tiled QR factorization of an
/// `m x n` matrix with `bm x bm` tiles.
///
/// The result has one row per tile row of `A` and should be tiled with
/// `1 x bm` blocks, so that its tile `(i, k)` holds the scalars of the
/// reflectors stored in tile `(i, k)` of `A`.
pub fn tau_matrix<T: Element>(m: usize, n: usize, bm: usize) -> Result<FlatMatrix<T>, MatrixError> {
    if bm == 0 {
        return Err(MatrixError::InvalidDimension { rows: bm, cols: bm });
    }
    FlatMatrix::create((m + bm - 1) / bm, n)
}

fn check_tau(
    sched: &TileScheduler<'_, impl FloatT>,
    a: MatrixHandle,
    tau: MatrixHandle,
) -> Result<(usize, usize), SchedulerError> {
    let la = sched.layout(a)?;
    let lt = sched.layout(tau)?;
    if la.block.0 != la.block.1
        || lt.grid != la.grid
        || lt.block != (1, la.block.1)
        || lt.size != (la.grid.0, la.size.1)
    {
        return Err(MatrixError::IncompatibleDimension.into());
    }
    Ok(la.grid)
}

/// Tiled Householder QR factorization `A = Q*R`.
///
/// `a` must be tiled with square blocks, and `tau` must come from
/// [`tau_matrix`].  On completion the upper triangle of `a` holds `R` and
/// the Householder vectors overwrite the remainder of `a`.
pub fn qr<T: FloatT>(
    sched: &mut TileScheduler<'_, T>,
    a: MatrixHandle,
    tau: MatrixHandle,
) -> Result<usize, SchedulerError> {
    let (mt, nt) = check_tau(sched, a, tau)?;
    let at = |i, j| TileCoord::new(a, i, j);
    let tt = |i, j| TileCoord::new(tau, i, j);
    let mut count = 0;

    for k in 0..mt.min(nt) {
        let op = TileOp::Geqrt {
            a: at(k, k),
            tau: tt(k, k),
        };
        sched.submit(TileTask::new(op, k))?;
        count += 1;

        for j in (k + 1)..nt {
            let op = TileOp::Unmqr {
                v: at(k, k),
                tau: tt(k, k),
                c: at(k, j),
            };
            sched.submit(TileTask::new(op, k))?;
            count += 1;
        }

        for i in (k + 1)..mt {
            let op = TileOp::Tsqrt {
                r: at(k, k),
                a: at(i, k),
                tau: tt(i, k),
            };
            sched.submit(TileTask::new(op, k))?;
            count += 1;

            for j in (k + 1)..nt {
                let op = TileOp::Tsmqr {
                    c1: at(k, j),
                    c2: at(i, j),
                    v: at(i, k),
                    tau: tt(i, k),
                };
                sched.submit(TileTask::new(op, k))?;
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Apply `Q'` from a tiled QR factorization to `b`: `B <- Q'*B`.
///
/// `b` must have the same number of rows and the same row blocking as the
/// factored matrix.
pub fn apply_qt<T: FloatT>(
    sched: &mut TileScheduler<'_, T>,
    a: MatrixHandle,
    tau: MatrixHandle,
    b: MatrixHandle,
) -> Result<usize, SchedulerError> {
    let (mt, nt) = check_tau(sched, a, tau)?;
    let la = sched.layout(a)?;
    let lb = sched.layout(b)?;
    if lb.size.0 != la.size.0 || lb.block.0 != la.block.0 {
        return Err(MatrixError::IncompatibleDimension.into());
    }

    let nbt = lb.grid.1;
    let at = |i, j| TileCoord::new(a, i, j);
    let tt = |i, j| TileCoord::new(tau, i, j);
    let bt = |i, j| TileCoord::new(b, i, j);
    let mut count = 0;

    for k in 0..mt.min(nt) {
        for j in 0..nbt {
            let op = TileOp::Unmqr {
                v: at(k, k),
                tau: tt(k, k),
                c: bt(k, j),
            };
            sched.submit(TileTask::new(op, k))?;
            count += 1;
        }
        for i in (k + 1)..mt {
            for j in 0..nbt {
                let op = TileOp::Tsmqr {
                    c1: bt(k, j),
                    c2: bt(i, j),
                    v: at(i, k),
                    tau: tt(i, k),
                };
                sched.submit(TileTask::new(op, k))?;
                count += 1;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::HierMatrix;

    #[test]
    fn test_tau_layout_checked() {
        let mut a = FlatMatrix::<f64>::identity(10).unwrap();
        let mut tau = tau_matrix::<f64>(10, 10, 4).unwrap();
        assert_eq!(tau.size(), (3, 10));
        let mut bad = FlatMatrix::<f64>::create(3, 10).unwrap();

        let mut sched = TileScheduler::new(SchedulerSettings::default()).unwrap();
        let ha = sched.register(HierMatrix::new(&mut a, 4, 4).unwrap()).unwrap();
        let ht = sched.register(HierMatrix::new(&mut tau, 1, 4).unwrap()).unwrap();
        let hb = sched.register(HierMatrix::new(&mut bad, 1, 3).unwrap()).unwrap();

        assert!(qr(&mut sched, ha, hb).is_err());
        // 3 geqrt, 3 unmqr, 3 tsqrt, 5 tsmqr
        assert_eq!(qr(&mut sched, ha, ht).unwrap(), 14);
        sched.run().unwrap();
    }
}
