use super::check_square;
use crate::algebra::FloatT;
use crate::scheduler::*;

/// Tiled lower Cholesky factorization `A = L*L'`.
///
/// `a` must be a square matrix tiled with square blocks.  On completion the
/// lower triangle of every tile on or below the diagonal holds `L`; tiles
/// above the diagonal are not referenced.
pub fn cholesky<T: FloatT>(
    sched: &mut TileScheduler<'_, T>,
    a: MatrixHandle,
) -> Result<usize, SchedulerError> {
    let layout = sched.layout(a)?;
    check_square(&layout)?;

    let nt = layout.grid.0;
    let t = |i, j| TileCoord::new(a, i, j);
    let mut count = 0;

    for k in 0..nt {
        sched.submit(TileTask::new(TileOp::Potrf { a: t(k, k) }, k))?;
        count += 1;

        for i in (k + 1)..nt {
            let op = TileOp::Trsm {
                l: t(k, k),
                b: t(i, k),
            };
            sched.submit(TileTask::new(op, k))?;
            count += 1;
        }

        for i in (k + 1)..nt {
            let op = TileOp::Syrk {
                a: t(i, k),
                c: t(i, i),
            };
            sched.submit(TileTask::new(op, k))?;
            count += 1;

            for j in (k + 1)..i {
                let op = TileOp::Gemm {
                    a: t(i, k),
                    b: t(j, k),
                    c: t(i, j),
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
    use crate::algebra::*;

    #[test]
    fn test_task_count() {
        // nt = 3: 3 potrf, 3 trsm, 3 syrk, 1 gemm
        let mut a = FlatMatrix::<f64>::identity(9).unwrap();
        let mut sched = TileScheduler::new(SchedulerSettings::default()).unwrap();
        let h = sched.register(HierMatrix::new(&mut a, 3, 3).unwrap()).unwrap();
        assert_eq!(cholesky(&mut sched, h).unwrap(), 10);
        assert_eq!(sched.pending(), 10);

        let report = sched.run().unwrap();
        assert_eq!(report.count(TileOpKind::Gemm), 1);
        assert_eq!(report.count(TileOpKind::Potrf), 3);
    }

    #[test]
    fn test_rectangular_blocks_rejected() {
        let mut a = FlatMatrix::<f64>::identity(8).unwrap();
        let mut sched = TileScheduler::new(SchedulerSettings::default()).unwrap();
        let h = sched.register(HierMatrix::new(&mut a, 4, 2).unwrap()).unwrap();
        assert!(matches!(
            cholesky(&mut sched, h),
            Err(SchedulerError::Matrix(MatrixError::IncompatibleDimension))
        ));
    }
}
