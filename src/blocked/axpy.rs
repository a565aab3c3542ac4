use super::check_same_layout;
use crate::algebra::FloatT;
use crate::scheduler::*;

/// Tiled `Y <- alpha*X + Y`.  Both matrices must share one tile layout.
pub fn axpy<T: FloatT>(
    sched: &mut TileScheduler<'_, T>,
    alpha: T,
    x: MatrixHandle,
    y: MatrixHandle,
) -> Result<usize, SchedulerError> {
    let (lx, ly) = (sched.layout(x)?, sched.layout(y)?);
    check_same_layout(&lx, &ly)?;

    let (mt, nt) = ly.grid;
    for j in 0..nt {
        for i in 0..mt {
            let op = TileOp::Axpy {
                alpha,
                x: TileCoord::new(x, i, j),
                y: TileCoord::new(y, i, j),
            };
            sched.submit(TileTask::new(op, 0))?;
        }
    }
    Ok(mt * nt)
}

/// Tiled copy `Y <- X`.  Both matrices must share one tile layout.
pub fn copy<T: FloatT>(
    sched: &mut TileScheduler<'_, T>,
    x: MatrixHandle,
    y: MatrixHandle,
) -> Result<usize, SchedulerError> {
    let (lx, ly) = (sched.layout(x)?, sched.layout(y)?);
    check_same_layout(&lx, &ly)?;

    let (mt, nt) = ly.grid;
    for j in 0..nt {
        for i in 0..mt {
            let op = TileOp::Copy {
                x: TileCoord::new(x, i, j),
                y: TileCoord::new(y, i, j),
            };
            sched.submit(TileTask::new(op, 0))?;
        }
    }
    Ok(mt * nt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::*;

    #[test]
    fn test_axpy_then_copy() {
        let mut x = FlatMatrix::<f64>::create(7, 5).unwrap();
        let mut y = FlatMatrix::<f64>::create(7, 5).unwrap();
        let mut z = FlatMatrix::<f64>::create(7, 5).unwrap();
        for j in 0..5 {
            for i in 0..7 {
                x[(i, j)] = (i + 10 * j) as f64;
                y[(i, j)] = 1.0;
            }
        }
        {
            let settings = SchedulerSettingsBuilder::default()
                .max_threads(3)
                .build()
                .unwrap();
            let mut sched = TileScheduler::new(settings).unwrap();
            let hx = sched.register(HierMatrix::new(&mut x, 3, 2).unwrap()).unwrap();
            let hy = sched.register(HierMatrix::new(&mut y, 3, 2).unwrap()).unwrap();
            let hz = sched.register(HierMatrix::new(&mut z, 3, 2).unwrap()).unwrap();

            assert_eq!(axpy(&mut sched, 2.0, hx, hy).unwrap(), 9);
            // reads y after the axpy wrote it
            assert_eq!(copy(&mut sched, hy, hz).unwrap(), 9);
            sched.run().unwrap();
        }
        assert_eq!(z[(6, 4)], 1.0 + 2.0 * 46.0);
        assert_eq!(z[(0, 0)], 1.0);
    }

    #[test]
    fn test_layout_mismatch() {
        let mut x = FlatMatrix::<f64>::create(4, 4).unwrap();
        let mut y = FlatMatrix::<f64>::create(4, 4).unwrap();
        let mut sched = TileScheduler::new(SchedulerSettings::default()).unwrap();
        let hx = sched.register(HierMatrix::new(&mut x, 2, 2).unwrap()).unwrap();
        let hy = sched.register(HierMatrix::new(&mut y, 4, 2).unwrap()).unwrap();
        assert!(axpy(&mut sched, 1.0, hx, hy).is_err());
    }
}
