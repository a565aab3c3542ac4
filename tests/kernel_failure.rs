use std::io::Write;
use std::time::Duration;
use tessera::{algebra::*, blocked, io::ConfigurablePrintTarget, scheduler::*};

// native kernels, with a panicking GEMM and a slow AXPY when asked for
#[derive(Default)]
struct FaultyKernels {
    gemm_panics: bool,
    axpy_delay: Option<Duration>,
}

impl TileKernels<f64> for FaultyKernels {
    fn potrf(&self, a: &mut TileMut<'_, f64>) -> Result<(), KernelError> {
        NativeKernels.potrf(a)
    }
    fn trsm(&self, l: &TileRef<'_, f64>, b: &mut TileMut<'_, f64>) -> Result<(), KernelError> {
        NativeKernels.trsm(l, b)
    }
    fn syrk(&self, a: &TileRef<'_, f64>, c: &mut TileMut<'_, f64>) -> Result<(), KernelError> {
        NativeKernels.syrk(a, c)
    }
    fn gemm(
        &self,
        a: &TileRef<'_, f64>,
        b: &TileRef<'_, f64>,
        c: &mut TileMut<'_, f64>,
    ) -> Result<(), KernelError> {
        if self.gemm_panics {
            panic!("gemm unavailable")
        }
        NativeKernels.gemm(a, b, c)
    }
    fn geqrt(
        &self,
        a: &mut TileMut<'_, f64>,
        tau: &mut TileMut<'_, f64>,
    ) -> Result<(), KernelError> {
        NativeKernels.geqrt(a, tau)
    }
    fn unmqr(
        &self,
        v: &TileRef<'_, f64>,
        tau: &TileRef<'_, f64>,
        c: &mut TileMut<'_, f64>,
    ) -> Result<(), KernelError> {
        NativeKernels.unmqr(v, tau, c)
    }
    fn tsqrt(
        &self,
        r: &mut TileMut<'_, f64>,
        a: &mut TileMut<'_, f64>,
        tau: &mut TileMut<'_, f64>,
    ) -> Result<(), KernelError> {
        NativeKernels.tsqrt(r, a, tau)
    }
    fn tsmqr(
        &self,
        c1: &mut TileMut<'_, f64>,
        c2: &mut TileMut<'_, f64>,
        v: &TileRef<'_, f64>,
        tau: &TileRef<'_, f64>,
    ) -> Result<(), KernelError> {
        NativeKernels.tsmqr(c1, c2, v, tau)
    }
    fn axpy(
        &self,
        alpha: f64,
        x: &TileRef<'_, f64>,
        y: &mut TileMut<'_, f64>,
    ) -> Result<(), KernelError> {
        if let Some(delay) = self.axpy_delay {
            std::thread::sleep(delay);
        }
        NativeKernels.axpy(alpha, x, y)
    }
}

fn settings(threads: usize) -> SchedulerSettings {
    SchedulerSettingsBuilder::default()
        .max_threads(threads)
        .build()
        .unwrap()
}

#[test]
fn test_not_positive_definite_tile() {
    // the second diagonal tile has a negative pivot
    let mut a = FlatMatrix::<f64>::identity(12).unwrap();
    a[(5, 5)] = -1.0;

    let mut sched = TileScheduler::new(settings(4)).unwrap();
    let h = sched.register(HierMatrix::new(&mut a, 4, 4).unwrap()).unwrap();
    let submitted = blocked::cholesky(&mut sched, h).unwrap();

    match sched.run() {
        Err(SchedulerError::KernelFailure {
            op,
            tile,
            source,
            failed_tasks,
        }) => {
            assert_eq!(op, TileOpKind::Potrf);
            assert_eq!(tile, TileCoord::new(h, 1, 1));
            assert!(matches!(source, KernelError::NotPositiveDefinite { .. }));
            assert_eq!(failed_tasks, 1);
        }
        other => panic!("unexpected result {:?}", other),
    }

    let report = sched.last_report().unwrap();
    assert_eq!(report.submitted, submitted);
    assert_eq!(report.failed, 1);
    assert!(report.skipped > 0);
    assert_eq!(report.completed + report.failed + report.skipped, submitted);
    assert_eq!(sched.pending(), 0);
}

#[test]
fn test_panicking_kernel() {
    let mut a = FlatMatrix::<f64>::identity(9).unwrap();
    let kernels = FaultyKernels {
        gemm_panics: true,
        ..Default::default()
    };
    let mut sched = TileScheduler::with_kernels(settings(3), Box::new(kernels)).unwrap();
    let h = sched.register(HierMatrix::new(&mut a, 3, 3).unwrap()).unwrap();
    blocked::cholesky(&mut sched, h).unwrap();

    match sched.run() {
        Err(SchedulerError::KernelFailure { op, tile, source, .. }) => {
            assert_eq!(op, TileOpKind::Gemm);
            assert_eq!(tile, TileCoord::new(h, 2, 1));
            assert_eq!(source, KernelError::Panicked("gemm unavailable".to_string()));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_scheduler_usable_after_failure() {
    let mut a = FlatMatrix::<f64>::identity(8).unwrap();
    a[(0, 0)] = 0.0;
    let mut b = FlatMatrix::<f64>::identity(8).unwrap();

    let mut sched = TileScheduler::new(settings(2)).unwrap();
    let ha = sched.register(HierMatrix::new(&mut a, 4, 4).unwrap()).unwrap();
    let hb = sched.register(HierMatrix::new(&mut b, 4, 4).unwrap()).unwrap();

    blocked::cholesky(&mut sched, ha).unwrap();
    assert!(sched.run().is_err());

    blocked::cholesky(&mut sched, hb).unwrap();
    let report = sched.run().unwrap();
    assert_eq!(report.completed, 4);
}

#[test]
fn test_running_tasks_finish_after_failure() {
    let mut a = FlatMatrix::<f64>::identity(8).unwrap();
    a[(0, 0)] = -1.0;
    let mut x = FlatMatrix::<f64>::identity(4).unwrap();
    let mut y = FlatMatrix::<f64>::identity(4).unwrap();
    {
        let kernels = FaultyKernels {
            axpy_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let mut sched = TileScheduler::with_kernels(settings(2), Box::new(kernels)).unwrap();
        let hx = sched.register(HierMatrix::new(&mut x, 4, 4).unwrap()).unwrap();
        let hy = sched.register(HierMatrix::new(&mut y, 4, 4).unwrap()).unwrap();
        let ha = sched.register(HierMatrix::new(&mut a, 4, 4).unwrap()).unwrap();

        // the slow axpy is admitted first and is still running when the
        // first diagonal tile fails
        blocked::axpy(&mut sched, 2.0, hx, hy).unwrap();
        blocked::cholesky(&mut sched, ha).unwrap();

        match sched.run() {
            Err(SchedulerError::KernelFailure { op, tile, .. }) => {
                assert_eq!(op, TileOpKind::Potrf);
                assert_eq!(tile, TileCoord::new(ha, 0, 0));
            }
            other => panic!("unexpected result {:?}", other),
        }
        let report = sched.last_report().unwrap();
        assert_eq!(report.count(TileOpKind::Axpy), 1);
        assert_eq!(report.completed, 1);
        assert_eq!(report.skipped, 3);
    }
    assert_eq!(y[(0, 0)], 3.0);
    assert_eq!(y[(3, 3)], 3.0);
    assert_eq!(y[(1, 0)], 0.0);
}

// writer whose every write fails
struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "broken pipe"))
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "broken pipe"))
    }
}

#[test]
fn test_failure_survives_print_error() {
    let mut a = FlatMatrix::<f64>::identity(12).unwrap();
    a[(5, 5)] = -1.0;

    let settings = SchedulerSettingsBuilder::default()
        .max_threads(2)
        .verbose(true)
        .build()
        .unwrap();
    let mut sched = TileScheduler::new(settings).unwrap();
    sched.print_to_stream(Box::new(BrokenPipe));
    let h = sched.register(HierMatrix::new(&mut a, 4, 4).unwrap()).unwrap();
    blocked::cholesky(&mut sched, h).unwrap();

    match sched.run() {
        Err(SchedulerError::KernelFailure { op, tile, .. }) => {
            assert_eq!(op, TileOpKind::Potrf);
            assert_eq!(tile, TileCoord::new(h, 1, 1));
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(sched.last_report().unwrap().failed, 1);
}

#[test]
fn test_print_error_after_clean_run() {
    let mut a = FlatMatrix::<f64>::identity(4).unwrap();
    let settings = SchedulerSettingsBuilder::default()
        .verbose(true)
        .build()
        .unwrap();
    let mut sched = TileScheduler::new(settings).unwrap();
    sched.print_to_stream(Box::new(BrokenPipe));
    let h = sched.register(HierMatrix::new(&mut a, 2, 2).unwrap()).unwrap();
    let tasks = blocked::cholesky(&mut sched, h).unwrap();

    assert!(matches!(sched.run(), Err(SchedulerError::Io(_))));
    // the work itself was done and recorded
    assert_eq!(sched.last_report().unwrap().completed, tasks);
}
