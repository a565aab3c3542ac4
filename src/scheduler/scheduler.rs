use super::cache::{fingerprint, signature, CacheKey, TileCache};
use super::graph::{TaskGraph, TaskId};
use super::ready::ReadyQueue;
use super::registry::Registry;
use super::*;
use crate::algebra::*;
use crate::io::{ConfigurablePrintTarget, PrintTarget, Summary};
use itertools::Itertools;
use parking_lot::Mutex;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Grid geometry of a registered matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {
    /// logical size of the tiled region
    pub size: (usize, usize),
    pub block: (usize, usize),
    pub grid: (usize, usize),
}

/// Summary of one call to [`TileScheduler::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub submitted: usize,
    /// tasks that finished, including cache hits
    pub completed: usize,
    pub cache_hits: usize,
    pub failed: usize,
    /// tasks never started because an earlier task failed
    pub skipped: usize,
    pub elapsed: Duration,
    per_op: [usize; 10],
}

impl RunReport {
    /// completed tasks of one kind
    pub fn count(&self, kind: TileOpKind) -> usize {
        self.per_op[kind.index()]
    }

    /// tasks that invoked a kernel
    pub fn kernel_calls(&self) -> usize {
        self.completed - self.cache_hits
    }
}

// first failure of a run
struct Failure {
    op: TileOpKind,
    tile: TileCoord,
    source: KernelError,
}

// bookkeeping shared by the workers, guarded by a single lock
struct RunState<T> {
    graph: TaskGraph<T>,
    ready: ReadyQueue,
    completed: usize,
    cache_hits: usize,
    failed: usize,
    failure: Option<Failure>,
    per_op: [usize; 10],
}

impl<T: Copy> RunState<T> {
    fn new(graph: TaskGraph<T>, ready: ReadyQueue) -> Self {
        Self {
            graph,
            ready,
            completed: 0,
            cache_hits: 0,
            failed: 0,
            failure: None,
            per_op: [0; 10],
        }
    }

    fn admit(&mut self) -> Option<(TaskId, TileTask<T>)> {
        if self.failure.is_some() {
            return None;
        }
        let id = self.ready.pop()?;
        Some((id, self.graph.node(id).task))
    }

    // returns the number of tasks made ready
    fn finish(&mut self, id: TaskId, task: &TileTask<T>, outcome: Result<bool, KernelError>) -> usize {
        match outcome {
            Ok(hit) => {
                self.completed += 1;
                self.cache_hits += hit as usize;
                self.per_op[task.kind().index()] += 1;
                let released = self.graph.complete(id);
                if self.failure.is_some() {
                    return 0;
                }
                for &d in &released {
                    self.ready.push(d, &self.graph.node(d).task);
                }
                released.len()
            }
            Err(source) => {
                self.failed += 1;
                if self.failure.is_none() {
                    self.failure = Some(Failure {
                        op: task.kind(),
                        tile: task.op.writes()[0],
                        source,
                    });
                    self.ready.clear();
                }
                0
            }
        }
    }
}

// state borrowed by the worker jobs for the duration of a run
struct Executor<'e, 'a, T> {
    registry: &'e Registry<'a, T>,
    kernels: &'e (dyn TileKernels<T> + 'a),
    cache: Option<&'e TileCache<T>>,
    state: Mutex<RunState<T>>,
}

impl<'e, 'a, T> Executor<'e, 'a, T>
where
    T: FloatT,
{
    fn dispatch<'s>(&'s self, scope: &rayon::Scope<'s>) {
        let Some((id, task)) = self.state.lock().admit() else {
            return;
        };
        let outcome = self.execute(&task);
        let released = self.state.lock().finish(id, &task, outcome);
        for _ in 0..released {
            scope.spawn(move |s| self.dispatch(s));
        }
    }

    // Ok(true) on a cache hit.  Panics anywhere in the task, cache
    // included, are reported as kernel failures.
    fn execute(&self, task: &TileTask<T>) -> Result<bool, KernelError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.execute_unguarded(&task.op))) {
            Ok(res) => res,
            Err(payload) => Err(KernelError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    fn execute_unguarded(&self, op: &TileOp<T>) -> Result<bool, KernelError> {
        let Some(cache) = self.cache else {
            self.invoke(op)?;
            return Ok(false);
        };

        let (key, fp, matrices) = self.cache_probe(op);
        if let Some(tiles) = cache.lookup(&key, fp) {
            self.restore(op, &tiles);
            return Ok(true);
        }
        self.invoke(op)?;
        cache.insert(key, fp, matrices, self.snapshot(op));
        Ok(false)
    }

    fn invoke(&self, op: &TileOp<T>) -> Result<(), KernelError> {
        let (reg, k) = (self.registry, self.kernels);
        // SAFETY: the task graph only admits a task once every earlier task
        // touching its written tiles has finished and every earlier writer of
        // its read tiles has finished, and operands within a task are
        // distinct tiles.  No other live view aliases the views created here.
        unsafe {
            match *op {
                TileOp::Potrf { a } => k.potrf(&mut reg.tile_mut(a)),
                TileOp::Trsm { l, b } => k.trsm(&reg.tile_ref(l), &mut reg.tile_mut(b)),
                TileOp::Syrk { a, c } => k.syrk(&reg.tile_ref(a), &mut reg.tile_mut(c)),
                TileOp::Gemm { a, b, c } => {
                    k.gemm(&reg.tile_ref(a), &reg.tile_ref(b), &mut reg.tile_mut(c))
                }
                TileOp::Geqrt { a, tau } => k.geqrt(&mut reg.tile_mut(a), &mut reg.tile_mut(tau)),
                TileOp::Unmqr { v, tau, c } => {
                    k.unmqr(&reg.tile_ref(v), &reg.tile_ref(tau), &mut reg.tile_mut(c))
                }
                TileOp::Tsqrt { r, a, tau } => k.tsqrt(
                    &mut reg.tile_mut(r),
                    &mut reg.tile_mut(a),
                    &mut reg.tile_mut(tau),
                ),
                TileOp::Tsmqr { c1, c2, v, tau } => k.tsmqr(
                    &mut reg.tile_mut(c1),
                    &mut reg.tile_mut(c2),
                    &reg.tile_ref(v),
                    &reg.tile_ref(tau),
                ),
                TileOp::Axpy { alpha, x, y } => k.axpy(alpha, &reg.tile_ref(x), &mut reg.tile_mut(y)),
                TileOp::Copy { x, y } => k.copy(&reg.tile_ref(x), &mut reg.tile_mut(y)),
            }
        }
    }

    fn cache_probe(&self, op: &TileOp<T>) -> (CacheKey, u128, Vec<MatrixId>) {
        let operands = op.operands();
        let tiles: Vec<Tile> = operands
            .iter()
            .map(|&c| self.registry.descriptor(c))
            .collect();

        let mut scalar = Vec::new();
        if let TileOp::Axpy { alpha, .. } = *op {
            alpha.write_le_bytes(&mut scalar);
        }
        let sig = signature(op.kind().index() as u8, &scalar, &tiles);

        // SAFETY: see `invoke`; the task has exclusive use of its operands
        let views: Vec<TileRef<'_, T>> = operands
            .iter()
            .map(|&c| unsafe { self.registry.tile_ref(c) })
            .collect();
        let fp = fingerprint(&views);

        let matrices = tiles.iter().map(|t| t.matrix).unique().collect();
        (CacheKey::new(&tiles[0], sig), fp, matrices)
    }

    fn snapshot(&self, op: &TileOp<T>) -> Vec<Vec<T>> {
        op.writes()
            .into_iter()
            // SAFETY: see `invoke`
            .map(|c| unsafe { self.registry.tile_ref(c) }.to_vec())
            .collect()
    }

    fn restore(&self, op: &TileOp<T>, tiles: &[Vec<T>]) {
        for (c, data) in op.writes().into_iter().zip(tiles) {
            // SAFETY: see `invoke`
            unsafe { self.registry.tile_mut(c) }.copy_from_slice(data);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Dependency tracking task scheduler for tiled matrices.
///
/// Hierarchical matrices are [registered](TileScheduler::register) with the
/// scheduler, tile tasks naming their tiles are [submitted](TileScheduler::submit)
/// and [`run`](TileScheduler::run) executes everything submitted so far on a
/// pool of `max_threads` workers.  Tasks run in any order consistent with
/// their read/write conflicts, so the result is the same as executing them
/// one after another in submission order.
///
/// The first kernel failure of a run stops the admission of new tasks.
/// Tasks already executing are allowed to finish, and the failure is
/// reported once all workers are idle.
pub struct TileScheduler<'a, T: FloatT> {
    settings: SchedulerSettings,
    pool: rayon::ThreadPool,
    kernels: Box<dyn TileKernels<T> + 'a>,
    registry: Registry<'a, T>,
    graph: TaskGraph<T>,
    cache: Option<TileCache<T>>,
    last_report: Option<RunReport>,
    stream: PrintTarget,
}

impl<'a, T> TileScheduler<'a, T>
where
    T: FloatT,
{
    /// Scheduler using the default [`NativeKernels`].
    pub fn new(settings: SchedulerSettings) -> Result<Self, SchedulerError> {
        Self::with_kernels(settings, Box::new(NativeKernels))
    }

    /// Scheduler dispatching tasks to a user supplied kernel set.
    pub fn with_kernels(
        settings: SchedulerSettings,
        kernels: Box<dyn TileKernels<T> + 'a>,
    ) -> Result<Self, SchedulerError> {
        settings.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.max_threads)
            .thread_name(|i| format!("tessera-worker-{}", i))
            .build()
            .map_err(|e| SchedulerError::ThreadPool(e.to_string()))?;

        let cache = if settings.caching_enabled() {
            let dir = settings.out_of_core_dir.clone();
            Some(TileCache::new(settings.cache_capacity, dir)?)
        } else {
            None
        };

        Ok(Self {
            settings,
            pool,
            kernels,
            registry: Registry::default(),
            graph: TaskGraph::default(),
            cache,
            last_report: None,
            stream: PrintTarget::default(),
        })
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// number of worker threads
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Register a hierarchical matrix.  The scheduler keeps the view (and
    /// hence the borrow of its flat matrix) until it is dropped.
    pub fn register(&mut self, view: HierMatrix<'a, T>) -> Result<MatrixHandle, SchedulerError> {
        Ok(self.registry.register(view)?)
    }

    pub fn view(&self, h: MatrixHandle) -> Result<&HierMatrix<'a, T>, SchedulerError> {
        self.registry.view(h)
    }

    pub fn layout(&self, h: MatrixHandle) -> Result<TileLayout, SchedulerError> {
        let v = self.registry.view(h)?;
        Ok(TileLayout {
            size: v.size(),
            block: v.block_size(),
            grid: v.grid(),
        })
    }

    /// Queue a task.  Fails if an operand names an unregistered matrix, a
    /// tile outside of its grid, or the same tile twice.
    pub fn submit(&mut self, task: TileTask<T>) -> Result<(), SchedulerError> {
        let operands = task.op.operands();
        for (i, &c) in operands.iter().enumerate() {
            self.registry.tile(c)?;
            if operands[..i].contains(&c) {
                return Err(SchedulerError::AliasedOperands(c));
            }
        }
        self.graph.add(task);
        Ok(())
    }

    /// number of submitted tasks not yet run
    pub fn pending(&self) -> usize {
        self.graph.len()
    }

    /// Execute every pending task and wait for completion.
    ///
    /// The pending task graph is empty on return, whether or not the run
    /// succeeded.
    pub fn run(&mut self) -> Result<RunReport, SchedulerError> {
        let graph = std::mem::take(&mut self.graph);
        let submitted = graph.len();
        let start = Instant::now();

        let roots = graph.roots();
        let mut ready = ReadyQueue::new(self.settings.sorting);
        for &id in &roots {
            ready.push(id, &graph.node(id).task);
        }

        let exec = Executor {
            registry: &self.registry,
            kernels: &*self.kernels,
            cache: self.cache.as_ref(),
            state: Mutex::new(RunState::new(graph, ready)),
        };

        let exec_ref = &exec;
        self.pool.scope(|s| {
            for _ in 0..roots.len() {
                s.spawn(move |s| exec_ref.dispatch(s));
            }
        });
        let state = exec.state.into_inner();

        let report = RunReport {
            submitted,
            completed: state.completed,
            cache_hits: state.cache_hits,
            failed: state.failed,
            skipped: submitted.saturating_sub(state.completed + state.failed),
            elapsed: start.elapsed(),
            per_op: state.per_op,
        };
        self.last_report = Some(report.clone());
        let printed = self.print_report(&report, state.failure.as_ref());

        // a failed run reports the failure, never a print error
        if let Some(f) = state.failure {
            return Err(SchedulerError::KernelFailure {
                op: f.op,
                tile: f.tile,
                source: f.source,
                failed_tasks: report.failed,
            });
        }
        if report.completed != submitted {
            return Err(SchedulerError::InternalInvariantViolation {
                pending: submitted.abs_diff(report.completed),
            });
        }
        printed?;
        Ok(report)
    }

    /// report of the most recent run, including failed runs
    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    pub fn cache(&self) -> Option<&TileCache<T>> {
        self.cache.as_ref()
    }

    /// Detach the tile cache, e.g. to hand it to another scheduler.
    pub fn take_cache(&mut self) -> Option<TileCache<T>> {
        self.cache.take()
    }

    /// Replace the tile cache.  Results are only looked up and stored while
    /// a cache is attached.
    pub fn set_cache(&mut self, cache: TileCache<T>) {
        self.cache = Some(cache);
    }

    /// Drop every cached result involving a registered matrix.
    pub fn invalidate(&self, h: MatrixHandle) -> Result<usize, SchedulerError> {
        let id = self.registry.view(h)?.matrix_id();
        Ok(self.cache.as_ref().map_or(0, |c| c.invalidate(id)))
    }

    fn print_report(&mut self, report: &RunReport, failure: Option<&Failure>) -> std::io::Result<()> {
        if !self.settings.verbose {
            return Ok(());
        }
        let mut summary = Summary::new(format!(
            "tile scheduler: {} tasks on {} threads ({:?} ordering, {} matrices)",
            report.submitted,
            self.pool.current_num_threads(),
            self.settings.sorting,
            self.registry.len()
        ));
        summary.fields(&[
            ("completed", &report.completed),
            ("cache hits", &report.cache_hits),
            ("failed", &report.failed),
            ("skipped", &report.skipped),
        ]);
        summary.line(
            TileOpKind::ALL
                .iter()
                .filter(|k| report.count(**k) > 0)
                .map(|k| format!("{} {}", k, report.count(*k)))
                .join(", "),
        );
        if let Some(f) = failure {
            summary.line(format!("first failure: {} on {} ({})", f.op, f.tile, f.source));
        }
        summary.fields(&[("run time", &format!("{:?}", report.elapsed))]);
        self.stream.emit(&summary)
    }
}

impl<T: FloatT> ConfigurablePrintTarget for TileScheduler<'_, T> {
    fn print_to_stdout(&mut self) {
        self.stream.print_to_stdout()
    }
    fn print_to_stderr(&mut self) {
        self.stream.print_to_stderr()
    }
    fn print_to_file(&mut self, file: std::fs::File) {
        self.stream.print_to_file(file)
    }
    fn print_to_stream(&mut self, stream: Box<dyn Write + Send + Sync>) {
        self.stream.print_to_stream(stream)
    }
    fn print_to_sink(&mut self) {
        self.stream.print_to_sink()
    }
    fn print_to_buffer(&mut self) {
        self.stream.print_to_buffer()
    }
    fn get_print_buffer(&mut self) -> std::io::Result<String> {
        self.stream.get_print_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(threads: usize) -> SchedulerSettings {
        SchedulerSettingsBuilder::default()
            .max_threads(threads)
            .build()
            .unwrap()
    }

    #[test]
    fn test_submit_validation() {
        let mut a = FlatMatrix::<f64>::create(4, 4).unwrap();
        let mut sched = TileScheduler::new(settings(1)).unwrap();
        let h = sched.register(HierMatrix::new(&mut a, 2, 2).unwrap()).unwrap();

        let bad = TileTask::new(TileOp::Potrf { a: TileCoord::new(h, 2, 0) }, 0);
        assert!(matches!(
            sched.submit(bad),
            Err(SchedulerError::IndexOutOfBounds(_))
        ));

        let unknown = TileTask::new(
            TileOp::Potrf { a: TileCoord::new(MatrixHandle(5), 0, 0) },
            0,
        );
        assert!(matches!(
            sched.submit(unknown),
            Err(SchedulerError::UnknownMatrix(MatrixHandle(5)))
        ));

        let t = TileCoord::new(h, 1, 0);
        let aliased = TileTask::new(TileOp::Trsm { l: t, b: t }, 0);
        assert!(matches!(
            sched.submit(aliased),
            Err(SchedulerError::AliasedOperands(c)) if c == t
        ));
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn test_empty_run() {
        let mut sched = TileScheduler::<f64>::new(settings(2)).unwrap();
        let report = sched.run().unwrap();
        assert_eq!(report.submitted, 0);
        assert_eq!(report.completed, 0);
    }

    #[test]
    fn test_verbose_report() {
        let mut a = FlatMatrix::<f64>::identity(4).unwrap();
        let mut sched = TileScheduler::new(
            SchedulerSettingsBuilder::default()
                .verbose(true)
                .build()
                .unwrap(),
        )
        .unwrap();
        sched.print_to_buffer();
        let h = sched.register(HierMatrix::new(&mut a, 2, 2).unwrap()).unwrap();
        sched
            .submit(TileTask::new(TileOp::Potrf { a: TileCoord::new(h, 0, 0) }, 0))
            .unwrap();
        let report = sched.run().unwrap();
        assert_eq!(report.count(TileOpKind::Potrf), 1);

        let text = sched.get_print_buffer().unwrap();
        assert!(text.contains("tile scheduler: 1 tasks"));
        assert!(text.contains("POTRF 1"));
    }

    #[test]
    fn test_cache_panic_is_kernel_failure() {
        let mut a = FlatMatrix::<f64>::identity(4).unwrap();
        let settings = SchedulerSettingsBuilder::default()
            .max_threads(1)
            .caching(CachingPolicy::Memoize)
            .build()
            .unwrap();
        let mut sched = TileScheduler::new(settings).unwrap();
        let h = sched.register(HierMatrix::new(&mut a, 2, 2).unwrap()).unwrap();
        let op = TileOp::Potrf { a: TileCoord::new(h, 0, 0) };

        // an entry under the task's key whose tile has the wrong length
        {
            let exec = Executor {
                registry: &sched.registry,
                kernels: &*sched.kernels,
                cache: sched.cache.as_ref(),
                state: Mutex::new(RunState::new(
                    TaskGraph::default(),
                    ReadyQueue::new(SortingPolicy::Fifo),
                )),
            };
            let (key, fp, matrices) = exec.cache_probe(&op);
            sched.cache().unwrap().insert(key, fp, matrices, vec![vec![1.0; 3]]);
        }

        sched.submit(TileTask::new(op, 0)).unwrap();
        match sched.run() {
            Err(SchedulerError::KernelFailure { op, source, .. }) => {
                assert_eq!(op, TileOpKind::Potrf);
                assert!(matches!(source, KernelError::Panicked(_)));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(sched.last_report().unwrap().failed, 1);
    }
}
