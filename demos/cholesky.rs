// Tiled Cholesky driver: cholesky <nthreads> <blockSize>
use rand::prelude::*;
use tessera::algebra::*;
use tessera::blocked;
use tessera::scheduler::*;

const N: usize = 500;

fn factor(a: &mut FlatMatrix<f64>, nthreads: usize, bs: usize) -> RunReport {
    let settings = SchedulerSettingsBuilder::default()
        .max_threads(nthreads)
        .sorting(SortingPolicy::CriticalPath)
        .verbose(true)
        .build()
        .unwrap();
    let mut sched = TileScheduler::new(settings).unwrap();
    let h = sched.register(HierMatrix::new(a, bs, bs).unwrap()).unwrap();
    blocked::cholesky(&mut sched, h).unwrap();
    sched.run().unwrap()
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let nthreads = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let bs = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(192);

    let mut rng = StdRng::seed_from_u64(2024);
    let a = FlatMatrix::<f64>::spd_from(N, std::iter::repeat_with(|| rng.gen_range(-1.0..1.0)))
        .unwrap();

    let mut tiled = a.try_clone().unwrap();
    let mut reference = a.try_clone().unwrap();
    factor(&mut tiled, nthreads, bs);
    factor(&mut reference, 1, N);

    // absolute 1-norm of the difference of the lower triangles
    let diff = tiled.norm_one_lower_diff(&reference).unwrap();
    if diff < 1e-9 {
        println!("PASS::cholesky_lower_diff {:e}", diff);
    } else {
        println!("FAIL::cholesky_lower_diff {:e}", diff);
        std::process::exit(-1);
    }
}
