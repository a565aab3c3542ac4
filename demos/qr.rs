// Tiled QR driver: qr <nthreads> <blockSize>
use rand::prelude::*;
use tessera::algebra::*;
use tessera::blocked;
use tessera::scheduler::*;

const N: usize = 500;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let nthreads = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let bs = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(192);

    let mut rng = StdRng::seed_from_u64(7);
    let data: Vec<f64> = (0..N * N).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let a0 = FlatMatrix::from_col_major(N, N, data).unwrap();

    let mut a = a0.try_clone().unwrap();
    let mut b = a0.try_clone().unwrap();
    let mut tau = blocked::tau_matrix::<f64>(N, N, bs).unwrap();
    {
        let settings = SchedulerSettingsBuilder::default()
            .max_threads(nthreads)
            .sorting(SortingPolicy::CriticalPath)
            .verbose(true)
            .build()
            .unwrap();
        let mut sched = TileScheduler::new(settings).unwrap();
        let ha = sched.register(HierMatrix::new(&mut a, bs, bs).unwrap()).unwrap();
        let ht = sched.register(HierMatrix::new(&mut tau, 1, bs).unwrap()).unwrap();
        let hb = sched.register(HierMatrix::new(&mut b, bs, bs).unwrap()).unwrap();
        blocked::qr(&mut sched, ha, ht).unwrap();
        blocked::apply_qt(&mut sched, ha, ht, hb).unwrap();
        sched.run().unwrap();
    }

    // Q'*A must reproduce R above the diagonal and vanish below it
    let mut err: f64 = 0.0;
    for j in 0..N {
        for i in 0..N {
            let r = if i <= j { a[(i, j)] } else { 0.0 };
            err = err.max((b[(i, j)] - r).abs());
        }
    }
    let err = err / a0.norm_one().unwrap();

    if err < 1e-10 {
        println!("PASS::qr_residual {:e}", err);
    } else {
        println!("FAIL::qr_residual {:e}", err);
        std::process::exit(-1);
    }
}
