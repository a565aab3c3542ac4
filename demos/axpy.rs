// Tiled AXPY driver: axpy <nthreads> <blockSize>
use rand::prelude::*;
use tessera::algebra::*;
use tessera::blocked;
use tessera::scheduler::*;

const N: usize = 1000;

fn random(rng: &mut StdRng) -> FlatMatrix<f64> {
    let data: Vec<f64> = (0..N * N).map(|_| rng.gen_range(-1.0..1.0)).collect();
    FlatMatrix::from_col_major(N, N, data).unwrap()
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let nthreads = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let bs = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(192);
    let alpha = 0.5;

    let mut rng = StdRng::seed_from_u64(11);
    let mut x = random(&mut rng);
    let mut y = random(&mut rng);
    let mut z = FlatMatrix::<f64>::create(N, N).unwrap();
    let y0 = y.try_clone().unwrap();
    {
        let settings = SchedulerSettingsBuilder::default()
            .max_threads(nthreads)
            .verbose(true)
            .build()
            .unwrap();
        let mut sched = TileScheduler::new(settings).unwrap();
        let hx = sched.register(HierMatrix::new(&mut x, bs, bs).unwrap()).unwrap();
        let hy = sched.register(HierMatrix::new(&mut y, bs, bs).unwrap()).unwrap();
        let hz = sched.register(HierMatrix::new(&mut z, bs, bs).unwrap()).unwrap();
        blocked::axpy(&mut sched, alpha, hx, hy).unwrap();
        blocked::copy(&mut sched, hy, hz).unwrap();
        sched.run().unwrap();
    }

    let mut err: f64 = 0.0;
    for j in 0..N {
        for i in 0..N {
            let expect = alpha * x[(i, j)] + y0[(i, j)];
            err = err.max((z[(i, j)] - expect).abs());
        }
    }

    if err < 1e-14 {
        println!("PASS::axpy_max_error {:e}", err);
    } else {
        println!("FAIL::axpy_max_error {:e}", err);
        std::process::exit(-1);
    }
}
