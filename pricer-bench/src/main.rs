//! Random-instance benchmark driver for the pricing solver.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pricer_core::{
    EnumerationBackend, Instance, KnnMode, Pricer, PricingSettings, PricingStats, SolType,
};

#[derive(Parser, Debug)]
#[command(about = "Benchmark conic knapsack pricing on random instances")]
struct Args {
    /// Items per instance
    #[arg(long, default_value_t = 12)]
    items: usize,

    /// Number of random instances
    #[arg(long, default_value_t = 20)]
    instances: usize,

    /// Pricing calls per instance, with fresh random rewards each call
    #[arg(long, default_value_t = 10)]
    calls: usize,

    /// Knapsack capacity
    #[arg(long, default_value_t = 10.0)]
    capacity: f64,

    /// Coefficient of the square-root capacity term
    #[arg(long, default_value_t = 1.0)]
    dalpha: f64,

    /// Reward target a column must beat
    #[arg(long, default_value_t = 1.0)]
    target: f64,

    /// Time limit per pricing call, in milliseconds
    #[arg(long, default_value_t = 1000)]
    time_limit_ms: u64,

    /// Disable the best-fit heuristic
    #[arg(long)]
    exact_only: bool,

    /// Enable the warm-start learner (inverse-distance, k=3)
    #[arg(long)]
    knn: bool,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn settings(args: &Args) -> PricingSettings {
    let mut settings = if args.exact_only {
        PricingSettings::exact_only()
    } else {
        PricingSettings::default()
    };
    if args.knn {
        settings = settings.with_knn(KnnMode::DistanceWeighted, 3, 3.0);
    }
    settings
}

fn random_instance(rng: &mut StdRng, n: usize, dalpha: f64, capacity: f64) -> Result<Instance> {
    let mus: Vec<f64> = (0..n).map(|_| rng.gen_range(0.1..2.0)).collect();
    let bs: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..3.0)).collect();
    Instance::new(mus, bs, dalpha, capacity).context("generated instance rejected")
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.items == 0 || args.items > 24 {
        bail!("--items must be between 1 and 24 for the enumeration backend");
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let time_limit = Duration::from_millis(args.time_limit_ms);

    let mut totals = Tally::default();
    let started = Instant::now();

    for inst_no in 0..args.instances {
        let instance = random_instance(&mut rng, args.items, args.dalpha, args.capacity)?;
        let mut pricer = Pricer::new(instance, settings(&args), EnumerationBackend::new());

        for _ in 0..args.calls {
            let rewards: Vec<f64> = (0..args.items).map(|_| rng.gen_range(0.0..5.0)).collect();
            let outcome = pricer.price(&rewards, args.target, time_limit)?;
            totals.count(outcome.sol_type);
        }
        info!(
            "instance {}: {} heuristic / {} exact columns so far",
            inst_no,
            pricer.stats().cols_heur,
            pricer.stats().cols_exact
        );
        totals.absorb(pricer.stats());
    }

    let elapsed = started.elapsed();
    let calls = args.instances * args.calls;
    println!("pricing calls      {}", calls);
    println!("  heuristic        {}", totals.heur);
    println!("  exact feasible   {}", totals.exact);
    println!("  infeasible       {}", totals.infeasible);
    println!("  unknown          {}", totals.unknown);
    println!("columns (heur)     {}", totals.cols_heur);
    println!("columns (exact)    {}", totals.cols_exact);
    println!("time total         {:.3}s", elapsed.as_secs_f64());
    println!("  heuristic        {:.3}s", totals.time_heur.as_secs_f64());
    println!("  exact            {:.3}s", totals.time_exact.as_secs_f64());
    println!("  backend          {:.3}s", totals.time_backend.as_secs_f64());
    println!("  warm start       {:.3}s", totals.time_knn.as_secs_f64());
    Ok(())
}

#[derive(Default)]
struct Tally {
    heur: u64,
    exact: u64,
    infeasible: u64,
    unknown: u64,
    cols_heur: u64,
    cols_exact: u64,
    time_heur: Duration,
    time_exact: Duration,
    time_backend: Duration,
    time_knn: Duration,
}

impl Tally {
    fn count(&mut self, sol_type: SolType) {
        match sol_type {
            SolType::FeasibleHeur => self.heur += 1,
            SolType::FeasibleExact | SolType::Optimal => self.exact += 1,
            SolType::Infeasible => self.infeasible += 1,
            _ => self.unknown += 1,
        }
    }

    fn absorb(&mut self, stats: &PricingStats) {
        self.cols_heur += stats.cols_heur;
        self.cols_exact += stats.cols_exact;
        self.time_heur += stats.time_heur;
        self.time_exact += stats.time_exact;
        self.time_backend += stats.time_backend;
        self.time_knn += stats.time_knn;
    }
}
