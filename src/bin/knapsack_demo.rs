//! Random multiple-choice knapsack problems, solved and reported.
//!
//! A diagnostic binary for the solver: generates a mix of forced burdens,
//! binary choices, and multi-option decisions, then prints solution
//! statistics and solver internals.
//!
//! Usage:
//! ```bash
//! cargo run --bin knapsack_demo -- --decisions 100 --precision 50 --rounds 3
//! ```

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use frametune::{init_logging, Decision, Item, LogConfig, ScalarEconomy, Solver};

#[derive(Parser)]
#[command(name = "knapsack_demo")]
#[command(version, about = "Random multiple-choice knapsack workout", long_about = None)]
struct Cli {
    /// Number of decisions per generated problem
    #[arg(long, default_value = "100")]
    decisions: usize,

    /// Solver precision (clamped to at least 4)
    #[arg(long, default_value = "50")]
    precision: usize,

    /// Number of problems to generate and solve
    #[arg(long, default_value = "1")]
    rounds: usize,

    /// RNG seed; omit for a random one
    #[arg(long)]
    seed: Option<u64>,

    /// Print every decision and its chosen option
    #[arg(long)]
    verbose: bool,
}

type ScalarDecision = Decision<ScalarEconomy>;

fn random_burden(rng: &mut StdRng) -> f64 {
    rng.gen::<f64>() * rng.gen_range(0.0..100.0)
}

fn random_value(rng: &mut StdRng) -> f64 {
    rng.gen::<f64>() * rng.gen_range(0.0..100.0)
}

fn generate_problem(rng: &mut StdRng, count: usize) -> Vec<ScalarDecision> {
    let mut decisions = Vec::with_capacity(count);
    for _ in 0..count {
        let decision = match rng.gen_range(0..8) {
            // Forced burden: no actual choice.
            0 => ScalarDecision::from_items([Item::new(random_burden(rng), 0.0)]),

            // Binary on/off.
            1..=3 => ScalarDecision::from_items([
                Item::new(0.0, 0.0),
                Item::new(random_burden(rng), random_value(rng)),
            ]),

            // Multiple choice with cumulative burden and value (orderly).
            4..=6 => {
                let mut decision = ScalarDecision::new();
                let mut burden = 0.0;
                let mut value = 0.0;
                for _ in 0..rng.gen_range(2..=16) {
                    burden += random_burden(rng);
                    value += random_value(rng);
                    decision.push(burden, value);
                }
                decision
            }

            // Multiple choice, chaotic.
            _ => {
                let mut decision = ScalarDecision::new();
                for _ in 0..rng.gen_range(2..=16) {
                    decision.push(random_burden(rng), random_value(rng));
                }
                decision
            }
        };
        decisions.push(decision);
    }
    decisions
}

fn main() {
    let cli = Cli::parse();
    let _guard = init_logging(&LogConfig::default());

    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    println!("seed: {seed}");

    let mut solver = Solver::<ScalarEconomy>::new();

    for round in 0..cli.rounds {
        let mut decisions = generate_problem(&mut rng, cli.decisions);
        let capacity: f64 = (0..decisions.len()).map(|_| random_burden(&mut rng)).sum();
        let total_options: usize = decisions.iter().map(|d| d.len()).sum();

        println!("\nround {round}:");
        println!("  decisions: {}", decisions.len());
        println!("  total options: {total_options}");
        println!(
            "  mean options per decision: {:.2}",
            total_options as f64 / decisions.len() as f64
        );
        println!("  burden limit: #{capacity:.2}");
        println!("  precision: {}", cli.precision);

        let feasible = solver.solve(&mut decisions, &capacity, cli.precision);
        let stats = solver.stats();

        println!("  solver:");
        println!("    iterations: {}", stats.iterations);
        println!("    frontier entries: {}", solver.table_len());
        println!("    value scale: {:.4}", stats.value_to_score_scale);
        println!("  solution ({}):", if feasible { "feasible" } else { "over capacity" });
        println!(
            "    min-burden: (#{:.2} ${:.2})",
            stats.lightest.net_burden, stats.lightest.net_value
        );
        println!(
            "    max-value:  (#{:.2} ${:.2})",
            stats.highest.net_burden, stats.highest.net_value
        );
        println!(
            "    chosen:     (#{:.2} ${:.2} @{})",
            stats.chosen.net_burden, stats.chosen.net_value, stats.chosen.net_score
        );
        if stats.highest.net_value > 0.0 {
            println!(
                "    efficiency: (#{:.1}% ${:.1}%)",
                100.0 * stats.chosen.net_burden / stats.highest.net_burden,
                100.0 * stats.chosen.net_value / stats.highest.net_value
            );
        }

        if cli.verbose {
            for (index, decision) in decisions.iter().enumerate() {
                let chosen = decision.chosen();
                println!(
                    "    {index}: {}/{} (#{:.2} ${:.2})",
                    decision.choice(),
                    decision.len(),
                    chosen.burden,
                    chosen.value
                );
            }
        }
    }
}
