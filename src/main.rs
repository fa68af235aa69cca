extern crate tracegibbs;
extern crate tracing;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::LevelFilter as VerbLevel;
use clap_verbosity_flag::Verbosity;
use std::error::Error;
use tracegibbs::inference::GibbsSampler;
use tracegibbs::models;
use tracegibbs::pipeline::*;
use tracegibbs::trace::Trace;
use tracegibbs::utils::render::renderenv;
use tracegibbs::{Env, VarName};
use tracing::{debug, info, Level};
use tracing_subscriber::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Model {
    Chain,
    Coins,
    Grid,
    Gmm,
    GmmLoop,
    Imm,
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long, value_enum)]
    model: Model,

    /// variables to build conditionals for, e.g. `z` or `z[2]`
    #[clap(short, long, value_parser)]
    target: String,

    #[clap(short, long, value_parser)]
    rng: Option<u64>,

    /// Gibbs sweeps to run after printing the conditionals
    #[clap(short, long, value_parser, default_value_t = 0)]
    steps: usize,

    /// print the extracted graph
    #[clap(short, long)]
    graph: bool,

    /// refuse the new-cluster approximation for clustering variables
    #[clap(long)]
    strict: bool,

    // -q silences output, -v shows info, -vv debug, -vvv trace
    #[command(flatten)]
    verbose: Verbosity,
}

fn verbosity_to_tracing(lvl: VerbLevel) -> Level {
    match lvl {
        VerbLevel::Off => Level::WARN,
        VerbLevel::Error => Level::WARN,
        VerbLevel::Warn => Level::WARN,
        VerbLevel::Info => Level::INFO,
        VerbLevel::Debug => Level::DEBUG,
        VerbLevel::Trace => Level::TRACE,
    }
}
fn setup_tracing(lvl: Level) {
    let format = fmt::format()
        .with_level(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .without_time()
        .compact();

    tracing_subscriber::fmt()
        .with_max_level(lvl)
        .event_format(format)
        .init();
}

const DATA: [f64; 6] = [-2.1, -1.9, -2.4, 1.8, 2.2, 2.0];
const FLIPS: [bool; 3] = [true, true, false];

fn record(model: Model, seed: u64) -> tracegibbs::Result<Trace> {
    match model {
        Model::Chain => models::chain(1.4, seed),
        Model::Coins => models::bernoulli_chain(FLIPS, seed),
        Model::Grid => models::bernoulli_grid(FLIPS, seed),
        Model::Gmm => models::gmm(&DATA, 2, seed),
        Model::GmmLoop => models::gmm_loop(&DATA, 2, seed),
        Model::Imm => models::imm(&DATA, 1.0, seed),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let lvl = verbosity_to_tracing(args.verbose.log_level_filter());
    setup_tracing(lvl);
    info!("      Model: {:?}", args.model);
    info!("     Target: {}", args.target);
    info!("       Seed: {:?}", args.rng);
    info!("Debug level: {:?}", lvl);

    let opts = Options::new(args.rng, !args.strict);
    let target: VarName = args.target.parse()?;
    let trace = record(args.model, args.rng.unwrap_or(0))?;
    debug!("trace of {} nodes", trace.size());

    let graph = extract_graph(&trace)?;
    if args.graph {
        println!("{}", graph);
    }
    let env = Env::from_graph(&graph);
    println!("{}", renderenv(&env));

    let conds = conditionals_for(&graph, &target)?;
    if conds.is_empty() {
        return Err(format!("no random variable matches {}", target).into());
    }
    for cond in conds.values() {
        print!("{}", cond);
        match cond.evaluate_with(&env, &opts) {
            Ok(c) => println!("  = {}", c),
            Err(e) if !e.is_structural() => println!("  ! {}", e),
            Err(e) => return Err(e.into()),
        }
    }

    if args.steps > 0 {
        let mut sampler = GibbsSampler::new(conds.into_values(), opts);
        for (i, env) in sampler.run(env, args.steps)?.iter().enumerate() {
            println!("{:>4}: {}", i, renderenv(env));
        }
    }
    Ok(())
}
