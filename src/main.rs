use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use craftsim::{Catalog, Scenario, SimulationReliabilityReport, SimulationResult};

#[derive(Debug, Parser)]
#[command(name = "craftsim", version)]
#[command(about = "Simulate a crafting rotation and estimate how reliably it succeeds")]
struct Args {
    /// Scenario file: recipe, gear, consumables, rotation, HQ ingredients
    scenario: PathBuf,

    /// Number of reliability trials (overrides the scenario)
    #[arg(long)]
    trials: Option<usize>,

    /// Seed for the random rolls (overrides the scenario)
    #[arg(long)]
    seed: Option<u64>,

    /// Safety ceiling on applied steps (overrides the scenario)
    #[arg(long)]
    max_steps: Option<u32>,

    /// Treat every roll as a success
    #[arg(long)]
    linear: bool,

    /// Print every step of the single run
    #[arg(long)]
    trace: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    result: &'a SimulationResult,
    report: Option<&'a SimulationReliabilityReport>,
}

fn load_scenario(args: &Args) -> Result<Scenario> {
    let raw = fs::read_to_string(&args.scenario)
        .with_context(|| format!("failed to read {}", args.scenario.display()))?;
    let mut scenario = Scenario::from_json(&raw)
        .with_context(|| format!("failed to parse {}", args.scenario.display()))?;
    if let Some(trials) = args.trials {
        scenario.options.trials = trials;
    }
    if args.seed.is_some() {
        scenario.options.seed = args.seed;
    }
    if let Some(max_steps) = args.max_steps {
        scenario.options.max_steps = max_steps;
    }
    scenario.options.assume_success |= args.linear;
    Ok(scenario)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    let scenario = load_scenario(&args)?;
    let catalog = Catalog::for_level(scenario.gear.level);
    let mut simulation = scenario.simulation(&catalog).context("invalid scenario")?;

    let result = simulation.run(args.trace || args.json);
    // a failing rotation is not worth a reliability pass
    let report = if result.success && simulation.options().trials > 0 {
        Some(simulation.get_reliability_report())
    } else {
        None
    };

    if args.json {
        let output = Output { result: &result, report: report.as_ref() };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let ctx = simulation.context();
    println!("Prog/100: {}", ctx.base_progress);
    println!("Qual/100: {}", ctx.base_quality);
    println!("Starting quality: {}", simulation.starting_quality());
    if args.trace {
        for (index, step) in result.steps.iter().enumerate() {
            println!("{:02} {}", index + 1, step);
        }
    }
    let verdict = if result.success { "success" } else { "failure" };
    println!("{:?}: {}", result.reason, verdict);
    println!("Progress: {}/{}", result.state.progress, simulation.recipe().progress);
    println!(
        "Quality: {}/{} ({}% HQ)",
        result.state.quality,
        simulation.recipe().quality,
        result.hq_percent
    );
    println!("Durability: {}, CP: {}", result.state.durability, result.state.cp);
    if let Some(report) = report {
        println!("Trials: {}", report.trials);
        println!("Success: {:.1}%", report.success_rate * 100.);
        let quality = &report.quality;
        println!(
            "Quality: min {} / median {} / max {} (p10 {}, p90 {})",
            quality.min, quality.median, quality.max, quality.p10, quality.p90
        );
        let hq = &report.hq_percent;
        println!("HQ: min {}% / median {}% / max {}%", hq.min, hq.median, hq.max);
    }
    println!("{}ms", start.elapsed().as_millis());
    Ok(())
}
