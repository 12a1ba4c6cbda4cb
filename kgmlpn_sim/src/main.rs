//! KGML Petri Net Simulator CLI
//!
//! Load a KGML pathway, seed it with tokens, knock out nodes and fire it for
//! a number of steps.

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use kgmlpn_core::{KgmlLoader, NodeId, DEFAULT_PLACEHOLDER_THRESHOLD};
use kgmlpn_sim::scenarios::{parse_knockout, parse_marking, Directives, ScenarioId};
use kgmlpn_sim::{PathwaySnapshot, RunResult, ScenarioRunner, SimConfig, SimContext, SimWorld};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// KGML pathway Petri net simulator
#[derive(Parser, Debug)]
#[command(name = "kgmlpn-sim")]
#[command(about = "Fire a KEGG pathway as a token-based Petri net", long_about = None)]
struct Args {
    /// KGML file to load
    file: PathBuf,

    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Steps to fire
    #[arg(short = 'n', long, default_value = "10")]
    steps: u64,

    /// Scenario to run (tlr_stimulus, tlr_knockout, custom, all)
    #[arg(short = 'S', long, default_value = "custom")]
    scenario: String,

    /// Extra tokens as ID=TOKENS (repeatable)
    #[arg(short, long, value_parser = parse_marking)]
    mark: Vec<(NodeId, u64)>,

    /// Extra knockouts as LABEL=ID (repeatable)
    #[arg(short, long, value_parser = parse_knockout)]
    knockout: Vec<(String, NodeId)>,

    /// Relations referencing ids above this are placeholders and dropped
    #[arg(long, default_value_t = DEFAULT_PLACEHOLDER_THRESHOLD)]
    threshold: u32,

    /// Number of seeds to run; extra seeds are derived from --seed
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output (logs the active marking after every step)
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Write the final pathway state as JSON for a renderer
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for --json
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let pathway = KgmlLoader::new()
        .with_placeholder_threshold(args.threshold)
        .load_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    info!(
        "Loaded {} ({} nodes, {} transitions)",
        pathway.meta().title.as_deref().unwrap_or(&pathway.meta().source),
        pathway.node_count(),
        pathway.transitions().len()
    );

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse::<ScenarioId>().map_err(|e| anyhow!(e))?]
    };

    let directives = Directives {
        marking: args.mark.clone(),
        knockouts: args.knockout.clone(),
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .context("System clock is before the Unix epoch")?
            .as_nanos() as u64
    } else {
        args.seed
    };

    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 || args.seeds > 1 {
            bail!("--export only supports a single scenario and seed");
        }

        let config = SimConfig {
            seed: base_seed,
            max_steps: args.steps,
            verbose: args.verbose,
        };
        let mut all = scenarios[0].directives();
        all.extend(directives);

        let mut world = SimWorld::new(pathway, config);
        world.apply(&all)?;
        world.run()?;

        PathwaySnapshot::capture(world.pathway())
            .write_to_file(export_path)
            .with_context(|| format!("Failed to write {}", export_path.display()))?;
        info!("Exported step {} to {}", world.tick_count(), export_path.display());
        info!("Active: {}", world.pathway().describe_active());
        return Ok(());
    }

    let base = SimContext::new(base_seed);
    let mut all_results: Vec<RunResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        // The first run keeps the seed as given so it can be reproduced with --seed
        let seed = match seed_offset {
            0 => base_seed,
            n => base.derive(n as u64).seed(),
        };
        let runner = ScenarioRunner::new(seed)
            .with_steps(args.steps)
            .with_verbose(args.verbose);

        for scenario in &scenarios {
            let result = runner.run(&pathway, *scenario, &directives);

            if !args.json && !result.passed {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    scenario.name(),
                    seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
            all_results.push(result);
        }
    }

    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "pathway": pathway.meta(),
            "total": all_results.len(),
            "passed": all_results.len() - failed_count,
            "failed": failed_count,
            "results": all_results,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for result in all_results.iter().filter(|r| r.passed) {
            let holders: Vec<String> = result
                .metrics
                .final_holders
                .iter()
                .map(|h| format!("{} ({})", h.name, h.tokens))
                .collect();
            info!(
                "{} (seed={}) after {} steps: {}",
                result.scenario,
                result.seed,
                result.steps,
                holders.join(", ")
            );
        }

        if failed_count == 0 {
            info!("✅ All {} runs passed!", all_results.len());
        } else {
            error!("❌ {}/{} runs failed!", failed_count, all_results.len());
        }
    }

    if failed_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}
