use anyhow::{Context, Result};
use bayeslearn::common::setup::{OutputFormat, parse_configuration_options};
use bayeslearn::inference::AncestralSampler;
use bayeslearn::learning::{NodeDivergence, learn_parameters, node_divergences, overall_mean};
use bayeslearn::network::Network;
use colored::Colorize;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::PathBuf;

/// One point of the learning curve.
#[derive(Serialize)]
struct CurvePoint {
    samples: usize,
    mean_js_divergence: f64,
    nodes: Vec<NodeDivergence>,
}

#[derive(Serialize)]
struct Report {
    network: PathBuf,
    seed: Option<u64>,
    curve: Vec<CurvePoint>,
}

fn main() -> Result<()> {
    let options = parse_configuration_options()?;
    let network = Network::from_file(&options.network)
        .with_context(|| format!("Failed to load {}", options.network.display()))?;
    if options.print_network {
        println!("{}", network);
    }

    let sampler = AncestralSampler::new(&network).context("Network cannot be sampled")?;
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let structure = network.structure();

    let mut curve = Vec::with_capacity(options.sizes.len());
    for &samples in &options.sizes {
        info!("Running experiment for n = {}", samples);
        let data = sampler
            .sample_n(&mut rng, samples)
            .with_context(|| format!("Sampling {} observations failed", samples))?;
        let learned = learn_parameters(&structure, &data)?;
        let nodes = node_divergences(&network, &learned)?;
        let point = CurvePoint {
            samples,
            mean_js_divergence: overall_mean(&nodes),
            nodes,
        };
        if options.output_format == OutputFormat::Text {
            print_point(&point);
        }
        curve.push(point);
    }

    if options.output_format == OutputFormat::Json {
        let report = Report {
            network: options.network.clone(),
            seed: options.seed,
            curve,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn print_point(point: &CurvePoint) {
    println!(
        "{} n = {:>7}  mean JS divergence = {}",
        "●".green(),
        point.samples,
        format!("{:.6}", point.mean_js_divergence).bold()
    );
    let worst = point
        .nodes
        .iter()
        .max_by(|a, b| a.mean().total_cmp(&b.mean()));
    if let Some(worst) = worst {
        println!(
            "    worst node: {} ({:.6})",
            worst.node.yellow(),
            worst.mean()
        );
    }
}
