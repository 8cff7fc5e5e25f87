use anyhow::{Context, Result};
use bayeslearn::common::setup::parse_sample_options;
use bayeslearn::inference::AncestralSampler;
use bayeslearn::network::Network;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

fn main() -> Result<()> {
    let options = parse_sample_options()?;
    let network = Network::from_file(&options.network)
        .with_context(|| format!("Failed to load {}", options.network.display()))?;
    let sampler = AncestralSampler::new(&network)?;
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for observation in sampler.samples(&mut rng, options.count) {
        // Sorted keys keep the lines diffable across runs.
        let line: BTreeMap<_, _> = observation?.into_iter().collect();
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}
