use anyhow::{Context, Result};
use bayeslearn::common::setup::parse_network_path;
use bayeslearn::network::Network;
use colored::Colorize;

fn main() -> Result<()> {
    let path = parse_network_path()?;
    let network = Network::from_file(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    println!("{}", "=".repeat(50).blue());
    println!("  {}", path.display().to_string().bold());
    println!("{}", "=".repeat(50).blue());
    print!("{}", network);
    Ok(())
}
