use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashMap;

use crate::network::{Cpt, CptKey, Network, NetworkError, Node, Observation, Result};

/// Count every (configuration, state) pair starts from.
pub const LAPLACE_PSEUDOCOUNT: f64 = 1.0;

/// Estimate fresh CPTs for the structure of `structure` from `data`.
///
/// Only parents and state lists of `structure` are read; its CPT values
/// are ignored and left untouched. Every parent configuration gets a row,
/// observed or not, so an empty dataset yields uniform distributions.
/// Nodes are estimated in parallel.
pub fn learn_parameters(structure: &Network, data: &[Observation]) -> Result<Network> {
    let nodes = structure
        .nodes()
        .par_iter()
        .map(|node| {
            let cpt = estimate_cpt(structure, node, data)?;
            Ok(node.clone().with_cpt(cpt))
        })
        .collect::<Result<Vec<Node>>>()?;
    info!(
        "Learned {} CPTs from {} observations",
        nodes.len(),
        data.len()
    );
    Network::from_nodes(nodes)
}

/// Laplace-smoothed CPT of a single node.
pub fn estimate_cpt(structure: &Network, node: &Node, data: &[Observation]) -> Result<Cpt> {
    let states = node.states().len();
    let mut counts: HashMap<CptKey, Vec<f64>> = structure
        .key_space(node)?
        .into_iter()
        .map(|key| (key, vec![LAPLACE_PSEUDOCOUNT; states]))
        .collect();

    for observation in data {
        let key = node.key_for(observation)?;
        let value = observation.get(node.name()).ok_or_else(|| {
            NetworkError::Lookup(format!("observation has no value for '{}'", node.name()))
        })?;
        let state = node.state_index(value).ok_or_else(|| {
            NetworkError::Lookup(format!("'{}' is not a state of '{}'", value, node.name()))
        })?;
        let row = counts.get_mut(&key).ok_or_else(|| {
            NetworkError::Lookup(format!(
                "observation configuration {} is outside the key space of '{}'",
                key,
                node.name()
            ))
        })?;
        row[state] += 1.0;
    }

    debug!("{}: {} parent configurations", node.name(), counts.len());
    Ok(counts
        .into_iter()
        .map(|(key, row)| {
            let total: f64 = row.iter().sum();
            (key, row.into_iter().map(|c| c / total).collect::<Vec<f64>>())
        })
        .collect())
}
