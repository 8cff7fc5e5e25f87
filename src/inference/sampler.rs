use log::trace;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use std::collections::HashSet;

use super::topology::topological_order;
use crate::network::{Network, NetworkError, Node, Observation, Result};

/// Draws joint observations from a network by ancestral sampling.
///
/// The sampler only reads the network; every draw is independent of the
/// previous ones apart from the random generator it is handed.
pub struct AncestralSampler<'a> {
    network: &'a Network,
    order: Vec<&'a Node>,
}

impl<'a> AncestralSampler<'a> {
    /// Creates a sampler, computing the topological order itself
    pub fn new(network: &'a Network) -> Result<Self> {
        let order = topological_order(network)?;
        Self::with_order(network, &order)
    }

    /// Creates a sampler that visits nodes in the given order.
    ///
    /// The order must list every node once with parents before children;
    /// `topological_order` produces one.
    pub fn with_order(network: &'a Network, order: &[String]) -> Result<Self> {
        if order.len() != network.len() {
            return Err(NetworkError::Lookup(format!(
                "order lists {} nodes but the network has {}",
                order.len(),
                network.len()
            )));
        }
        let mut listed = HashSet::with_capacity(order.len());
        let order = order
            .iter()
            .map(|name| {
                if !listed.insert(name.as_str()) {
                    return Err(NetworkError::Lookup(format!(
                        "node '{}' appears more than once in the sampling order",
                        name
                    )));
                }
                network.require_node(name)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(AncestralSampler { network, order })
    }

    pub fn network(&self) -> &'a Network {
        self.network
    }

    /// Draw one joint observation.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Observation> {
        let mut observation = Observation::with_capacity(self.order.len());
        for node in &self.order {
            let key = node.key_for(&observation)?;
            let distribution = node.distribution(&key)?;
            let state = draw_state(node, distribution, rng)?;
            trace!("{} | {} -> {}", node.name(), key, state);
            observation.insert(node.name().to_string(), state.to_string());
        }
        Ok(observation)
    }

    /// Lazily draw `n` independent observations.
    pub fn samples<'s, R: Rng + ?Sized>(
        &'s self,
        rng: &'s mut R,
        n: usize,
    ) -> impl Iterator<Item = Result<Observation>> + 's {
        (0..n).map(move |_| self.sample(&mut *rng))
    }

    /// Draw `n` observations, stopping at the first failure.
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<Observation>> {
        self.samples(rng, n).collect()
    }
}

fn draw_state<'n, R: Rng + ?Sized>(
    node: &'n Node,
    distribution: &[f64],
    rng: &mut R,
) -> Result<&'n str> {
    if distribution.len() != node.states().len() {
        return Err(NetworkError::Lookup(format!(
            "node '{}' has {} states but its CPT row has {} probabilities",
            node.name(),
            node.states().len(),
            distribution.len()
        )));
    }
    let index = WeightedIndex::new(distribution).map_err(|e| {
        NetworkError::Format(format!(
            "cannot sample '{}' from {:?}: {}",
            node.name(),
            distribution,
            e
        ))
    })?;
    Ok(&node.states()[index.sample(rng)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Cpt, CptKey};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn two_node_network() -> Network {
        let a = Node::new("A", ["yes", "no"])
            .with_cpt(Cpt::from_iter([(CptKey::Root, vec![0.3, 0.7])]));
        let b = Node::new("B", ["yes", "no"]).with_parents(["A"]).with_cpt(Cpt::from_iter([
            (CptKey::config(["yes"]), vec![0.8, 0.2]),
            (CptKey::config(["no"]), vec![0.1, 0.9]),
        ]));
        Network::from_nodes([b, a]).unwrap()
    }

    #[test]
    fn test_samples_cover_every_node_with_valid_states() {
        let network = two_node_network();
        let sampler = AncestralSampler::new(&network).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for observation in sampler.sample_n(&mut rng, 200).unwrap() {
            assert_eq!(observation.len(), 2);
            for node in network.nodes() {
                let value = &observation[node.name()];
                assert!(node.states().contains(value));
            }
        }
    }

    #[test]
    fn test_frequencies_follow_cpt() {
        let network = two_node_network();
        let sampler = AncestralSampler::new(&network).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let n = 20_000;
        let data = sampler.sample_n(&mut rng, n).unwrap();
        let a_yes = data.iter().filter(|o| o["A"] == "yes").count() as f64 / n as f64;
        assert!((a_yes - 0.3).abs() < 0.02, "P(A=yes) estimated as {}", a_yes);

        let given_no: Vec<_> = data.iter().filter(|o| o["A"] == "no").collect();
        let b_yes = given_no.iter().filter(|o| o["B"] == "yes").count() as f64
            / given_no.len() as f64;
        assert!((b_yes - 0.1).abs() < 0.02, "P(B=yes|A=no) estimated as {}", b_yes);
    }

    #[test]
    fn test_degenerate_distribution_is_deterministic() {
        let a = Node::new("A", ["on", "off"])
            .with_cpt(Cpt::from_iter([(CptKey::Root, vec![0.0, 1.0])]));
        let network = Network::from_nodes([a]).unwrap();
        let sampler = AncestralSampler::new(&network).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sampler.samples(&mut rng, 50).all(|o| o.unwrap()["A"] == "off"));
    }

    #[test]
    fn test_missing_row_is_lookup_error() {
        let a = Node::new("A", ["yes", "no"])
            .with_cpt(Cpt::from_iter([(CptKey::Root, vec![0.0, 1.0])]));
        let b = Node::new("B", ["yes", "no"])
            .with_parents(["A"])
            .with_cpt(Cpt::from_iter([(CptKey::config(["yes"]), vec![0.5, 0.5])]));
        let network = Network::from_nodes([a, b]).unwrap();
        let sampler = AncestralSampler::new(&network).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(sampler.sample(&mut rng), Err(NetworkError::Lookup(_))));
    }

    #[test]
    fn test_cyclic_network_cannot_be_sampled() {
        let nodes = [
            Node::new("A", ["t", "f"]).with_parents(["B"]),
            Node::new("B", ["t", "f"]).with_parents(["A"]),
        ];
        let network = Network::from_nodes(nodes).unwrap();
        assert!(matches!(
            AncestralSampler::new(&network),
            Err(NetworkError::Cycle { .. })
        ));
    }

    #[test]
    fn test_order_with_repeated_node_is_rejected() {
        let network = two_node_network();
        let order = vec!["A".to_string(), "A".to_string()];
        assert!(matches!(
            AncestralSampler::with_order(&network, &order),
            Err(NetworkError::Lookup(_))
        ));

        let order = vec!["A".to_string(), "B".to_string()];
        let sampler = AncestralSampler::with_order(&network, &order).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(sampler.sample(&mut rng).unwrap().len(), 2);
    }

    #[test]
    fn test_same_seed_same_samples() {
        let network = two_node_network();
        let sampler = AncestralSampler::new(&network).unwrap();
        let first = sampler.sample_n(&mut StdRng::seed_from_u64(9), 100).unwrap();
        let second = sampler.sample_n(&mut StdRng::seed_from_u64(9), 100).unwrap();
        assert_eq!(first, second);
    }
}
