//! Divergences between discrete distributions and between whole networks.
//!
//! All logarithms are natural, so results are in nats. Before any ratio
//! is taken both distributions are clamped to `PROBABILITY_FLOOR`, which
//! keeps the result finite when a probability is exactly zero at the cost
//! of a slight bias toward zero for sparse distributions.

use log::debug;
use ndarray::{Array1, ArrayView1};
use serde::Serialize;

use crate::network::{Network, NetworkError, Result};

pub const PROBABILITY_FLOOR: f64 = 1e-10;

fn clamped(p: &[f64]) -> Array1<f64> {
    ArrayView1::from(p).mapv(|v| v.max(PROBABILITY_FLOOR))
}

fn kl(p: &Array1<f64>, q: &Array1<f64>) -> f64 {
    (p * &(p / q).mapv(f64::ln)).sum()
}

fn same_length(p: &[f64], q: &[f64]) -> Result<()> {
    if p.len() != q.len() {
        return Err(NetworkError::Lookup(format!(
            "cannot compare distributions of {} and {} probabilities",
            p.len(),
            q.len()
        )));
    }
    Ok(())
}

/// `sum_i p_i * ln(p_i / q_i)` over floored distributions.
///
/// Distributions of different lengths are a `Lookup` error.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> Result<f64> {
    same_length(p, q)?;
    Ok(kl(&clamped(p), &clamped(q)))
}

/// Jensen-Shannon divergence: mean KL of `p` and `q` against their average.
pub fn js_divergence(p: &[f64], q: &[f64]) -> Result<f64> {
    same_length(p, q)?;
    let p = clamped(p);
    let q = clamped(q);
    let m = (&p + &q) * 0.5;
    Ok(0.5 * kl(&p, &m) + 0.5 * kl(&q, &m))
}

/// Divergence summary for one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDivergence {
    pub node: String,
    /// JS divergence of each CPT row, in the reference row order.
    pub rows: Vec<f64>,
}

impl NodeDivergence {
    pub fn mean(&self) -> f64 {
        if self.rows.is_empty() {
            0.0
        } else {
            self.rows.iter().sum::<f64>() / self.rows.len() as f64
        }
    }
}

/// JS divergence of every CPT row of `reference` against the matching row
/// of `candidate`, grouped by node.
///
/// The two networks must share structure. A node or row of `reference`
/// missing from `candidate` is a `Lookup` error.
pub fn node_divergences(reference: &Network, candidate: &Network) -> Result<Vec<NodeDivergence>> {
    reference
        .nodes()
        .iter()
        .map(|node| {
            let other = candidate.require_node(node.name())?;
            let rows = node
                .cpt()
                .iter()
                .map(|(key, p)| {
                    let q = other.distribution(key)?;
                    if p.len() != q.len() {
                        return Err(NetworkError::Lookup(format!(
                            "row {} of '{}' has {} probabilities in one network and {} in the other",
                            key,
                            node.name(),
                            p.len(),
                            q.len()
                        )));
                    }
                    js_divergence(p, q)
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok(NodeDivergence {
                node: node.name().to_string(),
                rows,
            })
        })
        .collect()
}

/// Mean JS divergence over every CPT row of every node; 0 when there are
/// no rows at all.
pub fn mean_js_divergence(reference: &Network, candidate: &Network) -> Result<f64> {
    let per_node = node_divergences(reference, candidate)?;
    let mean = overall_mean(&per_node);
    debug!("Mean JS divergence over {} nodes: {}", per_node.len(), mean);
    Ok(mean)
}

/// Mean over all rows of all nodes, each row weighted equally.
pub fn overall_mean(per_node: &[NodeDivergence]) -> f64 {
    let (total, rows) = per_node.iter().fold((0.0, 0usize), |(total, rows), node| {
        (total + node.rows.iter().sum::<f64>(), rows + node.rows.len())
    });
    if rows == 0 { 0.0 } else { total / rows as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Cpt, CptKey, Node};

    #[test]
    fn test_kl_of_identical_is_zero() {
        let p = [0.2, 0.5, 0.3];
        assert!(kl_divergence(&p, &p).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_kl_known_value() {
        let p = [0.5, 0.5];
        let q = [0.25, 0.75];
        let expected = 0.5 * (0.5f64 / 0.25).ln() + 0.5 * (0.5f64 / 0.75).ln();
        assert!((kl_divergence(&p, &q).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_kl_stays_finite_with_zeros() {
        let value = kl_divergence(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(value.is_finite());
        assert!(value > 0.0);
    }

    #[test]
    fn test_js_is_symmetric_and_bounded() {
        let p = [0.9, 0.1];
        let q = [0.2, 0.8];
        let forward = js_divergence(&p, &q).unwrap();
        assert!((forward - js_divergence(&q, &p).unwrap()).abs() < 1e-12);
        assert!(forward > 0.0);
        assert!(js_divergence(&[1.0, 0.0], &[0.0, 1.0]).unwrap() <= 2f64.ln() + 1e-9);
        assert!(js_divergence(&p, &p).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_lookup_error() {
        assert!(matches!(
            kl_divergence(&[0.5, 0.5], &[1.0]),
            Err(NetworkError::Lookup(_))
        ));
        assert!(matches!(
            js_divergence(&[0.2, 0.8], &[0.1, 0.3, 0.6]),
            Err(NetworkError::Lookup(_))
        ));
    }

    fn network(a: [f64; 2], b_yes: [f64; 2], b_no: [f64; 2]) -> Network {
        Network::from_nodes([
            Node::new("A", ["yes", "no"]).with_cpt(Cpt::from_iter([(CptKey::Root, a.to_vec())])),
            Node::new("B", ["yes", "no"]).with_parents(["A"]).with_cpt(Cpt::from_iter([
                (CptKey::config(["yes"]), b_yes.to_vec()),
                (CptKey::config(["no"]), b_no.to_vec()),
            ])),
        ])
        .unwrap()
    }

    #[test]
    fn test_mean_over_all_rows() {
        let reference = network([0.3, 0.7], [0.8, 0.2], [0.1, 0.9]);
        let candidate = network([0.5, 0.5], [0.8, 0.2], [0.1, 0.9]);
        let expected = js_divergence(&[0.3, 0.7], &[0.5, 0.5]).unwrap() / 3.0;
        let mean = mean_js_divergence(&reference, &candidate).unwrap();
        assert!((mean - expected).abs() < 1e-12);
        assert_eq!(mean_js_divergence(&reference, &reference).unwrap(), 0.0);

        let per_node = node_divergences(&reference, &candidate).unwrap();
        assert_eq!(per_node.len(), 2);
        assert_eq!(per_node[1].mean(), 0.0);
    }

    #[test]
    fn test_missing_row_is_lookup_error() {
        let reference = network([0.3, 0.7], [0.8, 0.2], [0.1, 0.9]);
        let candidate = Network::from_nodes([
            Node::new("A", ["yes", "no"])
                .with_cpt(Cpt::from_iter([(CptKey::Root, vec![0.3, 0.7])])),
            Node::new("B", ["yes", "no"])
                .with_parents(["A"])
                .with_cpt(Cpt::from_iter([(CptKey::config(["yes"]), vec![0.8, 0.2])])),
        ])
        .unwrap();
        assert!(matches!(
            mean_js_divergence(&reference, &candidate),
            Err(NetworkError::Lookup(_))
        ));
    }

    #[test]
    fn test_empty_network_is_zero() {
        assert_eq!(mean_js_divergence(&Network::new(), &Network::new()).unwrap(), 0.0);
    }
}
