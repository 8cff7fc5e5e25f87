use std::fmt;

use super::model::{CptKey, Network, Node};
use crate::inference::topological_order;

impl fmt::Display for Network {
    /// Prints every node with its parents and CPT, parents first. Falls back
    /// to declaration order when the graph has a cycle.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bayesian network with {} nodes", self.len())?;
        let ordered: Vec<&Node> = match topological_order(self) {
            Ok(order) => order.iter().filter_map(|name| self.node(name)).collect(),
            Err(e) => {
                writeln!(f, "({}; using declaration order)", e)?;
                self.nodes().iter().collect()
            }
        };
        for node in ordered {
            writeln!(f)?;
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} ---", self.name())?;
        if self.is_root() {
            writeln!(f, "  parents: none (root)")?;
        } else {
            writeln!(f, "  parents: {}", self.parents().join(", "))?;
        }
        writeln!(f, "  states: {}", self.states().join(", "))?;
        if self.cpt().is_empty() {
            return writeln!(f, "  CPT: empty");
        }
        writeln!(f, "  CPT:")?;
        for (key, probabilities) in self.cpt().iter() {
            let condition = condition_label(self, key);
            for (state, p) in self.states().iter().zip(probabilities) {
                writeln!(f, "    P({}={}{}) = {:.4}", self.name(), state, condition, p)?;
            }
        }
        Ok(())
    }
}

fn condition_label(node: &Node, key: &CptKey) -> String {
    match key {
        CptKey::Root => String::new(),
        CptKey::Config(values) => {
            let pairs: Vec<String> = node
                .parents()
                .iter()
                .zip(values)
                .map(|(parent, value)| format!("{}={}", parent, value))
                .collect();
            format!(" | {}", pairs.join(", "))
        }
    }
}
