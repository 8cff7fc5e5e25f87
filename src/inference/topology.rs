use std::collections::VecDeque;

use crate::network::{Network, NetworkError, Result};

/// Order the nodes so that every parent precedes its children (Kahn's
/// algorithm).
///
/// Ties are broken by declaration order, so repeated calls on the same
/// network return the same order. Fails with `Cycle` when some nodes can
/// never be released, listing them in declaration order.
pub fn topological_order(network: &Network) -> Result<Vec<String>> {
    let nodes = network.nodes();
    let mut in_degree: Vec<usize> = nodes.iter().map(|node| node.parents().len()).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (child, node) in nodes.iter().enumerate() {
        for parent in node.parents() {
            let parent = network.position(parent).ok_or_else(|| {
                NetworkError::Lookup(format!(
                    "node '{}' lists unknown parent '{}'",
                    node.name(),
                    parent
                ))
            })?;
            children[parent].push(child);
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &child in &children[current] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if order.len() < nodes.len() {
        let unordered = (0..nodes.len())
            .filter(|i| in_degree[*i] > 0)
            .map(|i| nodes[i].name().to_string())
            .collect();
        return Err(NetworkError::Cycle { unordered });
    }
    Ok(order.into_iter().map(|i| nodes[i].name().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Node;

    fn index_of(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_parents_come_first() {
        let nodes = [
            Node::new("D", ["t", "f"]).with_parents(["B", "C"]),
            Node::new("C", ["t", "f"]).with_parents(["A"]),
            Node::new("B", ["t", "f"]).with_parents(["A"]),
            Node::new("A", ["t", "f"]),
        ];
        let network = Network::from_nodes(nodes).unwrap();
        let order = topological_order(&network).unwrap();
        assert_eq!(order.len(), 4);
        for (parent, child) in network.edges() {
            assert!(index_of(&order, parent) < index_of(&order, child));
        }
    }

    #[test]
    fn test_roots_keep_declaration_order() {
        let nodes = [
            Node::new("Z", ["t", "f"]),
            Node::new("Y", ["t", "f"]),
            Node::new("X", ["t", "f"]).with_parents(["Z"]),
        ];
        let network = Network::from_nodes(nodes).unwrap();
        let first = topological_order(&network).unwrap();
        assert_eq!(first, vec!["Z", "Y", "X"]);
        assert_eq!(first, topological_order(&network).unwrap());
    }

    #[test]
    fn test_two_node_cycle() {
        let nodes = [
            Node::new("A", ["t", "f"]).with_parents(["B"]),
            Node::new("B", ["t", "f"]).with_parents(["A"]),
            Node::new("C", ["t", "f"]),
        ];
        let network = Network::from_nodes(nodes).unwrap();
        match topological_order(&network) {
            Err(NetworkError::Cycle { unordered }) => assert_eq!(unordered, vec!["A", "B"]),
            other => panic!("expected a cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop() {
        let network =
            Network::from_nodes([Node::new("A", ["t", "f"]).with_parents(["A"])]).unwrap();
        assert!(matches!(
            topological_order(&network),
            Err(NetworkError::Cycle { .. })
        ));
    }

    #[test]
    fn test_empty_network() {
        assert!(topological_order(&Network::new()).unwrap().is_empty());
    }
}
