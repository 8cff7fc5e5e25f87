use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::errors::{NetworkError, Result};

/// Label printed for the single configuration of a parentless node.
pub const NO_PARENTS: &str = "no-parents";

/// One joint observation: node name to the state it took.
pub type Observation = HashMap<String, String>;

/// Key of a CPT row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CptKey {
    /// The only configuration of a node without parents.
    Root,
    /// Parent state labels, in the node's parent order.
    Config(Vec<String>),
}

impl CptKey {
    pub fn config<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CptKey::Config(values.into_iter().map(Into::into).collect())
    }

    /// Parent values of the key; empty for `Root`.
    pub fn values(&self) -> &[String] {
        match self {
            CptKey::Root => &[],
            CptKey::Config(values) => values,
        }
    }
}

impl fmt::Display for CptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CptKey::Root => write!(f, "{}", NO_PARENTS),
            CptKey::Config(values) => write!(f, "({})", values.join(", ")),
        }
    }
}

/// Conditional probability table: one probability vector per parent
/// configuration, aligned with the owning node's `states`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cpt {
    rows: BTreeMap<CptKey, Vec<f64>>,
}

impl Cpt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, returning the row it replaced if any.
    pub fn insert(&mut self, key: CptKey, probabilities: Vec<f64>) -> Option<Vec<f64>> {
        self.rows.insert(key, probabilities)
    }

    pub fn get(&self, key: &CptKey) -> Option<&[f64]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &CptKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CptKey> {
        self.rows.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CptKey, &[f64])> {
        self.rows.iter().map(|(key, row)| (key, row.as_slice()))
    }
}

impl FromIterator<(CptKey, Vec<f64>)> for Cpt {
    fn from_iter<T: IntoIterator<Item = (CptKey, Vec<f64>)>>(iter: T) -> Self {
        Cpt {
            rows: iter.into_iter().collect(),
        }
    }
}

#[derive(Serialize)]
struct CptRow<'a> {
    key: &'a CptKey,
    probabilities: &'a [f64],
}

// JSON maps need string keys, so rows go out as a list.
impl Serialize for Cpt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.iter()
                .map(|(key, probabilities)| CptRow { key, probabilities }),
        )
    }
}

/// A discrete random variable of the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    name: String,
    parents: Vec<String>,
    states: Vec<String>,
    cpt: Cpt,
}

impl Node {
    /// Create a parentless node with an empty CPT
    pub fn new<I, S>(name: &str, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Node {
            name: name.to_string(),
            parents: Vec::new(),
            states: states.into_iter().map(Into::into).collect(),
            cpt: Cpt::new(),
        }
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the whole CPT.
    pub fn with_cpt(mut self, cpt: Cpt) -> Self {
        self.cpt = cpt;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn cpt(&self) -> &Cpt {
        &self.cpt
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    /// Distribution stored under `key`, or `Lookup` if the row is absent.
    pub fn distribution(&self, key: &CptKey) -> Result<&[f64]> {
        self.cpt.get(key).ok_or_else(|| {
            NetworkError::Lookup(format!("node '{}' has no CPT row for {}", self.name, key))
        })
    }

    /// Build the CPT key selected by the parent values in `assignment`.
    pub fn key_for(&self, assignment: &Observation) -> Result<CptKey> {
        if self.is_root() {
            return Ok(CptKey::Root);
        }
        let mut values = Vec::with_capacity(self.parents.len());
        for parent in &self.parents {
            let value = assignment.get(parent).ok_or_else(|| {
                NetworkError::Lookup(format!(
                    "no value for parent '{}' of node '{}'",
                    parent, self.name
                ))
            })?;
            values.push(value.clone());
        }
        Ok(CptKey::Config(values))
    }
}

/// A directed acyclic graph of discrete nodes, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Network {
    nodes: Vec<Node>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a network, checking names are unique and every parent exists.
    pub fn from_nodes<I: IntoIterator<Item = Node>>(nodes: I) -> Result<Self> {
        let mut network = Network::new();
        for node in nodes {
            if network.index.contains_key(node.name()) {
                return Err(NetworkError::Format(format!(
                    "node '{}' declared more than once",
                    node.name()
                )));
            }
            network.index.insert(node.name.clone(), network.nodes.len());
            network.nodes.push(node);
        }
        for node in &network.nodes {
            for parent in node.parents() {
                if !network.index.contains_key(parent) {
                    return Err(NetworkError::Reference(format!(
                        "node '{}' lists undeclared parent '{}'",
                        node.name(),
                        parent
                    )));
                }
            }
        }
        Ok(network)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Like `node`, but a missing node is a `Lookup` error.
    pub fn require_node(&self, name: &str) -> Result<&Node> {
        self.node(name)
            .ok_or_else(|| NetworkError::Lookup(format!("no node named '{}'", name)))
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Nodes that list `name` among their parents.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |node| node.parents.iter().any(|p| p == name))
    }

    /// Every parent -> child edge.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .flat_map(|child| {
                child
                    .parents
                    .iter()
                    .map(move |parent| (parent.as_str(), child.name()))
            })
            .collect()
    }

    /// Value copy of the graph and state spaces with every CPT emptied.
    pub fn structure(&self) -> Network {
        Network {
            nodes: self
                .nodes
                .iter()
                .map(|node| Node {
                    cpt: Cpt::new(),
                    ..node.clone()
                })
                .collect(),
            index: self.index.clone(),
        }
    }

    /// Full set of parent configurations for `node`, first parent varying
    /// slowest. A parentless node has the single `Root` key.
    pub fn key_space(&self, node: &Node) -> Result<Vec<CptKey>> {
        if node.is_root() {
            return Ok(vec![CptKey::Root]);
        }
        let mut configs: Vec<Vec<String>> = vec![Vec::new()];
        for parent_name in node.parents() {
            let parent = self.require_node(parent_name)?;
            configs = configs
                .iter()
                .flat_map(|prefix| {
                    parent.states().iter().map(move |state| {
                        let mut config = prefix.clone();
                        config.push(state.clone());
                        config
                    })
                })
                .collect();
        }
        Ok(configs.into_iter().map(CptKey::Config).collect())
    }
}
