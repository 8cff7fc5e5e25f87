//! Reader for the BIF network description format.
//!
//! A description is a sequence of blocks:
//!
//! ```text
//! network asia { }
//! variable smoke {
//!   type discrete [ 2 ] { yes, no };
//! }
//! probability ( smoke ) {
//!   table 0.5, 0.5;
//! }
//! probability ( lung | smoke ) {
//!   (yes) 0.1, 0.9;
//!   (no) 0.01, 0.99;
//! }
//! ```
//!
//! Blocks may come in any order. Each block must match its grammar in full;
//! the first block that does not fails the whole parse.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::{Captures, Match, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::errors::{NetworkError, Result};
use super::model::{Cpt, CptKey, Network, Node};

/// Largest accepted gap between a row's sum and 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// Rows whose sum is further than this from 1 are rescaled after parsing.
const NORMALISATION_SLACK: f64 = 1e-12;

static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").expect("valid regex"));
static BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(network)\s+[^{};]*\{|(variable)\s+[\w.-]+\s*\{|(probability)\s*\()",
    )
    .expect("valid regex")
});
static NETWORK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\Anetwork\s+[^{}]*\{[^{}]*\}\s*\z").expect("valid regex"));
static VARIABLE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)\Avariable\s+([\w.-]+)\s*\{[^{}]*?type\s+discrete\s*\[\s*(\d+)\s*\]\s*\{([^{}]*)\}\s*;[^{}]*\}\s*\z",
    )
    .expect("valid regex")
});
static PROBABILITY_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\Aprobability\s*\(\s*([^()|]+?)\s*(?:\|([^()]*))?\)\s*\{([^{}]*)\}\s*\z")
        .expect("valid regex")
});
static TABLE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\Atable\s+(.+)\z").expect("valid regex"));
static CONDITIONED_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A\(([^()]*)\)\s*(.+)\z").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Network,
    Variable,
    Probability,
}

struct Block<'a> {
    kind: BlockKind,
    line: usize,
    text: &'a str,
}

struct VariableDecl {
    name: String,
    states: Vec<String>,
}

struct ProbabilityDecl {
    line: usize,
    target: String,
    parents: Vec<String>,
    body: String,
}

/// Parse a description held in memory.
pub fn parse_network(text: &str) -> Result<Network> {
    let text = strip_comments(text);
    let blocks = split_blocks(&text)?;

    let mut variables: Vec<VariableDecl> = Vec::new();
    let mut declarations: Vec<ProbabilityDecl> = Vec::new();
    for block in &blocks {
        match block.kind {
            BlockKind::Network => {
                if !NETWORK_BLOCK.is_match(block.text) {
                    return Err(malformed(block));
                }
            }
            BlockKind::Variable => variables.push(parse_variable(block)?),
            BlockKind::Probability => declarations.push(parse_probability_header(block)?),
        }
    }
    debug!(
        "Found {} variable blocks and {} probability blocks",
        variables.len(),
        declarations.len()
    );

    let mut states_by_name: HashMap<&str, &[String]> = HashMap::new();
    for variable in &variables {
        if states_by_name
            .insert(variable.name.as_str(), variable.states.as_slice())
            .is_some()
        {
            return Err(NetworkError::Format(format!(
                "variable '{}' is declared more than once",
                variable.name
            )));
        }
    }

    let mut resolved: HashMap<String, (Vec<String>, Cpt)> = HashMap::new();
    for declaration in &declarations {
        let states = states_by_name
            .get(declaration.target.as_str())
            .ok_or_else(|| {
                NetworkError::Reference(format!(
                    "line {}: probability block for undeclared variable '{}'",
                    declaration.line, declaration.target
                ))
            })?;
        let mut parent_states = Vec::with_capacity(declaration.parents.len());
        for parent in &declaration.parents {
            let states = states_by_name.get(parent.as_str()).ok_or_else(|| {
                NetworkError::Reference(format!(
                    "line {}: '{}' lists undeclared parent '{}'",
                    declaration.line, declaration.target, parent
                ))
            })?;
            parent_states.push(*states);
        }
        let cpt = parse_body(declaration, states, &parent_states)?;
        if resolved
            .insert(
                declaration.target.clone(),
                (declaration.parents.clone(), cpt),
            )
            .is_some()
        {
            return Err(NetworkError::Format(format!(
                "line {}: second probability block for '{}'",
                declaration.line, declaration.target
            )));
        }
    }

    let nodes = variables.into_iter().map(|variable| {
        let node = Node::new(&variable.name, variable.states);
        match resolved.remove(&variable.name) {
            Some((parents, cpt)) => node.with_parents(parents).with_cpt(cpt),
            None => node,
        }
    });
    Network::from_nodes(nodes)
}

/// Read and parse a description file.
pub fn parse_network_file<P: AsRef<Path>>(path: P) -> Result<Network> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| NetworkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let network = parse_network(&text)?;
    info!(
        "Loaded network with {} nodes from '{}'",
        network.len(),
        path.display()
    );
    Ok(network)
}

impl Network {
    /// Load a network from a BIF description file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        parse_network_file(path)
    }
}

impl FromStr for Network {
    type Err = NetworkError;

    fn from_str(text: &str) -> Result<Self> {
        parse_network(text)
    }
}

/// Blank out comments, keeping line breaks so line numbers stay right.
fn strip_comments(text: &str) -> String {
    let text = BLOCK_COMMENT.replace_all(text, |caps: &Captures| {
        "\n".repeat(caps[0].matches('\n').count())
    });
    LINE_COMMENT.replace_all(&text, "").into_owned()
}

/// The keyword of a header match; exactly one of the three groups takes part.
fn header_keyword<'t>(caps: &Captures<'t>) -> Option<Match<'t>> {
    (1..=3).find_map(|i| caps.get(i))
}

fn split_blocks(text: &str) -> Result<Vec<Block<'_>>> {
    let headers: Vec<Match<'_>> = BLOCK_HEADER
        .captures_iter(text)
        .filter_map(|caps| header_keyword(&caps))
        .collect();
    let first_start = headers.first().map_or(text.len(), |m| m.start());
    if !text[..first_start].trim().is_empty() {
        return Err(NetworkError::Format(format!(
            "line 1: unexpected text before the first block: '{}'",
            excerpt(&text[..first_start])
        )));
    }

    let mut blocks = Vec::with_capacity(headers.len());
    for (i, keyword) in headers.iter().enumerate() {
        let start = keyword.start();
        let end = headers.get(i + 1).map_or(text.len(), |next| next.start());
        let kind = match keyword.as_str() {
            "network" => BlockKind::Network,
            "variable" => BlockKind::Variable,
            _ => BlockKind::Probability,
        };
        blocks.push(Block {
            kind,
            line: text[..start].matches('\n').count() + 1,
            text: text[start..end].trim_end(),
        });
    }
    Ok(blocks)
}

fn parse_variable(block: &Block) -> Result<VariableDecl> {
    let caps = VARIABLE_BLOCK
        .captures(block.text)
        .ok_or_else(|| malformed(block))?;
    let name = caps[1].to_string();
    let states = split_list(&caps[3]);
    let declared: usize = caps[2].parse().map_err(|_| malformed(block))?;
    if states.len() != declared {
        return Err(NetworkError::Format(format!(
            "line {}: variable '{}' declares {} states but lists {}",
            block.line,
            name,
            declared,
            states.len()
        )));
    }
    for (i, state) in states.iter().enumerate() {
        if states[..i].contains(state) {
            return Err(NetworkError::Format(format!(
                "line {}: variable '{}' lists state '{}' twice",
                block.line, name, state
            )));
        }
    }
    debug!("Variable {} with states {:?}", name, states);
    Ok(VariableDecl { name, states })
}

fn parse_probability_header(block: &Block) -> Result<ProbabilityDecl> {
    let caps = PROBABILITY_BLOCK
        .captures(block.text)
        .ok_or_else(|| malformed(block))?;
    let parents = caps.get(2).map(|m| split_list(m.as_str())).unwrap_or_default();
    if caps.get(2).is_some() && parents.is_empty() {
        return Err(NetworkError::Format(format!(
            "line {}: empty parent list after '|'",
            block.line
        )));
    }
    Ok(ProbabilityDecl {
        line: block.line,
        target: caps[1].to_string(),
        parents,
        body: caps[3].to_string(),
    })
}

fn parse_body(
    declaration: &ProbabilityDecl,
    states: &[String],
    parent_states: &[&[String]],
) -> Result<Cpt> {
    let line = declaration.line;
    let target = &declaration.target;
    let mut statements: Vec<&str> = declaration.body.split(';').map(str::trim).collect();
    // Text after the final ';' is an unterminated statement.
    if let Some(rest) = statements.pop() {
        if !rest.is_empty() {
            return Err(NetworkError::Format(format!(
                "line {}: unterminated statement '{}' in probability block for '{}'",
                line,
                excerpt(rest),
                target
            )));
        }
    }

    let mut cpt = Cpt::new();
    for statement in statements.into_iter().filter(|s| !s.is_empty()) {
        if let Some(caps) = TABLE_ROW.captures(statement) {
            if !declaration.parents.is_empty() {
                return Err(NetworkError::Format(format!(
                    "line {}: 'table' row for '{}', which has parents",
                    line, target
                )));
            }
            let probabilities = parse_probabilities(&caps[1], states.len(), target, line)?;
            if cpt.insert(CptKey::Root, probabilities).is_some() {
                return Err(NetworkError::Format(format!(
                    "line {}: more than one 'table' row for '{}'",
                    line, target
                )));
            }
        } else if let Some(caps) = CONDITIONED_ROW.captures(statement) {
            if declaration.parents.is_empty() {
                return Err(NetworkError::Format(format!(
                    "line {}: conditioned row for root variable '{}'",
                    line, target
                )));
            }
            let values = split_list(&caps[1]);
            check_parent_values(&values, declaration, parent_states)?;
            let probabilities = parse_probabilities(&caps[2], states.len(), target, line)?;
            let key = CptKey::Config(values);
            if cpt.contains(&key) {
                return Err(NetworkError::Format(format!(
                    "line {}: row {} appears twice for '{}'",
                    line, key, target
                )));
            }
            cpt.insert(key, probabilities);
        } else {
            return Err(NetworkError::Format(format!(
                "line {}: cannot read '{}' in probability block for '{}'",
                line,
                excerpt(statement),
                target
            )));
        }
    }
    debug!("Probability block for {}: {} rows", target, cpt.len());
    Ok(cpt)
}

fn check_parent_values(
    values: &[String],
    declaration: &ProbabilityDecl,
    parent_states: &[&[String]],
) -> Result<()> {
    if values.len() != declaration.parents.len() {
        return Err(NetworkError::Format(format!(
            "line {}: row ({}) for '{}' has {} values but {} parents",
            declaration.line,
            values.join(", "),
            declaration.target,
            values.len(),
            declaration.parents.len()
        )));
    }
    for ((value, parent), states) in values.iter().zip(&declaration.parents).zip(parent_states) {
        if !states.contains(value) {
            return Err(NetworkError::Format(format!(
                "line {}: '{}' is not a state of parent '{}'",
                declaration.line, value, parent
            )));
        }
    }
    Ok(())
}

fn parse_probabilities(list: &str, expected: usize, target: &str, line: usize) -> Result<Vec<f64>> {
    let probabilities = split_list(list)
        .iter()
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                NetworkError::Format(format!(
                    "line {}: '{}' is not a probability (variable '{}')",
                    line, token, target
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    if probabilities.len() != expected {
        return Err(NetworkError::Format(format!(
            "line {}: variable '{}' has {} states but the row lists {} probabilities",
            line,
            target,
            expected,
            probabilities.len()
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(NetworkError::Format(format!(
            "line {}: invalid probability {} for '{}'",
            line, bad, target
        )));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(NetworkError::Format(format!(
            "line {}: probabilities for '{}' sum to {}",
            line, target, sum
        )));
    }
    if (sum - 1.0).abs() > NORMALISATION_SLACK {
        debug!("line {}: rescaling row of '{}' that sums to {}", line, target, sum);
        return Ok(probabilities.into_iter().map(|p| p / sum).collect());
    }
    Ok(probabilities)
}

/// Split a comma and/or whitespace separated list.
fn split_list(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn malformed(block: &Block) -> NetworkError {
    let keyword = match block.kind {
        BlockKind::Network => "network",
        BlockKind::Variable => "variable",
        BlockKind::Probability => "probability",
    };
    NetworkError::Format(format!(
        "line {}: malformed {} block '{}'",
        block.line,
        keyword,
        excerpt(block.text)
    ))
}

fn excerpt(text: &str) -> String {
    let line = text.trim().lines().next().unwrap_or_default();
    if line.chars().count() > 60 {
        format!("{}...", line.chars().take(60).collect::<String>())
    } else {
        line.to_string()
    }
}
