pub mod common;
pub mod inference;
pub mod learning;
pub mod network;

pub use inference::{AncestralSampler, topological_order};
pub use learning::{learn_parameters, mean_js_divergence};
pub use network::{Cpt, CptKey, Network, NetworkError, Node, Observation};
