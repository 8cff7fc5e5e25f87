pub mod display;
pub mod errors;
pub mod model;
pub mod parser;

pub use errors::{NetworkError, Result};
pub use model::{Cpt, CptKey, NO_PARENTS, Network, Node, Observation};
pub use parser::{parse_network, parse_network_file};
