pub mod setup;

pub use setup::{ExperimentOptions, OutputFormat};
