pub mod sampler;
pub mod topology;

pub use sampler::AncestralSampler;
pub use topology::topological_order;
