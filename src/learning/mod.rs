pub mod divergence;
pub mod laplace;

pub use divergence::{
    NodeDivergence, js_divergence, kl_divergence, mean_js_divergence, node_divergences,
    overall_mean,
};
pub use laplace::{LAPLACE_PSEUDOCOUNT, estimate_cpt, learn_parameters};
