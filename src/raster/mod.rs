pub mod error;
pub mod sampler;
