pub mod dataset;
pub mod point;
