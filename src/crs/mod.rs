pub mod error;
pub mod transform;
