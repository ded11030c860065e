pub mod error;
pub mod extractor;
