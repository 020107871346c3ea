//! Text preparation ahead of field extraction.

pub mod normalize;

pub use normalize::{normalize, Normalizer};
