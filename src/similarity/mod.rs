//! Similarity estimation algorithms
//!
//! This module provides algorithms for estimating similarity between sets/documents:
//!
//! - [`goph`]: Grouped One-Permutation Hashing sketches and Jaccard estimation,
//!   with probabilistic early termination for large signatures.

pub mod goph;

pub use goph::{
    bit_width_of, build_sketch, build_sketch_default, downgrade, estimate_similarity,
    EstimateOptions, GophSketch,
};
