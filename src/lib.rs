//! goph_sketch: compact probabilistic set sketches and Jaccard similarity
//!
//! This crate builds Grouped One-Permutation Hashing (GOPH) sketches — a
//! single-pass MinHash variant — from streams of 32-bit element hashes, and
//! estimates Jaccard similarity between them, with an optional statistical
//! early-termination mode for large signatures. See [`similarity::goph`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod common;
pub mod similarity;

// Re-export core types for convenience
pub use common::{hash, Result, SketchError};

/// Error types and result aliases for sketch operations
pub mod error {
    pub use crate::common::{Result, SketchError};
}

// Re-export the GOPH public API at the crate root.
pub use similarity::{
    bit_width_of, build_sketch, build_sketch_default, downgrade, estimate_similarity,
    EstimateOptions, GophSketch,
};

#[cfg(test)]
mod tests {
    #[test]
    fn test_library_compiles() {
        // This test ensures the library compiles successfully
    }
}
