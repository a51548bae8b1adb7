//! Validation utilities for GOPH sketch parameter bounds checking

use crate::common::{Result, SketchError};

/// Validate GOPH sketch length (`numHashes`) and group count (`numGroups`)
///
/// Both must be positive, and `numHashes` must divide evenly by `numGroups`
/// so every group has the same number of slots.
pub fn validate_num_hashes_groups(num_hashes: usize, num_groups: usize) -> Result<()> {
    if num_hashes == 0 {
        return Err(SketchError::InvalidParameter {
            param: "num_hashes".to_string(),
            value: num_hashes.to_string(),
            constraint: "must be greater than 0".to_string(),
        });
    }
    if num_groups == 0 {
        return Err(SketchError::InvalidParameter {
            param: "num_groups".to_string(),
            value: num_groups.to_string(),
            constraint: "must be greater than 0".to_string(),
        });
    }
    if num_hashes % num_groups != 0 {
        return Err(SketchError::InvalidParameter {
            param: "num_groups".to_string(),
            value: num_groups.to_string(),
            constraint: format!(
                "num_hashes ({}) must be evenly divisible by num_groups",
                num_hashes
            ),
        });
    }
    Ok(())
}

/// Validate a GOPH sketch bit width: must be one of {2, 4, 8, 16, 32}
pub fn validate_bit_width(width: u8) -> Result<()> {
    if !matches!(width, 2 | 4 | 8 | 16 | 32) {
        return Err(SketchError::InvalidParameter {
            param: "bit_width".to_string(),
            value: width.to_string(),
            constraint: "must be one of {2, 4, 8, 16, 32}".to_string(),
        });
    }
    Ok(())
}
