// SPDX-License-Identifier: Apache-2.0

//! Post-generation validation: re-checks every generated vector against the
//! unit-hypercube bounds and the constraint set it was sampled under.
//!
//! The sampler only ever emits points it has already screened, so a failed
//! report indicates a defect in the sampler or corruption of the result
//! matrix, not an unlucky run.

use crate::constraints::ConstraintSet;

/// Outcome of validating a result matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Indices of vectors that failed either check, ascending, one entry
    /// per vector no matter how many coordinates or constraints failed.
    pub failed_indices: Vec<usize>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.failed_indices.is_empty()
    }
}

/// Checks each vector for hypercube containment and constraint
/// satisfaction. A NaN coordinate fails containment, so NaN rows are
/// reported even when every constraint would vacuously pass.
pub fn validate(points: &[Vec<f64>], constraints: &ConstraintSet) -> ValidationReport {
    let mut failed_indices = Vec::new();
    for (index, point) in points.iter().enumerate() {
        let in_bounds = point.iter().all(|c| (0.0..=1.0).contains(c));
        if !in_bounds || !constraints.apply(point) {
            failed_indices.push(index);
        }
    }
    ValidationReport { failed_indices }
}
