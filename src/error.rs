//! Fracture-specific error types.
//!
//! Topological anomalies (collapsed or duplicate triangles, non-manifold CSG
//! output) are *not* errors: the repair toolkit absorbs them silently.  The
//! variants here cover the cases a caller has to decide about, which in the
//! game always resolves to "discard the fragment" rather than a crash.

use std::fmt;

/// Top-level error enum for the fracture pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FractureError {
    /// A flat vertex array crossing the task boundary has the wrong length.
    MalformedPayload {
        /// Which array was rejected (`"positions"` or `"normals"`).
        field: &'static str,
        /// Number of floats actually received.
        len: usize,
    },

    /// Repair left a fragment with no triangles or no enclosed volume.
    DegenerateFragment {
        /// Fragment slot (0 or 1) within the split result.
        index: usize,
        /// Triangle count after repair.
        triangles: usize,
        /// Enclosed volume after repair.
        volume: f32,
    },

    /// A boolean operand had no triangles.
    EmptyOperand {
        /// Which operand was empty.
        operand: &'static str,
    },

    /// A boolean operation split more polygons than its budget allows.
    CsgBudgetExceeded {
        /// Polygons alive when the budget ran out.
        polygons: usize,
        budget: usize,
    },

    /// Configuration value is outside its safe operating range.
    UnsafeConstant {
        /// Name of the config field (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },
}

impl fmt::Display for FractureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FractureError::MalformedPayload { field, len } => write!(
                f,
                "malformed payload: '{}' has {} floats (need a multiple of 9)",
                field, len
            ),
            FractureError::DegenerateFragment {
                index,
                triangles,
                volume,
            } => write!(
                f,
                "fragment {} is degenerate after repair: {} triangles, volume {}",
                index, triangles, volume
            ),
            FractureError::EmptyOperand { operand } => {
                write!(f, "boolean operand '{}' has no triangles", operand)
            }
            FractureError::CsgBudgetExceeded { polygons, budget } => write!(
                f,
                "boolean operation reached {} polygons (budget {})",
                polygons, budget
            ),
            FractureError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "constant '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
        }
    }
}

impl std::error::Error for FractureError {}

/// Convenience alias: a `Result` using `FractureError` as the error type.
pub type FractureResult<T> = Result<T, FractureError>;
