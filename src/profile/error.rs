//! Rank profile compilation errors.

use thiserror::Error;

use crate::base::{Name, TensorType};
use crate::transform::TransformError;
use crate::typing::TypeError;

#[derive(Debug, Error)]
pub enum CompileError {
    /// Converting model features failed.
    #[error("in rank profile '{profile}': {source}")]
    Transform {
        profile: Name,
        #[source]
        source: TransformError,
    },

    /// An expression of the profile could not be typed.
    #[error("in rank profile '{profile}': the type of '{expression}' could not be resolved: {source}")]
    Type {
        profile: Name,
        expression: String,
        #[source]
        source: TypeError,
    },

    /// A ranking phase does not produce a single score.
    #[error("in rank profile '{profile}': the {phase} expression must produce a double, but produces {tensor_type}")]
    NonScalarPhase {
        profile: Name,
        phase: &'static str,
        tensor_type: TensorType,
    },
}
