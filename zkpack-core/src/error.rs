//! Error taxonomy for the packing pipeline.
//!
//! Every variant is unrecoverable at the point of detection: the value of a
//! packed proof is void if any check fails, so the pipeline halts rather
//! than degrade. The split between `ArithmeticInconsistency` and
//! `SoundnessViolation` matters operationally — the former means the
//! packing-modulus assumptions (Q, p, pf) are broken, the latter that the
//! extended system itself does not verify; both point at bugs, not at bad
//! user input.

use std::path::PathBuf;

/// Error type for packing operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// Compiled circuit artifacts are missing; run the external compiler
    /// first.
    #[error("circuit not compiled: {0} not found (run the circuit compiler first)")]
    NotCompiled(PathBuf),

    /// Input validation failed before any work was done.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The quotient slack was not divisible by Q in either sign, or a PoSO
    /// sum exceeded its bit budget. Indicates inconsistent Q/p/pf
    /// assumptions, never bad input.
    #[error("arithmetic inconsistency at constraint {constraint}: {reason}")]
    ArithmeticInconsistency { constraint: usize, reason: String },

    /// The final consistency check found an unsatisfied constraint. No
    /// output may be trusted.
    #[error("soundness violation: constraint {constraint} unsatisfied by the packed witness")]
    SoundnessViolation { constraint: usize },

    /// An external subprocess (witness calculator) failed, timed out, or
    /// produced no output.
    #[error("external tool failure: {0}")]
    ExternalTool(String),

    /// File I/O or format error from the model layer.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

pub type PackResult<T> = Result<T, PackError>;
