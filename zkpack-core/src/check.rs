//! Final consistency check: the last line of defense before any output.
//!
//! Re-evaluates every constraint of the extended system against the
//! extended witness. Must run after all synthesis passes and before any
//! file is written; a violation means the packing arithmetic itself is
//! broken and nothing downstream may be trusted.

use std::time::Instant;

use blstrs::Scalar;
use ff::Field;
use tracing::info;

use zkpack_r1cs::R1csSystem;

use crate::error::{PackError, PackResult};

/// Require `(A_i.w)(B_i.w) == C_i.w` for every constraint.
///
/// Rows are re-evaluated in parallel; the reported index is the earliest
/// violated row, so failures are reproducible across runs.
pub fn check_satisfied(system: &R1csSystem<Scalar>, witness: &[Scalar]) -> PackResult<()> {
    let start = Instant::now();
    if witness.len() != system.n_wires as usize {
        return Err(PackError::Precondition(format!(
            "witness length {} != n_wires {}",
            witness.len(),
            system.n_wires
        )));
    }
    if witness.first() != Some(&Scalar::ONE) {
        return Err(PackError::Precondition(
            "witness[0] must be the constant one".into(),
        ));
    }
    if let Some(constraint) = system.first_violation(witness) {
        return Err(PackError::SoundnessViolation { constraint });
    }
    info!(
        n_constraints = system.n_constraints(),
        n_wires = system.n_wires,
        duration_ms = start.elapsed().as_millis(),
        "consistency check passed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkpack_r1cs::Constraint;

    fn mul_system() -> (R1csSystem<Scalar>, Vec<Scalar>) {
        let mut sys = R1csSystem::new();
        let x = sys.new_wire();
        let y = sys.new_wire();
        let z = sys.new_wire();
        sys.append_constraint(Constraint {
            a: [(x, Scalar::ONE)].into_iter().collect(),
            b: [(y, Scalar::ONE)].into_iter().collect(),
            c: [(z, Scalar::ONE)].into_iter().collect(),
        });
        let witness = vec![
            Scalar::ONE,
            Scalar::from(6u64),
            Scalar::from(7u64),
            Scalar::from(42u64),
        ];
        (sys, witness)
    }

    #[test]
    fn test_satisfied_system_passes() {
        let (sys, witness) = mul_system();
        check_satisfied(&sys, &witness).unwrap();
    }

    #[test]
    fn test_violation_reports_constraint() {
        let (sys, mut witness) = mul_system();
        witness[3] = Scalar::from(41u64);
        assert!(matches!(
            check_satisfied(&sys, &witness),
            Err(PackError::SoundnessViolation { constraint: 0 })
        ));
    }

    #[test]
    fn test_length_mismatch_is_precondition() {
        let (sys, mut witness) = mul_system();
        witness.pop();
        assert!(matches!(
            check_satisfied(&sys, &witness),
            Err(PackError::Precondition(_))
        ));
    }

    #[test]
    fn test_missing_constant_one_is_precondition() {
        let (sys, mut witness) = mul_system();
        witness[0] = Scalar::from(2u64);
        assert!(matches!(
            check_satisfied(&sys, &witness),
            Err(PackError::Precondition(_))
        ));
    }
}
