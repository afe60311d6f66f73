//! Magnitude diagnostics for the "small entries" assumption.
//!
//! The quotient bound and the PoSO bit budget both assume matrix
//! coefficients and witness values have small balanced representatives
//! (min of v and p - v). These helpers report the observed maxima so an
//! operator can confirm the assumption before trusting the parameter
//! choices for a new circuit.

use blstrs::Scalar;
use num_bigint::BigUint;
use num_traits::Zero;
use rayon::prelude::*;

use zkpack_r1cs::scalar_repr::{magnitude, modulus};
use zkpack_r1cs::R1csSystem;

/// Observed magnitude maxima over a system and witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnitudeStats {
    /// Largest balanced magnitude over all A/B/C coefficients.
    pub max_coefficient: BigUint,
    /// Largest balanced magnitude over the witness values.
    pub max_witness: BigUint,
}

impl MagnitudeStats {
    pub fn measure(system: &R1csSystem<Scalar>, witness: &[Scalar]) -> Self {
        let p = modulus::<Scalar>();
        let max_coefficient = system
            .constraints
            .par_iter()
            .map(|constraint| {
                [&constraint.a, &constraint.b, &constraint.c]
                    .iter()
                    .flat_map(|lc| lc.iter())
                    .map(|(_, coeff)| magnitude(coeff, &p))
                    .max()
                    .unwrap_or_else(BigUint::zero)
            })
            .max()
            .unwrap_or_else(BigUint::zero);
        let max_witness = witness
            .par_iter()
            .map(|v| magnitude(v, &p))
            .max()
            .unwrap_or_else(BigUint::zero);
        Self {
            max_coefficient,
            max_witness,
        }
    }

    /// Bits needed to represent the larger of the two maxima.
    pub fn bits(&self) -> u64 {
        self.max_coefficient.bits().max(self.max_witness.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use zkpack_r1cs::Constraint;

    #[test]
    fn test_negative_coefficients_count_as_small() {
        let mut sys = R1csSystem::new();
        let x = sys.new_wire();
        sys.append_constraint(Constraint {
            a: [(x, -Scalar::from(9u64))].into_iter().collect(),
            b: [(0, Scalar::ONE)].into_iter().collect(),
            c: [(x, -Scalar::from(9u64))].into_iter().collect(),
        });
        let witness = vec![Scalar::ONE, -Scalar::from(100u64)];
        let stats = MagnitudeStats::measure(&sys, &witness);
        assert_eq!(stats.max_coefficient, BigUint::from(9u32));
        assert_eq!(stats.max_witness, BigUint::from(100u32));
        assert_eq!(stats.bits(), 7);
    }

    #[test]
    fn test_empty_system() {
        let sys = R1csSystem::<Scalar>::new();
        let stats = MagnitudeStats::measure(&sys, &[Scalar::ONE]);
        assert_eq!(stats.max_coefficient, BigUint::zero());
        assert_eq!(stats.max_witness, BigUint::from(1u32));
    }
}
