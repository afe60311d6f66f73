//! Quotient synthesis: closing the arithmetic gap the packing opens.
//!
//! Packed witness values satisfy each original constraint modulo every
//! packing modulus, but not modulo the scalar field: the residual
//! `a*b - c` of a constraint over the packed witness is some multiple of
//! Q rather than zero. This pass absorbs that multiple into one fresh
//! "quotient" wire per constraint, so the extended system is exactly
//! satisfied mod p again.
//!
//! Per constraint i:
//!   - slack `kq = (A_i.w)(B_i.w) - (C_i.w) mod p`
//!   - `kq` must be divisible by Q either directly or after negation mod p
//!     (it vanishes modulo every packing modulus by construction, hence
//!     modulo Q); failure is an `ArithmeticInconsistency`, never recovered
//!   - append coefficient Q (or p - Q for the negated branch) for a fresh
//!     wire k_i to C_i, and push `kq / Q` (resp. `(p - kq) / Q`) into the
//!     witness

use std::time::Instant;

use blstrs::Scalar;
use ff::PrimeField;
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::info;

use zkpack_r1cs::scalar_repr::{from_biguint, modulus, to_biguint};
use zkpack_r1cs::{R1csSystem, Symbol, SymbolTable};

use crate::error::{PackError, PackResult};

/// Component index used for all wires this crate synthesizes, so downstream
/// tooling can tell them apart from compiler-produced signals.
pub const SYNTH_COMPONENT: i64 = 6;

/// Extend `system` and `witness` with one quotient wire per constraint.
///
/// Runs over the constraints present at entry; the appended C-coefficients
/// reference only fresh wires, so earlier rows are never revisited. New
/// wires are named `k[i]` in the symbol table.
pub fn synthesize_quotients(
    system: &mut R1csSystem<Scalar>,
    witness: &mut Vec<Scalar>,
    symbols: &mut SymbolTable,
    q: u128,
) -> PackResult<()> {
    let start = Instant::now();
    let p = modulus::<Scalar>();
    let q_int = BigUint::from(q);
    let q_coeff = Scalar::from_u128(q);

    let n_original = system.n_constraints();
    let mut negated = 0usize;
    for i in 0..n_original {
        let slack = system.constraints[i].residual(witness);
        let slack_int = to_biguint(&slack);

        let (k_int, coeff) = if (&slack_int % &q_int).is_zero() {
            (&slack_int / &q_int, q_coeff)
        } else {
            let negated_int = &p - &slack_int;
            if !(&negated_int % &q_int).is_zero() {
                return Err(PackError::ArithmeticInconsistency {
                    constraint: i,
                    reason: format!(
                        "slack {} not divisible by Q = {} in either sign",
                        slack_int, q
                    ),
                });
            }
            negated += 1;
            (&negated_int / &q_int, -q_coeff)
        };

        let k = from_biguint::<Scalar>(&k_int).ok_or_else(|| {
            PackError::ArithmeticInconsistency {
                constraint: i,
                reason: format!("quotient {} does not fit the scalar field", k_int),
            }
        })?;

        let wire = system.new_wire();
        system.constraints[i].c.set_term(wire, coeff);
        witness.push(k);
        symbols.insert(
            format!("k[{}]", i),
            Symbol {
                label: system.wire_to_label[wire as usize] as i64,
                wire: wire as i64,
                component: SYNTH_COMPONENT,
            },
        );
    }

    info!(
        n_constraints = n_original,
        negated,
        n_wires = system.n_wires,
        duration_ms = start.elapsed().as_millis(),
        "quotient synthesis complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use zkpack_r1cs::Constraint;

    use crate::crt::CrtBasis;

    /// x * y = z over wires [1, x, y, z], shared by all copies.
    fn mul_system() -> R1csSystem<Scalar> {
        let mut sys = R1csSystem::new();
        let x = sys.new_wire();
        let y = sys.new_wire();
        let z = sys.new_wire();
        sys.append_constraint(Constraint {
            a: [(x, Scalar::ONE)].into_iter().collect(),
            b: [(y, Scalar::ONE)].into_iter().collect(),
            c: [(z, Scalar::ONE)].into_iter().collect(),
        });
        sys
    }

    #[test]
    fn test_quotient_closes_packed_system() {
        // Two copies of x * y = z, packed over {3, 5}. Each copy satisfies
        // its constraint over the integers, so the packed slack is a clean
        // multiple of Q = 15.
        let mut sys = mul_system();
        let basis = CrtBasis::new(&[3, 5]).unwrap();
        let copies = vec![
            vec![Scalar::ONE, Scalar::from(2u64), Scalar::from(2u64), Scalar::from(4u64)],
            vec![Scalar::ONE, Scalar::from(3u64), Scalar::from(4u64), Scalar::from(12u64)],
        ];
        let mut witness = basis.embed_vectors(&copies).unwrap();

        // Packed system is not satisfied before the pass.
        assert!(sys.first_violation(&witness).is_some());

        let mut symbols = SymbolTable::new();
        synthesize_quotients(&mut sys, &mut witness, &mut symbols, basis.q()).unwrap();

        assert_eq!(sys.n_wires, 5);
        assert_eq!(witness.len(), 5);
        assert_eq!(sys.first_violation(&witness), None);
        let k0 = symbols.get("k[0]").unwrap();
        assert_eq!(k0.wire, 4);
        assert_eq!(k0.component, SYNTH_COMPONENT);
    }

    #[test]
    fn test_already_satisfied_constraint_gets_zero_quotient() {
        let mut sys = mul_system();
        // A witness that satisfies the constraint exactly mod p.
        let mut witness = vec![
            Scalar::ONE,
            Scalar::from(6u64),
            Scalar::from(7u64),
            Scalar::from(42u64),
        ];
        let mut symbols = SymbolTable::new();
        synthesize_quotients(&mut sys, &mut witness, &mut symbols, 15).unwrap();
        assert_eq!(witness[4], Scalar::ZERO);
        assert_eq!(sys.first_violation(&witness), None);
    }

    #[test]
    fn test_negated_branch() {
        // Slack of -15 mod p: divisible by Q only after negation.
        let mut sys = mul_system();
        let mut witness = vec![
            Scalar::ONE,
            Scalar::from(6u64),
            Scalar::from(7u64),
            Scalar::from(57u64), // c = ab + 15, so slack = -15
        ];
        let mut symbols = SymbolTable::new();
        synthesize_quotients(&mut sys, &mut witness, &mut symbols, 15).unwrap();
        assert_eq!(witness[4], Scalar::ONE);
        assert_eq!(
            sys.constraints[0].c.coeff(4),
            Some(&(-Scalar::from(15u64)))
        );
        assert_eq!(sys.first_violation(&witness), None);
    }

    #[test]
    fn test_indivisible_slack_is_fatal() {
        let mut sys = mul_system();
        // Slack of 7: not a multiple of 15 in either sign.
        let mut witness = vec![
            Scalar::ONE,
            Scalar::from(6u64),
            Scalar::from(7u64),
            Scalar::from(35u64),
        ];
        let mut symbols = SymbolTable::new();
        let err = synthesize_quotients(&mut sys, &mut witness, &mut symbols, 15).unwrap_err();
        assert!(matches!(
            err,
            PackError::ArithmeticInconsistency { constraint: 0, .. }
        ));
    }
}
