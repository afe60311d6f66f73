//! The PoSO (Proof of Small Opening) gadget: randomized range soundness.
//!
//! A packed witness could satisfy every algebraic constraint while holding
//! out-of-range values that wrapped modulo Q. This pass appends, per window
//! of `poso_size` wires and per repetition:
//!
//!   1. a random public coefficient (coeff_bits wide) for every wire in the
//!      window, and one constraint forcing a fresh wire to the weighted sum
//!   2. `poso_bound` boolean constraints over fresh bit wires carrying the
//!      sum's binary expansion
//!   3. one recomposition constraint binding the bits back to the sum
//!
//! An in-range witness makes the field sum equal the small integer sum, so
//! the decomposition exists within the bit budget; an out-of-range witness
//! escapes detection with probability at most 2^-coeff_bits per repetition.
//! The coefficients are public coins: the RNG is injected, seeded, and the
//! seed recorded so a verifier can re-derive every coefficient vector.

use std::time::Instant;

use blstrs::Scalar;
use ff::Field;
use rand::Rng;
use tracing::info;

use zkpack_r1cs::scalar_repr::to_biguint;
use zkpack_r1cs::{Constraint, LinearCombination, R1csSystem, Symbol, SymbolTable};

use crate::config::PosoConfig;
use crate::error::{PackError, PackResult};
use crate::quotient::SYNTH_COMPONENT;

fn synth_symbol(system: &R1csSystem<Scalar>, wire: u32) -> Symbol {
    Symbol {
        label: system.wire_to_label[wire as usize] as i64,
        wire: wire as i64,
        component: SYNTH_COMPONENT,
    }
}

/// Append the full PoSO gadget over the witness as it stands at entry
/// (original wires plus quotient wires). Windows are contiguous wire
/// ranges; every window gets `reps` independent checks.
pub fn synthesize_poso<R: Rng>(
    system: &mut R1csSystem<Scalar>,
    witness: &mut Vec<Scalar>,
    symbols: &mut SymbolTable,
    poso: &PosoConfig,
    rng: &mut R,
) -> PackResult<()> {
    let start = Instant::now();
    if witness.len() != system.n_wires as usize {
        return Err(PackError::Precondition(format!(
            "witness length {} != n_wires {}",
            witness.len(),
            system.n_wires
        )));
    }
    // Re-checked here rather than trusted from config validation: a wider
    // shift below would wrap or panic.
    if poso.coeff_bits == 0 || poso.coeff_bits > 16 {
        return Err(PackError::Precondition(format!(
            "coeff_bits {} out of range 1..=16",
            poso.coeff_bits
        )));
    }

    let n_checked = witness.len();
    let window_size = poso.poso_size as usize;
    let num_poso = n_checked.div_ceil(window_size);
    let coeff_range = 1u64 << poso.coeff_bits;

    for window in 0..num_poso {
        let lo = window * window_size;
        let hi = (lo + window_size).min(n_checked);
        for rep in 0..poso.reps {
            // Random weighted sum over the window.
            let mut sum_lc = LinearCombination::new();
            let mut sum = Scalar::ZERO;
            for wire in lo..hi {
                let coeff = rng.gen_range(0..coeff_range);
                if coeff == 0 {
                    continue;
                }
                let coeff = Scalar::from(coeff);
                sum += coeff * witness[wire];
                sum_lc.add_term(wire as u32, coeff);
            }

            // The sum's representative must fit the bit budget; anything
            // larger means the in-range assumption is already broken.
            let sum_int = to_biguint(&sum);
            if sum_int.bits() > poso.poso_bound as u64 {
                return Err(PackError::ArithmeticInconsistency {
                    constraint: system.n_constraints(),
                    reason: format!(
                        "PoSO sum needs {} bits, budget is {} (window {}, rep {})",
                        sum_int.bits(),
                        poso.poso_bound,
                        window,
                        rep
                    ),
                });
            }

            let sum_wire = system.new_wire();
            witness.push(sum);
            symbols.insert(
                format!("PoSO[{}][{}]", window, rep),
                synth_symbol(system, sum_wire),
            );
            sum_lc.add_term(sum_wire, -Scalar::ONE);
            system.append_constraint(Constraint {
                a: LinearCombination::new(),
                b: LinearCombination::new(),
                c: sum_lc,
            });

            // Bit decomposition: (w_bit - 1) * w_bit = 0 per bit, then one
            // recomposition row binding the bits back to the sum wire.
            let mut recompose = LinearCombination::new();
            let mut power = Scalar::ONE;
            for bit in 0..poso.poso_bound {
                let bit_wire = system.new_wire();
                let bit_value = if sum_int.bit(bit as u64) {
                    Scalar::ONE
                } else {
                    Scalar::ZERO
                };
                witness.push(bit_value);
                symbols.insert(
                    format!("PoSO.Bits[{}][{}][{}]", window, rep, bit),
                    synth_symbol(system, bit_wire),
                );
                system.append_constraint(Constraint {
                    a: [(0, -Scalar::ONE), (bit_wire, Scalar::ONE)]
                        .into_iter()
                        .collect(),
                    b: [(bit_wire, Scalar::ONE)].into_iter().collect(),
                    c: LinearCombination::new(),
                });
                recompose.add_term(bit_wire, power);
                power = power.double();
            }
            recompose.add_term(sum_wire, -Scalar::ONE);
            system.append_constraint(Constraint {
                a: LinearCombination::new(),
                b: LinearCombination::new(),
                c: recompose,
            });
        }
    }

    info!(
        num_poso,
        reps = poso.reps,
        poso_bound = poso.poso_bound,
        n_wires = system.n_wires,
        n_constraints = system.n_constraints(),
        duration_ms = start.elapsed().as_millis(),
        "PoSO gadget synthesized"
    );
    Ok(())
}
