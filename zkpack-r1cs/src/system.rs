//! The in-memory R1CS instance.
//!
//! Mutation is append-only: stages that extend the system may add wires and
//! constraints (and one extra coefficient per existing constraint, in the
//! quotient pass) but never remove or reorder anything. `n_wires` and
//! `n_labels` only grow, and every wire referenced by a constraint is
//! `< n_wires`.
//!
//! Wire indexing follows the compiler's convention:
//!   w[0] = 1 (constant), then public outputs, public inputs, private inputs,
//!   then internal/auxiliary wires.

use ff::PrimeField;
use rayon::prelude::*;

use crate::lc::Constraint;

/// A complete R1CS instance plus the wire-to-label map the downstream
/// tooling needs to relate wires back to source-level signals.
#[derive(Clone, Debug)]
pub struct R1csSystem<Scalar: PrimeField> {
    /// Total wire count, including the constant-one wire 0.
    pub n_wires: u32,
    /// Public output count.
    pub n_pub_out: u32,
    /// Public input count.
    pub n_pub_in: u32,
    /// Private input count.
    pub n_prv_in: u32,
    /// Total label count (labels may outnumber wires after optimization).
    pub n_labels: u64,
    /// The constraints, in compiler order plus appended extensions.
    pub constraints: Vec<Constraint<Scalar>>,
    /// Label for each wire. Length: `n_wires`.
    pub wire_to_label: Vec<u64>,
}

impl<Scalar: PrimeField> R1csSystem<Scalar> {
    /// An empty system with only the constant-one wire.
    pub fn new() -> Self {
        Self {
            n_wires: 1,
            n_pub_out: 0,
            n_pub_in: 0,
            n_prv_in: 0,
            n_labels: 1,
            constraints: Vec::new(),
            wire_to_label: vec![0],
        }
    }

    pub fn n_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Allocate a fresh wire with a fresh label. Returns the wire index.
    pub fn new_wire(&mut self) -> u32 {
        let wire = self.n_wires;
        let label = self.n_labels;
        self.n_wires += 1;
        self.n_labels += 1;
        self.wire_to_label.push(label);
        wire
    }

    /// Append a constraint. All referenced wires must already exist.
    pub fn append_constraint(&mut self, constraint: Constraint<Scalar>) {
        debug_assert!(
            constraint.max_wire().map_or(true, |w| w < self.n_wires),
            "constraint references wire beyond n_wires"
        );
        self.constraints.push(constraint);
    }

    /// Index of the first constraint not satisfied by `witness`, if any.
    ///
    /// Re-evaluates every constraint row. Rows are independent, so they are
    /// checked in parallel chunks (disjoint row ranges, zero contention).
    pub fn first_violation(&self, witness: &[Scalar]) -> Option<usize> {
        const CHUNK: usize = 4096;
        self.constraints
            .par_chunks(CHUNK)
            .enumerate()
            .filter_map(|(chunk_idx, chunk)| {
                chunk.iter().enumerate().find_map(|(local, constraint)| {
                    if constraint.residual(witness).is_zero_vartime() {
                        None
                    } else {
                        Some(chunk_idx * CHUNK + local)
                    }
                })
            })
            .min()
    }

    /// Structural sanity: wire-to-label length matches, every constraint
    /// stays inside the wire space, and counts are monotone-consistent.
    pub fn validate(&self) -> Result<(), String> {
        if self.wire_to_label.len() != self.n_wires as usize {
            return Err(format!(
                "wire_to_label length {} != n_wires {}",
                self.wire_to_label.len(),
                self.n_wires
            ));
        }
        if (self.n_labels as usize) < self.n_wires as usize {
            return Err(format!(
                "n_labels {} < n_wires {}",
                self.n_labels, self.n_wires
            ));
        }
        for (i, constraint) in self.constraints.iter().enumerate() {
            if let Some(max) = constraint.max_wire() {
                if max >= self.n_wires {
                    return Err(format!(
                        "constraint {} references wire {} >= n_wires {}",
                        i, max, self.n_wires
                    ));
                }
            }
        }
        Ok(())
    }
}

impl<Scalar: PrimeField> Default for R1csSystem<Scalar> {
    fn default() -> Self {
        Self::new()
    }
}
