//! Sparse linear combinations and R1CS constraints.
//!
//! A linear combination is an ordered map from wire index to coefficient.
//! `BTreeMap` gives deterministic iteration order, which the binary writer
//! relies on for reproducible output.

use std::collections::BTreeMap;

use ff::PrimeField;

/// Sparse linear combination over the wire vector: `sum_j coeff_j * w[j]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinearCombination<Scalar: PrimeField> {
    terms: BTreeMap<u32, Scalar>,
}

impl<Scalar: PrimeField> LinearCombination<Scalar> {
    pub fn new() -> Self {
        Self {
            terms: BTreeMap::new(),
        }
    }

    /// Add `coeff` to the coefficient of wire `wire`.
    ///
    /// Coefficients that cancel to zero are dropped, so the sparse support
    /// never carries dead entries.
    pub fn add_term(&mut self, wire: u32, coeff: Scalar) {
        if coeff.is_zero_vartime() {
            return;
        }
        let entry = self.terms.entry(wire).or_insert(Scalar::ZERO);
        *entry += coeff;
        if entry.is_zero_vartime() {
            self.terms.remove(&wire);
        }
    }

    /// Replace the coefficient of wire `wire`.
    pub fn set_term(&mut self, wire: u32, coeff: Scalar) {
        if coeff.is_zero_vartime() {
            self.terms.remove(&wire);
        } else {
            self.terms.insert(wire, coeff);
        }
    }

    pub fn coeff(&self, wire: u32) -> Option<&Scalar> {
        self.terms.get(&wire)
    }

    /// Number of nonzero terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterate terms in ascending wire order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Scalar)> {
        self.terms.iter().map(|(w, c)| (*w, c))
    }

    /// Largest wire index referenced, if any.
    pub fn max_wire(&self) -> Option<u32> {
        self.terms.keys().next_back().copied()
    }

    /// Evaluate against a witness vector.
    ///
    /// Skips the multiply when the coefficient is one, matching the
    /// evaluation loop the prover itself uses.
    pub fn evaluate(&self, witness: &[Scalar]) -> Scalar {
        let one = Scalar::ONE;
        let mut acc = Scalar::ZERO;
        for (wire, coeff) in self.terms.iter() {
            let mut tmp = witness[*wire as usize];
            if coeff != &one {
                tmp *= coeff;
            }
            acc += tmp;
        }
        acc
    }
}

impl<Scalar: PrimeField> FromIterator<(u32, Scalar)> for LinearCombination<Scalar> {
    fn from_iter<I: IntoIterator<Item = (u32, Scalar)>>(iter: I) -> Self {
        let mut lc = Self::new();
        for (wire, coeff) in iter {
            lc.add_term(wire, coeff);
        }
        lc
    }
}

/// One R1CS constraint: `(a . w) * (b . w) = (c . w)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Constraint<Scalar: PrimeField> {
    pub a: LinearCombination<Scalar>,
    pub b: LinearCombination<Scalar>,
    pub c: LinearCombination<Scalar>,
}

impl<Scalar: PrimeField> Constraint<Scalar> {
    /// `(a . w) * (b . w) - (c . w)`, the residual that must vanish.
    pub fn residual(&self, witness: &[Scalar]) -> Scalar {
        self.a.evaluate(witness) * self.b.evaluate(witness) - self.c.evaluate(witness)
    }

    /// Largest wire index referenced by any of the three combinations.
    pub fn max_wire(&self) -> Option<u32> {
        [&self.a, &self.b, &self.c]
            .iter()
            .filter_map(|lc| lc.max_wire())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use blstrs::Scalar;

    #[test]
    fn test_terms_merge_and_cancel() {
        let mut lc = LinearCombination::<Scalar>::new();
        lc.add_term(3, Scalar::from(2u64));
        lc.add_term(3, Scalar::from(5u64));
        assert_eq!(lc.coeff(3), Some(&Scalar::from(7u64)));

        lc.add_term(3, -Scalar::from(7u64));
        assert!(lc.is_empty());
    }

    #[test]
    fn test_iteration_is_ordered() {
        let lc: LinearCombination<Scalar> = [(9, Scalar::ONE), (1, Scalar::ONE), (4, Scalar::ONE)]
            .into_iter()
            .collect();
        let wires: Vec<u32> = lc.iter().map(|(w, _)| w).collect();
        assert_eq!(wires, vec![1, 4, 9]);
        assert_eq!(lc.max_wire(), Some(9));
    }

    #[test]
    fn test_evaluate() {
        // 2*w1 + 3*w2 over w = [1, 5, 7]
        let lc: LinearCombination<Scalar> =
            [(1, Scalar::from(2u64)), (2, Scalar::from(3u64))]
                .into_iter()
                .collect();
        let w = [Scalar::ONE, Scalar::from(5u64), Scalar::from(7u64)];
        assert_eq!(lc.evaluate(&w), Scalar::from(31u64));
    }

    #[test]
    fn test_constraint_residual() {
        // x * y = z with w = [1, 3, 4, 12]
        let c = Constraint::<Scalar> {
            a: [(1, Scalar::ONE)].into_iter().collect(),
            b: [(2, Scalar::ONE)].into_iter().collect(),
            c: [(3, Scalar::ONE)].into_iter().collect(),
        };
        let w = [
            Scalar::ONE,
            Scalar::from(3u64),
            Scalar::from(4u64),
            Scalar::from(12u64),
        ];
        assert_eq!(c.residual(&w), Scalar::ZERO);

        let bad = [
            Scalar::ONE,
            Scalar::from(3u64),
            Scalar::from(4u64),
            Scalar::from(13u64),
        ];
        assert_ne!(c.residual(&bad), Scalar::ZERO);
    }
}
