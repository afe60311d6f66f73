//! The CRT embedder: combines per-copy residues into one packed field value.
//!
//! Reconstruction is the explicit Chinese-remainder formula
//! `v = sum_i r_i * modinv(Q/pi_i, pi_i) * (Q/pi_i) mod Q` — the unique
//! value in `[0, Q)` congruent to `r_i` mod `pi_i` for every i. With
//! `Q < 2^93` and at most a few dozen moduli, every intermediate fits in
//! u128, so no big-integer arithmetic is needed on this path.

use blstrs::Scalar;
use ff::PrimeField;
use num_bigint::BigUint;

use zkpack_r1cs::scalar_repr::to_biguint;

use crate::error::{PackError, PackResult};

/// Precomputed CRT reconstruction data for a fixed modulus set.
#[derive(Debug, Clone)]
pub struct CrtBasis {
    moduli: Vec<u64>,
    q: u128,
    /// `Q / pi_i` per modulus.
    cofactors: Vec<u128>,
    /// `modinv(Q / pi_i mod pi_i, pi_i)` per modulus.
    inverses: Vec<u64>,
}

/// Modular inverse of `a` mod `m` (m >= 2, gcd(a, m) == 1).
fn modinv(a: u64, m: u64) -> Option<u64> {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }
    if old_r != 1 {
        return None; // not coprime
    }
    Some(old_s.rem_euclid(m as i128) as u64)
}

impl CrtBasis {
    /// Build the basis. The moduli are assumed validated (pairwise coprime,
    /// product under 2^93) by `PackConfig::validate`; a non-invertible
    /// cofactor still surfaces as a precondition error rather than a wrong
    /// answer.
    pub fn new(moduli: &[u64]) -> PackResult<Self> {
        if moduli.is_empty() {
            return Err(PackError::Precondition("empty modulus set".into()));
        }
        let q: u128 = moduli.iter().fold(1u128, |acc, &m| acc * m as u128);
        let mut cofactors = Vec::with_capacity(moduli.len());
        let mut inverses = Vec::with_capacity(moduli.len());
        for &m in moduli {
            let cofactor = q / m as u128;
            let inv = modinv((cofactor % m as u128) as u64, m).ok_or_else(|| {
                PackError::Precondition(format!("modulus {} not coprime with the rest", m))
            })?;
            cofactors.push(cofactor);
            inverses.push(inv);
        }
        Ok(Self {
            moduli: moduli.to_vec(),
            q,
            cofactors,
            inverses,
        })
    }

    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// The packing modulus Q.
    pub fn q(&self) -> u128 {
        self.q
    }

    /// Number of copies packed per value.
    pub fn pf(&self) -> usize {
        self.moduli.len()
    }

    /// Reconstruct the packed value from one residue per modulus.
    ///
    /// Core invariant: `embed(r)[mod pi_i] == r_i` for every i.
    pub fn embed(&self, residues: &[u64]) -> PackResult<u128> {
        if residues.len() != self.moduli.len() {
            return Err(PackError::Precondition(format!(
                "residue count {} != modulus count {}",
                residues.len(),
                self.moduli.len()
            )));
        }
        let mut acc: u128 = 0;
        for (i, &r) in residues.iter().enumerate() {
            let m = self.moduli[i];
            if r >= m {
                return Err(PackError::Precondition(format!(
                    "residue {} not reduced modulo {}",
                    r, m
                )));
            }
            // Reduce r * inv mod pi first so each term stays below Q.
            let term = ((r as u128 * self.inverses[i] as u128) % m as u128) * self.cofactors[i];
            acc += term;
        }
        Ok(acc % self.q)
    }

    /// Pack `pf` per-copy witness vectors into one vector, per index.
    ///
    /// Each copy value is reduced to its residue modulo the copy's modulus
    /// before reconstruction. The constant-one wire packs to one again
    /// (all residues 1), so the witness convention is preserved.
    pub fn embed_vectors(&self, copies: &[Vec<Scalar>]) -> PackResult<Vec<Scalar>> {
        if copies.len() != self.pf() {
            return Err(PackError::Precondition(format!(
                "got {} witness copies, packing needs {}",
                copies.len(),
                self.pf()
            )));
        }
        let len = copies[0].len();
        if copies.iter().any(|c| c.len() != len) {
            return Err(PackError::Precondition(
                "witness copies have differing lengths".into(),
            ));
        }

        let mut packed = Vec::with_capacity(len);
        let mut residues = vec![0u64; self.pf()];
        for j in 0..len {
            for (i, copy) in copies.iter().enumerate() {
                residues[i] = reduce_mod(&copy[j], self.moduli[i]);
            }
            let v = self.embed(&residues)?;
            packed.push(Scalar::from_u128(v));
        }
        Ok(packed)
    }
}

/// Integer representative of `v` reduced modulo a small modulus.
fn reduce_mod(v: &Scalar, m: u64) -> u64 {
    let int: BigUint = to_biguint(v);
    let rem = int % BigUint::from(m);
    // remainder of a u64 modulus always fits u64
    rem.to_u64_digits().first().copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;

    #[test]
    fn test_reference_example() {
        // moduli {3, 5}, residues (2, 3): the unique value in [0, 15) is 8.
        let basis = CrtBasis::new(&[3, 5]).unwrap();
        assert_eq!(basis.q(), 15);
        assert_eq!(basis.embed(&[2, 3]).unwrap(), 8);
    }

    #[test]
    fn test_embed_inverts_reduction() {
        let moduli = [263u64, 269, 271, 277, 281, 283, 293, 307, 311, 313, 317];
        let basis = CrtBasis::new(&moduli).unwrap();
        // Deterministic spread of residues, including 0 and pi-1.
        let cases: Vec<Vec<u64>> = vec![
            moduli.iter().map(|_| 0).collect(),
            moduli.iter().map(|&m| m - 1).collect(),
            moduli.iter().enumerate().map(|(i, &m)| (i as u64 * 97 + 13) % m).collect(),
            moduli.iter().enumerate().map(|(i, &m)| (i as u64 + 1) % m).collect(),
        ];
        for residues in cases {
            let v = basis.embed(&residues).unwrap();
            assert!(v < basis.q());
            for (i, &m) in moduli.iter().enumerate() {
                assert_eq!(v % m as u128, residues[i] as u128, "mismatch at modulus {}", m);
            }
        }
    }

    #[test]
    fn test_all_ones_packs_to_one() {
        let basis = CrtBasis::new(&[3, 5, 7]).unwrap();
        assert_eq!(basis.embed(&[1, 1, 1]).unwrap(), 1);
    }

    #[test]
    fn test_unreduced_residue_rejected() {
        let basis = CrtBasis::new(&[3, 5]).unwrap();
        assert!(matches!(
            basis.embed(&[3, 0]),
            Err(PackError::Precondition(_))
        ));
    }

    #[test]
    fn test_embed_vectors() {
        let basis = CrtBasis::new(&[3, 5]).unwrap();
        let copies = vec![
            vec![Scalar::ONE, Scalar::from(2u64), Scalar::ZERO],
            vec![Scalar::ONE, Scalar::from(3u64), Scalar::from(4u64)],
        ];
        let packed = basis.embed_vectors(&copies).unwrap();
        assert_eq!(packed[0], Scalar::ONE);
        assert_eq!(packed[1], Scalar::from(8u64));
        // 0 mod 3, 4 mod 5 -> 24
        assert_eq!(packed[2], Scalar::from(24u64));
    }

    #[test]
    fn test_copy_count_mismatch_rejected() {
        let basis = CrtBasis::new(&[3, 5]).unwrap();
        let copies = vec![vec![Scalar::ONE]];
        assert!(matches!(
            basis.embed_vectors(&copies),
            Err(PackError::Precondition(_))
        ));
    }

    #[test]
    fn test_large_value_reduction() {
        // -1 = p - 1; its residue mod 3 is (p - 1) mod 3, and embedding it
        // must still reduce correctly.
        let basis = CrtBasis::new(&[3, 5]).unwrap();
        let copies = vec![vec![-Scalar::ONE], vec![-Scalar::ONE]];
        let packed = basis.embed_vectors(&copies).unwrap();
        let r3 = reduce_mod(&-Scalar::ONE, 3);
        let r5 = reduce_mod(&-Scalar::ONE, 5);
        let expected = basis.embed(&[r3, r5]).unwrap();
        assert_eq!(packed[0], Scalar::from_u128(expected));
    }
}
