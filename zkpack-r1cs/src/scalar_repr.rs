//! Conversions between field elements, their canonical little-endian byte
//! representation, and arbitrary-precision integers.
//!
//! The file formats in this crate fix the element width at 32 bytes
//! (8 little-endian 32-bit words), which matches `blstrs::Scalar` and every
//! other ~255-bit scalar field the external prover understands.

use ff::PrimeField;
use num_bigint::BigUint;

/// Byte width of one field element on disk.
pub const FIELD_BYTES: usize = 32;

/// Canonical little-endian bytes of a field element.
pub fn to_le_bytes<Scalar: PrimeField>(v: &Scalar) -> Vec<u8> {
    v.to_repr().as_ref().to_vec()
}

/// Parse a field element from canonical little-endian bytes.
///
/// Returns `None` if the byte length does not match the repr width or the
/// value is not canonical (>= p).
pub fn from_le_bytes<Scalar: PrimeField>(bytes: &[u8]) -> Option<Scalar> {
    let mut repr = Scalar::Repr::default();
    if bytes.len() != repr.as_ref().len() {
        return None;
    }
    repr.as_mut().copy_from_slice(bytes);
    Option::from(Scalar::from_repr(repr))
}

/// Integer representative of a field element in `[0, p)`.
pub fn to_biguint<Scalar: PrimeField>(v: &Scalar) -> BigUint {
    BigUint::from_bytes_le(v.to_repr().as_ref())
}

/// Field element from an integer. `None` if `v >= p`.
pub fn from_biguint<Scalar: PrimeField>(v: &BigUint) -> Option<Scalar> {
    let bytes = v.to_bytes_le();
    let mut repr = Scalar::Repr::default();
    let width = repr.as_ref().len();
    if bytes.len() > width {
        return None;
    }
    repr.as_mut()[..bytes.len()].copy_from_slice(&bytes);
    Option::from(Scalar::from_repr(repr))
}

/// The field modulus `p` as an integer.
pub fn modulus<Scalar: PrimeField>() -> BigUint {
    let s = Scalar::MODULUS;
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
        None => BigUint::parse_bytes(s.as_bytes(), 10),
    };
    parsed.expect("PrimeField::MODULUS is a valid constant")
}

/// Modulus bytes, little-endian, zero-padded to [`FIELD_BYTES`].
pub fn modulus_le_bytes<Scalar: PrimeField>() -> [u8; FIELD_BYTES] {
    let bytes = modulus::<Scalar>().to_bytes_le();
    let mut out = [0u8; FIELD_BYTES];
    out[..bytes.len()].copy_from_slice(&bytes);
    out
}

/// Balanced-representative magnitude: `min(v, p - v)`.
///
/// Small positive and small negative field values both map to a small
/// magnitude, which is what the packing engine's "small entries" checks
/// care about.
pub fn magnitude<Scalar: PrimeField>(v: &Scalar, p: &BigUint) -> BigUint {
    let int = to_biguint(v);
    let neg = p - &int;
    if int < neg {
        int
    } else {
        neg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use blstrs::Scalar;
    use num_traits::One;

    #[test]
    fn test_le_bytes_roundtrip() {
        for v in [Scalar::ZERO, Scalar::ONE, -Scalar::ONE, Scalar::from(12345u64)] {
            let bytes = to_le_bytes(&v);
            assert_eq!(bytes.len(), FIELD_BYTES);
            assert_eq!(from_le_bytes::<Scalar>(&bytes), Some(v));
        }
    }

    #[test]
    fn test_non_canonical_rejected() {
        // p itself is not a canonical encoding
        let p = modulus_le_bytes::<Scalar>();
        assert_eq!(from_le_bytes::<Scalar>(&p), None);
    }

    #[test]
    fn test_biguint_roundtrip() {
        let p = modulus::<Scalar>();
        let p_minus_one = &p - BigUint::one();
        let v = from_biguint::<Scalar>(&p_minus_one).unwrap();
        assert_eq!(v, -Scalar::ONE);
        assert_eq!(to_biguint(&v), p_minus_one);
        assert_eq!(from_biguint::<Scalar>(&p), None);
    }

    #[test]
    fn test_magnitude_is_balanced() {
        let p = modulus::<Scalar>();
        assert_eq!(magnitude(&Scalar::from(7u64), &p), BigUint::from(7u32));
        assert_eq!(magnitude(&(-Scalar::from(7u64)), &p), BigUint::from(7u32));
    }
}
