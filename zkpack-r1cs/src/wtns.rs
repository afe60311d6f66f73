//! Binary `.wtns` witness format consumed by the external prover.
//!
//! Layout (all multi-byte integers little-endian):
//!   - magic `"wtns"` (4B) + u32 version (2) + u32 section count (2)
//!   - section 1: u32 id (1) + u64 length (8 + n8) + u32 n8 (32) +
//!     field modulus (n8 bytes, little-endian) + u32 witness length
//!   - section 2: u32 id (2) + u64 length (n8 * witness length) + elements
//!
//! Element encoding: each element is eight 32-bit words, **most significant
//! word first**, each word little-endian on disk. This is the slicing
//! convention the prover expects and differs from the fully little-endian
//! modulus in section 1; both are kept bit-exact here. Equivalently, the
//! canonical little-endian bytes are emitted in reversed 4-byte groups.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use ff::PrimeField;
use tracing::info;

use crate::scalar_repr::{from_le_bytes, modulus_le_bytes, to_le_bytes, FIELD_BYTES};

/// Magic bytes identifying a wtns file.
const WTNS_MAGIC: [u8; 4] = *b"wtns";

/// Format version this module reads and writes.
const WTNS_VERSION: u32 = 2;

/// Number of 4-byte words per element.
const WORDS: usize = FIELD_BYTES / 4;

/// Fixed byte overhead before the element data.
const PREAMBLE: usize = 4 + 4 + 4 + 4 + 8 + 4 + FIELD_BYTES + 4 + 4 + 8;

/// Encode one element: little-endian bytes regrouped most-significant-word
/// first.
fn encode_element(le: &[u8], out: &mut Vec<u8>) {
    for word in (0..WORDS).rev() {
        out.extend_from_slice(&le[word * 4..word * 4 + 4]);
    }
}

/// Decode one element back to little-endian bytes.
fn decode_element(disk: &[u8]) -> [u8; FIELD_BYTES] {
    let mut le = [0u8; FIELD_BYTES];
    for word in 0..WORDS {
        let src = &disk[word * 4..word * 4 + 4];
        le[(WORDS - 1 - word) * 4..(WORDS - word) * 4].copy_from_slice(src);
    }
    le
}

/// Serialize a witness vector to the wire format.
pub fn serialize<Scalar: PrimeField>(witness: &[Scalar]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREAMBLE + witness.len() * FIELD_BYTES);

    out.extend_from_slice(&WTNS_MAGIC);
    out.extend_from_slice(&WTNS_VERSION.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());

    // Section 1: field metadata + witness length
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&((8 + FIELD_BYTES) as u64).to_le_bytes());
    out.extend_from_slice(&(FIELD_BYTES as u32).to_le_bytes());
    out.extend_from_slice(&modulus_le_bytes::<Scalar>());
    out.extend_from_slice(&(witness.len() as u32).to_le_bytes());

    // Section 2: element data
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&((witness.len() * FIELD_BYTES) as u64).to_le_bytes());
    for value in witness {
        encode_element(&to_le_bytes(value), &mut out);
    }
    out
}

fn take<'a>(bytes: &mut &'a [u8], n: usize, what: &str) -> anyhow::Result<&'a [u8]> {
    if bytes.len() < n {
        bail!("wtns truncated while reading {}", what);
    }
    let (head, rest) = bytes.split_at(n);
    *bytes = rest;
    Ok(head)
}

fn take_u32(bytes: &mut &[u8], what: &str) -> anyhow::Result<u32> {
    let b = take(bytes, 4, what)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn take_u64(bytes: &mut &[u8], what: &str) -> anyhow::Result<u64> {
    let b = take(bytes, 8, what)?;
    Ok(u64::from_le_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

/// Parse a wtns byte stream. Inverse of [`serialize`] for every canonical
/// element in `[0, p)`.
pub fn deserialize<Scalar: PrimeField>(mut bytes: &[u8]) -> anyhow::Result<Vec<Scalar>> {
    let magic = take(&mut bytes, 4, "magic")?;
    if magic != WTNS_MAGIC {
        bail!("invalid wtns magic: expected {:?}, got {:?}", WTNS_MAGIC, magic);
    }
    let version = take_u32(&mut bytes, "version")?;
    if version != WTNS_VERSION {
        bail!("incompatible wtns version: expected {}, got {}", WTNS_VERSION, version);
    }
    let n_sections = take_u32(&mut bytes, "section count")?;
    if n_sections != 2 {
        bail!("unexpected wtns section count: {}", n_sections);
    }

    let section1_id = take_u32(&mut bytes, "section 1 id")?;
    if section1_id != 1 {
        bail!("unexpected section id: {} (expected 1)", section1_id);
    }
    let section1_len = take_u64(&mut bytes, "section 1 length")?;
    if section1_len != (8 + FIELD_BYTES) as u64 {
        bail!("unexpected section 1 length: {}", section1_len);
    }
    let n8 = take_u32(&mut bytes, "field width")?;
    if n8 as usize != FIELD_BYTES {
        bail!("unsupported field width: {} bytes (expected {})", n8, FIELD_BYTES);
    }
    let prime = take(&mut bytes, FIELD_BYTES, "field modulus")?;
    if prime != modulus_le_bytes::<Scalar>() {
        bail!("wtns prime does not match the configured scalar field");
    }
    let witness_len = take_u32(&mut bytes, "witness length")? as usize;

    let section2_id = take_u32(&mut bytes, "section 2 id")?;
    if section2_id != 2 {
        bail!("unexpected section id: {} (expected 2)", section2_id);
    }
    let section2_len = take_u64(&mut bytes, "section 2 length")?;
    if section2_len != (witness_len * FIELD_BYTES) as u64 {
        bail!(
            "section 2 length {} does not match witness length {}",
            section2_len,
            witness_len
        );
    }

    let mut witness = Vec::with_capacity(witness_len);
    for i in 0..witness_len {
        let disk = take(&mut bytes, FIELD_BYTES, "witness element")?;
        let le = decode_element(disk);
        let value = from_le_bytes::<Scalar>(&le)
            .with_context(|| format!("witness element {} is not a canonical field element", i))?;
        witness.push(value);
    }
    Ok(witness)
}

/// Write a witness file atomically (`.tmp` then rename).
pub fn save<Scalar: PrimeField>(path: &Path, witness: &[Scalar]) -> anyhow::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, serialize(witness))
        .with_context(|| format!("failed to write witness file: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!("failed to rename {} -> {}", tmp_path.display(), path.display())
    })?;
    info!(path = %path.display(), witness_len = witness.len(), "witness written");
    Ok(())
}

/// Read a witness file.
pub fn load<Scalar: PrimeField>(path: &Path) -> anyhow::Result<Vec<Scalar>> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read witness file: {}", path.display()))?;
    deserialize(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use blstrs::Scalar;

    #[test]
    fn test_roundtrip_boundary_values() {
        let witness = vec![
            Scalar::ZERO,
            Scalar::ONE,
            -Scalar::ONE, // p - 1
            Scalar::from(u64::MAX),
        ];
        let bytes = serialize(&witness);
        let decoded: Vec<Scalar> = deserialize(&bytes).unwrap();
        assert_eq!(decoded, witness);
    }

    #[test]
    fn test_empty_witness() {
        let bytes = serialize::<Scalar>(&[]);
        assert_eq!(bytes.len(), PREAMBLE);
        let decoded: Vec<Scalar> = deserialize(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_header_layout() {
        let bytes = serialize(&[Scalar::ONE]);
        assert_eq!(&bytes[0..4], b"wtns");
        // version, section count
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
        // section 1: id, length, n8
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 1);
        assert_eq!(u64::from_le_bytes(bytes[16..24].try_into().unwrap()), 40);
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 32);
        // modulus is fully little-endian: low byte of the BLS12-381 scalar
        // modulus is 0x01
        assert_eq!(bytes[28], 0x01);
        // witness length
        assert_eq!(u32::from_le_bytes(bytes[60..64].try_into().unwrap()), 1);
        // section 2: id, length
        assert_eq!(u32::from_le_bytes(bytes[64..68].try_into().unwrap()), 2);
        assert_eq!(u64::from_le_bytes(bytes[68..76].try_into().unwrap()), 32);
    }

    #[test]
    fn test_element_is_most_significant_word_first() {
        let bytes = serialize(&[Scalar::ONE]);
        let element = &bytes[PREAMBLE..];
        assert_eq!(element.len(), 32);
        // The value 1 lives in the least significant word, which is the
        // *last* word on disk.
        assert_eq!(&element[0..28], &[0u8; 28]);
        assert_eq!(&element[28..32], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_truncated_input_rejected() {
        let bytes = serialize(&[Scalar::ONE, Scalar::from(2u64)]);
        assert!(deserialize::<Scalar>(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let mut bytes = serialize(&[Scalar::ONE]);
        bytes[0] = b'x';
        assert!(deserialize::<Scalar>(&bytes).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("witness.wtns");
        let witness = vec![Scalar::ONE, Scalar::from(42u64), -Scalar::ONE];
        save(&path, &witness).unwrap();
        let loaded: Vec<Scalar> = load(&path).unwrap();
        assert_eq!(loaded, witness);
    }
}
