//! Binary `.r1cs` reader/writer (circom constraint-system format, version 1).
//!
//! File layout:
//!   - magic `"r1cs"` (4B) + u32 version + u32 section count
//!   - sections, each: u32 type + u64 byte length + payload
//!     - type 1 (header): u32 n8 + prime (n8 bytes LE) + u32 nWires +
//!       u32 nPubOut + u32 nPubIn + u32 nPrvIn + u64 nLabels + u32 nConstraints
//!     - type 2 (constraints): per constraint, three linear combinations,
//!       each as u32 term count + (u32 wire, n8-byte LE coefficient) pairs
//!     - type 3 (wire-to-label map): u64 label per wire
//!
//! Unknown section types are skipped by length, so files carrying custom
//! sections still load. Writes go to a `.tmp` sibling first and are renamed
//! into place, so an interrupted write never leaves a truncated file behind.

use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context};
use ff::PrimeField;
use tracing::info;

use crate::lc::{Constraint, LinearCombination};
use crate::scalar_repr::{from_le_bytes, modulus_le_bytes, to_le_bytes, FIELD_BYTES};
use crate::system::R1csSystem;

/// Magic bytes identifying an r1cs file.
const R1CS_MAGIC: [u8; 4] = *b"r1cs";

/// Format version this module reads and writes.
const R1CS_VERSION: u32 = 1;

const SECTION_HEADER: u32 = 1;
const SECTION_CONSTRAINTS: u32 = 2;
const SECTION_MAP: u32 = 3;

// ─── Primitive readers/writers ──────────────────────────────────────────────

fn read_u32(r: &mut impl Read) -> anyhow::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> anyhow::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_scalar<Scalar: PrimeField>(r: &mut impl Read) -> anyhow::Result<Scalar> {
    let mut buf = [0u8; FIELD_BYTES];
    r.read_exact(&mut buf)?;
    from_le_bytes(&buf).ok_or_else(|| anyhow::anyhow!("non-canonical field element in r1cs file"))
}

fn write_u32(w: &mut impl Write, v: u32) -> anyhow::Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64(w: &mut impl Write, v: u64) -> anyhow::Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

// ─── Section payloads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Header {
    n8: u32,
    n_wires: u32,
    n_pub_out: u32,
    n_pub_in: u32,
    n_prv_in: u32,
    n_labels: u64,
    n_constraints: u32,
}

fn read_header<Scalar: PrimeField>(r: &mut impl Read) -> anyhow::Result<Header> {
    let n8 = read_u32(r)?;
    if n8 as usize != FIELD_BYTES {
        bail!("unsupported field width: {} bytes (expected {})", n8, FIELD_BYTES);
    }
    let mut prime = [0u8; FIELD_BYTES];
    r.read_exact(&mut prime)?;
    if prime != modulus_le_bytes::<Scalar>() {
        bail!("r1cs file prime does not match the configured scalar field");
    }
    Ok(Header {
        n8,
        n_wires: read_u32(r)?,
        n_pub_out: read_u32(r)?,
        n_pub_in: read_u32(r)?,
        n_prv_in: read_u32(r)?,
        n_labels: read_u64(r)?,
        n_constraints: read_u32(r)?,
    })
}

fn read_lc<Scalar: PrimeField>(r: &mut impl Read) -> anyhow::Result<LinearCombination<Scalar>> {
    let n_terms = read_u32(r)?;
    let mut lc = LinearCombination::new();
    for _ in 0..n_terms {
        let wire = read_u32(r)?;
        let coeff: Scalar = read_scalar(r)?;
        lc.set_term(wire, coeff);
    }
    Ok(lc)
}

fn write_lc<Scalar: PrimeField>(
    w: &mut impl Write,
    lc: &LinearCombination<Scalar>,
) -> anyhow::Result<()> {
    write_u32(w, lc.len() as u32)?;
    for (wire, coeff) in lc.iter() {
        write_u32(w, wire)?;
        w.write_all(&to_le_bytes(coeff))?;
    }
    Ok(())
}

fn lc_byte_len<Scalar: PrimeField>(lc: &LinearCombination<Scalar>) -> u64 {
    4 + lc.len() as u64 * (4 + FIELD_BYTES as u64)
}

// ─── Public API ─────────────────────────────────────────────────────────────

/// Load an `.r1cs` file into the in-memory model.
///
/// Validates magic, version and field prime before touching the payload.
pub fn load<Scalar: PrimeField>(path: &Path) -> anyhow::Result<R1csSystem<Scalar>> {
    let start = Instant::now();
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open r1cs file: {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .context("failed to read r1cs magic")?;
    if magic != R1CS_MAGIC {
        bail!("invalid r1cs magic: expected {:?}, got {:?}", R1CS_MAGIC, magic);
    }
    let version = read_u32(&mut reader)?;
    if version != R1CS_VERSION {
        bail!("incompatible r1cs version: expected {}, got {}", R1CS_VERSION, version);
    }
    let n_sections = read_u32(&mut reader)?;

    let mut header: Option<Header> = None;
    let mut constraints: Vec<Constraint<Scalar>> = Vec::new();
    let mut wire_to_label: Vec<u64> = Vec::new();

    for _ in 0..n_sections {
        let section_type = read_u32(&mut reader)?;
        let section_len = read_u64(&mut reader)?;
        match section_type {
            SECTION_HEADER => {
                header = Some(read_header::<Scalar>(&mut reader)?);
            }
            SECTION_CONSTRAINTS => {
                let h = header
                    .context("constraints section appears before the header section")?;
                constraints.reserve(h.n_constraints as usize);
                for _ in 0..h.n_constraints {
                    constraints.push(Constraint {
                        a: read_lc(&mut reader)?,
                        b: read_lc(&mut reader)?,
                        c: read_lc(&mut reader)?,
                    });
                }
            }
            SECTION_MAP => {
                let h = header.context("map section appears before the header section")?;
                wire_to_label.reserve(h.n_wires as usize);
                for _ in 0..h.n_wires {
                    wire_to_label.push(read_u64(&mut reader)?);
                }
            }
            other => {
                // Custom section: skip by length.
                let mut skipped = vec![0u8; section_len as usize];
                reader
                    .read_exact(&mut skipped)
                    .with_context(|| format!("failed to skip section type {}", other))?;
            }
        }
    }

    let header = header.context("r1cs file has no header section")?;
    if constraints.len() != header.n_constraints as usize {
        bail!(
            "constraint count mismatch: header says {}, file has {}",
            header.n_constraints,
            constraints.len()
        );
    }
    if wire_to_label.is_empty() {
        // Map section is optional in practice; identity map as fallback.
        wire_to_label = (0..header.n_wires as u64).collect();
    }

    let system = R1csSystem {
        n_wires: header.n_wires,
        n_pub_out: header.n_pub_out,
        n_pub_in: header.n_pub_in,
        n_prv_in: header.n_prv_in,
        n_labels: header.n_labels,
        constraints,
        wire_to_label,
    };
    system.validate().map_err(|e| anyhow::anyhow!(e))?;

    info!(
        path = %path.display(),
        n_wires = system.n_wires,
        n_constraints = system.n_constraints(),
        n_labels = system.n_labels,
        duration_ms = start.elapsed().as_millis(),
        "r1cs loaded"
    );
    Ok(system)
}

/// Write an `.r1cs` file bit-exactly (header, constraints, map sections).
pub fn store<Scalar: PrimeField>(path: &Path, system: &R1csSystem<Scalar>) -> anyhow::Result<()> {
    system.validate().map_err(|e| anyhow::anyhow!(e))?;

    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }
    let file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);

    writer.write_all(&R1CS_MAGIC)?;
    write_u32(&mut writer, R1CS_VERSION)?;
    write_u32(&mut writer, 3)?;

    // Header section
    let header_len = 4 + FIELD_BYTES as u64 + 4 * 4 + 8 + 4;
    write_u32(&mut writer, SECTION_HEADER)?;
    write_u64(&mut writer, header_len)?;
    write_u32(&mut writer, FIELD_BYTES as u32)?;
    writer.write_all(&modulus_le_bytes::<Scalar>())?;
    write_u32(&mut writer, system.n_wires)?;
    write_u32(&mut writer, system.n_pub_out)?;
    write_u32(&mut writer, system.n_pub_in)?;
    write_u32(&mut writer, system.n_prv_in)?;
    write_u64(&mut writer, system.n_labels)?;
    write_u32(&mut writer, system.n_constraints() as u32)?;

    // Constraints section
    let constraints_len: u64 = system
        .constraints
        .iter()
        .map(|t| lc_byte_len(&t.a) + lc_byte_len(&t.b) + lc_byte_len(&t.c))
        .sum();
    write_u32(&mut writer, SECTION_CONSTRAINTS)?;
    write_u64(&mut writer, constraints_len)?;
    for constraint in &system.constraints {
        write_lc(&mut writer, &constraint.a)?;
        write_lc(&mut writer, &constraint.b)?;
        write_lc(&mut writer, &constraint.c)?;
    }

    // Wire-to-label map section
    write_u32(&mut writer, SECTION_MAP)?;
    write_u64(&mut writer, system.wire_to_label.len() as u64 * 8)?;
    for label in &system.wire_to_label {
        write_u64(&mut writer, *label)?;
    }

    writer.flush()?;
    writer.into_inner()?.sync_all()?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!("failed to rename {} -> {}", tmp_path.display(), path.display())
    })?;

    info!(
        path = %path.display(),
        n_wires = system.n_wires,
        n_constraints = system.n_constraints(),
        "r1cs written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use blstrs::Scalar;

    fn sample_system() -> R1csSystem<Scalar> {
        let mut sys = R1csSystem::new();
        sys.n_pub_out = 1;
        let x = sys.new_wire();
        let y = sys.new_wire();
        let z = sys.new_wire();
        sys.append_constraint(Constraint {
            a: [(x, Scalar::from(2u64)), (0, -Scalar::ONE)].into_iter().collect(),
            b: [(y, Scalar::ONE)].into_iter().collect(),
            c: [(z, Scalar::ONE)].into_iter().collect(),
        });
        sys.append_constraint(Constraint {
            a: [(z, Scalar::ONE)].into_iter().collect(),
            b: [(z, Scalar::ONE)].into_iter().collect(),
            c: [(z, -Scalar::from(3u64))].into_iter().collect(),
        });
        sys
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circuit.r1cs");
        let sys = sample_system();
        store(&path, &sys).unwrap();
        let loaded: R1csSystem<Scalar> = load(&path).unwrap();

        assert_eq!(loaded.n_wires, sys.n_wires);
        assert_eq!(loaded.n_pub_out, sys.n_pub_out);
        assert_eq!(loaded.n_labels, sys.n_labels);
        assert_eq!(loaded.wire_to_label, sys.wire_to_label);
        assert_eq!(loaded.constraints, sys.constraints);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.r1cs");
        fs::write(&path, b"nope0000").unwrap();
        assert!(load::<Scalar>(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.r1cs");
        assert!(load::<Scalar>(&path).is_err());
    }

    #[test]
    fn test_magic_and_version_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circuit.r1cs");
        store(&path, &sample_system()).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"r1cs");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 1);
        assert_eq!(u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 3);
    }
}
