//! Configuration for the packing engine, loaded from TOML.
//!
//! All soundness parameters are explicit here rather than hard-coded:
//! the PoSO section documents the formula each one must satisfy, and
//! `validate()` recomputes the bounds instead of trusting the defaults.

use serde::Deserialize;
use std::path::Path;

use crate::error::{PackError, PackResult};

/// Top-level packing configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PackConfig {
    #[serde(default)]
    pub packing: PackingConfig,
    #[serde(default)]
    pub poso: PosoConfig,
    #[serde(default)]
    pub pool: PoolConfig,
}

/// The residue-number embedding: which moduli to pack with.
#[derive(Debug, Clone, Deserialize)]
pub struct PackingConfig {
    /// Pairwise-coprime packing moduli Π. One circuit copy is packed per
    /// modulus, so `pf = moduli.len()`. The product Q must stay below 2^93
    /// so the packed value, the largest quotient, and the PoSO bound all
    /// fit under the scalar field with slack for the auxiliary arithmetic.
    #[serde(default = "PackingConfig::default_moduli")]
    pub moduli: Vec<u64>,
}

impl PackingConfig {
    fn default_moduli() -> Vec<u64> {
        // 11 primes whose product is just under 2^93.
        vec![263, 269, 271, 277, 281, 283, 293, 307, 311, 313, 317]
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            moduli: Self::default_moduli(),
        }
    }
}

/// Parameters of the randomized range-soundness gadget.
///
/// Soundness: each repetition of a random linear combination with
/// `coeff_bits`-bit coefficients catches an out-of-range witness with
/// probability >= 1 - 2^-coeff_bits, so `reps` repetitions give
/// 2^-(reps * coeff_bits) per window; `reps >= ceil(sec_lambda / coeff_bits)`
/// reaches the target, and one extra repetition absorbs the union bound
/// over `num_poso = ceil(n_wires / poso_size)` windows when that matters.
#[derive(Debug, Clone, Deserialize)]
pub struct PosoConfig {
    /// Target statistical soundness exponent (failure probability
    /// 2^-sec_lambda).
    #[serde(default = "PosoConfig::default_sec_lambda")]
    pub sec_lambda: u32,
    /// Bit width of the random public coefficients.
    #[serde(default = "PosoConfig::default_coeff_bits")]
    pub coeff_bits: u32,
    /// Repetitions per window.
    #[serde(default = "PosoConfig::default_reps")]
    pub reps: u32,
    /// Number of wires checked together per window.
    #[serde(default = "PosoConfig::default_poso_size")]
    pub poso_size: u32,
    /// Bit width of the claimed-sum decomposition. Must cover the maximum
    /// possible window sum: `coeff_bits + bits(Q) + ceil(log2(poso_size))`.
    #[serde(default = "PosoConfig::default_poso_bound")]
    pub poso_bound: u32,
    /// Seed for the public-coin coefficient stream. `None` draws a fresh
    /// seed from the OS; setting it makes a run reproducible and lets a
    /// verifier re-derive the coefficient vectors.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PosoConfig {
    fn default_sec_lambda() -> u32 {
        80
    }
    fn default_coeff_bits() -> u32 {
        8
    }
    fn default_reps() -> u32 {
        10
    }
    fn default_poso_size() -> u32 {
        32768
    }
    fn default_poso_bound() -> u32 {
        // coeff_bits + bits(Q) + log2(poso_size) = 8 + 93 + 15
        116
    }
}

impl Default for PosoConfig {
    fn default() -> Self {
        Self {
            sec_lambda: Self::default_sec_lambda(),
            coeff_bits: Self::default_coeff_bits(),
            reps: Self::default_reps(),
            poso_size: Self::default_poso_size(),
            poso_bound: Self::default_poso_bound(),
            seed: None,
        }
    }
}

/// Witness-calculator worker pool.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Concurrent witness-calculator subprocesses. 0 = one per CPU.
    #[serde(default)]
    pub concurrency: u32,
    /// Deadline per subprocess invocation, in seconds. The calculator is
    /// killed when it expires.
    #[serde(default = "PoolConfig::default_deadline_secs")]
    pub deadline_secs: u64,
}

impl PoolConfig {
    fn default_deadline_secs() -> u64 {
        600
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            deadline_secs: Self::default_deadline_secs(),
        }
    }
}

/// Hard ceiling on `bits(Q)`; see [`PackingConfig::moduli`].
pub const MAX_Q_BITS: u32 = 93;

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl PackConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PackConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Number of copies packed together.
    pub fn pf(&self) -> usize {
        self.packing.moduli.len()
    }

    /// The packing modulus Q = product of the moduli.
    ///
    /// Only meaningful after [`validate`](Self::validate); the product is
    /// checked there to fit in `MAX_Q_BITS` bits.
    pub fn q(&self) -> u128 {
        self.packing
            .moduli
            .iter()
            .fold(1u128, |acc, &m| acc * m as u128)
    }

    /// Check every derived bound. Called once at pipeline start; all
    /// failures are [`PackError::Precondition`].
    pub fn validate(&self) -> PackResult<()> {
        let moduli = &self.packing.moduli;
        if moduli.is_empty() {
            return Err(PackError::Precondition("moduli list is empty".into()));
        }
        if moduli.iter().any(|&m| m < 2) {
            return Err(PackError::Precondition("moduli must all be >= 2".into()));
        }
        for i in 0..moduli.len() {
            for j in (i + 1)..moduli.len() {
                if gcd(moduli[i], moduli[j]) != 1 {
                    return Err(PackError::Precondition(format!(
                        "moduli {} and {} are not coprime",
                        moduli[i], moduli[j]
                    )));
                }
            }
        }

        // Q must fit under 2^MAX_Q_BITS (checked multiplication — a huge
        // moduli list would overflow u128 before failing the bit test).
        let mut q: u128 = 1;
        for &m in moduli {
            q = q
                .checked_mul(m as u128)
                .filter(|v| v.leading_zeros() >= 128 - MAX_Q_BITS)
                .ok_or_else(|| {
                    PackError::Precondition(format!(
                        "packing modulus Q exceeds 2^{}",
                        MAX_Q_BITS
                    ))
                })?;
        }
        let q_bits = 128 - q.leading_zeros();

        let poso = &self.poso;
        if poso.coeff_bits == 0 || poso.coeff_bits > 16 {
            return Err(PackError::Precondition(format!(
                "coeff_bits {} out of range 1..=16",
                poso.coeff_bits
            )));
        }
        if poso.poso_size == 0 {
            return Err(PackError::Precondition("poso_size must be >= 1".into()));
        }
        let min_reps = poso.sec_lambda.div_ceil(poso.coeff_bits);
        if poso.reps < min_reps {
            return Err(PackError::Precondition(format!(
                "reps {} below ceil(sec_lambda / coeff_bits) = {}",
                poso.reps, min_reps
            )));
        }
        let window_log = if poso.poso_size <= 1 {
            0
        } else {
            32 - (poso.poso_size - 1).leading_zeros()
        };
        let min_bound = poso.coeff_bits + q_bits + window_log;
        if poso.poso_bound < min_bound {
            return Err(PackError::Precondition(format!(
                "poso_bound {} below coeff_bits + bits(Q) + log2(poso_size) = {}",
                poso.poso_bound, min_bound
            )));
        }
        // The decomposed sum must stay clear of the field size with room
        // for the recomposition arithmetic.
        if poso.poso_bound > 250 {
            return Err(PackError::Precondition(format!(
                "poso_bound {} too close to the scalar field size",
                poso.poso_bound
            )));
        }
        Ok(())
    }
}
