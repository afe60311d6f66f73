//! The packing pipeline: load, pool, embed, extend, check, write.
//!
//! Stage order is fixed; every stage after the witness pool owns the
//! system/witness pair exclusively and runs sequentially, since each
//! stage's correctness depends on the previous stage's invariants. No
//! output file is written until the consistency check has passed, so a
//! failed run leaves nothing a downstream consumer could mistake for a
//! valid artifact.

use std::path::{Path, PathBuf};
use std::time::Instant;

use blstrs::Scalar;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

use zkpack_r1cs::{r1cs_file, wtns, R1csSystem, SymbolTable};

use crate::check::check_satisfied;
use crate::config::PackConfig;
use crate::crt::CrtBasis;
use crate::error::{PackError, PackResult};
use crate::poso::synthesize_poso;
use crate::quotient::synthesize_quotients;
use crate::stats::MagnitudeStats;
use crate::witness_pool::{InputMap, WitnessPool};

/// Where a finished run left its artifacts, plus the knobs a verifier
/// needs to reproduce it.
#[derive(Debug, Clone)]
pub struct PackOutput {
    pub r1cs_path: PathBuf,
    pub sym_path: PathBuf,
    pub wtns_path: PathBuf,
    pub n_wires: u32,
    pub n_constraints: usize,
    /// The PoSO public-coin seed actually used.
    pub seed: u64,
}

/// One packing run over a compiled circuit.
pub struct Pipeline {
    config: PackConfig,
    /// Path to the compiled `.r1cs`; the `.sym` sibling is picked up from
    /// the same stem when present.
    circuit: PathBuf,
    calculator: PathBuf,
    out_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        config: PackConfig,
        circuit: impl Into<PathBuf>,
        calculator: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            circuit: circuit.into(),
            calculator: calculator.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Pack `pf` circuit copies into one extended system and witness.
    ///
    /// `inputs` carries one input map per copy, in modulus order.
    pub fn run(&self, inputs: &[InputMap]) -> PackResult<PackOutput> {
        let start = Instant::now();
        self.config.validate()?;
        let basis = CrtBasis::new(&self.config.packing.moduli)?;
        if inputs.len() != basis.pf() {
            return Err(PackError::Precondition(format!(
                "got {} input maps, packing needs one per modulus ({})",
                inputs.len(),
                basis.pf()
            )));
        }

        let (mut system, mut symbols) = self.load_circuit()?;
        let n_original_wires = system.n_wires;

        let pool = WitnessPool::new(
            self.calculator.clone(),
            self.out_dir.join("pool"),
            self.config.pool.clone(),
        );
        let copies = pool.compute(inputs)?;
        for (i, copy) in copies.iter().enumerate() {
            if copy.len() != system.n_wires as usize {
                return Err(PackError::Precondition(format!(
                    "copy {} witness length {} != n_wires {}",
                    i,
                    copy.len(),
                    system.n_wires
                )));
            }
        }

        let mut witness = basis.embed_vectors(&copies)?;
        synthesize_quotients(&mut system, &mut witness, &mut symbols, basis.q())?;

        let seed = match self.config.poso.seed {
            Some(seed) => seed,
            None => rand::thread_rng().gen(),
        };
        info!(seed, "PoSO public-coin seed");
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        synthesize_poso(&mut system, &mut witness, &mut symbols, &self.config.poso, &mut rng)?;

        check_satisfied(&system, &witness)?;

        let stats = MagnitudeStats::measure(&system, &witness);
        debug!(
            max_coefficient_bits = stats.max_coefficient.bits(),
            max_witness_bits = stats.max_witness.bits(),
            "magnitude diagnostics"
        );

        let (r1cs_path, sym_path, wtns_path) = self.write_artifacts(&system, &symbols, &witness)?;
        info!(
            n_original_wires,
            n_wires = system.n_wires,
            n_constraints = system.n_constraints(),
            pf = basis.pf(),
            duration_ms = start.elapsed().as_millis(),
            "packing complete"
        );
        Ok(PackOutput {
            r1cs_path,
            sym_path,
            wtns_path,
            n_wires: system.n_wires,
            n_constraints: system.n_constraints(),
            seed,
        })
    }

    fn load_circuit(&self) -> PackResult<(R1csSystem<Scalar>, SymbolTable)> {
        if !self.circuit.is_file() {
            return Err(PackError::NotCompiled(self.circuit.clone()));
        }
        let system = r1cs_file::load(&self.circuit).map_err(PackError::Io)?;
        let sym_path = self.circuit.with_extension("sym");
        let symbols = if sym_path.is_file() {
            SymbolTable::load(&sym_path).map_err(PackError::Io)?
        } else {
            debug!(path = %sym_path.display(), "no symbol file, starting empty");
            SymbolTable::new()
        };
        Ok((system, symbols))
    }

    fn write_artifacts(
        &self,
        system: &R1csSystem<Scalar>,
        symbols: &SymbolTable,
        witness: &[Scalar],
    ) -> PackResult<(PathBuf, PathBuf, PathBuf)> {
        std::fs::create_dir_all(&self.out_dir).map_err(|e| {
            PackError::Io(anyhow::anyhow!(
                "failed to create output dir {}: {}",
                self.out_dir.display(),
                e
            ))
        })?;
        let stem = circuit_stem(&self.circuit);
        let r1cs_path = self.out_dir.join(format!("{}_packed.r1cs", stem));
        let sym_path = self.out_dir.join(format!("{}_packed.sym", stem));
        let wtns_path = self.out_dir.join(format!("{}_packed.wtns", stem));

        r1cs_file::store(&r1cs_path, system).map_err(PackError::Io)?;
        symbols.store(&sym_path).map_err(PackError::Io)?;
        wtns::save(&wtns_path, witness).map_err(PackError::Io)?;

        Ok((r1cs_path, sym_path, wtns_path))
    }
}

fn circuit_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "circuit".to_string())
}
