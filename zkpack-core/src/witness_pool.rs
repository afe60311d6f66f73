//! Witness pool: one external calculator run per circuit copy.
//!
//! Each copy gets its own input JSON and output file, so the runs share no
//! state and can proceed under a bounded worker pool. All results are
//! joined before packing starts. Calculator calls are one-shot with no
//! retry; a non-zero exit, missing output, or an expired deadline aborts
//! the whole pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::Context;
use blstrs::Scalar;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use zkpack_r1cs::scalar_repr::to_biguint;
use zkpack_r1cs::wtns;

use crate::config::PoolConfig;
use crate::error::{PackError, PackResult};

/// Named input signals for one circuit copy, each an array of field
/// elements. Serialized as decimal strings, the encoding the calculator
/// and prover both consume.
pub type InputMap = BTreeMap<String, Vec<Scalar>>;

/// Render one copy's inputs as the calculator's JSON shape.
pub fn input_json(input: &InputMap) -> String {
    let mut map = serde_json::Map::new();
    for (name, values) in input {
        let arr: Vec<Value> = values
            .iter()
            .map(|v| Value::String(to_biguint(v).to_string()))
            .collect();
        map.insert(name.clone(), Value::Array(arr));
    }
    Value::Object(map).to_string()
}

/// Drives the per-circuit witness calculator binary, one invocation per
/// copy, bounded by [`PoolConfig::concurrency`].
pub struct WitnessPool {
    calculator: PathBuf,
    work_dir: PathBuf,
    config: PoolConfig,
}

impl WitnessPool {
    pub fn new(calculator: PathBuf, work_dir: PathBuf, config: PoolConfig) -> Self {
        Self {
            calculator,
            work_dir,
            config,
        }
    }

    /// Compute one satisfying assignment per input map. Returns the copies
    /// in input order.
    pub fn compute(&self, inputs: &[InputMap]) -> PackResult<Vec<Vec<Scalar>>> {
        let start = Instant::now();
        if !self.calculator.is_file() {
            return Err(PackError::ExternalTool(format!(
                "witness calculator not found: {}",
                self.calculator.display()
            )));
        }
        fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("failed to create work dir: {}", self.work_dir.display()))?;

        let run_all = || -> PackResult<Vec<Vec<Scalar>>> {
            inputs
                .par_iter()
                .enumerate()
                .map(|(copy, input)| self.compute_one(copy, input))
                .collect()
        };
        let copies = if self.config.concurrency > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.concurrency as usize)
                .build()
                .map_err(|e| PackError::Io(anyhow::anyhow!(e)))?;
            pool.install(run_all)
        } else {
            run_all()
        }?;

        info!(
            copies = copies.len(),
            concurrency = self.config.concurrency,
            duration_ms = start.elapsed().as_millis(),
            "witness pool complete"
        );
        Ok(copies)
    }

    fn compute_one(&self, copy: usize, input: &InputMap) -> PackResult<Vec<Scalar>> {
        let input_path = self.work_dir.join(format!("input_{}.json", copy));
        let output_path = self.work_dir.join(format!("witness_{}.wtns", copy));
        fs::write(&input_path, input_json(input))
            .with_context(|| format!("failed to write input file: {}", input_path.display()))?;

        debug!(copy, input = %input_path.display(), "starting witness calculator");
        let mut child = Command::new(&self.calculator)
            .arg(&input_path)
            .arg(&output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PackError::ExternalTool(format!(
                    "failed to spawn {}: {}",
                    self.calculator.display(),
                    e
                ))
            })?;

        let deadline = Duration::from_secs(self.config.deadline_secs);
        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() > deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(PackError::ExternalTool(format!(
                            "witness calculator for copy {} exceeded the {}s deadline",
                            copy, self.config.deadline_secs
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    return Err(PackError::ExternalTool(format!(
                        "failed to wait for witness calculator (copy {}): {}",
                        copy, e
                    )));
                }
            }
        };

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(PackError::ExternalTool(format!(
                "witness calculator for copy {} exited with {}: {}",
                copy,
                status,
                stderr.trim()
            )));
        }
        if !output_path.is_file() {
            return Err(PackError::ExternalTool(format!(
                "witness calculator for copy {} produced no output: {}",
                copy,
                output_path.display()
            )));
        }
        wtns::load(&output_path).map_err(PackError::Io)
    }
}

/// Single-signal input map, the common case for the bundled test circuits.
pub fn single_input(name: &str, values: Vec<Scalar>) -> InputMap {
    let mut map = InputMap::new();
    map.insert(name.to_string(), values);
    map
}
