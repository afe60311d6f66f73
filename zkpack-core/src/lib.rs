//! zkpack-core: CRT witness packing for R1CS circuits.
//!
//! Batches `pf` independent satisfying assignments of one circuit into a
//! single extended constraint system and witness. Per-copy values are
//! combined by Chinese-remainder reconstruction over pairwise-coprime
//! moduli, quotient wires absorb the multiples of the packing modulus the
//! embedding introduces, and a randomized PoSO gadget range-bounds the
//! result so wrapped values cannot hide. One downstream proof over the
//! extended system then attests to all packed copies at once.
//!
//! The model and file formats live in `zkpack-r1cs`; this crate is the
//! engine, concrete over [`blstrs::Scalar`].

pub mod check;
pub mod config;
pub mod crt;
pub mod error;
pub mod pipeline;
pub mod poso;
pub mod quotient;
pub mod stats;
pub mod witness_pool;

pub use check::check_satisfied;
pub use config::{PackConfig, PackingConfig, PoolConfig, PosoConfig};
pub use crt::CrtBasis;
pub use error::{PackError, PackResult};
pub use pipeline::{PackOutput, Pipeline};
pub use witness_pool::{InputMap, WitnessPool};
