//! zkpack-r1cs: In-memory R1CS model and the on-disk formats it exchanges
//! with the external circuit compiler and prover.
//!
//! The model is deliberately small: sparse linear combinations with a
//! deterministic iteration order, an append-only constraint system, and
//! bit-exact readers/writers for the `.r1cs`, `.sym` and `.wtns` formats.
//! Everything is generic over [`ff::PrimeField`]; the packing engine in
//! `zkpack-core` instantiates it at `blstrs::Scalar`.

pub mod lc;
pub mod r1cs_file;
pub mod scalar_repr;
pub mod sym;
pub mod system;
pub mod wtns;

pub use lc::{Constraint, LinearCombination};
pub use sym::{Symbol, SymbolTable};
pub use system::R1csSystem;
