//! Covering-array generation and adaptive fault characterization.
//!
//! - [`solver`]: constraint checking and coverage bookkeeping.
//! - [`generator`]: IPOG and AETG-SAT test suite generators.
//! - [`characterize`]: the interactive fault-characterization protocol and
//!   its strategies (Fic, Fic-BS, adaptive locating array, Ict).

pub mod characterize;
pub mod generator;
pub mod solver;
