//! Covering-array generators.
//!
//! - [`ipog`]: in-parameter-order growth, one parameter at a time.
//! - [`aetg`]: one-row-at-a-time greedy construction with a SAT-backed
//!   checker, also used as the row source of Ict.

pub mod aetg;
pub mod ipog;

use tessera_ir::types::Combination;

/// Errors raised while building a test suite.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("no valid value for parameter {parameter} extending row {row}")]
    NoValidValue { parameter: usize, row: Combination },

    #[error("no valid value to close wildcard parameter {parameter} in row {row}")]
    UnclosableWildcard { parameter: usize, row: Combination },
}

/// A source of a complete test suite.
pub trait TestInputGenerator {
    fn generate(&mut self) -> Result<Vec<Combination>, GenerationError>;

    fn name(&self) -> &str;
}
