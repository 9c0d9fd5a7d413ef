//! Core data model for combinatorial testing: combinations with wildcard
//! slots, the immutable test model, test results, and the combinatorics
//! helpers every generator and characterization strategy builds on.

pub mod combinator;
pub mod parse;
pub mod types;
