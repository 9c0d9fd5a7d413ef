pub mod constraint;
pub mod coverage;
pub mod rng;
