//! Characterization campaigns: run a generator and a fault-characterization
//! strategy against a test oracle until the strategy is done or a limit is
//! reached.

pub mod campaign;
pub mod limits;
