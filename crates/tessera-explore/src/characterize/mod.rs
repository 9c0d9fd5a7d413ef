//! Interactive fault characterization.
//!
//! A strategy receives the results of executed test inputs and answers with
//! the next inputs to execute, until it returns an empty batch. Afterwards it
//! reports the combinations it holds responsible for the failures.
//!
//! - [`fic`]: Fic and Fic-BS (fixed-variable search per failing input)
//! - [`locating`]: adaptive locating array (pairwise, single fault)
//! - [`ict`]: Ict, interleaving AETG-SAT generation with characterization

pub mod fic;
pub mod ict;
pub mod locating;
pub mod report;

use std::collections::BTreeMap;

use tessera_ir::types::{Combination, TestModel, TestResult};

use self::report::{Reporter, TracingReporter};
use crate::solver::constraint::{ConstraintChecker, HardConstraintChecker};

/// Executed inputs and their outcomes, ordered by input.
pub type TestResults = BTreeMap<Combination, TestResult>;

/// The characterization protocol.
pub trait FaultCharacterization {
    /// Folds in `results` and returns the next inputs to execute. An empty
    /// batch ends characterization.
    fn compute_next_test_inputs(&mut self, results: &TestResults) -> Vec<Combination>;

    /// Combinations identified as failure-inducing so far.
    fn compute_failure_inducing_combinations(&self) -> Vec<Combination>;

    /// Name of this strategy (for tracing).
    fn name(&self) -> &str;
}

/// Everything a strategy is built from.
pub struct FaultCharacterizationConfig {
    pub model: TestModel,
    pub checker: Box<dyn ConstraintChecker>,
    pub reporter: Box<dyn Reporter>,
}

impl FaultCharacterizationConfig {
    /// Exact checker over the model's constraints, tracing reporter.
    pub fn new(model: TestModel) -> Self {
        let checker = HardConstraintChecker::new(&model);
        Self {
            model,
            checker: Box::new(checker),
            reporter: Box::new(TracingReporter),
        }
    }

    pub fn with_checker(mut self, checker: Box<dyn ConstraintChecker>) -> Self {
        self.checker = checker;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }
}
