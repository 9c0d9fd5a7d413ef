//! Fic and Fic-BS.
//!
//! Every failing input of the initial suite is used as a seed. Per seed a
//! non-overlapping combination finder isolates its faults one at a time with
//! a fixed-variable finder: linear for Fic, binary search for Fic-BS.
//!
//! Assumes the faults within one seed do not share parameters and the model
//! has no constraints. Each call consumes exactly one result (the first
//! entry of the batch) and returns at most one input.

mod finder;
mod non_overlapping;

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, info};

use tessera_ir::types::{Combination, TestResult};

pub use self::finder::FinderKind;
use self::non_overlapping::NonOverlappingCombinationFinder;
use super::report::Reporter;
use super::{FaultCharacterization, FaultCharacterizationConfig, TestResults};

pub struct Fic {
    parameter_sizes: Vec<usize>,
    kind: FinderKind,
    reporter: Box<dyn Reporter>,
    started: bool,
    seeds: VecDeque<(Combination, TestResult)>,
    current: Option<NonOverlappingCombinationFinder>,
    found: BTreeSet<Combination>,
}

impl Fic {
    /// Fic: one candidate parameter per test.
    pub fn new(config: FaultCharacterizationConfig) -> Self {
        Self::with_finder(config, FinderKind::Linear)
    }

    /// Fic-BS: binary search over candidate parameters.
    pub fn binary_search(config: FaultCharacterizationConfig) -> Self {
        Self::with_finder(config, FinderKind::BinarySearch)
    }

    pub fn with_finder(config: FaultCharacterizationConfig, kind: FinderKind) -> Self {
        if config.model.has_constraints() {
            config.reporter.report_assumption_violation("unconstrained_model");
        } else {
            config.reporter.report_assumption_satisfied("unconstrained_model");
        }
        Self {
            parameter_sizes: config.model.parameter_sizes().to_vec(),
            kind,
            reporter: config.reporter,
            started: false,
            seeds: VecDeque::new(),
            current: None,
            found: BTreeSet::new(),
        }
    }

    fn finish_current(&mut self) {
        if let Some(finder) = self.current.take() {
            for interaction in finder.interactions() {
                if self.found.insert(interaction.clone()) {
                    info!(%interaction, "failure-inducing combination found");
                }
            }
        }
    }
}

impl FaultCharacterization for Fic {
    fn compute_next_test_inputs(&mut self, results: &TestResults) -> Vec<Combination> {
        if !self.started {
            self.started = true;
            self.seeds = results
                .iter()
                .filter(|(_, result)| result.is_failure())
                .map(|(input, result)| (input.clone(), result.clone()))
                .collect();
            debug!(seeds = self.seeds.len(), kind = ?self.kind, "collected failing seeds");
        }

        let mut next = match (self.current.as_mut(), results.values().next()) {
            (Some(finder), Some(result)) => finder.run_iteration(result),
            _ => None,
        };

        while next.is_none() {
            self.finish_current();
            let Some((seed, result)) = self.seeds.pop_front() else {
                break;
            };
            let mut finder =
                NonOverlappingCombinationFinder::new(seed, &self.parameter_sizes, self.kind);
            next = finder.run_iteration(&result);
            self.current = Some(finder);
        }

        if next.is_none() && self.found.is_empty() {
            self.reporter.report_assumption_violation("failure_found");
        }
        next.into_iter().collect()
    }

    fn compute_failure_inducing_combinations(&self) -> Vec<Combination> {
        self.found.iter().cloned().collect()
    }

    fn name(&self) -> &str {
        match self.kind {
            FinderKind::Linear => "fic",
            FinderKind::BinarySearch => "fic-bs",
        }
    }
}
