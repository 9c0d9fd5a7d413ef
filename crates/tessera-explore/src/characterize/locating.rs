//! Adaptive locating array for a single pairwise fault.
//!
//! Candidate interactions (every pair inside a failing input) are kept in
//! equivalence classes: two candidates share a class while every executed
//! input contains both or neither. New inputs are built to split classes
//! until every class is a singleton, so each candidate is distinguishable.

use std::collections::BTreeSet;

use tracing::{debug, info};

use tessera_ir::combinator::sub_combinations;
use tessera_ir::types::{Combination, TestModel};

use super::report::Reporter;
use super::{FaultCharacterization, FaultCharacterizationConfig, TestResults};
use crate::solver::constraint::ConstraintChecker;

pub struct AdaptiveLocatingArray {
    model: TestModel,
    checker: Box<dyn ConstraintChecker>,
    reporter: Box<dyn Reporter>,
    history: TestResults,
    classes: Vec<BTreeSet<Combination>>,
    initialized: bool,
}

impl AdaptiveLocatingArray {
    pub fn new(config: FaultCharacterizationConfig) -> Self {
        if config.model.strength() > 2 {
            config.reporter.report_assumption_violation("testing_strength");
        } else {
            config.reporter.report_assumption_satisfied("testing_strength");
        }
        Self {
            model: config.model,
            checker: config.checker,
            reporter: config.reporter,
            history: TestResults::new(),
            classes: Vec::new(),
            initialized: false,
        }
    }

    /// Current classes, for inspection.
    pub fn classes(&self) -> &[BTreeSet<Combination>] {
        &self.classes
    }

    fn initialize(&mut self, results: &TestResults) {
        let class: BTreeSet<Combination> = results
            .iter()
            .filter(|(_, result)| result.is_failure())
            .flat_map(|(input, _)| sub_combinations(input, 2))
            .collect();
        debug!(candidates = class.len(), "initial equivalence class");
        if !class.is_empty() {
            self.classes.push(class);
        }
        self.initialized = true;
    }

    /// Splits every class by containment in `input`.
    fn split(&mut self, input: &Combination) {
        let mut split_off = Vec::new();
        for class in &mut self.classes {
            if class.len() < 2 {
                continue;
            }
            let (inside, outside): (BTreeSet<_>, BTreeSet<_>) =
                std::mem::take(class).into_iter().partition(|c| input.contains(c));
            if inside.is_empty() {
                *class = outside;
            } else if outside.is_empty() {
                *class = inside;
            } else {
                *class = outside;
                split_off.push(inside);
            }
        }
        self.classes.extend(split_off);
    }

    /// One input embedding a distinguishing pair for every class that still
    /// has one; unset positions default to value 0.
    fn find_splitting_test_case(&self) -> Option<Combination> {
        let mut row = Combination::empty(self.model.parameter_count());
        let mut embedded = false;
        for class in &self.classes {
            if class.len() > 1 && self.embed_splitter(&mut row, class) {
                embedded = true;
            }
        }
        if !embedded {
            return None;
        }
        for p in 0..self.model.parameter_count() {
            if !row.is_set(p) {
                row.set(p, 0);
            }
        }
        Some(row)
    }

    /// Embeds two members of `class` into `row`, then moves every position
    /// where the first is set and the second differs, so that only the
    /// second stays contained.
    fn embed_splitter(&self, row: &mut Combination, class: &BTreeSet<Combination>) -> bool {
        for first in class {
            for second in class {
                if first == second || !first.is_consistent_with(second) {
                    continue;
                }
                let mut candidate = row.clone();
                if !candidate.is_consistent_with(first) {
                    continue;
                }
                candidate.merge(first);
                if !candidate.is_consistent_with(second) {
                    continue;
                }
                candidate.merge(second);
                if !self.checker.is_valid(&candidate) {
                    continue;
                }

                let mut separated = true;
                for p in first.set_parameters() {
                    if second.value(p) == first.value(p) {
                        continue;
                    }
                    candidate.clear(p);
                    match self.adjusted_value(&candidate, p, first.value(p)) {
                        Some(value) => candidate.set(p, value),
                        None => {
                            separated = false;
                            break;
                        }
                    }
                }
                if separated {
                    *row = candidate;
                    return true;
                }
            }
        }
        false
    }

    /// First value after `current` (cyclically) that keeps `row` valid.
    fn adjusted_value(
        &self,
        row: &Combination,
        parameter: usize,
        current: Option<usize>,
    ) -> Option<usize> {
        let size = self.model.size_of(parameter);
        let current = current?;
        (1..size)
            .map(|offset| (current + offset) % size)
            .find(|&v| self.checker.is_extension_valid(row, parameter, v))
    }
}

impl FaultCharacterization for AdaptiveLocatingArray {
    fn compute_next_test_inputs(&mut self, results: &TestResults) -> Vec<Combination> {
        if !self.initialized {
            self.initialize(results);
        }
        for input in results.keys() {
            self.split(input);
        }
        self.history
            .extend(results.iter().map(|(i, r)| (i.clone(), r.clone())));

        if self.classes.iter().all(|class| class.len() <= 1) {
            info!(classes = self.classes.len(), "all equivalence classes separated");
            return Vec::new();
        }

        match self.find_splitting_test_case() {
            Some(row) if !self.history.contains_key(&row) => vec![row],
            _ => {
                self.reporter
                    .report_assumption_violation("splittable_equivalence_classes");
                Vec::new()
            }
        }
    }

    fn compute_failure_inducing_combinations(&self) -> Vec<Combination> {
        let mut suspicious: BTreeSet<Combination> = BTreeSet::new();
        for (input, _) in self.history.iter().filter(|(_, r)| r.is_failure()) {
            for class in &self.classes {
                suspicious.extend(class.iter().filter(|c| input.contains(c)).cloned());
            }
        }
        for (input, _) in self.history.iter().filter(|(_, r)| r.is_successful()) {
            suspicious.retain(|c| !input.contains(c));
        }
        suspicious.into_iter().collect()
    }

    fn name(&self) -> &str {
        "adaptive-locating-array"
    }
}
