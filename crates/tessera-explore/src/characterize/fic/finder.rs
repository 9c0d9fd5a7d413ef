//! Fixed-variable finders: isolate the parameters of one fault inside a
//! failing seed by mutating subsets of its values.
//!
//! A mutated input that *passes* proves a mutated parameter belongs to the
//! fault; one that still *fails* shows the mutated parameters are free.

use std::collections::BTreeSet;

use tessera_ir::types::{Combination, TestResult};

/// Drives one search. Each call receives the outcome of the previously
/// returned input; `None` ends the search.
pub(crate) trait FixedVariableFinder {
    fn run_iteration(&mut self, result: &TestResult) -> Option<Combination>;

    /// Parameters confirmed as part of the fault.
    fn interaction(&self) -> &BTreeSet<usize>;
}

/// Which finder a Fic run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinderKind {
    /// One candidate parameter per test.
    #[default]
    Linear,
    /// Halves the candidate set per test.
    BinarySearch,
}

impl FinderKind {
    pub(crate) fn create(
        self,
        seed: &Combination,
        parameter_sizes: &[usize],
        tabu: &BTreeSet<usize>,
    ) -> Box<dyn FixedVariableFinder> {
        let state = SearchState::new(seed, parameter_sizes, tabu);
        match self {
            FinderKind::Linear => Box::new(LinearFixedVariableFinder {
                state,
                current: None,
            }),
            FinderKind::BinarySearch => Box::new(BinarySearchFixedVariableFinder {
                state,
                low: BTreeSet::new(),
                high: BTreeSet::new(),
                mode: BinaryMode::Init,
            }),
        }
    }
}

/// Mutates every listed parameter of `seed` to `(v + 1) % size`.
pub(crate) fn mutate(
    seed: &Combination,
    parameter_sizes: &[usize],
    parameters: impl IntoIterator<Item = usize>,
) -> Combination {
    let mut result = seed.clone();
    for p in parameters {
        if let Some(v) = seed.value(p) {
            result.set(p, (v + 1) % parameter_sizes[p]);
        }
    }
    result
}

struct SearchState {
    seed: Combination,
    parameter_sizes: Vec<usize>,
    /// Parameters shown not to matter; mutated in every test.
    free: BTreeSet<usize>,
    candidates: BTreeSet<usize>,
    interaction: BTreeSet<usize>,
}

impl SearchState {
    fn new(seed: &Combination, parameter_sizes: &[usize], tabu: &BTreeSet<usize>) -> Self {
        Self {
            seed: seed.clone(),
            parameter_sizes: parameter_sizes.to_vec(),
            free: tabu.clone(),
            candidates: seed.set_parameters().filter(|p| !tabu.contains(p)).collect(),
            interaction: BTreeSet::new(),
        }
    }

    fn mutated(&self, parameters: &BTreeSet<usize>) -> Combination {
        mutate(
            &self.seed,
            &self.parameter_sizes,
            parameters.union(&self.free).copied(),
        )
    }

    /// Parameters neither free nor confirmed.
    fn unresolved(&self) -> BTreeSet<usize> {
        self.seed
            .set_parameters()
            .filter(|p| !self.free.contains(p) && !self.interaction.contains(p))
            .collect()
    }
}

pub(crate) struct LinearFixedVariableFinder {
    state: SearchState,
    current: Option<usize>,
}

impl FixedVariableFinder for LinearFixedVariableFinder {
    fn run_iteration(&mut self, result: &TestResult) -> Option<Combination> {
        if let Some(p) = self.current.take() {
            if result.is_successful() {
                self.state.interaction.insert(p);
            } else {
                self.state.free.insert(p);
            }
            self.state.candidates.remove(&p);
        }

        let p = *self.state.candidates.iter().next()?;
        self.current = Some(p);
        Some(self.state.mutated(&BTreeSet::from([p])))
    }

    fn interaction(&self) -> &BTreeSet<usize> {
        &self.state.interaction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryMode {
    Init,
    /// All unresolved candidates mutated at once.
    FullCheck,
    /// Only the lower half mutated.
    LowCheck,
}

pub(crate) struct BinarySearchFixedVariableFinder {
    state: SearchState,
    low: BTreeSet<usize>,
    high: BTreeSet<usize>,
    mode: BinaryMode,
}

impl BinarySearchFixedVariableFinder {
    fn partition(&mut self) {
        let size = self.state.candidates.len();
        self.low.clear();
        self.high.clear();
        for &p in &self.state.candidates {
            if 2 * self.low.len() < size {
                self.low.insert(p);
            } else {
                self.high.insert(p);
            }
        }
    }

    fn check_low_half(&mut self) -> Option<Combination> {
        self.partition();
        self.mode = BinaryMode::LowCheck;
        Some(self.state.mutated(&self.low))
    }
}

impl FixedVariableFinder for BinarySearchFixedVariableFinder {
    fn run_iteration(&mut self, result: &TestResult) -> Option<Combination> {
        match self.mode {
            BinaryMode::Init => {
                if self.state.candidates.is_empty() {
                    return None;
                }
                self.mode = BinaryMode::FullCheck;
                Some(self.state.mutated(&self.state.candidates))
            }
            BinaryMode::FullCheck => {
                // Still failing with every candidate mutated: nothing left.
                if result.is_failure() || self.state.candidates.is_empty() {
                    return None;
                }
                self.check_low_half()
            }
            BinaryMode::LowCheck => {
                if result.is_successful() {
                    self.state.candidates = std::mem::take(&mut self.low);
                } else {
                    self.state.candidates = std::mem::take(&mut self.high);
                    self.state.free.append(&mut self.low);
                }

                match self.state.candidates.len() {
                    0 => None,
                    1 => {
                        self.state.interaction.append(&mut self.state.candidates);
                        self.state.candidates = self.state.unresolved();
                        if self.state.candidates.is_empty() {
                            return None;
                        }
                        self.mode = BinaryMode::FullCheck;
                        Some(self.state.mutated(&self.state.candidates))
                    }
                    _ => self.check_low_half(),
                }
            }
        }
    }

    fn interaction(&self) -> &BTreeSet<usize> {
        &self.state.interaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(values: &[i32]) -> Combination {
        Combination::from_values(values.to_vec())
    }

    /// Runs `finder` against a system failing iff the input contains `fault`.
    /// Returns the interaction and the number of executed tests.
    fn drive(
        mut finder: Box<dyn FixedVariableFinder>,
        fault: &Combination,
    ) -> (BTreeSet<usize>, usize) {
        let mut result = TestResult::failure("seed");
        let mut executed = 0;
        while let Some(input) = finder.run_iteration(&result) {
            executed += 1;
            result = if input.contains(fault) {
                TestResult::failure("fault")
            } else {
                TestResult::success()
            };
        }
        (finder.interaction().clone(), executed)
    }

    #[test]
    fn test_mutate_wraps_values() {
        assert_eq!(mutate(&c(&[0, 1, 2]), &[2, 2, 3], [1, 2]), c(&[0, 0, 0]));
    }

    #[test]
    fn test_linear_finder_isolates_fault() {
        let seed = c(&[1, 1, 1, 1]);
        let fault = c(&[-1, 1, -1, 1]);
        let finder = FinderKind::Linear.create(&seed, &[2, 2, 2, 2], &BTreeSet::new());
        let (interaction, executed) = drive(finder, &fault);
        assert_eq!(interaction, BTreeSet::from([1, 3]));
        assert_eq!(executed, 4);
    }

    #[test]
    fn test_binary_finder_uses_fewer_tests_for_single_parameter() {
        let seed = c(&[1; 8]);
        let fault = c(&[-1, -1, -1, -1, -1, 1, -1, -1]);
        let sizes = [2; 8];

        let (linear, linear_tests) =
            drive(FinderKind::Linear.create(&seed, &sizes, &BTreeSet::new()), &fault);
        let (binary, binary_tests) =
            drive(FinderKind::BinarySearch.create(&seed, &sizes, &BTreeSet::new()), &fault);

        assert_eq!(linear, BTreeSet::from([5]));
        assert_eq!(binary, BTreeSet::from([5]));
        assert!(binary_tests < linear_tests);
    }

    #[test]
    fn test_binary_finder_finds_two_parameters() {
        let seed = c(&[2, 0, 1, 3, 1, 0]);
        let fault = c(&[-1, 0, -1, -1, 1, -1]);
        let finder = FinderKind::BinarySearch.create(&seed, &[4; 6], &BTreeSet::new());
        let (interaction, _) = drive(finder, &fault);
        assert_eq!(interaction, BTreeSet::from([1, 4]));
    }

    #[test]
    fn test_tabu_parameters_are_always_mutated() {
        let seed = c(&[0, 0, 0]);
        let tabu = BTreeSet::from([0]);
        let mut finder = FinderKind::Linear.create(&seed, &[2, 2, 2], &tabu);
        let first = finder.run_iteration(&TestResult::failure("seed")).unwrap();
        assert_eq!(first, c(&[1, 1, 0]));
    }

    #[test]
    fn test_binary_finder_without_candidates_stops() {
        let seed = c(&[0, 0]);
        let tabu = BTreeSet::from([0, 1]);
        let mut finder = FinderKind::BinarySearch.create(&seed, &[2, 2], &tabu);
        assert!(finder.run_iteration(&TestResult::failure("seed")).is_none());
    }
}
