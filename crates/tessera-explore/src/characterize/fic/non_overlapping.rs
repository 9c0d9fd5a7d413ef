use std::collections::BTreeSet;

use tracing::debug;

use tessera_ir::types::{Combination, TestResult};

use super::finder::{mutate, FinderKind, FixedVariableFinder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Waiting for the seed with all tabu parameters mutated.
    Probe,
    Search,
}

/// Finds the non-overlapping faults of one failing seed: each finished
/// search adds its parameters to a tabu set that every later search mutates,
/// until the seed passes with all tabu parameters mutated.
pub(crate) struct NonOverlappingCombinationFinder {
    seed: Combination,
    parameter_sizes: Vec<usize>,
    kind: FinderKind,
    tabu: BTreeSet<usize>,
    interactions: Vec<BTreeSet<usize>>,
    mode: Mode,
    finder: Option<Box<dyn FixedVariableFinder>>,
}

impl NonOverlappingCombinationFinder {
    pub fn new(seed: Combination, parameter_sizes: &[usize], kind: FinderKind) -> Self {
        Self {
            seed,
            parameter_sizes: parameter_sizes.to_vec(),
            kind,
            tabu: BTreeSet::new(),
            interactions: Vec::new(),
            mode: Mode::Probe,
            finder: None,
        }
    }

    /// The first call receives the seed's own result.
    pub fn run_iteration(&mut self, result: &TestResult) -> Option<Combination> {
        if self.mode == Mode::Probe {
            if result.is_successful() {
                return None;
            }
            self.finder = Some(self.kind.create(&self.seed, &self.parameter_sizes, &self.tabu));
            self.mode = Mode::Search;
        }

        let finder = self.finder.as_mut()?;
        if let Some(next) = finder.run_iteration(result) {
            return Some(next);
        }

        let interaction = finder.interaction().clone();
        self.finder = None;
        if interaction.is_empty() {
            return None;
        }
        debug!(seed = %self.seed, ?interaction, "fixed-variable search finished");
        self.tabu.extend(&interaction);
        self.interactions.push(interaction);
        self.mode = Mode::Probe;
        Some(mutate(
            &self.seed,
            &self.parameter_sizes,
            self.tabu.iter().copied(),
        ))
    }

    /// Found faults as sub-combinations of the seed.
    pub fn interactions(&self) -> Vec<Combination> {
        self.interactions
            .iter()
            .map(|parameters| {
                let parameters: Vec<usize> = parameters.iter().copied().collect();
                self.seed.restricted_to(&parameters)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(values: &[i32]) -> Combination {
        Combination::from_values(values.to_vec())
    }

    #[test]
    fn test_finds_two_disjoint_faults_in_one_seed() {
        let seed = c(&[0, 0, 0, 0]);
        let faults = [c(&[0, -1, 0, -1]), c(&[-1, 0, -1, -1])];
        let oracle = |input: &Combination| {
            if faults.iter().any(|f| input.contains(f)) {
                TestResult::failure("fault")
            } else {
                TestResult::success()
            }
        };

        let mut finder = NonOverlappingCombinationFinder::new(seed, &[2, 2, 2, 2], FinderKind::Linear);
        let mut result = TestResult::failure("seed");
        while let Some(input) = finder.run_iteration(&result) {
            result = oracle(&input);
        }

        let mut found = finder.interactions();
        found.sort();
        let mut expected = faults.to_vec();
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_passing_seed_yields_nothing() {
        let mut finder = NonOverlappingCombinationFinder::new(c(&[0, 0]), &[2, 2], FinderKind::Linear);
        assert!(finder.run_iteration(&TestResult::success()).is_none());
        assert!(finder.interactions().is_empty());
    }
}
