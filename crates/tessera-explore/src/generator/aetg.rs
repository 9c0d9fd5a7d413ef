//! AETG-SAT: greedy one-row-at-a-time generation over a SAT-backed checker.
//!
//! Besides plain suite generation the generator exposes the row-level
//! operations Ict builds on: single-parameter mutation, dissimilar row
//! selection and dynamic forbidden combinations.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use tessera_ir::types::{Combination, ParameterValue, TestModel};

use super::{GenerationError, TestInputGenerator};
use crate::solver::constraint::{ConstraintChecker, DynamicConstraintChecker, HardConstraintChecker};
use crate::solver::coverage::CoverageMap;
use crate::solver::rng::shuffled;

/// Tuning for [`AetgSat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AetgSatConfig {
    /// Candidate rows built per emitted row; the first uses declaration
    /// order, the others seeded shuffles.
    pub candidate_rows: usize,
    /// Seed for the shuffled parameter orders.
    pub seed: u64,
}

impl Default for AetgSatConfig {
    fn default() -> Self {
        Self {
            candidate_rows: 1,
            seed: 42,
        }
    }
}

/// AETG-SAT over an exclusively owned checker, by default the exact
/// [`HardConstraintChecker`] of the model.
pub struct AetgSat<C = HardConstraintChecker> {
    model: TestModel,
    checker: C,
    coverage: CoverageMap,
    config: AetgSatConfig,
    rows_built: u64,
}

impl AetgSat {
    pub fn new(model: &TestModel, config: AetgSatConfig) -> Self {
        Self::with_checker(model, HardConstraintChecker::new(model), config)
    }
}

impl<C: DynamicConstraintChecker> AetgSat<C> {
    pub fn with_checker(model: &TestModel, checker: C, config: AetgSatConfig) -> Self {
        let coverage =
            CoverageMap::with_strength(model.parameter_sizes(), model.strength(), &checker);
        Self {
            model: model.clone(),
            checker,
            coverage,
            config,
            rows_built: 0,
        }
    }

    pub fn model(&self) -> &TestModel {
        &self.model
    }

    pub fn checker(&self) -> &C {
        &self.checker
    }

    pub fn coverage(&self) -> &CoverageMap {
        &self.coverage
    }

    /// Rows until every valid interaction is covered.
    pub fn generate(&mut self) -> Result<Vec<Combination>, GenerationError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_test_case()? {
            self.update_coverage(&row);
            rows.push(row);
        }
        info!(rows = rows.len(), strength = self.model.strength(), "AETG-SAT generation finished");
        Ok(rows)
    }

    /// The next row, without marking it covered. `None` once nothing valid
    /// is left uncovered.
    pub fn next_test_case(&mut self) -> Result<Option<Combination>, GenerationError> {
        let Some(seed) = self.seed_pair() else {
            return Ok(None);
        };

        let mut best = self.candidate(seed, 0)?;
        let mut best_gain = self.coverage.newly_covered_by(&best);
        for candidate in 1..self.config.candidate_rows.max(1) {
            let row = self.candidate(seed, candidate)?;
            let gain = self.coverage.newly_covered_by(&row);
            if gain > best_gain {
                best = row;
                best_gain = gain;
            }
        }

        if best_gain == 0 {
            if let Some(interaction) = self.coverage.uncovered_interaction_with(seed).cloned() {
                debug!(%interaction, "greedy row covered nothing new; building from interaction");
                let order: Vec<usize> = (0..self.model.parameter_count()).collect();
                let mut row = interaction;
                self.complete_row(&mut row, &order)?;
                best = row;
            }
        }

        self.rows_built += 1;
        trace!(row = %best, gain = best_gain, "selected AETG row");
        Ok(Some(best))
    }

    /// Most common uncovered pair that can start a valid row.
    fn seed_pair(&self) -> Option<ParameterValue> {
        let empty = Combination::empty(self.model.parameter_count());
        let mut rejected = BTreeSet::new();
        loop {
            let pair = self.coverage.most_common_value(&rejected, &BTreeSet::new())?;
            if self.checker.is_extension_valid(&empty, pair.parameter, pair.value) {
                return Some(pair);
            }
            rejected.insert(pair);
        }
    }

    fn candidate(&self, seed: ParameterValue, index: usize) -> Result<Combination, GenerationError> {
        let others: Vec<usize> = (0..self.model.parameter_count())
            .filter(|&p| p != seed.parameter)
            .collect();
        let order = if index == 0 {
            others
        } else {
            let stage = self
                .rows_built
                .wrapping_mul(self.config.candidate_rows as u64)
                .wrapping_add(index as u64);
            shuffled(&others, self.config.seed, stage)
        };

        let mut row = Combination::empty(self.model.parameter_count());
        row.set(seed.parameter, seed.value);
        self.complete_row(&mut row, &order)?;
        Ok(row)
    }

    fn complete_row(&self, row: &mut Combination, order: &[usize]) -> Result<(), GenerationError> {
        for &parameter in order {
            if row.is_set(parameter) {
                continue;
            }
            let gains = self.coverage.best_value_for(row, parameter);
            let potential = self.coverage.potential_for(row, parameter);
            let mut values: Vec<usize> = (0..self.model.size_of(parameter)).collect();
            values.sort_by_key(|&v| (Reverse(gains[v]), Reverse(potential[v])));

            let value = values
                .into_iter()
                .find(|&v| self.checker.is_extension_valid(row, parameter, v))
                .ok_or_else(|| GenerationError::NoValidValue {
                    parameter,
                    row: row.clone(),
                })?;
            row.set(parameter, value);
        }
        Ok(())
    }

    /// Marks every interaction contained in `row` as covered.
    pub fn update_coverage(&mut self, row: &Combination) -> usize {
        self.coverage.mark_covered(row)
    }

    /// `seed` with only `parameter` changed: the other value with the highest
    /// gain whose mutant is valid and not in `exclusions`.
    pub fn get_mutated_test_case(
        &self,
        parameter: usize,
        seed: &Combination,
        exclusions: &[Combination],
    ) -> Option<Combination> {
        let mut partial = seed.clone();
        partial.clear(parameter);
        let gains = self.coverage.best_value_for(&partial, parameter);
        let current = seed.value(parameter);

        let mut values: Vec<usize> = (0..self.model.size_of(parameter))
            .filter(|&v| Some(v) != current)
            .collect();
        values.sort_by_key(|&v| Reverse(gains[v]));

        values.into_iter().find_map(|v| {
            let mut mutant = partial.clone();
            mutant.set(parameter, v);
            (!exclusions.contains(&mutant) && self.checker.is_valid(&mutant)).then_some(mutant)
        })
    }

    /// A complete valid row containing `required` whose free parameters
    /// share as few values as possible with `avoid` and `previous`. Ties go
    /// to the highest gain, then the lowest value.
    pub fn select_dissimilar(
        &self,
        required: &Combination,
        avoid: &Combination,
        previous: &[Combination],
    ) -> Option<Combination> {
        if !self.checker.is_valid(required) {
            return None;
        }
        let mut row = required.clone();
        for parameter in 0..self.model.parameter_count() {
            if row.is_set(parameter) {
                continue;
            }
            let gains = self.coverage.best_value_for(&row, parameter);
            let potential = self.coverage.potential_for(&row, parameter);
            let similarity = |v: usize| {
                usize::from(avoid.value(parameter) == Some(v))
                    + previous
                        .iter()
                        .filter(|other| other.value(parameter) == Some(v))
                        .count()
            };

            let mut values: Vec<usize> = (0..self.model.size_of(parameter)).collect();
            values.sort_by_key(|&v| (similarity(v), Reverse(gains[v]), Reverse(potential[v])));
            let value = values
                .into_iter()
                .find(|&v| self.checker.is_extension_valid(&row, parameter, v))?;
            row.set(parameter, value);
        }
        Some(row)
    }

    /// Forbids `combination` for every later row and retires the
    /// interactions it makes unreachable.
    pub fn add_forbidden_combination(&mut self, combination: &Combination) {
        self.checker.add_forbidden_combination(combination);
        self.coverage
            .add_forbidden_combination(combination, &self.checker);
    }
}

impl<C: DynamicConstraintChecker> TestInputGenerator for AetgSat<C> {
    fn generate(&mut self) -> Result<Vec<Combination>, GenerationError> {
        AetgSat::generate(self)
    }

    fn name(&self) -> &str {
        "aetg-sat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ir::combinator::all_interactions;
    use tessera_ir::types::TupleList;

    fn c(values: &[i32]) -> Combination {
        Combination::from_values(values.to_vec())
    }

    #[test]
    fn test_generates_pairwise_cover() {
        let model = TestModel::unconstrained(2, vec![3, 3, 3]).unwrap();
        let rows = AetgSat::new(&model, AetgSatConfig::default()).generate().unwrap();
        for interaction in all_interactions(&[3, 3, 3], 2) {
            assert!(rows.iter().any(|row| row.contains(&interaction)), "{interaction}");
        }
        assert!(rows.iter().all(Combination::is_complete));
    }

    #[test]
    fn test_first_row_starts_from_most_common_pair() {
        let model = TestModel::unconstrained(2, vec![2, 2, 2]).unwrap();
        let mut aetg = AetgSat::new(&model, AetgSatConfig::default());
        assert_eq!(aetg.next_test_case().unwrap(), Some(c(&[0, 0, 0])));
    }

    #[test]
    fn test_strength_zero_needs_no_rows() {
        let model = TestModel::unconstrained(0, vec![2, 2]).unwrap();
        let rows = AetgSat::new(&model, AetgSatConfig::default()).generate().unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_rows_respect_constraints() {
        let list = TupleList::new(0, vec![0, 2], vec![vec![0, 0], vec![1, 2]]);
        let model = TestModel::new(2, vec![2, 3, 3], vec![list], vec![]).unwrap();
        let mut aetg = AetgSat::new(&model, AetgSatConfig::default());
        let rows = aetg.generate().unwrap();
        assert!(!rows.is_empty());
        for row in &rows {
            assert!(!row.contains(&c(&[0, -1, 0])));
            assert!(!row.contains(&c(&[1, -1, 2])));
        }
        assert!(!aetg.coverage().has_uncovered());
    }

    #[test]
    fn test_candidate_rows_are_reproducible() {
        let model = TestModel::unconstrained(2, vec![3, 3, 3, 3]).unwrap();
        let config = AetgSatConfig {
            candidate_rows: 4,
            seed: 9,
        };
        let first = AetgSat::new(&model, config.clone()).generate().unwrap();
        let second = AetgSat::new(&model, config).generate().unwrap();
        assert_eq!(first, second);
        for interaction in all_interactions(&[3, 3, 3, 3], 2) {
            assert!(first.iter().any(|row| row.contains(&interaction)));
        }
    }

    #[test]
    fn test_mutation_changes_only_one_parameter() {
        let model = TestModel::unconstrained(2, vec![3, 3, 3]).unwrap();
        let aetg = AetgSat::new(&model, AetgSatConfig::default());
        let seed = c(&[0, 0, 0]);
        let mutant = aetg.get_mutated_test_case(1, &seed, &[]).unwrap();
        assert_ne!(mutant.value(1), Some(0));
        assert_eq!(mutant.value(0), Some(0));
        assert_eq!(mutant.value(2), Some(0));
    }

    #[test]
    fn test_mutation_honours_exclusions_and_constraints() {
        let model = TestModel::unconstrained(1, vec![3, 2]).unwrap();
        let mut aetg = AetgSat::new(&model, AetgSatConfig::default());
        aetg.add_forbidden_combination(&c(&[2, 1]));
        let seed = c(&[0, 1]);
        let mutant = aetg.get_mutated_test_case(0, &seed, &[c(&[1, 1])]);
        assert_eq!(mutant, None);
        assert_eq!(aetg.get_mutated_test_case(0, &seed, &[]), Some(c(&[1, 1])));
    }

    #[test]
    fn test_select_dissimilar_avoids_values() {
        let model = TestModel::unconstrained(2, vec![3, 3, 3]).unwrap();
        let aetg = AetgSat::new(&model, AetgSatConfig::default());
        let row = aetg
            .select_dissimilar(&c(&[0, -1, -1]), &c(&[0, 0, 1]), &[c(&[0, 1, 2])])
            .unwrap();
        assert_eq!(row.value(0), Some(0));
        assert_eq!(row.value(1), Some(2));
        assert_eq!(row.value(2), Some(0));
    }

    #[test]
    fn test_select_dissimilar_rejects_invalid_requirement() {
        let model = TestModel::unconstrained(2, vec![2, 2]).unwrap();
        let mut aetg = AetgSat::new(&model, AetgSatConfig::default());
        aetg.add_forbidden_combination(&c(&[0, -1]));
        assert_eq!(aetg.select_dissimilar(&c(&[0, -1]), &c(&[0, 0]), &[]), None);
    }

    #[test]
    fn test_forbidden_combination_shrinks_remaining_work() {
        let model = TestModel::unconstrained(2, vec![2, 2]).unwrap();
        let mut aetg = AetgSat::new(&model, AetgSatConfig::default());
        aetg.add_forbidden_combination(&c(&[0, -1]));
        let rows = aetg.generate().unwrap();
        assert_eq!(rows, vec![c(&[1, 0]), c(&[1, 1])]);
    }

    /// Accepts every partial row but rejects any complete one.
    struct NoCompleteRows(Vec<Combination>);

    impl ConstraintChecker for NoCompleteRows {
        fn is_valid(&self, combination: &Combination) -> bool {
            !combination.is_complete() && !self.0.iter().any(|f| combination.contains(f))
        }
    }

    impl DynamicConstraintChecker for NoCompleteRows {
        fn add_forbidden_combination(&mut self, combination: &Combination) {
            self.0.push(combination.clone());
        }
    }

    #[test]
    fn test_unextendable_row_is_a_generation_error() {
        let model = TestModel::unconstrained(2, vec![2, 2, 2]).unwrap();
        let mut aetg = AetgSat::with_checker(&model, NoCompleteRows(Vec::new()), AetgSatConfig::default());
        let err = aetg.generate().unwrap_err();
        assert_eq!(
            err,
            GenerationError::NoValidValue {
                parameter: 2,
                row: c(&[0, 0, -1]),
            }
        );
    }

    #[test]
    fn test_custom_checker_receives_forbidden_combinations() {
        let model = TestModel::unconstrained(1, vec![2, 2]).unwrap();
        let mut aetg = AetgSat::with_checker(&model, NoCompleteRows(Vec::new()), AetgSatConfig::default());
        aetg.add_forbidden_combination(&c(&[0, -1]));
        assert_eq!(aetg.checker().0, vec![c(&[0, -1])]);
        assert_eq!(aetg.coverage().uncovered_count(), 3);
    }
}
