//! Coverage bookkeeping over a fixed set of interactions.
//!
//! The map answers the questions both generators ask while building rows:
//! - **gain**: how many uncovered interactions a value would complete
//! - **potential**: how many uncovered interactions remain reachable
//! - **most common value**: the `(parameter, value)` in most uncovered interactions
//!
//! Interactions that are invalid under the constraint checker are retired at
//! construction and never count as uncovered.

use std::cell::Cell;
use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use tessera_ir::combinator::all_interactions;
use tessera_ir::types::{Combination, ParameterValue};

use super::constraint::ConstraintChecker;

/// Tracks which interactions of a target set are covered.
#[derive(Debug, Clone)]
pub struct CoverageMap {
    parameter_sizes: Vec<usize>,
    interactions: Vec<Combination>,
    hits: Vec<u32>,
    retired: Vec<bool>,
    /// `by_value[p][v]`: ids of interactions that assign `v` to `p`.
    by_value: Vec<Vec<Vec<usize>>>,
    /// Uncovered interactions per `(parameter, value)`.
    uncovered_per_value: Vec<Vec<usize>>,
    first_parameter: Vec<usize>,
    uncovered: usize,
    /// Lowest id that may still be uncovered.
    cursor: Cell<usize>,
}

impl CoverageMap {
    /// Map over `interactions`. Duplicates and interactions without any set
    /// parameter are dropped; invalid ones are retired immediately.
    pub fn new(
        parameter_sizes: &[usize],
        interactions: impl IntoIterator<Item = Combination>,
        checker: &dyn ConstraintChecker,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut map = Self {
            parameter_sizes: parameter_sizes.to_vec(),
            interactions: Vec::new(),
            hits: Vec::new(),
            retired: Vec::new(),
            by_value: parameter_sizes.iter().map(|&s| vec![Vec::new(); s]).collect(),
            uncovered_per_value: parameter_sizes.iter().map(|&s| vec![0; s]).collect(),
            first_parameter: Vec::new(),
            uncovered: 0,
            cursor: Cell::new(0),
        };

        for interaction in interactions {
            let Some(first) = interaction.set_parameters().next() else {
                continue;
            };
            let in_range = interaction.len() == parameter_sizes.len()
                && interaction
                    .set_parameters()
                    .all(|p| interaction.value(p).is_some_and(|v| v < parameter_sizes[p]));
            if !in_range || !seen.insert(interaction.clone()) {
                continue;
            }

            let id = map.interactions.len();
            for p in interaction.set_parameters() {
                if let Some(v) = interaction.value(p) {
                    map.by_value[p][v].push(id);
                    map.uncovered_per_value[p][v] += 1;
                }
            }
            map.first_parameter.push(first);
            map.hits.push(0);
            map.retired.push(false);
            map.uncovered += 1;
            map.interactions.push(interaction);
        }

        let mut retired = 0;
        for id in 0..map.interactions.len() {
            if !checker.is_valid(&map.interactions[id]) {
                map.retire(id);
                retired += 1;
            }
        }
        debug!(total = map.interactions.len(), retired, "built coverage map");
        map
    }

    /// Map over every `strength`-way interaction of the model.
    pub fn with_strength(
        parameter_sizes: &[usize],
        strength: usize,
        checker: &dyn ConstraintChecker,
    ) -> Self {
        Self::new(
            parameter_sizes,
            all_interactions(parameter_sizes, strength),
            checker,
        )
    }

    pub fn interactions(&self) -> &[Combination] {
        &self.interactions
    }

    /// Interactions neither covered nor retired.
    pub fn uncovered_count(&self) -> usize {
        self.uncovered
    }

    pub fn has_uncovered(&self) -> bool {
        self.uncovered > 0
    }

    /// Number of rows that covered interaction `id` so far.
    pub fn hits(&self, id: usize) -> u32 {
        self.hits[id]
    }

    fn is_uncovered(&self, id: usize) -> bool {
        self.hits[id] == 0 && !self.retired[id]
    }

    fn note_covered(&mut self, id: usize) {
        self.uncovered -= 1;
        for p in self.interactions[id].set_parameters().collect::<Vec<_>>() {
            if let Some(v) = self.interactions[id].value(p) {
                self.uncovered_per_value[p][v] -= 1;
            }
        }
    }

    fn retire(&mut self, id: usize) {
        if self.is_uncovered(id) {
            self.note_covered(id);
        }
        self.retired[id] = true;
    }

    /// Visits every interaction contained in `row` exactly once, through its
    /// first set parameter.
    fn contained_in(&self, row: &Combination) -> Vec<usize> {
        let mut ids = Vec::new();
        for p in row.set_parameters() {
            let Some(v) = row.value(p) else { continue };
            let Some(candidates) = self.by_value.get(p).and_then(|values| values.get(v)) else {
                continue;
            };
            for &id in candidates {
                if self.first_parameter[id] == p && row.contains(&self.interactions[id]) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Marks every interaction contained in `row` as covered and returns how
    /// many were uncovered before.
    pub fn mark_covered(&mut self, row: &Combination) -> usize {
        let mut newly = 0;
        for id in self.contained_in(row) {
            if self.is_uncovered(id) {
                self.note_covered(id);
                newly += 1;
            }
            self.hits[id] = self.hits[id].saturating_add(1);
        }
        newly
    }

    /// How many uncovered interactions `row` would cover.
    pub fn newly_covered_by(&self, row: &Combination) -> usize {
        self.contained_in(row)
            .into_iter()
            .filter(|&id| self.is_uncovered(id))
            .count()
    }

    /// Uncovered interactions consistent with `partial`.
    pub fn count_uncovered(&self, partial: &Combination) -> usize {
        (0..self.interactions.len())
            .filter(|&id| self.is_uncovered(id) && partial.is_consistent_with(&self.interactions[id]))
            .count()
    }

    /// For each value of `parameter`: uncovered interactions that setting it
    /// in `partial` would complete. Other set parameters of such an
    /// interaction must already match `partial`.
    pub fn best_value_for(&self, partial: &Combination, parameter: usize) -> Vec<usize> {
        self.per_value(parameter, |interaction| {
            interaction
                .set_parameters()
                .filter(|&q| q != parameter)
                .all(|q| partial.value(q) == interaction.value(q))
        })
    }

    /// For each value of `parameter`: uncovered interactions still reachable
    /// after setting it in `partial`.
    pub fn potential_for(&self, partial: &Combination, parameter: usize) -> Vec<usize> {
        self.per_value(parameter, |interaction| {
            interaction
                .set_parameters()
                .filter(|&q| q != parameter)
                .all(|q| partial.value(q).is_none() || partial.value(q) == interaction.value(q))
        })
    }

    fn per_value(&self, parameter: usize, counts: impl Fn(&Combination) -> bool) -> Vec<usize> {
        let size = self.parameter_sizes.get(parameter).copied().unwrap_or(0);
        (0..size)
            .map(|v| {
                self.by_value[parameter][v]
                    .iter()
                    .filter(|&&id| self.is_uncovered(id) && counts(&self.interactions[id]))
                    .count()
            })
            .collect()
    }

    /// The `(parameter, value)` occurring in the most uncovered
    /// interactions. Ties go to the lowest `(parameter, value)`. Pairs in
    /// `forbidden` and parameters in `excluded` are skipped; `None` when no
    /// candidate has any uncovered interaction.
    pub fn most_common_value(
        &self,
        forbidden: &BTreeSet<ParameterValue>,
        excluded: &BTreeSet<usize>,
    ) -> Option<ParameterValue> {
        let mut best: Option<(ParameterValue, usize)> = None;
        for (p, counts) in self.uncovered_per_value.iter().enumerate() {
            if excluded.contains(&p) {
                continue;
            }
            for (v, &count) in counts.iter().enumerate() {
                let candidate = ParameterValue::new(p, v);
                if count == 0 || forbidden.contains(&candidate) {
                    continue;
                }
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((candidate, count));
                }
            }
        }
        best.map(|(pair, _)| pair)
    }

    /// Some uncovered interaction, lowest id first.
    pub fn uncovered_interaction(&self) -> Option<&Combination> {
        let start = self.cursor.get();
        let found = (start..self.interactions.len()).find(|&id| self.is_uncovered(id));
        self.cursor.set(found.unwrap_or(self.interactions.len()));
        found.map(|id| &self.interactions[id])
    }

    /// Some uncovered interaction assigning `pair.value` to `pair.parameter`.
    pub fn uncovered_interaction_with(&self, pair: ParameterValue) -> Option<&Combination> {
        self.by_value
            .get(pair.parameter)?
            .get(pair.value)?
            .iter()
            .find(|&&id| self.is_uncovered(id))
            .map(|&id| &self.interactions[id])
    }

    /// Retires every uncovered interaction that contains `combination` or
    /// that `checker` no longer accepts.
    pub fn add_forbidden_combination(
        &mut self,
        combination: &Combination,
        checker: &dyn ConstraintChecker,
    ) {
        let mut retired = 0;
        for id in 0..self.interactions.len() {
            if !self.is_uncovered(id) {
                continue;
            }
            let interaction = &self.interactions[id];
            if interaction.contains(combination) || !checker.is_valid(interaction) {
                self.retire(id);
                retired += 1;
            }
        }
        debug!(%combination, retired, remaining = self.uncovered, "forbidden combination applied to coverage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::constraint::{HardConstraintChecker, NoConstraintChecker};
    use tessera_ir::types::TestModel;

    fn c(values: &[i32]) -> Combination {
        Combination::from_values(values.to_vec())
    }

    fn combinations() -> Vec<Combination> {
        vec![
            c(&[1, -1, -1]),
            c(&[-1, 2, -1]),
            c(&[1, -1, 2]),
            c(&[-1, 1, -1]),
            c(&[1, 2, 2]),
            c(&[2, 2, -1]),
        ]
    }

    fn map() -> CoverageMap {
        CoverageMap::new(&[3, 3, 3], combinations(), &NoConstraintChecker)
    }

    #[test]
    fn test_counts_consistent_uncovered_combinations() {
        // [1,-,-], [-,2,-] and [-,1,-].
        assert_eq!(map().count_uncovered(&c(&[1, -1, 1])), 3);
        assert_eq!(map().uncovered_count(), 6);
    }

    #[test]
    fn test_covered_rows_reduce_counts() {
        let mut map = map();
        assert_eq!(map.mark_covered(&c(&[1, 2, 1])), 2);
        assert_eq!(map.count_uncovered(&c(&[1, 1, 1])), 1);
    }

    #[test]
    fn test_marking_is_idempotent_for_status() {
        let mut map = map();
        map.mark_covered(&c(&[1, 2, 2]));
        let after_first = map.uncovered_count();
        assert_eq!(map.mark_covered(&c(&[1, 2, 2])), 0);
        assert_eq!(map.uncovered_count(), after_first);
        assert_eq!(after_first, 2);
    }

    #[test]
    fn test_most_common_value_ties_go_to_lowest_pair() {
        let map = map();
        let none = BTreeSet::new();
        assert_eq!(
            map.most_common_value(&none, &BTreeSet::new()),
            Some(ParameterValue::new(0, 1))
        );
    }

    #[test]
    fn test_most_common_value_after_coverage() {
        let mut map = map();
        map.mark_covered(&c(&[1, 1, 1]));
        assert_eq!(
            map.most_common_value(&BTreeSet::new(), &BTreeSet::new()),
            Some(ParameterValue::new(1, 2))
        );
    }

    #[test]
    fn test_most_common_value_skips_forbidden_pairs() {
        let map = map();
        let forbidden = BTreeSet::from([ParameterValue::new(0, 1)]);
        assert_eq!(
            map.most_common_value(&forbidden, &BTreeSet::new()),
            Some(ParameterValue::new(1, 2))
        );
    }

    #[test]
    fn test_most_common_value_none_when_all_covered() {
        let mut map = CoverageMap::new(&[2], vec![c(&[0]), c(&[1])], &NoConstraintChecker);
        map.mark_covered(&c(&[0]));
        map.mark_covered(&c(&[1]));
        assert!(!map.has_uncovered());
        assert_eq!(map.most_common_value(&BTreeSet::new(), &BTreeSet::new()), None);
        assert!(map.uncovered_interaction().is_none());
    }

    #[test]
    fn test_best_value_for_uses_containment() {
        let map = map();
        // Setting p2 in [1,2,-]: value 2 completes [1,-,2] and [1,2,2].
        assert_eq!(map.best_value_for(&c(&[1, 2, -1]), 2), vec![0, 0, 2]);
        // Setting p0 in [-,2,-]: [1,-,-] for 1, [2,2,-] for 2.
        assert_eq!(map.best_value_for(&c(&[-1, 2, -1]), 0), vec![0, 1, 1]);
    }

    #[test]
    fn test_potential_for_uses_consistency() {
        let map = map();
        // p0 = 1 keeps [1,-,-], [1,-,2] and [1,2,2] reachable from an empty row.
        assert_eq!(map.potential_for(&c(&[-1, -1, -1]), 0), vec![0, 3, 1]);
    }

    #[test]
    fn test_dynamic_forbidden_combination_retires_supersets() {
        let mut map = map();
        map.add_forbidden_combination(&c(&[1, -1, -1]), &NoConstraintChecker);
        assert_eq!(map.uncovered_count(), 3);
    }

    #[test]
    fn test_implicitly_forbidden_interactions_are_retired() {
        let model = TestModel::unconstrained(2, vec![2, 2, 2]).unwrap();
        let mut checker = HardConstraintChecker::new(&model);
        let mut map = CoverageMap::with_strength(&[2, 2, 2], 2, &checker);
        assert_eq!(map.uncovered_count(), 12);

        for forbidden in [c(&[0, 0, -1]), c(&[1, -1, 0])] {
            checker.add_forbidden_combination(&forbidden);
            map.add_forbidden_combination(&forbidden, &checker);
        }
        // [0,0,-], [1,-,0] and the implied [-,0,0] are gone.
        assert_eq!(map.count_uncovered(&c(&[0, 0, 0])), 1);
    }

    #[test]
    fn test_invalid_interactions_retired_at_construction() {
        let model = TestModel::unconstrained(2, vec![2, 2]).unwrap();
        let mut checker = HardConstraintChecker::new(&model);
        checker.add_forbidden_combination(&c(&[1, 1]));
        let map = CoverageMap::with_strength(&[2, 2], 2, &checker);
        assert_eq!(map.uncovered_count(), 3);
    }

    #[test]
    fn test_uncovered_interaction_with_pair() {
        let mut map = map();
        let pair = ParameterValue::new(1, 2);
        assert_eq!(map.uncovered_interaction_with(pair), Some(&c(&[-1, 2, -1])));
        map.mark_covered(&c(&[0, 2, 0]));
        assert_eq!(map.uncovered_interaction_with(pair), Some(&c(&[1, 2, 2])));
    }

    #[test]
    fn test_hits_keep_counting_after_cover() {
        let mut map = CoverageMap::new(&[2], vec![c(&[0])], &NoConstraintChecker);
        map.mark_covered(&c(&[0]));
        map.mark_covered(&c(&[0]));
        assert_eq!(map.hits(0), 2);
    }
}
