//! Constraint checking for partial combinations.
//!
//! A combination is *valid* when it can be completed to a full test input
//! that contains no forbidden combination. The hard checker answers that
//! exactly with a SAT solver:
//!
//! - one variable per `(parameter, value)` pair, exactly-one per parameter
//! - one blocking clause per forbidden combination
//! - set slots of the queried combination passed as assumptions

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::{debug, warn};
use varisat::solver::Solver;
use varisat::{ExtendFormula, Lit, Var};

use tessera_ir::types::{Combination, TestModel};

/// Answers whether a partial combination is completable without hitting a
/// forbidden combination.
pub trait ConstraintChecker {
    fn is_valid(&self, combination: &Combination) -> bool;

    /// Validity of `combination` with `parameter` set to `value`.
    fn is_extension_valid(&self, combination: &Combination, parameter: usize, value: usize) -> bool {
        let mut extended = combination.clone();
        extended.set(parameter, value);
        self.is_valid(&extended)
    }
}

/// A checker that can be tightened while in use.
pub trait DynamicConstraintChecker: ConstraintChecker {
    /// Forbids `combination` for every later query.
    fn add_forbidden_combination(&mut self, combination: &Combination);
}

/// Accepts every combination.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConstraintChecker;

impl ConstraintChecker for NoConstraintChecker {
    fn is_valid(&self, _combination: &Combination) -> bool {
        true
    }
}

/// Cached answers kept before the cache is reset.
pub const DEFAULT_CACHE_CAPACITY: usize = 1 << 16;

/// Exact checker over the forbidden and error tuples of a model, extensible
/// with further forbidden combinations at runtime.
pub struct HardConstraintChecker {
    parameter_sizes: Vec<usize>,
    /// `vars[p][v]` is true iff parameter `p` takes value `v`.
    vars: Vec<Vec<Var>>,
    solver: RefCell<Solver<'static>>,
    forbidden: Vec<Combination>,
    /// Set once an all-wildcard combination is forbidden.
    unsatisfiable: bool,
    cache: RefCell<HashMap<Combination, bool>>,
    cache_capacity: usize,
}

impl HardConstraintChecker {
    pub fn new(model: &TestModel) -> Self {
        let parameter_sizes = model.parameter_sizes().to_vec();
        let mut solver = Solver::new();
        let mut next_var = 0;
        let mut vars = Vec::with_capacity(parameter_sizes.len());

        for &size in &parameter_sizes {
            let values: Vec<Var> = (0..size)
                .map(|_| {
                    let var = Var::from_index(next_var);
                    next_var += 1;
                    var
                })
                .collect();

            // Register every variable, then exactly-one.
            for var in &values {
                solver.add_clause(&[var.positive(), var.negative()]);
            }
            let at_least_one: Vec<Lit> = values.iter().map(|v| v.positive()).collect();
            solver.add_clause(&at_least_one);
            for i in 0..values.len() {
                for j in (i + 1)..values.len() {
                    solver.add_clause(&[values[i].negative(), values[j].negative()]);
                }
            }
            vars.push(values);
        }

        let mut checker = Self {
            parameter_sizes,
            vars,
            solver: RefCell::new(solver),
            forbidden: Vec::new(),
            unsatisfiable: false,
            cache: RefCell::new(HashMap::new()),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        };
        for combination in model.hard_constraint_combinations() {
            checker.add_forbidden_combination(&combination);
        }
        checker
    }

    /// Forbids `combination` for every later query.
    pub fn add_forbidden_combination(&mut self, combination: &Combination) {
        let blocking: Vec<Lit> = combination
            .set_parameters()
            .filter_map(|p| self.literal(p, combination.value(p)?))
            .map(|lit| !lit)
            .collect();
        if blocking.is_empty() {
            warn!(%combination, "forbidding the empty combination; every input becomes invalid");
            self.unsatisfiable = true;
        } else {
            self.solver.get_mut().add_clause(&blocking);
        }
        self.forbidden.push(combination.clone());
        self.cache.get_mut().clear();
        debug!(%combination, total = self.forbidden.len(), "added forbidden combination");
    }

    /// Caps the answer cache; a full cache is cleared before the next insert.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self.cache.get_mut().clear();
        self
    }

    /// Answers currently cached.
    pub fn cached_queries(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Every combination forbidden so far, model tuples first.
    pub fn forbidden_combinations(&self) -> &[Combination] {
        &self.forbidden
    }

    fn literal(&self, parameter: usize, value: usize) -> Option<Lit> {
        self.vars
            .get(parameter)
            .and_then(|values| values.get(value))
            .map(|var| var.positive())
    }

    fn in_range(&self, combination: &Combination) -> bool {
        combination.len() == self.parameter_sizes.len()
            && combination
                .set_parameters()
                .all(|p| combination.value(p).is_some_and(|v| v < self.parameter_sizes[p]))
    }

    fn solve_with(&self, combination: &Combination) -> bool {
        let assumptions: Vec<Lit> = combination
            .set_parameters()
            .filter_map(|p| self.literal(p, combination.value(p)?))
            .collect();
        let mut solver = self.solver.borrow_mut();
        solver.assume(&assumptions);
        match solver.solve() {
            Ok(satisfiable) => satisfiable,
            Err(e) => {
                warn!(%combination, error = %e, "constraint solver failed; treating as invalid");
                false
            }
        }
    }
}

impl ConstraintChecker for HardConstraintChecker {
    fn is_valid(&self, combination: &Combination) -> bool {
        if self.unsatisfiable || !self.in_range(combination) {
            return false;
        }
        if self.forbidden.is_empty() {
            return true;
        }
        if let Some(&known) = self.cache.borrow().get(combination) {
            return known;
        }
        let valid = self.solve_with(combination);
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= self.cache_capacity {
            cache.clear();
        }
        if self.cache_capacity > 0 {
            cache.insert(combination.clone(), valid);
        }
        valid
    }
}

impl DynamicConstraintChecker for HardConstraintChecker {
    fn add_forbidden_combination(&mut self, combination: &Combination) {
        HardConstraintChecker::add_forbidden_combination(self, combination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ir::types::TupleList;

    fn c(values: &[i32]) -> Combination {
        Combination::from_values(values.to_vec())
    }

    #[test]
    fn test_unconstrained_model_accepts_everything_in_range() {
        let model = TestModel::unconstrained(2, vec![2, 2, 2]).unwrap();
        let checker = HardConstraintChecker::new(&model);
        assert!(checker.is_valid(&c(&[0, 1, -1])));
        assert!(checker.is_valid(&c(&[-1, -1, -1])));
        assert!(!checker.is_valid(&c(&[0, 2, -1])));
    }

    #[test]
    fn test_forbidden_tuple_rejects_supersets_only() {
        let list = TupleList::new(0, vec![0, 1], vec![vec![0, 0]]);
        let model = TestModel::new(2, vec![2, 2, 2], vec![list], vec![]).unwrap();
        let checker = HardConstraintChecker::new(&model);
        assert!(!checker.is_valid(&c(&[0, 0, -1])));
        assert!(!checker.is_valid(&c(&[0, 0, 1])));
        assert!(checker.is_valid(&c(&[0, -1, -1])));
        assert!(checker.is_valid(&c(&[0, 1, 1])));
    }

    #[test]
    fn test_implicit_conflict_is_detected() {
        // [0,0,-] and [1,-,0] forbidden: [-,0,0] has no valid completion.
        let model = TestModel::unconstrained(2, vec![2, 2, 2]).unwrap();
        let mut checker = HardConstraintChecker::new(&model);
        checker.add_forbidden_combination(&c(&[0, 0, -1]));
        checker.add_forbidden_combination(&c(&[1, -1, 0]));
        assert!(!checker.is_valid(&c(&[-1, 0, 0])));
        assert!(checker.is_valid(&c(&[-1, 0, 1])));
        assert!(checker.is_extension_valid(&c(&[-1, 0, -1]), 2, 1));
        assert!(!checker.is_extension_valid(&c(&[-1, 0, -1]), 2, 0));
    }

    #[test]
    fn test_runtime_forbid_invalidates_cached_answer() {
        let model = TestModel::unconstrained(1, vec![2, 2]).unwrap();
        let mut checker = HardConstraintChecker::new(&model);
        checker.add_forbidden_combination(&c(&[1, 1]));
        assert!(checker.is_valid(&c(&[0, -1])));
        checker.add_forbidden_combination(&c(&[0, -1]));
        assert!(!checker.is_valid(&c(&[0, -1])));
        assert_eq!(checker.forbidden_combinations().len(), 2);
    }

    #[test]
    fn test_cache_stays_within_capacity() {
        let model = TestModel::unconstrained(2, vec![3, 3]).unwrap();
        let mut checker = HardConstraintChecker::new(&model).with_cache_capacity(2);
        checker.add_forbidden_combination(&c(&[0, 0]));
        for a in 0..3 {
            for b in 0..3 {
                assert_eq!(checker.is_valid(&c(&[a, b])), (a, b) != (0, 0));
                assert!(checker.cached_queries() <= 2);
            }
        }
        // Answers after a reset are still exact.
        assert!(!checker.is_valid(&c(&[0, 0])));
        assert!(checker.is_valid(&c(&[0, -1])));

        let mut uncached = HardConstraintChecker::new(&model).with_cache_capacity(0);
        uncached.add_forbidden_combination(&c(&[1, 1]));
        assert!(!uncached.is_valid(&c(&[1, 1])));
        assert_eq!(uncached.cached_queries(), 0);
    }

    #[test]
    fn test_forbidding_empty_combination_invalidates_everything() {
        let model = TestModel::unconstrained(1, vec![2]).unwrap();
        let mut checker = HardConstraintChecker::new(&model);
        checker.add_forbidden_combination(&c(&[-1]));
        assert!(!checker.is_valid(&c(&[-1])));
        assert!(!checker.is_valid(&c(&[0])));
    }

    #[test]
    fn test_no_constraint_checker() {
        assert!(NoConstraintChecker.is_valid(&c(&[5, -1])));
        assert!(NoConstraintChecker.is_extension_valid(&c(&[-1, -1]), 0, 9));
    }
}
