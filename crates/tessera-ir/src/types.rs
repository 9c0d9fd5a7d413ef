use std::fmt;

use serde::{Deserialize, Serialize};

/// Slot value meaning "this parameter is not part of the combination".
pub const NO_VALUE: i32 = -1;

// ── Combinations ─────────────────────────────────────────────────────

/// A fixed-length assignment of value indices to parameters.
///
/// Every slot holds either a value index `0..size` of its parameter or
/// [`NO_VALUE`]. The same type is used for complete test inputs, partial
/// interactions and forbidden or failure-inducing sub-combinations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<i32>", into = "Vec<i32>")]
pub struct Combination(Vec<i32>);

impl Combination {
    /// A combination of `parameters` slots, all unset.
    pub fn empty(parameters: usize) -> Self {
        Self(vec![NO_VALUE; parameters])
    }

    /// Any negative value becomes [`NO_VALUE`].
    pub fn from_values(mut values: Vec<i32>) -> Self {
        for v in values.iter_mut().filter(|v| **v < 0) {
            *v = NO_VALUE;
        }
        Self(values)
    }

    /// Number of slots (the parameter count of the model).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[i32] {
        &self.0
    }

    /// Value assigned to `parameter`, or `None` for a wildcard slot.
    pub fn value(&self, parameter: usize) -> Option<usize> {
        match self.0.get(parameter) {
            Some(&v) if v >= 0 => Some(v as usize),
            _ => None,
        }
    }

    pub fn is_set(&self, parameter: usize) -> bool {
        self.value(parameter).is_some()
    }

    pub fn set(&mut self, parameter: usize, value: usize) {
        self.0[parameter] = value as i32;
    }

    pub fn clear(&mut self, parameter: usize) {
        self.0[parameter] = NO_VALUE;
    }

    /// Parameters with an assigned value, in ascending order.
    pub fn set_parameters(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != NO_VALUE)
            .map(|(p, _)| p)
    }

    pub fn set_parameter_count(&self) -> usize {
        self.0.iter().filter(|&&v| v != NO_VALUE).count()
    }

    /// True when no slot is a wildcard.
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(|&v| v != NO_VALUE)
    }

    /// True when every listed parameter has a value.
    pub fn has_values_for(&self, parameters: &[usize]) -> bool {
        parameters.iter().all(|&p| self.is_set(p))
    }

    /// `self` contains `other` iff every set slot of `other` holds the same
    /// value in `self`. Wildcards in `other` match anything.
    pub fn contains(&self, other: &Combination) -> bool {
        debug_assert_eq!(self.len(), other.len());
        self.0
            .iter()
            .zip(&other.0)
            .all(|(&a, &b)| b == NO_VALUE || a == b)
    }

    /// No slot is set in both with different values.
    pub fn is_consistent_with(&self, other: &Combination) -> bool {
        debug_assert_eq!(self.len(), other.len());
        self.0
            .iter()
            .zip(&other.0)
            .all(|(&a, &b)| a == NO_VALUE || b == NO_VALUE || a == b)
    }

    /// Copies every set slot of `other` into `self`.
    ///
    /// Callers check [`Combination::is_consistent_with`] first; conflicting
    /// slots are overwritten.
    pub fn merge(&mut self, other: &Combination) {
        for (slot, &v) in self.0.iter_mut().zip(&other.0) {
            if v != NO_VALUE {
                *slot = v;
            }
        }
    }

    /// A copy with every slot outside `parameters` cleared.
    pub fn restricted_to(&self, parameters: &[usize]) -> Combination {
        let mut result = Combination::empty(self.len());
        for &p in parameters {
            result.0[p] = self.0[p];
        }
        result
    }
}

impl From<Vec<i32>> for Combination {
    fn from(values: Vec<i32>) -> Self {
        Self::from_values(values)
    }
}

impl From<Combination> for Vec<i32> {
    fn from(combination: Combination) -> Self {
        combination.0
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, &v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if v == NO_VALUE {
                write!(f, "-")?;
            } else {
                write!(f, "{v}")?;
            }
        }
        write!(f, "]")
    }
}

/// A single `parameter = value` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterValue {
    pub parameter: usize,
    pub value: usize,
}

impl ParameterValue {
    pub fn new(parameter: usize, value: usize) -> Self {
        Self { parameter, value }
    }
}

// ── Test model ───────────────────────────────────────────────────────

/// Errors raised when a test model is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("strength {strength} exceeds the number of parameters ({parameters})")]
    StrengthExceedsParameters { strength: usize, parameters: usize },

    #[error("parameter {parameter} has an empty domain")]
    EmptyDomain { parameter: usize },

    #[error("tuple list {id} references unknown parameter {parameter}")]
    UnknownParameter { id: u32, parameter: usize },

    #[error("tuple list {id} has a tuple of arity {found}, expected {expected}")]
    TupleArity { id: u32, expected: usize, found: usize },

    #[error("tuple list {id} assigns value {value} to parameter {parameter} of size {size}")]
    ValueOutOfRange {
        id: u32,
        parameter: usize,
        value: usize,
        size: usize,
    },
}

/// A list of forbidden value tuples over a fixed set of parameters.
///
/// `tuples[k][j]` is the value of `involved_parameters[j]` in the k-th
/// forbidden tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleList {
    pub id: u32,
    pub involved_parameters: Vec<usize>,
    pub tuples: Vec<Vec<usize>>,
}

impl TupleList {
    pub fn new(id: u32, involved_parameters: Vec<usize>, tuples: Vec<Vec<usize>>) -> Self {
        Self {
            id,
            involved_parameters,
            tuples,
        }
    }

    /// Every tuple as a combination over `parameters` slots.
    pub fn combinations(&self, parameters: usize) -> Vec<Combination> {
        self.tuples
            .iter()
            .map(|tuple| {
                let mut combination = Combination::empty(parameters);
                for (&p, &v) in self.involved_parameters.iter().zip(tuple) {
                    combination.set(p, v);
                }
                combination
            })
            .collect()
    }

    fn validate(&self, parameter_sizes: &[usize]) -> Result<(), ModelError> {
        for &parameter in &self.involved_parameters {
            if parameter >= parameter_sizes.len() {
                return Err(ModelError::UnknownParameter {
                    id: self.id,
                    parameter,
                });
            }
        }
        for tuple in &self.tuples {
            if tuple.len() != self.involved_parameters.len() {
                return Err(ModelError::TupleArity {
                    id: self.id,
                    expected: self.involved_parameters.len(),
                    found: tuple.len(),
                });
            }
            for (&parameter, &value) in self.involved_parameters.iter().zip(tuple) {
                let size = parameter_sizes[parameter];
                if value >= size {
                    return Err(ModelError::ValueOutOfRange {
                        id: self.id,
                        parameter,
                        value,
                        size,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Serialized shape of a [`TestModel`]; validated on conversion.
#[derive(Debug, Clone, Deserialize)]
struct TestModelDocument {
    strength: usize,
    parameter_sizes: Vec<usize>,
    #[serde(default)]
    forbidden_tuple_lists: Vec<TupleList>,
    #[serde(default)]
    error_tuple_lists: Vec<TupleList>,
}

impl TryFrom<TestModelDocument> for TestModel {
    type Error = ModelError;

    fn try_from(doc: TestModelDocument) -> Result<Self, Self::Error> {
        TestModel::new(
            doc.strength,
            doc.parameter_sizes,
            doc.forbidden_tuple_lists,
            doc.error_tuple_lists,
        )
    }
}

/// The input parameter model of one test run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TestModelDocument")]
pub struct TestModel {
    strength: usize,
    parameter_sizes: Vec<usize>,
    forbidden_tuple_lists: Vec<TupleList>,
    error_tuple_lists: Vec<TupleList>,
}

impl TestModel {
    pub fn new(
        strength: usize,
        parameter_sizes: Vec<usize>,
        forbidden_tuple_lists: Vec<TupleList>,
        error_tuple_lists: Vec<TupleList>,
    ) -> Result<Self, ModelError> {
        if strength > parameter_sizes.len() {
            return Err(ModelError::StrengthExceedsParameters {
                strength,
                parameters: parameter_sizes.len(),
            });
        }
        if let Some(parameter) = parameter_sizes.iter().position(|&s| s == 0) {
            return Err(ModelError::EmptyDomain { parameter });
        }
        for list in forbidden_tuple_lists.iter().chain(&error_tuple_lists) {
            list.validate(&parameter_sizes)?;
        }
        Ok(Self {
            strength,
            parameter_sizes,
            forbidden_tuple_lists,
            error_tuple_lists,
        })
    }

    /// A model without any constraints.
    pub fn unconstrained(strength: usize, parameter_sizes: Vec<usize>) -> Result<Self, ModelError> {
        Self::new(strength, parameter_sizes, vec![], vec![])
    }

    pub fn strength(&self) -> usize {
        self.strength
    }

    pub fn parameter_sizes(&self) -> &[usize] {
        &self.parameter_sizes
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_sizes.len()
    }

    pub fn size_of(&self, parameter: usize) -> usize {
        self.parameter_sizes[parameter]
    }

    pub fn forbidden_tuple_lists(&self) -> &[TupleList] {
        &self.forbidden_tuple_lists
    }

    pub fn error_tuple_lists(&self) -> &[TupleList] {
        &self.error_tuple_lists
    }

    /// Every tuple of every forbidden and error list, as combinations.
    pub fn hard_constraint_combinations(&self) -> Vec<Combination> {
        let n = self.parameter_count();
        self.forbidden_tuple_lists
            .iter()
            .chain(&self.error_tuple_lists)
            .flat_map(|list| list.combinations(n))
            .collect()
    }

    pub fn has_constraints(&self) -> bool {
        self.forbidden_tuple_lists
            .iter()
            .chain(&self.error_tuple_lists)
            .any(|list| !list.tuples.is_empty())
    }
}

// ── Test results ─────────────────────────────────────────────────────

/// Outcome of executing one test input against the system under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TestResult {
    Success,
    Failure {
        #[serde(default)]
        cause: Option<String>,
    },
}

impl TestResult {
    pub fn success() -> Self {
        TestResult::Success
    }

    pub fn failure(cause: impl Into<String>) -> Self {
        TestResult::Failure {
            cause: Some(cause.into()),
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, TestResult::Success)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_successful()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(values: &[i32]) -> Combination {
        Combination::from_values(values.to_vec())
    }

    #[test]
    fn test_containment_examples() {
        assert!(!c(&[1, -1, -1]).contains(&c(&[1, -1, 2])));
        assert!(c(&[1, 0, 2]).contains(&c(&[1, -1, 2])));
        assert!(c(&[1, 0, 2]).contains(&c(&[-1, -1, -1])));
    }

    #[test]
    fn test_consistency_ignores_wildcards() {
        assert!(c(&[1, -1, 2]).is_consistent_with(&c(&[-1, 0, 2])));
        assert!(!c(&[1, -1, 2]).is_consistent_with(&c(&[0, -1, -1])));
    }

    #[test]
    fn test_merge_and_restrict() {
        let mut a = c(&[1, -1, -1]);
        a.merge(&c(&[-1, -1, 0]));
        assert_eq!(a, c(&[1, -1, 0]));
        assert_eq!(c(&[2, 1, 0]).restricted_to(&[1]), c(&[-1, 1, -1]));
    }

    #[test]
    fn test_display_uses_dash_for_wildcard() {
        assert_eq!(c(&[1, -1, 0]).to_string(), "[1, -, 0]");
    }

    #[test]
    fn test_negative_values_are_wildcards() {
        let combination = c(&[-2, 1, i32::MIN]);
        assert_eq!(combination, c(&[-1, 1, -1]));
        assert_eq!(combination.value(0), None);
        assert_eq!(combination.set_parameter_count(), 1);

        let parsed: Combination = serde_json::from_str("[-3, 0]").unwrap();
        assert_eq!(parsed.values(), &[NO_VALUE, 0]);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "[-1,0]");
    }

    #[test]
    fn test_strength_exceeding_parameters_is_rejected() {
        let err = TestModel::unconstrained(4, vec![2, 2, 2]).unwrap_err();
        assert_eq!(
            err,
            ModelError::StrengthExceedsParameters {
                strength: 4,
                parameters: 3
            }
        );
    }

    #[test]
    fn test_tuple_list_value_out_of_range() {
        let list = TupleList::new(7, vec![0, 1], vec![vec![0, 3]]);
        let err = TestModel::new(2, vec![2, 2], vec![list], vec![]).unwrap_err();
        assert!(matches!(err, ModelError::ValueOutOfRange { id: 7, parameter: 1, .. }));
    }

    #[test]
    fn test_tuple_list_combinations() {
        let list = TupleList::new(1, vec![0, 2], vec![vec![0, 1], vec![1, 0]]);
        assert_eq!(list.combinations(3), vec![c(&[0, -1, 1]), c(&[1, -1, 0])]);
    }
}
