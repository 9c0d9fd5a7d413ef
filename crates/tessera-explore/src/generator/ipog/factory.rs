use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tessera_ir::combinator::parameter_combinations;

/// Decides which already-covered parameter sets must be combined with the
/// parameter IPOG adds next.
pub trait ParameterCombinationFactory {
    /// Subsets of `covered` whose value combinations have to appear together
    /// with every value of `next`.
    fn create(&self, covered: &[usize], next: usize, strength: usize) -> Vec<Vec<usize>>;

    /// Name of this factory (for tracing).
    fn name(&self) -> &str;
}

/// Uniform strength: every `(strength - 1)`-subset of the covered parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TWiseParameterCombinationFactory;

impl ParameterCombinationFactory for TWiseParameterCombinationFactory {
    fn create(&self, covered: &[usize], _next: usize, strength: usize) -> Vec<Vec<usize>> {
        if strength == 0 {
            return Vec::new();
        }
        parameter_combinations(covered, strength - 1)
    }

    fn name(&self) -> &str {
        "t-wise"
    }
}

/// A group of parameters tested together at its own strength, higher or
/// lower than the model's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub parameters: Vec<usize>,
    pub strength: usize,
}

/// The uniform t-wise sets plus, for every group containing the next
/// parameter, the `(group strength - 1)`-subsets of its covered members.
///
/// A t-wise set lying entirely inside a group of lower strength (together
/// with the next parameter) is dropped; the group's own subsets replace it.
#[derive(Debug, Clone, Default)]
pub struct MixedStrengthParameterCombinationFactory {
    groups: Vec<ParameterGroup>,
}

impl MixedStrengthParameterCombinationFactory {
    pub fn new(groups: Vec<ParameterGroup>) -> Self {
        Self { groups }
    }
}

impl ParameterCombinationFactory for MixedStrengthParameterCombinationFactory {
    fn create(&self, covered: &[usize], next: usize, strength: usize) -> Vec<Vec<usize>> {
        let groups: Vec<&ParameterGroup> = self
            .groups
            .iter()
            .filter(|group| group.parameters.contains(&next))
            .collect();

        let mut sets: BTreeSet<Vec<usize>> = TWiseParameterCombinationFactory
            .create(covered, next, strength)
            .into_iter()
            .filter(|set| {
                !groups.iter().any(|group| {
                    group.strength < strength
                        && set.iter().all(|p| group.parameters.contains(p))
                })
            })
            .collect();

        for group in groups {
            if group.strength == 0 {
                continue;
            }
            let members: Vec<usize> = covered
                .iter()
                .copied()
                .filter(|p| group.parameters.contains(p))
                .collect();
            for mut subset in parameter_combinations(&members, group.strength - 1) {
                subset.sort_unstable();
                sets.insert(subset);
            }
        }
        sets.into_iter().collect()
    }

    fn name(&self) -> &str {
        "mixed-strength"
    }
}
