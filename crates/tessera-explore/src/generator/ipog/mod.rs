//! IPOG: grows a covering array one parameter at a time.
//!
//! 1. Seed with every valid combination of the order's initial parameters.
//! 2. Per remaining parameter: horizontal extension (one value per existing
//!    row, highest gain first), then vertical extension (merge each still
//!    uncovered interaction into a compatible row or append it).
//! 3. Close leftover wildcards with the lowest valid value.

pub mod factory;
pub mod order;
mod partition;

use std::cmp::Reverse;

use tracing::{debug, info};

use tessera_ir::combinator::cartesian_product;
use tessera_ir::types::{Combination, TestModel};

use self::factory::{ParameterCombinationFactory, TWiseParameterCombinationFactory};
use self::order::{InputParameterOrder, ParameterOrder};
use self::partition::CombinationPartitioner;
use super::{GenerationError, TestInputGenerator};
use crate::solver::constraint::ConstraintChecker;
use crate::solver::coverage::CoverageMap;

/// Strategy objects fixed for one IPOG run.
pub struct IpogConfig {
    pub order: Box<dyn ParameterOrder>,
    pub factory: Box<dyn ParameterCombinationFactory>,
}

impl Default for IpogConfig {
    fn default() -> Self {
        Self {
            order: Box::new(InputParameterOrder),
            factory: Box::new(TWiseParameterCombinationFactory),
        }
    }
}

pub struct Ipog<'a> {
    model: &'a TestModel,
    checker: &'a dyn ConstraintChecker,
    config: IpogConfig,
}

impl<'a> Ipog<'a> {
    pub fn new(model: &'a TestModel, checker: &'a dyn ConstraintChecker, config: IpogConfig) -> Self {
        Self {
            model,
            checker,
            config,
        }
    }

    /// Builds a suite covering every valid `strength`-way interaction.
    pub fn generate(&self) -> Result<Vec<Combination>, GenerationError> {
        let sizes = self.model.parameter_sizes();
        let strength = self.model.strength();
        let initial = self.config.order.initial_parameters(sizes, strength);
        let remaining = self.config.order.remaining_parameters(sizes, strength);

        let mut rows: Vec<Combination> = cartesian_product(&initial, sizes)
            .into_iter()
            .filter(|row| self.checker.is_valid(row))
            .collect();
        debug!(
            order = self.config.order.name(),
            factory = self.config.factory.name(),
            seed_rows = rows.len(),
            "seeded IPOG suite"
        );

        let mut covered = initial;
        if strength > 0 {
            for parameter in remaining {
                self.extend(&mut rows, &covered, parameter)?;
                covered.push(parameter);
            }
        }

        for row in &mut rows {
            self.close_wildcards(row)?;
        }
        info!(rows = rows.len(), strength, "IPOG generation finished");
        Ok(rows)
    }

    fn extend(
        &self,
        rows: &mut Vec<Combination>,
        covered: &[usize],
        parameter: usize,
    ) -> Result<(), GenerationError> {
        let sizes = self.model.parameter_sizes();
        let strength = self.model.strength();
        let interactions = self
            .config
            .factory
            .create(covered, parameter, strength)
            .into_iter()
            .flat_map(|mut set| {
                set.push(parameter);
                cartesian_product(&set, sizes)
            });
        let mut coverage = CoverageMap::new(sizes, interactions, self.checker);

        let mut relevant = covered.to_vec();
        relevant.push(parameter);

        // Horizontal.
        for row in rows.iter_mut() {
            if !coverage.has_uncovered() {
                break;
            }
            self.add_value_with_highest_gain(&coverage, row, parameter)?;
            coverage.mark_covered(row);
        }

        // Vertical.
        let incomplete: Vec<usize> = (0..rows.len())
            .filter(|&i| !rows[i].has_values_for(&relevant))
            .collect();
        let mut partitioner =
            CombinationPartitioner::new(rows, incomplete, parameter, sizes[parameter]);
        let mut appended = 0;
        while let Some(interaction) = coverage.uncovered_interaction().cloned() {
            if !self.checker.is_valid(&interaction) {
                coverage.mark_covered(&interaction);
                continue;
            }
            let index = match partitioner.extend_suitable(rows, &interaction, self.checker) {
                Some(index) => index,
                None => {
                    rows.push(interaction);
                    appended += 1;
                    let index = rows.len() - 1;
                    partitioner.add(index, &rows[index]);
                    index
                }
            };
            coverage.mark_covered(&rows[index]);
            if rows[index].has_values_for(&relevant) {
                partitioner.remove(index);
            }
        }
        debug!(parameter, rows = rows.len(), appended, "extended suite");
        Ok(())
    }

    fn add_value_with_highest_gain(
        &self,
        coverage: &CoverageMap,
        row: &mut Combination,
        parameter: usize,
    ) -> Result<(), GenerationError> {
        let gains = coverage.best_value_for(row, parameter);
        let mut values: Vec<usize> = (0..gains.len()).collect();
        values.sort_by_key(|&v| Reverse(gains[v]));

        let value = values
            .into_iter()
            .find(|&v| self.checker.is_extension_valid(row, parameter, v))
            .ok_or_else(|| GenerationError::NoValidValue {
                parameter,
                row: row.clone(),
            })?;
        row.set(parameter, value);
        Ok(())
    }

    fn close_wildcards(&self, row: &mut Combination) -> Result<(), GenerationError> {
        for parameter in 0..self.model.parameter_count() {
            if row.is_set(parameter) {
                continue;
            }
            let value = (0..self.model.size_of(parameter))
                .find(|&v| self.checker.is_extension_valid(row, parameter, v))
                .ok_or_else(|| GenerationError::UnclosableWildcard {
                    parameter,
                    row: row.clone(),
                })?;
            row.set(parameter, value);
        }
        Ok(())
    }
}

impl TestInputGenerator for Ipog<'_> {
    fn generate(&mut self) -> Result<Vec<Combination>, GenerationError> {
        Ipog::generate(self)
    }

    fn name(&self) -> &str {
        "ipog"
    }
}
