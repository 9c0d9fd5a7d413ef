//! Characterization campaign driver.
//!
//! Owns the loop every strategy needs: execute a batch on the oracle, hand
//! the results to the strategy, repeat until it answers with an empty batch
//! or a limit is reached. Inputs already executed are answered from the
//! campaign history instead of running the oracle again.

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tessera_explore::characterize::fic::Fic;
use tessera_explore::characterize::ict::{Ict, IctConfig};
use tessera_explore::characterize::locating::AdaptiveLocatingArray;
use tessera_explore::characterize::{FaultCharacterization, FaultCharacterizationConfig, TestResults};
use tessera_explore::generator::ipog::{Ipog, IpogConfig};
use tessera_explore::generator::GenerationError;
use tessera_explore::solver::constraint::{ConstraintChecker, HardConstraintChecker};
use tessera_ir::parse::{parse_model, ParseError};
use tessera_ir::types::{Combination, TestModel, TestResult};

use crate::limits::{CampaignLimits, LimitChecker, StopReason};

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Model parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// The system under test.
pub trait TestOracle {
    fn execute(&self, input: &Combination) -> TestResult;
}

impl<F> TestOracle for F
where
    F: Fn(&Combination) -> TestResult,
{
    fn execute(&self, input: &Combination) -> TestResult {
        self(input)
    }
}

/// Strategies a campaign can be run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Fic,
    FicBs,
    AdaptiveLocatingArray,
    Ict,
}

impl StrategyKind {
    pub fn build(self, model: &TestModel, config: &CampaignConfig) -> Box<dyn FaultCharacterization> {
        let base = FaultCharacterizationConfig::new(model.clone());
        match self {
            StrategyKind::Fic => Box::new(Fic::new(base)),
            StrategyKind::FicBs => Box::new(Fic::binary_search(base)),
            StrategyKind::AdaptiveLocatingArray => Box::new(AdaptiveLocatingArray::new(base)),
            StrategyKind::Ict => Box::new(Ict::new(base, config.ict.clone())),
        }
    }

    /// Ict generates its own rows; the others characterize a covering array.
    pub fn needs_initial_suite(self) -> bool {
        !matches!(self, StrategyKind::Ict)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    pub limits: CampaignLimits,
    /// Execute each batch on the rayon pool.
    pub parallel: bool,
    pub ict: IctConfig,
}

/// One executed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedTest {
    pub input: Combination,
    pub result: TestResult,
}

/// Outcome of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub strategy: String,
    pub failure_inducing_combinations: Vec<Combination>,
    /// Size of the suite the campaign started from.
    pub initial_inputs: usize,
    /// Batches requested after the initial one.
    pub rounds: u64,
    /// Distinct inputs run on the oracle.
    pub executed: u64,
    pub stop_reason: StopReason,
    /// Every distinct executed input, in execution order.
    pub history: Vec<ExecutedTest>,
}

/// Runs the oracle over inputs not executed before.
struct Executor<'a, O> {
    oracle: &'a O,
    parallel: bool,
    known: TestResults,
    history: Vec<ExecutedTest>,
}

impl<'a, O: TestOracle + Sync> Executor<'a, O> {
    fn new(oracle: &'a O, parallel: bool) -> Self {
        Self {
            oracle,
            parallel,
            known: TestResults::new(),
            history: Vec::new(),
        }
    }

    fn executed(&self) -> u64 {
        self.history.len() as u64
    }

    fn run(&mut self, inputs: &[Combination]) -> TestResults {
        let mut seen = BTreeSet::new();
        let pending: Vec<&Combination> = inputs
            .iter()
            .filter(|input| !self.known.contains_key(*input) && seen.insert(*input))
            .collect();

        let oracle = self.oracle;
        let fresh: Vec<(Combination, TestResult)> = if self.parallel {
            pending
                .par_iter()
                .map(|input| ((*input).clone(), oracle.execute(input)))
                .collect()
        } else {
            pending
                .iter()
                .map(|input| ((*input).clone(), oracle.execute(input)))
                .collect()
        };
        debug!(
            requested = inputs.len(),
            executed = fresh.len(),
            "executed batch"
        );

        for (input, result) in fresh {
            self.history.push(ExecutedTest {
                input: input.clone(),
                result: result.clone(),
            });
            self.known.insert(input, result);
        }

        inputs
            .iter()
            .filter_map(|input| {
                self.known
                    .get(input)
                    .map(|result| (input.clone(), result.clone()))
            })
            .collect()
    }
}

/// Drives `strategy` from `initial_inputs` until it is done or a limit hits.
pub fn run_characterization<O>(
    strategy: &mut dyn FaultCharacterization,
    initial_inputs: &[Combination],
    oracle: &O,
    config: &CampaignConfig,
) -> CampaignReport
where
    O: TestOracle + Sync,
{
    let checker = LimitChecker::new(config.limits.clone());
    let mut executor = Executor::new(oracle, config.parallel);
    info!(
        strategy = strategy.name(),
        initial = initial_inputs.len(),
        parallel = config.parallel,
        "starting characterization"
    );

    let mut results = executor.run(initial_inputs);
    let mut rounds: u64 = 0;
    let stop_reason = loop {
        let next = strategy.compute_next_test_inputs(&results);
        if next.is_empty() {
            break StopReason::Complete;
        }
        if let Some(reason) = checker.check(rounds, executor.executed()) {
            warn!(?reason, rounds, executed = executor.executed(), "campaign stopped early");
            break reason;
        }
        rounds += 1;
        results = executor.run(&next);
    };

    let failure_inducing_combinations = strategy.compute_failure_inducing_combinations();
    info!(
        strategy = strategy.name(),
        found = failure_inducing_combinations.len(),
        rounds,
        executed = executor.executed(),
        elapsed_secs = checker.elapsed_secs(),
        "characterization finished"
    );

    CampaignReport {
        strategy: strategy.name().to_string(),
        failure_inducing_combinations,
        initial_inputs: initial_inputs.len(),
        rounds,
        executed: executor.executed(),
        stop_reason,
        history: executor.history,
    }
}

/// The suite `kind` starts from: an IPOG suite under `checker`, or nothing
/// for Ict.
pub fn generate_initial_suite(
    model: &TestModel,
    kind: StrategyKind,
    checker: &dyn ConstraintChecker,
) -> Result<Vec<Combination>, CampaignError> {
    if !kind.needs_initial_suite() {
        return Ok(Vec::new());
    }
    Ok(Ipog::new(model, checker, IpogConfig::default()).generate()?)
}

/// Builds the initial suite for `kind` under the model's hard constraints
/// and runs the campaign.
pub fn generate_and_characterize<O>(
    model: &TestModel,
    kind: StrategyKind,
    oracle: &O,
    config: &CampaignConfig,
) -> Result<CampaignReport, CampaignError>
where
    O: TestOracle + Sync,
{
    let checker = HardConstraintChecker::new(model);
    let initial = generate_initial_suite(model, kind, &checker)?;
    let mut strategy = kind.build(model, config);
    Ok(run_characterization(strategy.as_mut(), &initial, oracle, config))
}

/// [`generate_and_characterize`] for a JSON model document.
pub fn characterize_document<O>(
    json: &str,
    kind: StrategyKind,
    oracle: &O,
    config: &CampaignConfig,
) -> Result<CampaignReport, CampaignError>
where
    O: TestOracle + Sync,
{
    let model = parse_model(json)?;
    generate_and_characterize(&model, kind, oracle, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(values: &[i32]) -> Combination {
        Combination::from_values(values.to_vec())
    }

    #[test]
    fn test_closure_is_an_oracle() {
        let oracle = |input: &Combination| {
            if input.value(0) == Some(0) {
                TestResult::failure("zero")
            } else {
                TestResult::success()
            }
        };
        assert!(oracle.execute(&c(&[0])).is_failure());
        assert!(oracle.execute(&c(&[1])).is_successful());
    }

    #[test]
    fn test_executor_runs_each_input_once() {
        let oracle = |_: &Combination| TestResult::success();
        let mut executor = Executor::new(&oracle, false);
        let first = executor.run(&[c(&[0, 0]), c(&[0, 0]), c(&[1, 0])]);
        assert_eq!(first.len(), 2);
        assert_eq!(executor.executed(), 2);

        let second = executor.run(&[c(&[1, 0]), c(&[1, 1])]);
        assert_eq!(second.len(), 2);
        assert_eq!(executor.executed(), 3);
    }

    #[test]
    fn test_strategy_kind_names() {
        let model = TestModel::unconstrained(2, vec![2, 2]).unwrap();
        let config = CampaignConfig::default();
        assert_eq!(StrategyKind::Fic.build(&model, &config).name(), "fic");
        assert_eq!(StrategyKind::FicBs.build(&model, &config).name(), "fic-bs");
        assert_eq!(
            StrategyKind::AdaptiveLocatingArray.build(&model, &config).name(),
            "adaptive-locating-array"
        );
        assert_eq!(StrategyKind::Ict.build(&model, &config).name(), "ict");
        assert!(!StrategyKind::Ict.needs_initial_suite());
    }

    #[test]
    fn test_strategy_kind_from_json() {
        let kind: StrategyKind = serde_json::from_str("\"fic_bs\"").unwrap();
        assert_eq!(kind, StrategyKind::FicBs);
    }
}
