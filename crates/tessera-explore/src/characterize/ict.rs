//! Ict: interleaved generation and characterization.
//!
//! Rows come from an exclusively owned AETG-SAT generator. A failing row is
//! characterized by mutating each of its parameters once; the parameters
//! whose mutation made the row pass form the candidate. The candidate is
//! then checked against dissimilar rows that contain it. If any of those
//! passes, the candidate was wrong and the row is characterized again with
//! fresh mutations. Confirmed candidates become forbidden combinations of
//! the generator, so later rows avoid them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tessera_ir::types::Combination;

use super::{FaultCharacterization, FaultCharacterizationConfig, TestResults};
use crate::generator::aetg::{AetgSat, AetgSatConfig};
use crate::generator::GenerationError;

/// Tuning for [`Ict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IctConfig {
    /// Dissimilar rows that must all fail before a candidate is accepted.
    pub feedback_checks: usize,
    pub aetg: AetgSatConfig,
}

impl Default for IctConfig {
    fn default() -> Self {
        Self {
            feedback_checks: 5,
            aetg: AetgSatConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IctPhase {
    Generation,
    Characterization,
    FeedbackChecking,
}

pub struct Ict {
    aetg: AetgSat,
    config: IctConfig,
    phase: IctPhase,
    started: bool,
    failure: Option<Combination>,
    candidate: Option<Combination>,
    feedback_round: usize,
    last_feedback: Vec<Combination>,
    last_mutations: Vec<Combination>,
    found: Vec<Combination>,
    generation_error: Option<GenerationError>,
}

impl Ict {
    pub fn new(config: FaultCharacterizationConfig, ict: IctConfig) -> Self {
        Self {
            aetg: AetgSat::new(&config.model, ict.aetg.clone()),
            config: ict,
            phase: IctPhase::Generation,
            started: false,
            failure: None,
            candidate: None,
            feedback_round: 0,
            last_feedback: Vec::new(),
            last_mutations: Vec::new(),
            found: Vec::new(),
            generation_error: None,
        }
    }

    pub fn phase(&self) -> IctPhase {
        self.phase
    }

    /// Candidate under feedback checking, if any.
    pub fn current_candidate(&self) -> Option<&Combination> {
        self.candidate.as_ref()
    }

    /// The error that ended generation early, if any.
    pub fn generation_error(&self) -> Option<&GenerationError> {
        self.generation_error.as_ref()
    }

    fn generate(&mut self) -> Vec<Combination> {
        self.phase = IctPhase::Generation;
        match self.aetg.next_test_case() {
            Ok(Some(row)) => vec![row],
            Ok(None) => {
                info!(found = self.found.len(), "Ict finished: every valid interaction covered");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Ict generation failed; stopping");
                self.generation_error = Some(e);
                Vec::new()
            }
        }
    }

    fn begin_characterization(&mut self, failure: Combination) -> Vec<Combination> {
        debug!(%failure, "characterizing failing row");
        self.failure = Some(failure);
        self.last_mutations.clear();
        self.characterize()
    }

    /// One mutant per parameter of the failing row, avoiding mutants used
    /// before for the same row.
    fn characterize(&mut self) -> Vec<Combination> {
        let Some(failure) = self.failure.clone() else {
            return self.generate();
        };
        let mutations: Vec<Combination> = (0..failure.len())
            .filter_map(|p| self.aetg.get_mutated_test_case(p, &failure, &self.last_mutations))
            .collect();

        if mutations.is_empty() {
            debug!(%failure, "no fresh mutations left; accepting the whole row");
            return self.accept(failure);
        }
        self.last_mutations.extend(mutations.iter().cloned());
        self.phase = IctPhase::Characterization;
        mutations
    }

    /// Parameters of the failing row whose mutation made it pass.
    fn identify(&mut self, failure: &Combination, results: &TestResults) -> Combination {
        let mut candidate = Combination::empty(failure.len());
        for (input, result) in results {
            if result.is_failure() {
                continue;
            }
            self.aetg.update_coverage(input);
            for p in 0..failure.len() {
                if input.value(p) != failure.value(p) {
                    if let Some(v) = failure.value(p) {
                        candidate.set(p, v);
                    }
                }
            }
        }
        if candidate.set_parameter_count() == 0 {
            failure.clone()
        } else {
            candidate
        }
    }

    fn feedback(&mut self) -> Vec<Combination> {
        let (Some(candidate), Some(failure)) = (self.candidate.clone(), self.failure.clone()) else {
            return self.generate();
        };
        if self.feedback_round >= self.config.feedback_checks {
            return self.accept(candidate);
        }
        match self
            .aetg
            .select_dissimilar(&candidate, &failure, &self.last_feedback)
        {
            Some(row) => {
                self.last_feedback.push(row.clone());
                self.phase = IctPhase::FeedbackChecking;
                vec![row]
            }
            None => {
                debug!(%candidate, "no valid dissimilar row; accepting candidate");
                self.accept(candidate)
            }
        }
    }

    /// Records `combination` unless it contains one already confirmed.
    fn accept(&mut self, combination: Combination) -> Vec<Combination> {
        let known = self.found.iter().find(|f| combination.contains(f)).cloned();
        match known {
            Some(known) => {
                debug!(%combination, %known, "already explained by a confirmed combination");
            }
            None => {
                info!(%combination, "failure-inducing combination confirmed");
                self.aetg.add_forbidden_combination(&combination);
                self.found.push(combination);
            }
        }
        self.failure = None;
        self.candidate = None;
        self.last_mutations.clear();
        self.last_feedback.clear();
        self.generate()
    }
}

impl FaultCharacterization for Ict {
    fn compute_next_test_inputs(&mut self, results: &TestResults) -> Vec<Combination> {
        if !self.started {
            self.started = true;
            let mut first_failure = None;
            for (input, result) in results {
                if result.is_successful() {
                    self.aetg.update_coverage(input);
                } else if first_failure.is_none() {
                    first_failure = Some(input.clone());
                }
            }
            return match first_failure {
                Some(failure) => self.begin_characterization(failure),
                None => self.generate(),
            };
        }

        match self.phase {
            IctPhase::Generation => match results.iter().next() {
                Some((input, result)) if result.is_failure() => {
                    self.begin_characterization(input.clone())
                }
                Some((input, _)) => {
                    self.aetg.update_coverage(input);
                    self.generate()
                }
                None => self.generate(),
            },
            IctPhase::Characterization => {
                let Some(failure) = self.failure.clone() else {
                    return self.generate();
                };
                let candidate = self.identify(&failure, results);
                debug!(%candidate, "candidate identified");
                self.candidate = Some(candidate);
                self.feedback_round = 0;
                self.last_feedback.clear();
                self.feedback()
            }
            IctPhase::FeedbackChecking => match results.iter().next() {
                Some((input, result)) if result.is_successful() => {
                    debug!(row = %input, "feedback row passed; candidate rejected");
                    self.aetg.update_coverage(input);
                    self.candidate = None;
                    self.characterize()
                }
                _ => {
                    self.feedback_round += 1;
                    self.feedback()
                }
            },
        }
    }

    fn compute_failure_inducing_combinations(&self) -> Vec<Combination> {
        self.found.clone()
    }

    fn name(&self) -> &str {
        "ict"
    }
}
