//! Assumption notices raised by characterization strategies.
//!
//! Strategies that rely on assumptions about the fault structure (strength,
//! constraint-free models, splittable classes) announce whether they hold.
//! Notices never change control flow.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

/// Receives assumption notices. Both methods default to no-ops.
pub trait Reporter {
    fn report_assumption_satisfied(&self, _assumption: &str) {}

    fn report_assumption_violation(&self, _assumption: &str) {}
}

/// Discards every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Forwards notices to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report_assumption_satisfied(&self, assumption: &str) {
        debug!(assumption, "assumption satisfied");
    }

    fn report_assumption_violation(&self, assumption: &str) {
        warn!(assumption, "assumption violated; results may be incomplete");
    }
}

/// One recorded notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumptionNotice {
    pub assumption: String,
    pub satisfied: bool,
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    notices: RefCell<Vec<AssumptionNotice>>,
}

impl CollectingReporter {
    pub fn notices(&self) -> Vec<AssumptionNotice> {
        self.notices.borrow().clone()
    }

    pub fn violations(&self) -> Vec<String> {
        self.notices
            .borrow()
            .iter()
            .filter(|n| !n.satisfied)
            .map(|n| n.assumption.clone())
            .collect()
    }

    fn record(&self, assumption: &str, satisfied: bool) {
        self.notices.borrow_mut().push(AssumptionNotice {
            assumption: assumption.to_string(),
            satisfied,
        });
    }
}

impl Reporter for CollectingReporter {
    fn report_assumption_satisfied(&self, assumption: &str) {
        self.record(assumption, true);
    }

    fn report_assumption_violation(&self, assumption: &str) {
        self.record(assumption, false);
    }
}

impl<R: Reporter + ?Sized> Reporter for Rc<R> {
    fn report_assumption_satisfied(&self, assumption: &str) {
        (**self).report_assumption_satisfied(assumption);
    }

    fn report_assumption_violation(&self, assumption: &str) {
        (**self).report_assumption_violation(assumption);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_through_shared_handle() {
        let reporter = Rc::new(CollectingReporter::default());
        let boxed: Box<dyn Reporter> = Box::new(Rc::clone(&reporter));
        boxed.report_assumption_satisfied("strength");
        boxed.report_assumption_violation("constraints");

        assert_eq!(reporter.notices().len(), 2);
        assert_eq!(reporter.violations(), vec!["constraints".to_string()]);
    }

    #[test]
    fn test_noop_reporter_accepts_notices() {
        NoopReporter.report_assumption_violation("anything");
    }
}
