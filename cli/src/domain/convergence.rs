//! Convergence conditions over a collection of reported states.
//!
//! Pure functions only. A condition holds when the observed collection has
//! exactly the expected number of members and every member is in one of the
//! accepted states. A short collection is a partial result, never a failure.

use std::fmt;

use crate::domain::instance::InstanceState;

/// Predicate over per-member states plus a target cardinality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceCondition {
    expected: usize,
    accepted: Vec<InstanceState>,
}

impl ConvergenceCondition {
    #[must_use]
    pub fn new(expected: usize, accepted: Vec<InstanceState>) -> Self {
        Self { expected, accepted }
    }

    /// Every member `operational`: safe to stop.
    #[must_use]
    pub fn ready(expected: usize) -> Self {
        Self::new(expected, vec![InstanceState::Operational])
    }

    /// Every member in a recognised terminal state after boot, success or not.
    #[must_use]
    pub fn terminal(expected: usize) -> Self {
        Self::new(
            expected,
            vec![
                InstanceState::Operational,
                InstanceState::Stranded,
                InstanceState::StrandedInBooting,
            ],
        )
    }

    #[must_use]
    pub fn accepts(&self, state: &InstanceState) -> bool {
        self.accepted.contains(state)
    }

    /// Tally the observed states against this condition.
    pub fn evaluate<'a>(&self, states: impl IntoIterator<Item = &'a InstanceState>) -> Tally {
        let mut tally = Tally {
            expected: self.expected,
            observed: 0,
            matched: 0,
        };
        for state in states {
            tally.observed += 1;
            if self.accepts(state) {
                tally.matched += 1;
            }
        }
        tally
    }
}

/// Result of evaluating a [`ConvergenceCondition`] against one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub expected: usize,
    pub observed: usize,
    pub matched: usize,
}

impl Tally {
    #[must_use]
    pub fn is_met(&self) -> bool {
        self.observed == self.expected && self.matched == self.expected
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} matched, {} observed",
            self.matched, self.expected, self.observed
        )
    }
}
