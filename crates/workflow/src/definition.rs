//! Declarative booking workflow definition.
//!
//! The graph is a table mapping each step to its success target, its
//! compensation entry point, and its retry policy. Building it as data (and
//! not as imperative next/catch wiring) lets the constructor statically
//! validate that every step is reachable and that every compensation chain
//! terminates.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorClass;
use crate::retry::RetryPolicy;
use crate::step::BookingStep;

/// Where execution goes after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Continue with another step.
    Step(BookingStep),
    /// Terminal success.
    Confirmed,
    /// Terminal failure.
    Failed,
}

/// One row of the workflow table.
#[derive(Debug, Clone, Copy)]
pub struct StepEntry {
    /// Followed when the step succeeds (and, on the compensation chain,
    /// also after a best-effort compensation failure).
    pub on_success: Transition,
    /// The compensation entry point followed when the step fails terminally
    /// in the forward phase.
    pub on_failure: Transition,
    /// Retry policy for the step's failures.
    pub retry: RetryPolicy,
    /// Attempt timeout; `None` uses the engine's configured remote timeout.
    pub timeout: Option<Duration>,
}

/// Problems detected while validating a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A transition names a step with no table entry.
    #[error("Step {0} has no definition entry")]
    MissingStep(BookingStep),

    /// A success chain revisits a step.
    #[error("Cycle detected in the chain starting at {0}")]
    Cycle(BookingStep),

    /// A compensation chain ends at Confirmed instead of Failed.
    #[error("Compensation chain from {0} does not terminate at the failed state")]
    CompensationNotTerminating(BookingStep),

    /// A defined step is not reachable from the initial step.
    #[error("Step {0} is unreachable from the initial step")]
    Unreachable(BookingStep),
}

/// The workflow graph: a table of steps with validated wiring.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    entries: HashMap<BookingStep, StepEntry>,
}

impl WorkflowDefinition {
    /// Seat tasks carry a tight attempt timeout; they are single-row
    /// conditional writes.
    const SEAT_TASK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Builds the fixed booking workflow graph.
    ///
    /// Forward chain: ReserveFlightSeat → ReserveBooking → CollectPayment →
    /// ConfirmBooking → NotifyBookingSucceeded → Confirmed. Each forward
    /// step's catch routes into the unwind chain at the point matching the
    /// effects already committed; the unwind chain is RefundPayment →
    /// CancelBooking → ReleaseFlightSeat → NotifyBookingFailed → Failed.
    pub fn booking() -> Self {
        use BookingStep::*;
        use Transition::{Confirmed, Failed, Step};

        let mut entries = HashMap::new();

        entries.insert(
            ReserveFlightSeat,
            StepEntry {
                on_success: Step(ReserveBooking),
                on_failure: Step(NotifyBookingFailed),
                retry: RetryPolicy::transient(),
                timeout: Some(Self::SEAT_TASK_TIMEOUT),
            },
        );
        entries.insert(
            ReserveBooking,
            StepEntry {
                on_success: Step(CollectPayment),
                on_failure: Step(CancelBooking),
                retry: RetryPolicy::on_class(ErrorClass::BookingReservation),
                timeout: None,
            },
        );
        // CollectPayment retries every failure class, card declines
        // included, unlike the other remote tasks.
        entries.insert(
            CollectPayment,
            StepEntry {
                on_success: Step(ConfirmBooking),
                on_failure: Step(CancelBooking),
                retry: RetryPolicy::generic(),
                timeout: None,
            },
        );
        entries.insert(
            ConfirmBooking,
            StepEntry {
                on_success: Step(NotifyBookingSucceeded),
                on_failure: Step(RefundPayment),
                retry: RetryPolicy::on_class(ErrorClass::BookingConfirmation),
                timeout: None,
            },
        );
        // By the time the success notification runs every effect is
        // committed; there is no forward work left to unwind, so its
        // terminal failure goes straight to the failed state.
        entries.insert(
            NotifyBookingSucceeded,
            StepEntry {
                on_success: Confirmed,
                on_failure: Failed,
                retry: RetryPolicy::on_class(ErrorClass::BookingNotification),
                timeout: None,
            },
        );
        entries.insert(
            RefundPayment,
            StepEntry {
                on_success: Step(CancelBooking),
                on_failure: Step(CancelBooking),
                retry: RetryPolicy::generic(),
                timeout: None,
            },
        );
        entries.insert(
            CancelBooking,
            StepEntry {
                on_success: Step(ReleaseFlightSeat),
                on_failure: Step(ReleaseFlightSeat),
                retry: RetryPolicy::on_class(ErrorClass::BookingCancellation),
                timeout: None,
            },
        );
        entries.insert(
            ReleaseFlightSeat,
            StepEntry {
                on_success: Step(NotifyBookingFailed),
                on_failure: Step(NotifyBookingFailed),
                retry: RetryPolicy::transient(),
                timeout: Some(Self::SEAT_TASK_TIMEOUT),
            },
        );
        entries.insert(
            NotifyBookingFailed,
            StepEntry {
                on_success: Failed,
                on_failure: Failed,
                retry: RetryPolicy::on_class(ErrorClass::BookingNotification),
                timeout: None,
            },
        );

        let definition = Self { entries };
        // The fixed graph is validated by construction; the tests below keep
        // it that way.
        debug_assert!(definition.validate().is_ok());
        definition
    }

    /// Returns the table entry for a step.
    pub fn entry(&self, step: BookingStep) -> Result<&StepEntry, DefinitionError> {
        self.entries
            .get(&step)
            .ok_or(DefinitionError::MissingStep(step))
    }

    /// Replaces one entry; used by tests to build malformed graphs.
    pub fn with_entry(mut self, step: BookingStep, entry: StepEntry) -> Self {
        self.entries.insert(step, entry);
        self
    }

    /// Statically validates the graph:
    ///
    /// - every transition target has a table entry,
    /// - every success chain reaches a terminal state without revisiting a
    ///   step,
    /// - every compensation entry's chain terminates at `Failed`,
    /// - every defined step is reachable from the initial step.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for (&step, entry) in &self.entries {
            self.walk_success_chain(step)?;
            if let Transition::Step(comp) = entry.on_failure {
                match self.walk_success_chain(comp)? {
                    Transition::Failed => {}
                    _ => return Err(DefinitionError::CompensationNotTerminating(step)),
                }
            }
        }

        let mut reachable = HashSet::new();
        self.mark_reachable(Transition::Step(BookingStep::INITIAL), &mut reachable)?;
        for &step in self.entries.keys() {
            if !reachable.contains(&step) {
                return Err(DefinitionError::Unreachable(step));
            }
        }

        Ok(())
    }

    /// Follows `on_success` edges from a step until a terminal transition,
    /// failing on cycles or dangling targets.
    fn walk_success_chain(&self, from: BookingStep) -> Result<Transition, DefinitionError> {
        let mut visited = HashSet::new();
        let mut current = from;
        loop {
            if !visited.insert(current) {
                return Err(DefinitionError::Cycle(from));
            }
            match self.entry(current)?.on_success {
                Transition::Step(next) => current = next,
                terminal => return Ok(terminal),
            }
        }
    }

    fn mark_reachable(
        &self,
        from: Transition,
        reachable: &mut HashSet<BookingStep>,
    ) -> Result<(), DefinitionError> {
        let Transition::Step(step) = from else {
            return Ok(());
        };
        if !reachable.insert(step) {
            return Ok(());
        }
        let entry = self.entry(step)?;
        self.mark_reachable(entry.on_success, reachable)?;
        self.mark_reachable(entry.on_failure, reachable)
    }
}

impl Default for WorkflowDefinition {
    fn default() -> Self {
        Self::booking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStep::*;

    #[test]
    fn booking_definition_is_valid() {
        let definition = WorkflowDefinition::booking();
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn forward_chain_order() {
        let definition = WorkflowDefinition::booking();
        let mut chain = vec![BookingStep::INITIAL];
        let mut current = BookingStep::INITIAL;
        while let Transition::Step(next) = definition.entry(current).unwrap().on_success {
            chain.push(next);
            current = next;
        }
        assert_eq!(
            chain,
            vec![
                ReserveFlightSeat,
                ReserveBooking,
                CollectPayment,
                ConfirmBooking,
                NotifyBookingSucceeded,
            ]
        );
        assert_eq!(
            definition.entry(NotifyBookingSucceeded).unwrap().on_success,
            Transition::Confirmed
        );
    }

    #[test]
    fn compensation_entry_points_match_committed_effects() {
        let definition = WorkflowDefinition::booking();
        let catch = |step| definition.entry(step).unwrap().on_failure;

        assert_eq!(catch(ReserveFlightSeat), Transition::Step(NotifyBookingFailed));
        assert_eq!(catch(ReserveBooking), Transition::Step(CancelBooking));
        assert_eq!(catch(CollectPayment), Transition::Step(CancelBooking));
        assert_eq!(catch(ConfirmBooking), Transition::Step(RefundPayment));
        assert_eq!(catch(ReleaseFlightSeat), Transition::Step(NotifyBookingFailed));
    }

    #[test]
    fn unwind_chain_terminates_at_failed() {
        let definition = WorkflowDefinition::booking();
        let mut chain = Vec::new();
        let mut current = RefundPayment;
        loop {
            chain.push(current);
            match definition.entry(current).unwrap().on_success {
                Transition::Step(next) => current = next,
                terminal => {
                    assert_eq!(terminal, Transition::Failed);
                    break;
                }
            }
        }
        assert_eq!(
            chain,
            vec![
                RefundPayment,
                CancelBooking,
                ReleaseFlightSeat,
                NotifyBookingFailed,
            ]
        );
    }

    #[test]
    fn seat_tasks_carry_the_tight_timeout() {
        let definition = WorkflowDefinition::booking();
        assert_eq!(
            definition.entry(ReserveFlightSeat).unwrap().timeout,
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            definition.entry(ReleaseFlightSeat).unwrap().timeout,
            Some(Duration::from_secs(5))
        );
        assert_eq!(definition.entry(CollectPayment).unwrap().timeout, None);
    }

    #[test]
    fn validation_rejects_compensation_cycle() {
        // Wire CancelBooking's unwind back to RefundPayment.
        let definition = WorkflowDefinition::booking().with_entry(
            CancelBooking,
            StepEntry {
                on_success: Transition::Step(RefundPayment),
                on_failure: Transition::Step(RefundPayment),
                retry: RetryPolicy::none(),
                timeout: None,
            },
        );
        assert!(matches!(
            definition.validate(),
            Err(DefinitionError::Cycle(_))
        ));
    }

    #[test]
    fn validation_rejects_compensation_ending_in_confirmed() {
        let definition = WorkflowDefinition::booking().with_entry(
            NotifyBookingFailed,
            StepEntry {
                on_success: Transition::Confirmed,
                on_failure: Transition::Failed,
                retry: RetryPolicy::none(),
                timeout: None,
            },
        );
        assert!(matches!(
            definition.validate(),
            Err(DefinitionError::CompensationNotTerminating(_))
        ));
    }

    #[test]
    fn validation_rejects_unreachable_step() {
        // Skip ReserveBooking in the forward chain; nothing else reaches it.
        let definition = WorkflowDefinition::booking().with_entry(
            ReserveFlightSeat,
            StepEntry {
                on_success: Transition::Step(CollectPayment),
                on_failure: Transition::Step(NotifyBookingFailed),
                retry: RetryPolicy::transient(),
                timeout: None,
            },
        );
        assert!(matches!(
            definition.validate(),
            Err(DefinitionError::Unreachable(ReserveBooking))
        ));
    }
}
