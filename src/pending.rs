//! Loading flags and stale-response detection for async operations.
//!
//! Each [`Operation`] kind may have at most one request in flight. Starting a
//! request hands out a [`Ticket`] stamped with the current generation; the
//! generation is bumped whenever the active image changes or the session is
//! reset, which turns every outstanding ticket stale.

use std::collections::HashMap;
use std::fmt;

use crate::error::SessionError;

/// Long-running operations guarded by a loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Segment,
    FetchMask,
    AddContours,
    RemoveContour,
    ClearAll,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Segment => "Segmentation",
            Operation::FetchMask => "Loading the final mask",
            Operation::AddContours => "Adding contours",
            Operation::RemoveContour => "Removing a contour",
            Operation::ClearAll => "Clearing the final mask",
        };
        f.write_str(name)
    }
}

/// Proof that an operation was started, checked again on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a ticket must be passed back to `finish` to clear the loading flag"]
pub struct Ticket {
    pub operation: Operation,
    pub generation: u64,
}

/// Loading flags keyed by operation.
#[derive(Debug, Clone, Default)]
pub struct PendingOps {
    generation: u64,
    in_flight: HashMap<Operation, u64>,
}

impl PendingOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the operation's control should be disabled.
    pub fn is_loading(&self, operation: Operation) -> bool {
        self.in_flight.get(&operation) == Some(&self.generation)
    }

    pub fn any_loading(&self) -> bool {
        self.in_flight.values().any(|g| *g == self.generation)
    }

    /// Set the loading flag, refusing a duplicate submission.
    pub fn begin(&mut self, operation: Operation) -> Result<Ticket, SessionError> {
        if self.is_loading(operation) {
            log::debug!("{} refused: already in progress", operation);
            return Err(SessionError::OperationInProgress(operation));
        }
        self.in_flight.insert(operation, self.generation);
        Ok(Ticket {
            operation,
            generation: self.generation,
        })
    }

    /// Clear the loading flag and report whether the result may be applied.
    ///
    /// The flag is cleared whether or not the ticket is stale, so a failed
    /// or discarded request never leaves a control disabled.
    pub fn finish(&mut self, ticket: Ticket) -> Result<(), SessionError> {
        if self.in_flight.get(&ticket.operation) == Some(&ticket.generation) {
            self.in_flight.remove(&ticket.operation);
        }
        if ticket.generation != self.generation {
            log::debug!(
                "Discarding stale {} response (generation {} != {})",
                ticket.operation,
                ticket.generation,
                self.generation
            );
            return Err(SessionError::StaleResponse(ticket.operation));
        }
        Ok(())
    }

    /// Invalidate every outstanding ticket.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_submission_refused() {
        let mut ops = PendingOps::new();
        let ticket = ops.begin(Operation::Segment).unwrap();
        assert!(ops.is_loading(Operation::Segment));
        assert_eq!(
            ops.begin(Operation::Segment),
            Err(SessionError::OperationInProgress(Operation::Segment))
        );
        // Independent operations are not restricted
        let other = ops.begin(Operation::AddContours).unwrap();

        ops.finish(ticket).unwrap();
        ops.finish(other).unwrap();
        assert!(!ops.any_loading());
    }

    #[test]
    fn test_invalidate_makes_ticket_stale() {
        let mut ops = PendingOps::new();
        let old = ops.begin(Operation::Segment).unwrap();
        ops.invalidate();
        assert!(!ops.is_loading(Operation::Segment));

        let fresh = ops.begin(Operation::Segment).unwrap();
        assert_eq!(
            ops.finish(old),
            Err(SessionError::StaleResponse(Operation::Segment))
        );
        // The stale finish must not clear the fresh request's flag
        assert!(ops.is_loading(Operation::Segment));
        ops.finish(fresh).unwrap();
        assert!(!ops.is_loading(Operation::Segment));
    }
}
