use std::fmt::Display;

use tracing::*;

/// Identifies one outstanding request of a [`RequestSlot`].
///
/// Only the ticket handed out by the most recent [`RequestSlot::begin`] can
/// complete the slot; older tickets have been superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    Pending,
    Ready(T),
    Failed(String),
}

/// The displayed outcome of a remote call.
///
/// Calls may take arbitrarily long and may overlap; the slot only ever shows
/// the outcome of the latest one.
#[derive(Debug, Clone)]
pub struct RequestSlot<T> {
    generation: u64,
    state: RequestState<T>,
}

impl<T> Default for RequestSlot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            state: RequestState::Idle,
        }
    }
}

impl<T> RequestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding any outstanding one.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.state = RequestState::Pending;
        Ticket(self.generation)
    }

    /// Record the outcome of the request identified by `ticket`.
    ///
    /// Returns `false` (and changes nothing) if the ticket was superseded.
    pub fn complete<E: Display>(&mut self, ticket: Ticket, result: Result<T, E>) -> bool {
        if ticket.0 != self.generation || !self.is_pending() {
            debug!(
                "Dropping response for superseded request {} (current is {})",
                ticket.0, self.generation
            );
            return false;
        }
        self.state = match result {
            Ok(value) => RequestState::Ready(value),
            Err(e) => RequestState::Failed(e.to_string()),
        };
        true
    }

    /// Forget any result and invalidate outstanding tickets.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = RequestState::Idle;
    }

    pub fn state(&self) -> &RequestState<T> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RequestState::Pending)
    }

    pub fn result(&self) -> Option<&T> {
        match &self.state {
            RequestState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }
}
