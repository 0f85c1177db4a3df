//! services/client/src/stores/records.rs
//!
//! The record store: an in-memory mirror of the signed-in user's individuals, kept in
//! step with the remote API. The list only ever changes after the server has confirmed
//! a read or a mutation.
//!
//! Overlapping calls are ordered with tickets. Every networked operation takes a ticket
//! scoped to what it touches (the whole collection for a fetch, one record id for an
//! update or delete). A newer ticket on the same scope cancels the older request, and
//! a response is applied only while its ticket is still the latest for its scope. Once
//! a mutation is applied, any fetch issued before it is retired as well, so an older
//! snapshot of the collection can never undo a confirmed change.

use family_tree_core::domain::{Individual, IndividualId, IndividualPatch};
use family_tree_core::ports::{IndividualsApi, PortError, PortResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const UNKNOWN_ERROR: &str = "Unknown error";

//=========================================================================================
// Public State
//=========================================================================================

/// How a store operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome<T> {
    /// The server confirmed the operation and the store state reflects it.
    Applied(T),
    /// The request failed; the message is in the error slot and the list is unchanged.
    Failed,
    /// A newer operation on the same target was issued; this response was discarded.
    Superseded,
    /// The store was shut down before the response arrived.
    Cancelled,
}

impl<T> SyncOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, SyncOutcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            SyncOutcome::Applied(value) => Some(value),
            _ => None,
        }
    }
}

/// A snapshot of the record store, as a view renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordState {
    individuals: Vec<Individual>,
    selected: Option<Individual>,
    error: Option<String>,
    in_flight: usize,
}

impl RecordState {
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn selected(&self) -> Option<&Individual> {
        self.selected.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while at least one operation is waiting on the server.
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn find(&self, id: &IndividualId) -> Option<&Individual> {
        self.individuals.iter().find(|individual| &individual.id == id)
    }
}

//=========================================================================================
// Tickets
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Scope {
    Collection,
    Record(IndividualId),
}

struct Ticket {
    number: u64,
    scope: Option<Scope>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct TicketBook {
    issued: u64,
    latest: HashMap<Scope, (u64, CancellationToken)>,
}

impl TicketBook {
    fn issue(&mut self, scope: Option<Scope>, parent: &CancellationToken) -> Ticket {
        self.issued += 1;
        let number = self.issued;
        let cancel = parent.child_token();
        if let Some(scope) = &scope {
            if let Some((previous, token)) =
                self.latest.insert(scope.clone(), (number, cancel.clone()))
            {
                debug!("Request {} supersedes request {} on {:?}", number, previous, scope);
                token.cancel();
            }
        }
        Ticket {
            number,
            scope,
            cancel,
        }
    }

    /// Reports whether the ticket is still the newest for its scope, and forgets it.
    fn retire(&mut self, ticket: &Ticket) -> bool {
        let Some(scope) = &ticket.scope else {
            return true;
        };
        match self.latest.get(scope) {
            Some((number, _)) if *number == ticket.number => {
                self.latest.remove(scope);
                true
            }
            _ => false,
        }
    }

    /// Retires a collection read issued before ticket `number`. Its answer predates a
    /// mutation the server has since confirmed.
    fn supersede_reads_before(&mut self, number: u64) {
        let stale = matches!(
            self.latest.get(&Scope::Collection),
            Some((read, _)) if *read < number
        );
        if !stale {
            return;
        }
        if let Some((read, token)) = self.latest.remove(&Scope::Collection) {
            debug!("Request {} supersedes read {}", number, read);
            token.cancel();
        }
    }
}

//=========================================================================================
// The Store
//=========================================================================================

pub struct RecordStore {
    api: Arc<dyn IndividualsApi>,
    state: watch::Sender<RecordState>,
    tickets: Mutex<TicketBook>,
    shutdown: CancellationToken,
}

impl RecordStore {
    pub fn new(api: Arc<dyn IndividualsApi>) -> Self {
        Self {
            api,
            state: watch::Sender::new(RecordState::default()),
            tickets: Mutex::new(TicketBook::default()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn snapshot(&self) -> RecordState {
        self.state.borrow().clone()
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<RecordState> {
        self.state.subscribe()
    }

    /// Replaces the whole list with the server's collection.
    ///
    /// On failure the previous list is kept.
    pub async fn fetch_individuals(&self, token: &str) -> SyncOutcome<usize> {
        let Some(ticket) = self.begin(Some(Scope::Collection)) else {
            return SyncOutcome::Cancelled;
        };
        let response = watch_for_cancel(&ticket, self.api.list_individuals(token)).await;
        self.settle(
            ticket,
            response,
            "Failed to fetch individuals",
            |state, individuals| {
                info!("Fetched {} individuals", individuals.len());
                state.individuals = individuals;
                state.individuals.len()
            },
        )
    }

    /// Creates a record and appends the server's version of it to the list.
    pub async fn create_individual(
        &self,
        token: &str,
        patch: &IndividualPatch,
    ) -> SyncOutcome<Individual> {
        let Some(ticket) = self.begin(None) else {
            return SyncOutcome::Cancelled;
        };
        let response = watch_for_cancel(&ticket, self.api.create_individual(token, patch)).await;
        self.settle(
            ticket,
            response,
            "Failed to create individual",
            |state, created| {
                info!("Created individual {}", created.id);
                // A fetch that landed first may already hold the record.
                match state
                    .individuals
                    .iter_mut()
                    .find(|individual| individual.id == created.id)
                {
                    Some(existing) => *existing = created.clone(),
                    None => state.individuals.push(created.clone()),
                }
                created
            },
        )
    }

    /// Updates a record and replaces it in place, keeping the list order.
    pub async fn update_individual(
        &self,
        token: &str,
        id: &IndividualId,
        patch: &IndividualPatch,
    ) -> SyncOutcome<Individual> {
        let Some(ticket) = self.begin(Some(Scope::Record(id.clone()))) else {
            return SyncOutcome::Cancelled;
        };
        let response =
            watch_for_cancel(&ticket, self.api.update_individual(token, id, patch)).await;
        self.settle(
            ticket,
            response,
            "Failed to update individual",
            |state, updated| {
                info!("Updated individual {}", id);
                for individual in state.individuals.iter_mut().filter(|i| &i.id == id) {
                    *individual = updated.clone();
                }
                if state.selected.as_ref().is_some_and(|s| &s.id == id) {
                    state.selected = Some(updated.clone());
                }
                updated
            },
        )
    }

    /// Deletes a record and drops it from the list and from the selection.
    pub async fn delete_individual(&self, token: &str, id: &IndividualId) -> SyncOutcome<()> {
        let Some(ticket) = self.begin(Some(Scope::Record(id.clone()))) else {
            return SyncOutcome::Cancelled;
        };
        let response = watch_for_cancel(&ticket, self.api.delete_individual(token, id)).await;
        self.settle(ticket, response, "Failed to delete individual", |state, ()| {
            info!("Deleted individual {}", id);
            state.individuals.retain(|individual| &individual.id != id);
            if state.selected.as_ref().is_some_and(|s| &s.id == id) {
                state.selected = None;
            }
        })
    }

    pub fn select_individual(&self, individual: Option<Individual>) {
        self.state.send_modify(|state| state.selected = individual);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|state| state.error = error);
    }

    /// Cancels every request in flight. Later operations return `Cancelled` at once.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Record store shutting down");
            self.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    //-------------------------------------------------------------------------------------
    // Internals
    //-------------------------------------------------------------------------------------

    fn book(&self) -> MutexGuard<'_, TicketBook> {
        self.tickets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, scope: Option<Scope>) -> Option<Ticket> {
        if self.shutdown.is_cancelled() {
            return None;
        }
        let ticket = self.book().issue(scope, &self.shutdown);
        self.state.send_modify(|state| {
            state.in_flight += 1;
            state.error = None;
        });
        Some(ticket)
    }

    /// Ends an operation: applies the response if it is still current, records a
    /// failure in the error slot, or drops it.
    fn settle<T, R>(
        &self,
        ticket: Ticket,
        response: Option<PortResult<T>>,
        failure: &str,
        apply: impl FnOnce(&mut RecordState, T) -> R,
    ) -> SyncOutcome<R> {
        // Held while the state is written so no newer ticket can slip in between.
        let mut book = self.book();
        let current = book.retire(&ticket);
        let shut_down = self.shutdown.is_cancelled();

        let mut outcome = SyncOutcome::Cancelled;
        self.state.send_modify(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            outcome = match response {
                None if shut_down => SyncOutcome::Cancelled,
                None => SyncOutcome::Superseded,
                Some(_) if !current => {
                    debug!("Discarding stale response for request {}", ticket.number);
                    SyncOutcome::Superseded
                }
                Some(Ok(value)) => SyncOutcome::Applied(apply(state, value)),
                Some(Err(e)) => {
                    warn!("{}: {}", failure, e);
                    state.error = Some(error_message(failure, &e));
                    SyncOutcome::Failed
                }
            };
        });
        if outcome.is_applied() && ticket.scope != Some(Scope::Collection) {
            book.supersede_reads_before(ticket.number);
        }
        drop(book);
        outcome
    }
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Resolves to `None` if the ticket is cancelled before the request completes.
async fn watch_for_cancel<T>(
    ticket: &Ticket,
    request: impl Future<Output = PortResult<T>>,
) -> Option<PortResult<T>> {
    tokio::select! {
        biased;
        _ = ticket.cancel.cancelled() => None,
        response = request => Some(response),
    }
}

/// Non-success statuses collapse into the operation's fixed message; anything else
/// carries the error's own text, or "Unknown error" when it has none.
fn error_message(failure: &str, error: &PortError) -> String {
    if error.is_rejection() {
        return failure.to_string();
    }
    match error {
        PortError::Transport(detail)
        | PortError::Decode(detail)
        | PortError::Storage(detail)
        | PortError::Unexpected(detail)
            if detail.trim().is_empty() =>
        {
            UNKNOWN_ERROR.to_string()
        }
        other => other.to_string(),
    }
}
