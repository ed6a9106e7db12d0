use crossterm::event::Event;

use crate::router::NavOutcome;
use crate::services::auth::Principal;
use crate::services::trip::Trip;

/// Describes *why* a navigation occurred.
///
/// Programmatic navigations push onto the history stack; traversal replays
/// recorded paths without pushing; corrective navigations are the fail-safe
/// redirect after a failed transition and never chain into another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSource {
    /// Direct call (key binding, page action, startup routing).
    Programmatic,
    /// Back/forward traversal over recorded paths.
    History,
    /// Fail-safe redirect issued after a failed transition.
    Corrective,
}

/// Change-feed deliveries from the backend, routed to the mounted page.
#[derive(Debug, Clone, PartialEq)]
pub enum TripEvent {
    /// A watched trip row changed.
    Updated(Trip),
    /// The set of open trip requests changed.
    Available(Vec<Trip>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn { principal: Principal },
    SignedOut,
}

#[derive(Debug)]
pub(crate) enum DomainEvent {
    Input(Event),
    InputError(String),
    NavigationDone { generation: u64, outcome: NavOutcome },
    Session(SessionEvent),
}
