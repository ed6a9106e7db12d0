mod controller;
mod history;
mod matcher;
mod table;

#[cfg(test)]
mod tests;

pub use controller::{
    FinishAction, Lifecycle, LoadingIndicator, PageFactory, ROOT_PATH, RouteController,
    default_protected_prefixes,
};
pub(crate) use controller::NavOutcome;
pub use history::HistoryState;
pub use matcher::RouteMatch;
pub use table::{RouteTable, default_route_table};
