mod realtime;
mod rest;

pub use realtime::Subscription;
pub(crate) use realtime::spawn_poller;
pub use rest::{RestClient, TableQuery};
