pub mod auth;
pub mod trip;
pub mod vehicle;

use std::sync::Arc;
use std::time::Duration;

use crate::backend::RestClient;
use crate::config::BackendConfig;

pub use auth::AuthService;
pub use trip::TripService;
pub use vehicle::VehicleService;

/// The service collaborators handed to pages and the route controller.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub trips: Arc<dyn TripService>,
    pub vehicles: Arc<dyn VehicleService>,
}

impl Services {
    /// Wires all services to the shared REST client.
    pub fn backed_by(rest: Arc<RestClient>, config: &BackendConfig) -> Self {
        let poll_interval = Duration::from_millis(config.realtime_poll_ms);
        Self {
            auth: Arc::new(auth::BackendAuthService::new(Arc::clone(&rest))),
            trips: Arc::new(trip::BackendTripService::new(
                Arc::clone(&rest),
                poll_interval,
            )),
            vehicles: Arc::new(vehicle::BackendVehicleService::new(rest)),
        }
    }
}

/// RFC 3339 stamp for outgoing writes; stored timestamps round-trip as text.
pub(crate) fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}
