//! Hand-rolled service fakes shared by the async test suites.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::backend::Subscription;
use crate::error::{AppError, AppResult};
use crate::event::TripEvent;
use crate::services::Services;
use crate::services::auth::{AuthService, NewUserProfile, Principal, Role, UserProfile};
use crate::services::trip::{NewTrip, Trip, TripService, TripStats, TripStatus};
use crate::services::vehicle::{NewVehicle, Vehicle, VehicleService};

pub(crate) fn principal(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        phone: Some("+15550100".to_string()),
        email: None,
    }
}

pub(crate) fn profile(id: &str, role: Role) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        phone: Some("+15550100".to_string()),
        role,
        full_name: String::new(),
        status: "active".to_string(),
        is_online: false,
        last_seen: None,
        rating: None,
    }
}

/// Configurable auth fake; counts principal lookups so tests can assert the
/// gate actually consulted it.
pub(crate) struct FakeAuthService {
    pub(crate) principal: Option<Principal>,
    pub(crate) profile: Option<UserProfile>,
    pub(crate) lookups: AtomicUsize,
}

impl FakeAuthService {
    pub(crate) fn signed_out() -> Self {
        Self {
            principal: None,
            profile: None,
            lookups: AtomicUsize::new(0),
        }
    }

    pub(crate) fn signed_in(id: &str, role: Role) -> Self {
        Self {
            principal: Some(principal(id)),
            profile: Some(profile(id, role)),
            lookups: AtomicUsize::new(0),
        }
    }

    pub(crate) fn without_profile(id: &str) -> Self {
        Self {
            principal: Some(principal(id)),
            profile: None,
            lookups: AtomicUsize::new(0),
        }
    }

    pub(crate) fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthService for FakeAuthService {
    async fn sign_in_with_phone(&self, _phone: &str) -> AppResult<()> {
        Ok(())
    }

    async fn verify_otp(&self, _phone: &str, _code: &str) -> AppResult<Principal> {
        self.principal.clone().ok_or(AppError::NotAuthenticated)
    }

    async fn current_principal(&self) -> AppResult<Option<Principal>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.principal.clone())
    }

    async fn sign_out(&self) -> AppResult<()> {
        Ok(())
    }

    async fn profile(&self, _user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.profile.clone())
    }

    async fn create_profile(&self, new_profile: &NewUserProfile) -> AppResult<UserProfile> {
        Ok(UserProfile {
            id: new_profile.id.clone(),
            phone: Some(new_profile.phone.clone()),
            role: new_profile.role,
            full_name: new_profile.full_name.clone(),
            status: new_profile.status.clone(),
            is_online: false,
            last_seen: None,
            rating: None,
        })
    }

    async fn set_online(&self, user_id: &str, online: bool) -> AppResult<UserProfile> {
        let mut updated = self
            .profile
            .clone()
            .unwrap_or_else(|| profile(user_id, Role::Driver));
        updated.is_online = online;
        Ok(updated)
    }
}

/// Trip service that no test path is supposed to reach.
pub(crate) struct StubTripService;

#[async_trait]
impl TripService for StubTripService {
    async fn create(&self, _trip: &NewTrip) -> AppResult<Trip> {
        Err(AppError::invalid_argument("trip service not wired"))
    }

    async fn trip_by_id(&self, _trip_id: &str) -> AppResult<Trip> {
        Err(AppError::invalid_argument("trip service not wired"))
    }

    async fn update_status(&self, _trip_id: &str, _status: TripStatus) -> AppResult<Trip> {
        Err(AppError::invalid_argument("trip service not wired"))
    }

    async fn accept(&self, _trip_id: &str, _driver_id: &str) -> AppResult<Trip> {
        Err(AppError::invalid_argument("trip service not wired"))
    }

    async fn cancel(&self, _trip_id: &str, _reason: &str) -> AppResult<Trip> {
        Err(AppError::invalid_argument("trip service not wired"))
    }

    async fn trips_for_customer(&self, _customer_id: &str) -> AppResult<Vec<Trip>> {
        Ok(Vec::new())
    }

    async fn trips_for_driver(&self, _driver_id: &str) -> AppResult<Vec<Trip>> {
        Ok(Vec::new())
    }

    async fn available(&self) -> AppResult<Vec<Trip>> {
        Ok(Vec::new())
    }

    async fn statistics(&self, _user_id: &str, _role: Role) -> AppResult<TripStats> {
        Ok(TripStats::default())
    }

    fn subscribe_trip(
        &self,
        trip_id: &str,
        _events: UnboundedSender<TripEvent>,
    ) -> Subscription {
        Subscription::new(format!("trip:{trip_id}"), tokio::spawn(async {}))
    }

    fn subscribe_available(&self, _events: UnboundedSender<TripEvent>) -> Subscription {
        Subscription::new("available-trips".to_string(), tokio::spawn(async {}))
    }
}

pub(crate) struct StubVehicleService;

#[async_trait]
impl VehicleService for StubVehicleService {
    async fn register(&self, _vehicle: &NewVehicle) -> AppResult<Vehicle> {
        Err(AppError::invalid_argument("vehicle service not wired"))
    }

    async fn vehicle_by_id(&self, _vehicle_id: &str) -> AppResult<Option<Vehicle>> {
        Ok(None)
    }

    async fn vehicles_for_driver(&self, _driver_id: &str) -> AppResult<Vec<Vehicle>> {
        Ok(Vec::new())
    }
}

pub(crate) fn services_with_auth(auth: Arc<dyn AuthService>) -> Services {
    Services {
        auth,
        trips: Arc::new(StubTripService),
        vehicles: Arc::new(StubVehicleService),
    }
}
