use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::backend::{RestClient, Subscription, TableQuery, spawn_poller};
use crate::error::{AppError, AppResult};
use crate::event::TripEvent;

use super::auth::Role;
use super::now_iso;

pub const AVAILABLE_TRIPS_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripStatus {
    Requested,
    Accepted,
    EnRoute,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Accepted => "accepted",
            Self::EnRoute => "enRoute",
            Self::Arrived => "arrived",
            Self::InProgress => "inProgress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Column stamped alongside a transition into this status.
    pub(crate) fn timestamp_column(self) -> Option<&'static str> {
        match self {
            Self::Accepted => Some("accepted_at"),
            Self::EnRoute => Some("en_route_at"),
            Self::Arrived => Some("arrived_at"),
            Self::InProgress => Some("started_at"),
            Self::Completed => Some("completed_at"),
            Self::Requested | Self::Cancelled => None,
        }
    }

    /// The next step a driver advances an active trip to, if any.
    pub fn next_for_driver(self) -> Option<Self> {
        match self {
            Self::Accepted => Some(Self::EnRoute),
            Self::EnRoute => Some(Self::Arrived),
            Self::Arrived => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Requested | Self::Completed | Self::Cancelled => None,
        }
    }

    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            Self::Requested | Self::Accepted | Self::EnRoute | Self::Arrived
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideType {
    Economy,
    Comfort,
    Premium,
}

impl RideType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Economy => "economy",
            Self::Comfort => "comfort",
            Self::Premium => "premium",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            Self::Economy => Self::Comfort,
            Self::Comfort => Self::Premium,
            Self::Premium => Self::Economy,
        }
    }

    fn multiplier(self) -> f64 {
        match self {
            Self::Economy => 1.0,
            Self::Comfort => 1.5,
            Self::Premium => 2.0,
        }
    }
}

const BASE_FARE: f64 = 2.50;
const PER_KM_RATE: f64 = 1.20;
const AVERAGE_SPEED_KMH: f64 = 40.0;

/// Fare quote shown before booking; the backend records the actual cost.
pub fn estimate_fare(ride_type: RideType, distance_km: f64) -> f64 {
    let raw = (BASE_FARE + PER_KM_RATE * distance_km) * ride_type.multiplier();
    (raw * 100.0).round() / 100.0
}

/// Rough minutes at city average speed.
pub fn estimate_duration_minutes(distance_km: f64) -> f64 {
    (distance_km / AVERAGE_SPEED_KMH * 60.0 * 10.0).round() / 10.0
}

/// Row in the `trips` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trip {
    pub id: String,
    pub customer_id: String,
    #[serde(default)]
    pub driver_id: Option<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    #[serde(default)]
    pub pickup_lat: Option<f64>,
    #[serde(default)]
    pub pickup_lng: Option<f64>,
    #[serde(default)]
    pub dropoff_lat: Option<f64>,
    #[serde(default)]
    pub dropoff_lng: Option<f64>,
    pub ride_type: RideType,
    pub status: TripStatus,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub estimated_duration: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub actual_cost: Option<f64>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTrip {
    pub customer_id: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff_lng: Option<f64>,
    pub ride_type: RideType,
    pub estimated_cost: f64,
    pub estimated_duration: f64,
    pub distance: f64,
    pub status: TripStatus,
    pub created_at: String,
}

impl NewTrip {
    pub fn requested(
        customer_id: String,
        pickup_location: String,
        dropoff_location: String,
        ride_type: RideType,
        distance_km: f64,
    ) -> Self {
        Self {
            customer_id,
            pickup_location,
            dropoff_location,
            pickup_lat: None,
            pickup_lng: None,
            dropoff_lat: None,
            dropoff_lng: None,
            ride_type,
            estimated_cost: estimate_fare(ride_type, distance_km),
            estimated_duration: estimate_duration_minutes(distance_km),
            distance: distance_km,
            status: TripStatus::Requested,
            created_at: now_iso(),
        }
    }
}

/// Completed-trip aggregates, computed client-side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TripStats {
    pub total_trips: usize,
    pub total_revenue: f64,
    pub total_distance: f64,
}

#[async_trait]
pub trait TripService: Send + Sync {
    async fn create(&self, trip: &NewTrip) -> AppResult<Trip>;

    async fn trip_by_id(&self, trip_id: &str) -> AppResult<Trip>;

    async fn update_status(&self, trip_id: &str, status: TripStatus) -> AppResult<Trip>;

    /// Driver claims an open request.
    async fn accept(&self, trip_id: &str, driver_id: &str) -> AppResult<Trip>;

    async fn cancel(&self, trip_id: &str, reason: &str) -> AppResult<Trip>;

    async fn trips_for_customer(&self, customer_id: &str) -> AppResult<Vec<Trip>>;

    async fn trips_for_driver(&self, driver_id: &str) -> AppResult<Vec<Trip>>;

    /// Open requests, oldest first.
    async fn available(&self) -> AppResult<Vec<Trip>>;

    async fn statistics(&self, user_id: &str, role: Role) -> AppResult<TripStats>;

    /// Watches one trip row; events arrive on `events` until released.
    fn subscribe_trip(&self, trip_id: &str, events: UnboundedSender<TripEvent>) -> Subscription;

    /// Watches the open-request set for drivers.
    fn subscribe_available(&self, events: UnboundedSender<TripEvent>) -> Subscription;
}

pub struct BackendTripService {
    rest: Arc<RestClient>,
    poll_interval: Duration,
}

impl BackendTripService {
    pub fn new(rest: Arc<RestClient>, poll_interval: Duration) -> Self {
        Self {
            rest,
            poll_interval,
        }
    }
}

async fn fetch_trip(rest: &RestClient, trip_id: &str) -> AppResult<Trip> {
    rest.select_one("trips", TableQuery::new().eq("id", trip_id))
        .await?
        .ok_or_else(|| AppError::backend(404, format!("trip {trip_id} not found")))
}

async fn fetch_available(rest: &RestClient) -> AppResult<Vec<Trip>> {
    rest.select(
        "trips",
        TableQuery::new()
            .eq("status", TripStatus::Requested.as_str())
            .order_asc("created_at")
            .limit(AVAILABLE_TRIPS_LIMIT),
    )
    .await
}

#[async_trait]
impl TripService for BackendTripService {
    async fn create(&self, trip: &NewTrip) -> AppResult<Trip> {
        let created: Trip = self.rest.insert("trips", trip).await?;
        info!(trip = %created.id, "trip requested");
        Ok(created)
    }

    async fn trip_by_id(&self, trip_id: &str) -> AppResult<Trip> {
        fetch_trip(&self.rest, trip_id).await
    }

    async fn update_status(&self, trip_id: &str, status: TripStatus) -> AppResult<Trip> {
        let mut patch = json!({
            "status": status,
            "updated_at": now_iso(),
        });
        if let Some(column) = status.timestamp_column() {
            patch[column] = json!(now_iso());
        }

        let updated: Trip = self
            .rest
            .update("trips", TableQuery::new().eq("id", trip_id), &patch)
            .await?;
        info!(trip = %trip_id, status = status.as_str(), "trip status updated");
        Ok(updated)
    }

    async fn accept(&self, trip_id: &str, driver_id: &str) -> AppResult<Trip> {
        let updated: Trip = self
            .rest
            .update(
                "trips",
                TableQuery::new().eq("id", trip_id),
                &json!({
                    "driver_id": driver_id,
                    "status": TripStatus::Accepted,
                    "accepted_at": now_iso(),
                    "updated_at": now_iso(),
                }),
            )
            .await?;
        info!(trip = %trip_id, driver = %driver_id, "trip accepted");
        Ok(updated)
    }

    async fn cancel(&self, trip_id: &str, reason: &str) -> AppResult<Trip> {
        let updated: Trip = self
            .rest
            .update(
                "trips",
                TableQuery::new().eq("id", trip_id),
                &json!({
                    "status": TripStatus::Cancelled,
                    "cancellation_reason": reason,
                    "cancelled_at": now_iso(),
                    "updated_at": now_iso(),
                }),
            )
            .await?;
        info!(trip = %trip_id, "trip cancelled");
        Ok(updated)
    }

    async fn trips_for_customer(&self, customer_id: &str) -> AppResult<Vec<Trip>> {
        self.rest
            .select(
                "trips",
                TableQuery::new()
                    .eq("customer_id", customer_id)
                    .order_desc("created_at"),
            )
            .await
    }

    async fn trips_for_driver(&self, driver_id: &str) -> AppResult<Vec<Trip>> {
        self.rest
            .select(
                "trips",
                TableQuery::new()
                    .eq("driver_id", driver_id)
                    .order_desc("created_at"),
            )
            .await
    }

    async fn available(&self) -> AppResult<Vec<Trip>> {
        fetch_available(&self.rest).await
    }

    async fn statistics(&self, user_id: &str, role: Role) -> AppResult<TripStats> {
        let column = match role {
            Role::Driver => "driver_id",
            Role::Customer => "customer_id",
        };
        let completed: Vec<Trip> = self
            .rest
            .select(
                "trips",
                TableQuery::new()
                    .eq(column, user_id)
                    .eq("status", TripStatus::Completed.as_str()),
            )
            .await?;
        Ok(summarize(&completed, role))
    }

    fn subscribe_trip(&self, trip_id: &str, events: UnboundedSender<TripEvent>) -> Subscription {
        let rest = Arc::clone(&self.rest);
        let id = trip_id.to_string();
        spawn_poller(
            format!("trip:{trip_id}"),
            self.poll_interval,
            move || {
                let rest = Arc::clone(&rest);
                let id = id.clone();
                async move { fetch_trip(&rest, &id).await }
            },
            events,
            TripEvent::Updated,
        )
    }

    fn subscribe_available(&self, events: UnboundedSender<TripEvent>) -> Subscription {
        let rest = Arc::clone(&self.rest);
        spawn_poller(
            "available-trips".to_string(),
            self.poll_interval,
            move || {
                let rest = Arc::clone(&rest);
                async move { fetch_available(&rest).await }
            },
            events,
            TripEvent::Available,
        )
    }
}

fn summarize(completed: &[Trip], role: Role) -> TripStats {
    TripStats {
        total_trips: completed.len(),
        total_revenue: match role {
            Role::Driver => completed
                .iter()
                .filter_map(|trip| trip.actual_cost)
                .sum(),
            Role::Customer => 0.0,
        },
        total_distance: completed.iter().filter_map(|trip| trip.distance).sum(),
    }
}
