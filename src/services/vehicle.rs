use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{RestClient, TableQuery};
use crate::error::AppResult;

use super::now_iso;

/// Row in the `vehicles` table. Verification is an operator-side flow; the
/// client only ever reads the resulting status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub driver_id: String,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
    pub plate_number: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewVehicle {
    pub driver_id: String,
    pub make: String,
    pub model: String,
    pub plate_number: String,
    pub status: String,
    pub created_at: String,
}

impl NewVehicle {
    /// New registrations start out pending verification.
    pub fn pending(driver_id: String, make: String, model: String, plate_number: String) -> Self {
        Self {
            driver_id,
            make,
            model,
            plate_number,
            status: "pending".to_string(),
            created_at: now_iso(),
        }
    }
}

#[async_trait]
pub trait VehicleService: Send + Sync {
    async fn register(&self, vehicle: &NewVehicle) -> AppResult<Vehicle>;

    async fn vehicle_by_id(&self, vehicle_id: &str) -> AppResult<Option<Vehicle>>;

    async fn vehicles_for_driver(&self, driver_id: &str) -> AppResult<Vec<Vehicle>>;
}

pub struct BackendVehicleService {
    rest: Arc<RestClient>,
}

impl BackendVehicleService {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl VehicleService for BackendVehicleService {
    async fn register(&self, vehicle: &NewVehicle) -> AppResult<Vehicle> {
        let registered: Vehicle = self.rest.insert("vehicles", vehicle).await?;
        info!(vehicle = %registered.id, driver = %registered.driver_id, "vehicle registered");
        Ok(registered)
    }

    async fn vehicle_by_id(&self, vehicle_id: &str) -> AppResult<Option<Vehicle>> {
        self.rest
            .select_one("vehicles", TableQuery::new().eq("id", vehicle_id))
            .await
    }

    async fn vehicles_for_driver(&self, driver_id: &str) -> AppResult<Vec<Vehicle>> {
        self.rest
            .select(
                "vehicles",
                TableQuery::new()
                    .eq("driver_id", driver_id)
                    .order_desc("created_at"),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::NewVehicle;

    #[test]
    fn new_registrations_start_pending() {
        let vehicle = NewVehicle::pending(
            "d-1".to_string(),
            "Toyota".to_string(),
            "Prius".to_string(),
            "AB-123-CD".to_string(),
        );
        assert_eq!(vehicle.status, "pending");
        assert!(!vehicle.created_at.is_empty());
    }
}
