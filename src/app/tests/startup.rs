use std::sync::Arc;

use crate::services::auth::Role;
use crate::testkit::{FakeAuthService, services_with_auth};

use super::super::core::startup_path;

#[tokio::test]
async fn signed_out_sessions_start_at_sign_in() {
    let services = services_with_auth(Arc::new(FakeAuthService::signed_out()));
    assert_eq!(startup_path(&services).await, "/");
}

#[tokio::test]
async fn customers_start_on_the_booking_page() {
    let services = services_with_auth(Arc::new(FakeAuthService::signed_in(
        "u-1",
        Role::Customer,
    )));
    assert_eq!(startup_path(&services).await, "/customer");
}

#[tokio::test]
async fn drivers_start_on_their_dashboard() {
    let services =
        services_with_auth(Arc::new(FakeAuthService::signed_in("u-2", Role::Driver)));
    assert_eq!(startup_path(&services).await, "/driver/dashboard");
}

#[tokio::test]
async fn missing_profile_falls_back_to_the_booking_page() {
    let services = services_with_auth(Arc::new(FakeAuthService::without_profile("u-3")));
    assert_eq!(startup_path(&services).await, "/customer");
}
