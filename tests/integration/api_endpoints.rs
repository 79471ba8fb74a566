//! Health endpoint served next to the monitor loop

use complainer::{
    api::{ApiState, spawn_api_server},
    monitor::HealthStatus,
};
use pretty_assertions::assert_eq;
use std::net::SocketAddr;

async fn spawn_test_api(health: HealthStatus) -> SocketAddr {
    spawn_api_server("127.0.0.1:0".parse().unwrap(), ApiState::new(health))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_ok() {
    let addr = spawn_test_api(HealthStatus::new()).await;

    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "I am mostly okay, thanks.\n");
}

#[tokio::test]
async fn test_health_reports_last_error() {
    let health = HealthStatus::new();
    let addr = spawn_test_api(health.clone()).await;

    health.set(Some("mesos master not found".to_string())).await;
    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.text().await.unwrap(),
        "Something is fishy: mesos master not found\n"
    );

    // recovers once a tick succeeds again
    health.set(None).await;
    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route() {
    let addr = spawn_test_api(HealthStatus::new()).await;

    let response = reqwest::get(format!("http://{addr}/nope")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
