//! Mesos cluster reader against mocked masters and agents

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use complainer::{
    Failure,
    cluster::{ClusterError, ClusterReader, MesosCluster},
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

async fn master(state: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/master/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state))
        .mount(&server)
        .await;
    server
}

fn failure(id: &str) -> Failure {
    let time = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    Failure {
        id: id.to_string(),
        name: "app".to_string(),
        slave: "127.0.0.1".to_string(),
        framework: "marathon".to_string(),
        image: String::new(),
        state: "TASK_FAILED".to_string(),
        started: time,
        finished: time,
        labels: HashMap::new(),
    }
}

#[tokio::test]
async fn test_failures_skip_unreachable_and_follower_masters() {
    let finished = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let follower = master(master_state("master@b", "master@c", vec![])).await;
    let leader = master(master_state(
        "master@c",
        "master@c",
        vec![failed_task("app.1", "app", finished)],
    ))
    .await;

    let cluster = MesosCluster::new(vec![
        "http://127.0.0.1:1".to_string(),
        format!("{}/", follower.uri()),
        leader.uri(),
    ])
    .unwrap();

    let failures = cluster.failures().await.unwrap();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, "app.1");
    assert_eq!(failures[0].slave, "127.0.0.1");
    assert_eq!(failures[0].framework, "marathon");
    assert_eq!(failures[0].finished, finished);
}

#[tokio::test]
async fn test_failing_master_is_skipped() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&broken)
        .await;
    let leader = master(master_state("m", "m", vec![])).await;

    let cluster = MesosCluster::new(vec![broken.uri(), leader.uri()]).unwrap();

    assert!(cluster.failures().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_no_leader() {
    let follower = master(master_state("master@a", "master@b", vec![])).await;
    let garbage = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&garbage)
        .await;

    let cluster = MesosCluster::new(vec![follower.uri(), garbage.uri()]).unwrap();

    assert_matches!(cluster.failures().await, Err(ClusterError::NoLeader));
}

#[tokio::test]
async fn test_logs_from_completed_executor() {
    let agent = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(agent_state("app.1", "/var/sandbox/app.1")),
        )
        .mount(&agent)
        .await;

    let port = server_port(&agent);
    let cluster = MesosCluster::new(vec!["http://master".to_string()])
        .unwrap()
        .with_agent_port(port);

    let logs = cluster.logs(&failure("app.1")).await.unwrap();

    assert_eq!(
        logs.stdout,
        format!("http://127.0.0.1:{port}/files/download?path=/var/sandbox/app.1/stdout")
    );
    assert_eq!(
        logs.stderr,
        format!("http://127.0.0.1:{port}/files/download?path=/var/sandbox/app.1/stderr")
    );
}

#[tokio::test]
async fn test_logs_from_running_framework() {
    let agent = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "frameworks": [{
                "executors": [{ "id": "other", "directory": "/sandbox/other" }],
                "completed_executors": [{ "id": "app.2", "directory": "/sandbox/app.2" }]
            }]
        })))
        .mount(&agent)
        .await;

    let cluster = MesosCluster::new(vec!["http://master".to_string()])
        .unwrap()
        .with_agent_port(server_port(&agent));

    let logs = cluster.logs(&failure("app.2")).await.unwrap();
    assert!(logs.stdout.ends_with("path=/sandbox/app.2/stdout"));
}

#[tokio::test]
async fn test_logs_executor_not_found() {
    let agent = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(agent_state("app.1", "/sandbox")))
        .mount(&agent)
        .await;

    let cluster = MesosCluster::new(vec!["http://master".to_string()])
        .unwrap()
        .with_agent_port(server_port(&agent));

    let result = cluster.logs(&failure("app.9")).await;
    assert_matches!(result, Err(ClusterError::ExecutorNotFound(id)) if id == "app.9");
}

#[tokio::test]
async fn test_logs_agent_unreachable() {
    let cluster = MesosCluster::new(vec!["http://master".to_string()])
        .unwrap()
        .with_agent_port(1);

    assert_matches!(
        cluster.logs(&failure("app.1")).await,
        Err(ClusterError::Request { .. })
    );
}

#[tokio::test]
async fn test_master_without_pid_is_not_leader() {
    let anonymous = master(master_state("", "", vec![])).await;

    let cluster = MesosCluster::new(vec![anonymous.uri()]).unwrap();

    assert_matches!(cluster.failures().await, Err(ClusterError::NoLeader));
}
