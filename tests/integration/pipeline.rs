//! Full monitor ticks from a mocked cluster to a file reporter

use chrono::{Duration, Utc};
use complainer::{
    cluster::MesosCluster,
    monitor::Monitor,
    reporters::{FileReporter, Reporter},
    uploaders::NoopUploader,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

const FORMAT: &str = "{failure.id} {failure.name} {failure.state} {stdout}{nl}";

async fn mount_master(server: &MockServer, tasks: Vec<serde_json::Value>) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/master/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(master_state("m", "m", tasks)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_new_failure_is_reported_once() {
    let master = MockServer::start().await;
    let agent = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(agent_state("app.1", "/sandbox/app.1")))
        .expect(1)
        .mount(&agent)
        .await;

    let dir = tempdir().unwrap();
    let log = dir.path().join("failures.log");
    let reporter: Arc<dyn Reporter> = Arc::new(FileReporter::new(&log, FORMAT).await.unwrap());

    let cluster = MesosCluster::new(vec![master.uri()])
        .unwrap()
        .with_agent_port(server_port(&agent));
    let mut monitor = Monitor::new(
        "default",
        Arc::new(cluster),
        Arc::new(NoopUploader),
        BTreeMap::from([("file".to_string(), reporter)]),
        true,
    );

    // cold start with an empty cluster
    mount_master(&master, vec![]).await;
    monitor.run().await.unwrap();
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "");

    let finished = Utc::now() - Duration::seconds(2);
    mount_master(&master, vec![failed_task("app.1", "app", finished)]).await;
    monitor.run().await.unwrap();
    monitor.run().await.unwrap();

    let content = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0],
        format!(
            "app.1 app TASK_FAILED http://127.0.0.1:{}/files/download?path=/sandbox/app.1/stdout",
            server_port(&agent)
        )
    );
    assert_eq!(monitor.recent_len(), 1);
}

#[tokio::test]
async fn test_unreachable_cluster_marks_health() {
    let dir = tempdir().unwrap();
    let reporter: Arc<dyn Reporter> = Arc::new(
        FileReporter::new(dir.path().join("failures.log"), FORMAT)
            .await
            .unwrap(),
    );

    let cluster = MesosCluster::new(vec!["http://127.0.0.1:1".to_string()]).unwrap();
    let mut monitor = Monitor::new(
        "default",
        Arc::new(cluster),
        Arc::new(NoopUploader),
        BTreeMap::from([("file".to_string(), reporter)]),
        true,
    );
    let health = monitor.health();

    assert!(monitor.run().await.is_err());
    assert_eq!(health.error().await.as_deref(), Some("mesos master not found"));
}
