//! Helper functions for integration tests

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use wiremock::MockServer;

pub fn seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

pub fn server_port(server: &MockServer) -> u16 {
    server.address().port()
}

pub fn failed_task(id: &str, name: &str, finished: DateTime<Utc>) -> Value {
    json!({
        "id": id,
        "name": name,
        "state": "TASK_FAILED",
        "slave_id": "agent-1",
        "labels": [],
        "statuses": [
            { "state": "TASK_RUNNING", "timestamp": seconds(finished) - 10.0 },
            { "state": "TASK_FAILED", "timestamp": seconds(finished) }
        ]
    })
}

/// Master state with all agents resolving to localhost
pub fn master_state(pid: &str, leader: &str, tasks: Vec<Value>) -> Value {
    json!({
        "pid": pid,
        "leader": leader,
        "slaves": [{ "id": "agent-1", "hostname": "127.0.0.1" }],
        "frameworks": [{ "name": "marathon", "completed_tasks": tasks }]
    })
}

pub fn agent_state(executor_id: &str, directory: &str) -> Value {
    json!({
        "frameworks": [],
        "completed_frameworks": [{
            "executors": [],
            "completed_executors": [{ "id": executor_id, "directory": directory }]
        }]
    })
}
