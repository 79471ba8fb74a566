//! API shared state

use crate::monitor::HealthStatus;

/// Shared state passed to all API handlers
#[derive(Debug, Clone)]
pub struct ApiState {
    /// Health of the monitor loop, written once per tick
    pub health: HealthStatus,
}

impl ApiState {
    pub fn new(health: HealthStatus) -> Self {
        Self { health }
    }
}
