//! Worker configuration, loaded from environment variables.
//!
//! - `SQS_QUEUE_URL`: URL of the video-processing queue (required)
//! - `SQS_WAIT_TIME_SECS`: long-poll wait per receive (default: 10)
//! - `POLL_INTERVAL_SECS`: sleep between polling cycles (default: 1)
//! - `ECS_CLUSTER`: cluster ARN or name (required)
//! - `ECS_TASK_DEFINITION`: transcoder task definition ARN (required)
//! - `ECS_CONTAINER_NAME`: container to override (default: "video-transcoder")
//! - `ECS_SUBNETS`: comma-separated subnet IDs (required)
//! - `ECS_ASSIGN_PUBLIC_IP`: whether tasks get a public IP (default: true)

use crate::error::{Result, WorkerError};
use crate::launcher::EcsLauncherConfig;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub queue_url: String,
    pub wait_time_secs: i32,
    pub poll_interval_secs: u64,
    pub launcher: EcsLauncherConfig,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let queue_url = require("SQS_QUEUE_URL")?;
        let cluster = require("ECS_CLUSTER")?;
        let task_definition = require("ECS_TASK_DEFINITION")?;

        let subnets: Vec<String> = require("ECS_SUBNETS")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if subnets.is_empty() {
            return Err(WorkerError::Config(
                "ECS_SUBNETS must name at least one subnet".to_string(),
            ));
        }

        Ok(Self {
            queue_url,
            wait_time_secs: std::env::var("SQS_WAIT_TIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            launcher: EcsLauncherConfig {
                cluster,
                task_definition,
                container_name: std::env::var("ECS_CONTAINER_NAME")
                    .unwrap_or_else(|_| "video-transcoder".to_string()),
                subnets,
                assign_public_ip: std::env::var("ECS_ASSIGN_PUBLIC_IP")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(true),
            },
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| WorkerError::Config(format!("{name} not set")))
}
