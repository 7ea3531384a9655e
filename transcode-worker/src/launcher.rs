//! Transcode task launching and the ECS Fargate implementation.

use async_trait::async_trait;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, KeyValuePair, LaunchType,
    NetworkConfiguration, TaskOverride,
};
use tracing::debug;

use crate::error::{Result, WorkerError};

/// A single transcode job: the object to process, passed to the container
/// as environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLaunchRequest {
    pub bucket: String,
    pub key: String,
}

/// Launches one containerized transcode task per request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Submit the job. Returns the launched task identifier.
    async fn launch(&self, request: &JobLaunchRequest) -> Result<String>;
}

/// ECS placement settings for launched tasks
#[derive(Debug, Clone)]
pub struct EcsLauncherConfig {
    pub cluster: String,
    pub task_definition: String,
    pub container_name: String,
    pub subnets: Vec<String>,
    pub assign_public_ip: bool,
}

/// ECS-backed launcher running the pre-registered transcoder task
/// definition on Fargate.
#[derive(Clone)]
pub struct EcsJobLauncher {
    client: aws_sdk_ecs::Client,
    config: EcsLauncherConfig,
}

impl EcsJobLauncher {
    pub fn new(client: aws_sdk_ecs::Client, config: EcsLauncherConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl JobLauncher for EcsJobLauncher {
    async fn launch(&self, request: &JobLaunchRequest) -> Result<String> {
        let overrides = TaskOverride::builder()
            .container_overrides(
                ContainerOverride::builder()
                    .name(&self.config.container_name)
                    .environment(
                        KeyValuePair::builder()
                            .name("S3_BUCKET")
                            .value(&request.bucket)
                            .build(),
                    )
                    .environment(
                        KeyValuePair::builder()
                            .name("S3_KEY")
                            .value(&request.key)
                            .build(),
                    )
                    .build(),
            )
            .build();

        let vpc_config = AwsVpcConfiguration::builder()
            .set_subnets(Some(self.config.subnets.clone()))
            .assign_public_ip(if self.config.assign_public_ip {
                AssignPublicIp::Enabled
            } else {
                AssignPublicIp::Disabled
            })
            .build()
            .map_err(|e| WorkerError::Launch(format!("invalid network configuration: {e}")))?;

        let output = self
            .client
            .run_task()
            .cluster(&self.config.cluster)
            .launch_type(LaunchType::Fargate)
            .task_definition(&self.config.task_definition)
            .count(1)
            .overrides(overrides)
            .network_configuration(
                NetworkConfiguration::builder()
                    .awsvpc_configuration(vpc_config)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| WorkerError::Launch(e.to_string()))?;

        if let Some(failure) = output.failures().first() {
            return Err(WorkerError::Launch(format!(
                "run_task failure: {}",
                failure.reason().unwrap_or("unknown reason")
            )));
        }

        let task_arn = output
            .tasks()
            .first()
            .and_then(|task| task.task_arn())
            .ok_or_else(|| WorkerError::Launch("run_task returned no task".to_string()))?;

        debug!(task_arn = %task_arn, "run_task accepted");
        Ok(task_arn.to_string())
    }
}
