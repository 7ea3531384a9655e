//! Work queue abstraction and the SQS implementation.

use async_trait::async_trait;
use aws_sdk_sqs::error::SdkError;
use tracing::{debug, warn};

use crate::error::{Result, WorkerError};

/// A received message: a receipt handle (for acknowledgment) plus the raw body.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub receipt_handle: String,
    pub body: String,
}

/// Receive/delete operations against the work queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Long-poll for at most one message.
    async fn receive(&self) -> Result<Option<QueueMessage>>;

    /// Acknowledge a message. Must tolerate handles for messages that are
    /// already gone; only transport-level failures surface as errors.
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}

/// SQS-backed work queue
#[derive(Clone)]
pub struct SqsJobQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    wait_time_secs: i32,
}

impl SqsJobQueue {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: String, wait_time_secs: i32) -> Self {
        Self {
            client,
            queue_url,
            wait_time_secs,
        }
    }
}

#[async_trait]
impl JobQueue for SqsJobQueue {
    async fn receive(&self) -> Result<Option<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(self.wait_time_secs)
            .send()
            .await
            .map_err(|e| WorkerError::Queue(e.to_string()))?;

        let Some(message) = output.messages().first() else {
            return Ok(None);
        };

        let (Some(receipt_handle), Some(body)) = (message.receipt_handle(), message.body()) else {
            warn!("received message without receipt handle or body, skipping");
            return Ok(None);
        };

        debug!(receipt_handle = %receipt_handle, "received message");
        Ok(Some(QueueMessage {
            receipt_handle: receipt_handle.to_string(),
            body: body.to_string(),
        }))
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        match self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            // Stale or already-consumed receipt handles come back as service
            // errors; the message is gone either way.
            Err(SdkError::ServiceError(err)) => {
                warn!(error = ?err.err(), "delete rejected by queue, treating as already removed");
                Ok(())
            }
            Err(e) => Err(WorkerError::Queue(e.to_string())),
        }
    }
}
