//! The queue consumer loop.
//!
//! Pulls at most one message per cycle, classifies it, and dispatches:
//! test events are acknowledged and skipped, object-created events launch
//! one transcode task per record and are acknowledged once every launch
//! succeeded, anything else is left untouched for the visibility timeout
//! to re-expose.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::events::{self, NotificationEvent};
use crate::launcher::{JobLaunchRequest, JobLauncher};
use crate::queue::{JobQueue, QueueMessage};

/// The polling consumer. Single sequential task; one message in flight at
/// a time.
pub struct QueueConsumer<Q, L> {
    queue: Q,
    launcher: L,
    poll_interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl<Q: JobQueue, L: JobLauncher> QueueConsumer<Q, L> {
    pub fn new(
        queue: Q,
        launcher: L,
        poll_interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            launcher,
            poll_interval,
            shutdown_rx,
        }
    }

    /// Run the consumer loop until shutdown or a queue transport failure.
    ///
    /// Receive errors are fatal; everything that goes wrong with an
    /// individual message is logged and the loop moves on.
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting consumer loop");

        loop {
            tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    // A dropped sender means nobody can ask us to stop
                    // later; treat it as shutdown rather than spinning.
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping consumer");
                        break;
                    }
                }

                received = self.queue.receive() => {
                    match received {
                        Ok(Some(message)) => self.process_message(&message).await,
                        Ok(None) => debug!("queue empty"),
                        Err(e) => {
                            error!(error = %e, "Queue receive failed");
                            return Err(e);
                        }
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        info!("Consumer stopped");
        Ok(())
    }

    /// Process a single message. Never fails the loop: malformed bodies
    /// and launch failures are logged and the message is left for
    /// redelivery.
    async fn process_message(&self, message: &QueueMessage) {
        let event = match events::classify(&message.body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Unparseable message body, leaving for redelivery");
                return;
            }
        };

        match event {
            NotificationEvent::Test => {
                debug!("Connectivity test event, acknowledging");
                self.acknowledge(message).await;
            }
            NotificationEvent::ObjectCreated(objects) => {
                for object in objects {
                    let request = JobLaunchRequest {
                        bucket: object.bucket,
                        key: object.key,
                    };
                    match self.launcher.launch(&request).await {
                        Ok(task_id) => {
                            info!(
                                task_id = %task_id,
                                bucket = %request.bucket,
                                key = %request.key,
                                "Transcode task launched"
                            );
                        }
                        Err(e) => {
                            warn!(
                                error = %e,
                                bucket = %request.bucket,
                                key = %request.key,
                                "Launch failed, leaving message for redelivery"
                            );
                            return;
                        }
                    }
                }
                self.acknowledge(message).await;
            }
            NotificationEvent::Unrecognized => {
                debug!("Unrecognized notification shape, ignoring");
            }
        }
    }

    async fn acknowledge(&self, message: &QueueMessage) {
        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            warn!(error = %e, "Failed to delete message, visibility timeout will re-expose it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::launcher::MockJobLauncher;
    use crate::queue::MockJobQueue;

    const TEST_EVENT_BODY: &str = r#"{"Service":"Amazon S3","Event":"s3:TestEvent"}"#;
    const OBJECT_CREATED_BODY: &str =
        r#"{"Records":[{"s3":{"bucket":{"name":"videos-in"},"object":{"key":"clip1.mp4"}}}]}"#;

    fn consumer(
        queue: MockJobQueue,
        launcher: MockJobLauncher,
    ) -> QueueConsumer<MockJobQueue, MockJobLauncher> {
        let (_tx, rx) = watch::channel(false);
        QueueConsumer::new(queue, launcher, Duration::from_millis(1), rx)
    }

    fn message(body: &str) -> QueueMessage {
        QueueMessage {
            receipt_handle: "rh-1".to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_event_is_deleted_and_not_launched() {
        let mut queue = MockJobQueue::new();
        queue
            .expect_delete()
            .withf(|handle| handle == "rh-1")
            .times(1)
            .returning(|_| Ok(()));
        let mut launcher = MockJobLauncher::new();
        launcher.expect_launch().times(0);

        let consumer = consumer(queue, launcher);
        consumer.process_message(&message(TEST_EVENT_BODY)).await;
    }

    #[tokio::test]
    async fn object_created_launches_with_bucket_and_key_then_deletes() {
        let mut queue = MockJobQueue::new();
        queue
            .expect_delete()
            .withf(|handle| handle == "rh-1")
            .times(1)
            .returning(|_| Ok(()));
        let mut launcher = MockJobLauncher::new();
        launcher
            .expect_launch()
            .withf(|request| request.bucket == "videos-in" && request.key == "clip1.mp4")
            .times(1)
            .returning(|_| Ok("task-arn-1".to_string()));

        let consumer = consumer(queue, launcher);
        consumer.process_message(&message(OBJECT_CREATED_BODY)).await;
    }

    #[tokio::test]
    async fn multi_record_event_launches_once_per_record() {
        let body = r#"{"Records":[
            {"s3":{"bucket":{"name":"videos-in"},"object":{"key":"a.mp4"}}},
            {"s3":{"bucket":{"name":"videos-in"},"object":{"key":"b.mp4"}}}
        ]}"#;

        let mut queue = MockJobQueue::new();
        queue.expect_delete().times(1).returning(|_| Ok(()));
        let mut launcher = MockJobLauncher::new();
        launcher
            .expect_launch()
            .withf(|request| request.key == "a.mp4" || request.key == "b.mp4")
            .times(2)
            .returning(|_| Ok("task-arn".to_string()));

        let consumer = consumer(queue, launcher);
        consumer.process_message(&message(body)).await;
    }

    #[tokio::test]
    async fn unrecognized_body_calls_neither_delete_nor_launch() {
        let mut queue = MockJobQueue::new();
        queue.expect_delete().times(0);
        let mut launcher = MockJobLauncher::new();
        launcher.expect_launch().times(0);

        let consumer = consumer(queue, launcher);
        consumer
            .process_message(&message(r#"{"hello":"world"}"#))
            .await;
    }

    #[tokio::test]
    async fn malformed_body_is_skipped_without_calls() {
        let mut queue = MockJobQueue::new();
        queue.expect_delete().times(0);
        let mut launcher = MockJobLauncher::new();
        launcher.expect_launch().times(0);

        let consumer = consumer(queue, launcher);
        consumer.process_message(&message("definitely not json")).await;
    }

    #[tokio::test]
    async fn launch_failure_skips_delete() {
        let mut queue = MockJobQueue::new();
        queue.expect_delete().times(0);
        let mut launcher = MockJobLauncher::new();
        launcher
            .expect_launch()
            .times(1)
            .returning(|_| Err(WorkerError::Launch("cluster unavailable".to_string())));

        let consumer = consumer(queue, launcher);
        consumer.process_message(&message(OBJECT_CREATED_BODY)).await;
    }

    #[tokio::test]
    async fn delete_failure_does_not_panic_or_propagate() {
        let mut queue = MockJobQueue::new();
        queue
            .expect_delete()
            .times(1)
            .returning(|_| Err(WorkerError::Queue("connection reset".to_string())));
        let mut launcher = MockJobLauncher::new();
        launcher.expect_launch().times(0);

        let consumer = consumer(queue, launcher);
        consumer.process_message(&message(TEST_EVENT_BODY)).await;
    }

    #[tokio::test]
    async fn empty_receive_keeps_polling_until_shutdown() {
        let mut queue = MockJobQueue::new();
        queue.expect_receive().returning(|| Ok(None));
        queue.expect_delete().times(0);
        let mut launcher = MockJobLauncher::new();
        launcher.expect_launch().times(0);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut consumer =
            QueueConsumer::new(queue, launcher, Duration::from_millis(1), shutdown_rx);

        let handle = tokio::spawn(async move { consumer.run().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).expect("consumer still listening");

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("consumer did not stop after shutdown")
            .expect("consumer task panicked");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_stops_the_loop() {
        let mut queue = MockJobQueue::new();
        queue.expect_receive().returning(|| Ok(None));
        let launcher = MockJobLauncher::new();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);
        let mut consumer =
            QueueConsumer::new(queue, launcher, Duration::from_millis(1), shutdown_rx);

        let result = tokio::time::timeout(Duration::from_secs(1), consumer.run())
            .await
            .expect("consumer did not stop after sender was dropped");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn receive_error_terminates_the_loop() {
        let mut queue = MockJobQueue::new();
        queue
            .expect_receive()
            .times(1)
            .returning(|| Err(WorkerError::Queue("access denied".to_string())));
        let launcher = MockJobLauncher::new();

        let (_tx, shutdown_rx) = watch::channel(false);
        let mut consumer =
            QueueConsumer::new(queue, launcher, Duration::from_millis(1), shutdown_rx);

        let result = consumer.run().await;
        assert!(matches!(result, Err(WorkerError::Queue(_))));
    }
}
