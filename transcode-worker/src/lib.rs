//! Transcode Worker Library
//!
//! Polls an SQS queue for S3 event notifications and launches Fargate
//! transcode tasks for newly uploaded objects.

pub mod config;
pub mod consumer;
pub mod error;
pub mod events;
pub mod launcher;
pub mod queue;

pub use error::{Result, WorkerError};
