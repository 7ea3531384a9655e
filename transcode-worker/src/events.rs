//! Parsing and classification of S3 event notification bodies.
//!
//! Bodies arrive as the raw JSON SQS was subscribed with. Three shapes
//! matter: the synthetic `s3:TestEvent` sent when event delivery is first
//! wired up, real `Records`-style object-created notifications, and
//! anything else (ignored).

use serde::Deserialize;

use crate::error::Result;

/// A storage object named by an object-created record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

/// Classified notification body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// Connectivity probe (`s3:TestEvent`) carrying no object data
    Test,
    /// One or more object-created records
    ObjectCreated(Vec<ObjectRef>),
    /// Valid JSON that matches neither shape
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct RawNotification {
    #[serde(rename = "Service")]
    service: Option<String>,
    #[serde(rename = "Event")]
    event: Option<String>,
    #[serde(rename = "Records")]
    records: Option<Vec<RawRecord>>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    s3: Option<RawS3>,
}

#[derive(Debug, Deserialize)]
struct RawS3 {
    bucket: Option<RawBucket>,
    object: Option<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    key: Option<String>,
}

/// Parse a message body and classify it.
///
/// Returns `Err` only when the body is not valid JSON; a parseable body
/// that matches neither known shape classifies as `Unrecognized`.
pub fn classify(body: &str) -> Result<NotificationEvent> {
    let raw: RawNotification = serde_json::from_str(body)?;

    if raw.service.is_some() && raw.event.as_deref() == Some("s3:TestEvent") {
        return Ok(NotificationEvent::Test);
    }

    if let Some(records) = raw.records {
        let objects: Vec<ObjectRef> = records
            .into_iter()
            .filter_map(record_to_object)
            .collect();
        if !objects.is_empty() {
            return Ok(NotificationEvent::ObjectCreated(objects));
        }
    }

    Ok(NotificationEvent::Unrecognized)
}

fn record_to_object(record: RawRecord) -> Option<ObjectRef> {
    let s3 = record.s3?;
    let bucket = s3.bucket?.name?;
    let key = s3.object?.key?;
    Some(ObjectRef { bucket, key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_body_classifies_as_test() {
        let body = r#"{"Service":"Amazon S3","Event":"s3:TestEvent"}"#;
        assert_eq!(classify(body).unwrap(), NotificationEvent::Test);
    }

    #[test]
    fn object_created_body_yields_bucket_and_key() {
        let body = r#"{"Records":[{"s3":{"bucket":{"name":"videos-in"},"object":{"key":"clip1.mp4"}}}]}"#;
        let event = classify(body).unwrap();
        assert_eq!(
            event,
            NotificationEvent::ObjectCreated(vec![ObjectRef {
                bucket: "videos-in".to_string(),
                key: "clip1.mp4".to_string(),
            }])
        );
    }

    #[test]
    fn multi_record_body_yields_all_objects() {
        let body = r#"{"Records":[
            {"s3":{"bucket":{"name":"videos-in"},"object":{"key":"a.mp4"}}},
            {"s3":{"bucket":{"name":"videos-in"},"object":{"key":"b.mp4"}}}
        ]}"#;
        match classify(body).unwrap() {
            NotificationEvent::ObjectCreated(objects) => {
                assert_eq!(objects.len(), 2);
                assert_eq!(objects[1].key, "b.mp4");
            }
            other => panic!("expected ObjectCreated, got {other:?}"),
        }
    }

    #[test]
    fn unknown_shape_is_unrecognized() {
        let body = r#"{"hello":"world"}"#;
        assert_eq!(classify(body).unwrap(), NotificationEvent::Unrecognized);
    }

    #[test]
    fn empty_records_list_is_unrecognized() {
        let body = r#"{"Records":[]}"#;
        assert_eq!(classify(body).unwrap(), NotificationEvent::Unrecognized);
    }

    #[test]
    fn records_without_s3_shape_are_unrecognized() {
        let body = r#"{"Records":[{"eventSource":"aws:sns"}]}"#;
        assert_eq!(classify(body).unwrap(), NotificationEvent::Unrecognized);
    }

    #[test]
    fn non_json_body_is_an_error() {
        assert!(classify("not json at all").is_err());
    }

    #[test]
    fn test_event_requires_service_field() {
        // An Event field alone is not the connectivity-probe shape.
        let body = r#"{"Event":"s3:TestEvent"}"#;
        assert_eq!(classify(body).unwrap(), NotificationEvent::Unrecognized);
    }
}
