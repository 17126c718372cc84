use chrono::{DateTime, Duration, TimeZone, Utc};

/// Proposal deadline used by every fixture RFP.
pub fn proposal_due() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 0).unwrap()
}

pub fn before_deadline() -> DateTime<Utc> {
    proposal_due() - Duration::hours(2)
}

pub fn after_deadline() -> DateTime<Utc> {
    proposal_due() + Duration::minutes(1)
}

/// S3 `ObjectCreated:Put` notification for one object.
pub fn object_created(bucket: &str, key: &str, size: i64) -> serde_json::Value {
    serde_json::json!({
        "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "awsRegion": "us-east-1",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": { "name": bucket },
                "object": {
                    "key": key,
                    "size": size,
                    "eTag": "0f343b0931126a20f133d67c2b018a3b"
                }
            }
        }]
    })
}
