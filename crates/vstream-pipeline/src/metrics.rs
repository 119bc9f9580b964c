//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! these calls do nothing.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const PIPELINE_RUNS_TOTAL: &str = "vstream_pipeline_runs_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "vstream_pipeline_duration_seconds";
    pub const TRANSCODE_DURATION_SECONDS: &str = "vstream_transcode_duration_seconds";
    pub const PUBLISHED_OBJECTS_TOTAL: &str = "vstream_published_objects_total";
    pub const CLEANUP_FAILURES_TOTAL: &str = "vstream_cleanup_failures_total";
}

/// Record a finished run. `outcome` is `success` or an error kind.
pub fn record_run(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::PIPELINE_RUNS_TOTAL, &labels).increment(1);
    histogram!(names::PIPELINE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_transcode_duration(duration_secs: f64) {
    histogram!(names::TRANSCODE_DURATION_SECONDS).record(duration_secs);
}

/// Record uploaded objects for a bucket.
pub fn record_published(bucket: &str, count: u64) {
    let labels = [("bucket", bucket.to_string())];
    counter!(names::PUBLISHED_OBJECTS_TOTAL, &labels).increment(count);
}

pub fn record_cleanup_failure() {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(1);
}
