//! Metrics module
//!
//! Provides Prometheus metrics for conversions and rejected uploads.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec,
};

lazy_static! {
    pub static ref CONVERSIONS_TOTAL: CounterVec = register_counter_vec!(
        "track_gateway_conversions_total",
        "Total number of conversions",
        &["input", "output", "status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "track_gateway_upload_bytes_total",
        "Total bytes of accepted uploads"
    ).unwrap();

    pub static ref CONVERSION_DURATION: HistogramVec = register_histogram_vec!(
        "track_gateway_conversion_duration_seconds",
        "Converter run time in seconds",
        &["output"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    pub static ref REJECTIONS_TOTAL: CounterVec = register_counter_vec!(
        "track_gateway_rejections_total",
        "Uploads rejected before conversion",
        &["reason"]
    ).unwrap();
}

/// Record an accepted upload
pub fn record_upload(bytes: u64) {
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a finished conversion
pub fn record_conversion(input: &str, output: &str, success: bool, duration_secs: f64) {
    let status = if success { "success" } else { "failure" };
    CONVERSIONS_TOTAL
        .with_label_values(&[input, output, status])
        .inc();
    CONVERSION_DURATION
        .with_label_values(&[output])
        .observe(duration_secs);
}

/// Record an upload rejected before reaching the converter
pub fn record_rejection(reason: &str) {
    REJECTIONS_TOTAL.with_label_values(&[reason]).inc();
}
