//! Process-wide counters and gauges for chunk throughput, retry activity,
//! and queue depth.
//!
//! This is ambient observability, not a feature surface: no HTTP exporter is
//! wired up here. A caller installs whatever `metrics::Recorder`
//! implementation it likes (Prometheus, statsd, or none at all) and these
//! calls become no-ops until one is installed.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Registers metric descriptions. Safe to call more than once.
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    describe_counter!("lanshare_chunks_hashed_total", "Total number of chunks hashed");
    describe_counter!("lanshare_retries_scheduled_total", "Total number of retries scheduled");
    describe_counter!("lanshare_retries_escalated_total", "Total number of retries that gave up");
    describe_counter!("lanshare_files_completed_total", "Total number of files completed");
    describe_counter!("lanshare_files_failed_total", "Total number of files failed");
    describe_gauge!("lanshare_queue_depth", "Current number of files in a queue set");
}

pub fn record_chunk_hashed(bytes: usize) {
    counter!("lanshare_chunks_hashed_total").increment(1);
    counter!("lanshare_bytes_hashed_total").increment(bytes as u64);
}

pub fn record_retry_scheduled() {
    counter!("lanshare_retries_scheduled_total").increment(1);
}

pub fn record_retry_escalated() {
    counter!("lanshare_retries_escalated_total").increment(1);
}

pub fn record_file_completed() {
    counter!("lanshare_files_completed_total").increment(1);
}

pub fn record_file_failed() {
    counter!("lanshare_files_failed_total").increment(1);
}

pub fn set_queue_depth(set_name: &str, depth: usize) {
    gauge!("lanshare_queue_depth", "set" => set_name.to_string()).set(depth as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_metrics_is_idempotent() {
        init_metrics();
        init_metrics();
    }
}
