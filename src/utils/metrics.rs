//! Connection Metrics
//!
//! Per-connection counters for bytes, operations and failures.
//!
//! Uses atomic counters so the read side and the write side can record
//! without sharing a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector owned by a single connection
#[derive(Debug)]
pub struct Metrics {
    /// Raw and staged write operations that reached the socket
    pub writes: AtomicU64,
    /// Raw read operations
    pub reads: AtomicU64,
    /// `read_line` operations
    pub lines_read: AtomicU64,
    /// Total bytes sent
    pub bytes_sent: AtomicU64,
    /// Total bytes received
    pub bytes_received: AtomicU64,
    /// Typed values saved through `Connection::save`
    pub values_saved: AtomicU64,
    /// Typed values loaded through `Connection::load`
    pub values_loaded: AtomicU64,
    /// Transport failures
    pub io_errors: AtomicU64,
    /// Creation time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            writes: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            lines_read: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            values_saved: AtomicU64::new(0),
            values_loaded: AtomicU64::new(0),
            io_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record bytes pushed to the socket
    pub fn bytes_written(&self, byte_count: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    /// Record a completed raw read
    pub fn read_completed(&self, byte_count: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    /// Record a completed line read
    pub fn line_read(&self, byte_count: usize) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    /// Record bytes consumed by a typed load
    pub fn bytes_loaded(&self, byte_count: usize) {
        self.bytes_received
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    /// Record a typed value saved
    pub fn value_saved(&self) {
        self.values_saved.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a typed value loaded
    pub fn value_loaded(&self) {
        self.values_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transport failure
    pub fn io_error(&self) {
        self.io_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            values_saved: self.values_saved.load(Ordering::Relaxed),
            values_loaded: self.values_loaded.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics under the given connection name
    pub fn log_metrics(&self, name: &str) {
        let snapshot = self.snapshot();
        info!(
            name,
            writes = snapshot.writes,
            reads = snapshot.reads,
            lines_read = snapshot.lines_read,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            values_saved = snapshot.values_saved,
            values_loaded = snapshot.values_loaded,
            io_errors = snapshot.io_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Connection metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub writes: u64,
    pub reads: u64,
    pub lines_read: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub values_saved: u64,
    pub values_loaded: u64,
    pub io_errors: u64,
    pub uptime_seconds: u64,
}
