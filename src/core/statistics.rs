//! Per-transport request counters.
//!
//! `total` counts every request since boot; `current` counts requests that
//! are in flight right now. Both are plain atomics shared by all listener
//! tasks, the only in-memory state of the tracker besides the UDP connection
//! map.
use std::sync::atomic::{AtomicI64, Ordering};

/// Shared transport counters, updated with atomic adds.
#[derive(Debug, Default)]
pub struct Metrics {
    http_total: AtomicI64,
    http_current: AtomicI64,
    udp_total: AtomicI64,
    udp_current: AtomicI64,
}

/// A point-in-time copy of the [`Metrics`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub http_total: i64,
    pub http_current: i64,
    pub udp_total: i64,
    pub udp_current: i64,
}

impl Metrics {
    pub fn http_request_started(&self) {
        self.http_total.fetch_add(1, Ordering::Relaxed);
        self.http_current.fetch_add(1, Ordering::Relaxed);
    }

    pub fn http_request_finished(&self) {
        self.http_current.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn udp_request_started(&self) {
        self.udp_total.fetch_add(1, Ordering::Relaxed);
        self.udp_current.fetch_add(1, Ordering::Relaxed);
    }

    pub fn udp_request_finished(&self) {
        self.udp_current.fetch_sub(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            http_total: self.http_total.load(Ordering::Relaxed),
            http_current: self.http_current.load(Ordering::Relaxed),
            udp_total: self.udp_total.load(Ordering::Relaxed),
            udp_current: self.udp_current.load(Ordering::Relaxed),
        }
    }
}
