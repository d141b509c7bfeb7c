//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the reservation
//! core.
//!
//! # Metrics
//!
//! - `booking_reservations_confirmed_total` - Total confirmed reservations
//! - `booking_reservations_cancelled_total` - Total cancelled reservations
//! - `booking_reserve_failures_total` - Failed reserve calls, by error kind
//! - `booking_reserve_duration_seconds` - Histogram of reserve latencies
//! - `booking_lock_wait_duration_seconds` - Histogram of lock wait times
//! - `booking_resources` - Registered resources

use crate::error;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

/// Metrics collector
///
/// Every metric registers on the collector's own registry rather than the
/// process-global one, so independent instances (one per open coordinator)
/// never collide.
#[derive(Clone)]
pub struct Metrics {
    /// Total confirmed reservations
    pub reservations_confirmed: IntCounter,

    /// Total cancelled reservations
    pub reservations_cancelled: IntCounter,

    /// Failed reserve calls, labelled by error kind
    pub reserve_failures: IntCounterVec,

    /// Reserve duration histogram
    pub reserve_duration: Histogram,

    /// Lock wait histogram
    pub lock_wait_duration: Histogram,

    /// Registered resources
    pub resources: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let reservations_confirmed = IntCounter::with_opts(Opts::new(
            "booking_reservations_confirmed_total",
            "Total confirmed reservations",
        ))?;
        registry.register(Box::new(reservations_confirmed.clone()))?;

        let reservations_cancelled = IntCounter::with_opts(Opts::new(
            "booking_reservations_cancelled_total",
            "Total cancelled reservations",
        ))?;
        registry.register(Box::new(reservations_cancelled.clone()))?;

        let reserve_failures = IntCounterVec::new(
            Opts::new(
                "booking_reserve_failures_total",
                "Failed reserve calls, by error kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(reserve_failures.clone()))?;

        let reserve_duration = Histogram::with_opts(
            HistogramOpts::new(
                "booking_reserve_duration_seconds",
                "Histogram of reserve latencies",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0,
            ]),
        )?;
        registry.register(Box::new(reserve_duration.clone()))?;

        let lock_wait_duration = Histogram::with_opts(
            HistogramOpts::new(
                "booking_lock_wait_duration_seconds",
                "Histogram of lock wait times",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0,
            ]),
        )?;
        registry.register(Box::new(lock_wait_duration.clone()))?;

        let resources = IntGauge::with_opts(Opts::new("booking_resources", "Registered resources"))?;
        registry.register(Box::new(resources.clone()))?;

        Ok(Self {
            reservations_confirmed,
            reservations_cancelled,
            reserve_failures,
            reserve_duration,
            lock_wait_duration,
            resources,
            registry,
        })
    }

    /// Record one finished reserve call
    pub fn observe_reserve<T>(&self, duration_seconds: f64, result: &error::Result<T>) {
        self.reserve_duration.observe(duration_seconds);
        match result {
            Ok(_) => self.reservations_confirmed.inc(),
            Err(e) => self.reserve_failures.with_label_values(&[e.kind()]).inc(),
        }
    }

    /// Record lock wait time
    pub fn observe_lock_wait(&self, duration_seconds: f64) {
        self.lock_wait_duration.observe(duration_seconds);
    }

    /// Record a successful cancellation
    pub fn record_cancelled(&self) {
        self.reservations_cancelled.inc();
    }

    /// Record a newly registered resource
    pub fn record_resource_registered(&self) {
        self.resources.inc();
    }

    /// Set the resource gauge (startup estimate)
    pub fn set_resources(&self, count: i64) {
        self.resources.set(count);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
