//! Metric declarations for station tooling.
//!
//! Every metric the workspace emits is declared once here as a const
//! [`Metric`], so names and label keys cannot drift between call sites.
//! The `metrics` facade is re-exported. This crate installs no recorder:
//! the application embedding the client owns that choice, and until one is
//! installed every counter is a no-op. `stationctl` runs offline and
//! installs none.
//!
//! ```rust,ignore
//! use station_metrics::{describe_metrics, metric_defs, AdvertisementLabels};
//!
//! describe_metrics();
//! let labels = AdvertisementLabels::new(7, 0);
//! metrics::counter!(metric_defs::ADV_DECODED.name, &labels.with_kind("state")).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Counter, gauge or histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use station_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("station.example.frames")
///     .with_description("Frames seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["opcode"]);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Label keys call sites are expected to attach.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metrics emitted by the workspace.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Advertisement Scanner
    // ========================================================================

    /// Broadcasts decoded into a record.
    ///
    /// Labels: opcode, subtype, kind
    pub const ADV_DECODED: Metric = Metric::counter("station.adv.decoded")
        .with_description("Advertisements decoded into a service data record")
        .with_unit(Unit::Count)
        .with_labels(&["opcode", "subtype", "kind"]);

    /// Broadcasts skipped: unknown opcode/sub-type, wrong length or no key.
    pub const ADV_SKIPPED: Metric = Metric::counter("station.adv.skipped")
        .with_description("Advertisements skipped without a record")
        .with_unit(Unit::Count)
        .with_labels(&["opcode", "subtype"]);

    /// Broadcasts dropped as repeats of a recently seen payload.
    pub const ADV_DUPLICATE: Metric = Metric::counter("station.adv.duplicate")
        .with_description("Advertisements dropped as duplicates")
        .with_unit(Unit::Count)
        .with_labels(&["opcode", "subtype"]);

    /// Broadcasts whose decoder failed.
    pub const ADV_FAILED: Metric = Metric::counter("station.adv.failed")
        .with_description("Advertisements whose decoder overran the payload")
        .with_unit(Unit::Count)
        .with_labels(&["opcode", "subtype"]);

    /// Background broadcasts whose time fell outside the tolerance.
    pub const ADV_UNVALIDATED: Metric = Metric::counter("station.adv.unvalidated")
        .with_description("Background broadcasts that failed time validation")
        .with_unit(Unit::Count);

    // ========================================================================
    // Client
    // ========================================================================

    /// Requests written to a station.
    ///
    /// Labels: command
    pub const CLIENT_REQUESTS: Metric = Metric::counter("station.client.requests")
        .with_description("Requests issued to a station")
        .with_unit(Unit::Count)
        .with_labels(&["command"]);

    /// Requests answered with a non-success result code.
    ///
    /// Labels: command, code
    pub const CLIENT_REJECTED: Metric = Metric::counter("station.client.rejected")
        .with_description("Requests the station answered with an error code")
        .with_unit(Unit::Count)
        .with_labels(&["command", "code"]);

    /// Requests that failed in the transport.
    pub const CLIENT_TRANSPORT_ERRORS: Metric = Metric::counter("station.client.transport_errors")
        .with_description("Requests that failed in the transport")
        .with_unit(Unit::Count)
        .with_labels(&["command"]);

    /// Time from write to response.
    pub const CLIENT_REQUEST_TIME: Metric = Metric::histogram("station.client.request_time_ms")
        .with_description("Request round-trip time in milliseconds")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["command"]);

    // ========================================================================
    // Behaviour Reconciliation
    // ========================================================================

    /// Completed reconciliation passes.
    pub const RECONCILE_PASSES: Metric = Metric::counter("station.reconcile.passes")
        .with_description("Reconciliation passes completed")
        .with_unit(Unit::Count);

    /// Passes aborted by an error or cancellation.
    pub const RECONCILE_FAILURES: Metric = Metric::counter("station.reconcile.failures")
        .with_description("Reconciliation passes aborted")
        .with_unit(Unit::Count);

    /// Behaviours fetched from a station.
    pub const RECONCILE_FETCHES: Metric = Metric::counter("station.reconcile.fetches")
        .with_description("Behaviours fetched during reconciliation")
        .with_unit(Unit::Count);

    /// Local rules not yet present on the station after a pass.
    pub const RECONCILE_PENDING: Metric = Metric::gauge("station.reconcile.pending_upload")
        .with_description("Local behaviours awaiting upload after the last pass")
        .with_unit(Unit::Count);

    pub const ALL: &[&Metric] = &[
        &ADV_DECODED,
        &ADV_SKIPPED,
        &ADV_DUPLICATE,
        &ADV_FAILED,
        &ADV_UNVALIDATED,
        &CLIENT_REQUESTS,
        &CLIENT_REJECTED,
        &CLIENT_TRANSPORT_ERRORS,
        &CLIENT_REQUEST_TIME,
        &RECONCILE_PASSES,
        &RECONCILE_FAILURES,
        &RECONCILE_FETCHES,
        &RECONCILE_PENDING,
    ];
}

/// Labels identifying an advertisement layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisementLabels {
    pub opcode: u8,
    pub subtype: u8,
}

impl AdvertisementLabels {
    pub fn new(opcode: u8, subtype: u8) -> Self {
        Self { opcode, subtype }
    }

    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("opcode", self.opcode.to_string()),
            ("subtype", self.subtype.to_string()),
        ]
    }

    /// Labels plus the decoded record kind.
    pub fn with_kind(&self, kind: &'static str) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.push(("kind", kind.to_string()));
        labels
    }
}

/// Register descriptions for every metric in [`metric_defs::ALL`].
///
/// Call once after installing a recorder; without one this does nothing.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
