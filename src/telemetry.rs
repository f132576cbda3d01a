use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error_mode::ErrorMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Receives operator-facing diagnostics, such as failures swallowed by
/// the `ignore` error mode.
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, level: DiagnosticLevel, message: &str);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn emit(&self, level: DiagnosticLevel, message: &str) {
        match level {
            DiagnosticLevel::Debug => tracing::debug!(target: "telemetry_transform::diagnostics", "{}", message),
            DiagnosticLevel::Info => tracing::info!(target: "telemetry_transform::diagnostics", "{}", message),
            DiagnosticLevel::Warn => tracing::warn!(target: "telemetry_transform::diagnostics", "{}", message),
            DiagnosticLevel::Error => tracing::error!(target: "telemetry_transform::diagnostics", "{}", message),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NopDiagnostics;

impl DiagnosticsSink for NopDiagnostics {
    fn emit(&self, _level: DiagnosticLevel, _message: &str) {}
}

/// Counters a processor reports while it runs. All methods default to no-ops.
pub trait ProcessorMetrics: Send + Sync {
    fn batch_processed(&self) {}

    /// `applied` is false when the statement's own `where` clause did not hold.
    fn statement_executed(&self, _applied: bool) {}

    fn node_skipped(&self) {}

    fn error_handled(&self, _mode: ErrorMode) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NopMetrics;

impl ProcessorMetrics for NopMetrics {}

#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    batches: AtomicU64,
    statements_applied: AtomicU64,
    statements_skipped: AtomicU64,
    nodes_skipped: AtomicU64,
    errors_propagated: AtomicU64,
    errors_ignored: AtomicU64,
    errors_silenced: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub batches: u64,
    pub statements_applied: u64,
    pub statements_skipped: u64,
    pub nodes_skipped: u64,
    pub errors_propagated: u64,
    pub errors_ignored: u64,
    pub errors_silenced: u64,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            statements_applied: self.statements_applied.load(Ordering::Relaxed),
            statements_skipped: self.statements_skipped.load(Ordering::Relaxed),
            nodes_skipped: self.nodes_skipped.load(Ordering::Relaxed),
            errors_propagated: self.errors_propagated.load(Ordering::Relaxed),
            errors_ignored: self.errors_ignored.load(Ordering::Relaxed),
            errors_silenced: self.errors_silenced.load(Ordering::Relaxed),
        }
    }
}

impl ProcessorMetrics for InMemoryMetrics {
    fn batch_processed(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    fn statement_executed(&self, applied: bool) {
        let counter = if applied {
            &self.statements_applied
        } else {
            &self.statements_skipped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn node_skipped(&self) {
        self.nodes_skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn error_handled(&self, mode: ErrorMode) {
        let counter = match mode {
            ErrorMode::Propagate => &self.errors_propagated,
            ErrorMode::Ignore => &self.errors_ignored,
            ErrorMode::Silent => &self.errors_silenced,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Diagnostics and metrics handed to a processor at construction.
#[derive(Clone)]
pub struct TelemetrySettings {
    pub diagnostics: Arc<dyn DiagnosticsSink>,
    pub metrics: Arc<dyn ProcessorMetrics>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            diagnostics: Arc::new(TracingDiagnostics),
            metrics: Arc::new(NopMetrics),
        }
    }
}

impl std::fmt::Debug for TelemetrySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetrySettings").finish_non_exhaustive()
    }
}

impl TelemetrySettings {
    /// Settings that record nothing.
    pub fn nop() -> Self {
        Self {
            diagnostics: Arc::new(NopDiagnostics),
            metrics: Arc::new(NopMetrics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn ProcessorMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}
