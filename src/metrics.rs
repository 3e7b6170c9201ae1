//! Prometheus metrics collection for fmacd.
//!
//! Exposed on the optional HTTP endpoint. Every recorder is a no-op until
//! [`init`] has run, so library code and unit tests can call them freely.
//!
//! - `fmac_admissions_total{outcome}` - admission attempts by result
//! - `fmac_authorizations_total{decision}` - rule table decisions
//! - `fmac_escalations_total{result}` - escalation results
//! - `fmac_capabilities_total{result}` - capability issuance results
//! - `fmac_control_commands_total{command}` - control plane commands
//! - `fmac_control_command_duration_seconds{command}` - control plane latency

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Admission attempts by outcome (`admitted` or a rejection code).
pub static ADMISSIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Authorization decisions (`allow` / `deny`).
pub static AUTHORIZATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Escalation results.
pub static ESCALATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Capability issuance results.
pub static CAPABILITIES: OnceLock<IntCounterVec> = OnceLock::new();

/// Control plane commands by name.
pub static CONTROL_COMMANDS: OnceLock<IntCounterVec> = OnceLock::new();

/// Control plane command latency.
pub static CONTROL_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

// ========================================================================
// Gauges
// ========================================================================

/// Installed authorization rules.
pub static RULES_INSTALLED: OnceLock<IntGauge> = OnceLock::new();

/// Capability handles currently installed across all callers.
pub static HANDLES_INSTALLED: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Called once at startup. Later calls leave the first registration in place.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(ADMISSIONS, IntCounterVec::new(Opts::new("fmac_admissions_total", "Admission attempts by outcome"), &["outcome"]));
    register!(AUTHORIZATIONS, IntCounterVec::new(Opts::new("fmac_authorizations_total", "Path authorization decisions"), &["decision"]));
    register!(ESCALATIONS, IntCounterVec::new(Opts::new("fmac_escalations_total", "Privilege escalations by result"), &["result"]));
    register!(CAPABILITIES, IntCounterVec::new(Opts::new("fmac_capabilities_total", "Capability issuance by result"), &["result"]));
    register!(CONTROL_COMMANDS, IntCounterVec::new(Opts::new("fmac_control_commands_total", "Control plane commands by name"), &["command"]));
    register!(CONTROL_LATENCY, HistogramVec::new(
        HistogramOpts::new("fmac_control_command_duration_seconds", "Control plane command latency")
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
        &["command"]));
    register!(RULES_INSTALLED, IntGauge::new("fmac_rules_installed", "Installed authorization rules"));
    register!(HANDLES_INSTALLED, IntGauge::new("fmac_handles_installed", "Installed capability handles"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recorders
// ============================================================================

fn inc(metric: &OnceLock<IntCounterVec>, label: &str) {
    if let Some(c) = metric.get() {
        c.with_label_values(&[label]).inc();
    }
}

#[inline]
pub fn record_admission(outcome: &str) {
    inc(&ADMISSIONS, outcome);
}

#[inline]
pub fn record_authorization(decision: &str) {
    inc(&AUTHORIZATIONS, decision);
}

#[inline]
pub fn record_escalation(result: &str) {
    inc(&ESCALATIONS, result);
}

#[inline]
pub fn record_capability(result: &str) {
    inc(&CAPABILITIES, result);
}

/// Record a control command with its latency.
#[inline]
pub fn record_control_command(command: &str, duration_secs: f64) {
    inc(&CONTROL_COMMANDS, command);
    if let Some(h) = CONTROL_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

#[inline]
pub fn set_rules_installed(count: usize) {
    if let Some(g) = RULES_INSTALLED.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn set_handles_installed(count: usize) {
    if let Some(g) = HANDLES_INSTALLED.get() {
        g.set(count as i64);
    }
}
