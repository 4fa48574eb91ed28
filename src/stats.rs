//! Aggregate statistics and process-capability indices over a unified view.
//!
//! Dispersion uses the sample standard deviation (N-1 denominator); a single
//! record has a standard deviation of `0`. Limits are stored per record, so
//! capability indices are computed against one representative (USL, LSL)
//! pair chosen by [`LimitPolicy`]. Indices that cannot be defined (zero or
//! non-finite spread, USL <= LSL, mixed limits under
//! [`LimitPolicy::RequireUniform`]) are `None` rather than NaN or infinity.
//!
//! Mean and deviation are accumulated on values divided by the largest
//! magnitude, so sums of finite values near `f64::MAX` stay finite.

use crate::config::LimitPolicy;
use crate::models::MeasurementRecord;
use serde::Serialize;
use tracing::warn;

/// Specification limits used for capability indices
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpecLimits {
    pub usl: f64,
    pub lsl: f64,
}

impl SpecLimits {
    pub fn of(record: &MeasurementRecord) -> Self {
        Self {
            usl: record.usl(),
            lsl: record.lsl(),
        }
    }

    /// Width of the specification window; not positive for degenerate limits
    pub fn width(&self) -> f64 {
        self.usl - self.lsl
    }
}

/// Process capability indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CapabilityIndices {
    /// (USL - LSL) / 6σ
    pub cp: Option<f64>,
    /// (USL - μ) / 3σ
    pub cpu: Option<f64>,
    /// (μ - LSL) / 3σ
    pub cpl: Option<f64>,
    /// min(CPU, CPL)
    pub cpk: Option<f64>,
}

impl CapabilityIndices {
    /// Indices for a process with the given mean and spread
    pub fn compute(mean: f64, std_dev: f64, limits: SpecLimits) -> Self {
        let defined = std_dev.is_finite()
            && std_dev > 0.0
            && mean.is_finite()
            && limits.usl.is_finite()
            && limits.lsl.is_finite()
            && limits.width().is_finite()
            && limits.width() > 0.0;
        if !defined {
            return Self::unavailable();
        }

        let cpu = (limits.usl - mean) / (3.0 * std_dev);
        let cpl = (mean - limits.lsl) / (3.0 * std_dev);
        Self {
            cp: Some(limits.width() / (6.0 * std_dev)),
            cpu: Some(cpu),
            cpl: Some(cpl),
            cpk: Some(cpu.min(cpl)),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.cpk.is_some()
    }
}

/// Summary statistics for a set of measurement records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub in_spec_count: usize,
    pub out_of_spec_count: usize,
    /// Fraction in `[0, 1]`
    pub out_of_spec_rate: f64,
    /// Representative limits the capability indices were computed against
    pub spec_limits: SpecLimits,
    /// Whether every record carries the representative limits
    pub limits_uniform: bool,
    pub capability: CapabilityIndices,
}

impl StatsSummary {
    pub fn out_of_spec_percent(&self) -> f64 {
        self.out_of_spec_rate * 100.0
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Stats: n={} | mean {:.4} | sd {:.4} | range [{:.4}, {:.4}] | out of spec {} ({:.1}%) | Cpk {}",
            self.count,
            self.mean,
            self.std_dev,
            self.min,
            self.max,
            self.out_of_spec_count,
            self.out_of_spec_percent(),
            format_index(self.capability.cpk)
        )
    }
}

/// Render an optional capability index, `n/a` when undefined
pub fn format_index(index: Option<f64>) -> String {
    match index {
        Some(value) => format!("{:.3}", value),
        None => "n/a".to_string(),
    }
}

/// Statistics using the first record's limits. `None` for an empty slice.
pub fn compute_stats(records: &[MeasurementRecord]) -> Option<StatsSummary> {
    compute_stats_with_policy(records, LimitPolicy::FirstRecord)
}

/// Statistics with an explicit representative-limit policy. `None` for an empty slice.
pub fn compute_stats_with_policy(
    records: &[MeasurementRecord],
    policy: LimitPolicy,
) -> Option<StatsSummary> {
    let first = records.first()?;
    let count = records.len();
    let n = count as f64;

    let (mean, std_dev) = mean_and_std_dev(records);

    let (min, max) = records.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r.value()), hi.max(r.value()))
    });

    let out_of_spec_count = records.iter().filter(|r| r.is_out_of_spec()).count();

    let spec_limits = SpecLimits::of(first);
    let limits_uniform = records.iter().all(|r| SpecLimits::of(r) == spec_limits);

    let capability = match (policy, limits_uniform) {
        (LimitPolicy::RequireUniform, false) => {
            warn!("Specification limits vary across records; capability indices withheld");
            CapabilityIndices::unavailable()
        }
        (LimitPolicy::FirstRecord, false) => {
            warn!(
                "Specification limits vary across records; using first record's USL {} / LSL {}",
                spec_limits.usl, spec_limits.lsl
            );
            CapabilityIndices::compute(mean, std_dev, spec_limits)
        }
        (_, true) => CapabilityIndices::compute(mean, std_dev, spec_limits),
    };

    Some(StatsSummary {
        count,
        mean,
        std_dev,
        min,
        max,
        range: max - min,
        in_spec_count: count - out_of_spec_count,
        out_of_spec_count,
        out_of_spec_rate: out_of_spec_count as f64 / n,
        spec_limits,
        limits_uniform,
        capability,
    })
}

/// Mean and sample standard deviation of the record values
fn mean_and_std_dev(records: &[MeasurementRecord]) -> (f64, f64) {
    let n = records.len() as f64;
    let largest = records.iter().map(|r| r.value().abs()).fold(0.0, f64::max);
    let scale = if largest > 0.0 && largest.is_finite() {
        largest
    } else {
        1.0
    };

    let scaled_mean = records.iter().map(|r| r.value() / scale).sum::<f64>() / n;
    let std_dev = if records.len() > 1 {
        let sum_sq = records
            .iter()
            .map(|r| (r.value() / scale - scaled_mean).powi(2))
            .sum::<f64>();
        scale * (sum_sq / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    (scaled_mean * scale, std_dev)
}
