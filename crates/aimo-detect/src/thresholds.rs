//! Detector thresholds (`spec.md` §4.5), overridable by configuration.

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct Thresholds {
    /// Default 1 MiB (1_048_576 bytes). Predicate A.
    pub a_min_bytes: u64,
    /// Write-method HTTP verbs (`spec.md` §4.4): POST/PUT/PATCH/DELETE.
    pub write_methods: BTreeSet<String>,
    /// `app_category` values considered high-risk for predicate B(i).
    pub high_risk_categories: BTreeSet<String>,
    /// Predicate B(ii): write-method event count within a 5-minute window.
    pub burst_threshold: u32,
    /// Predicate B(iii): cumulative bytes_sent within a UTC day, in bytes.
    pub cumulative_threshold_bytes: u64,
    /// Predicate C: coverage-sample rate, default 0.02.
    pub sample_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            a_min_bytes: 1_048_576,
            write_methods: ["POST", "PUT", "PATCH", "DELETE"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            high_risk_categories: ["genai", "ai", "unknown", "uncategorized"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            burst_threshold: 20,
            cumulative_threshold_bytes: 20 * 1024 * 1024,
            sample_rate: 0.02,
        }
    }
}

impl Thresholds {
    #[must_use]
    pub fn is_write_method(&self, method: Option<&str>) -> bool {
        method
            .map(|m| self.write_methods.contains(&m.to_ascii_uppercase()))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_high_risk_category(&self, category: Option<&str>) -> bool {
        category
            .map(|c| self.high_risk_categories.contains(&c.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// The integer sample threshold used against `hash mod 10000`
    /// (`spec.md` §4.5: `⌊sample_rate · 10000⌋`).
    #[must_use]
    pub fn sample_threshold(&self) -> u64 {
        (self.sample_rate * 10_000.0).floor() as u64
    }
}
