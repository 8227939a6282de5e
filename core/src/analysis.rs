//! The analysis snapshot produced by one aggregation run.
//!
//! RULE: An `AnalysisResult` is never edited in place once published.
//! A new batch produces a new result that replaces the old one whole.

use crate::{classifier::RiskLevel, transaction::Transaction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a batch came from. Demo data is never presented as live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Scored by the remote service (or a scored file on disk).
    Live,
    /// Locally generated stand-in data.
    Demo,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Demo => "demo",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_transactions: usize,
    pub suspicious_count:   usize,
    /// Percentage in [0, 100]. Zero for an empty batch.
    pub fraud_rate:         f64,
    pub total_at_risk:      f64,
}

/// One slice of the risk distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBucket {
    pub level: RiskLevel,
    pub count: usize,
    pub color: String,
}

/// Fraudulent vs normal counts for one reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBucket {
    pub name:       String,
    pub fraudulent: usize,
    pub normal:     usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudComparison {
    pub periods:     Vec<PeriodBucket>,
    /// True when the split is a proportional estimate rather than a count
    /// of real period data. Approximate buckets need not sum to the totals.
    pub approximate: bool,
}

impl FraudComparison {
    pub fn total_fraudulent(&self) -> usize {
        self.periods.iter().map(|p| p.fraudulent).sum()
    }

    pub fn total_normal(&self) -> usize {
        self.periods.iter().map(|p| p.normal).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub transactions:      Vec<Transaction>,
    pub statistics:        Statistics,
    pub risk_distribution: Vec<RiskBucket>,
    pub fraud_comparison:  FraudComparison,
    pub provenance:        Provenance,
}

impl AnalysisResult {
    pub fn is_demo(&self) -> bool {
        self.provenance == Provenance::Demo
    }

    pub fn count_for(&self, level: RiskLevel) -> usize {
        self.risk_distribution
            .iter()
            .find(|b| b.level == level)
            .map(|b| b.count)
            .unwrap_or(0)
    }

    /// Replace the comparison with one reported by the scoring service,
    /// but only when it accounts for exactly the re-aggregated totals.
    /// Returns whether the reported periods were adopted.
    pub fn adopt_reported_periods(&mut self, reported: Vec<PeriodBucket>) -> bool {
        let fraudulent: usize = reported.iter().map(|p| p.fraudulent).sum();
        let normal: usize = reported.iter().map(|p| p.normal).sum();
        let expected_normal =
            self.statistics.total_transactions - self.statistics.suspicious_count;

        if reported.is_empty()
            || fraudulent != self.statistics.suspicious_count
            || normal != expected_normal
        {
            log::warn!(
                "reported fraud comparison ({fraudulent} fraudulent / {normal} normal) \
                 disagrees with batch totals ({} / {expected_normal}); keeping local buckets",
                self.statistics.suspicious_count
            );
            return false;
        }

        self.fraud_comparison = FraudComparison {
            periods:     reported,
            approximate: false,
        };
        true
    }
}
