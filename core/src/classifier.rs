//! Risk classification — maps a raw 0–100 score onto a severity tier.
//!
//! RULE: A risk level is never stored independently of its score.
//! Every `Transaction::risk_level` is produced by `classify()`.
//!
//! Tier boundaries (lower bound inclusive):
//!   score >= 80  -> Critical
//!   score >= 60  -> High
//!   score >= 40  -> Medium
//!   otherwise    -> Low
//!
//! Scores outside [0, 100] are an upstream contract violation and are
//! rejected, never clamped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

const CRITICAL_FLOOR: i64 = 80;
const HIGH_FLOOR: i64 = 60;
const MEDIUM_FLOOR: i64 = 40;

/// Ordered severity tiers. Declaration order is the rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// All levels in rank order. Distributions are emitted in this order.
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Low      => "Low",
            Self::Medium   => "Medium",
            Self::High     => "High",
            Self::Critical => "Critical",
        }
    }

    /// Anything above Low counts towards the suspicious population.
    pub fn is_suspicious(&self) -> bool {
        *self != Self::Low
    }

    /// Fixed chart color for this tier.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low      => "hsl(150 70% 45%)",
            Self::Medium   => "hsl(40 95% 55%)",
            Self::High     => "hsl(25 95% 55%)",
            Self::Critical => "hsl(0 85% 55%)",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown risk level '{0}'")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRiskLevel(s.to_string()))
    }
}

/// A score outside [0, 100].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("risk score {score} outside [0, 100]")]
pub struct OutOfRangeScore {
    pub score: i64,
}

/// Classify a raw score. Total over [0, 100].
pub fn classify(score: i64) -> Result<RiskLevel, OutOfRangeScore> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(OutOfRangeScore { score });
    }
    let level = if score >= CRITICAL_FLOOR {
        RiskLevel::Critical
    } else if score >= HIGH_FLOOR {
        RiskLevel::High
    } else if score >= MEDIUM_FLOOR {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    Ok(level)
}
