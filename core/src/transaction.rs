//! Transaction records — scored input and classified output.

use crate::{
    classifier::{classify, RiskLevel},
    error::{DeskError, DeskResult},
    types::TransactionId,
};
use serde::{Deserialize, Deserializer, Serialize};

/// A transaction as delivered by the scorer, before classification.
///
/// `risk_score` is signed so that an out-of-contract score from upstream
/// is representable and can be rejected instead of wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTransaction {
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id:         TransactionId,
    pub amount:     f64,
    pub risk_score: i64,
    #[serde(default)]
    pub reasons:    Vec<String>,
    /// Reporting period label, when the source carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period:     Option<String>,
}

/// A classified transaction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id:         TransactionId,
    pub amount:     f64,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub reasons:    Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period:     Option<String>,
}

impl Transaction {
    /// Classify a scored transaction. The level is always derived from
    /// the score; reasons are deduplicated keeping first occurrence.
    pub fn classify(scored: ScoredTransaction) -> DeskResult<Self> {
        let risk_level = classify(scored.risk_score).map_err(|e| DeskError::OutOfRangeScore {
            transaction_id: scored.id.clone(),
            score:          e.score,
        })?;

        if !scored.amount.is_finite() || scored.amount < 0.0 {
            return Err(DeskError::InvalidAmount {
                transaction_id: scored.id,
                amount:         scored.amount,
            });
        }

        Ok(Self {
            id:         scored.id,
            amount:     scored.amount,
            // classify() bounds the score to [0, 100].
            risk_score: scored.risk_score as u8,
            risk_level,
            reasons:    dedupe_reasons(scored.reasons),
            period:     scored.period,
        })
    }

    pub fn is_suspicious(&self) -> bool {
        self.risk_level.is_suspicious()
    }
}

/// Remove repeated reasons, preserving first-occurrence order.
pub fn dedupe_reasons(reasons: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(reasons.len());
    for reason in reasons {
        if !out.contains(&reason) {
            out.push(reason);
        }
    }
    out
}

/// Scorers built on dataframes emit numeric ids when the source column
/// is numeric.
fn id_from_text_or_number<'de, D>(deserializer: D) -> Result<TransactionId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id)    => id,
        RawId::Integer(id) => id.to_string(),
        RawId::Float(id)   => id.to_string(),
    })
}
