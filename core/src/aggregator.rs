//! Aggregator — one deterministic fold from a scored batch to an
//! `AnalysisResult`.
//!
//! STEPS:
//!   1. Classify every transaction. Any rejected score or amount aborts
//!      the whole batch; partially classified output is never produced.
//!   2. Statistics.
//!   3. Risk distribution (all four levels, zero counts kept).
//!   4. Fraud comparison:
//!        - every transaction carries a period  -> exact per-period counts
//!        - live data without periods           -> one exact "Analysis" bucket
//!        - demo data                           -> fixed proportional split,
//!                                                 flagged approximate

use crate::{
    analysis::{
        AnalysisResult, FraudComparison, PeriodBucket, Provenance, RiskBucket, Statistics,
    },
    classifier::RiskLevel,
    error::DeskResult,
    transaction::{ScoredTransaction, Transaction},
};

/// Label of the single bucket used when live data has no period field.
pub const WHOLE_BATCH_PERIOD: &str = "Analysis";

/// Demo split: (period, % of suspicious count, % of Low count).
/// Each share is floored independently, so buckets may undercount.
pub const DEMO_PERIOD_SHARES: [(&str, usize, usize); 4] = [
    ("Q1", 20, 25),
    ("Q2", 30, 30),
    ("Q3", 25, 25),
    ("Q4", 25, 20),
];

/// Classify and summarise a batch.
pub fn aggregate(
    batch: Vec<ScoredTransaction>,
    provenance: Provenance,
) -> DeskResult<AnalysisResult> {
    let mut transactions = Vec::with_capacity(batch.len());
    let mut level_counts = [0usize; 4];
    let mut total_at_risk = 0.0;

    for scored in batch {
        let txn = Transaction::classify(scored)?;
        level_counts[txn.risk_level.rank() as usize] += 1;
        if txn.is_suspicious() {
            total_at_risk += txn.amount;
        }
        transactions.push(txn);
    }

    let total = transactions.len();
    let low = level_counts[RiskLevel::Low.rank() as usize];
    let suspicious = total - low;
    let fraud_rate = if total == 0 {
        0.0
    } else {
        suspicious as f64 * 100.0 / total as f64
    };

    let statistics = Statistics {
        total_transactions: total,
        suspicious_count:   suspicious,
        fraud_rate,
        total_at_risk,
    };

    let risk_distribution = RiskLevel::ALL
        .iter()
        .map(|level| RiskBucket {
            level: *level,
            count: level_counts[level.rank() as usize],
            color: level.color().to_string(),
        })
        .collect();

    let fraud_comparison = match provenance {
        Provenance::Demo => proportional_comparison(suspicious, low),
        Provenance::Live => match exact_period_comparison(&transactions) {
            Some(comparison) => comparison,
            None => whole_batch_comparison(suspicious, low),
        },
    };

    log::debug!(
        "aggregated {total} transactions ({provenance}): {suspicious} suspicious, {:.1}% rate",
        fraud_rate
    );

    Ok(AnalysisResult {
        transactions,
        statistics,
        risk_distribution,
        fraud_comparison,
        provenance,
    })
}

/// Bucket by each transaction's own period, in first-appearance order.
/// Returns None unless the batch is non-empty and fully labelled.
fn exact_period_comparison(transactions: &[Transaction]) -> Option<FraudComparison> {
    if transactions.is_empty() || transactions.iter().any(|t| t.period.is_none()) {
        return None;
    }

    let mut periods: Vec<PeriodBucket> = Vec::new();
    for txn in transactions {
        let name = txn.period.as_deref()?;
        let idx = match periods.iter().position(|p| p.name == name) {
            Some(idx) => idx,
            None => {
                periods.push(PeriodBucket {
                    name:       name.to_string(),
                    fraudulent: 0,
                    normal:     0,
                });
                periods.len() - 1
            }
        };
        if txn.is_suspicious() {
            periods[idx].fraudulent += 1;
        } else {
            periods[idx].normal += 1;
        }
    }

    Some(FraudComparison {
        periods,
        approximate: false,
    })
}

fn whole_batch_comparison(suspicious: usize, normal: usize) -> FraudComparison {
    FraudComparison {
        periods: vec![PeriodBucket {
            name:       WHOLE_BATCH_PERIOD.to_string(),
            fraudulent: suspicious,
            normal,
        }],
        approximate: false,
    }
}

fn proportional_comparison(suspicious: usize, normal: usize) -> FraudComparison {
    let periods = DEMO_PERIOD_SHARES
        .iter()
        .map(|(name, fraud_pct, normal_pct)| PeriodBucket {
            name:       (*name).to_string(),
            fraudulent: suspicious * fraud_pct / 100,
            normal:     normal * normal_pct / 100,
        })
        .collect();

    FraudComparison {
        periods,
        approximate: true,
    }
}
