//! Upload boundary — file-type gate and the local scored-CSV reader.
//!
//! RULE: Nothing that fails the gate reaches the aggregator.

use crate::{
    error::{DeskError, DeskResult},
    transaction::ScoredTransaction,
};
use serde::Deserialize;
use std::path::Path;

pub const ACCEPTED_EXTENSION: &str = "csv";

/// Separator for the reasons column of a scored CSV.
const REASON_DELIMITER: char = ';';

/// Reject anything that is not a `.csv` file (case-insensitive).
pub fn check_file_type(file_name: &str) -> DeskResult<()> {
    let accepted = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ACCEPTED_EXTENSION));

    if accepted {
        Ok(())
    } else {
        Err(DeskError::UnsupportedFileType {
            file_name: file_name.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScoredRow {
    id: String,
    amount: f64,
    #[serde(rename = "riskScore", alias = "risk_score")]
    risk_score: i64,
    #[serde(default)]
    reasons: String,
    #[serde(default)]
    period: Option<String>,
}

/// Parse an already-scored batch: header `id,amount,riskScore,reasons[,period]`,
/// reasons separated by `;`.
pub fn read_scored_csv(content: &str) -> DeskResult<Vec<ScoredTransaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut batch = Vec::new();
    for row in reader.deserialize::<ScoredRow>() {
        let row = row?;
        let reasons = row
            .reasons
            .split(REASON_DELIMITER)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        batch.push(ScoredTransaction {
            id:         row.id,
            amount:     row.amount,
            risk_score: row.risk_score,
            reasons,
            period:     row.period.filter(|p| !p.is_empty()),
        });
    }
    log::debug!("upload: parsed {} scored rows", batch.len());
    Ok(batch)
}
