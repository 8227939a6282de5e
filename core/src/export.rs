//! Exporter — the suspicious (non-Low) population as CSV.
//!
//! Export ignores any table view state: it always covers every
//! suspicious transaction of the batch, in batch order.

use crate::{error::DeskResult, transaction::Transaction};
use std::path::{Path, PathBuf};

pub const SUSPICIOUS_EXPORT_FILE_NAME: &str = "suspicious_transactions.csv";

pub const EXPORT_HEADER: [&str; 5] = ["ID", "Amount", "Risk Score", "Risk Level", "Reasons"];

/// Separator for the reasons column. Never a comma.
pub const REASON_SEPARATOR: &str = "; ";

/// Serialize every suspicious transaction, header first.
pub fn export_suspicious(transactions: &[Transaction]) -> DeskResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;

    let mut rows = 0usize;
    for txn in transactions.iter().filter(|t| t.is_suspicious()) {
        writer.write_record([
            txn.id.clone(),
            txn.amount.to_string(),
            txn.risk_score.to_string(),
            txn.risk_level.to_string(),
            txn.reasons.join(REASON_SEPARATOR),
        ])?;
        rows += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing export buffer: {e}"))?;
    let text = String::from_utf8(bytes).map_err(|e| anyhow::anyhow!("export is not UTF-8: {e}"))?;
    log::debug!("export: {rows} suspicious rows");
    Ok(text)
}

/// Write the export artifact into `dir`. Returns the file path.
pub fn write_suspicious(transactions: &[Transaction], dir: &Path) -> DeskResult<PathBuf> {
    let path = dir.join(SUSPICIOUS_EXPORT_FILE_NAME);
    std::fs::write(&path, export_suspicious(transactions)?)?;
    log::info!("export: wrote {}", path.display());
    Ok(path)
}
