//! Synthetic sample batches — the stand-in used when no scoring backend
//! is reachable.
//!
//! Generated transactions are only *scored*; they are classified by the
//! same aggregator as live data.

use crate::{
    rng::{RngBank, RngStream, StreamRng},
    transaction::{dedupe_reasons, ScoredTransaction},
};

pub const DEFAULT_SAMPLE_SIZE: usize = 150;

const FIRST_ID: u64 = 1001;
const MIN_AMOUNT: u64 = 100;
const MAX_AMOUNT: u64 = 50_099;
const MAX_REASONS: u64 = 4;

pub const REASON_VOCABULARY: [&str; 10] = [
    "Unusual transaction pattern",
    "High amount deviation",
    "Multiple rapid transactions",
    "Geographic anomaly",
    "New merchant category",
    "Time-based anomaly",
    "Velocity check failed",
    "Device fingerprint mismatch",
    "IP address suspicious",
    "Account behavior change",
];

pub struct SampleGenerator {
    bank:      RngBank,
    size:      usize,
    next_draw: u64,
}

impl SampleGenerator {
    pub fn new(seed: u64, size: usize) -> Self {
        Self {
            bank: RngBank::new(seed),
            size,
            next_draw: 0,
        }
    }

    /// Produce the next batch. Each call advances the draw counter.
    pub fn generate(&mut self) -> Vec<ScoredTransaction> {
        let mut rng = self.bank.for_stream(RngStream::SampleBatch, self.next_draw);
        self.next_draw += 1;

        let batch: Vec<ScoredTransaction> = (0..self.size as u64)
            .map(|i| sample_transaction(FIRST_ID + i, &mut rng))
            .collect();

        log::debug!(
            "{}: generated {} transactions (seed {}, draw {})",
            rng.name,
            batch.len(),
            self.bank.master_seed(),
            self.next_draw - 1
        );
        batch
    }
}

fn sample_transaction(serial: u64, rng: &mut StreamRng) -> ScoredTransaction {
    let risk_score = rng.next_in_range(0, 100) as i64;
    let reason_count = rng.next_in_range(1, MAX_REASONS);
    let reasons = (0..reason_count)
        .map(|_| {
            let idx = rng.next_u64_below(REASON_VOCABULARY.len() as u64) as usize;
            REASON_VOCABULARY[idx].to_string()
        })
        .collect();

    ScoredTransaction {
        id:         format!("TXN-{serial:06}"),
        amount:     rng.next_in_range(MIN_AMOUNT, MAX_AMOUNT) as f64,
        risk_score,
        reasons:    dedupe_reasons(reasons),
        period:     None,
    }
}
