//! Shared primitive types used across the whole desk.

/// A stable, unique identifier for a transaction within one batch.
pub type TransactionId = String;

/// Identity of one acquisition request. Strictly increasing per session.
pub type RequestId = u64;

/// Identifier of one published analysis (uuid v4).
pub type AnalysisId = String;
