//! Table engine — view state and the pure filter → sort → paginate
//! projection over a published `AnalysisResult`.
//!
//! RULES:
//!   - `project()` never mutates its inputs and never fails.
//!   - Sorting is stable: equal keys keep their batch order, in both
//!     directions.
//!   - `page_count` is at least 1, even for an empty filtered set.
//!   - A returned page index is always in range.

use crate::{
    analysis::AnalysisResult,
    classifier::RiskLevel,
    transaction::Transaction,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::num::NonZeroUsize;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Id,
    Amount,
    RiskScore,
    RiskLevel,
}

impl SortColumn {
    /// Accepts `id`, `amount`, `risk_score`/`riskScore`/`score`,
    /// `risk_level`/`riskLevel`/`level`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "").as_str() {
            "id"                   => Some(Self::Id),
            "amount"               => Some(Self::Amount),
            "riskscore" | "score"  => Some(Self::RiskScore),
            "risklevel" | "level"  => Some(Self::RiskLevel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn flipped(self) -> Self {
        match self {
            Self::Asc  => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "level")]
pub enum RiskFilter {
    #[default]
    All,
    Level(RiskLevel),
}

impl RiskFilter {
    pub fn matches(&self, txn: &Transaction) -> bool {
        match self {
            Self::All          => true,
            Self::Level(level) => txn.risk_level == *level,
        }
    }

    /// Parse `all` or a level name, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        s.parse::<RiskLevel>().ok().map(Self::Level)
    }
}

/// Per-session table state. Owned and mutated by the view layer only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub sort_column:    Option<SortColumn>,
    pub sort_direction: SortDirection,
    pub risk_filter:    RiskFilter,
    pub page_index:     usize,
    pub page_size:      NonZeroUsize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::with_page_size(NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

impl ViewState {
    pub fn with_page_size(page_size: NonZeroUsize) -> Self {
        Self {
            sort_column:    None,
            sort_direction: SortDirection::Asc,
            risk_filter:    RiskFilter::All,
            page_index:     0,
            page_size,
        }
    }

    /// Header click: same column flips direction, a new column starts
    /// ascending. Either way the view returns to the first page.
    pub fn toggle_sort(&mut self, column: SortColumn) {
        if self.sort_column == Some(column) {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_column = Some(column);
            self.sort_direction = SortDirection::Asc;
        }
        self.page_index = 0;
    }

    pub fn clear_sort(&mut self) {
        self.sort_column = None;
        self.sort_direction = SortDirection::Asc;
        self.page_index = 0;
    }

    /// Changing the filter always returns to the first page.
    pub fn set_risk_filter(&mut self, filter: RiskFilter) {
        self.risk_filter = filter;
        self.page_index = 0;
    }

    /// Advance one page. No-op on the last page.
    pub fn next_page(&mut self, result: &AnalysisResult) {
        let last = self.page_count(result) - 1;
        if self.page_index < last {
            self.page_index += 1;
        }
    }

    /// Go back one page. No-op on the first page.
    pub fn prev_page(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    /// Jump to a page, clamped into range.
    pub fn go_to_page(&mut self, result: &AnalysisResult, page_index: usize) {
        self.page_index = page_index.min(self.page_count(result) - 1);
    }

    /// Re-anchor this state onto a newly published result: a page index
    /// that no longer exists is pulled back to the last page.
    pub fn rebase(&mut self, result: &AnalysisResult) {
        let last = self.page_count(result) - 1;
        if self.page_index > last {
            log::debug!("view: page {} out of range after rebase, clamping to {last}", self.page_index);
            self.page_index = last;
        }
    }

    pub fn can_next_page(&self, result: &AnalysisResult) -> bool {
        self.page_index + 1 < self.page_count(result)
    }

    pub fn can_prev_page(&self) -> bool {
        self.page_index > 0
    }

    fn page_count(&self, result: &AnalysisResult) -> usize {
        let filtered = result
            .transactions
            .iter()
            .filter(|t| self.risk_filter.matches(t))
            .count();
        page_count(filtered, self.page_size)
    }
}

/// The visible window of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub rows:                 Vec<Transaction>,
    pub page_index:           usize,
    pub page_count:           usize,
    pub total_filtered_count: usize,
}

impl TableView {
    /// 1-based inclusive row range for the "Showing X to Y of Z" footer.
    /// `(0, 0)` for an empty table.
    pub fn showing_range(&self, page_size: NonZeroUsize) -> (usize, usize) {
        if self.rows.is_empty() {
            return (0, 0);
        }
        let first = self.page_index * page_size.get() + 1;
        (first, first + self.rows.len() - 1)
    }
}

/// Filter, stable-sort, then slice one page.
pub fn project(result: &AnalysisResult, state: &ViewState) -> TableView {
    let mut filtered: Vec<&Transaction> = result
        .transactions
        .iter()
        .filter(|t| state.risk_filter.matches(t))
        .collect();

    if let Some(column) = state.sort_column {
        // sort_by is stable; reversing the comparator keeps ties in order.
        filtered.sort_by(|a, b| {
            let ord = compare_by(column, a, b);
            match state.sort_direction {
                SortDirection::Asc  => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }

    let total_filtered_count = filtered.len();
    let page_count = page_count(total_filtered_count, state.page_size);
    let page_index = state.page_index.min(page_count - 1);
    let size = state.page_size.get();

    let rows = filtered
        .into_iter()
        .skip(page_index * size)
        .take(size)
        .cloned()
        .collect();

    TableView {
        rows,
        page_index,
        page_count,
        total_filtered_count,
    }
}

fn compare_by(column: SortColumn, a: &Transaction, b: &Transaction) -> Ordering {
    match column {
        SortColumn::Id        => a.id.cmp(&b.id),
        SortColumn::Amount    => a.amount.total_cmp(&b.amount),
        SortColumn::RiskScore => a.risk_score.cmp(&b.risk_score),
        SortColumn::RiskLevel => a.risk_level.cmp(&b.risk_level),
    }
}

fn page_count(filtered: usize, page_size: NonZeroUsize) -> usize {
    filtered.div_ceil(page_size.get()).max(1)
}
