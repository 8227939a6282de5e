//! Table engine tests: filter → sort → paginate, state transitions and
//! page clamping.

use riskdesk_core::{
    aggregator::aggregate,
    analysis::{AnalysisResult, Provenance},
    classifier::RiskLevel,
    table::{project, RiskFilter, SortColumn, SortDirection, ViewState},
    transaction::ScoredTransaction,
};
use std::num::NonZeroUsize;

fn result_from(scores: &[(&str, i64, f64)]) -> AnalysisResult {
    let batch = scores
        .iter()
        .map(|(id, score, amount)| ScoredTransaction {
            id: id.to_string(),
            amount: *amount,
            risk_score: *score,
            reasons: Vec::new(),
            period: None,
        })
        .collect();
    aggregate(batch, Provenance::Live).unwrap()
}

fn numbered(n: usize) -> AnalysisResult {
    let rows: Vec<(String, i64, f64)> = (0..n)
        .map(|i| (format!("T{i:03}"), (i % 101) as i64, i as f64))
        .collect();
    let refs: Vec<(&str, i64, f64)> = rows.iter().map(|(id, s, a)| (id.as_str(), *s, *a)).collect();
    result_from(&refs)
}

fn page_size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn ids(view: &riskdesk_core::table::TableView) -> Vec<&str> {
    view.rows.iter().map(|t| t.id.as_str()).collect()
}

#[test]
fn high_filter_scenario() {
    let result = result_from(&[("a", 10, 1.0), ("b", 45, 1.0), ("c", 65, 1.0), ("d", 85, 1.0), ("e", 39, 1.0)]);
    let mut state = ViewState::default();
    state.set_risk_filter(RiskFilter::Level(RiskLevel::High));

    let view = project(&result, &state);
    assert_eq!(view.total_filtered_count, 1);
    assert_eq!(view.page_count, 1);
    assert_eq!(ids(&view), vec!["c"]);
    assert_eq!(view.rows[0].risk_score, 65);
}

#[test]
fn default_state_shows_first_twenty_in_batch_order() {
    let result = numbered(45);
    let state = ViewState::default();

    let view = project(&result, &state);
    assert_eq!(view.rows.len(), 20);
    assert_eq!(view.page_count, 3);
    assert_eq!(view.total_filtered_count, 45);
    assert_eq!(view.rows[0].id, "T000");
    assert_eq!(view.rows[19].id, "T019");
}

#[test]
fn empty_table_reports_one_page() {
    let result = result_from(&[]);
    let view = project(&result, &ViewState::default());

    assert_eq!(view.page_count, 1);
    assert_eq!(view.page_index, 0);
    assert!(view.rows.is_empty());
    assert_eq!(view.showing_range(page_size(20)), (0, 0));
}

#[test]
fn filter_with_no_matches_still_has_one_page() {
    let result = result_from(&[("a", 10, 1.0), ("b", 20, 1.0)]);
    let mut state = ViewState::default();
    state.set_risk_filter(RiskFilter::Level(RiskLevel::Critical));

    let view = project(&result, &state);
    assert_eq!(view.total_filtered_count, 0);
    assert_eq!(view.page_count, 1);
}

#[test]
fn changing_filter_resets_page_index() {
    let result = numbered(101);
    let mut state = ViewState::default();
    state.next_page(&result);
    state.next_page(&result);
    assert_eq!(state.page_index, 2);

    state.set_risk_filter(RiskFilter::Level(RiskLevel::Critical));
    assert_eq!(state.page_index, 0);

    let view = project(&result, &state);
    assert!(view.page_index < view.page_count);
    assert!(view.rows.iter().all(|t| t.risk_level == RiskLevel::Critical));
}

#[test]
fn navigation_past_either_end_is_a_no_op() {
    let result = numbered(45);
    let mut state = ViewState::default();

    state.prev_page();
    assert_eq!(state.page_index, 0, "prev on first page must not move");
    assert!(!state.can_prev_page());

    for _ in 0..10 {
        state.next_page(&result);
    }
    assert_eq!(state.page_index, 2, "next must stop on the last page");
    assert!(!state.can_next_page(&result));

    let view = project(&result, &state);
    assert_eq!(view.rows.len(), 5);
    assert_eq!(view.showing_range(state.page_size), (41, 45));
}

#[test]
fn stale_page_index_is_clamped_by_projection_and_rebase() {
    let big = numbered(100);
    let small = numbered(10);
    let mut state = ViewState::default();
    state.go_to_page(&big, 4);
    assert_eq!(state.page_index, 4);

    let view = project(&small, &state);
    assert_eq!(view.page_index, 0, "projection must never return an out-of-range page");
    assert_eq!(view.rows.len(), 10);

    state.rebase(&small);
    assert_eq!(state.page_index, 0);
}

#[test]
fn go_to_page_clamps() {
    let result = numbered(45);
    let mut state = ViewState::default();
    state.go_to_page(&result, 99);
    assert_eq!(state.page_index, 2);
}

#[test]
fn toggle_sort_flips_direction_and_new_column_starts_ascending() {
    let mut state = ViewState::default();

    state.toggle_sort(SortColumn::Amount);
    assert_eq!(state.sort_column, Some(SortColumn::Amount));
    assert_eq!(state.sort_direction, SortDirection::Asc);

    state.toggle_sort(SortColumn::Amount);
    assert_eq!(state.sort_direction, SortDirection::Desc);

    state.toggle_sort(SortColumn::Amount);
    assert_eq!(state.sort_direction, SortDirection::Asc);

    state.toggle_sort(SortColumn::Amount);
    state.toggle_sort(SortColumn::RiskScore);
    assert_eq!(state.sort_column, Some(SortColumn::RiskScore));
    assert_eq!(state.sort_direction, SortDirection::Asc);

    state.clear_sort();
    assert_eq!(state.sort_column, None);
}

#[test]
fn sort_by_each_column_uses_natural_order() {
    let result = result_from(&[
        ("c", 85, 50.5),
        ("a", 10, 1000.0),
        ("b", 65, 2.25),
        ("d", 45, 999.99),
    ]);
    let mut state = ViewState::default();

    state.toggle_sort(SortColumn::Id);
    assert_eq!(ids(&project(&result, &state)), vec!["a", "b", "c", "d"]);

    state.toggle_sort(SortColumn::Amount);
    assert_eq!(ids(&project(&result, &state)), vec!["b", "c", "d", "a"]);

    state.toggle_sort(SortColumn::Amount);
    assert_eq!(ids(&project(&result, &state)), vec!["a", "d", "c", "b"]);

    state.toggle_sort(SortColumn::RiskScore);
    assert_eq!(ids(&project(&result, &state)), vec!["a", "d", "b", "c"]);

    state.toggle_sort(SortColumn::RiskLevel);
    state.toggle_sort(SortColumn::RiskLevel);
    assert_eq!(ids(&project(&result, &state)), vec!["c", "b", "d", "a"]);
}

/// Sorting an id-ordered batch by level keeps id order among equal
/// levels, ascending and descending.
#[test]
fn sort_is_stable_in_both_directions() {
    let result = result_from(&[
        ("T01", 10, 1.0),
        ("T02", 90, 1.0),
        ("T03", 20, 1.0),
        ("T04", 95, 1.0),
        ("T05", 30, 1.0),
        ("T06", 50, 1.0),
    ]);
    let mut state = ViewState::default();

    state.toggle_sort(SortColumn::RiskLevel);
    assert_eq!(
        ids(&project(&result, &state)),
        vec!["T01", "T03", "T05", "T06", "T02", "T04"]
    );

    state.toggle_sort(SortColumn::RiskLevel);
    assert_eq!(
        ids(&project(&result, &state)),
        vec!["T02", "T04", "T06", "T01", "T03", "T05"]
    );
}

#[test]
fn sort_applies_to_filtered_set_before_paging() {
    let result = numbered(101);
    let mut state = ViewState::with_page_size(page_size(5));
    state.set_risk_filter(RiskFilter::Level(RiskLevel::Critical));
    state.toggle_sort(SortColumn::RiskScore);
    state.toggle_sort(SortColumn::RiskScore);

    let view = project(&result, &state);
    // Scores 80..=100 are Critical: 21 rows, 5 pages of 5.
    assert_eq!(view.total_filtered_count, 21);
    assert_eq!(view.page_count, 5);
    let scores: Vec<u8> = view.rows.iter().map(|t| t.risk_score).collect();
    assert_eq!(scores, vec![100, 99, 98, 97, 96]);
}

#[test]
fn projection_does_not_mutate_result() {
    let result = numbered(30);
    let before = result.clone();
    let mut state = ViewState::default();
    state.toggle_sort(SortColumn::Amount);
    state.toggle_sort(SortColumn::Amount);

    let _ = project(&result, &state);
    assert_eq!(result, before);
}

#[test]
fn risk_filter_parses_all_and_levels() {
    assert_eq!(RiskFilter::parse("all"), Some(RiskFilter::All));
    assert_eq!(RiskFilter::parse("ALL"), Some(RiskFilter::All));
    assert_eq!(RiskFilter::parse("high"), Some(RiskFilter::Level(RiskLevel::High)));
    assert_eq!(RiskFilter::parse("bogus"), None);
}

#[test]
fn sort_column_parses_common_spellings() {
    assert_eq!(SortColumn::parse("riskScore"), Some(SortColumn::RiskScore));
    assert_eq!(SortColumn::parse("risk_level"), Some(SortColumn::RiskLevel));
    assert_eq!(SortColumn::parse(" Amount "), Some(SortColumn::Amount));
    assert_eq!(SortColumn::parse("reasons"), None);
}
