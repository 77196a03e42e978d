//! Pure, order-preserving row filtering and pagination arithmetic. Nothing
//! here touches the network or the cache; callers filter whatever snapshot
//! they already hold.

use shared::domain::RowSet;

/// Case-insensitive substring filter over a snapshot. An empty term is the
/// identity. With `column` set, only that column is searched; restricting to
/// a column the snapshot does not have matches nothing.
pub fn apply(rows: &RowSet, term: &str, column: Option<&str>) -> RowSet {
    if term.is_empty() {
        return rows.clone();
    }
    let needle = term.to_lowercase();

    let indices: Vec<usize> = match column {
        Some(name) => rows.column_index(name).into_iter().collect(),
        None => (0..rows.columns.len()).collect(),
    };

    let mut filtered = RowSet::new(rows.columns.clone());
    for row in &rows.rows {
        let hit = indices
            .iter()
            .filter_map(|&i| row.values.get(i))
            .any(|value| value.to_lowercase().contains(&needle));
        if hit {
            filtered.rows.push(row.clone());
        }
    }
    filtered
}

/// Rows whose `video_column` cell holds something playable, i.e. starts with
/// `http`. Rows without the column, or with anything else in it, are dropped.
pub fn video_rows(rows: &RowSet, video_column: &str) -> RowSet {
    let mut videos = RowSet::new(rows.columns.clone());
    let Some(index) = rows.column_index(video_column) else {
        return videos;
    };
    for row in &rows.rows {
        if row
            .values
            .get(index)
            .is_some_and(|value| value.starts_with("http"))
        {
            videos.rows.push(row.clone());
        }
    }
    videos
}

/// Number of pages needed to show `total` items, `per_page` at a time.
/// Zero items means zero pages.
pub fn page_count(total: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    total.div_ceil(per_page)
}

/// The index range of one 1-based page, clamped to `total`. Out-of-range
/// pages come back empty rather than panicking.
pub fn page_bounds(total: usize, per_page: usize, page: usize) -> std::ops::Range<usize> {
    let per_page = per_page.max(1);
    let start = page.saturating_sub(1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> RowSet {
        let mut rows = RowSet::new(vec![
            "Title".to_string(),
            "Video URL".to_string(),
            "Category".to_string(),
        ]);
        rows.push_row(vec![
            "Rust Intro".to_string(),
            "https://example.com/rust.mp4".to_string(),
            "Tutorial".to_string(),
        ]);
        rows.push_row(vec![
            "Cooking 101".to_string(),
            "not a link".to_string(),
            "Food".to_string(),
        ]);
        rows.push_row(vec![
            "Advanced RUST".to_string(),
            "http://example.com/adv.mp4".to_string(),
            "Tutorial".to_string(),
        ]);
        rows
    }

    #[test]
    fn empty_term_is_the_identity() {
        let rows = snapshot();
        assert_eq!(apply(&rows, "", None), rows);
    }

    #[test]
    fn filtering_twice_with_the_same_term_is_idempotent() {
        let rows = snapshot();
        let once = apply(&rows, "rust", None);
        let twice = apply(&once, "rust", None);
        assert_eq!(once, twice);
    }

    #[test]
    fn matches_are_case_insensitive_across_all_columns() {
        let rows = snapshot();
        let hit = apply(&rows, "TUTORIAL", None);
        assert_eq!(hit.len(), 2);
        assert_eq!(hit.value(&hit.rows[0], "Title"), Some("Rust Intro"));
        assert_eq!(hit.value(&hit.rows[1], "Title"), Some("Advanced RUST"));
    }

    #[test]
    fn column_restriction_only_searches_that_column() {
        let rows = snapshot();
        // "rust" appears in two titles but in no category.
        assert_eq!(apply(&rows, "rust", Some("Title")).len(), 2);
        assert_eq!(apply(&rows, "rust", Some("Category")).len(), 0);
    }

    #[test]
    fn restricting_to_an_unknown_column_matches_nothing() {
        let rows = snapshot();
        let filtered = apply(&rows, "rust", Some("Nope"));
        assert!(filtered.is_empty());
        assert_eq!(filtered.columns, rows.columns);
    }

    #[test]
    fn video_rows_keeps_only_http_prefixed_cells() {
        let rows = snapshot();
        let videos = video_rows(&rows, "Video URL");
        assert_eq!(videos.len(), 2);
        assert_eq!(videos.value(&videos.rows[0], "Title"), Some("Rust Intro"));
    }

    #[test]
    fn video_rows_without_the_column_is_empty() {
        assert!(video_rows(&snapshot(), "Clip").is_empty());
    }

    #[test]
    fn page_arithmetic_rounds_up_and_clamps() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);

        assert_eq!(page_bounds(11, 10, 1), 0..10);
        assert_eq!(page_bounds(11, 10, 2), 10..11);
        // Pages past the end are empty, not an error.
        assert_eq!(page_bounds(11, 10, 3), 11..11);
    }
}
