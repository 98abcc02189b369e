//! Pagination/selection engine: pure windowing over a session's result
//! list. No Telegram types in here.

use crate::provider::SearchResult;

/// Fixed number of results shown per page
pub const PAGE_SIZE: usize = 5;

/// Number of pages needed for `result_count` results, minimum 1.
#[must_use]
pub const fn total_pages(result_count: usize) -> usize {
    let pages = result_count.div_ceil(PAGE_SIZE);
    if pages == 0 {
        1
    } else {
        pages
    }
}

/// The contiguous slice of `results` visible on `page`, paired with each
/// item's global index. Empty when `page` is out of range.
pub fn page_window(results: &[SearchResult], page: usize) -> impl Iterator<Item = (usize, &SearchResult)> {
    let start = page.saturating_mul(PAGE_SIZE).min(results.len());
    let end = start.saturating_add(PAGE_SIZE).min(results.len());
    results[start..end].iter().enumerate().map(move |(i, r)| (start + i, r))
}

/// Resolve a global selection index, `None` when out of range.
#[must_use]
pub fn select(results: &[SearchResult], index: usize) -> Option<&SearchResult> {
    results.get(index)
}

/// Whether a "previous" control belongs on `page`.
#[must_use]
pub const fn has_previous(page: usize) -> bool {
    page > 0
}

/// Whether a "next" control belongs on `page` given `result_count`.
#[must_use]
pub const fn has_next(page: usize, result_count: usize) -> bool {
    page + 1 < total_pages(result_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                id: format!("id{i}"),
                title: format!("title {i}"),
                duration_secs: i as u64,
                uploader: "up".to_string(),
                url: format!("https://example.com/{i}"),
            })
            .collect()
    }

    #[test]
    fn total_pages_is_ceil_with_minimum_one() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(5), 1);
        assert_eq!(total_pages(6), 2);
        assert_eq!(total_pages(12), 3);
        assert_eq!(total_pages(50), 10);
    }

    #[test]
    fn windows_reconstruct_results_without_gaps_or_overlaps() {
        for n in [0usize, 1, 4, 5, 6, 12, 50] {
            let rs = results(n);
            let mut seen = Vec::new();
            for page in 0..total_pages(n) {
                let window: Vec<_> = page_window(&rs, page).collect();
                assert!(window.len() <= PAGE_SIZE);
                for (global, item) in window {
                    assert_eq!(global, seen.len());
                    assert_eq!(item, &rs[global]);
                    seen.push(item.clone());
                }
            }
            assert_eq!(seen, rs);
        }
    }

    #[test]
    fn twelve_results_paginate_as_three_pages() {
        let rs = results(12);
        assert_eq!(total_pages(rs.len()), 3);

        let page0: Vec<usize> = page_window(&rs, 0).map(|(i, _)| i).collect();
        assert_eq!(page0, vec![0, 1, 2, 3, 4]);
        assert!(!has_previous(0));
        assert!(has_next(0, 12));

        let page2: Vec<usize> = page_window(&rs, 2).map(|(i, _)| i).collect();
        assert_eq!(page2, vec![10, 11]);
        assert!(has_previous(2));
        assert!(!has_next(2, 12));
    }

    #[test]
    fn out_of_range_page_yields_empty_window() {
        let rs = results(3);
        assert_eq!(page_window(&rs, 7).count(), 0);
    }

    #[test]
    fn select_rejects_out_of_range_indices() {
        let rs = results(3);
        assert!(select(&rs, 2).is_some());
        assert!(select(&rs, 3).is_none());
        assert!(select(&[], 0).is_none());
    }
}
