//! Page-number windowing for the paginated list view.
//!
//! Small ranges (up to 7 pages) are shown in full. Larger ranges keep the
//! first and last page, the neighbours of the current page, and collapse the
//! gaps into ellipsis tokens:
//!
//! ```text
//! page 30 of 66:  1 … 29 30 31 … 66
//! page 1 of 66:   1 2 … 66
//! ```

/// Ranges at or below this size are never truncated.
const FULL_WINDOW_MAX: u32 = 7;

/// One render token of the page bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Page(u32),
    Ellipsis,
}

/// Number of pages needed for `count` items at `limit` per page.
pub fn total_pages(count: u64, limit: u32) -> u32 {
    if count == 0 || limit == 0 {
        return 0;
    }
    let pages = count.div_ceil(limit as u64);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Tokens to render for `current_page` out of `total_pages`.
pub fn page_window(current_page: u32, total_pages: u32) -> Vec<PageToken> {
    if total_pages <= FULL_WINDOW_MAX {
        return (1..=total_pages).map(PageToken::Page).collect();
    }

    let mut out = Vec::with_capacity(7);
    out.push(PageToken::Page(1));

    if current_page > 3 {
        out.push(PageToken::Ellipsis);
    }

    let start = current_page.saturating_sub(1).max(2);
    let end = current_page.saturating_add(1).min(total_pages - 1);
    for i in start..=end {
        if i == 1 || i == total_pages {
            continue;
        }
        out.push(PageToken::Page(i));
    }

    if current_page < total_pages - 2 {
        out.push(PageToken::Ellipsis);
    }

    if total_pages > 1 {
        out.push(PageToken::Page(total_pages));
    }
    out
}

/// Which navigation buttons are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavControls {
    pub first: bool,
    pub previous: bool,
    pub next: bool,
    pub last: bool,
}

pub fn nav_controls(current_page: u32, total_pages: u32) -> NavControls {
    let back = current_page > 1;
    let forward = current_page < total_pages;
    NavControls {
        first: back,
        previous: back,
        next: forward,
        last: forward,
    }
}

/// Current page plus the navigation actions of the page bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: u32,
    total: u32,
    limit: u32,
}

impl Paginator {
    pub fn new(limit: u32) -> Self {
        Self { page: 1, total: 0, limit: limit.max(1) }
    }

    pub fn page(&self) -> u32 { self.page }
    pub fn total(&self) -> u32 { self.total }
    pub fn limit(&self) -> u32 { self.limit }

    /// Offset of the first item of the current page.
    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Update the page count from a fetched page's total item count and pull
    /// the current page back into range. Call it once the current page's
    /// request has resolved. Returns true when the current page moved.
    pub fn set_item_count(&mut self, count: u64) -> bool {
        self.total = total_pages(count, self.limit);
        let clamped = self.page.min(self.total.max(1));
        let moved = clamped != self.page;
        self.page = clamped;
        moved
    }

    pub fn window(&self) -> Vec<PageToken> {
        page_window(self.page, self.total)
    }

    pub fn controls(&self) -> NavControls {
        nav_controls(self.page, self.total)
    }

    /// Jump to `page`, clamped to the known range. Returns true when the page changed.
    pub fn goto(&mut self, page: u32) -> bool {
        let target = page.clamp(1, self.total.max(1));
        let changed = target != self.page;
        self.page = target;
        changed
    }

    pub fn first(&mut self) -> bool {
        self.controls().first && self.goto(1)
    }

    pub fn previous(&mut self) -> bool {
        self.controls().previous && self.goto(self.page - 1)
    }

    pub fn next(&mut self) -> bool {
        self.controls().next && self.goto(self.page + 1)
    }

    pub fn last(&mut self) -> bool {
        self.controls().last && self.goto(self.total)
    }

    /// `Page X of Y (N On Each Page)`
    pub fn status_line(&self) -> String {
        format!(
            "Page {} of {} ({} On Each Page)",
            self.page, self.total, self.limit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageToken::{Ellipsis as E, Page as P};

    #[test]
    fn small_ranges_are_not_truncated() {
        for total in 0..=7 {
            for current in 1..=total.max(1) {
                let expected: Vec<_> = (1..=total).map(P).collect();
                assert_eq!(page_window(current, total), expected, "{current}/{total}");
            }
        }
    }

    #[test]
    fn middle_of_large_range() {
        assert_eq!(page_window(30, 66), vec![P(1), E, P(29), P(30), P(31), E, P(66)]);
    }

    #[test]
    fn start_of_large_range() {
        assert_eq!(page_window(1, 66), vec![P(1), P(2), E, P(66)]);
        assert_eq!(page_window(2, 66), vec![P(1), P(2), P(3), E, P(66)]);
        assert_eq!(page_window(3, 66), vec![P(1), P(2), P(3), P(4), E, P(66)]);
        assert_eq!(page_window(4, 66), vec![P(1), E, P(3), P(4), P(5), E, P(66)]);
    }

    #[test]
    fn end_of_large_range() {
        assert_eq!(page_window(66, 66), vec![P(1), E, P(65), P(66)]);
        assert_eq!(page_window(65, 66), vec![P(1), E, P(64), P(65), P(66)]);
        assert_eq!(page_window(64, 66), vec![P(1), E, P(63), P(64), P(65), P(66)]);
        assert_eq!(page_window(63, 66), vec![P(1), E, P(62), P(63), P(64), E, P(66)]);
    }

    #[test]
    fn eight_pages() {
        assert_eq!(page_window(1, 8), vec![P(1), P(2), E, P(8)]);
        assert_eq!(page_window(5, 8), vec![P(1), E, P(4), P(5), P(6), E, P(8)]);
        assert_eq!(page_window(6, 8), vec![P(1), E, P(5), P(6), P(7), P(8)]);
    }

    #[test]
    fn window_is_deterministic() {
        let a = page_window(17, 40);
        let _ = page_window(3, 9);
        assert_eq!(page_window(17, 40), a);
    }

    #[test]
    fn page_counts() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(1302, 20), 66);
    }

    #[test]
    fn controls_at_edges() {
        let c = nav_controls(1, 66);
        assert!(!c.first && !c.previous && c.next && c.last);
        let c = nav_controls(66, 66);
        assert!(c.first && c.previous && !c.next && !c.last);
        let c = nav_controls(1, 0);
        assert!(!c.first && !c.previous && !c.next && !c.last);
    }

    #[test]
    fn paginator_navigation_is_clamped() {
        let mut p = Paginator::new(20);
        p.set_item_count(1302);
        assert_eq!(p.total(), 66);
        assert!(!p.previous());
        assert!(p.next());
        assert_eq!(p.page(), 2);
        assert_eq!(p.offset(), 20);
        assert!(p.last());
        assert_eq!(p.page(), 66);
        assert!(!p.next());
        assert!(p.goto(500));
        assert_eq!(p.page(), 66);
        assert!(p.first());
        assert_eq!(p.page(), 1);
        assert_eq!(p.status_line(), "Page 1 of 66 (20 On Each Page)");
    }

    #[test]
    fn paginator_without_count_stays_on_first_page() {
        let mut p = Paginator::new(20);
        assert!(!p.goto(3));
        assert_eq!(p.page(), 1);
        assert!(p.window().is_empty());
    }

    #[test]
    fn shrinking_count_pulls_current_page_back() {
        let mut p = Paginator::new(20);
        assert!(!p.set_item_count(1302));
        p.last();
        assert_eq!(p.page(), 66);

        assert!(p.set_item_count(100));
        assert_eq!(p.page(), 5);
        assert_eq!(p.total(), 5);
        assert_eq!(p.status_line(), "Page 5 of 5 (20 On Each Page)");

        assert!(p.set_item_count(0));
        assert_eq!(p.page(), 1);
        assert!(!p.set_item_count(0));
    }
}
