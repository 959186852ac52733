//! Page-number window for paginated listings
//!
//! Shows up to two pages either side of the current one, with an ellipsis
//! marker when pages are hidden between the window and the first or last page.

use serde::Serialize;

/// Pages either side of the current page
const RADIUS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// Consecutive page numbers to render, ascending
    pub pages: Vec<u32>,
    pub show_leading_ellipsis: bool,
    pub show_trailing_ellipsis: bool,
}

/// Compute the window for `current` out of `total` pages.
///
/// `total` is raised to at least 1 and `current` is clamped into `1..=total`.
pub fn page_window(current: u32, total: u32) -> PageWindow {
    let total = total.max(1);
    let current = current.clamp(1, total);

    let start = current.saturating_sub(RADIUS).max(1);
    let end = current.saturating_add(RADIUS).min(total);

    PageWindow {
        pages: (start..=end).collect(),
        show_leading_ellipsis: start > 2,
        show_trailing_ellipsis: end < total.saturating_sub(1),
    }
}
