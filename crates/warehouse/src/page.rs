use serde::{Deserialize, Serialize};

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 200;

/// A clamped pagination request. `page` is 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    page: u32,
    size: u32,
}

impl Page {
    /// Clamp a raw request: `size` into `[1, 200]`, `page` to at least 1.
    pub fn clamped(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Row offset of this page: `(page - 1) * size`.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.size as u64
    }

    /// Number of pages for a total row count: `max(1, ceil(total / size))`.
    /// An empty result still has one (empty) page.
    pub fn page_count(&self, total_rows: u64) -> u32 {
        let pages = total_rows.div_ceil(self.size as u64).max(1);
        pages.try_into().unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_requests() {
        let p = Page::clamped(0, 0);
        assert_eq!((p.page(), p.size()), (1, 1));

        let p = Page::clamped(3, 10_000);
        assert_eq!((p.page(), p.size()), (3, MAX_PAGE_SIZE));
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(Page::clamped(1, 25).offset(), 0);
        assert_eq!(Page::clamped(3, 25).offset(), 50);
    }

    #[test]
    fn page_count_rounds_up_and_never_hits_zero() {
        let p = Page::clamped(1, 10);
        assert_eq!(p.page_count(0), 1);
        assert_eq!(p.page_count(10), 1);
        assert_eq!(p.page_count(11), 2);
        assert_eq!(p.page_count(95), 10);
    }
}
