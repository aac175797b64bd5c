//! Client-side pagination of episode lists

/// Number of episodes shown per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// What happens to the current offset when the active source changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetPolicy {
    /// Keep the numeric offset. A shorter list then shows an empty page.
    Preserve,
    /// Jump back to the first page
    #[default]
    ResetOnSourceChange,
}

/// One page cut out of a full list
#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    /// Contiguous slice of the full list, at most `page_size` long
    pub items: &'a [T],
    /// Total number of pages for the full list
    pub page_count: usize,
}

/// Slices lists into fixed-size pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_size: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    /// Creates a pager. A page size of zero is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages needed to show `len` items
    pub fn page_count(&self, len: usize) -> usize {
        len.div_ceil(self.page_size)
    }

    /// Returns the page starting at `offset`
    ///
    /// An offset past the end of the list yields an empty page.
    pub fn page<'a, T>(&self, full: &'a [T], offset: usize) -> Page<'a, T> {
        let start = offset.min(full.len());
        let end = offset.saturating_add(self.page_size).min(full.len());

        Page {
            items: &full[start..end],
            page_count: self.page_count(full.len()),
        }
    }

    /// Converts a selected page index into an item offset
    ///
    /// The offset wraps around the list length, so selecting a page beyond
    /// the last one lands somewhere inside the list again.
    pub fn offset_for_page(&self, selected: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        selected.saturating_mul(self.page_size) % len
    }
}
