pub const DEFAULT_PAGE_SIZE: usize = 100;

/// How much of the current list is revealed.
///
/// The window only grows, one page at a time, when whoever renders the list
/// reports that its last item became visible. Replacing the list resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationFeed {
    page_size: usize,
    visible_count: usize,
}

impl PaginationFeed {
    pub fn new(page_size: usize, list_len: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            visible_count: page_size.min(list_len),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn has_more(&self, list_len: usize) -> bool {
        self.visible_count < list_len
    }

    /// Reveal one more page, capped at `list_len`. Returns whether anything changed.
    pub fn grow(&mut self, list_len: usize) -> bool {
        if !self.has_more(list_len) {
            return false;
        }
        self.visible_count = (self.visible_count + self.page_size).min(list_len);
        true
    }

    /// The sentinel (last rendered item) scrolled into view.
    pub fn on_sentinel_visible(&mut self, list_len: usize) -> bool {
        self.grow(list_len)
    }

    /// Back to the first page of a freshly replaced list.
    pub fn reset(&mut self, list_len: usize) {
        self.visible_count = self.page_size.min(list_len);
    }

    pub fn window<'a, T>(&self, list: &'a [T]) -> &'a [T] {
        &list[..self.visible_count.min(list.len())]
    }
}

impl Default for PaginationFeed {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, 0)
    }
}
