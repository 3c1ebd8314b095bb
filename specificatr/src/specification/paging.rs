use serde::{Deserialize, Serialize};

/// Page selection with a 1-based page index
///
/// # Example
///
/// ```rust
/// use specificatr::Paging;
///
/// let paging = Paging::new(3, 20);
/// assert_eq!(paging.skip(), 40);
/// assert_eq!(paging.take(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Paging {
    /// Page number, starting at 1
    pub page_index: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl Paging {
    pub fn new(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Number of rows before the page; a page index of 0 is treated as 1
    pub fn skip(&self) -> usize {
        self.page_index.saturating_sub(1) as usize * self.page_size as usize
    }

    pub fn take(&self) -> usize {
        self.page_size as usize
    }
}

/// One page of results together with the number of rows across all pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_count: usize) -> Self {
        Self { items, total_count }
    }

    /// Number of pages of `page_size` needed for `total_count` rows
    pub fn total_pages(&self, page_size: u32) -> usize {
        match page_size {
            0 => 0,
            size => self.total_count.div_ceil(size as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_skips_nothing() {
        let paging = Paging::new(1, 2);
        assert_eq!(paging.skip(), 0);
        assert_eq!(paging.take(), 2);
    }

    #[test]
    fn test_page_zero_saturates() {
        assert_eq!(Paging::new(0, 10).skip(), 0);
    }

    #[test]
    fn test_later_page() {
        assert_eq!(Paging::new(4, 25).skip(), 75);
    }

    #[test]
    fn test_total_pages() {
        let page = PagedResult::new(vec![1, 2], 5);
        assert_eq!(page.total_pages(2), 3);
        assert_eq!(page.total_pages(5), 1);
        assert_eq!(page.total_pages(0), 0);
    }
}
