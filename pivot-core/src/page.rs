//! Pagination convention shared by every listing.

/// A `(index, length)` page request.
///
/// Selects items `[index * length, index * length + length)`. A zero length
/// or a start beyond the collection yields an empty page, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    /// Zero-based page number.
    pub index: usize,
    /// Items per page.
    pub length: usize,
}

impl Page {
    /// Create a page request.
    pub const fn new(index: usize, length: usize) -> Self {
        Self { index, length }
    }

    /// The first page of `length` items.
    pub const fn first(length: usize) -> Self {
        Self { index: 0, length }
    }

    /// A page wide enough to hold any collection.
    pub const fn all() -> Self {
        Self {
            index: 0,
            length: usize::MAX,
        }
    }

    /// Offset of the first selected item, if representable.
    pub fn start(&self) -> Option<usize> {
        self.index.checked_mul(self.length)
    }

    /// Select this page out of a slice.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self.start() {
            Some(start) if self.length > 0 && start < items.len() => {
                let end = start.saturating_add(self.length).min(items.len());
                &items[start..end]
            }
            _ => &[],
        }
    }

    /// Select this page out of an iterator.
    pub fn collect<I: IntoIterator>(&self, items: I) -> Vec<I::Item> {
        match self.start() {
            Some(start) if self.length > 0 => {
                items.into_iter().skip(start).take(self.length).collect()
            }
            _ => Vec::new(),
        }
    }
}
