//! Page indices and page ranges.
//!
//! `PageIndex` is a checked wrapper for handing page numbers to mupdf (i32,
//! 0-based) and lopdf (u32, 1-based). `PageRange` is the inclusive, 0-based
//! selection of pages a run works on.

use std::fmt;

use crate::error::{Error, Result};

/// A page index that can be safely used with mupdf and lopdf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Get the underlying i32 value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Get the 1-indexed page number lopdf uses as keys of `get_pages()`.
    #[must_use]
    pub const fn as_lopdf_page_number(self) -> u32 {
        (self.0 + 1).cast_unsigned()
    }

    /// Try to create a PageIndex from a usize page number.
    ///
    /// Fails if the page is outside the document or too large for an i32.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self> {
        let out_of_range = || Error::PageRange {
            start: page_num,
            end: page_num,
            total: total_pages,
        };

        if page_num >= total_pages {
            return Err(out_of_range());
        }

        let index = i32::try_from(page_num).map_err(|_| out_of_range())?;
        Ok(Self(index))
    }
}

impl From<PageIndex> for i32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive, 0-based range of pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: usize,
    end: usize,
}

impl PageRange {
    /// Create an unchecked range; call [`PageRange::validate`] before use.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn single(page: usize) -> Self {
        Self { start: page, end: page }
    }

    /// Every page of a document with `total` pages.
    pub fn all(total: usize) -> Result<Self> {
        Self::new(0, total.saturating_sub(1)).validate(total)
    }

    /// Check `start <= end` and that both ends lie in `[0, total - 1]`.
    pub fn validate(self, total: usize) -> Result<Self> {
        if self.start > self.end || self.end >= total {
            return Err(Error::PageRange {
                start: self.start,
                end: self.end,
                total,
            });
        }
        Ok(self)
    }

    /// Build from the 1-based "from"/"to" pair of the upload form, where
    /// `to == 0` means "through the last page".
    pub fn from_one_based(from: usize, to: usize, total: usize) -> Result<Self> {
        let start = from.max(1) - 1;
        let end = if to == 0 { total.saturating_sub(1) } else { to - 1 };
        Self::new(start, end).validate(total)
    }

    /// Parse a 1-based page spec: `"3"`, `"2-5"` or `"4-"` (through the last page).
    pub fn parse(spec: &str, total: usize) -> Result<Self> {
        let invalid = |reason: String| Error::ConfigInvalid {
            field: "pages".to_string(),
            reason,
        };
        let number = |s: &str| -> Result<usize> {
            let n: usize = s
                .trim()
                .parse()
                .map_err(|_| invalid(format!("'{}' is not a page number", s.trim())))?;
            if n == 0 {
                return Err(invalid("page numbers start at 1".to_string()));
            }
            Ok(n)
        };

        let spec = spec.trim();
        let range = match spec.split_once('-') {
            Some((start, end)) if end.trim().is_empty() => {
                Self::new(number(start)? - 1, total.saturating_sub(1))
            }
            Some((start, end)) => Self::new(number(start)? - 1, number(end)? - 1),
            None => Self::single(number(spec)? - 1),
        };

        range.validate(total)
    }

    pub const fn start(self) -> usize {
        self.start
    }

    pub const fn end(self) -> usize {
        self.end
    }

    /// Number of pages; zero for an unvalidated reversed range.
    pub const fn len(self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub const fn contains(self, page: usize) -> bool {
        page >= self.start && page <= self.end
    }

    pub fn pages(self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start + 1, self.end + 1)
    }
}
