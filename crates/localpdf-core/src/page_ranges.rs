//! Page selection parsing and set algebra
//!
//! Every page-oriented tool (crop, split, remove, organize, watermark,
//! image extraction) describes the pages it acts on with some mix of:
//!
//! - comma-separated range strings like `"1-3, 5, 9-12"`
//! - explicit page lists
//! - parity filters (even/odd)
//! - "every Nth page starting at K" rules
//!
//! All of them resolve to a [`PageSelection`]: an ascending, duplicate-free
//! set of 1-based page numbers bounded by the document's page count.
//! Parsing is strict: a malformed or out-of-range token fails the whole
//! request instead of being clamped or skipped.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{PdfToolError, Result};

/// Runs shorter than this are listed page by page in range strings.
const MIN_COLLAPSED_RUN: u32 = 3;

/// One comma-separated unit of a range expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    Single(u32),
    /// Inclusive span, always stored with `start <= end`.
    Range(u32, u32),
}

impl RangeToken {
    /// Parse a single token. Reversed spans (`"5-2"`) are swapped.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();

        if !token.contains('-') {
            return Ok(RangeToken::Single(parse_page_number(token, token)?));
        }

        let parts: Vec<&str> = token.split('-').collect();
        if parts.len() != 2 {
            return Err(PdfToolError::InvalidRangeFormat(format!(
                "'{}': expected 'start-end'",
                token
            )));
        }

        let start = parse_page_number(parts[0], token)?;
        let end = parse_page_number(parts[1], token)?;

        if start > end {
            Ok(RangeToken::Range(end, start))
        } else {
            Ok(RangeToken::Range(start, end))
        }
    }

    pub fn bounds(self) -> (u32, u32) {
        match self {
            RangeToken::Single(page) => (page, page),
            RangeToken::Range(start, end) => (start, end),
        }
    }

    fn check_bounds(self, token: &str, total_pages: u32) -> Result<()> {
        let (start, end) = self.bounds();
        for page in [start, end] {
            if page < 1 || page > total_pages {
                return Err(PdfToolError::PageOutOfRange {
                    token: token.trim().to_string(),
                    page,
                    total: total_pages,
                });
            }
        }
        Ok(())
    }
}

fn parse_page_number(part: &str, token: &str) -> Result<u32> {
    let part = part.trim();
    part.parse::<u32>().map_err(|_| {
        PdfToolError::InvalidRangeFormat(format!(
            "'{}': '{}' is not a page number",
            token.trim(),
            part
        ))
    })
}

/// Canonical set of 1-based page numbers for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
    total_pages: u32,
}

impl PageSelection {
    pub fn empty(total_pages: u32) -> Self {
        Self {
            pages: BTreeSet::new(),
            total_pages,
        }
    }

    pub fn all(total_pages: u32) -> Self {
        Self {
            pages: (1..=total_pages).collect(),
            total_pages,
        }
    }

    /// Build a selection from explicit page numbers, rejecting any page
    /// outside `[1, total_pages]`.
    pub fn from_pages<I>(pages: I, total_pages: u32) -> Result<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut selection = Self::empty(total_pages);
        for page in pages {
            if page < 1 || page > total_pages {
                return Err(PdfToolError::PageOutOfRange {
                    token: page.to_string(),
                    page,
                    total: total_pages,
                });
            }
            selection.pages.insert(page);
        }
        Ok(selection)
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    /// Pages in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Every page of the document not in this selection.
    pub fn complement(&self) -> Self {
        Self {
            pages: (1..=self.total_pages)
                .filter(|page| !self.pages.contains(page))
                .collect(),
            total_pages: self.total_pages,
        }
    }

    pub fn union(&self, other: &PageSelection) -> Result<Self> {
        if self.total_pages != other.total_pages {
            return Err(PdfToolError::InvalidArgument(format!(
                "cannot combine selections over {} and {} pages",
                self.total_pages, other.total_pages
            )));
        }
        Ok(Self {
            pages: self.pages.union(&other.pages).copied().collect(),
            total_pages: self.total_pages,
        })
    }

    pub fn run_length_ranges(&self) -> Vec<(u32, u32)> {
        to_run_length_ranges(self)
    }

    /// Compact form such as `"1-3,7,8,10"`.
    pub fn to_range_string(&self) -> String {
        self.run_length_ranges()
            .into_iter()
            .map(|(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{}-{}", start, end)
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_range_string())
    }
}

/// Parse a range expression like `"1-3, 5, 9-12"` against a page count.
///
/// Empty segments are ignored, reversed spans are swapped, and any token
/// that is malformed or outside `[1, total_pages]` fails the whole parse.
///
/// ```
/// use localpdf_core::page_ranges::parse_comma_list;
///
/// let selection = parse_comma_list("3-1, 5", 10).unwrap();
/// assert_eq!(selection.to_vec(), vec![1, 2, 3, 5]);
/// ```
pub fn parse_comma_list(input: &str, total_pages: u32) -> Result<PageSelection> {
    let mut selection = PageSelection::empty(total_pages);

    for segment in input.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let token = RangeToken::parse(segment)?;
        token.check_bounds(segment, total_pages)?;

        let (start, end) = token.bounds();
        selection.pages.extend(start..=end);
    }

    Ok(selection)
}

/// Parse one token that must read `start-end` or a single page.
///
/// Unlike [`parse_comma_list`], a reversed span is rejected: the token names
/// one output part and its bounds are used verbatim in file names.
pub fn parse_span(token: &str, total_pages: u32) -> Result<(u32, u32)> {
    let trimmed = token.trim();

    let (start, end) = match trimmed.split_once('-') {
        None => {
            let page = parse_page_number(trimmed, trimmed)?;
            (page, page)
        }
        Some((start, end)) => {
            if end.contains('-') {
                return Err(PdfToolError::InvalidRangeFormat(format!(
                    "'{}': expected 'start-end'",
                    trimmed
                )));
            }
            (
                parse_page_number(start, trimmed)?,
                parse_page_number(end, trimmed)?,
            )
        }
    };

    if start > end {
        return Err(PdfToolError::InvalidRangeFormat(format!(
            "'{}': start page cannot be greater than end page",
            trimmed
        )));
    }

    RangeToken::Range(start, end).check_bounds(trimmed, total_pages)?;
    Ok((start, end))
}

/// Even and/or odd pages of a document.
pub fn expand_parity(total_pages: u32, want_even: bool, want_odd: bool) -> PageSelection {
    PageSelection {
        pages: (1..=total_pages)
            .filter(|page| (want_even && page % 2 == 0) || (want_odd && page % 2 == 1))
            .collect(),
        total_pages,
    }
}

/// Every `n`th page, starting at `start_from` (default `n`).
pub fn expand_every_nth(total_pages: u32, n: u32, start_from: Option<u32>) -> Result<PageSelection> {
    if n == 0 {
        return Err(PdfToolError::InvalidArgument(
            "every-Nth interval must be greater than zero".into(),
        ));
    }

    let start = start_from.unwrap_or(n);
    if start == 0 {
        return Err(PdfToolError::InvalidArgument(
            "every-Nth start page must be at least 1".into(),
        ));
    }

    let mut selection = PageSelection::empty(total_pages);
    let mut page = start;
    while page <= total_pages {
        selection.pages.insert(page);
        page = match page.checked_add(n) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(selection)
}

/// Merge any number of selections over the same document.
pub fn union<I>(total_pages: u32, selections: I) -> Result<PageSelection>
where
    I: IntoIterator<Item = PageSelection>,
{
    selections
        .into_iter()
        .try_fold(PageSelection::empty(total_pages), |acc, next| acc.union(&next))
}

pub fn complement(selection: &PageSelection) -> PageSelection {
    selection.complement()
}

/// Collapse consecutive pages into `(start, end)` spans.
///
/// Only runs of three or more pages become a span; shorter runs are emitted
/// as one `(page, page)` entry per page, so `{1,2,3,7,8,10}` becomes
/// `[(1,3), (7,7), (8,8), (10,10)]`.
pub fn to_run_length_ranges(selection: &PageSelection) -> Vec<(u32, u32)> {
    let mut spans = Vec::new();
    let mut pages = selection.iter();

    let Some(first) = pages.next() else {
        return spans;
    };

    let (mut start, mut end) = (first, first);
    for page in pages {
        if page == end + 1 {
            end = page;
            continue;
        }
        push_run(&mut spans, start, end);
        start = page;
        end = page;
    }
    push_run(&mut spans, start, end);

    spans
}

fn push_run(spans: &mut Vec<(u32, u32)>, start: u32, end: u32) {
    if end - start + 1 >= MIN_COLLAPSED_RUN {
        spans.push((start, end));
    } else {
        spans.extend((start..=end).map(|page| (page, page)));
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// A page count and a list of in-range `(a, b, is_span)` tokens.
    fn in_range_tokens() -> impl Strategy<Value = (u32, Vec<(u32, u32, bool)>)> {
        (1u32..80).prop_flat_map(|total| {
            (
                Just(total),
                prop::collection::vec((1..=total, 1..=total, any::<bool>()), 0..10),
            )
        })
    }

    fn render(tokens: &[(u32, u32, bool)]) -> String {
        tokens
            .iter()
            .map(|&(a, b, span)| {
                if span {
                    format!("{}-{}", a, b)
                } else {
                    a.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn any_selection() -> impl Strategy<Value = PageSelection> {
        (1u32..80).prop_flat_map(|total| {
            prop::collection::btree_set(1..=total, 0..(total as usize))
                .prop_map(move |pages| PageSelection { pages, total_pages: total })
        })
    }

    proptest! {
        /// Property: output is strictly ascending and within bounds
        #[test]
        fn output_is_ascending_and_bounded((total, tokens) in in_range_tokens()) {
            let pages = parse_comma_list(&render(&tokens), total).unwrap().to_vec();
            for pair in pages.windows(2) {
                prop_assert!(pair[0] < pair[1], "{:?} is not strictly ascending", pages);
            }
            for page in pages {
                prop_assert!(page >= 1 && page <= total);
            }
        }

        /// Property: every token's pages end up in the selection
        #[test]
        fn every_token_is_covered((total, tokens) in in_range_tokens()) {
            let selection = parse_comma_list(&render(&tokens), total).unwrap();
            for (a, b, span) in tokens {
                let (lo, hi) = if span { (a.min(b), a.max(b)) } else { (a, a) };
                for page in lo..=hi {
                    prop_assert!(selection.contains(page));
                }
            }
        }

        /// Property: token order does not affect the result
        #[test]
        fn order_independent((total, tokens) in in_range_tokens()) {
            let mut reversed = tokens.clone();
            reversed.reverse();
            prop_assert_eq!(
                parse_comma_list(&render(&tokens), total).unwrap(),
                parse_comma_list(&render(&reversed), total).unwrap()
            );
        }

        /// Property: any page past the end rejects the whole request
        #[test]
        fn out_of_range_rejects((total, tokens) in in_range_tokens(), extra in 1u32..50) {
            let input = format!("{}, {}", render(&tokens), total + extra);
            let is_out_of_range = matches!(
                parse_comma_list(&input, total),
                Err(PdfToolError::PageOutOfRange { .. })
            );
            prop_assert!(is_out_of_range);
        }

        /// Property: complement is an involution
        #[test]
        fn complement_round_trips(selection in any_selection()) {
            prop_assert_eq!(selection.complement().complement(), selection);
        }

        /// Property: a selection and its complement partition the document
        #[test]
        fn complement_partitions(selection in any_selection()) {
            let rest = selection.complement();
            prop_assert_eq!(selection.len() + rest.len(), selection.total_pages() as usize);
            prop_assert!(selection.iter().all(|page| !rest.contains(page)));
        }

        /// Property: the compact range string parses back to the same selection
        #[test]
        fn range_string_reparses(selection in any_selection()) {
            let reparsed = parse_comma_list(&selection.to_range_string(), selection.total_pages()).unwrap();
            prop_assert_eq!(reparsed, selection);
        }

        /// Property: collapsed spans are at least three pages long
        #[test]
        fn spans_respect_threshold(selection in any_selection()) {
            for (start, end) in to_run_length_ranges(&selection) {
                prop_assert!(start == end || end - start + 1 >= MIN_COLLAPSED_RUN);
            }
        }

        /// Property: every-Nth pages are spaced exactly n apart
        #[test]
        fn every_nth_spacing(total in 1u32..200, n in 1u32..20, start in 1u32..30) {
            let pages = expand_every_nth(total, n, Some(start)).unwrap().to_vec();
            for pair in pages.windows(2) {
                prop_assert_eq!(pair[1] - pair[0], n);
            }
            if let Some(&first) = pages.first() {
                prop_assert_eq!(first, start);
            }
        }
    }
}
