//! Split a document into several parts.

use std::collections::BTreeSet;

use lopdf::Document;

use super::{rebuild, save, PagePlacement};
use crate::error::{PdfToolError, Result};
use crate::page_ranges::parse_span;
use crate::requests::{SplitMethod, SplitOptions};

/// One output file of a split.
#[derive(Debug, Clone)]
pub struct SplitPart {
    pub file_name: String,
    pub start: u32,
    pub end: u32,
    pub bytes: Vec<u8>,
}

/// Work out the inclusive page span of every output part.
pub fn plan_split(method: SplitMethod, options: &SplitOptions, total_pages: u32) -> Result<Vec<(u32, u32)>> {
    match method {
        SplitMethod::ByPageRanges => {
            let ranges = options
                .page_ranges
                .as_deref()
                .filter(|r| !r.is_empty())
                .ok_or_else(|| PdfToolError::MissingArgument("pageRanges".into()))?;
            ranges
                .iter()
                .map(|range| parse_span(range, total_pages))
                .collect()
        }
        SplitMethod::AtSpecificPages => {
            let points = options
                .split_pages
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| PdfToolError::MissingArgument("splitPages".into()))?;

            let mut boundaries = BTreeSet::new();
            for &point in points {
                if point < 1 || point >= total_pages {
                    return Err(PdfToolError::InvalidArgument(format!(
                        "split page {} must be between 1 and {}",
                        point,
                        total_pages.saturating_sub(1)
                    )));
                }
                boundaries.insert(point);
            }
            boundaries.insert(total_pages);

            let mut start = 1;
            let mut spans = Vec::with_capacity(boundaries.len());
            for end in boundaries {
                spans.push((start, end));
                start = end + 1;
            }
            Ok(spans)
        }
        SplitMethod::EveryNPages => {
            let interval = match options.page_interval {
                Some(n) if n > 0 => n,
                _ => {
                    return Err(PdfToolError::InvalidArgument(
                        "pageInterval must be greater than zero".into(),
                    ))
                }
            };
            Ok((0..total_pages)
                .step_by(interval as usize)
                .map(|offset| (offset + 1, (offset + interval).min(total_pages)))
                .collect())
        }
        SplitMethod::ExtractAllPages => Ok((1..=total_pages).map(|p| (p, p)).collect()),
    }
}

/// Split `doc` and serialize every part. `stem` is the source file name
/// without extension and prefixes every part name.
pub fn split_document(
    doc: &Document,
    stem: &str,
    method: SplitMethod,
    options: &SplitOptions,
) -> Result<Vec<SplitPart>> {
    let total_pages = super::page_count(doc);
    let spans = plan_split(method, options, total_pages)?;

    spans
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| {
            let placements: Vec<_> = (start..=end).map(PagePlacement::unrotated).collect();
            let mut part = rebuild(doc, &placements)?;

            let file_name = match method {
                SplitMethod::ExtractAllPages => format!("{}_page{}.pdf", stem, start),
                _ => format!("{}_part{}_pages{}-{}.pdf", stem, index + 1, start, end),
            };

            Ok(SplitPart {
                file_name,
                start,
                end,
                bytes: save(&mut part)?,
            })
        })
        .collect()
}
