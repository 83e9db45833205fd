//! Shaded header-bar detection.
//!
//! Datasheets mark each parameter section with a full-width grey bar whose
//! text is the parameter name. A bar is any filled rectangle that spans
//! most of the page width, has a header-like height and a neutral grey fill.

use std::collections::HashSet;

use log::{debug, warn};

use super::backend::{PageId, PdfBackend};
use super::graphics::extract_page_rects;
use super::layout::{extract_page_spans, group_spans_into_lines, TextSpan};
use crate::text::normalize;
use crate::types::{FilledRect, HeaderCandidate, PdfRect};
use crate::PdfError;

/// Thresholds for the bar heuristic.
#[derive(Debug, Clone)]
pub struct BarDetectorConfig {
    /// Minimum bar width as a fraction of the page width.
    pub min_width_ratio: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Shrink applied to the bar before collecting its text.
    pub inset: f32,
    /// Maximum spread between the RGB channels.
    pub grey_tolerance: f32,
    pub grey_min: f32,
    pub grey_max: f32,
}

impl Default for BarDetectorConfig {
    fn default() -> Self {
        Self {
            min_width_ratio: 0.8,
            min_height: 8.0,
            max_height: 60.0,
            inset: 1.5,
            grey_tolerance: 0.05,
            grey_min: 0.2,
            grey_max: 0.9,
        }
    }
}

pub fn is_header_bar(rect: &FilledRect, page_width: f32, config: &BarDetectorConfig) -> bool {
    let Some(fill) = rect.fill else {
        return false;
    };
    let height = rect.rect.height();

    rect.rect.width() >= page_width * config.min_width_ratio
        && (config.min_height..=config.max_height).contains(&height)
        && fill.is_grey(config.grey_tolerance, config.grey_min, config.grey_max)
}

/// Text whose origin falls inside the inset bar, line by line.
pub fn bar_text(rect: &PdfRect, spans: &[TextSpan], config: &BarDetectorConfig) -> String {
    let area = rect.inset(config.inset);
    let inside: Vec<TextSpan> = spans
        .iter()
        .filter(|s| area.contains(s.x, s.y))
        .cloned()
        .collect();

    let joined = group_spans_into_lines(inside)
        .iter()
        .map(|line| line.text())
        .collect::<Vec<_>>()
        .join(" ");
    normalize(&joined)
}

/// Header candidates of a single page, top of the page first.
pub fn page_header_candidates(
    page: u32,
    page_width: f32,
    rects: &[FilledRect],
    spans: &[TextSpan],
    config: &BarDetectorConfig,
) -> Vec<HeaderCandidate> {
    let mut candidates: Vec<HeaderCandidate> = rects
        .iter()
        .filter(|r| is_header_bar(r, page_width, config))
        .filter_map(|r| {
            let text = bar_text(&r.rect, spans, config);
            if text.is_empty() {
                return None;
            }
            Some(HeaderCandidate {
                page,
                top: r.rect.y1,
                text,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.top.partial_cmp(&a.top).unwrap_or(std::cmp::Ordering::Equal));
    candidates
}

fn page_candidates(
    backend: &dyn PdfBackend,
    page: u32,
    page_id: PageId,
    config: &BarDetectorConfig,
) -> Result<Vec<HeaderCandidate>, PdfError> {
    let (width, _) = backend.page_dimensions(page_id)?;
    let rects = extract_page_rects(backend, page_id)?;
    let spans = extract_page_spans(backend, page_id)?;
    Ok(page_header_candidates(page, width, &rects, &spans, config))
}

/// Header bars of the whole document in page order.
///
/// A page whose content cannot be read is skipped with a warning.
pub fn detect_header_bars(
    backend: &dyn PdfBackend,
    config: &BarDetectorConfig,
) -> Vec<HeaderCandidate> {
    let mut out = Vec::new();
    for (page, page_id) in backend.pages() {
        match page_candidates(backend, page, page_id, config) {
            Ok(found) => {
                debug!("page {page}: {} header bar(s)", found.len());
                out.extend(found);
            }
            Err(e) => warn!("Skipping page {page} for header bars: {e}"),
        }
    }
    out
}

/// Candidate texts, deduplicated in first-seen order.
pub fn header_texts(candidates: &[HeaderCandidate]) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|c| seen.insert(c.text.clone()))
        .map(|c| c.text.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::backend::ContentOp;
    use super::super::mock::{grey_bar, op, text_at, MockBackend};
    use super::*;
    use crate::types::Rgb;

    fn bar(fill: Option<Rgb>, x0: f32, y0: f32, x1: f32, y1: f32) -> FilledRect {
        FilledRect {
            rect: PdfRect { x0, y0, x1, y1 },
            fill,
        }
    }

    fn page(headers: &[(&str, f32)]) -> Vec<ContentOp> {
        let mut ops = Vec::new();
        for (text, y) in headers {
            ops.extend(grey_bar(0.8, 30.0, *y, 552.0, 14.0));
            ops.extend(text_at(text, 40.0, y + 4.0, 10.0));
        }
        ops
    }

    #[test]
    fn qualifying_bar() {
        let cfg = BarDetectorConfig::default();
        let gray = Some(Rgb::gray(0.8));
        assert!(is_header_bar(&bar(gray, 30.0, 700.0, 582.0, 714.0), 612.0, &cfg));
        // Too narrow.
        assert!(!is_header_bar(&bar(gray, 30.0, 700.0, 300.0, 714.0), 612.0, &cfg));
        // Too thin, too tall.
        assert!(!is_header_bar(&bar(gray, 30.0, 700.0, 582.0, 705.0), 612.0, &cfg));
        assert!(!is_header_bar(&bar(gray, 30.0, 100.0, 582.0, 700.0), 612.0, &cfg));
        // Not grey.
        let blue = Some(Rgb::new(0.0, 0.69, 0.94));
        assert!(!is_header_bar(&bar(blue, 30.0, 700.0, 582.0, 714.0), 612.0, &cfg));
        assert!(!is_header_bar(&bar(Some(Rgb::BLACK), 30.0, 700.0, 582.0, 714.0), 612.0, &cfg));
        assert!(!is_header_bar(&bar(None, 30.0, 700.0, 582.0, 714.0), 612.0, &cfg));
    }

    #[test]
    fn bar_text_ignores_text_outside_inset() {
        let backend = MockBackend::single(
            [
                text_at("Rise  Time", 40.0, 704.0, 10.0),
                text_at("below", 40.0, 690.0, 10.0),
                text_at("edge", 31.0, 704.0, 10.0),
            ]
            .concat(),
        );
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        let rect = PdfRect { x0: 30.0, y0: 700.0, x1: 582.0, y1: 714.0 };
        assert_eq!(bar_text(&rect, &spans, &BarDetectorConfig::default()), "Rise Time");
    }

    #[test]
    fn candidates_sorted_top_down_within_page() {
        // Drawn bottom-up in the stream.
        let backend = MockBackend::single(page(&[("Lower", 300.0), ("Upper", 700.0)]));
        let found = detect_header_bars(&backend, &BarDetectorConfig::default());
        let texts: Vec<_> = found.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Upper", "Lower"]);
        assert!(found[0].top > found[1].top);
    }

    #[test]
    fn pages_are_appended_in_order() {
        let backend = MockBackend::multi(vec![
            page(&[("Voltage Accuracy", 600.0)]),
            page(&[("Frequency Response", 700.0), ("Voltage Accuracy", 400.0)]),
        ]);
        let found = detect_header_bars(&backend, &BarDetectorConfig::default());
        assert_eq!(found.len(), 3);
        assert_eq!(found[1].page, 2);
        assert_eq!(
            header_texts(&found),
            vec!["Voltage Accuracy".to_string(), "Frequency Response".to_string()]
        );
    }

    #[test]
    fn empty_bars_are_dropped() {
        let mut ops = grey_bar(0.8, 30.0, 700.0, 552.0, 14.0);
        ops.push(op("n", vec![]));
        let backend = MockBackend::single(ops);
        assert!(detect_header_bars(&backend, &BarDetectorConfig::default()).is_empty());
    }
}
