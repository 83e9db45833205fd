//! Text span extraction and line grouping.
//!
//! ```text
//! content ops  ->  TextSpan[]  ->  TextLine[]
//!   (per page)      extract         group_spans_into_lines
//! ```
//!
//! Span positions are in page space: the text matrix origin is mapped through
//! the current transformation matrix, so tables drawn inside `cm`-scaled
//! form-like blocks still line up with the rectangles from the graphics
//! walker.

use std::cmp::Ordering;

use super::backend::{get_number_from_value, BackendFontInfo, PageId, PdfBackend, PdfValue};
use super::graphics::{
    horizontal_scale, matrix_operand, multiply, transform_point, vertical_scale, Matrix, IDENTITY,
};
use crate::PdfError;

/// A run of text at a position on the page.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
}

/// Spans sharing (approximately) one baseline.
#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
    pub x: f32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Baselines closer than this are the same line.
const Y_TOLERANCE: f32 = 1.0;

/// Glyph width as a fraction of the font size when no metrics are loaded.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Gap (points) above which two spans on a line are separate words.
const MIN_WORD_GAP: f32 = 1.5;

// ---------------------------------------------------------------------------
// Text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Current origin in page space.
    fn origin(&self, ctm: &Matrix) -> (f32, f32) {
        let (x, y) = (self.text_matrix[4], self.text_matrix[5] + self.text_rise);
        transform_point(ctm, x, y)
    }

    /// Rendered size: font size scaled by both the text matrix and the CTM.
    fn effective_font_size(&self, ctm: &Matrix) -> f32 {
        let trm = multiply(&self.text_matrix, ctm);
        (self.font_size * vertical_scale(&trm)).abs()
    }

    fn text_width(&self, text: &str, ctm: &Matrix) -> f32 {
        let n = text.chars().count() as f32;
        let trm = multiply(&self.text_matrix, ctm);
        n * self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale * horizontal_scale(&trm)
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Advance past `text` in text space.
    fn advance_after_show(&mut self, text: &str) {
        let glyph = self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale;
        let dx: f32 = text
            .chars()
            .map(|ch| glyph + self.char_spacing + if ch == ' ' { self.word_spacing } else { 0.0 })
            .sum();
        self.advance_x(dx);
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        let (x, y) = transform_point(&self.line_matrix, tx, ty);
        self.line_matrix[4] = x;
        self.line_matrix[5] = y;
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }
}

fn resolve_font_name(key: &[u8], fonts: &[BackendFontInfo]) -> String {
    fonts
        .iter()
        .find(|info| info.name == key)
        .and_then(|info| info.base_font.clone())
        .unwrap_or_else(|| String::from_utf8_lossy(key).into_owned())
}

/// Walks one page, emitting spans into `spans`.
struct SpanCollector<'a> {
    backend: &'a dyn PdfBackend,
    page_id: PageId,
    fonts: Vec<BackendFontInfo>,
    state: TextState,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    spans: Vec<TextSpan>,
}

impl<'a> SpanCollector<'a> {
    fn decode(&self, val: &PdfValue) -> String {
        match val {
            PdfValue::Str(bytes) => self.backend.decode_text(self.page_id, &self.state.font_key, bytes),
            _ => String::new(),
        }
    }

    fn push_span(&mut self, text: &str, x: f32, y: f32) {
        let trimmed = text.trim_end();
        if trimmed.trim().is_empty() {
            return;
        }
        self.spans.push(TextSpan {
            text: trimmed.to_string(),
            x,
            y,
            width: self.state.text_width(trimmed, &self.ctm),
            font_size: self.state.effective_font_size(&self.ctm),
            font_name: self.state.font_name.clone(),
        });
    }

    fn show(&mut self, operand: &PdfValue) {
        let text = self.decode(operand);
        if text.is_empty() {
            return;
        }
        let (x, y) = self.state.origin(&self.ctm);
        self.push_span(&text, x, y);
        self.state.advance_after_show(&text);
    }

    /// `TJ`: strings interleaved with kerning in thousandths of text space.
    /// Large negative kerning reads as a word gap.
    fn show_array(&mut self, arr: &[PdfValue]) {
        let mut buf = String::new();
        let (mut x, y) = self.state.origin(&self.ctm);

        for elem in arr {
            match elem {
                PdfValue::Str(_) => {
                    let fragment = self.decode(elem);
                    if buf.is_empty() {
                        x = self.state.origin(&self.ctm).0;
                    }
                    buf.push_str(&fragment);
                    self.state.advance_after_show(&fragment);
                }
                other => {
                    if let Some(adj) = get_number_from_value(other) {
                        let s = &self.state;
                        let dx = -adj / 1000.0 * s.font_size * s.horiz_scale;
                        let gap = s.font_size * APPROX_CHAR_WIDTH_RATIO * s.horiz_scale * 0.3;
                        if dx > gap && !buf.is_empty() {
                            buf.push(' ');
                        }
                        self.state.advance_x(dx);
                    }
                }
            }
        }

        self.push_span(&buf, x, y);
    }

    fn apply(&mut self, operator: &str, operands: &[PdfValue]) {
        let num = |i: usize| operands.get(i).and_then(get_number_from_value);

        match operator {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(saved) = self.ctm_stack.pop() {
                    self.ctm = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }

            "BT" => {
                self.state.text_matrix = IDENTITY;
                self.state.line_matrix = IDENTITY;
            }
            "Tf" => {
                let key = match operands.first() {
                    Some(PdfValue::Name(n)) => n.clone(),
                    _ => return,
                };
                self.state.font_name = resolve_font_name(&key, &self.fonts);
                self.state.font_key = key;
                self.state.font_size = num(1).unwrap_or(0.0);
            }
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.state.text_matrix = m;
                    self.state.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.leading = -ty;
                    self.state.translate_line(tx, ty);
                }
            }
            "T*" => self.state.next_line(),
            "TL" => self.state.leading = num(0).unwrap_or(self.state.leading),
            "Tc" => self.state.char_spacing = num(0).unwrap_or(self.state.char_spacing),
            "Tw" => self.state.word_spacing = num(0).unwrap_or(self.state.word_spacing),
            "Tz" => {
                if let Some(v) = num(0) {
                    self.state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => self.state.text_rise = num(0).unwrap_or(self.state.text_rise),

            "Tj" => {
                if let Some(first) = operands.first() {
                    self.show(first);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    self.show_array(arr);
                }
            }
            "'" => {
                self.state.next_line();
                if let Some(first) = operands.first() {
                    self.show(first);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(text)) = (num(0), num(1), operands.get(2)) {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                    self.state.next_line();
                    self.show(text);
                }
            }

            _ => {}
        }
    }
}

/// Walk a page's content stream and return its text spans.
///
/// Handles the text operators (`BT`, `Tf`, `Tm`, `Td`, `TD`, `T*`, `TL`,
/// `Tc`, `Tw`, `Tz`, `Ts`, `Tj`, `TJ`, `'`, `"`) and the graphics-state
/// operators that move text (`q`, `Q`, `cm`).
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextSpan>, PdfError> {
    let ops = backend.page_ops(page_id)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut collector = SpanCollector {
        backend,
        page_id,
        fonts,
        state: TextState::default(),
        ctm: IDENTITY,
        ctm_stack: Vec::new(),
        spans: Vec::new(),
    };

    for op in &ops {
        collector.apply(&op.operator, &op.operands);
    }

    Ok(collector.spans)
}

// ---------------------------------------------------------------------------
// Line grouping
// ---------------------------------------------------------------------------

fn by_position(a: &TextSpan, b: &TextSpan) -> Ordering {
    b.y.partial_cmp(&a.y)
        .unwrap_or(Ordering::Equal)
        .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
}

/// Group spans into lines, top of page first. Within a line, touching spans
/// of the same font are merged so a word split across `Tj` calls becomes one
/// span again.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(by_position);

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();

    for span in spans {
        match current.first() {
            Some(first) if (span.y - first.y).abs() > Y_TOLERANCE => {
                lines.push(assemble_line(std::mem::take(&mut current)));
            }
            _ => {}
        }
        current.push(span);
    }

    if !current.is_empty() {
        lines.push(assemble_line(current));
    }

    lines
}

fn assemble_line(mut spans: Vec<TextSpan>) -> TextLine {
    spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

    let mut merged: Vec<TextSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(prev) = merged.last_mut() {
            let gap = span.x - (prev.x + prev.width);
            let same_font =
                prev.font_name == span.font_name && (prev.font_size - span.font_size).abs() < 0.5;

            if same_font && gap < MIN_WORD_GAP && gap > -prev.font_size {
                prev.text.push_str(&span.text);
                prev.width = (span.x + span.width) - prev.x;
                continue;
            }
        }
        merged.push(span);
    }

    TextLine {
        y: merged.first().map(|s| s.y).unwrap_or(0.0),
        x: merged.first().map(|s| s.x).unwrap_or(0.0),
        spans: merged,
    }
}
