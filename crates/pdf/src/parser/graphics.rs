//! Filled-rectangle extraction from page content streams.
//!
//! Only `re` path segments are collected; curves and free-form paths never
//! produce header bars, so they are skipped. The walker tracks the graphics
//! state stack (`q`/`Q`), the CTM (`cm`) and the non-stroking color set by
//! `g`, `rg`, `k`, `sc`, `scn` and `cs`.

use log::trace;

use super::backend::{get_number_from_value, ContentOp, PageId, PdfBackend, PdfValue};
use crate::types::{FilledRect, PdfRect, Rgb};
use crate::PdfError;

/// Affine matrix `[a, b, c, d, e, f]`.
pub type Matrix = [f32; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m × n`: apply `m` first, then `n` (PDF's `cm` is `m × CTM`).
pub fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

pub fn transform_point(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Length of a unit vertical vector after `m`, used to scale font sizes.
pub fn vertical_scale(m: &Matrix) -> f32 {
    (m[2].powi(2) + m[3].powi(2)).sqrt()
}

pub fn horizontal_scale(m: &Matrix) -> f32 {
    (m[0].powi(2) + m[1].powi(2)).sqrt()
}

/// Six numeric operands as a matrix.
pub fn matrix_operand(operands: &[PdfValue]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let v: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    match v.as_slice() {
        [a, b, c, d, e, f] => Some([*a, *b, *c, *d, *e, *f]),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: Option<Rgb>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            fill: Some(Rgb::BLACK),
        }
    }
}

/// Color from `sc`/`scn` style operands: 1 = gray, 3 = RGB, 4 = CMYK.
/// A trailing name means a pattern, which has no flat color.
fn color_from_operands(operands: &[PdfValue]) -> Option<Rgb> {
    if matches!(operands.last(), Some(PdfValue::Name(_))) {
        return None;
    }
    let v: Vec<f32> = operands.iter().filter_map(get_number_from_value).collect();
    match v.as_slice() {
        [g] => Some(Rgb::gray(*g)),
        [r, g, b] => Some(Rgb::new(*r, *g, *b)),
        [c, m, y, k] => Some(Rgb::from_cmyk(*c, *m, *y, *k)),
        _ => None,
    }
}

/// Walk decoded operations and return every rectangle painted by a fill.
pub fn filled_rects(ops: &[ContentOp]) -> Vec<FilledRect> {
    let mut state = GraphicsState::default();
    let mut stack: Vec<GraphicsState> = Vec::new();
    let mut path: Vec<PdfRect> = Vec::new();
    let mut out = Vec::new();

    for op in ops {
        match op.operator.as_str() {
            "q" => stack.push(state),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    state = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(&op.operands) {
                    state.ctm = multiply(&m, &state.ctm);
                }
            }

            "g" | "rg" | "k" | "sc" | "scn" => state.fill = color_from_operands(&op.operands),
            // A new color space resets the color to its initial value.
            "cs" => state.fill = Some(Rgb::BLACK),

            "re" => {
                if let Some(&[x, y, w, h]) = op.numbers().as_deref() {
                    let corners = [(x, y), (x + w, y), (x, y + h), (x + w, y + h)]
                        .map(|(px, py)| transform_point(&state.ctm, px, py));
                    let xs = corners.map(|c| c.0);
                    let ys = corners.map(|c| c.1);
                    path.push(PdfRect {
                        x0: xs.iter().cloned().fold(f32::INFINITY, f32::min),
                        y0: ys.iter().cloned().fold(f32::INFINITY, f32::min),
                        x1: xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
                        y1: ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
                    });
                }
            }

            "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                for rect in path.drain(..) {
                    out.push(FilledRect {
                        rect,
                        fill: state.fill,
                    });
                }
            }
            "S" | "s" | "n" => path.clear(),

            _ => {}
        }
    }

    trace!("{} filled rectangle(s)", out.len());
    out
}

pub fn extract_page_rects(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<FilledRect>, PdfError> {
    let ops = backend.page_ops(page_id)?;
    Ok(filled_rects(&ops))
}
