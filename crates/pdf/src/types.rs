use serde::{Deserialize, Serialize};

/// One extracted table row: a cell per detected column, `None` when empty.
pub type RawRow = Vec<Option<String>>;

/// A device RGB color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::gray(0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Rgb { r, g, b }
    }

    pub const fn gray(level: f32) -> Self {
        Rgb {
            r: level,
            g: level,
            b: level,
        }
    }

    /// Naive CMYK to RGB conversion, good enough for flat fills.
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Rgb {
            r: (1.0 - c) * (1.0 - k),
            g: (1.0 - m) * (1.0 - k),
            b: (1.0 - y) * (1.0 - k),
        }
    }

    /// Neutral (channels within `tolerance` of each other) and inside the
    /// `[min, max]` band on every channel.
    pub fn is_grey(&self, tolerance: f32, min: f32, max: f32) -> bool {
        let channels = [self.r, self.g, self.b];
        let hi = channels.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let lo = channels.iter().cloned().fold(f32::INFINITY, f32::min);
        hi - lo < tolerance && channels.iter().all(|c| (min..=max).contains(c))
    }
}

/// An axis-aligned rectangle in page space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PdfRect {
    /// Normalize two opposite corners.
    pub fn from_corners(ax: f32, ay: f32, bx: f32, by: f32) -> Self {
        PdfRect {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Shrink every edge by `amount`.
    pub fn inset(&self, amount: f32) -> Self {
        PdfRect {
            x0: self.x0 + amount,
            y0: self.y0 + amount,
            x1: self.x1 - amount,
            y1: self.y1 - amount,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// A filled rectangle and its fill color (`None` for pattern fills).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilledRect {
    pub rect: PdfRect,
    pub fill: Option<Rgb>,
}

/// A shaded bar that looks like a section header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCandidate {
    /// 1-based page number.
    pub page: u32,
    /// Top edge of the bar; larger is higher on the page.
    pub top: f32,
    pub text: String,
}
