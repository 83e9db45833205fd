//! In-memory backend with pre-decoded operations per page.

use std::collections::BTreeMap;

use super::backend::{decode_text_simple, BackendFontInfo, ContentOp, PageId, PdfBackend, PdfValue};
use crate::PdfError;

pub struct MockBackend {
    pub pages: Vec<MockPage>,
    pub fonts: Vec<BackendFontInfo>,
}

pub struct MockPage {
    pub width: f32,
    pub height: f32,
    pub ops: Vec<ContentOp>,
}

impl MockBackend {
    pub fn single(ops: Vec<ContentOp>) -> Self {
        MockBackend {
            pages: vec![MockPage {
                width: 612.0,
                height: 792.0,
                ops,
            }],
            fonts: helvetica(),
        }
    }

    pub fn multi(pages: Vec<Vec<ContentOp>>) -> Self {
        MockBackend {
            pages: pages
                .into_iter()
                .map(|ops| MockPage {
                    width: 612.0,
                    height: 792.0,
                    ops,
                })
                .collect(),
            fonts: helvetica(),
        }
    }

    fn page(&self, page: PageId) -> Result<&MockPage, PdfError> {
        (page.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .ok_or_else(|| PdfError::Parse(format!("no page {:?}", page)))
    }
}

impl PdfBackend for MockBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        (1..=self.pages.len() as u32).map(|n| (n, (n, 0))).collect()
    }

    fn page_dimensions(&self, page: PageId) -> Result<(f32, f32), PdfError> {
        let p = self.page(page)?;
        Ok((p.width, p.height))
    }

    fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
        Ok(self.fonts.clone())
    }

    // The page number travels through the "raw bytes" so decode_content can
    // find the right pre-decoded ops.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        Ok(page.0.to_be_bytes().to_vec())
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let bytes: [u8; 4] = data
            .try_into()
            .map_err(|_| PdfError::Parse("bad mock content".into()))?;
        Ok(self.page((u32::from_be_bytes(bytes), 0))?.ops.clone())
    }

    fn decode_text(&self, _page: PageId, _font_name: &[u8], bytes: &[u8]) -> String {
        decode_text_simple(bytes)
    }
}

pub fn helvetica() -> Vec<BackendFontInfo> {
    vec![BackendFontInfo {
        name: b"F1".to_vec(),
        base_font: Some("Helvetica".to_string()),
    }]
}

pub fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
    ContentOp {
        operator: operator.to_string(),
        operands,
    }
}

pub fn nums(values: &[f32]) -> Vec<PdfValue> {
    values.iter().map(|v| PdfValue::Real(*v)).collect()
}

/// `BT /F1 size Tf 1 0 0 1 x y Tm (text) Tj ET`
pub fn text_at(text: &str, x: f32, y: f32, size: f32) -> Vec<ContentOp> {
    vec![
        op("BT", vec![]),
        op("Tf", vec![PdfValue::Name(b"F1".to_vec()), PdfValue::Real(size)]),
        op("Tm", nums(&[1.0, 0.0, 0.0, 1.0, x, y])),
        op("Tj", vec![PdfValue::Str(text.as_bytes().to_vec())]),
        op("ET", vec![]),
    ]
}

/// `q gray g x y w h re f Q`
pub fn grey_bar(gray: f32, x: f32, y: f32, w: f32, h: f32) -> Vec<ContentOp> {
    vec![
        op("q", vec![]),
        op("g", nums(&[gray])),
        op("re", nums(&[x, y, w, h])),
        op("f", vec![]),
        op("Q", vec![]),
    ]
}
