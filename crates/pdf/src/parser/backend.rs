use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// Font resource key and base font name, as declared on a page.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// Resource key (e.g. `b"F1"`).
    pub name: Vec<u8>,
    pub base_font: Option<String>,
}

/// A lopdf-independent PDF value, so the content-stream walkers can be fed
/// hand-built operations in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// All operands as numbers, or `None` if any operand is not numeric.
    pub fn numbers(&self) -> Option<Vec<f32>> {
        self.operands.iter().map(get_number_from_value).collect()
    }
}

pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object`; stream bodies are dropped, only their
/// dictionary survives.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Stream(stream) => PdfValue::Dict(
            stream
                .dict
                .iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Decode string bytes: UTF-16BE with BOM, then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Everything the extractors need from a parsed PDF.
pub trait PdfBackend {
    /// 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// `(width, height)` of the page's MediaBox, in points.
    fn page_dimensions(&self, page: PageId) -> Result<(f32, f32), PdfError>;

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError>;

    /// Raw (possibly compressed) content stream bytes.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode the bytes of a text-showing operand for the given font.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// Decoded operations of one page.
    fn page_ops(&self, page: PageId) -> Result<Vec<ContentOp>, PdfError> {
        let raw = self.page_content(page)?;
        self.decode_content(&raw)
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Walk up the page tree until a MediaBox is found.
    fn find_media_box(&self, dict: &lopdf::Dictionary) -> Option<Vec<lopdf::Object>> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            if let Some(arr) = self.resolve_array(obj) {
                return Some(arr);
            }
        }

        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent_dict = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        self.find_media_box(parent_dict)
    }

    fn resolve_array(&self, obj: &lopdf::Object) -> Option<Vec<lopdf::Object>> {
        match obj {
            lopdf::Object::Array(arr) => Some(arr.clone()),
            lopdf::Object::Reference(id) => self
                .doc
                .get_object(*id)
                .ok()
                .and_then(|o| o.as_array().ok())
                .cloned(),
            _ => None,
        }
    }

    fn resolve_number(&self, obj: &lopdf::Object) -> Result<f32, PdfError> {
        let resolved = match obj {
            lopdf::Object::Reference(id) => self
                .doc
                .get_object(*id)
                .map_err(|e| PdfError::Parse(e.to_string()))?,
            other => other,
        };
        match resolved {
            lopdf::Object::Integer(i) => Ok(*i as f32),
            lopdf::Object::Real(f) => Ok(*f),
            other => Err(PdfError::Parse(format!("expected number, got {:?}", other))),
        }
    }

    fn font_encoding_name(&self, page: PageId, font_name: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        match fonts.get(font_name)?.get(b"Encoding").ok()? {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_dimensions(&self, page: PageId) -> Result<(f32, f32), PdfError> {
        let page_dict = self
            .doc
            .get_object(page)
            .and_then(|o| o.as_dict())
            .map_err(|e| PdfError::Parse(format!("cannot read page dictionary: {}", e)))?;

        let media_box = self
            .find_media_box(page_dict)
            .ok_or_else(|| PdfError::Parse("MediaBox not found for page".into()))?;
        if media_box.len() < 4 {
            return Err(PdfError::Parse(format!(
                "MediaBox has {} elements, expected 4",
                media_box.len()
            )));
        }

        let nums = media_box
            .iter()
            .take(4)
            .map(|o| self.resolve_number(o))
            .collect::<Result<Vec<f32>, PdfError>>()?;

        Ok(((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs()))
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts
            .iter()
            .map(|(name, dict)| BackendFontInfo {
                name: name.clone(),
                base_font: dict
                    .get(b"BaseFont")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).into_owned()),
            })
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        // Identity-H fonts carry 2-byte codes that are usually Unicode.
        let identity = self
            .font_encoding_name(page, font_name)
            .is_some_and(|enc| enc.contains("Identity"));
        if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&units);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }

        decode_text_simple(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_simple_utf8() {
        assert_eq!(decode_text_simple("Pass".as_bytes()), "Pass");
        assert_eq!(decode_text_simple("\u{00B5}s".as_bytes()), "\u{00B5}s");
    }

    #[test]
    fn decode_text_simple_latin1_fallback() {
        // 0xB1 is the plus-minus sign in Latin-1, invalid as lone UTF-8.
        assert_eq!(decode_text_simple(&[0xB1, 0x35]), "\u{00B1}5");
    }

    #[test]
    fn decode_text_simple_utf16be() {
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x46, 0x00, 0x61]), "Fa");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41, 0x00]), "A");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF]), "");
    }

    #[test]
    fn numbers_requires_all_numeric() {
        let op = ContentOp {
            operator: "re".into(),
            operands: vec![PdfValue::Integer(10), PdfValue::Real(2.5)],
        };
        assert_eq!(op.numbers(), Some(vec![10.0, 2.5]));

        let op = ContentOp {
            operator: "scn".into(),
            operands: vec![PdfValue::Real(0.5), PdfValue::Name(b"P0".to_vec())],
        };
        assert_eq!(op.numbers(), None);
    }

    #[test]
    fn convert_scalars_and_containers() {
        assert_eq!(convert_object(&lopdf::Object::Null), PdfValue::Null);
        assert_eq!(convert_object(&lopdf::Object::Real(0.5)), PdfValue::Real(0.5));
        assert_eq!(
            convert_object(&lopdf::Object::Array(vec![
                lopdf::Object::Integer(0),
                lopdf::Object::Name(b"DeviceRGB".to_vec()),
            ])),
            PdfValue::Array(vec![PdfValue::Integer(0), PdfValue::Name(b"DeviceRGB".to_vec())]),
        );
        assert_eq!(
            convert_object(&lopdf::Object::Reference((7, 0))),
            PdfValue::Reference((7, 0))
        );
    }

    #[test]
    fn convert_stream_keeps_dictionary() {
        let mut dict = lopdf::Dictionary::new();
        dict.set("Length", lopdf::Object::Integer(0));
        let obj = lopdf::Object::Stream(lopdf::Stream::new(dict, vec![]));

        match convert_object(&obj) {
            PdfValue::Dict(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, b"Length");
            }
            other => panic!("expected Dict, got {:?}", other),
        }
    }

    #[test]
    fn load_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }
}
