//! Content-stream walkers over a [`backend::PdfBackend`].
//!
//! ```text
//! content ops ─┬─ layout   ->  TextSpan[] ->  TextLine[] ─┬─ table ->  rows
//!              └─ graphics -> FilledRect[] ───────────────┴─ bars  ->  headers
//! ```

pub mod backend;
pub mod bars;
pub mod graphics;
pub mod layout;
pub mod table;

#[cfg(test)]
pub(crate) mod mock;
