//! Core library for auto-oot
//!
//! This crate implements the **Functional Core** of the auto-oot tool,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`auto_oot_core`** (this crate): pure transformations with zero I/O
//! - **`pdf`**: datasheet table and header-bar extraction
//! - **`auto-oot`**: workbook I/O, CLI and orchestration (the Imperative Shell)
//!
//! Every function here works on in-memory values: rows of [`grid::CellValue`]
//! behind the [`grid::Grid`] trait, header labels, and configuration. Nothing
//! reads a file, so tests use hand-built fixtures only.
//!
//! # Module Organization
//!
//! - [`grid`]: cell values, column letters, cell references, the `Grid` trait
//! - [`segment`]: slice isolation, header discovery, header-to-row mapping, regions
//! - [`failure`]: exact failure matching and the parameter report
//! - [`analysis`]: conditional-format and validation rule sets, sheet naming
//! - [`trace`]: Reverse Trace schema, column mapping, product sort and sampling
//! - [`config`]: TOML configuration and its validation
//! - [`locate`]: working-directory resolution
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use auto_oot_core::failure::find_oot_parameters;
//! use auto_oot_core::grid::{CellValue, Column};
//! use auto_oot_core::segment::Strategy;
//!
//! let rows: Vec<Vec<CellValue>> = load_sliced_datasheet();
//! let bars = vec!["Voltage Accuracy".to_string(), "Frequency Response".to_string()];
//!
//! let report = find_oot_parameters(rows.as_slice(), Strategy::Geometric, &bars, Column::D);
//! for name in report.flagged() {
//!     println!("needs analysis: {name}");
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod failure;
pub mod grid;
pub mod locate;
pub mod segment;
pub mod text;
pub mod trace;
