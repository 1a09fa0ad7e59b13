//! # Sheet Outline
//!
//! Turns spreadsheets with merged cells into linear text that keeps their
//! visual structure: titles, section headers and data tables.
//!
//! ## Features
//!
//! - **Merge-aware grid**: merged regions are read from the workbook and their
//!   value is kept once, at the top-left cell
//! - **Structure recovery**: rows are classified (header, data, sparse, blank),
//!   grouped into sections, and data sections are bounded into tables
//! - **Four renderings**: plain-text dump, hybrid markdown (headings plus pipe
//!   tables), LLM-optimized linear text, and a coordinate-level structure analysis
//! - **SpreadsheetML reader**: `.xlsx`, `.xlsm`, `.xltx` and `.xltm` workbooks with
//!   shared strings, number-format dates and sheet/range selection
//! - **Excel 97-2003 reader**: `.xls` workbooks; they carry no merge metadata, so
//!   runs of repeated values are collapsed instead
//!
//! ## Example
//!
//! ```no_run
//! use sheet_outline::{read_workbook, render_document, Criteria, Outline, OutputFormat};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sheets = read_workbook("report.xlsx", &Criteria::default())?;
//! let outlines = sheets
//!     .iter()
//!     .map(|sheet| Ok((sheet.name().to_owned(), Outline::analyze(sheet)?)))
//!     .collect::<Result<Vec<_>, sheet_outline::OutlineError>>()?;
//! println!("{}", render_document("report.xlsx", &outlines, OutputFormat::LlmOptimized));
//! # Ok(())
//! # }
//! ```
mod document;
mod error;
mod helpers;
pub mod outline;
pub mod spreadsheet;

pub use document::render_document;
pub use error::{ResultMessage, SheetOutlineError};
pub use outline::{Anomaly, Outline, OutlineError, OutputFormat};
pub use spreadsheet::{
    is_supported_file, load_sheets, open_spreadsheet, open_spreadsheet_from_bytes, read_workbook, Criteria, Range,
    Sheet, Spreadsheet,
};
