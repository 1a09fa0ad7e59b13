//! # Spreadsheet Reading
//!
//! Opens workbooks and loads their worksheets as [`Sheet`]s: the non-empty
//! cells (already converted to display text) and the declared merge ranges.
//! Every [`Sheet`] is a [`CellSource`](crate::outline::CellSource) for the
//! outline engine.
use crate::error::ResultMessage;
use crate::error::SheetOutlineError;
use crate::helpers::reader::UnifiedReader;
use std::path::Path;
use thiserror::Error;

mod cell;
mod criteria;
mod excel;
pub mod range;
mod sheet;
pub(crate) mod xls;
mod xlsx;

pub use criteria::Criteria;
pub use range::Range;
pub use sheet::Sheet;

use xls::XlsSpreadsheet;
use xlsx::XlsxSpreadsheet;

/// File extensions of the readable formats: SpreadsheetML workbooks and
/// Excel 97-2003 (BIFF8) workbooks.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xltx", "xltm", "xls"];

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Unsupported spreadsheet format: '{0}' (expected one of .xlsx, .xlsm, .xltx, .xltm, .xls)")]
    UnsupportedFormat(String),

    #[error("'{0}' has no part '{1}'")]
    MissingPartError(String, String),

    #[error("'{0}' is password protected")]
    PasswordProtectedError(String),

    #[error("'{0}' contains no worksheets")]
    EmptySpreadsheetError(String),

    #[error("'{0}' sheet '{1}' cell {2}: invalid shared string index '{3}'")]
    SharedStringError(String, String, String, String),
}

/// A workbook opened for reading.
pub trait Spreadsheet {
    /// File name the workbook was opened from.
    fn name(&self) -> &str;

    /// Names of all worksheets in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Loads the shared string table (empty when the workbook has none).
    fn load_shared_strings(&mut self) -> Result<Vec<String>, SheetOutlineError>;

    /// Reads the worksheets selected by `criteria`, in workbook order.
    /// Shared string cells still hold their table index.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, SheetOutlineError>;
}

/// Returns true if the file extension names a readable format.
pub fn is_supported_file(file_name: &str) -> bool {
    extension(file_name).is_some_and(|extension| SUPPORTED_EXTENSIONS.contains(&extension.as_str()))
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
}

/// Opens a workbook from disk, choosing the reader by file extension.
pub fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, SheetOutlineError> {
    if is_legacy_file(file_name)? {
        Ok(Box::new(XlsSpreadsheet::open(file_name).with_prefix(file_name)?))
    } else {
        Ok(Box::new(XlsxSpreadsheet::open(file_name).with_prefix(file_name)?))
    }
}

/// Opens a workbook already held in memory; `file_name` picks the reader and
/// names the workbook in messages.
pub fn open_spreadsheet_from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Box<dyn Spreadsheet>, SheetOutlineError> {
    let reader = UnifiedReader::from_bytes(bytes);
    if is_legacy_file(file_name)? {
        Ok(Box::new(XlsSpreadsheet::from_reader(file_name, reader).with_prefix(file_name)?))
    } else {
        Ok(Box::new(XlsxSpreadsheet::from_reader(file_name, reader).with_prefix(file_name)?))
    }
}

/// True for Excel 97-2003 files, false for SpreadsheetML, an error otherwise.
fn is_legacy_file(file_name: &str) -> Result<bool, SheetOutlineError> {
    if !is_supported_file(file_name) {
        Err(SpreadsheetError::UnsupportedFormat(file_name.to_owned()))?
    }
    Ok(extension(file_name).as_deref() == Some("xls"))
}

/// Reads the selected worksheets with shared strings resolved.
pub fn load_sheets(spreadsheet: &mut dyn Spreadsheet, criteria: &Criteria) -> Result<Vec<Sheet>, SheetOutlineError> {
    let shared_strings = spreadsheet.load_shared_strings()?;
    let mut sheets = spreadsheet.read_sheets(criteria)?;
    for sheet in &mut sheets {
        sheet.resolve_shared_strings(&shared_strings)?;
    }
    Ok(sheets)
}

/// Opens `file_name` and reads the worksheets selected by `criteria`.
pub fn read_workbook(file_name: &str, criteria: &Criteria) -> Result<Vec<Sheet>, SheetOutlineError> {
    let mut spreadsheet = open_spreadsheet(file_name)?;
    load_sheets(spreadsheet.as_mut(), criteria).with_prefix(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::CellSource;

    #[test]
    fn formats_are_chosen_by_extension() {
        assert!(is_supported_file("report.XLSX"));
        assert!(is_supported_file("dir/macro.xlsm"));
        assert!(is_supported_file("legacy.XLS"));
        assert!(!is_supported_file("noext"));

        let error = open_spreadsheet("data.csv").err().unwrap();
        assert!(matches!(
            error,
            SheetOutlineError::SpreadsheetError(SpreadsheetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_file_names_the_path() {
        let error = read_workbook("missing/book.xlsx", &Criteria::default()).err().unwrap();

        assert!(error.to_string().starts_with("missing/book.xlsx: "));
    }

    #[test]
    fn open_from_bytes() {
        let bytes = xlsx::tests::workbook(
            &[("Only", r#"<worksheet><sheetData><row r="2"><c r="B2" t="s"><v>0</v></c></row></sheetData></worksheet>"#)],
            "<sst><si><t>hello</t></si></sst>",
            "<styleSheet/>",
        );
        let mut spreadsheet = open_spreadsheet_from_bytes("memory.xlsx", bytes).unwrap();

        let sheets = load_sheets(spreadsheet.as_mut(), &Criteria::default()).unwrap();

        assert_eq!(spreadsheet.name(), "memory.xlsx");
        assert_eq!(sheets[0].dimensions(), (2, 2));
        assert_eq!(sheets[0].cell_text(1, 1).as_deref(), Some("hello"));
    }

    #[test]
    fn legacy_workbook_from_bytes() {
        let mut spreadsheet = open_spreadsheet_from_bytes("legacy.xls", xls::tests::workbook()).unwrap();

        let sheets = load_sheets(spreadsheet.as_mut(), &Criteria::default()).unwrap();

        assert_eq!(spreadsheet.sheet_names(), vec!["Report", "Notes"]);
        assert_eq!(sheets[0].merge_ranges(), None);
        assert_eq!(sheets[0].cell_text(0, 2).as_deref(), Some("Report"));
        assert_eq!(sheets[0].cell_text(1, 1).as_deref(), Some("Qty"));

        let error = open_spreadsheet_from_bytes("fake.xls", b"PK\x03\x04".to_vec()).err().unwrap();
        assert!(error.to_string().starts_with("fake.xls: "));
    }
}
