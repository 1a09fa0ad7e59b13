use thiserror::Error;

/// Crate-level error.
/// Wraps the errors of every layer so that readers can use `?` across them.
#[derive(Error, Debug)]
pub enum SheetOutlineError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    RegexError(#[from] regex::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    CfbHelperError(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    Biff8HelperError(#[from] crate::helpers::biff8::Biff8Error),

    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    XlsError(#[from] crate::spreadsheet::xls::XlsError),

    #[error("{0}")]
    RangeError(#[from] crate::spreadsheet::range::RangeError),

    // Outline module errors
    #[error("{0}")]
    OutlineError(#[from] crate::outline::OutlineError),
}

pub trait ResultMessage {
    /// Prepends `message: ` to the error text, keeping the value untouched.
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetOutlineError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetOutlineError::WithContextError(format!("{}: {}", message, e)))
    }
}
