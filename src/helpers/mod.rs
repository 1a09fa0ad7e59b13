//! Low-level plumbing for the workbook readers.
pub(crate) mod biff8;
pub(crate) mod bytes;
pub(crate) mod cfb;
pub(crate) mod reader;
pub(crate) mod reference;
pub(crate) mod xml;
pub(crate) mod zip;
