use crate::error::SheetOutlineError;
use crate::helpers::reference::col_to_index;
use crate::helpers::reference::row_to_index;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),
}

/// A1-style selection with optional bounds (0-based, inclusive).
///
/// `B2:H40` bounds both axes, `A:D` only columns, `3:10` only rows and `C5`
/// only the top-left corner.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Range {
    pub row_lower_bound: Option<usize>,
    pub row_upper_bound: Option<usize>,
    pub col_lower_bound: Option<usize>,
    pub col_upper_bound: Option<usize>,
}

impl Range {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.row_lower_bound.map_or(true, |lower| lower <= row)
            && self.row_upper_bound.map_or(true, |upper| row <= upper)
            && self.col_lower_bound.map_or(true, |lower| lower <= col)
            && self.col_upper_bound.map_or(true, |upper| col <= upper)
    }
}

impl TryFrom<&str> for Range {
    type Error = SheetOutlineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^\$?([A-Z]*)\$?(\d*)(:\$?([A-Z]*)\$?(\d*))?$")?;
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(&value)
            .filter(|_| !value.is_empty())
            .ok_or_else(|| RangeError::FormatError(value.to_owned()))?;
        let bound = |index: usize, parse: fn(&str) -> Option<usize>| {
            captures.get(index).map(|matcher| matcher.as_str()).and_then(parse)
        };
        Ok(Range {
            col_lower_bound: bound(1, col_to_index),
            row_lower_bound: bound(2, row_to_index),
            col_upper_bound: bound(4, col_to_index),
            row_upper_bound: bound(5, row_to_index),
        })
    }
}
