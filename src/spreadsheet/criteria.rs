use crate::error::SheetOutlineError;
use crate::spreadsheet::range::Range;
use glob::Pattern;

/// Which sheets, and which part of each sheet, a reader loads.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Sheet name patterns; `None` accepts every sheet.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Maximum number of sheets to read.
    pub sheet_limit: Option<usize>,

    /// Cells outside this range are skipped.
    pub range: Option<Range>,
}

impl Criteria {
    /// Compiles glob patterns such as `Sheet*` or `[QY]?` into sheet filters.
    pub fn with_sheet_patterns<I, S>(mut self, patterns: I) -> Result<Self, SheetOutlineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| Pattern::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.sheet_name_patterns = Some(patterns).filter(|patterns| !patterns.is_empty());
        Ok(self)
    }

    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }

    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        self.range.map_or(true, |range| range.contains(row, col))
    }
}
