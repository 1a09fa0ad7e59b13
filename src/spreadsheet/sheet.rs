use crate::error::SheetOutlineError;
use crate::outline::CellSource;
use crate::outline::MergeRange;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;

/// One worksheet as loaded from a workbook: its non-empty cells in row-major
/// order and the merge ranges it declares.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub(crate) file_name: String,
    pub(crate) name: String,
    pub(crate) cells: Vec<Cell>,
    pub(crate) merges: Vec<MergeRange>,
    /// False for formats that store no merge records
    has_merge_metadata: bool,
    /// One past the highest occupied row
    rows: usize,
    /// One past the highest occupied column
    cols: usize,
}

impl Sheet {
    pub(crate) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            merges: Vec::new(),
            has_merge_metadata: true,
            rows: 0,
            cols: 0,
        }
    }

    /// Sheet of a format that stores no merge records; the outline falls back
    /// to collapsing repeated values.
    pub(crate) fn without_merge_metadata(file_name: &str, name: &str) -> Self {
        Self {
            has_merge_metadata: false,
            ..Self::new(file_name, name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn merges(&self) -> &[MergeRange] {
        &self.merges
    }

    pub(crate) fn push(&mut self, cell: Cell) {
        self.extend_bounds(cell.row, cell.col);
        self.cells.push(cell);
    }

    pub(crate) fn push_merge(&mut self, range: MergeRange) {
        self.extend_bounds(range.end_row, range.end_col);
        self.merges.push(range);
    }

    fn extend_bounds(&mut self, row: usize, col: usize) {
        self.rows = self.rows.max(row + 1);
        self.cols = self.cols.max(col + 1);
    }

    /// Restores row-major order and keeps the last value written to a cell.
    pub(crate) fn finish(&mut self) {
        self.cells.sort_by_key(|cell| (cell.row, cell.col));
        let mut deduplicated = Vec::<Cell>::with_capacity(self.cells.len());
        for cell in self.cells.drain(..) {
            match deduplicated.last_mut() {
                Some(last) if (last.row, last.col) == (cell.row, cell.col) => *last = cell,
                _ => deduplicated.push(cell),
            }
        }
        self.cells = deduplicated;
    }

    /// Replaces shared string indexes with the strings themselves.
    pub(crate) fn resolve_shared_strings(&mut self, shared_strings: &[String]) -> Result<(), SheetOutlineError> {
        for cell in self.cells.iter_mut().filter(|cell| cell.kind == CellType::SharedString) {
            let text = cell
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| shared_strings.get(index))
                .ok_or_else(|| {
                    SpreadsheetError::SharedStringError(
                        self.file_name.to_owned(),
                        self.name.to_owned(),
                        cell.reference(),
                        cell.value.to_owned(),
                    )
                })?;
            cell.value = text.to_owned();
            cell.kind = CellType::InlineString;
        }
        Ok(())
    }

    fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&(row, col), |cell| (cell.row, cell.col))
            .ok()
            .map(|index| &self.cells[index])
    }
}

impl CellSource for Sheet {
    fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn cell_text(&self, row: usize, col: usize) -> Option<String> {
        self.cell(row, col).map(Cell::text)
    }

    fn merge_ranges(&self) -> Option<Vec<MergeRange>> {
        self.has_merge_metadata.then(|| self.merges.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::{Outline, OutlineError, MAX_COLS, MAX_ROWS};

    fn push(sheet: &mut Sheet, row: usize, col: usize, kind: CellType, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind,
            value: value.to_owned(),
        });
    }

    #[test]
    fn bounds_cover_cells_and_merges() {
        let mut sheet = Sheet::new("book.xlsx", "Data");
        assert_eq!(sheet.dimensions(), (0, 0));

        push(&mut sheet, 1, 1, CellType::Number, "1");
        sheet.push_merge(MergeRange::new(3, 4, 0, 5));
        sheet.finish();

        assert_eq!(sheet.dimensions(), (5, 6));
        assert_eq!(sheet.cell_text(1, 1).as_deref(), Some("1"));
        assert_eq!(sheet.cell_text(0, 0), None);
    }

    #[test]
    fn out_of_order_cells_are_sorted() {
        let mut sheet = Sheet::new("book.xlsx", "Data");
        push(&mut sheet, 2, 0, CellType::InlineString, "c");
        push(&mut sheet, 0, 1, CellType::InlineString, "a");
        push(&mut sheet, 0, 1, CellType::InlineString, "b");
        sheet.finish();

        assert_eq!(sheet.cells.len(), 2);
        assert_eq!(sheet.cell_text(0, 1).as_deref(), Some("b"));
        assert_eq!(sheet.cell_text(2, 0).as_deref(), Some("c"));
    }

    #[test]
    fn shared_strings_are_resolved() {
        let mut sheet = Sheet::new("book.xlsx", "Data");
        push(&mut sheet, 0, 0, CellType::SharedString, "1");
        push(&mut sheet, 0, 1, CellType::Boolean, "1");
        sheet.finish();
        sheet.resolve_shared_strings(&["zero".to_owned(), "one".to_owned()]).unwrap();

        assert_eq!(sheet.cell_text(0, 0).as_deref(), Some("one"));
        assert_eq!(sheet.cell_text(0, 1).as_deref(), Some("TRUE"));

        let mut broken = Sheet::new("book.xlsx", "Data");
        push(&mut broken, 0, 0, CellType::SharedString, "7");
        let error = broken.resolve_shared_strings(&[]).unwrap_err();
        assert!(error.to_string().contains("A1"));
    }

    #[test]
    fn sheet_feeds_the_outline() {
        let mut sheet = Sheet::new("book.xlsx", "Data");
        push(&mut sheet, 0, 0, CellType::InlineString, "Report");
        sheet.push_merge(MergeRange::new(0, 0, 0, 2));
        for col in 0..3 {
            push(&mut sheet, 1, col, CellType::InlineString, ["a", "b", "c"][col]);
            push(&mut sheet, 2, col, CellType::Number, ["1", "2", "3"][col]);
        }
        sheet.finish();

        let outline = Outline::analyze(&sheet).unwrap();

        assert_eq!(outline.tables().len(), 1);
        assert_eq!(outline.grid().get(0, 0), "Report");
    }

    #[test]
    fn stray_value_in_last_cell_is_an_error() {
        let mut sheet = Sheet::new("book.xlsx", "Data");
        push(&mut sheet, 0, 0, CellType::InlineString, "a");
        push(&mut sheet, MAX_ROWS - 1, MAX_COLS - 1, CellType::InlineString, "stray");
        sheet.finish();

        assert_eq!(sheet.dimensions(), (MAX_ROWS, MAX_COLS));
        assert!(matches!(Outline::analyze(&sheet), Err(OutlineError::InvalidArgument(_))));
    }

    #[test]
    fn legacy_sheets_report_no_merge_metadata() {
        let mut sheet = Sheet::without_merge_metadata("book.xls", "Data");
        for col in 0..3 {
            push(&mut sheet, 0, col, CellType::InlineString, "Total");
        }
        sheet.finish();

        assert_eq!(sheet.merge_ranges(), None);
        assert_eq!(sheet.file_name(), "book.xls");
        let outline = Outline::analyze(&sheet).unwrap();
        assert_eq!(outline.grid().row(0), ["Total", "", ""]);
    }
}
