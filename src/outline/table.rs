use crate::outline::classify::RowLabel;
use crate::outline::grid::Grid;
use crate::outline::segment::Section;
use crate::outline::DATA_MIN_CELLS;

/// A bounded table: a header row and the data rows below it.
///
/// The column set is fixed by the header row. Every data row is read through
/// exactly those columns; anything written in other columns is dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    /// Header row.
    pub start_row: usize,
    /// Last data row (inclusive). Tolerated blank gaps lie inside the range.
    pub end_row: usize,
    /// Grid columns with a non-empty header cell, left to right.
    pub header_columns: Vec<usize>,
    /// Header text of each column in `header_columns`.
    pub header_titles: Vec<String>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.header_columns.len()
    }

    /// Rows after the header that have content in at least one table column,
    /// as `(row, cells)` with one cell per header column.
    pub fn data_rows<'a>(&'a self, grid: &'a Grid) -> impl Iterator<Item = (usize, Vec<&'a str>)> + 'a {
        (self.start_row + 1..=self.end_row)
            .map(move |row| {
                let cells: Vec<&str> = self.header_columns.iter().map(|col| grid.get(row, *col)).collect();
                (row, cells)
            })
            .filter(|(_, cells)| cells.iter().any(|cell| !cell.is_empty()))
    }
}

/// Last row of a table whose header sits at `start_row`.
///
/// Extends through rows with at least [`DATA_MIN_CELLS`] filled cells. A single
/// blank row is tolerated when the row after it qualifies again; anything else
/// ends the table.
fn table_end(grid: &Grid, start_row: usize) -> usize {
    let mut end_row = start_row;
    for row in start_row..grid.rows() {
        let non_empty = grid.non_empty_count(row);
        if non_empty >= DATA_MIN_CELLS {
            end_row = row;
        } else if non_empty > 0 || grid.non_empty_count(row + 1) < DATA_MIN_CELLS {
            break;
        }
    }
    end_row
}

/// Detects the table whose header row is `start_row`.
///
/// Returns `None` when the header row has no content or no data row follows it.
pub fn detect_table_at(grid: &Grid, start_row: usize) -> Option<Table> {
    let end_row = table_end(grid, start_row);
    if end_row <= start_row {
        return None;
    }
    let (header_columns, header_titles): (Vec<usize>, Vec<String>) = grid
        .non_empty_cells(start_row)
        .map(|(col, text)| (col, text.to_owned()))
        .unzip();
    if header_columns.is_empty() {
        return None;
    }
    Some(Table { start_row, end_row, header_columns, header_titles })
}

/// Detects the table opened by a `Data` section. Other sections never hold one.
pub fn detect_table(grid: &Grid, section: &Section) -> Option<Table> {
    match section.label {
        RowLabel::Data => detect_table_at(grid, section.start_row),
        _ => None,
    }
}

/// Tables of every data section, skipping sections already absorbed by an
/// earlier table.
pub(crate) fn detect_tables(grid: &Grid, sections: &[Section]) -> Vec<Table> {
    let mut tables = Vec::<Table>::new();
    for section in sections {
        if tables.last().map(|table| table.end_row >= section.start_row).unwrap_or(false) {
            continue;
        }
        tables.extend(detect_table(grid, section));
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::classify::classify_rows;
    use crate::outline::merge::MergeRegistry;
    use crate::outline::segment::segment_sections;

    fn grid(data: &[&[&str]]) -> Grid {
        Grid::from_rows(
            data.iter()
                .map(|row| row.iter().map(|value| value.to_string()).collect())
                .collect(),
        )
    }

    fn tables(grid: &Grid) -> Vec<Table> {
        let registry = MergeRegistry::build(grid.rows(), grid.cols(), &[], |_, _| None);
        let sections = segment_sections(&classify_rows(grid, &registry));
        detect_tables(grid, &sections)
    }

    #[test]
    fn single_blank_gap_is_tolerated() {
        let grid = grid(&[
            &["H1", "H2", "H3", "H4", "H5"],
            &["1", "2", "3", "4", "5"],
            &[],
            &["6", "7", "8", "9", "10"],
        ]);
        let tables = tables(&grid);

        assert_eq!(tables.len(), 1);
        assert_eq!((tables[0].start_row, tables[0].end_row), (0, 3));
        let rows: Vec<usize> = tables[0].data_rows(&grid).map(|(row, _)| row).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn two_blank_rows_end_the_table() {
        let grid = grid(&[
            &["a", "b", "c"],
            &["1", "2", "3"],
            &[],
            &[],
            &["x", "y", "z"],
            &["4", "5", "6"],
        ]);
        let tables = tables(&grid);

        assert_eq!(tables.len(), 2);
        assert_eq!((tables[0].start_row, tables[0].end_row), (0, 1));
        assert_eq!((tables[1].start_row, tables[1].end_row), (4, 5));
    }

    #[test]
    fn blank_gap_before_sparse_row_ends_the_table() {
        let grid = grid(&[&["a", "b", "c"], &["1", "2", "3"], &[], &["note"], &["4", "5", "6"]]);

        assert_eq!(detect_table_at(&grid, 0).map(|table| table.end_row), Some(1));
    }

    #[test]
    fn sparse_row_ends_the_table() {
        let grid = grid(&[&["a", "b", "c"], &["1", "2", "3"], &["Total", "6"], &["4", "5", "6"]]);

        assert_eq!(detect_table_at(&grid, 0).map(|table| table.end_row), Some(1));
    }

    #[test]
    fn columns_are_fixed_by_the_header_row() {
        let grid = grid(&[
            &["Name", "", "Qty", "Price", "", ""],
            &["Pen", "blue", "2", "1.5", "note", ""],
            &["", "x", "", "", "y", "z"],
            &["Pad", "", "1", "3", "", ""],
        ]);
        let table = detect_table_at(&grid, 0).unwrap();

        assert_eq!(table.header_columns, vec![0, 2, 3]);
        assert_eq!(table.header_titles, vec!["Name", "Qty", "Price"]);
        let rows: Vec<(usize, Vec<&str>)> = table.data_rows(&grid).collect();
        assert_eq!(rows, vec![(1, vec!["Pen", "2", "1.5"]), (3, vec!["Pad", "1", "3"])]);
        for (_, cells) in &rows {
            assert_eq!(cells.len(), table.column_count());
        }
    }

    #[test]
    fn header_without_data_is_not_a_table() {
        let grid = grid(&[&["a", "b", "c"], &[]]);

        assert_eq!(detect_table_at(&grid, 0), None);
        assert!(tables(&grid).is_empty());
    }

    #[test]
    fn only_data_sections_open_tables() {
        let grid = grid(&[&["a", "b", "c"], &["1", "2", "3"]]);
        let section = Section { label: RowLabel::Sparse, start_row: 0, end_row: 1 };

        assert_eq!(detect_table(&grid, &section), None);
    }
}
