use crate::outline::merge::{collapse_duplicate_runs, MergeRange, MergeRegistry};
use crate::outline::{Anomaly, OutlineError};

/// Highest row count a SpreadsheetML worksheet can hold.
pub const MAX_ROWS: usize = 1_048_576;
/// Highest column count a SpreadsheetML worksheet can hold.
pub const MAX_COLS: usize = 16_384;
/// Largest dense grid (`rows * cols`) the engine materialises.
pub const MAX_CELLS: usize = 10_000_000;

/// Read access to the raw cells of one worksheet.
///
/// Coordinates are 0-based; readers translate the source's 1-based references
/// before answering.
pub trait CellSource {
    /// Number of rows and columns covered by the worksheet, starting at `A1`.
    fn dimensions(&self) -> (usize, usize);

    /// Raw text of a cell, `None` when the cell holds no value.
    fn cell_text(&self, row: usize, col: usize) -> Option<String>;

    /// Merge ranges declared by the source, or `None` when the format does not
    /// expose merge metadata at all.
    fn merge_ranges(&self) -> Option<Vec<MergeRange>>;

    /// Number of cells the source really holds for a row, for row-oriented sources.
    fn row_width(&self, _row: usize) -> Option<usize> {
        None
    }
}

/// In-memory [`CellSource`] over rows of text.
#[derive(Clone, Debug, Default)]
pub struct RowsSource {
    rows: Vec<Vec<String>>,
    cols: usize,
    merges: Option<Vec<MergeRange>>,
}

impl RowsSource {
    /// Wraps rows of text. The widest row defines the column count.
    pub fn new(rows: Vec<Vec<String>>, merges: Option<Vec<MergeRange>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        RowsSource { rows, cols, merges }
    }
}

impl CellSource for RowsSource {
    fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.cols)
    }

    fn cell_text(&self, row: usize, col: usize) -> Option<String> {
        self.rows.get(row)?.get(col).cloned()
    }

    fn merge_ranges(&self) -> Option<Vec<MergeRange>> {
        self.merges.clone()
    }

    fn row_width(&self, row: usize) -> Option<usize> {
        self.rows.get(row).map(Vec::len)
    }
}

/// Dense `rows x cols` matrix of trimmed cell text.
///
/// Absent values are empty strings. A grid is immutable once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<String>,
    anomalies: Vec<Anomaly>,
}

impl Grid {
    /// Builds a grid from rows that are already clean (no merge echoes).
    /// Short rows are blank-padded to the widest row.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Grid {
        let source = RowsSource::new(rows, Some(Vec::new()));
        let (rows, cols) = source.dimensions();
        let mut grid = Grid::blank(rows, cols);
        for (row, values) in source.rows.into_iter().enumerate() {
            if values.len() < cols {
                grid.anomalies.push(Anomaly::InconsistentRowWidth { row, width: values.len() });
            }
            for (col, value) in values.into_iter().enumerate() {
                grid.cells[row * cols + col] = value.trim().to_owned();
            }
        }
        grid
    }

    fn blank(rows: usize, cols: usize) -> Grid {
        Grid {
            rows,
            cols,
            cells: vec![String::new(); rows * cols],
            anomalies: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True when the grid has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Cell text, or `""` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> &str {
        if row < self.rows && col < self.cols {
            &self.cells[row * self.cols + col]
        } else {
            ""
        }
    }

    /// All cells of a row, or an empty slice outside the grid.
    pub fn row(&self, row: usize) -> &[String] {
        if row < self.rows {
            &self.cells[row * self.cols..(row + 1) * self.cols]
        } else {
            &[]
        }
    }

    /// Number of non-empty cells in a row.
    pub fn non_empty_count(&self, row: usize) -> usize {
        self.row(row).iter().filter(|cell| !cell.is_empty()).count()
    }

    pub fn is_blank_row(&self, row: usize) -> bool {
        self.row(row).iter().all(String::is_empty)
    }

    /// Non-empty cells of a row as `(col, text)` pairs, left to right.
    pub fn non_empty_cells(&self, row: usize) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.row(row)
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(col, cell)| (col, cell.as_str()))
    }

    pub(crate) fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }
}

/// Rejects dimensions no worksheet can have, and grids too large to hold densely.
pub(crate) fn check_dimensions(rows: usize, cols: usize) -> Result<(), OutlineError> {
    if rows > MAX_ROWS || cols > MAX_COLS {
        Err(OutlineError::InvalidArgument(format!(
            "grid of {rows} rows x {cols} columns exceeds {MAX_ROWS} x {MAX_COLS}"
        )))
    } else if rows * cols > MAX_CELLS {
        Err(OutlineError::InvalidArgument(format!(
            "grid of {rows} rows x {cols} columns holds more than {MAX_CELLS} cells"
        )))
    } else {
        Ok(())
    }
}

/// Builds the dense grid of a worksheet.
///
/// The anchor of every merge region carries the region's text and the other
/// cells of the region are cleared. When the registry has no merge metadata,
/// runs of repeated values are collapsed instead.
pub fn build_grid<S: CellSource + ?Sized>(source: &S, registry: &MergeRegistry) -> Result<Grid, OutlineError> {
    let (rows, cols) = source.dimensions();
    check_dimensions(rows, cols)?;

    let mut grid = Grid::blank(rows, cols);
    for row in 0..rows {
        if let Some(width) = source.row_width(row).filter(|width| *width < cols) {
            grid.anomalies.push(Anomaly::InconsistentRowWidth { row, width });
        }
        let cells = &mut grid.cells[row * cols..(row + 1) * cols];
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = match registry.region_at(row, col) {
                Some(region) if region.range.is_anchor(row, col) => region.anchor_value.clone(),
                Some(_) => String::new(),
                None => source
                    .cell_text(row, col)
                    .map(|text| text.trim().to_owned())
                    .unwrap_or_default(),
            };
        }
        if !registry.has_metadata() {
            collapse_duplicate_runs(cells);
        }
    }
    Ok(grid)
}
