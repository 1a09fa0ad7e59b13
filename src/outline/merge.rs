use crate::helpers::reference::index_to_reference;
use crate::outline::grid::{check_dimensions, CellSource};
use crate::outline::{Anomaly, OutlineError, DUPLICATE_RUN_MIN};
use std::collections::HashMap;
use std::fmt::Display;

/// Inclusive, 0-based rectangle of one merged cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MergeRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl MergeRange {
    /// Creates a range, swapping bounds given in the wrong order.
    pub fn new(start_row: usize, end_row: usize, start_col: usize, end_col: usize) -> Self {
        MergeRange {
            start_row: start_row.min(end_row),
            end_row: start_row.max(end_row),
            start_col: start_col.min(end_col),
            end_col: start_col.max(end_col),
        }
    }

    pub fn row_span(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn col_span(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.start_row..=self.end_row).contains(&row) && (self.start_col..=self.end_col).contains(&col)
    }

    /// True for the top-left cell, the only one carrying the merged value.
    pub fn is_anchor(&self, row: usize, col: usize) -> bool {
        row == self.start_row && col == self.start_col
    }

    /// Part of the range inside a `rows x cols` grid, if any.
    pub fn clip(&self, rows: usize, cols: usize) -> Option<MergeRange> {
        if self.start_row >= rows || self.start_col >= cols {
            return None;
        }
        Some(MergeRange {
            end_row: self.end_row.min(rows - 1),
            end_col: self.end_col.min(cols - 1),
            ..*self
        })
    }

    fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.start_row..=self.end_row)
            .flat_map(move |row| (self.start_col..=self.end_col).map(move |col| (row, col)))
    }
}

impl Display for MergeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            index_to_reference(self.start_row, self.start_col),
            index_to_reference(self.end_row, self.end_col)
        )
    }
}

/// A merge range together with the text of its anchor cell.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeRegion {
    pub range: MergeRange,
    pub anchor_value: String,
}

/// Position index over the merge regions of one worksheet.
///
/// Every cell of every region is indexed, so lookups never scan the region list.
#[derive(Clone, Debug, Default)]
pub struct MergeRegistry {
    has_metadata: bool,
    regions: Vec<MergeRegion>,
    positions: HashMap<(usize, usize), usize>,
    /// Regions anchored in each row, by row index.
    anchors: Vec<Vec<usize>>,
    anomalies: Vec<Anomaly>,
}

impl MergeRegistry {
    /// Indexes the merge ranges of a source, or records that it has none.
    pub fn from_source<S: CellSource + ?Sized>(source: &S) -> Result<MergeRegistry, OutlineError> {
        let (rows, cols) = source.dimensions();
        check_dimensions(rows, cols)?;
        let registry = match source.merge_ranges() {
            Some(ranges) => MergeRegistry::build(rows, cols, &ranges, |row, col| source.cell_text(row, col)),
            None => {
                log::debug!("no merge metadata, falling back to duplicate collapsing");
                MergeRegistry::unavailable(rows, cols)
            }
        };
        Ok(registry)
    }

    /// Indexes merge ranges for a `rows x cols` grid.
    ///
    /// Ranges reaching outside the grid are clipped and ranges overlapping an
    /// earlier one are skipped. Anchor text is read through `cell_text` and trimmed.
    pub fn build<F>(rows: usize, cols: usize, ranges: &[MergeRange], cell_text: F) -> MergeRegistry
    where
        F: Fn(usize, usize) -> Option<String>,
    {
        let mut registry = MergeRegistry {
            has_metadata: true,
            anchors: vec![Vec::new(); rows],
            ..MergeRegistry::default()
        };
        for range in ranges {
            let clipped = range.clip(rows, cols);
            if clipped != Some(*range) {
                log::debug!("merge region {range} reaches outside the {rows}x{cols} grid");
                registry.anomalies.push(Anomaly::OutOfRangeMergeRegion { range: *range, clipped });
            }
            let Some(range) = clipped else {
                continue;
            };
            if range.cells().any(|position| registry.positions.contains_key(&position)) {
                log::warn!("merge region {range} overlaps another region and is ignored");
                continue;
            }

            let index = registry.regions.len();
            registry.positions.extend(range.cells().map(|position| (position, index)));
            registry.anchors[range.start_row].push(index);
            registry.regions.push(MergeRegion {
                range,
                anchor_value: cell_text(range.start_row, range.start_col)
                    .map(|text| text.trim().to_owned())
                    .unwrap_or_default(),
            });
        }
        registry
    }

    /// Registry for a source without merge metadata.
    pub fn unavailable(rows: usize, _cols: usize) -> MergeRegistry {
        MergeRegistry {
            has_metadata: false,
            anchors: vec![Vec::new(); rows],
            ..MergeRegistry::default()
        }
    }

    /// False when the source exposed no merge metadata.
    pub fn has_metadata(&self) -> bool {
        self.has_metadata
    }

    pub fn regions(&self) -> &[MergeRegion] {
        &self.regions
    }

    /// Region covering a cell, anchor or not.
    pub fn region_at(&self, row: usize, col: usize) -> Option<&MergeRegion> {
        self.positions.get(&(row, col)).map(|index| &self.regions[*index])
    }

    /// Merged text covering a cell.
    pub fn value_at(&self, row: usize, col: usize) -> Option<&str> {
        self.region_at(row, col).map(|region| region.anchor_value.as_str())
    }

    /// `(row_span, col_span)` of the region covering a cell.
    pub fn span_of(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        self.region_at(row, col)
            .map(|region| (region.range.row_span(), region.range.col_span()))
    }

    /// Regions whose anchor lies in a row, left to right as declared.
    pub fn anchored_in_row(&self, row: usize) -> impl Iterator<Item = &MergeRegion> + '_ {
        self.anchors
            .get(row)
            .into_iter()
            .flatten()
            .map(|index| &self.regions[*index])
    }

    /// Widest region with non-empty text anchored in a row. Ties go to the first declared.
    ///
    /// Regions without text only clear cells; they carry no structural hint.
    pub fn widest_anchored(&self, row: usize) -> Option<&MergeRegion> {
        self.anchored_in_row(row)
            .filter(|region| !region.anchor_value.is_empty())
            .fold(None, |widest: Option<&MergeRegion>, region| match widest {
                Some(widest) if widest.range.col_span() >= region.range.col_span() => Some(widest),
                _ => Some(region),
            })
    }

    pub(crate) fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }
}

/// Blanks the repeats of a value occurring in [`DUPLICATE_RUN_MIN`] or more
/// consecutive cells, keeping the first occurrence.
///
/// Approximates merges for formats without merge metadata; runs shorter than
/// the threshold are left alone.
pub fn collapse_duplicate_runs(row: &mut [String]) {
    let mut start = 0;
    while start < row.len() {
        let mut end = start + 1;
        if !row[start].is_empty() {
            while end < row.len() && row[end] == row[start] {
                end += 1;
            }
        }
        if end - start >= DUPLICATE_RUN_MIN {
            row[start + 1..end].iter_mut().for_each(String::clear);
        }
        start = end;
    }
}
