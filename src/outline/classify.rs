use crate::outline::grid::Grid;
use crate::outline::merge::MergeRegistry;
use crate::outline::{DATA_MIN_CELLS, HEADER_MIN_SPAN, SPARSE_MAX_CELLS};
use std::fmt::Display;

/// Structural role of one grid row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RowLabel {
    /// Anchors a wide merged cell, almost always a title.
    Header,
    /// Enough filled cells to be a table row.
    Data,
    /// One or two filled cells: a label or a line of free text.
    Sparse,
    /// No content.
    Blank,
}

impl RowLabel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Data => "data",
            Self::Sparse => "sparse",
            Self::Blank => "blank",
        }
    }
}

impl Display for RowLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels one row. The merge-span check takes precedence over cell density.
pub fn classify_row(grid: &Grid, registry: &MergeRegistry, row: usize) -> RowLabel {
    let widest_span = registry
        .widest_anchored(row)
        .map(|region| region.range.col_span())
        .unwrap_or(0);
    let non_empty = grid.non_empty_count(row);

    if widest_span >= HEADER_MIN_SPAN {
        RowLabel::Header
    } else if non_empty > 0 && non_empty <= SPARSE_MAX_CELLS {
        RowLabel::Sparse
    } else if non_empty >= DATA_MIN_CELLS {
        RowLabel::Data
    } else {
        RowLabel::Blank
    }
}

/// Labels every row of the grid, top to bottom.
pub fn classify_rows(grid: &Grid, registry: &MergeRegistry) -> Vec<RowLabel> {
    (0..grid.rows())
        .map(|row| classify_row(grid, registry, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::merge::MergeRange;

    fn grid(data: &[&[&str]]) -> Grid {
        Grid::from_rows(
            data.iter()
                .map(|row| row.iter().map(|value| value.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn density_rules() {
        let grid = grid(&[
            &["", "", "", ""],
            &["Name:", "", "Branch 1", ""],
            &["a", "b", "c", ""],
            &["only", "", "", ""],
        ]);
        let registry = MergeRegistry::build(4, 4, &[], |_, _| None);

        assert_eq!(
            classify_rows(&grid, &registry),
            vec![RowLabel::Blank, RowLabel::Sparse, RowLabel::Data, RowLabel::Sparse]
        );
    }

    #[test]
    fn wide_merge_wins_over_density() {
        let grid = grid(&[&["Title", "", "", "x", "y", "z"], &["Narrow", "", "a", "b", "c", "d"]]);
        let ranges = [MergeRange::new(0, 0, 0, 2), MergeRange::new(1, 1, 0, 1)];
        let registry = MergeRegistry::build(2, 6, &ranges, |row, col| Some(grid.get(row, col).to_owned()));

        assert_eq!(classify_row(&grid, &registry, 0), RowLabel::Header);
        assert_eq!(classify_row(&grid, &registry, 1), RowLabel::Data);
    }

    #[test]
    fn classification_is_repeatable() {
        let grid = grid(&[&["a", "b", "c"], &["", "", ""], &["x", "", ""]]);
        let registry = MergeRegistry::unavailable(3, 3);

        assert_eq!(classify_rows(&grid, &registry), classify_rows(&grid, &registry));
    }
}
