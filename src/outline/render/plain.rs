use crate::outline::classify::RowLabel;
use crate::outline::grid::Grid;
use crate::outline::segment::Section;
use crate::outline::PLAIN_CELL_WIDTH;
use std::borrow::Cow;

/// Dumps every non-blank row as `Row r: Col c: value | Col c: value`.
///
/// Rows and columns are numbered from 1 like the source sheet; values longer
/// than [`PLAIN_CELL_WIDTH`] characters are cut and marked with `...`.
pub fn render_plain_text(grid: &Grid, sections: &[Section]) -> String {
    let mut lines = Vec::<String>::new();
    for section in sections.iter().filter(|section| section.label != RowLabel::Blank) {
        for row in section.rows() {
            let cells: Vec<String> = grid
                .non_empty_cells(row)
                .map(|(col, text)| format!("Col{}: {}", col + 1, truncate(text, PLAIN_CELL_WIDTH)))
                .collect();
            if !cells.is_empty() {
                lines.push(format!("Row {}: {}", row + 1, cells.join(" | ")));
            }
        }
    }
    lines.join("\n")
}

fn truncate(text: &str, width: usize) -> Cow<'_, str> {
    match text.char_indices().nth(width) {
        Some((index, _)) => Cow::Owned(format!("{}...", &text[..index])),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::classify::classify_rows;
    use crate::outline::merge::MergeRegistry;
    use crate::outline::segment::segment_sections;

    fn render(data: &[&[&str]]) -> String {
        let grid = Grid::from_rows(
            data.iter()
                .map(|row| row.iter().map(|value| value.to_string()).collect())
                .collect(),
        );
        let registry = MergeRegistry::build(grid.rows(), grid.cols(), &[], |_, _| None);
        let sections = segment_sections(&classify_rows(&grid, &registry));
        render_plain_text(&grid, &sections)
    }

    #[test]
    fn one_line_per_non_blank_row() {
        let output = render(&[&["Title", "", ""], &["", "", ""], &["a", "", "c"]]);

        assert_eq!(output, "Row 1: Col1: Title\nRow 3: Col1: a | Col3: c");
    }

    #[test]
    fn long_values_are_truncated_by_characters() {
        let output = render(&[&["abcdefghijklmnopqrstuvwxyz"]]);
        assert_eq!(output, "Row 1: Col1: abcdefghijklmnopqrst...");

        let accented = "\u{e9}".repeat(25);
        assert_eq!(truncate(&accented, 20), format!("{}...", "\u{e9}".repeat(20)));
        assert_eq!(truncate("exactly twenty chars", 20), "exactly twenty chars");
    }

    #[test]
    fn blank_grid_is_empty() {
        assert_eq!(render(&[&["", ""], &["", ""]]), "");
    }
}
