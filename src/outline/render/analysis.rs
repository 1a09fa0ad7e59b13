use crate::outline::grid::Grid;
use crate::outline::merge::MergeRegistry;

/// Lists the merge structure and every non-empty cell with its `[row,col]`
/// coordinates (1-based).
///
/// Consecutive content rows are grouped; a group ends after a row followed by
/// up to two blank rows (or the end of the sheet).
pub fn render_analysis(grid: &Grid, registry: &MergeRegistry) -> String {
    let mut lines = Vec::<String>::new();

    let merged: Vec<String> = registry
        .regions()
        .iter()
        .filter(|region| !region.anchor_value.is_empty())
        .map(|region| {
            format!(
                "  \u{2022} {} ({}\u{d7}{}): {}",
                region.range,
                region.range.row_span(),
                region.range.col_span(),
                region.anchor_value
            )
        })
        .collect();
    if !merged.is_empty() {
        lines.push("MERGED CELLS:".to_owned());
        lines.extend(merged);
        lines.push(String::new());
    }

    let mut content = Vec::<String>::new();
    for row in 0..grid.rows() {
        let cells: Vec<String> = grid
            .non_empty_cells(row)
            .map(|(col, text)| format!("[{},{}] {}", row + 1, col + 1, text))
            .collect();
        if cells.is_empty() {
            continue;
        }
        content.push(format!("  {}", cells.join(" | ")));
        if is_section_break(grid, row) {
            content.push(String::new());
        }
    }
    if !content.is_empty() {
        lines.push("CONTENT STRUCTURE:".to_owned());
        lines.extend(content);
    }

    lines.join("\n").trim_end().to_owned()
}

fn is_section_break(grid: &Grid, row: usize) -> bool {
    (row + 1..grid.rows().min(row + 3)).all(|next| grid.is_blank_row(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::merge::MergeRange;

    #[test]
    fn merges_then_cells_grouped_by_blank_rows() {
        let grid = Grid::from_rows(vec![
            vec!["Report".into(), "".into(), "".into()],
            vec!["a".into(), "".into(), "b".into()],
            vec!["".into(), "".into(), "".into()],
            vec!["".into(), "".into(), "".into()],
            vec!["c".into(), "".into(), "".into()],
        ]);
        let registry = MergeRegistry::build(5, 3, &[MergeRange::new(0, 0, 0, 2)], |_, _| Some("Report".into()));

        assert_eq!(
            render_analysis(&grid, &registry),
            "MERGED CELLS:\n  \u{2022} A1:C1 (1\u{d7}3): Report\n\n\
             CONTENT STRUCTURE:\n  [1,1] Report\n  [2,1] a | [2,3] b\n\n  [5,1] c"
        );
    }

    #[test]
    fn single_blank_row_does_not_break() {
        let grid = Grid::from_rows(vec![vec!["a".into()], vec!["".into()], vec!["b".into()]]);

        assert!(!is_section_break(&grid, 0));
        assert!(is_section_break(&grid, 2));
    }
}
