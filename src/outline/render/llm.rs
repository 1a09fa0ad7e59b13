use crate::outline::grid::Grid;
use crate::outline::merge::{MergeRange, MergeRegistry};
use crate::outline::render::{pipe_row, separator_row};
use crate::outline::table::{detect_table_at, Table};
use crate::outline::{LLM_TABLE_MIN_CELLS, TITLE_MIN_SPAN};
use std::collections::HashSet;

/// Renders a sheet as linear text for language models, in row order.
///
/// - rows covered by a merge at least [`TITLE_MIN_SPAN`] wide give a title
///   line, emitted once per distinct title
/// - a row with [`LLM_TABLE_MIN_CELLS`] or more filled cells opens a table;
///   the rows it consumes are not visited again
/// - every other non-empty row becomes one line of its cells joined by spaces
pub fn render_llm_optimized(grid: &Grid, registry: &MergeRegistry) -> String {
    let mut lines = Vec::<String>::new();
    let mut pending = Vec::<String>::new();
    let mut titles = HashSet::<&str>::new();
    let mut next_row = 0usize;
    while next_row < grid.rows() {
        let row = next_row;
        next_row += 1;

        let wide = wide_regions(grid, registry, row);
        if !wide.is_empty() {
            for (_, title) in &wide {
                if titles.insert(title) {
                    pending.push(title.to_string());
                }
            }
            let rest: Vec<&str> = grid
                .non_empty_cells(row)
                .filter(|(col, _)| !wide.iter().any(|(range, _)| range.contains(row, *col)))
                .map(|(_, text)| text)
                .collect();
            if !rest.is_empty() {
                pending.push(rest.join(" "));
            }
            continue;
        }

        let non_empty = grid.non_empty_count(row);
        if non_empty == 0 {
            continue;
        }
        if non_empty >= LLM_TABLE_MIN_CELLS {
            if let Some(table) = detect_table_at(grid, row) {
                if !pending.is_empty() {
                    lines.append(&mut pending);
                    lines.push(String::new());
                }
                lines.extend(table_lines(grid, &table));
                lines.push(String::new());
                next_row = table.end_row + 1;
                continue;
            }
        }
        let prose: Vec<&str> = grid.non_empty_cells(row).map(|(_, text)| text).collect();
        pending.push(prose.join(" "));
    }
    lines.append(&mut pending);
    lines.join("\n").trim().to_owned()
}

/// Distinct titled merges at least [`TITLE_MIN_SPAN`] wide that cover a row.
fn wide_regions<'a>(grid: &Grid, registry: &'a MergeRegistry, row: usize) -> Vec<(MergeRange, &'a str)> {
    let mut regions = Vec::<(MergeRange, &str)>::new();
    for col in 0..grid.cols() {
        let Some(region) = registry.region_at(row, col) else {
            continue;
        };
        if region.range.col_span() >= TITLE_MIN_SPAN
            && !region.anchor_value.is_empty()
            && !regions.iter().any(|(range, _)| *range == region.range)
        {
            regions.push((region.range, region.anchor_value.as_str()));
        }
    }
    regions
}

/// Pipe table with `-` standing in for empty data cells.
fn table_lines(grid: &Grid, table: &Table) -> Vec<String> {
    let mut lines = vec![pipe_row(&table.header_titles), separator_row(table.column_count())];
    lines.extend(table.data_rows(grid).map(|(_, cells)| {
        pipe_row(cells.into_iter().map(|cell| if cell.is_empty() { "-" } else { cell }))
    }));
    lines
}
