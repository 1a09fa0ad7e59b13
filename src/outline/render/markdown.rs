use crate::outline::classify::RowLabel;
use crate::outline::grid::Grid;
use crate::outline::merge::MergeRegistry;
use crate::outline::render::{pipe_row, separator_row};
use crate::outline::segment::Section;
use crate::outline::table::Table;
use crate::outline::{H1_MIN_SPAN, TITLE_MIN_SPAN};

/// Renders titles as markdown headings and data sections as pipe tables.
///
/// Header and sparse rows become `#`/`##` headings when they anchor a merge at
/// least [`TITLE_MIN_SPAN`] columns wide, or a bold line of their cells joined
/// by ` - ` otherwise. Blocks are separated by one blank line.
pub fn render_hybrid_markdown(grid: &Grid, registry: &MergeRegistry, sections: &[Section], tables: &[Table]) -> String {
    let mut blocks = Vec::<String>::new();
    let mut tables = tables.iter().peekable();
    let mut next_row = 0usize;
    for section in sections {
        if section.end_row < next_row {
            continue;
        }
        while tables.next_if(|table| table.start_row < section.start_row).is_some() {}

        match section.label {
            RowLabel::Header | RowLabel::Sparse => {
                let lines: Vec<String> = section
                    .rows()
                    .filter(|row| *row >= next_row)
                    .filter_map(|row| heading_line(grid, registry, row))
                    .collect();
                if !lines.is_empty() {
                    blocks.push(lines.join("\n"));
                }
            }
            RowLabel::Data => match tables.next_if(|table| table.start_row == section.start_row) {
                Some(table) => {
                    blocks.push(table_block(grid, table));
                    next_row = table.end_row + 1;
                }
                None => blocks.extend(section.rows().filter_map(|row| label_line(grid, row))),
            },
            RowLabel::Blank => (),
        }
    }
    blocks.join("\n\n")
}

/// Heading for a title row, chosen by the widest merge anchored in it.
fn heading_line(grid: &Grid, registry: &MergeRegistry, row: usize) -> Option<String> {
    if let Some(region) = registry.widest_anchored(row) {
        let span = region.range.col_span();
        if span >= H1_MIN_SPAN {
            return Some(format!("# {}", region.anchor_value));
        } else if span >= TITLE_MIN_SPAN {
            return Some(format!("## {}", region.anchor_value));
        }
    }
    label_line(grid, row)
}

/// Bold line with the non-empty cells of a row.
fn label_line(grid: &Grid, row: usize) -> Option<String> {
    let cells: Vec<&str> = grid.non_empty_cells(row).map(|(_, text)| text).collect();
    if cells.is_empty() {
        None
    } else {
        Some(format!("**{}**", cells.join(" - ")))
    }
}

fn table_block(grid: &Grid, table: &Table) -> String {
    let mut lines = vec![pipe_row(&table.header_titles), separator_row(table.column_count())];
    lines.extend(table.data_rows(grid).map(|(_, cells)| pipe_row(cells)));
    lines.join("\n")
}
