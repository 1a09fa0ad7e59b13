//! # Outline Engine
//!
//! Recovers the logical structure of a worksheet (titles, section headers and
//! data tables) from a dense grid of cell text plus merge metadata, and turns
//! it into linear text.
//!
//! The pipeline runs strictly downward and every stage is a pure function of
//! the previous one:
//!
//! 1. [`MergeRegistry`] indexes merge regions (or marks metadata as unavailable)
//! 2. [`build_grid`] produces the dense [`Grid`] with merge echoes cleared
//! 3. [`classify_rows`] labels every row as [`RowLabel`]
//! 4. [`segment_sections`] groups labels into [`Section`]s
//! 5. [`detect_table`] bounds the tables inside data sections
//! 6. the renderers in [`render`] format the result
//!
//! [`Outline`] runs steps 1-5 once and hands the result to any renderer.
use std::fmt::Display;
use thiserror::Error;

pub mod classify;
pub mod grid;
pub mod merge;
pub mod render;
pub mod segment;
pub mod table;

pub use classify::{classify_row, classify_rows, RowLabel};
pub use grid::{build_grid, CellSource, Grid, RowsSource, MAX_CELLS, MAX_COLS, MAX_ROWS};
pub use merge::{MergeRange, MergeRegion, MergeRegistry};
pub use render::OutputFormat;
pub use segment::{segment_sections, Section};
pub use table::{detect_table, detect_table_at, Table};

// Heuristic thresholds. They were tuned by hand against real reports and the
// rendered output depends on them exactly; recalibrate against a corpus before
// touching any of them.

/// Anchored merge span (in columns) that turns a row into a `Header` row.
pub const HEADER_MIN_SPAN: usize = 3;
/// Rows with at most this many non-empty cells (and at least one) are `Sparse`.
pub const SPARSE_MAX_CELLS: usize = 2;
/// Rows with at least this many non-empty cells are `Data` rows and keep a table open.
pub const DATA_MIN_CELLS: usize = 3;
/// Non-empty cells a row needs to open a table in the LLM-optimized renderer.
pub const LLM_TABLE_MIN_CELLS: usize = 5;
/// Merge span rendered as a second level heading, and as a title line for LLMs.
pub const TITLE_MIN_SPAN: usize = 6;
/// Merge span rendered as a first level heading.
pub const H1_MIN_SPAN: usize = 10;
/// Identical consecutive values treated as an unmarked merge when metadata is missing.
pub const DUPLICATE_RUN_MIN: usize = 3;
/// Characters of a cell value shown by the plain-text dump before truncation.
pub const PLAIN_CELL_WIDTH: usize = 20;

/// Errors raised by the outline engine.
///
/// Malformed structure is never an error; only an input shape the grid cannot
/// represent is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutlineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Structural conditions that were repaired instead of rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// A merge region reached outside the grid and was clipped (or dropped when
    /// nothing of it remained).
    OutOfRangeMergeRegion { range: MergeRange, clipped: Option<MergeRange> },
    /// The grid has no rows or no columns.
    EmptyGrid,
    /// A source row was shorter than the grid width and was blank-padded.
    InconsistentRowWidth { row: usize, width: usize },
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::OutOfRangeMergeRegion { range, clipped: Some(clipped) } => {
                write!(f, "merge region {range} clipped to {clipped}")
            }
            Anomaly::OutOfRangeMergeRegion { range, clipped: None } => {
                write!(f, "merge region {range} lies outside the grid and was dropped")
            }
            Anomaly::EmptyGrid => write!(f, "grid is empty"),
            Anomaly::InconsistentRowWidth { row, width } => {
                write!(f, "row {} has {} cells and was blank-padded", row + 1, width)
            }
        }
    }
}

/// The reconstructed structure of one worksheet.
///
/// Built once per sheet; all fields are derived views over the grid and are
/// never mutated after construction.
#[derive(Debug, Clone)]
pub struct Outline {
    grid: Grid,
    registry: MergeRegistry,
    labels: Vec<RowLabel>,
    sections: Vec<Section>,
    tables: Vec<Table>,
}

impl Outline {
    /// Runs the whole analysis over a cell source.
    pub fn analyze<S: CellSource + ?Sized>(source: &S) -> Result<Outline, OutlineError> {
        let registry = MergeRegistry::from_source(source)?;
        let grid = build_grid(source, &registry)?;
        Ok(Outline::from_parts(grid, registry))
    }

    /// Derives labels, sections and tables from an already built grid.
    pub fn from_parts(grid: Grid, registry: MergeRegistry) -> Outline {
        let labels = classify_rows(&grid, &registry);
        let sections = segment_sections(&labels);
        let tables = table::detect_tables(&grid, &sections);
        log::debug!(
            "outline: {}x{} grid, {} sections, {} tables",
            grid.rows(),
            grid.cols(),
            sections.len(),
            tables.len()
        );
        Outline { grid, registry, labels, sections, tables }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn registry(&self) -> &MergeRegistry {
        &self.registry
    }

    pub fn labels(&self) -> &[RowLabel] {
        &self.labels
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Repairs applied while building the grid and the registry.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        if self.grid.is_empty() {
            anomalies.push(Anomaly::EmptyGrid);
        }
        anomalies.extend(self.registry.anomalies().iter().cloned());
        anomalies.extend(self.grid.anomalies().iter().cloned());
        anomalies
    }

    /// Formats the outline in the requested output format.
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::PlainText => render::render_plain_text(&self.grid, &self.sections),
            OutputFormat::HybridMarkdown => {
                render::render_hybrid_markdown(&self.grid, &self.registry, &self.sections, &self.tables)
            }
            OutputFormat::LlmOptimized => render::render_llm_optimized(&self.grid, &self.registry),
            OutputFormat::Analysis => render::render_analysis(&self.grid, &self.registry),
        }
    }
}
