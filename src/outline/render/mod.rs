//! # Renderers
//!
//! Stateless formatting functions over an analysed worksheet. None of them
//! re-derives sections or tables on its own except the LLM-optimized renderer,
//! whose table trigger is stricter than the section classifier.
use crate::outline::OutlineError;
use std::fmt::Display;
use std::str::FromStr;

mod analysis;
mod llm;
mod markdown;
mod plain;

pub use analysis::render_analysis;
pub use llm::render_llm_optimized;
pub use markdown::render_hybrid_markdown;
pub use plain::render_plain_text;

/// Output formats of the renderers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `Row r: Col c: value | ...` dump of every non-empty cell.
    PlainText,
    /// Markdown headings for titles, pipe tables for data.
    HybridMarkdown,
    /// Linear text for language models: titles, prose lines and pipe tables.
    #[default]
    LlmOptimized,
    /// Coordinates of every cell plus the merge structure.
    Analysis,
}

impl OutputFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain",
            Self::HybridMarkdown => "markdown",
            Self::LlmOptimized => "llm",
            Self::Analysis => "analysis",
        }
    }

    /// Extension of the files written in this format.
    pub const fn file_extension(&self) -> &'static str {
        match self {
            Self::PlainText | Self::Analysis => "txt",
            Self::HybridMarkdown | Self::LlmOptimized => "md",
        }
    }

    /// Parses a format name (case-insensitive):
    /// - PlainText: "plain", "text", "txt"
    /// - HybridMarkdown: "markdown", "md", "hybrid"
    /// - LlmOptimized: "llm", "llm-optimized"
    /// - Analysis: "analysis", "structure"
    pub fn parse(name: &str) -> Result<Self, OutlineError> {
        match name.to_ascii_lowercase().as_str() {
            "plain" | "text" | "txt" => Ok(Self::PlainText),
            "markdown" | "md" | "hybrid" => Ok(Self::HybridMarkdown),
            "llm" | "llm-optimized" => Ok(Self::LlmOptimized),
            "analysis" | "structure" => Ok(Self::Analysis),
            _ => Err(OutlineError::InvalidArgument(format!("unknown output format '{name}'"))),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = OutlineError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::parse(name)
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Makes cell text safe inside a pipe table cell.
pub(crate) fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace("\r\n", "<br/>").replace('\n', "<br/>")
}

/// One pipe table line.
pub(crate) fn pipe_row<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let cells: Vec<String> = cells.into_iter().map(|cell| escape_table_cell(cell.as_ref())).collect();
    format!("| {} |", cells.join(" | "))
}

/// The `| --- | --- |` line under a header of `columns` cells.
pub(crate) fn separator_row(columns: usize) -> String {
    format!("| {} |", vec!["---"; columns].join(" | "))
}
