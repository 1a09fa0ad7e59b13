//! Composition of per-sheet renderings into one document per workbook.
use crate::outline::MergeRegion;
use crate::outline::Outline;
use crate::outline::OutputFormat;

const RULE_WIDTH: usize = 60;

/// Renders every sheet of a workbook and wraps the bodies in the document
/// layout of `format`. Sheets are rendered in the given order; a sheet with
/// an empty body still contributes its wrapper lines.
pub fn render_document(file_name: &str, sheets: &[(String, Outline)], format: OutputFormat) -> String {
    match format {
        OutputFormat::PlainText => plain_text_document(sheets),
        OutputFormat::HybridMarkdown => markdown_document(file_name, sheets),
        OutputFormat::LlmOptimized => llm_document(sheets),
        OutputFormat::Analysis => analysis_document(file_name, sheets),
    }
}

fn titled_regions(outline: &Outline) -> impl Iterator<Item = &MergeRegion> + '_ {
    outline
        .registry()
        .regions()
        .iter()
        .filter(|region| !region.anchor_value.is_empty())
}

fn rule(width: usize) -> String {
    "=".repeat(width)
}

fn plain_text_document(sheets: &[(String, Outline)]) -> String {
    let mut parts = Vec::<String>::new();
    for (name, outline) in sheets {
        parts.push(format!("=== SHEET: {name} ===\n"));
        let merged: Vec<String> = titled_regions(outline)
            .map(|region| format!("Range {}: {}", region.range, region.anchor_value))
            .collect();
        if !merged.is_empty() {
            parts.push("--- MERGED CELLS STRUCTURE ---".to_owned());
            parts.extend(merged);
            parts.push(String::new());
        }
        parts.push("--- SHEET CONTENT ---".to_owned());
        let body = outline.render(OutputFormat::PlainText);
        if !body.is_empty() {
            parts.push(body);
        }
        parts.push(format!("\n{}\n", rule(RULE_WIDTH)));
    }
    parts.join("\n")
}

fn markdown_document(file_name: &str, sheets: &[(String, Outline)]) -> String {
    let mut blocks = vec![format!("# {file_name}")];
    for (name, outline) in sheets {
        if sheets.len() > 1 {
            blocks.push(format!("## Sheet: {name}"));
        }
        let body = outline.render(OutputFormat::HybridMarkdown);
        if !body.is_empty() {
            blocks.push(body);
        }
    }
    blocks.join("\n\n")
}

fn llm_document(sheets: &[(String, Outline)]) -> String {
    let mut blocks = Vec::<String>::new();
    for (name, outline) in sheets {
        let body = outline.render(OutputFormat::LlmOptimized);
        match (sheets.len() > 1, body.is_empty()) {
            (true, true) => blocks.push(format!("## {name}")),
            (true, false) => blocks.push(format!("## {name}\n\n{body}")),
            (false, false) => blocks.push(body),
            (false, true) => (),
        }
    }
    blocks.join("\n\n")
}

fn analysis_document(file_name: &str, sheets: &[(String, Outline)]) -> String {
    let names: Vec<&str> = sheets.iter().map(|(name, _)| name.as_str()).collect();
    let mut parts = vec![
        "EXCEL DOCUMENT STRUCTURE ANALYSIS".to_owned(),
        rule(50),
        format!("File: {file_name}"),
        format!("Sheets: {}", names.join(", ")),
        String::new(),
    ];
    for (name, outline) in sheets {
        parts.push(format!("SHEET: {name}"));
        parts.push("-".repeat(30));
        parts.push(format!(
            "Dimensions: {} rows \u{d7} {} columns",
            outline.grid().rows(),
            outline.grid().cols()
        ));
        parts.push(format!("Merged cells: {}", titled_regions(outline).count()));
        parts.push(String::new());
        let body = outline.render(OutputFormat::Analysis);
        if !body.is_empty() {
            parts.push(body);
        }
        parts.push(format!("\n{}\n", rule(RULE_WIDTH)));
    }
    parts.join("\n")
}
