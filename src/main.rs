//! sheet-outline CLI - converts spreadsheets with merged cells into structured text

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use sheet_outline::{read_workbook, render_document, Criteria, Outline, OutlineError, OutputFormat, Range};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sheet-outline")]
#[command(version)]
#[command(about = "Convert spreadsheets with merged cells into structured text", long_about = None)]
struct Cli {
    /// Input workbooks (.xlsx, .xlsm, .xltx, .xltm, .xls); glob patterns are expanded
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file, `-` for stdout (default: `<input stem>_extracted.<md|txt>` next to each input)
    #[arg(short, long)]
    output: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Llm)]
    format: Format,

    /// Only read sheets whose name matches this glob pattern (repeatable)
    #[arg(long = "sheet", value_name = "PATTERN")]
    sheets: Vec<String>,

    /// Read at most this many sheets per workbook
    #[arg(long, value_name = "N")]
    sheet_limit: Option<usize>,

    /// Only read cells inside this A1-style range, e.g. `A1:H40`, `B:F` or `3:20`
    #[arg(long, value_name = "RANGE")]
    range: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `Row r: Col c: value` dump of every non-empty cell
    Plain,
    /// Markdown headings for titles, pipe tables for data
    Markdown,
    /// Linear text for language models
    Llm,
    /// Cell coordinates and merge structure
    Analysis,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Plain => OutputFormat::PlainText,
            Format::Markdown => OutputFormat::HybridMarkdown,
            Format::Llm => OutputFormat::LlmOptimized,
            Format::Analysis => OutputFormat::Analysis,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(error) => {
            log::error!("{error:#}");
            ExitCode::from(1)
        }
    }
}

/// Converts every input; returns false if any of them failed.
fn run(cli: &Cli) -> Result<bool> {
    let format = OutputFormat::from(cli.format);
    let range = cli
        .range
        .as_deref()
        .map(Range::try_from)
        .transpose()
        .context("Invalid --range")?;
    let criteria = Criteria {
        sheet_limit: cli.sheet_limit,
        range,
        ..Criteria::default()
    }
    .with_sheet_patterns(&cli.sheets)
    .context("Invalid --sheet pattern")?;

    let mut succeeded = true;
    let mut documents = Vec::<String>::new();
    for input in expand_inputs(&cli.inputs, &mut succeeded) {
        let path = input.to_string_lossy().into_owned();
        match convert(&path, &criteria, format) {
            Ok(document) if cli.output.is_some() => documents.push(document),
            Ok(document) => {
                let output = default_output_path(&input, format);
                write_output(&output, &document)?;
                log::info!("{} -> {}", path, output.display());
            }
            Err(error) => {
                log::error!("{path}: {error:#}");
                succeeded = false;
            }
        }
    }

    if let Some(output) = &cli.output {
        let document = documents.join("\n\n");
        if output == "-" {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{document}")?;
        } else if !documents.is_empty() {
            write_output(Path::new(output), &document)?;
            log::info!("wrote {} document(s) to {}", documents.len(), output);
        }
    }
    Ok(succeeded)
}

/// Resolves glob patterns; plain paths are kept as given.
fn expand_inputs(inputs: &[String], succeeded: &mut bool) -> Vec<PathBuf> {
    let mut paths = Vec::<PathBuf>::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }
        match glob::glob(input) {
            Ok(matches) => {
                let before = paths.len();
                paths.extend(matches.filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(error) => {
                        log::warn!("{error}");
                        None
                    }
                }));
                if paths.len() == before {
                    log::error!("{input}: no file matches the pattern");
                    *succeeded = false;
                }
            }
            Err(error) => {
                log::error!("{input}: {error}");
                *succeeded = false;
            }
        }
    }
    paths
}

fn convert(path: &str, criteria: &Criteria, format: OutputFormat) -> Result<String> {
    let sheets = read_workbook(path, criteria)?;
    if sheets.is_empty() {
        bail!("no sheet matches the selection");
    }
    let outlines = sheets
        .iter()
        .map(|sheet| {
            let outline = Outline::analyze(sheet)?;
            for anomaly in outline.anomalies() {
                log::warn!("{}: sheet '{}': {}", sheet.file_name(), sheet.name(), anomaly);
            }
            Ok((sheet.name().to_owned(), outline))
        })
        .collect::<Result<Vec<_>, OutlineError>>()?;
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_owned());
    Ok(render_document(&file_name, &outlines, format))
}

fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
    input.with_file_name(format!("{stem}_extracted.{}", format.file_extension()))
}

fn write_output(path: &Path, document: &str) -> Result<()> {
    fs::write(path, format!("{document}\n")).with_context(|| format!("Failed to write {}", path.display()))
}
