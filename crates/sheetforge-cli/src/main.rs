//! Sheetforge CLI - compose and fill workbooks from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sheetforge_engine::spec::WorkbookSpec;
use sheetforge_engine::template::fill_to_buffer;
use sheetforge_engine::{compose, TemplateStore};
use sheetforge_xlsx::XlsxReader;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetforge")]
#[command(author, version, about = "Workbook composition tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a workbook from a JSON document
    Build {
        /// Input document (JSON)
        input: PathBuf,

        /// Output workbook path (default: the document's filename field,
        /// else output.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory to resolve template names against
        #[arg(short, long)]
        templates: Option<PathBuf>,
    },

    /// Fill a template workbook from a JSON data mapping
    Fill {
        /// Template workbook (xlsx)
        template: PathBuf,

        /// Data mapping (JSON object)
        data: PathBuf,

        /// Output workbook path
        #[arg(short, long, default_value = "filled.xlsx")]
        output: PathBuf,
    },

    /// Show information about a workbook
    Info {
        /// Input workbook file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            templates,
        } => build(&input, output, templates),
        Commands::Fill {
            template,
            data,
            output,
        } => fill(&template, &data, &output),
        Commands::Info { input } => show_info(&input),
    }
}

fn build(input: &PathBuf, output: Option<PathBuf>, templates: Option<PathBuf>) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    let spec: WorkbookSpec =
        serde_json::from_str(&text).context("Failed to parse workbook document")?;

    let store = templates.map(TemplateStore::new);
    let composed = compose(&spec, store.as_ref()).context("Composition failed")?;

    let output = output
        .or_else(|| spec.filename.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("output.xlsx"));

    std::fs::write(&output, &composed.buffer)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    eprintln!(
        "Wrote {} sheets ({} bytes) to '{}'",
        composed.sheets_processed,
        composed.buffer.len(),
        output.display()
    );
    Ok(())
}

fn fill(template: &PathBuf, data_path: &PathBuf, output: &PathBuf) -> Result<()> {
    let workbook = XlsxReader::read_file(template)
        .with_context(|| format!("Failed to open '{}'", template.display()))?;

    let text = std::fs::read_to_string(data_path)
        .with_context(|| format!("Failed to read '{}'", data_path.display()))?;
    let data: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).context("Data file must be a JSON object")?;

    let (buffer, stats) = fill_to_buffer(workbook, &data).context("Template fill failed")?;

    std::fs::write(output, &buffer)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    eprintln!(
        "Substituted {} cells, inserted {} rows; wrote '{}'",
        stats.cells_substituted,
        stats.rows_inserted,
        output.display()
    );
    Ok(())
}

fn show_info(input: &PathBuf) -> Result<()> {
    let workbook = XlsxReader::read_file(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;

    println!("File: {}", input.display());
    println!("Sheets: {}", workbook.sheet_count());

    for (i, sheet) in workbook.worksheets().enumerate() {
        println!();
        println!("  Sheet {}: \"{}\"", i, sheet.name());

        if let Some(range) = sheet.used_range() {
            println!(
                "    Used range: {} rows x {} columns",
                range.end.row + 1,
                range.end.col + 1
            );
        } else {
            println!("    Used range: empty");
        }
        println!("    Cells: {}", sheet.cell_count());
    }

    Ok(())
}
