//! Docstamp CLI - stamp xlsx templates into static documents

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docstamp::prelude::*;
use docstamp::{
    count_formula_cells, read_sheet_entries, worksheet_part_for, PackageTree, SharedStringTable,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docstamp")]
#[command(author, version, about = "Stamp xlsx templates into static single-sheet documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp a template with field values
    Stamp {
        /// Input template (xlsx)
        template: PathBuf,

        /// Output document
        output: PathBuf,

        /// Field map JSON: {"field": {"cell": "B2", "kind": "text"}}
        #[arg(short, long)]
        map: PathBuf,

        /// Field data JSON: {"field": "value"}
        #[arg(short, long)]
        data: PathBuf,

        /// Sheet index to keep (0-based, default: 0)
        #[arg(short, long, default_value = "0")]
        sheet: usize,

        /// Title for the surviving sheet
        #[arg(short, long)]
        title: String,

        /// Printable range; columns right of it get hidden
        #[arg(long)]
        print_area: Option<String>,

        /// Scale the sheet to a single printed page
        #[arg(long)]
        fit: bool,
    },

    /// Show information about a template
    Info {
        /// Input template
        template: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stamp {
            template,
            output,
            map,
            data,
            sheet,
            title,
            print_area,
            fit,
        } => stamp(&template, &output, &map, &data, sheet, &title, print_area.as_deref(), fit),
        Commands::Info { template } => show_info(&template),
    }
}

/// JSON shape of one field-map entry
#[derive(Deserialize)]
struct MapEntry {
    cell: String,
    kind: FieldKind,
}

#[allow(clippy::too_many_arguments)]
fn stamp(
    template: &Path,
    output: &Path,
    map_path: &Path,
    data_path: &Path,
    sheet: usize,
    title: &str,
    print_area: Option<&str>,
    fit: bool,
) -> Result<()> {
    let map_json = std::fs::read_to_string(map_path)
        .with_context(|| format!("Failed to read '{}'", map_path.display()))?;
    // BTreeMap keeps the write order stable across runs
    let entries: BTreeMap<String, MapEntry> =
        serde_json::from_str(&map_json).context("Failed to parse field map")?;

    let mut fields = FieldMap::new();
    for (key, entry) in entries {
        let address = CellAddress::parse(&entry.cell)
            .with_context(|| format!("Field `{}`: bad cell address '{}'", key, entry.cell))?;
        fields
            .try_bind(key, address, entry.kind)
            .context("Duplicate field in map")?;
    }

    let data_json = std::fs::read_to_string(data_path)
        .with_context(|| format!("Failed to read '{}'", data_path.display()))?;
    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&data_json).context("Failed to parse field data")?;

    let mut data = DataDictionary::new();
    for (key, value) in raw {
        data.insert(key.clone(), json_to_field_value(&key, &value)?);
    }

    let mut variant = DocumentVariant::new(sheet, title).with_field_map(fields);
    if print_area.is_some() || fit {
        let area = print_area
            .map(CellRange::parse)
            .transpose()
            .context("Bad print area")?;
        variant = variant.with_layout(PageLayout {
            print_area: area,
            hidden_cols: None,
            fit_to_page: fit,
        });
    }

    let stats = Stamper::new()
        .stamp_file(template, output, &variant, &data)
        .with_context(|| format!("Failed to stamp '{}'", template.display()))?;

    eprintln!(
        "Stamped '{}': {} formulas excised, {} fields written, {} gaps",
        output.display(),
        stats.formulas_excised,
        stats.fields_written,
        stats.resolution_gaps
    );
    Ok(())
}

/// JSON strings that look like ISO dates become dates so date-kind fields
/// land as day serials rather than text.
fn json_to_field_value(key: &str, value: &serde_json::Value) -> Result<FieldValue> {
    match value {
        serde_json::Value::String(s) => {
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Ok(FieldValue::Date(date));
            }
            Ok(FieldValue::Text(s.clone()))
        }
        serde_json::Value::Number(n) => {
            let n = n
                .as_f64()
                .with_context(|| format!("Field `{}`: number out of range", key))?;
            Ok(FieldValue::Number(n))
        }
        serde_json::Value::Bool(b) => Ok(FieldValue::Text(
            if *b { "TRUE" } else { "FALSE" }.to_string(),
        )),
        other => bail!("Field `{}`: unsupported value {}", key, other),
    }
}

fn show_info(template: &Path) -> Result<()> {
    let tree = PackageTree::extract_file(template)
        .with_context(|| format!("Failed to open '{}'", template.display()))?;

    let entries = read_sheet_entries(&tree).context("Failed to read workbook sheets")?;
    let strings = SharedStringTable::from_tree(&tree).context("Failed to read shared strings")?;

    println!("File: {}", template.display());
    println!("Sheets: {}", entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let formulas = worksheet_part_for(&tree, &entry.rid)
            .and_then(|part| tree.read_part(&part))
            .and_then(|xml| count_formula_cells(&xml))
            .unwrap_or(0);
        println!("  [{}] {} ({} formulas)", i, entry.name, formulas);
    }
    println!("Shared strings: {}", strings.len());

    Ok(())
}
