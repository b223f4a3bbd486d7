//! # docstamp
//!
//! Stamp spreadsheet templates into static, single-sheet documents.
//!
//! A template workbook carries formulas, helper sheets, and authoring
//! clutter; the documents generated from it must carry none of that.
//! Docstamp unpacks the template, rewrites every formula on the target
//! sheet to the literal it should display, writes the per-document field
//! values, prunes volatile artifacts, isolates and retitles one sheet,
//! and repackages the result.
//!
//! ## Example
//!
//! ```rust,no_run
//! use docstamp::prelude::*;
//!
//! let mut fields = FieldMap::new();
//! fields.bind("customer_name", CellAddress::parse("B2")?, FieldKind::Text);
//! fields.bind("total", CellAddress::parse("K29")?, FieldKind::Number);
//!
//! let variant = DocumentVariant::new(0, "Order Final").with_field_map(fields);
//!
//! let mut data = DataDictionary::new();
//! data.insert("customer_name", "Acme Co.");
//! data.insert("total", 1500.0);
//!
//! let stats = Stamper::new().stamp_file("order.xlsx", "out.xlsx", &variant, &data)?;
//! println!("{} formulas excised", stats.formulas_excised);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

pub mod prelude;

// Re-export core types
pub use docstamp_core::{
    date_to_serial,
    format_number,
    validate_sheet_name,
    CellAddress,
    CellLiteral,
    CellRange,
    DataDictionary,
    DocumentVariant,
    // Error types
    Error,
    FieldBinding,
    FieldKind,
    FieldMap,
    FieldValue,
    PageLayout,
    Result,
    MAX_COLS,
    // Constants
    MAX_ROWS,
    MAX_SHEET_NAME_LEN,
};

// Re-export the stamping engine
pub use docstamp_xlsx::{
    ExcisionReport, FallbackResolver, PackageTree, SharedStringTable, StampError, StampOutcome,
    StampResult, StampStats, Stamper,
};

// Package introspection, for tooling that inspects templates without
// stamping them
pub use docstamp_xlsx::cells::count_formula_cells;
pub use docstamp_xlsx::manifest::{read_sheet_entries, worksheet_part_for, SheetEntry};
