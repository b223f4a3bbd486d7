//! # docstamp-core
//!
//! Core data structures for the docstamp template-stamping engine.
//!
//! This crate provides the fundamental types used throughout docstamp:
//! - [`CellAddress`] and [`CellRange`] - A1-style cell addressing
//! - [`FieldMap`], [`DataDictionary`], [`FieldValue`] - business fields and
//!   their target cells
//! - [`DocumentVariant`] - which worksheet and field map a document uses
//! - [`date_to_serial`] - calendar date to spreadsheet day-serial conversion
//!
//! No I/O happens here; package manipulation lives in `docstamp-xlsx`.
//!
//! ## Example
//!
//! ```rust
//! use docstamp_core::{CellAddress, DocumentVariant, FieldKind};
//!
//! let mut variant = DocumentVariant::new(1, "Contract");
//! variant
//!     .field_map_mut()
//!     .bind("client_name", CellAddress::parse("B2").unwrap(), FieldKind::Text);
//! ```

pub mod cell;
pub mod error;
pub mod field;
pub mod serial;
pub mod variant;

// Re-exports for convenience
pub use cell::{CellAddress, CellRange};
pub use error::{Error, Result};
pub use field::{
    format_number, CellLiteral, DataDictionary, FieldBinding, FieldKind, FieldMap, FieldValue,
};
pub use serial::date_to_serial;
pub use variant::{validate_sheet_name, DocumentVariant, PageLayout};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
