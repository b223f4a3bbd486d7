//! Prelude module - common imports for docstamp users
//!
//! ```rust
//! use docstamp::prelude::*;
//! ```

pub use crate::{
    CellAddress,
    CellLiteral,
    CellRange,
    // Variant types
    DataDictionary,
    DocumentVariant,
    // Error types
    Error,
    FallbackResolver,
    // Field types
    FieldKind,
    FieldMap,
    FieldValue,
    PageLayout,
    Result,
    StampError,
    StampResult,
    StampStats,
    // The engine
    Stamper,
};
