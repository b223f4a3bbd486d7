//! OOXML spreadsheet stamping
//!
//! Turns a live `.xlsx` template into a static single-sheet document: the
//! package is unpacked to a scratch tree, formulas on the target sheet are
//! excised to the literals they should display, explicit field values are
//! written, volatile artifacts (calc chain, printer settings, drawings,
//! comments, defined names) are pruned together with every reference to
//! them, the target sheet is isolated and retitled, and the tree is
//! repackaged.
//!
//! [`stamp::Stamper`] is the assembled pipeline; the per-part passes are
//! public for callers that need to run them individually.

pub mod cells;
pub mod error;
pub mod excise;
pub mod isolate;
pub mod layout;
pub mod manifest;
pub mod package;
pub mod prune;
pub mod shared_strings;
pub mod stamp;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{StampError, StampResult};
pub use excise::{ExcisionReport, FallbackResolver};
pub use package::PackageTree;
pub use shared_strings::SharedStringTable;
pub use stamp::{StampOutcome, StampStats, Stamper};
