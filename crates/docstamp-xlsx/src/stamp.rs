//! The stamping pipeline
//!
//! [`Stamper`] strings the per-part passes together in the order the
//! output contract requires: extract, excise formulas on the target sheet,
//! write the explicit field values, prune volatile artifacts, isolate the
//! target sheet, apply optional page layout, repackage. The scratch tree
//! lives in a temp directory that is dropped on every exit path.

use std::fs;
use std::path::Path;

use docstamp_core::{DataDictionary, DocumentVariant};

use crate::cells::set_cell_value;
use crate::error::{StampError, StampResult};
use crate::excise::{excise_formulas, FallbackResolver};
use crate::isolate::isolate_sheet;
use crate::layout::apply_layout;
use crate::manifest::{read_sheet_entries, worksheet_part_for};
use crate::package::PackageTree;
use crate::prune::{prune_volatile, sync_content_types};

/// Counters for one stamping run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StampStats {
    /// Formula-bearing cells rewritten to literals
    pub formulas_excised: usize,
    /// Field-map entries written through the explicit setter
    pub fields_written: usize,
    /// Cells left as empty inline strings because no value could be
    /// resolved, plus field-map entries skipped for missing data
    pub resolution_gaps: usize,
}

/// A stamped package plus its run counters
#[derive(Debug, Clone)]
pub struct StampOutcome {
    /// The finished archive
    pub bytes: Vec<u8>,
    pub stats: StampStats,
}

/// Template-to-document stamping engine.
///
/// The stamper itself only carries the fallback resolver; everything
/// per-document arrives through the [`DocumentVariant`] and
/// [`DataDictionary`] passed to each call, so one stamper can serve
/// concurrent runs over different templates.
#[derive(Debug, Clone, Default)]
pub struct Stamper {
    fallback: FallbackResolver,
}

impl Stamper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: FallbackResolver) -> Self {
        Self { fallback }
    }

    /// Stamp a template held in memory.
    pub fn stamp(
        &self,
        template: &[u8],
        variant: &DocumentVariant,
        data: &DataDictionary,
    ) -> StampResult<StampOutcome> {
        variant.validate_title()?;

        let tree = PackageTree::extract(template)?;

        let entries = read_sheet_entries(&tree)?;
        let entry = entries.get(variant.sheet_index).ok_or_else(|| {
            StampError::InvalidPackage(format!(
                "sheet index {} out of bounds for workbook with {} sheets",
                variant.sheet_index,
                entries.len()
            ))
        })?;
        let sheet_part = worksheet_part_for(&tree, &entry.rid)?;

        let mut stats = StampStats::default();
        let mut sheet_xml = tree.read_part(&sheet_part)?;

        let (excised, report) =
            excise_formulas(&sheet_xml, variant.field_map(), data, &self.fallback)?;
        sheet_xml = excised;
        stats.formulas_excised = report.formulas_excised;
        stats.resolution_gaps = report.resolution_gaps;

        for (key, binding) in variant.field_map().iter() {
            match data.get(key) {
                Some(value) => {
                    sheet_xml =
                        set_cell_value(&sheet_xml, binding.address, &value.to_literal(binding.kind))?;
                    stats.fields_written += 1;
                }
                None => {
                    log::warn!(
                        "field `{}` at {} has no value in the data dictionary, cell left as-is",
                        key,
                        binding.address.to_a1_string()
                    );
                    stats.resolution_gaps += 1;
                }
            }
        }

        tree.write_part(&sheet_part, &sheet_xml)?;

        prune_volatile(&tree)?;
        isolate_sheet(&tree, variant.sheet_index, &variant.sheet_title)?;
        // isolation renames parts; re-sync overrides a second time
        sync_content_types(&tree)?;

        if let Some(layout) = variant.layout() {
            apply_layout(&tree, layout)?;
        }

        let bytes = tree.repack()?;
        log::info!(
            "stamped `{}`: {} formulas excised, {} fields written, {} gaps",
            variant.sheet_title,
            stats.formulas_excised,
            stats.fields_written,
            stats.resolution_gaps
        );
        Ok(StampOutcome { bytes, stats })
    }

    /// Stamp a template file into an output file.
    ///
    /// Fails before anything is written when the template does not exist.
    pub fn stamp_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        template: P,
        output: Q,
        variant: &DocumentVariant,
        data: &DataDictionary,
    ) -> StampResult<StampStats> {
        let template = template.as_ref();
        if !template.is_file() {
            return Err(StampError::TemplateNotFound(template.to_path_buf()));
        }
        let bytes = fs::read(template)?;
        let outcome = self.stamp(&bytes, variant, data)?;
        fs::write(output, &outcome.bytes)?;
        Ok(outcome.stats)
    }
}
