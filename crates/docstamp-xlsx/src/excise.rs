//! Formula excision
//!
//! Consuming systems read stamped workbooks with viewers that never run a
//! calculation pass, so a live formula is a blank cell to them. This pass
//! replaces every formula-bearing cell on the target sheet with the static
//! literal it should display, resolved in order from:
//!
//! 1. the variant's field map, when the cell address is bound to a field;
//! 2. the fallback resolver, matching substrings of the formula text;
//! 3. an empty inline string, counted as a resolution gap.

use docstamp_core::{CellLiteral, DataDictionary, FieldKind, FieldMap};

use crate::cells::{rewrite_cells, CellEdit};
use crate::error::StampResult;

/// Ordered substring rules that recover a field for formulas whose cell is
/// not bound in the field map.
///
/// Rules are tried in insertion order and the first match wins, so register
/// the most specific needle first. Matching is case-sensitive against the
/// raw formula text.
#[derive(Debug, Clone, Default)]
pub struct FallbackResolver {
    rules: Vec<FallbackRule>,
}

#[derive(Debug, Clone)]
struct FallbackRule {
    needle: String,
    field: String,
    kind: FieldKind,
}

impl FallbackResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule: formulas containing `needle` resolve to `field`,
    /// coerced as `kind`.
    pub fn rule(mut self, needle: impl Into<String>, field: impl Into<String>, kind: FieldKind) -> Self {
        self.rules.push(FallbackRule {
            needle: needle.into(),
            field: field.into(),
            kind,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule whose needle occurs in the formula text
    pub fn resolve(&self, formula: &str) -> Option<(&str, FieldKind)> {
        self.rules
            .iter()
            .find(|r| formula.contains(&r.needle))
            .map(|r| (r.field.as_str(), r.kind))
    }
}

/// Counters reported back from one excision pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExcisionReport {
    /// Formula-bearing cells rewritten to literals
    pub formulas_excised: usize,
    /// Cells for which neither the field map nor the fallback produced a
    /// value, rewritten to an empty inline string
    pub resolution_gaps: usize,
}

/// Rewrite every formula cell in the worksheet to a static literal.
///
/// Untouched cells pass through unchanged; cells bound in the field map but
/// carrying no formula are left for the explicit write pass.
pub fn excise_formulas(
    sheet_xml: &str,
    field_map: &FieldMap,
    data: &DataDictionary,
    fallback: &FallbackResolver,
) -> StampResult<(String, ExcisionReport)> {
    let mut report = ExcisionReport::default();

    let rewritten = rewrite_cells(sheet_xml, |cell| {
        if !cell.has_formula {
            return CellEdit::Keep;
        }
        report.formulas_excised += 1;

        // Field map binding for this address takes priority
        if let Some((key, binding)) = field_map.field_at(&cell.reference) {
            if let Some(value) = data.get(key) {
                return CellEdit::Literal(value.to_literal(binding.kind));
            }
            log::warn!(
                "field `{}` bound at {} has no value in the data dictionary",
                key,
                cell.raw_ref
            );
            report.resolution_gaps += 1;
            return CellEdit::Literal(CellLiteral::empty());
        }

        // Fallback: match the formula text itself
        if let Some((key, kind)) = fallback.resolve(&cell.formula) {
            if let Some(value) = data.get(key) {
                return CellEdit::Literal(value.to_literal(kind));
            }
            log::warn!(
                "fallback field `{}` for formula at {} has no value in the data dictionary",
                key,
                cell.raw_ref
            );
        } else {
            log::warn!(
                "no resolution for formula at {}: {}",
                cell.raw_ref,
                cell.formula
            );
        }
        report.resolution_gaps += 1;
        CellEdit::Literal(CellLiteral::empty())
    })?;

    Ok((rewritten, report))
}
