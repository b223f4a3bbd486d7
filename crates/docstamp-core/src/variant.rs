//! Document variant: which worksheet, which fields, which layout

use crate::cell::CellRange;
use crate::error::{Error, Result};
use crate::field::FieldMap;
use crate::MAX_SHEET_NAME_LEN;

/// Characters a sheet name may not contain
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Selects which worksheet and field map apply to one document kind.
///
/// A registry of variants lives outside this crate; callers construct one
/// per generation call.
#[derive(Debug, Clone)]
pub struct DocumentVariant {
    /// 0-based index of the worksheet to keep
    pub sheet_index: usize,
    /// Title of the single surviving sheet
    pub sheet_title: String,
    field_map: FieldMap,
    layout: Option<PageLayout>,
}

impl DocumentVariant {
    /// Create a variant targeting a worksheet index with an output title
    pub fn new<S: Into<String>>(sheet_index: usize, sheet_title: S) -> Self {
        Self {
            sheet_index,
            sheet_title: sheet_title.into(),
            field_map: FieldMap::new(),
            layout: None,
        }
    }

    /// Replace the field map
    pub fn with_field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    /// Attach an optional page layout post-processing step
    pub fn with_layout(mut self, layout: PageLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// The field map for this variant
    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    /// Mutable access to the field map
    pub fn field_map_mut(&mut self) -> &mut FieldMap {
        &mut self.field_map
    }

    /// The layout step, if any
    pub fn layout(&self) -> Option<&PageLayout> {
        self.layout.as_ref()
    }

    /// Validate the output sheet title against format rules
    pub fn validate_title(&self) -> Result<()> {
        validate_sheet_name(&self.sheet_title)
    }
}

/// Check a sheet name against the format's rules
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidSheetName("empty name".into()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(format!(
            "'{}' exceeds {} characters",
            name, MAX_SHEET_NAME_LEN
        )));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
        return Err(Error::InvalidSheetName(format!(
            "'{}' contains forbidden character '{}'",
            name, c
        )));
    }
    Ok(())
}

/// Optional layout adjustments applied after the core pipeline.
///
/// Loosely coupled by design: the mutation pipeline never consults this, the
/// final post-processing stage does.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    /// Printable area; columns to its right get hidden and fit-to-page is
    /// enabled so exports crop to the document body
    pub print_area: Option<CellRange>,
    /// Extra column span to hide (template scratch columns)
    pub hidden_cols: Option<CellRange>,
    /// Force the sheet to scale to a single page
    pub fit_to_page: bool,
}

impl PageLayout {
    /// Whether this layout requests any change at all
    pub fn is_noop(&self) -> bool {
        self.print_area.is_none() && self.hidden_cols.is_none() && !self.fit_to_page
    }
}
