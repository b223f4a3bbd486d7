//! Field maps, data dictionaries, and cell literal rendering
//!
//! A [`FieldMap`] says *where* business fields land in a worksheet and how
//! they are typed; a [`DataDictionary`] says *what* the current values are.
//! Both are built per generation call and discarded afterwards.

use crate::cell::CellAddress;
use crate::error::{Error, Result};
use crate::serial::date_to_serial;
use chrono::NaiveDate;
use std::collections::HashMap;

/// How a field's value is represented when written into a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldKind {
    /// Inline string
    Text,
    /// Bare numeric literal
    Number,
    /// Integer day-serial
    Date,
}

/// A business value supplied by the caller
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Calendar date
    Date(NaiveDate),
}

impl FieldValue {
    /// Render this value as a cell literal of the requested kind.
    ///
    /// Coercions never fabricate data: a text value that does not parse as a
    /// number stays text (written as an inline string) rather than becoming
    /// a garbage numeric.
    pub fn to_literal(&self, kind: FieldKind) -> CellLiteral {
        match (kind, self) {
            (FieldKind::Text, v) => CellLiteral::Text(v.display_text()),
            (FieldKind::Number, FieldValue::Number(n)) => CellLiteral::Number(*n),
            (FieldKind::Number, FieldValue::Text(s)) => match s.trim().parse::<f64>() {
                Ok(n) => CellLiteral::Number(n),
                Err(_) => CellLiteral::Text(s.clone()),
            },
            (FieldKind::Number, FieldValue::Date(d)) => CellLiteral::Number(date_to_serial(*d) as f64),
            (FieldKind::Date, FieldValue::Date(d)) => CellLiteral::Serial(date_to_serial(*d)),
            (FieldKind::Date, FieldValue::Number(n)) => CellLiteral::Serial(*n as i64),
            (FieldKind::Date, FieldValue::Text(s)) => {
                match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
                    Ok(d) => CellLiteral::Serial(date_to_serial(d)),
                    Err(_) => CellLiteral::Text(s.clone()),
                }
            }
        }
    }

    fn display_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

/// A static literal ready to be written into a `<c>` node
///
/// This is the entire vocabulary of what a rewritten cell may hold; in
/// particular there is no shared-string variant, so a rewrite can never leave
/// a numeric payload behind a `t="s"` type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum CellLiteral {
    /// Bare numeric literal, no type attribute
    Number(f64),
    /// Integer day-serial, no type attribute
    Serial(i64),
    /// Inline string (`t="inlineStr"`)
    Text(String),
}

impl CellLiteral {
    /// The empty inline string used when no field resolves
    pub fn empty() -> Self {
        CellLiteral::Text(String::new())
    }
}

/// Format a numeric literal the way worksheet XML expects
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Where one field lands: target cell plus value kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBinding {
    /// Target cell address
    pub address: CellAddress,
    /// Value representation
    pub kind: FieldKind,
}

/// Ordered mapping from field key to target cell and kind
///
/// Order is insertion order; explicit writes happen in that order so a later
/// binding for the same address wins, matching how template variants are
/// authored.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: Vec<(String, FieldBinding)>,
}

impl FieldMap {
    /// Create an empty field map
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a field key to a cell address and kind
    pub fn bind<K: Into<String>>(&mut self, key: K, address: CellAddress, kind: FieldKind) {
        self.entries
            .push((key.into(), FieldBinding { address, kind }));
    }

    /// Bind a field, failing on a duplicate key
    pub fn try_bind<K: Into<String>>(
        &mut self,
        key: K,
        address: CellAddress,
        kind: FieldKind,
    ) -> Result<()> {
        let key = key.into();
        if self.get(&key).is_some() {
            return Err(Error::DuplicateField(key));
        }
        self.bind(key, address, kind);
        Ok(())
    }

    /// Look up a binding by field key
    pub fn get(&self, key: &str) -> Option<&FieldBinding> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, b)| b)
    }

    /// Look up the field bound to an address (ignoring `$` markers)
    pub fn field_at(&self, address: &CellAddress) -> Option<(&str, &FieldBinding)> {
        self.entries
            .iter()
            .find(|(_, b)| b.address.row == address.row && b.address.col == address.col)
            .map(|(k, b)| (k.as_str(), b))
    }

    /// Iterate bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldBinding)> {
        self.entries.iter().map(|(k, b)| (k.as_str(), b))
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no bindings
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flat key/value dictionary of current business data
///
/// Produced by an out-of-scope record translator; consumed read-only here.
#[derive(Debug, Clone, Default)]
pub struct DataDictionary {
    values: HashMap<String, FieldValue>,
}

impl DataDictionary {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value for a field key
    pub fn insert<K: Into<String>, V: Into<FieldValue>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up the value for a field key
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the dictionary is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for DataDictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = DataDictionary::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}
