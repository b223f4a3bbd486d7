//! Shared string table manager
//!
//! Parses the package's deduplicated string pool and can write it back with
//! its `count`/`uniqueCount` declarations kept in sync with the list. New
//! text everywhere else in this crate is written as inline strings so that
//! editing one cell can never change the rendered text of another cell that
//! shares an index; the [`SharedStringTable::intern`] write path exists only
//! for callers that must preserve legacy shared references.

use std::collections::HashMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{StampError, StampResult};
use crate::package::PackageTree;

const SST_PART: &str = "xl/sharedStrings.xml";
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Ordered unique strings referenced from cells by index
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    strings: Vec<String>,
    index: HashMap<String, usize>,
}

impl SharedStringTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `sharedStrings.xml` part.
    ///
    /// Rich-text runs are flattened to their concatenated text; an `<si>`
    /// with no readable text becomes the empty string so indices stay dense.
    pub fn parse(xml: &str) -> StampResult<Self> {
        let mut reader = Reader::from_str(xml);
        let mut table = Self::new();

        let mut current = String::new();
        let mut in_si = false;
        let mut in_text = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"t" if in_si => in_text = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => {
                    table.push(String::new());
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        table.push(std::mem::take(&mut current));
                        in_si = false;
                    }
                    b"t" => in_text = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_text => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(StampError::Xml(e)),
                _ => {}
            }
        }

        Ok(table)
    }

    /// Load the table from a package tree; a missing part yields an empty
    /// table, since packages without shared strings are valid
    pub fn from_tree(tree: &PackageTree) -> StampResult<Self> {
        match tree.read_part(SST_PART) {
            Ok(xml) => Self::parse(&xml),
            Err(StampError::MissingPart(_)) => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }

    fn push(&mut self, text: String) {
        self.index.entry(text.clone()).or_insert(self.strings.len());
        self.strings.push(text);
    }

    /// Look up a string by index
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.strings.get(idx).map(|s| s.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Legacy write path: return the index for `text`, appending it if new
    pub fn intern<S: Into<String>>(&mut self, text: S) -> usize {
        let text = text.into();
        if let Some(&idx) = self.index.get(&text) {
            return idx;
        }
        let idx = self.strings.len();
        self.push(text);
        idx
    }

    /// Serialize the table; declared totals always equal the list length
    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{}" count="{}" uniqueCount="{}">"#,
            MAIN_NS,
            self.strings.len(),
            self.strings.len()
        );
        for s in &self.strings {
            if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
                xml.push_str(&format!(
                    r#"<si><t xml:space="preserve">{}</t></si>"#,
                    escape(s.as_str())
                ));
            } else {
                xml.push_str(&format!("<si><t>{}</t></si>", escape(s.as_str())));
            }
        }
        xml.push_str("</sst>");
        xml
    }

    /// Write the table back into a package tree
    pub fn write_to_tree(&self, tree: &PackageTree) -> StampResult<()> {
        tree.write_part(SST_PART, &self.to_xml())
    }
}
