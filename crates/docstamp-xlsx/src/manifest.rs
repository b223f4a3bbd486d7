//! Workbook manifest and relationship-file parsing
//!
//! Small readers shared by the excision, pruning, and isolation stages.
//! These parse just enough of `xl/workbook.xml` and `*.rels` to keep the
//! sheet list, relationship ids, and physical parts in agreement.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{StampError, StampResult};
use crate::package::PackageTree;

/// One `<sheet>` entry from the workbook manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// Display name
    pub name: String,
    /// `sheetId` attribute
    pub sheet_id: String,
    /// Relationship id (`r:id`)
    pub rid: String,
}

/// One `<Relationship>` entry from a rels part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// `Id` attribute
    pub id: String,
    /// Full relationship type URI
    pub rel_type: String,
    /// Raw target as written in the file
    pub target: String,
    /// `TargetMode` attribute (`"External"` for hyperlinks and the like)
    pub target_mode: Option<String>,
}

impl Relationship {
    /// Whether this relationship points at a worksheet part
    pub fn is_worksheet(&self) -> bool {
        self.rel_type.ends_with("/worksheet")
    }

    /// Whether the target lives outside the package
    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some("External") || self.target.contains("://")
    }
}

/// Read the ordered sheet list from `xl/workbook.xml`
pub fn read_sheet_entries(tree: &PackageTree) -> StampResult<Vec<SheetEntry>> {
    let xml = tree.read_part("xl/workbook.xml")?;
    let mut reader = Reader::from_str(&xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut sheet_id = None;
                let mut rid = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"sheetId" => sheet_id = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"r:id" => rid = attr.unescape_value().ok().map(|s| s.to_string()),
                        _ => {}
                    }
                }

                if let (Some(name), Some(rid)) = (name, rid) {
                    sheets.push(SheetEntry {
                        name,
                        sheet_id: sheet_id.unwrap_or_default(),
                        rid,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StampError::Xml(e)),
            _ => {}
        }
    }

    Ok(sheets)
}

/// Read every relationship from a rels part; absent part means no rels
pub fn read_relationships(tree: &PackageTree, rels_part: &str) -> StampResult<Vec<Relationship>> {
    let xml = match tree.read_part(rels_part) {
        Ok(xml) => xml,
        Err(StampError::MissingPart(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut reader = Reader::from_str(&xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut rel_type = None;
                let mut target = None;
                let mut target_mode = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Type" => rel_type = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Target" => target = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"TargetMode" => {
                            target_mode = attr.unescape_value().ok().map(|s| s.to_string())
                        }
                        _ => {}
                    }
                }

                if let (Some(id), Some(rel_type), Some(target)) = (id, rel_type, target) {
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                        target_mode,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StampError::Xml(e)),
            _ => {}
        }
    }

    Ok(rels)
}

/// Resolve a relationship target against its rels file's owner directory.
///
/// `xl/_rels/workbook.xml.rels` targets resolve against `xl/`,
/// `xl/worksheets/_rels/sheet1.xml.rels` targets against `xl/worksheets/`,
/// honoring leading `/` (package-absolute) and `../` segments.
pub fn resolve_target(rels_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    // Owner dir: strip "_rels/<file>.rels" from the rels part name
    let owner_dir = rels_part
        .rsplit_once("_rels/")
        .map(|(dir, _)| dir.trim_end_matches('/'))
        .unwrap_or("");

    let mut segments: Vec<&str> = owner_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Find the worksheet part path for a sheet's relationship id
pub fn worksheet_part_for(tree: &PackageTree, rid: &str) -> StampResult<String> {
    let rels = read_relationships(tree, "xl/_rels/workbook.xml.rels")?;
    rels.iter()
        .find(|r| r.id == rid && r.is_worksheet())
        .map(|r| resolve_target("xl/_rels/workbook.xml.rels", &r.target))
        .ok_or_else(|| {
            StampError::InvalidPackage(format!("no worksheet relationship for {}", rid))
        })
}

/// The rels part name that would hold a part's relationships
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}
