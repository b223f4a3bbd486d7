//! Sheet isolation
//!
//! A stamped document shows exactly one worksheet. This pass keeps the
//! variant's target sheet, retitles it, deletes every other worksheet part,
//! and rewrites the workbook so the survivor is `sheet1` with `sheetId="1"`
//! and `r:id="rId1"`. Package metadata (workbook rels, content types) is
//! renumbered to match; [`prune_volatile`](crate::prune::prune_volatile)
//! afterwards clears out anything left dangling.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use quick_xml::Writer;

use docstamp_core::validate_sheet_name;

use crate::error::{StampError, StampResult};
use crate::manifest::{
    read_relationships, read_sheet_entries, rels_part_for, resolve_target, Relationship,
};
use crate::package::PackageTree;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

const SHEET1_PART: &str = "xl/worksheets/sheet1.xml";

/// Reduce the workbook to the single sheet at `sheet_index`, retitled to
/// `title`. Fails without touching the tree when the index is out of bounds
/// or the title is not a legal sheet name.
pub fn isolate_sheet(tree: &PackageTree, sheet_index: usize, title: &str) -> StampResult<()> {
    validate_sheet_name(title)?;

    let entries = read_sheet_entries(tree)?;
    let target = entries.get(sheet_index).ok_or_else(|| {
        StampError::InvalidPackage(format!(
            "sheet index {} out of bounds for workbook with {} sheets",
            sheet_index,
            entries.len()
        ))
    })?;

    let rels = read_relationships(tree, "xl/_rels/workbook.xml.rels")?;
    let target_part = rels
        .iter()
        .find(|r| r.id == target.rid)
        .map(|r| resolve_target("xl/_rels/workbook.xml.rels", &r.target))
        .ok_or_else(|| {
            StampError::InvalidPackage(format!(
                "workbook sheet `{}` has no relationship `{}`",
                target.name, target.rid
            ))
        })?;
    if !tree.has_part(&target_part) {
        return Err(StampError::MissingPart(target_part));
    }

    log::debug!(
        "isolating sheet {} (`{}` -> `{}`), part {}",
        sheet_index,
        target.name,
        title,
        target_part
    );

    // Delete every other worksheet part and its rels
    for rel in rels.iter().filter(|r| r.is_worksheet()) {
        let part = resolve_target("xl/_rels/workbook.xml.rels", &rel.target);
        if part == target_part {
            continue;
        }
        tree.remove_part(&rels_part_for(&part))?;
        tree.remove_part(&part)?;
    }

    // Move the survivor into the canonical sheet1 slot
    if target_part != SHEET1_PART {
        let target_rels = rels_part_for(&target_part);
        tree.rename_part(&target_part, SHEET1_PART)?;
        if tree.has_part(&target_rels) {
            tree.rename_part(&target_rels, &rels_part_for(SHEET1_PART))?;
        }
    }

    write_workbook(tree, title)?;
    write_workbook_rels(tree, &rels)?;
    ensure_sheet1_override(tree)?;
    Ok(())
}

fn write_workbook(tree: &PackageTree, title: &str) -> StampResult<()> {
    // Workbook-level properties survive the rewrite; date1904 in
    // particular changes how every remaining serial is interpreted
    let old = tree.read_part("xl/workbook.xml")?;
    let workbook_pr = extract_workbook_pr(&old)?.unwrap_or_default();
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{workbook_pr}<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(title)
    );
    tree.write_part("xl/workbook.xml", &workbook)
}

/// Pull the `<workbookPr>` element out of a workbook manifest, if present
fn extract_workbook_pr(xml: &str) -> StampResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) if depth == 0 && e.name().as_ref() == b"workbookPr" => {
                writer.write_event(Event::Empty(e.into_owned()))?;
                break;
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"workbookPr" => {
                depth += 1;
                writer.write_event(Event::Start(e.into_owned()))?;
            }
            Ok(Event::End(e)) if depth > 0 && e.name().as_ref() == b"workbookPr" => {
                depth -= 1;
                writer.write_event(Event::End(e.into_owned()))?;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(ev) if depth > 0 => writer.write_event(ev)?,
            Ok(_) => {}
            Err(e) => return Err(StampError::Xml(e)),
        }
    }

    let buf = writer.into_inner();
    if buf.is_empty() {
        return Ok(None);
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| StampError::Parse("workbookPr is not valid UTF-8".into()))
}

/// Survivor becomes rId1; every non-worksheet relationship keeps its type
/// and target but gets renumbered after it.
fn write_workbook_rels(tree: &PackageTree, rels: &[Relationship]) -> StampResult<()> {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/>"#
    );

    let mut next_rid = 2;
    for rel in rels {
        if rel.is_worksheet() {
            continue;
        }
        // Keep only relationships whose parts survived earlier passes
        let resolved = resolve_target("xl/_rels/workbook.xml.rels", &rel.target);
        if !rel.is_external() && !tree.has_part(&resolved) {
            continue;
        }
        let mode = match &rel.target_mode {
            Some(m) => format!(r#" TargetMode="{}""#, escape(m)),
            None => String::new(),
        };
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{}" Target="{}"{}/>"#,
            next_rid,
            escape(&rel.rel_type),
            escape(&rel.target),
            mode
        ));
        next_rid += 1;
    }
    xml.push_str("</Relationships>");
    tree.write_part("xl/_rels/workbook.xml.rels", &xml)
}

/// After the rename, [Content_Types].xml may list the survivor under its
/// old part name only. Make sure /xl/worksheets/sheet1.xml has an Override.
fn ensure_sheet1_override(tree: &PackageTree) -> StampResult<()> {
    let xml = tree.read_part("[Content_Types].xml")?;
    if xml.contains(r#"PartName="/xl/worksheets/sheet1.xml""#) {
        return Ok(());
    }
    let entry = r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#;
    let rewritten = match xml.rfind("</Types>") {
        Some(pos) => {
            let mut out = String::with_capacity(xml.len() + entry.len());
            out.push_str(&xml[..pos]);
            out.push_str(entry);
            out.push_str(&xml[pos..]);
            out
        }
        None => return Err(StampError::InvalidPackage("no </Types> in content types".into())),
    };
    tree.write_part("[Content_Types].xml", &rewritten)
}
