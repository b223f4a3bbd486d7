//! Volatile artifact pruning
//!
//! Stamped output must not carry parts that go stale once formulas are
//! gone or that leak machine-local state from whoever last saved the
//! template: the calculation chain, printer settings, drawing layers,
//! embedded control properties, comment threads, and workbook-level
//! defined names. Removing a part means removing every reference to it
//! as well, or strict consumers reject the package; the passes here keep
//! [Content_Types].xml and the relationship parts consistent with the
//! tree after each removal.
//!
//! Every pass is idempotent: pruning an already-pruned tree is a no-op.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::error::{StampError, StampResult};
use crate::manifest::{read_relationships, resolve_target};
use crate::package::PackageTree;

/// Part-name prefixes removed wholesale (their `_rels` live underneath
/// the same prefixes and go with them)
const VOLATILE_PREFIXES: &[&str] = &[
    "xl/printerSettings/",
    "xl/drawings/",
    "xl/ctrlProps/",
    "xl/persons/",
    "xl/threadedComments/",
];

/// File extensions whose `<Default>` content-type entries only exist for
/// pruned artifact classes
const VOLATILE_EXTENSIONS: &[&str] = &["vml", "bin"];

/// Remove every volatile artifact from the tree and re-sync the package
/// metadata that referenced it.
pub fn prune_volatile(tree: &PackageTree) -> StampResult<()> {
    remove_volatile_parts(tree)?;
    strip_defined_names(tree)?;
    scrub_worksheets(tree)?;
    clean_relationships(tree)?;
    sync_content_types(tree)?;
    Ok(())
}

fn is_volatile_part(name: &str) -> bool {
    if name == "xl/calcChain.xml" {
        return true;
    }
    if name.starts_with("xl/comments") && name.ends_with(".xml") {
        return true;
    }
    VOLATILE_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn remove_volatile_parts(tree: &PackageTree) -> StampResult<()> {
    for part in tree.part_names()? {
        if is_volatile_part(&part) {
            log::debug!("pruning part {}", part);
            tree.remove_part(&part)?;
        }
    }
    Ok(())
}

/// Drop the `<definedNames>` block from xl/workbook.xml. Defined names
/// are formula aliases; once formulas are excised they resolve to nothing
/// and some range names point at sheets the isolation pass deletes.
fn strip_defined_names(tree: &PackageTree) -> StampResult<()> {
    let xml = tree.read_part("xl/workbook.xml")?;
    let stripped = drop_elements(&xml, &[b"definedNames"])?;
    if stripped != xml {
        tree.write_part("xl/workbook.xml", &stripped)?;
    }
    Ok(())
}

/// In-sheet references to pruned parts: drawing anchors, legacy VML
/// layers, embedded controls, and the `r:id` printer-settings link on
/// `<pageSetup>`.
fn scrub_worksheets(tree: &PackageTree) -> StampResult<()> {
    for part in tree.part_names()? {
        if !part.starts_with("xl/worksheets/") || part.contains("_rels") || !part.ends_with(".xml")
        {
            continue;
        }
        let xml = tree.read_part(&part)?;
        let scrubbed = scrub_sheet_xml(&xml)?;
        if scrubbed != xml {
            tree.write_part(&part, &scrubbed)?;
        }
    }
    Ok(())
}

const SCRUBBED_ELEMENTS: &[&[u8]] = &[b"drawing", b"legacyDrawing", b"legacyDrawingHF", b"controls"];

fn scrub_sheet_xml(sheet_xml: &str) -> StampResult<String> {
    let mut reader = Reader::from_str(sheet_xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) if SCRUBBED_ELEMENTS.contains(&e.name().as_ref()) => {}
            Ok(Event::Start(e)) if SCRUBBED_ELEMENTS.contains(&e.name().as_ref()) => {
                let name = e.name().as_ref().to_vec();
                skip_subtree(&mut reader, &name)?;
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"pageSetup" => {
                writer.write_event(Event::Empty(without_rid(&e)))?;
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"pageSetup" => {
                writer.write_event(Event::Start(without_rid(&e)))?;
            }
            Ok(Event::Eof) => break,
            Ok(ev) => writer.write_event(ev)?,
            Err(e) => return Err(StampError::Xml(e)),
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|_| StampError::Parse("scrubbed worksheet is not valid UTF-8".into()))
}

fn without_rid(start: &BytesStart<'_>) -> BytesStart<'static> {
    let mut out = BytesStart::new("pageSetup");
    for attr in start.attributes().flatten() {
        if attr.key.as_ref() != b"r:id" {
            if let Ok(value) = attr.unescape_value() {
                out.push_attribute((
                    String::from_utf8_lossy(attr.key.as_ref()).to_string().as_str(),
                    value.as_ref(),
                ));
            }
        }
    }
    out
}

fn drop_elements(xml: &str, names: &[&[u8]]) -> StampResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) if names.contains(&e.name().as_ref()) => {}
            Ok(Event::Start(e)) if names.contains(&e.name().as_ref()) => {
                let name = e.name().as_ref().to_vec();
                skip_subtree(&mut reader, &name)?;
            }
            Ok(Event::Eof) => break,
            Ok(ev) => writer.write_event(ev)?,
            Err(e) => return Err(StampError::Xml(e)),
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|_| StampError::Parse("rewritten part is not valid UTF-8".into()))
}

fn skip_subtree(reader: &mut Reader<&[u8]>, name: &[u8]) -> StampResult<()> {
    let mut depth = 1usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == name => depth += 1,
            Ok(Event::End(e)) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Ok(Event::Eof) => {
                return Err(StampError::Parse(format!(
                    "unterminated <{}> element",
                    String::from_utf8_lossy(name)
                )))
            }
            Ok(_) => {}
            Err(e) => return Err(StampError::Xml(e)),
        }
    }
}

/// Drop relationships whose targets no longer exist, then drop rels parts
/// that end up empty.
fn clean_relationships(tree: &PackageTree) -> StampResult<()> {
    for rels_part in tree
        .part_names()?
        .into_iter()
        .filter(|p| p.ends_with(".rels"))
    {
        let rels = read_relationships(tree, &rels_part)?;
        let kept: Vec<_> = rels
            .into_iter()
            .filter(|r| {
                // external targets (hyperlinks) have nothing in the tree
                r.is_external() || tree.has_part(&resolve_target(&rels_part, &r.target))
            })
            .collect();

        if kept.is_empty() && rels_part != "_rels/.rels" {
            tree.remove_part(&rels_part)?;
            continue;
        }

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for rel in &kept {
            let mode = match &rel.target_mode {
                Some(m) => format!(r#" TargetMode="{}""#, escape(m)),
                None => String::new(),
            };
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape(&rel.id),
                escape(&rel.rel_type),
                escape(&rel.target),
                mode
            ));
        }
        xml.push_str("</Relationships>");
        tree.write_part(&rels_part, &xml)?;
    }
    Ok(())
}

/// Rewrite [Content_Types].xml to cover exactly the parts still present:
/// `<Override>` entries for removed parts go away, as do `<Default>`
/// extension entries that only served pruned artifact classes.
pub fn sync_content_types(tree: &PackageTree) -> StampResult<()> {
    let xml = tree.read_part("[Content_Types].xml")?;
    let mut reader = Reader::from_str(&xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) if e.name().as_ref() == b"Override" => {
                let part_name = attr_value(&e, b"PartName");
                let keep = match part_name {
                    Some(name) => tree.has_part(name.trim_start_matches('/')),
                    None => false,
                };
                if keep {
                    writer.write_event(Event::Empty(e.into_owned()))?;
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"Default" => {
                let ext = attr_value(&e, b"Extension");
                let drop = matches!(&ext, Some(x) if VOLATILE_EXTENSIONS.contains(&x.as_str()));
                if !drop {
                    writer.write_event(Event::Empty(e.into_owned()))?;
                }
            }
            Ok(Event::Eof) => break,
            Ok(ev) => writer.write_event(ev)?,
            Err(e) => return Err(StampError::Xml(e)),
        }
    }

    let rewritten = String::from_utf8(writer.into_inner())
        .map_err(|_| StampError::Parse("rewritten content types are not valid UTF-8".into()))?;
    tree.write_part("[Content_Types].xml", &rewritten)
}

fn attr_value(start: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    start
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}
