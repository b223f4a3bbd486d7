//! Page layout post-processing
//!
//! Optional last touch on the isolated sheet: hide template scratch columns
//! and everything to the right of the printable area, and force the sheet
//! to print on a single page. All of it is additive worksheet markup, so
//! the pass runs only when the variant actually asked for layout work.

use docstamp_core::{PageLayout, MAX_COLS};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::error::{StampError, StampResult};
use crate::package::PackageTree;

const SHEET1_PART: &str = "xl/worksheets/sheet1.xml";

/// Apply the variant's page layout to the isolated sheet. No-op layouts
/// leave the part untouched.
pub fn apply_layout(tree: &PackageTree, layout: &PageLayout) -> StampResult<()> {
    if layout.is_noop() {
        return Ok(());
    }
    let xml = tree.read_part(SHEET1_PART)?;
    let rewritten = apply_to_sheet(&xml, layout)?;
    tree.write_part(SHEET1_PART, &rewritten)
}

/// 1-based inclusive column spans to hide
fn hidden_spans(layout: &PageLayout) -> Vec<(u16, u16)> {
    let mut spans = Vec::new();
    if let Some(range) = &layout.hidden_cols {
        spans.push((range.start.col + 1, range.end.col + 1));
    }
    if let Some(area) = &layout.print_area {
        // Everything right of the printable area
        let first_hidden = area.end.col + 2;
        if first_hidden <= MAX_COLS {
            spans.push((first_hidden, MAX_COLS));
        }
    }
    spans
}

fn cols_block(spans: &[(u16, u16)]) -> String {
    let mut block = String::from("<cols>");
    for (min, max) in spans {
        block.push_str(&format!(r#"<col min="{}" max="{}" hidden="1"/>"#, min, max));
    }
    block.push_str("</cols>");
    block
}

fn apply_to_sheet(sheet_xml: &str, layout: &PageLayout) -> StampResult<String> {
    let spans = hidden_spans(layout);

    let mut reader = Reader::from_str(sheet_xml);
    let mut writer = Writer::new(Vec::new());
    let mut wrote_cols = spans.is_empty();
    let mut wrote_page_setup = !layout.fit_to_page;
    let mut in_existing_cols = false;

    loop {
        match reader.read_event() {
            // Fold hide spans into an existing <cols> block
            Ok(Event::Start(e)) if e.name().as_ref() == b"cols" && !wrote_cols => {
                writer.write_event(Event::Start(e.into_owned()))?;
                in_existing_cols = true;
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"cols" && in_existing_cols => {
                for (min, max) in &spans {
                    let mut col = BytesStart::new("col");
                    col.push_attribute(("min", min.to_string().as_str()));
                    col.push_attribute(("max", max.to_string().as_str()));
                    col.push_attribute(("hidden", "1"));
                    writer.write_event(Event::Empty(col))?;
                }
                wrote_cols = true;
                in_existing_cols = false;
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"sheetData" && !wrote_cols => {
                write_raw(&mut writer, &cols_block(&spans))?;
                wrote_cols = true;
                writer.write_event(Event::Start(e.into_owned()))?;
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"sheetData" && !wrote_cols => {
                write_raw(&mut writer, &cols_block(&spans))?;
                wrote_cols = true;
                writer.write_event(Event::Empty(e.into_owned()))?;
            }
            // fitToPage needs both the pageSetUpPr flag and a pageSetup entry
            Ok(Event::Empty(e)) if e.name().as_ref() == b"pageSetup" && !wrote_page_setup => {
                wrote_page_setup = true;
                writer.write_event(Event::Empty(with_fit_attrs(&e)))?;
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"pageSetup" && !wrote_page_setup => {
                wrote_page_setup = true;
                writer.write_event(Event::Start(with_fit_attrs(&e)))?;
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"worksheet" => {
                if !wrote_page_setup {
                    write_raw(
                        &mut writer,
                        r#"<pageSetup fitToWidth="1" fitToHeight="1"/>"#,
                    )?;
                    wrote_page_setup = true;
                }
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Ok(Event::Eof) => break,
            Ok(ev) => writer.write_event(ev)?,
            Err(e) => return Err(StampError::Xml(e)),
        }
    }

    let body = String::from_utf8(writer.into_inner())
        .map_err(|_| StampError::Parse("rewritten worksheet is not valid UTF-8".into()))?;

    if layout.fit_to_page {
        return Ok(ensure_fit_flag(&body));
    }
    Ok(body)
}

/// Rebuilds a `pageSetup` tag with fitToWidth/fitToHeight forced to 1 and every
/// other attribute carried over.
fn with_fit_attrs(e: &BytesStart<'_>) -> BytesStart<'static> {
    let mut setup = BytesStart::new("pageSetup");
    for attr in e.attributes().flatten() {
        if !matches!(attr.key.as_ref(), b"fitToWidth" | b"fitToHeight") {
            if let Ok(value) = attr.unescape_value() {
                setup.push_attribute((
                    String::from_utf8_lossy(attr.key.as_ref()).to_string().as_str(),
                    value.as_ref(),
                ));
            }
        }
    }
    setup.push_attribute(("fitToWidth", "1"));
    setup.push_attribute(("fitToHeight", "1"));
    setup
}

fn write_raw<W: std::io::Write>(writer: &mut Writer<W>, xml: &str) -> StampResult<()> {
    let mut inner = Reader::from_str(xml);
    loop {
        match inner.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(ev) => writer.write_event(ev)?,
            Err(e) => return Err(StampError::Xml(e)),
        }
    }
}

/// `<sheetPr><pageSetUpPr fitToPage="1"/></sheetPr>` must come first in the
/// worksheet body or Excel ignores the pageSetup fit attributes.
fn ensure_fit_flag(sheet_xml: &str) -> String {
    if sheet_xml.contains(r#"fitToPage="1""#) {
        return sheet_xml.to_string();
    }

    let flag = r#"<pageSetUpPr fitToPage="1"/>"#;

    // An existing <sheetPr> gets the flag folded in
    if let Some(pr_start) = sheet_xml.find("<sheetPr") {
        if let Some(rel_close) = sheet_xml[pr_start..].find('>') {
            let close = pr_start + rel_close;
            if sheet_xml.as_bytes()[close - 1] == b'/' {
                // self-closing: reopen it around the flag
                let mut out = String::with_capacity(sheet_xml.len() + flag.len() + 10);
                out.push_str(&sheet_xml[..close - 1]);
                out.push('>');
                out.push_str(flag);
                out.push_str("</sheetPr>");
                out.push_str(&sheet_xml[close + 1..]);
                return out;
            }
            let mut out = String::with_capacity(sheet_xml.len() + flag.len());
            out.push_str(&sheet_xml[..close + 1]);
            out.push_str(flag);
            out.push_str(&sheet_xml[close + 1..]);
            return out;
        }
    }

    // Otherwise a fresh <sheetPr> goes right after the worksheet open tag
    if let Some(ws_start) = sheet_xml.find("<worksheet") {
        if let Some(rel_close) = sheet_xml[ws_start..].find('>') {
            let pos = ws_start + rel_close + 1;
            let mut out = String::with_capacity(sheet_xml.len() + flag.len() + 20);
            out.push_str(&sheet_xml[..pos]);
            out.push_str("<sheetPr>");
            out.push_str(flag);
            out.push_str("</sheetPr>");
            out.push_str(&sheet_xml[pos..]);
            return out;
        }
    }
    sheet_xml.to_string()
}
