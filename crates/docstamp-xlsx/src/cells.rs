//! Cell-level worksheet rewriting
//!
//! One event-stream engine serves both the explicit value setter and the
//! formula excision pass: worksheet XML goes through a quick-xml
//! reader/writer pair, `<c>` nodes the caller wants changed are re-emitted
//! as static literals, and everything else (row attributes, dimensions,
//! merge cells, style references) passes through byte-for-byte.
//!
//! The rewrite contract that keeps consuming applications happy:
//! - a rewritten cell keeps its address and its `s=` style reference;
//! - numeric and date-serial literals carry no `t` attribute at all, so a
//!   stale `t="s"` can never make a number get read as a string-table index;
//! - text literals are inline strings, never shared-table references;
//! - a `<c>` whose attributes cannot be interpreted is left untouched.

use docstamp_core::{format_number, CellAddress, CellLiteral};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::error::{StampError, StampResult};

/// What the rewrite engine learned about one `<c>` node
#[derive(Debug, Clone)]
pub struct RawCell {
    /// Parsed address
    pub reference: CellAddress,
    /// Address exactly as written in the file
    pub raw_ref: String,
    /// `s=` style index, kept verbatim
    pub style: Option<String>,
    /// `t=` type attribute, if any
    pub cell_type: Option<String>,
    /// Whether the cell carries an `<f>` element (including self-closing
    /// array-formula stubs with no cached value)
    pub has_formula: bool,
    /// Formula text, empty for self-closing `<f/>`
    pub formula: String,
}

/// Per-cell decision returned by a rewrite callback
#[derive(Debug, Clone)]
pub enum CellEdit {
    /// Emit the original node unchanged
    Keep,
    /// Replace the node with a static literal at the same address
    Literal(CellLiteral),
}

/// Stream a worksheet through `edit`, rewriting chosen cells to literals.
///
/// The callback sees every `<c>` node whose `r=` attribute parses; nodes it
/// answers [`CellEdit::Keep`] for are re-emitted from the buffered original
/// events, so unrelated markup is never reshaped.
pub fn rewrite_cells<F>(sheet_xml: &str, mut edit: F) -> StampResult<String>
where
    F: FnMut(&RawCell) -> CellEdit,
{
    let mut reader = Reader::from_str(sheet_xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"c" => {
                let start = e.into_owned();
                let mut cell = parse_cell_attrs(&start);
                let mut buffered: Vec<Event<'static>> = vec![Event::Start(start)];
                let mut in_formula = false;

                loop {
                    match reader.read_event() {
                        Ok(Event::Eof) => {
                            return Err(StampError::Parse("unterminated <c> element".into()))
                        }
                        Ok(ev) => {
                            let ev = ev.into_owned();
                            match &ev {
                                Event::Start(s) if s.name().as_ref() == b"f" => {
                                    if let Some(c) = cell.as_mut() {
                                        c.has_formula = true;
                                    }
                                    in_formula = true;
                                }
                                Event::Empty(s) if s.name().as_ref() == b"f" => {
                                    if let Some(c) = cell.as_mut() {
                                        c.has_formula = true;
                                    }
                                }
                                Event::End(s) if s.name().as_ref() == b"f" => {
                                    in_formula = false;
                                }
                                Event::Text(t) if in_formula => {
                                    if let (Some(c), Ok(text)) = (cell.as_mut(), t.unescape()) {
                                        c.formula.push_str(&text);
                                    }
                                }
                                _ => {}
                            }
                            let closes_cell =
                                matches!(&ev, Event::End(s) if s.name().as_ref() == b"c");
                            buffered.push(ev);
                            if closes_cell {
                                break;
                            }
                        }
                        Err(e) => return Err(StampError::Xml(e)),
                    }
                }

                let decision = match &cell {
                    Some(c) => edit(c),
                    None => CellEdit::Keep,
                };
                match (decision, cell) {
                    (CellEdit::Literal(lit), Some(c)) => {
                        write_literal_cell(&mut writer, &c.raw_ref, c.style.as_deref(), &lit)?;
                    }
                    _ => {
                        for ev in buffered {
                            writer.write_event(ev)?;
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                let start = e.into_owned();
                let cell = parse_cell_attrs(&start);
                let decision = match &cell {
                    Some(c) => edit(c),
                    None => CellEdit::Keep,
                };
                match (decision, cell) {
                    (CellEdit::Literal(lit), Some(c)) => {
                        write_literal_cell(&mut writer, &c.raw_ref, c.style.as_deref(), &lit)?;
                    }
                    _ => {
                        writer.write_event(Event::Empty(start))?;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(ev) => {
                writer.write_event(ev)?;
            }
            Err(e) => return Err(StampError::Xml(e)),
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|_| StampError::Parse("rewritten worksheet is not valid UTF-8".into()))
}

fn parse_cell_attrs(start: &BytesStart<'_>) -> Option<RawCell> {
    let mut raw_ref = None;
    let mut style = None;
    let mut cell_type = None;

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => raw_ref = attr.unescape_value().ok().map(|s| s.to_string()),
            b"s" => style = attr.unescape_value().ok().map(|s| s.to_string()),
            b"t" => cell_type = attr.unescape_value().ok().map(|s| s.to_string()),
            _ => {}
        }
    }

    let raw_ref = raw_ref?;
    let reference = CellAddress::parse(&raw_ref).ok()?;

    Some(RawCell {
        reference,
        raw_ref,
        style,
        cell_type,
        has_formula: false,
        formula: String::new(),
    })
}

/// Emit one static-literal `<c>` node
fn write_literal_cell<W: std::io::Write>(
    writer: &mut Writer<W>,
    reference: &str,
    style: Option<&str>,
    literal: &CellLiteral,
) -> StampResult<()> {
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", reference));
    if let Some(s) = style {
        start.push_attribute(("s", s));
    }

    match literal {
        CellLiteral::Number(n) => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(&format_number(*n))))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        CellLiteral::Serial(serial) => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(&serial.to_string())))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        CellLiteral::Text(text) => {
            start.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(BytesStart::new("t")))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
    }

    Ok(())
}

/// Write an explicit (address, literal) pair into worksheet XML.
///
/// Replaces the existing node at `addr` when there is one, otherwise inserts
/// the cell into the right row (creating the row if needed), keeping rows
/// and cells in document order. Idempotent: the latest write always wins and
/// a cell node is never duplicated. If the sheet has no recognizable
/// `<sheetData>`, the input is returned unchanged.
pub fn set_cell_value(
    sheet_xml: &str,
    addr: CellAddress,
    literal: &CellLiteral,
) -> StampResult<String> {
    let mut replaced = false;
    let rewritten = rewrite_cells(sheet_xml, |cell| {
        if cell.reference.row == addr.row && cell.reference.col == addr.col {
            replaced = true;
            CellEdit::Literal(literal.clone())
        } else {
            CellEdit::Keep
        }
    })?;

    if replaced {
        return Ok(rewritten);
    }
    insert_cell(&rewritten, addr, literal)
}

fn insert_cell(sheet_xml: &str, addr: CellAddress, literal: &CellLiteral) -> StampResult<String> {
    let target_row = addr.row + 1; // 1-based in the file
    let reference = CellAddress::new(addr.row, addr.col).to_a1_string();

    let mut reader = Reader::from_str(sheet_xml);
    let mut writer = Writer::new(Vec::new());
    let mut inserted = false;
    let mut in_target_row = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"row" && !inserted => {
                let owned = e.into_owned();
                match row_number(&owned) {
                    Some(r) if r == target_row => {
                        in_target_row = true;
                        writer.write_event(Event::Start(owned))?;
                    }
                    Some(r) if r > target_row => {
                        write_new_row(&mut writer, target_row, &reference, literal)?;
                        inserted = true;
                        writer.write_event(Event::Start(owned))?;
                    }
                    _ => writer.write_event(Event::Start(owned))?,
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"row" && !inserted => {
                let owned = e.into_owned();
                match row_number(&owned) {
                    Some(r) if r == target_row => {
                        // Reopen the self-closed row to hold the new cell
                        writer.write_event(Event::Start(owned))?;
                        write_literal_cell(&mut writer, &reference, None, literal)?;
                        writer.write_event(Event::End(BytesEnd::new("row")))?;
                        inserted = true;
                    }
                    Some(r) if r > target_row => {
                        write_new_row(&mut writer, target_row, &reference, literal)?;
                        inserted = true;
                        writer.write_event(Event::Empty(owned))?;
                    }
                    _ => writer.write_event(Event::Empty(owned))?,
                }
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"c" && in_target_row && !inserted => {
                let owned = e.into_owned();
                if let Some(col) = cell_column(&owned) {
                    if col > addr.col {
                        write_literal_cell(&mut writer, &reference, None, literal)?;
                        inserted = true;
                    }
                }
                writer.write_event(Event::Start(owned))?;
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"c" && in_target_row && !inserted => {
                let owned = e.into_owned();
                if let Some(col) = cell_column(&owned) {
                    if col > addr.col {
                        write_literal_cell(&mut writer, &reference, None, literal)?;
                        inserted = true;
                    }
                }
                writer.write_event(Event::Empty(owned))?;
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"row" && in_target_row => {
                if !inserted {
                    write_literal_cell(&mut writer, &reference, None, literal)?;
                    inserted = true;
                }
                in_target_row = false;
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"sheetData" && !inserted => {
                write_new_row(&mut writer, target_row, &reference, literal)?;
                inserted = true;
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"sheetData" && !inserted => {
                let owned = e.into_owned();
                writer.write_event(Event::Start(owned))?;
                write_new_row(&mut writer, target_row, &reference, literal)?;
                writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
                inserted = true;
            }
            Ok(Event::Eof) => break,
            Ok(ev) => writer.write_event(ev)?,
            Err(e) => return Err(StampError::Xml(e)),
        }
    }

    if !inserted {
        // No sheetData the rewrite could anchor to; leave the part as-is
        return Ok(sheet_xml.to_string());
    }

    String::from_utf8(writer.into_inner())
        .map_err(|_| StampError::Parse("rewritten worksheet is not valid UTF-8".into()))
}

fn write_new_row<W: std::io::Write>(
    writer: &mut Writer<W>,
    row: u32,
    reference: &str,
    literal: &CellLiteral,
) -> StampResult<()> {
    let mut start = BytesStart::new("row");
    start.push_attribute(("r", row.to_string().as_str()));
    writer.write_event(Event::Start(start))?;
    write_literal_cell(writer, reference, None, literal)?;
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn row_number(start: &BytesStart<'_>) -> Option<u32> {
    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == b"r" {
            return attr.unescape_value().ok().and_then(|s| s.parse().ok());
        }
    }
    None
}

fn cell_column(start: &BytesStart<'_>) -> Option<u16> {
    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == b"r" {
            return attr
                .unescape_value()
                .ok()
                .and_then(|s| CellAddress::parse(&s).ok())
                .map(|a| a.col);
        }
    }
    None
}

/// Count formula-bearing cells in a worksheet without changing it
pub fn count_formula_cells(sheet_xml: &str) -> StampResult<usize> {
    let mut count = 0;
    rewrite_cells(sheet_xml, |cell| {
        if cell.has_formula {
            count += 1;
        }
        CellEdit::Keep
    })?;
    Ok(count)
}
