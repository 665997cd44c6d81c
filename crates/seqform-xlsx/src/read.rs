//! Read-side access to worksheet cell text.
//!
//! The population engine needs to *read* a handful of template cells (the
//! species catalog labels) before deciding what to write. Cell text can be
//! stored three ways in SpreadsheetML: shared strings (`t="s"`, `<v>` holds an
//! index into `xl/sharedStrings.xml`), inline strings (`t="inlineStr"`,
//! `<is><t>`), or a literal `<v>` (`t="str"`, numbers, booleans). All three
//! resolve to the same displayed text here.

use std::collections::{BTreeMap, BTreeSet};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use seqform_model::CellRef;

use crate::package::{TemplatePackage, XlsxError};

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Collect the displayed text of `cells` on the named sheet.
///
/// Cells that are absent from the sheet or hold no text are omitted from the
/// result rather than reported as empty strings.
pub fn sheet_cell_text(
    pkg: &TemplatePackage,
    sheet_name: &str,
    cells: &[CellRef],
) -> Result<BTreeMap<CellRef, String>, XlsxError> {
    let part_name = pkg.worksheet_part(sheet_name)?;
    let xml = pkg.required_part(&part_name)?;

    let shared = match pkg.part(SHARED_STRINGS_PART) {
        Some(bytes) => parse_shared_strings(bytes)?,
        None => Vec::new(),
    };

    let wanted: BTreeSet<CellRef> = cells.iter().copied().collect();
    let mut out = BTreeMap::new();

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let Some((cell, ty)) = parse_cell_open(&e)? else {
                    continue;
                };
                if !wanted.contains(&cell) {
                    // Not a requested cell; its children fall through the
                    // catch-all arm below.
                    continue;
                }
                if let Some(text) = read_cell_text(&mut reader, ty.as_deref(), &shared)? {
                    if !text.is_empty() {
                        out.insert(cell, text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// Parse the `r` and `t` attributes of a cell open tag.
///
/// Cells without a parseable address are skipped, not errored: the reader is
/// tolerant of producer quirks it does not need to understand.
fn parse_cell_open(e: &BytesStart<'_>) -> Result<Option<(CellRef, Option<String>)>, XlsxError> {
    let mut cell: Option<CellRef> = None;
    let mut ty: Option<String> = None;

    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"r" => cell = CellRef::from_a1(&attr.unescape_value()?).ok(),
            b"t" => ty = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }

    Ok(cell.map(|cell| (cell, ty)))
}

/// Consume the contents of an open `<c>` element and resolve its text.
fn read_cell_text(
    reader: &mut Reader<&[u8]>,
    ty: Option<&str>,
    shared: &[String],
) -> Result<Option<String>, XlsxError> {
    let mut buf = Vec::new();
    let mut raw = String::new();
    let mut inline = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"v" => {
                raw = read_text(reader, b"v")?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                inline.push_str(&read_text(reader, b"t")?);
            }
            Event::Start(e) if matches!(e.local_name().as_ref(), b"is" | b"r") => {
                // Inline string container / rich-text run: descend, their
                // visible text lives in nested `<t>` elements.
            }
            Event::Start(e) => {
                // Formulas, phonetic runs, extension lists: not displayed text.
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected eof inside worksheet cell".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    match ty {
        Some("s") => {
            let idx: usize = raw
                .trim()
                .parse()
                .map_err(|_| XlsxError::Invalid(format!("bad shared string index: {raw:?}")))?;
            Ok(shared.get(idx).cloned())
        }
        Some("inlineStr") => Ok(Some(inline)),
        _ => Ok((!raw.is_empty()).then_some(raw)),
    }
}

/// Parse `xl/sharedStrings.xml` into plain display strings.
///
/// Rich-text runs are flattened to their concatenated text; phonetic guide
/// runs (`<rPh>`) are not part of the displayed string and are skipped.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, XlsxError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut items = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                items.push(parse_shared_string_item(&mut reader)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                items.push(String::new());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

fn parse_shared_string_item(reader: &mut Reader<&[u8]>) -> Result<String, XlsxError> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text(reader, b"t")?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"r" => {
                // Rich-text run; its `<t>` children are visible text.
            }
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => break,
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected eof inside shared string item".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, XlsxError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => {
                text.push_str(
                    std::str::from_utf8(e.as_ref())
                        .map_err(|e| XlsxError::Invalid(format!("invalid cdata: {e}")))?,
                );
            }
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected eof inside text element".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}
