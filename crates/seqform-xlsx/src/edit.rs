//! Part-preserving cell edits.
//!
//! [`apply_sheet_edits`] rewrites a single worksheet part in a streaming
//! pass: every event of the original XML is copied through unchanged except
//! the cells named by the edit set, which are replaced in place. Rows and
//! cells the template never materialized are inserted in document order
//! (rows ascending, cells left-to-right), so the output stays a valid
//! `sheetData` section regardless of how sparse the template was.

use std::collections::{BTreeMap, VecDeque};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use seqform_model::{CellRef, CellValue};

use crate::package::{local_name, TemplatePackage, XlsxError};

const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// An ordered set of cell edits for a single worksheet.
///
/// Cells are keyed row-major, which makes patch application (and therefore
/// the serialized output) deterministic for a given edit set.
#[derive(Debug, Clone, Default)]
pub struct SheetEdits {
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl SheetEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for one cell.
    pub fn set(&mut self, cell: CellRef, value: CellValue) {
        self.cells.insert((cell.row, cell.col), value);
    }

    pub fn get(&self, cell: CellRef) -> Option<&CellValue> {
        self.cells.get(&(cell.row, cell.col))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &CellValue)> {
        self.cells
            .iter()
            .map(|(&(row, col), value)| (CellRef::new(row, col), value))
    }

    /// Group edits by 1-based row number. Column order within a row follows
    /// the row-major key order of the backing map.
    fn by_row(&self) -> BTreeMap<u32, Vec<(u32, &CellValue)>> {
        let mut out: BTreeMap<u32, Vec<(u32, &CellValue)>> = BTreeMap::new();
        for (&(row, col), value) in &self.cells {
            out.entry(row + 1).or_default().push((col, value));
        }
        out
    }
}

/// Apply `edits` to the named sheet, leaving every other part untouched.
///
/// If an edit replaces a cell that carried a formula, `xl/calcChain.xml` is
/// dropped from the package; a stale calc chain makes Excel report the
/// workbook as corrupt, and dropping it forces a rebuild on next open.
pub fn apply_sheet_edits(
    pkg: &mut TemplatePackage,
    sheet_name: &str,
    edits: &SheetEdits,
) -> Result<(), XlsxError> {
    if edits.is_empty() {
        return Ok(());
    }

    let part_name = pkg.worksheet_part(sheet_name)?;
    let original = pkg.required_part(&part_name)?;
    let (updated, formula_dropped) = patch_worksheet_xml(original, edits)?;
    pkg.set_part(part_name, updated);

    if formula_dropped {
        pkg.remove_part(CALC_CHAIN_PART);
    }
    Ok(())
}

fn patch_worksheet_xml(original: &[u8], edits: &SheetEdits) -> Result<(Vec<u8>, bool), XlsxError> {
    let row_edits = edits.by_row();
    let mut pending: VecDeque<u32> = row_edits.keys().copied().collect();

    let mut reader = Reader::from_reader(original);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len() + edits.len() * 64));

    let mut buf = Vec::new();
    let mut saw_sheet_data = false;
    let mut formula_dropped = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                saw_sheet_data = true;
                writer.write_event(Event::Start(e.into_owned()))?;
                formula_dropped |=
                    patch_sheet_data(&mut reader, &mut writer, &row_edits, &mut pending)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                // Convert `<sheetData/>` into `<sheetData>...</sheetData>`.
                saw_sheet_data = true;
                writer.write_event(Event::Start(e.into_owned()))?;
                flush_pending_rows(&mut writer, &row_edits, &mut pending, None)?;
                writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
            }
            Event::End(e) if e.local_name().as_ref() == b"worksheet" => {
                if !saw_sheet_data {
                    // Insert a missing <sheetData> just before </worksheet>.
                    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
                    flush_pending_rows(&mut writer, &row_edits, &mut pending, None)?;
                    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
                }
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok((writer.into_inner(), formula_dropped))
}

/// Write brand-new `<row>` elements for every pending edit row below `limit`
/// (all of them when `limit` is `None`).
fn flush_pending_rows(
    writer: &mut Writer<Vec<u8>>,
    row_edits: &BTreeMap<u32, Vec<(u32, &CellValue)>>,
    pending: &mut VecDeque<u32>,
    limit: Option<u32>,
) -> Result<(), XlsxError> {
    while let Some(&row) = pending.front() {
        if limit.is_some_and(|l| row >= l) {
            break;
        }
        pending.pop_front();
        let cells = row_edits.get(&row).map(Vec::as_slice).unwrap_or_default();
        write_new_row(writer, row, cells)?;
    }
    Ok(())
}

fn patch_sheet_data(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    row_edits: &BTreeMap<u32, Vec<(u32, &CellValue)>>,
    pending: &mut VecDeque<u32>,
) -> Result<bool, XlsxError> {
    let mut buf = Vec::new();
    let mut formula_dropped = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                let row_start = e.into_owned();
                let Some(row_num) = parse_row_number(&row_start)? else {
                    writer.write_event(Event::Start(row_start))?;
                    continue;
                };

                flush_pending_rows(writer, row_edits, pending, Some(row_num))?;
                writer.write_event(Event::Start(row_start))?;

                if let Some(cells) = row_edits.get(&row_num) {
                    if pending.front() == Some(&row_num) {
                        pending.pop_front();
                    }
                    // patch_row consumes up to and including </row>.
                    formula_dropped |= patch_row(reader, writer, row_num, cells)?;
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                let row_empty = e.into_owned();
                let Some(row_num) = parse_row_number(&row_empty)? else {
                    writer.write_event(Event::Empty(row_empty))?;
                    continue;
                };

                flush_pending_rows(writer, row_edits, pending, Some(row_num))?;

                if let Some(cells) = row_edits.get(&row_num) {
                    if pending.front() == Some(&row_num) {
                        pending.pop_front();
                    }
                    // Convert `<row/>` into `<row>...</row>`.
                    writer.write_event(Event::Start(row_empty))?;
                    for (col, value) in cells {
                        write_cell(writer, row_num, *col, value, None)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new("row")))?;
                } else {
                    writer.write_event(Event::Empty(row_empty))?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => {
                flush_pending_rows(writer, row_edits, pending, None)?;
                writer.write_event(Event::End(e.into_owned()))?;
                return Ok(formula_dropped);
            }
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected eof inside sheetData".to_string(),
                ))
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }
}

/// Rewrite the contents of one existing `<row>` whose open tag has already
/// been emitted. Edited cells are replaced, everything else is copied, and
/// cells new to the row are inserted in column order.
fn patch_row(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    row_num: u32,
    cells: &[(u32, &CellValue)],
) -> Result<bool, XlsxError> {
    let mut buf = Vec::new();
    let mut next = 0usize;
    let mut formula_dropped = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let cell_start = e.into_owned();
                let Some((cell, style)) = parse_cell_meta(&cell_start)? else {
                    writer.write_event(Event::Start(cell_start))?;
                    continue;
                };
                if cell.row_number() != row_num {
                    // Mismatched cell refs are preserved unchanged.
                    writer.write_event(Event::Start(cell_start))?;
                    continue;
                }

                while next < cells.len() && cells[next].0 < cell.col {
                    write_cell(writer, row_num, cells[next].0, cells[next].1, None)?;
                    next += 1;
                }

                if next < cells.len() && cells[next].0 == cell.col {
                    let value = cells[next].1;
                    next += 1;
                    formula_dropped |= skip_cell_contents(reader)?;
                    write_cell(writer, row_num, cell.col, value, style)?;
                } else {
                    writer.write_event(Event::Start(cell_start))?;
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let cell_empty = e.into_owned();
                let Some((cell, style)) = parse_cell_meta(&cell_empty)? else {
                    writer.write_event(Event::Empty(cell_empty))?;
                    continue;
                };
                if cell.row_number() != row_num {
                    writer.write_event(Event::Empty(cell_empty))?;
                    continue;
                }

                while next < cells.len() && cells[next].0 < cell.col {
                    write_cell(writer, row_num, cells[next].0, cells[next].1, None)?;
                    next += 1;
                }

                if next < cells.len() && cells[next].0 == cell.col {
                    let value = cells[next].1;
                    next += 1;
                    write_cell(writer, row_num, cell.col, value, style)?;
                } else {
                    writer.write_event(Event::Empty(cell_empty))?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"row" => {
                while next < cells.len() {
                    write_cell(writer, row_num, cells[next].0, cells[next].1, None)?;
                    next += 1;
                }
                writer.write_event(Event::End(e.into_owned()))?;
                return Ok(formula_dropped);
            }
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected eof inside worksheet row".to_string(),
                ))
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }
}

/// Consume everything up to the matching `</c>`, reporting whether the cell
/// carried a formula.
fn skip_cell_contents(reader: &mut Reader<&[u8]>) -> Result<bool, XlsxError> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    let mut had_formula = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if depth == 1 && e.local_name().as_ref() == b"f" {
                    had_formula = true;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 1 && e.local_name().as_ref() == b"f" {
                    had_formula = true;
                }
            }
            Event::End(e) => {
                depth -= 1;
                if depth == 0 && e.local_name().as_ref() == b"c" {
                    return Ok(had_formula);
                }
            }
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected eof inside replaced cell".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
}

fn write_new_row(
    writer: &mut Writer<Vec<u8>>,
    row_num: u32,
    cells: &[(u32, &CellValue)],
) -> Result<(), XlsxError> {
    let mut row = BytesStart::new("row");
    row.push_attribute(("r", row_num.to_string().as_str()));
    writer.write_event(Event::Start(row))?;
    for (col, value) in cells {
        write_cell(writer, row_num, *col, value, None)?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

/// Serialize one `<c>` element. The existing style index is kept so the
/// template's formatting survives the value change.
fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    row_num: u32,
    col: u32,
    value: &CellValue,
    style: Option<u32>,
) -> Result<(), XlsxError> {
    let a1 = CellRef::at_row(row_num, col).to_a1();

    let mut cell = String::new();
    cell.push_str("<c r=\"");
    cell.push_str(&a1);
    cell.push('"');
    if let Some(s) = style.filter(|s| *s != 0) {
        cell.push_str(&format!(" s=\"{s}\""));
    }

    match value {
        CellValue::Number(n) => {
            cell.push_str("><v>");
            cell.push_str(&n.to_string());
            cell.push_str("</v></c>");
        }
        CellValue::Text(t) => {
            cell.push_str(" t=\"inlineStr\"><is><t");
            if needs_space_preserve(t) {
                cell.push_str(r#" xml:space="preserve""#);
            }
            cell.push('>');
            cell.push_str(&escape_text(t));
            cell.push_str("</t></is></c>");
        }
    }

    writer.get_mut().extend_from_slice(cell.as_bytes());
    Ok(())
}

fn parse_row_number(row: &BytesStart<'_>) -> Result<Option<u32>, XlsxError> {
    for attr in row.attributes() {
        let attr = attr?;
        if local_name(attr.key.as_ref()) == b"r" {
            let value = attr.unescape_value()?;
            return Ok(value.parse::<u32>().ok());
        }
    }
    Ok(None)
}

/// Parse the address and style index of a cell open tag. Cells without a
/// parseable address yield `None` and are passed through untouched.
fn parse_cell_meta(cell: &BytesStart<'_>) -> Result<Option<(CellRef, Option<u32>)>, XlsxError> {
    let mut addr: Option<CellRef> = None;
    let mut style: Option<u32> = None;

    for attr in cell.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"r" => addr = CellRef::from_a1(&attr.unescape_value()?).ok(),
            b"s" => style = attr.unescape_value()?.parse::<u32>().ok(),
            _ => {}
        }
    }

    Ok(addr.map(|addr| (addr, style)))
}

pub(crate) fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edits(entries: &[(&str, CellValue)]) -> SheetEdits {
        let mut out = SheetEdits::new();
        for (a1, value) in entries {
            out.set(CellRef::from_a1(a1).unwrap(), value.clone());
        }
        out
    }

    fn patch(xml: &str, edits: &SheetEdits) -> (String, bool) {
        let (bytes, formula_dropped) = patch_worksheet_xml(xml.as_bytes(), edits).unwrap();
        (String::from_utf8(bytes).unwrap(), formula_dropped)
    }

    #[test]
    fn replaces_existing_cell_and_keeps_style() {
        let xml = r#"<worksheet><sheetData><row r="7"><c r="A7"><v>1</v></c><c r="B7" s="12" t="inlineStr"><is><t>old</t></is></c></row></sheetData></worksheet>"#;
        let (out, formula_dropped) = patch(xml, &edits(&[("B7", CellValue::text("Acme"))]));
        assert!(!formula_dropped);
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="7"><c r="A7"><v>1</v></c><c r="B7" s="12" t="inlineStr"><is><t>Acme</t></is></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn inserts_missing_cells_in_column_order() {
        let xml = r#"<worksheet><sheetData><row r="17"><c r="D17"><v>9</v></c></row></sheetData></worksheet>"#;
        let (out, _) = patch(
            xml,
            &edits(&[
                ("B17", CellValue::text("S1")),
                ("F17", CellValue::text("liver")),
            ]),
        );
        assert_eq!(
            out,
            concat!(
                r#"<worksheet><sheetData><row r="17">"#,
                r#"<c r="B17" t="inlineStr"><is><t>S1</t></is></c>"#,
                r#"<c r="D17"><v>9</v></c>"#,
                r#"<c r="F17" t="inlineStr"><is><t>liver</t></is></c>"#,
                r#"</row></sheetData></worksheet>"#
            )
        );
    }

    #[test]
    fn inserts_missing_rows_in_row_order() {
        let xml = r#"<worksheet><sheetData><row r="5"><c r="A5"><v>1</v></c></row><row r="120"><c r="A120"><v>2</v></c></row></sheetData></worksheet>"#;
        let (out, _) = patch(
            xml,
            &edits(&[
                ("A17", CellValue::text("mid")),
                ("A135", CellValue::Number(3.0)),
            ]),
        );
        assert_eq!(
            out,
            concat!(
                r#"<worksheet><sheetData>"#,
                r#"<row r="5"><c r="A5"><v>1</v></c></row>"#,
                r#"<row r="17"><c r="A17" t="inlineStr"><is><t>mid</t></is></c></row>"#,
                r#"<row r="120"><c r="A120"><v>2</v></c></row>"#,
                r#"<row r="135"><c r="A135"><v>3</v></c></row>"#,
                r#"</sheetData></worksheet>"#
            )
        );
    }

    #[test]
    fn expands_empty_sheet_data() {
        let xml = r#"<worksheet><sheetData/></worksheet>"#;
        let (out, _) = patch(xml, &edits(&[("B7", CellValue::text("Acme"))]));
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="7"><c r="B7" t="inlineStr"><is><t>Acme</t></is></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn expands_empty_row_element() {
        let xml = r#"<worksheet><sheetData><row r="7" ht="20"/></sheetData></worksheet>"#;
        let (out, _) = patch(xml, &edits(&[("B7", CellValue::text("Acme"))]));
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="7" ht="20"><c r="B7" t="inlineStr"><is><t>Acme</t></is></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn escapes_text_and_preserves_edge_whitespace() {
        let xml = r#"<worksheet><sheetData/></worksheet>"#;
        let (out, _) = patch(xml, &edits(&[("A1", CellValue::text(" a<b&c "))]));
        assert!(out.contains(r#"<t xml:space="preserve"> a&lt;b&amp;c </t>"#));
    }

    #[test]
    fn number_writes_use_plain_v() {
        let xml = r#"<worksheet><sheetData/></worksheet>"#;
        let (out, _) = patch(xml, &edits(&[("F119", CellValue::Number(1.5))]));
        assert!(out.contains(r#"<c r="F119"><v>1.5</v></c>"#));
    }

    #[test]
    fn reports_replaced_formula() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1"><f>SUM(B1:B2)</f><v>3</v></c></row></sheetData></worksheet>"#;
        let (out, formula_dropped) = patch(xml, &edits(&[("A1", CellValue::Number(7.0))]));
        assert!(formula_dropped);
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="1"><c r="A1"><v>7</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn untouched_rows_pass_through_verbatim() {
        let xml = r#"<worksheet><sheetData><row r="119" customHeight="1"><c r="B119" t="s"><v>4</v></c></row></sheetData></worksheet>"#;
        let (out, _) = patch(xml, &edits(&[("A1", CellValue::text("x"))]));
        assert!(out.contains(r#"<row r="119" customHeight="1"><c r="B119" t="s"><v>4</v></c></row>"#));
    }
}
