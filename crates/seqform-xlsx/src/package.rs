use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("missing xlsx part: {0}")]
    MissingPart(String),
    #[error("missing worksheet: {0}")]
    MissingSheet(String),
    #[error("invalid xlsx: {0}")]
    Invalid(String),
}

/// An XLSX template held in memory as its full set of package parts.
///
/// Loading inflates every ZIP entry into the part map; writing repacks the
/// map. Parts that are never touched between the two round-trip
/// byte-for-byte, which is what keeps the template's formatting contract
/// intact.
///
/// A package is request-scoped: loaded fresh for one population run, mutated
/// exclusively, serialized, and dropped.
#[derive(Debug, Clone)]
pub struct TemplatePackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl TemplatePackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XlsxError> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

        let mut parts = BTreeMap::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if !file.is_file() {
                continue;
            }
            let name = file.name().to_string();
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            parts.insert(name, buf);
        }

        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.parts.insert(name.into(), bytes);
    }

    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub(crate) fn required_part(&self, name: &str) -> Result<&[u8], XlsxError> {
        self.part(name)
            .ok_or_else(|| XlsxError::MissingPart(name.to_string()))
    }

    /// Repack every part into a ZIP container.
    pub fn write_to_bytes(&self) -> Result<Vec<u8>, XlsxError> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::FileOptions::<()>::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for (name, bytes) in &self.parts {
                zip.start_file(name, options)?;
                zip.write_all(bytes)?;
            }
            zip.finish()?;
        }
        Ok(cursor.into_inner())
    }

    /// Workbook sheet (tab) names in workbook order.
    pub fn sheet_names(&self) -> Result<Vec<String>, XlsxError> {
        let sheets = parse_workbook_sheets(self.required_part(WORKBOOK_PART)?)?;
        Ok(sheets.into_iter().map(|s| s.name).collect())
    }

    /// Resolve a sheet name to its worksheet part (e.g. `xl/worksheets/sheet1.xml`).
    pub fn worksheet_part(&self, sheet_name: &str) -> Result<String, XlsxError> {
        let sheets = parse_workbook_sheets(self.required_part(WORKBOOK_PART)?)?;
        let sheet = sheets
            .into_iter()
            .find(|s| s.name == sheet_name)
            .ok_or_else(|| XlsxError::MissingSheet(sheet_name.to_string()))?;

        let rels = parse_relationships(self.required_part(WORKBOOK_RELS_PART)?)?;
        let rel = rels.into_iter().find(|r| r.id == sheet.rel_id).ok_or_else(|| {
            XlsxError::Invalid(format!(
                "workbook relationship {} for sheet {sheet_name} not found",
                sheet.rel_id
            ))
        })?;

        Ok(resolve_workbook_target(&rel.target))
    }
}

/// Strip any namespace prefix from an XML name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WorkbookSheet {
    name: String,
    rel_id: String,
}

fn parse_workbook_sheets(workbook_xml: &[u8]) -> Result<Vec<WorkbookSheet>, XlsxError> {
    let mut reader = Reader::from_reader(workbook_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                sheets.push(parse_sheet_element(&e)?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_sheet_element(e: &BytesStart<'_>) -> Result<WorkbookSheet, XlsxError> {
    let mut name: Option<String> = None;
    let mut rel_id: Option<String> = None;

    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"name" {
            name = Some(attr.unescape_value()?.into_owned());
        } else if local_name(key) == b"id" {
            rel_id = Some(attr.unescape_value()?.into_owned());
        }
    }

    match (name, rel_id) {
        (Some(name), Some(rel_id)) => Ok(WorkbookSheet { name, rel_id }),
        _ => Err(XlsxError::Invalid(
            "workbook sheet entry missing name or r:id".to_string(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    id: String,
    target: String,
}

fn parse_relationships(rels_xml: &[u8]) -> Result<Vec<Relationship>, XlsxError> {
    let mut reader = Reader::from_reader(rels_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id: Option<String> = None;
                let mut target: Option<String> = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    rels.push(Relationship { id, target });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Resolve a workbook relationship target to a package part name.
///
/// Targets are relative to `xl/` unless rooted at the package (`/xl/...`).
fn resolve_workbook_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_workbook_sheets() {
        let xml = r#"<?xml version="1.0"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="RNA-seq" sheetId="1" r:id="rId1"/>
    <sheet name="說明" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;
        let sheets = parse_workbook_sheets(xml.as_bytes()).unwrap();
        assert_eq!(
            sheets,
            vec![
                WorkbookSheet {
                    name: "RNA-seq".to_string(),
                    rel_id: "rId1".to_string()
                },
                WorkbookSheet {
                    name: "說明".to_string(),
                    rel_id: "rId2".to_string()
                },
            ]
        );
    }

    #[test]
    fn resolves_relationship_targets() {
        assert_eq!(
            resolve_workbook_target("worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_workbook_target("/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
    }

    #[test]
    fn missing_sheet_is_reported_by_name() {
        let bytes = crate::write_minimal_template("RNA-seq", &[]).unwrap();
        let pkg = TemplatePackage::from_bytes(&bytes).unwrap();
        assert_eq!(pkg.sheet_names().unwrap(), vec!["RNA-seq".to_string()]);
        match pkg.worksheet_part("DNA-seq") {
            Err(XlsxError::MissingSheet(name)) => assert_eq!(name, "DNA-seq"),
            other => panic!("expected MissingSheet, got {other:?}"),
        }
    }
}
