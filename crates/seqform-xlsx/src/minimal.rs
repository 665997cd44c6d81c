//! Minimal template serializer.
//!
//! This is a targeted writer used by integration tests that need a real,
//! loadable template workbook in memory: a single worksheet with the given
//! cells and default styling. It is not a general-purpose XLSX writer.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use seqform_model::{CellRef, CellValue};
use zip::write::FileOptions;

use crate::edit::{escape_text, needs_space_preserve};
use crate::package::XlsxError;

/// Write a minimal single-worksheet template workbook.
pub fn write_minimal_template(
    sheet_name: &str,
    cells: &[(CellRef, CellValue)],
) -> Result<Vec<u8>, XlsxError> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS_XML.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml(sheet_name).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(WORKBOOK_RELS_XML.as_bytes())?;

        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(STYLES_XML.as_bytes())?;

        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(worksheet_xml(cells).as_bytes())?;

        zip.finish()?;
    }
    Ok(buffer.into_inner())
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>
"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>
"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>
"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
  <fills count="1"><fill><patternFill patternType="none"/></fill></fills>
  <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
  <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>
"#;

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="{}" sheetId="1" r:id="rId1"/>
  </sheets>
</workbook>
"#,
        escape_attr(sheet_name)
    )
}

fn worksheet_xml(cells: &[(CellRef, CellValue)]) -> String {
    let mut by_row: BTreeMap<u32, Vec<(u32, &CellValue)>> = BTreeMap::new();
    for (cell, value) in cells {
        by_row.entry(cell.row_number()).or_default().push((cell.col, value));
    }
    for row in by_row.values_mut() {
        row.sort_by_key(|(col, _)| *col);
    }

    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
    out.push('\n');
    out.push_str("  <sheetData>\n");

    for (row_num, row_cells) in by_row {
        out.push_str(&format!(r#"    <row r="{row_num}">"#));
        for (col, value) in row_cells {
            let a1 = CellRef::at_row(row_num, col).to_a1();
            match value {
                CellValue::Number(n) => {
                    out.push_str(&format!(r#"<c r="{a1}"><v>{n}</v></c>"#));
                }
                CellValue::Text(t) => {
                    let preserve = if needs_space_preserve(t) {
                        r#" xml:space="preserve""#
                    } else {
                        ""
                    };
                    out.push_str(&format!(
                        r#"<c r="{a1}" t="inlineStr"><is><t{preserve}>{}</t></is></c>"#,
                        escape_text(t)
                    ));
                }
            }
        }
        out.push_str("</row>\n");
    }

    out.push_str("  </sheetData>\n");
    out.push_str("</worksheet>\n");
    out
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
