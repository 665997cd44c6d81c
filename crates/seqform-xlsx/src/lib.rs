//! Part-preserving XLSX template handling.
//!
//! Template population must keep everything the template authors put into the
//! workbook (styles, merged cells, print setup, drawings) intact while
//! changing only cell values. Instead of re-generating the workbook through a
//! spreadsheet writer, this crate treats the file as an Open Packaging
//! Convention ZIP ([`TemplatePackage`]: part name -> bytes) and rewrites only
//! the affected worksheet XML in a streaming pass:
//!
//! - [`TemplatePackage`]: load the full package into memory, resolve sheet
//!   names to worksheet parts, repack to bytes.
//! - [`sheet_cell_text`]: read the displayed text of selected cells (shared
//!   strings and inline strings resolved).
//! - [`SheetEdits`] + [`apply_sheet_edits`]: apply cell value edits to one
//!   worksheet, copying every untouched row, cell, and sibling element
//!   through unchanged.
//! - [`write_minimal_template`]: a targeted serializer producing a minimal
//!   single-worksheet template, used as an in-memory fixture by tests.

mod edit;
mod minimal;
mod package;
mod read;

pub use edit::{apply_sheet_edits, SheetEdits};
pub use minimal::write_minimal_template;
pub use package::{TemplatePackage, XlsxError};
pub use read::sheet_cell_text;
