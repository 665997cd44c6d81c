//! Export orchestration: collaborators, error taxonomy, and the one-shot
//! export flow.
//!
//! The engine's outer contract is deliberately narrow: look the order up,
//! fetch the template, verify the worksheet exists, populate, serialize.
//! Exactly one of {document, order-not-found, template-unavailable,
//! processing-failure} comes back per invocation, and the two "not found"
//! outcomes are detected before any mutation begins.

use std::io;
use std::path::{Path, PathBuf};

use seqform_model::OrderRecord;
use seqform_xlsx::{TemplatePackage, XlsxError};
use thiserror::Error;

use crate::layout::WORKSHEET_NAME;
use crate::populate::populate_analysis_request;

/// Template the export always populates.
pub const TEMPLATE_NAME: &str = "rnaseq_analysis_request.xlsx";

/// Prefix of the suggested download filename.
pub const EXPORT_FILENAME_PREFIX: &str = "Analysis_Request";

/// MIME type of an Office Open XML spreadsheet.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Read-only lookup of order records by identifier.
pub trait OrderStore {
    /// `Ok(None)` means the identifier names no order.
    fn load(&self, order_id: &str) -> Result<Option<OrderRecord>, OrderStoreError>;
}

/// Source of template workbook bytes by template name.
pub trait TemplateSource {
    /// `Ok(None)` means the template does not exist.
    fn fetch(&self, template_name: &str) -> Result<Option<Vec<u8>>, io::Error>;
}

#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid order record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why an export produced no document.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: String },
    #[error("analysis-request template unavailable: {0}")]
    TemplateUnavailable(String),
    #[error("analysis-request export failed: {0}")]
    Processing(String),
}

impl From<OrderStoreError> for ExportError {
    fn from(err: OrderStoreError) -> Self {
        Self::Processing(err.to_string())
    }
}

impl From<XlsxError> for ExportError {
    fn from(err: XlsxError) -> Self {
        Self::Processing(err.to_string())
    }
}

/// A populated workbook ready to hand to the document sink.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    /// Suggested download filename, `Analysis_Request_<orderId>.xlsx`.
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Run one export: order lookup, template fetch, populate, serialize.
pub fn export_analysis_request(
    store: &dyn OrderStore,
    templates: &dyn TemplateSource,
    order_id: &str,
) -> Result<ExportedDocument, ExportError> {
    let order = store
        .load(order_id)?
        .ok_or_else(|| ExportError::OrderNotFound {
            order_id: order_id.to_string(),
        })?;

    let template_bytes = templates
        .fetch(TEMPLATE_NAME)
        .map_err(|err| ExportError::Processing(err.to_string()))?
        .ok_or_else(|| {
            ExportError::TemplateUnavailable(format!("template {TEMPLATE_NAME} not found"))
        })?;

    let mut pkg = TemplatePackage::from_bytes(&template_bytes)?;
    if !pkg.sheet_names()?.iter().any(|name| name == WORKSHEET_NAME) {
        return Err(ExportError::TemplateUnavailable(format!(
            "worksheet {WORKSHEET_NAME:?} missing from template"
        )));
    }

    populate_analysis_request(&mut pkg, &order)?;
    let bytes = pkg.write_to_bytes()?;

    Ok(ExportedDocument {
        filename: format!("{EXPORT_FILENAME_PREFIX}_{order_id}.xlsx"),
        content_type: XLSX_CONTENT_TYPE,
        bytes,
    })
}

/// Order store backed by a directory of `<order_id>.json` files.
#[derive(Debug, Clone)]
pub struct FsOrderStore {
    dir: PathBuf,
}

impl FsOrderStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl OrderStore for FsOrderStore {
    fn load(&self, order_id: &str) -> Result<Option<OrderRecord>, OrderStoreError> {
        // Identifiers name a file directly; anything that would escape the
        // orders directory is treated as absent.
        if order_id.is_empty() || order_id.contains(['/', '\\']) || order_id.contains("..") {
            return Ok(None);
        }

        let path = self.dir.join(format!("{order_id}.json"));
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// Template source backed by a directory of workbook files.
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    dir: PathBuf,
}

impl FsTemplateSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl TemplateSource for FsTemplateSource {
    fn fetch(&self, template_name: &str) -> Result<Option<Vec<u8>>, io::Error> {
        let path = self.dir.join(template_name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}
