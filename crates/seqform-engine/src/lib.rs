//! Population engine for RNA-seq analysis-request workbooks.
//!
//! Given an order record and the fixed form template, the engine maps named
//! order fields and repeating data groups onto specific template cells:
//! scalar contact fields, checkbox-style service markers, the bounded
//! sample-sheet block, differential-expression parameters, the species
//! catalog marker (resolved by fuzzy label matching), custom requirements,
//! and the comparison-groups block.
//!
//! The layout is declarative data ([`layout`]), the projection rules are
//! generic over any block shape ([`mapping`]), and the pipeline itself
//! ([`populate`]) is pure between the label read and the edit application.
//! [`export`] wires the engine to its collaborators (order store, template
//! source) and owns the error taxonomy an invocation can end with.

pub mod catalog;
pub mod export;
pub mod layout;
pub mod mapping;
pub mod populate;

pub use export::{
    export_analysis_request, ExportError, ExportedDocument, FsOrderStore, FsTemplateSource,
    OrderStore, OrderStoreError, TemplateSource, EXPORT_FILENAME_PREFIX, TEMPLATE_NAME,
    XLSX_CONTENT_TYPE,
};
pub use populate::{build_sheet_edits, populate_analysis_request};
