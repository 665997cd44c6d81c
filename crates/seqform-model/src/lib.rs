//! Core data model for seqform.
//!
//! This crate holds the value types shared by the template-population engine
//! and the XLSX layer:
//!
//! - [`CellRef`]: 0-indexed worksheet coordinates with A1 conversion.
//! - [`CellValue`]: the value shapes the engine writes into template cells.
//! - [`OrderRecord`]: the decoded order document an export request starts from.
//!
//! Everything here is plain data; no I/O happens in this crate.

pub mod address;
pub mod order;
pub mod value;

pub use address::{column_index, column_name, A1ParseError, CellRef};
pub use order::{
    provided, AnalysisRequirements, ComparisonGroup, DeParams, OrderRecord, SampleRow,
    ServiceItem, ServiceSelection,
};
pub use value::CellValue;
