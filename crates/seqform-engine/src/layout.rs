//! Fixed layout of the RNA-seq analysis-request template.
//!
//! The template is an opaque contract: specific cell addresses carry specific
//! semantic meaning. Everything the engine reads or writes is enumerated here
//! as declarative data so the mapping rules stay independently testable and
//! the projection code stays generic over block shape.

use std::ops::RangeInclusive;

use seqform_model::CellRef;

use crate::mapping::{BlockColumn, BlockSpec, RowCap};

/// Worksheet the form lives on.
pub const WORKSHEET_NAME: &str = "RNA-seq";

/// Token written into marker cells (checkbox semantics).
pub const MARKER: &str = "v";

/// Service category whose entries drive the analysis-service markers.
pub const ANALYSIS_SERVICE_CATEGORY: &str = "分析服務 (A)";

/// Sentinel species value selecting the manual-entry row.
pub const SPECIES_OTHER: &str = "其他";

/// Column indices used by the layout tables.
pub mod col {
    pub const A: u32 = 0;
    pub const B: u32 = 1;
    pub const C: u32 = 2;
    pub const D: u32 = 3;
    pub const E: u32 = 4;
    pub const F: u32 = 5;
    pub const G: u32 = 6;
    pub const H: u32 = 7;
    pub const J: u32 = 9;
}

/// Contact-block scalar fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContactField {
    SalesPerson,
    Organization,
    PrincipalInvestigator,
    ContactPerson,
    ContactPhone,
    Email,
}

/// Field Map for the contact block: field -> target cell.
pub const CONTACT_FIELDS: &[(ContactField, CellRef)] = &[
    (ContactField::SalesPerson, CellRef::at_row(5, col::D)),
    (ContactField::Organization, CellRef::at_row(7, col::B)),
    (
        ContactField::PrincipalInvestigator,
        CellRef::at_row(7, col::D),
    ),
    (ContactField::ContactPerson, CellRef::at_row(7, col::F)),
    (ContactField::ContactPhone, CellRef::at_row(7, col::H)),
    (ContactField::Email, CellRef::at_row(7, col::J)),
];

/// One analysis-service marker: service codes starting with `prefix` tick the
/// checkbox at `cell`.
#[derive(Copy, Clone, Debug)]
pub struct ServiceMarker {
    pub prefix: &'static str,
    pub cell: CellRef,
}

pub const SERVICE_MARKERS: &[ServiceMarker] = &[
    ServiceMarker {
        prefix: "A204",
        cell: CellRef::at_row(11, col::A),
    },
    ServiceMarker {
        prefix: "A205",
        cell: CellRef::at_row(12, col::A),
    },
    ServiceMarker {
        prefix: "A206",
        cell: CellRef::at_row(13, col::A),
    },
    ServiceMarker {
        prefix: "A207",
        cell: CellRef::at_row(14, col::A),
    },
];

/// Sample-sheet columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleField {
    SampleName,
    Group1,
    Group2,
    Group3,
    Source,
}

/// Sample-sheet block: rows 17..116, at most 100 source rows.
pub const SAMPLE_SHEET: BlockSpec<SampleField> = BlockSpec {
    start_row: 17,
    row_cap: RowCap::Limit(100),
    columns: &[
        BlockColumn {
            field: SampleField::SampleName,
            col: col::B,
        },
        BlockColumn {
            field: SampleField::Group1,
            col: col::C,
        },
        BlockColumn {
            field: SampleField::Group2,
            col: col::D,
        },
        BlockColumn {
            field: SampleField::Group3,
            col: col::E,
        },
        BlockColumn {
            field: SampleField::Source,
            col: col::F,
        },
    ],
};

/// Comparison-group columns: three control/treatment pairs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComparisonField {
    Group1Control,
    Group1Treatment,
    Group2Control,
    Group2Treatment,
    Group3Control,
    Group3Treatment,
}

/// Comparison-groups block: rows 135+, deliberately uncapped.
///
/// The form reserves no fixed region for comparison groups; rows past the
/// printed area land below it. Surfacing the cap as an explicit
/// [`RowCap::Unbounded`] keeps that inherited behavior visible instead of
/// burying it in a loop bound.
pub const COMPARISON_GROUPS: BlockSpec<ComparisonField> = BlockSpec {
    start_row: 135,
    row_cap: RowCap::Unbounded,
    columns: &[
        BlockColumn {
            field: ComparisonField::Group1Control,
            col: col::B,
        },
        BlockColumn {
            field: ComparisonField::Group1Treatment,
            col: col::C,
        },
        BlockColumn {
            field: ComparisonField::Group2Control,
            col: col::D,
        },
        BlockColumn {
            field: ComparisonField::Group2Treatment,
            col: col::E,
        },
        BlockColumn {
            field: ComparisonField::Group3Control,
            col: col::F,
        },
        BlockColumn {
            field: ComparisonField::Group3Treatment,
            col: col::G,
        },
    ],
};

/// Differential-expression parameter cells.
pub const DE_LOG_FC: CellRef = CellRef::at_row(119, col::F);
pub const DE_P_METHOD: CellRef = CellRef::at_row(120, col::E);
pub const DE_P_CUTOFF: CellRef = CellRef::at_row(120, col::F);

/// Free-text custom requirements.
pub const CUSTOM_REQUIREMENTS: CellRef = CellRef::at_row(11, col::H);

/// Species catalog: labels in column B, markers in column A, rows 119..130.
pub const SPECIES_CATALOG_ROWS: RangeInclusive<u32> = 119..=130;
pub const SPECIES_LABEL_COL: u32 = col::B;
pub const SPECIES_MARKER_COL: u32 = col::A;

/// Manual-entry ("other") species row.
pub const SPECIES_OTHER_MARKER: CellRef = CellRef::at_row(131, col::A);
pub const SPECIES_OTHER_NAME: CellRef = CellRef::at_row(131, col::B);
pub const SPECIES_OTHER_SCIENTIFIC_NAME: CellRef = CellRef::at_row(131, col::C);
pub const SPECIES_OTHER_REFERENCE_GENOME: CellRef = CellRef::at_row(131, col::D);
