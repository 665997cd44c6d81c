//! The population pipeline.
//!
//! [`populate_analysis_request`] is the engine's entry point: read the
//! species catalog labels from the template, build the full edit set from the
//! order, apply it to the worksheet. The middle step,
//! [`build_sheet_edits`], is pure (no template access, no I/O) and is where
//! all the mapping behavior lives and where it is tested.

use std::collections::BTreeMap;

use seqform_model::{provided, CellRef, CellValue, OrderRecord};
use seqform_xlsx::{apply_sheet_edits, sheet_cell_text, SheetEdits, TemplatePackage, XlsxError};

use crate::catalog::resolve_catalog_row;
use crate::layout::{
    ContactField, ANALYSIS_SERVICE_CATEGORY, COMPARISON_GROUPS, CONTACT_FIELDS,
    CUSTOM_REQUIREMENTS, DE_LOG_FC, DE_P_CUTOFF, DE_P_METHOD, MARKER, SAMPLE_SHEET,
    SERVICE_MARKERS, SPECIES_CATALOG_ROWS, SPECIES_LABEL_COL, SPECIES_MARKER_COL, SPECIES_OTHER,
    SPECIES_OTHER_MARKER, SPECIES_OTHER_NAME, SPECIES_OTHER_REFERENCE_GENOME,
    SPECIES_OTHER_SCIENTIFIC_NAME, WORKSHEET_NAME,
};
use crate::layout::{ComparisonField, SampleField};

/// Populate the analysis-request worksheet of `pkg` from `order`.
///
/// The package is mutated in place; identical inputs produce identical
/// output bytes on serialization.
pub fn populate_analysis_request(
    pkg: &mut TemplatePackage,
    order: &OrderRecord,
) -> Result<(), XlsxError> {
    let labels = read_species_labels(pkg)?;
    let edits = build_sheet_edits(order, &labels);
    apply_sheet_edits(pkg, WORKSHEET_NAME, &edits)
}

/// Read the species catalog labels from the template, keyed by 1-based row.
pub fn read_species_labels(pkg: &TemplatePackage) -> Result<BTreeMap<u32, String>, XlsxError> {
    let cells: Vec<CellRef> = SPECIES_CATALOG_ROWS
        .map(|row| CellRef::at_row(row, SPECIES_LABEL_COL))
        .collect();
    let texts = sheet_cell_text(pkg, WORKSHEET_NAME, &cells)?;
    Ok(texts
        .into_iter()
        .map(|(cell, text)| (cell.row_number(), text))
        .collect())
}

/// Build the full edit set for one order.
///
/// Rules apply in a fixed order. No two rules target the same cell today,
/// but the order is part of the engine's contract so future mapping
/// additions stay predictable.
pub fn build_sheet_edits(
    order: &OrderRecord,
    species_labels: &BTreeMap<u32, String>,
) -> SheetEdits {
    let mut edits = SheetEdits::new();

    apply_contact_fields(&mut edits, order);
    apply_service_markers(&mut edits, order);
    apply_sample_sheet(&mut edits, order);
    apply_de_params(&mut edits, order);
    apply_species_marker(&mut edits, order, species_labels);
    apply_custom_requirements(&mut edits, order);
    apply_comparison_groups(&mut edits, order);

    edits
}

fn apply_contact_fields(edits: &mut SheetEdits, order: &OrderRecord) {
    for &(field, cell) in CONTACT_FIELDS {
        if let Some(text) = contact_value(order, field) {
            edits.set(cell, CellValue::text(text));
        }
    }
}

fn contact_value(order: &OrderRecord, field: ContactField) -> Option<&str> {
    match field {
        ContactField::SalesPerson => provided(&order.sales_person),
        ContactField::Organization => provided(&order.organization),
        ContactField::PrincipalInvestigator => provided(&order.principal_investigator),
        ContactField::ContactPerson => provided(&order.contact_person),
        ContactField::ContactPhone => provided(&order.contact_phone),
        ContactField::Email => provided(&order.email),
    }
}

fn apply_service_markers(edits: &mut SheetEdits, order: &OrderRecord) {
    for item in &order.service_items {
        if item.category.as_deref() != Some(ANALYSIS_SERVICE_CATEGORY) {
            continue;
        }
        for selection in &item.services {
            let Some(code) = provided(&selection.service) else {
                continue;
            };
            for marker in SERVICE_MARKERS {
                if code.starts_with(marker.prefix) {
                    // Repeated codes re-write the same cell idempotently.
                    edits.set(marker.cell, CellValue::text(MARKER));
                }
            }
        }
    }
}

fn apply_sample_sheet(edits: &mut SheetEdits, order: &OrderRecord) {
    let Some(reqs) = &order.analysis_requirements else {
        return;
    };
    SAMPLE_SHEET.project(edits, &reqs.sample_sheet, |row, field| match field {
        SampleField::SampleName => provided(&row.sample_name),
        SampleField::Group1 => provided(&row.group1),
        SampleField::Group2 => provided(&row.group2),
        SampleField::Group3 => provided(&row.group3),
        SampleField::Source => provided(&row.source),
    });
}

fn apply_de_params(edits: &mut SheetEdits, order: &OrderRecord) {
    let Some(de) = order
        .analysis_requirements
        .as_ref()
        .and_then(|reqs| reqs.de_params.as_ref())
    else {
        return;
    };

    if let Some(n) = numeric_field(&de.log_fc) {
        edits.set(DE_LOG_FC, CellValue::Number(n));
    }
    if let Some(text) = provided(&de.p_method) {
        edits.set(DE_P_METHOD, CellValue::text(text));
    }
    if let Some(n) = numeric_field(&de.p_cutoff) {
        edits.set(DE_P_CUTOFF, CellValue::Number(n));
    }
}

/// Parse a numeric form field.
///
/// Values that do not parse as a finite number are skipped rather than
/// written into the sheet as a not-a-number token.
fn numeric_field(field: &Option<String>) -> Option<f64> {
    let text = provided(field)?;
    match text.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => None,
    }
}

fn apply_species_marker(
    edits: &mut SheetEdits,
    order: &OrderRecord,
    labels: &BTreeMap<u32, String>,
) {
    let Some(species) = provided(&order.species) else {
        return;
    };

    if species == SPECIES_OTHER {
        edits.set(SPECIES_OTHER_MARKER, CellValue::text(MARKER));
        if let Some(text) = provided(&order.species_other) {
            edits.set(SPECIES_OTHER_NAME, CellValue::text(text));
        }
        if let Some(text) = provided(&order.species_other_scientific_name) {
            edits.set(SPECIES_OTHER_SCIENTIFIC_NAME, CellValue::text(text));
        }
        if let Some(text) = provided(&order.species_other_reference_genome) {
            edits.set(SPECIES_OTHER_REFERENCE_GENOME, CellValue::text(text));
        }
    } else if let Some(row) = resolve_catalog_row(labels, species) {
        edits.set(
            CellRef::at_row(row, SPECIES_MARKER_COL),
            CellValue::text(MARKER),
        );
    }
    // No catalog match: no marker, no error.
}

fn apply_custom_requirements(edits: &mut SheetEdits, order: &OrderRecord) {
    let Some(text) = order
        .analysis_requirements
        .as_ref()
        .and_then(|reqs| provided(&reqs.custom_requirements))
    else {
        return;
    };
    edits.set(CUSTOM_REQUIREMENTS, CellValue::text(text));
}

fn apply_comparison_groups(edits: &mut SheetEdits, order: &OrderRecord) {
    let Some(reqs) = &order.analysis_requirements else {
        return;
    };
    COMPARISON_GROUPS.project(edits, &reqs.comparison_groups, |group, field| match field {
        ComparisonField::Group1Control => provided(&group.group1_control),
        ComparisonField::Group1Treatment => provided(&group.group1_treatment),
        ComparisonField::Group2Control => provided(&group.group2_control),
        ComparisonField::Group2Treatment => provided(&group.group2_treatment),
        ComparisonField::Group3Control => provided(&group.group3_control),
        ComparisonField::Group3Treatment => provided(&group.group3_treatment),
    });
}
