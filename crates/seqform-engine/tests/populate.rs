use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use seqform_engine::populate_analysis_request;
use seqform_model::{
    AnalysisRequirements, CellRef, CellValue, ComparisonGroup, OrderRecord, SampleRow,
    ServiceItem, ServiceSelection,
};
use seqform_xlsx::{sheet_cell_text, write_minimal_template, TemplatePackage};

fn a1(s: &str) -> CellRef {
    CellRef::from_a1(s).unwrap()
}

/// A template fixture with the species catalog filled in and a few
/// pre-existing header cells, the way the real form ships.
fn template_bytes() -> Vec<u8> {
    write_minimal_template(
        "RNA-seq",
        &[
            (a1("B16"), CellValue::text("Sample Name")),
            (a1("B119"), CellValue::text("Human (Homo sapiens)")),
            (a1("B120"), CellValue::text("Mouse (Mus musculus)")),
            (a1("B121"), CellValue::text("Rat (Rattus norvegicus)")),
        ],
    )
    .unwrap()
}

fn populate(order: &OrderRecord) -> TemplatePackage {
    let mut pkg = TemplatePackage::from_bytes(&template_bytes()).unwrap();
    populate_analysis_request(&mut pkg, order).unwrap();
    pkg
}

fn read(pkg: &TemplatePackage, cells: &[&str]) -> BTreeMap<String, String> {
    let refs: Vec<CellRef> = cells.iter().map(|s| a1(s)).collect();
    sheet_cell_text(pkg, "RNA-seq", &refs)
        .unwrap()
        .into_iter()
        .map(|(cell, text)| (cell.to_a1(), text))
        .collect()
}

#[test]
fn full_order_populates_every_section() {
    let order = OrderRecord {
        sales_person: Some("Lin".to_string()),
        organization: Some("Acme Institute".to_string()),
        principal_investigator: Some("Dr. Chen".to_string()),
        contact_person: Some("Wu".to_string()),
        contact_phone: Some("02-12345678".to_string()),
        email: Some("wu@example.org".to_string()),
        species: Some("mouse".to_string()),
        service_items: vec![ServiceItem {
            category: Some("分析服務 (A)".to_string()),
            services: vec![
                ServiceSelection {
                    service: Some("A204-01".to_string()),
                },
                ServiceSelection {
                    service: Some("A207-03".to_string()),
                },
            ],
        }],
        analysis_requirements: Some(AnalysisRequirements {
            sample_sheet: vec![SampleRow {
                sample_name: Some("S1".to_string()),
                group1: Some("ctrl".to_string()),
                source: Some("liver".to_string()),
                ..Default::default()
            }],
            de_params: Some(seqform_model::DeParams {
                log_fc: Some("1.5".to_string()),
                p_method: Some("FDR".to_string()),
                p_cutoff: Some("0.05".to_string()),
            }),
            custom_requirements: Some("need raw counts".to_string()),
            comparison_groups: vec![ComparisonGroup {
                group1_control: Some("ctrl".to_string()),
                group1_treatment: Some("treated".to_string()),
                ..Default::default()
            }],
        }),
        ..Default::default()
    };

    let pkg = populate(&order);
    let cells = read(
        &pkg,
        &[
            "D5", "B7", "J7", "A11", "A14", "B17", "C17", "F17", "F119", "E120", "F120", "A120",
            "H11", "B135", "C135",
        ],
    );

    assert_eq!(cells["D5"], "Lin");
    assert_eq!(cells["B7"], "Acme Institute");
    assert_eq!(cells["J7"], "wu@example.org");
    assert_eq!(cells["A11"], "v");
    assert_eq!(cells["A14"], "v");
    assert_eq!(cells["B17"], "S1");
    assert_eq!(cells["C17"], "ctrl");
    assert_eq!(cells["F17"], "liver");
    assert_eq!(cells["F119"], "1.5");
    assert_eq!(cells["E120"], "FDR");
    assert_eq!(cells["F120"], "0.05");
    assert_eq!(cells["A120"], "v");
    assert_eq!(cells["H11"], "need raw counts");
    assert_eq!(cells["B135"], "ctrl");
    assert_eq!(cells["C135"], "treated");
}

#[test]
fn organization_only_order_touches_only_the_worksheet() {
    let order = OrderRecord {
        organization: Some("Acme".to_string()),
        ..Default::default()
    };

    let original = TemplatePackage::from_bytes(&template_bytes()).unwrap();
    let populated = populate(&order);

    // Only the worksheet part may differ from the pristine template.
    for name in original.part_names() {
        let before = original.part(name).unwrap();
        let after = populated.part(name).unwrap();
        if name == "xl/worksheets/sheet1.xml" {
            assert_ne!(before, after);
        } else {
            assert_eq!(before, after, "part {name} changed");
        }
    }

    let cells = read(&populated, &["B7", "B16", "B119"]);
    assert_eq!(cells["B7"], "Acme");
    // Pre-existing template content survives.
    assert_eq!(cells["B16"], "Sample Name");
    assert_eq!(cells["B119"], "Human (Homo sapiens)");
}

#[test]
fn populate_is_deterministic() {
    let order = OrderRecord {
        organization: Some("Acme".to_string()),
        species: Some("rat".to_string()),
        ..Default::default()
    };

    let first = populate(&order).write_to_bytes().unwrap();
    let second = populate(&order).write_to_bytes().unwrap();
    assert_eq!(first, second);
}

#[test]
fn species_resolution_marks_the_matching_row_only() {
    let order = OrderRecord {
        species: Some("human".to_string()),
        ..Default::default()
    };
    let pkg = populate(&order);
    let markers = read(&pkg, &["A119", "A120", "A121", "A131"]);
    assert_eq!(markers.get("A119").map(String::as_str), Some("v"));
    assert!(!markers.contains_key("A120"));
    assert!(!markers.contains_key("A121"));
    assert!(!markers.contains_key("A131"));
}

#[test]
fn unmatched_species_leaves_all_markers_unset() {
    let order = OrderRecord {
        species: Some("xyz-unmatched".to_string()),
        ..Default::default()
    };
    let pkg = populate(&order);
    let markers = read(&pkg, &["A119", "A120", "A121", "A131"]);
    assert!(markers.is_empty());
}

#[test]
fn other_species_uses_the_manual_entry_row() {
    let order = OrderRecord {
        species: Some("其他".to_string()),
        species_other: Some("Axolotl".to_string()),
        species_other_scientific_name: Some("Ambystoma mexicanum".to_string()),
        species_other_reference_genome: Some("AmbMex60DD".to_string()),
        ..Default::default()
    };
    let pkg = populate(&order);
    let cells = read(&pkg, &["A131", "B131", "C131", "D131", "A119"]);
    assert_eq!(cells["A131"], "v");
    assert_eq!(cells["B131"], "Axolotl");
    assert_eq!(cells["C131"], "Ambystoma mexicanum");
    assert_eq!(cells["D131"], "AmbMex60DD");
    assert!(!cells.contains_key("A119"));
}

#[test]
fn oversized_sample_sheet_stops_at_row_116() {
    let sample_sheet: Vec<SampleRow> = (0..150)
        .map(|i| SampleRow {
            sample_name: Some(format!("S{i}")),
            ..Default::default()
        })
        .collect();
    let order = OrderRecord {
        analysis_requirements: Some(AnalysisRequirements {
            sample_sheet,
            ..Default::default()
        }),
        ..Default::default()
    };

    let pkg = populate(&order);
    let cells = read(&pkg, &["B17", "B116", "B117", "B118"]);
    assert_eq!(cells["B17"], "S0");
    assert_eq!(cells["B116"], "S99");
    assert!(!cells.contains_key("B117"));
    assert!(!cells.contains_key("B118"));
}

#[test]
fn comparison_groups_extend_past_the_printed_region() {
    let comparison_groups: Vec<ComparisonGroup> = (0..8)
        .map(|i| ComparisonGroup {
            group1_control: Some(format!("C{i}")),
            group3_treatment: Some(format!("T{i}")),
            ..Default::default()
        })
        .collect();
    let order = OrderRecord {
        analysis_requirements: Some(AnalysisRequirements {
            comparison_groups,
            ..Default::default()
        }),
        ..Default::default()
    };

    let pkg = populate(&order);
    let cells = read(&pkg, &["B135", "G135", "B142", "G142", "B143"]);
    assert_eq!(cells["B135"], "C0");
    assert_eq!(cells["G135"], "T0");
    assert_eq!(cells["B142"], "C7");
    assert_eq!(cells["G142"], "T7");
    assert!(!cells.contains_key("B143"));
}
