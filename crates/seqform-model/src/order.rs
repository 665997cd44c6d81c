//! The order record an export request starts from.
//!
//! Orders arrive as JSON documents with camelCase keys. Every field is
//! optional on the wire: an absent or empty field simply leaves the matching
//! template cell untouched, so the types below default everything and reject
//! nothing. Unknown keys are ignored.

use serde::Deserialize;

/// A decoded order document.
///
/// Immutable once decoded; the engine only reads it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(default)]
    pub sales_person: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub principal_investigator: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,

    /// Species selection. Either a free-text species name matched against the
    /// template's catalog rows, or the literal `其他` ("other"), in which case
    /// the three `species_other*` fields carry the manual entry.
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub species_other: Option<String>,
    #[serde(default)]
    pub species_other_scientific_name: Option<String>,
    #[serde(default)]
    pub species_other_reference_genome: Option<String>,

    #[serde(default)]
    pub service_items: Vec<ServiceItem>,

    #[serde(default)]
    pub analysis_requirements: Option<AnalysisRequirements>,
}

/// One category of ordered services.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceSelection>,
}

/// A single selected service, identified by its code (e.g. `A205-01`).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSelection {
    #[serde(default)]
    pub service: Option<String>,
}

/// Analysis-specific requirements attached to an order.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequirements {
    #[serde(default)]
    pub sample_sheet: Vec<SampleRow>,
    #[serde(default)]
    pub de_params: Option<DeParams>,
    #[serde(default)]
    pub custom_requirements: Option<String>,
    #[serde(default)]
    pub comparison_groups: Vec<ComparisonGroup>,
}

/// One row of the sample sheet.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRow {
    #[serde(default)]
    pub sample_name: Option<String>,
    #[serde(default)]
    pub group1: Option<String>,
    #[serde(default)]
    pub group2: Option<String>,
    #[serde(default)]
    pub group3: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Differential-expression parameters.
///
/// `log_fc` and `p_cutoff` are numeric on the form but arrive as strings;
/// parsing happens in the engine so the decode itself never fails on them.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeParams {
    #[serde(default, rename = "logFC")]
    pub log_fc: Option<String>,
    #[serde(default)]
    pub p_method: Option<String>,
    #[serde(default)]
    pub p_cutoff: Option<String>,
}

/// One comparison-group row: up to three control/treatment pairs.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonGroup {
    #[serde(default)]
    pub group1_control: Option<String>,
    #[serde(default)]
    pub group1_treatment: Option<String>,
    #[serde(default)]
    pub group2_control: Option<String>,
    #[serde(default)]
    pub group2_treatment: Option<String>,
    #[serde(default)]
    pub group3_control: Option<String>,
    #[serde(default)]
    pub group3_treatment: Option<String>,
}

/// Returns the field's value when it is present and non-empty.
///
/// Mapping rules never write blanks: an absent or empty source field keeps
/// the template's pre-existing cell value.
pub fn provided(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_full_order() {
        let json = r#"{
            "salesPerson": "Lin",
            "organization": "Acme Institute",
            "principalInvestigator": "Dr. Chen",
            "contactPerson": "Wu",
            "contactPhone": "02-12345678",
            "email": "wu@example.org",
            "species": "Human (Homo sapiens)",
            "serviceItems": [
                {
                    "category": "分析服務 (A)",
                    "services": [{"service": "A205-01"}, {"service": "A207-02"}]
                }
            ],
            "analysisRequirements": {
                "sampleSheet": [
                    {"sampleName": "S1", "group1": "ctrl", "source": "liver"}
                ],
                "deParams": {"logFC": "1.5", "pMethod": "FDR", "pCutoff": "0.05"},
                "customRequirements": "extra QC",
                "comparisonGroups": [
                    {"group1Control": "ctrl", "group1Treatment": "treated"}
                ]
            }
        }"#;

        let order: OrderRecord = serde_json::from_str(json).unwrap();
        assert_eq!(order.sales_person.as_deref(), Some("Lin"));
        assert_eq!(order.species.as_deref(), Some("Human (Homo sapiens)"));
        assert_eq!(order.service_items.len(), 1);
        assert_eq!(order.service_items[0].services.len(), 2);

        let reqs = order.analysis_requirements.unwrap();
        assert_eq!(reqs.sample_sheet[0].sample_name.as_deref(), Some("S1"));
        assert_eq!(reqs.sample_sheet[0].group2, None);
        let de = reqs.de_params.unwrap();
        assert_eq!(de.log_fc.as_deref(), Some("1.5"));
        assert_eq!(de.p_cutoff.as_deref(), Some("0.05"));
        assert_eq!(reqs.comparison_groups.len(), 1);
    }

    #[test]
    fn decodes_sparse_order_with_unknown_keys() {
        let json = r#"{"organization": "Acme", "status": "submitted", "total": 3}"#;
        let order: OrderRecord = serde_json::from_str(json).unwrap();
        assert_eq!(order.organization.as_deref(), Some("Acme"));
        assert_eq!(order.sales_person, None);
        assert!(order.service_items.is_empty());
        assert!(order.analysis_requirements.is_none());
    }

    #[test]
    fn provided_filters_empty_strings() {
        assert_eq!(provided(&None), None);
        assert_eq!(provided(&Some(String::new())), None);
        assert_eq!(provided(&Some("  ".to_string())), Some("  "));
        assert_eq!(provided(&Some("x".to_string())), Some("x"));
    }
}
