//! Workbook template constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{
    EnumCellLocator, EnumSampleNameRule, EnumStrengthDropdown, SpecAcgsConfig, SpecAcgsCriterion,
    SpecAnchorCell, SpecCellFormat, SpecClinvarEndpoints, SpecDatabaseConfig, SpecFieldCell,
    SpecIncludedColumns, SpecIncludedSheetConfig, SpecInstitutionInfo, SpecInterpretSheetConfig,
    SpecLayoutConfig, SpecPandoraConfig, SpecSiteConfig, SpecSummarySheetConfig,
};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Default summary sheet name.
pub const C_SHEET_SUMMARY: &str = "summary";
/// Default included-variant sheet name.
pub const C_SHEET_INCLUDED: &str = "included";
/// Case-insensitive prefix of interpretation sheet names.
pub const C_SHEET_INTERPRET_PREFIX: &str = "interpret";

/// Reference genome placeholder when no `Reference:` label row exists.
pub const C_REF_GENOME_UNDEFINED: &str = "not_defined";

/// Strength sentinel meaning "criterion not applied".
pub const C_STRENGTH_NOT_APPLICABLE: &str = "NA";

/// Layout drift message for the summary sheet.
pub const C_MSG_LAYOUT_SUMMARY: &str = "extra col(s) added or change(s) done in summary sheet";
/// Layout drift message for interpretation sheets.
pub const C_MSG_LAYOUT_INTERPRET: &str =
    "extra row(s) or col(s) added or change(s) done in interpret sheet";

/// `(field, cell)` pairs read from every interpretation sheet, in table-column order.
///
/// Benign evidence shares the evidence column with the pathogenic criterion on the
/// same template row.
pub const TUP_INTERPRET_FIELD_CELLS: [(&str, &str); 57] = [
    ("associated_disease", "C4"),
    ("known_inheritance", "C5"),
    ("prevalence", "C6"),
    ("hgvsc", "C3"),
    ("germline_classification", "C26"),
    ("pvs1", "H10"),
    ("pvs1_evidence", "C10"),
    ("ps1", "H11"),
    ("ps1_evidence", "C11"),
    ("ps2", "H12"),
    ("ps2_evidence", "C12"),
    ("ps3", "H13"),
    ("ps3_evidence", "C13"),
    ("ps4", "H14"),
    ("ps4_evidence", "C14"),
    ("pm1", "H15"),
    ("pm1_evidence", "C15"),
    ("pm2", "H16"),
    ("pm2_evidence", "C16"),
    ("pm3", "H17"),
    ("pm3_evidence", "C17"),
    ("pm4", "H18"),
    ("pm4_evidence", "C18"),
    ("pm5", "H19"),
    ("pm5_evidence", "C19"),
    ("pm6", "H20"),
    ("pm6_evidence", "C20"),
    ("pp1", "H21"),
    ("pp1_evidence", "C21"),
    ("pp2", "H22"),
    ("pp2_evidence", "C22"),
    ("pp3", "H23"),
    ("pp3_evidence", "C23"),
    ("pp4", "H24"),
    ("pp4_evidence", "C24"),
    ("bs1", "K16"),
    ("bs1_evidence", "C16"),
    ("bs2", "K12"),
    ("bs2_evidence", "C12"),
    ("bs3", "K13"),
    ("bs3_evidence", "C13"),
    ("ba1", "K9"),
    ("ba1_evidence", "C9"),
    ("bp2", "K17"),
    ("bp2_evidence", "C17"),
    ("bp3", "K18"),
    ("bp3_evidence", "C18"),
    ("bs4", "K21"),
    ("bs4_evidence", "C21"),
    ("bp1", "K22"),
    ("bp1_evidence", "C22"),
    ("bp4", "K23"),
    ("bp4_evidence", "C23"),
    ("bp5", "K24"),
    ("bp5_evidence", "C24"),
    ("bp7", "K25"),
    ("bp7_evidence", "C25"),
];

/// ACGS criteria with default strength, in table-column order.
pub const TUP_ACGS_CRITERIA_DEFAULTS: [(&str, &str); 26] = [
    ("PVS1", "Very Strong"),
    ("PS1", "Strong"),
    ("PS2", "Strong"),
    ("PS3", "Strong"),
    ("PS4", "Strong"),
    ("PM1", "Moderate"),
    ("PM2", "Moderate"),
    ("PM3", "Moderate"),
    ("PM4", "Moderate"),
    ("PM5", "Moderate"),
    ("PM6", "Moderate"),
    ("PP1", "Supporting"),
    ("PP2", "Supporting"),
    ("PP3", "Supporting"),
    ("PP4", "Supporting"),
    ("BS1", "Supporting"),
    ("BS2", "Supporting"),
    ("BS3", "Supporting"),
    ("BA1", "Stand-Alone"),
    ("BP2", "Supporting"),
    ("BP3", "Supporting"),
    ("BS4", "Supporting"),
    ("BP1", "Supporting"),
    ("BP4", "Supporting"),
    ("BP5", "Supporting"),
    ("BP7", "Supporting"),
];

/// Strength dropdown for every criterion except the stand-alone one.
pub const TUP_STRENGTHS_STANDARD: [&str; 5] =
    ["Very Strong", "Strong", "Moderate", "Supporting", "NA"];

/// Strength dropdown for the stand-alone criterion (`BA1`).
pub const TUP_STRENGTHS_STAND_ALONE: [&str; 6] = [
    "Stand-Alone",
    "Very Strong",
    "Strong",
    "Moderate",
    "Supporting",
    "NA",
];

/// Germline classification labels accepted on interpretation sheets.
pub const TUP_GERMLINE_CLASSIFICATIONS: [&str; 5] = [
    "Pathogenic",
    "Likely Pathogenic",
    "Uncertain Significance",
    "Likely Benign",
    "Benign",
];

/// Classification casing expected by the submission format.
pub const TUP_CLASSIFICATION_RELABELS: [(&str, &str); 3] = [
    ("Likely Pathogenic", "Likely pathogenic"),
    ("Uncertain Significance", "Uncertain significance"),
    ("Likely Benign", "Likely benign"),
];

/// Reference genome labels accepted for submission.
pub const TUP_REF_GENOMES: [&str; 2] = ["GRCh37.p13", "GRCh38.p13"];

/// Header cell format of the review workbook.
pub fn derive_default_header_format() -> SpecCellFormat {
    SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        bold: Some(true),
        border: Some(1),
        text_wrap: Some(false),
        bg_color: Some("#D9E1F2".to_string()),
        ..Default::default()
    }
}

/// Body cell format of the review workbook.
pub fn derive_default_body_format() -> SpecCellFormat {
    SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        border: Some(0),
        ..Default::default()
    }
}

/// Build the default summary-sheet field map.
pub fn derive_default_summary_sheet() -> SpecSummarySheetConfig {
    SpecSummarySheetConfig {
        sheet_name: C_SHEET_SUMMARY.to_string(),
        sample_id: EnumCellLocator::fixed("B1"),
        clinical_indication: EnumCellLocator::fixed("F1"),
        panel: EnumCellLocator::fixed("F2"),
        ref_genome: EnumCellLocator::LabelScan {
            column: "A".to_string(),
            label: "Reference:".to_string(),
            col_offset: 1,
            row_offset: 0,
        },
        date_evaluated: EnumCellLocator::fixed("G22"),
        n_variants: EnumCellLocator::fixed("C38"),
    }
}

/// Build the default included-sheet column map.
pub fn derive_default_included_sheet() -> SpecIncludedSheetConfig {
    SpecIncludedSheetConfig {
        sheet_name: C_SHEET_INCLUDED.to_string(),
        columns: SpecIncludedColumns {
            chromosome: "CHROM".to_string(),
            start: "POS".to_string(),
            reference_allele: "REF".to_string(),
            alternate_allele: "ALT".to_string(),
            gene_symbol: "SYMBOL".to_string(),
            hgvsc: "HGVSc".to_string(),
            consequence: "Consequence".to_string(),
            interpreted: "Interpreted".to_string(),
            comment: "Comment".to_string(),
        },
    }
}

/// Build the default interpretation-sheet field cells.
pub fn derive_default_interpret_sheet() -> SpecInterpretSheetConfig {
    SpecInterpretSheetConfig {
        sheet_prefix: C_SHEET_INTERPRET_PREFIX.to_string(),
        field_cells: TUP_INTERPRET_FIELD_CELLS
            .iter()
            .map(|(field, address)| SpecFieldCell {
                field: field.to_string(),
                address: address.to_string(),
            })
            .collect(),
    }
}

/// Build the default template anchor cells.
pub fn derive_default_layout() -> SpecLayoutConfig {
    SpecLayoutConfig {
        summary_anchors: vec![SpecAnchorCell::new("G21", "Date")],
        interpret_anchors: vec![
            SpecAnchorCell::new("B26", "FINAL ACMG CLASSIFICATION"),
            SpecAnchorCell::new("L8", "B_POINTS"),
        ],
        msg_summary: C_MSG_LAYOUT_SUMMARY.to_string(),
        msg_interpret: C_MSG_LAYOUT_INTERPRET.to_string(),
    }
}

/// Build the default ACGS criteria, dropdowns and classification labels.
pub fn derive_default_acgs() -> SpecAcgsConfig {
    SpecAcgsConfig {
        criteria: TUP_ACGS_CRITERIA_DEFAULTS
            .iter()
            .map(|(name, strength_default)| SpecAcgsCriterion {
                name: name.to_string(),
                strength_default: strength_default.to_string(),
                dropdown: if *name == "BA1" {
                    EnumStrengthDropdown::StandAlone
                } else {
                    EnumStrengthDropdown::Standard
                },
            })
            .collect(),
        strengths_standard: TUP_STRENGTHS_STANDARD.map(String::from).to_vec(),
        strengths_stand_alone: TUP_STRENGTHS_STAND_ALONE.map(String::from).to_vec(),
        strength_not_applicable: C_STRENGTH_NOT_APPLICABLE.to_string(),
        classifications: TUP_GERMLINE_CLASSIFICATIONS.map(String::from).to_vec(),
        classification_relabels: TUP_CLASSIFICATION_RELABELS
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Build the default CUH/NUH site table.
pub fn derive_default_sites() -> Vec<SpecSiteConfig> {
    let c_guideline_url = "https://submit.ncbi.nlm.nih.gov/api/2.0/files/{id}/uk-practice-guidelines-for-variant-classification-v4-01-2020.pdf/?format=attachment";
    vec![
        SpecSiteConfig {
            name: "CUH".to_string(),
            folder: "CUH".to_string(),
            organisation: "East Genomic Laboratory Hub, NHS Genomic Medicine Service".to_string(),
            organisation_id: "288359".to_string(),
            acgs_url: c_guideline_url.replace("{id}", "kf4l0sn8"),
            if_unusual_sample_name: false,
            api_key_env: Some("CLINVAR_API_KEY_CUH".to_string()),
        },
        SpecSiteConfig {
            name: "NUH".to_string(),
            folder: "NUH".to_string(),
            organisation: "Nottingham Genetics Service, Nottingham University Hospitals".to_string(),
            organisation_id: "509428".to_string(),
            acgs_url: c_guideline_url.replace("{id}", "iptxgqju"),
            if_unusual_sample_name: true,
            api_key_env: Some("CLINVAR_API_KEY_NUH".to_string()),
        },
    ]
}

/// Build the default pipeline configuration for the standard workbook template.
pub fn derive_default_pandora_config() -> SpecPandoraConfig {
    SpecPandoraConfig {
        info: SpecInstitutionInfo {
            institution: "National Health Service".to_string(),
            collection_method: "clinical testing".to_string(),
            allele_origin: "germline".to_string(),
            affected_status: "yes".to_string(),
        },
        sites: derive_default_sites(),
        summary: derive_default_summary_sheet(),
        included: derive_default_included_sheet(),
        interpret: derive_default_interpret_sheet(),
        layout: derive_default_layout(),
        acgs: derive_default_acgs(),
        ref_genomes: TUP_REF_GENOMES.map(String::from).to_vec(),
        clinvar: SpecClinvarEndpoints {
            api_url_test: "https://submit.ncbi.nlm.nih.gov/apitest/v1/submissions".to_string(),
            api_url_live: "https://submit.ncbi.nlm.nih.gov/api/v1/submissions/".to_string(),
        },
        database: SpecDatabaseConfig::default(),
        rule_sample_name: EnumSampleNameRule::Warn,
        submission_transforms: vec![],
    }
}
