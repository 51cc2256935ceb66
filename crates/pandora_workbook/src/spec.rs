//! Configuration, cell model, extracted records and errors.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conf::derive_default_pandora_config;

////////////////////////////////////////////////////////////////////////////////
// #region ErrorSpecification

/// Terminal per-workbook failure.
///
/// The `Display` text of each variant is the diagnostic stored against the
/// workbook when ingestion is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkbookError {
    /// Template anchor cells no longer hold their expected labels.
    #[error("{0}")]
    LayoutDrift(String),
    /// Evaluation date present but not parseable.
    #[error("Value for date last evaluated \"{value}\" is not compatible with datetime conversion")]
    DateFormat { value: String },
    /// Workbook folder matches no configured site.
    #[error("Running for the wrong folder: \"{folder}\" is not a configured site folder")]
    UnknownSite { folder: String },
    /// Cross-sheet or interpreted-column rules violated.
    #[error("{0}")]
    Validation(String),
    /// Sample identifier malformed or rejected by the blocking policy.
    #[error("{0}")]
    SampleIdentifier(String),
    /// Clinical indication segment without a `<code>_<name>` separator.
    #[error("Clinical indication segment \"{0}\" has no \"_\" separator")]
    ClinicalIndication(String),
    /// Required sheet absent from the workbook.
    #[error("Missing sheet \"{0}\"")]
    MissingSheet(String),
    /// Required field cell empty.
    #[error("Missing value for {field} in sheet \"{sheet}\"")]
    MissingField { sheet: String, field: String },
    /// Required column header absent from a table sheet.
    #[error("Missing column header \"{header}\" in sheet \"{sheet}\"")]
    MissingHeader { sheet: String, header: String },
    /// Malformed A1 cell address.
    #[error("Invalid cell address \"{0}\"")]
    InvalidAddress(String),
    /// Workbook file could not be opened or read.
    #[error("Failed to open workbook {path}: {message}")]
    Open { path: String, message: String },
    /// Configuration could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Record export failed.
    #[error("Export failed: {0}")]
    Export(String),
}

/// Stage result that keeps the partial data next to the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecExtraction<T> {
    /// Data extracted so far.
    pub data: T,
    /// Terminal error, if any.
    pub error: Option<WorkbookError>,
}

impl<T> SpecExtraction<T> {
    /// Wrap a successful stage result.
    pub fn ok(data: T) -> Self {
        Self { data, error: None }
    }

    /// Wrap a partial stage result with its terminal error.
    pub fn failed(data: T, error: WorkbookError) -> Self {
        Self {
            data,
            error: Some(error),
        }
    }

    /// Whether the stage finished without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Drop partial data on failure.
    pub fn into_result(self) -> Result<T, WorkbookError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellSpecification

/// Typed cell value as read from a workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Floating point value.
    Number(f64),
    /// Integer value.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
    /// Native date/time value.
    DateTime(NaiveDateTime),
}

impl EnumCellValue {
    /// Whether the cell is blank.
    pub fn is_none(&self) -> bool {
        matches!(self, EnumCellValue::None)
    }

    /// Render the value as text; blank cells yield `None`.
    ///
    /// Whole-valued floats drop the fractional part so `9.0` reads `"9"`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            EnumCellValue::None => None,
            EnumCellValue::String(val) => Some(val.clone()),
            EnumCellValue::Number(val) => {
                if val.is_finite() && val.fract() == 0.0 && val.abs() < 1e15 {
                    Some(format!("{}", *val as i64))
                } else {
                    Some(val.to_string())
                }
            }
            EnumCellValue::Integer(val) => Some(val.to_string()),
            EnumCellValue::Boolean(val) => Some(val.to_string()),
            EnumCellValue::DateTime(val) => {
                if val.num_seconds_from_midnight() == 0 {
                    Some(val.date().format("%Y-%m-%d").to_string())
                } else {
                    Some(val.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            }
        }
    }

    /// Read the value as an integer when it holds a whole number.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            EnumCellValue::Integer(val) => Some(*val),
            EnumCellValue::Number(val) if val.is_finite() && val.fract() == 0.0 => {
                Some(*val as i64)
            }
            EnumCellValue::String(val) => val.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

/// Zero-based cell coordinate parsed from A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecCellAddress {
    /// Zero-based row index.
    pub row: usize,
    /// Zero-based column index.
    pub col: usize,
}

impl SpecCellAddress {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style address such as `"B1"`.
    pub fn parse(address: &str) -> Result<Self, WorkbookError> {
        crate::util::parse_cell_address(address)
            .map_err(|_| WorkbookError::InvalidAddress(address.to_string()))
    }

    /// Shift by signed row/column offsets; `None` when leaving the grid.
    pub fn offset(&self, row_offset: i64, col_offset: i64) -> Option<Self> {
        let row = i64::try_from(self.row).ok()?.checked_add(row_offset)?;
        let col = i64::try_from(self.col).ok()?.checked_add(col_offset)?;
        Some(Self {
            row: usize::try_from(row).ok()?,
            col: usize::try_from(col).ok()?,
        })
    }
}

impl fmt::Display for SpecCellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            crate::util::derive_column_letters(self.col),
            self.row + 1
        )
    }
}

/// Strategy for locating one summary field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum EnumCellLocator {
    /// Fixed A1 coordinate.
    Fixed { address: String },
    /// Scan `column` for a cell whose text equals `label`, then step by the offsets.
    LabelScan {
        column: String,
        label: String,
        #[serde(default)]
        col_offset: i64,
        #[serde(default)]
        row_offset: i64,
    },
}

impl EnumCellLocator {
    pub fn fixed(address: &str) -> Self {
        EnumCellLocator::Fixed {
            address: address.to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ConfigSpecification

/// Institution metadata attached to every summary record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecInstitutionInfo {
    pub institution: String,
    pub collection_method: String,
    pub allele_origin: String,
    pub affected_status: String,
}

/// One submitting laboratory and the workbook folder it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSiteConfig {
    /// Short site label, e.g. `CUH`.
    pub name: String,
    /// Basename of the folder holding this site's workbooks.
    pub folder: String,
    /// Organisation display name.
    pub organisation: String,
    /// ClinVar organisation ID.
    pub organisation_id: String,
    /// Assertion-criteria guideline URL sent with submissions.
    pub acgs_url: String,
    /// Skip sample identifier checks for this site's naming convention.
    #[serde(default)]
    pub if_unusual_sample_name: bool,
    /// Environment variable holding the site's ClinVar API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

/// Summary sheet field locators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSummarySheetConfig {
    pub sheet_name: String,
    pub sample_id: EnumCellLocator,
    pub clinical_indication: EnumCellLocator,
    pub panel: EnumCellLocator,
    pub ref_genome: EnumCellLocator,
    pub date_evaluated: EnumCellLocator,
    /// Number of rows to read from the included sheet.
    pub n_variants: EnumCellLocator,
}

/// Header names of the included-sheet columns, keyed by canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecIncludedColumns {
    pub chromosome: String,
    pub start: String,
    pub reference_allele: String,
    pub alternate_allele: String,
    pub gene_symbol: String,
    pub hgvsc: String,
    pub consequence: String,
    pub interpreted: String,
    pub comment: String,
}

impl SpecIncludedColumns {
    /// Header names in canonical column order.
    pub fn headers(&self) -> Vec<String> {
        vec![
            self.chromosome.clone(),
            self.start.clone(),
            self.reference_allele.clone(),
            self.alternate_allele.clone(),
            self.gene_symbol.clone(),
            self.hgvsc.clone(),
            self.consequence.clone(),
            self.interpreted.clone(),
            self.comment.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecIncludedSheetConfig {
    pub sheet_name: String,
    pub columns: SpecIncludedColumns,
}

/// One `(field, cell)` pair read from every interpretation sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecFieldCell {
    pub field: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecInterpretSheetConfig {
    /// Case-insensitive sheet name prefix.
    pub sheet_prefix: String,
    pub field_cells: Vec<SpecFieldCell>,
}

/// Expected text at a fixed template cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecAnchorCell {
    pub address: String,
    pub expected: String,
}

impl SpecAnchorCell {
    pub fn new(address: &str, expected: &str) -> Self {
        Self {
            address: address.to_string(),
            expected: expected.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecLayoutConfig {
    pub summary_anchors: Vec<SpecAnchorCell>,
    pub interpret_anchors: Vec<SpecAnchorCell>,
    pub msg_summary: String,
    pub msg_interpret: String,
}

/// Which strength dropdown a criterion is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumStrengthDropdown {
    #[default]
    Standard,
    StandAlone,
}

/// One ACGS evidence criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecAcgsCriterion {
    /// Criterion name, e.g. `PM3`.
    pub name: String,
    /// Strength omitted from the classification comment.
    pub strength_default: String,
    #[serde(default)]
    pub dropdown: EnumStrengthDropdown,
}

impl SpecAcgsCriterion {
    /// Field name of the strength cell (`pm3`).
    pub fn field_strength(&self) -> String {
        self.name.to_lowercase()
    }

    /// Field name of the evidence cell (`pm3_evidence`).
    pub fn field_evidence(&self) -> String {
        format!("{}_evidence", self.name.to_lowercase())
    }
}

/// ACGS criteria set, allowed strengths and classification labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecAcgsConfig {
    /// Criteria in table-column order.
    pub criteria: Vec<SpecAcgsCriterion>,
    pub strengths_standard: Vec<String>,
    pub strengths_stand_alone: Vec<String>,
    /// Strength sentinel normalized to null.
    pub strength_not_applicable: String,
    /// Accepted germline classification labels.
    pub classifications: Vec<String>,
    /// Label casing remap applied after merge.
    pub classification_relabels: BTreeMap<String, String>,
}

impl SpecAcgsConfig {
    /// Allowed strength values for one criterion.
    pub fn allowed_strengths(&self, criterion: &SpecAcgsCriterion) -> &[String] {
        match criterion.dropdown {
            EnumStrengthDropdown::Standard => &self.strengths_standard,
            EnumStrengthDropdown::StandAlone => &self.strengths_stand_alone,
        }
    }

    /// Criterion names in configured order; drives the storage columns.
    pub fn criterion_names(&self) -> Vec<String> {
        self.criteria.iter().map(|c| c.name.clone()).collect()
    }
}

/// ClinVar submission endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecClinvarEndpoints {
    pub api_url_test: String,
    pub api_url_live: String,
}

/// Variants whose `column` holds one of `values` are never submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecExcludeRule {
    pub column: String,
    pub values: Vec<String>,
}

/// Relational store naming plus the submission exclusion rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecDatabaseConfig {
    pub schema: String,
    pub table_variants: String,
    pub table_workbooks: String,
    /// Applied to the unsubmitted-variant query only.
    pub exclude: Vec<SpecExcludeRule>,
}

impl Default for SpecDatabaseConfig {
    fn default() -> Self {
        Self {
            schema: "testdirectory".to_string(),
            table_variants: "inca".to_string(),
            table_workbooks: "inca_workbooks".to_string(),
            exclude: Vec::new(),
        }
    }
}

/// Policy for sample identifier check failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumSampleNameRule {
    /// Log the message and continue.
    #[default]
    Warn,
    /// Reject the workbook.
    Block,
}

/// Settings of the drug-response submission rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecDrugResponseConfig {
    /// Clinical indication code selecting the rule, e.g. `R444`.
    pub code: String,
    /// Replacement clinical significance description.
    pub classification_description: String,
    /// Replacement condition name.
    pub condition_name: String,
    /// Replacement comment; the original comment is kept when absent.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Versioned submission rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum EnumSubmissionTransformConfig {
    #[serde(rename = "drug_response.v1")]
    DrugResponseV1(SpecDrugResponseConfig),
}

/// Full pipeline configuration, passed explicitly into every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecPandoraConfig {
    pub info: SpecInstitutionInfo,
    pub sites: Vec<SpecSiteConfig>,
    pub summary: SpecSummarySheetConfig,
    pub included: SpecIncludedSheetConfig,
    pub interpret: SpecInterpretSheetConfig,
    pub layout: SpecLayoutConfig,
    pub acgs: SpecAcgsConfig,
    /// Reference genome allow-list for submission.
    pub ref_genomes: Vec<String>,
    pub clinvar: SpecClinvarEndpoints,
    pub database: SpecDatabaseConfig,
    pub rule_sample_name: EnumSampleNameRule,
    pub submission_transforms: Vec<EnumSubmissionTransformConfig>,
}

impl Default for SpecPandoraConfig {
    fn default() -> Self {
        derive_default_pandora_config()
    }
}

impl SpecPandoraConfig {
    /// Parse JSON; absent sections keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, WorkbookError> {
        serde_json::from_str(text).map_err(|err| WorkbookError::Config(err.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, WorkbookError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| WorkbookError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Look up the site owning a workbook folder.
    pub fn find_site_by_folder(&self, folder_name: &str) -> Option<&SpecSiteConfig> {
        self.sites.iter().find(|site| site.folder == folder_name)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordSpecification

/// Structured sample identifier components.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSampleIdentifier {
    pub instrument_id: String,
    pub specimen_id: String,
    pub batch_id: String,
    pub test_code: String,
    pub probeset_id: String,
}

/// Workbook-wide summary fields.
///
/// Fields after `date_last_evaluated` stay empty when extraction stops at the
/// date or site step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSummaryRecord {
    pub sample: SpecSampleIdentifier,
    /// Semicolon-joined clinical indication codes.
    pub r_code: String,
    /// Semicolon-joined condition names, paired with `r_code`.
    pub preferred_condition_name: String,
    pub panel: Option<String>,
    pub ref_genome: String,
    pub date_last_evaluated: Option<NaiveDate>,
    pub info: Option<SpecInstitutionInfo>,
    pub organisation: Option<String>,
    pub organisation_id: Option<String>,
    /// Advisory sample identifier message kept under the warn policy.
    pub sample_name_warning: Option<String>,
}

/// One row of the included sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecIncludedVariant {
    pub chromosome: Option<String>,
    pub start: Option<i64>,
    pub reference_allele: Option<String>,
    pub alternate_allele: Option<String>,
    pub gene_symbol: Option<String>,
    pub hgvsc: Option<String>,
    pub consequence: Option<String>,
    /// Lowercased interpreted flag.
    pub interpreted: Option<String>,
    pub comment: Option<String>,
    pub local_id: String,
    pub linking_id: String,
}

/// Strength and evidence recorded for one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecCriterionCall {
    pub name: String,
    pub strength: Option<String>,
    pub evidence: Option<String>,
}

/// One interpretation sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecInterpretationRecord {
    pub sheet_name: String,
    pub associated_disease: Option<String>,
    pub known_inheritance: Option<String>,
    pub prevalence: Option<String>,
    pub hgvsc: Option<String>,
    pub germline_classification: Option<String>,
    /// Criteria in table-column order.
    pub criteria: Vec<SpecCriterionCall>,
    /// Set once validation has passed.
    pub comment_on_classification: Option<String>,
}

impl SpecInterpretationRecord {
    pub fn criterion(&self, name: &str) -> Option<&SpecCriterionCall> {
        self.criteria.iter().find(|call| call.name == name)
    }
}

/// One storable row: included variant with summary and optional interpretation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecMergedVariantRecord {
    pub variant: SpecIncludedVariant,
    pub summary: SpecSummaryRecord,
    pub interpretation: Option<SpecInterpretationRecord>,
}

impl SpecMergedVariantRecord {
    /// Final germline classification, if interpreted.
    pub fn germline_classification(&self) -> Option<&str> {
        self.interpretation
            .as_ref()
            .and_then(|interp| interp.germline_classification.as_deref())
    }

    /// Flatten into the storage column layout.
    ///
    /// Criteria columns follow `criteria_names` so rows without an
    /// interpretation still produce the full column set.
    pub fn to_column_values(&self, criteria_names: &[String]) -> Vec<(String, EnumCellValue)> {
        fn text(value: &Option<String>) -> EnumCellValue {
            match value {
                Some(val) => EnumCellValue::String(val.clone()),
                None => EnumCellValue::None,
            }
        }
        fn plain(value: &str) -> EnumCellValue {
            EnumCellValue::String(value.to_string())
        }

        let variant = &self.variant;
        let summary = &self.summary;
        let info = summary.info.as_ref();
        let interp = self.interpretation.as_ref();
        let interp_text = |f: fn(&SpecInterpretationRecord) -> &Option<String>| {
            interp.map_or(EnumCellValue::None, |val| text(f(val)))
        };

        let mut l_values: Vec<(String, EnumCellValue)> = vec![
            ("chromosome".to_string(), text(&variant.chromosome)),
            (
                "start".to_string(),
                variant
                    .start
                    .map_or(EnumCellValue::None, EnumCellValue::Integer),
            ),
            ("reference_allele".to_string(), text(&variant.reference_allele)),
            ("alternate_allele".to_string(), text(&variant.alternate_allele)),
            ("gene_symbol".to_string(), text(&variant.gene_symbol)),
            ("hgvsc".to_string(), text(&variant.hgvsc)),
            ("consequence".to_string(), text(&variant.consequence)),
            ("interpreted".to_string(), text(&variant.interpreted)),
            ("comment".to_string(), text(&variant.comment)),
            ("local_id".to_string(), plain(&variant.local_id)),
            ("linking_id".to_string(), plain(&variant.linking_id)),
            ("instrument_id".to_string(), plain(&summary.sample.instrument_id)),
            ("specimen_id".to_string(), plain(&summary.sample.specimen_id)),
            ("batch_id".to_string(), plain(&summary.sample.batch_id)),
            ("test_code".to_string(), plain(&summary.sample.test_code)),
            ("probeset_id".to_string(), plain(&summary.sample.probeset_id)),
            ("r_code".to_string(), plain(&summary.r_code)),
            (
                "preferred_condition_name".to_string(),
                plain(&summary.preferred_condition_name),
            ),
            ("panel".to_string(), text(&summary.panel)),
            ("ref_genome".to_string(), plain(&summary.ref_genome)),
            (
                "date_last_evaluated".to_string(),
                summary.date_last_evaluated.map_or(EnumCellValue::None, |val| {
                    EnumCellValue::String(val.format("%Y-%m-%d").to_string())
                }),
            ),
            (
                "institution".to_string(),
                info.map_or(EnumCellValue::None, |val| plain(&val.institution)),
            ),
            (
                "collection_method".to_string(),
                info.map_or(EnumCellValue::None, |val| plain(&val.collection_method)),
            ),
            (
                "allele_origin".to_string(),
                info.map_or(EnumCellValue::None, |val| plain(&val.allele_origin)),
            ),
            (
                "affected_status".to_string(),
                info.map_or(EnumCellValue::None, |val| plain(&val.affected_status)),
            ),
            ("organisation".to_string(), text(&summary.organisation)),
            ("organisation_id".to_string(), text(&summary.organisation_id)),
            (
                "associated_disease".to_string(),
                interp_text(|val| &val.associated_disease),
            ),
            (
                "known_inheritance".to_string(),
                interp_text(|val| &val.known_inheritance),
            ),
            ("prevalence".to_string(), interp_text(|val| &val.prevalence)),
            (
                "germline_classification".to_string(),
                interp_text(|val| &val.germline_classification),
            ),
        ];

        for name in criteria_names {
            let call = interp.and_then(|val| val.criterion(name));
            l_values.push((
                name.to_lowercase(),
                call.map_or(EnumCellValue::None, |val| text(&val.strength)),
            ));
            l_values.push((
                format!("{}_evidence", name.to_lowercase()),
                call.map_or(EnumCellValue::None, |val| text(&val.evidence)),
            ));
        }

        l_values.push((
            "comment_on_classification".to_string(),
            interp_text(|val| &val.comment_on_classification),
        ));
        l_values
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportSpecification

/// Cell format subset used by the review workbook writer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
}

/// Column width inference policy for the review workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Max body rows inspected.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_partial_keeps_defaults() {
        let config = SpecPandoraConfig::from_json_str(
            r#"{
                "rule_sample_name": "block",
                "database": {"exclude": [{"column": "panel", "values": ["R444"]}]},
                "summary": {
                    "sheet_name": "summary",
                    "sample_id": {"rule": "fixed", "address": "B1"},
                    "clinical_indication": {"rule": "fixed", "address": "F1"},
                    "panel": {"rule": "fixed", "address": "F2"},
                    "ref_genome": {"rule": "label_scan", "column": "A", "label": "Genome:", "col_offset": 2},
                    "date_evaluated": {"rule": "fixed", "address": "G22"},
                    "n_variants": {"rule": "fixed", "address": "C38"}
                },
                "submission_transforms": [
                    {"version": "drug_response.v1", "code": "R444",
                     "classification_description": "drug response",
                     "condition_name": "Responsive"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.rule_sample_name, EnumSampleNameRule::Block);
        assert_eq!(config.database.schema, "testdirectory");
        assert_eq!(
            config.database.exclude,
            vec![SpecExcludeRule {
                column: "panel".to_string(),
                values: vec!["R444".to_string()],
            }]
        );
        assert_eq!(
            config.summary.ref_genome,
            EnumCellLocator::LabelScan {
                column: "A".to_string(),
                label: "Genome:".to_string(),
                col_offset: 2,
                row_offset: 0,
            }
        );
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.acgs.criteria.len(), 26);
        assert!(matches!(
            config.submission_transforms.as_slice(),
            [EnumSubmissionTransformConfig::DrugResponseV1(rule)] if rule.code == "R444"
        ));
    }

    #[test]
    fn test_config_json_invalid() {
        let err = SpecPandoraConfig::from_json_str(r#"{"rule_sample_name": "sometimes"}"#)
            .unwrap_err();
        assert!(matches!(err, WorkbookError::Config(_)));
    }

    #[test]
    fn test_cell_value_text_rendering() {
        assert_eq!(EnumCellValue::Number(9.0).to_text().as_deref(), Some("9"));
        assert_eq!(EnumCellValue::Number(2.5).to_text().as_deref(), Some("2.5"));
        assert_eq!(EnumCellValue::None.to_text(), None);
        assert_eq!(EnumCellValue::String("12".to_string()).to_i64(), Some(12));
        assert_eq!(EnumCellValue::Number(1.5).to_i64(), None);
    }

    #[test]
    fn test_cell_address_offset() {
        let address = SpecCellAddress::new(4, 0);
        assert_eq!(address.offset(0, 1), Some(SpecCellAddress::new(4, 1)));
        assert_eq!(address.offset(-5, 0), None);
    }

    #[test]
    fn test_uninterpreted_record_has_empty_criteria_columns() {
        let record = SpecMergedVariantRecord::default();
        let l_values = record.to_column_values(&["PVS1".to_string()]);
        let dict_values: BTreeMap<_, _> = l_values.into_iter().collect();
        assert_eq!(dict_values["pvs1"], EnumCellValue::None);
        assert_eq!(dict_values["pvs1_evidence"], EnumCellValue::None);
        assert_eq!(dict_values["germline_classification"], EnumCellValue::None);
    }
}
