//! Stateless helper utilities used by the workbook extraction kernel.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use uuid::Uuid;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{
    EnumCellValue, SpecAcgsConfig, SpecCellAddress, SpecCriterionCall, SpecSampleIdentifier,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellAddress

/// Convert column letters (`"A"`, `"AB"`) to a zero-based column index.
pub fn parse_column_letters(letters: &str) -> Result<usize, String> {
    if letters.is_empty() {
        return Err("Column letters are empty.".to_string());
    }
    let mut n_col: usize = 0;
    for chr in letters.chars() {
        if !chr.is_ascii_alphabetic() {
            return Err(format!("Invalid column letters: {letters}"));
        }
        let n_digit = (chr.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n_col = n_col
            .checked_mul(26)
            .and_then(|val| val.checked_add(n_digit))
            .ok_or_else(|| format!("Column letters overflow: {letters}"))?;
    }
    Ok(n_col - 1)
}

/// Convert a zero-based column index to column letters.
pub fn derive_column_letters(col_idx: usize) -> String {
    let mut l_chars = Vec::new();
    let mut n_rest = col_idx + 1;
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Parse an A1-style address into zero-based row/column.
pub fn parse_cell_address(address: &str) -> Result<SpecCellAddress, String> {
    let address = address.trim().replace('$', "");
    let idx_digit = address
        .find(|chr: char| chr.is_ascii_digit())
        .ok_or_else(|| format!("Cell address has no row number: {address}"))?;
    let (c_letters, c_digits) = address.split_at(idx_digit);
    let col = parse_column_letters(c_letters)?;
    let n_row_1based = c_digits
        .parse::<usize>()
        .map_err(|_| format!("Invalid row number in cell address: {address}"))?;
    if n_row_1based == 0 {
        return Err(format!("Row numbers start at 1: {address}"));
    }
    Ok(SpecCellAddress::new(n_row_1based - 1, col))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SampleIdentifier

static RE_INSTRUMENT_ID: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\d{9}$"));
static RE_SPECIMEN_ID: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\d{5}[A-Z]\d{4}$"));
static RE_BATCH_ID: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\d{2}[A-Z]{5}\d+$"));
static RE_TEST_CODE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\d{4}$"));

fn is_match(re: &LazyLock<Result<Regex, regex::Error>>, value: &str) -> bool {
    re.as_ref().is_ok_and(|re| re.is_match(value))
}

/// Split a sample identifier into its six hyphen-separated parts.
///
/// The fifth part carries no information and is dropped.
pub fn split_sample_identifier(sample_id: &str) -> Result<SpecSampleIdentifier, String> {
    let l_parts: Vec<&str> = sample_id.split('-').collect();
    let [instrument, specimen, batch, test_code, _, probeset] = l_parts.as_slice() else {
        return Err(format!(
            "Sample name \"{sample_id}\" does not have 6 \"-\" separated parts"
        ));
    };
    Ok(SpecSampleIdentifier {
        instrument_id: instrument.to_string(),
        specimen_id: specimen.to_string(),
        batch_id: batch.to_string(),
        test_code: test_code.to_string(),
        probeset_id: probeset.to_string(),
    })
}

/// Check sample identifier parts; return the first failing rule's message.
pub fn check_sample_name(sample: &SpecSampleIdentifier) -> Option<String> {
    if !is_match(&RE_INSTRUMENT_ID, &sample.instrument_id) {
        return Some("Unusual name for instrumentID".to_string());
    }
    if !is_match(&RE_SPECIMEN_ID, &sample.specimen_id) {
        return Some("Unusual sampleID".to_string());
    }
    if !is_match(&RE_BATCH_ID, &sample.batch_id) {
        return Some("Unusual batchID".to_string());
    }
    if !is_match(&RE_TEST_CODE, &sample.test_code) {
        return Some("Unusual testcode".to_string());
    }
    let n_len_probeset = sample.probeset_id.chars().count();
    if !(0 < n_len_probeset && n_len_probeset < 20) {
        return Some("probesetID is too long/short".to_string());
    }
    let if_alnum = sample.probeset_id.chars().all(char::is_alphanumeric);
    let if_has_non_alpha = sample.probeset_id.chars().any(|chr| !chr.is_alphabetic());
    if !(if_alnum && if_has_non_alpha) {
        return Some("Unusual probesetID".to_string());
    }
    None
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SummaryFields

/// Split `"<code>_<name>;<code>_<name>"` into semicolon-joined codes and names.
///
/// Each segment splits on its first `_`; order is preserved.
pub fn split_clinical_indication(text: &str) -> Result<(String, String), String> {
    let mut l_codes = Vec::new();
    let mut l_names = Vec::new();
    for segment in text.split(';') {
        let segment = segment.trim();
        let Some((code, name)) = segment.split_once('_') else {
            return Err(segment.to_string());
        };
        l_codes.push(code);
        l_names.push(name);
    }
    Ok((l_codes.join(";"), l_names.join(";")))
}

const TUP_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];
const TUP_DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %B %Y", "%d %b %Y",
];

/// Parse date text in ISO or UK day-first forms; time of day is dropped.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    for fmt in TUP_DATETIME_FORMATS {
        if let Ok(val) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(val.date());
        }
    }
    TUP_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Resolve the evaluation date cell, substituting `date_today` for a blank cell.
///
/// Returns the offending text on failure.
pub fn parse_date_evaluated(value: &EnumCellValue, date_today: NaiveDate) -> Result<NaiveDate, String> {
    match value {
        EnumCellValue::None => Ok(date_today),
        EnumCellValue::DateTime(val) => Ok(val.date()),
        EnumCellValue::String(val) if val.trim().is_empty() => Ok(date_today),
        EnumCellValue::String(val) => parse_date_text(val).ok_or_else(|| val.clone()),
        other => Err(other.to_text().unwrap_or_default()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Identifiers

/// Generate a fresh linking identifier (`uid_<uuid>`).
pub fn derive_linking_id() -> String {
    format!("uid_{}", Uuid::new_v4().simple())
}

/// Basename of the directory holding `path`.
pub fn derive_folder_name(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().to_string())
}

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Classification

/// Build the comma-joined summary of applied criteria.
///
/// A criterion is named alone when its strength equals its default strength,
/// and as `<name>_<strength>` otherwise.
pub fn derive_classification_comment(criteria: &[SpecCriterionCall], acgs: &SpecAcgsConfig) -> String {
    criteria
        .iter()
        .filter_map(|call| {
            let strength = call.strength.as_deref()?;
            let c_default = acgs
                .criteria
                .iter()
                .find(|criterion| criterion.name == call.name)
                .map(|criterion| criterion.strength_default.as_str());
            if c_default == Some(strength) {
                Some(call.name.clone())
            } else {
                Some(format!("{}_{strength}", call.name))
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Casing expected by the submission format; unknown labels pass through.
pub fn relabel_classification(label: &str, acgs: &SpecAcgsConfig) -> String {
    acgs.classification_relabels
        .get(label)
        .cloned()
        .unwrap_or_else(|| label.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::derive_default_acgs;

    fn call(name: &str, strength: Option<&str>) -> SpecCriterionCall {
        SpecCriterionCall {
            name: name.to_string(),
            strength: strength.map(str::to_string),
            evidence: None,
        }
    }

    #[test]
    fn test_cell_address_round_trip_letters() {
        assert_eq!(parse_column_letters("A").unwrap(), 0);
        assert_eq!(parse_column_letters("Z").unwrap(), 25);
        assert_eq!(parse_column_letters("AA").unwrap(), 26);
        assert_eq!(derive_column_letters(27), "AB");
        assert_eq!(parse_cell_address("B1").unwrap(), SpecCellAddress::new(0, 1));
        assert_eq!(parse_cell_address("$G$22").unwrap(), SpecCellAddress::new(21, 6));
        assert_eq!(SpecCellAddress::new(37, 2).to_string(), "C38");
    }

    #[test]
    fn test_parse_cell_address_rejects_malformed() {
        assert!(parse_cell_address("B").is_err());
        assert!(parse_cell_address("12").is_err());
        assert!(parse_cell_address("B0").is_err());
        assert!(parse_cell_address("B-1").is_err());
    }

    #[test]
    fn test_split_sample_identifier_requires_six_parts() {
        let sample = split_sample_identifier("123456789-23053R0001-23NGWES1-9527-F-99347387").unwrap();
        assert_eq!(sample.instrument_id, "123456789");
        assert_eq!(sample.specimen_id, "23053R0001");
        assert_eq!(sample.batch_id, "23NGWES1");
        assert_eq!(sample.test_code, "9527");
        assert_eq!(sample.probeset_id, "99347387");

        assert!(split_sample_identifier("a-b-c").is_err());
    }

    #[test]
    fn test_check_sample_name_reports_first_failure() {
        let sample = split_sample_identifier("123456789-23053R0001-23NGWES1-9527-F-99347387").unwrap();
        assert_eq!(check_sample_name(&sample), None);

        let mut bad = sample.clone();
        bad.instrument_id = "12345".to_string();
        bad.specimen_id = "x".to_string();
        assert_eq!(
            check_sample_name(&bad).as_deref(),
            Some("Unusual name for instrumentID")
        );

        let mut bad = sample.clone();
        bad.batch_id = "23NGWES".to_string();
        assert_eq!(check_sample_name(&bad).as_deref(), Some("Unusual batchID"));

        let mut bad = sample.clone();
        bad.probeset_id = "P".repeat(20);
        assert_eq!(
            check_sample_name(&bad).as_deref(),
            Some("probesetID is too long/short")
        );

        let mut bad = sample.clone();
        bad.probeset_id = "abcdef".to_string();
        assert_eq!(check_sample_name(&bad).as_deref(), Some("Unusual probesetID"));

        let mut bad = sample;
        bad.probeset_id = "ab_12".to_string();
        assert_eq!(check_sample_name(&bad).as_deref(), Some("Unusual probesetID"));
    }

    #[test]
    fn test_split_clinical_indication_pairs_codes_and_names() {
        assert_eq!(
            split_clinical_indication("R208.1_Inherited breast cancer").unwrap(),
            ("R208.1".to_string(), "Inherited breast cancer".to_string())
        );
        assert_eq!(
            split_clinical_indication("R141_Monogenic hearing loss;R444_Cancer_drug").unwrap(),
            (
                "R141;R444".to_string(),
                "Monogenic hearing loss;Cancer_drug".to_string()
            )
        );
        assert_eq!(
            split_clinical_indication("R141_A;nocode").unwrap_err(),
            "nocode"
        );
    }

    #[test]
    fn test_parse_date_evaluated_defaults_and_formats() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_date_evaluated(&EnumCellValue::None, today), Ok(today));
        assert_eq!(
            parse_date_evaluated(&EnumCellValue::String("2023-11-07".to_string()), today),
            Ok(NaiveDate::from_ymd_opt(2023, 11, 7).unwrap())
        );
        assert_eq!(
            parse_date_evaluated(&EnumCellValue::String("07/11/2023".to_string()), today),
            Ok(NaiveDate::from_ymd_opt(2023, 11, 7).unwrap())
        );
        let dt = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();
        assert_eq!(
            parse_date_evaluated(&EnumCellValue::DateTime(dt), today),
            Ok(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap())
        );
        assert_eq!(
            parse_date_evaluated(&EnumCellValue::String("tomorrow".to_string()), today),
            Err("tomorrow".to_string())
        );
    }

    #[test]
    fn test_classification_comment_omits_default_strength() {
        let acgs = derive_default_acgs();
        let l_calls = vec![
            call("PVS1", None),
            call("PM3", Some("Supporting")),
            call("PP3", Some("Supporting")),
        ];
        assert_eq!(derive_classification_comment(&l_calls, &acgs), "PM3_Supporting,PP3");

        let l_calls = vec![call("PVS1", Some("Very Strong")), call("PS4", Some("Moderate"))];
        assert_eq!(derive_classification_comment(&l_calls, &acgs), "PVS1,PS4_Moderate");
        assert_eq!(derive_classification_comment(&[call("BA1", None)], &acgs), "");
    }

    #[test]
    fn test_classification_comment_benign_strong_defaults_to_supporting() {
        let acgs = derive_default_acgs();
        let l_calls = vec![call("BS1", Some("Supporting")), call("BS2", Some("Strong"))];
        assert_eq!(derive_classification_comment(&l_calls, &acgs), "BS1,BS2_Strong");
    }

    #[test]
    fn test_linking_id_and_folder_name() {
        let c_id_a = derive_linking_id();
        let c_id_b = derive_linking_id();
        assert!(c_id_a.starts_with("uid_"));
        assert_ne!(c_id_a, c_id_b);
        assert_eq!(
            derive_folder_name("/data/workbooks/CUH/sample.xlsx").as_deref(),
            Some("CUH")
        );
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("run/2024:[a]", "_"), "run_2024__a_");
        assert_eq!(sanitize_sheet_name("   ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
    }

    #[test]
    fn test_relabel_classification() {
        let acgs = derive_default_acgs();
        assert_eq!(relabel_classification("Likely Pathogenic", &acgs), "Likely pathogenic");
        assert_eq!(relabel_classification("Pathogenic", &acgs), "Pathogenic");
    }
}
