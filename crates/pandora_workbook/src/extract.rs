//! Summary, included-variant and interpretation extractors.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::conf::C_REF_GENOME_UNDEFINED;
use crate::reader::{WorkbookSource, locate_field};
use crate::spec::{
    EnumCellLocator, EnumCellValue, EnumSampleNameRule, SpecAcgsConfig, SpecCriterionCall,
    SpecExtraction, SpecIncludedVariant, SpecInterpretationRecord, SpecPandoraConfig,
    SpecSummaryRecord, WorkbookError,
};
use crate::util::{
    check_sample_name, derive_classification_comment, derive_linking_id, parse_date_evaluated,
    split_clinical_indication, split_sample_identifier,
};
use crate::validate::validate_interpret_table;

////////////////////////////////////////////////////////////////////////////////
// #region Summary

fn read_required_text(
    workbook: &impl WorkbookSource,
    sheet: &str,
    field: &str,
    locator: &EnumCellLocator,
) -> Result<String, WorkbookError> {
    locate_field(workbook, sheet, locator)?
        .to_text()
        .ok_or_else(|| WorkbookError::MissingField {
            sheet: sheet.to_string(),
            field: field.to_string(),
        })
}

/// Extract workbook-wide summary fields.
///
/// On failure the record holds every field read before the failing step.
pub fn extract_summary(
    workbook: &impl WorkbookSource,
    config: &SpecPandoraConfig,
    folder_name: &str,
    date_today: NaiveDate,
) -> SpecExtraction<SpecSummaryRecord> {
    let mut record = SpecSummaryRecord::default();
    match fill_summary(workbook, config, folder_name, date_today, &mut record) {
        Ok(()) => SpecExtraction::ok(record),
        Err(err) => SpecExtraction::failed(record, err),
    }
}

fn fill_summary(
    workbook: &impl WorkbookSource,
    config: &SpecPandoraConfig,
    folder_name: &str,
    date_today: NaiveDate,
    record: &mut SpecSummaryRecord,
) -> Result<(), WorkbookError> {
    let conf_summary = &config.summary;
    let sheet = conf_summary.sheet_name.as_str();
    if !workbook.has_sheet(sheet) {
        return Err(WorkbookError::MissingSheet(sheet.to_string()));
    }

    let c_sample_id = read_required_text(workbook, sheet, "sample_id", &conf_summary.sample_id)?;
    record.sample = split_sample_identifier(c_sample_id.trim()).map_err(WorkbookError::SampleIdentifier)?;

    let c_indication = read_required_text(
        workbook,
        sheet,
        "clinical_indication",
        &conf_summary.clinical_indication,
    )?;
    let (r_code, condition_names) =
        split_clinical_indication(&c_indication).map_err(WorkbookError::ClinicalIndication)?;
    record.r_code = r_code;
    record.preferred_condition_name = condition_names;

    record.panel = locate_field(workbook, sheet, &conf_summary.panel)?.to_text();
    record.ref_genome = locate_field(workbook, sheet, &conf_summary.ref_genome)?
        .to_text()
        .unwrap_or_else(|| C_REF_GENOME_UNDEFINED.to_string());

    let if_skip_sample_check = config
        .find_site_by_folder(folder_name)
        .is_some_and(|site| site.if_unusual_sample_name);
    if !if_skip_sample_check && let Some(msg) = check_sample_name(&record.sample) {
        match config.rule_sample_name {
            EnumSampleNameRule::Warn => {
                warn!("Sample name {c_sample_id}: {msg}");
                record.sample_name_warning = Some(msg);
            }
            EnumSampleNameRule::Block => return Err(WorkbookError::SampleIdentifier(msg)),
        }
    }

    let value_date = locate_field(workbook, sheet, &conf_summary.date_evaluated)?;
    record.date_last_evaluated = Some(
        parse_date_evaluated(&value_date, date_today)
            .map_err(|value| WorkbookError::DateFormat { value })?,
    );

    record.info = Some(config.info.clone());

    let site = config
        .find_site_by_folder(folder_name)
        .ok_or_else(|| WorkbookError::UnknownSite {
            folder: folder_name.to_string(),
        })?;
    record.organisation = Some(site.organisation.clone());
    record.organisation_id = Some(site.organisation_id.clone());
    Ok(())
}

/// Row count of the included table as recorded on the summary sheet.
///
/// A blank count cell means "read every row".
pub fn extract_variant_count(
    workbook: &impl WorkbookSource,
    config: &SpecPandoraConfig,
) -> Result<Option<usize>, WorkbookError> {
    let value = locate_field(workbook, &config.summary.sheet_name, &config.summary.n_variants)?;
    if value.is_none() {
        return Ok(None);
    }
    let n_variants = value.to_i64().ok_or_else(|| WorkbookError::MissingField {
        sheet: config.summary.sheet_name.clone(),
        field: "n_variants".to_string(),
    })?;
    let n_variants = usize::try_from(n_variants).map_err(|_| {
        WorkbookError::Validation(format!(
            "Variant count {n_variants} on summary sheet is negative"
        ))
    })?;
    Ok(Some(n_variants))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Included

/// Read the included table and assign one linking identifier per row.
pub fn extract_included(
    workbook: &impl WorkbookSource,
    config: &SpecPandoraConfig,
    n_variants: Option<usize>,
) -> Result<Vec<SpecIncludedVariant>, WorkbookError> {
    let conf_included = &config.included;
    if !workbook.has_sheet(&conf_included.sheet_name) {
        return Err(WorkbookError::MissingSheet(conf_included.sheet_name.clone()));
    }
    let l_rows = workbook.read_table(
        &conf_included.sheet_name,
        &conf_included.columns.headers(),
        n_variants,
    )?;

    let l_variants = l_rows
        .into_iter()
        .map(|row| {
            let text = |idx: usize| row.get(idx).and_then(EnumCellValue::to_text);
            let c_id = derive_linking_id();
            SpecIncludedVariant {
                chromosome: text(0),
                start: row.get(1).and_then(EnumCellValue::to_i64),
                reference_allele: text(2),
                alternate_allele: text(3),
                gene_symbol: text(4),
                hgvsc: text(5),
                consequence: text(6),
                interpreted: text(7).map(|val| val.to_lowercase()),
                comment: text(8),
                local_id: c_id.clone(),
                linking_id: c_id,
            }
        })
        .collect::<Vec<_>>();
    debug!("Read {} included variants", l_variants.len());
    Ok(l_variants)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Interpretation

/// Interpretation sheet names in workbook order.
pub fn derive_interpret_sheet_names(workbook: &impl WorkbookSource, config: &SpecPandoraConfig) -> Vec<String> {
    let c_prefix = config.interpret.sheet_prefix.to_lowercase();
    workbook
        .sheet_names()
        .into_iter()
        .filter(|name| name.to_lowercase().starts_with(&c_prefix))
        .collect()
}

/// Read every interpretation sheet at the configured field cells, unnormalized.
pub fn extract_interpretations_raw(
    workbook: &impl WorkbookSource,
    config: &SpecPandoraConfig,
) -> Result<Vec<SpecInterpretationRecord>, WorkbookError> {
    let mut l_records = Vec::new();
    for sheet in derive_interpret_sheet_names(workbook, config) {
        let mut dict_fields: BTreeMap<&str, Option<String>> = BTreeMap::new();
        for field_cell in &config.interpret.field_cells {
            let value = workbook.read_cell_a1(&sheet, &field_cell.address)?;
            dict_fields.insert(field_cell.field.as_str(), value.to_text());
        }
        let take = |field: &str| dict_fields.get(field).cloned().flatten();

        let criteria = config
            .acgs
            .criteria
            .iter()
            .map(|criterion| SpecCriterionCall {
                name: criterion.name.clone(),
                strength: take(criterion.field_strength().as_str()),
                evidence: take(criterion.field_evidence().as_str()),
            })
            .collect();

        l_records.push(SpecInterpretationRecord {
            sheet_name: sheet.clone(),
            associated_disease: take("associated_disease"),
            known_inheritance: take("known_inheritance"),
            prevalence: take("prevalence"),
            hgvsc: take("hgvsc"),
            germline_classification: take("germline_classification"),
            criteria,
            comment_on_classification: None,
        });
    }
    Ok(l_records)
}

/// Null the "not applicable" strength, drop orphan evidence, derive the comment.
pub fn normalize_interpretation(
    mut record: SpecInterpretationRecord,
    acgs: &SpecAcgsConfig,
) -> SpecInterpretationRecord {
    for call in &mut record.criteria {
        if call.strength.as_deref() == Some(acgs.strength_not_applicable.as_str()) {
            call.strength = None;
        }
        if call.strength.is_none() {
            call.evidence = None;
        }
    }
    record.comment_on_classification = Some(derive_classification_comment(&record.criteria, acgs));
    record
}

/// Extract interpretations gated by cross-sheet validation.
///
/// When validation fails the raw rows come back with the error and no
/// normalization is applied.
pub fn extract_interpretation_table(
    workbook: &impl WorkbookSource,
    config: &SpecPandoraConfig,
    included: &[SpecIncludedVariant],
) -> SpecExtraction<Vec<SpecInterpretationRecord>> {
    let l_raw = match extract_interpretations_raw(workbook, config) {
        Ok(val) => val,
        Err(err) => return SpecExtraction::failed(Vec::new(), err),
    };
    if !l_raw.is_empty()
        && let Some(msg) = validate_interpret_table(&l_raw, included, &config.acgs)
    {
        return SpecExtraction::failed(l_raw, WorkbookError::Validation(msg));
    }
    SpecExtraction::ok(
        l_raw
            .into_iter()
            .map(|record| normalize_interpretation(record, &config.acgs))
            .collect(),
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::derive_default_pandora_config;
    use crate::test_support::{C_HGVSC_BRCA1, C_HGVSC_BRCA2, build_template_workbook};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn test_extract_summary_reads_template() {
        let workbook = build_template_workbook();
        let config = derive_default_pandora_config();
        let extraction = extract_summary(&workbook, &config, "CUH", today());
        assert!(extraction.is_ok(), "{:?}", extraction.error);

        let record = extraction.data;
        assert_eq!(record.sample.instrument_id, "123456789");
        assert_eq!(record.sample.probeset_id, "99347387");
        assert_eq!(record.r_code, "R208.1");
        assert_eq!(
            record.preferred_condition_name,
            "Inherited breast cancer and ovarian cancer"
        );
        assert_eq!(record.ref_genome, "GRCh37.p13");
        assert_eq!(record.date_last_evaluated, NaiveDate::from_ymd_opt(2023, 11, 7));
        assert_eq!(record.organisation_id.as_deref(), Some("288359"));
        assert_eq!(record.info.unwrap().allele_origin, "germline");
        assert_eq!(record.sample_name_warning, None);
    }

    #[test]
    fn test_extract_summary_missing_date_defaults_to_today() {
        let mut workbook = build_template_workbook();
        workbook
            .sheet_mut("summary")
            .unwrap()
            .set_a1("G22", EnumCellValue::None)
            .unwrap();
        let config = derive_default_pandora_config();
        let record = extract_summary(&workbook, &config, "CUH", today())
            .into_result()
            .unwrap();
        assert_eq!(record.date_last_evaluated, Some(today()));
    }

    #[test]
    fn test_extract_summary_bad_date_keeps_partial_record() {
        let mut workbook = build_template_workbook();
        workbook
            .sheet_mut("summary")
            .unwrap()
            .set_text("G22", "next week")
            .unwrap();
        let config = derive_default_pandora_config();
        let extraction = extract_summary(&workbook, &config, "CUH", today());
        assert_eq!(
            extraction.error.as_ref().map(ToString::to_string).as_deref(),
            Some("Value for date last evaluated \"next week\" is not compatible with datetime conversion")
        );
        assert_eq!(extraction.data.r_code, "R208.1");
        assert_eq!(extraction.data.date_last_evaluated, None);
        assert_eq!(extraction.data.organisation, None);
    }

    #[test]
    fn test_extract_summary_unknown_folder() {
        let workbook = build_template_workbook();
        let config = derive_default_pandora_config();
        let err = extract_summary(&workbook, &config, "elsewhere", today())
            .into_result()
            .unwrap_err();
        assert_eq!(
            err,
            WorkbookError::UnknownSite {
                folder: "elsewhere".to_string()
            }
        );
    }

    #[test]
    fn test_extract_summary_sample_name_policy() {
        let mut workbook = build_template_workbook();
        workbook
            .sheet_mut("summary")
            .unwrap()
            .set_text("B1", "12-23053R0001-23NGWES1-9527-F-99347387")
            .unwrap();
        let mut config = derive_default_pandora_config();

        let record = extract_summary(&workbook, &config, "CUH", today())
            .into_result()
            .unwrap();
        assert_eq!(
            record.sample_name_warning.as_deref(),
            Some("Unusual name for instrumentID")
        );

        // NUH names are nonstandard and never checked.
        let record = extract_summary(&workbook, &config, "NUH", today())
            .into_result()
            .unwrap();
        assert_eq!(record.sample_name_warning, None);

        config.rule_sample_name = EnumSampleNameRule::Block;
        let err = extract_summary(&workbook, &config, "CUH", today())
            .into_result()
            .unwrap_err();
        assert_eq!(
            err,
            WorkbookError::SampleIdentifier("Unusual name for instrumentID".to_string())
        );
    }

    #[test]
    fn test_extract_summary_missing_reference_label() {
        let mut workbook = build_template_workbook();
        workbook
            .sheet_mut("summary")
            .unwrap()
            .set_a1("A20", EnumCellValue::None)
            .unwrap();
        let config = derive_default_pandora_config();
        let record = extract_summary(&workbook, &config, "CUH", today())
            .into_result()
            .unwrap();
        assert_eq!(record.ref_genome, "not_defined");
    }

    #[test]
    fn test_extract_included_renames_and_lowercases() {
        let workbook = build_template_workbook();
        let config = derive_default_pandora_config();
        let n_variants = extract_variant_count(&workbook, &config).unwrap();
        assert_eq!(n_variants, Some(2));

        let l_variants = extract_included(&workbook, &config, n_variants).unwrap();
        assert_eq!(l_variants.len(), 2);
        assert_eq!(l_variants[0].chromosome.as_deref(), Some("17"));
        assert_eq!(l_variants[0].start, Some(43045712));
        assert_eq!(l_variants[0].hgvsc.as_deref(), Some(C_HGVSC_BRCA1));
        assert_eq!(l_variants[0].interpreted.as_deref(), Some("yes"));
        assert_eq!(l_variants[1].interpreted.as_deref(), Some("no"));
        assert_eq!(l_variants[0].local_id, l_variants[0].linking_id);
        assert_ne!(l_variants[0].local_id, l_variants[1].local_id);
    }

    #[test]
    fn test_extract_variant_count_rejects_negative() {
        let mut workbook = build_template_workbook();
        workbook
            .sheet_mut("summary")
            .unwrap()
            .set_a1("C38", EnumCellValue::Integer(-1))
            .unwrap();
        let config = derive_default_pandora_config();
        let err = extract_variant_count(&workbook, &config).unwrap_err();
        assert!(matches!(err, WorkbookError::Validation(ref message) if message.contains("-1")));
    }

    #[test]
    fn test_extract_included_duplicate_rows_keep_count() {
        let mut workbook = build_template_workbook();
        {
            let included = workbook.sheet_mut("included").unwrap();
            for (address, text) in [
                ("A3", "17"),
                ("C3", "G"),
                ("D3", "A"),
                ("E3", "BRCA1"),
                ("F3", C_HGVSC_BRCA1),
                ("G3", "stop_gained"),
                ("H3", "YES"),
            ] {
                included.set_text(address, text).unwrap();
            }
            included.set_a1("B3", EnumCellValue::Integer(43045712)).unwrap();
            included.set_a1("I3", EnumCellValue::None).unwrap();
        }
        let config = derive_default_pandora_config();
        let l_variants = extract_included(&workbook, &config, Some(2)).unwrap();
        assert_eq!(l_variants.len(), 2);
        let strip_ids = |val: &SpecIncludedVariant| SpecIncludedVariant {
            local_id: String::new(),
            linking_id: String::new(),
            ..val.clone()
        };
        assert_eq!(strip_ids(&l_variants[0]), strip_ids(&l_variants[1]));
        assert_ne!(l_variants[0].local_id, l_variants[1].local_id);
    }

    #[test]
    fn test_extract_interpretation_table_normalizes() {
        let workbook = build_template_workbook();
        let config = derive_default_pandora_config();
        let l_included = extract_included(&workbook, &config, Some(2)).unwrap();
        let l_records = extract_interpretation_table(&workbook, &config, &l_included)
            .into_result()
            .unwrap();
        assert_eq!(l_records.len(), 1);

        let record = &l_records[0];
        assert_eq!(record.germline_classification.as_deref(), Some("Likely Pathogenic"));
        assert_eq!(record.hgvsc.as_deref(), Some(C_HGVSC_BRCA1));

        let ps1 = record.criterion("PS1").unwrap();
        assert_eq!((ps1.strength.as_deref(), ps1.evidence.as_deref()), (None, None));
        let ba1 = record.criterion("BA1").unwrap();
        assert_eq!((ba1.strength.as_deref(), ba1.evidence.as_deref()), (None, None));
        // BS1 shares its evidence cell with PM2 but has no strength.
        let bs1 = record.criterion("BS1").unwrap();
        assert_eq!(bs1.evidence, None);
        let pm2 = record.criterion("PM2").unwrap();
        assert_eq!(pm2.evidence.as_deref(), Some("absent from gnomAD"));

        assert_eq!(
            record.comment_on_classification.as_deref(),
            Some("PVS1,PM2_Supporting,PP3")
        );
        assert!(record
            .criteria
            .iter()
            .all(|call| call.strength.as_deref() != Some("NA")));
    }

    #[test]
    fn test_extract_interpretation_table_rejects_unknown_hgvsc() {
        let mut workbook = build_template_workbook();
        workbook
            .sheet_mut("interpret")
            .unwrap()
            .set_text("C26", "Pathogenic")
            .unwrap();
        workbook
            .sheet_mut("interpret")
            .unwrap()
            .set_text("C3", "NM_000000.1:c.1A>G")
            .unwrap();
        let config = derive_default_pandora_config();
        let l_included = extract_included(&workbook, &config, Some(2)).unwrap();
        let extraction = extract_interpretation_table(&workbook, &config, &l_included);
        assert_eq!(
            extraction.error,
            Some(WorkbookError::Validation(
                "HGVSc in interpret table does not match with that in included sheet".to_string()
            ))
        );
        // Raw rows come back untouched.
        assert_eq!(extraction.data.len(), 1);
        assert_eq!(
            extraction.data[0].criterion("PS1").unwrap().strength.as_deref(),
            Some("NA")
        );
        assert_eq!(extraction.data[0].comment_on_classification, None);
    }

    #[test]
    fn test_interpret_sheet_prefix_is_case_insensitive() {
        let mut workbook = build_template_workbook();
        let mut second = workbook.sheet("interpret").unwrap().clone();
        second.name = "Interpret (2)".to_string();
        second.set_text("C3", C_HGVSC_BRCA2).unwrap();
        workbook.add_sheet(second);
        let config = derive_default_pandora_config();
        assert_eq!(
            derive_interpret_sheet_names(&workbook, &config),
            vec!["interpret".to_string(), "Interpret (2)".to_string()]
        );
    }
}
