//! Top-level workbook extraction entry points.

use std::path::Path;

use chrono::NaiveDate;
use log::info;

use crate::extract::{
    extract_included, extract_interpretation_table, extract_summary, extract_variant_count,
};
use crate::merge::merge_records;
use crate::reader::{WorkbookSource, load_workbook};
use crate::spec::{SpecMergedVariantRecord, SpecPandoraConfig, WorkbookError};
use crate::util::derive_folder_name;
use crate::validate::{validate_interpreted_column, validate_layout};

/// Run the full pipeline over one workbook.
///
/// Stages run in order and the first terminal error stops the workbook:
/// layout check, summary, included table, interpretations (gated by
/// cross-sheet validation), merge and relabel, interpreted-column check.
pub fn extract_workbook_records(
    workbook: &impl WorkbookSource,
    config: &SpecPandoraConfig,
    folder_name: &str,
    date_today: NaiveDate,
) -> Result<Vec<SpecMergedVariantRecord>, WorkbookError> {
    validate_layout(workbook, config)?;

    let summary = extract_summary(workbook, config, folder_name, date_today).into_result()?;
    let n_variants = extract_variant_count(workbook, config)?;
    let l_included = extract_included(workbook, config, n_variants)?;
    let l_interps = extract_interpretation_table(workbook, config, &l_included).into_result()?;

    let l_merged = merge_records(&l_included, &summary, &l_interps, &config.acgs);
    if let Some(msg) = validate_interpreted_column(&l_merged) {
        return Err(WorkbookError::Validation(msg));
    }

    info!(
        "Extracted {} variant records ({} interpreted sheets) for sample {}",
        l_merged.len(),
        l_interps.len(),
        summary.sample.specimen_id
    );
    Ok(l_merged)
}

/// Load a workbook file and extract its records.
///
/// The site folder is the basename of the file's parent directory.
pub fn parse_workbook_file(
    path: impl AsRef<Path>,
    config: &SpecPandoraConfig,
    date_today: NaiveDate,
) -> Result<Vec<SpecMergedVariantRecord>, WorkbookError> {
    let path = path.as_ref();
    let folder_name = derive_folder_name(path).unwrap_or_default();
    let workbook = load_workbook(path)?;
    extract_workbook_records(&workbook, config, &folder_name, date_today)
}
