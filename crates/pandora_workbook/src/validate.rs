//! Layout, cross-sheet and interpreted-column validators.

use std::collections::BTreeSet;

use log::warn;

use crate::extract::derive_interpret_sheet_names;
use crate::reader::WorkbookSource;
use crate::spec::{
    SpecAcgsConfig, SpecAnchorCell, SpecIncludedVariant, SpecInterpretationRecord,
    SpecMergedVariantRecord, SpecPandoraConfig, WorkbookError,
};

/// Separator between per-row cross-sheet messages.
const C_SEP_INTERPRET_MSGS: &str = "; ";
/// Separator between interpreted-column messages.
const C_SEP_INTERPRETED_MSGS: &str = " ";

fn check_anchors(
    workbook: &impl WorkbookSource,
    sheet: &str,
    anchors: &[SpecAnchorCell],
) -> Result<bool, WorkbookError> {
    for anchor in anchors {
        let value = workbook.read_cell_a1(sheet, &anchor.address)?;
        if value.to_text().as_deref() != Some(anchor.expected.as_str()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Probe the template anchor cells of the summary and every interpretation sheet.
pub fn validate_layout(workbook: &impl WorkbookSource, config: &SpecPandoraConfig) -> Result<(), WorkbookError> {
    let layout = &config.layout;
    let sheet_summary = config.summary.sheet_name.as_str();
    if !workbook.has_sheet(sheet_summary) {
        return Err(WorkbookError::MissingSheet(sheet_summary.to_string()));
    }
    if !check_anchors(workbook, sheet_summary, &layout.summary_anchors)? {
        return Err(WorkbookError::LayoutDrift(layout.msg_summary.clone()));
    }
    for sheet in derive_interpret_sheet_names(workbook, config) {
        if !check_anchors(workbook, &sheet, &layout.interpret_anchors)? {
            return Err(WorkbookError::LayoutDrift(layout.msg_interpret.clone()));
        }
    }
    Ok(())
}

/// First rule a single interpretation row violates.
fn check_interpret_row(
    record: &SpecInterpretationRecord,
    set_hgvsc_included: &BTreeSet<&str>,
    acgs: &SpecAcgsConfig,
) -> Option<String> {
    let Some(classification) = record.germline_classification.as_deref() else {
        return Some("empty ACMG classification in interpret table".to_string());
    };
    if !acgs.classifications.iter().any(|val| val == classification) {
        return Some("wrong ACMG classification in interpret table".to_string());
    }
    let Some(hgvsc) = record.hgvsc.as_deref() else {
        return Some("empty HGVSc in interpret table".to_string());
    };
    if !set_hgvsc_included.contains(hgvsc) {
        return Some(
            "HGVSc in interpret table does not match with that in included sheet".to_string(),
        );
    }
    for criterion in &acgs.criteria {
        let Some(call) = record.criterion(&criterion.name) else {
            continue;
        };
        if let Some(strength) = call.strength.as_deref()
            && !acgs
                .allowed_strengths(criterion)
                .iter()
                .any(|val| val == strength)
        {
            return Some(format!("Wrong strength in {}", criterion.name));
        }
    }
    None
}

/// Cross-check interpretation rows against the included table.
///
/// Each row reports its first violated rule; messages from all rows are
/// collected into one string.
pub fn validate_interpret_table(
    records: &[SpecInterpretationRecord],
    included: &[SpecIncludedVariant],
    acgs: &SpecAcgsConfig,
) -> Option<String> {
    let set_hgvsc_included: BTreeSet<&str> = included
        .iter()
        .filter_map(|variant| variant.hgvsc.as_deref())
        .collect();
    let l_msgs: Vec<String> = records
        .iter()
        .filter_map(|record| {
            let msg = check_interpret_row(record, &set_hgvsc_included, acgs)?;
            warn!("Interpret sheet {}: {msg}", record.sheet_name);
            Some(msg)
        })
        .collect();
    if l_msgs.is_empty() {
        None
    } else {
        Some(l_msgs.join(C_SEP_INTERPRET_MSGS))
    }
}

/// Check each merged row's interpreted flag against its classification.
///
/// Row numbers are 1-based positions in the merged table.
pub fn validate_interpreted_column(records: &[SpecMergedVariantRecord]) -> Option<String> {
    let mut l_msgs = Vec::new();
    for (row_idx, record) in records.iter().enumerate() {
        let n_row = row_idx + 1;
        let if_classified = record.germline_classification().is_some();
        match record.variant.interpreted.as_deref() {
            Some("yes") if !if_classified => {
                l_msgs.push(format!(
                    "Wrong interpreted column in row {n_row} of included sheet"
                ));
            }
            Some("yes") => {}
            Some("no") if if_classified => {
                l_msgs.push(format!(
                    "Wrong interpreted column in row {n_row} of included sheet"
                ));
            }
            Some("no") => {}
            _ => {
                l_msgs.push(format!(
                    "Wrong interpreted column dropdown in row {n_row} of included sheet"
                ));
            }
        }
    }
    if l_msgs.is_empty() {
        None
    } else {
        Some(l_msgs.join(C_SEP_INTERPRETED_MSGS))
    }
}
