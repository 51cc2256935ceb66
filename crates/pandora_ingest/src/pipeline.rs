//! Ingest, poll and submit orchestration over a storage gateway.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::{info, warn};
use pandora_workbook::{
    ReviewXlsxWriter, SpecMergedVariantRecord, SpecPandoraConfig, WorkbookError, WorkbookSource,
    extract_workbook_records, load_workbook,
};
use serde_json::Value;

use crate::clinvar::{
    SpecSubmissionCandidate, SubmissionClient, collect_clinvar_submissions,
    derive_submission_body, process_submission_status, select_api_url,
};
use crate::gateway::{DatabaseGateway, EnumReadQuery, EnumWriteOperation};
use crate::report::{ReportIngest, ReportIngestBuilder, ReportSubmit, ReportSubmitBuilder};
use crate::spec::{
    EnumParseStatus, IngestError, SpecIngestOptions, SpecSubmitOptions, SpecWorkbookFile,
    SubmissionError,
};
use crate::transform::{apply_submission_transforms, derive_submission_transforms};

const C_REVIEW_SHEET_NAME: &str = "records";

////////////////////////////////////////////////////////////////////////////////
// #region Ingest

fn _workbook_names(
    gateway: &mut impl DatabaseGateway,
    status: EnumParseStatus,
) -> Result<BTreeSet<String>, IngestError> {
    let l_rows = gateway.query(&EnumReadQuery::WorkbooksByStatus { status })?;
    Ok(l_rows
        .into_iter()
        .filter_map(|mut row| row.remove("workbook_name").flatten())
        .collect())
}

/// Parse new and previously failed workbooks into the variant table.
///
/// Successfully parsed workbooks are skipped without being opened. A
/// workbook failure is stored as its diagnostic and the run continues;
/// storage failures abort the run.
pub fn ingest_workbooks(
    files: &[SpecWorkbookFile],
    gateway: &mut impl DatabaseGateway,
    config: &SpecPandoraConfig,
    options: &SpecIngestOptions,
) -> Result<ReportIngest, IngestError> {
    ingest_workbooks_with_loader(files, gateway, config, options, |path: &Path| {
        load_workbook(path)
    })
}

/// [`ingest_workbooks`] with a caller-supplied workbook loader.
pub fn ingest_workbooks_with_loader<W, L>(
    files: &[SpecWorkbookFile],
    gateway: &mut impl DatabaseGateway,
    config: &SpecPandoraConfig,
    options: &SpecIngestOptions,
    mut loader: L,
) -> Result<ReportIngest, IngestError>
where
    W: WorkbookSource,
    L: FnMut(&Path) -> Result<W, WorkbookError>,
{
    let set_parsed = _workbook_names(gateway, EnumParseStatus::Success)?;
    let set_failed = _workbook_names(gateway, EnumParseStatus::Failed)?;
    let l_criteria_names = config.acgs.criterion_names();

    let mut builder = ReportIngestBuilder::default();
    let mut l_review: Vec<SpecMergedVariantRecord> = Vec::new();
    for file in files {
        builder.add_discovered();
        let name = file.workbook_name.as_str();
        if set_parsed.contains(name) {
            info!("{name} has already been parsed. Skipping...");
            builder.add_skipped();
            continue;
        }
        info!("Parsing {name}...");
        if !set_failed.contains(name) {
            gateway.execute(&EnumWriteOperation::InsertWorkbook {
                workbook_name: name.to_string(),
                datetime_added: options.datetime_run,
                status: EnumParseStatus::Unparsed,
            })?;
        }

        let outcome = loader(&file.path).and_then(|workbook| {
            extract_workbook_records(&workbook, config, &file.folder_name, options.date_today)
        });
        let l_records = match outcome {
            Ok(l_records) => l_records,
            Err(err) => {
                warn!("{name} failed parsing: {err}");
                gateway.execute(&EnumWriteOperation::RecordWorkbookError {
                    workbook_name: name.to_string(),
                    error: err.to_string(),
                })?;
                builder.add_failed(name, err.to_string());
                continue;
            }
        };

        if let Some(warning) = l_records
            .first()
            .and_then(|record| record.summary.sample_name_warning.clone())
        {
            builder.add_warning(format!("{name}: {warning}"));
        }
        if !l_records.is_empty() {
            info!("{} variants to add to {}", l_records.len(), config.database.table_variants);
            let rows = l_records
                .iter()
                .map(|record| record.to_column_values(&l_criteria_names))
                .collect();
            gateway.execute(&EnumWriteOperation::InsertVariants { rows })?;
        }
        gateway.execute(&EnumWriteOperation::MarkWorkbookParsed {
            workbook_name: name.to_string(),
        })?;
        builder.add_parsed(l_records.len() as u64);
        l_review.extend(l_records);
    }

    if let Some(path_review) = &options.path_review_xlsx
        && !l_review.is_empty()
    {
        let mut writer = ReviewXlsxWriter::new(path_review.clone());
        writer.write_records(C_REVIEW_SHEET_NAME, &l_review, &l_criteria_names)?;
        writer.close()?;
        info!("Wrote {} records to {}", l_review.len(), writer.file_out());
    }

    let report = builder.build();
    info!("{report}");
    Ok(report)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Submit

/// Read each site's API key from its configured environment variable.
///
/// Sites without a variable, or whose variable is unset, are left out.
pub fn derive_api_keys_from_env(config: &SpecPandoraConfig) -> BTreeMap<String, String> {
    config
        .sites
        .iter()
        .filter_map(|site| {
            let env_name = site.api_key_env.as_deref()?;
            match std::env::var(env_name) {
                Ok(key) if !key.is_empty() => Some((site.name.clone(), key)),
                _ => {
                    warn!("API key variable {env_name} for site {} is not set", site.name);
                    None
                }
            }
        })
        .collect()
}

/// Fetch status for every outstanding batch and store the outcomes.
///
/// Status-fetch failures are reported per submission ID and do not stop
/// other batches.
pub fn poll_submissions(
    gateway: &mut impl DatabaseGateway,
    client: &impl SubmissionClient,
    config: &SpecPandoraConfig,
    api_keys: &BTreeMap<String, String>,
    options: &SpecSubmitOptions,
) -> Result<ReportSubmit, IngestError> {
    let api_url = select_api_url(options.if_testing, &config.clinvar);
    let mut builder = ReportSubmitBuilder::default();

    for site in &config.sites {
        let l_rows = gateway.query(&EnumReadQuery::VariantsForOrganisation {
            organisation_id: site.organisation_id.clone(),
            if_submitted: true,
            if_exclude: false,
        })?;
        info!(
            "Found {} with submission IDs but no accession IDs for {}",
            l_rows.len(),
            site.name
        );
        if l_rows.is_empty() {
            continue;
        }
        let Some(api_key) = api_keys.get(&site.name) else {
            let err = SubmissionError::MissingApiKey {
                site: site.name.clone(),
            };
            builder.add_error(&site.name, err.to_string());
            continue;
        };

        let set_submission_ids: BTreeSet<String> = l_rows
            .iter()
            .filter_map(|row| row.get("submission_id").cloned().flatten())
            .collect();
        for submission_id in &set_submission_ids {
            builder.add_counts(&["cnt_polled"], 1);
            let (status, response) = match client.fetch_status(api_url, api_key, submission_id) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("Status check for {submission_id} failed: {err}");
                    builder.add_error(submission_id, err.to_string());
                    continue;
                }
            };
            let result = process_submission_status(&status, &response);
            if result.accession_ids.is_empty() && result.errors.is_empty() {
                builder.add_warning(format!("{submission_id}: status {status}, nothing to record"));
            }
            if !result.accession_ids.is_empty() {
                builder.add_counts(&["cnt_accessions"], result.accession_ids.len() as u64);
                gateway.execute(&EnumWriteOperation::RecordAccessionIds {
                    accession_ids: result.accession_ids,
                })?;
            }
            if !result.errors.is_empty() {
                builder.add_counts(&["cnt_rejected"], result.errors.len() as u64);
                gateway.execute(&EnumWriteOperation::RecordSubmissionErrors {
                    errors: result.errors,
                })?;
            }
        }
    }

    Ok(builder.build())
}

fn _derive_failure_message(response: &Value) -> String {
    response
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| response.to_string())
}

/// Submit every site's unsubmitted interpreted variants as one batch.
///
/// In testing mode the test endpoint is used and nothing is recorded.
/// Payload or transport failures are reported per site.
pub fn submit_pending(
    gateway: &mut impl DatabaseGateway,
    client: &impl SubmissionClient,
    config: &SpecPandoraConfig,
    api_keys: &BTreeMap<String, String>,
    options: &SpecSubmitOptions,
) -> Result<ReportSubmit, IngestError> {
    let mut builder = ReportSubmitBuilder::default();
    if options.if_hold_for_review {
        info!("hold_for_review specified. Variants will not be submitted.");
        builder.add_warning("Held for review: no variants submitted".to_string());
        return Ok(builder.build());
    }
    let api_url = select_api_url(options.if_testing, &config.clinvar);
    let l_transforms = derive_submission_transforms(&config.submission_transforms);

    for site in &config.sites {
        let l_rows = gateway.query(&EnumReadQuery::VariantsForOrganisation {
            organisation_id: site.organisation_id.clone(),
            if_submitted: false,
            if_exclude: true,
        })?;
        info!("Found {} interpreted variants to submit for {}", l_rows.len(), site.name);
        if l_rows.is_empty() {
            continue;
        }
        builder.add_counts(&["cnt_candidates"], l_rows.len() as u64);
        let Some(api_key) = api_keys.get(&site.name) else {
            let err = SubmissionError::MissingApiKey {
                site: site.name.clone(),
            };
            builder.add_error(&site.name, err.to_string());
            continue;
        };

        let prepared = l_rows
            .iter()
            .map(SpecSubmissionCandidate::from_row)
            .collect::<Result<Vec<_>, _>>()
            .and_then(|l_candidates| {
                let l_payloads = collect_clinvar_submissions(&l_candidates, &config.ref_genomes)?;
                Ok((l_candidates, l_payloads))
            });
        let (l_candidates, mut l_payloads) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!("Could not build submission for {}: {err}", site.name);
                builder.add_error(&site.name, err.to_string());
                continue;
            }
        };
        for (candidate, payload) in l_candidates.iter().zip(l_payloads.iter_mut()) {
            apply_submission_transforms(&l_transforms, candidate, payload);
        }

        let body = derive_submission_body(&l_payloads, &site.acgs_url);
        if options.if_print_json
            && let Ok(text) = serde_json::to_string_pretty(&body)
        {
            info!("JSON to submit:\n{text}");
        }
        let response = match client.submit(api_url, api_key, &body) {
            Ok(response) => response,
            Err(err) => {
                warn!("Submission for {} failed: {err}", site.name);
                builder.add_error(&site.name, err.to_string());
                continue;
            }
        };

        let l_local_ids: Vec<String> = l_candidates.iter().map(|c| c.local_id.clone()).collect();
        if options.if_testing {
            info!("Test submission for {}: {response}", site.name);
            builder.add_counts(&["cnt_submitted"], l_local_ids.len() as u64);
            builder.add_warning(format!(
                "{}: test submission of {} variants, submission ID not stored",
                site.name,
                l_local_ids.len()
            ));
            continue;
        }
        match response.get("id").and_then(Value::as_str) {
            Some(submission_id) if !submission_id.is_empty() => {
                info!("Submitted {} variants for {} as {submission_id}", l_local_ids.len(), site.name);
                builder.add_counts(&["cnt_submitted"], l_local_ids.len() as u64);
                gateway.execute(&EnumWriteOperation::RecordSubmissionId {
                    submission_id: submission_id.to_string(),
                    local_ids: l_local_ids,
                })?;
            }
            _ => {
                let message = _derive_failure_message(&response);
                warn!("ClinVar rejected submission for {}: {message}", site.name);
                builder.add_error(&site.name, message.clone());
                gateway.execute(&EnumWriteOperation::RecordSubmissionFailure {
                    message,
                    local_ids: l_local_ids,
                })?;
            }
        }
    }

    let report = builder.build();
    info!("{report}");
    Ok(report)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
