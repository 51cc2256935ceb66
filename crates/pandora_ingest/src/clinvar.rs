//! ClinVar submission payloads, API envelope and status handling.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use pandora_workbook::SpecMergedVariantRecord;
use pandora_workbook::spec::SpecClinvarEndpoints;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::gateway::SpecRow;
use crate::spec::SubmissionError;

////////////////////////////////////////////////////////////////////////////////
// #region Candidate

/// Stored variant fields read when building one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSubmissionCandidate {
    pub local_id: String,
    pub linking_id: Option<String>,
    pub chromosome: Option<String>,
    pub start: Option<i64>,
    pub reference_allele: Option<String>,
    pub alternate_allele: Option<String>,
    pub gene_symbol: Option<String>,
    pub germline_classification: Option<String>,
    pub comment_on_classification: Option<String>,
    pub date_last_evaluated: Option<String>,
    pub preferred_condition_name: Option<String>,
    /// Semicolon-joined clinical indication codes.
    pub r_code: Option<String>,
    pub collection_method: Option<String>,
    pub allele_origin: Option<String>,
    pub affected_status: Option<String>,
    pub ref_genome: Option<String>,
    pub organisation_id: Option<String>,
}

fn _parse_start(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

impl SpecSubmissionCandidate {
    /// Read a stored variant row; `local_id` is required.
    pub fn from_row(row: &SpecRow) -> Result<Self, SubmissionError> {
        let take = |column: &str| row.get(column).cloned().flatten();
        let Some(local_id) = take("local_id") else {
            return Err(SubmissionError::MissingField {
                field: "local_id".to_string(),
            });
        };
        Ok(Self {
            local_id,
            linking_id: take("linking_id"),
            chromosome: take("chromosome"),
            start: take("start").as_deref().and_then(_parse_start),
            reference_allele: take("reference_allele"),
            alternate_allele: take("alternate_allele"),
            gene_symbol: take("gene_symbol"),
            germline_classification: take("germline_classification"),
            comment_on_classification: take("comment_on_classification"),
            date_last_evaluated: take("date_last_evaluated"),
            preferred_condition_name: take("preferred_condition_name"),
            r_code: take("r_code"),
            collection_method: take("collection_method"),
            allele_origin: take("allele_origin"),
            affected_status: take("affected_status"),
            ref_genome: take("ref_genome"),
            organisation_id: take("organisation_id"),
        })
    }

    /// Build from a freshly merged record, as it would be stored.
    pub fn from_record(record: &SpecMergedVariantRecord) -> Result<Self, SubmissionError> {
        let row: SpecRow = record
            .to_column_values(&[])
            .into_iter()
            .map(|(name, value)| (name, value.to_text()))
            .collect();
        Self::from_row(&row)
    }

    /// Clinical indication codes, trimmed.
    pub fn indication_codes(&self) -> Vec<&str> {
        self.r_code
            .as_deref()
            .map(|codes| codes.split(';').map(str::trim).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Payload

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecClinicalSignificance {
    pub clinical_significance_description: Option<String>,
    pub comment: Option<String>,
    pub date_last_evaluated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecCondition {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecConditionSet {
    pub condition: Vec<SpecCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecObservedIn {
    pub affected_status: Option<String>,
    pub allele_origin: Option<String>,
    pub collection_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecChromosomeCoordinates {
    pub assembly: String,
    pub alternate_allele: Option<String>,
    pub reference_allele: Option<String>,
    pub chromosome: Option<String>,
    pub start: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecGene {
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecVariant {
    pub chromosome_coordinates: SpecChromosomeCoordinates,
    pub gene: Vec<SpecGene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecVariantSet {
    pub variant: Vec<SpecVariant>,
}

/// One `clinvarSubmission` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecClinvarSubmission {
    pub clinical_significance: SpecClinicalSignificance,
    pub condition_set: SpecConditionSet,
    #[serde(rename = "localID")]
    pub local_id: String,
    pub local_key: Option<String>,
    pub observed_in: Vec<SpecObservedIn>,
    pub record_status: String,
    pub variant_set: SpecVariantSet,
}

/// Build the submission entry for one candidate.
///
/// The reference genome must be listed in `ref_genomes`; the assembly is the
/// part before the first `.` (`GRCh37.p13` submits as `GRCh37`).
pub fn derive_clinvar_submission(
    candidate: &SpecSubmissionCandidate,
    ref_genomes: &[String],
) -> Result<SpecClinvarSubmission, SubmissionError> {
    let ref_genome = candidate.ref_genome.clone().unwrap_or_default();
    if !ref_genomes.iter().any(|g| *g == ref_genome) {
        return Err(SubmissionError::InvalidGenomeBuild(ref_genome));
    }
    let assembly = ref_genome.split('.').next().unwrap_or_default().to_string();

    Ok(SpecClinvarSubmission {
        clinical_significance: SpecClinicalSignificance {
            clinical_significance_description: candidate.germline_classification.clone(),
            comment: candidate.comment_on_classification.clone(),
            date_last_evaluated: candidate.date_last_evaluated.clone(),
        },
        condition_set: SpecConditionSet {
            condition: vec![SpecCondition {
                name: candidate.preferred_condition_name.clone(),
            }],
        },
        local_id: candidate.local_id.clone(),
        local_key: candidate.linking_id.clone(),
        observed_in: vec![SpecObservedIn {
            affected_status: candidate.affected_status.clone(),
            allele_origin: candidate.allele_origin.clone(),
            collection_method: candidate.collection_method.clone(),
        }],
        record_status: "novel".to_string(),
        variant_set: SpecVariantSet {
            variant: vec![SpecVariant {
                chromosome_coordinates: SpecChromosomeCoordinates {
                    assembly,
                    alternate_allele: candidate.alternate_allele.clone(),
                    reference_allele: candidate.reference_allele.clone(),
                    chromosome: candidate.chromosome.clone(),
                    start: candidate.start,
                },
                gene: vec![SpecGene {
                    symbol: candidate.gene_symbol.clone(),
                }],
            }],
        },
    })
}

/// Build one submission entry per candidate, preserving order.
pub fn collect_clinvar_submissions(
    candidates: &[SpecSubmissionCandidate],
    ref_genomes: &[String],
) -> Result<Vec<SpecClinvarSubmission>, SubmissionError> {
    candidates
        .iter()
        .map(|candidate| derive_clinvar_submission(candidate, ref_genomes))
        .collect()
}

/// Wrap submission entries in the `AddData` action envelope.
pub fn derive_submission_body(payloads: &[SpecClinvarSubmission], guideline_url: &str) -> Value {
    json!({
        "actions": [{
            "type": "AddData",
            "targetDb": "clinvar",
            "data": {
                "content": {
                    "clinvarSubmission": payloads,
                    "assertionCriteria": { "url": guideline_url },
                }
            }
        }]
    })
}

/// Request headers for the submission API.
pub fn create_header(api_key: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("SP-API-KEY".to_string(), api_key.to_string()),
        ("Content-type".to_string(), "application/json".to_string()),
    ])
}

/// Pick the test or live submission endpoint.
pub fn select_api_url(if_testing: bool, endpoints: &SpecClinvarEndpoints) -> &str {
    let api_url = if if_testing {
        endpoints.api_url_test.as_str()
    } else {
        endpoints.api_url_live.as_str()
    };
    info!(
        "Running in {} mode, using {api_url}",
        if if_testing { "test" } else { "live" }
    );
    api_url
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Status

/// Outcome of one processed submission batch, keyed by local ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSubmissionStatus {
    pub accession_ids: BTreeMap<String, String>,
    pub errors: BTreeMap<String, String>,
}

fn _collect_user_messages(value: &Value, l_messages: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                if key == "userMessage"
                    && let Some(text) = item.as_str()
                {
                    l_messages.push(text.to_string());
                } else {
                    _collect_user_messages(item, l_messages);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                _collect_user_messages(item, l_messages);
            }
        }
        _ => {}
    }
}

fn _derive_error_text(errors: &Value) -> String {
    let mut l_messages = Vec::new();
    _collect_user_messages(errors, &mut l_messages);
    if l_messages.is_empty() {
        errors.to_string()
    } else {
        l_messages.join("; ")
    }
}

/// Read accession IDs and per-variant errors from a batch summary.
///
/// Only `processed` and `error` batches carry results (an `error` batch may
/// be a partial success). A batch whose `batchProcessingStatus` is `Error`
/// failed as a whole and yields nothing.
pub fn process_submission_status(status: &str, response: &Value) -> SpecSubmissionStatus {
    let mut result = SpecSubmissionStatus::default();
    if !matches!(status, "processed" | "error") {
        info!("Batch submission has status {status}; not yet processed by ClinVar");
        return result;
    }
    if response.get("batchProcessingStatus").and_then(Value::as_str) == Some("Error") {
        warn!("All submissions failed. No accession IDs.");
        return result;
    }

    let l_submissions = response
        .get("submissions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for submission in l_submissions {
        let identifiers = submission.get("identifiers");
        let Some(local_id) = identifiers
            .and_then(|ids| ids.get("localID"))
            .and_then(Value::as_str)
        else {
            warn!("Submission entry without localID: {submission}");
            continue;
        };
        match submission.get("errors") {
            Some(errors) if !errors.is_null() => {
                result
                    .errors
                    .insert(local_id.to_string(), _derive_error_text(errors));
            }
            _ => {
                if let Some(accession) = identifiers
                    .and_then(|ids| ids.get("clinvarAccession"))
                    .and_then(Value::as_str)
                {
                    result
                        .accession_ids
                        .insert(local_id.to_string(), accession.to_string());
                }
            }
        }
    }
    info!(
        "{} successfully submitted, {} failed",
        result.accession_ids.len(),
        result.errors.len()
    );
    result
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Client

/// Transport to the submission API.
pub trait SubmissionClient {
    /// POST a submission body; returns the response JSON (`id` or `message`).
    fn submit(&self, api_url: &str, api_key: &str, body: &Value) -> Result<Value, SubmissionError>;

    /// Fetch the status of a batch; returns the action status and the
    /// summary file JSON when one is listed, else the status JSON itself.
    fn fetch_status(
        &self,
        api_url: &str,
        api_key: &str,
        submission_id: &str,
    ) -> Result<(String, Value), SubmissionError>;
}

/// Blocking HTTP client with exponential retry on transport errors and 5xx.
#[derive(Debug, Clone)]
pub struct HttpSubmissionClient {
    client: Client,
    n_retries: u32,
    secs_backoff: f64,
}

impl Default for HttpSubmissionClient {
    fn default() -> Self {
        Self::new(10, 0.5)
    }
}

impl HttpSubmissionClient {
    pub fn new(n_retries: u32, secs_backoff: f64) -> Self {
        Self {
            client: Client::new(),
            n_retries,
            secs_backoff,
        }
    }

    fn send_with_retry<F>(&self, build: F) -> Result<(u16, String), SubmissionError>
    where
        F: Fn() -> reqwest::blocking::RequestBuilder,
    {
        let mut n_attempt = 0;
        loop {
            let outcome = build().send().and_then(|response| {
                let n_status = response.status().as_u16();
                response.text().map(|text| (n_status, text))
            });
            let if_retryable = match &outcome {
                Ok((n_status, _)) => *n_status >= 500,
                Err(_) => true,
            };
            if !if_retryable || n_attempt >= self.n_retries {
                return outcome.map_err(|e| SubmissionError::Http(e.to_string()));
            }
            let secs_sleep = self.secs_backoff * f64::from(2_u32.saturating_pow(n_attempt));
            debug!("Retrying ClinVar request in {secs_sleep:.1}s");
            thread::sleep(Duration::from_secs_f64(secs_sleep));
            n_attempt += 1;
        }
    }

    fn get_json(&self, url: &str, api_key: &str) -> Result<Value, SubmissionError> {
        let dict_headers = create_header(api_key);
        let (n_status, text) = self.send_with_retry(|| {
            dict_headers
                .iter()
                .fold(self.client.get(url), |req, (k, v)| req.header(k, v))
        })?;
        if n_status != 200 {
            return Err(SubmissionError::StatusCheck {
                url: url.to_string(),
                message: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| SubmissionError::Response(e.to_string()))
    }
}

impl SubmissionClient for HttpSubmissionClient {
    fn submit(&self, api_url: &str, api_key: &str, body: &Value) -> Result<Value, SubmissionError> {
        let dict_headers = create_header(api_key);
        let text_body = body.to_string();
        let (_, text) = self.send_with_retry(|| {
            dict_headers
                .iter()
                .fold(self.client.post(api_url), |req, (k, v)| req.header(k, v))
                .body(text_body.clone())
        })?;
        serde_json::from_str(&text).map_err(|e| SubmissionError::Response(e.to_string()))
    }

    fn fetch_status(
        &self,
        api_url: &str,
        api_key: &str,
        submission_id: &str,
    ) -> Result<(String, Value), SubmissionError> {
        let url = format!("{}/{submission_id}/actions", api_url.trim_end_matches('/'));
        let status_response = self.get_json(&url, api_key)?;

        let Some(action) = status_response.pointer("/actions/0") else {
            return Err(SubmissionError::Response(format!(
                "no actions listed for submission {submission_id}"
            )));
        };
        let status = action
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!("Submission {submission_id} has status {status}");

        let Some(response) = action.pointer("/responses/0") else {
            info!("Status 'responses' field had no items, check back later");
            return Ok((status, status_response));
        };
        let Some(url_file) = response.pointer("/files/0/url").and_then(Value::as_str) else {
            warn!("No summary file listed for submission {submission_id}: {response}");
            return Ok((status, status_response));
        };
        debug!("GET {url_file}");
        let file_content = self.get_json(url_file, api_key)?;
        Ok((status, file_content))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
