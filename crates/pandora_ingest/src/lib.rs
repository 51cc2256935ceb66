//! `pandora_ingest` v1:
//! Workbook ingestion and ClinVar submission driver.
//!
//! Walks site folders for workbooks, stores extracted variant rows through a
//! database gateway, and submits interpreted variants to ClinVar.
//!
//! Architecture:
//! - `discover`  : workbook file discovery
//! - `gateway`   : storage contract, SQL rendering and in-memory backend
//! - `clinvar`   : submission payloads, envelope, status and HTTP client
//! - `transform` : versioned payload rewrite rules
//! - `pipeline`  : ingest / poll / submit orchestration
//! - `spec`      : options, parse status and errors
//! - `report`    : run-time report models

pub mod clinvar;
pub mod discover;
pub mod gateway;
pub mod pipeline;
pub mod report;
pub mod spec;
pub mod transform;

#[cfg(test)]
mod test_support;

pub use clinvar::{
    HttpSubmissionClient, SpecClinvarSubmission, SpecSubmissionCandidate, SpecSubmissionStatus,
    SubmissionClient, collect_clinvar_submissions, create_header, derive_clinvar_submission,
    derive_submission_body, process_submission_status, select_api_url,
};
pub use discover::discover_workbooks;
pub use gateway::{
    DatabaseGateway, EnumReadQuery, EnumWriteOperation, MemoryGateway, SpecRow, SpecVariantRow,
};
pub use pipeline::{
    derive_api_keys_from_env, ingest_workbooks, ingest_workbooks_with_loader, poll_submissions,
    submit_pending,
};
pub use report::{ReportIngest, ReportIngestBuilder, ReportSubmit, ReportSubmitBuilder, SpecRunError};
pub use spec::{
    EnumParseStatus, GatewayError, IngestError, SpecDiscoverOptions, SpecIngestOptions,
    SpecSubmitOptions, SpecWorkbookFile, SubmissionError,
};
pub use transform::{
    SpecDrugResponseRule, SubmissionTransform, apply_submission_transforms,
    derive_submission_transforms,
};
