//! Ingest options, workbook file model and top-level error types.

use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveDateTime};
use pandora_workbook::WorkbookError;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Stored workbook parse state (`inca_workbooks.parse_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumParseStatus {
    /// Registered but not yet parsed (`NULL`).
    Unparsed,
    /// Parsed and variants stored (`TRUE`).
    Success,
    /// Parsing failed; a comment carries the reason (`FALSE`).
    Failed,
}

impl EnumParseStatus {
    /// SQL literal used for this status.
    pub fn to_sql_literal(self) -> &'static str {
        match self {
            Self::Unparsed => "NULL",
            Self::Success => "TRUE",
            Self::Failed => "FALSE",
        }
    }

    /// Inverse of [`Self::to_sql_literal`] for stored text values.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_uppercase).as_deref() {
            Some("TRUE") | Some("T") | Some("1") => Self::Success,
            Some("FALSE") | Some("F") | Some("0") => Self::Failed,
            _ => Self::Unparsed,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Storage-side failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Statement rejected by the backing store.
    #[error("Database statement failed: {0}")]
    Statement(String),
    /// Backing store unreachable.
    #[error("Database connection failed: {0}")]
    Connection(String),
}

/// ClinVar payload construction and API failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Reference genome is not in the configured allow-list.
    #[error("Invalid genome build")]
    InvalidGenomeBuild(String),
    /// Stored row lacks a column the payload needs.
    #[error("Missing column {field} in stored variant row")]
    MissingField {
        /// Column name.
        field: String,
    },
    /// No API key available for a site.
    #[error("No ClinVar API key configured for site {site}")]
    MissingApiKey {
        /// Site name.
        site: String,
    },
    /// Transport-level failure.
    #[error("ClinVar request failed: {0}")]
    Http(String),
    /// Non-200 answer to a status query.
    #[error("Status check failed: {url}\n{message}")]
    StatusCheck {
        /// Queried URL.
        url: String,
        /// Response body.
        message: String,
    },
    /// Response body could not be read as expected JSON.
    #[error("Malformed ClinVar response: {0}")]
    Response(String),
}

/// "Top-level call failed" errors for discovery and orchestration.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Workbook directory missing or not a directory.
    #[error("Workbook directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    /// Invalid include/exclude glob.
    #[error("Invalid pattern in include/exclude: {0}")]
    InvalidPattern(String),
    /// Filesystem failure while scanning.
    #[error("Failed to read {}: {message}", .path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
    /// Kernel failure outside per-workbook handling (e.g. review export).
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    /// Storage failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Submission failure that aborts the run.
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsInit

/// One discovered workbook file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecWorkbookFile {
    /// Full path.
    pub path: PathBuf,
    /// File basename; the key in `inca_workbooks`.
    pub workbook_name: String,
    /// Parent directory basename; selects the submitting site.
    pub folder_name: String,
}

/// Input options for `discover_workbooks`.
#[derive(Debug, Clone)]
pub struct SpecDiscoverOptions {
    /// Glob patterns applied to file basename.
    pub patterns_include: Vec<String>,
    /// Glob patterns applied to file basename; wins over include.
    pub patterns_exclude: Vec<String>,
    /// Maximum directory depth below the root (`Some(0)`: root only).
    pub depth_limit: Option<usize>,
}

impl Default for SpecDiscoverOptions {
    fn default() -> Self {
        Self {
            patterns_include: vec!["*.xlsx".to_string()],
            patterns_exclude: vec!["~$*".to_string()],
            depth_limit: Some(0),
        }
    }
}

/// Input options for `ingest_workbooks`.
#[derive(Debug, Clone)]
pub struct SpecIngestOptions {
    /// Reference date for date-last-evaluated validation.
    pub date_today: NaiveDate,
    /// Timestamp stored when a workbook is first registered.
    pub datetime_run: NaiveDateTime,
    /// Optional review workbook receiving every parsed record.
    pub path_review_xlsx: Option<PathBuf>,
}

impl Default for SpecIngestOptions {
    fn default() -> Self {
        let datetime_run = Local::now().naive_local();
        Self {
            date_today: datetime_run.date(),
            datetime_run,
            path_review_xlsx: None,
        }
    }
}

/// Input options for `submit_pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecSubmitOptions {
    /// Use the test endpoint and do not record submission IDs.
    pub if_testing: bool,
    /// Build nothing and submit nothing.
    pub if_hold_for_review: bool,
    /// Log every submission body at info level.
    pub if_print_json: bool,
}

impl Default for SpecSubmitOptions {
    fn default() -> Self {
        Self {
            if_testing: true,
            if_hold_for_review: false,
            if_print_json: false,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
