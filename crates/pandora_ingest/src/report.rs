//! Ingest/submit report models and mutable report builders.

use std::collections::BTreeMap;
use std::fmt;

/// One failure item scoped to a workbook or a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRunError {
    /// Workbook name, site name or submission ID.
    pub scope: String,
    /// User-facing error text.
    pub exception: String,
}

////////////////////////////////////////////////////////////////////////////////
// #region ReportIngest

/// Aggregate counters and diagnostics for one `ingest_workbooks` run.
#[derive(Debug, Default, Clone)]
pub struct ReportIngest {
    /// Workbook files offered to the run.
    pub cnt_discovered: u64,
    /// Workbooks skipped as already parsed.
    pub cnt_skipped: u64,
    /// Workbooks parsed and stored.
    pub cnt_parsed: u64,
    /// Workbooks that failed parsing.
    pub cnt_failed: u64,
    /// Variant rows inserted.
    pub cnt_variants: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Per-workbook failures.
    pub errors: Vec<SpecRunError>,
}

impl ReportIngest {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_discovered".to_string(), self.cnt_discovered);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_parsed".to_string(), self.cnt_parsed);
        dict_counts.insert("cnt_failed".to_string(), self.cnt_failed);
        dict_counts.insert("cnt_variants".to_string(), self.cnt_variants);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} discovered={} skipped={} parsed={} failed={} variants={} errors={} warnings={}",
            dict_counts["cnt_discovered"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_parsed"],
            dict_counts["cnt_failed"],
            dict_counts["cnt_variants"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportIngest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[INGEST]"))
    }
}

/// Mutable accumulator for ingest statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportIngestBuilder {
    report: ReportIngest,
}

impl ReportIngestBuilder {
    pub fn add_discovered(&mut self) {
        self.report.cnt_discovered += 1;
    }

    pub fn add_skipped(&mut self) {
        self.report.cnt_skipped += 1;
    }

    /// Count one stored workbook and its variant rows.
    pub fn add_parsed(&mut self, n_variants: u64) {
        self.report.cnt_parsed += 1;
        self.report.cnt_variants += n_variants;
    }

    /// Count one failed workbook and keep its diagnostic.
    pub fn add_failed(&mut self, workbook_name: &str, exception: String) {
        self.report.cnt_failed += 1;
        self.report.errors.push(SpecRunError {
            scope: workbook_name.to_string(),
            exception,
        });
    }

    pub fn add_warning(&mut self, warning: String) {
        self.report.warnings.push(warning);
    }

    pub fn build(self) -> ReportIngest {
        self.report
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSubmit

/// Aggregate counters and diagnostics for polling and submission.
#[derive(Debug, Default, Clone)]
pub struct ReportSubmit {
    /// Submission IDs whose status was fetched.
    pub cnt_polled: u64,
    /// Accession IDs recorded.
    pub cnt_accessions: u64,
    /// Per-variant ClinVar errors recorded.
    pub cnt_rejected: u64,
    /// Variants selected for submission.
    pub cnt_candidates: u64,
    /// Variants sent in accepted batches.
    pub cnt_submitted: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Site- or batch-scoped failures.
    pub errors: Vec<SpecRunError>,
}

impl ReportSubmit {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_polled".to_string(), self.cnt_polled);
        dict_counts.insert("cnt_accessions".to_string(), self.cnt_accessions);
        dict_counts.insert("cnt_rejected".to_string(), self.cnt_rejected);
        dict_counts.insert("cnt_candidates".to_string(), self.cnt_candidates);
        dict_counts.insert("cnt_submitted".to_string(), self.cnt_submitted);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} polled={} accessions={} rejected={} candidates={} submitted={} errors={} warnings={}",
            dict_counts["cnt_polled"],
            dict_counts["cnt_accessions"],
            dict_counts["cnt_rejected"],
            dict_counts["cnt_candidates"],
            dict_counts["cnt_submitted"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportSubmit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[SUBMIT]"))
    }
}

/// Mutable accumulator for polling/submission statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportSubmitBuilder {
    report: ReportSubmit,
}

impl ReportSubmitBuilder {
    /// Increment one or more named counters by `value`.
    ///
    /// Unknown names are ignored.
    pub fn add_counts(&mut self, field_names: &[&str], value: u64) {
        for field_name in field_names {
            match *field_name {
                "cnt_polled" => self.report.cnt_polled += value,
                "cnt_accessions" => self.report.cnt_accessions += value,
                "cnt_rejected" => self.report.cnt_rejected += value,
                "cnt_candidates" => self.report.cnt_candidates += value,
                "cnt_submitted" => self.report.cnt_submitted += value,
                _ => {}
            }
        }
    }

    pub fn add_warning(&mut self, warning: String) {
        self.report.warnings.push(warning);
    }

    pub fn add_error(&mut self, scope: &str, exception: String) {
        self.report.errors.push(SpecRunError {
            scope: scope.to_string(),
            exception,
        });
    }

    pub fn build(self) -> ReportSubmit {
        self.report
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
