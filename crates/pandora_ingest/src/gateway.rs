//! Relational storage contract for variants and workbook parse state.
//!
//! Operations are plain data; `to_sql` renders the statements a SQL backend
//! runs, and `MemoryGateway` applies the same semantics in memory.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use log::debug;
use pandora_workbook::{EnumCellValue, SpecDatabaseConfig, SpecExcludeRule};

use crate::spec::{EnumParseStatus, GatewayError};

/// One stored row: column name to optional text.
pub type SpecRow = BTreeMap<String, Option<String>>;

/// One variant row ready for insertion, in column order.
pub type SpecVariantRow = Vec<(String, EnumCellValue)>;

////////////////////////////////////////////////////////////////////////////////
// #region Operations

/// Mutating statements issued by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumWriteOperation {
    /// Append extracted variant rows to the variant table.
    InsertVariants {
        /// Rows sharing one column order.
        rows: Vec<SpecVariantRow>,
    },
    /// Register a workbook; an existing name is left untouched.
    InsertWorkbook {
        workbook_name: String,
        datetime_added: NaiveDateTime,
        status: EnumParseStatus,
    },
    /// Mark a workbook as parsed.
    MarkWorkbookParsed { workbook_name: String },
    /// Mark a workbook as failed with a reason.
    RecordWorkbookError { workbook_name: String, error: String },
    /// Attach a batch submission ID to submitted variants.
    RecordSubmissionId {
        submission_id: String,
        local_ids: Vec<String>,
    },
    /// Record a rejected batch submission on every variant in it.
    RecordSubmissionFailure {
        message: String,
        local_ids: Vec<String>,
    },
    /// Attach accession IDs keyed by local ID.
    RecordAccessionIds { accession_ids: BTreeMap<String, String> },
    /// Record per-variant submission errors keyed by local ID.
    RecordSubmissionErrors { errors: BTreeMap<String, String> },
}

/// Read statements issued by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumReadQuery {
    /// Interpreted variants of one organisation without accession ID.
    VariantsForOrganisation {
        organisation_id: String,
        /// `true`: submission ID present; `false`: not yet submitted.
        if_submitted: bool,
        /// Apply the configured exclusion rules.
        if_exclude: bool,
    },
    /// Workbooks in one parse state.
    WorkbooksByStatus { status: EnumParseStatus },
}

fn _quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn _quote_list(values: &[String]) -> String {
    values.iter().map(|v| _quote(v)).collect::<Vec<_>>().join(", ")
}

fn _quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `NULL` in an excluded column does not match any excluded value.
fn _render_exclude(rules: &[SpecExcludeRule]) -> String {
    rules
        .iter()
        .filter(|rule| !rule.values.is_empty())
        .map(|rule| {
            let column = _quote_identifier(&rule.column);
            format!(
                " AND ({column} IS NULL OR {column} NOT IN ({}))",
                _quote_list(&rule.values)
            )
        })
        .collect()
}

fn _is_excluded(row: &SpecRow, rules: &[SpecExcludeRule]) -> bool {
    rules.iter().any(|rule| {
        _text(row, &rule.column).is_some_and(|value| rule.values.contains(&value))
    })
}

fn _render_value(value: &EnumCellValue) -> String {
    match value {
        EnumCellValue::None => "NULL".to_string(),
        EnumCellValue::Integer(v) => v.to_string(),
        EnumCellValue::Number(v) if v.is_finite() => v.to_string(),
        EnumCellValue::Number(_) => "NULL".to_string(),
        EnumCellValue::Boolean(v) => String::from(if *v { "TRUE" } else { "FALSE" }),
        EnumCellValue::String(v) => _quote(v),
        EnumCellValue::DateTime(v) => _quote(&v.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

impl EnumWriteOperation {
    /// Render the SQL statements for this operation.
    ///
    /// Batch updates keyed by local ID render one statement per entry.
    pub fn to_sql(&self, config: &SpecDatabaseConfig) -> Vec<String> {
        let table_variants = format!("{}.{}", config.schema, config.table_variants);
        let table_workbooks = format!("{}.{}", config.schema, config.table_workbooks);
        match self {
            Self::InsertVariants { rows } => {
                let Some(first) = rows.first() else {
                    return Vec::new();
                };
                let l_columns: Vec<&str> = first.iter().map(|(name, _)| name.as_str()).collect();
                let l_values: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        let l_cells: Vec<String> =
                            row.iter().map(|(_, value)| _render_value(value)).collect();
                        format!("({})", l_cells.join(", "))
                    })
                    .collect();
                vec![format!(
                    "INSERT INTO {table_variants} ({}) VALUES {}",
                    l_columns.join(", "),
                    l_values.join(", ")
                )]
            }
            Self::InsertWorkbook {
                workbook_name,
                datetime_added,
                status,
            } => vec![format!(
                "INSERT INTO {table_workbooks} (workbook_name, date, parse_status) \
                 VALUES ({}, '{}', {}) ON CONFLICT (workbook_name) DO NOTHING",
                _quote(workbook_name),
                datetime_added.format("%Y-%m-%d %H:%M:%S"),
                status.to_sql_literal()
            )],
            Self::MarkWorkbookParsed { workbook_name } => vec![format!(
                "UPDATE {table_workbooks} SET parse_status = TRUE WHERE workbook_name = {}",
                _quote(workbook_name)
            )],
            Self::RecordWorkbookError {
                workbook_name,
                error,
            } => vec![format!(
                "UPDATE {table_workbooks} SET parse_status = FALSE, comment = {} \
                 WHERE workbook_name = {}",
                _quote(error),
                _quote(workbook_name)
            )],
            Self::RecordSubmissionId {
                submission_id,
                local_ids,
            } => vec![format!(
                "UPDATE {table_variants} SET submission_id = {} WHERE local_id in ({})",
                _quote(submission_id),
                _quote_list(local_ids)
            )],
            Self::RecordSubmissionFailure { message, local_ids } => vec![format!(
                "UPDATE {table_variants} SET clinvar_status = {} WHERE local_id in ({})",
                _quote(&format!("ERROR: {message}")),
                _quote_list(local_ids)
            )],
            Self::RecordAccessionIds { accession_ids } => accession_ids
                .iter()
                .map(|(local_id, accession)| {
                    format!(
                        "UPDATE {table_variants} SET accession_id = {} WHERE local_id = {}",
                        _quote(accession),
                        _quote(local_id)
                    )
                })
                .collect(),
            Self::RecordSubmissionErrors { errors } => errors
                .iter()
                .map(|(local_id, error)| {
                    format!(
                        "UPDATE {table_variants} SET clinvar_status = {} WHERE local_id = {}",
                        _quote(&format!("ERROR: {error}")),
                        _quote(local_id)
                    )
                })
                .collect(),
        }
    }
}

impl EnumReadQuery {
    /// Render the SQL statement for this query.
    pub fn to_sql(&self, config: &SpecDatabaseConfig) -> String {
        match self {
            Self::VariantsForOrganisation {
                organisation_id,
                if_submitted,
                if_exclude,
            } => {
                let submitted = if *if_submitted { "NOT NULL" } else { "NULL" };
                let exclude = if *if_exclude {
                    _render_exclude(&config.exclude)
                } else {
                    String::new()
                };
                format!(
                    "SELECT * FROM {}.{} WHERE interpreted = 'yes' AND submission_id is \
                     {submitted} AND accession_id is NULL AND organisation_id = {}{exclude}",
                    config.schema,
                    config.table_variants,
                    _quote(organisation_id)
                )
            }
            Self::WorkbooksByStatus { status } => {
                let condition = match status {
                    EnumParseStatus::Unparsed => "parse_status is NULL".to_string(),
                    _ => format!("parse_status = {}", status.to_sql_literal()),
                };
                format!(
                    "SELECT * FROM {}.{} WHERE {condition}",
                    config.schema, config.table_workbooks
                )
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Gateway

/// Storage backend used by the pipeline.
pub trait DatabaseGateway {
    /// Apply one write; returns the number of affected rows.
    fn execute(&mut self, operation: &EnumWriteOperation) -> Result<u64, GatewayError>;

    /// Run one read.
    fn query(&mut self, query: &EnumReadQuery) -> Result<Vec<SpecRow>, GatewayError>;
}

/// In-memory gateway with the same observable semantics as the SQL shapes.
///
/// Every executed or queried statement is also rendered and kept, so a run
/// can be inspected or replayed against a real database.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    config: SpecDatabaseConfig,
    variants: Vec<SpecRow>,
    workbooks: Vec<SpecRow>,
    l_sql: Vec<String>,
}

const TUP_SUBMISSION_COLUMNS: [&str; 3] = ["submission_id", "accession_id", "clinvar_status"];

fn _text(row: &SpecRow, column: &str) -> Option<String> {
    row.get(column).cloned().flatten()
}

impl MemoryGateway {
    pub fn new(config: SpecDatabaseConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Stored variant rows in insertion order.
    pub fn variants(&self) -> &[SpecRow] {
        &self.variants
    }

    /// Stored workbook rows in insertion order.
    pub fn workbooks(&self) -> &[SpecRow] {
        &self.workbooks
    }

    /// Rendered statements in execution order.
    pub fn statements(&self) -> &[String] {
        &self.l_sql
    }

    /// Stored parse status of one workbook, if registered.
    pub fn workbook_status(&self, workbook_name: &str) -> Option<EnumParseStatus> {
        self.workbooks
            .iter()
            .find(|row| _text(row, "workbook_name").as_deref() == Some(workbook_name))
            .map(|row| EnumParseStatus::from_stored(_text(row, "parse_status").as_deref()))
    }

    fn update_workbook(&mut self, workbook_name: &str, values: &[(&str, Option<String>)]) -> u64 {
        let mut n_rows = 0;
        for row in &mut self.workbooks {
            if _text(row, "workbook_name").as_deref() != Some(workbook_name) {
                continue;
            }
            for (column, value) in values {
                row.insert(column.to_string(), value.clone());
            }
            n_rows += 1;
        }
        n_rows
    }

    fn update_variants<F>(&mut self, column: &str, mut value_for: F) -> u64
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut n_rows = 0;
        for row in &mut self.variants {
            let Some(local_id) = _text(row, "local_id") else {
                continue;
            };
            if let Some(value) = value_for(&local_id) {
                row.insert(column.to_string(), Some(value));
                n_rows += 1;
            }
        }
        n_rows
    }
}

impl DatabaseGateway for MemoryGateway {
    fn execute(&mut self, operation: &EnumWriteOperation) -> Result<u64, GatewayError> {
        for sql in operation.to_sql(&self.config) {
            debug!("{sql}");
            self.l_sql.push(sql);
        }

        let n_rows = match operation {
            EnumWriteOperation::InsertVariants { rows } => {
                for row in rows {
                    let mut stored: SpecRow = row
                        .iter()
                        .map(|(name, value)| (name.clone(), value.to_text()))
                        .collect();
                    for column in TUP_SUBMISSION_COLUMNS {
                        stored.entry(column.to_string()).or_insert(None);
                    }
                    self.variants.push(stored);
                }
                rows.len() as u64
            }
            EnumWriteOperation::InsertWorkbook {
                workbook_name,
                datetime_added,
                status,
            } => {
                if self.workbook_status(workbook_name).is_some() {
                    0
                } else {
                    let mut row = SpecRow::new();
                    row.insert("workbook_name".to_string(), Some(workbook_name.clone()));
                    row.insert(
                        "date".to_string(),
                        Some(datetime_added.format("%Y-%m-%d %H:%M:%S").to_string()),
                    );
                    let literal = status.to_sql_literal();
                    row.insert(
                        "parse_status".to_string(),
                        (literal != "NULL").then(|| literal.to_string()),
                    );
                    row.insert("comment".to_string(), None);
                    self.workbooks.push(row);
                    1
                }
            }
            EnumWriteOperation::MarkWorkbookParsed { workbook_name } => self.update_workbook(
                workbook_name,
                &[("parse_status", Some("TRUE".to_string()))],
            ),
            EnumWriteOperation::RecordWorkbookError {
                workbook_name,
                error,
            } => self.update_workbook(
                workbook_name,
                &[
                    ("parse_status", Some("FALSE".to_string())),
                    ("comment", Some(error.clone())),
                ],
            ),
            EnumWriteOperation::RecordSubmissionId {
                submission_id,
                local_ids,
            } => self.update_variants("submission_id", |local_id| {
                local_ids
                    .iter()
                    .any(|id| id == local_id)
                    .then(|| submission_id.clone())
            }),
            EnumWriteOperation::RecordSubmissionFailure { message, local_ids } => self
                .update_variants("clinvar_status", |local_id| {
                    local_ids
                        .iter()
                        .any(|id| id == local_id)
                        .then(|| format!("ERROR: {message}"))
                }),
            EnumWriteOperation::RecordAccessionIds { accession_ids } => self
                .update_variants("accession_id", |local_id| {
                    accession_ids.get(local_id).cloned()
                }),
            EnumWriteOperation::RecordSubmissionErrors { errors } => self
                .update_variants("clinvar_status", |local_id| {
                    errors.get(local_id).map(|error| format!("ERROR: {error}"))
                }),
        };
        Ok(n_rows)
    }

    fn query(&mut self, query: &EnumReadQuery) -> Result<Vec<SpecRow>, GatewayError> {
        let sql = query.to_sql(&self.config);
        debug!("{sql}");
        self.l_sql.push(sql);

        let l_rows = match query {
            EnumReadQuery::VariantsForOrganisation {
                organisation_id,
                if_submitted,
                if_exclude,
            } => {
                self.variants
                    .iter()
                    .filter(|row| {
                        _text(row, "interpreted").as_deref() == Some("yes")
                            && _text(row, "submission_id").is_some() == *if_submitted
                            && _text(row, "accession_id").is_none()
                            && _text(row, "organisation_id").as_deref()
                                == Some(organisation_id.as_str())
                            && !(*if_exclude && _is_excluded(row, &self.config.exclude))
                    })
                    .cloned()
                    .collect()
            }
            EnumReadQuery::WorkbooksByStatus { status } => self
                .workbooks
                .iter()
                .filter(|row| {
                    EnumParseStatus::from_stored(_text(row, "parse_status").as_deref()) == *status
                })
                .cloned()
                .collect(),
        };
        Ok(l_rows)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
