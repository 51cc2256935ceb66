use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use pandora_ingest::{IngestError, SpecDiscoverOptions, discover_workbooks};
use pandora_workbook::{
    SpecPandoraConfig, WorkbookError, check_sample_name, derive_folder_name,
    derive_ipc_bytes_from_records, derive_record_columns, extract_workbook_records,
    load_workbook, split_sample_identifier,
};
use pyo3::exceptions::{PyNotADirectoryError, PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "pandora.workbook.parse.v1";
const C_BRIDGE_TRANSPORT: &str = "arrow_ipc";

const C_STATUS_SUCCESS: &str = "success";
const C_STATUS_FAILED: &str = "failed";

#[pyclass(name = "WorkbookReport")]
#[derive(Debug, Clone)]
struct PyWorkbookReport {
    #[pyo3(get)]
    status: String,
    #[pyo3(get)]
    error: Option<String>,
    #[pyo3(get)]
    cnt_records: usize,
    #[pyo3(get)]
    columns: Vec<String>,
    #[pyo3(get)]
    sample_name_warning: Option<String>,
    v_ipc_records: Vec<u8>,
}

impl PyWorkbookReport {
    fn failed(error: String, columns: Vec<String>) -> Self {
        Self {
            status: C_STATUS_FAILED.to_string(),
            error: Some(error),
            cnt_records: 0,
            columns,
            sample_name_warning: None,
            v_ipc_records: Vec::new(),
        }
    }
}

#[pymethods]
impl PyWorkbookReport {
    #[getter]
    fn if_success(&self) -> bool {
        self.status == C_STATUS_SUCCESS
    }

    /// Record table as Arrow IPC file bytes; empty when parsing failed.
    #[getter]
    fn ipc_bytes<'py>(&self, py: Python<'py>) -> Bound<'py, PyBytes> {
        PyBytes::new(py, &self.v_ipc_records)
    }

    fn to_dict(&self) -> BTreeMap<String, String> {
        let mut dict_report = BTreeMap::new();
        dict_report.insert("status".to_string(), self.status.clone());
        dict_report.insert("error".to_string(), self.error.clone().unwrap_or_default());
        dict_report.insert("cnt_records".to_string(), self.cnt_records.to_string());
        dict_report
    }

    #[pyo3(signature = (prefix = "[WORKBOOK]"))]
    fn format(&self, prefix: &str) -> String {
        match &self.error {
            Some(error) => format!("{prefix} status={} error={error}", self.status),
            None => format!("{prefix} status={} records={}", self.status, self.cnt_records),
        }
    }

    fn __str__(&self) -> String {
        self.format("[WORKBOOK]")
    }
}

fn parse_config(config_json: Option<&str>) -> PyResult<SpecPandoraConfig> {
    match config_json {
        Some(text) => {
            SpecPandoraConfig::from_json_str(text).map_err(|err| PyValueError::new_err(err.to_string()))
        }
        None => Ok(SpecPandoraConfig::default()),
    }
}

fn parse_date_today(date_today: Option<&str>) -> PyResult<NaiveDate> {
    match date_today {
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|err| {
            PyValueError::new_err(format!(
                "Invalid date_today `{text}`: {err}. Expected YYYY-MM-DD"
            ))
        }),
        None => Ok(Local::now().date_naive()),
    }
}

fn map_ingest_error(exception: IngestError) -> PyErr {
    match exception {
        IngestError::DirectoryNotFound(path) => PyNotADirectoryError::new_err(format!(
            "Workbook directory does not exist: {}",
            path.display()
        )),
        IngestError::InvalidPattern(message) => PyValueError::new_err(message),
        IngestError::Io { .. } => PyOSError::new_err(exception.to_string()),
        _ => PyRuntimeError::new_err(exception.to_string()),
    }
}

/// Parse one workbook; workbook-level failures come back as a failed report.
#[pyfunction(name = "parse_workbook")]
#[pyo3(signature = (path, config_json = None, folder_name = None, date_today = None))]
fn parse_workbook_py(
    py: Python<'_>,
    path: String,
    config_json: Option<&str>,
    folder_name: Option<String>,
    date_today: Option<&str>,
) -> PyResult<PyWorkbookReport> {
    let config = parse_config(config_json)?;
    let date_today = parse_date_today(date_today)?;
    let path = PathBuf::from(path);
    let folder_name = folder_name
        .or_else(|| derive_folder_name(&path))
        .unwrap_or_default();
    let l_criteria_names = config.acgs.criterion_names();
    let l_columns = derive_record_columns(&l_criteria_names);

    let outcome = py.allow_threads(|| {
        let workbook = load_workbook(&path)?;
        extract_workbook_records(&workbook, &config, &folder_name, date_today)
    });
    let l_records = match outcome {
        Ok(l_records) => l_records,
        Err(WorkbookError::Open { path, message }) => {
            return Err(PyOSError::new_err(format!(
                "Failed to open workbook {path}: {message}"
            )));
        }
        Err(err) => return Ok(PyWorkbookReport::failed(err.to_string(), l_columns)),
    };

    let v_ipc_records = py
        .allow_threads(|| derive_ipc_bytes_from_records(&l_records, &l_criteria_names))
        .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
    Ok(PyWorkbookReport {
        status: C_STATUS_SUCCESS.to_string(),
        error: None,
        cnt_records: l_records.len(),
        columns: l_columns,
        sample_name_warning: l_records
            .first()
            .and_then(|record| record.summary.sample_name_warning.clone()),
        v_ipc_records,
    })
}

/// First sample identifier check failure, or `None` when it passes.
#[pyfunction(name = "check_sample_name")]
#[pyo3(signature = (sample_id, skip = false))]
fn check_sample_name_py(sample_id: &str, skip: bool) -> Option<String> {
    if skip {
        return None;
    }
    match split_sample_identifier(sample_id) {
        Ok(sample) => check_sample_name(&sample),
        Err(message) => Some(message),
    }
}

#[pyfunction(name = "discover_workbooks")]
#[pyo3(signature = (dir, patterns = None, depth_limit = Some(0)))]
fn discover_workbooks_py(
    py: Python<'_>,
    dir: String,
    patterns: Option<Vec<String>>,
    depth_limit: Option<usize>,
) -> PyResult<Vec<String>> {
    let mut options = SpecDiscoverOptions {
        depth_limit,
        ..Default::default()
    };
    if let Some(patterns) = patterns {
        options.patterns_include = patterns;
    }
    let l_files = py
        .allow_threads(|| discover_workbooks(&dir, &options))
        .map_err(map_ingest_error)?;
    Ok(l_files
        .into_iter()
        .map(|file| file.path.to_string_lossy().to_string())
        .collect())
}

#[pymodule]
fn _pandora_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyWorkbookReport>()?;
    module.add_function(wrap_pyfunction!(parse_workbook_py, module)?)?;
    module.add_function(wrap_pyfunction!(check_sample_name_py, module)?)?;
    module.add_function(wrap_pyfunction!(discover_workbooks_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
