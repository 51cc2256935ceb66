//! Record export: polars DataFrame, Arrow IPC bytes and review workbook.

use std::collections::BTreeSet;
use std::path::PathBuf;

use polars::prelude::{Column, DataFrame, IpcWriter, SerWriter};
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::conf::{N_NROWS_EXCEL_MAX, derive_default_body_format, derive_default_header_format};
use crate::spec::{
    EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat, SpecMergedVariantRecord, WorkbookError,
};
use crate::util::sanitize_sheet_name;

////////////////////////////////////////////////////////////////////////////////
// #region Columns

/// Storage column names for the given criteria order.
pub fn derive_record_columns(criteria_names: &[String]) -> Vec<String> {
    SpecMergedVariantRecord::default()
        .to_column_values(criteria_names)
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

fn derive_cell_grid(
    records: &[SpecMergedVariantRecord],
    criteria_names: &[String],
) -> (Vec<String>, Vec<Vec<EnumCellValue>>) {
    let l_columns = derive_record_columns(criteria_names);
    let l_rows = records
        .iter()
        .map(|record| {
            record
                .to_column_values(criteria_names)
                .into_iter()
                .map(|(_, value)| value)
                .collect()
        })
        .collect();
    (l_columns, l_rows)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrame

/// Build the record table; `start` is `Int64`, every other column nullable text.
pub fn derive_dataframe_from_records(
    records: &[SpecMergedVariantRecord],
    criteria_names: &[String],
) -> Result<DataFrame, WorkbookError> {
    let (l_columns, l_rows) = derive_cell_grid(records, criteria_names);
    let mut l_series = Vec::with_capacity(l_columns.len());
    for (col_idx, name) in l_columns.iter().enumerate() {
        let column = if name == "start" {
            let l_values: Vec<Option<i64>> = l_rows
                .iter()
                .map(|row| row.get(col_idx).and_then(EnumCellValue::to_i64))
                .collect();
            Column::new(name.as_str().into(), l_values)
        } else {
            let l_values: Vec<Option<String>> = l_rows
                .iter()
                .map(|row| row.get(col_idx).and_then(EnumCellValue::to_text))
                .collect();
            Column::new(name.as_str().into(), l_values)
        };
        l_series.push(column);
    }
    DataFrame::new(l_series).map_err(|err| WorkbookError::Export(err.to_string()))
}

/// Serialize the record table as Arrow IPC file bytes.
pub fn derive_ipc_bytes_from_records(
    records: &[SpecMergedVariantRecord],
    criteria_names: &[String],
) -> Result<Vec<u8>, WorkbookError> {
    let mut df = derive_dataframe_from_records(records, criteria_names)?;
    let mut v_ipc_df: Vec<u8> = Vec::new();
    IpcWriter::new(&mut v_ipc_df)
        .finish(&mut df)
        .map_err(|err| WorkbookError::Export(format!("Failed to write IPC DataFrame bytes: {err}")))?;
    Ok(v_ipc_df)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReviewWorkbook

/// Stateful review workbook writer.
///
/// The workbook is buffered in memory until [`Self::close`] is called.
pub struct ReviewXlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    fmt_header: SpecCellFormat,
    fmt_body: SpecCellFormat,
    policy_autofit: SpecAutofitCellsPolicy,
    set_sheet_names_existing: BTreeSet<String>,
    if_closed: bool,
}

impl ReviewXlsxWriter {
    pub fn new(path_file_out: PathBuf) -> Self {
        Self::with_formats(
            path_file_out,
            derive_default_header_format(),
            derive_default_body_format(),
            SpecAutofitCellsPolicy::default(),
        )
    }

    pub fn with_formats(
        path_file_out: PathBuf,
        fmt_header: SpecCellFormat,
        fmt_body: SpecCellFormat,
        policy_autofit: SpecAutofitCellsPolicy,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            fmt_header,
            fmt_body,
            policy_autofit,
            set_sheet_names_existing: BTreeSet::new(),
            if_closed: false,
        }
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), WorkbookError> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook
            .save(&self.path_file_out)
            .map_err(derive_xlsx_error)?;
        self.if_closed = true;
        Ok(())
    }

    /// Write one sheet holding the record table; returns the actual sheet name.
    pub fn write_records(
        &mut self,
        sheet_name: &str,
        records: &[SpecMergedVariantRecord],
        criteria_names: &[String],
    ) -> Result<String, WorkbookError> {
        if self.if_closed {
            return Err(WorkbookError::Export("Writer already closed.".to_string()));
        }
        if records.len() + 1 > N_NROWS_EXCEL_MAX {
            return Err(WorkbookError::Export(format!(
                "{} records exceed the Excel row limit",
                records.len()
            )));
        }

        let (l_columns, l_rows) = derive_cell_grid(records, criteria_names);
        let c_sheet_name = self.derive_unique_sheet_name(sheet_name);
        let fmt_header = derive_rust_xlsx_format(&self.fmt_header);
        let fmt_body = derive_rust_xlsx_format(&self.fmt_body);
        let l_widths = estimate_column_widths(&l_columns, &l_rows, &self.policy_autofit);

        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&c_sheet_name)
            .map_err(derive_xlsx_error)?;

        for (col_idx, name) in l_columns.iter().enumerate() {
            worksheet
                .write_string_with_format(0, cast_col_num(col_idx)?, name, &fmt_header)
                .map_err(derive_xlsx_error)?;
        }
        for (row_idx, row_values) in l_rows.iter().enumerate() {
            for (col_idx, value) in row_values.iter().enumerate() {
                write_cell_with_format(worksheet, row_idx + 1, col_idx, value, &fmt_body)?;
            }
        }
        for (col_idx, width) in l_widths.iter().enumerate() {
            worksheet
                .set_column_width(cast_col_num(col_idx)?, *width as f64)
                .map_err(derive_xlsx_error)?;
        }
        worksheet.set_freeze_panes(1, 0).map_err(derive_xlsx_error)?;

        Ok(c_sheet_name)
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        let c_base = sanitize_sheet_name(name, "_");
        let mut c_name = c_base.clone();
        let mut n_suffix = 1usize;
        while self.set_sheet_names_existing.contains(&c_name.to_lowercase()) {
            n_suffix += 1;
            let c_suffix = format!("_{n_suffix}");
            let n_keep = 31usize.saturating_sub(c_suffix.len());
            c_name = format!("{}{c_suffix}", c_base.chars().take(n_keep).collect::<String>());
        }
        self.set_sheet_names_existing.insert(c_name.to_lowercase());
        c_name
    }
}

/// Column widths from header and body text, padded then clamped.
pub fn estimate_column_widths(
    columns: &[String],
    rows: &[Vec<EnumCellValue>],
    policy: &SpecAutofitCellsPolicy,
) -> Vec<usize> {
    let n_rows_inspected = policy
        .height_body_inferred_max
        .map_or(rows.len(), |val| val.min(rows.len()));
    columns
        .iter()
        .enumerate()
        .map(|(col_idx, name)| {
            let n_body = rows[..n_rows_inspected]
                .iter()
                .filter_map(|row| row.get(col_idx).and_then(EnumCellValue::to_text))
                .map(|text| estimate_unicode_string_width(&text))
                .max()
                .unwrap_or(0);
            let n_width = estimate_unicode_string_width(name).max(n_body) + policy.width_cell_padding;
            n_width.clamp(policy.width_cell_min, policy.width_cell_max)
        })
        .collect()
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), WorkbookError> {
    let (n_row, n_col) = (cast_row_num(row_idx)?, cast_col_num(col_idx)?);
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(n_row, n_col, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Integer(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val as f64, format)
                .map_err(derive_xlsx_error)?;
        }
        other => {
            let text = other.to_text().unwrap_or_default();
            worksheet
                .write_string_with_format(n_row, n_col, &text, format)
                .map_err(derive_xlsx_error)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, WorkbookError> {
    u32::try_from(value).map_err(|_| WorkbookError::Export(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16, WorkbookError> {
    u16::try_from(value)
        .map_err(|_| WorkbookError::Export(format!("column index overflow: {value}")))
}

fn derive_xlsx_error(err: XlsxError) -> WorkbookError {
    WorkbookError::Export(format!("xlsx write error: {err}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
