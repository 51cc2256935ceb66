//! Workbook source contract, in-memory grid and calamine-backed loader.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use log::debug;

use crate::spec::{EnumCellLocator, EnumCellValue, SpecCellAddress, WorkbookError};
use crate::util::parse_column_letters;

////////////////////////////////////////////////////////////////////////////////
// #region WorkbookSource

/// Addressable, named, multi-sheet tabular document.
pub trait WorkbookSource {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// `(n_rows, n_cols)` spanned from `A1` to the last used cell.
    fn sheet_extent(&self, sheet: &str) -> Result<(usize, usize), WorkbookError>;

    /// Read one cell; blank cells read as [`EnumCellValue::None`].
    fn read_cell(&self, sheet: &str, address: SpecCellAddress) -> Result<EnumCellValue, WorkbookError>;

    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names().iter().any(|name| name == sheet)
    }

    /// Read one cell by A1 address.
    fn read_cell_a1(&self, sheet: &str, address: &str) -> Result<EnumCellValue, WorkbookError> {
        self.read_cell(sheet, SpecCellAddress::parse(address)?)
    }

    /// Read `n_rows` cells of one column starting at `row_start`.
    fn read_column(
        &self,
        sheet: &str,
        col: usize,
        row_start: usize,
        n_rows: usize,
    ) -> Result<Vec<EnumCellValue>, WorkbookError> {
        (row_start..row_start + n_rows)
            .map(|row| self.read_cell(sheet, SpecCellAddress::new(row, col)))
            .collect()
    }

    /// Column index of the first header-row cell whose text equals `header`.
    fn find_header_column(&self, sheet: &str, header: &str) -> Result<Option<usize>, WorkbookError> {
        let (_, n_cols) = self.sheet_extent(sheet)?;
        for col in 0..n_cols {
            let value = self.read_cell(sheet, SpecCellAddress::new(0, col))?;
            if value.to_text().is_some_and(|text| text.trim() == header) {
                return Ok(Some(col));
            }
        }
        Ok(None)
    }

    /// Read body rows below the header row, restricted to `headers`.
    ///
    /// Rows come back in sheet order with cells in `headers` order. `n_rows`
    /// limits the body height; `None` reads to the last used row.
    fn read_table(
        &self,
        sheet: &str,
        headers: &[String],
        n_rows: Option<usize>,
    ) -> Result<Vec<Vec<EnumCellValue>>, WorkbookError> {
        let mut l_cols_idx = Vec::with_capacity(headers.len());
        for header in headers {
            let col = self
                .find_header_column(sheet, header)?
                .ok_or_else(|| WorkbookError::MissingHeader {
                    sheet: sheet.to_string(),
                    header: header.clone(),
                })?;
            l_cols_idx.push(col);
        }

        let n_rows_body = match n_rows {
            Some(n_rows) => n_rows,
            None => self.sheet_extent(sheet)?.0.saturating_sub(1),
        };

        let mut l_rows = Vec::with_capacity(n_rows_body);
        for row in 1..=n_rows_body {
            let l_values = l_cols_idx
                .iter()
                .map(|col| self.read_cell(sheet, SpecCellAddress::new(row, *col)))
                .collect::<Result<Vec<_>, _>>()?;
            l_rows.push(l_values);
        }
        Ok(l_rows)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region InMemoryWorkbook

/// Sparse cell grid of one sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetGrid {
    pub name: String,
    cells: BTreeMap<SpecCellAddress, EnumCellValue>,
}

impl SpecSheetGrid {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
        }
    }

    /// Store a value; blank values and empty strings clear the cell.
    pub fn set_cell(&mut self, address: SpecCellAddress, value: EnumCellValue) {
        let if_blank = match &value {
            EnumCellValue::None => true,
            EnumCellValue::String(val) => val.is_empty(),
            _ => false,
        };
        if if_blank {
            self.cells.remove(&address);
        } else {
            self.cells.insert(address, value);
        }
    }

    /// Store a value by A1 address.
    pub fn set_a1(&mut self, address: &str, value: EnumCellValue) -> Result<(), WorkbookError> {
        self.set_cell(SpecCellAddress::parse(address)?, value);
        Ok(())
    }

    /// Store text by A1 address.
    pub fn set_text(&mut self, address: &str, text: &str) -> Result<(), WorkbookError> {
        self.set_a1(address, EnumCellValue::String(text.to_string()))
    }

    pub fn cell(&self, address: SpecCellAddress) -> EnumCellValue {
        self.cells.get(&address).cloned().unwrap_or_default()
    }

    pub fn extent(&self) -> (usize, usize) {
        self.cells
            .keys()
            .fold((0, 0), |(n_rows, n_cols), address| {
                (n_rows.max(address.row + 1), n_cols.max(address.col + 1))
            })
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }
}

/// Ordered collection of sheet grids.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecWorkbook {
    sheets: Vec<SpecSheetGrid>,
}

impl SpecWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet, replacing any sheet with the same name.
    pub fn add_sheet(&mut self, sheet: SpecSheetGrid) {
        if let Some(existing) = self.sheets.iter_mut().find(|item| item.name == sheet.name) {
            *existing = sheet;
        } else {
            self.sheets.push(sheet);
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&SpecSheetGrid> {
        self.sheets.iter().find(|item| item.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut SpecSheetGrid> {
        self.sheets.iter_mut().find(|item| item.name == name)
    }

    fn require_sheet(&self, name: &str) -> Result<&SpecSheetGrid, WorkbookError> {
        self.sheet(name)
            .ok_or_else(|| WorkbookError::MissingSheet(name.to_string()))
    }
}

impl WorkbookSource for SpecWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|item| item.name.clone()).collect()
    }

    fn sheet_extent(&self, sheet: &str) -> Result<(usize, usize), WorkbookError> {
        Ok(self.require_sheet(sheet)?.extent())
    }

    fn read_cell(&self, sheet: &str, address: SpecCellAddress) -> Result<EnumCellValue, WorkbookError> {
        Ok(self.require_sheet(sheet)?.cell(address))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CalamineLoader

/// Load every sheet of an `.xlsx`/`.xls`/`.ods` file into memory.
pub fn load_workbook(path: impl AsRef<Path>) -> Result<SpecWorkbook, WorkbookError> {
    let path = path.as_ref();
    let derive_open_error = |message: String| WorkbookError::Open {
        path: path.display().to_string(),
        message,
    };

    let mut workbook_raw = open_workbook_auto(path).map_err(|err| derive_open_error(err.to_string()))?;
    let mut workbook = SpecWorkbook::new();

    for sheet_name in workbook_raw.sheet_names() {
        let range = workbook_raw
            .worksheet_range(&sheet_name)
            .map_err(|err| derive_open_error(format!("sheet \"{sheet_name}\": {err}")))?;
        let mut grid = SpecSheetGrid::new(&sheet_name);
        // used_cells() yields coordinates relative to range.start().
        if let Some((row_start, col_start)) = range.start() {
            for (row, col, data) in range.used_cells() {
                let address = SpecCellAddress::new(row_start as usize + row, col_start as usize + col);
                grid.set_cell(address, convert_calamine_value(data));
            }
        }
        debug!("Loaded sheet {sheet_name} with {} cells", grid.n_cells());
        workbook.add_sheet(grid);
    }

    Ok(workbook)
}

fn convert_calamine_value(data: &Data) -> EnumCellValue {
    match data {
        Data::Empty => EnumCellValue::None,
        Data::Bool(val) => EnumCellValue::Boolean(*val),
        Data::Int(val) => EnumCellValue::Integer(*val),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::DateTime(val) => match val.as_datetime() {
            Some(dt) => EnumCellValue::DateTime(dt),
            None => EnumCellValue::Number(val.as_f64()),
        },
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::String(val.clone()),
        Data::Error(err) => EnumCellValue::String(format!("{err}")),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldLocation

/// Resolve one field through its configured locator.
///
/// A label scan uses the last matching row; no match yields `None`.
pub fn locate_field(
    workbook: &impl WorkbookSource,
    sheet: &str,
    locator: &EnumCellLocator,
) -> Result<EnumCellValue, WorkbookError> {
    match locator {
        EnumCellLocator::Fixed { address } => workbook.read_cell_a1(sheet, address),
        EnumCellLocator::LabelScan {
            column,
            label,
            col_offset,
            row_offset,
        } => {
            let col = parse_column_letters(column)
                .map_err(|_| WorkbookError::InvalidAddress(column.clone()))?;
            let (n_rows, _) = workbook.sheet_extent(sheet)?;
            let mut address_label = None;
            for (row, value) in workbook.read_column(sheet, col, 0, n_rows)?.iter().enumerate() {
                if value.to_text().as_deref() == Some(label.as_str()) {
                    address_label = Some(SpecCellAddress::new(row, col));
                }
            }
            let Some(address) = address_label.and_then(|val| val.offset(*row_offset, *col_offset))
            else {
                return Ok(EnumCellValue::None);
            };
            workbook.read_cell(sheet, address)
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestDir, build_template_workbook, write_template_xlsx};

    fn build_table_sheet() -> SpecWorkbook {
        let mut grid = SpecSheetGrid::new("included");
        for (address, text) in [
            ("A1", "POS"),
            ("B1", "CHROM"),
            ("C1", "Note"),
            ("A2", "100"),
            ("B2", "7"),
            ("A3", "200"),
            ("B3", "X"),
        ] {
            grid.set_text(address, text).unwrap();
        }
        let mut workbook = SpecWorkbook::new();
        workbook.add_sheet(grid);
        workbook
    }

    #[test]
    fn test_read_table_uses_header_lookup() {
        let workbook = build_table_sheet();
        let headers = vec!["CHROM".to_string(), "POS".to_string()];
        let l_rows = workbook.read_table("included", &headers, Some(2)).unwrap();
        assert_eq!(l_rows.len(), 2);
        assert_eq!(l_rows[0][0], EnumCellValue::String("7".to_string()));
        assert_eq!(l_rows[1][1], EnumCellValue::String("200".to_string()));

        let l_rows_all = workbook.read_table("included", &headers, None).unwrap();
        assert_eq!(l_rows_all.len(), 2);
    }

    #[test]
    fn test_read_table_missing_header_is_named() {
        let workbook = build_table_sheet();
        let err = workbook
            .read_table("included", &["REF".to_string()], Some(1))
            .unwrap_err();
        assert_eq!(
            err,
            WorkbookError::MissingHeader {
                sheet: "included".to_string(),
                header: "REF".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_sheet_is_error() {
        let workbook = SpecWorkbook::new();
        assert!(matches!(
            workbook.read_cell_a1("summary", "B1"),
            Err(WorkbookError::MissingSheet(_))
        ));
    }

    #[test]
    fn test_locate_field_label_scan_takes_last_match() {
        let mut grid = SpecSheetGrid::new("summary");
        grid.set_text("A5", "Reference:").unwrap();
        grid.set_text("B5", "GRCh37.p13").unwrap();
        grid.set_text("A9", "Reference:").unwrap();
        grid.set_text("B9", "GRCh38.p13").unwrap();
        let mut workbook = SpecWorkbook::new();
        workbook.add_sheet(grid);

        let locator = EnumCellLocator::LabelScan {
            column: "A".to_string(),
            label: "Reference:".to_string(),
            col_offset: 1,
            row_offset: 0,
        };
        assert_eq!(
            locate_field(&workbook, "summary", &locator).unwrap(),
            EnumCellValue::String("GRCh38.p13".to_string())
        );

        let locator_missing = EnumCellLocator::LabelScan {
            column: "A".to_string(),
            label: "Genome:".to_string(),
            col_offset: 1,
            row_offset: 0,
        };
        assert_eq!(
            locate_field(&workbook, "summary", &locator_missing).unwrap(),
            EnumCellValue::None
        );
    }

    #[test]
    fn test_load_workbook_reads_written_fixture() {
        let tmp = TestDir::new();
        let path = tmp.path().join("CUH").join("fixture.xlsx");
        write_template_xlsx(&build_template_workbook(), &path);

        let workbook = load_workbook(&path).unwrap();
        assert!(workbook.has_sheet("summary"));
        assert!(workbook.has_sheet("included"));
        assert!(workbook.has_sheet("interpret"));
        assert_eq!(
            workbook.read_cell_a1("summary", "G21").unwrap(),
            EnumCellValue::String("Date".to_string())
        );
        assert_eq!(workbook.read_cell_a1("summary", "C38").unwrap().to_i64(), Some(2));
        assert!(matches!(
            workbook.read_cell_a1("summary", "G22").unwrap(),
            EnumCellValue::DateTime(_)
        ));
    }

    #[test]
    fn test_load_workbook_missing_file() {
        let err = load_workbook("/nonexistent/dir/missing.xlsx").unwrap_err();
        assert!(matches!(err, WorkbookError::Open { .. }));
    }
}
