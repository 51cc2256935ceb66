//! Fixtures shared by unit tests.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::reader::{SpecSheetGrid, SpecWorkbook, WorkbookSource};
use crate::spec::{EnumCellValue, SpecCellAddress};

pub(crate) struct TestDir {
    path: PathBuf,
}

impl TestDir {
    pub(crate) fn new() -> Self {
        let n = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("pandora_workbook_test_{n}"));
        std::fs::create_dir_all(&path).expect("create test dir");
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub(crate) const C_HGVSC_BRCA1: &str = "NM_007294.4:c.5503C>T";
pub(crate) const C_HGVSC_BRCA2: &str = "NM_000059.4:c.6275_6276del";

fn set_texts(grid: &mut SpecSheetGrid, l_cells: &[(&str, &str)]) {
    for (address, text) in l_cells {
        grid.set_text(address, text).expect("set text");
    }
}

/// Standard template with one interpreted and one uninterpreted variant.
pub(crate) fn build_template_workbook() -> SpecWorkbook {
    let mut summary = SpecSheetGrid::new("summary");
    set_texts(
        &mut summary,
        &[
            ("B1", "123456789-23053R0001-23NGWES1-9527-F-99347387"),
            ("F1", "R208.1_Inherited breast cancer and ovarian cancer"),
            ("F2", "_HGNC:1100;_HGNC:1101"),
            ("A20", "Reference:"),
            ("B20", "GRCh37.p13"),
            ("G21", "Date"),
        ],
    );
    summary
        .set_a1(
            "G22",
            EnumCellValue::DateTime(
                NaiveDate::from_ymd_opt(2023, 11, 7)
                    .and_then(|val| val.and_hms_opt(0, 0, 0))
                    .expect("date"),
            ),
        )
        .expect("set date");
    summary
        .set_a1("C38", EnumCellValue::Integer(2))
        .expect("set count");

    let mut included = SpecSheetGrid::new("included");
    set_texts(
        &mut included,
        &[
            ("A1", "CHROM"),
            ("B1", "POS"),
            ("C1", "REF"),
            ("D1", "ALT"),
            ("E1", "SYMBOL"),
            ("F1", "HGVSc"),
            ("G1", "Consequence"),
            ("H1", "Interpreted"),
            ("I1", "Comment"),
            ("A2", "17"),
            ("C2", "G"),
            ("D2", "A"),
            ("E2", "BRCA1"),
            ("F2", C_HGVSC_BRCA1),
            ("G2", "stop_gained"),
            ("H2", "YES"),
            ("A3", "13"),
            ("C3", "C"),
            ("D3", "T"),
            ("E3", "BRCA2"),
            ("F3", C_HGVSC_BRCA2),
            ("G3", "frameshift_variant"),
            ("H3", "No"),
            ("I3", "seen in control cohort"),
        ],
    );
    included
        .set_a1("B2", EnumCellValue::Integer(43045712))
        .expect("set pos");
    included
        .set_a1("B3", EnumCellValue::Integer(32339832))
        .expect("set pos");

    let mut interpret = SpecSheetGrid::new("interpret");
    set_texts(
        &mut interpret,
        &[
            ("C3", C_HGVSC_BRCA1),
            ("C4", "Hereditary breast and ovarian cancer syndrome"),
            ("C5", "AD"),
            ("C6", "1/400"),
            ("L8", "B_POINTS"),
            ("K9", "NA"),
            ("C9", "not common"),
            ("H10", "Very Strong"),
            ("C10", "nonsense variant in LoF gene"),
            ("H11", "NA"),
            ("C11", "no other change at this codon"),
            ("H16", "Supporting"),
            ("C16", "absent from gnomAD"),
            ("H23", "Supporting"),
            ("C23", "predicted deleterious"),
            ("B26", "FINAL ACMG CLASSIFICATION"),
            ("C26", "Likely Pathogenic"),
        ],
    );

    let mut workbook = SpecWorkbook::new();
    workbook.add_sheet(summary);
    workbook.add_sheet(included);
    workbook.add_sheet(interpret);
    workbook
}

/// Write an in-memory workbook to disk as `.xlsx`.
pub(crate) fn write_template_xlsx(source: &SpecWorkbook, path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    let fmt_date = Format::new().set_num_format("yyyy-mm-dd");
    let mut workbook = Workbook::new();
    for sheet_name in source.sheet_names() {
        let grid = source.sheet(&sheet_name).expect("sheet");
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet_name).expect("sheet name");
        let (n_rows, n_cols) = grid.extent();
        for row in 0..n_rows {
            for col in 0..n_cols {
                let (n_row, n_col) = (row as u32, col as u16);
                match grid.cell(SpecCellAddress::new(row, col)) {
                    EnumCellValue::None => {}
                    EnumCellValue::String(val) => {
                        worksheet.write_string(n_row, n_col, &val).expect("write");
                    }
                    EnumCellValue::Number(val) => {
                        worksheet.write_number(n_row, n_col, val).expect("write");
                    }
                    EnumCellValue::Integer(val) => {
                        worksheet
                            .write_number(n_row, n_col, val as f64)
                            .expect("write");
                    }
                    EnumCellValue::Boolean(val) => {
                        worksheet.write_boolean(n_row, n_col, val).expect("write");
                    }
                    EnumCellValue::DateTime(val) => {
                        let dt = ExcelDateTime::from_ymd(
                            val.year() as u16,
                            val.month() as u8,
                            val.day() as u8,
                        )
                        .expect("excel date");
                        worksheet
                            .write_datetime_with_format(n_row, n_col, &dt, &fmt_date)
                            .expect("write");
                    }
                }
            }
        }
    }
    workbook.save(path).expect("save workbook");
}
