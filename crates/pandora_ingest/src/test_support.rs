//! Fixtures shared by unit tests.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use pandora_workbook::{EnumCellValue, SpecSheetGrid, SpecWorkbook};

pub(crate) struct TestDir {
    path: PathBuf,
}

impl TestDir {
    pub(crate) fn new() -> Self {
        let n = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("pandora_ingest_test_{n}"));
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

pub(crate) fn write_text(path: &Path, txt: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, txt).expect("write text");
}

pub(crate) const C_HGVSC: &str = "NM_007294.4:c.5503C>T";

/// Single-variant template workbook with one interpretation sheet.
pub(crate) fn build_workbook(hgvsc: &str, interpreted: &str) -> SpecWorkbook {
    let mut summary = SpecSheetGrid::new("summary");
    for (address, text) in [
        ("B1", "123456789-23053R0001-23NGWES1-9527-F-99347387"),
        ("F1", "R208.1_Inherited breast cancer and ovarian cancer"),
        ("F2", "_HGNC:1100"),
        ("A20", "Reference:"),
        ("B20", "GRCh37.p13"),
        ("G21", "Date"),
        ("G22", "2023-11-07"),
    ] {
        summary.set_text(address, text).expect("set text");
    }
    summary
        .set_a1("C38", EnumCellValue::Integer(1))
        .expect("set count");

    let mut included = SpecSheetGrid::new("included");
    for (address, text) in [
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
        ("F2", hgvsc),
        ("G2", "stop_gained"),
        ("H2", interpreted),
    ] {
        included.set_text(address, text).expect("set text");
    }
    included
        .set_a1("B2", EnumCellValue::Integer(43045712))
        .expect("set pos");

    let mut interpret = SpecSheetGrid::new("interpret");
    for (address, text) in [
        ("C3", hgvsc),
        ("C4", "Hereditary breast and ovarian cancer syndrome"),
        ("C5", "AD"),
        ("L8", "B_POINTS"),
        ("K9", "NA"),
        ("H10", "Very Strong"),
        ("C10", "nonsense variant in LoF gene"),
        ("B26", "FINAL ACMG CLASSIFICATION"),
        ("C26", "Pathogenic"),
    ] {
        interpret.set_text(address, text).expect("set text");
    }

    let mut workbook = SpecWorkbook::new();
    workbook.add_sheet(summary);
    workbook.add_sheet(included);
    workbook.add_sheet(interpret);
    workbook
}
