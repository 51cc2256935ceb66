//! `pandora_workbook` v1:
//! Rust-side clinical variant workbook extraction kernel.
//!
//! Reads the fixed-layout `summary`, `included` and `interpret*` sheets of a
//! variant interpretation workbook, validates them against each other and
//! reduces them to one normalized record per included variant.
//!
//! Architecture:
//! - `conf`     : template constants and default presets
//! - `spec`     : configuration, cell model, records and errors
//! - `util`     : pure helper functions
//! - `reader`   : workbook source contract and calamine loader
//! - `extract`  : summary / included / interpretation extractors
//! - `validate` : layout, cross-sheet and interpreted-column checks
//! - `merge`    : three-way join and label normalization
//! - `parse`    : top-level pipeline entry points
//! - `writer`   : DataFrame / IPC / review workbook export
pub mod conf;
pub mod extract;
pub mod merge;
pub mod parse;
pub mod reader;
pub mod spec;
pub mod util;
pub mod validate;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use conf::{
    C_REF_GENOME_UNDEFINED, C_STRENGTH_NOT_APPLICABLE, TUP_ACGS_CRITERIA_DEFAULTS,
    TUP_GERMLINE_CLASSIFICATIONS, TUP_INTERPRET_FIELD_CELLS, derive_default_pandora_config,
};
pub use extract::{
    extract_included, extract_interpretation_table, extract_summary, normalize_interpretation,
};
pub use merge::merge_records;
pub use parse::{extract_workbook_records, parse_workbook_file};
pub use reader::{SpecSheetGrid, SpecWorkbook, WorkbookSource, load_workbook, locate_field};
pub use spec::{
    EnumCellLocator, EnumCellValue, EnumSampleNameRule, EnumSubmissionTransformConfig,
    SpecCellAddress, SpecCriterionCall, SpecDatabaseConfig, SpecDrugResponseConfig,
    SpecExcludeRule, SpecExtraction, SpecIncludedVariant, SpecInterpretationRecord,
    SpecMergedVariantRecord, SpecPandoraConfig, SpecSampleIdentifier, SpecSiteConfig,
    SpecSummaryRecord, WorkbookError,
};
pub use util::{
    check_sample_name, derive_classification_comment, derive_folder_name,
    split_sample_identifier,
};
pub use validate::{validate_interpret_table, validate_interpreted_column, validate_layout};
pub use writer::{
    ReviewXlsxWriter, derive_dataframe_from_records, derive_ipc_bytes_from_records,
    derive_record_columns,
};
