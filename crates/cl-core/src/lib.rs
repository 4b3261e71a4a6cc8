//! cl-core: Core library for generating and reconciling Alma course loader files
//!
//! This library provides functionality to:
//! - Compile filter expressions that select course elements for export
//! - Read course catalogs and turn courses and cohorts into loader rows
//! - Encode and decode the fixed 31-column tab-separated row format
//! - Diff two generations of a loader file into create/update/delete files

pub mod catalog;
pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod reader;
pub mod row;
pub mod tsv;
pub mod value;

pub use catalog::{Catalog, CatalogCohort, CatalogCourse, CatalogReader};
pub use config::ExportConfig;
pub use diff::{
    diff, Change, DiffObserver, DiffOperation, DiffOptions, DiffSinks, DiffSummary, Flow,
    KeyedRows,
};
pub use error::{Error, Result};
pub use filter::{ExtractorTable, Filter, FilterError, FilterSpec};
pub use reader::{export, CourseElement, CourseReader};
pub use row::{CourseKey, CourseRow, Operation, FIELD_COUNT, HEADER};
pub use tsv::{read_rows, CourseWriter};
pub use value::{Value, ValueError};
