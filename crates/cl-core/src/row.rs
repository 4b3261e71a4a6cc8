//! Course loader rows: the fixed 31-column tab-separated schema

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of columns in a course loader row
pub const FIELD_COUNT: usize = 31;

/// Column names, written verbatim as the first row of an export
pub const HEADER: [&str; FIELD_COUNT] = [
    "COURSE_CODE",
    "COURSE_TITLE",
    "SECTION_ID",
    "ACAD_DEPT",
    "PROC_DEPT",
    "TERM1",
    "TERM2",
    "TERM3",
    "TERM4",
    "START_DATE",
    "END_DATE",
    "NUM_OF_PARTICIPANTS",
    "WEEKLY_HOURS",
    "YEAR",
    "SEARCH_ID1",
    "SEARCH_ID2",
    "SEARCH_ID3",
    "INSTR1",
    "INSTR2",
    "INSTR3",
    "INSTR4",
    "INSTR5",
    "INSTR6",
    "INSTR7",
    "INSTR8",
    "INSTR9",
    "INSTR10",
    "ALL_INSTRUCTORS",
    "OPERATION",
    "OLD_COURSE_CODE",
    "OLD_COURSE_SECTION_ID",
];

/// Column indices
pub mod col {
    pub const COURSE_CODE: usize = 0;
    pub const COURSE_TITLE: usize = 1;
    pub const SECTION_ID: usize = 2;
    pub const ACAD_DEPT: usize = 3;
    pub const PROC_DEPT: usize = 4;
    pub const TERM1: usize = 5;
    pub const START_DATE: usize = 9;
    pub const END_DATE: usize = 10;
    pub const NUM_OF_PARTICIPANTS: usize = 11;
    pub const WEEKLY_HOURS: usize = 12;
    pub const YEAR: usize = 13;
    pub const SEARCH_ID1: usize = 14;
    pub const INSTR1: usize = 17;
    pub const ALL_INSTRUCTORS: usize = 27;
    pub const OPERATION: usize = 28;
    pub const OLD_COURSE_CODE: usize = 29;
    pub const OLD_COURSE_SECTION_ID: usize = 30;

    /// Number of term slots
    pub const TERM_SLOTS: usize = 4;
    /// Number of search id slots
    pub const SEARCH_ID_SLOTS: usize = 3;
    /// Number of individual instructor slots
    pub const INSTRUCTOR_SLOTS: usize = 10;
}

/// Identity of a row across file generations: `course_code:section_id`
///
/// The year is not part of the key, so rows for different years sharing a
/// code and section collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseKey(String);

impl CourseKey {
    /// Build a key from a course code and section id
    pub fn new(course_code: &str, section_id: &str) -> Self {
        Self(format!("{}:{}", course_code, section_id))
    }

    /// The key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One course loader row
///
/// Always holds exactly [`FIELD_COUNT`] cells; absent values are empty
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRow {
    cells: Vec<String>,
}

impl CourseRow {
    /// Create a row with every cell empty
    pub fn new() -> Self {
        Self {
            cells: vec![String::new(); FIELD_COUNT],
        }
    }

    /// Create a row from cells, padding missing trailing cells
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowShape`] if there are more than [`FIELD_COUNT`]
    /// cells. `line` is the 1-based line number reported in that error.
    pub fn from_cells<I, S>(cells: I, line: u64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells: Vec<String> = cells.into_iter().map(Into::into).collect();
        if cells.len() > FIELD_COUNT {
            return Err(Error::RowShape {
                line,
                fields: cells.len(),
            });
        }
        cells.resize(FIELD_COUNT, String::new());
        Ok(Self { cells })
    }

    /// Decode one tab-separated line
    pub fn decode(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        Self::from_cells(line.split('\t'), 1)
    }

    /// Encode as one tab-separated line, without a line terminator
    pub fn encode(&self) -> String {
        self.cells.join("\t")
    }

    /// Get a cell by column index
    pub fn get(&self, index: usize) -> &str {
        self.cells.get(index).map_or("", String::as_str)
    }

    /// Set a cell by column index, ignoring indices outside the schema
    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = value.into();
        }
    }

    /// Set consecutive cells starting at `start`, at most `slots` of them
    pub fn set_slots<S: AsRef<str>>(&mut self, start: usize, slots: usize, values: &[S]) {
        for (i, value) in values.iter().take(slots).enumerate() {
            self.set(start + i, value.as_ref());
        }
    }

    /// All cells in column order
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// The course code column
    pub fn course_code(&self) -> &str {
        self.get(col::COURSE_CODE)
    }

    /// The section id column
    pub fn section_id(&self) -> &str {
        self.get(col::SECTION_ID)
    }

    /// The operation column
    pub fn operation(&self) -> &str {
        self.get(col::OPERATION)
    }

    /// The previous course code column, used by rollover
    pub fn old_course_code(&self) -> &str {
        self.get(col::OLD_COURSE_CODE)
    }

    /// The previous section id column, used by rollover
    pub fn old_section_id(&self) -> &str {
        self.get(col::OLD_COURSE_SECTION_ID)
    }

    /// Check if both previous course columns are filled in
    pub fn has_previous(&self) -> bool {
        !self.old_course_code().is_empty() && !self.old_section_id().is_empty()
    }

    /// Clear the previous course columns
    pub fn clear_previous(&mut self) {
        self.set(col::OLD_COURSE_CODE, "");
        self.set(col::OLD_COURSE_SECTION_ID, "");
    }

    /// The key used to correlate rows across files
    pub fn key(&self) -> CourseKey {
        CourseKey::new(self.course_code(), self.section_id())
    }

    /// Check if this row is the column header
    pub fn is_header(&self) -> bool {
        self.cells.iter().map(String::as_str).eq(HEADER.iter().copied())
    }

    /// The header as a row
    pub fn header() -> Self {
        Self {
            cells: HEADER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for CourseRow {
    fn default() -> Self {
        Self::new()
    }
}

/// The operation a course loader row asks Alma to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create or update the course (empty operation column)
    #[default]
    Update,
    /// Delete the course
    Delete,
    /// Create the course, copying reading lists from the previous course
    Rollover,
}

impl Operation {
    /// The text written to the operation column
    pub fn code(self) -> &'static str {
        match self {
            Operation::Update => "",
            Operation::Delete => "DELETE",
            Operation::Rollover => "ROLLOVER",
        }
    }

    /// Tag a row with this operation
    ///
    /// Rollover keeps the previous course columns; the other operations clear
    /// them.
    pub fn apply(self, row: &mut CourseRow) {
        row.set(col::OPERATION, self.code());
        if self != Operation::Rollover {
            row.clear_previous();
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Rollover => write!(f, "rollover"),
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            "rollover" => Ok(Operation::Rollover),
            other => Err(Error::Config(format!("unknown operation: {}", other))),
        }
    }
}
