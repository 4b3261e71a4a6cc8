//! JSON course catalogs
//!
//! A catalog lists courses with their year, section, terms, instructors and
//! optional cohorts. [`CatalogReader`] turns it into course loader rows.

use crate::error::{Error, Result};
use crate::filter::ExtractorTable;
use crate::reader::CourseReader;
use crate::row::{col, CourseRow};
use crate::value::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Date format used in course loader files
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Separator for the aggregate instructor column
pub const INSTRUCTOR_SEPARATOR: &str = ";";

/// A course/section a new course rolls over from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousCourse {
    pub code: String,
    pub section: String,
}

/// A course in the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogCourse {
    pub code: String,
    pub title: String,
    pub section: String,
    pub year: i32,
    pub academic_department: String,
    pub processing_department: String,
    pub terms: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub participants: Option<u32>,
    pub weekly_hours: Option<f64>,
    pub search_ids: Vec<String>,
    pub instructors: Vec<String>,
    pub previous: Option<PreviousCourse>,
    pub cohorts: Vec<CatalogCohort>,
}

/// A subdivision of a course, exported as its own section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogCohort {
    pub code: String,
    pub title: Option<String>,
    pub participants: Option<u32>,
    pub instructors: Option<Vec<String>>,
    pub previous: Option<PreviousCourse>,
}

/// The catalog document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub courses: Vec<CatalogCourse>,
}

/// Reader over a JSON catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogReader {
    catalog: Catalog,
}

impl CatalogReader {
    /// Wrap an already-loaded catalog
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Load a catalog file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parse a catalog from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let catalog = serde_json::from_str(content).map_err(Error::Json)?;
        Ok(Self::new(catalog))
    }

    /// The wrapped catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The catalog's extractor table
    ///
    /// `code` is the default extractor.
    pub fn extractor_table() -> ExtractorTable<i32, CatalogCourse, CatalogCohort> {
        ExtractorTable::new()
            .with("code", |_: &i32, c: &CatalogCourse, _: Option<&CatalogCohort>| {
                Value::from(c.code.as_str())
            })
            .with("title", |_: &i32, c: &CatalogCourse, _: Option<&CatalogCohort>| {
                Value::from(c.title.as_str())
            })
            .with("section", |_: &i32, c: &CatalogCourse, k: Option<&CatalogCohort>| {
                Value::from(section_id(c, k))
            })
            .with("year", |y: &i32, _: &CatalogCourse, _: Option<&CatalogCohort>| {
                Value::from(*y)
            })
            .with("department", |_: &i32, c: &CatalogCourse, _: Option<&CatalogCohort>| {
                Value::from(c.academic_department.as_str())
            })
            .with("term", |_: &i32, c: &CatalogCourse, _: Option<&CatalogCohort>| {
                Value::from(c.terms.clone())
            })
            .with("instructor", |_: &i32, c: &CatalogCourse, k: Option<&CatalogCohort>| {
                Value::from(instructors(c, k).to_vec())
            })
            .with("cohort", |_: &i32, _: &CatalogCourse, k: Option<&CatalogCohort>| {
                Value::from(k.map(|k| k.code.as_str()))
            })
            .with("participants", |_: &i32, c: &CatalogCourse, k: Option<&CatalogCohort>| {
                Value::from(participants(c, k))
            })
            .with_default("code")
    }
}

fn section_id(course: &CatalogCourse, cohort: Option<&CatalogCohort>) -> String {
    match cohort {
        Some(k) if course.section.is_empty() => k.code.clone(),
        Some(k) => format!("{}-{}", course.section, k.code),
        None => course.section.clone(),
    }
}

fn instructors<'a>(course: &'a CatalogCourse, cohort: Option<&'a CatalogCohort>) -> &'a [String] {
    cohort
        .and_then(|k| k.instructors.as_deref())
        .unwrap_or(&course.instructors)
}

fn participants(course: &CatalogCourse, cohort: Option<&CatalogCohort>) -> Option<u32> {
    cohort.and_then(|k| k.participants).or(course.participants)
}

fn previous(course: &CatalogCourse, cohort: Option<&CatalogCohort>) -> Option<PreviousCourse> {
    match cohort {
        Some(k) => k.previous.clone().or_else(|| {
            course.previous.as_ref().map(|p| PreviousCourse {
                code: p.code.clone(),
                section: if p.section.is_empty() {
                    k.code.clone()
                } else {
                    format!("{}-{}", p.section, k.code)
                },
            })
        }),
        None => course.previous.clone(),
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

impl CourseReader for CatalogReader {
    type Year = i32;
    type Course = CatalogCourse;
    type Cohort = CatalogCohort;

    fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.catalog.courses.iter().map(|c| c.year).collect();
        years.into_iter().collect()
    }

    fn courses(&self, year: &i32) -> Vec<&CatalogCourse> {
        self.catalog
            .courses
            .iter()
            .filter(|c| c.year == *year)
            .collect()
    }

    fn cohorts<'a>(&'a self, _year: &i32, course: &'a CatalogCourse) -> Vec<&'a CatalogCohort> {
        course.cohorts.iter().collect()
    }

    fn row(&self, year: &i32, course: &CatalogCourse, cohort: Option<&CatalogCohort>) -> CourseRow {
        let mut row = CourseRow::new();

        let title = match cohort {
            Some(k) => format!(
                "{} ({})",
                course.title,
                k.title.as_deref().unwrap_or(&k.code)
            ),
            None => course.title.clone(),
        };

        row.set(col::COURSE_CODE, course.code.as_str());
        row.set(col::COURSE_TITLE, title);
        row.set(col::SECTION_ID, section_id(course, cohort));
        row.set(col::ACAD_DEPT, course.academic_department.as_str());
        row.set(col::PROC_DEPT, course.processing_department.as_str());
        row.set_slots(col::TERM1, col::TERM_SLOTS, &course.terms);
        row.set(col::START_DATE, format_date(course.start_date));
        row.set(col::END_DATE, format_date(course.end_date));
        row.set(
            col::NUM_OF_PARTICIPANTS,
            participants(course, cohort).map(|n| n.to_string()).unwrap_or_default(),
        );
        row.set(
            col::WEEKLY_HOURS,
            course.weekly_hours.map(|h| h.to_string()).unwrap_or_default(),
        );
        row.set(col::YEAR, year.to_string());
        row.set_slots(col::SEARCH_ID1, col::SEARCH_ID_SLOTS, &course.search_ids);

        let instructors = instructors(course, cohort);
        row.set_slots(col::INSTR1, col::INSTRUCTOR_SLOTS, instructors);
        row.set(col::ALL_INSTRUCTORS, instructors.join(INSTRUCTOR_SEPARATOR));

        if let Some(prev) = previous(course, cohort) {
            row.set(col::OLD_COURSE_CODE, prev.code);
            row.set(col::OLD_COURSE_SECTION_ID, prev.section);
        }

        row
    }

    fn extractors(&self) -> ExtractorTable<i32, CatalogCourse, CatalogCohort> {
        Self::extractor_table()
    }
}
