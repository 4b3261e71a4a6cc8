//! Course readers: iteration over exportable course elements
//!
//! A reader supplies years, the courses taught in each year and the cohorts
//! each course is divided into. A course without cohorts is exported as one
//! element; otherwise each cohort is an element of its own.

use crate::error::Result;
use crate::filter::{ExtractorTable, Filter};
use crate::row::{CourseRow, Operation};
use crate::tsv::CourseWriter;
use std::io::Write;
use tracing::{debug, info};

/// One exportable unit: a whole course or one of its cohorts
#[derive(Debug)]
pub struct CourseElement<'a, Y, C, K> {
    pub year: Y,
    pub course: &'a C,
    pub cohort: Option<&'a K>,
}

/// A source of course elements
pub trait CourseReader {
    type Year: Clone + std::fmt::Display;
    type Course;
    type Cohort;

    /// Years to export, in export order
    fn years(&self) -> Vec<Self::Year>;

    /// Courses taught in a year
    fn courses(&self, year: &Self::Year) -> Vec<&Self::Course>;

    /// Cohorts of a course; empty when the course is not divided
    fn cohorts<'a>(
        &'a self,
        year: &Self::Year,
        course: &'a Self::Course,
    ) -> Vec<&'a Self::Cohort>;

    /// Build the course loader row for an element
    fn row(
        &self,
        year: &Self::Year,
        course: &Self::Course,
        cohort: Option<&Self::Cohort>,
    ) -> CourseRow;

    /// Named extractors available to filters
    fn extractors(&self) -> ExtractorTable<Self::Year, Self::Course, Self::Cohort>;

    /// Every element accepted by all of `filters`
    fn elements(
        &self,
        filters: &[Filter<Self::Year, Self::Course, Self::Cohort>],
    ) -> Vec<CourseElement<'_, Self::Year, Self::Course, Self::Cohort>> {
        let mut selected = Vec::new();
        for year in self.years() {
            for course in self.courses(&year) {
                let cohorts = self.cohorts(&year, course);
                if cohorts.is_empty() {
                    if Filter::all(filters, &year, course, None) {
                        selected.push(CourseElement {
                            year: year.clone(),
                            course,
                            cohort: None,
                        });
                    }
                    continue;
                }
                for cohort in cohorts {
                    if Filter::all(filters, &year, course, Some(cohort)) {
                        selected.push(CourseElement {
                            year: year.clone(),
                            course,
                            cohort: Some(cohort),
                        });
                    }
                }
            }
            debug!("Read courses for {}: {} selected so far", year, selected.len());
        }
        selected
    }

    /// Rows for every element accepted by all of `filters`
    fn rows(&self, filters: &[Filter<Self::Year, Self::Course, Self::Cohort>]) -> Vec<CourseRow> {
        self.elements(filters)
            .iter()
            .map(|e| self.row(&e.year, e.course, e.cohort))
            .collect()
    }
}

/// Write the selected rows of a reader, tagged with `operation`
///
/// Returns the number of rows written.
pub fn export<R, W>(
    reader: &R,
    filters: &[Filter<R::Year, R::Course, R::Cohort>],
    operation: Operation,
    writer: &mut CourseWriter<W>,
) -> Result<usize>
where
    R: CourseReader,
    W: Write,
{
    let rows = reader.rows(filters);
    for row in &rows {
        writer.write_with(row, operation)?;
    }
    info!(
        "Exported {} rows ({}) to {}",
        rows.len(),
        operation,
        writer.path().display()
    );
    Ok(rows.len())
}
