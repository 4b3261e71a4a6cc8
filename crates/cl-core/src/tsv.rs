//! Tab-separated course loader file I/O
//!
//! Fields are delimited by literal tabs with no quoting or escaping.

use crate::error::{Error, Result};
use crate::row::{CourseRow, Operation};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(false)
        .flexible(true);
    builder
}

/// Read every row of a course loader file, skipping a leading header row
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<CourseRow>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_rows(BufReader::new(file), path)
}

/// Parse rows from a string (useful for testing)
pub fn parse_rows_str(content: &str, source_name: &str) -> Result<Vec<CourseRow>> {
    parse_rows(content.as_bytes(), Path::new(source_name))
}

fn parse_rows<R: Read>(reader: R, path: &Path) -> Result<Vec<CourseRow>> {
    let mut tsv_reader = reader_builder().from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in tsv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        if record.len() == 1 && record[0].is_empty() {
            continue;
        }

        let line = record.position().map_or(index as u64 + 1, |p| p.line());
        let row = CourseRow::from_cells(record.iter(), line)?;

        if index == 0 && row.is_header() {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Writer for course loader files
///
/// Rows are buffered; call [`CourseWriter::finish`] to flush and surface
/// write errors. A writer that is dropped early still flushes what it can.
pub struct CourseWriter<W: Write> {
    inner: csv::Writer<W>,
    path: PathBuf,
    rows_written: usize,
}

impl CourseWriter<BufWriter<File>> {
    /// Create an export file, writing the header row first
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut writer = Self::create_headerless(path)?;
        writer.write_cells(&CourseRow::header())?;
        Ok(writer)
    }

    /// Create a file without a header row, as used for diff output
    pub fn create_headerless<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_writer(BufWriter::new(file), path))
    }
}

impl<W: Write> CourseWriter<W> {
    /// Wrap an arbitrary writer; `path` is only used in error messages
    pub fn from_writer(writer: W, path: impl Into<PathBuf>) -> Self {
        let inner = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .flexible(true)
            .from_writer(writer);
        Self {
            inner,
            path: path.into(),
            rows_written: 0,
        }
    }

    /// Write a row as-is
    pub fn write_row(&mut self, row: &CourseRow) -> Result<()> {
        self.write_cells(row)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write a copy of a row tagged with an operation
    pub fn write_with(&mut self, row: &CourseRow, operation: Operation) -> Result<()> {
        let mut row = row.clone();
        operation.apply(&mut row);
        self.write_row(&row)
    }

    /// Number of data rows written (the header is not counted)
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// The output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered rows and return the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().map_err(|e| Error::FileWrite {
            path: self.path.clone(),
            source: e,
        })?;
        let path = self.path;
        self.inner.into_inner().map_err(|e| Error::FileWrite {
            path,
            source: e.into_error(),
        })
    }

    fn write_cells(&mut self, row: &CourseRow) -> Result<()> {
        self.inner
            .write_record(row.cells())
            .map_err(|e| Error::Csv {
                path: self.path.clone(),
                source: e,
            })
    }
}
