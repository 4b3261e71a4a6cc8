//! Reconciliation of two generations of a course loader file
//!
//! Rows are correlated by [`CourseKey`]. Keys only in the old file become
//! deletes, keys only in the new file become creates (or rollovers) and keys
//! whose rows differ become updates. Each change is shown to an optional
//! [`DiffObserver`] before it is written to the sink for its operation.

use crate::error::Result;
use crate::row::{CourseKey, CourseRow, Operation};
use crate::tsv::{read_rows, CourseWriter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rows of one file keyed by course key, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct KeyedRows {
    order: Vec<CourseKey>,
    rows: HashMap<CourseKey, CourseRow>,
}

impl KeyedRows {
    /// Key a sequence of rows; a later row replaces an earlier one with the
    /// same key but keeps its position
    pub fn from_rows<I: IntoIterator<Item = CourseRow>>(rows: I) -> Self {
        let mut keyed = Self::default();
        for row in rows {
            let key = row.key();
            if keyed.rows.insert(key.clone(), row).is_none() {
                keyed.order.push(key);
            }
        }
        keyed
    }

    /// Load and key the rows of a course loader file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let keyed = Self::from_rows(read_rows(path)?);
        debug!("Loaded {} keys from {}", keyed.len(), path.display());
        Ok(keyed)
    }

    /// Get the row for a key
    pub fn get(&self, key: &CourseKey) -> Option<&CourseRow> {
        self.rows.get(key)
    }

    /// Check if a key is present
    pub fn contains(&self, key: &CourseKey) -> bool {
        self.rows.contains_key(key)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate keys and rows in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&CourseKey, &CourseRow)> {
        self.order
            .iter()
            .filter_map(move |key| self.rows.get(key).map(|row| (key, row)))
    }
}

/// The kind of change for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOperation {
    Create,
    Delete,
    Update,
}

impl fmt::Display for DiffOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffOperation::Create => write!(f, "create"),
            DiffOperation::Delete => write!(f, "delete"),
            DiffOperation::Update => write!(f, "update"),
        }
    }
}

/// Options for a diff pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Write new rows with previous course columns as rollovers
    pub rollover: bool,
}

/// One change between the old and new file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change<'a> {
    Create { new: &'a CourseRow },
    Delete { old: &'a CourseRow },
    Update { old: &'a CourseRow, new: &'a CourseRow },
}

impl<'a> Change<'a> {
    /// The kind of change
    pub fn operation(&self) -> DiffOperation {
        match self {
            Change::Create { .. } => DiffOperation::Create,
            Change::Delete { .. } => DiffOperation::Delete,
            Change::Update { .. } => DiffOperation::Update,
        }
    }

    /// The old row, absent for creates
    pub fn old_row(&self) -> Option<&'a CourseRow> {
        match *self {
            Change::Create { .. } => None,
            Change::Delete { old } | Change::Update { old, .. } => Some(old),
        }
    }

    /// The new row, absent for deletes
    pub fn new_row(&self) -> Option<&'a CourseRow> {
        match *self {
            Change::Delete { .. } => None,
            Change::Create { new } | Change::Update { new, .. } => Some(new),
        }
    }

    /// The key of the changed row
    pub fn key(&self) -> CourseKey {
        match *self {
            Change::Create { new } | Change::Update { new, .. } => new.key(),
            Change::Delete { old } => old.key(),
        }
    }

    /// The row to write for this change, with its operation columns set
    ///
    /// A create becomes a rollover only when `options.rollover` is set and the
    /// new row names both a previous course code and section; otherwise it is
    /// written like an update.
    pub fn format(&self, options: &DiffOptions) -> CourseRow {
        let (mut row, operation) = match *self {
            Change::Create { new } if options.rollover && new.has_previous() => {
                (new.clone(), Operation::Rollover)
            }
            Change::Create { new } | Change::Update { new, .. } => (new.clone(), Operation::Update),
            Change::Delete { old } => (old.clone(), Operation::Delete),
        };
        operation.apply(&mut row);
        row
    }
}

/// Compute the changes between two keyed files
///
/// Deletes and updates come first, in old-file order, followed by creates in
/// new-file order. Identical rows produce no change.
pub fn changes<'a>(old: &'a KeyedRows, new: &'a KeyedRows) -> Vec<Change<'a>> {
    let mut result = Vec::new();

    for (key, old_row) in old.iter() {
        match new.get(key) {
            None => result.push(Change::Delete { old: old_row }),
            Some(new_row) if new_row != old_row => result.push(Change::Update {
                old: old_row,
                new: new_row,
            }),
            Some(_) => {}
        }
    }

    for (key, new_row) in new.iter() {
        if !old.contains(key) {
            result.push(Change::Create { new: new_row });
        }
    }

    result
}

/// What the diff should do after an observer has seen a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Write the change and carry on
    #[default]
    Continue,
    /// Do not write this change, carry on with the next key
    Skip,
    /// Stop the pass; nothing further is written
    Abort,
}

/// Receives each change before it is written
pub trait DiffObserver {
    /// Inspect a change and decide whether it is written
    fn observe(&mut self, change: &Change<'_>, options: &DiffOptions) -> Flow;
}

impl<F> DiffObserver for F
where
    F: FnMut(&Change<'_>, &DiffOptions) -> Flow,
{
    fn observe(&mut self, change: &Change<'_>, options: &DiffOptions) -> Flow {
        self(change, options)
    }
}

/// Output file paths, one per operation; operations without a path are
/// counted but not written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSinks {
    pub create: Option<PathBuf>,
    pub delete: Option<PathBuf>,
    pub update: Option<PathBuf>,
}

/// Open writers for each operation
pub struct DiffOutput<W: Write> {
    pub create: Option<CourseWriter<W>>,
    pub delete: Option<CourseWriter<W>>,
    pub update: Option<CourseWriter<W>>,
}

impl DiffOutput<BufWriter<File>> {
    /// Create every configured output file
    pub fn open(sinks: &DiffSinks) -> Result<Self> {
        Ok(Self {
            create: open_sink(sinks.create.as_deref())?,
            delete: open_sink(sinks.delete.as_deref())?,
            update: open_sink(sinks.update.as_deref())?,
        })
    }
}

fn open_sink(path: Option<&Path>) -> Result<Option<CourseWriter<BufWriter<File>>>> {
    path.map(CourseWriter::create_headerless).transpose()
}

impl<W: Write> DiffOutput<W> {
    /// An output that writes nothing
    pub fn none() -> Self {
        Self {
            create: None,
            delete: None,
            update: None,
        }
    }

    fn sink(&mut self, operation: DiffOperation) -> Option<&mut CourseWriter<W>> {
        match operation {
            DiffOperation::Create => self.create.as_mut(),
            DiffOperation::Delete => self.delete.as_mut(),
            DiffOperation::Update => self.update.as_mut(),
        }
    }

    /// Flush every writer, reporting the first failure after trying them all
    pub fn finish(self) -> Result<()> {
        let mut first_error = None;
        for writer in [self.create, self.delete, self.update].into_iter().flatten() {
            if let Err(e) = writer.finish() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Counts from one diff pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub created: usize,
    pub rolled_over: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub aborted: bool,
}

impl DiffSummary {
    fn record(&mut self, operation: DiffOperation, row: &CourseRow) {
        match operation {
            DiffOperation::Create => {
                self.created += 1;
                if row.operation() == Operation::Rollover.code() {
                    self.rolled_over += 1;
                }
            }
            DiffOperation::Delete => self.deleted += 1,
            DiffOperation::Update => self.updated += 1,
        }
    }

    /// Total number of changes seen, including skipped ones
    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted + self.skipped
    }
}

/// Reconcile two keyed files into an output
pub fn diff_rows<W: Write>(
    old: &KeyedRows,
    new: &KeyedRows,
    options: &DiffOptions,
    mut observer: Option<&mut dyn DiffObserver>,
    output: &mut DiffOutput<W>,
) -> Result<DiffSummary> {
    let mut summary = DiffSummary::default();

    for change in changes(old, new) {
        let flow = observer
            .as_mut()
            .map_or(Flow::Continue, |o| o.observe(&change, options));

        match flow {
            Flow::Continue => {}
            Flow::Skip => {
                debug!("Skipping {} of {}", change.operation(), change.key());
                summary.skipped += 1;
                continue;
            }
            Flow::Abort => {
                info!("Diff aborted at {}", change.key());
                summary.aborted = true;
                break;
            }
        }

        let operation = change.operation();
        let row = change.format(options);
        if let Some(writer) = output.sink(operation) {
            writer.write_row(&row)?;
        }
        summary.record(operation, &row);
    }

    Ok(summary)
}

/// Diff two course loader files, writing changes to the configured sinks
///
/// Input files are read before any output is created. Output files that were
/// opened are flushed on every exit path; write errors abort the pass.
pub fn diff<P: AsRef<Path>, Q: AsRef<Path>>(
    old_path: P,
    new_path: Q,
    sinks: &DiffSinks,
    options: &DiffOptions,
    observer: Option<&mut dyn DiffObserver>,
) -> Result<DiffSummary> {
    let old = KeyedRows::load(old_path.as_ref())?;
    let new = KeyedRows::load(new_path.as_ref())?;

    let mut output = DiffOutput::open(sinks)?;
    let result = diff_rows(&old, &new, options, observer, &mut output);
    let finished = output.finish();
    let summary = result?;
    finished?;

    info!(
        "Diff complete: {} created ({} rollover), {} updated, {} deleted, {} skipped",
        summary.created, summary.rolled_over, summary.updated, summary.deleted, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::col;
    use std::fs;

    fn row(code: &str, section: &str, title: &str) -> CourseRow {
        let mut row = CourseRow::new();
        row.set(col::COURSE_CODE, code);
        row.set(col::SECTION_ID, section);
        row.set(col::COURSE_TITLE, title);
        row
    }

    fn with_previous(mut row: CourseRow, code: &str, section: &str) -> CourseRow {
        row.set(col::OLD_COURSE_CODE, code);
        row.set(col::OLD_COURSE_SECTION_ID, section);
        row
    }

    fn write_file(dir: &Path, name: &str, rows: &[CourseRow]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = CourseWriter::create(&path).unwrap();
        for r in rows {
            writer.write_row(r).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn read_file(path: &Path) -> Vec<CourseRow> {
        read_rows(path).unwrap()
    }

    fn sinks(dir: &Path) -> DiffSinks {
        DiffSinks {
            create: Some(dir.join("create.txt")),
            delete: Some(dir.join("delete.txt")),
            update: Some(dir.join("update.txt")),
        }
    }

    #[test]
    fn test_keyed_rows_last_write_wins() {
        let keyed = KeyedRows::from_rows(vec![
            row("A", "1", "first"),
            row("B", "1", "other"),
            row("A", "1", "second"),
        ]);
        assert_eq!(keyed.len(), 2);
        let key = CourseKey::new("A", "1");
        assert_eq!(keyed.get(&key).unwrap().get(col::COURSE_TITLE), "second");
        let order: Vec<&str> = keyed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(order, vec!["A:1", "B:1"]);
    }

    #[test]
    fn test_changes_against_self_is_empty() {
        let keyed = KeyedRows::from_rows(vec![row("A", "1", "x"), row("B", "2", "y")]);
        assert!(changes(&keyed, &keyed).is_empty());
    }

    #[test]
    fn test_changes_classify_keys() {
        let old = KeyedRows::from_rows(vec![
            row("A", "1", "same"),
            row("B", "1", "before"),
            row("C", "1", "gone"),
        ]);
        let new = KeyedRows::from_rows(vec![
            row("D", "1", "added"),
            row("A", "1", "same"),
            row("B", "1", "after"),
        ]);

        let ops: Vec<(DiffOperation, String)> = changes(&old, &new)
            .iter()
            .map(|c| (c.operation(), c.key().to_string()))
            .collect();
        assert_eq!(
            ops,
            vec![
                (DiffOperation::Update, "B:1".to_string()),
                (DiffOperation::Delete, "C:1".to_string()),
                (DiffOperation::Create, "D:1".to_string()),
            ]
        );
    }

    #[test]
    fn test_padding_and_line_endings_are_not_updates() {
        let short = crate::tsv::parse_rows_str("A\tT\tS1\n", "old.txt").unwrap();
        let padded = format!("A\tT\tS1{}\r\n", "\t".repeat(28));
        let padded = crate::tsv::parse_rows_str(&padded, "new.txt").unwrap();

        let old = KeyedRows::from_rows(short);
        let new = KeyedRows::from_rows(padded);
        assert!(changes(&old, &new).is_empty());
    }

    #[test]
    fn test_format_delete_uses_old_row() {
        let mut old = with_previous(row("CRS1-2017", "S1", "T"), "CRS1-2016", "S1");
        old.set(col::OPERATION, "ROLLOVER");
        let formatted = Change::Delete { old: &old }.format(&DiffOptions::default());
        assert_eq!(formatted.operation(), "DELETE");
        assert_eq!(formatted.get(col::COURSE_TITLE), "T");
        assert!(!formatted.has_previous());
    }

    #[test]
    fn test_format_create_rollover() {
        let new = with_previous(row("CRS1-2018", "S1", "T"), "CRS1-2017", "S1");
        let change = Change::Create { new: &new };

        let rolled = change.format(&DiffOptions { rollover: true });
        assert_eq!(rolled.operation(), "ROLLOVER");
        assert_eq!(rolled.old_course_code(), "CRS1-2017");
        assert_eq!(rolled.old_section_id(), "S1");

        let plain = change.format(&DiffOptions { rollover: false });
        assert_eq!(plain.operation(), "");
        assert_eq!(plain.old_course_code(), "");
        assert_eq!(plain.old_section_id(), "");
    }

    #[test]
    fn test_format_create_without_previous_is_not_rollover() {
        let new = with_previous(row("CRS1-2018", "S1", "T"), "CRS1-2017", "");
        let formatted = Change::Create { new: &new }.format(&DiffOptions { rollover: true });
        assert_eq!(formatted.operation(), "");
        assert_eq!(formatted.old_course_code(), "");
    }

    #[test]
    fn test_format_update_uses_new_row() {
        let mut old = row("A", "1", "before");
        old.set(col::OPERATION, "DELETE");
        let new = with_previous(row("A", "1", "after"), "A0", "1");
        let change = Change::Update { old: &old, new: &new };
        let formatted = change.format(&DiffOptions { rollover: true });
        assert_eq!(formatted.get(col::COURSE_TITLE), "after");
        assert_eq!(formatted.operation(), "");
        assert!(!formatted.has_previous());
    }

    #[test]
    fn test_diff_files_delete_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let mut gone = row("CRS1-2017", "S1", "T");
        gone.set(col::OPERATION, "ROLLOVER");
        let old = write_file(dir.path(), "old.txt", &[gone, row("CRS2-2017", "S1", "U")]);
        let new = write_file(dir.path(), "new.txt", &[row("CRS2-2017", "S1", "U")]);

        let summary = diff(&old, &new, &sinks(dir.path()), &DiffOptions::default(), None).unwrap();
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.total(), 1);

        let deleted = read_file(&dir.path().join("delete.txt"));
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].course_code(), "CRS1-2017");
        assert_eq!(deleted[0].get(col::COURSE_TITLE), "T");
        assert_eq!(deleted[0].operation(), "DELETE");

        assert!(read_file(&dir.path().join("create.txt")).is_empty());
        assert!(read_file(&dir.path().join("update.txt")).is_empty());
    }

    #[test]
    fn test_diff_files_rollover_scenarios() {
        let dir = tempfile::tempdir().unwrap();
        let old = write_file(dir.path(), "old.txt", &[]);
        let new = write_file(
            dir.path(),
            "new.txt",
            &[with_previous(row("CRS1-2018", "S1", "T"), "CRS1-2017", "S1")],
        );

        let rollover = DiffOptions { rollover: true };
        let summary = diff(&old, &new, &sinks(dir.path()), &rollover, None).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.rolled_over, 1);
        let created = read_file(&dir.path().join("create.txt"));
        assert_eq!(created[0].operation(), "ROLLOVER");
        assert_eq!(created[0].old_course_code(), "CRS1-2017");

        let plain = DiffOptions { rollover: false };
        let summary = diff(&old, &new, &sinks(dir.path()), &plain, None).unwrap();
        assert_eq!(summary.rolled_over, 0);
        let created = read_file(&dir.path().join("create.txt"));
        assert_eq!(created[0].operation(), "");
        assert!(!created[0].has_previous());
    }

    #[test]
    fn test_diff_file_against_itself() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "same.txt", &[row("A", "1", "x"), row("B", "1", "y")]);
        let options = DiffOptions::default();
        let summary = diff(&path, &path, &sinks(dir.path()), &options, None).unwrap();
        assert_eq!(summary, DiffSummary::default());
        assert_eq!(fs::read_to_string(dir.path().join("update.txt")).unwrap(), "");
    }

    #[test]
    fn test_observer_skip_suppresses_only_that_key() {
        let old = KeyedRows::from_rows(vec![row("A", "1", "x"), row("B", "1", "y")]);
        let new = KeyedRows::default();

        let mut seen = Vec::new();
        let mut observer = |change: &Change<'_>, _: &DiffOptions| {
            seen.push(change.key().to_string());
            if change.key().as_str() == "A:1" {
                Flow::Skip
            } else {
                Flow::Continue
            }
        };

        let dir = tempfile::tempdir().unwrap();
        let mut output = DiffOutput::open(&sinks(dir.path())).unwrap();
        let summary = diff_rows(
            &old,
            &new,
            &DiffOptions::default(),
            Some(&mut observer as &mut dyn DiffObserver),
            &mut output,
        )
        .unwrap();
        output.finish().unwrap();

        assert_eq!(seen, vec!["A:1", "B:1"]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.deleted, 1);
        let deleted = read_file(&dir.path().join("delete.txt"));
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].course_code(), "B");
    }

    #[test]
    fn test_observer_receives_rows_and_options() {
        let old = KeyedRows::from_rows(vec![row("A", "1", "before"), row("C", "1", "gone")]);
        let new = KeyedRows::from_rows(vec![row("A", "1", "after"), row("D", "1", "added")]);

        type Seen = (Option<String>, Option<String>, DiffOperation, bool);
        let mut seen: Vec<Seen> = Vec::new();
        let mut observer = |change: &Change<'_>, options: &DiffOptions| {
            seen.push((
                change.old_row().map(CourseRow::encode),
                change.new_row().map(CourseRow::encode),
                change.operation(),
                options.rollover,
            ));
            Flow::Continue
        };

        let mut output: DiffOutput<Vec<u8>> = DiffOutput::none();
        let summary = diff_rows(
            &old,
            &new,
            &DiffOptions { rollover: true },
            Some(&mut observer as &mut dyn DiffObserver),
            &mut output,
        )
        .unwrap();
        assert_eq!(summary.total(), 3);

        let encoded = |code: &str, title: &str| Some(row(code, "1", title).encode());
        assert_eq!(
            seen,
            vec![
                (
                    encoded("A", "before"),
                    encoded("A", "after"),
                    DiffOperation::Update,
                    true
                ),
                (encoded("C", "gone"), None, DiffOperation::Delete, true),
                (None, encoded("D", "added"), DiffOperation::Create, true),
            ]
        );
    }

    #[test]
    fn test_observer_abort_stops_pass() {
        let old = KeyedRows::from_rows(vec![row("A", "1", "x"), row("B", "1", "y")]);
        let new = KeyedRows::default();
        let mut calls = 0;
        let mut observer = |_: &Change<'_>, _: &DiffOptions| {
            calls += 1;
            Flow::Abort
        };

        let mut output: DiffOutput<Vec<u8>> = DiffOutput::none();
        let summary = diff_rows(
            &old,
            &new,
            &DiffOptions::default(),
            Some(&mut observer as &mut dyn DiffObserver),
            &mut output,
        )
        .unwrap();
        assert!(summary.aborted);
        assert_eq!(summary.deleted, 0);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_missing_sinks_still_count() {
        let dir = tempfile::tempdir().unwrap();
        let old = write_file(dir.path(), "old.txt", &[row("A", "1", "x")]);
        let new = write_file(dir.path(), "new.txt", &[row("A", "1", "y"), row("B", "1", "z")]);
        let only_updates = DiffSinks {
            update: Some(dir.path().join("update.txt")),
            ..DiffSinks::default()
        };

        let summary = diff(&old, &new, &only_updates, &DiffOptions::default(), None).unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 1);
        assert!(!dir.path().join("create.txt").exists());
        assert_eq!(read_file(&dir.path().join("update.txt"))[0].get(col::COURSE_TITLE), "y");
    }

    #[test]
    fn test_missing_input_is_fatal_and_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let new = write_file(dir.path(), "new.txt", &[row("A", "1", "x")]);
        let missing = dir.path().join("missing.txt");

        let options = DiffOptions::default();
        let err = diff(&missing, &new, &sinks(dir.path()), &options, None).unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
        assert!(!dir.path().join("create.txt").exists());
    }

    #[test]
    fn test_unwritable_sink_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let old = write_file(dir.path(), "old.txt", &[]);
        let bad = DiffSinks {
            create: Some(dir.path().join("no-such-dir").join("create.txt")),
            ..DiffSinks::default()
        };
        let err = diff(&old, &old, &bad, &DiffOptions::default(), None).unwrap_err();
        assert!(err.to_string().contains("no-such-dir"));
    }
}
