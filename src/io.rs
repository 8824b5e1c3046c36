//! Helpers for reading and writing attendance tables as CSV

use std::{
    collections::btree_map::Entry,
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::PathBuf,
};

use csv::{StringRecord, Terminator, Trim};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    errors::Error,
    ops,
    types::{
        AttendanceTable, RollNumber, RosterEntry, Status, Subject, TableStore, PERCENTAGE_HEADER,
        ROLL_NUMBER_HEADER,
    },
};

/// Suffix appended to the subject name to form a table's file name
pub const TABLE_FILE_SUFFIX: &str = "_attendance.csv";

/// Loads an attendance table from a CSV-formatted stream.
///
/// Expects input data in this format (including header):
/// ```csv
/// Roll Number,2024-01-10,2024-01-11,Attendance Percentage
/// 1,Present,Absent,50.00%
/// 2,Absent,Absent,0.00%
/// ```
///
/// Percentage columns are optional and their values are ignored, since they are always
/// recomputed. A percentage column in the middle of the header (left behind by older
/// tools that appended dates after it) is skipped the same way. Rows with fewer statuses
/// than there are dates are padded with [`Status::Absent`].
pub fn load_table_from_csv<R>(reader: &mut R) -> Result<AttendanceTable, Error>
where
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut records = csv_reader.records();
    let header = match records.next() {
        Some(header) => header?,
        None => return Err(Error::MalformedTable("missing header row".to_string())),
    };
    let columns = DateColumns::from_header(&header)?;

    let mut table = AttendanceTable::new();
    for (idx, record) in records.enumerate() {
        let record = record?;
        // Header is line 1
        let lineno = idx + 2;
        let entry = parse_row(&record, &columns.positions, lineno)?;
        match table.entries.entry(entry.roll_number) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(_) => {
                return Err(Error::MalformedTable(format!(
                    "duplicate roll number {} on line {lineno}",
                    entry.roll_number
                )))
            }
        }
    }
    table.dates = columns.dates;
    if table.is_empty() {
        warn!("Loaded table has no rolls");
    }
    debug!(
        "Loaded table with {} dates and {} rolls",
        table.dates.len(),
        table.len()
    );
    Ok(table)
}

/// The date columns of a header row, and where each one sits in the record
struct DateColumns {
    dates: Vec<String>,
    positions: Vec<usize>,
}

impl DateColumns {
    fn from_header(header: &StringRecord) -> Result<Self, Error> {
        match header.get(0) {
            Some(ROLL_NUMBER_HEADER) => (),
            other => {
                return Err(Error::MalformedTable(format!(
                    "expected first column {ROLL_NUMBER_HEADER:?}, found {other:?}"
                )))
            }
        }
        let (positions, dates): (Vec<usize>, Vec<String>) = header
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, column)| *column != PERCENTAGE_HEADER)
            .map(|(position, column)| (position, column.to_string()))
            .unzip();
        Ok(Self { dates, positions })
    }
}

fn parse_row(
    record: &StringRecord,
    positions: &[usize],
    lineno: usize,
) -> Result<RosterEntry, Error> {
    let roll_cell: StringRecord = record.iter().take(1).collect();
    let (roll_number,): (RollNumber,) = roll_cell.deserialize(None).map_err(|_| {
        Error::MalformedTable(format!(
            "invalid roll number {:?} on line {lineno}",
            record.get(0).unwrap_or_default()
        ))
    })?;
    let status_cells: StringRecord = positions
        .iter()
        .filter_map(|&position| record.get(position))
        .collect();
    let mut statuses: Vec<Status> = status_cells.deserialize(None).map_err(|err| {
        Error::MalformedTable(format!(
            "invalid status for roll {roll_number} on line {lineno}: {err}"
        ))
    })?;
    let width = positions.len();
    if statuses.len() < width {
        warn!(
            "Roll {roll_number} on line {lineno} has {} of {width} statuses, padding with {}",
            statuses.len(),
            Status::Absent
        );
        statuses.resize(width, Status::Absent);
    }
    Ok(RosterEntry::new(roll_number, statuses))
}

/// Type used for serializing a [`RosterEntry`], but also including its percentage.
#[derive(Serialize, Debug)]
struct RosterRow<'a> {
    /// The student this row belongs to
    roll_number: RollNumber,
    /// One status per date column; written as consecutive fields
    statuses: &'a [Status],
    /// The formatted attendance percentage, e.g. `50.00%`
    percentage: String,
}

impl<'a> RosterRow<'a> {
    fn new(entry: &'a RosterEntry) -> Result<Self, Error> {
        Ok(Self {
            roll_number: entry.roll_number(),
            statuses: entry.statuses(),
            percentage: ops::format_percentage(entry.attendance_percentage()?),
        })
    }
}

/// Outputs an attendance table as CSV, recomputing the percentage column.
///
/// Output data will be in the form:
/// ```csv
/// Roll Number,2024-01-10,Attendance Percentage
/// 1,Present,100.00%
/// 2,Absent,0.00%
/// ```
///
/// Records are terminated with `\r\n`, and rows are written in ascending roll order, so
/// writing the same table twice produces identical bytes.
///
/// # Errors
/// [`Error::NoDateColumns`] if the table has rows but no dates
pub fn write_table_to_csv<W>(writer: &mut W, table: &AttendanceTable) -> Result<(), Error>
where
    W: Write,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::CRLF)
        .from_writer(writer);
    csv_writer.write_record(table.header())?;
    for entry in table.entries() {
        csv_writer.serialize(RosterRow::new(entry)?)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Persists each subject's table as `<directory>/<subject>_attendance.csv`.
///
/// # Limitations
/// Files are rewritten in place with no locking, so only a single writer
/// per directory is supported.
#[derive(Debug, Clone)]
pub struct CsvDirectoryStore {
    /// Directory holding the table files; created on first save
    directory: PathBuf,
}

impl CsvDirectoryStore {
    /// Creates a store rooted at `directory`. Nothing is touched on disk until a save.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the path of the table file for a subject
    #[must_use]
    pub fn table_path(&self, subject: &Subject) -> PathBuf {
        self.directory
            .join(format!("{}{TABLE_FILE_SUFFIX}", subject.as_ref()))
    }
}

impl TableStore for CsvDirectoryStore {
    fn load(&self, subject: &Subject) -> Result<Option<AttendanceTable>, Error> {
        let path = self.table_path(subject);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No table at {}", path.display());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        debug!("Loading table from {}", path.display());
        let mut reader = BufReader::new(file);
        load_table_from_csv(&mut reader).map(Some)
    }

    fn persist(&mut self, subject: &Subject, table: &AttendanceTable) -> Result<(), Error> {
        fs::create_dir_all(&self.directory)?;
        let path = self.table_path(subject);
        // Render fully before truncating the existing file
        let mut buffer = Vec::new();
        write_table_to_csv(&mut buffer, table)?;
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(&buffer)?;
        writer.flush()?;
        info!(
            "Saved {} rolls over {} dates to {}",
            table.len(),
            table.dates().len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::types::DailyStatuses;

    use super::*;

    const TEST_TABLE_CSV: &[u8] = b"Roll Number,2024-01-10,2024-01-11,Attendance Percentage
1,  Present, Absent, 50.00%
3,Absent,Present,50.00%
2,Present,Present,100.00%
";

    fn statuses(pairs: &[(u32, Status)]) -> DailyStatuses {
        pairs
            .iter()
            .map(|&(roll, status)| (RollNumber::from(roll), status))
            .collect()
    }

    fn render(table: &AttendanceTable) -> String {
        let mut output = vec![];
        write_table_to_csv(&mut output, table).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_read_with_whitespace() {
        let table = load_table_from_csv(&mut Cursor::new(TEST_TABLE_CSV)).unwrap();
        assert_eq!(table.dates(), &["2024-01-10", "2024-01-11"]);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.entry(1.into()).unwrap().statuses(),
            &[Status::Present, Status::Absent]
        );
        let rolls: Vec<u32> = table.entries().map(|e| e.roll_number().get()).collect();
        assert_eq!(rolls, vec![1, 2, 3]);
    }

    #[test]
    fn test_write_sorted_with_percentages() {
        let table = load_table_from_csv(&mut Cursor::new(TEST_TABLE_CSV)).unwrap();
        assert_eq!(
            render(&table),
            "Roll Number,2024-01-10,2024-01-11,Attendance Percentage\r\n\
             1,Present,Absent,50.00%\r\n\
             2,Present,Present,100.00%\r\n\
             3,Absent,Present,50.00%\r\n"
        );
    }

    #[test]
    fn test_read_pads_short_rows_and_tolerates_missing_percentage() {
        let input = b"Roll Number,2024-01-10,2024-01-11\n5,Present\n";
        let table = load_table_from_csv(&mut Cursor::new(&input[..])).unwrap();
        assert_eq!(table.dates(), &["2024-01-10", "2024-01-11"]);
        assert_eq!(
            table.entry(5.into()).unwrap().statuses(),
            &[Status::Present, Status::Absent]
        );
    }

    #[test]
    fn test_read_rejects_malformed_tables() {
        let bad_header = b"Student,2024-01-10\n1,Present\n";
        assert!(matches!(
            load_table_from_csv(&mut Cursor::new(&bad_header[..])),
            Err(Error::MalformedTable(_))
        ));
        let bad_roll = b"Roll Number,2024-01-10\nfive,Present\n";
        assert!(matches!(
            load_table_from_csv(&mut Cursor::new(&bad_roll[..])),
            Err(Error::MalformedTable(_))
        ));
        let bad_status = b"Roll Number,2024-01-10\n1,Late\n";
        assert!(matches!(
            load_table_from_csv(&mut Cursor::new(&bad_status[..])),
            Err(Error::MalformedTable(message)) if message.contains("line 2")
        ));
        let duplicate = b"Roll Number,2024-01-10\n1,Present\n1,Absent\n";
        assert!(matches!(
            load_table_from_csv(&mut Cursor::new(&duplicate[..])),
            Err(Error::MalformedTable(_))
        ));
        assert!(matches!(
            load_table_from_csv(&mut Cursor::new(&b""[..])),
            Err(Error::MalformedTable(_))
        ));
    }

    #[test]
    fn test_read_skips_percentage_column_mid_header() {
        // Older tools appended new dates after the percentage column
        let input = b"Roll Number,2024-01-10,Attendance Percentage,2024-01-11
1,Present,100.00%,Absent
2,Absent,0.00%,Present
";
        let table = load_table_from_csv(&mut Cursor::new(&input[..])).unwrap();
        assert_eq!(table.dates(), &["2024-01-10", "2024-01-11"]);
        assert_eq!(
            table.entry(1.into()).unwrap().statuses(),
            &[Status::Present, Status::Absent]
        );
        assert_eq!(
            render(&table),
            "Roll Number,2024-01-10,2024-01-11,Attendance Percentage\r\n\
             1,Present,Absent,50.00%\r\n\
             2,Absent,Present,50.00%\r\n"
        );
    }

    #[test]
    fn test_write_without_dates_is_an_error() {
        let input = b"Roll Number,Attendance Percentage\n1,0.00%\n";
        let table = load_table_from_csv(&mut Cursor::new(&input[..])).unwrap();
        let mut output = vec![];
        assert!(matches!(
            write_table_to_csv(&mut output, &table),
            Err(Error::NoDateColumns(_))
        ));
    }

    #[test]
    fn test_remerge_is_byte_identical() {
        let day = statuses(&[(1, Status::Present), (2, Status::Absent)]);
        let first = render(&ops::merge(None, "2024-01-10", &day));
        let reloaded = load_table_from_csv(&mut Cursor::new(first.as_bytes())).unwrap();
        let second = render(&ops::merge(Some(reloaded), "2024-01-10", &day));
        assert_eq!(first, second);
        assert_eq!(
            first,
            "Roll Number,2024-01-10,Attendance Percentage\r\n1,Present,100.00%\r\n2,Absent,0.00%\r\n"
        );
    }

    #[test]
    fn test_directory_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvDirectoryStore::new(dir.path().join("atten"));
        let subject: Subject = "P&S".parse().unwrap();
        assert_eq!(
            store.table_path(&subject),
            dir.path().join("atten").join("P&S_attendance.csv")
        );
        assert!(store.load(&subject).unwrap().is_none());

        store
            .record(
                &subject,
                "2024-01-10",
                &statuses(&[(1, Status::Present), (2, Status::Present)]),
            )
            .unwrap();
        store
            .record(
                &subject,
                "2024-01-11",
                &statuses(&[(1, Status::Absent), (3, Status::Present)]),
            )
            .unwrap();

        let contents = fs::read_to_string(store.table_path(&subject)).unwrap();
        assert_eq!(
            contents,
            "Roll Number,2024-01-10,2024-01-11,Attendance Percentage\r\n\
             1,Present,Absent,50.00%\r\n\
             2,Present,Absent,50.00%\r\n\
             3,Absent,Present,50.00%\r\n"
        );
        let table = store.load(&subject).unwrap().unwrap();
        assert_eq!(table.dates(), &["2024-01-10", "2024-01-11"]);
        assert_eq!(table.len(), 3);
    }
}
