//! Common datatypes supporting functions throughout rollcall

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{errors::Error, ops};

/// Header of the first column of every attendance table
pub const ROLL_NUMBER_HEADER: &str = "Roll Number";

/// Header of the last column of every attendance table
pub const PERCENTAGE_HEADER: &str = "Attendance Percentage";

/// The number of decimals kept for attendance percentages
pub const PERCENTAGE_SCALE: u32 = 2;

/// Unique identifier for a student within a subject's table
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct RollNumber(u32);

impl From<u32> for RollNumber {
    fn from(roll_number: u32) -> Self {
        Self(roll_number)
    }
}

impl Display for RollNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RollNumber {
    /// Returns the underlying integer
    #[must_use]
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Whether a student attended on a given date
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The student attended
    Present,
    /// The student did not attend, or was not recorded
    Absent,
}

impl Status {
    /// Returns the word stored in the table for this status
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "Present",
            Status::Absent => "Absent",
        }
    }
}

impl From<bool> for Status {
    fn from(present: bool) -> Self {
        if present {
            Status::Present
        } else {
            Status::Absent
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a subject. Each subject is persisted in its own table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject(String);

impl FromStr for Subject {
    type Err = Error;

    /// Trims the name and rejects anything that would escape the output directory
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(Error::MissingInput("subject"));
        }
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(Error::InvalidSubject(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The statuses recorded for one date, keyed by roll number.
///
/// This is the only state carried from a [`Session`](crate::form::Session) into a save.
pub type DailyStatuses = BTreeMap<RollNumber, Status>;

/// One row of an [`AttendanceTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// The student this row belongs to
    pub(crate) roll_number: RollNumber,
    /// One status per date column, in header order
    pub(crate) statuses: Vec<Status>,
}

impl RosterEntry {
    /// Creates a row from its statuses
    #[must_use]
    pub fn new(roll_number: RollNumber, statuses: Vec<Status>) -> Self {
        Self {
            roll_number,
            statuses,
        }
    }

    /// Returns the roll number of this row
    #[must_use]
    #[inline]
    pub fn roll_number(&self) -> RollNumber {
        self.roll_number
    }

    /// Returns the statuses of this row, one per date column
    #[must_use]
    #[inline]
    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    /// Returns how many dates this student was present on
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|status| **status == Status::Present)
            .count()
    }

    /// Returns the share of date columns this student was present for, as a percentage.
    ///
    /// # Errors
    /// [`Error::NoDateColumns`] if the row has no date columns at all
    pub fn attendance_percentage(&self) -> Result<Decimal, Error> {
        ops::attendance_percentage(self.present_count(), self.statuses.len())
            .ok_or(Error::NoDateColumns(self.roll_number))
    }
}

/// A subject's attendance register: one column per date, one row per roll number.
///
/// The percentage column is never stored; it is derived from the statuses whenever
/// the table is written or displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceTable {
    /// Date column headers, in the order they were first recorded
    pub(crate) dates: Vec<String>,
    /// Rows, kept sorted by roll number
    pub(crate) entries: BTreeMap<RollNumber, RosterEntry>,
}

impl AttendanceTable {
    /// Creates a new table with no dates and no rows
    #[must_use]
    pub fn new() -> Self {
        AttendanceTable::default()
    }

    /// Returns the date column headers
    #[must_use]
    #[inline]
    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    /// Returns the position of `date` among the date columns
    #[must_use]
    pub fn date_index(&self, date: &str) -> Option<usize> {
        self.dates.iter().position(|d| d == date)
    }

    /// Returns the row for a roll number, if present
    #[must_use]
    pub fn entry(&self, roll_number: RollNumber) -> Option<&RosterEntry> {
        self.entries.get(&roll_number)
    }

    /// Iterates over rows in ascending roll number order
    pub fn entries(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.values()
    }

    /// Returns the number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the full header row, including the roll number and percentage columns
    #[must_use]
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(ROLL_NUMBER_HEADER)
            .chain(self.dates.iter().map(String::as_str))
            .chain(std::iter::once(PERCENTAGE_HEADER))
            .collect()
    }
}

/// Present and absent students for a single date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSummary {
    /// The date that was summarized
    pub date: String,
    /// Students marked present, in table order
    pub present: Vec<RollNumber>,
    /// Students marked absent, in table order
    pub absent: Vec<RollNumber>,
}

fn join_rolls(rolls: &[RollNumber]) -> String {
    rolls
        .iter()
        .map(RollNumber::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for AttendanceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Date: {}", self.date)?;
        writeln!(f, "Present: {}", join_rolls(&self.present))?;
        write!(f, "Absent: {}", join_rolls(&self.absent))
    }
}

/// An interface to the persisted tables, one per subject
pub trait TableStore {
    /// Records a day's statuses for a subject: loads the current table (if any), merges the
    /// statuses in under `date` and persists the result, which is also returned.
    fn record(
        &mut self,
        subject: &Subject,
        date: &str,
        statuses: &DailyStatuses,
    ) -> Result<AttendanceTable, Error> {
        let existing = self.load(subject)?;
        let table = ops::merge(existing, date, statuses);
        self.persist(subject, &table)?;
        Ok(table)
    }

    /// Fetches the table for a subject, or `None` if nothing was saved for it yet
    fn load(&self, subject: &Subject) -> Result<Option<AttendanceTable>, Error>;

    /// Replaces the stored table for a subject
    fn persist(&mut self, subject: &Subject, table: &AttendanceTable) -> Result<(), Error>;
}

/// Holds all tables in an in-memory structure.
///
/// # Limitations
/// No persistence.
#[derive(Default, Debug)]
pub struct MemoryTableStore {
    /// Storage for the map of subject to table
    pub(crate) tables: HashMap<Subject, AttendanceTable>,
}

impl MemoryTableStore {
    /// Creates a new, empty [`MemoryTableStore`].
    #[must_use]
    pub fn new() -> Self {
        MemoryTableStore::default()
    }
}
