use log::debug;
use rust_decimal::Decimal;

use crate::{
    errors::Error,
    types::{
        AttendanceSummary, AttendanceTable, DailyStatuses, MemoryTableStore, RosterEntry, Status,
        Subject, TableStore, PERCENTAGE_SCALE,
    },
};

/// Folds one date's statuses into a table, producing the updated table.
///
/// - A date that already has a column is overwritten in place, but only for the rolls in
///   `statuses`; every other roll keeps what it had for that date.
/// - A new date is appended as the last column, and rolls missing from `statuses` are
///   recorded as [`Status::Absent`] for it.
/// - Rolls that are new to the table get a row back-filled with [`Status::Absent`] for all
///   earlier dates.
///
/// No other date column is touched, so merging the same statuses twice is a no-op.
#[must_use]
pub fn merge(
    existing: Option<AttendanceTable>,
    date: &str,
    statuses: &DailyStatuses,
) -> AttendanceTable {
    let mut table = existing.unwrap_or_default();
    let column = match table.date_index(date) {
        Some(column) => {
            debug!("Overwriting {} statuses for existing date {date}", statuses.len());
            column
        }
        None => {
            debug!("Adding date column {date}");
            table.dates.push(date.to_string());
            table.dates.len() - 1
        }
    };
    let width = table.dates.len();
    for entry in table.entries.values_mut() {
        entry.statuses.resize(width, Status::Absent);
    }
    for (&roll_number, &status) in statuses {
        let entry = table
            .entries
            .entry(roll_number)
            .or_insert_with(|| RosterEntry::new(roll_number, vec![Status::Absent; width]));
        entry.statuses[column] = status;
    }
    table
}

/// Splits the rolls of a table into present and absent lists for a single date.
///
/// # Errors
/// [`Error::NoSuchDate`] if `date` has no column in the table
pub fn summarize(table: &AttendanceTable, date: &str) -> Result<AttendanceSummary, Error> {
    let column = table
        .date_index(date)
        .ok_or_else(|| Error::NoSuchDate(date.to_string()))?;
    let mut summary = AttendanceSummary {
        date: date.to_string(),
        present: Vec::new(),
        absent: Vec::new(),
    };
    for entry in table.entries() {
        match entry.statuses().get(column) {
            Some(Status::Present) => summary.present.push(entry.roll_number()),
            Some(Status::Absent) => summary.absent.push(entry.roll_number()),
            None => (),
        }
    }
    Ok(summary)
}

/// Computes `present / total * 100`, rounded to [`PERCENTAGE_SCALE`] places.
///
/// The ratio is exact and ties round half to even. Formatting a binary float can land
/// on the other side of a tie (`23 / 160` gives `14.38` here, `14.37` from a double).
///
/// Returns `None` when there are no dates to divide by.
#[must_use]
pub fn attendance_percentage(present: usize, total: usize) -> Option<Decimal> {
    if total == 0 {
        return None;
    }
    let mut percentage = (Decimal::from(present) * Decimal::ONE_HUNDRED / Decimal::from(total))
        .round_dp(PERCENTAGE_SCALE);
    percentage.rescale(PERCENTAGE_SCALE);
    Some(percentage)
}

/// Renders a percentage the way it is stored in the table, e.g. `66.67%`
#[must_use]
pub fn format_percentage(percentage: Decimal) -> String {
    format!("{percentage}%")
}

impl TableStore for MemoryTableStore {
    fn load(&self, subject: &Subject) -> Result<Option<AttendanceTable>, Error> {
        Ok(self.tables.get(subject).cloned())
    }

    fn persist(&mut self, subject: &Subject, table: &AttendanceTable) -> Result<(), Error> {
        self.tables.insert(subject.clone(), table.clone());
        Ok(())
    }
}
