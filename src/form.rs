//! Collecting a day's attendance before it is saved

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::NaiveDate;
use log::debug;

use crate::{
    errors::Error,
    ops,
    types::{AttendanceSummary, DailyStatuses, RollNumber, Status, Subject, TableStore},
};

/// Format of the dates used as column headers
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Most rolls a single session may cover
pub const MAX_ROLLS_PER_SESSION: u32 = 10_000;

/// An inclusive range of roll numbers, written `start-end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollRange {
    start: u32,
    end: u32,
}

impl RollRange {
    /// Iterates over every roll number in the range, in order
    pub fn rolls(&self) -> impl Iterator<Item = RollNumber> {
        (self.start..=self.end).map(RollNumber::from)
    }
}

impl FromStr for RollRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::MissingInput("roll number range"));
        }
        let format_error = || Error::RangeFormat(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(format_error)?;
        let start: u32 = start.trim().parse().map_err(|_| format_error())?;
        let end: u32 = end.trim().parse().map_err(|_| format_error())?;
        if start > end || end - start >= MAX_ROLLS_PER_SESSION {
            return Err(format_error());
        }
        Ok(Self { start, end })
    }
}

impl Display for RollRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Checks that `date` is a real `YYYY-MM-DD` date and returns it in that exact form
///
/// # Errors
/// [`Error::MissingInput`] if `date` is blank, [`Error::DateFormat`] if it is not a
/// calendar date
pub fn parse_date(date: &str) -> Result<String, Error> {
    let date = date.trim();
    if date.is_empty() {
        return Err(Error::MissingInput("date"));
    }
    let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| Error::DateFormat(date.to_string()))?;
    Ok(parsed.format(DATE_FORMAT).to_string())
}

/// An attendance session: everything between choosing a roll range, date and subject and
/// saving the result.
///
/// Every roll on the checklist starts out absent. The session is consumed by
/// [`Session::save`], so a new one has to be started for the next date or subject.
#[derive(Debug, Clone)]
pub struct Session {
    date: String,
    subject: Subject,
    /// Whether each roll has been ticked as present
    checklist: BTreeMap<RollNumber, bool>,
}

impl Session {
    /// Validates the three inputs and builds the checklist.
    ///
    /// # Errors
    /// [`Error::MissingInput`] if any input is blank, [`Error::RangeFormat`],
    /// [`Error::DateFormat`] or [`Error::InvalidSubject`] if one does not parse.
    pub fn start(range: &str, date: &str, subject: &str) -> Result<Self, Error> {
        let range: RollRange = range.parse()?;
        let date = parse_date(date)?;
        let subject: Subject = subject.parse()?;
        let checklist = range.rolls().map(|roll| (roll, false)).collect();
        debug!("Started {subject} session for {date} over rolls {range}");
        Ok(Self {
            date,
            subject,
            checklist,
        })
    }

    /// Returns the date being recorded
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Returns the subject being recorded
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Returns the checklist, one entry per roll in the range
    #[must_use]
    pub fn checklist(&self) -> &BTreeMap<RollNumber, bool> {
        &self.checklist
    }

    /// Ticks or unticks a roll.
    ///
    /// # Errors
    /// [`Error::UnknownRoll`] if the roll is outside the session's range
    pub fn mark(&mut self, roll_number: RollNumber, present: bool) -> Result<(), Error> {
        let checked = self
            .checklist
            .get_mut(&roll_number)
            .ok_or(Error::UnknownRoll(roll_number))?;
        *checked = present;
        Ok(())
    }

    /// Ticks every listed roll as present, stopping at the first unknown roll
    ///
    /// # Errors
    /// [`Error::UnknownRoll`] for the first roll outside the session's range
    pub fn mark_present<I>(&mut self, roll_numbers: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = RollNumber>,
    {
        roll_numbers
            .into_iter()
            .try_for_each(|roll_number| self.mark(roll_number, true))
    }

    /// Converts the checklist into the statuses to be saved
    #[must_use]
    pub fn statuses(&self) -> DailyStatuses {
        self.checklist
            .iter()
            .map(|(&roll_number, &present)| (roll_number, Status::from(present)))
            .collect()
    }

    /// Saves the session into `store` and summarizes the saved date.
    ///
    /// # Errors
    /// Whatever the store returns while loading or persisting the table, e.g.
    /// [`Error::Io`] or [`Error::MalformedTable`]
    pub fn save<S>(self, store: &mut S) -> Result<AttendanceSummary, Error>
    where
        S: TableStore,
    {
        let table = store.record(&self.subject, &self.date, &self.statuses())?;
        ops::summarize(&table, &self.date)
    }
}
