use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{error, LevelFilter};
use rollcall::errors::Error;
use rollcall::form::{self, Session};
use rollcall::io::CsvDirectoryStore;
use rollcall::ops;
use rollcall::types::{RollNumber, Subject, TableStore};

/// Records per-subject attendance into CSV tables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the `<subject>_attendance.csv` tables. Created on first save.
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Turns on debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record attendance for one date. Rolls not listed as present are saved as absent.
    Mark {
        /// Roll number range, e.g. 1-50
        #[arg(short, long)]
        range: String,

        /// Date in YYYY-MM-DD form
        #[arg(long)]
        date: String,

        /// Subject name, e.g. Python
        #[arg(short, long)]
        subject: String,

        /// Comma-separated roll numbers that attended
        #[arg(short, long, value_delimiter = ',')]
        present: Vec<u32>,
    },

    /// Show who was present and absent on a date
    Summary {
        /// Date in YYYY-MM-DD form
        #[arg(long)]
        date: String,

        /// Subject name, e.g. Python
        #[arg(short, long)]
        subject: String,
    },
}

fn mark(
    store: &mut CsvDirectoryStore,
    range: &str,
    date: &str,
    subject: &str,
    present: Vec<u32>,
) -> Result<(), Error> {
    let mut session = Session::start(range, date, subject)?;
    session.mark_present(present.into_iter().map(RollNumber::from))?;
    let path = store.table_path(session.subject());
    let summary = session.save(store)?;
    println!("Attendance saved to {}", path.display());
    println!("{summary}");
    Ok(())
}

fn summary(store: &CsvDirectoryStore, date: &str, subject: &str) -> Result<(), Error> {
    let date = form::parse_date(date)?;
    let subject: Subject = subject.parse()?;
    let table = store
        .load(&subject)?
        .ok_or_else(|| Error::NoSuchDate(date.clone()))?;
    println!("{}", ops::summarize(&table, &date)?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let mut store = CsvDirectoryStore::new(cli.dir);
    let result = match cli.command {
        Commands::Mark {
            range,
            date,
            subject,
            present,
        } => mark(&mut store, &range, &date, &subject, present),
        Commands::Summary { date, subject } => summary(&store, &date, &subject),
    };
    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}
