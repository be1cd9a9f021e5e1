use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use calamine::{Data, Range, Reader};

use crate::error::LoadError;
use crate::models::ParticipantRecord;

static EMPTY_CELL: Data = Data::Empty;

pub const REQUIRED_COLUMNS: [&str; 4] = [
    "participant_id",
    "total_funding",
    "daily_expenditure",
    "service_hours",
];

/// Picks the reader from the file extension; anything that is not a
/// spreadsheet is read as CSV.
pub fn load_file(path: &Path) -> Result<Vec<ParticipantRecord>, LoadError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("xlsx" | "xlsm" | "xls" | "ods") => load_spreadsheet(path),
        _ => load_csv(path),
    }
}

pub fn load_csv(path: &Path) -> Result<Vec<ParticipantRecord>, LoadError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    read_participants(file)
}

/// Reads the first worksheet of a workbook.
pub fn load_spreadsheet(path: &Path) -> Result<Vec<ParticipantRecord>, LoadError> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::EmptyWorkbook)??;
    read_range(&range)
}

/// Reads and validates participant rows. Extra columns are ignored; any
/// missing required column, bad value or repeated id rejects the whole file.
pub fn read_participants<R: Read>(reader: R) -> Result<Vec<ParticipantRecord>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    locate_columns(&headers.iter().collect::<Vec<_>>())?;

    let mut portfolio = Portfolio::default();
    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|position| position.line()).unwrap_or_default();
        let record: ParticipantRecord = row.deserialize(Some(&headers))?;
        portfolio.push(record, line)?;
    }

    Ok(portfolio.records)
}

/// Same rules as [`read_participants`] over a worksheet whose first row holds
/// the headers. Fully empty rows are skipped.
pub fn read_range(range: &Range<Data>) -> Result<Vec<ParticipantRecord>, LoadError> {
    let header_line = range.start().map(|(row, _)| u64::from(row) + 1).unwrap_or(1);
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .unwrap_or_default();
    let [id_col, funding_col, expenditure_col, hours_col] =
        locate_columns(&headers.iter().map(String::as_str).collect::<Vec<_>>())?;

    let mut portfolio = Portfolio::default();
    for (offset, row) in rows.enumerate() {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }

        let line = header_line + 1 + offset as u64;
        let cell = |index: usize| row.get(index).unwrap_or(&EMPTY_CELL);

        let participant_id = cell(id_col).to_string().trim().to_string();
        if participant_id.is_empty() {
            return Err(LoadError::InvalidCell {
                line,
                field: "participant_id",
                cell: String::new(),
            });
        }

        let record = ParticipantRecord {
            participant_id,
            total_funding: cell_number(cell(funding_col), line, "total_funding")?,
            daily_expenditure: cell_number(cell(expenditure_col), line, "daily_expenditure")?,
            service_hours: cell_number(cell(hours_col), line, "service_hours")?,
        };
        portfolio.push(record, line)?;
    }

    Ok(portfolio.records)
}

/// Index of each required column, in `REQUIRED_COLUMNS` order.
fn locate_columns(headers: &[&str]) -> Result<[usize; 4], LoadError> {
    let mut indexes = [0usize; 4];
    let mut missing = Vec::new();

    for (slot, column) in REQUIRED_COLUMNS.iter().enumerate() {
        match headers.iter().position(|header| header == column) {
            Some(index) => indexes[slot] = index,
            None => missing.push(column.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(indexes)
    } else {
        Err(LoadError::MissingColumns(missing))
    }
}

fn cell_number(cell: &Data, line: u64, field: &'static str) -> Result<f64, LoadError> {
    let parsed = match cell {
        Data::Float(value) => Some(*value),
        Data::Int(value) => Some(*value as f64),
        Data::String(text) => text.trim().parse().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| LoadError::InvalidCell {
        line,
        field,
        cell: cell.to_string(),
    })
}

#[derive(Default)]
struct Portfolio {
    records: Vec<ParticipantRecord>,
    seen: HashSet<String>,
}

impl Portfolio {
    fn push(&mut self, record: ParticipantRecord, line: u64) -> Result<(), LoadError> {
        validate(&record, line)?;
        if !self.seen.insert(record.participant_id.clone()) {
            return Err(LoadError::DuplicateParticipant(record.participant_id));
        }
        self.records.push(record);
        Ok(())
    }
}

fn validate(record: &ParticipantRecord, line: u64) -> Result<(), LoadError> {
    let fields = [
        ("total_funding", record.total_funding),
        ("daily_expenditure", record.daily_expenditure),
        ("service_hours", record.service_hours),
    ];

    for (field, value) in fields {
        if !value.is_finite() || value < 0.0 {
            return Err(LoadError::InvalidValue {
                line,
                participant_id: record.participant_id.clone(),
                field,
                value,
            });
        }
    }

    Ok(())
}
