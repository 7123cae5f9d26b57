//! Spreadsheet/CSV ingest.
//!
//! This module turns an input file into a [`RawTable`]:
//!
//! - `.xlsx` / `.xlsm` / `.xls` / `.xlsb` / `.ods` through calamine
//! - `.csv` through the csv crate
//!
//! No schema is assumed. Without a header row the columns are named `0`, `1`,
//! ... so they can be mapped by index. Fully blank rows are dropped.

use std::fs::File;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate};

use crate::domain::{Cell, RawTable};
use crate::error::{AppError, EXIT_INPUT};

/// Excel serial day 0 in the 1900 date system (accounts for the 1900 leap bug).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Smallest untyped number read as a date serial (1927-05-18). Smaller
/// numbers in a birth-date column are years or day counts, not dates.
const MIN_DATE_SERIAL: f64 = 10_000.0;

/// Read an input table, choosing the reader from the file extension.
pub fn read_table(path: &Path, has_header: bool, sheet: Option<&str>) -> Result<RawTable, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let grid = match ext.as_str() {
        "csv" => read_csv_grid(path)?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook_grid(path, sheet)?,
        _ => {
            return Err(AppError::new(
                EXIT_INPUT,
                format!(
                    "Unsupported input '{}': expected .xlsx, .xlsm, .xls, .xlsb, .ods or .csv",
                    path.display()
                ),
            ));
        }
    };

    let table = build_table(grid, has_header);
    log::info!(
        "read {} data row(s), {} column(s) from {}",
        table.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

fn read_csv_grid(path: &Path) -> Result<Vec<Vec<Cell>>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open CSV '{}': {e}", path.display())))?;

    // Cells are kept verbatim so unmapped columns round-trip unchanged; the
    // pipeline trims the fields it reads.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(file);

    let mut grid = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| AppError::new(EXIT_INPUT, format!("CSV parse error at line {}: {e}", idx + 1)))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col, field)| {
                // Excel and other tools sometimes emit a BOM before the first field.
                let field = if idx == 0 && col == 0 {
                    field.trim_start_matches('\u{feff}')
                } else {
                    field
                };
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        grid.push(row);
    }
    Ok(grid)
}

fn read_workbook_grid(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<Cell>>, AppError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to open spreadsheet '{}': {e}", path.display()),
        )
    })?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| {
                AppError::new(
                    EXIT_INPUT,
                    format!(
                        "Sheet '{wanted}' not found. Available: {}",
                        sheet_names.join(", ")
                    ),
                )
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| AppError::new(EXIT_INPUT, "Spreadsheet contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read sheet '{sheet_name}': {e}")))?;

    // Keep spreadsheet column letters meaningful when data does not start at A.
    let start_col = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let grid = range
        .rows()
        .map(|row| {
            std::iter::repeat_n(Cell::Empty, start_col)
                .chain(row.iter().map(data_to_cell))
                .collect()
        })
        .collect();
    Ok(grid)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => Cell::Date(value.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_date_text(s) {
            Some(date) => Cell::Date(date),
            None => Cell::Text(s.clone()),
        },
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn build_table(grid: Vec<Vec<Cell>>, has_header: bool) -> RawTable {
    let mut rows: Vec<Vec<Cell>> = grid
        .into_iter()
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);

    let headers = if has_header && !rows.is_empty() {
        let header_row = rows.remove(0);
        (0..width)
            .map(|idx| {
                let name = header_row.get(idx).map(Cell::display_text).unwrap_or_default();
                let name = name.trim();
                if name.is_empty() {
                    idx.to_string()
                } else {
                    name.to_string()
                }
            })
            .collect()
    } else {
        (0..width).map(|idx| idx.to_string()).collect()
    };

    RawTable { headers, rows }
}

/// Interpret a cell as a birth date.
///
/// Accepts typed date cells, Excel serial numbers from 1927 on and the text
/// formats of [`parse_date_text`].
pub fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) if *n >= MIN_DATE_SERIAL => excel_serial_to_date(*n),
        Cell::Number(_) => None,
        Cell::Text(s) => parse_date_text(s),
        Cell::Empty => None,
    }
}

/// Parse a date written as text.
///
/// ISO dates (`YYYY-MM-DD`) are preferred, but personal-data exports often use
/// `DD/MM/YYYY`, `DD-MM-YYYY` or `DD.MM.YYYY`. A trailing time (`1980-01-01
/// 00:00:00`, `1980-01-01T00:00:00`) is ignored. The year must have four
/// digits: `10-11-12` is rejected rather than guessed.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    // (format, year is the first field)
    const FMTS: [(&str, bool); 5] = [
        ("%Y-%m-%d", true),
        ("%d/%m/%Y", false),
        ("%d-%m-%Y", false),
        ("%Y/%m/%d", true),
        ("%d.%m.%Y", false),
    ];

    let s = s.trim();
    let date_part = match s.split_once(|c: char| c == 'T' || c.is_whitespace()) {
        Some((date, time)) if time.contains(':') => date,
        _ => s,
    };

    let fields: Vec<&str> = date_part.split(['-', '/', '.']).collect();
    let [first, _, last] = fields.as_slice() else {
        return None;
    };
    let four_digits = |f: &str| f.len() == 4 && f.bytes().all(|b| b.is_ascii_digit());

    FMTS.iter()
        .filter(|(_, year_first)| four_digits(if *year_first { *first } else { *last }))
        .find_map(|(fmt, _)| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Excel 1900-system serial number to a date; fractional parts (time of day)
/// are dropped.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_date_formats() {
        assert_eq!(parse_date_text("1980-01-01"), Some(date(1980, 1, 1)));
        assert_eq!(parse_date_text("01/02/1980"), Some(date(1980, 2, 1)));
        assert_eq!(parse_date_text("01-02-1980"), Some(date(1980, 2, 1)));
        assert_eq!(parse_date_text("01.02.1980"), Some(date(1980, 2, 1)));
        assert_eq!(parse_date_text("1980-01-01 00:00:00"), Some(date(1980, 1, 1)));
        assert_eq!(parse_date_text("1980-01-01T12:30:00"), Some(date(1980, 1, 1)));
        assert_eq!(parse_date_text("31/02/1980"), None);
        assert_eq!(parse_date_text("ieri"), None);
    }

    #[test]
    fn short_years_are_rejected() {
        assert_eq!(parse_date_text("10-11-12"), None);
        assert_eq!(parse_date_text("12/11/10"), None);
        assert_eq!(parse_date_text("1.2.80"), None);
        assert_eq!(parse_date_text("0010-11-12"), Some(date(10, 11, 12)));
        assert_eq!(parse_date_text("1/2/1980"), Some(date(1980, 2, 1)));
    }

    #[test]
    fn small_numbers_are_not_date_serials() {
        assert_eq!(cell_date(&Cell::Number(1980.0)), None);
        assert_eq!(cell_date(&Cell::Number(42.0)), None);
        assert_eq!(cell_date(&Cell::Number(29221.0)), Some(date(1980, 1, 1)));
        assert_eq!(
            cell_date(&Cell::Date(date(1920, 6, 1))),
            Some(date(1920, 6, 1))
        );
    }

    #[test]
    fn excel_serials() {
        assert_eq!(excel_serial_to_date(29221.0), Some(date(1980, 1, 1)));
        assert_eq!(excel_serial_to_date(29221.75), Some(date(1980, 1, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn headerless_tables_name_columns_by_index() {
        let grid = vec![
            vec![Cell::Text("Mario".into()), Cell::Text("Rossi".into())],
            vec![Cell::Empty, Cell::Empty],
            vec![Cell::Text("Giulia".into()), Cell::Text("Bianchi".into()), Cell::Text("x".into())],
        ];
        let table = build_table(grid, false);
        assert_eq!(table.headers, vec!["0", "1", "2"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn header_row_with_blank_names() {
        let grid = vec![
            vec![Cell::Text("Nome".into()), Cell::Empty, Cell::Text("Comune".into())],
            vec![Cell::Text("Mario".into()), Cell::Text("Rossi".into()), Cell::Text("Roma".into())],
        ];
        let table = build_table(grid, true);
        assert_eq!(table.headers, vec!["Nome", "1", "Comune"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn reads_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "\u{feff}Nome,Cognome,Nascita,Comune").unwrap();
        writeln!(f, "Mario,Rossi,1980-01-01,Roma").unwrap();
        writeln!(f, ",,,").unwrap();
        writeln!(f, "Giulia, Bianchi ,05/03/1990,Milano").unwrap();
        drop(f);

        let table = read_table(&path, true, None).unwrap();
        assert_eq!(table.headers, vec!["Nome", "Cognome", "Nascita", "Comune"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 1), &Cell::Text(" Bianchi ".into()));
        assert_eq!(cell_date(table.cell(1, 2)), Some(date(1990, 3, 5)));
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = read_table(Path::new("people.txt"), false, None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }
}
