//! Write the augmented table.
//!
//! The output format follows the file extension: `.xlsx` through
//! rust_xlsxwriter, `.csv` through the csv crate. Dates stay dates in the
//! workbook (`dd/mm/yyyy`) and are written as ISO text in CSV.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::domain::{Cell, RawTable};
use crate::error::{AppError, EXIT_OUTPUT};
use crate::report::BatchSummary;

const SHEET_NAME: &str = "Codici Fiscali";
const DATE_FORMAT: &str = "dd/mm/yyyy";

/// Write a table to `path`, choosing the format from the extension.
pub fn write_table(path: &Path, table: &RawTable) -> Result<(), AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" => write_xlsx(path, table)
            .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to write '{}': {e}", path.display()))),
        "csv" => write_csv(path, table),
        _ => Err(AppError::new(
            EXIT_OUTPUT,
            format!("Unsupported output '{}': expected .xlsx or .csv", path.display()),
        )),
    }?;

    log::info!("wrote {} row(s) to {}", table.len(), path.display());
    Ok(())
}

fn write_xlsx(path: &Path, table: &RawTable) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row32 = row_idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col16 = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(row32, col16, s)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row32, col16, *n)?;
                }
                Cell::Date(d) => {
                    worksheet.write_number_with_format(row32, col16, excel_serial(*d), &date_format)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();
    workbook.save(path)?;
    Ok(())
}

fn write_csv(path: &Path, table: &RawTable) -> Result<(), AppError> {
    let output_err = |e: csv::Error| AppError::new(EXIT_OUTPUT, format!("Failed to write '{}': {e}", path.display()));

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(output_err)?;

    writer.write_record(&table.headers).map_err(output_err)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Cell::display_text))
            .map_err(output_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to flush '{}': {e}", path.display())))?;
    Ok(())
}

/// Days since 1899-12-30, the Excel 1900-system epoch.
fn excel_serial(date: NaiveDate) -> f64 {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .map(|epoch| (date - epoch).num_days() as f64)
        .unwrap_or_default()
}

/// Write the batch summary as pretty JSON.
pub fn write_summary_json(path: &Path, summary: &BatchSummary) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_OUTPUT,
            format!("Failed to create summary '{}': {e}", path.display()),
        )
    })?;
    serde_json::to_writer_pretty(file, summary).map_err(|e| {
        AppError::new(
            EXIT_OUTPUT,
            format!("Failed to write summary '{}': {e}", path.display()),
        )
    })
}
