//! Batch pipeline: normalize -> classify -> encode -> augment.
//!
//! The pipeline works on an in-memory [`RawTable`] and knows nothing about
//! files or terminals, so the CLI and the tests drive the same workflow.

use rayon::prelude::*;

use crate::domain::{
    BIRTH_DATE_HEADER, BIRTH_PLACE_HEADER, Cell, ColumnMapping, ColumnRef, FISCAL_CODE_HEADER,
    GIVEN_NAME_HEADER, PersonRecord, Phase, ProgressEvent, RawTable, SEX_HEADER, SURNAME_HEADER, Sex,
};
use crate::error::ConfigurationError;
use crate::fiscal::FiscalCodeEncoder;
use crate::gender::NameGenderClassifier;
use crate::io::ingest::cell_date;

/// Receives a [`ProgressEvent`] after each processed row.
///
/// Events are advisory. In parallel mode they arrive out of row order.
pub trait ProgressSink: Sync {
    fn on_row(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Sync,
{
    fn on_row(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_row(&self, _event: ProgressEvent) {}
}

/// Column indices the mapping resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub surname: usize,
    pub given_name: usize,
    pub birth_date: usize,
    pub birth_place: usize,
}

impl ResolvedColumns {
    /// Resolve a mapping against table headers.
    pub fn resolve(mapping: &ColumnMapping, headers: &[String]) -> Result<Self, ConfigurationError> {
        let find = |field: &'static str, column: &ColumnRef| {
            column
                .resolve(headers)
                .ok_or_else(|| ConfigurationError::MissingColumn {
                    field,
                    column: column.to_string(),
                })
        };

        let resolved = Self {
            surname: find("surname", &mapping.surname)?,
            given_name: find("given name", &mapping.given_name)?,
            birth_date: find("birth date", &mapping.birth_date)?,
            birth_place: find("birthplace", &mapping.birth_place)?,
        };

        if resolved.surname == resolved.given_name {
            return Err(ConfigurationError::DuplicateColumn {
                first: "surname",
                second: "given name",
                column: headers
                    .get(resolved.surname)
                    .cloned()
                    .unwrap_or_else(|| resolved.surname.to_string()),
            });
        }

        Ok(resolved)
    }
}

/// Records plus the augmented output table.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub records: Vec<PersonRecord>,
    pub table: RawTable,
}

/// Classifies and encodes every row of a table.
#[derive(Debug, Clone, Copy)]
pub struct BatchPipeline<'a> {
    classifier: NameGenderClassifier<'a>,
    encoder: FiscalCodeEncoder<'a>,
    parallel: bool,
}

impl BatchPipeline<'static> {
    /// Pipeline over the embedded name and place tables.
    pub fn builtin() -> Self {
        Self::new(NameGenderClassifier::builtin(), FiscalCodeEncoder::builtin())
    }
}

impl<'a> BatchPipeline<'a> {
    pub fn new(classifier: NameGenderClassifier<'a>, encoder: FiscalCodeEncoder<'a>) -> Self {
        Self {
            classifier,
            encoder,
            parallel: false,
        }
    }

    /// Process rows on the rayon pool. Record order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run all steps and return one record per data row, in input order.
    ///
    /// Fails only if the mapping does not fit the table; per-row problems are
    /// stored in each record's `fiscal_code`.
    pub fn process(
        &self,
        table: &RawTable,
        mapping: &ColumnMapping,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<PersonRecord>, ConfigurationError> {
        // 1) Normalize (fails before any row is touched).
        let columns = ResolvedColumns::resolve(mapping, &table.headers)?;
        let mut records = normalize(table, &columns);
        log::info!("normalized {} row(s)", records.len());

        // 2) Classify.
        self.classify(table, &columns, &mut records, progress);

        // 3) Encode.
        self.encode(&mut records, progress);

        Ok(records)
    }

    /// [`process`](Self::process) followed by [`augment`].
    pub fn run(
        &self,
        table: &RawTable,
        mapping: &ColumnMapping,
        progress: &dyn ProgressSink,
    ) -> Result<BatchOutput, ConfigurationError> {
        let records = self.process(table, mapping, progress)?;
        let columns = ResolvedColumns::resolve(mapping, &table.headers)?;
        let table = augment(table, &columns, &records);
        Ok(BatchOutput { records, table })
    }

    fn classify(
        &self,
        table: &RawTable,
        columns: &ResolvedColumns,
        records: &mut [PersonRecord],
        progress: &dyn ProgressSink,
    ) {
        log::info!("{}", Phase::Classify.display_name());
        let total_rows = records.len();
        let step = |record: &mut PersonRecord| {
            // Numbers and dates in the name column are not names.
            record.sex = self
                .classifier
                .classify_cell(table.cell(record.row_index, columns.given_name));
            progress.on_row(ProgressEvent {
                phase: Phase::Classify,
                row_index: record.row_index,
                total_rows,
            });
        };

        if self.parallel {
            records.par_iter_mut().for_each(step);
        } else {
            records.iter_mut().for_each(step);
        }

        let unknown = records.iter().filter(|r| r.sex == Sex::Unknown).count();
        if unknown > 0 {
            log::info!("{unknown} row(s) with undetermined sex");
        }
    }

    fn encode(&self, records: &mut [PersonRecord], progress: &dyn ProgressSink) {
        log::info!("{}", Phase::Encode.display_name());
        let total_rows = records.len();
        let step = |record: &mut PersonRecord| {
            let result = self.encoder.encode_record(record);
            if let Err(err) = &result {
                log::debug!("row {}: {err}", record.row_index + 1);
            }
            record.fiscal_code = Some(result);
            progress.on_row(ProgressEvent {
                phase: Phase::Encode,
                row_index: record.row_index,
                total_rows,
            });
        };

        if self.parallel {
            records.par_iter_mut().for_each(step);
        } else {
            records.iter_mut().for_each(step);
        }
    }
}

fn normalize(table: &RawTable, columns: &ResolvedColumns) -> Vec<PersonRecord> {
    (0..table.len())
        .map(|row| {
            let text = |col: usize| table.cell(row, col).display_text().trim().to_string();
            let date_cell = table.cell(row, columns.birth_date);
            PersonRecord {
                row_index: row,
                surname: text(columns.surname),
                given_name: text(columns.given_name),
                sex: Sex::Unknown,
                birth_date: cell_date(date_cell),
                birth_date_raw: date_cell.display_text(),
                birth_place: text(columns.birth_place),
                fiscal_code: None,
            }
        })
        .collect()
}

/// Build the output table: original columns and rows, mapped columns renamed,
/// the given name trimmed, then `Sesso` and `Codice Fiscale`.
///
/// Existing `Sesso`/`Codice Fiscale` columns are overwritten in place.
pub fn augment(table: &RawTable, columns: &ResolvedColumns, records: &[PersonRecord]) -> RawTable {
    let mut headers = table.headers.clone();
    for (col, name) in [
        (columns.surname, SURNAME_HEADER),
        (columns.given_name, GIVEN_NAME_HEADER),
        (columns.birth_date, BIRTH_DATE_HEADER),
        (columns.birth_place, BIRTH_PLACE_HEADER),
    ] {
        if let Some(header) = headers.get_mut(col) {
            *header = name.to_string();
        }
    }

    let sex_col = output_column(&mut headers, SEX_HEADER);
    let code_col = output_column(&mut headers, FISCAL_CODE_HEADER);
    let width = headers.len();

    let rows = table
        .rows
        .iter()
        .zip(records)
        .map(|(row, record)| {
            let mut row = row.clone();
            row.resize(width, Cell::Empty);
            row[columns.given_name] = if record.given_name.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(record.given_name.clone())
            };
            row[sex_col] = Cell::Text(record.sex.label().to_string());
            row[code_col] = Cell::Text(record.fiscal_code_text());
            row
        })
        .collect();

    RawTable { headers, rows }
}

fn output_column(headers: &mut Vec<String>, name: &str) -> usize {
    match headers.iter().position(|h| h == name) {
        Some(idx) => idx,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;
    use crate::error::EncodingError;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            surname: ColumnRef::new("Surname"),
            given_name: ColumnRef::new("Name"),
            birth_date: ColumnRef::new("Born"),
            birth_place: ColumnRef::new("Place"),
        }
    }

    fn table() -> RawTable {
        RawTable {
            headers: vec!["Name".into(), "Surname".into(), "Born".into(), "Place".into(), "Note".into()],
            rows: vec![
                vec![text(" Mario "), text("Rossi"), text("1980-01-01"), text("Roma"), text("a")],
                vec![text("Giulia"), text("Bianchi"), text("05/03/1990"), text("Atlantide"), text("b")],
                vec![
                    text("Anna"),
                    text("Verdi"),
                    Cell::Date(NaiveDate::from_ymd_opt(1975, 12, 31).unwrap()),
                    text("Milano"),
                ],
            ],
        }
    }

    #[test]
    fn bad_row_does_not_abort_the_batch() {
        let out = BatchPipeline::builtin().run(&table(), &mapping(), &NoProgress).unwrap();

        assert_eq!(out.records.len(), 3);
        assert_eq!(
            out.records[0].fiscal_code,
            Some(Ok(crate::domain::FiscalCode("RSSMRA80A01H501U".into())))
        );
        assert_eq!(
            out.records[1].fiscal_code,
            Some(Err(EncodingError::UnknownPlace("Atlantide".into())))
        );
        assert!(matches!(out.records[2].fiscal_code, Some(Ok(_))));

        let code_col = out.table.headers.len() - 1;
        assert!(out.table.cell(1, code_col).display_text().starts_with("Errore: "));
        assert_eq!(out.table.cell(2, 4), &Cell::Empty);
    }

    #[test]
    fn output_table_is_augmented_in_place() {
        let out = BatchPipeline::builtin().run(&table(), &mapping(), &NoProgress).unwrap();
        assert_eq!(
            out.table.headers,
            vec![
                "Nome",
                "Cognome",
                "Data di Nascita",
                "Comune di Nascita",
                "Note",
                "Sesso",
                "Codice Fiscale"
            ]
        );
        assert_eq!(out.table.cell(0, 0), &text("Mario"));
        assert_eq!(out.table.cell(0, 4), &text("a"));
        assert_eq!(out.table.cell(0, 5), &text("M"));
        assert_eq!(out.table.cell(1, 5), &text("F"));
        assert_eq!(out.table.cell(0, 6), &text("RSSMRA80A01H501U"));
    }

    #[test]
    fn existing_output_columns_are_overwritten() {
        let mut input = table();
        input.headers.push("Codice Fiscale".into());
        input.rows[0].push(text("stale"));
        let out = BatchPipeline::builtin().run(&input, &mapping(), &NoProgress).unwrap();
        assert_eq!(out.table.headers.iter().filter(|h| *h == "Codice Fiscale").count(), 1);
        assert_eq!(out.table.cell(0, 5), &text("RSSMRA80A01H501U"));
        assert_eq!(out.table.cell(0, 6), &text("M"));
    }

    #[test]
    fn year_only_cells_are_invalid_dates() {
        let mut input = table();
        input.rows[0][2] = Cell::Number(1980.0);
        input.rows[2][2] = text("31-12-75");
        let records = BatchPipeline::builtin().process(&input, &mapping(), &NoProgress).unwrap();
        assert_eq!(
            records[0].fiscal_code,
            Some(Err(EncodingError::InvalidDate("1980".into())))
        );
        assert_eq!(
            records[2].fiscal_code,
            Some(Err(EncodingError::InvalidDate("31-12-75".into())))
        );
    }

    #[test]
    fn missing_column_fails_before_processing() {
        let mut mapping = mapping();
        mapping.birth_place = ColumnRef::new("Comune");
        let events = Mutex::new(Vec::new());
        let sink = |e: ProgressEvent| events.lock().unwrap().push(e);

        let err = BatchPipeline::builtin().process(&table(), &mapping, &sink).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingColumn {
                field: "birthplace",
                column: "Comune".into()
            }
        );
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn surname_and_name_must_differ() {
        let mut mapping = mapping();
        mapping.given_name = ColumnRef::new("B");
        let err = BatchPipeline::builtin()
            .process(&table(), &mapping, &NoProgress)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateColumn { .. }));
    }

    #[test]
    fn progress_reports_each_phase_in_row_order() {
        let events = Mutex::new(Vec::new());
        let sink = |e: ProgressEvent| events.lock().unwrap().push(e);
        BatchPipeline::builtin().process(&table(), &mapping(), &sink).unwrap();

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 6);
        let seen: Vec<(Phase, usize)> = events.iter().map(|e| (e.phase, e.row_index)).collect();
        assert_eq!(
            seen,
            vec![
                (Phase::Classify, 0),
                (Phase::Classify, 1),
                (Phase::Classify, 2),
                (Phase::Encode, 0),
                (Phase::Encode, 1),
                (Phase::Encode, 2),
            ]
        );
        assert!(events.iter().all(|e| e.total_rows == 3));
    }

    #[test]
    fn parallel_mode_matches_sequential() {
        let sequential = BatchPipeline::builtin().run(&table(), &mapping(), &NoProgress).unwrap();
        let parallel = BatchPipeline::builtin()
            .parallel(true)
            .run(&table(), &mapping(), &NoProgress)
            .unwrap();
        assert_eq!(sequential.records, parallel.records);
        assert_eq!(sequential.table, parallel.table);
    }

    #[test]
    fn numeric_name_cells_are_not_classified() {
        let mut input = table();
        input.rows[0][0] = Cell::Number(42.0);
        let records = BatchPipeline::builtin().process(&input, &mapping(), &NoProgress).unwrap();
        assert_eq!(records[0].sex, Sex::Unknown);
        assert_eq!(records[0].given_name, "42");
        assert_eq!(
            records[0].fiscal_code,
            Some(Err(EncodingError::EmptyField("given name")))
        );
    }
}
