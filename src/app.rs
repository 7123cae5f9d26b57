//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the name and place tables
//! - reads the input table and runs the batch pipeline
//! - writes the augmented table and the optional summary
//! - serves the single-shot `encode`, `gender` and `check` commands

use std::borrow::Cow;
use std::path::Path;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{CheckArgs, Command, EncodeArgs, GenderArgs, ProcessArgs};
use crate::domain::{
    BIRTH_DATE_HEADER, BIRTH_PLACE_HEADER, BatchConfig, ColumnMapping, ColumnRef, GIVEN_NAME_HEADER,
    ProgressEvent, SURNAME_HEADER,
};
use crate::error::{AppError, EXIT_EMPTY, EXIT_REJECTED};
use crate::fiscal::{FiscalCodeEncoder, PlaceTable};
use crate::gender::{NameGenderClassifier, NameGenderTable};

pub mod pipeline;

use pipeline::{BatchPipeline, NoProgress};

/// Entry point for the `cfgen` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; a malformed one is worth a warning.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            log::warn!("ignoring .env: {err}");
        }
    }

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Process(args) => handle_process(&args),
        Command::Encode(args) => handle_encode(&args),
        Command::Gender(args) => handle_gender(&args),
        Command::Check(args) => handle_check(&args),
    }
}

fn handle_process(args: &ProcessArgs) -> Result<(), AppError> {
    let config = batch_config_from_args(args);
    let summary = run_batch(&config)?;

    println!("{}", crate::report::format_summary(&summary, &config));
    Ok(())
}

/// Execute a full `process` run: read, classify, encode, write.
pub fn run_batch(config: &BatchConfig) -> Result<crate::report::BatchSummary, AppError> {
    let names = load_names(config.names_table.as_deref())?;
    let places = load_places(config.places_table.as_deref())?;

    let table = crate::io::read_table(&config.input_path, config.has_header, config.sheet.as_deref())?;
    if table.is_empty() {
        return Err(AppError::new(
            EXIT_EMPTY,
            format!("No data rows in '{}'", config.input_path.display()),
        ));
    }

    let pipeline = BatchPipeline::new(
        NameGenderClassifier::new(&names),
        FiscalCodeEncoder::new(&places),
    )
    .parallel(config.parallel);

    let output = if config.show_progress {
        let bar = progress_bar(table.len() as u64 * 2);
        let sink = |event: ProgressEvent| {
            bar.set_message(event.phase.display_name());
            bar.inc(1);
        };
        let output = pipeline.run(&table, &config.mapping, &sink);
        bar.finish_and_clear();
        output?
    } else {
        pipeline.run(&table, &config.mapping, &NoProgress)?
    };

    crate::io::write_table(&config.output_path, &output.table)?;

    let summary = crate::report::summarize(&output.records);
    if let Some(path) = &config.summary_json {
        crate::io::write_summary_json(path, &summary)?;
    }
    Ok(summary)
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

fn handle_encode(args: &EncodeArgs) -> Result<(), AppError> {
    let names = load_names(args.tables.names_table.as_deref())?;
    let places = load_places(args.tables.places_table.as_deref())?;

    let birth_date = crate::io::parse_date_text(&args.birthdate).ok_or_else(|| {
        AppError::from(crate::error::EncodingError::InvalidDate(args.birthdate.clone()))
    })?;
    let sex = args
        .sex
        .unwrap_or_else(|| NameGenderClassifier::new(&names).classify(&args.name));

    let code = FiscalCodeEncoder::new(&places).encode(
        &args.surname,
        &args.name,
        sex,
        birth_date,
        &args.birthplace,
    )?;

    println!("{code}");
    Ok(())
}

fn handle_gender(args: &GenderArgs) -> Result<(), AppError> {
    let names = load_names(args.tables.names_table.as_deref())?;
    let classifier = NameGenderClassifier::new(&names);

    for name in &args.names {
        println!("{}", crate::report::format_grade(name, classifier.grade(name)));
    }
    Ok(())
}

fn handle_check(args: &CheckArgs) -> Result<(), AppError> {
    let places = load_places(args.tables.places_table.as_deref())?;
    let today = chrono::Local::now().date_naive();

    let mut invalid = 0usize;
    for code in &args.codes {
        match crate::fiscal::decode(code, &places, today) {
            Ok(decoded) => {
                print!("{}", crate::report::format_decoded(&decoded));
                if args.omocodes {
                    for variant in crate::fiscal::omocodes(&decoded.code)? {
                        println!("  omocode    : {variant}");
                    }
                }
            }
            Err(err) => {
                invalid += 1;
                println!("{}: invalid ({err})", code.trim());
            }
        }
    }

    if invalid > 0 {
        return Err(AppError::new(
            EXIT_REJECTED,
            format!("{invalid} of {} code(s) invalid", args.codes.len()),
        ));
    }
    Ok(())
}

/// Builtin name table, with the optional CSV merged over it.
fn load_names(path: Option<&Path>) -> Result<Cow<'static, NameGenderTable>, AppError> {
    let builtin = NameGenderTable::builtin();
    let Some(path) = path else {
        return Ok(Cow::Borrowed(builtin));
    };
    let extra = NameGenderTable::from_path(path)?;
    log::info!("merging {} name(s) from {}", extra.len(), path.display());
    let mut table = builtin.clone();
    table.merge(extra);
    Ok(Cow::Owned(table))
}

/// Builtin place table, with the optional CSV merged over it.
fn load_places(path: Option<&Path>) -> Result<Cow<'static, PlaceTable>, AppError> {
    let builtin = PlaceTable::builtin();
    let Some(path) = path else {
        return Ok(Cow::Borrowed(builtin));
    };
    let extra = PlaceTable::from_path(path)?;
    log::info!("merging {} place(s) from {}", extra.len(), path.display());
    let mut table = builtin.clone();
    table.merge(extra);
    Ok(Cow::Owned(table))
}

/// Build the run configuration. Columns not given on the command line default
/// to the Italian header names; with no column given at all the input is read
/// with a header row.
pub fn batch_config_from_args(args: &ProcessArgs) -> BatchConfig {
    let columns = [
        &args.surname_col,
        &args.name_col,
        &args.birthdate_col,
        &args.birthplace_col,
    ];
    let default_columns = columns.iter().all(|c| c.is_none());
    let column = |arg: &Option<String>, header: &str| ColumnRef::new(arg.as_deref().unwrap_or(header));

    BatchConfig {
        input_path: args.input.clone(),
        output_path: args.output.clone(),
        has_header: args.header || default_columns,
        sheet: args.sheet.clone(),
        mapping: ColumnMapping {
            surname: column(&args.surname_col, SURNAME_HEADER),
            given_name: column(&args.name_col, GIVEN_NAME_HEADER),
            birth_date: column(&args.birthdate_col, BIRTH_DATE_HEADER),
            birth_place: column(&args.birthplace_col, BIRTH_PLACE_HEADER),
        },
        parallel: args.parallel,
        show_progress: !args.no_progress,
        summary_json: args.summary_json.clone(),
        names_table: args.tables.names_table.clone(),
        places_table: args.tables.places_table.clone(),
    }
}
