//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline and the fiscal code stay free of
//! presentation details.

use crate::domain::BatchConfig;
use crate::fiscal::DecodedCode;
use crate::gender::GenderGrade;
use crate::report::BatchSummary;

/// Failures listed in the terminal summary; the JSON export has all of them.
const MAX_LISTED_FAILURES: usize = 20;

/// Format the `process` run summary.
pub fn format_summary(summary: &BatchSummary, config: &BatchConfig) -> String {
    let mut out = String::new();

    out.push_str("=== cfgen - Codici Fiscali ===\n");
    out.push_str(&format!("Input : {}\n", config.input_path.display()));
    out.push_str(&format!("Output: {}\n", config.output_path.display()));
    out.push_str(&format!(
        "Rows: n={} | M={} F={} non determinato={}\n",
        summary.total_rows, summary.male, summary.female, summary.unknown_sex
    ));
    out.push_str(&format!(
        "Codes: generated={} | errors={}\n",
        summary.encoded, summary.failed
    ));

    if summary.failures.is_empty() {
        return out;
    }

    out.push_str("\nErrors:\n");
    out.push_str(&format!("{:>6} {:<20} {:<20} {}\n", "row", "surname", "name", "reason"));
    out.push_str(format!("{:->6} {:-<20} {:-<20} {:-<6}\n", "", "", "", "").trim_end());
    out.push('\n');
    for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
        out.push_str(
            format!(
                "{:>6} {:<20} {:<20} {}\n",
                failure.row,
                truncate(&failure.surname, 20),
                truncate(&failure.given_name, 20),
                failure.reason
            )
            .trim_end(),
        );
        out.push('\n');
    }
    if summary.failures.len() > MAX_LISTED_FAILURES {
        out.push_str(&format!(
            "... and {} more\n",
            summary.failures.len() - MAX_LISTED_FAILURES
        ));
    }

    out
}

/// One line per name for `cfgen gender`.
pub fn format_grade(name: &str, grade: GenderGrade) -> String {
    format!(
        "{:<24} {:<16} {}",
        truncate(name, 24),
        grade.display_name(),
        grade.sex()
    )
    .trim_end()
    .to_string()
}

/// Human-readable decode of a valid code for `cfgen check`.
pub fn format_decoded(decoded: &DecodedCode) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}: valid\n", decoded.code));
    if decoded.omocode {
        out.push_str(&format!("  omocode of : {}\n", decoded.base_code));
    }
    out.push_str(&format!("  sex        : {}\n", decoded.sex));
    out.push_str(&format!("  birth date : {}\n", decoded.birth_date.format("%d/%m/%Y")));
    match &decoded.place {
        Some(place) => out.push_str(&format!("  birthplace : {} [{}]\n", place.label(), decoded.place_code)),
        None => out.push_str(&format!("  birthplace : {} (not in place table)\n", decoded.place_code)),
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
