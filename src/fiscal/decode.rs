//! Validation and decoding of existing fiscal codes.
//!
//! When two people would receive the same code, the registry replaces digits
//! with letters starting from the right ("omocodia"). Validation and decoding
//! accept those variants and map them back to the base code.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::Sex;
use crate::error::DecodeError;
use crate::fiscal::checksum::{BODY_LEN, check_char};
use crate::fiscal::encoder::{FEMALE_DAY_OFFSET, MONTH_LETTERS};
use crate::fiscal::place::{Place, PlaceTable};

/// Letters standing in for digits `0-9` in omocode variants.
const OMOCODE_LETTERS: [char; 10] = ['L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V'];

/// 0-based digit positions, in the order they are substituted (right to left).
const OMOCODE_POSITIONS: [usize; 7] = [14, 13, 12, 10, 9, 7, 6];

fn code_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(
            r"^[A-Z]{6}[0-9LMNPQRSTUV]{2}[ABCDEHLMPRST][0-9LMNPQRSTUV]{2}[A-Z][0-9LMNPQRSTUV]{3}[A-Z]$",
        )
        .expect("fiscal code pattern is valid")
    })
}

/// Everything a fiscal code says about its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedCode {
    /// The code as given, uppercased.
    pub code: String,
    /// The code with omocode letters replaced by digits.
    pub base_code: String,
    pub omocode: bool,
    pub surname_part: String,
    pub name_part: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub place_code: String,
    /// Resolved from the place table; `None` when the code is not listed.
    pub place: Option<Place>,
}

/// Uppercase and strip whitespace.
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Replace omocode letters at digit positions with the digits they stand for
/// and recompute the check character.
pub fn base_code(code: &str) -> String {
    let mut chars: Vec<char> = code.chars().collect();
    if chars.len() != BODY_LEN + 1 {
        return code.to_string();
    }
    for &pos in &OMOCODE_POSITIONS {
        if let Some(digit) = OMOCODE_LETTERS.iter().position(|&l| l == chars[pos]) {
            chars[pos] = char::from(b'0' + digit as u8);
        }
    }
    let body: String = chars[..BODY_LEN].iter().collect();
    match check_char(&body) {
        Some(check) => format!("{body}{check}"),
        None => code.to_string(),
    }
}

/// Check shape, month, day and check character. Returns the normalized code.
pub fn validate(code: &str) -> Result<String, DecodeError> {
    let code = normalize_code(code);
    let len = code.chars().count();
    if len != BODY_LEN + 1 {
        return Err(DecodeError::Length(len));
    }
    if !code_shape().is_match(&code) {
        return Err(DecodeError::Format(code));
    }

    let expected = check_char(&code[..BODY_LEN]).ok_or_else(|| DecodeError::Format(code.clone()))?;
    let found = code.as_bytes()[BODY_LEN] as char;
    if expected != found {
        return Err(DecodeError::Checksum { expected, found });
    }

    let base = base_code(&code);
    let (_, month, day) = date_fields(&base)?;
    let yy = base[6..8].parse::<i32>().map_err(|_| DecodeError::Format(code.clone()))?;
    // Feb 29 depends on the century, which the code does not carry.
    let valid_in_some_century = [1900 + yy, 2000 + yy]
        .iter()
        .any(|&year| NaiveDate::from_ymd_opt(year, month, day).is_some());
    if !valid_in_some_century {
        return Err(DecodeError::Date {
            year: yy as u32,
            month,
            day,
        });
    }

    Ok(code)
}

pub fn is_valid(code: &str) -> bool {
    validate(code).is_ok()
}

/// Decode sex, birth date and birthplace.
///
/// The two-digit year is placed in the latest century that does not put the
/// birth date after `today`.
pub fn decode(code: &str, places: &PlaceTable, today: NaiveDate) -> Result<DecodedCode, DecodeError> {
    let code = validate(code)?;
    let base = base_code(&code);

    let (sex, month, day) = date_fields(&base)?;
    let yy = base[6..8].parse::<i32>().map_err(|_| DecodeError::Format(code.clone()))?;
    let century = today.year() - today.year().rem_euclid(100);

    let birth_date = [century + yy, century - 100 + yy]
        .iter()
        .filter_map(|&year| NaiveDate::from_ymd_opt(year, month, day))
        .find(|date| *date <= today)
        .ok_or(DecodeError::Date {
            year: yy as u32,
            month,
            day,
        })?;

    let place_code = base[11..15].to_string();
    let place = places.by_code(&place_code).cloned();

    Ok(DecodedCode {
        omocode: base != code,
        surname_part: code[0..3].to_string(),
        name_part: code[3..6].to_string(),
        sex,
        birth_date,
        place_code,
        place,
        base_code: base,
        code,
    })
}

/// The seven omocode variants of a code, each substituting one more digit
/// from the right.
pub fn omocodes(code: &str) -> Result<Vec<String>, DecodeError> {
    let code = validate(code)?;
    let base: Vec<char> = base_code(&code).chars().collect();

    let mut out = Vec::with_capacity(OMOCODE_POSITIONS.len());
    let mut chars = base.clone();
    for &pos in &OMOCODE_POSITIONS {
        if let Some(digit) = chars[pos].to_digit(10) {
            chars[pos] = OMOCODE_LETTERS[digit as usize];
        }
        let body: String = chars[..BODY_LEN].iter().collect();
        if let Some(check) = check_char(&body) {
            out.push(format!("{body}{check}"));
        }
    }
    Ok(out)
}

/// Sex, month and day of month from a base (digit-only) code.
fn date_fields(base: &str) -> Result<(Sex, u32, u32), DecodeError> {
    let month_letter = base.as_bytes()[8] as char;
    let month = MONTH_LETTERS
        .iter()
        .position(|&l| l == month_letter)
        .ok_or(DecodeError::Month(month_letter))? as u32
        + 1;
    let raw_day = base[9..11]
        .parse::<u32>()
        .map_err(|_| DecodeError::Format(base.to_string()))?;

    let (sex, day) = match raw_day {
        1..=31 => (Sex::Male, raw_day),
        41..=71 => (Sex::Female, raw_day - FEMALE_DAY_OFFSET),
        _ => {
            return Err(DecodeError::Date {
                year: base[6..8].parse().unwrap_or(0),
                month,
                day: raw_day,
            });
        }
    };
    Ok((sex, month, day))
}
