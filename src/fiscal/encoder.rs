//! Fiscal-code encoding.
//!
//! Layout of the 16 characters:
//!
//! ```text
//! RSS MRA 80 A 01 H501 U
//! |   |   |  | |  |    `- check character
//! |   |   |  | |  `------ birthplace cadastral code
//! |   |   |  | `--------- day of birth (+40 for women)
//! |   |   |  `----------- month letter
//! |   |   `-------------- last two digits of the birth year
//! |   `------------------ given-name code
//! `---------------------- surname code
//! ```

use chrono::{Datelike, NaiveDate};

use crate::domain::{FiscalCode, PersonRecord, Sex};
use crate::error::EncodingError;
use crate::fiscal::checksum::check_char;
use crate::fiscal::place::PlaceTable;
use crate::text::ascii_letters;

/// Month letters, January first. `F G I J K N O Q U V W X Y Z` are unused.
pub const MONTH_LETTERS: [char; 12] = ['A', 'B', 'C', 'D', 'E', 'H', 'L', 'M', 'P', 'R', 'S', 'T'];

/// Added to the day of birth for women.
pub const FEMALE_DAY_OFFSET: u32 = 40;

const PADDING: char = 'X';

fn is_vowel(c: char) -> bool {
    matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
}

fn split_letters(s: &str) -> (Vec<char>, Vec<char>) {
    ascii_letters(s).into_iter().partition(|&c| !is_vowel(c))
}

/// Consonants, then vowels, then `X`, truncated to three characters.
fn pad_code(consonants: &[char], vowels: &[char]) -> String {
    consonants
        .iter()
        .chain(vowels)
        .copied()
        .chain(std::iter::repeat(PADDING))
        .take(3)
        .collect()
}

/// Three-letter surname code. `None` if the surname has no letters.
pub fn surname_code(surname: &str) -> Option<String> {
    let (consonants, vowels) = split_letters(surname);
    if consonants.is_empty() && vowels.is_empty() {
        return None;
    }
    Some(pad_code(&consonants, &vowels))
}

/// Three-letter given-name code. With four or more consonants the second one
/// is skipped.
pub fn name_code(name: &str) -> Option<String> {
    let (consonants, vowels) = split_letters(name);
    if consonants.is_empty() && vowels.is_empty() {
        return None;
    }
    if consonants.len() >= 4 {
        return Some([consonants[0], consonants[2], consonants[3]].iter().collect());
    }
    Some(pad_code(&consonants, &vowels))
}

/// `YY` + month letter + `DD` (day offset by 40 for women).
pub fn date_code(birth_date: NaiveDate, sex: Sex) -> Result<String, EncodingError> {
    let offset = match sex {
        Sex::Male => 0,
        Sex::Female => FEMALE_DAY_OFFSET,
        Sex::Unknown => return Err(EncodingError::UnsupportedSex),
    };
    let year = birth_date.year().rem_euclid(100);
    let month = MONTH_LETTERS[birth_date.month0() as usize];
    let day = birth_date.day() + offset;
    Ok(format!("{year:02}{month}{day:02}"))
}

/// Encodes person data into fiscal codes using a place table.
#[derive(Debug, Clone, Copy)]
pub struct FiscalCodeEncoder<'a> {
    places: &'a PlaceTable,
}

impl FiscalCodeEncoder<'static> {
    /// Encoder over the embedded place table.
    pub fn builtin() -> Self {
        Self::new(PlaceTable::builtin())
    }
}

impl<'a> FiscalCodeEncoder<'a> {
    pub fn new(places: &'a PlaceTable) -> Self {
        Self { places }
    }

    pub fn places(&self) -> &'a PlaceTable {
        self.places
    }

    /// Encode a fully specified person.
    pub fn encode(
        &self,
        surname: &str,
        given_name: &str,
        sex: Sex,
        birth_date: NaiveDate,
        birth_place: &str,
    ) -> Result<FiscalCode, EncodingError> {
        self.encode_parts(surname, given_name, sex, Ok(birth_date), birth_place)
    }

    /// Encode a pipeline record. The record's sex must already be resolved.
    pub fn encode_record(&self, record: &PersonRecord) -> Result<FiscalCode, EncodingError> {
        let birth_date = match record.birth_date {
            Some(date) => Ok(date),
            None if record.birth_date_raw.trim().is_empty() => Err(EncodingError::EmptyField("birth date")),
            None => Err(EncodingError::InvalidDate(record.birth_date_raw.trim().to_string())),
        };
        self.encode_parts(
            &record.surname,
            &record.given_name,
            record.sex,
            birth_date,
            &record.birth_place,
        )
    }

    // Fields are checked in the order surname, name, sex, date, place so a
    // row with several problems always reports the same one.
    fn encode_parts(
        &self,
        surname: &str,
        given_name: &str,
        sex: Sex,
        birth_date: Result<NaiveDate, EncodingError>,
        birth_place: &str,
    ) -> Result<FiscalCode, EncodingError> {
        let surname = surname_code(surname).ok_or(EncodingError::EmptyField("surname"))?;
        let name = name_code(given_name).ok_or(EncodingError::EmptyField("given name"))?;
        if sex == Sex::Unknown {
            return Err(EncodingError::UnsupportedSex);
        }
        let date = date_code(birth_date?, sex)?;
        let place = self.places.resolve(birth_place)?;

        let body = format!("{surname}{name}{date}{}", place.code).to_ascii_uppercase();
        let check = check_char(&body)
            .ok_or_else(|| EncodingError::UnknownPlace(birth_place.trim().to_string()))?;

        let mut code = body;
        code.push(check);
        Ok(FiscalCode(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reference_code() {
        let enc = FiscalCodeEncoder::builtin();
        let code = enc.encode("Rossi", "Mario", Sex::Male, date(1980, 1, 1), "Roma").unwrap();
        assert_eq!(code.body(), "RSSMRA80A01H501");
        assert_eq!(code.as_str(), "RSSMRA80A01H501U");
    }

    #[test]
    fn output_passes_own_checksum() {
        let enc = FiscalCodeEncoder::builtin();
        let people = [
            ("Bianchi", "Giulia", Sex::Female, date(1995, 12, 31), "Milano"),
            ("D'Amico", "Gianfranco", Sex::Male, date(2001, 6, 15), "Napoli"),
            ("Fo", "Ia", Sex::Female, date(1960, 2, 29), "Francia"),
            ("Müller", "José", Sex::Male, date(1977, 9, 9), "Germania"),
        ];
        for (surname, name, sex, birth, place) in people {
            let code = enc.encode(surname, name, sex, birth, place).unwrap();
            assert_eq!(code.as_str().len(), 16);
            assert_eq!(check_char(code.body()), Some(code.check_char()));
            assert_eq!(code.as_str(), code.as_str().to_ascii_uppercase());
        }
    }

    #[test]
    fn common_place_spellings_encode() {
        let enc = FiscalCodeEncoder::builtin();
        for (place, code) in [
            ("Fiumicino", "M297"),
            ("Reggio Emilia", "H223"),
            ("Stati Uniti", "Z404"),
            ("Sesto San Giovanni", "I690"),
        ] {
            let cf = enc.encode("Rossi", "Mario", Sex::Male, date(1980, 1, 1), place).unwrap();
            assert_eq!(&cf.body()[11..], code, "{place}");
        }
    }

    #[test]
    fn female_day_is_offset_by_forty() {
        let enc = FiscalCodeEncoder::builtin();
        let m = enc.encode("Rossi", "Andrea", Sex::Male, date(1990, 3, 5), "Torino").unwrap();
        let f = enc.encode("Rossi", "Andrea", Sex::Female, date(1990, 3, 5), "Torino").unwrap();
        assert_eq!(&m.as_str()[9..11], "05");
        assert_eq!(&f.as_str()[9..11], "45");
        let dm: u32 = m.as_str()[9..11].parse().unwrap();
        let df: u32 = f.as_str()[9..11].parse().unwrap();
        assert_eq!(df - dm, FEMALE_DAY_OFFSET);
        assert_eq!(&m.as_str()[..9], &f.as_str()[..9]);
    }

    #[test]
    fn surname_rules() {
        assert_eq!(surname_code("Rossi").as_deref(), Some("RSS"));
        assert_eq!(surname_code("Bianchi").as_deref(), Some("BNC"));
        assert_eq!(surname_code("Fo").as_deref(), Some("FOX"));
        assert_eq!(surname_code("Ai").as_deref(), Some("AIX"));
        assert_eq!(surname_code("Rei").as_deref(), Some("REI"));
        assert_eq!(surname_code("De Luca").as_deref(), Some("DLC"));
        assert_eq!(surname_code("  '' "), None);
    }

    #[test]
    fn name_skips_second_consonant_when_four_or_more() {
        // G N F R N C -> G, F, R
        assert_eq!(name_code("Gianfranco").as_deref(), Some("GFR"));
        // M R -> M R A
        assert_eq!(name_code("Mario").as_deref(), Some("MRA"));
        // R B R T -> R, R, T
        assert_eq!(name_code("Roberto").as_deref(), Some("RRT"));
        // exactly three consonants keep the plain rule
        assert_eq!(name_code("Carlo").as_deref(), Some("CRL"));
        assert_eq!(name_code("Ia").as_deref(), Some("IAX"));
    }

    #[test]
    fn diacritics_are_folded_before_extraction() {
        assert_eq!(name_code("José"), name_code("Jose"));
        assert_eq!(name_code("José").as_deref(), Some("JSO"));
        assert_eq!(surname_code("Müller").as_deref(), Some("MLL"));
    }

    #[test]
    fn month_letters_and_two_digit_year() {
        assert_eq!(date_code(date(2005, 8, 20), Sex::Male).unwrap(), "05M20");
        assert_eq!(date_code(date(1999, 12, 31), Sex::Female).unwrap(), "99T71");
        assert_eq!(date_code(date(1999, 12, 31), Sex::Unknown), Err(EncodingError::UnsupportedSex));
    }

    #[test]
    fn failures_are_reported_not_panicked() {
        let enc = FiscalCodeEncoder::builtin();
        let d = date(1980, 1, 1);
        assert_eq!(
            enc.encode("", "Mario", Sex::Male, d, "Roma"),
            Err(EncodingError::EmptyField("surname"))
        );
        assert_eq!(
            enc.encode("Rossi", "  ", Sex::Male, d, "Roma"),
            Err(EncodingError::EmptyField("given name"))
        );
        assert_eq!(
            enc.encode("Rossi", "Mario", Sex::Unknown, d, "Roma"),
            Err(EncodingError::UnsupportedSex)
        );
        assert_eq!(
            enc.encode("Rossi", "Mario", Sex::Male, d, "Atlantide"),
            Err(EncodingError::UnknownPlace("Atlantide".into()))
        );
    }

    #[test]
    fn record_with_bad_date_reports_raw_text() {
        let enc = FiscalCodeEncoder::builtin();
        let mut record = PersonRecord {
            row_index: 0,
            surname: "Rossi".into(),
            given_name: "Mario".into(),
            sex: Sex::Male,
            birth_date: None,
            birth_date_raw: "31/02/1980".into(),
            birth_place: "Roma".into(),
            fiscal_code: None,
        };
        assert_eq!(
            enc.encode_record(&record),
            Err(EncodingError::InvalidDate("31/02/1980".into()))
        );
        record.birth_date_raw.clear();
        assert_eq!(enc.encode_record(&record), Err(EncodingError::EmptyField("birth date")));
        record.birth_date = Some(date(1980, 1, 1));
        assert_eq!(enc.encode_record(&record).unwrap().as_str(), "RSSMRA80A01H501U");
    }

    #[test]
    fn deterministic() {
        let enc = FiscalCodeEncoder::builtin();
        let a = enc.encode("Verdi", "Lucia", Sex::Female, date(1970, 7, 4), "Firenze").unwrap();
        let b = enc.encode("Verdi", "Lucia", Sex::Female, date(1970, 7, 4), "Firenze").unwrap();
        assert_eq!(a, b);
    }
}
