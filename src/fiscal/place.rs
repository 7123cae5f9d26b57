//! Birthplace -> cadastral code lookup.
//!
//! Italian municipalities carry a 4-character cadastral code (letter + three
//! digits, e.g. `H501` for Roma); foreign countries use `Z` codes (`Z110` for
//! France). Municipality names are not unique nationally, so entries are
//! keyed by normalized name and disambiguated by province.
//!
//! The builtin table (`data/places.csv`) covers provincial capitals, the larger
//! non-capital municipalities, a few homonyms and common countries. The full
//! national list can be loaded from a CSV with the same
//! `name,province,code[,aliases]` layout. Aliases are `|`-separated alternative
//! names (`Reggio Calabria` for `Reggio di Calabria`).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{EncodingError, TableError};
use crate::gender::table::header_index;
use crate::text::place_key;

const BUILTIN_PLACES: &str = include_str!("../../data/places.csv");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    Municipality,
    Country,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    /// Two-letter province code; `None` for countries.
    pub province: Option<String>,
    pub code: String,
    pub kind: PlaceKind,
    /// Alternative names that resolve to this place.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl Place {
    /// `Roma (RM)` for municipalities, the bare name for countries.
    pub fn label(&self) -> String {
        match &self.province {
            Some(p) => format!("{} ({p})", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaceTable {
    by_name: HashMap<String, Vec<Place>>,
    by_code: HashMap<String, Place>,
}

impl PlaceTable {
    /// The embedded table, parsed on first use.
    pub fn builtin() -> &'static PlaceTable {
        static TABLE: OnceLock<PlaceTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PlaceTable::from_reader(BUILTIN_PLACES.as_bytes()).unwrap_or_else(|err| {
                log::error!("builtin place table is corrupt: {err}");
                PlaceTable::default()
            })
        })
    }

    /// Load a `name,province,code[,aliases]` CSV.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let name_idx = header_index(&headers, "name")?;
        let province_idx = header_index(&headers, "province")?;
        let code_idx = header_index(&headers, "code")?;
        let aliases_idx = header_index(&headers, "aliases").ok();

        let mut table = PlaceTable::default();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let line = idx + 2;
            let name = record.get(name_idx).unwrap_or("");
            if name.is_empty() {
                continue;
            }
            let code = record.get(code_idx).unwrap_or("").to_ascii_uppercase();
            if !is_place_code(&code) {
                return Err(TableError::Row {
                    line,
                    message: format!("invalid cadastral code '{code}' for '{name}'"),
                });
            }
            let province = record
                .get(province_idx)
                .filter(|p| !p.is_empty())
                .map(str::to_ascii_uppercase);
            let kind = if province.is_some() {
                PlaceKind::Municipality
            } else {
                PlaceKind::Country
            };
            let aliases = aliases_idx
                .and_then(|idx| record.get(idx))
                .map(|field| {
                    field
                        .split('|')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            table.insert(Place {
                name: name.to_string(),
                province,
                code,
                kind,
                aliases,
            });
        }

        Ok(table)
    }

    /// Add or replace a place, keyed by its name and every alias. An existing
    /// entry with the same key and province is replaced.
    pub fn insert(&mut self, place: Place) {
        let keys: Vec<String> = std::iter::once(&place.name)
            .chain(&place.aliases)
            .map(|n| place_key(n))
            .collect();
        for key in keys {
            let entries = self.by_name.entry(key).or_default();
            match entries.iter_mut().find(|p| p.province == place.province) {
                Some(existing) => *existing = place.clone(),
                None => entries.push(place.clone()),
            }
        }
        self.by_code.insert(place.code.clone(), place);
    }

    pub fn merge(&mut self, other: PlaceTable) {
        for place in other.by_code.into_values() {
            self.insert(place);
        }
    }

    pub fn by_code(&self, code: &str) -> Option<&Place> {
        self.by_code.get(&code.trim().to_ascii_uppercase())
    }

    /// Resolve a birthplace query.
    ///
    /// Accepted forms: `Roma`, `Roma (RM)`, or a raw cadastral code `H501`.
    pub fn resolve(&self, query: &str) -> Result<&Place, EncodingError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EncodingError::EmptyField("birthplace"));
        }

        let upper = query.to_ascii_uppercase();
        if is_place_code(&upper) {
            if let Some(place) = self.by_code.get(&upper) {
                return Ok(place);
            }
        }

        let (name, province) = split_province(query);
        let candidates = self
            .by_name
            .get(&place_key(name))
            .ok_or_else(|| EncodingError::UnknownPlace(query.to_string()))?;

        let matching: Vec<&Place> = match province {
            Some(prov) => candidates
                .iter()
                .filter(|p| {
                    p.province
                        .as_deref()
                        .is_some_and(|own| own.eq_ignore_ascii_case(prov))
                })
                .collect(),
            None => candidates.iter().collect(),
        };

        match matching.as_slice() {
            [] => Err(EncodingError::UnknownPlace(query.to_string())),
            [only] => Ok(*only),
            many => Err(EncodingError::AmbiguousPlace {
                name: name.trim().to_string(),
                candidates: many.iter().map(|p| p.label()).collect(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// `A-Z` followed by three digits.
pub fn is_place_code(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 4 && bytes[0].is_ascii_uppercase() && bytes[1..].iter().all(u8::is_ascii_digit)
}

/// `Castro (LE)` -> (`Castro`, Some(`LE`)).
fn split_province(query: &str) -> (&str, Option<&str>) {
    let trimmed = query.trim_end();
    if let Some(rest) = trimmed.strip_suffix(')') {
        if let Some((name, prov)) = rest.rsplit_once('(') {
            let prov = prov.trim();
            if prov.len() == 2 && prov.chars().all(|c| c.is_ascii_alphabetic()) {
                return (name.trim_end(), Some(prov));
            }
        }
    }
    (query, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resolves_capitals_and_countries() {
        let table = PlaceTable::builtin();
        assert_eq!(table.resolve("Roma").unwrap().code, "H501");
        assert_eq!(table.resolve("  milano ").unwrap().code, "F205");
        assert_eq!(table.resolve("Forli").unwrap().code, "D704");
        assert_eq!(table.resolve("L'Aquila").unwrap().code, "A345");
        assert_eq!(table.resolve("l aquila").unwrap().code, "A345");
        let france = table.resolve("Francia").unwrap();
        assert_eq!(france.code, "Z110");
        assert_eq!(france.kind, PlaceKind::Country);
    }

    #[test]
    fn builtin_covers_non_capital_municipalities() {
        let table = PlaceTable::builtin();
        assert_eq!(table.resolve("Fiumicino").unwrap().code, "M297");
        assert_eq!(table.resolve("Sesto San Giovanni").unwrap().code, "I690");
        assert_eq!(table.resolve("Giugliano in Campania").unwrap().code, "E054");
        assert_eq!(table.resolve("Citta di Castello").unwrap().code, "C745");
    }

    #[test]
    fn aliases_resolve_to_the_official_name() {
        let table = PlaceTable::builtin();
        let reggio = table.resolve("Reggio Calabria").unwrap();
        assert_eq!(reggio.code, "H224");
        assert_eq!(reggio.name, "Reggio di Calabria");
        assert_eq!(table.resolve("Reggio Emilia").unwrap().code, "H223");
        assert_eq!(table.resolve("Reggio Emilia (RE)").unwrap().code, "H223");
        assert_eq!(table.resolve("Stati Uniti").unwrap().code, "Z404");
        assert_eq!(table.resolve("Bolzano/Bozen").unwrap().code, "A952");
    }

    #[test]
    fn alias_column_is_optional_when_loading() {
        let table = PlaceTable::from_reader(
            "name,province,code,aliases\nSan Giovanni Rotondo,FG,H926,S. Giovanni Rotondo | SGR\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(table.resolve("SGR").unwrap().code, "H926");
        assert_eq!(table.resolve("S. Giovanni Rotondo").unwrap().code, "H926");
        assert_eq!(table.len(), 1);

        let mut merged = PlaceTable::builtin().clone();
        merged.merge(table);
        assert_eq!(merged.resolve("sgr").unwrap().name, "San Giovanni Rotondo");
    }

    #[test]
    fn raw_codes_are_accepted() {
        let table = PlaceTable::builtin();
        assert_eq!(table.resolve("h501").unwrap().name, "Roma");
        assert_eq!(table.by_code("Z404").unwrap().name, "Stati Uniti d'America");
    }

    #[test]
    fn homonyms_need_a_province() {
        let table = PlaceTable::builtin();
        let err = table.resolve("Castro").unwrap_err();
        match err {
            EncodingError::AmbiguousPlace { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates.contains(&"Castro (LE)".to_string()));
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
        assert_eq!(table.resolve("Castro (LE)").unwrap().code, "M261");
        assert_eq!(table.resolve("Castro (bg)").unwrap().code, "C337");
        assert!(matches!(
            table.resolve("Castro (RM)"),
            Err(EncodingError::UnknownPlace(_))
        ));
    }

    #[test]
    fn unknown_and_empty_queries() {
        let table = PlaceTable::builtin();
        assert_eq!(
            table.resolve("Atlantide"),
            Err(EncodingError::UnknownPlace("Atlantide".to_string()))
        );
        assert_eq!(table.resolve("  "), Err(EncodingError::EmptyField("birthplace")));
    }

    #[test]
    fn merge_adds_and_replaces() {
        let mut table = PlaceTable::builtin().clone();
        let extra = PlaceTable::from_reader(
            "name,province,code\nFiumicino,RM,M297\nRoma,RM,H501\n".as_bytes(),
        )
        .unwrap();
        table.merge(extra);
        assert_eq!(table.resolve("Fiumicino").unwrap().code, "M297");
        assert_eq!(table.resolve("Roma").unwrap().code, "H501");
    }

    #[test]
    fn rejects_malformed_codes() {
        let err = PlaceTable::from_reader("name,province,code\nRoma,RM,H5O1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::Row { line: 2, .. }));
    }

    #[test]
    fn split_province_forms() {
        assert_eq!(split_province("Castro (LE)"), ("Castro", Some("LE")));
        assert_eq!(split_province("Roma"), ("Roma", None));
        assert_eq!(split_province("Foo (bar baz)"), ("Foo (bar baz)", None));
    }
}
