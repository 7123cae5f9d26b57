//! Given name -> sex.

use crate::domain::{Cell, Sex};
use crate::gender::table::{GenderGrade, NameGenderTable};
use crate::text::first_token;

/// Infers sex from the first token of a given name.
///
/// Pure: the result depends only on the input and the borrowed table.
#[derive(Debug, Clone, Copy)]
pub struct NameGenderClassifier<'a> {
    table: &'a NameGenderTable,
}

impl NameGenderClassifier<'static> {
    /// Classifier over the embedded name table.
    pub fn builtin() -> Self {
        Self::new(NameGenderTable::builtin())
    }
}

impl<'a> NameGenderClassifier<'a> {
    pub fn new(table: &'a NameGenderTable) -> Self {
        Self { table }
    }

    /// Graded lookup of the first token of `name`.
    ///
    /// A hyphenated compound (`Anna-Maria`) that is not listed falls back to
    /// its first segment.
    pub fn grade(&self, name: &str) -> GenderGrade {
        let Some(token) = first_token(name) else {
            return GenderGrade::Invalid;
        };

        match self.table.lookup(token) {
            GenderGrade::NotFound => match token.split_once('-') {
                Some((head, _)) if !head.is_empty() => self.table.lookup(head),
                _ => GenderGrade::NotFound,
            },
            grade => grade,
        }
    }

    pub fn classify(&self, name: &str) -> Sex {
        self.grade(name).sex()
    }

    /// Graded lookup of a spreadsheet cell. Anything but text is invalid.
    pub fn grade_cell(&self, cell: &Cell) -> GenderGrade {
        match cell.as_str() {
            Some(s) => self.grade(s),
            None => GenderGrade::Invalid,
        }
    }

    pub fn classify_cell(&self, cell: &Cell) -> Sex {
        self.grade_cell(cell).sex()
    }
}
