//! Check character of a fiscal code.
//!
//! Each of the 15 body characters contributes a value that depends on whether
//! its 1-indexed position is odd or even. The sum modulo 26 is mapped to
//! `A..Z`.

/// Values for characters at odd positions, indexed by `0-9` / `A-Z` ordinal
/// (digits share the values of `A-J`).
const ODD_VALUES: [u32; 26] = [
    1, 0, 5, 7, 9, 13, 15, 17, 19, 21, 2, 4, 18, 20, 11, 3, 6, 8, 12, 14, 16, 10, 22, 25, 24, 23,
];

/// Length of the code without the check character.
pub const BODY_LEN: usize = 15;

fn ordinal(c: char) -> Option<u32> {
    match c {
        '0'..='9' => Some(c as u32 - '0' as u32),
        'A'..='Z' => Some(c as u32 - 'A' as u32),
        _ => None,
    }
}

/// Value contributed by `c` at the given 1-indexed position.
fn position_value(c: char, position: usize) -> Option<u32> {
    let ord = ordinal(c)?;
    if position % 2 == 1 {
        Some(ODD_VALUES[ord as usize])
    } else {
        // Even positions: digits 0-9 -> 0-9, letters A-Z -> 0-25.
        Some(ord)
    }
}

/// Check character for a 15-character uppercase body.
///
/// Returns `None` if the body has the wrong length or contains characters
/// outside `0-9A-Z`.
pub fn check_char(body: &str) -> Option<char> {
    if body.len() != BODY_LEN {
        return None;
    }
    let mut sum = 0u32;
    for (idx, c) in body.chars().enumerate() {
        sum += position_value(c, idx + 1)?;
    }
    char::from_u32('A' as u32 + sum % 26)
}
