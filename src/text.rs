//! Text normalization shared by the gender classifier, the encoder and the
//! place lookup.
//!
//! Every lookup key in this crate goes through [`fold_diacritics`] first, so
//! `José`, `JOSE` and `jose` land on the same table entry and contribute the
//! same consonants/vowels to a fiscal code.

/// Transliterate to ASCII (`José` -> `Jose`, `İzmir` -> `Izmir`, `ß` -> `ss`).
pub fn fold_diacritics(s: &str) -> String {
    deunicode::deunicode(s)
}

/// Uppercase `A-Z` letters of `s` after folding diacritics; everything else
/// (spaces, apostrophes, digits) is dropped.
pub fn ascii_letters(s: &str) -> Vec<char> {
    fold_diacritics(s)
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// First whitespace-delimited token of `s`, if any.
pub fn first_token(s: &str) -> Option<&str> {
    s.split_whitespace().next()
}

/// Lookup key for given names: diacritics folded, lowercased, trimmed.
pub fn name_key(s: &str) -> String {
    fold_diacritics(s.trim()).to_lowercase()
}

/// Lookup key for places: diacritics folded, uppercased, every run of
/// non-alphanumeric characters collapsed to a single space.
pub fn place_key(s: &str) -> String {
    let folded = fold_diacritics(s);
    let mut out = String::with_capacity(folded.len());
    let mut pending_space = false;
    for ch in folded.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_uppercase());
        } else {
            pending_space = true;
        }
    }
    out
}
