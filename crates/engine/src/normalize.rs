//! Text normalization for identity keys, headers, and file stems.
//!
//! Every identity comparison in the engine goes through these functions;
//! the squash is the only fuzziness the join allows.

use regex::Regex;
use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::UnicodeNormalization;

/// Known double-encoding corruptions seen in exported header rows
/// (UTF-8 bytes misread as a legacy single-byte encoding, or already
/// replaced by U+FFFD). Applied before any folding.
const MOJIBAKE_TABLE: &[(&str, &str)] = &[
    ("PrÃ©nom", "Prénom"),
    ("prÃ©nom", "prénom"),
    ("lÃ©gal", "légal"),
    ("LÃ©gal", "Légal"),
    ("Prï¿½nom", "Prénom"),
    ("prï¿½nom", "prénom"),
    ("lï¿½gal", "légal"),
    ("Lï¿½gal", "Légal"),
    ("Pr\u{FFFD}nom", "Prénom"),
    ("pr\u{FFFD}nom", "prénom"),
    ("l\u{FFFD}gal", "légal"),
    ("L\u{FFFD}gal", "Légal"),
];

/// Substrings whose presence in a decoded string indicates the bytes
/// were UTF-8 misread as a single-byte encoding.
pub const MOJIBAKE_ARTIFACTS: &[&str] = &["Ã©", "Ã¨", "ï¿½", "\u{FFFD}"];

/// Decompose and drop combining marks, keeping base characters.
fn strip_marks(s: &str) -> String {
    s.nfd().filter(|c| canonical_combining_class(*c) == 0).collect()
}

/// Accent-fold and lowercase. Idempotent.
pub fn fold(s: &str) -> String {
    strip_marks(s).to_lowercase()
}

/// Fold, then keep only `[a-z0-9]`. Robust to spacing, hyphenation,
/// and punctuation differences.
pub fn squash_key(s: &str) -> String {
    fold(s).chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Unwrap the spreadsheet-export quoting artifact `="value"`.
fn unwrap_export_quoting(s: &str) -> &str {
    let t = s.trim();
    if let Some(rest) = t.strip_prefix('=') {
        let rest = rest.trim_start();
        if let Some(inner) = rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            return inner;
        }
    }
    t
}

/// Canonicalize a division/class label: `"4 ÈME D"`, `"4eme D"` and
/// `="4 D"` all become `"4D"`.
pub fn canon_division(s: &str) -> String {
    let unquoted = unwrap_export_quoting(s);
    let up = strip_marks(unquoted).to_uppercase().replace('\u{00A0}', " ");

    // Grade digit + section letter, skipping any ordinal suffix between.
    let re = Regex::new(r"([0-9])[^0-9]*([A-Z])").unwrap();
    if let Some(c) = re.captures(&up) {
        return format!("{}{}", &c[1], &c[2]);
    }

    // Labels without the digit+letter shape: unify the ordinal suffix
    // and strip separators.
    let t = up.replace("EME", "E");
    Regex::new(r"[\s\-.]+").unwrap().replace_all(&t, "").into_owned()
}

/// Repair known header mojibake before folding, so header resolution
/// survives the encoding ambiguity of exported files.
pub fn repair_mojibake(s: &str) -> String {
    let mut out = s.to_string();
    for (bad, good) in MOJIBAKE_TABLE {
        if out.contains(bad) {
            out = out.replace(bad, good);
        }
    }
    out
}

/// Strip BOM and non-breaking spaces from a cell value, then trim.
pub fn clean_cell(s: &str) -> String {
    s.replace('\u{FEFF}', "").replace('\u{00A0}', " ").trim().to_string()
}

/// Extract valid, deduplicated email addresses from raw field values.
/// Splits on `;`, `,`, `/`, backslash and whitespace; dedup is
/// case-insensitive, first-seen order, original casing kept.
pub fn parse_emails(values: &[&str]) -> Vec<String> {
    let email_re = Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").unwrap();
    let split_re = Regex::new(r"[;,/\\\s]+").unwrap();

    let mut seen = Vec::new();
    let mut out = Vec::new();
    for v in values {
        for part in split_re.split(v) {
            let part = part.trim_matches(|c: char| ".,;:()[]{}<>".contains(c));
            if part.is_empty() || !email_re.is_match(part) {
                continue;
            }
            let low = part.to_lowercase();
            if !seen.contains(&low) {
                seen.push(low);
                out.push(part.to_string());
            }
        }
    }
    out
}

/// Make a string safe for use as a file stem: accents stripped,
/// whitespace collapsed to underscores, anything outside `[\w.\-]`
/// dropped, underscore runs collapsed.
pub fn safe_file_stem(s: &str) -> String {
    let stripped = strip_marks(s.trim());
    let spaced = Regex::new(r"\s+").unwrap().replace_all(&stripped, "_").into_owned();
    let kept = Regex::new(r"[^\w.\-]").unwrap().replace_all(&spaced, "").into_owned();
    Regex::new(r"_+")
        .unwrap()
        .replace_all(&kept, "_")
        .trim_matches('_')
        .to_string()
}
