//! Tabular ingestion: delimiter sniffing, header resolution against
//! synonym sets, and per-row extraction into [`StudentRecord`]s.
//!
//! Never raises on encoding or delimiter ambiguity — it degrades to
//! best-effort. A file that cannot be parsed at all is fatal; a row
//! missing identity fields is dropped and counted.

use regex::Regex;
use serde::Serialize;

use crate::error::EngineError;
use crate::model::StudentRecord;
use crate::normalize::{canon_division, clean_cell, parse_emails, repair_mojibake, squash_key};

// ---------------------------------------------------------------------------
// Delimiter detection
// ---------------------------------------------------------------------------

/// Count `;` vs `,` in the first 4KB; the more frequent wins, `;` on
/// ties (the common export default in this domain).
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample = &content.as_bytes()[..content.len().min(4096)];
    let semis = sample.iter().filter(|&&b| b == b';').count();
    let commas = sample.iter().filter(|&&b| b == b',').count();
    if semis >= commas {
        b';'
    } else {
        b','
    }
}

// ---------------------------------------------------------------------------
// Header resolution
// ---------------------------------------------------------------------------

/// Resolved column indices for one input file. Email columns are
/// optional; identity columns are not.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub division: usize,
    pub surname: usize,
    pub given_name: usize,
    pub email_1: Option<usize>,
    pub email_2: Option<usize>,
}

const DIVISION_SYNONYMS: &[&str] = &["division", "classe"];

const SURNAME_SYNONYMS: &[&str] = &["nomdefamille", "nomfamille", "nom", "nomeleve"];

const GIVEN_SYNONYMS: &[&str] = &["prenom1", "prenom", "prenomeleve"];

const EMAIL_1_SYNONYMS: &[&str] = &[
    "courrielreprlegal",
    "courrielrepresentantlegal",
    "emailreprlegal",
    "mailreprlegal",
    "adresseelectroniquereprlegal",
    "courriel1",
    "email1",
    "mail1",
];

const EMAIL_2_SYNONYMS: &[&str] = &[
    "courrielautrereprlegal",
    "courrielautrerepresentantlegal",
    "emailautrereprlegal",
    "mailautrereprlegal",
    "adresseelectroniqueautrereprlegal",
    "courriel2",
    "email2",
    "mail2",
];

/// Mojibake-repair then squash; headers compare in this space only.
fn header_key(h: &str) -> String {
    squash_key(&repair_mojibake(&clean_cell(h)))
}

fn find_by_synonyms(keys: &[String], synonyms: &[&str]) -> Option<usize> {
    keys.iter().position(|k| synonyms.contains(&k.as_str()))
}

/// Resolve the header row to canonical columns.
///
/// Given-name resolution tolerates accent-loss corruption of "prénom":
/// after the synonym sets, a `pr?en?om\d*` full match is accepted, and
/// as a last resort any header containing that shape as a substring.
pub fn resolve_columns(headers: &[String], file: &str) -> Result<ColumnMap, EngineError> {
    let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();

    let missing = |column: &str| EngineError::MissingColumn {
        file: file.to_string(),
        column: column.to_string(),
    };

    let division =
        find_by_synonyms(&keys, DIVISION_SYNONYMS).ok_or_else(|| missing("Division"))?;
    let surname =
        find_by_synonyms(&keys, SURNAME_SYNONYMS).ok_or_else(|| missing("Nom de famille"))?;

    let given_name = find_by_synonyms(&keys, GIVEN_SYNONYMS)
        .or_else(|| {
            let exact = Regex::new(r"^pr?e?n?om\d*$").unwrap();
            keys.iter()
                .position(|k| exact.is_match(k) && !k.contains("repr"))
        })
        .or_else(|| {
            let fuzzy = Regex::new(r"pr?e?n?om").unwrap();
            keys.iter()
                .position(|k| fuzzy.is_match(k) && !k.contains("repr") && !k.contains("autre"))
        })
        .ok_or_else(|| missing("Prénom"))?;

    let email_1 = find_by_synonyms(&keys, EMAIL_1_SYNONYMS);
    let email_2 = find_by_synonyms(&keys, EMAIL_2_SYNONYMS);

    Ok(ColumnMap {
        division,
        surname,
        given_name,
        email_1,
        email_2,
    })
}

// ---------------------------------------------------------------------------
// Row extraction
// ---------------------------------------------------------------------------

/// Per-file ingestion counters, reported in aggregate (dropped rows are
/// never detailed individually).
#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    pub file: String,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

/// Parse one decoded file into records. `file` is a label for
/// diagnostics only; decoding happened upstream.
pub fn ingest_str(file: &str, content: &str) -> Result<(Vec<StudentRecord>, IngestStats), EngineError> {
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::Csv(format!("{file}: {e}")))?
        .iter()
        .map(|h| clean_cell(h))
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(EngineError::EmptyInput(file.to_string()));
    }

    let columns = resolve_columns(&headers, file)?;

    let mut records = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_dropped = 0usize;

    for result in reader.records() {
        let row = result.map_err(|e| EngineError::Csv(format!("{file}: {e}")))?;
        rows_read += 1;

        let cell = |idx: usize| clean_cell(row.get(idx).unwrap_or(""));

        let division_raw = cell(columns.division);
        let surname = cell(columns.surname);
        let given_name = cell(columns.given_name);

        if division_raw.is_empty() || surname.is_empty() || given_name.is_empty() {
            rows_dropped += 1;
            continue;
        }

        let mut email_values: Vec<String> = Vec::new();
        if let Some(idx) = columns.email_1 {
            email_values.push(cell(idx));
        }
        if let Some(idx) = columns.email_2 {
            email_values.push(cell(idx));
        }
        let email_refs: Vec<&str> = email_values.iter().map(|s| s.as_str()).collect();

        records.push(StudentRecord {
            division: canon_division(&division_raw),
            surname,
            given_name,
            emails: parse_emails(&email_refs),
            body: None,
        });
    }

    let stats = IngestStats {
        file: file.to_string(),
        rows_kept: records.len(),
        rows_read,
        rows_dropped,
    };

    Ok((records, stats))
}

/// Ingest several decoded files independently and concatenate, keeping
/// argument order (deduplication happens in the join engine, where the
/// earlier file's values win).
pub fn ingest_files(files: &[(String, String)]) -> Result<(Vec<StudentRecord>, Vec<IngestStats>), EngineError> {
    let mut records = Vec::new();
    let mut stats = Vec::new();
    for (label, content) in files {
        let (mut file_records, file_stats) = ingest_str(label, content)?;
        records.append(&mut file_records);
        stats.push(file_stats);
    }
    Ok((records, stats))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_semicolon_wins() {
        assert_eq!(sniff_delimiter("Nom;Prénom;Division\nA;B;C\n"), b';');
    }

    #[test]
    fn sniff_comma_wins() {
        assert_eq!(sniff_delimiter("Nom,Prénom,Division\nA,B,C\n"), b',');
    }

    #[test]
    fn sniff_tie_defaults_to_semicolon() {
        assert_eq!(sniff_delimiter("a;b,c\n"), b';');
        assert_eq!(sniff_delimiter(""), b';');
    }

    #[test]
    fn headers_resolve_through_synonyms() {
        let headers: Vec<String> = ["Classe", "Nom de famille", "Prénom 1", "Courriel repr. légal"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cols = resolve_columns(&headers, "test.csv").unwrap();
        assert_eq!(cols.division, 0);
        assert_eq!(cols.surname, 1);
        assert_eq!(cols.given_name, 2);
        assert_eq!(cols.email_1, Some(3));
        assert_eq!(cols.email_2, None);
    }

    #[test]
    fn headers_resolve_through_mojibake() {
        let headers: Vec<String> = [
            "Division",
            "Nom de famille",
            "PrÃ©nom 1",
            "Courriel repr. lÃ©gal",
            "Courriel autre repr. l\u{FFFD}gal",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let cols = resolve_columns(&headers, "test.csv").unwrap();
        assert_eq!(cols.given_name, 2);
        assert_eq!(cols.email_1, Some(3));
        assert_eq!(cols.email_2, Some(4));
    }

    #[test]
    fn given_name_regex_fallback_tolerates_accent_loss() {
        // "Prénom" with the é dropped entirely by a bad decode
        let headers: Vec<String> = ["Division", "Nom", "Prnom 1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cols = resolve_columns(&headers, "test.csv").unwrap();
        assert_eq!(cols.given_name, 2);
    }

    #[test]
    fn given_name_fallback_skips_guardian_columns() {
        let headers: Vec<String> = ["Division", "Nom", "Prénom repr. légal", "Prénom 1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cols = resolve_columns(&headers, "test.csv").unwrap();
        assert_eq!(cols.given_name, 3);
    }

    #[test]
    fn unresolvable_surname_is_fatal() {
        let headers: Vec<String> = ["Division", "Prénom 1"].iter().map(|s| s.to_string()).collect();
        let err = resolve_columns(&headers, "bad.csv").unwrap_err();
        assert!(err.to_string().contains("Nom de famille"));
    }

    #[test]
    fn ingest_semicolon_export_with_quoting_artifacts() {
        let content = "\
Division;Nom de famille;Prénom 1;Courriel repr. légal;Courriel autre repr. légal
=\"4 D\";DUPONT;Léa;mere@example.org;pere@example.org
4 ème D;MARTIN;Hugo;parent@example.org;
";
        let (records, stats) = ingest_str("4D.csv", content).unwrap();
        assert_eq!(stats.rows_read, 2);
        assert_eq!(stats.rows_kept, 2);
        assert_eq!(records[0].division, "4D");
        assert_eq!(records[1].division, "4D");
        assert_eq!(records[0].emails, vec!["mere@example.org", "pere@example.org"]);
        assert_eq!(records[1].emails, vec!["parent@example.org"]);
    }

    #[test]
    fn rows_missing_identity_fields_dropped_in_aggregate() {
        let content = "\
Division;Nom;Prénom
4D;DUPONT;Léa
4D;;Hugo
;MARTIN;Zoé
4D;BERNARD;
";
        let (records, stats) = ingest_str("4D.csv", content).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(stats.rows_dropped, 3);
    }

    #[test]
    fn identity_keys_equal_under_accident_of_formatting() {
        let content = "\
Division;Nom;Prénom
4D;DURAND;Anne-Lise
4 ème D;Durand;ANNE LISE
";
        let (records, _) = ingest_str("x.csv", content).unwrap();
        assert_eq!(records[0].identity(), records[1].identity());
    }

    #[test]
    fn empty_file_is_fatal() {
        assert!(matches!(ingest_str("empty.csv", ""), Err(EngineError::EmptyInput(_))));
    }
}
