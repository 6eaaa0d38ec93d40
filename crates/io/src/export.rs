// CSV and JSON export of run artifacts

use std::path::Path;

use serde::Serialize;

use publipost_engine::model::{MailRow, MissingDocument, RunResult, UnresolvedPage};

/// Write the mail-merge rows, one per student, UTF-8 with header.
pub fn write_mailmerge(path: &Path, rows: &[MailRow]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    for row in rows {
        writer.serialize(row).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct MissingRow<'a> {
    #[serde(rename = "Classe")]
    division: &'a str,
    #[serde(rename = "Nom")]
    surname: &'a str,
    #[serde(rename = "Prénom")]
    given_name: &'a str,
    #[serde(rename = "Manquant")]
    missing: String,
    #[serde(rename = "Fichiers_attendus")]
    expected: String,
    #[serde(rename = "Fichiers_attendus_2")]
    expected_alt: String,
    #[serde(rename = "Exemples_division")]
    examples: String,
}

/// Write the missing-document report: which subjects are absent for
/// each student, and the filenames that would have matched.
pub fn write_missing(path: &Path, missing: &[MissingDocument]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    for m in missing {
        let subjects: Vec<&str> = m.missing.iter().map(|s| s.label()).collect();
        writer
            .serialize(MissingRow {
                division: &m.division,
                surname: &m.surname,
                given_name: &m.given_name,
                missing: subjects.join("; "),
                expected: m.expected.join("; "),
                expected_alt: m.expected_alt.join("; "),
                examples: m.examples.join("; "),
            })
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct UnresolvedRow<'a> {
    #[serde(rename = "Page")]
    index: usize,
    #[serde(rename = "Score_francais")]
    fr_score: u32,
    #[serde(rename = "Score_math")]
    ma_score: u32,
    #[serde(rename = "Nom")]
    name: &'a str,
    #[serde(rename = "Extrait")]
    sample: &'a str,
}

/// Write unclassifiable pages for manual review.
pub fn write_unresolved(path: &Path, unresolved: &[UnresolvedPage]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    for u in unresolved {
        writer
            .serialize(UnresolvedRow {
                index: u.index,
                fr_score: u.fr_score,
                ma_score: u.ma_score,
                name: u.name.as_deref().unwrap_or(""),
                sample: &u.sample,
            })
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

/// Dump the full run result as pretty JSON.
pub fn write_json(path: &Path, result: &RunResult) -> Result<(), String> {
    let json = serde_json::to_string_pretty(result).map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| e.to_string())
}
