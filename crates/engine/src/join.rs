//! Identity resolution: deduplicate canonical records, guard against
//! division mismatches between the two sides, then join records to
//! classified documents by squashed identity.
//!
//! Matching is strict equality of squashed keys. There is no edit
//! distance; the squash already absorbs accent, case, and whitespace
//! variation, and anything beyond that is a data problem to surface,
//! not to paper over.

use std::collections::BTreeSet;

use crate::classify::document_file_name;
use crate::config::RunConfig;
use crate::error::EngineError;
use crate::model::{
    DocumentKey, DocumentSet, JoinedRecord, MissingDocument, StudentRecord, Subject,
};
use crate::normalize::{canon_division, squash_key};

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Merge records sharing an identity key. The earlier record's
/// non-empty field wins; emails are unioned in first-seen order.
/// Output order follows first appearance.
pub fn dedupe_records(records: Vec<StudentRecord>) -> Vec<StudentRecord> {
    let mut out: Vec<StudentRecord> = Vec::new();
    for record in records {
        let key = record.identity();
        match out.iter_mut().find(|r| r.identity() == key) {
            Some(existing) => {
                for email in &record.emails {
                    let dup = existing
                        .emails
                        .iter()
                        .any(|e| e.eq_ignore_ascii_case(email));
                    if !dup {
                        existing.emails.push(email.clone());
                    }
                }
                if existing.body.as_deref().map_or(true, str::is_empty) {
                    existing.body = record.body;
                }
            }
            None => out.push(record),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Anti-mismatch guard
// ---------------------------------------------------------------------------

/// Fail fast when the tabular side or the document side does not belong
/// to the configured division. Running a 6B export against 6A documents
/// must die here, not produce an all-missing report.
pub fn guard_division(
    records: &[StudentRecord],
    docs: &DocumentSet,
    division: &str,
) -> Result<(), EngineError> {
    let expected = canon_division(division);

    let seen: BTreeSet<String> = records
        .iter()
        .map(|r| canon_division(&r.division))
        .filter(|d| !d.is_empty())
        .collect();
    if !seen.contains(&expected) {
        return Err(EngineError::NoDivisionRows {
            expected,
            seen: seen.into_iter().collect(),
        });
    }

    let foreign: BTreeSet<String> = docs
        .keys()
        .map(|k| canon_division(&k.division))
        .filter(|d| !d.is_empty() && *d != expected)
        .collect();
    if !foreign.is_empty() {
        return Err(EngineError::ForeignDocuments {
            expected,
            seen: foreign.into_iter().collect(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub joined: Vec<JoinedRecord>,
    pub missing: Vec<MissingDocument>,
    /// Document keys no canonical record claimed.
    pub orphans: Vec<DocumentKey>,
}

/// Isolated surname tokens of a compound surname; empty for a simple
/// surname.
fn surname_tokens(surname: &str) -> Vec<&str> {
    let tokens: Vec<&str> = surname
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|t| squash_key(t).len() >= 2)
        .collect();
    if tokens.len() < 2 {
        return Vec::new();
    }
    tokens
}

/// Look up one (record, subject) pair in the document set. Exact key
/// first; compound surnames fall back to each isolated surname token.
fn lookup<'a>(
    docs: &'a DocumentSet,
    record: &StudentRecord,
    subject: Subject,
    year: &str,
) -> Option<(DocumentKey, &'a str)> {
    let exact = DocumentKey::new(&record.division, &record.surname, &record.given_name, subject, year);
    if let Some(file) = docs.get(&exact) {
        return Some((exact, file.as_str()));
    }

    for token in surname_tokens(&record.surname) {
        let key = DocumentKey::new(&record.division, token, &record.given_name, subject, year);
        if let Some(file) = docs.get(&key) {
            return Some((key, file.as_str()));
        }
    }
    None
}

/// Join deduplicated records against the document set. One
/// `JoinedRecord` per record; absent subjects feed the missing report
/// with the filename that would have matched; unclaimed documents are
/// returned as orphans.
pub fn join(records: &[StudentRecord], docs: &DocumentSet, config: &RunConfig) -> JoinOutput {
    let mut claimed: BTreeSet<DocumentKey> = BTreeSet::new();
    let mut joined = Vec::with_capacity(records.len());
    let mut missing = Vec::new();
    let examples: Vec<String> = docs.values().take(3).cloned().collect();

    for record in records {
        let mut doc_francais = None;
        let mut doc_maths = None;
        let mut absent = Vec::new();

        for subject in Subject::ALL {
            match lookup(docs, record, subject, &config.year) {
                Some((key, file)) => {
                    claimed.insert(key);
                    match subject {
                        Subject::Francais => doc_francais = Some(file.to_string()),
                        Subject::Mathematiques => doc_maths = Some(file.to_string()),
                    }
                }
                None => absent.push(subject),
            }
        }

        if !absent.is_empty() {
            // Both filenames, not just the absent one, so a reader can
            // spot a misclassified artifact next to the genuine gap.
            let expected = Subject::ALL
                .iter()
                .map(|&subject| {
                    document_file_name(
                        &record.division,
                        &record.surname,
                        &record.given_name,
                        subject,
                        &config.year,
                    )
                })
                .collect();
            let expected_alt = surname_tokens(&record.surname)
                .into_iter()
                .flat_map(|token| {
                    Subject::ALL.iter().map(move |&subject| {
                        document_file_name(
                            &record.division,
                            token,
                            &record.given_name,
                            subject,
                            &config.year,
                        )
                    })
                })
                .collect();
            missing.push(MissingDocument {
                division: record.division.clone(),
                surname: record.surname.clone(),
                given_name: record.given_name.clone(),
                missing: absent,
                expected,
                expected_alt,
                examples: examples.clone(),
            });
        }

        joined.push(JoinedRecord {
            record: record.clone(),
            doc_francais,
            doc_maths,
        });
    }

    let orphans = docs
        .keys()
        .filter(|k| !claimed.contains(k))
        .cloned()
        .collect();

    JoinOutput { joined, missing, orphans }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
