use std::collections::BTreeMap;

use serde::Serialize;

use crate::ingest::IngestStats;
use crate::normalize::{canon_division, squash_key};

// ---------------------------------------------------------------------------
// Canonical records (tabular side)
// ---------------------------------------------------------------------------

/// One student's guardian-contact data, normalized from a spreadsheet
/// export. Immutable once the join engine consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct StudentRecord {
    /// Canonical division label, e.g. "4D".
    pub division: String,
    pub surname: String,
    pub given_name: String,
    /// Validated, deduplicated guardian addresses, first-seen order.
    pub emails: Vec<String>,
    /// Free-text message body; filled uniformly unless already present.
    pub body: Option<String>,
}

impl StudentRecord {
    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            division: squash_key(&canon_division(&self.division)),
            surname: squash_key(&self.surname),
            given: squash_key(&self.given_name),
        }
    }
}

/// Normalized (division, surname, given-name) triple. Two records or a
/// record-and-document pair match iff their keys are equal; there is no
/// edit-distance fuzziness beyond the squash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IdentityKey {
    pub division: String,
    pub surname: String,
    pub given: String,
}

// ---------------------------------------------------------------------------
// Pages (document side)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Francais,
    Mathematiques,
}

impl Subject {
    pub const ALL: [Subject; 2] = [Subject::Francais, Subject::Mathematiques];

    /// Accent-folded form used in file stems and keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Francais => "francais",
            Self::Mathematiques => "mathematiques",
        }
    }

    /// Display label used in generated artifact names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Francais => "Français",
            Self::Mathematiques => "Mathématiques",
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Extracted text of one scanned page, in original document order.
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-based page index, stable within the source document.
    pub index: usize,
    pub text: String,
}

/// One scanned page after scoring, name extraction, and subject
/// resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedPage {
    pub index: usize,
    pub fr_score: u32,
    pub ma_score: u32,
    pub subject: Option<Subject>,
    /// Extracted "GivenName SURNAME" line, if any.
    pub name: Option<String>,
}

/// Pages sharing one extracted student name, ordered by page index
/// (order is used only to break ties deterministically).
#[derive(Debug, Clone, Serialize)]
pub struct StudentPageGroup {
    pub name: String,
    pub pages: Vec<ClassifiedPage>,
}

/// A page that could not be assigned a (student, subject) pair.
/// Reported for manual review, never silently dropped.
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedPage {
    pub index: usize,
    pub fr_score: u32,
    pub ma_score: u32,
    pub name: Option<String>,
    /// First ~400 chars of the page, newlines flattened.
    pub sample: String,
}

// ---------------------------------------------------------------------------
// Classified documents
// ---------------------------------------------------------------------------

/// Key of one classified document artifact. Name components are
/// squashed so the catalog and the join agree on identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentKey {
    pub division: String,
    pub surname: String,
    pub given: String,
    pub subject: Subject,
    pub year: String,
}

impl DocumentKey {
    pub fn new(division: &str, surname: &str, given: &str, subject: Subject, year: &str) -> Self {
        Self {
            division: canon_division(division),
            surname: squash_key(surname),
            given: squash_key(given),
            subject,
            year: year.trim().to_string(),
        }
    }

    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            division: squash_key(&self.division),
            surname: self.surname.clone(),
            given: self.given.clone(),
        }
    }
}

/// Classified documents by key. BTreeMap keeps reporting deterministic.
pub type DocumentSet = BTreeMap<DocumentKey, String>;

// ---------------------------------------------------------------------------
// Join output
// ---------------------------------------------------------------------------

/// One canonical record joined to zero-or-two documents (one per
/// subject). Complete iff both documents are present.
#[derive(Debug, Clone, Serialize)]
pub struct JoinedRecord {
    pub record: StudentRecord,
    pub doc_francais: Option<String>,
    pub doc_maths: Option<String>,
}

impl JoinedRecord {
    pub fn is_complete(&self) -> bool {
        self.doc_francais.is_some() && self.doc_maths.is_some()
    }

    pub fn doc(&self, subject: Subject) -> Option<&str> {
        match subject {
            Subject::Francais => self.doc_francais.as_deref(),
            Subject::Mathematiques => self.doc_maths.as_deref(),
        }
    }
}

/// A student with one or both documents absent, with the filename that
/// would have satisfied the match, for manual verification.
#[derive(Debug, Clone, Serialize)]
pub struct MissingDocument {
    pub division: String,
    pub surname: String,
    pub given_name: String,
    pub missing: Vec<Subject>,
    /// Expected artifact filenames for both subjects.
    pub expected: Vec<String>,
    /// Alternate filenames tried for compound surnames, one pair per
    /// isolated surname token.
    pub expected_alt: Vec<String>,
    /// A few filenames actually present for the division, to eyeball
    /// against the expected names.
    pub examples: Vec<String>,
}

// ---------------------------------------------------------------------------
// Final rows + summary
// ---------------------------------------------------------------------------

/// One output row per student, in the column contract the mail-merge
/// consumer expects.
#[derive(Debug, Clone, Serialize)]
pub struct MailRow {
    #[serde(rename = "Classe")]
    pub division: String,
    #[serde(rename = "Nom")]
    pub surname: String,
    #[serde(rename = "Prénom")]
    pub given_name: String,
    #[serde(rename = "Emails")]
    pub emails: String,
    #[serde(rename = "PJ_francais")]
    pub doc_francais: String,
    #[serde(rename = "PJ_math")]
    pub doc_maths: String,
    #[serde(rename = "Attachments")]
    pub attachments: String,
    #[serde(rename = "Annee")]
    pub year: String,
    #[serde(rename = "Objet")]
    pub subject_line: String,
    #[serde(rename = "CorpsMessage")]
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub division: String,
    pub year: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub students: usize,
    pub complete: usize,
    pub matched_francais: usize,
    pub matched_maths: usize,
    pub coverage_francais: f64,
    pub coverage_maths: f64,
    pub rows_dropped: usize,
    pub unresolved_pages: usize,
    pub orphan_documents: usize,
    pub warnings: Vec<String>,
}

/// Full engine output: primary rows plus every diagnostics collection.
/// Recoverable issues are aggregated here, never thrown away.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub rows: Vec<MailRow>,
    pub missing: Vec<MissingDocument>,
    pub unresolved: Vec<UnresolvedPage>,
    /// Document references with no matching canonical record.
    pub orphans: Vec<DocumentKey>,
    /// Per-file row counts from the tabular side.
    pub ingest: Vec<IngestStats>,
}
