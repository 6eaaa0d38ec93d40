// Classified-document catalog: scan a directory of per-student PDFs
// and parse their stems back into document keys.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use publipost_engine::model::{DocumentKey, DocumentSet, Subject};
use publipost_engine::normalize::squash_key;

/// Result of one directory scan. Unparseable stems are kept for
/// diagnostics; they are never silently ignored.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub documents: DocumentSet,
    /// PDF files whose stem does not follow the expected shape.
    pub skipped: Vec<String>,
    /// Example file names per canonical division, for mismatch hints.
    pub divisions: BTreeMap<String, Vec<String>>,
}

/// Map a stem's subject token, tolerating the accent-stripped variants
/// that file-name sanitizing produces.
fn parse_subject(token: &str) -> Option<Subject> {
    match squash_key(token).as_str() {
        "francais" | "franais" => Some(Subject::Francais),
        "mathematiques" | "mathmatiques" | "maths" => Some(Subject::Mathematiques),
        _ => None,
    }
}

fn is_school_year(token: &str) -> bool {
    let b = token.as_bytes();
    b.len() == 9
        && b[4] == b'-'
        && b.iter().enumerate().all(|(i, c)| i == 4 || c.is_ascii_digit())
}

/// Parse a file stem of the shape `Division_SURNAME_Given_Subject_Year`
/// (the given name may span several `_`-separated tokens).
pub fn parse_stem(stem: &str) -> Option<DocumentKey> {
    let tokens: Vec<&str> = stem.split('_').collect();
    if tokens.len() < 5 {
        return None;
    }
    let year = tokens[tokens.len() - 1];
    if !is_school_year(year) {
        return None;
    }
    let subject = parse_subject(tokens[tokens.len() - 2])?;
    let given = tokens[2..tokens.len() - 2].join(" ");
    Some(DocumentKey::new(tokens[0], tokens[1], &given, subject, year))
}

fn collect_pdfs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), String> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| format!("{}: {e}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_pdfs(&path, out)?;
        } else if path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Recursively scan `dir` for classified PDFs. Deterministic order;
/// on stem collision the first file wins.
pub fn scan_documents(dir: &Path) -> Result<Catalog, String> {
    let mut paths = Vec::new();
    collect_pdfs(dir, &mut paths)?;

    let mut catalog = Catalog::default();
    for path in paths {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        let stem = name.trim_end_matches(".pdf").trim_end_matches(".PDF");
        match parse_stem(stem) {
            Some(key) => {
                let examples = catalog.divisions.entry(key.division.clone()).or_default();
                if examples.len() < 3 {
                    examples.push(name.clone());
                }
                catalog.documents.entry(key).or_insert(name);
            }
            None => catalog.skipped.push(name),
        }
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_parses_into_key() {
        let key = parse_stem("4D_DUPONT_Lea_Francais_2025-2026").unwrap();
        assert_eq!(key.division, "4D");
        assert_eq!(key.surname, "dupont");
        assert_eq!(key.given, "lea");
        assert_eq!(key.subject, Subject::Francais);
        assert_eq!(key.year, "2025-2026");
    }

    #[test]
    fn accent_stripped_subject_variants_accepted() {
        assert_eq!(
            parse_stem("4D_DUPONT_Lea_Franais_2025-2026").unwrap().subject,
            Subject::Francais
        );
        for variant in ["Mathematiques", "Mathmatiques", "Maths"] {
            let stem = format!("4D_DUPONT_Lea_{variant}_2025-2026");
            assert_eq!(parse_stem(&stem).unwrap().subject, Subject::Mathematiques);
        }
    }

    #[test]
    fn multi_token_given_name_joined() {
        let key = parse_stem("4D_PETIT_Jean_Paul_Maths_2025-2026").unwrap();
        assert_eq!(key.surname, "petit");
        assert_eq!(key.given, "jeanpaul");
    }

    #[test]
    fn malformed_stems_rejected() {
        assert!(parse_stem("rapport_complet").is_none());
        assert!(parse_stem("4D_DUPONT_Lea_Histoire_2025-2026").is_none());
        assert!(parse_stem("4D_DUPONT_Lea_Francais_hier").is_none());
    }

    #[test]
    fn scan_collects_pdfs_recursively_and_reports_skips() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("francais");
        std::fs::create_dir(&sub).unwrap();
        for (d, name) in [
            (dir.path(), "4D_DUPONT_Lea_Mathematiques_2025-2026.pdf"),
            (sub.as_path(), "4D_DUPONT_Lea_Francais_2025-2026.pdf"),
            (dir.path(), "scan_brut.pdf"),
            (dir.path(), "notes.txt"),
        ] {
            std::fs::write(d.join(name), b"%PDF").unwrap();
        }
        let catalog = scan_documents(dir.path()).unwrap();
        assert_eq!(catalog.documents.len(), 2);
        assert_eq!(catalog.skipped, vec!["scan_brut.pdf"]);
        assert_eq!(catalog.divisions["4D"].len(), 2);
    }
}
