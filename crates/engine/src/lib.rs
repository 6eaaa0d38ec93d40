//! `publipost-engine` — Entity resolution and document classification
//! for per-student report mailings.
//!
//! Pure engine crate: receives pre-loaded spreadsheet contents,
//! extracted page text, and a classified document catalog; returns
//! joined mail-merge rows plus diagnostics. No CLI or IO dependencies.

pub mod classify;
pub mod config;
pub mod error;
pub mod ingest;
pub mod join;
pub mod model;
pub mod normalize;
pub mod output;
pub mod report;

pub use config::RunConfig;
pub use error::EngineError;
pub use model::{
    ClassifiedPage, DocumentKey, DocumentSet, IdentityKey, JoinedRecord, MailRow, PageText,
    RunResult, StudentRecord, Subject,
};

use normalize::canon_division;

/// Execute one full run over pre-loaded inputs.
///
/// `parent_files` are `(name, decoded content)` pairs in argument
/// order. `documents` is the catalog of already-classified artifacts;
/// classified pages contribute additional document keys, with the
/// catalog winning on conflict since it reflects what is on disk.
/// Rows from other divisions are ignored; a run where either side
/// belongs to a different division fails before producing output.
pub fn run(
    config: &RunConfig,
    parent_files: &[(String, String)],
    pages: &[PageText],
    documents: &DocumentSet,
    body_text: Option<&str>,
) -> Result<RunResult, EngineError> {
    let (records, stats) = ingest::ingest_files(parent_files)?;
    let records = join::dedupe_records(records);

    let classified = classify::classify_pages(pages, config);
    let mut docs = documents.clone();
    for assignment in &classified.assignments {
        docs.entry(assignment.key.clone())
            .or_insert_with(|| assignment.file_name.clone());
    }

    join::guard_division(&records, &docs, &config.division)?;

    let expected = config.canon_division();
    let records: Vec<StudentRecord> = records
        .into_iter()
        .filter(|r| canon_division(&r.division) == expected)
        .collect();

    let joined = join::join(&records, &docs, config);
    let rows = output::build_rows(&joined.joined, config, body_text);

    let rows_dropped = stats.iter().map(|s| s.rows_dropped).sum();
    let summary = report::compute_summary(
        &joined.joined,
        rows_dropped,
        &classified.unresolved,
        &joined.orphans,
        config,
    );
    report::check_coverage(&summary, config)?;

    Ok(RunResult {
        meta: report::run_meta(config),
        summary,
        rows,
        missing: joined.missing,
        unresolved: classified.unresolved,
        orphans: joined.orphans,
        ingest: stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
division = "4D"
year = "2025-2026"

[inputs]
parents = ["parents.csv"]
docs_dir = "docs"
"#;

    const PARENTS: &str = "\
Division;Nom de famille;Prénom 1;Courriel repr. légal\n\
4D;DUPONT;Léa;a@x.com\n\
4D;Dupont;Léa;b@y.com\n\
4D;MARTIN;Hugo;c@z.com\n";

    fn docs() -> DocumentSet {
        let mut docs = DocumentSet::new();
        for (surname, given, subject) in [
            ("DUPONT", "Léa", Subject::Francais),
            ("DUPONT", "Léa", Subject::Mathematiques),
            ("MARTIN", "Hugo", Subject::Francais),
        ] {
            docs.insert(
                DocumentKey::new("4D", surname, given, subject, "2025-2026"),
                format!("{surname}_{}.pdf", subject.slug()),
            );
        }
        docs
    }

    #[test]
    fn end_to_end_dedup_join_and_missing_report() {
        let config = RunConfig::from_toml(CONFIG).unwrap();
        let files = vec![("parents.csv".to_string(), PARENTS.to_string())];
        let result = run(&config, &files, &[], &docs(), Some("Bonjour")).unwrap();

        assert_eq!(result.summary.students, 2);
        assert_eq!(result.summary.complete, 1);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].emails, "a@x.com; b@y.com");
        assert_eq!(result.rows[0].body, "Bonjour");
        assert_eq!(result.missing.len(), 1);
        assert_eq!(result.missing[0].surname, "MARTIN");
        assert_eq!(result.missing[0].missing, vec![Subject::Mathematiques]);
        assert!(result.orphans.is_empty());
    }

    #[test]
    fn foreign_division_rows_are_filtered_out() {
        let config = RunConfig::from_toml(CONFIG).unwrap();
        let content = format!("{PARENTS}5C;PETIT;Zoé;d@w.com\n");
        let files = vec![("parents.csv".to_string(), content)];
        let result = run(&config, &files, &[], &docs(), None).unwrap();
        assert_eq!(result.summary.students, 2);
        assert!(result.rows.iter().all(|r| r.division == "4D"));
    }

    #[test]
    fn division_mismatch_fails_before_output() {
        let mut config = RunConfig::from_toml(CONFIG).unwrap();
        config.division = "6A".to_string();
        let files = vec![("parents.csv".to_string(), PARENTS.to_string())];
        let err = run(&config, &files, &[], &DocumentSet::new(), None).unwrap_err();
        assert!(matches!(err, EngineError::NoDivisionRows { .. }));
    }

    #[test]
    fn classified_pages_feed_the_document_side() {
        let config = RunConfig::from_toml(CONFIG).unwrap();
        let fr = "Année scolaire 2025-2026\nLéa DUPONT\nFrançais lecture compréhension orthographe";
        let ma = "Année scolaire 2025-2026\nLéa DUPONT\nMathématiques nombres calcul géométrie";
        let pages = vec![
            PageText { index: 1, text: fr.to_string() },
            PageText { index: 2, text: ma.to_string() },
        ];
        let content = "Division;Nom;Prénom 1;Courriel repr. légal\n4D;DUPONT;Léa;a@x.com\n";
        let files = vec![("parents.csv".to_string(), content.to_string())];
        let result = run(&config, &files, &pages, &DocumentSet::new(), None).unwrap();
        assert_eq!(result.summary.complete, 1);
        assert_eq!(result.rows[0].doc_francais, "4D_DUPONT_Lea_Francais_2025-2026.pdf");
    }
}
