//! Run summary: totals, per-subject coverage ratios, and the strict
//! coverage escalation used as a send preflight.

use crate::config::RunConfig;
use crate::error::EngineError;
use crate::model::{DocumentKey, JoinedRecord, RunMeta, RunSummary, Subject, UnresolvedPage};

pub fn run_meta(config: &RunConfig) -> RunMeta {
    RunMeta {
        division: config.canon_division(),
        year: config.year.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Aggregate counts over a finished join. Coverage below the
/// configured threshold becomes a warning here; `check_coverage`
/// escalates it when the run is strict.
pub fn compute_summary(
    joined: &[JoinedRecord],
    rows_dropped: usize,
    unresolved: &[UnresolvedPage],
    orphans: &[DocumentKey],
    config: &RunConfig,
) -> RunSummary {
    let students = joined.len();
    let complete = joined.iter().filter(|j| j.is_complete()).count();
    let matched = |subject: Subject| joined.iter().filter(|j| j.doc(subject).is_some()).count();
    let matched_francais = matched(Subject::Francais);
    let matched_maths = matched(Subject::Mathematiques);
    let coverage = |matched: usize| {
        if students == 0 {
            1.0
        } else {
            matched as f64 / students as f64
        }
    };
    let coverage_francais = coverage(matched_francais);
    let coverage_maths = coverage(matched_maths);

    let mut warnings = Vec::new();
    for (subject, ratio) in [
        (Subject::Francais, coverage_francais),
        (Subject::Mathematiques, coverage_maths),
    ] {
        if ratio < config.coverage_threshold {
            warnings.push(format!(
                "{subject} coverage {:.0}% below threshold {:.0}%",
                ratio * 100.0,
                config.coverage_threshold * 100.0
            ));
        }
    }
    if !unresolved.is_empty() {
        warnings.push(format!("{} page(s) unresolved", unresolved.len()));
    }
    if !orphans.is_empty() {
        warnings.push(format!("{} document(s) matched no student", orphans.len()));
    }

    RunSummary {
        students,
        complete,
        matched_francais,
        matched_maths,
        coverage_francais,
        coverage_maths,
        rows_dropped,
        unresolved_pages: unresolved.len(),
        orphan_documents: orphans.len(),
        warnings,
    }
}

/// Strict-mode preflight: refuse to proceed when either subject's
/// coverage is below the threshold. Non-strict runs keep the warning.
pub fn check_coverage(summary: &RunSummary, config: &RunConfig) -> Result<(), EngineError> {
    if !config.strict {
        return Ok(());
    }
    for (subject, ratio) in [
        (Subject::Francais, summary.coverage_francais),
        (Subject::Mathematiques, summary.coverage_maths),
    ] {
        if ratio < config.coverage_threshold {
            return Err(EngineError::LowCoverage {
                subject: subject.label().to_string(),
                ratio,
                threshold: config.coverage_threshold,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StudentRecord;

    fn config(strict: bool) -> RunConfig {
        let toml = format!(
            r#"
division = "4D"
year = "2025-2026"
strict = {strict}

[inputs]
parents = ["p.csv"]
docs_dir = "docs"
"#
        );
        RunConfig::from_toml(&toml).unwrap()
    }

    fn joined(fr: bool, ma: bool) -> JoinedRecord {
        JoinedRecord {
            record: StudentRecord {
                division: "4D".to_string(),
                surname: "DUPONT".to_string(),
                given_name: "Léa".to_string(),
                emails: vec![],
                body: None,
            },
            doc_francais: fr.then(|| "fr.pdf".to_string()),
            doc_maths: ma.then(|| "ma.pdf".to_string()),
        }
    }

    #[test]
    fn summary_counts_and_ratios() {
        let joined = vec![joined(true, true), joined(true, false), joined(false, false)];
        let s = compute_summary(&joined, 2, &[], &[], &config(false));
        assert_eq!(s.students, 3);
        assert_eq!(s.complete, 1);
        assert_eq!(s.matched_francais, 2);
        assert_eq!(s.matched_maths, 1);
        assert!((s.coverage_maths - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.rows_dropped, 2);
    }

    #[test]
    fn low_coverage_becomes_warning_when_not_strict() {
        let joined = vec![joined(true, false), joined(true, false)];
        let s = compute_summary(&joined, 0, &[], &[], &config(false));
        assert!(s.warnings.iter().any(|w| w.contains("Mathématiques")));
        assert!(check_coverage(&s, &config(false)).is_ok());
    }

    #[test]
    fn strict_escalates_low_coverage() {
        let joined = vec![joined(true, false), joined(true, false)];
        let s = compute_summary(&joined, 0, &[], &[], &config(true));
        match check_coverage(&s, &config(true)) {
            Err(EngineError::LowCoverage { subject, ratio, threshold }) => {
                assert_eq!(subject, "Mathématiques");
                assert!(ratio < threshold);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn full_coverage_passes_strict() {
        let joined = vec![joined(true, true)];
        let s = compute_summary(&joined, 0, &[], &[], &config(true));
        assert!(s.warnings.is_empty());
        assert!(check_coverage(&s, &config(true)).is_ok());
    }
}
