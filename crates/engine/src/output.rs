//! Mail-merge row construction: one row per joined record, in the
//! column contract the downstream mail client consumes.

use crate::config::RunConfig;
use crate::model::{JoinedRecord, MailRow};

/// Subject line shown to guardians, e.g.
/// "Évaluations nationales – DUPONT Léa (4D)".
pub fn subject_line(label: &str, surname: &str, given_name: &str, division: &str) -> String {
    format!("{label} – {} {given_name} ({division})", surname.to_uppercase())
}

/// Build final rows. An explicit per-record body always wins; the
/// uniform `body_text` fills only genuinely empty bodies.
pub fn build_rows(joined: &[JoinedRecord], config: &RunConfig, body_text: Option<&str>) -> Vec<MailRow> {
    let division = config.canon_division();
    joined
        .iter()
        .map(|j| {
            let record = &j.record;
            let attachments: Vec<&str> = [j.doc_francais.as_deref(), j.doc_maths.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            let body = match record.body.as_deref() {
                Some(b) if !b.trim().is_empty() => b.to_string(),
                _ => body_text.unwrap_or_default().to_string(),
            };
            MailRow {
                division: division.clone(),
                surname: record.surname.to_uppercase(),
                given_name: record.given_name.clone(),
                emails: record.emails.join("; "),
                doc_francais: j.doc_francais.clone().unwrap_or_default(),
                doc_maths: j.doc_maths.clone().unwrap_or_default(),
                attachments: attachments.join("; "),
                year: config.year.clone(),
                subject_line: subject_line(
                    &config.label,
                    &record.surname,
                    &record.given_name,
                    &division,
                ),
                body,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StudentRecord;

    fn config() -> RunConfig {
        RunConfig::from_toml(
            r#"
division = "4D"
year = "2025-2026"

[inputs]
parents = ["p.csv"]
docs_dir = "docs"
"#,
        )
        .unwrap()
    }

    fn joined(body: Option<&str>) -> JoinedRecord {
        JoinedRecord {
            record: StudentRecord {
                division: "4D".to_string(),
                surname: "Dupont".to_string(),
                given_name: "Léa".to_string(),
                emails: vec!["a@x.com".to_string(), "b@y.com".to_string()],
                body: body.map(str::to_string),
            },
            doc_francais: Some("4D_DUPONT_Lea_Francais_2025-2026.pdf".to_string()),
            doc_maths: None,
        }
    }

    #[test]
    fn subject_line_uppercases_surname() {
        assert_eq!(
            subject_line("Évaluations nationales", "Dupont", "Léa", "4D"),
            "Évaluations nationales – DUPONT Léa (4D)"
        );
    }

    #[test]
    fn row_surname_is_uppercased() {
        let rows = build_rows(&[joined(None)], &config(), None);
        assert_eq!(rows[0].surname, "DUPONT");
        assert_eq!(rows[0].given_name, "Léa");
    }

    #[test]
    fn row_carries_contact_and_attachment_columns() {
        let rows = build_rows(&[joined(None)], &config(), None);
        assert_eq!(rows[0].emails, "a@x.com; b@y.com");
        assert_eq!(rows[0].attachments, "4D_DUPONT_Lea_Francais_2025-2026.pdf");
        assert_eq!(rows[0].doc_maths, "");
        assert_eq!(rows[0].year, "2025-2026");
    }

    #[test]
    fn uniform_body_fills_only_empty_bodies() {
        let rows = build_rows(
            &[joined(None), joined(Some("  ")), joined(Some("déjà écrit"))],
            &config(),
            Some("Bonjour,\nveuillez trouver..."),
        );
        assert_eq!(rows[0].body, "Bonjour,\nveuillez trouver...");
        assert_eq!(rows[1].body, "Bonjour,\nveuillez trouver...");
        assert_eq!(rows[2].body, "déjà écrit");
    }

    #[test]
    fn no_uniform_body_leaves_empty_string() {
        let rows = build_rows(&[joined(None)], &config(), None);
        assert_eq!(rows[0].body, "");
    }
}
