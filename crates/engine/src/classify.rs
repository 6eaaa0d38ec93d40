//! Page classification: keyword scoring per subject, student-name
//! extraction, grouping by student, and per-group subject resolution.
//!
//! Works on extracted page text only; page adjacency is never assumed.
//! Unresolved pages are always reported, never dropped, and never
//! block output generation.

use std::collections::BTreeMap;

use regex::Regex;

use crate::config::{RunConfig, ScoreThresholds};
use crate::model::{
    ClassifiedPage, DocumentKey, PageText, StudentPageGroup, Subject, UnresolvedPage,
};
use crate::normalize::{fold, safe_file_stem};

const FR_KEYWORDS: &[&str] = &[
    "francais",
    "langue francaise",
    "lecture",
    "comprehension",
    "orthographe",
    "dictee",
    "vocabulaire",
    "grammaire",
    "conjugaison",
    "maitrise de la langue",
];

const MA_KEYWORDS: &[&str] = &[
    "mathematiques",
    "maths",
    "nombres",
    "numeration",
    "calcul",
    "geometrie",
    "mesure",
    "grandeurs",
    "fractions",
    "proportionnalite",
    "equation",
    "probleme",
    "statistiques",
    "probabilites",
];

const ARITHMETIC_SYMBOLS: &str = "+-×x*/÷=<>≤≥";

/// Marker line preceding the student-name block in the report layout.
const YEAR_MARKER: &str = "annee scolaire";

// ---------------------------------------------------------------------------
// Per-page scoring
// ---------------------------------------------------------------------------

/// Keyword counts per subject, plus a small Math bonus for digit and
/// arithmetic-symbol density (numeric content is a weak independent
/// signal for math pages).
pub fn score_page(text: &str, thresholds: &ScoreThresholds) -> (u32, u32) {
    let folded = fold(text);

    let fr: u32 = FR_KEYWORDS.iter().map(|k| folded.matches(k).count() as u32).sum();
    let mut ma: u32 = MA_KEYWORDS.iter().map(|k| folded.matches(k).count() as u32).sum();

    let digits = folded.chars().filter(|c| c.is_ascii_digit()).count() as u32;
    let symbols = folded.chars().filter(|c| ARITHMETIC_SYMBOLS.contains(*c)).count() as u32;
    ma += digits / thresholds.digit_divisor + symbols / thresholds.symbol_divisor;

    (fr, ma)
}

/// Provisional per-page subject. Only decided when one score clearly
/// dominates; everything else is settled at group level.
pub fn provisional_subject(fr: u32, ma: u32, t: &ScoreThresholds) -> Option<Subject> {
    if fr == 0 && ma == 0 {
        return None;
    }
    if fr >= ma + t.margin || (fr >= t.absolute && ma == 0) {
        return Some(Subject::Francais);
    }
    if ma >= fr + t.margin || (ma >= t.absolute && fr == 0) {
        return Some(Subject::Mathematiques);
    }
    None
}

// ---------------------------------------------------------------------------
// Name extraction
// ---------------------------------------------------------------------------

/// A line whose last whitespace token is entirely uppercase letters —
/// the "GivenName SURNAME" shape of the report layout.
fn name_shape(line: &str) -> bool {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 2 {
        return false;
    }
    let last = parts[parts.len() - 1];
    Regex::new(r"^[A-ZÉÈÊËÀÂÄÔÖÛÜÇ\-]{2,}$").unwrap().is_match(last)
}

/// Find the student's full name on a page: first name-shaped line in
/// the ~7 lines after the school-year marker, falling back to the
/// first such line anywhere on the page.
pub fn extract_name(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().map(|l| l.trim()).collect();

    let marker_idx = lines.iter().position(|l| fold(l).contains(YEAR_MARKER));

    let candidate = marker_idx
        .and_then(|idx| {
            lines
                .iter()
                .skip(idx + 1)
                .take(7)
                .find(|l| name_shape(l))
                .copied()
        })
        .or_else(|| lines.iter().find(|l| name_shape(l)).copied())?;

    // OCR sometimes doubles spaces inside the line.
    let collapsed = Regex::new(r"\s{2,}")
        .unwrap()
        .replace_all(candidate, " ")
        .trim()
        .to_string();
    Some(collapsed)
}

// ---------------------------------------------------------------------------
// Grouping + subject resolution
// ---------------------------------------------------------------------------

/// One resolved page: a (student, subject) pair plus the artifact file
/// name the page should be published under.
#[derive(Debug, Clone)]
pub struct PageAssignment {
    pub index: usize,
    pub name: String,
    pub subject: Subject,
    pub key: DocumentKey,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct ClassifyOutput {
    pub pages: Vec<ClassifiedPage>,
    pub groups: Vec<StudentPageGroup>,
    pub assignments: Vec<PageAssignment>,
    pub unresolved: Vec<UnresolvedPage>,
}

/// Expected artifact filename for a (division, surname, given, subject,
/// year) tuple. Shared with the missing-document report so both sides
/// agree on what a match would have looked like.
pub fn document_file_name(
    division: &str,
    surname: &str,
    given: &str,
    subject: Subject,
    year: &str,
) -> String {
    let stem = format!(
        "{}_{}_{}_{}_{}",
        division,
        surname.to_uppercase(),
        given,
        subject.label(),
        year
    );
    format!("{}.pdf", safe_file_stem(&stem))
}

/// Split an extracted "GivenName SURNAME" line: last token is the
/// surname, everything before it the given name.
fn split_extracted_name(name: &str) -> (String, String) {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let surname = parts.last().copied().unwrap_or("").to_string();
    let given = parts[..parts.len().saturating_sub(1)].join(" ");
    (given, surname)
}

/// Classify every page, group by extracted student name, and resolve
/// one subject per page within each group.
pub fn classify_pages(pages: &[PageText], config: &RunConfig) -> ClassifyOutput {
    let t = &config.thresholds;
    let division = config.canon_division();

    let mut classified: Vec<ClassifiedPage> = pages
        .iter()
        .map(|p| {
            let (fr, ma) = score_page(&p.text, t);
            ClassifiedPage {
                index: p.index,
                fr_score: fr,
                ma_score: ma,
                subject: provisional_subject(fr, ma, t),
                name: extract_name(&p.text),
            }
        })
        .collect();

    // Group positions by extracted name. BTreeMap keeps group order
    // deterministic; within a group, insertion follows page order.
    let mut by_student: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (pos, page) in classified.iter().enumerate() {
        if let Some(ref name) = page.name {
            by_student.entry(name.clone()).or_default().push(pos);
        }
    }

    for positions in by_student.values() {
        resolve_group(&mut classified, positions, t);
    }

    let mut assignments = Vec::new();
    let mut unresolved = Vec::new();
    for (pos, page) in classified.iter().enumerate() {
        match (&page.name, page.subject) {
            (Some(name), Some(subject)) => {
                let (given, surname) = split_extracted_name(name);
                assignments.push(PageAssignment {
                    index: page.index,
                    name: name.clone(),
                    subject,
                    key: DocumentKey::new(&division, &surname, &given, subject, &config.year),
                    file_name: document_file_name(
                        &division,
                        &surname,
                        &given,
                        subject,
                        &config.year,
                    ),
                });
            }
            _ => {
                let sample: String = pages[pos].text.chars().take(400).collect();
                unresolved.push(UnresolvedPage {
                    index: page.index,
                    fr_score: page.fr_score,
                    ma_score: page.ma_score,
                    name: page.name.clone(),
                    sample: sample.replace(['\n', '\r'], " "),
                });
            }
        }
    }

    let groups = by_student
        .into_iter()
        .map(|(name, positions)| StudentPageGroup {
            name,
            pages: positions.iter().map(|&p| classified[p].clone()).collect(),
        })
        .collect();

    ClassifyOutput {
        pages: classified,
        groups,
        assignments,
        unresolved,
    }
}

/// Assign subjects within one student's pages.
///
/// ≥2 pages: best French score takes "Français", best Math score takes
/// "Mathématiques" (ties to the lowest page index); if the same page
/// wins both, it keeps its stronger dimension and the next page takes
/// the other subject; leftovers default to their locally higher score.
/// 1 page: keep a subject only if its score is at least
/// `single_page_min` and strictly greater than the other.
fn resolve_group(classified: &mut [ClassifiedPage], positions: &[usize], t: &ScoreThresholds) {
    if positions.len() >= 2 {
        let best_by = |score: fn(&ClassifiedPage) -> u32| -> usize {
            let mut best = positions[0];
            for &pos in &positions[1..] {
                if score(&classified[pos]) > score(&classified[best]) {
                    best = pos;
                }
            }
            best
        };
        let best_fr = best_by(|p| p.fr_score);
        let best_ma = best_by(|p| p.ma_score);

        if best_fr == best_ma {
            let alt = positions.iter().copied().find(|&p| p != best_fr);
            let winner = &classified[best_fr];
            if winner.fr_score >= winner.ma_score {
                classified[best_fr].subject = Some(Subject::Francais);
                if let Some(alt) = alt {
                    classified[alt].subject = Some(Subject::Mathematiques);
                }
            } else {
                classified[best_ma].subject = Some(Subject::Mathematiques);
                if let Some(alt) = alt {
                    classified[alt].subject = Some(Subject::Francais);
                }
            }
        } else {
            classified[best_fr].subject = Some(Subject::Francais);
            classified[best_ma].subject = Some(Subject::Mathematiques);
        }

        for &pos in positions {
            if classified[pos].subject.is_none() {
                let (fr, ma) = (classified[pos].fr_score, classified[pos].ma_score);
                classified[pos].subject = Some(if fr >= ma {
                    Subject::Francais
                } else {
                    Subject::Mathematiques
                });
            }
        }
    } else if let [only] = positions {
        let (fr, ma) = (classified[*only].fr_score, classified[*only].ma_score);
        classified[*only].subject = if fr > ma && fr >= t.single_page_min {
            Some(Subject::Francais)
        } else if ma > fr && ma >= t.single_page_min {
            Some(Subject::Mathematiques)
        } else {
            None
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;

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

    fn page(index: usize, text: &str) -> PageText {
        PageText { index, text: text.to_string() }
    }

    const FR_PAGE: &str = "Année scolaire 2025-2026\n\nLéa DUPONT\n\nFrançais\nlecture compréhension orthographe grammaire";
    const MA_PAGE: &str = "Année scolaire 2025-2026\n\nLéa DUPONT\n\nMathématiques\nnombres calcul géométrie fractions";

    #[test]
    fn scoring_counts_keywords_accent_folded() {
        let t = ScoreThresholds::default();
        let (fr, ma) = score_page("Lecture et compréhension, orthographe.", &t);
        assert!(fr >= 3);
        assert_eq!(ma, 0);
    }

    #[test]
    fn digit_density_feeds_math_score() {
        let t = ScoreThresholds::default();
        let digits = "1234567890".repeat(5);
        let (fr, ma) = score_page(&digits, &t);
        assert_eq!(fr, 0);
        assert_eq!(ma, 2); // 50 digits / 25
    }

    #[test]
    fn provisional_requires_clear_margin() {
        let t = ScoreThresholds::default();
        assert_eq!(provisional_subject(5, 0, &t), Some(Subject::Francais));
        assert_eq!(provisional_subject(0, 4, &t), Some(Subject::Mathematiques));
        assert_eq!(provisional_subject(3, 0, &t), Some(Subject::Francais));
        assert_eq!(provisional_subject(2, 1, &t), None);
        assert_eq!(provisional_subject(0, 0, &t), None);
    }

    #[test]
    fn name_found_after_year_marker() {
        let text = "Évaluations\nAnnée scolaire 2025-2026\nCollège X\nLéa DUPONT\nFrançais";
        assert_eq!(extract_name(text).as_deref(), Some("Léa DUPONT"));
    }

    #[test]
    fn name_fallback_scans_whole_page() {
        let text = "page sans marqueur\nHugo MARTIN\nsuite";
        assert_eq!(extract_name(text).as_deref(), Some("Hugo MARTIN"));
    }

    #[test]
    fn name_requires_uppercase_last_token() {
        assert_eq!(extract_name("juste du texte en minuscules\nrien ici"), None);
    }

    #[test]
    fn doubled_spaces_collapsed_in_name() {
        let text = "Année scolaire 2025-2026\nLéa  DUPONT";
        assert_eq!(extract_name(text).as_deref(), Some("Léa DUPONT"));
    }

    #[test]
    fn two_page_group_assigns_both_subjects_regardless_of_order() {
        // Math page first, French page second
        let out = classify_pages(&[page(1, MA_PAGE), page(2, FR_PAGE)], &config());
        assert_eq!(out.unresolved.len(), 0);
        assert_eq!(out.assignments.len(), 2);
        let p1 = out.pages.iter().find(|p| p.index == 1).unwrap();
        let p2 = out.pages.iter().find(|p| p.index == 2).unwrap();
        assert_eq!(p1.subject, Some(Subject::Mathematiques));
        assert_eq!(p2.subject, Some(Subject::Francais));
    }

    #[test]
    fn same_page_winning_both_demotes_weaker_dimension() {
        let page = |index, fr_score, ma_score| ClassifiedPage {
            index,
            fr_score,
            ma_score,
            subject: None,
            name: Some("Léa DUPONT".to_string()),
        };
        let mut pages = vec![page(1, 5, 3), page(2, 4, 2)];
        resolve_group(&mut pages, &[0, 1], &ScoreThresholds::default());
        assert_eq!(pages[0].subject, Some(Subject::Francais));
        assert_eq!(pages[1].subject, Some(Subject::Mathematiques));
    }

    #[test]
    fn grouping_never_merges_distinct_names() {
        let other = MA_PAGE.replace("Léa DUPONT", "Hugo MARTIN");
        let out = classify_pages(&[page(1, FR_PAGE), page(2, &other)], &config());
        assert_eq!(out.groups.len(), 2);
    }

    #[test]
    fn single_page_below_threshold_stays_unresolved() {
        let text = "Année scolaire 2025-2026\nZoé BERNARD\nlecture";
        let out = classify_pages(&[page(1, text)], &config());
        assert_eq!(out.assignments.len(), 0);
        assert_eq!(out.unresolved.len(), 1);
        assert_eq!(out.unresolved[0].fr_score, 1);
    }

    #[test]
    fn single_clear_page_keeps_provisional() {
        let out = classify_pages(&[page(1, FR_PAGE)], &config());
        assert_eq!(out.assignments.len(), 1);
        assert_eq!(out.assignments[0].subject, Subject::Francais);
    }

    #[test]
    fn page_without_name_reported_with_sample() {
        let out = classify_pages(&[page(3, "texte anonyme\nsans nom propre")], &config());
        assert_eq!(out.unresolved.len(), 1);
        assert_eq!(out.unresolved[0].index, 3);
        assert!(out.unresolved[0].sample.contains("texte anonyme"));
        assert!(!out.unresolved[0].sample.contains('\n'));
    }

    #[test]
    fn artifact_names_are_filesystem_safe() {
        let out = classify_pages(&[page(1, FR_PAGE), page(2, MA_PAGE)], &config());
        let fr = out
            .assignments
            .iter()
            .find(|a| a.subject == Subject::Francais)
            .unwrap();
        assert_eq!(fr.file_name, "4D_DUPONT_Lea_Francais_2025-2026.pdf");
        assert_eq!(fr.key.surname, "dupont");
        assert_eq!(fr.key.given, "lea");
    }
}
