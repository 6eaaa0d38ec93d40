use serde::Deserialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Top-level run config
// ---------------------------------------------------------------------------

/// One pipeline invocation's parameters. The classification and join
/// stages take this value explicitly; nothing is parametrized through
/// ambient state.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Expected division for this run, e.g. "4D". Anything else in the
    /// inputs trips the anti-mismatch guard.
    pub division: String,
    /// School year, "YYYY-YYYY".
    pub year: String,
    /// Subject-line label.
    #[serde(default = "default_label")]
    pub label: String,
    pub inputs: InputsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub message: Option<MessageConfig>,
    #[serde(default)]
    pub thresholds: ScoreThresholds,
    /// Minimum per-subject (documents found / students) ratio before a
    /// data-quality warning is raised.
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,
    /// Escalate coverage warnings to fatal errors.
    #[serde(default)]
    pub strict: bool,
}

fn default_label() -> String {
    "Évaluations nationales".to_string()
}

fn default_coverage_threshold() -> f64 {
    0.8
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputsConfig {
    /// Guardian spreadsheet exports, in precedence order for the
    /// first-non-empty-wins merge.
    pub parents: Vec<String>,
    /// Extracted page text: a directory of per-page .txt files or a
    /// JSON array file. Optional when docs_dir is already populated.
    #[serde(default)]
    pub pages: Option<String>,
    /// Directory holding (or receiving) classified document artifacts.
    pub docs_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_mailmerge_out")]
    pub mailmerge: String,
    #[serde(default = "default_missing_out")]
    pub missing: String,
    #[serde(default = "default_unresolved_out")]
    pub unresolved: String,
    #[serde(default)]
    pub json: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mailmerge: default_mailmerge_out(),
            missing: default_missing_out(),
            unresolved: default_unresolved_out(),
            json: None,
        }
    }
}

fn default_mailmerge_out() -> String {
    "mailmerge.csv".to_string()
}

fn default_missing_out() -> String {
    "missing.csv".to_string()
}

fn default_unresolved_out() -> String {
    "unresolved_pages.csv".to_string()
}

/// Uniform message body for all output rows: inline text or a UTF-8
/// file. Exactly one of the two.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

// ---------------------------------------------------------------------------
// Scoring thresholds
// ---------------------------------------------------------------------------

/// Subject-assignment scoring constants. Empirically tuned to observed
/// OCR output; configurable rather than structural.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoreThresholds {
    /// A score must exceed the other by this much for a provisional
    /// assignment.
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Alternatively, a score at least this high while the other is 0.
    #[serde(default = "default_absolute")]
    pub absolute: u32,
    /// Minimum winning score for a single-page group to keep its
    /// provisional subject.
    #[serde(default = "default_single_page_min")]
    pub single_page_min: u32,
    /// One Math point per this many digits in the page text.
    #[serde(default = "default_digit_divisor")]
    pub digit_divisor: u32,
    /// One Math point per this many arithmetic symbols.
    #[serde(default = "default_symbol_divisor")]
    pub symbol_divisor: u32,
}

fn default_margin() -> u32 {
    2
}

fn default_absolute() -> u32 {
    3
}

fn default_single_page_min() -> u32 {
    2
}

fn default_digit_divisor() -> u32 {
    25
}

fn default_symbol_divisor() -> u32 {
    5
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            absolute: default_absolute(),
            single_page_min: default_single_page_min(),
            digit_divisor: default_digit_divisor(),
            symbol_divisor: default_symbol_divisor(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.division.trim().is_empty() {
            return Err(EngineError::ConfigValidation("division must not be empty".into()));
        }

        let year_re = regex::Regex::new(r"^\d{4}-\d{4}$").unwrap();
        if !year_re.is_match(&self.year) {
            return Err(EngineError::ConfigValidation(format!(
                "year must look like 2025-2026, got '{}'",
                self.year
            )));
        }

        if self.inputs.parents.is_empty() {
            return Err(EngineError::ConfigValidation(
                "at least one parents export is required".into(),
            ));
        }

        if let Some(ref msg) = self.message {
            match (&msg.text, &msg.file) {
                (Some(_), Some(_)) => {
                    return Err(EngineError::ConfigValidation(
                        "message.text and message.file are mutually exclusive".into(),
                    ))
                }
                (None, None) => {
                    return Err(EngineError::ConfigValidation(
                        "message requires either text or file".into(),
                    ))
                }
                _ => {}
            }
        }

        if self.thresholds.digit_divisor == 0 || self.thresholds.symbol_divisor == 0 {
            return Err(EngineError::ConfigValidation(
                "thresholds.digit_divisor and symbol_divisor must be non-zero".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.coverage_threshold) {
            return Err(EngineError::ConfigValidation(format!(
                "coverage_threshold must be within 0..=1, got {}",
                self.coverage_threshold
            )));
        }

        Ok(())
    }

    /// Division in canonical form, as the guard and keys use it.
    pub fn canon_division(&self) -> String {
        crate::normalize::canon_division(&self.division)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
