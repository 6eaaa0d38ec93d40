use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad year format, conflicting message sources, etc.).
    ConfigValidation(String),
    /// A required column could not be resolved in an input file's header row.
    MissingColumn { file: String, column: String },
    /// An input decoded to nothing usable (no header, no rows).
    EmptyInput(String),
    /// Malformed CSV structure in an input file.
    Csv(String),
    /// No ingested record belongs to the expected division.
    NoDivisionRows { expected: String, seen: Vec<String> },
    /// The document set contains classified pages for other divisions.
    ForeignDocuments { expected: String, seen: Vec<String> },
    /// Per-subject document coverage fell below the threshold in strict mode.
    LowCoverage { subject: String, ratio: f64, threshold: f64 },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { file, column } => {
                write!(f, "file '{file}': cannot resolve column '{column}' from headers")
            }
            Self::EmptyInput(file) => write!(f, "file '{file}': no usable rows"),
            Self::Csv(msg) => write!(f, "csv error: {msg}"),
            Self::NoDivisionRows { expected, seen } => {
                if seen.is_empty() {
                    write!(f, "no record matches division '{expected}' (no division values detected at all)")
                } else {
                    write!(
                        f,
                        "no record matches division '{expected}' (divisions present: {})",
                        seen.join(", ")
                    )
                }
            }
            Self::ForeignDocuments { expected, seen } => {
                write!(
                    f,
                    "documents from other divisions present (expected '{expected}', also found: {})",
                    seen.join(", ")
                )
            }
            Self::LowCoverage { subject, ratio, threshold } => {
                write!(
                    f,
                    "{subject} coverage {:.0}% below threshold {:.0}%",
                    ratio * 100.0,
                    threshold * 100.0
                )
            }
        }
    }
}

impl std::error::Error for EngineError {}
