// publipost CLI - assemble per-guardian mailings from classified
// report pages and parent spreadsheet exports

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use publipost_engine::{DocumentSet, EngineError, PageText, RunConfig};
use publipost_io::{catalog, export, pages, read};

use exit_codes::{EXIT_COVERAGE, EXIT_ERROR, EXIT_MISMATCH, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "publipost")]
#[command(about = "Mail-merge assembly for per-student evaluation reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full assembly from a TOML config file
    #[command(after_help = "\
Examples:
  publipost run 4d.toml
  publipost run 4d.toml --json
  publipost run 4d.toml --output result.json
  publipost run 4d.toml --strict")]
    Run {
        /// Path to the run config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Fail when document coverage is below the threshold
        #[arg(long)]
        strict: bool,
    },

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  publipost validate 4d.toml")]
    Validate {
        /// Path to the run config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };

    let result = match cli.command {
        Commands::Run { config, json, output, strict } => cmd_run(config, json, output, strict),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Map an engine error to its exit code, with a remediation hint
    /// where one exists.
    pub fn engine(err: EngineError) -> Self {
        let (code, hint) = match &err {
            EngineError::NoDivisionRows { .. } => (
                EXIT_MISMATCH,
                Some("check [division] against the export's Classe column".to_string()),
            ),
            EngineError::ForeignDocuments { .. } => (
                EXIT_MISMATCH,
                Some("is inputs.docs_dir pointing at another division's output?".to_string()),
            ),
            EngineError::LowCoverage { .. } => (
                EXIT_COVERAGE,
                Some("rerun without --strict to inspect the missing-document report".to_string()),
            ),
            EngineError::ConfigParse(_)
            | EngineError::ConfigValidation(_)
            | EngineError::MissingColumn { .. }
            | EngineError::EmptyInput(_)
            | EngineError::Csv(_) => (EXIT_PARSE, None),
        };
        Self { code, message: err.to_string(), hint }
    }
}

fn load_config(config_path: &Path) -> Result<RunConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::io(format!("cannot read config: {e}")))?;
    RunConfig::from_toml(&config_str).map_err(CliError::engine)
}

fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let mut config = load_config(&config_path)?;
    if strict {
        config.strict = true;
    }

    // Input paths are relative to the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let mut parent_files = Vec::with_capacity(config.inputs.parents.len());
    for name in &config.inputs.parents {
        let path = base_dir.join(name);
        let content = read::read_file_as_utf8(&path).map_err(CliError::io)?;
        parent_files.push((name.clone(), content));
    }

    let page_texts: Vec<PageText> = match &config.inputs.pages {
        Some(p) => pages::load_pages(&base_dir.join(p)).map_err(CliError::io)?,
        None => Vec::new(),
    };

    let catalog = catalog::scan_documents(&base_dir.join(&config.inputs.docs_dir))
        .map_err(CliError::io)?;
    for name in &catalog.skipped {
        eprintln!("warning: unparseable document name skipped: {name}");
    }

    let body_text = match &config.message {
        Some(msg) => match (&msg.text, &msg.file) {
            (Some(text), _) => Some(text.clone()),
            (None, Some(file)) => {
                Some(read::read_file_as_utf8(&base_dir.join(file)).map_err(CliError::io)?)
            }
            (None, None) => None,
        },
        None => None,
    };

    let documents: DocumentSet = catalog.documents;
    let result = publipost_engine::run(
        &config,
        &parent_files,
        &page_texts,
        &documents,
        body_text.as_deref(),
    )
    .map_err(|e| {
        if matches!(e, EngineError::ForeignDocuments { .. }) {
            for (division, examples) in &catalog.divisions {
                eprintln!("docs for {division}: e.g. {}", examples.join(", "));
            }
        }
        CliError::engine(e)
    })?;

    for stats in &result.ingest {
        eprintln!(
            "{}: {} rows read, {} kept, {} dropped",
            stats.file, stats.rows_read, stats.rows_kept, stats.rows_dropped
        );
    }

    let mailmerge_path = base_dir.join(&config.output.mailmerge);
    export::write_mailmerge(&mailmerge_path, &result.rows).map_err(CliError::io)?;
    eprintln!("wrote {}", mailmerge_path.display());

    let missing_path = base_dir.join(&config.output.missing);
    export::write_missing(&missing_path, &result.missing).map_err(CliError::io)?;
    eprintln!("wrote {}", missing_path.display());

    if !result.unresolved.is_empty() {
        let unresolved_path = base_dir.join(&config.output.unresolved);
        export::write_unresolved(&unresolved_path, &result.unresolved).map_err(CliError::io)?;
        eprintln!("wrote {}", unresolved_path.display());
    }

    let json_file = output_file.or_else(|| config.output.json.as_ref().map(|j| base_dir.join(j)));
    if let Some(ref path) = json_file {
        export::write_json(path, &result).map_err(CliError::io)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "{} {}: {} students — {} complete, Français {}/{}, Mathématiques {}/{}, {} unresolved page(s), {} orphan document(s)",
        result.meta.division,
        result.meta.year,
        s.students,
        s.complete,
        s.matched_francais,
        s.students,
        s.matched_maths,
        s.students,
        s.unresolved_pages,
        s.orphan_documents,
    );
    for warning in &s.warnings {
        eprintln!("warning: {warning}");
    }

    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: division {} year {} with {} parent export(s), docs in '{}'",
        config.canon_division(),
        config.year,
        config.inputs.parents.len(),
        config.inputs.docs_dir,
    );
    Ok(())
}
