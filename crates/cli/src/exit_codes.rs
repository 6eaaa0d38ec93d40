//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 1    | General error (IO, unreadable input)               |
//! | 2    | CLI usage error (bad args)                         |
//! | 3    | Division mismatch between records and documents    |
//! | 4    | Coverage below threshold in strict mode            |
//! | 5    | Parse error (config or input structure)            |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - file cannot be read or written.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// The tabular side and the document side belong to different
/// divisions; nothing was written.
pub const EXIT_MISMATCH: u8 = 3;

/// Strict-mode preflight failed: a subject's document coverage is
/// below the configured threshold.
pub const EXIT_COVERAGE: u8 = 4;

/// Config or input parse error (bad TOML, unresolvable headers,
/// empty export).
pub const EXIT_PARSE: u8 = 5;
