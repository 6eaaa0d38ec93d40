// Spreadsheet export decoding

use std::path::Path;

use publipost_engine::normalize::MOJIBAKE_ARTIFACTS;

/// Read a file and convert to UTF-8 if needed (handles Windows-1252
/// exports, the common case for French school software).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(decode_bytes(&bytes))
}

/// Decode raw bytes: strict UTF-8 first; on failure fall back to
/// Windows-1252, unless that decode itself shows double-encoding
/// artifacts, in which case the bytes were mostly UTF-8 all along and
/// a lossy BOM-aware UTF-8 decode loses less.
pub fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            if MOJIBAKE_ARTIFACTS.iter().any(|a| decoded.contains(a)) {
                let (lossy, _, _) = encoding_rs::UTF_8.decode(bytes);
                lossy.into_owned()
            } else {
                decoded.into_owned()
            }
        }
    }
}
