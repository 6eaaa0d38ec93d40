// Extracted page text loading

use std::path::Path;

use publipost_engine::model::PageText;

use crate::read::read_file_as_utf8;

/// Load extracted page text. Accepts either a directory of `.txt`
/// files (one page each, name order) or a JSON file holding an array
/// of page strings. Page indices are 1-based in loading order.
pub fn load_pages(path: &Path) -> Result<Vec<PageText>, String> {
    if path.is_dir() {
        return load_txt_dir(path);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => Err(format!(
            "{}: expected a directory of .txt pages or a .json array",
            path.display()
        )),
    }
}

fn load_txt_dir(dir: &Path) -> Result<Vec<PageText>, String> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| format!("{}: {e}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("txt")))
        .collect();
    paths.sort();

    let mut pages = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        pages.push(PageText {
            index: i + 1,
            text: read_file_as_utf8(path)?,
        });
    }
    Ok(pages)
}

fn load_json(path: &Path) -> Result<Vec<PageText>, String> {
    let content = read_file_as_utf8(path)?;
    let texts: Vec<String> =
        serde_json::from_str(&content).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText { index: i + 1, text })
        .collect())
}
