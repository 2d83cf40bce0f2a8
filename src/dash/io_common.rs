use std::collections::HashSet;
use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Header cells as typed by people: the byte order mark of the first cell
/// is dropped and runs of whitespace are collapsed.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Makes the header usable as column names: blank names become
/// `Unnamed: <index>`, repeated names get a `.1`, `.2`... suffix.
pub fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, h) in raw.iter().enumerate() {
        let base = normalize_header(h);
        let base = if base.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            base
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        seen.insert(name.clone());
        res.push(name);
    }
    res
}
