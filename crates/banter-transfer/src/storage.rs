//! Where downloads land.

use std::path::{Path, PathBuf};

/// Pick a destination under `dir` that does not collide with an existing
/// file: a numeric suffix goes in front of the extension
/// (`report.txt` → `report(1).txt` → `report(2).txt`).
///
/// Only the final path component of the offered name is honored, so a
/// hostile sender cannot steer the write outside the download directory.
pub fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let name = sanitize(filename);
    let candidate = dir.join(&name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, extension) = split_extension(&name);
    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{stem}({counter}){extension}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn sanitize(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string())
}

/// Split `name.ext` into (`name`, `.ext`). Dot-files and names without a
/// dot have no extension; their suffix goes at the end.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 && i < name.len() - 1 => name.split_at(i),
        _ => (name, ""),
    }
}
