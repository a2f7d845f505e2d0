// Import manifest
//
// One CSV row per importable file: path, tags, an empty title column, the
// rating letter, and the thumbnail path when one was produced. Rows are
// sorted by path so the manifest is byte-identical across runs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub path: String,
    pub tags: String,
    pub rating: char,
    pub thumbnail: String,
}

/// Every field is quoted; embedded quotes are doubled.
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn render_row(row: &ManifestRow) -> String {
    [
        csv_field(&row.path),
        csv_field(&row.tags),
        csv_field(""),
        csv_field(&row.rating.to_string()),
        csv_field(&row.thumbnail),
    ]
    .join(",")
}

/// Sort the rows and write the manifest. Returns the row count.
pub fn write_manifest(mut rows: Vec<ManifestRow>, out_path: &Path) -> Result<usize> {
    rows.sort_by(|a, b| a.path.cmp(&b.path));

    let file = File::create(out_path)?;
    let mut writer = BufWriter::new(file);
    for row in &rows {
        writeln!(writer, "{}", render_row(row))?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", rows.len(), out_path.display());
    Ok(rows.len())
}
