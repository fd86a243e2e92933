// src/utils/csv.rs

//! Minimal CSV writer for the final dataset export.

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Render one CSV line (without the trailing newline).
pub fn format_row(row: &[String]) -> String {
    row.iter()
        .map(|cell| {
            if needs_quotes(cell) {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a header line followed by all rows.
pub fn to_csv_string(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&format_row(headers));
    out.push('\n');
    for row in rows {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}
