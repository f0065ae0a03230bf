//! Loads the first worksheet of an export into rows of trimmed cell text.
//!
//! Workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) go through calamine;
//! `.csv` and `.tsv` exports go through the csv reader. Either way the parser
//! only ever sees `Vec<Vec<String>>`.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::IngestError;

/// Reads every row of the export at `path`.
///
/// # Errors
///
/// Returns [`IngestError::MissingFile`] if `path` is not a file,
/// [`IngestError::UnsupportedFormat`] for an unknown extension, or the
/// reader's own error when the file cannot be decoded.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, IngestError> {
    if !path.is_file() {
        return Err(IngestError::MissingFile(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path),
        "csv" => read_delimited(path, b','),
        "tsv" | "txt" => read_delimited(path, b'\t'),
        _ => Err(IngestError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, IngestError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Schema("workbook has no worksheets".to_string()))??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_fixture(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(body.as_bytes()).expect("write fixture");
        file
    }

    #[test]
    fn csv_rows_are_trimmed_and_ragged_rows_allowed() {
        let file = write_fixture(".csv", "a, b ,c\nonly\n\"x, y\",z\n");
        let rows = read_rows(file.path()).expect("read csv");
        assert_eq!(
            rows,
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["only".to_string()],
                vec!["x, y".to_string(), "z".to_string()],
            ]
        );
    }

    #[test]
    fn tsv_uses_tab_delimiter() {
        let file = write_fixture(".tsv", "Month\tSearch Term\n2025-09\tpuzzle, games\n");
        let rows = read_rows(file.path()).expect("read tsv");
        assert_eq!(rows[1], vec!["2025-09".to_string(), "puzzle, games".to_string()]);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_rows(Path::new("/definitely/not/here.xlsx")).expect_err("should fail");
        assert!(matches!(err, IngestError::MissingFile(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = write_fixture(".pdf", "not a sheet");
        let err = read_rows(file.path()).expect_err("should fail");
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn numeric_cells_render_without_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(42.0)), "42");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String("  puzzle ".to_string())), "puzzle");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
