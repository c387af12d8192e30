//! Normalization of raw tabular input into the canonical 3-column shape
//!
//! Columns are taken by position, never by header name, so any export whose
//! first three columns are name / category / advisor is accepted regardless
//! of what its header row says. Delimited text and spreadsheet workbooks go
//! through the same projection.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;

use crate::error::IngestError;
use crate::types::{Record, Table};

/// Number of canonical columns
pub const CANONICAL_COLUMNS: usize = 3;

/// Cell values treated as "missing" and replaced with the empty string.
const MISSING_MARKERS: &[&str] = &[
    "nan", "NaN", "None", "null", "NULL", "NA", "N/A", "n/a", "#N/A", "<NA>",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How the raw bytes are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Delimited text with the given field separator
    Delimited(u8),
    /// Excel (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`) or OpenDocument (`.ods`)
    /// workbook. Only the first sheet is read.
    Spreadsheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Skip the first row. Off by default: the first row is data.
    pub has_header: bool,
    pub format: InputFormat,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            has_header: false,
            format: InputFormat::Delimited(b','),
        }
    }
}

impl NormalizeOptions {
    /// Pick the format from the file extension. Workbooks are read as
    /// spreadsheets, `.tsv` / `.tab` as tab-separated, anything else as CSV.
    pub fn for_filename(filename: &str, has_header: bool) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let format = match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => InputFormat::Spreadsheet,
            Some("tsv" | "tab") => InputFormat::Delimited(b'\t'),
            _ => InputFormat::Delimited(b','),
        };
        Self { has_header, format }
    }
}

/// Trim a cell and blank out missing-value markers.
pub fn clean_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Cells read from the input, cut down to the canonical columns, plus the
/// widest row seen (header included).
struct RawRows {
    width: usize,
    rows: Vec<Vec<String>>,
}

/// Parse `raw` and project it onto the canonical columns.
///
/// Nothing is partially adopted: any error rejects the whole input.
pub fn normalize(raw: &[u8], opts: NormalizeOptions) -> Result<Table, IngestError> {
    let raw_rows = match opts.format {
        InputFormat::Delimited(delimiter) => read_delimited(raw, delimiter, opts.has_header)?,
        InputFormat::Spreadsheet => read_spreadsheet(raw, opts.has_header)?,
    };
    project(raw_rows)
}

/// Re-apply cell cleaning to records that were already in canonical shape.
pub(crate) fn canonicalize(records: impl IntoIterator<Item = Record>) -> Table {
    let rows = records
        .into_iter()
        .map(|r| vec![r.name, r.category, r.advisor])
        .collect();
    Table::new(project_rows(rows))
}

fn project(raw: RawRows) -> Result<Table, IngestError> {
    if raw.width == 0 {
        return Err(IngestError::ParseFailure("no rows".to_string()));
    }
    if raw.width < CANONICAL_COLUMNS {
        return Err(IngestError::TooFewColumns { found: raw.width });
    }
    Ok(Table::new(project_rows(raw.rows)))
}

fn project_rows(rows: Vec<Vec<String>>) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            let cell = |idx: usize| row.get(idx).map(|c| clean_cell(c)).unwrap_or_default();
            Record::new(cell(0), cell(1), cell(2))
        })
        .filter(|record| record.fields().iter().any(|field| !field.is_empty()))
        .collect()
}

fn read_delimited(raw: &[u8], delimiter: u8, has_header: bool) -> Result<RawRows, IngestError> {
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(raw);

    let mut width = 0;
    if has_header {
        let headers = reader.headers().map_err(parse_failure)?;
        width = headers.len();
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = result.map_err(|e| {
            IngestError::ParseFailure(format!("row {}: {}", idx + 1, describe(&e)))
        })?;
        width = width.max(row.len());
        rows.push(row.iter().take(CANONICAL_COLUMNS).map(str::to_string).collect());
    }

    Ok(RawRows { width, rows })
}

fn read_spreadsheet(raw: &[u8], has_header: bool) -> Result<RawRows, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(raw))
        .map_err(|e| IngestError::ParseFailure(format!("not a readable workbook: {}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::ParseFailure("workbook has no sheets".to_string()))?
        .map_err(|e| IngestError::ParseFailure(e.to_string()))?;

    // The used range may start right of column A; positions count from A.
    let offset = range.start().map_or(0, |(_, col)| col as usize);
    let rows = range
        .rows()
        .skip(usize::from(has_header))
        .map(|row| {
            std::iter::repeat(String::new())
                .take(offset)
                .chain(row.iter().map(cell_text))
                .take(CANONICAL_COLUMNS)
                .collect()
        })
        .collect();

    let width = match range.width() {
        0 => 0,
        used => offset + used,
    };
    Ok(RawRows { width, rows })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn parse_failure(e: csv::Error) -> IngestError {
    IngestError::ParseFailure(describe(&e))
}

fn describe(e: &csv::Error) -> String {
    match e.kind() {
        csv::ErrorKind::Utf8 { .. } => "file is not valid UTF-8 text".to_string(),
        _ => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Table, IngestError> {
        normalize(input.as_bytes(), NormalizeOptions::default())
    }

    #[test]
    fn test_positional_projection() {
        let table = parse("Alice Smith,VIP,Tom,extra,cols\nBob Jones,Standard,Tom\n").unwrap();
        assert_eq!(
            table.records(),
            &[
                Record::new("Alice Smith", "VIP", "Tom"),
                Record::new("Bob Jones", "Standard", "Tom"),
            ]
        );
    }

    #[test]
    fn test_first_row_is_data_by_default() {
        let table = parse("Client,Tier,Advisor\nAlice,VIP,Tom\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].name, "Client");
    }

    #[test]
    fn test_header_row_skipped_when_configured() {
        let opts = NormalizeOptions {
            has_header: true,
            ..Default::default()
        };
        let table = normalize(b"Whatever,Headers,Here\nAlice,VIP,Tom\n", opts).unwrap();
        assert_eq!(table.records(), &[Record::new("Alice", "VIP", "Tom")]);
    }

    #[test]
    fn test_trims_and_blanks_missing_markers() {
        let table = parse("  Alice  , nan ,\tTom \nBob,N/A,None\n").unwrap();
        assert_eq!(table.records()[0], Record::new("Alice", "", "Tom"));
        assert_eq!(table.records()[1], Record::new("Bob", "", ""));
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse("Alice,VIP,Tom\nBob\n").unwrap();
        assert_eq!(table.records()[1], Record::new("Bob", "", ""));
    }

    #[test]
    fn test_blank_rows_dropped() {
        let table = parse("Alice,VIP,Tom\n,,\n , NaN ,\nBob,Standard,Jane\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_too_few_columns() {
        match parse("Alice,VIP\nBob,Standard\n") {
            Err(IngestError::TooFewColumns { found }) => assert_eq!(found, 2),
            other => panic!("expected TooFewColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_is_parse_failure() {
        assert!(matches!(parse(""), Err(IngestError::ParseFailure(_))));
    }

    #[test]
    fn test_invalid_utf8_is_parse_failure() {
        let raw = b"Alice,VIP,Tom\n\xff\xfe\x00,x,y\n";
        assert!(matches!(
            normalize(raw, NormalizeOptions::default()),
            Err(IngestError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_bom_stripped() {
        let table = normalize(b"\xEF\xBB\xBFAlice,VIP,Tom\n", NormalizeOptions::default()).unwrap();
        assert_eq!(table.records()[0].name, "Alice");
    }

    #[test]
    fn test_quoted_cells() {
        let table = parse("\"Smith, Alice\",\"VIP\",\"Tom\"\n").unwrap();
        assert_eq!(table.records()[0].name, "Smith, Alice");
    }

    #[test]
    fn test_tsv_by_extension() {
        let opts = NormalizeOptions::for_filename("export.TSV", false);
        assert_eq!(opts.format, InputFormat::Delimited(b'\t'));
        let table = normalize(b"Alice\tVIP\tTom\n", opts).unwrap();
        assert_eq!(table.records()[0], Record::new("Alice", "VIP", "Tom"));

        assert_eq!(
            NormalizeOptions::for_filename("export.csv", false).format,
            InputFormat::Delimited(b',')
        );
    }

    #[test]
    fn test_workbook_extensions() {
        for name in ["crm_contacts.xlsx", "OLD.XLS", "book.ods", "macro.xlsm"] {
            assert_eq!(
                NormalizeOptions::for_filename(name, false).format,
                InputFormat::Spreadsheet,
                "{name}"
            );
        }
        assert_eq!(
            NormalizeOptions::for_filename("no_extension", true),
            NormalizeOptions {
                has_header: true,
                format: InputFormat::Delimited(b','),
            }
        );
    }

    fn xlsx(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if !cell.is_empty() {
                    sheet.write_string(r as u32, c as u16, *cell).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn spreadsheet(has_header: bool) -> NormalizeOptions {
        NormalizeOptions {
            has_header,
            format: InputFormat::Spreadsheet,
        }
    }

    #[test]
    fn test_xlsx_first_sheet_projected() {
        let raw = xlsx(&[
            &["  Alice Smith ", "VIP", "Tom", "ignored"],
            &["Bob Jones", "N/A", "Jane"],
            &["", "", ""],
            &["Carol", "", ""],
        ]);
        let table = normalize(&raw, spreadsheet(false)).unwrap();
        assert_eq!(
            table.records(),
            &[
                Record::new("Alice Smith", "VIP", "Tom"),
                Record::new("Bob Jones", "", "Jane"),
                Record::new("Carol", "", ""),
            ]
        );
    }

    #[test]
    fn test_xlsx_numbers_and_header() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Client").unwrap();
        sheet.write_string(0, 1, "Tier").unwrap();
        sheet.write_string(0, 2, "Advisor").unwrap();
        sheet.write_number(1, 0, 42).unwrap();
        sheet.write_string(1, 1, "Prospect").unwrap();
        sheet.write_string(1, 2, "Lee").unwrap();
        let raw = workbook.save_to_buffer().unwrap();

        let table = normalize(&raw, spreadsheet(true)).unwrap();
        assert_eq!(table.records(), &[Record::new("42", "Prospect", "Lee")]);

        let table = normalize(&raw, spreadsheet(false)).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_xlsx_too_few_columns() {
        let raw = xlsx(&[&["Alice", "VIP"], &["Bob", "Standard"]]);
        match normalize(&raw, spreadsheet(false)) {
            Err(IngestError::TooFewColumns { found }) => assert_eq!(found, 2),
            other => panic!("expected TooFewColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_workbook_is_parse_failure() {
        assert!(matches!(
            normalize(b"Alice,VIP,Tom\n", spreadsheet(false)),
            Err(IngestError::ParseFailure(_))
        ));
    }
}
