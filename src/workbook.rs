//! Raw file bytes to header labels plus untyped rows.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::PipelineError;
use crate::models::{CellValue, RawRow, SourceRow};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Workbook,
    Csv,
}

impl FileFormat {
    /// Picks the reader from the extension, sniffing the bytes otherwise.
    pub fn detect(path: Option<&Path>, bytes: &[u8]) -> Self {
        let extension = path
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods") => FileFormat::Workbook,
            Some("csv" | "txt") => FileFormat::Csv,
            _ if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) => {
                FileFormat::Workbook
            }
            _ => FileFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
}

pub fn read_sheet(
    bytes: Vec<u8>,
    format: FileFormat,
    sheet_name: &str,
) -> Result<SheetData, PipelineError> {
    match format {
        FileFormat::Workbook => read_workbook(bytes, sheet_name),
        FileFormat::Csv => read_csv(&bytes),
    }
}

fn read_workbook(bytes: Vec<u8>, sheet_name: &str) -> Result<SheetData, PipelineError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| PipelineError::unexpected(err.to_string()))?;

    if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
        return Err(PipelineError::MissingSheet {
            sheet: sheet_name.to_string(),
        });
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|err| PipelineError::unexpected(err.to_string()))?;

    let header_line = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect(),
        None => return Ok(SheetData::default()),
    };

    let rows = rows
        .enumerate()
        .filter_map(|(offset, cells)| {
            let cells = build_row(&headers, cells.iter().map(cell_value).collect())?;
            Some(SourceRow {
                line: header_line + 1 + offset,
                cells,
            })
        })
        .collect();

    Ok(SheetData { headers, rows })
}

fn read_csv(bytes: &[u8]) -> Result<SheetData, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| PipelineError::unexpected(err.to_string()))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|err| PipelineError::unexpected(err.to_string()))?;
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(field.to_string())
                }
            })
            .collect();
        let line = record
            .position()
            .map_or(index + 2, |position| position.line() as usize);
        if let Some(cells) = build_row(&headers, cells) {
            rows.push(SourceRow { line, cells });
        }
    }

    Ok(SheetData { headers, rows })
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(value) => CellValue::Text(value.clone()),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Float(value) => CellValue::Number(*value),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => value
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Number(value.as_f64())),
        Data::DateTimeIso(value) | Data::DurationIso(value) => CellValue::Text(value.clone()),
    }
}

/// Pairs cells with headers. Blank rows yield `None`; unnamed columns and
/// repeated headers after the first are ignored.
fn build_row(headers: &[String], cells: Vec<CellValue>) -> Option<RawRow> {
    let blank = cells.iter().all(|cell| match cell {
        CellValue::Empty => true,
        CellValue::Text(text) => text.trim().is_empty(),
        _ => false,
    });
    if blank {
        return None;
    }

    let mut row = RawRow::new();
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        row.entry(header.clone()).or_insert(cell);
    }
    Some(row)
}
