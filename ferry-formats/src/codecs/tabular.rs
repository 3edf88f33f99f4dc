//! Delimited text tables and Excel workbooks

use calamine::{Data, Range, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::io::Cursor;

use crate::error::{FormatError, FormatResult};
use crate::registry::{Loader, Payload, Saver};
use crate::value::{Sheet, Table, Value};

/// Comma-separated values, first record is the header
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl Loader for CsvCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        let raw = payload.into_bytes();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(raw.as_ref());

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        Ok(Value::Table(Table::new(headers, rows)))
    }
}

impl Saver for CsvCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        let table = value.as_table().ok_or_else(|| value.mismatch("table"))?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| FormatError::Io(e.into_error()))
    }
}

/// One table per worksheet, first row is the header
///
/// Empty strings are not written as cells. Empty cells inside the used
/// range load back as empty strings, but rows or columns that are empty
/// after the last written cell are not part of the range and are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxCodec;

impl Loader for XlsxCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(payload.into_bytes()))?;
        let names = workbook.sheet_names();

        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name)?;
            sheets.push(Sheet {
                name,
                table: table_from_range(&range),
            });
        }
        Ok(Value::Workbook(sheets))
    }
}

/// Lay the used range out on a grid anchored at A1 so that leading empty
/// rows or columns survive.
fn table_from_range(range: &Range<Data>) -> Table {
    let Some((row0, col0)) = range.start() else {
        return Table::default();
    };
    let (height, width) = range.get_size();
    let row0 = row0 as usize;
    let col0 = col0 as usize;

    let mut grid = vec![vec![String::new(); col0 + width]; row0 + height];
    for (row, col, cell) in range.cells() {
        grid[row0 + row][col0 + col] = cell_text(cell);
    }

    let mut rows = grid.into_iter();
    let headers = rows.next().unwrap_or_default();
    Table::new(headers, rows.collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Saver for XlsxCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        let sheets = match value {
            Value::Workbook(sheets) => sheets.clone(),
            Value::Table(table) => vec![Sheet {
                name: "Sheet1".to_string(),
                table: table.clone(),
            }],
            other => return Err(other.mismatch("workbook")),
        };

        let mut workbook = Workbook::new();
        for sheet in &sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            let lines = std::iter::once(&sheet.table.headers).chain(&sheet.table.rows);
            for (row, cells) in lines.enumerate() {
                let row = u32::try_from(row)
                    .map_err(|_| FormatError::malformed("too many rows for a worksheet"))?;
                for (col, cell) in cells.iter().enumerate() {
                    if cell.is_empty() {
                        continue;
                    }
                    let col = u16::try_from(col)
                        .map_err(|_| FormatError::malformed("too many columns for a worksheet"))?;
                    worksheet.write_string(row, col, cell)?;
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }
}
