// Exports of Microsoft Forms and Google Forms, as Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::dash::{io_common::dedupe_headers, *};

/// Reads the answers of a form export. The first row of the worksheet is the
/// header, each following row is one response.
pub fn read_excel_table(path: &str, worksheet_name: Option<&str>) -> BDashResult<RawTable> {
    let wrange = get_range(path, worksheet_name)?;

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu { path })?;
    let raw_headers: Vec<String> = header.iter().map(header_to_string).collect();
    let headers = dedupe_headers(&raw_headers);
    debug!("read_excel_table: header: {:?}", headers);

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for (idx, row) in iter.enumerate() {
        debug!("read_excel_table: idx: {:?} row: {:?}", idx, &row);
        let mut cells: Vec<CellValue> = row.iter().map(read_cell).collect();
        cells.resize(headers.len(), CellValue::Missing);
        rows.push(cells);
    }
    let table = RawTable::from_rows(&headers, &rows).context(MalformedTableSnafu { path })?;
    Ok(table)
}

fn header_to_string(cell: &DataType) -> String {
    match read_cell(cell) {
        CellValue::Text(s) => s,
        CellValue::Number(x) => format_number(x),
        CellValue::Missing => "".to_string(),
    }
}

/// Numbers stay numbers; dates are kept as spreadsheet serial numbers.
fn read_cell(cell: &DataType) -> CellValue {
    match cell {
        DataType::Int(i) => CellValue::Number(*i as f64),
        DataType::Float(f) | DataType::DateTime(f) => CellValue::Number(*f),
        DataType::String(s) => CellValue::from_text(s),
        DataType::Bool(b) => CellValue::Text(b.to_string()),
        _ => CellValue::Missing,
    }
}

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> BDashResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                path,
                name: worksheet_name,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(DashError::EmptyExcel {
                path: path.to_string(),
            })),
            [(worksheet_name, wrange)] => {
                debug!(
                    "get_range: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => {
                let names: Vec<String> = all_worksheets.iter().map(|(n, _)| n.clone()).collect();
                Err(Box::new(DashError::AmbiguousWorksheet {
                    path: path.to_string(),
                    names: names.join(", "),
                }))
            }
        }
    }
}
