// Primitives for reading and writing CSV files.

use crate::dash::{io_common::dedupe_headers, *};

/// Reads a CSV export with a header row.
///
/// Short lines are completed with missing cells. A line with more cells than
/// the header is an error: the columns cannot be attributed.
pub fn read_csv_table(path: &str, delimiter: u8) -> BDashResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;

    let raw_headers: Vec<String> = rdr
        .headers()
        .context(OpeningCsvSnafu { path })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    let headers = dedupe_headers(&raw_headers);
    debug!("read_csv_table: headers: {:?}", headers);

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        if line.len() > headers.len() {
            return Err(Box::new(DashError::CsvLineTooLong {
                path: path.to_string(),
                lineno,
            }));
        }
        let mut row: Vec<CellValue> = line.iter().map(CellValue::from_text).collect();
        row.resize(headers.len(), CellValue::Missing);
        rows.push(row);
    }
    debug!("read_csv_table: {} lines read from {:?}", rows.len(), path);
    let table = RawTable::from_rows(&headers, &rows).context(MalformedTableSnafu { path })?;
    Ok(table)
}

fn cell_to_string(cell: &CellValue) -> String {
    match cell {
        CellValue::Missing => "".to_string(),
        CellValue::Number(x) if x.is_nan() => "".to_string(),
        CellValue::Number(x) => format_number(*x),
        CellValue::Text(s) => s.clone(),
    }
}

/// Writes a table with its header. The file starts with a byte order mark so
/// that spreadsheet programs read the accents correctly.
pub fn write_csv_table(path: &str, table: &RawTable) -> BDashResult<()> {
    let mut file = fs::File::create(path).context(WritingOutputSnafu { path })?;
    std::io::Write::write_all(&mut file, "\u{feff}".as_bytes())
        .context(WritingOutputSnafu { path })?;
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(table.column_names())
        .context(WritingCsvSnafu { path })?;
    for idx in 0..table.num_rows() {
        let row: Vec<String> = table.row(idx).into_iter().map(cell_to_string).collect();
        wtr.write_record(&row).context(WritingCsvSnafu { path })?;
    }
    wtr.flush().context(WritingOutputSnafu { path })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> String {
        let p = dir.join(name);
        fs::write(&p, contents).unwrap();
        p.display().to_string()
    }

    #[test]
    fn read_with_bom_and_short_lines() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(
            dir.path(),
            "a.csv",
            "\u{feff}Nota,Horas diretoria,Comentário\n4,1 a 5 horas,ótimo\n 5 \n",
        );
        let t = read_csv_table(&p, b',').unwrap();
        assert_eq!(t.column_names(), vec!["Nota", "Horas diretoria", "Comentário"]);
        assert_eq!(t.num_rows(), 2);
        assert_eq!(
            t.row(1),
            vec![
                &CellValue::Text("5".to_string()),
                &CellValue::Missing,
                &CellValue::Missing
            ]
        );
    }

    #[test]
    fn long_lines_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "a.csv", "a;b\n1;2;3\n");
        let res = read_csv_table(&p, b';');
        assert!(matches!(
            res.map_err(|e| *e),
            Err(DashError::CsvLineTooLong { lineno: 2, .. })
        ));
    }

    #[test]
    fn missing_file() {
        let res = read_csv_table("/nonexistent/a.csv", b',');
        assert!(matches!(
            res.map_err(|e| *e),
            Err(DashError::OpeningCsv { .. })
        ));
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let t = RawTable::new(vec![
            Column {
                name: "Satisfação".to_string(),
                cells: vec![CellValue::Number(4.0), CellValue::Number(3.5)],
            },
            Column {
                name: "Nome".to_string(),
                cells: vec![CellValue::Missing, CellValue::Text("Ana, B.".to_string())],
            },
        ])
        .unwrap();
        let p = dir.path().join("out.csv").display().to_string();
        write_csv_table(&p, &t).unwrap();
        let contents = fs::read_to_string(&p).unwrap();
        assert!(contents.starts_with("\u{feff}Satisfação,Nome\n4,\n3.5,\"Ana, B.\"\n"));
        let back = read_csv_table(&p, b',').unwrap();
        assert_eq!(back.column("Nome").unwrap().cells, t.column("Nome").unwrap().cells);
    }
}
