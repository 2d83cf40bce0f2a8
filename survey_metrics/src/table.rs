// ********* Input data structures ***********

use std::collections::HashSet;
use std::error::Error;
use std::fmt::Display;

/// The content of one cell of an input table.
///
/// Exports from spreadsheets and forms mix free text and numbers in the same
/// column, so no column-level type is assumed.
#[derive(PartialEq, Debug, Clone)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Missing,
}

impl CellValue {
    /// Builds a cell from raw text. Blank strings are treated as missing.
    pub fn from_text(s: &str) -> CellValue {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            CellValue::Missing
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Missing => true,
            CellValue::Number(x) => x.is_nan(),
            CellValue::Text(_) => false,
        }
    }

    /// The label under which this value is counted in frequency tables.
    pub fn label(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(x) if !x.is_nan() => Some(format_number(*x)),
            _ => None,
        }
    }
}

/// Renders a number the way a spreadsheet would show it: integral values
/// without a fractional part.
pub fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

/// A table of survey answers, addressed by the literal text of the question
/// in the header.
///
/// Invariant: all the columns have the same length and the column names are unique.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RawTable {
    columns: Vec<Column>,
    num_rows: usize,
}

impl RawTable {
    pub fn new(columns: Vec<Column>) -> Result<RawTable, SurveyError> {
        let num_rows = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        let mut seen: HashSet<&str> = HashSet::new();
        for c in columns.iter() {
            if c.cells.len() != num_rows {
                return Err(SurveyError::RaggedColumn {
                    column: c.name.clone(),
                    expected: num_rows,
                    found: c.cells.len(),
                });
            }
            if !seen.insert(c.name.as_str()) {
                return Err(SurveyError::DuplicateColumn(c.name.clone()));
            }
        }
        Ok(RawTable { columns, num_rows })
    }

    /// Builds a table from a header and row-major data.
    pub fn from_rows(headers: &[String], rows: &[Vec<CellValue>]) -> Result<RawTable, SurveyError> {
        let mut columns: Vec<Column> = headers
            .iter()
            .map(|h| Column {
                name: h.clone(),
                cells: Vec::with_capacity(rows.len()),
            })
            .collect();
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(SurveyError::RaggedRow {
                    row: idx,
                    expected: headers.len(),
                    found: row.len(),
                });
            }
            for (col, cell) in columns.iter_mut().zip(row.iter()) {
                col.cells.push(cell.clone());
            }
        }
        RawTable::new(columns)
    }

    /// Stacks tables on top of each other. The columns are the union of all the
    /// columns, in first-seen order; cells are missing where a table lacks a column.
    pub fn concat(tables: &[RawTable]) -> RawTable {
        let mut names: Vec<String> = Vec::new();
        for t in tables {
            for c in t.columns.iter() {
                if !names.contains(&c.name) {
                    names.push(c.name.clone());
                }
            }
        }
        let num_rows: usize = tables.iter().map(|t| t.num_rows).sum();
        let columns = names
            .into_iter()
            .map(|name| {
                let mut cells: Vec<CellValue> = Vec::with_capacity(num_rows);
                for t in tables {
                    match t.column(&name) {
                        Some(c) => cells.extend(c.cells.iter().cloned()),
                        None => cells.extend(std::iter::repeat(CellValue::Missing).take(t.num_rows)),
                    }
                }
                Column { name, cells }
            })
            .collect();
        RawTable { columns, num_rows }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row(&self, idx: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| &c.cells[idx]).collect()
    }

    /// Rewrites every column. The closure must keep the number of cells.
    pub(crate) fn map_columns<F>(&self, f: F) -> RawTable
    where
        F: Fn(&Column) -> Column,
    {
        let columns: Vec<Column> = self.columns.iter().map(f).collect();
        debug_assert!(columns.iter().all(|c| c.cells.len() == self.num_rows));
        RawTable {
            columns,
            num_rows: self.num_rows,
        }
    }

    /// Returns a copy without the rows in which every cell is missing.
    pub fn without_empty_rows(&self) -> RawTable {
        let keep: Vec<usize> = (0..self.num_rows)
            .filter(|idx| self.columns.iter().any(|c| !c.cells[*idx].is_missing()))
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                cells: keep.iter().map(|idx| c.cells[*idx].clone()).collect(),
            })
            .collect();
        RawTable {
            columns,
            num_rows: keep.len(),
        }
    }
}

/// Structural problems that make a table unusable as a whole.
///
/// Problems with individual cells or columns are never reported through this type:
/// they show up as missing values or absent metrics.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SurveyError {
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    DuplicateColumn(String),
}

impl Error for SurveyError {}

impl Display for SurveyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveyError::RaggedColumn {
                column,
                expected,
                found,
            } => write!(
                f,
                "column {:?} has {} cells, expected {}",
                column, found, expected
            ),
            SurveyError::RaggedRow {
                row,
                expected,
                found,
            } => write!(f, "row {} has {} cells, expected {}", row, found, expected),
            SurveyError::DuplicateColumn(name) => write!(f, "duplicate column {:?}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::from_text(s)
    }

    #[test]
    fn blank_text_is_missing() {
        assert_eq!(text("   "), CellValue::Missing);
        assert_eq!(text(" 4 "), CellValue::Text("4".to_string()));
        assert!(CellValue::Number(f64::NAN).is_missing());
    }

    #[test]
    fn labels_of_numbers() {
        assert_eq!(CellValue::Number(5.0).label(), Some("5".to_string()));
        assert_eq!(CellValue::Number(4.5).label(), Some("4.5".to_string()));
        assert_eq!(CellValue::Missing.label(), None);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let res = RawTable::new(vec![
            Column {
                name: "a".to_string(),
                cells: vec![text("1"), text("2")],
            },
            Column {
                name: "b".to_string(),
                cells: vec![text("1")],
            },
        ]);
        assert!(matches!(res, Err(SurveyError::RaggedColumn { .. })));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let headers = vec!["a".to_string(), "a".to_string()];
        let res = RawTable::from_rows(&headers, &[vec![text("1"), text("2")]]);
        assert_eq!(res, Err(SurveyError::DuplicateColumn("a".to_string())));
    }

    #[test]
    fn empty_rows_are_dropped() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![
            vec![text("1"), text("")],
            vec![text(""), text(" ")],
            vec![text(""), text("x")],
        ];
        let t = RawTable::from_rows(&headers, &rows).unwrap();
        let cleaned = t.without_empty_rows();
        assert_eq!(cleaned.num_rows(), 2);
        assert_eq!(t.num_rows(), 3);
        assert_eq!(cleaned.row(1), vec![&CellValue::Missing, &text("x")]);
    }

    #[test]
    fn concat_aligns_columns() {
        let t1 = RawTable::from_rows(&["a".to_string()], &[vec![text("1")]]).unwrap();
        let t2 = RawTable::from_rows(
            &["b".to_string(), "a".to_string()],
            &[vec![text("x"), text("2")]],
        )
        .unwrap();
        let t = RawTable::concat(&[t1, t2]);
        assert_eq!(t.column_names(), vec!["a", "b"]);
        assert_eq!(t.num_rows(), 2);
        assert_eq!(
            t.column("b").unwrap().cells,
            vec![CellValue::Missing, text("x")]
        );
    }
}
