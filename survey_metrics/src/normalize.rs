use log::debug;

use crate::table::{CellValue, Column, RawTable};

/// Best-effort conversion of a cell to a number. Never fails: whatever cannot
/// be read as a finite number is missing.
pub fn to_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(x) if x.is_finite() => Some(*x),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

pub fn coerce_column(cells: &[CellValue]) -> Vec<Option<f64>> {
    cells.iter().map(to_number).collect()
}

/// A survey table ready for the metric computations.
///
/// The rows that are completely empty are dropped, and the requested columns
/// get a numeric view next to their original cells. The input table is left
/// untouched.
#[derive(PartialEq, Debug, Clone)]
pub struct NormalizedTable {
    table: RawTable,
    numeric: Vec<(String, Vec<Option<f64>>)>,
}

impl NormalizedTable {
    /// Columns of `numeric_columns` that are not in the table are ignored.
    pub fn new(raw: &RawTable, numeric_columns: &[&str]) -> NormalizedTable {
        let table = raw.without_empty_rows();
        debug!(
            "NormalizedTable::new: {} rows kept out of {}",
            table.num_rows(),
            raw.num_rows()
        );
        let mut numeric: Vec<(String, Vec<Option<f64>>)> = Vec::new();
        for c in table.columns() {
            if numeric_columns.contains(&c.name.as_str()) {
                numeric.push((c.name.clone(), coerce_column(&c.cells)));
            }
        }
        NormalizedTable { table, numeric }
    }

    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn num_rows(&self) -> usize {
        self.table.num_rows()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.table.column_names()
    }

    pub fn cells(&self, column: &str) -> Option<&[CellValue]> {
        self.table.column(column).map(|c| c.cells.as_slice())
    }

    /// The numeric view of a column, if that column was coerced.
    pub fn numeric(&self, column: &str) -> Option<&[Option<f64>]> {
        self.numeric
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v.as_slice())
    }

    pub fn coerced_columns(&self) -> Vec<&str> {
        self.numeric.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// The table as it should be exported: coerced columns hold numbers only,
    /// the cells that could not be converted are missing.
    pub fn processed(&self) -> RawTable {
        self.table.map_columns(|c| match self.numeric(&c.name) {
            Some(nums) => Column {
                name: c.name.clone(),
                cells: nums
                    .iter()
                    .map(|x| x.map(CellValue::Number).unwrap_or(CellValue::Missing))
                    .collect(),
            },
            None => c.clone(),
        })
    }
}
