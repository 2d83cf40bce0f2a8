//! Frequency tables and label-to-number mappings for bucketed answers.

use std::collections::HashMap;

use crate::table::CellValue;

/// Counts of each distinct label, by decreasing count.
/// Labels with the same count keep the order in which they were first seen.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FrequencyTable {
    pub entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    pub fn from_labels<'a, I>(labels: I) -> FrequencyTable
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut positions: HashMap<&'a str, usize> = HashMap::new();
        let mut entries: Vec<(String, u64)> = Vec::new();
        for l in labels {
            match positions.get(l) {
                Some(pos) => entries[*pos].1 += 1,
                None => {
                    positions.insert(l, entries.len());
                    entries.push((l.to_string(), 1));
                }
            }
        }
        // Stable sort: ties keep the first-seen order.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        FrequencyTable { entries }
    }

    pub fn from_cells(cells: &[CellValue]) -> FrequencyTable {
        let labels: Vec<String> = cells.iter().filter_map(|c| c.label()).collect();
        FrequencyTable::from_labels(labels.iter().map(|s| s.as_str()))
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| *c).sum()
    }

    pub fn count(&self, label: &str) -> u64 {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fixed translation from answer labels to representative numbers.
///
/// The numbers only feed the statistics: the labels stay the reference for
/// anything shown to a reader.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CategoricalMapping {
    pub entries: &'static [(&'static str, f64)],
}

pub const DIRECTORATE_HOURS: CategoricalMapping = CategoricalMapping {
    entries: &[
        ("1 a 5 horas", 3.0),
        ("6 a 10 horas", 8.0),
        ("11 a 15 horas", 13.0),
        ("Mais de 15 horas", 18.0),
    ],
};

pub const PROJECT_HOURS: CategoricalMapping = CategoricalMapping {
    entries: &[
        ("1 a 5 horas", 3.0),
        ("6 a 10 horas", 8.0),
        ("11 a 15 horas", 13.0),
        ("Mais de 10 horas", 15.0),
        ("Mais de 15 horas", 18.0),
    ],
};

pub const CONCURRENT_PROJECTS: CategoricalMapping = CategoricalMapping {
    entries: &[
        ("Nenhum", 0.0),
        ("Um", 1.0),
        ("Dois", 2.0),
        ("Três", 3.0),
        ("Mais de três", 4.0),
    ],
};

impl CategoricalMapping {
    pub fn lookup(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| *v)
    }

    /// Maps the cell at each row position. Cells without a label in the mapping
    /// (including missing cells) are left out of the result.
    pub fn map_cells(&self, cells: &[CellValue]) -> Vec<(usize, f64)> {
        cells
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| match c {
                CellValue::Text(s) => self.lookup(s).map(|v| (idx, v)),
                _ => None,
            })
            .collect()
    }
}

/// The outcome of categorizing one column.
#[derive(PartialEq, Debug, Clone)]
pub struct Categorized {
    /// Over all the valid labels, mapped or not.
    pub frequencies: FrequencyTable,
    /// Row position and number for each mapped label. Absent without a mapping.
    pub numeric: Option<Vec<(usize, f64)>>,
}

/// Builds the frequency table of a column and, when a mapping is given, the
/// parallel numeric series.
pub fn categorize(cells: &[CellValue], mapping: Option<&CategoricalMapping>) -> Categorized {
    Categorized {
        frequencies: FrequencyTable::from_cells(cells),
        numeric: mapping.map(|m| m.map_cells(cells)),
    }
}
