//! Correlations between the overall satisfaction and the workload.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::normalize::NormalizedTable;
use crate::resolver::ColumnResolver;
use crate::stats::{pearson, round_to, Correlation};
use crate::table::CellValue;
use crate::themes::{extract_metric, MetricKey, MetricResult};

/// Below this number of paired answers, no correlation is computed.
pub const MIN_CORRELATION_SAMPLES: usize = 6;

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum CrossPair {
    SatisfactionVsDirectorateHours,
    SatisfactionVsProjectHours,
    SatisfactionVsTotalLoad,
}

impl CrossPair {
    pub const ALL: [CrossPair; 3] = [
        CrossPair::SatisfactionVsDirectorateHours,
        CrossPair::SatisfactionVsProjectHours,
        CrossPair::SatisfactionVsTotalLoad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrossPair::SatisfactionVsDirectorateHours => "satisfacao_vs_diretoria",
            CrossPair::SatisfactionVsProjectHours => "satisfacao_vs_projeto",
            CrossPair::SatisfactionVsTotalLoad => "satisfacao_vs_carga_total",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CrossPair::SatisfactionVsDirectorateHours => "Diretoria",
            CrossPair::SatisfactionVsProjectHours => "Projeto",
            CrossPair::SatisfactionVsTotalLoad => "Carga Total",
        }
    }
}

/// Counts of (satisfaction label, workload label) pairs.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CrossTab {
    pub counts: BTreeMap<(String, String), u64>,
}

impl CrossTab {
    fn add(&mut self, row: String, col: String) {
        *self.counts.entry((row, col)).or_insert(0) += 1;
    }

    pub fn get(&self, row: &str, col: &str) -> u64 {
        self.counts
            .get(&(row.to_string(), col.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum CrossOutcome {
    /// Coefficient and p-value are rounded to 3 decimals. The significance
    /// flag is decided on the unrounded p-value.
    Pearson {
        coefficient: f64,
        p_value: f64,
        significant: bool,
        sample_size: usize,
        /// (workload, satisfaction) for each joined row.
        points: Vec<(f64, f64)>,
    },
    /// Enough samples, but one of the series is constant.
    Undefined {
        sample_size: usize,
        points: Vec<(f64, f64)>,
    },
    /// Not enough numeric pairs: counts of the raw answer pairs instead.
    CrossTab { table: CrossTab, sample_size: usize },
}

#[derive(PartialEq, Debug, Clone)]
pub struct CorrelationResult {
    pub pair: CrossPair,
    pub outcome: CrossOutcome,
}

impl CorrelationResult {
    /// The sentence a reader should take from this result, only for
    /// significant correlations.
    pub fn insight(&self) -> Option<String> {
        match self.outcome {
            CrossOutcome::Pearson {
                coefficient,
                significant: true,
                ..
            } => {
                let strength = if coefficient.abs() >= 0.7 {
                    "forte"
                } else if coefficient.abs() >= 0.3 {
                    "moderada"
                } else {
                    "fraca"
                };
                let direction = if coefficient > 0.0 {
                    "positiva"
                } else {
                    "negativa"
                };
                Some(format!(
                    "{}: correlação {} {} ({})",
                    self.pair.label(),
                    direction,
                    strength,
                    coefficient
                ))
            }
            _ => None,
        }
    }
}

// One side of a pair: the numeric reading by row, and the raw label by row.
struct Series {
    numeric: BTreeMap<usize, f64>,
    labels: BTreeMap<usize, String>,
}

impl Series {
    fn from_metric(m: &MetricResult, cells: &[CellValue]) -> Series {
        Series {
            numeric: m.numeric.iter().copied().collect(),
            labels: cells
                .iter()
                .enumerate()
                .filter_map(|(idx, c)| c.label().map(|l| (idx, l)))
                .collect(),
        }
    }

    // Defined only on the rows where both components are.
    fn sum(&self, other: &Series) -> Series {
        Series {
            numeric: self
                .numeric
                .iter()
                .filter_map(|(idx, x)| other.numeric.get(idx).map(|y| (*idx, x + y)))
                .collect(),
            labels: self
                .labels
                .iter()
                .filter_map(|(idx, x)| other.labels.get(idx).map(|y| (*idx, format!("{} + {}", x, y))))
                .collect(),
        }
    }
}

/// Correlates the satisfaction series with the workload series, joining on
/// the row position.
///
/// A pair is left out when one of its columns is absent or when no row
/// answers both questions.
pub fn cross_metrics(
    table: &NormalizedTable,
    resolver: &dyn ColumnResolver,
) -> Vec<CorrelationResult> {
    let series = |key: MetricKey| -> Option<Series> {
        let m = extract_metric(key, table, resolver).ok()?;
        let cells = table.cells(&m.column)?;
        Some(Series::from_metric(&m, cells))
    };
    let satisfaction = match series(MetricKey::OverallSatisfaction) {
        Some(s) => s,
        None => {
            info!("cross_metrics: no satisfaction data, skipping correlations");
            return Vec::new();
        }
    };
    let directorate = series(MetricKey::DirectorateHours);
    let project = series(MetricKey::ProjectHours);
    let total = match (&directorate, &project) {
        (Some(d), Some(p)) => Some(d.sum(p)),
        _ => None,
    };

    let mut res = Vec::new();
    for (pair, workload) in [
        (CrossPair::SatisfactionVsDirectorateHours, &directorate),
        (CrossPair::SatisfactionVsProjectHours, &project),
        (CrossPair::SatisfactionVsTotalLoad, &total),
    ] {
        match workload {
            Some(w) => {
                if let Some(outcome) = correlate(&satisfaction, w) {
                    res.push(CorrelationResult { pair, outcome });
                } else {
                    debug!("cross_metrics: {}: no row with both answers", pair.as_str());
                }
            }
            None => debug!("cross_metrics: {}: workload data absent", pair.as_str()),
        }
    }
    res
}

fn correlate(satisfaction: &Series, workload: &Series) -> Option<CrossOutcome> {
    let points: Vec<(f64, f64)> = satisfaction
        .numeric
        .iter()
        .filter_map(|(idx, y)| workload.numeric.get(idx).map(|x| (*x, *y)))
        .collect();
    let n = points.len();
    if n >= MIN_CORRELATION_SAMPLES {
        let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
        let outcome = match pearson(&xs, &ys) {
            Correlation::Defined {
                coefficient,
                p_value,
                sample_size,
            } => CrossOutcome::Pearson {
                coefficient: round_to(coefficient, 3),
                p_value: round_to(p_value, 3),
                significant: p_value < SIGNIFICANCE_LEVEL,
                sample_size,
                points,
            },
            Correlation::Undefined { sample_size } => CrossOutcome::Undefined {
                sample_size,
                points,
            },
        };
        return Some(outcome);
    }

    let mut table = CrossTab::default();
    for (idx, s) in satisfaction.labels.iter() {
        if let Some(w) = workload.labels.get(idx) {
            table.add(s.clone(), w.clone());
        }
    }
    if table.counts.is_empty() {
        return None;
    }
    debug!(
        "correlate: {} numeric pairs, falling back to a cross tabulation",
        n
    );
    let sample_size = table.total() as usize;
    Some(CrossOutcome::CrossTab { table, sample_size })
}
