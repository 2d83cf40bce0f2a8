/*!
Metrics for organizational climate surveys.

This crate turns the answers of a survey, as exported by a form tool or
accumulated by a collector, into descriptive statistics per theme and
correlations between satisfaction and workload.

The input is a [RawTable] whose columns are named after the questions. The
questions are found with a [ColumnResolver], so exports with slightly
different wordings can still be analyzed. Nothing in this crate fails on bad
answers: unreadable cells are missing, absent questions are reported as
unavailable metrics, small samples give cross tabulations instead of
correlations.

```
use survey_metrics::*;

let headers = vec![
    "O quão satisfeito(a) você está com a IN Junior?".to_string(),
    "Quantas horas por semana você gasta com tarefas de diretoria?".to_string(),
];
let rows: Vec<Vec<CellValue>> = vec![
    vec![CellValue::from_text("4"), CellValue::from_text("6 a 10 horas")],
    vec![CellValue::from_text("5"), CellValue::from_text("1 a 5 horas")],
];
let table = RawTable::from_rows(&headers, &rows).unwrap();
let report = build_summary_report(&table, &HeuristicResolver);

assert_eq!(report.total_responses, 2);
let hours = report.metric(MetricKey::DirectorateHours).unwrap();
assert_eq!(hours.summary().unwrap().mean, 5.5);
```
*/

mod categorical;
mod cross;
mod normalize;
mod report;
mod resolver;
mod stats;
mod table;
mod themes;

pub use crate::categorical::*;
pub use crate::cross::*;
pub use crate::normalize::*;
pub use crate::report::*;
pub use crate::resolver::*;
pub use crate::stats::*;
pub use crate::table::*;
pub use crate::themes::*;
