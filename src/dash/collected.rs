//! Aggregates of the collected answers that need their form: means per
//! section, counts per option of the single-choice fields and the trend of
//! the overall satisfaction over time.

use chrono::NaiveDateTime;

use crate::dash::form_schema::{FieldKind, FormSchema, TIMESTAMP_COLUMN};
use crate::dash::*;

pub const TREND_WINDOW_DAYS: i64 = 7;

/// All the slider answers of one section, pooled.
#[derive(PartialEq, Debug, Clone)]
pub struct SectionMean {
    pub id: String,
    pub title: String,
    pub columns: usize,
    pub answers: usize,
    pub mean: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TrendPoint {
    pub timestamp: String,
    pub value: f64,
    /// Mean of the answers of the last [TREND_WINDOW_DAYS] days.
    pub rolling_mean: f64,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct CollectedSummary {
    /// Sections without any slider answer are left out.
    pub sections: Vec<SectionMean>,
    pub choices: Vec<(String, FrequencyTable)>,
    pub trend_column: Option<String>,
    /// Ordered by time. Answers without a readable time or value are skipped.
    pub satisfaction_trend: Vec<TrendPoint>,
}

fn section_means(table: &RawTable, schema: &FormSchema) -> Vec<SectionMean> {
    let mut res = Vec::new();
    for section in schema.sections() {
        let mut columns = 0;
        let mut values: Vec<f64> = Vec::new();
        for field in section.fields.iter() {
            if !matches!(field.kind, FieldKind::BoundedSlider { .. }) {
                continue;
            }
            let name = format!("{}.{}", section.id, field.id);
            if let Some(c) = table.column(&name) {
                columns += 1;
                values.extend(c.cells.iter().filter_map(to_number));
            }
        }
        if values.is_empty() {
            continue;
        }
        res.push(SectionMean {
            id: section.id.clone(),
            title: section.title.clone(),
            columns,
            answers: values.len(),
            mean: values.iter().sum::<f64>() / values.len() as f64,
        });
    }
    res
}

fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    cell.label().and_then(|s| s.parse::<NaiveDateTime>().ok())
}

fn satisfaction_trend(table: &RawTable, column: &str) -> Vec<TrendPoint> {
    let (values, times) = match (table.column(column), table.column(TIMESTAMP_COLUMN)) {
        (Some(v), Some(t)) => (&v.cells, &t.cells),
        _ => return Vec::new(),
    };
    let mut points: Vec<(NaiveDateTime, String, f64)> = Vec::new();
    for (v, t) in values.iter().zip(times.iter()) {
        if let (Some(x), Some(at)) = (to_number(v), parse_timestamp(t)) {
            points.push((at, t.label().unwrap_or_default(), x));
        }
    }
    points.sort_by(|a, b| a.0.cmp(&b.0));

    let series: Vec<(i64, f64)> = points
        .iter()
        .map(|(at, _, x)| (at.and_utc().timestamp(), *x))
        .collect();
    let means = rolling_mean(&series, TREND_WINDOW_DAYS * 86_400);
    points
        .into_iter()
        .zip(means)
        .map(|((_, timestamp, value), rolling_mean)| TrendPoint {
            timestamp,
            value,
            rolling_mean,
        })
        .collect()
}

pub fn collected_summary(table: &RawTable, schema: &FormSchema) -> CollectedSummary {
    let table = table.without_empty_rows();
    let choices: Vec<(String, FrequencyTable)> = schema
        .choice_columns()
        .into_iter()
        .filter_map(|name| {
            let ft = FrequencyTable::from_cells(&table.column(&name)?.cells);
            Some((name, ft))
        })
        .collect();

    let headers = table.column_names();
    let trend_column = ExactResolver
        .resolve(&MetricKey::OverallSatisfaction.column_spec(), &headers)
        .map(|s| s.to_string());
    let satisfaction_trend = trend_column
        .as_deref()
        .map(|c| satisfaction_trend(&table, c))
        .unwrap_or_default();

    let res = CollectedSummary {
        sections: section_means(&table, schema),
        choices,
        trend_column,
        satisfaction_trend,
    };
    debug!(
        "collected_summary: {} sections, {} choice fields, {} trend points",
        res.sections.len(),
        res.choices.len(),
        res.satisfaction_trend.len()
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{"sections": [
        {"id": "pessoal", "title": "Pessoal", "fields": [
            {"id": "diretoria", "prompt": "Diretoria", "kind": "singleChoice",
             "options": ["", "Comercial", "Projetos"]},
            {"id": "ano", "prompt": "Ano", "kind": "boundedInteger", "min": 2010}
        ]},
        {"id": "satisfacao_e_orgulho", "title": "Satisfação", "fields": [
            {"id": "satisfacao_geral", "prompt": "Satisfação", "kind": "boundedSlider", "min": 1, "max": 5},
            {"id": "orgulho", "prompt": "Orgulho", "kind": "boundedSlider", "min": 1, "max": 5}
        ]},
        {"id": "ambiente", "title": "Ambiente", "fields": [
            {"id": "respeito", "prompt": "Respeito", "kind": "boundedSlider", "min": 1, "max": 5},
            {"id": "comentario", "prompt": "Comentário", "kind": "longText"}
        ]}
    ]}"#;

    fn table() -> RawTable {
        let headers: Vec<String> = [
            "pessoal.diretoria",
            "pessoal.ano",
            "satisfacao_e_orgulho.satisfacao_geral",
            "satisfacao_e_orgulho.orgulho",
            "ambiente.respeito",
            "timestamp",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let rows: Vec<Vec<CellValue>> = [
            ["Comercial", "2021", "4", "5", "3", "2024-05-01T10:00:00.000000"],
            ["Projetos", "2022", "2", "", "4", "2024-05-09T09:00:00"],
            ["Comercial", "", "3", "4", "", "2024-05-03T08:00:00.500000"],
            ["", "2023", "5", "", "", "not a date"],
        ]
        .iter()
        .map(|r| r.iter().map(|s| CellValue::from_text(s)).collect())
        .collect();
        RawTable::from_rows(&headers, &rows).unwrap()
    }

    #[test]
    fn summary_of_collected_answers() {
        let _ = env_logger::builder().is_test(true).try_init();
        let schema = FormSchema::parse(SCHEMA, "test").unwrap();
        let s = collected_summary(&table(), &schema);

        assert_eq!(s.sections.len(), 2);
        assert_eq!(s.sections[0].id, "satisfacao_e_orgulho");
        assert_eq!(s.sections[0].columns, 2);
        assert_eq!(s.sections[0].answers, 6);
        assert!((s.sections[0].mean - 23.0 / 6.0).abs() < 1e-12);
        assert_eq!(s.sections[1].title, "Ambiente");
        assert_eq!(s.sections[1].mean, 3.5);

        assert_eq!(s.choices.len(), 1);
        assert_eq!(s.choices[0].0, "pessoal.diretoria");
        assert_eq!(s.choices[0].1.count("Comercial"), 2);
        assert_eq!(s.choices[0].1.count("Projetos"), 1);
        assert_eq!(s.choices[0].1.total(), 3);
    }

    #[test]
    fn satisfaction_over_time() {
        let schema = FormSchema::parse(SCHEMA, "test").unwrap();
        let s = collected_summary(&table(), &schema);
        assert_eq!(
            s.trend_column.as_deref(),
            Some("satisfacao_e_orgulho.satisfacao_geral")
        );
        let timestamps: Vec<&str> = s
            .satisfaction_trend
            .iter()
            .map(|p| p.timestamp.as_str())
            .collect();
        assert_eq!(
            timestamps,
            vec![
                "2024-05-01T10:00:00.000000",
                "2024-05-03T08:00:00.500000",
                "2024-05-09T09:00:00"
            ]
        );
        let values: Vec<(f64, f64)> = s
            .satisfaction_trend
            .iter()
            .map(|p| (p.value, p.rolling_mean))
            .collect();
        // The first answer is more than a week before the last one.
        assert_eq!(values, vec![(4.0, 4.0), (3.0, 3.5), (2.0, 2.5)]);
    }

    #[test]
    fn no_answers() {
        let schema = FormSchema::parse(SCHEMA, "test").unwrap();
        let s = collected_summary(&RawTable::default(), &schema);
        assert_eq!(s, CollectedSummary::default());
    }
}
