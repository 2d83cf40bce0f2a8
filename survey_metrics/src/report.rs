use log::info;

use crate::cross::{cross_metrics, CorrelationResult};
use crate::normalize::NormalizedTable;
use crate::resolver::ColumnResolver;
use crate::stats::{round_to, NumericSummary};
use crate::table::RawTable;
use crate::themes::{
    extract_theme, Encoding, MetricKey, MetricResult, Theme, ThemeMetrics, NUMERIC_QUESTIONS,
};

/// The headline numbers of a survey, rounded for display.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Overview {
    pub total_responses: usize,
    pub mean_satisfaction: Option<f64>,
    pub satisfaction_std_dev: Option<f64>,
    pub mean_directorate_hours: Option<f64>,
    pub max_directorate_hours: Option<f64>,
    pub mean_project_hours: Option<f64>,
    pub max_project_hours: Option<f64>,
}

/// Everything the dashboard shows about one table.
///
/// The report is a pure function of the table and of the resolver: building
/// it twice on the same input gives equal reports.
#[derive(PartialEq, Debug, Clone)]
pub struct SummaryReport {
    pub total_responses: usize,
    pub column_count: usize,
    /// One entry per theme, in the order of [Theme::ALL].
    pub themes: Vec<ThemeMetrics>,
    pub correlations: Vec<CorrelationResult>,
    pub insights: Vec<String>,
    /// Summary of every coerced column with at least one number, in table order.
    pub describe: Vec<(String, NumericSummary)>,
    pub overview: Overview,
}

impl SummaryReport {
    pub fn theme(&self, theme: Theme) -> Option<&ThemeMetrics> {
        self.themes.iter().find(|t| t.theme == theme)
    }

    pub fn metric(&self, key: MetricKey) -> Option<&MetricResult> {
        self.theme(key.theme()).and_then(|t| t.get(key))
    }
}

/// The columns to read as numbers: the known numeric questions, and the
/// columns resolved for the scale metrics.
pub fn numeric_allow_list<'a>(headers: &[&'a str], resolver: &dyn ColumnResolver) -> Vec<&'a str> {
    let mut res: Vec<&'a str> = headers
        .iter()
        .copied()
        .filter(|h| NUMERIC_QUESTIONS.contains(h))
        .collect();
    for key in MetricKey::ALL.iter() {
        if key.encoding() != Encoding::Scale {
            continue;
        }
        if let Some(col) = resolver.resolve(&key.column_spec(), headers) {
            if !res.contains(&col) {
                res.push(col);
            }
        }
    }
    res
}

/// Normalizes a table with the numeric columns this crate knows about.
pub fn prepare(raw: &RawTable, resolver: &dyn ColumnResolver) -> NormalizedTable {
    prepare_with(raw, resolver, &[])
}

/// Same as [prepare], also reading the `extra_numeric` columns as numbers,
/// for callers that know which fields of the form are numeric.
pub fn prepare_with(
    raw: &RawTable,
    resolver: &dyn ColumnResolver,
    extra_numeric: &[&str],
) -> NormalizedTable {
    let headers = raw.column_names();
    let mut allow = numeric_allow_list(&headers, resolver);
    for col in extra_numeric.iter() {
        if let Some(h) = headers.iter().find(|h| *h == col) {
            if !allow.contains(h) {
                allow.push(*h);
            }
        }
    }
    NormalizedTable::new(raw, &allow)
}

pub fn build_summary_report(raw: &RawTable, resolver: &dyn ColumnResolver) -> SummaryReport {
    build_summary_report_with(raw, resolver, &[])
}

pub fn build_summary_report_with(
    raw: &RawTable,
    resolver: &dyn ColumnResolver,
    extra_numeric: &[&str],
) -> SummaryReport {
    let table = prepare_with(raw, resolver, extra_numeric);
    let themes: Vec<ThemeMetrics> = Theme::ALL
        .iter()
        .map(|t| extract_theme(*t, &table, resolver))
        .collect();
    let correlations = cross_metrics(&table, resolver);
    let insights: Vec<String> = correlations.iter().filter_map(|c| c.insight()).collect();

    let mut describe = Vec::new();
    for name in table.coerced_columns() {
        let values: Vec<f64> = table
            .numeric(name)
            .unwrap_or(&[])
            .iter()
            .filter_map(|x| *x)
            .collect();
        if let Some(s) = NumericSummary::compute(&values) {
            describe.push((name.to_string(), s));
        }
    }

    let mut report = SummaryReport {
        total_responses: table.num_rows(),
        column_count: table.table().num_columns(),
        themes,
        correlations,
        insights,
        describe,
        overview: Overview::default(),
    };
    report.overview = overview(&report);
    info!(
        "build_summary_report: {} responses, {} metrics, {} correlations",
        report.total_responses,
        report.themes.iter().map(|t| t.metrics.len()).sum::<usize>(),
        report.correlations.len()
    );
    report
}

fn overview(report: &SummaryReport) -> Overview {
    let summary = |key: MetricKey| report.metric(key).and_then(|m| m.summary()).copied();
    let satisfaction = summary(MetricKey::OverallSatisfaction);
    let directorate = summary(MetricKey::DirectorateHours);
    let project = summary(MetricKey::ProjectHours);
    Overview {
        total_responses: report.total_responses,
        mean_satisfaction: satisfaction.map(|s| round_to(s.mean, 2)),
        satisfaction_std_dev: satisfaction.and_then(|s| s.std_dev).map(|x| round_to(x, 2)),
        mean_directorate_hours: directorate.map(|s| round_to(s.mean, 2)),
        max_directorate_hours: directorate.map(|s| s.max),
        mean_project_hours: project.map(|s| round_to(s.mean, 2)),
        max_project_hours: project.map(|s| s.max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ExactResolver, HeuristicResolver};
    use crate::table::CellValue;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let rows: Vec<Vec<CellValue>> = rows
            .iter()
            .map(|r| r.iter().map(|s| CellValue::from_text(s)).collect())
            .collect();
        RawTable::from_rows(&headers, &rows).unwrap()
    }

    fn survey() -> RawTable {
        raw(
            &[
                "O quão satisfeito(a) você está com a IN Junior?",
                "Quantas horas por semana você gasta com tarefas de diretoria?",
                "Quão organizada é a nossa salinha?",
                "Nome",
            ],
            &[
                &["5", "1 a 5 horas", "3", "Ana"],
                &["4", "6 a 10 horas", "x", "Bia"],
                &["", "", "", ""],
                &["3", "Mais de 15 horas", "4", "Caio"],
            ],
        )
    }

    #[test]
    fn report_shape() {
        let _ = env_logger::builder().is_test(true).try_init();
        let r = build_summary_report(&survey(), &HeuristicResolver);
        assert_eq!(r.total_responses, 3);
        assert_eq!(r.column_count, 4);
        assert_eq!(r.themes.len(), 5);
        assert_eq!(
            r.themes.iter().map(|t| t.theme).collect::<Vec<_>>(),
            Theme::ALL.to_vec()
        );
        assert_eq!(r.overview.mean_satisfaction, Some(4.0));
        assert_eq!(r.overview.max_directorate_hours, Some(18.0));
        assert_eq!(r.overview.mean_project_hours, None);
        // Three answers only: cross tabulation, no insight.
        assert_eq!(r.correlations.len(), 1);
        assert!(r.insights.is_empty());
        let described: Vec<&str> = r.describe.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            described,
            vec![
                "O quão satisfeito(a) você está com a IN Junior?",
                "Quão organizada é a nossa salinha?"
            ]
        );
        assert_eq!(r.describe[1].1.count, 2);
    }

    #[test]
    fn building_twice_gives_the_same_report() {
        let t = survey();
        let a = build_summary_report(&t, &HeuristicResolver);
        let b = build_summary_report(&t, &HeuristicResolver);
        assert_eq!(a, b);
        assert_eq!(t, survey());
    }

    #[test]
    fn collected_scales_are_described() {
        let t = raw(
            &["satisfacao_e_orgulho.satisfacao_geral", "informacoes_pessoais.diretoria"],
            &[&["4", "Comercial"], &["2", "Projetos"]],
        );
        let headers = t.column_names();
        assert_eq!(
            numeric_allow_list(&headers, &ExactResolver),
            vec!["satisfacao_e_orgulho.satisfacao_geral"]
        );
        let r = build_summary_report(&t, &ExactResolver);
        assert_eq!(r.describe.len(), 1);
        assert_eq!(r.overview.mean_satisfaction, Some(3.0));
    }

    #[test]
    fn form_columns_are_described() {
        let t = raw(
            &[
                "satisfacao_e_orgulho.satisfacao_geral",
                "ambiente_de_trabalho.respeito_e_cordialidade",
                "satisfacao_e_orgulho.orgulho_de_trabalhar",
                "informacoes_pessoais.diretoria",
            ],
            &[&["4", "5", "3", "Comercial"], &["2", "4", "", "Projetos"]],
        );
        let r = build_summary_report_with(
            &t,
            &ExactResolver,
            &[
                "ambiente_de_trabalho.respeito_e_cordialidade",
                "satisfacao_e_orgulho.orgulho_de_trabalhar",
                "satisfacao_e_orgulho.satisfacao_geral",
                "cultura_e_bem_estar.equilibrio",
            ],
        );
        let described: Vec<&str> = r.describe.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            described,
            vec![
                "satisfacao_e_orgulho.satisfacao_geral",
                "ambiente_de_trabalho.respeito_e_cordialidade",
                "satisfacao_e_orgulho.orgulho_de_trabalhar",
            ]
        );
        assert_eq!(r.describe[1].1.mean, 4.5);
        assert_eq!(r.describe[2].1.count, 1);
        // The themes do not change.
        assert_eq!(r.themes, build_summary_report(&t, &ExactResolver).themes);
    }

    #[test]
    fn empty_table() {
        let r = build_summary_report(&RawTable::default(), &HeuristicResolver);
        assert_eq!(r.total_responses, 0);
        assert!(r.themes.iter().all(|t| t.metrics.is_empty()));
        assert_eq!(r.themes[0].unavailable.len(), 1);
        assert!(r.correlations.is_empty());
    }
}
