//! The fixed set of metrics of the climate survey, grouped by theme, and the
//! extractors that compute them from a normalized table.

use log::{debug, warn};

use crate::categorical::{
    categorize, CategoricalMapping, FrequencyTable, CONCURRENT_PROJECTS, DIRECTORATE_HOURS,
    PROJECT_HOURS,
};
use crate::normalize::{coerce_column, NormalizedTable};
use crate::resolver::{ColumnResolver, ColumnSpec, KeywordRule};
use crate::stats::NumericSummary;
use crate::table::CellValue;

/// The questions of the survey export that hold numbers: bounded scales and
/// open quantities. The workload buckets are not part of this list.
pub const NUMERIC_QUESTIONS: &[&str] = &[
    "O quão organizada você considera a DE?",
    "O quão acessível é o seu/sua diretor(a)?",
    "Quão bem os integrantes de sua diretoria se comunicam entre si?",
    "Quanto você se relaciona com membros de outras diretorias?",
    "O quão satisfatória é a delegação de tarefas na sua diretoria?",
    "O quão você se sente preparado para realizar as suas tarefas de diretoria?",
    "Quão bem os integrantes da sua diretoria compartilham as responsabilidades pelas tarefas?",
    "O quanto você se sente preparado(a) para conceder feedback para os membros da sua equipe?",
    "O quanto você concede feedback para os membros da sua equipe?",
    "Com que frequência seu/sua diretor(a) ouve seus assessores para tomar decisões?",
    "Com que frequência você recebe feedback de seu/sua diretor(a)?",
    "De forma geral, o quanto você está satisfeito(a) com seu/sua gerente?",
    "O quão satisfeito(a) você está com a atuação da sua equipe no(s) projeto(s) que você participa?",
    "O quão satisfeito(a) você está com o seu desempenho nas tarefas de projeto?",
    "O quanto você acha os plantões relevantes para a realização de um projeto?",
    "Quão organizada é a nossa salinha?",
    "O quanto você acha importante participar dos eventos da empresa? (RG's, reuniões, p{IN}zza...)",
    "O quanto você se sente ouvido(a) dentro da empresa?",
    "O quão satisfeito(a) você está com a IN Junior?",
    "Qual a carga horária diária do seu estágio/trabalho?",
];

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum Theme {
    Satisfaction,
    OrganizationalStructure,
    Workload,
    FeedbackCulture,
    Engagement,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Satisfaction,
        Theme::OrganizationalStructure,
        Theme::Workload,
        Theme::FeedbackCulture,
        Theme::Engagement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Satisfaction => "satisfacao",
            Theme::OrganizationalStructure => "estrutura_organizacional",
            Theme::Workload => "carga_trabalho",
            Theme::FeedbackCulture => "cultura_feedback",
            Theme::Engagement => "engajamento",
        }
    }

    pub fn metrics(&self) -> &'static [MetricKey] {
        use MetricKey::*;
        match self {
            Theme::Satisfaction => &[OverallSatisfaction],
            Theme::OrganizationalStructure => &[
                OrganizationClarity,
                DirectorAccessibility,
                InternalCommunication,
            ],
            Theme::Workload => &[DirectorateHours, ProjectHours, ConcurrentProjects],
            Theme::FeedbackCulture => &[
                FeedbackReadiness,
                FeedbackGivenFrequency,
                FeedbackReceivedFrequency,
            ],
            Theme::Engagement => &[EventImportance, FeltHeard],
        }
    }
}

/// The logical metrics. Their string keys are stable and appear in the reports.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum MetricKey {
    OverallSatisfaction,
    OrganizationClarity,
    DirectorAccessibility,
    InternalCommunication,
    DirectorateHours,
    ProjectHours,
    ConcurrentProjects,
    FeedbackReadiness,
    FeedbackGivenFrequency,
    FeedbackReceivedFrequency,
    EventImportance,
    FeltHeard,
}

/// How the answers of a metric are turned into numbers.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Encoding {
    /// The answers are numbers already (scales, quantities).
    Scale,
    /// The answers are labels from a known set of buckets.
    Buckets(&'static CategoricalMapping),
}

impl MetricKey {
    pub const ALL: [MetricKey; 12] = [
        MetricKey::OverallSatisfaction,
        MetricKey::OrganizationClarity,
        MetricKey::DirectorAccessibility,
        MetricKey::InternalCommunication,
        MetricKey::DirectorateHours,
        MetricKey::ProjectHours,
        MetricKey::ConcurrentProjects,
        MetricKey::FeedbackReadiness,
        MetricKey::FeedbackGivenFrequency,
        MetricKey::FeedbackReceivedFrequency,
        MetricKey::EventImportance,
        MetricKey::FeltHeard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::OverallSatisfaction => "satisfacao_geral",
            MetricKey::OrganizationClarity => "organizacao_de",
            MetricKey::DirectorAccessibility => "acessibilidade_diretor",
            MetricKey::InternalCommunication => "comunicacao_interna",
            MetricKey::DirectorateHours => "horas_semanais_diretoria",
            MetricKey::ProjectHours => "horas_semanais_projeto",
            MetricKey::ConcurrentProjects => "projetos_simultaneos",
            MetricKey::FeedbackReadiness => "preparacao_feedback",
            MetricKey::FeedbackGivenFrequency => "frequencia_feedback_dado",
            MetricKey::FeedbackReceivedFrequency => "frequencia_feedback_recebido",
            MetricKey::EventImportance => "importancia_eventos",
            MetricKey::FeltHeard => "sentimento_ouvido",
        }
    }

    /// The name shown to readers of the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            MetricKey::OverallSatisfaction => "Satisfação Geral",
            MetricKey::OrganizationClarity => "Organização DE",
            MetricKey::DirectorAccessibility => "Acessibilidade do Diretor",
            MetricKey::InternalCommunication => "Comunicação Interna",
            MetricKey::DirectorateHours => "Horas Diretoria/Semana",
            MetricKey::ProjectHours => "Horas Projeto/Semana",
            MetricKey::ConcurrentProjects => "Projetos Simultâneos",
            MetricKey::FeedbackReadiness => "Preparação para Feedback",
            MetricKey::FeedbackGivenFrequency => "Feedback Concedido",
            MetricKey::FeedbackReceivedFrequency => "Feedback Recebido",
            MetricKey::EventImportance => "Importância dos Eventos",
            MetricKey::FeltHeard => "Sentimento de Ser Ouvido",
        }
    }

    pub fn theme(&self) -> Theme {
        Theme::ALL
            .iter()
            .copied()
            .find(|t| t.metrics().contains(self))
            .unwrap_or(Theme::Satisfaction)
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            MetricKey::DirectorateHours => Encoding::Buckets(&DIRECTORATE_HOURS),
            MetricKey::ProjectHours => Encoding::Buckets(&PROJECT_HOURS),
            MetricKey::ConcurrentProjects => Encoding::Buckets(&CONCURRENT_PROJECTS),
            _ => Encoding::Scale,
        }
    }

    /// The wordings under which this metric is known, both in the survey
    /// exports and in the `section.field` namespace of the collected answers.
    pub fn column_spec(&self) -> ColumnSpec {
        match self {
            MetricKey::OverallSatisfaction => ColumnSpec::exact(&[
                "O quão satisfeito(a) você está com a IN Junior?",
                "satisfacao_e_orgulho.satisfacao_geral",
                "satisfacao.satisfacao_geral",
            ])
            .with_keywords(vec![KeywordRule::all_of(&["satisfeito", "in junior"])]),
            MetricKey::OrganizationClarity => {
                ColumnSpec::exact(&["O quão organizada você considera a DE?"])
            }
            MetricKey::DirectorAccessibility => ColumnSpec::exact(&[
                "O quão acessível é o seu/sua diretor(a)?",
                "lideranca_e_gestao.acessibilidade_diretor",
            ]),
            MetricKey::InternalCommunication => ColumnSpec::exact(&[
                "Quão bem os integrantes de sua diretoria se comunicam entre si?",
                "lideranca_e_gestao.comunicacao_diretoria",
            ]),
            MetricKey::DirectorateHours => ColumnSpec::exact(&[
                "Quantas horas por semana você gasta com tarefas de diretoria?",
                "Horas diretoria",
                "Horas por semana - diretoria",
                "Quantas horas você dedica semanalmente às tarefas de diretoria?",
            ])
            .with_keywords(vec![KeywordRule::all_of(&["hora", "diretoria"])]),
            MetricKey::ProjectHours => ColumnSpec::exact(&[
                "Quantas horas semanalmente você gasta com tarefas de projeto?",
                "Horas projeto",
                "Horas por semana - projeto",
                "Quantas horas você dedica semanalmente aos projetos?",
            ])
            .with_keywords(vec![KeywordRule::all_of(&["hora", "projeto"])]),
            MetricKey::ConcurrentProjects => ColumnSpec::exact(&[
                "Quantos projetos você está realizando na IN Junior atualmente?",
                "Número de projetos",
                "Projetos atuais",
                "Quantos projetos você está realizando atualmente?",
            ])
            .with_keywords(vec![
                KeywordRule::all_of(&["projeto", "quantos"]),
                KeywordRule::all_of(&["projeto", "número"]),
                KeywordRule::all_of(&["projeto", "atual"]),
                KeywordRule::all_of(&["projeto", "junior"]),
            ]),
            MetricKey::FeedbackReadiness => ColumnSpec::exact(&[
                "O quanto você se sente preparado(a) para conceder feedback para os membros da sua equipe?",
            ]),
            MetricKey::FeedbackGivenFrequency => ColumnSpec::exact(&[
                "O quanto você concede feedback para os membros da sua equipe?",
            ]),
            MetricKey::FeedbackReceivedFrequency => ColumnSpec::exact(&[
                "Com que frequência você recebe feedback de seu/sua diretor(a)?",
            ]),
            MetricKey::EventImportance => ColumnSpec::exact(&[
                "O quanto você acha importante participar dos eventos da empresa? (RG's, reuniões, p{IN}zza...)",
            ]),
            MetricKey::FeltHeard => ColumnSpec::exact(&[
                "O quanto você se sente ouvido(a) dentro da empresa?",
                "satisfacao_e_orgulho.sentimento_de_ser_ouvido",
            ]),
        }
    }
}

/// The statistics of a metric, by strength of what could be computed.
#[derive(PartialEq, Debug, Clone)]
pub enum MetricStats {
    /// Bucketed metrics keep the frequencies of their labels next to the
    /// summary of the mapped numbers.
    Numeric {
        summary: NumericSummary,
        frequencies: Option<FrequencyTable>,
    },
    /// No answer could be read as a number.
    Categorical(FrequencyTable),
}

#[derive(PartialEq, Debug, Clone)]
pub struct MetricResult {
    pub key: MetricKey,
    /// The column chosen by the resolver.
    pub column: String,
    pub response_count: usize,
    /// The valid answers, in row order, for charting: numbers for scales,
    /// the original labels otherwise.
    pub values: Vec<CellValue>,
    /// Row position and number of every answer that has a numeric reading.
    pub numeric: Vec<(usize, f64)>,
    pub stats: MetricStats,
}

impl MetricResult {
    pub fn summary(&self) -> Option<&NumericSummary> {
        match &self.stats {
            MetricStats::Numeric { summary, .. } => Some(summary),
            MetricStats::Categorical(_) => None,
        }
    }

    pub fn frequencies(&self) -> Option<&FrequencyTable> {
        match &self.stats {
            MetricStats::Numeric { frequencies, .. } => frequencies.as_ref(),
            MetricStats::Categorical(ft) => Some(ft),
        }
    }
}

/// Why a metric does not appear in a report.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Unavailable {
    ColumnNotFound,
    NoValidResponses { column: String },
}

impl Unavailable {
    pub fn reason(&self) -> String {
        match self {
            Unavailable::ColumnNotFound => "no matching column in the data".to_string(),
            Unavailable::NoValidResponses { column } => {
                format!("column {:?} has no valid response", column)
            }
        }
    }
}

/// The metrics of one theme that could be computed, and the others.
#[derive(PartialEq, Debug, Clone)]
pub struct ThemeMetrics {
    pub theme: Theme,
    pub metrics: Vec<MetricResult>,
    pub unavailable: Vec<(MetricKey, Unavailable)>,
}

impl ThemeMetrics {
    pub fn get(&self, key: MetricKey) -> Option<&MetricResult> {
        self.metrics.iter().find(|m| m.key == key)
    }
}

/// Computes one metric. A missing column or a column without any valid
/// answer is reported, never raised.
pub fn extract_metric(
    key: MetricKey,
    table: &NormalizedTable,
    resolver: &dyn ColumnResolver,
) -> Result<MetricResult, Unavailable> {
    let headers = table.column_names();
    let column = match resolver.resolve(&key.column_spec(), &headers) {
        Some(c) => c.to_string(),
        None => return Err(Unavailable::ColumnNotFound),
    };
    debug!("extract_metric: {} -> {:?}", key.as_str(), column);
    let cells = table.cells(&column).unwrap_or(&[]);
    let valid: Vec<CellValue> = cells.iter().filter(|c| !c.is_missing()).cloned().collect();

    match key.encoding() {
        Encoding::Scale => {
            let numbers = match table.numeric(&column) {
                Some(nums) => nums.to_vec(),
                None => coerce_column(cells),
            };
            let numeric: Vec<(usize, f64)> = numbers
                .iter()
                .enumerate()
                .filter_map(|(idx, x)| x.map(|v| (idx, v)))
                .collect();
            let values: Vec<f64> = numeric.iter().map(|(_, v)| *v).collect();
            match NumericSummary::compute(&values) {
                Some(summary) => Ok(MetricResult {
                    key,
                    column,
                    response_count: values.len(),
                    values: values.iter().map(|v| CellValue::Number(*v)).collect(),
                    numeric,
                    stats: MetricStats::Numeric {
                        summary,
                        frequencies: None,
                    },
                }),
                None if valid.is_empty() => Err(Unavailable::NoValidResponses { column }),
                None => {
                    warn!(
                        "extract_metric: {}: no numeric answer in {:?}, using frequencies",
                        key.as_str(),
                        column
                    );
                    Ok(MetricResult {
                        key,
                        column,
                        response_count: valid.len(),
                        stats: MetricStats::Categorical(FrequencyTable::from_cells(&valid)),
                        values: valid,
                        numeric: Vec::new(),
                    })
                }
            }
        }
        Encoding::Buckets(mapping) => {
            if valid.is_empty() {
                return Err(Unavailable::NoValidResponses { column });
            }
            let categorized = categorize(cells, Some(mapping));
            let numeric = categorized.numeric.unwrap_or_default();
            let values: Vec<f64> = numeric.iter().map(|(_, v)| *v).collect();
            let stats = match NumericSummary::compute(&values) {
                Some(summary) => MetricStats::Numeric {
                    summary,
                    frequencies: Some(categorized.frequencies),
                },
                None => MetricStats::Categorical(categorized.frequencies),
            };
            Ok(MetricResult {
                key,
                column,
                response_count: valid.len(),
                values: valid,
                numeric,
                stats,
            })
        }
    }
}

pub fn extract_theme(
    theme: Theme,
    table: &NormalizedTable,
    resolver: &dyn ColumnResolver,
) -> ThemeMetrics {
    let mut metrics = Vec::new();
    let mut unavailable = Vec::new();
    for key in theme.metrics() {
        match extract_metric(*key, table, resolver) {
            Ok(m) => metrics.push(m),
            Err(u) => {
                debug!("extract_theme: {} unavailable: {}", key.as_str(), u.reason());
                unavailable.push((*key, u));
            }
        }
    }
    ThemeMetrics {
        theme,
        metrics,
        unavailable,
    }
}

pub fn satisfaction_metrics(table: &NormalizedTable, resolver: &dyn ColumnResolver) -> ThemeMetrics {
    extract_theme(Theme::Satisfaction, table, resolver)
}

pub fn organizational_metrics(table: &NormalizedTable, resolver: &dyn ColumnResolver) -> ThemeMetrics {
    extract_theme(Theme::OrganizationalStructure, table, resolver)
}

pub fn workload_metrics(table: &NormalizedTable, resolver: &dyn ColumnResolver) -> ThemeMetrics {
    extract_theme(Theme::Workload, table, resolver)
}

pub fn feedback_metrics(table: &NormalizedTable, resolver: &dyn ColumnResolver) -> ThemeMetrics {
    extract_theme(Theme::FeedbackCulture, table, resolver)
}

pub fn engagement_metrics(table: &NormalizedTable, resolver: &dyn ColumnResolver) -> ThemeMetrics {
    extract_theme(Theme::Engagement, table, resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ExactResolver, HeuristicResolver};
    use crate::table::RawTable;

    const SATISFACTION: &str = "O quão satisfeito(a) você está com a IN Junior?";
    const DIR_HOURS: &str = "Quantas horas por semana você gasta com tarefas de diretoria?";

    fn normalized(headers: &[&str], rows: &[&[&str]]) -> NormalizedTable {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let rows: Vec<Vec<CellValue>> = rows
            .iter()
            .map(|r| r.iter().map(|s| CellValue::from_text(s)).collect())
            .collect();
        let raw = RawTable::from_rows(&headers, &rows).unwrap();
        NormalizedTable::new(&raw, NUMERIC_QUESTIONS)
    }

    #[test]
    fn every_metric_belongs_to_one_theme() {
        for key in MetricKey::ALL.iter() {
            let owners: Vec<&Theme> = Theme::ALL
                .iter()
                .filter(|t| t.metrics().contains(key))
                .collect();
            assert_eq!(owners.len(), 1, "{:?}", key);
            assert_eq!(*owners[0], key.theme());
        }
    }

    #[test]
    fn workload_columns_are_not_blindly_coerced() {
        assert!(!NUMERIC_QUESTIONS.contains(&DIR_HOURS));
        assert!(NUMERIC_QUESTIONS.contains(&SATISFACTION));
    }

    #[test]
    fn satisfaction_numeric_summary() {
        let nt = normalized(
            &[SATISFACTION],
            &[&["5"], &["4"], &["x"], &["3"], &["2"], &["1"]],
        );
        let tm = satisfaction_metrics(&nt, &HeuristicResolver);
        let m = tm.get(MetricKey::OverallSatisfaction).unwrap();
        assert_eq!(m.response_count, 5);
        let s = m.summary().unwrap();
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.rounded(2).std_dev, Some(1.58));
        // Row 2 did not survive the coercion.
        assert!(m.numeric.iter().all(|(idx, _)| *idx != 2));
        assert_eq!(m.frequencies(), None);
    }

    #[test]
    fn non_numeric_scale_falls_back_to_frequencies() {
        let nt = normalized(
            &["Quão organizada é a nossa salinha?", "satisfacao_e_orgulho.satisfacao_geral"],
            &[&["1", "Muito"], &["2", "Pouco"], &["3", "Muito"]],
        );
        let m = extract_metric(MetricKey::OverallSatisfaction, &nt, &ExactResolver).unwrap();
        assert_eq!(m.summary(), None);
        assert_eq!(m.response_count, 3);
        assert_eq!(m.frequencies().unwrap().count("Muito"), 2);
    }

    #[test]
    fn missing_and_empty_metrics_are_unavailable() {
        let nt = normalized(
            &["O quão organizada você considera a DE?", "Outra"],
            &[&["", "a"], &["", "b"]],
        );
        let tm = organizational_metrics(&nt, &HeuristicResolver);
        assert!(tm.metrics.is_empty());
        assert_eq!(tm.unavailable.len(), 3);
        assert_eq!(
            tm.unavailable[0],
            (
                MetricKey::OrganizationClarity,
                Unavailable::NoValidResponses {
                    column: "O quão organizada você considera a DE?".to_string()
                }
            )
        );
        assert_eq!(tm.unavailable[1].1, Unavailable::ColumnNotFound);
    }

    #[test]
    fn workload_keeps_labels_and_maps_numbers() {
        let nt = normalized(
            &["Horas dedicadas à diretoria", "Número de projetos"],
            &[
                &["1 a 5 horas", "Um"],
                &["6 a 10 horas", "Vários"],
                &["6 a 10 horas", ""],
                &["Não sei", "Dois"],
            ],
        );
        let tm = workload_metrics(&nt, &HeuristicResolver);
        let hours = tm.get(MetricKey::DirectorateHours).unwrap();
        assert_eq!(hours.column, "Horas dedicadas à diretoria");
        assert_eq!(hours.response_count, 4);
        assert_eq!(hours.numeric, vec![(0, 3.0), (1, 8.0), (2, 8.0)]);
        let freq = hours.frequencies().unwrap();
        assert_eq!(freq.entries[0], ("6 a 10 horas".to_string(), 2));
        assert_eq!(freq.count("Não sei"), 1);
        let s = hours.summary().unwrap();
        assert_eq!(s.max, 8.0);

        let projects = tm.get(MetricKey::ConcurrentProjects).unwrap();
        assert_eq!(projects.response_count, 3);
        assert_eq!(projects.numeric, vec![(0, 1.0), (3, 2.0)]);
        assert_eq!(
            tm.unavailable,
            vec![(MetricKey::ProjectHours, Unavailable::ColumnNotFound)]
        );
    }

    #[test]
    fn unmappable_buckets_stay_categorical() {
        let nt = normalized(&[DIR_HOURS], &[&["muitas"], &["poucas"]]);
        let m = extract_metric(MetricKey::DirectorateHours, &nt, &HeuristicResolver).unwrap();
        assert!(matches!(m.stats, MetricStats::Categorical(_)));
        assert!(m.numeric.is_empty());
    }

    #[test]
    fn collected_namespace_resolves_exactly() {
        let nt = normalized(
            &[
                "lideranca_e_gestao.acessibilidade_diretor",
                "satisfacao_e_orgulho.sentimento_de_ser_ouvido",
            ],
            &[&["4", "5"], &["2", "3"]],
        );
        let org = organizational_metrics(&nt, &ExactResolver);
        assert_eq!(
            org.get(MetricKey::DirectorAccessibility).unwrap().summary().unwrap().mean,
            3.0
        );
        let eng = engagement_metrics(&nt, &ExactResolver);
        assert_eq!(eng.get(MetricKey::FeltHeard).unwrap().response_count, 2);
        assert!(feedback_metrics(&nt, &ExactResolver).metrics.is_empty());
    }
}
