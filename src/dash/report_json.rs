// Rendering of the summary report as JSON.

use serde_json::{json, Map as JSMap};

use crate::dash::collected::{CollectedSummary, TREND_WINDOW_DAYS};
use crate::dash::*;

/// Statistics are shown with this many decimals.
const DISPLAY_DECIMALS: u32 = 2;

fn summary_to_json(s: &NumericSummary) -> JSValue {
    let r = s.rounded(DISPLAY_DECIMALS);
    json!({
        "count": r.count,
        "mean": r.mean,
        "median": r.median,
        "stdDev": r.std_dev,
        "p25": r.p25,
        "p75": r.p75,
        "min": r.min,
        "max": r.max,
    })
}

fn frequencies_to_json(ft: &FrequencyTable) -> JSValue {
    let l: Vec<JSValue> = ft
        .entries
        .iter()
        .map(|(label, count)| json!([label, count]))
        .collect();
    JSValue::Array(l)
}

fn metric_to_json(m: &MetricResult) -> JSValue {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    res.insert("label".to_string(), json!(m.key.label()));
    res.insert("column".to_string(), json!(m.column));
    res.insert("responses".to_string(), json!(m.response_count));
    let kind = match m.stats {
        MetricStats::Numeric { .. } => "numeric",
        MetricStats::Categorical(_) => "categorical",
    };
    res.insert("kind".to_string(), json!(kind));
    if let Some(s) = m.summary() {
        res.insert("stats".to_string(), summary_to_json(s));
    }
    if let Some(ft) = m.frequencies() {
        res.insert("frequencies".to_string(), frequencies_to_json(ft));
    }
    JSValue::Object(res)
}

fn points_to_json(points: &[(f64, f64)]) -> JSValue {
    JSValue::Array(points.iter().map(|(x, y)| json!([x, y])).collect())
}

fn correlation_to_json(c: &CorrelationResult) -> JSValue {
    match &c.outcome {
        CrossOutcome::Pearson {
            coefficient,
            p_value,
            significant,
            sample_size,
            points,
        } => json!({
            "kind": "pearson",
            "label": c.pair.label(),
            "coefficient": coefficient,
            "pValue": p_value,
            "significant": significant,
            "sampleSize": sample_size,
            "points": points_to_json(points),
        }),
        CrossOutcome::Undefined {
            sample_size,
            points,
        } => json!({
            "kind": "undefined",
            "label": c.pair.label(),
            "sampleSize": sample_size,
            "points": points_to_json(points),
        }),
        CrossOutcome::CrossTab { table, sample_size } => {
            let counts: Vec<JSValue> = table
                .counts
                .iter()
                .map(|((row, col), n)| json!([row, col, n]))
                .collect();
            json!({
                "kind": "crosstab",
                "label": c.pair.label(),
                "sampleSize": sample_size,
                "counts": counts,
            })
        }
    }
}

fn overview_to_json(o: &Overview) -> JSValue {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    res.insert("totalResponses".to_string(), json!(o.total_responses));
    let fields = [
        ("meanSatisfaction", o.mean_satisfaction),
        ("satisfactionStdDev", o.satisfaction_std_dev),
        ("meanDirectorateHours", o.mean_directorate_hours),
        ("maxDirectorateHours", o.max_directorate_hours),
        ("meanProjectHours", o.mean_project_hours),
        ("maxProjectHours", o.max_project_hours),
    ];
    for (name, v) in fields.iter() {
        if let Some(x) = v {
            res.insert(name.to_string(), json!(x));
        }
    }
    JSValue::Object(res)
}

/// The report in the layout read by the dashboard. Keys come out in a fixed
/// order, so equal reports give identical documents.
pub fn report_to_json(survey_name: &str, report: &SummaryReport) -> JSValue {
    let mut themes: JSMap<String, JSValue> = JSMap::new();
    let mut unavailable: Vec<JSValue> = Vec::new();
    for tm in report.themes.iter() {
        let mut metrics: JSMap<String, JSValue> = JSMap::new();
        for m in tm.metrics.iter() {
            metrics.insert(m.key.as_str().to_string(), metric_to_json(m));
        }
        themes.insert(tm.theme.as_str().to_string(), JSValue::Object(metrics));
        for (key, why) in tm.unavailable.iter() {
            unavailable.push(json!({
                "metric": key.as_str(),
                "theme": tm.theme.as_str(),
                "reason": why.reason(),
            }));
        }
    }

    let mut correlations: JSMap<String, JSValue> = JSMap::new();
    for c in report.correlations.iter() {
        correlations.insert(c.pair.as_str().to_string(), correlation_to_json(c));
    }

    let mut describe: JSMap<String, JSValue> = JSMap::new();
    for (name, s) in report.describe.iter() {
        describe.insert(name.clone(), summary_to_json(s));
    }

    json!({
        "survey": survey_name,
        "info": {
            "totalResponses": report.total_responses,
            "columnCount": report.column_count,
        },
        "overview": overview_to_json(&report.overview),
        "themes": themes,
        "unavailable": unavailable,
        "correlations": correlations,
        "insights": report.insights,
        "describe": describe,
    })
}

fn collected_to_json(c: &CollectedSummary) -> JSValue {
    let sections: Vec<JSValue> = c
        .sections
        .iter()
        .map(|s| {
            json!({
                "section": s.id,
                "title": s.title,
                "columns": s.columns,
                "answers": s.answers,
                "mean": round_to(s.mean, DISPLAY_DECIMALS),
            })
        })
        .collect();
    let mut choices: JSMap<String, JSValue> = JSMap::new();
    for (name, ft) in c.choices.iter() {
        choices.insert(name.clone(), frequencies_to_json(ft));
    }
    let mut res: JSMap<String, JSValue> = JSMap::new();
    res.insert("sections".to_string(), JSValue::Array(sections));
    res.insert("choices".to_string(), JSValue::Object(choices));
    if let Some(column) = &c.trend_column {
        let points: Vec<JSValue> = c
            .satisfaction_trend
            .iter()
            .map(|p| json!([p.timestamp, p.value, round_to(p.rolling_mean, DISPLAY_DECIMALS)]))
            .collect();
        res.insert(
            "satisfactionTrend".to_string(),
            json!({
                "column": column,
                "windowDays": TREND_WINDOW_DAYS,
                "points": points,
            }),
        );
    }
    JSValue::Object(res)
}

/// The report of the collected answers: the survey report, followed by the
/// aggregates that come from the form.
pub fn history_to_json(
    survey_name: &str,
    report: &SummaryReport,
    collected: &CollectedSummary,
) -> JSValue {
    let mut js = report_to_json(survey_name, report);
    if let JSValue::Object(m) = &mut js {
        m.insert("collected".to_string(), collected_to_json(collected));
    }
    js
}
