/*!
Form schemas of the collector, and validation of the submitted answers.

A schema is an ordered list of sections, each with an ordered list of
fields. The column namespace of the collected answers (`section.field`, then
`timestamp`) is derived from the schema when it is loaded.
*/

use std::collections::HashSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JSMap};

use crate::dash::*;

const BUILTIN_SCHEMA: &str = include_str!("../../forms/pesquisa_clima.json");

pub const TIMESTAMP_COLUMN: &str = "timestamp";

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FieldKind {
    #[serde(rename = "shortText")]
    ShortText,
    #[serde(rename = "singleChoice")]
    SingleChoice { options: Vec<String> },
    #[serde(rename = "boundedInteger")]
    BoundedInteger { min: Option<i64>, max: Option<i64> },
    #[serde(rename = "boundedSlider")]
    BoundedSlider { min: i64, max: i64 },
    #[serde(rename = "longText")]
    LongText,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SectionDef {
    pub id: String,
    pub title: String,
    pub fields: Vec<FieldDef>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct SchemaDoc {
    name: Option<String>,
    sections: Vec<SectionDef>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct FormSchema {
    name: String,
    sections: Vec<SectionDef>,
    columns: Vec<String>,
}

/// An accepted answer.
#[derive(PartialEq, Debug, Clone)]
pub enum Answer {
    Text(String),
    Integer(i64),
    Absent,
}

impl Answer {
    fn to_json(&self) -> JSValue {
        match self {
            Answer::Text(s) => json!(s),
            Answer::Integer(i) => json!(i),
            Answer::Absent => JSValue::Null,
        }
    }

    fn to_cell(&self) -> CellValue {
        match self {
            Answer::Text(s) => CellValue::Text(s.clone()),
            Answer::Integer(i) => CellValue::Number(*i as f64),
            Answer::Absent => CellValue::Missing,
        }
    }
}

/// Something wrong with a submission. The column is `section.field`.
#[derive(PartialEq, Debug, Clone)]
pub enum Violation {
    NotAnObject { key: String },
    MissingRequired { column: String },
    NotAnOption { column: String, value: String },
    NotAnInteger { column: String, value: String },
    OutOfBounds {
        column: String,
        value: i64,
        min: Option<i64>,
        max: Option<i64>,
    },
    WrongType { column: String, expected: &'static str },
    UnknownSection { section: String },
    UnknownField { column: String },
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::NotAnObject { key } if key.is_empty() => {
                write!(f, "the answers must be a JSON object")
            }
            Violation::NotAnObject { key } => write!(f, "{}: expected an object of fields", key),
            Violation::MissingRequired { column } => write!(f, "{}: an answer is required", column),
            Violation::NotAnOption { column, value } => {
                write!(f, "{}: {:?} is not one of the options", column, value)
            }
            Violation::NotAnInteger { column, value } => {
                write!(f, "{}: {} is not an integer", column, value)
            }
            Violation::OutOfBounds {
                column,
                value,
                min,
                max,
            } => {
                let lo = min.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string());
                let hi = max.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string());
                write!(f, "{}: {} is outside of [{}, {}]", column, value, lo, hi)
            }
            Violation::WrongType { column, expected } => {
                write!(f, "{}: expected {}", column, expected)
            }
            Violation::UnknownSection { section } => write!(f, "{}: unknown section", section),
            Violation::UnknownField { column } => write!(f, "{}: unknown field", column),
        }
    }
}

/// A validated set of answers, with one answer per field of the schema, in
/// schema order.
#[derive(PartialEq, Debug, Clone)]
pub struct Submission {
    answers: Vec<(String, String, Answer)>,
}

impl Submission {
    pub fn answer(&self, section: &str, field: &str) -> Option<&Answer> {
        self.answers
            .iter()
            .find(|(s, f, _)| s == section && f == field)
            .map(|(_, _, a)| a)
    }

    /// The JSON record as stored: sections containing fields, plus the timestamp.
    pub fn to_record(&self, timestamp: &str) -> JSValue {
        let mut res = JSMap::new();
        for (section, field, answer) in self.answers.iter() {
            let entry = res
                .entry(section.clone())
                .or_insert_with(|| JSValue::Object(JSMap::new()));
            if let JSValue::Object(m) = entry {
                m.insert(field.clone(), answer.to_json());
            }
        }
        res.insert(TIMESTAMP_COLUMN.to_string(), json!(timestamp));
        JSValue::Object(res)
    }

    /// The answers under their `section.field` column names.
    pub fn flatten(&self) -> Vec<(String, CellValue)> {
        self.answers
            .iter()
            .map(|(s, f, a)| (format!("{}.{}", s, f), a.to_cell()))
            .collect()
    }
}

impl FormSchema {
    pub fn parse(contents: &str, origin: &str) -> BDashResult<FormSchema> {
        let doc: SchemaDoc =
            serde_json::from_str(contents).context(ParsingJsonSnafu { path: origin })?;
        let schema = FormSchema::from_doc(doc)?;
        debug!(
            "FormSchema::parse: {:?}: {} sections, {} columns",
            origin,
            schema.sections.len(),
            schema.columns.len()
        );
        Ok(schema)
    }

    pub fn read(path: &str) -> BDashResult<FormSchema> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        FormSchema::parse(&contents, path)
    }

    /// The organizational climate survey.
    pub fn builtin() -> BDashResult<FormSchema> {
        FormSchema::parse(BUILTIN_SCHEMA, "<builtin>")
    }

    fn from_doc(doc: SchemaDoc) -> DashResult<FormSchema> {
        let mut section_ids: HashSet<&str> = HashSet::new();
        let mut columns: Vec<String> = Vec::new();
        for section in doc.sections.iter() {
            if !section_ids.insert(section.id.as_str()) {
                return InvalidSchemaSnafu {
                    message: format!("duplicate section {:?}", section.id),
                }
                .fail();
            }
            let mut field_ids: HashSet<&str> = HashSet::new();
            for field in section.fields.iter() {
                let column = format!("{}.{}", section.id, field.id);
                if !field_ids.insert(field.id.as_str()) {
                    return InvalidSchemaSnafu {
                        message: format!("duplicate field {:?}", column),
                    }
                    .fail();
                }
                check_constraints(&column, &field.kind)?;
                columns.push(column);
            }
        }
        columns.push(TIMESTAMP_COLUMN.to_string());
        Ok(FormSchema {
            name: doc.name.unwrap_or_else(|| "Pesquisa".to_string()),
            sections: doc.sections,
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sections(&self) -> &[SectionDef] {
        &self.sections
    }

    /// The column names of the collected answers, `timestamp` last.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn columns_of_kind(&self, keep: fn(&FieldKind) -> bool) -> Vec<String> {
        let mut res = Vec::new();
        for section in self.sections.iter() {
            for field in section.fields.iter().filter(|f| keep(&f.kind)) {
                res.push(format!("{}.{}", section.id, field.id));
            }
        }
        res
    }

    /// The columns whose answers are integers: bounded integers and sliders.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_of_kind(|k| {
            matches!(
                k,
                FieldKind::BoundedInteger { .. } | FieldKind::BoundedSlider { .. }
            )
        })
    }

    pub fn choice_columns(&self) -> Vec<String> {
        self.columns_of_kind(|k| matches!(k, FieldKind::SingleChoice { .. }))
    }

    /// Checks a JSON document of answers. All the problems are reported at once.
    pub fn validate(&self, answers: &JSValue) -> Result<Submission, Vec<Violation>> {
        let mut violations: Vec<Violation> = Vec::new();
        let empty = JSMap::new();
        let root = match answers {
            JSValue::Object(m) => m,
            JSValue::Null => &empty,
            _ => {
                return Err(vec![Violation::NotAnObject { key: "".to_string() }]);
            }
        };

        for (section_id, v) in root.iter() {
            match self.sections.iter().find(|s| &s.id == section_id) {
                None => violations.push(Violation::UnknownSection {
                    section: section_id.clone(),
                }),
                Some(section) => match v {
                    JSValue::Object(m) => {
                        for field_id in m.keys() {
                            if !section.fields.iter().any(|f| &f.id == field_id) {
                                violations.push(Violation::UnknownField {
                                    column: format!("{}.{}", section_id, field_id),
                                });
                            }
                        }
                    }
                    JSValue::Null => {}
                    _ => violations.push(Violation::NotAnObject {
                        key: section_id.clone(),
                    }),
                },
            }
        }

        let mut res: Vec<(String, String, Answer)> = Vec::new();
        for section in self.sections.iter() {
            let values = root.get(&section.id).and_then(|v| v.as_object());
            for field in section.fields.iter() {
                let column = format!("{}.{}", section.id, field.id);
                let value = values.and_then(|m| m.get(&field.id)).unwrap_or(&JSValue::Null);
                match read_answer(&column, &field.kind, value) {
                    Ok(Answer::Absent) if field.required => {
                        violations.push(Violation::MissingRequired { column })
                    }
                    Ok(a) => res.push((section.id.clone(), field.id.clone(), a)),
                    Err(v) => violations.push(v),
                }
            }
        }

        if violations.is_empty() {
            Ok(Submission { answers: res })
        } else {
            debug!("validate: {} violations", violations.len());
            Err(violations)
        }
    }
}

fn check_constraints(column: &str, kind: &FieldKind) -> DashResult<()> {
    let message = match kind {
        FieldKind::SingleChoice { options } if options.iter().all(|o| o.trim().is_empty()) => {
            format!("{}: a choice needs at least one option", column)
        }
        FieldKind::BoundedInteger {
            min: Some(lo),
            max: Some(hi),
        }
        | FieldKind::BoundedSlider { min: lo, max: hi }
            if lo > hi =>
        {
            format!("{}: the minimum {} is above the maximum {}", column, lo, hi)
        }
        _ => return Ok(()),
    };
    InvalidSchemaSnafu { message }.fail()
}

fn read_text(column: &str, value: &JSValue) -> Result<Answer, Violation> {
    match value {
        JSValue::Null => Ok(Answer::Absent),
        JSValue::String(s) if s.trim().is_empty() => Ok(Answer::Absent),
        JSValue::String(s) => Ok(Answer::Text(s.trim().to_string())),
        _ => Err(Violation::WrongType {
            column: column.to_string(),
            expected: "a text",
        }),
    }
}

fn read_integer(
    column: &str,
    value: &JSValue,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<Answer, Violation> {
    let not_an_integer = || Violation::NotAnInteger {
        column: column.to_string(),
        value: value.to_string(),
    };
    let x: i64 = match value {
        JSValue::Null => return Ok(Answer::Absent),
        JSValue::String(s) if s.trim().is_empty() => return Ok(Answer::Absent),
        JSValue::String(s) => s.trim().parse::<i64>().map_err(|_| not_an_integer())?,
        JSValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9e15 => f as i64,
            _ => return Err(not_an_integer()),
        },
        _ => return Err(not_an_integer()),
    };
    let below = min.map(|lo| x < lo).unwrap_or(false);
    let above = max.map(|hi| x > hi).unwrap_or(false);
    if below || above {
        return Err(Violation::OutOfBounds {
            column: column.to_string(),
            value: x,
            min,
            max,
        });
    }
    Ok(Answer::Integer(x))
}

fn read_answer(column: &str, kind: &FieldKind, value: &JSValue) -> Result<Answer, Violation> {
    match kind {
        FieldKind::ShortText | FieldKind::LongText => read_text(column, value),
        FieldKind::SingleChoice { options } => match read_text(column, value)? {
            Answer::Text(s) if options.iter().any(|o| o.trim() == s) => Ok(Answer::Text(s)),
            Answer::Text(s) => Err(Violation::NotAnOption {
                column: column.to_string(),
                value: s,
            }),
            a => Ok(a),
        },
        FieldKind::BoundedInteger { min, max } => read_integer(column, value, *min, *max),
        FieldKind::BoundedSlider { min, max } => read_integer(column, value, Some(*min), Some(*max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "name": "Teste",
        "sections": [
            {"id": "pessoal", "title": "Pessoal", "fields": [
                {"id": "diretoria", "prompt": "Diretoria", "kind": "singleChoice",
                 "options": ["", "Comercial", "Projetos"], "required": true},
                {"id": "ano", "prompt": "Ano", "kind": "boundedInteger", "min": 2010}
            ]},
            {"id": "clima", "title": "Clima", "fields": [
                {"id": "satisfacao", "prompt": "Satisfação", "kind": "boundedSlider",
                 "min": 1, "max": 5, "required": true},
                {"id": "comentario", "prompt": "Comentário", "kind": "longText"}
            ]}
        ]
    }"#;

    fn small() -> FormSchema {
        FormSchema::parse(SMALL, "small").unwrap()
    }

    #[test]
    fn builtin_schema_loads() {
        let s = FormSchema::builtin().unwrap();
        assert_eq!(s.name(), "Pesquisa de Clima Organizacional");
        assert_eq!(s.sections().len(), 7);
        assert_eq!(s.columns().len(), 42);
        assert_eq!(s.columns()[0], "informacoes_pessoais.ano_entrada");
        assert!(s
            .columns()
            .contains(&"satisfacao_e_orgulho.satisfacao_geral".to_string()));
        assert_eq!(s.columns().last().map(|c| c.as_str()), Some("timestamp"));
    }

    #[test]
    fn columns_by_kind() {
        assert_eq!(small().numeric_columns(), vec!["pessoal.ano", "clima.satisfacao"]);
        assert_eq!(small().choice_columns(), vec!["pessoal.diretoria"]);

        let builtin = FormSchema::builtin().unwrap();
        assert_eq!(builtin.numeric_columns().len(), 36);
        assert!(builtin
            .numeric_columns()
            .contains(&"ambiente_de_trabalho.respeito_e_cordialidade".to_string()));
        assert_eq!(builtin.choice_columns().len(), 3);
        assert!(builtin
            .choice_columns()
            .contains(&"informacoes_pessoais.diretoria".to_string()));
    }

    #[test]
    fn columns_follow_schema_order() {
        assert_eq!(
            small().columns(),
            &[
                "pessoal.diretoria",
                "pessoal.ano",
                "clima.satisfacao",
                "clima.comentario",
                "timestamp"
            ]
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let doc = r#"{"sections": [{"id": "a", "title": "A", "fields": [
            {"id": "x", "prompt": "X", "kind": "shortText"},
            {"id": "x", "prompt": "X", "kind": "longText"}]}]}"#;
        assert!(matches!(
            FormSchema::parse(doc, "dup").map_err(|e| *e),
            Err(DashError::InvalidSchema { .. })
        ));
        let doc = r#"{"sections": [{"id": "a", "title": "A", "fields": []},
                                   {"id": "a", "title": "B", "fields": []}]}"#;
        assert!(FormSchema::parse(doc, "dup").is_err());
        let doc = r#"{"sections": [{"id": "a", "title": "A", "fields": [
            {"id": "x", "prompt": "X", "kind": "boundedSlider", "min": 5, "max": 1}]}]}"#;
        assert!(FormSchema::parse(doc, "bounds").is_err());
        let doc = r#"{"sections": [{"id": "a", "title": "A", "fields": [
            {"id": "x", "prompt": "X", "kind": "colorPicker"}]}]}"#;
        assert!(matches!(
            FormSchema::parse(doc, "kind").map_err(|e| *e),
            Err(DashError::ParsingJson { .. })
        ));
    }

    #[test]
    fn valid_submission() {
        let answers = json!({
            "pessoal": {"diretoria": "Projetos", "ano": 2022.0},
            "clima": {"satisfacao": "4", "comentario": "  "}
        });
        let sub = small().validate(&answers).unwrap();
        assert_eq!(sub.answer("pessoal", "ano"), Some(&Answer::Integer(2022)));
        assert_eq!(sub.answer("clima", "satisfacao"), Some(&Answer::Integer(4)));
        assert_eq!(sub.answer("clima", "comentario"), Some(&Answer::Absent));
        assert_eq!(
            sub.flatten()[0],
            (
                "pessoal.diretoria".to_string(),
                CellValue::Text("Projetos".to_string())
            )
        );
        let record = sub.to_record("2024-05-01T10:00:00");
        assert_eq!(record["clima"]["satisfacao"], 4);
        assert_eq!(record["clima"]["comentario"], JSValue::Null);
        assert_eq!(record["timestamp"], "2024-05-01T10:00:00");
        let keys: Vec<&String> = record.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["pessoal", "clima", "timestamp"]);
    }

    #[test]
    fn all_violations_are_reported() {
        let answers = json!({
            "pessoal": {"diretoria": "", "ano": 2001, "apelido": "x"},
            "clima": {"satisfacao": 4.5},
            "extra": {}
        });
        let violations = small().validate(&answers).unwrap_err();
        assert_eq!(
            violations,
            vec![
                Violation::UnknownField {
                    column: "pessoal.apelido".to_string()
                },
                Violation::UnknownSection {
                    section: "extra".to_string()
                },
                Violation::MissingRequired {
                    column: "pessoal.diretoria".to_string()
                },
                Violation::OutOfBounds {
                    column: "pessoal.ano".to_string(),
                    value: 2001,
                    min: Some(2010),
                    max: None
                },
                Violation::NotAnInteger {
                    column: "clima.satisfacao".to_string(),
                    value: "4.5".to_string()
                },
            ]
        );
    }

    #[test]
    fn choices_and_types() {
        let answers = json!({
            "pessoal": {"diretoria": "Marketing"},
            "clima": {"satisfacao": 3, "comentario": 12}
        });
        let violations = small().validate(&answers).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].to_string(),
            "pessoal.diretoria: \"Marketing\" is not one of the options"
        );
        assert_eq!(violations[1].to_string(), "clima.comentario: expected a text");
        assert!(small().validate(&json!([1, 2])).is_err());
    }
}
