use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JSValue;
use survey_metrics::*;
use text_diff::print_diff;

use crate::args::{AnalyzeArgs, HistoryArgs, SchemaArgs, SubmitArgs};
use crate::dash::config_reader::*;
use crate::dash::form_schema::{FormSchema, Violation};
use crate::dash::response_store::ResponseStore;

pub mod collected;
pub mod config_reader;
pub mod form_schema;
mod io_common;
mod io_csv;
mod io_msforms;
pub mod report_json;
pub mod response_store;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DashError {
    #[snafu(display("Error opening CSV file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of CSV file {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Line {lineno} of CSV file {path} has more cells than the header"))]
    CsvLineTooLong { path: String, lineno: usize },
    #[snafu(display("Error writing CSV file {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file {path} has no worksheet or no header row"))]
    EmptyExcel { path: String },
    #[snafu(display("The Excel file {path} has no worksheet named {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display(
        "The Excel file {path} has several worksheets ({names}): the worksheet name must be provided"
    ))]
    AmbiguousWorksheet { path: String, names: String },
    #[snafu(display("The table read from {path} is not valid"))]
    MalformedTable { source: SurveyError, path: String },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error rendering JSON"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid form schema: {message}"))]
    InvalidSchema { message: String },
    #[snafu(display("The answers were refused:\n{}", format_violations(violations)))]
    InvalidSubmission { violations: Vec<Violation> },
    #[snafu(display("Error accessing the response store at {path}"))]
    StoreIo {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(
        "The response store is locked by another writer. If no submission is running, remove {path}"
    ))]
    StoreLocked { path: String },
    #[snafu(display("Unknown data source provider {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Unknown resolution mode {mode:?} (expected heuristic or exact)"))]
    UnknownResolution { mode: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;
pub type BDashResult<T> = Result<T, Box<DashError>>;

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<String>>()
        .join("\n")
}

fn make_resolver(mode: Option<&str>) -> DashResult<Box<dyn ColumnResolver>> {
    match mode {
        None | Some("heuristic") => Ok(Box::new(HeuristicResolver)),
        Some("exact") => Ok(Box::new(ExactResolver)),
        Some(x) => UnknownResolutionSnafu { mode: x }.fail(),
    }
}

fn load_schema(path: &Option<String>) -> DashResult<FormSchema> {
    match path {
        Some(p) => FormSchema::read(p).map_err(|e| *e),
        None => FormSchema::builtin().map_err(|e| *e),
    }
}

fn read_source(root: &Path, cfs: &FileSource, schema: Option<&FormSchema>) -> DashResult<RawTable> {
    let p: PathBuf = root.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read survey data {:?}", p2);
    let res = match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_table(&p2, cfs.delimiter()?),
        "xlsx" => io_msforms::read_excel_table(&p2, cfs.excel_worksheet_name.as_deref()),
        "responses" => ResponseStore::new(&p).history(schema),
        x => return UnknownProviderSnafu { provider: x }.fail(),
    };
    res.map_err(|e| *e)
}

fn write_output(out: &Option<String>, contents: &str) -> DashResult<()> {
    match out.as_deref() {
        None | Some("") | Some("stdout") => {
            println!("{}", contents);
        }
        Some(path) => {
            fs::write(path, contents).context(WritingOutputSnafu { path })?;
            info!("Report written to {:?}", path);
        }
    }
    Ok(())
}

fn check_reference(reference_path: &str, pretty_js_report: &str) -> DashResult<()> {
    let reference = read_reference(reference_path)?;
    debug!("check_reference: reference: {:?}", reference);
    let pretty_js_reference = serde_json::to_string_pretty(&reference).context(WritingJsonSnafu {})?;
    if pretty_js_reference != pretty_js_report {
        warn!("Found differences with the reference report");
        print_diff(pretty_js_reference.as_str(), pretty_js_report, "\n");
        whatever!("Difference detected between the computed report and the reference report")
    }
    info!("The report matches the reference {:?}", reference_path);
    Ok(())
}

/// Runs the analyzer on a survey export, or on the sources listed in a configuration.
pub fn run_analyze(args: &AnalyzeArgs) -> DashResult<()> {
    let config: Option<DashConfig> = match &args.config {
        Some(p) => Some(read_config(p)?),
        None => None,
    };
    debug!("run_analyze: config: {:?}", config);

    let (root, sources): (PathBuf, Vec<FileSource>) = match (&args.input, &config) {
        (Some(input), _) => {
            let cfs = FileSource::from_input(
                input,
                args.input_type.as_deref(),
                args.excel_worksheet_name.clone(),
            );
            (PathBuf::new(), vec![cfs])
        }
        (None, Some(c)) => {
            let config_path = args.config.clone().unwrap_or_default();
            let root = Path::new(&config_path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            let mut sources = c.data_sources.clone();
            if let Some(ws) = &args.excel_worksheet_name {
                for s in sources.iter_mut() {
                    s.excel_worksheet_name = Some(ws.clone());
                }
            }
            (root, sources)
        }
        (None, None) => whatever!("No input: provide --input or --config"),
    };
    if sources.is_empty() {
        whatever!("No data source to analyze");
    }

    let schema: Option<FormSchema> = match config.as_ref().and_then(|c| c.schema_path.as_ref()) {
        Some(p) => Some(load_schema(&Some(root.join(p).display().to_string()))?),
        None => None,
    };

    let mut tables: Vec<RawTable> = Vec::new();
    for cfs in sources.iter() {
        tables.push(read_source(&root, cfs, schema.as_ref())?);
    }
    let table = RawTable::concat(&tables);
    info!(
        "run_analyze: {} rows and {} columns read from {} sources",
        table.num_rows(),
        table.num_columns(),
        sources.len()
    );

    let mode = args
        .resolution
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.resolution.clone()));
    let resolver = make_resolver(mode.as_deref())?;

    let numeric_columns: Vec<String> = schema
        .as_ref()
        .map(|s| s.numeric_columns())
        .unwrap_or_default();
    let numeric: Vec<&str> = numeric_columns.iter().map(|s| s.as_str()).collect();
    let report = build_summary_report_with(&table, resolver.as_ref(), &numeric);
    let survey_name = config
        .as_ref()
        .map(|c| c.output_settings.survey_name.clone())
        .or_else(|| args.input.as_deref().map(io_common::simplify_file_name))
        .unwrap_or_default();
    let report_js = report_json::report_to_json(&survey_name, &report);
    let pretty_js_report = serde_json::to_string_pretty(&report_js).context(WritingJsonSnafu {})?;

    let out = match (&args.out, &config) {
        (Some(o), _) => Some(o.clone()),
        (None, Some(c)) => c
            .output_path(&root, "summary.json")
            .map(|p| p.display().to_string()),
        (None, None) => None,
    };
    write_output(&out, &pretty_js_report)?;

    let export = match (&args.export, &config) {
        (Some(e), _) => Some(e.clone()),
        (None, Some(c)) if c.output_settings.export_processed == Some(true) => c
            .output_path(&root, "processed.csv")
            .map(|p| p.display().to_string()),
        _ => None,
    };
    if let Some(export_path) = export {
        let processed = prepare_with(&table, resolver.as_ref(), &numeric).processed();
        io_csv::write_csv_table(&export_path, &processed).map_err(|e| *e)?;
        info!("Processed table written to {:?}", export_path);
    }

    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &pretty_js_report)?;
    }
    Ok(())
}

/// Validates a filled-in form and appends it to the store.
pub fn run_submit(args: &SubmitArgs) -> DashResult<()> {
    let schema = load_schema(&args.schema)?;
    let contents = fs::read_to_string(&args.answers).context(OpeningJsonSnafu {
        path: args.answers.clone(),
    })?;
    let answers: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {
        path: args.answers.clone(),
    })?;
    let submission = match schema.validate(&answers) {
        Ok(s) => s,
        Err(violations) => return InvalidSubmissionSnafu { violations }.fail(),
    };
    let store = ResponseStore::new(Path::new(&args.store));
    let receipt = store.submit(&submission, chrono::Local::now()).map_err(|e| *e)?;
    println!("Answers saved in {}", receipt.record_path.display());
    if let Some(e) = &receipt.consolidated_error {
        warn!("run_submit: consolidated file not updated: {:?}", e);
        eprintln!(
            "The answers are saved, but the consolidated file could not be updated: {}",
            e
        );
    }
    Ok(())
}

/// Reads all the stored answers back and runs the analyzer on them.
pub fn run_history(args: &HistoryArgs) -> DashResult<()> {
    let schema = load_schema(&args.schema)?;
    let store = ResponseStore::new(Path::new(&args.store));
    let table = store.history(Some(&schema)).map_err(|e| *e)?;
    if table.num_rows() == 0 {
        warn!("run_history: no answer stored in {:?} yet", args.store);
    }
    let numeric_columns = schema.numeric_columns();
    let numeric: Vec<&str> = numeric_columns.iter().map(|s| s.as_str()).collect();
    let report = build_summary_report_with(&table, &ExactResolver, &numeric);
    let collected = collected::collected_summary(&table, &schema);
    let report_js = report_json::history_to_json(schema.name(), &report, &collected);
    let pretty_js_report = serde_json::to_string_pretty(&report_js).context(WritingJsonSnafu {})?;
    write_output(&args.out, &pretty_js_report)
}

pub fn run_schema(args: &SchemaArgs) -> DashResult<()> {
    let schema = load_schema(&args.schema)?;
    for c in schema.columns() {
        println!("{}", c);
    }
    Ok(())
}
