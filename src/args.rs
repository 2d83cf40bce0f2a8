use clap::{Parser, Subcommand};

/// Analysis of organizational climate surveys, and collection of their answers.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Computes the report of a survey export (CSV or Excel).
    Analyze(AnalyzeArgs),
    /// Validates a filled-in form and stores it with the previous answers.
    Submit(SubmitArgs),
    /// Computes the report of all the answers stored so far.
    History(HistoryArgs),
    /// Prints the column names generated by a form schema.
    Schema(SchemaArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// (file path, optional) A JSON file describing the data sources and the output settings.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The survey export. Setting this option overrides the sources listed in
    /// the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv, xlsx or responses; default csv) The type of the input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the report will be written in JSON format
    /// to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) If specified, the processed table is written there in CSV format.
    #[clap(short, long, value_parser)]
    pub export: Option<String>,

    /// (file path) A reference report in JSON format. If provided, the computed report must
    /// match it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (heuristic or exact; default heuristic) How the questions are found in the header.
    #[clap(long, value_parser)]
    pub resolution: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct SubmitArgs {
    /// (file path) The answers, as a JSON object of sections containing fields.
    #[clap(short, long, value_parser)]
    pub answers: String,

    /// (directory) Where the answers are stored.
    #[clap(short, long, value_parser, default_value = "respostas")]
    pub store: String,

    /// (file path, optional) The form schema. The built-in climate survey is used by default.
    #[clap(long, value_parser)]
    pub schema: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct HistoryArgs {
    /// (directory) Where the answers are stored.
    #[clap(short, long, value_parser, default_value = "respostas")]
    pub store: String,

    /// (file path, optional) The form schema. The built-in climate survey is used by default.
    #[clap(long, value_parser)]
    pub schema: Option<String>,

    /// (file path, 'stdout' or empty) Where the report is written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct SchemaArgs {
    /// (file path, optional) The form schema. The built-in climate survey is used by default.
    #[clap(long, value_parser)]
    pub schema: Option<String>,
}
