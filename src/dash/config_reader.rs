use crate::dash::*;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "surveyName")]
    pub survey_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "exportProcessed")]
    pub export_processed: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    pub delimiter: Option<String>,
}

impl FileSource {
    /// A source given on the command line. Without an explicit type, the type
    /// is guessed from the path.
    pub fn from_input(
        path: &str,
        input_type: Option<&str>,
        excel_worksheet_name: Option<String>,
    ) -> FileSource {
        let provider = match input_type {
            Some(t) => t.to_string(),
            None if path.to_lowercase().ends_with(".xlsx") => "xlsx".to_string(),
            None if Path::new(path).is_dir() => "responses".to_string(),
            None => "csv".to_string(),
        };
        FileSource {
            provider,
            file_path: path.to_string(),
            excel_worksheet_name,
            delimiter: None,
        }
    }

    /// The CSV field delimiter, a comma by default.
    pub fn delimiter(&self) -> DashResult<u8> {
        match self.delimiter.as_deref() {
            None | Some("") => Ok(b','),
            Some("\\t") | Some("tab") => Ok(b'\t'),
            Some(s) if s.len() == 1 => Ok(s.as_bytes()[0]),
            Some(s) => whatever!("the delimiter must be a single ASCII character, got {:?}", s),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "dataSources")]
    pub data_sources: Vec<FileSource>,
    pub resolution: Option<String>,
    #[serde(rename = "schemaPath")]
    pub schema_path: Option<String>,
}

impl DashConfig {
    /// Where an output file goes: `<outputDirectory>/<surveyName>_<suffix>`,
    /// if an output directory is configured.
    pub fn output_path(&self, root: &Path, suffix: &str) -> Option<PathBuf> {
        self.output_settings.output_directory.as_ref().map(|d| {
            root.join(d)
                .join(format!("{}_{}", self.output_settings.survey_name, suffix))
        })
    }
}

pub fn read_config(path: &str) -> DashResult<DashConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Reads a report previously written by this program.
pub fn read_reference(path: &str) -> DashResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}
