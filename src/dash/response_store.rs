/*!
The store of the collected answers.

Each submission is kept as its own JSON record, named after the time of the
submission, and appended as one row to a consolidated CSV file. Records are
never modified once written.
*/

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};

use chrono::{DateTime, Duration, Local};

use crate::dash::form_schema::{FormSchema, Submission, TIMESTAMP_COLUMN};
use crate::dash::*;

pub const CONSOLIDATED_FILE: &str = "respostas_consolidadas.csv";
const LOCK_FILE: &str = ".respostas.lock";

#[derive(Debug)]
pub struct Receipt {
    pub record_path: PathBuf,
    pub timestamp: String,
    /// Set when the record was saved but the consolidated file could not be
    /// updated.
    pub consolidated_error: Option<DashError>,
}

/// A lock older than this was left by a writer that did not finish.
const STALE_LOCK_MINUTES: i64 = 10;

/// Exclusive right to append to the consolidated file, released on drop.
///
/// The lock file holds the id of the process and the time it was taken.
struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(dir: &Path, now: &DateTime<Local>) -> BDashResult<StoreLock> {
        let path = dir.join(LOCK_FILE);
        match StoreLock::create(&path, now) {
            Err(e)
                if matches!(*e, DashError::StoreLocked { .. })
                    && StoreLock::is_stale(&path, now) =>
            {
                warn!("StoreLock: removing the stale lock {:?}", path);
                fs::remove_file(&path).context(StoreIoSnafu {
                    path: path.display().to_string(),
                })?;
                StoreLock::create(&path, now)
            }
            res => res,
        }
    }

    fn create(path: &Path, now: &DateTime<Local>) -> BDashResult<StoreLock> {
        let path_s = path.display().to_string();
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let contents = format!("{}\n{}\n", std::process::id(), now.to_rfc3339());
                if let Err(e) = file.write_all(contents.as_bytes()) {
                    let _ = fs::remove_file(path);
                    return Err(Box::new(DashError::StoreIo { source: e, path: path_s }));
                }
                Ok(StoreLock {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(Box::new(DashError::StoreLocked { path: path_s }))
            }
            Err(e) => Err(Box::new(DashError::StoreIo { source: e, path: path_s })),
        }
    }

    /// Only a lock with a readable time can be stale.
    fn is_stale(path: &Path, now: &DateTime<Local>) -> bool {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return false,
        };
        let taken = contents
            .lines()
            .nth(1)
            .and_then(|l| DateTime::parse_from_rfc3339(l.trim()).ok());
        debug!("StoreLock::is_stale: {:?} taken at {:?}", path, taken);
        match taken {
            Some(t) => now.signed_duration_since(t) > Duration::minutes(STALE_LOCK_MINUTES),
            None => false,
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("StoreLock: could not remove {:?}: {:?}", self.path, e);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseStore {
    dir: PathBuf,
}

impl ResponseStore {
    pub fn new(dir: &Path) -> ResponseStore {
        ResponseStore {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn consolidated_path(&self) -> PathBuf {
        self.dir.join(CONSOLIDATED_FILE)
    }

    /// Persists one submission.
    ///
    /// The JSON record is written first: if that fails, nothing is stored and
    /// the error is returned. A failure on the consolidated file afterwards is
    /// only reported in the receipt.
    pub fn submit(&self, submission: &Submission, now: DateTime<Local>) -> BDashResult<Receipt> {
        let dir_s = self.dir.display().to_string();
        fs::create_dir_all(&self.dir).context(StoreIoSnafu { path: dir_s })?;

        let timestamp = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let record = submission.to_record(&timestamp);
        let record_path = self.write_record(&record, &now)?;
        info!("submit: answers saved in {:?}", record_path);

        let consolidated_error = match self.append_consolidated(submission, &timestamp, &now) {
            Ok(()) => None,
            Err(e) => {
                warn!("submit: the consolidated file was not updated: {}", e);
                Some(*e)
            }
        };
        Ok(Receipt {
            record_path,
            timestamp,
            consolidated_error,
        })
    }

    fn write_record(&self, record: &JSValue, now: &DateTime<Local>) -> BDashResult<PathBuf> {
        let contents = serde_json::to_string_pretty(record).context(WritingJsonSnafu {})?;
        let base = now.format("resposta_%Y%m%d_%H%M%S").to_string();
        let mut n: usize = 0;
        loop {
            let name = if n == 0 {
                format!("{}.json", base)
            } else {
                format!("{}_{}.json", base, n)
            };
            let path = self.dir.join(name);
            let path_s = path.display().to_string();
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    fill_record(&mut file, &path, &contents)?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("write_record: {:?} already taken", path_s);
                    n += 1;
                }
                Err(e) => {
                    return Err(Box::new(DashError::StoreIo {
                        source: e,
                        path: path_s,
                    }))
                }
            }
        }
    }

    fn append_consolidated(
        &self,
        submission: &Submission,
        timestamp: &str,
        now: &DateTime<Local>,
    ) -> BDashResult<()> {
        let _lock = StoreLock::acquire(&self.dir, now)?;
        let path = self.consolidated_path();
        let path_s = path.display().to_string();

        let mut row = submission.flatten();
        row.push((
            TIMESTAMP_COLUMN.to_string(),
            CellValue::Text(timestamp.to_string()),
        ));
        let names: Vec<String> = row.iter().map(|(n, _)| n.clone()).collect();
        let cells: Vec<CellValue> = row.into_iter().map(|(_, c)| c).collect();
        let new_row =
            RawTable::from_rows(&names, &[cells]).context(MalformedTableSnafu { path: &path_s })?;

        if !path.exists() {
            debug!("append_consolidated: creating {:?}", path_s);
            return io_csv::write_csv_table(&path_s, &new_row);
        }

        let existing = io_csv::read_csv_table(&path_s, b',')?;
        let header = existing.column_names();
        if names.iter().all(|n| header.contains(&n.as_str())) {
            let aligned: Vec<String> = header
                .iter()
                .map(|h| match new_row.column(h).map(|c| &c.cells[0]) {
                    Some(CellValue::Text(s)) => s.clone(),
                    Some(CellValue::Number(x)) if !x.is_nan() => format_number(*x),
                    _ => "".to_string(),
                })
                .collect();
            let file = OpenOptions::new()
                .append(true)
                .open(&path)
                .context(StoreIoSnafu { path: &path_s })?;
            let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
            wtr.write_record(&aligned)
                .context(WritingCsvSnafu { path: &path_s })?;
            wtr.flush().context(StoreIoSnafu { path: &path_s })?;
        } else {
            // New columns: the whole file is rewritten under the extended header.
            info!(
                "append_consolidated: extending the header of {:?}",
                path_s
            );
            let extended = RawTable::concat(&[existing, new_row]);
            let tmp = self.dir.join(format!("{}.tmp", CONSOLIDATED_FILE));
            let tmp_s = tmp.display().to_string();
            io_csv::write_csv_table(&tmp_s, &extended)?;
            fs::rename(&tmp, &path).context(StoreIoSnafu { path: &path_s })?;
        }
        Ok(())
    }

    /// The record files, in chronological order. Records written in the same
    /// second are ordered by their numeric suffix.
    fn record_paths(&self) -> BDashResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let dir_s = self.dir.display().to_string();
        let mut res: Vec<PathBuf> = Vec::new();
        for entry_r in fs::read_dir(&self.dir).context(StoreIoSnafu { path: &dir_s })? {
            let entry = entry_r.context(StoreIoSnafu { path: &dir_s })?;
            let path = entry.path();
            if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                res.push(path);
            }
        }
        res.sort_by_key(|p| record_order(p));
        Ok(res)
    }

    /// Reads all the records back into one table.
    ///
    /// With a schema, the columns are the schema columns in order, followed by
    /// any other column found in the records. Without, the columns are in the
    /// order in which they are first seen. Records that are not valid JSON
    /// are skipped with a warning.
    pub fn history(&self, schema: Option<&FormSchema>) -> BDashResult<RawTable> {
        let mut names: Vec<String> = schema.map(|s| s.columns().to_vec()).unwrap_or_default();
        let mut records: Vec<Vec<(String, CellValue)>> = Vec::new();
        for path in self.record_paths()? {
            let path_s = path.display().to_string();
            let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: &path_s })?;
            let js: JSValue = match serde_json::from_str(&contents) {
                Ok(js) => js,
                Err(e) => {
                    warn!("history: skipping the unreadable record {:?}: {}", path_s, e);
                    continue;
                }
            };
            let mut flat: Vec<(String, CellValue)> = Vec::new();
            flatten_json("", &js, &mut flat);
            for (n, _) in flat.iter() {
                if !names.contains(n) {
                    names.push(n.clone());
                }
            }
            records.push(flat);
        }
        debug!(
            "history: {} records, {} columns in {:?}",
            records.len(),
            names.len(),
            self.dir
        );

        let rows: Vec<Vec<CellValue>> = records
            .into_iter()
            .map(|flat| {
                names
                    .iter()
                    .map(|n| {
                        flat.iter()
                            .find(|(k, _)| k == n)
                            .map(|(_, c)| c.clone())
                            .unwrap_or(CellValue::Missing)
                    })
                    .collect()
            })
            .collect();
        let table = RawTable::from_rows(&names, &rows).context(MalformedTableSnafu {
            path: self.dir.display().to_string(),
        })?;
        Ok(table)
    }
}

/// Writes the contents of a new record. On failure the partial file is
/// removed, so that no truncated record is ever read back.
fn fill_record<W: Write>(out: &mut W, path: &Path, contents: &str) -> BDashResult<()> {
    if let Err(e) = out.write_all(contents.as_bytes()).and_then(|_| out.flush()) {
        if let Err(e2) = fs::remove_file(path) {
            warn!("fill_record: could not remove {:?}: {:?}", path, e2);
        }
        return Err(Box::new(DashError::StoreIo {
            source: e,
            path: path.display().to_string(),
        }));
    }
    Ok(())
}

/// `resposta_<date>_<time>_<n>` sorts as (`resposta_<date>_<time>`, n).
fn record_order(path: &Path) -> (String, usize) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let parts: Vec<&str> = stem.splitn(4, '_').collect();
    if parts.len() == 4 {
        if let Ok(n) = parts[3].parse::<usize>() {
            return (parts[..3].join("_"), n);
        }
    }
    (stem, 0)
}

/// Nested objects become `parent.child` columns.
fn flatten_json(prefix: &str, js: &JSValue, res: &mut Vec<(String, CellValue)>) {
    match js {
        JSValue::Object(m) => {
            for (k, v) in m.iter() {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten_json(&key, v, res);
            }
        }
        _ if prefix.is_empty() => {}
        JSValue::Null => res.push((prefix.to_string(), CellValue::Missing)),
        JSValue::String(s) => res.push((prefix.to_string(), CellValue::from_text(s))),
        JSValue::Number(n) => {
            let cell = n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Missing);
            res.push((prefix.to_string(), cell))
        }
        JSValue::Bool(b) => res.push((prefix.to_string(), CellValue::Text(b.to_string()))),
        JSValue::Array(_) => res.push((prefix.to_string(), CellValue::Text(js.to_string()))),
    }
}
