// Dispatcher: maps each `Action` onto calls to `ApiClient` and prints one
// result line per request. HTTP error statuses are written out as data;
// only usage, input-file and transport failures surface as `Err`.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

use crate::api::{deletion_payload, ApiClient, ApiResponse, Mode};
use crate::cli::Action;

/// The JSON object printed for every submission or deletion: caller
/// context first, then `status`, then the response body's fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultRecord(Map<String, Value>);

impl ResultRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Record for a completed exchange. A JSON object body is merged field
    /// by field, so its keys may replace context keys of the same name.
    pub fn from_response(context: ResultRecord, response: &ApiResponse) -> Self {
        let mut record = context.with("status", response.status);
        record.merge_body(&response.text);
        record
    }

    /// Record for an entry that never produced a response.
    pub fn failure(context: ResultRecord, err: &anyhow::Error) -> Self {
        context.with("error", format!("{:#}", err))
    }

    fn merge_body(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => self.0.extend(fields),
            Ok(other) => {
                tracing::warn!("response body is not a JSON object; keeping it under `body`");
                self.0.insert("body".to_string(), other);
            }
            Err(e) => {
                tracing::warn!(error = %e, "response body is not JSON; keeping raw text under `body`");
                self.0.insert("body".to_string(), Value::String(text.to_string()));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Only possible with `keep_going`: this many batch entries failed.
    EntriesFailed(usize),
}

pub struct Dispatcher<W: Write> {
    api: ApiClient,
    out: W,
    keep_going: bool,
    /// Set while a batch runs; output is written with the bar suspended.
    progress: Option<ProgressBar>,
}

impl<W: Write> Dispatcher<W> {
    pub fn new(api: ApiClient, out: W) -> Self {
        Dispatcher {
            api,
            out,
            keep_going: false,
            progress: None,
        }
    }

    /// Isolate failures of single batch entries instead of aborting.
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn run(&mut self, action: Action, mode: Mode, data: &str) -> Result<RunStatus> {
        tracing::debug!(?action, %mode, data, "dispatching");
        match action {
            Action::GtrSubApi => {
                self.submit_file(mode, Path::new(data), false)?;
            }
            Action::DryRun => {
                self.submit_file(mode, Path::new(data), true)?;
            }
            Action::GtrGetAction => self.get_action(mode, data)?,
            Action::MultiSubs => return self.multi_subs(mode, Path::new(data)),
            Action::MultiDeletes => return self.multi_deletes(mode, Path::new(data)),
        }
        Ok(RunStatus::Completed)
    }

    /// POST `payload` and print the resulting record.
    pub fn submit(
        &mut self,
        mode: Mode,
        payload: &Value,
        dry_run: bool,
        context: ResultRecord,
    ) -> Result<ResultRecord> {
        let response = self.api.submit(mode, payload, dry_run)?;
        let record = ResultRecord::from_response(context, &response);
        self.emit(&record)?;
        Ok(record)
    }

    /// Read a JSON document from `path` and submit it.
    pub fn submit_file(&mut self, mode: Mode, path: &Path, dry_run: bool) -> Result<ResultRecord> {
        let payload = read_json(path)?;
        let mut context = ResultRecord::new().with("file", path.display().to_string());
        if dry_run {
            context = context.with("dry_run", true);
        }
        self.submit(mode, &payload, dry_run, context)
    }

    /// Print the actions of a submission exactly as the portal returns them.
    pub fn get_action(&mut self, mode: Mode, submission_id: &str) -> Result<()> {
        let response = self.api.get_actions(mode, submission_id)?;
        writeln!(self.out, "{}", response.text).context("Failed to write output")?;
        self.out.flush().context("Failed to write output")
    }

    pub fn multi_subs(&mut self, mode: Mode, list_file: &Path) -> Result<RunStatus> {
        let entries = read_list(list_file)?;
        self.run_batch(&entries, "file", |this, entry| {
            this.submit_file(mode, Path::new(entry), false)
        })
    }

    pub fn multi_deletes(&mut self, mode: Mode, list_file: &Path) -> Result<RunStatus> {
        let entries = read_list(list_file)?;
        self.run_batch(&entries, "gtrAccession", |this, accession| {
            let context = ResultRecord::new().with("gtrAccession", accession);
            this.submit(mode, &deletion_payload(accession), false, context)
        })
    }

    /// Process `entries` strictly in order. Without `keep_going` the first
    /// error ends the batch; otherwise it becomes an `error` record keyed by
    /// `context_key` and the batch continues.
    fn run_batch<F>(
        &mut self,
        entries: &[String],
        context_key: &str,
        each: F,
    ) -> Result<RunStatus>
    where
        F: FnMut(&mut Self, &str) -> Result<ResultRecord>,
    {
        let bar = ProgressBar::new(entries.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        self.progress = Some(bar.clone());
        let outcome = self.run_entries(entries, context_key, &bar, each);
        self.progress = None;

        match outcome {
            Ok(0) => {
                bar.finish_and_clear();
                Ok(RunStatus::Completed)
            }
            Ok(failed) => {
                bar.finish_and_clear();
                Ok(RunStatus::EntriesFailed(failed))
            }
            Err(err) => {
                bar.abandon();
                Err(err)
            }
        }
    }

    fn run_entries<F>(
        &mut self,
        entries: &[String],
        context_key: &str,
        bar: &ProgressBar,
        mut each: F,
    ) -> Result<usize>
    where
        F: FnMut(&mut Self, &str) -> Result<ResultRecord>,
    {
        let mut failed = 0;
        for entry in entries {
            bar.set_message(entry.clone());
            if let Err(err) = each(&mut *self, entry.as_str()) {
                if !self.keep_going {
                    return Err(err.context(format!("Batch stopped at entry '{}'", entry)));
                }
                bar.suspend(|| tracing::error!(entry = %entry, "{:#}", err));
                failed += 1;
                let context = ResultRecord::new().with(context_key, entry.as_str());
                self.emit(&ResultRecord::failure(context, &err))?;
            }
            bar.inc(1);
        }
        Ok(failed)
    }

    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        match self.progress.clone() {
            Some(bar) => bar.suspend(|| self.write_record(record)),
            None => self.write_record(record),
        }
    }

    fn write_record(&mut self, record: &ResultRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record).context("Failed to write output")?;
        writeln!(self.out).context("Failed to write output")?;
        self.out.flush().context("Failed to write output")
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Non-blank lines of a list file, trimmed, in file order.
pub fn read_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read list file {}", path.display()))?;
    Ok(parse_list(&text))
}

fn parse_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
