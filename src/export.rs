use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;
use webbrowser::Browser;

use crate::config::FormConfig;
use crate::error::ExportError;

/// What a finished session hands to the export sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub date: NaiveDate,
    pub pulse_before: u32,
    pub pulse_after: u32,
    pub session_label: String,
}

pub trait ExportSink {
    fn name(&self) -> &'static str;
    fn export(&self, record: &ExportRecord) -> Result<(), ExportError>;
}

/// Opens a pre-filled Google Form in the browser. No response is awaited.
#[derive(Debug, Clone)]
pub struct FormExportSink {
    form: FormConfig,
}

impl FormExportSink {
    pub fn new(form: FormConfig) -> Self {
        Self { form }
    }

    pub fn form_url(&self, record: &ExportRecord) -> Result<Url, ExportError> {
        let mut url = Url::parse(&self.form.base_url)?;
        url.query_pairs_mut()
            .append_pair(&self.form.date_entry, &record.date.format("%Y-%m-%d").to_string())
            .append_pair(&self.form.pulse_before_entry, &record.pulse_before.to_string())
            .append_pair(&self.form.pulse_after_entry, &record.pulse_after.to_string())
            .append_pair(&self.form.session_entry, &record.session_label);
        Ok(url)
    }
}

impl ExportSink for FormExportSink {
    fn name(&self) -> &'static str {
        "form"
    }

    fn export(&self, record: &ExportRecord) -> Result<(), ExportError> {
        let url = self.form_url(record)?;
        if !Browser::is_available() {
            return Err(ExportError::NoBrowser);
        }
        webbrowser::open(url.as_str())?;
        info!(url = %url, "opened export form");
        Ok(())
    }
}

/// Appends finished sessions to a local CSV log
#[derive(Debug, Clone)]
pub struct CsvHistorySink {
    path: PathBuf,
}

impl CsvHistorySink {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<ExportRecord>, ExportError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<ExportRecord>, csv::Error>>()?;
        Ok(records)
    }
}

impl ExportSink for CsvHistorySink {
    fn name(&self) -> &'static str {
        "history"
    }

    fn export(&self, record: &ExportRecord) -> Result<(), ExportError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet we need to emit a header
        let needs_header = !self.path.exists();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        info!(path = %self.path.display(), "appended session to history");
        Ok(())
    }
}
