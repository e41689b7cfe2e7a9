//! Sequential multi-file processing with per-file failure isolation.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::document::{UploadedFile, file_label};
use crate::error::PipelineError;
use crate::extract::ExtractedFields;
use crate::pipeline::{ExtractionPipeline, ExtractionRequest};
use crate::prompt::Template;
use crate::store::{ExpenseStore, NewExpense, ReceiptStorage};

pub const DEFAULT_EXPENSE_TYPE: &str = "Other";
pub const DEFAULT_VENDOR: &str = "Unknown Vendor";
pub const DEFAULT_LOCATION: &str = "Unknown Location";

/// Date layouts models commonly answer with, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%d.%m.%Y",
    "%d.%m.%y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Settings shared by every file in one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    pub template: Template,
    pub requested_backend: String,
    pub trip_name: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub filename: String,
    pub status: BatchStatus,
    /// Empty on success.
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_id: Option<i64>,
}

impl BatchItemResult {
    fn success(filename: String, expense_id: i64) -> Self {
        Self {
            filename,
            status: BatchStatus::Success,
            error: String::new(),
            expense_id: Some(expense_id),
        }
    }

    fn failed(filename: String, error: &PipelineError) -> Self {
        Self {
            filename,
            status: BatchStatus::Failed,
            error: error.to_string(),
            expense_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    fn from_results(results: Vec<BatchItemResult>) -> Self {
        let succeeded = results
            .iter()
            .filter(|r| r.status == BatchStatus::Success)
            .count();
        Self {
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

pub struct BatchCoordinator<'a, S, E> {
    pipeline: &'a ExtractionPipeline,
    storage: &'a S,
    expenses: &'a E,
    today: Option<NaiveDate>,
}

impl<'a, S: ReceiptStorage, E: ExpenseStore> BatchCoordinator<'a, S, E> {
    #[must_use]
    pub fn new(pipeline: &'a ExtractionPipeline, storage: &'a S, expenses: &'a E) -> Self {
        Self {
            pipeline,
            storage,
            expenses,
            today: None,
        }
    }

    /// Pin the date used when a receipt has none.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Process every file in input order; one result per file.
    pub async fn process(&self, files: &[UploadedFile], ctx: &BatchContext) -> BatchReport {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.process_file(file, ctx).await);
        }
        finish(results)
    }

    /// Read each path from disk and process it. An unreadable path becomes a failed
    /// result and the batch continues.
    pub async fn process_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        ctx: &BatchContext,
    ) -> BatchReport {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let result = match UploadedFile::from_path(path) {
                Ok(file) => self.process_file(&file, ctx).await,
                Err(source) => {
                    let filename = file_label(path);
                    let e = PipelineError::Read {
                        filename: filename.clone(),
                        source,
                    };
                    tracing::warn!(path = %path.display(), "batch item failed: {e}");
                    BatchItemResult::failed(filename, &e)
                }
            };
            results.push(result);
        }
        finish(results)
    }

    /// Run one file through storage, extraction and persistence. Never fails.
    pub async fn process_file(&self, file: &UploadedFile, ctx: &BatchContext) -> BatchItemResult {
        let filename = file.original_filename.clone();
        match self.try_process(file, ctx).await {
            Ok(expense_id) => {
                tracing::info!(filename = %filename, expense_id, "expense created");
                BatchItemResult::success(filename, expense_id)
            }
            Err(e) => {
                tracing::warn!(filename = %filename, "batch item failed: {e}");
                BatchItemResult::failed(filename, &e)
            }
        }
    }

    async fn try_process(
        &self,
        file: &UploadedFile,
        ctx: &BatchContext,
    ) -> Result<i64, PipelineError> {
        let filename = file.original_filename.as_str();
        let document = file
            .to_document()
            .ok_or_else(|| PipelineError::UnsupportedFile {
                filename: filename.to_owned(),
            })?;

        tracing::info!(filename, stage = "uploading", "storing receipt");
        let receipt_path = self.storage.put(filename, &file.buffer).await?;

        tracing::info!(filename, stage = "extracting", "reading receipt");
        let request =
            ExtractionRequest::new(document, ctx.template).with_backend(&ctx.requested_backend);
        let result = self.pipeline.run(&request).await?;
        let fields = result.fields.unwrap_or_default();

        tracing::info!(filename, stage = "mapping", "applying expense defaults");
        let expense = map_expense(&fields, ctx, receipt_path, self.today());
        validate_expense(&expense)?;

        tracing::info!(filename, stage = "persisting", "writing expense");
        Ok(self.expenses.create_expense(&expense).await?)
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

fn finish(results: Vec<BatchItemResult>) -> BatchReport {
    let total = results.len();
    let report = BatchReport::from_results(results);
    tracing::info!(
        total,
        succeeded = report.succeeded,
        failed = report.failed,
        "batch complete"
    );
    report
}

/// Map extracted fields onto an expense record, filling defaults for missing values.
///
/// The batch comment wins over the receipt description.
#[must_use]
pub fn map_expense(
    fields: &ExtractedFields,
    ctx: &BatchContext,
    receipt_path: String,
    today: NaiveDate,
) -> NewExpense {
    let date = fields
        .date
        .as_deref()
        .map_or_else(|| today.format("%Y-%m-%d").to_string(), normalize_date);

    NewExpense {
        date,
        cost: fields.cost.unwrap_or(0.0),
        kind: fields
            .kind
            .clone()
            .unwrap_or_else(|| DEFAULT_EXPENSE_TYPE.to_owned()),
        vendor: fields
            .vendor
            .clone()
            .unwrap_or_else(|| DEFAULT_VENDOR.to_owned()),
        location: fields
            .location
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCATION.to_owned()),
        trip_name: ctx.trip_name.clone().filter(|t| !t.trim().is_empty()),
        comments: ctx
            .comments
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| fields.description.clone()),
        receipt_path,
    }
}

/// ISO `YYYY-MM-DD` when the text parses as a date, otherwise the text unchanged.
#[must_use]
pub fn normalize_date(text: &str) -> String {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map_or_else(|| text.to_owned(), |d| d.format("%Y-%m-%d").to_string())
}

/// Required fields must be present once defaults have been applied.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] naming the first offending field.
pub fn validate_expense(expense: &NewExpense) -> Result<(), PipelineError> {
    let required = [
        ("date", expense.date.as_str()),
        ("type", expense.kind.as_str()),
        ("vendor", expense.vendor.as_str()),
        ("location", expense.location.as_str()),
        ("receipt path", expense.receipt_path.as_str()),
    ];
    if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(PipelineError::Validation(format!("{name} is required")));
    }
    if !expense.cost.is_finite() {
        return Err(PipelineError::Validation("cost must be a finite number".into()));
    }
    Ok(())
}
