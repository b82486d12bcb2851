//! Show the most recent log lines of a function.

use crate::config::{resolve_handler, FunctionMap, LogsOptions};
use crate::error::{GcfError, GcfResult};
use crate::logging::{LogEntry, LogQuery, LogResult, LIST_ENTRIES_PATH};
use crate::output::OutputSink;
use crate::provider::{dispatch, RequestDispatcher};
use chrono::Utc;

pub const DEFAULT_LOG_COUNT: u32 = 10;
pub const NO_LOG_ENTRIES: &str = "There is no log data to show...";

/// Non-empty text lines emitted by one function.
pub fn function_filter(handler: &str) -> String {
    format!(
        "resource.labels.function_name=\"{}\" AND NOT textPayload=\"\"",
        handler
    )
}

/// `Displaying the N most recent log(s):` followed by one line per entry.
pub fn format_entries(entries: &[LogEntry]) -> String {
    let lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                "{}: {}",
                entry.timestamp.as_deref().unwrap_or_default(),
                entry.payload_text()
            )
        })
        .collect();
    format!(
        "Displaying the {} most recent log(s):\n\n{}",
        entries.len(),
        lines.join("\n")
    )
}

pub struct RetrieveLogs<'a, D: ?Sized, S: ?Sized> {
    dispatcher: &'a D,
    project: &'a str,
    functions: &'a FunctionMap,
    options: &'a LogsOptions,
    sink: &'a S,
}

impl<'a, D, S> RetrieveLogs<'a, D, S>
where
    D: RequestDispatcher + ?Sized,
    S: OutputSink + ?Sized,
{
    /// Create the workflow for one logs request.
    pub fn new(
        dispatcher: &'a D,
        project: &'a str,
        functions: &'a FunctionMap,
        options: &'a LogsOptions,
        sink: &'a S,
    ) -> Self {
        Self {
            dispatcher,
            project,
            functions,
            options,
            sink,
        }
    }

    /// Validate, fetch and print.
    pub async fn run(&self) -> GcfResult<String> {
        self.validate()?;
        let logs = self.get_logs().await?;
        Ok(self.print_logs(&logs))
    }

    /// Checks that need no network access.
    pub fn validate(&self) -> GcfResult<&'a str> {
        if self.options.count == Some(0) {
            return Err(GcfError::invalid_config("count must be greater than zero"));
        }
        resolve_handler(self.functions, &self.options.function)
    }

    /// Requested entry count, or the default.
    pub fn count(&self) -> u32 {
        self.options.count.unwrap_or(DEFAULT_LOG_COUNT)
    }

    /// Query the newest log lines of the function.
    pub async fn get_logs(&self) -> GcfResult<LogResult> {
        let handler = self.validate()?;
        let query = LogQuery::newest(function_filter(handler), self.project, self.count());
        log::info!("Fetching {} log entries for {}", query.page_size, handler);
        dispatch(self.dispatcher, LIST_ENTRIES_PATH, &query).await
    }

    /// Format the entries, write them to the sink and return the text.
    pub fn print_logs(&self, logs: &LogResult) -> String {
        let output = if logs.is_empty() {
            let placeholder = LogEntry {
                timestamp: Some(Utc::now().format("%Y-%m-%d").to_string()),
                ..LogEntry::with_text(NO_LOG_ENTRIES)
            };
            format_entries(&[placeholder])
        } else {
            format_entries(logs.entries())
        };
        self.sink.log(&output);
        output
    }
}
