//! Invoke a deployed function and print its result.
//!
//! Three stages run once each, in order: `invoke` → `get_logs` →
//! `print_logs`. The log query is a single best-effort read: Cloud Logging
//! is eventually consistent, so when the result entry is not there yet a
//! placeholder is printed instead of waiting.

use crate::config::{resolve_handler, FunctionMap, InvokeOptions};
use crate::error::GcfResult;
use crate::functions::{CallResult, InvocationRequest, CALL_PATH};
use crate::logging::{LogEntry, LogQuery, LogResult, LIST_ENTRIES_PATH};
use crate::output::OutputSink;
use crate::provider::{dispatch, RequestDispatcher};

pub const NO_LOG_DATA: &str = "There is no log data available right now...";

/// The "execution started" and "result" entries.
const MARKER_ENTRIES: u32 = 2;

/// Index of the "result" entry in a newest-first listing.
const RESULT_INDEX: usize = 1;

/// Filter matching the execution log lines of one function.
pub fn execution_filter(handler: &str, region: &str) -> String {
    format!("Function execution {} {}", handler, region)
}

/// The line to show for a log listing.
///
/// Fewer than two entries means the result has not been indexed yet.
pub fn result_line(logs: &LogResult) -> String {
    match logs.entries().get(RESULT_INDEX) {
        Some(entry) => entry.payload_text(),
        None => placeholder_entries()[RESULT_INDEX].payload_text(),
    }
}

fn placeholder_entries() -> [LogEntry; 2] {
    [LogEntry::default(), LogEntry::with_text(NO_LOG_DATA)]
}

pub struct InvokeFunction<'a, D: ?Sized, S: ?Sized> {
    dispatcher: &'a D,
    project: &'a str,
    functions: &'a FunctionMap,
    options: &'a InvokeOptions,
    sink: &'a S,
}

impl<'a, D, S> InvokeFunction<'a, D, S>
where
    D: RequestDispatcher + ?Sized,
    S: OutputSink + ?Sized,
{
    /// Create the workflow for one invocation.
    pub fn new(
        dispatcher: &'a D,
        project: &'a str,
        functions: &'a FunctionMap,
        options: &'a InvokeOptions,
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

    /// Run all stages and return the printed line.
    pub async fn run(&self) -> GcfResult<String> {
        self.invoke().await?;
        let logs = self.get_logs().await?;
        Ok(self.print_logs(&logs))
    }

    fn handler(&self) -> GcfResult<&'a str> {
        resolve_handler(self.functions, &self.options.function)
    }

    /// Call the function with the configured payload.
    pub async fn invoke(&self) -> GcfResult<CallResult> {
        let handler = self.handler()?;
        let request = InvocationRequest::new(
            self.project,
            &self.options.region,
            handler,
            self.options.payload(),
        );
        log::info!("Invoking {}", request.name);
        let result: CallResult = dispatch(self.dispatcher, CALL_PATH, &request).await?;
        if let Some(ref id) = result.execution_id {
            log::debug!("Execution id {}", id);
        }
        Ok(result)
    }

    /// Fetch the two newest execution log entries.
    pub async fn get_logs(&self) -> GcfResult<LogResult> {
        let handler = self.handler()?;
        let query = LogQuery::newest(
            execution_filter(handler, &self.options.region),
            self.project,
            MARKER_ENTRIES,
        );
        dispatch(self.dispatcher, LIST_ENTRIES_PATH, &query).await
    }

    /// Write the result line to the sink and return it.
    pub fn print_logs(&self, logs: &LogResult) -> String {
        if logs.is_empty() {
            log::debug!("No log entries for {} yet", self.options.function);
        }
        let line = result_line(logs);
        self.sink.log(&line);
        line
    }
}
